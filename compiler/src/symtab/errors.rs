//! Errors raised by the symbol table and the completion engine

use super::id_types::SymbolId;
use crate::error_codes;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolError {
    /// Completion re-entered a locked symbol without recursion budget
    CyclicReference {
        sym: SymbolId,
        /// Description of the info that was being completed
        pending: String,
        /// Symbols locked at the time, outermost first (empty unless tracing)
        trace: Vec<SymbolId>,
        /// Rendered symbol, e.g. "class Foo"
        display: String,
    },
    /// A stub symbol was used
    MissingRequirement { sym: SymbolId, message: String },
    /// Owner transplant that would make a symbol its own ancestor
    OwnerCycle { sym: SymbolId, new_owner: SymbolId },
    /// A completer kept installing lazy types
    NoProgress { sym: SymbolId, info: String },
    /// A completer failed while decoding a signature
    BadSignature { message: String },
    /// Internal consistency fault
    Internal(String),
}

impl SymbolError {
    pub fn code(&self) -> u16 {
        match self {
            SymbolError::CyclicReference { .. } => error_codes::CYCLIC_REFERENCE,
            SymbolError::MissingRequirement { .. } => error_codes::MISSING_REQUIREMENT,
            SymbolError::OwnerCycle { .. } => error_codes::OWNER_CYCLE,
            SymbolError::NoProgress { .. } => error_codes::NO_PROGRESS,
            SymbolError::BadSignature { .. } => error_codes::BAD_SIGNATURE,
            SymbolError::Internal(_) => error_codes::INTERNAL,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, SymbolError::CyclicReference { .. })
    }

    pub fn is_missing_requirement(&self) -> bool {
        matches!(self, SymbolError::MissingRequirement { .. })
    }

    /// The symbol the error is about, if any
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            SymbolError::CyclicReference { sym, .. }
            | SymbolError::MissingRequirement { sym, .. }
            | SymbolError::OwnerCycle { sym, .. }
            | SymbolError::NoProgress { sym, .. } => Some(*sym),
            _ => None,
        }
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::CyclicReference { display, pending, .. } => {
                write!(f, "illegal cyclic reference involving {} (while completing {})", display, pending)
            }
            SymbolError::MissingRequirement { message, .. } => write!(f, "{}", message),
            SymbolError::OwnerCycle { sym, new_owner } => {
                write!(f, "cannot make {} the owner of {}: owner cycle", new_owner, sym)
            }
            SymbolError::NoProgress { sym, info } => {
                write!(f, "no progress in completing {}: {}", sym, info)
            }
            SymbolError::BadSignature { message } => write!(f, "{}", message),
            SymbolError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for SymbolError {}

pub type SymbolResult<T> = Result<T, SymbolError>;
