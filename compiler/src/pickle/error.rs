//! Errors of the signature reader and writer

use crate::error_codes;
use crate::symtab::SymbolError;
use std::fmt;

/// A failure while decoding entries of one pickle
///
/// Decode errors stay inside the unpickler: `unpickle` turns them into a
/// `PickleError` naming the file, and lazy completers turn them into a
/// `SymbolError`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Read past the end of the buffer
    Truncated { at: usize },
    /// Unsupported format version
    Version { major: u32, minor: u32 },
    /// An entry tag that is unknown or not valid where it was found
    UnknownTag { tag: u8, index: usize },
    /// An entry reference outside the entry table
    BadRef { index: usize },
    /// Structurally invalid entry
    Malformed(String),
    /// An entry referred to itself while it was being decoded
    Reentrant { index: usize },
    /// Symbol table failure raised while decoding
    Symbol(SymbolError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

impl DecodeError {
    pub fn code(&self) -> u16 {
        match self {
            DecodeError::Version { .. } => error_codes::VERSION_MISMATCH,
            DecodeError::UnknownTag { .. } => error_codes::UNKNOWN_TAG,
            DecodeError::Reentrant { .. } => error_codes::DECODE_FAULT,
            DecodeError::Symbol(err) => err.code(),
            _ => error_codes::BAD_SIGNATURE,
        }
    }

    /// The error a lazy completer hands back to the symbol table
    pub fn into_symbol_error(self, file: &str) -> SymbolError {
        match self {
            DecodeError::Symbol(err @ SymbolError::MissingRequirement { .. }) => err,
            DecodeError::Symbol(err @ SymbolError::CyclicReference { .. }) => err,
            other => SymbolError::BadSignature {
                message: format!("error reading Scala signature of {}: {}", file, other),
            },
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { at } => write!(f, "unexpected end of signature at byte {}", at),
            DecodeError::Version { major, minor } => write!(
                f,
                "wrong version\n expected: {}.{}\n found: {}.{}",
                super::format::MAJOR_VERSION,
                super::format::MINOR_VERSION,
                major,
                minor
            ),
            DecodeError::UnknownTag { tag, index } => {
                write!(f, "unexpected tag {} ({}) in entry {}", tag, super::format::tag_name(*tag), index)
            }
            DecodeError::BadRef { index } => write!(f, "reference to missing entry {}", index),
            DecodeError::Malformed(msg) => write!(f, "{}", msg),
            DecodeError::Reentrant { index } => write!(f, "entry {} refers to itself", index),
            DecodeError::Symbol(err) => write!(f, "{}", err),
        }
    }
}

impl From<SymbolError> for DecodeError {
    fn from(err: SymbolError) -> Self {
        DecodeError::Symbol(err)
    }
}

/// Public error of `unpickle` and of the pickle writer
#[derive(Debug, Clone, PartialEq)]
pub enum PickleError {
    /// The signature of `file` could not be read
    Signature { file: String, code: u16, message: String },
    /// A stub for a missing dependency was used while reading
    Missing(SymbolError),
    /// Any other symbol table failure met outside of decoding
    Symbol(SymbolError),
    /// The caller broke a precondition (roots, offsets)
    Precondition(String),
    /// The writer met a type or symbol the format cannot express
    Unpicklable(String),
}

impl PickleError {
    pub fn code(&self) -> u16 {
        match self {
            PickleError::Signature { code, .. } => *code,
            PickleError::Missing(err) | PickleError::Symbol(err) => err.code(),
            PickleError::Precondition(_) => error_codes::INTERNAL,
            PickleError::Unpicklable(_) => error_codes::BAD_SIGNATURE,
        }
    }

    pub fn is_missing_requirement(&self) -> bool {
        matches!(self, PickleError::Missing(_))
    }

    /// Wrap a decode failure of `file`
    pub(crate) fn from_decode(err: DecodeError, file: &str) -> Self {
        match err {
            DecodeError::Symbol(err @ SymbolError::MissingRequirement { .. }) => PickleError::Missing(err),
            other => PickleError::Signature {
                file: file.to_string(),
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for PickleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickleError::Signature { file, code, message } => {
                write!(
                    f,
                    "{}: error reading Scala signature of {}: {}",
                    error_codes::format_error_code(*code),
                    file,
                    message
                )
            }
            PickleError::Missing(err) | PickleError::Symbol(err) => write!(f, "{}", err),
            PickleError::Precondition(msg) => write!(f, "invalid unpickle request: {}", msg),
            PickleError::Unpicklable(msg) => write!(f, "cannot pickle {}", msg),
        }
    }
}

impl std::error::Error for PickleError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::SymbolId;

    #[test]
    fn test_missing_requirement_passes_through() {
        let missing = SymbolError::MissingRequirement {
            sym: SymbolId::from_raw(4),
            message: "gone".to_string(),
        };
        let err = PickleError::from_decode(DecodeError::Symbol(missing.clone()), "A.class");
        assert_eq!(err, PickleError::Missing(missing));
        assert!(err.is_missing_requirement());
    }

    #[test]
    fn test_signature_wrapping_names_file() {
        let err = PickleError::from_decode(DecodeError::UnknownTag { tag: 99, index: 3 }, "A.class");
        assert_eq!(err.code(), error_codes::UNKNOWN_TAG);
        let text = err.to_string();
        assert!(text.starts_with("E4103: error reading Scala signature of A.class"));
        assert!(text.contains("unexpected tag 99"));
    }

    #[test]
    fn test_into_symbol_error() {
        let err = DecodeError::Truncated { at: 12 }.into_symbol_error("B.class");
        match err {
            SymbolError::BadSignature { message } => {
                assert!(message.contains("B.class"));
                assert!(message.contains("byte 12"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
