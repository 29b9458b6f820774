//! Core ID Types for the Symbol Table
//!
//! This module provides type-safe identifier types used throughout the
//! symbol table. Each ID type is a lightweight wrapper around u32 that
//! prevents mixing up different kinds of identifiers. Symbols, types and
//! member scopes all live in arenas owned by `SymbolTable`, and these ids
//! are the handles into them.

use std::fmt;

/// Trait for ID types that can be created and validated
pub trait IdType: Copy + Clone + PartialEq + Eq + std::hash::Hash + fmt::Debug {
    /// Create a new ID from a raw u32 value
    fn from_raw(raw: u32) -> Self;

    /// Get the raw u32 value of this ID
    fn as_raw(self) -> u32;

    /// Position of this ID inside its arena
    fn index(self) -> usize {
        self.as_raw() as usize
    }
}

/// Macro to define ID types with consistent behavior
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Create a new ID from a raw u32 value
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw u32 value of this ID
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Position of this ID inside its arena
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl IdType for $name {
            fn from_raw(raw: u32) -> Self {
                Self::from_raw(raw)
            }

            fn as_raw(self) -> u32 {
                self.as_raw()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.as_raw()
            }
        }
    };
}

define_id_type! {
    /// Unique identifier for symbols (classes, methods, values, type parameters)
    ///
    /// Ids are handed out in creation order and never reused, so they double
    /// as the final tie-break of every total ordering over symbols. Id 0 is
    /// always the `NoSymbol` sentinel.
    SymbolId
}

define_id_type! {
    /// Unique identifier for types in the `TypeTable`
    ///
    /// Two reads of the same completed info yield the same `TypeId`, which is
    /// what callers use for reference equality.
    TypeId
}

define_id_type! {
    /// Unique identifier for member scopes (class and refinement declarations)
    ScopeId
}

impl SymbolId {
    /// The `NoSymbol` sentinel that roots the owner tree
    pub const NONE: SymbolId = SymbolId(0);

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub const fn exists(self) -> bool {
        self.0 != 0
    }

    /// `self` unless it is `NoSymbol`, in which case `alt()`
    pub fn or_else(self, alt: impl FnOnce() -> SymbolId) -> SymbolId {
        if self.exists() {
            self
        } else {
            alt()
        }
    }
}

/// Identifier of a compilation run. Run 0 means "no run".
pub type RunId = u32;

/// Identifier of a phase inside the phase chain. Phase 0 is `<no phase>`.
pub type PhaseId = u8;
