//! Name Interning for the Symbol Table
//!
//! Names are interned strings tagged with a namespace. The same spelling in
//! the term and the type namespace shares one interned string but compares
//! unequal as a `Name`. Features:
//! - O(1) comparison via id comparison
//! - Cheap namespace conversion (`to_type_name`/`to_term_name`)
//! - Well-known names pre-interned at fixed ids so they can be `const`

use fxhash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Which namespace a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Term,
    Type,
}

/// An interned name in either the term or the type namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    id: u32,
    namespace: Namespace,
}

impl Name {
    const fn term(id: u32) -> Self {
        Self { id, namespace: Namespace::Term }
    }

    const fn tpe(id: u32) -> Self {
        Self { id, namespace: Namespace::Type }
    }

    pub const fn namespace(self) -> Namespace {
        self.namespace
    }

    pub const fn is_type_name(self) -> bool {
        matches!(self.namespace, Namespace::Type)
    }

    pub const fn is_term_name(self) -> bool {
        matches!(self.namespace, Namespace::Term)
    }

    pub const fn to_type_name(self) -> Name {
        Name::tpe(self.id)
    }

    pub const fn to_term_name(self) -> Name {
        Name::term(self.id)
    }

    /// Same spelling, ignoring the namespace
    pub const fn same_spelling(self, other: Name) -> bool {
        self.id == other.id
    }

    pub const fn as_raw(self) -> u32 {
        self.id
    }

    /// "type" or "term", used in missing-requirement messages
    pub const fn kind_str(self) -> &'static str {
        match self.namespace {
            Namespace::Term => "term",
            Namespace::Type => "type",
        }
    }
}

macro_rules! well_known_names {
    ($($konst:ident = $text:expr;)*) => {
        const WELL_KNOWN: &[&str] = &[$($text),*];

        /// Names every table knows about, interned at fixed ids.
        pub mod nme {
            use super::Name;
            well_known_names!(@consts 0u32; $($konst)*);
        }
    };
    (@consts $n:expr; $konst:ident $($rest:ident)*) => {
        pub const $konst: Name = Name::term($n);
        well_known_names!(@consts $n + 1u32; $($rest)*);
    };
    (@consts $n:expr;) => {};
}

well_known_names! {
    NO_NAME = "<none>";
    ROOT = "<root>";
    ROOTPKG = "_root_";
    EMPTY_PACKAGE = "<empty>";
    REFINE_CLASS = "<refinement>";
    LOCAL_CHILD = "<local child>";
    CONSTRUCTOR = "<init>";
    PACKAGE = "package";
    THIS = "this";
    ERROR = "<error>";
    WILDCARD = "_";
    EXPAND_SEPARATOR = "$$";
}

/// Prefix shared by all local dummy names (`<local Foo>`)
pub const LOCAL_DUMMY_PREFIX: &str = "<local ";

/// Name interner owned by a `SymbolTable`
///
/// Strings are stored once and shared between the forward map and the
/// reverse list.
pub struct NameTable {
    ids: FxHashMap<Rc<str>, u32>,
    strings: Vec<Rc<str>>,
}

impl NameTable {
    /// Create a table with all well-known names pre-interned
    pub fn new() -> Self {
        let mut table = Self {
            ids: FxHashMap::default(),
            strings: Vec::with_capacity(WELL_KNOWN.len() * 8),
        };
        for text in WELL_KNOWN {
            table.intern(text);
        }
        table
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        let shared: Rc<str> = Rc::from(s);
        self.strings.push(shared.clone());
        self.ids.insert(shared, id);
        id
    }

    pub fn term_name(&mut self, s: &str) -> Name {
        Name::term(self.intern(s))
    }

    pub fn type_name(&mut self, s: &str) -> Name {
        Name::tpe(self.intern(s))
    }

    /// Intern `s` in the namespace of `like`
    pub fn name_like(&mut self, s: &str, like: Name) -> Name {
        match like.namespace() {
            Namespace::Term => self.term_name(s),
            Namespace::Type => self.type_name(s),
        }
    }

    /// Look up a name without interning it
    pub fn lookup(&self, s: &str, namespace: Namespace) -> Option<Name> {
        self.ids.get(s).map(|&id| Name { id, namespace })
    }

    pub fn as_str(&self, name: Name) -> &str {
        self.strings
            .get(name.id as usize)
            .map(|s| &**s)
            .unwrap_or("<unknown>")
    }

    pub fn is_local_dummy_name(&self, name: Name) -> bool {
        self.as_str(name).starts_with(LOCAL_DUMMY_PREFIX)
    }

    /// Number of distinct spellings interned so far
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameTable")
            .field("unique_names", &self.strings.len())
            .finish()
    }
}
