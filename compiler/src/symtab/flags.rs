//! Symbol Flags
//!
//! A symbol's modifiers and compiler-internal markers live in one 64-bit
//! word. Bits below `LATE_SHIFT` are ordinary flags. "Late" bits are a
//! shifted copy of an ordinary flag that only becomes visible once the
//! current phase's flag mask admits it, and "anti" bits cancel an ordinary
//! flag the same way. Some bits are deliberately shared by flags that can
//! never apply to the same kind of symbol (e.g. `COVARIANT`/`BYNAMEPARAM`).
//!
//! The pickled encoding of the low twelve bits differs from the in-memory
//! one; `PickledFlagTable` translates between the two.

use std::fmt;

/// Bitflags for symbol properties
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u64);

impl Flags {
    pub const NONE: Self = Self(0);

    pub const PROTECTED: Self = Self(1 << 0);
    pub const OVERRIDE: Self = Self(1 << 1);
    pub const PRIVATE: Self = Self(1 << 2);
    pub const ABSTRACT: Self = Self(1 << 3);
    pub const DEFERRED: Self = Self(1 << 4);
    pub const FINAL: Self = Self(1 << 5);
    pub const METHOD: Self = Self(1 << 6);
    pub const INTERFACE: Self = Self(1 << 7);
    pub const MODULE: Self = Self(1 << 8);
    pub const IMPLICIT: Self = Self(1 << 9);
    pub const SEALED: Self = Self(1 << 10);
    pub const CASE: Self = Self(1 << 11);
    pub const MUTABLE: Self = Self(1 << 12);
    pub const PARAM: Self = Self(1 << 13);
    pub const PACKAGE: Self = Self(1 << 14);
    pub const MACRO: Self = Self(1 << 15);
    pub const COVARIANT: Self = Self(1 << 16);
    pub const BYNAMEPARAM: Self = Self(1 << 16);
    pub const CONTRAVARIANT: Self = Self(1 << 17);
    pub const LABEL: Self = Self(1 << 17);
    pub const ABSOVERRIDE: Self = Self(1 << 18);
    pub const LOCAL: Self = Self(1 << 19);
    pub const JAVA: Self = Self(1 << 20);
    pub const SYNTHETIC: Self = Self(1 << 21);
    pub const STABLE: Self = Self(1 << 22);
    pub const STATIC: Self = Self(1 << 23);
    pub const CASEACCESSOR: Self = Self(1 << 24);
    pub const TRAIT: Self = Self(1 << 25);
    pub const DEFAULTPARAM: Self = Self(1 << 25);
    pub const BRIDGE: Self = Self(1 << 26);
    pub const ACCESSOR: Self = Self(1 << 27);
    pub const SUPERACCESSOR: Self = Self(1 << 28);
    pub const PARAMACCESSOR: Self = Self(1 << 29);
    pub const MODULEVAR: Self = Self(1 << 30);
    pub const LAZY: Self = Self(1 << 31);
    pub const IS_ERROR: Self = Self(1 << 32);
    pub const OVERLOADED: Self = Self(1 << 33);
    pub const LIFTED: Self = Self(1 << 34);
    pub const EXISTENTIAL: Self = Self(1 << 35);
    pub const MIXEDIN: Self = Self(1 << 35);
    pub const EXPANDEDNAME: Self = Self(1 << 36);
    pub const PRESUPER: Self = Self(1 << 37);
    pub const TRANS_FLAG: Self = Self(1 << 38);
    pub const INCONSTRUCTOR: Self = Self(1 << 38);
    pub const LOCKED: Self = Self(1 << 39);
    pub const SPECIALIZED: Self = Self(1 << 40);
    pub const DEFAULTINIT: Self = Self(1 << 41);
    pub const VBRIDGE: Self = Self(1 << 42);
    pub const VARARGS: Self = Self(1 << 43);
    pub const TRIEDCOOKING: Self = Self(1 << 44);
    pub const SYNCHRONIZED: Self = Self(1 << 45);
    pub const ARTIFACT: Self = Self(1 << 46);

    /// Flags visible from the very first phase
    pub const INITIAL_FLAGS: Self = Self(0x0000_7FFF_FFFF_FFFF);
    /// Shifted copies of ordinary flags that only appear in later phases
    pub const LATE_FLAGS: Self = Self(0x00FF_8000_0000_0000);
    /// Shifted copies of ordinary flags that cancel them in later phases
    pub const ANTI_FLAGS: Self = Self(0x7F00_0000_0000_0000);
    pub const LATE_SHIFT: u32 = 47;
    pub const ANTI_SHIFT: u32 = 56;

    pub const LATE_PRIVATE: Self = Self(Self::PRIVATE.0 << Self::LATE_SHIFT);
    pub const LATE_DEFERRED: Self = Self(Self::DEFERRED.0 << Self::LATE_SHIFT);
    pub const LATE_FINAL: Self = Self(Self::FINAL.0 << Self::LATE_SHIFT);
    pub const LATE_METHOD: Self = Self(Self::METHOD.0 << Self::LATE_SHIFT);
    pub const LATE_INTERFACE: Self = Self(Self::INTERFACE.0 << Self::LATE_SHIFT);
    pub const LATE_MODULE: Self = Self(Self::MODULE.0 << Self::LATE_SHIFT);

    pub const NOT_PROTECTED: Self = Self(Self::PROTECTED.0 << Self::ANTI_SHIFT);
    pub const NOT_OVERRIDE: Self = Self(Self::OVERRIDE.0 << Self::ANTI_SHIFT);
    pub const NOT_PRIVATE: Self = Self(Self::PRIVATE.0 << Self::ANTI_SHIFT);

    /// Flags that only make sense inside one compiler run and are never pickled
    pub const FLAGS_NOT_PICKLED: Self = Self(
        Self::IS_ERROR.0
            | Self::OVERLOADED.0
            | Self::LIFTED.0
            | Self::TRANS_FLAG.0
            | Self::LOCKED.0
            | Self::TRIEDCOOKING.0,
    );
    pub const PICKLED_FLAGS: Self = Self(Self::INITIAL_FLAGS.0 & !Self::FLAGS_NOT_PICKLED.0);

    /// Flags a clone never inherits from its original
    pub const NOT_CLONED: Self = Self(Self::LOCKED.0);

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn empty() -> Self {
        Self::NONE
    }

    /// True if any bit of `flag` is set
    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    /// True if every bit of `flag` is set
    pub const fn contains_all(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    pub const fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub const fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The flags observable under a phase whose accumulated mask is `mask`.
    ///
    /// Late bits admitted by the mask are promoted to their ordinary
    /// position; admitted anti bits cancel theirs.
    pub const fn visible_under(self, mask: Self) -> Self {
        let fs = self.0 & mask.0;
        let promoted = fs | ((fs & Self::LATE_FLAGS.0) >> Self::LATE_SHIFT);
        Self(promoted & !((fs & Self::ANTI_FLAGS.0) >> Self::ANTI_SHIFT))
    }

    /// Resolve a flag by its name, as used in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        FLAG_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, f)| f)
    }

    /// Names of the set flags, in bit order
    pub fn names(self) -> Vec<&'static str> {
        let mut seen = 0u64;
        let mut out = Vec::new();
        for &(name, flag) in FLAG_NAMES {
            if self.contains_all(flag) && seen & flag.0 == 0 {
                seen |= flag.0;
                out.push(name);
            }
        }
        out
    }
}

impl std::ops::BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl std::ops::BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl std::ops::Sub for Flags {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl std::ops::Not for Flags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flags({:#x} {})", self.0, self.names().join(" | "))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" "))
    }
}

/// Flag names for configuration and display; the first name wins for shared bits
const FLAG_NAMES: &[(&str, Flags)] = &[
    ("protected", Flags::PROTECTED),
    ("override", Flags::OVERRIDE),
    ("private", Flags::PRIVATE),
    ("abstract", Flags::ABSTRACT),
    ("deferred", Flags::DEFERRED),
    ("final", Flags::FINAL),
    ("method", Flags::METHOD),
    ("interface", Flags::INTERFACE),
    ("module", Flags::MODULE),
    ("implicit", Flags::IMPLICIT),
    ("sealed", Flags::SEALED),
    ("case", Flags::CASE),
    ("mutable", Flags::MUTABLE),
    ("param", Flags::PARAM),
    ("package", Flags::PACKAGE),
    ("macro", Flags::MACRO),
    ("covariant", Flags::COVARIANT),
    ("bynameparam", Flags::BYNAMEPARAM),
    ("contravariant", Flags::CONTRAVARIANT),
    ("label", Flags::LABEL),
    ("absoverride", Flags::ABSOVERRIDE),
    ("local", Flags::LOCAL),
    ("java", Flags::JAVA),
    ("synthetic", Flags::SYNTHETIC),
    ("stable", Flags::STABLE),
    ("static", Flags::STATIC),
    ("caseaccessor", Flags::CASEACCESSOR),
    ("trait", Flags::TRAIT),
    ("defaultparam", Flags::DEFAULTPARAM),
    ("bridge", Flags::BRIDGE),
    ("accessor", Flags::ACCESSOR),
    ("superaccessor", Flags::SUPERACCESSOR),
    ("paramaccessor", Flags::PARAMACCESSOR),
    ("modulevar", Flags::MODULEVAR),
    ("lazy", Flags::LAZY),
    ("is_error", Flags::IS_ERROR),
    ("overloaded", Flags::OVERLOADED),
    ("lifted", Flags::LIFTED),
    ("existential", Flags::EXISTENTIAL),
    ("expandedname", Flags::EXPANDEDNAME),
    ("presuper", Flags::PRESUPER),
    ("trans_flag", Flags::TRANS_FLAG),
    ("locked", Flags::LOCKED),
    ("specialized", Flags::SPECIALIZED),
    ("defaultinit", Flags::DEFAULTINIT),
    ("vbridge", Flags::VBRIDGE),
    ("varargs", Flags::VARARGS),
    ("triedcooking", Flags::TRIEDCOOKING),
    ("synchronized", Flags::SYNCHRONIZED),
    ("artifact", Flags::ARTIFACT),
    ("late_private", Flags::LATE_PRIVATE),
    ("late_deferred", Flags::LATE_DEFERRED),
    ("late_final", Flags::LATE_FINAL),
    ("late_method", Flags::LATE_METHOD),
    ("late_interface", Flags::LATE_INTERFACE),
    ("late_module", Flags::LATE_MODULE),
    ("not_protected", Flags::NOT_PROTECTED),
    ("not_override", Flags::NOT_OVERRIDE),
    ("not_private", Flags::NOT_PRIVATE),
];

/// Translation between the pickled and the in-memory flag encodings.
///
/// Only the low twelve bits are permuted; everything above passes through.
#[derive(Debug, Clone)]
pub struct PickledFlagTable {
    /// Pickled bit position -> in-memory flag
    pickled_to_raw: [Flags; 12],
}

impl PickledFlagTable {
    const MASK: u64 = 0x0FFF;

    /// The table used by format version 5.x
    pub const V5: PickledFlagTable = PickledFlagTable {
        pickled_to_raw: [
            Flags::IMPLICIT,
            Flags::FINAL,
            Flags::PRIVATE,
            Flags::PROTECTED,
            Flags::SEALED,
            Flags::OVERRIDE,
            Flags::CASE,
            Flags::ABSTRACT,
            Flags::DEFERRED,
            Flags::METHOD,
            Flags::MODULE,
            Flags::INTERFACE,
        ],
    };

    /// Pick the translation table for a format version
    pub fn for_version(major: u32, _minor: u32) -> Option<&'static PickledFlagTable> {
        match major {
            5 => Some(&Self::V5),
            _ => None,
        }
    }

    pub fn pickled_to_raw(&self, pickled: u64) -> Flags {
        let mut raw = pickled & !Self::MASK;
        for (bit, flag) in self.pickled_to_raw.iter().enumerate() {
            if pickled & (1 << bit) != 0 {
                raw |= flag.0;
            }
        }
        Flags(raw)
    }

    pub fn raw_to_pickled(&self, raw: Flags) -> u64 {
        let raw = raw.intersection(Flags::PICKLED_FLAGS).0;
        let mut pickled = raw & !Self::MASK;
        for (bit, flag) in self.pickled_to_raw.iter().enumerate() {
            if raw & flag.0 != 0 {
                pickled |= 1 << bit;
            }
        }
        pickled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_flags() {
        let mut flags = Flags::empty();
        assert!(flags.is_empty());

        flags.insert(Flags::FINAL);
        assert!(flags.contains(Flags::FINAL));
        assert!(!flags.contains(Flags::PRIVATE));

        flags.insert(Flags::PRIVATE);
        assert!(flags.contains_all(Flags::FINAL | Flags::PRIVATE));

        flags.remove(Flags::FINAL);
        assert!(!flags.contains(Flags::FINAL));
        assert!(flags.contains(Flags::PRIVATE));
    }

    #[test]
    fn test_late_flags_need_mask() {
        let raw = Flags::LATE_MODULE;
        assert!(!raw.visible_under(Flags::INITIAL_FLAGS).contains(Flags::MODULE));
        let later = Flags::INITIAL_FLAGS | Flags::LATE_MODULE;
        assert!(raw.visible_under(later).contains(Flags::MODULE));
    }

    #[test]
    fn test_anti_flags_cancel() {
        let raw = Flags::PROTECTED | Flags::NOT_PROTECTED;
        assert!(raw.visible_under(Flags::INITIAL_FLAGS).contains(Flags::PROTECTED));
        let later = Flags::INITIAL_FLAGS | Flags::NOT_PROTECTED;
        assert!(!raw.visible_under(later).contains(Flags::PROTECTED));
    }

    #[test]
    fn test_pickled_translation_permutes_low_bits() {
        let table = PickledFlagTable::for_version(5, 0).unwrap();
        assert_eq!(table.pickled_to_raw(1), Flags::IMPLICIT);
        assert_eq!(table.pickled_to_raw(1 << 10), Flags::MODULE);
        let raw = Flags::MODULE | Flags::FINAL | Flags::SYNTHETIC;
        let pickled = table.raw_to_pickled(raw);
        assert_eq!(table.pickled_to_raw(pickled), raw);
    }

    #[test]
    fn test_unpicklable_flags_are_dropped() {
        let table = &PickledFlagTable::V5;
        let raw = Flags::LOCKED | Flags::OVERLOADED | Flags::CASE;
        assert_eq!(table.pickled_to_raw(table.raw_to_pickled(raw)), Flags::CASE);
        assert!(PickledFlagTable::for_version(4, 0).is_none());
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(Flags::from_name("late_module"), Some(Flags::LATE_MODULE));
        assert_eq!(Flags::from_name("Final"), Some(Flags::FINAL));
        assert_eq!(Flags::from_name("bogus"), None);
        assert_eq!((Flags::FINAL | Flags::CASE).names(), vec!["final", "case"]);
    }
}
