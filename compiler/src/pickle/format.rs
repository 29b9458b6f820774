//! Signature pickle format, version 5.2
//!
//! # Layout
//!
//! ```text
//! Pickle    = MajorVersion_Nat MinorVersion_Nat NumEntries_Nat {Entry}
//! Entry     = Tag_Byte Length_Nat Payload
//! Ref       = Nat                       (index of another entry)
//! ```
//!
//! Nats are stored in big-endian groups of seven bits, every byte but the
//! last with its high bit set. Long values (constants, flags) are stored as
//! the minimal big-endian two's complement bytes filling the entry payload.

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

pub const MAJOR_VERSION: u32 = 5;
pub const MINOR_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Entry tags
// ---------------------------------------------------------------------------

pub const TERM_NAME: u8 = 1;
pub const TYPE_NAME: u8 = 2;
pub const NONE_SYM: u8 = 3;
pub const TYPE_SYM: u8 = 4;
pub const ALIAS_SYM: u8 = 5;
pub const CLASS_SYM: u8 = 6;
pub const MODULE_SYM: u8 = 7;
pub const VAL_SYM: u8 = 8;
pub const EXT_REF: u8 = 9;
pub const EXT_MOD_CLASS_REF: u8 = 10;
pub const NO_TPE: u8 = 11;
pub const NO_PREFIX_TPE: u8 = 12;
pub const THIS_TPE: u8 = 13;
pub const SINGLE_TPE: u8 = 14;
pub const CONSTANT_TPE: u8 = 15;
pub const TYPEREF_TPE: u8 = 16;
pub const TYPEBOUNDS_TPE: u8 = 17;
pub const REFINED_TPE: u8 = 18;
pub const CLASSINFO_TPE: u8 = 19;
pub const METHOD_TPE: u8 = 20;
pub const POLY_TPE: u8 = 21;
pub const IMPLICIT_METHOD_TPE: u8 = 22;

pub const LITERAL: u8 = 23;
pub const LITERAL_UNIT: u8 = 24;
pub const LITERAL_BOOLEAN: u8 = 25;
pub const LITERAL_BYTE: u8 = 26;
pub const LITERAL_SHORT: u8 = 27;
pub const LITERAL_CHAR: u8 = 28;
pub const LITERAL_INT: u8 = 29;
pub const LITERAL_LONG: u8 = 30;
pub const LITERAL_FLOAT: u8 = 31;
pub const LITERAL_DOUBLE: u8 = 32;
pub const LITERAL_STRING: u8 = 33;
pub const LITERAL_NULL: u8 = 34;
pub const LITERAL_CLASS: u8 = 35;
pub const LITERAL_ENUM: u8 = 36;

pub const SYMANNOT: u8 = 40;
pub const CHILDREN: u8 = 41;
pub const ANNOTATED_TPE: u8 = 42;
pub const ANNOT_INFO: u8 = 43;
pub const ANNOT_ARG_ARRAY: u8 = 44;
pub const SUPER_TPE: u8 = 46;
pub const DEBRUIJN_INDEX_TPE: u8 = 47;
pub const EXISTENTIAL_TPE: u8 = 48;
pub const TREE: u8 = 49;
pub const MODIFIERS: u8 = 50;

const FIRST_SYM_TAG: u8 = NONE_SYM;
const LAST_SYM_TAG: u8 = VAL_SYM;
const LAST_EXT_SYM_TAG: u8 = EXT_MOD_CLASS_REF;

pub fn is_name_tag(tag: u8) -> bool {
    tag == TERM_NAME || tag == TYPE_NAME
}

/// Entries that define a symbol (as opposed to referring to one)
pub fn is_symbol_def_tag(tag: u8) -> bool {
    (FIRST_SYM_TAG..=LAST_SYM_TAG).contains(&tag)
}

/// Entries that decode to a symbol, external references included
pub fn is_symbol_tag(tag: u8) -> bool {
    (FIRST_SYM_TAG..=LAST_EXT_SYM_TAG).contains(&tag)
}

pub fn is_type_tag(tag: u8) -> bool {
    matches!(tag, NO_TPE..=IMPLICIT_METHOD_TPE | ANNOTATED_TPE | SUPER_TPE | DEBRUIJN_INDEX_TPE | EXISTENTIAL_TPE)
}

pub fn is_constant_tag(tag: u8) -> bool {
    (LITERAL_UNIT..=LITERAL_ENUM).contains(&tag)
}

/// Human-readable tag name for diagnostics and dumps
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        TERM_NAME => "TERMname",
        TYPE_NAME => "TYPEname",
        NONE_SYM => "NONEsym",
        TYPE_SYM => "TYPEsym",
        ALIAS_SYM => "ALIASsym",
        CLASS_SYM => "CLASSsym",
        MODULE_SYM => "MODULEsym",
        VAL_SYM => "VALsym",
        EXT_REF => "EXTref",
        EXT_MOD_CLASS_REF => "EXTMODCLASSref",
        NO_TPE => "NOtpe",
        NO_PREFIX_TPE => "NOPREFIXtpe",
        THIS_TPE => "THIStpe",
        SINGLE_TPE => "SINGLEtpe",
        CONSTANT_TPE => "CONSTANTtpe",
        TYPEREF_TPE => "TYPEREFtpe",
        TYPEBOUNDS_TPE => "TYPEBOUNDStpe",
        REFINED_TPE => "REFINEDtpe",
        CLASSINFO_TPE => "CLASSINFOtpe",
        METHOD_TPE => "METHODtpe",
        POLY_TPE => "POLYtpe",
        IMPLICIT_METHOD_TPE => "IMPLICITMETHODtpe",
        LITERAL_UNIT => "LITERALunit",
        LITERAL_BOOLEAN => "LITERALboolean",
        LITERAL_BYTE => "LITERALbyte",
        LITERAL_SHORT => "LITERALshort",
        LITERAL_CHAR => "LITERALchar",
        LITERAL_INT => "LITERALint",
        LITERAL_LONG => "LITERALlong",
        LITERAL_FLOAT => "LITERALfloat",
        LITERAL_DOUBLE => "LITERALdouble",
        LITERAL_STRING => "LITERALstring",
        LITERAL_NULL => "LITERALnull",
        LITERAL_CLASS => "LITERALclass",
        LITERAL_ENUM => "LITERALenum",
        SYMANNOT => "SYMANNOT",
        CHILDREN => "CHILDREN",
        ANNOTATED_TPE => "ANNOTATEDtpe",
        ANNOT_INFO => "ANNOTINFO",
        ANNOT_ARG_ARRAY => "ANNOTARGARRAY",
        SUPER_TPE => "SUPERtpe",
        DEBRUIJN_INDEX_TPE => "DEBRUIJNINDEXtpe",
        EXISTENTIAL_TPE => "EXISTENTIALtpe",
        TREE => "TREE",
        MODIFIERS => "MODIFIERS",
        _ => "<unknown>",
    }
}
