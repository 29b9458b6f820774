//! Error codes of the symbol table core
//!
//! - E2xxx: symbols and completion
//! - E4xxx: signature pickles
//! - E6xxx: configuration
//! - E9xxx: internal faults
//!
//! Every diagnostic the crate reports goes through `annotate`, which adds
//! the registered description and help text for its code.

use diagnostics::Diagnostic;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: u16,
    pub description: &'static str,
    pub help: Option<&'static str>,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_error_code(self.code), self.description)
    }
}

pub const CYCLIC_REFERENCE: u16 = 2101;
pub const MISSING_REQUIREMENT: u16 = 2102;
pub const OWNER_CYCLE: u16 = 2103;
pub const BAD_SIGNATURE: u16 = 4101;
pub const VERSION_MISMATCH: u16 = 4102;
pub const UNKNOWN_TAG: u16 = 4103;
pub const DECODE_FAULT: u16 = 4104;
pub const CONFIG_IO: u16 = 6001;
pub const CONFIG_PARSE: u16 = 6002;
pub const CONFIG_UNKNOWN_FLAG: u16 = 6003;
pub const NO_PROGRESS: u16 = 9001;
pub const INTERNAL: u16 = 9002;

const fn code(code: u16, description: &'static str, help: Option<&'static str>) -> ErrorCode {
    ErrorCode { code, description, help }
}

/// Sorted by code
static CODES: [ErrorCode; 12] = [
    code(
        CYCLIC_REFERENCE,
        "illegal cyclic reference",
        Some("a symbol's info depends on itself; break the cycle or raise `recursion-limit`"),
    ),
    code(
        MISSING_REQUIREMENT,
        "symbol is missing from the classpath",
        Some("add the dependency that defines the symbol, or rebuild stale artifacts"),
    ),
    code(OWNER_CYCLE, "owner transplant would create a cycle", None),
    code(BAD_SIGNATURE, "malformed signature", None),
    code(
        VERSION_MISMATCH,
        "unsupported signature version",
        Some("the file was written by an incompatible compiler"),
    ),
    code(UNKNOWN_TAG, "unknown entry tag", None),
    code(DECODE_FAULT, "inconsistent entry table", None),
    code(CONFIG_IO, "cannot read configuration file", None),
    code(CONFIG_PARSE, "invalid configuration", None),
    code(
        CONFIG_UNKNOWN_FLAG,
        "unknown flag name",
        Some("flag names are lower case, e.g. \"deferred\" or \"lateinterface\""),
    ),
    code(NO_PROGRESS, "no progress in completing a symbol", None),
    code(INTERNAL, "internal consistency fault", None),
];

pub fn lookup(code: u16) -> Option<&'static ErrorCode> {
    CODES
        .binary_search_by_key(&code, |c| c.code)
        .ok()
        .map(|i| &CODES[i])
}

/// 2101 -> "E2101"
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// "E2101" -> 2101
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}

/// Add the description and help registered for the diagnostic's code
pub fn annotate(mut diagnostic: Diagnostic) -> Diagnostic {
    let Some(entry) = diagnostic.code.as_deref().and_then(parse_error_code).and_then(lookup) else {
        return diagnostic;
    };
    diagnostic.notes.push(entry.to_string());
    if let Some(help) = entry.help {
        diagnostic.help.push(help.to_string());
    }
    diagnostic
}
