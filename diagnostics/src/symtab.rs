//! Symbol table and signature diagnostic builders
//!
//! This module provides helper functions for the diagnostics produced while
//! completing symbols and reading signature files.

use crate::{Diagnostic, DiagnosticBuilder, Position};

/// Provides common symbol table diagnostic builders
pub struct SymtabDiagnostics;

impl SymtabDiagnostics {
    /// Illegal cyclic reference while completing a symbol
    pub fn cyclic_reference(pos: Position, symbol: &str, trace: &[String]) -> Diagnostic {
        let mut builder =
            DiagnosticBuilder::error(format!("illegal cyclic reference involving {}", symbol), pos)
                .code("E2101")
                .symbol(symbol);

        if !trace.is_empty() {
            builder = builder.note(format!("lock trace: {}", trace.join(" -> ")));
        }

        builder.build()
    }

    /// A stub symbol was used in place of a missing dependency
    ///
    /// The message is taken verbatim; it already names the file and the
    /// module that may be missing.
    pub fn missing_requirement(pos: Position, message: &str) -> Diagnostic {
        DiagnosticBuilder::error(message, pos)
            .code("E2102")
            .build()
    }

    /// A signature file could not be read; `code` is that of the cause
    pub fn bad_signature(file: &str, code: &str, detail: &str) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("error reading signature of {}: {}", file, detail),
            Position::NONE,
        )
        .code(code)
        .file(file)
        .help(format!("a full rebuild may help if '{}' is stale", file))
        .build()
    }

    /// Development warning emitted when a stub symbol defers an error
    pub fn deferred_stub(owner: &str, name: &str) -> Diagnostic {
        DiagnosticBuilder::warning(
            format!("creating stub symbol to defer error for {}.{}", owner, name),
            Position::NONE,
        )
        .code("W2101")
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagnosticSeverity;

    #[test]
    fn test_cyclic_reference_carries_trace() {
        let d = SymtabDiagnostics::cyclic_reference(
            Position::NONE,
            "class A",
            &["class A".to_string(), "type T".to_string()],
        );
        assert_eq!(d.code.as_deref(), Some("E2101"));
        assert_eq!(d.symbol.as_deref(), Some("class A"));
        assert_eq!(d.notes, vec!["lock trace: class A -> type T"]);
    }

    #[test]
    fn test_bad_signature_names_file() {
        let d = SymtabDiagnostics::bad_signature("Foo.class", "E4103", "unknown tag 99");
        assert_eq!(d.severity, DiagnosticSeverity::Error);
        assert_eq!(d.code.as_deref(), Some("E4103"));
        assert!(d.message.contains("Foo.class"));
        assert_eq!(d.file.as_deref(), Some("Foo.class"));
    }
}
