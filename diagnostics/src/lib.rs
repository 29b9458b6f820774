//! Diagnostics for the symbol table and the signature reader
//!
//! Signature files carry no source text, so a diagnostic names the file and
//! the symbol it concerns rather than pointing at a span. Diagnostics flow
//! into a `Reporter`; `StoreReporter` keeps them for the CLI and tests,
//! `LogReporter` forwards them to the `log` facade.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        })
    }
}

/// A position inside a source file. Line 0 means "no position", which is
/// what symbols read from signatures have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const NONE: Position = Position { line: 0, column: 0 };

    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub const fn is_defined(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            f.write_str("<no position>")
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    /// Registered code, e.g. "E4102"
    pub code: Option<String>,
    pub message: String,
    /// Signature or class file being read
    pub file: Option<String>,
    pub pos: Position,
    /// Rendered symbol the diagnostic is about, e.g. "value x"
    pub symbol: Option<String>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

/// Diagnostics in report order
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(DiagnosticSeverity::Error) > 0
    }
}

pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>, pos: Position) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message: message.into(),
                file: None,
                pos,
                symbol: None,
                notes: Vec::new(),
                help: Vec::new(),
            },
        }
    }

    pub fn error(message: impl Into<String>, pos: Position) -> Self {
        Self::new(DiagnosticSeverity::Error, message, pos)
    }

    pub fn warning(message: impl Into<String>, pos: Position) -> Self {
        Self::new(DiagnosticSeverity::Warning, message, pos)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.diagnostic.file = Some(file.into());
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.diagnostic.symbol = Some(symbol.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic.help.push(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Sink for diagnostics as they are produced
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);

    fn report_message(&mut self, pos: Position, message: &str, severity: DiagnosticSeverity) {
        self.report(DiagnosticBuilder::new(severity, message, pos).build());
    }

    fn error_count(&self) -> usize;

    fn warning_count(&self) -> usize;

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Reporter that stores every diagnostic
///
/// Clones share one store, so a caller can keep a handle while the symbol
/// table owns the boxed reporter.
#[derive(Debug, Clone, Default)]
pub struct StoreReporter {
    store: Rc<RefCell<Diagnostics>>,
}

impl StoreReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.store.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.store.borrow().diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.store.borrow_mut().diagnostics.clear();
    }
}

impl Reporter for StoreReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.store.borrow_mut().push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.store.borrow().count(DiagnosticSeverity::Error)
    }

    fn warning_count(&self) -> usize {
        self.store.borrow().count(DiagnosticSeverity::Warning)
    }
}

/// Reporter that forwards to the `log` facade and only keeps counts
#[derive(Debug, Default)]
pub struct LogReporter {
    errors: usize,
    warnings: usize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for LogReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code.as_deref().unwrap_or("-");
        match diagnostic.severity {
            DiagnosticSeverity::Error => {
                self.errors += 1;
                log::error!("[{}] {}", code, diagnostic.message);
            }
            DiagnosticSeverity::Warning => {
                self.warnings += 1;
                log::warn!("[{}] {}", code, diagnostic.message);
            }
            DiagnosticSeverity::Info => log::info!("[{}] {}", code, diagnostic.message),
        }
    }

    fn error_count(&self) -> usize {
        self.errors
    }

    fn warning_count(&self) -> usize {
        self.warnings
    }
}

/// Renders diagnostics for a terminal
///
/// ```text
/// error[E4102]: error reading signature of Old.sig: wrong version
///   --> Old.sig
///   in class Old
///   help: the file was written by an incompatible compiler
///   note: E4102: unsupported signature version
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    /// Wrap `text` in an ANSI color when colors are on
    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics) -> String {
        diagnostics
            .diagnostics
            .iter()
            .map(|d| self.format_diagnostic(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let color = match diagnostic.severity {
            DiagnosticSeverity::Error => "31",
            DiagnosticSeverity::Warning => "33",
            DiagnosticSeverity::Info => "36",
        };
        let mut head = diagnostic.severity.to_string();
        if let Some(code) = &diagnostic.code {
            head.push_str(&format!("[{}]", code));
        }
        let mut out = format!("{}: {}\n", self.paint(color, &head), self.paint("1", &diagnostic.message));

        if let Some(file) = &diagnostic.file {
            let location = if diagnostic.pos.is_defined() {
                format!("{}:{}", file, diagnostic.pos)
            } else {
                file.clone()
            };
            out.push_str(&format!("  {} {}\n", self.paint("96", "-->"), location));
        }
        if let Some(symbol) = &diagnostic.symbol {
            out.push_str(&format!("  in {}\n", symbol));
        }
        for help in &diagnostic.help {
            out.push_str(&format!("  {}: {}\n", self.paint("32", "help"), help));
        }
        for note in &diagnostic.notes {
            out.push_str(&format!("  {}: {}\n", self.paint("34", "note"), note));
        }
        out
    }
}

pub mod symtab;
