//! Missing dependencies: the missing hook, module advice and stub reporting

use super::errors::{SymbolError, SymbolResult};
use super::flags::Flags;
use super::id_types::SymbolId;
use super::names::Name;
use super::symbols::SymbolKind;
use super::table::SymbolTable;
use diagnostics::symtab::SymtabDiagnostics;

/// Last resort for resolving an external reference that is not a member of
/// its owner. Returns `NoSymbol` when it has nothing to offer.
pub trait MissingHook {
    fn missing(&self, table: &mut SymbolTable, owner: SymbolId, name: Name) -> SymbolId;
}

impl<F> MissingHook for F
where
    F: Fn(&mut SymbolTable, SymbolId, Name) -> SymbolId,
{
    fn missing(&self, table: &mut SymbolTable, owner: SymbolId, name: Name) -> SymbolId {
        self(table, owner, name)
    }
}

/// Which module to suggest when a package prefix goes missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceEntry {
    pub prefix: String,
    pub group: String,
    pub artifact: String,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleAdvice {
    entries: Vec<AdviceEntry>,
}

impl ModuleAdvice {
    /// Modules split out of the standard library
    pub fn builtin() -> Self {
        let mut advice = Self::default();
        advice.add("scala.xml", "org.scala-lang.modules", "scala-xml");
        advice.add("scala.util.parsing", "org.scala-lang.modules", "scala-parser-combinators");
        advice.add("scala.swing", "org.scala-lang.modules", "scala-swing");
        advice.add(
            "scala.util.continuations",
            "org.scala-lang.plugins",
            "scala-continuations-library",
        );
        advice
    }

    pub fn add(&mut self, prefix: impl Into<String>, group: impl Into<String>, artifact: impl Into<String>) {
        self.entries.push(AdviceEntry {
            prefix: prefix.into(),
            group: group.into(),
            artifact: artifact.into(),
        });
    }

    pub fn find(&self, full_name: &str) -> Option<&AdviceEntry> {
        self.entries.iter().find(|e| full_name.starts_with(&e.prefix))
    }

    /// The note appended to a missing-requirement message, or ""
    pub fn advice_for(&self, full_name: &str) -> String {
        match self.find(full_name) {
            Some(entry) => format!(
                "\n(NOTE: It looks like the {art} module is missing; try adding a dependency on \"{group}\" : \"{art}\".\n       See http://docs.scala-lang.org/overviews/ for more information.)",
                art = entry.artifact,
                group = entry.group,
            ),
            None => String::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdviceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolTable {
    /// Ask the installed hook for `owner.name`
    pub fn missing_hook(&mut self, owner: SymbolId, name: Name) -> SymbolId {
        match self.missing_hook.clone() {
            Some(hook) => hook.missing(self, owner, name),
            None => SymbolId::NONE,
        }
    }

    /// Message for a reference to `owner.name` that could not be resolved
    /// while completing `completing` from `file`
    pub fn missing_message(&self, owner: SymbolId, name: Name, completing: SymbolId, file: &str) -> String {
        let owner_name = self.full_name(owner);
        let kind = name.kind_str();
        let text = self.names.as_str(name);
        format!(
            "Symbol '{kind} {owner_name}.{text}' is missing from the classpath.\n\
             This symbol is required by '{required}'.\n\
             Make sure that {kind} {text} is in your classpath and check for conflicting dependencies with `-Ylog-classpath`.\n\
             A full rebuild may help if '{file}' was compiled against an incompatible version of {owner_name}.{advice}",
            required = format!("{} {}", self.kind_string(completing), self.full_name(completing)),
            advice = self.module_advice.advice_for(&owner_name),
        )
    }

    /// Report the first use of a stub. Later uses pass quietly.
    pub(crate) fn stub_failure(&mut self, sym: SymbolId) -> SymbolResult<()> {
        let message = match &self.sym(sym).kind {
            SymbolKind::Stub(data) => data.message.clone(),
            _ => return Ok(()),
        };
        if self.raw_flags(sym).contains(Flags::IS_ERROR) {
            return Ok(());
        }
        self.set_flag(sym, Flags::IS_ERROR);
        let pos = self.pos(sym);
        self.report(SymtabDiagnostics::missing_requirement(pos, &message));
        Err(SymbolError::MissingRequirement { sym, message })
    }

    pub fn stub_message(&self, sym: SymbolId) -> Option<&str> {
        match &self.sym(sym).kind {
            SymbolKind::Stub(data) => Some(&data.message),
            _ => None,
        }
    }
}
