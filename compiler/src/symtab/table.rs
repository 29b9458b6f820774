//! The symbol table: arenas plus the phase and run context
//!
//! `SymbolTable` owns every symbol, type and scope, the interned names, the
//! phase chain and the current period. All symbol behavior is implemented
//! on it (see `symbols`, `history`, `completion`, `owners` and `typeops`),
//! since flags and infos depend on the current phase.

use super::flags::Flags;
use super::history::{Info, InfoTransformers};
use super::id_types::{PhaseId, RunId, ScopeId, SymbolId};
use super::missing::{MissingHook, ModuleAdvice};
use super::names::{nme, NameTable};
use super::phase::{Period, Phase, PhaseChain};
use super::scopes::{ScopeKind, ScopeTable};
use super::symbols::{Symbol, SymbolKind, PACKAGE_FLAGS};
use super::types::{Type, TypeTable};
use crate::error_codes;
use diagnostics::{Diagnostic, LogReporter, Position, Reporter};
use fxhash::FxHashMap;
use std::rc::Rc;

/// Knobs of the completion engine
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// How often a locked symbol may be re-entered; 0 disables re-entry
    pub recursion_limit: u32,
    /// Log stub creation and other developer warnings
    pub debug: bool,
    /// Record the chain of locked symbols for cyclic reference errors
    pub trace_locks: bool,
}

pub struct SymbolTable {
    pub names: NameTable,
    pub types: TypeTable,
    pub scopes: ScopeTable,
    pub settings: Settings,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) phases: PhaseChain,
    pub(crate) run_id: RunId,
    pub(crate) phase_id: PhaseId,
    pub(crate) reporter: Box<dyn Reporter>,
    pub(crate) recursions: FxHashMap<SymbolId, u32>,
    pub(crate) lock_trace: Vec<SymbolId>,
    pub(crate) transformers: InfoTransformers,
    pub(crate) missing_hook: Option<Rc<dyn MissingHook>>,
    pub(crate) module_advice: ModuleAdvice,
    pub(crate) adaptations: FxHashMap<SymbolId, SymbolId>,
    pub(crate) root_class: SymbolId,
    pub(crate) root_package: SymbolId,
    pub(crate) empty_package: SymbolId,
    pub(crate) empty_package_class: SymbolId,
    pub(crate) nothing_class: SymbolId,
    pub(crate) null_class: SymbolId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Create a table with the root package, the root class and the empty
    /// package in place
    pub fn with_settings(settings: Settings) -> Self {
        let phases = PhaseChain::placeholder();
        let mut table = Self {
            names: NameTable::new(),
            types: TypeTable::new(),
            scopes: ScopeTable::new(),
            settings,
            symbols: Vec::with_capacity(1024),
            phase_id: phases.first(),
            phases,
            run_id: 1,
            reporter: Box::new(LogReporter::new()),
            recursions: FxHashMap::default(),
            lock_trace: Vec::new(),
            transformers: InfoTransformers::default(),
            missing_hook: None,
            module_advice: ModuleAdvice::builtin(),
            adaptations: FxHashMap::default(),
            root_class: SymbolId::NONE,
            root_package: SymbolId::NONE,
            empty_package: SymbolId::NONE,
            empty_package_class: SymbolId::NONE,
            nothing_class: SymbolId::NONE,
            null_class: SymbolId::NONE,
        };
        table.symbols.push(Symbol::new(
            SymbolId::NONE,
            SymbolId::NONE,
            nme::NO_NAME,
            Flags::NONE,
            SymbolKind::NoSymbol,
        ));
        table.init_roots();
        table
    }

    fn init_roots(&mut self) {
        let root_class = self.new_class_symbol(SymbolId::NONE, nme::ROOT, Position::NONE, PACKAGE_FLAGS);
        let decls = self.scopes.create(ScopeKind::Package, root_class);
        let info = self.types.class_info(Vec::new(), decls, root_class);
        self.set_info(root_class, info);

        let root_package = self.new_term_symbol(SymbolId::NONE, nme::ROOT, Position::NONE, PACKAGE_FLAGS);
        self.connect_module_to_class(root_package, root_class);
        let tpe = self.types.type_ref(TypeTable::NO_PREFIX, root_class, []);
        self.set_info(root_package, tpe);
        self.root_class = root_class;
        self.root_package = root_package;

        let empty = self.new_package(root_class, nme::EMPTY_PACKAGE);
        self.empty_package = empty;
        self.empty_package_class = self.module_class(empty);
    }

    pub fn sym(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn sym_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Number of symbols created so far, `NoSymbol` included
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn root_class(&self) -> SymbolId {
        self.root_class
    }

    pub fn root_package(&self) -> SymbolId {
        self.root_package
    }

    pub fn empty_package(&self) -> SymbolId {
        self.empty_package
    }

    pub fn empty_package_class(&self) -> SymbolId {
        self.empty_package_class
    }

    // ========================================================================
    // Phases and runs
    // ========================================================================

    pub fn phases(&self) -> &PhaseChain {
        &self.phases
    }

    /// Replace the phase chain; the current phase moves to its first phase
    pub fn install_phases(&mut self, phases: PhaseChain) {
        self.phase_id = phases.first();
        self.phases = phases;
        log::debug!("installed {} phases", self.phases.len() - 1);
    }

    pub fn phase(&self) -> &Phase {
        self.phases.get(self.phase_id)
    }

    pub fn phase_id(&self) -> PhaseId {
        self.phase_id
    }

    pub fn set_phase(&mut self, pid: PhaseId) {
        self.phase_id = pid;
    }

    /// Run `f` with the current phase set to `pid`, restoring it afterwards
    pub fn at_phase<R>(&mut self, pid: PhaseId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.phase_id;
        self.phase_id = pid;
        let result = f(self);
        self.phase_id = saved;
        result
    }

    /// Like `at_phase`, looking the phase up by name
    pub fn at_phase_named<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> Option<R> {
        let pid = self.phases.by_name(name)?.id;
        Some(self.at_phase(pid, f))
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn current_period(&self) -> Period {
        Period::new(self.run_id, self.phase_id)
    }

    /// Start a new compilation run. Symbols survive; their infos are adapted
    /// on first read.
    pub fn new_run(&mut self) -> RunId {
        self.run_id += 1;
        self.recursions.clear();
        self.lock_trace.clear();
        self.phase_id = self.phases.first();
        log::debug!("starting run {}", self.run_id);
        self.run_id
    }

    /// Record that `old` is replaced by `new` from the current run on
    pub fn replace_for_new_run(&mut self, old: SymbolId, new: SymbolId) {
        self.adaptations.insert(old, new);
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn reporter_mut(&mut self) -> &mut dyn Reporter {
        self.reporter.as_mut()
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporter = reporter;
    }

    /// Report `diagnostic` with the description and help of its code
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.report(error_codes::annotate(diagnostic));
    }

    pub fn set_missing_hook(&mut self, hook: Rc<dyn MissingHook>) {
        self.missing_hook = Some(hook);
    }

    pub fn module_advice(&self) -> &ModuleAdvice {
        &self.module_advice
    }

    pub fn module_advice_mut(&mut self) -> &mut ModuleAdvice {
        &mut self.module_advice
    }

    // ========================================================================
    // Direct access
    // ========================================================================

    /// The member scope of `owner`'s newest history entry, if it is a
    /// template type. Nothing is completed.
    pub fn decls_scope_direct(&self, owner: SymbolId) -> Option<ScopeId> {
        let tp = match self.sym(owner).history.as_ref().map(|h| &h.info) {
            Some(Info::Type(tp)) => *tp,
            _ => return None,
        };
        let tp = match self.types.get(tp) {
            Type::Poly { result, .. } => *result,
            _ => tp,
        };
        match self.types.get(tp) {
            Type::ClassInfo { decls, .. } | Type::Refined { decls, .. } => Some(*decls),
            _ => None,
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
