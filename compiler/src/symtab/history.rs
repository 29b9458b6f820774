//! Type histories and info transformers
//!
//! A symbol's info is a chain of entries, newest first. Each entry records
//! the period from which it is valid. Reading the info at a phase walks back
//! to the entry valid there, and reading it at a later phase runs the
//! registered info transformers for the phases in between, prepending an
//! entry whenever a transformer changes the type.

use super::completion::LazyType;
use super::errors::SymbolResult;
use super::id_types::{PhaseId, SymbolId, TypeId};
use super::phase::Period;
use super::table::SymbolTable;
use super::types::{TypeMap, TypeTable};
use fxhash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// What a history entry holds: a completed type or a completer
#[derive(Clone)]
pub enum Info {
    Lazy(Rc<dyn LazyType>),
    Type(TypeId),
}

impl Info {
    pub fn is_complete(&self) -> bool {
        matches!(self, Info::Type(_))
    }

    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            Info::Type(tp) => Some(*tp),
            Info::Lazy(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Info::Lazy(lazy) => lazy.describe(),
            Info::Type(tp) => format!("{}", tp),
        }
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Info::Lazy(lazy) => write!(f, "Lazy({})", lazy.describe()),
            Info::Type(tp) => write!(f, "Type({})", tp),
        }
    }
}

/// One immutable entry of a symbol's type history
#[derive(Debug)]
pub struct TypeHistory {
    pub valid_from: Period,
    pub info: Info,
    pub prev: Option<Rc<TypeHistory>>,
}

impl TypeHistory {
    pub fn new(valid_from: Period, info: Info, prev: Option<Rc<TypeHistory>>) -> Rc<Self> {
        Rc::new(Self { valid_from, info, prev })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeHistory> {
        std::iter::successors(Some(self), |h| h.prev.as_deref())
    }

    pub fn oldest(self: &Rc<Self>) -> Rc<Self> {
        let mut cur = self.clone();
        while let Some(prev) = cur.prev.clone() {
            cur = prev;
        }
        cur
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A phase-indexed transformation of symbol infos
pub type InfoTransform = Rc<dyn Fn(&mut SymbolTable, SymbolId, TypeId) -> TypeId>;

#[derive(Clone)]
pub struct InfoTransformer {
    /// Phase at which the transformer runs; its result is valid from `pid + 1`
    pub pid: PhaseId,
    pub name: String,
    pub transform: InfoTransform,
}

impl fmt::Debug for InfoTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoTransformer({} @ {})", self.name, self.pid)
    }
}

/// Info transformers sorted by phase id, at most one per phase
#[derive(Debug, Clone, Default)]
pub struct InfoTransformers {
    list: Vec<InfoTransformer>,
}

impl InfoTransformers {
    pub fn insert(&mut self, transformer: InfoTransformer) {
        match self.list.binary_search_by_key(&transformer.pid, |t| t.pid) {
            Ok(i) => self.list[i] = transformer,
            Err(i) => self.list.insert(i, transformer),
        }
    }

    /// Index of the first transformer at or after `pid`
    pub fn next_from(&self, pid: PhaseId) -> usize {
        self.list.partition_point(|t| t.pid < pid)
    }

    pub fn get(&self, index: usize) -> Option<&InfoTransformer> {
        self.list.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfoTransformer> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Rewrites symbols replaced between runs
struct AdaptMap<'a>(&'a FxHashMap<SymbolId, SymbolId>);

impl TypeMap for AdaptMap<'_> {
    fn map_symbol(&mut self, sym: SymbolId) -> SymbolId {
        self.0.get(&sym).copied().unwrap_or(sym)
    }
}

impl SymbolTable {
    /// Install a completed info valid from the current period
    pub fn set_info(&mut self, sym: SymbolId, info: TypeId) {
        let period = self.current_period();
        let s = self.sym_mut(sym);
        s.history = Some(TypeHistory::new(period, Info::Type(info), None));
        s.valid_to = period;
        self.invalidate_caches(sym);
    }

    /// Install a completer; the symbol becomes incomplete
    pub fn set_lazy_info(&mut self, sym: SymbolId, lazy: Rc<dyn LazyType>) {
        let period = self.current_period();
        let s = self.sym_mut(sym);
        s.history = Some(TypeHistory::new(period, Info::Lazy(lazy), None));
        s.valid_to = Period::NONE;
        self.invalidate_caches(sym);
    }

    /// Record a new info from the current phase on, keeping earlier entries.
    /// An entry for the current phase is replaced.
    pub fn update_info(&mut self, sym: SymbolId, info: TypeId) {
        let period = self.current_period();
        let pid = self.phase_id;
        let s = self.sym_mut(sym);
        let mut prev = s.history.clone();
        if s.valid_to.phase_id() == pid && !s.valid_to.is_none() {
            prev = prev.and_then(|h| h.prev.clone());
        }
        s.history = Some(TypeHistory::new(period, Info::Type(info), prev));
        s.valid_to = period;
        self.invalidate_caches(sym);
    }

    fn invalidate_caches(&mut self, sym: SymbolId) {
        let s = self.sym_mut(sym);
        if let Some(caches) = s.kind.type_caches_mut() {
            caches.tpe = None;
        }
        if let Some(data) = s.class_data_mut() {
            data.base_classes = None;
        }
    }

    /// Whether the info of `sym` is known without running a completer
    pub fn is_initialized(&self, sym: SymbolId) -> bool {
        !self.sym(sym).valid_to.is_none()
    }

    /// The info valid in the current phase, without completing it.
    ///
    /// Entries from an earlier run are adapted first, then the info
    /// transformers between the last valid phase and the current one run.
    pub fn raw_info(&mut self, sym: SymbolId) -> SymbolResult<Info> {
        if self.is_stub(sym) {
            self.stub_failure(sym)?;
            return Ok(Info::Type(TypeTable::NO_TYPE));
        }
        let Some(mut infos) = self.sym(sym).history.clone() else {
            return Ok(Info::Type(TypeTable::NO_TYPE));
        };
        let valid_to = self.sym(sym).valid_to;
        if valid_to.is_none() {
            return Ok(infos.info.clone());
        }

        // Skip entries that concern later phases
        let cur_pid = self.phase_id;
        while cur_pid < infos.valid_from.phase_id() {
            match infos.prev.clone() {
                Some(prev) => infos = prev,
                None => break,
            }
        }

        let cur_period = self.current_period();
        if valid_to < cur_period {
            if valid_to.run_id() != self.run_id {
                infos = self.adapt_infos(sym, &infos);
            }
            let valid_to = self.sym(sym).valid_to;
            if valid_to < cur_period {
                infos = self.run_info_transformers(sym, infos, valid_to.phase_id());
            }
        }
        Ok(infos.info.clone())
    }

    /// The raw info when it is complete, `NoType` otherwise
    pub fn raw_info_type(&mut self, sym: SymbolId) -> SymbolResult<TypeId> {
        Ok(self.raw_info(sym)?.as_type().unwrap_or(TypeTable::NO_TYPE))
    }

    fn run_info_transformers(&mut self, sym: SymbolId, mut infos: Rc<TypeHistory>, from: PhaseId) -> Rc<TypeHistory> {
        let cur_pid = self.phase_id;
        let run = self.run_id;
        let mut index = self.transformers.next_from(from);
        while let Some(transformer) = self.transformers.get(index).cloned() {
            if transformer.pid >= cur_pid {
                break;
            }
            let Info::Type(tp) = infos.info else {
                break;
            };
            let tp1 = self.at_phase(transformer.pid, |table| (transformer.transform)(table, sym, tp));
            let valid_from = Period::new(run, transformer.pid + 1);
            if tp1 != tp {
                log::trace!("{} transformed {} at phase {}", transformer.name, sym, transformer.pid);
                infos = TypeHistory::new(valid_from, Info::Type(tp1), Some(infos));
                self.sym_mut(sym).history = Some(infos.clone());
            }
            self.sym_mut(sym).valid_to = valid_from;
            index += 1;
        }
        let valid_to = match self.transformers.get(index) {
            Some(next) => Period::new(run, next.pid),
            None => self.current_period(),
        };
        self.sym_mut(sym).valid_to = valid_to;
        infos
    }

    /// Keep only the oldest entry, rewritten into the current run
    fn adapt_infos(&mut self, sym: SymbolId, infos: &Rc<TypeHistory>) -> Rc<TypeHistory> {
        let oldest = infos.oldest();
        let pid = oldest.valid_from.phase_id();
        let period = Period::new(self.run_id, pid);
        let info = match &oldest.info {
            Info::Type(tp) => {
                let tp = *tp;
                Info::Type(self.at_phase(pid, |table| table.adapt_to_new_run(tp)))
            }
            lazy => lazy.clone(),
        };
        log::trace!("adapting infos of {} into run {}", sym, self.run_id);
        let node = TypeHistory::new(period, info, None);
        let s = self.sym_mut(sym);
        s.history = Some(node.clone());
        s.valid_to = period;
        node
    }

    /// Rewrite a type from an earlier run, replacing adapted symbols
    pub fn adapt_to_new_run(&mut self, tp: TypeId) -> TypeId {
        if self.adaptations.is_empty() {
            return tp;
        }
        let adaptations = std::mem::take(&mut self.adaptations);
        let adapted = self.types.map(tp, &mut AdaptMap(&adaptations));
        self.adaptations = adaptations;
        adapted
    }

    /// Register an info transformer running at phase `pid`
    pub fn add_info_transformer(
        &mut self,
        pid: PhaseId,
        name: impl Into<String>,
        transform: impl Fn(&mut SymbolTable, SymbolId, TypeId) -> TypeId + 'static,
    ) {
        self.transformers.insert(InfoTransformer {
            pid,
            name: name.into(),
            transform: Rc::new(transform),
        });
    }

    /// Info of `sym` as seen in phase `pid`
    pub fn info_at_phase(&mut self, sym: SymbolId, pid: PhaseId) -> SymbolResult<TypeId> {
        self.at_phase(pid, |table| table.info(sym))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::flags::Flags;
    use crate::symtab::phase::{PhaseChain, PhaseSpec};
    use diagnostics::Position;
    use std::cell::Cell;

    fn table_with_phases(n: usize) -> SymbolTable {
        let specs: Vec<PhaseSpec> = (1..=n).map(|i| PhaseSpec::new(format!("p{}", i))).collect();
        let mut table = SymbolTable::new();
        table.install_phases(PhaseChain::new(&specs));
        table
    }

    #[test]
    fn test_transformers_prepend_only_on_change() {
        let mut table = table_with_phases(5);
        table.set_phase(1);
        let owner = table.empty_package_class();
        let x = table.names.term_name("x");
        let sym = table.new_term_symbol(owner, x, Position::NONE, Flags::NONE);
        let t0 = table.types.type_ref(TypeTable::NO_PREFIX, owner, []);
        table.set_info(sym, t0);

        let t2 = table.types.type_ref(TypeTable::NO_PREFIX, sym, []);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        table.add_info_transformer(2, "identity", move |_, _, tp| {
            seen.set(seen.get() + 1);
            tp
        });
        table.add_info_transformer(3, "erase", move |_, _, _| t2);

        table.set_phase(4);
        assert_eq!(table.info(sym).unwrap(), t2);
        assert_eq!(calls.get(), 1);
        assert_eq!(table.sym(sym).history().map(|h| h.len()), Some(2));

        // Going back walks to the entry valid there
        assert_eq!(table.info_at_phase(sym, 2).unwrap(), t0);
        assert_eq!(table.info_at_phase(sym, 3).unwrap(), t0);
        assert_eq!(table.info(sym).unwrap(), t2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_update_info_replaces_same_phase_entry() {
        let mut table = table_with_phases(3);
        table.set_phase(1);
        let owner = table.empty_package_class();
        let x = table.names.term_name("x");
        let sym = table.new_term_symbol(owner, x, Position::NONE, Flags::NONE);
        let a = table.types.this_type(owner);
        let b = table.types.this_type(sym);
        table.set_info(sym, a);
        table.set_phase(2);
        table.update_info(sym, b);
        table.update_info(sym, b);
        assert_eq!(table.sym(sym).history().map(|h| h.len()), Some(2));
        assert_eq!(table.info_at_phase(sym, 1).unwrap(), a);
    }

    #[test]
    fn test_transformer_ordering() {
        let mut list = InfoTransformers::default();
        for pid in [5u8, 2, 9] {
            list.insert(InfoTransformer {
                pid,
                name: format!("t{}", pid),
                transform: Rc::new(|_, _, tp| tp),
            });
        }
        let pids: Vec<_> = list.iter().map(|t| t.pid).collect();
        assert_eq!(pids, vec![2, 5, 9]);
        assert_eq!(list.next_from(3), 1);
        assert_eq!(list.next_from(5), 1);
        assert_eq!(list.next_from(10), 3);
    }
}
