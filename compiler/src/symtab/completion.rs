//! Lazy types, completion and symbol locking
//!
//! Reading the info of a symbol whose history holds a lazy type runs the
//! completer synchronously. The symbol is locked for the duration, so a
//! completer that asks for the same info again is caught: it either uses up
//! the configured recursion budget or fails with a cyclic reference.

use super::errors::{SymbolError, SymbolResult};
use super::flags::Flags;
use super::history::Info;
use super::id_types::{SymbolId, TypeId};
use super::table::SymbolTable;
use super::types::TypeTable;
use diagnostics::symtab::SymtabDiagnostics;
use std::rc::Rc;

/// A deferred info
///
/// `complete` installs the real info on `sym`, typically with
/// `SymbolTable::set_info`. It may install another lazy type once.
pub trait LazyType {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()>;

    /// Like `complete`, but a no-op when the work was already done
    fn load(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        self.complete(table, sym)
    }

    fn describe(&self) -> String {
        "<lazy type>".to_string()
    }
}

/// A completer that sets a fixed type
pub struct FixedLazyType(pub TypeId);

impl LazyType for FixedLazyType {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        table.set_info(sym, self.0);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("<fixed {}>", self.0)
    }
}

/// Progress of one `info` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionState {
    Uncompleted,
    PartiallyComplete,
    Exhausted,
}

impl CompletionState {
    fn next(self) -> Self {
        match self {
            CompletionState::Uncompleted => CompletionState::PartiallyComplete,
            CompletionState::PartiallyComplete | CompletionState::Exhausted => CompletionState::Exhausted,
        }
    }
}

/// How a lock was taken; handed back to `unlock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockToken {
    Outermost,
    Reentered,
}

impl SymbolTable {
    /// The complete info of `sym` in the current phase
    pub fn info(&mut self, sym: SymbolId) -> SymbolResult<TypeId> {
        let mut state = CompletionState::Uncompleted;
        loop {
            let lazy = match self.raw_info(sym)? {
                Info::Type(tp) => return Ok(tp),
                Info::Lazy(lazy) => lazy,
            };
            if state == CompletionState::Exhausted {
                return Err(SymbolError::NoProgress {
                    sym,
                    info: lazy.describe(),
                });
            }
            self.run_completer(sym, lazy, false)?;
            state = state.next();
        }
    }

    /// Complete `sym` if needed and hand it back
    pub fn initialize(&mut self, sym: SymbolId) -> SymbolResult<SymbolId> {
        if !self.is_initialized(sym) {
            self.info(sym)?;
        }
        Ok(sym)
    }

    /// Whether the current history entry holds a completed type
    pub fn is_complete(&self, sym: SymbolId) -> bool {
        self.sym(sym)
            .history
            .as_ref()
            .is_none_or(|h| h.info.is_complete())
    }

    /// Run the pending completer through `LazyType::load`.
    /// Returns false when there was nothing to load.
    pub fn load(&mut self, sym: SymbolId) -> SymbolResult<bool> {
        match self.pending_lazy(sym) {
            Some(lazy) => self.run_completer(sym, lazy, true).map(|_| true),
            None => Ok(false),
        }
    }

    /// Run the pending completer through `LazyType::complete`.
    /// Returns false when there was nothing to complete.
    pub fn complete(&mut self, sym: SymbolId) -> SymbolResult<bool> {
        match self.pending_lazy(sym) {
            Some(lazy) => self.run_completer(sym, lazy, false).map(|_| true),
            None => Ok(false),
        }
    }

    fn pending_lazy(&self, sym: SymbolId) -> Option<Rc<dyn LazyType>> {
        match self.sym(sym).history.as_ref().map(|h| &h.info) {
            Some(Info::Lazy(lazy)) => Some(lazy.clone()),
            _ => None,
        }
    }

    fn run_completer(&mut self, sym: SymbolId, lazy: Rc<dyn LazyType>, load: bool) -> SymbolResult<()> {
        let pid = self
            .sym(sym)
            .history
            .as_ref()
            .map(|h| h.valid_from.phase_id())
            .unwrap_or(self.phase_id);
        let token = self.lock(sym)?;
        let span = tracing::trace_span!("complete", sym = sym.as_raw(), lazy = %lazy.describe());
        let _entered = span.enter();
        log::trace!("completing {} ({:?})", sym, token);

        let result = self.at_phase(pid, |table| {
            if load {
                lazy.load(table, sym)
            } else {
                lazy.complete(table, sym)
            }
        });
        self.unlock(sym, token);
        if let Err(err) = &result {
            log::trace!("completion of {} failed: {}", sym, err);
            self.mark_errored(sym);
            if token == LockToken::Outermost {
                self.report_cycle(sym, err);
            }
        }
        result
    }

    /// Report a cycle once, when it unwinds to the completion of the
    /// symbol it was detected on
    fn report_cycle(&mut self, sym: SymbolId, err: &SymbolError) {
        let SymbolError::CyclicReference { sym: cyclic, trace, display, .. } = err else {
            return;
        };
        if *cyclic != sym {
            return;
        }
        let trace: Vec<String> = trace.iter().map(|&s| self.show(s)).collect();
        let pos = self.pos(sym);
        self.report(SymtabDiagnostics::cyclic_reference(pos, display, &trace));
    }

    /// Put `sym` in the errored state: error info and IS_ERROR
    pub(crate) fn mark_errored(&mut self, sym: SymbolId) {
        if sym.is_none() {
            return;
        }
        self.set_info(sym, TypeTable::ERROR);
        self.set_flag(sym, Flags::IS_ERROR);
    }

    /// Lock `sym` for completion
    ///
    /// A symbol that is already locked may be re-entered while its
    /// recursion count is below the configured limit; otherwise its info
    /// becomes the error type and a cyclic reference is reported.
    pub fn lock(&mut self, sym: SymbolId) -> SymbolResult<LockToken> {
        if self.sym(sym).raw_flags.contains(Flags::LOCKED) {
            let limit = self.settings.recursion_limit;
            if limit != 0 {
                let count = self.recursions.entry(sym).or_insert(0);
                if *count < limit {
                    *count += 1;
                    return Ok(LockToken::Reentered);
                }
            }
            let pending = self
                .sym(sym)
                .history
                .as_ref()
                .map(|h| h.info.describe())
                .unwrap_or_else(|| "<no info>".to_string());
            let trace = if self.settings.trace_locks {
                let mut trace = self.lock_trace.clone();
                trace.push(sym);
                trace
            } else {
                Vec::new()
            };
            let display = self.show(sym);
            self.set_info(sym, TypeTable::ERROR);
            return Err(SymbolError::CyclicReference {
                sym,
                pending,
                trace,
                display,
            });
        }
        self.set_flag(sym, Flags::LOCKED);
        if self.settings.trace_locks {
            self.lock_trace.push(sym);
        }
        Ok(LockToken::Outermost)
    }

    pub fn unlock(&mut self, sym: SymbolId, token: LockToken) {
        match token {
            LockToken::Reentered => {
                if let Some(count) = self.recursions.get_mut(&sym) {
                    *count = count.saturating_sub(1);
                }
            }
            LockToken::Outermost => {
                self.reset_flag(sym, Flags::LOCKED);
                self.recursions.remove(&sym);
                if let Some(i) = self.lock_trace.iter().rposition(|&s| s == sym) {
                    self.lock_trace.remove(i);
                }
            }
        }
    }

    pub fn is_locked(&self, sym: SymbolId) -> bool {
        self.sym(sym).raw_flags.contains(Flags::LOCKED)
    }

    /// Recursion count of a locked symbol
    pub fn recursion_count(&self, sym: SymbolId) -> u32 {
        self.recursions.get(&sym).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::table::Settings;
    use diagnostics::Position;
    use std::cell::Cell;

    struct Counting {
        runs: Rc<Cell<u32>>,
        result: TypeId,
    }

    impl LazyType for Counting {
        fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
            self.runs.set(self.runs.get() + 1);
            table.set_info(sym, self.result);
            Ok(())
        }
    }

    /// Asks for its own symbol's info before finishing
    struct SelfReferential {
        depth: Rc<Cell<u32>>,
        max_seen: Rc<Cell<u32>>,
        stop_at: u32,
    }

    impl LazyType for SelfReferential {
        fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
            self.depth.set(self.depth.get() + 1);
            self.max_seen.set(self.max_seen.get().max(self.depth.get()));
            let result = if self.depth.get() <= self.stop_at {
                table.info(sym).map(|_| ())
            } else {
                Ok(())
            };
            self.depth.set(self.depth.get() - 1);
            result?;
            if !table.is_complete(sym) {
                table.set_info(sym, TypeTable::NO_PREFIX);
            }
            Ok(())
        }
    }

    /// Installs another lazy type forever
    struct Restless;

    impl LazyType for Restless {
        fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
            table.set_lazy_info(sym, Rc::new(Restless));
            Ok(())
        }

        fn describe(&self) -> String {
            "<restless>".into()
        }
    }

    fn fresh_term(table: &mut SymbolTable, name: &str) -> SymbolId {
        let owner = table.empty_package_class();
        let n = table.names.term_name(name);
        table.new_term_symbol(owner, n, Position::NONE, Flags::NONE)
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut table = SymbolTable::new();
        let sym = fresh_term(&mut table, "x");
        let tp = table.types.this_type(sym);
        let runs = Rc::new(Cell::new(0));
        table.set_lazy_info(sym, Rc::new(Counting { runs: runs.clone(), result: tp }));

        assert!(!table.is_complete(sym));
        assert_eq!(table.info(sym).unwrap(), tp);
        assert_eq!(table.info(sym).unwrap(), tp);
        assert_eq!(runs.get(), 1);
        assert!(!table.is_locked(sym));
    }

    #[test]
    fn test_cycle_without_budget() {
        let mut table = SymbolTable::new();
        let sym = fresh_term(&mut table, "loop");
        let depth = Rc::new(Cell::new(0));
        let max_seen = Rc::new(Cell::new(0));
        table.set_lazy_info(sym, Rc::new(SelfReferential { depth, max_seen, stop_at: 10 }));

        let err = table.info(sym).unwrap_err();
        assert!(err.is_cyclic());
        assert_eq!(err.symbol(), Some(sym));
        assert!(table.has_flag(sym, Flags::IS_ERROR));
        assert!(!table.is_locked(sym));
        // Errored state is sticky
        assert_eq!(table.info(sym).unwrap(), TypeTable::ERROR);
    }

    #[test]
    fn test_recursion_budget() {
        for (budget, depth_needed, ok) in [(2u32, 2u32, true), (2, 3, false)] {
            let mut table = SymbolTable::with_settings(Settings {
                recursion_limit: budget,
                ..Settings::default()
            });
            let sym = fresh_term(&mut table, "r");
            let depth = Rc::new(Cell::new(0));
            let max_seen = Rc::new(Cell::new(0));
            table.set_lazy_info(
                sym,
                Rc::new(SelfReferential {
                    depth,
                    max_seen: max_seen.clone(),
                    stop_at: depth_needed,
                }),
            );
            let result = table.info(sym);
            assert_eq!(result.is_ok(), ok, "budget {} depth {}", budget, depth_needed);
            assert_eq!(table.recursion_count(sym), 0);
        }
    }

    #[test]
    fn test_lock_trace_recorded() {
        let mut table = SymbolTable::with_settings(Settings {
            trace_locks: true,
            ..Settings::default()
        });
        let a = fresh_term(&mut table, "a");
        let b = fresh_term(&mut table, "b");
        table.lock(a).unwrap();
        table.lock(b).unwrap();
        match table.lock(a) {
            Err(SymbolError::CyclicReference { trace, .. }) => assert_eq!(trace, vec![a, b, a]),
            other => panic!("unexpected {:?}", other),
        }
        table.unlock(b, LockToken::Outermost);
        table.unlock(a, LockToken::Outermost);
        assert!(!table.is_locked(a));
    }

    #[test]
    fn test_no_progress_is_reported() {
        let mut table = SymbolTable::new();
        let sym = fresh_term(&mut table, "s");
        table.set_lazy_info(sym, Rc::new(Restless));
        match table.info(sym) {
            Err(SymbolError::NoProgress { info, .. }) => assert_eq!(info, "<restless>"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_load_and_complete() {
        let mut table = SymbolTable::new();
        let sym = fresh_term(&mut table, "l");
        assert!(!table.load(sym).unwrap());
        let runs = Rc::new(Cell::new(0));
        table.set_lazy_info(sym, Rc::new(Counting { runs: runs.clone(), result: TypeTable::NO_PREFIX }));
        assert!(table.load(sym).unwrap());
        assert!(!table.complete(sym).unwrap());
        assert_eq!(runs.get(), 1);
        assert_eq!(table.initialize(sym).unwrap(), sym);
    }
}
