use diagnostics::{Position, Reporter, StoreReporter};
use sigtab_compiler::config::SymtabConfig;
use sigtab_compiler::logging;
use sigtab_compiler::pickle::{enter_roots, pickle, unpickle};
use sigtab_compiler::symtab::{
    Flags, LazyType, ScopeKind, SymbolError, SymbolId, SymbolResult, SymbolTable, TypeId, TypeTable,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Asks for its own symbol's info once before settling
struct Reentrant(TypeId);

impl LazyType for Reentrant {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        if table.recursion_count(sym) == 0 {
            table.info(sym)?;
        }
        table.set_info(sym, self.0);
        Ok(())
    }
}

/// Needs another symbol's info before settling
struct Needs {
    other: SymbolId,
    result: TypeId,
}

impl LazyType for Needs {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        table.info(self.other)?;
        table.set_info(sym, self.result);
        Ok(())
    }
}

/// Remembers the phase it ran in
struct PhaseRecorder {
    seen: Rc<RefCell<Vec<String>>>,
    result: TypeId,
}

impl LazyType for PhaseRecorder {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        self.seen.borrow_mut().push(table.phase().name.clone());
        table.set_info(sym, self.result);
        Ok(())
    }
}

fn reentrant_value(table: &mut SymbolTable) -> SymbolId {
    let owner = table.empty_package_class();
    let name = table.names.term_name("loop");
    let sym = table.new_term_symbol(owner, name, Position::NONE, Flags::NONE);
    let unit = table.types.constant_type(sigtab_compiler::symtab::Constant::Unit);
    table.set_lazy_info(sym, Rc::new(Reentrant(unit)));
    sym
}

#[test]
fn test_reentry_without_budget_is_cyclic() {
    logging::init_test();
    let mut table = SymtabConfig::from_str("").unwrap().build_table();
    let sym = reentrant_value(&mut table);

    let err = table.info(sym).unwrap_err();
    assert!(matches!(err, SymbolError::CyclicReference { .. }));
    assert!(!table.is_locked(sym));
    assert_eq!(table.info(sym).unwrap(), TypeTable::ERROR);
    assert!(table.has_flag(sym, Flags::IS_ERROR));
}

#[test]
fn test_configured_budget_allows_reentry() {
    logging::init_test();
    let config = SymtabConfig::from_str("[settings]\nrecursion-limit = 1\n").unwrap();
    let mut table = config.build_table();
    let sym = reentrant_value(&mut table);

    let info = table.info(sym).unwrap();
    assert!(!table.types.is_error(info));
    assert!(!table.is_locked(sym));
    assert_eq!(table.recursion_count(sym), 0);
}

#[test]
fn test_completer_runs_in_the_phase_it_was_installed() {
    let mut table = SymtabConfig::default().build_table();
    let owner = table.empty_package_class();
    let name = table.names.term_name("recorded");
    let sym = table.new_term_symbol(owner, name, Position::NONE, Flags::NONE);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::new(PhaseRecorder {
        seen: seen.clone(),
        result: TypeTable::NO_TYPE,
    });

    table.at_phase_named("typer", |t| t.set_lazy_info(sym, recorder)).unwrap();
    let result = table.at_phase_named("erasure", |t| t.info(sym)).unwrap();
    assert!(result.is_ok());
    assert_eq!(*seen.borrow(), vec!["typer".to_string()]);

    // a second request finds the completed info
    table.at_phase_named("erasure", |t| t.info(sym)).unwrap().unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_unpickled_infos_follow_replacements_in_a_new_run() {
    logging::init_test();
    let mut source = SymbolTable::new();
    let (class, module) = enter_roots(&mut source, "app.Client").unwrap();
    let (other, _) = enter_roots(&mut source, "lib.Other").unwrap();
    let decls = source.scopes.create(ScopeKind::Class, class);
    let info = source.types.class_info(Vec::new(), decls, class);
    source.set_info(class, info);
    let peer = source.names.term_name("peer");
    let value = source.new_term_symbol(class, peer, Position::NONE, Flags::NONE);
    let other_ref = source.types.type_ref(TypeTable::NO_PREFIX, other, []);
    source.set_info(value, other_ref);
    source.scopes.get_mut(decls).enter(peer, value);
    let bytes = pickle(&mut source, class, module).unwrap();

    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "app.Client").unwrap();
    let (old_other, _) = enter_roots(&mut target, "lib.Other").unwrap();
    unpickle(&mut target, &bytes, 0, class, module, "Client.sig").unwrap();
    let peer = target.names.term_name("peer");
    let value = target.decl(class, peer).unwrap();
    assert!(!target.is_complete(value));

    // lib.Other is recompiled before anyone looked at `peer`
    target.new_run();
    let lib = target.raw_owner(old_other);
    let name = target.raw_name(old_other);
    let new_other = target.new_class_symbol(lib, name, Position::NONE, Flags::NONE);
    target.replace_for_new_run(old_other, new_other);

    let info = target.info(value).unwrap();
    assert_eq!(target.types.type_symbol_direct(info), new_other);
}

/// `p` and `q` each need the other's info
fn mutual_pair(table: &mut SymbolTable) -> (SymbolId, SymbolId) {
    let owner = table.empty_package_class();
    let p_name = table.names.term_name("p");
    let q_name = table.names.term_name("q");
    let p = table.new_term_symbol(owner, p_name, Position::NONE, Flags::NONE);
    let q = table.new_term_symbol(owner, q_name, Position::NONE, Flags::NONE);
    let unit = table.types.constant_type(sigtab_compiler::symtab::Constant::Unit);
    table.set_lazy_info(
        p,
        Rc::new(Needs {
            other: q,
            result: unit,
        }),
    );
    table.set_lazy_info(
        q,
        Rc::new(Needs {
            other: p,
            result: unit,
        }),
    );
    (p, q)
}

#[test]
fn test_mutual_completion_is_cyclic() {
    logging::init_test();
    let mut table = SymtabConfig::from_str("[settings]\ntrace-locks = true\n").unwrap().build_table();
    let store = StoreReporter::new();
    table.set_reporter(Box::new(store.clone()));
    let (p, q) = mutual_pair(&mut table);

    match table.info(p).unwrap_err() {
        SymbolError::CyclicReference { sym, trace, .. } => {
            assert_eq!(sym, p);
            assert_eq!(trace, vec![p, q, p]);
        }
        other => panic!("unexpected {:?}", other),
    }
    for sym in [p, q] {
        assert!(!table.is_locked(sym));
        assert_eq!(table.recursion_count(sym), 0);
        assert!(table.has_flag(sym, Flags::IS_ERROR));
        assert_eq!(table.info(sym).unwrap(), TypeTable::ERROR);
    }

    // reported once, where the cycle closed
    assert_eq!(store.error_count(), 1);
    let reported = store.diagnostics().diagnostics[0].clone();
    assert_eq!(reported.code.as_deref(), Some("E2101"));
    assert_eq!(reported.message, "illegal cyclic reference involving value p");
    let kind = table.kind_string(p);
    let trace = format!("lock trace: {kind} p -> {kind} q -> {kind} p");
    assert!(reported.notes.contains(&trace));
    assert!(reported.notes.contains(&"E2101: illegal cyclic reference".to_string()));
}

#[test]
fn test_mutual_completion_exhausts_the_budget() {
    logging::init_test();
    let mut table = SymtabConfig::from_str("[settings]\nrecursion-limit = 1\n").unwrap().build_table();
    let (p, q) = mutual_pair(&mut table);

    // each symbol is re-entered once, then the cycle is reported
    let err = table.info(p).unwrap_err();
    assert!(matches!(err, SymbolError::CyclicReference { sym, .. } if sym == p));
    for sym in [p, q] {
        assert!(!table.is_locked(sym));
        assert_eq!(table.recursion_count(sym), 0);
    }
}
