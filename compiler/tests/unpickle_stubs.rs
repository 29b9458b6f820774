use diagnostics::{Position, Reporter, StoreReporter};
use sigtab_compiler::config::SymtabConfig;
use sigtab_compiler::logging;
use sigtab_compiler::pickle::format::*;
use sigtab_compiler::pickle::{enter_roots, pickle, unpickle, PickleBuffer};
use sigtab_compiler::symtab::{Flags, Name, ScopeKind, SymbolError, SymbolId, SymbolTable, TypeTable};
use std::rc::Rc;

/// Pickle of `class Uses { val x: <full_name> }` in the empty package
fn uses_of(full_name: &str) -> Vec<u8> {
    let mut source = SymbolTable::new();
    let (class, module) = enter_roots(&mut source, "Uses").unwrap();
    let (needed, _) = enter_roots(&mut source, full_name).unwrap();
    let decls = source.scopes.create(ScopeKind::Class, class);
    let info = source.types.class_info(Vec::new(), decls, class);
    source.set_info(class, info);
    let x = source.names.term_name("x");
    let value = source.new_term_symbol(class, x, Position::NONE, Flags::NONE);
    let tpe = source.types.type_ref(TypeTable::NO_PREFIX, needed, []);
    source.set_info(value, tpe);
    source.scopes.get_mut(decls).enter(x, value);
    pickle(&mut source, class, module).unwrap()
}

/// Load `bytes` as `Uses` and return the type symbol of `x`'s info
fn referenced_class(table: &mut SymbolTable, bytes: &[u8]) -> SymbolId {
    let (class, module) = enter_roots(table, "Uses").unwrap();
    unpickle(table, bytes, 0, class, module, "Uses.sig").unwrap();
    let x = table.names.term_name("x");
    let value = table.decl(class, x).unwrap();
    let info = table.info(value).unwrap();
    table.types.type_symbol_direct(info)
}

#[test]
fn test_missing_class_becomes_stub_reported_on_use() {
    logging::init_test();
    let bytes = uses_of("lib.Missing");
    let mut table = SymbolTable::new();
    let store = StoreReporter::new();
    table.set_reporter(Box::new(store.clone()));

    let stub = referenced_class(&mut table, &bytes);
    assert!(table.is_stub(stub));
    assert_eq!(table.full_name(stub), "lib.Missing");
    assert_eq!(store.error_count(), 0);

    let err = table.info(stub).unwrap_err();
    assert!(err.is_missing_requirement());
    let message = err.to_string();
    assert!(message.contains("Symbol 'type lib.Missing' is missing from the classpath"));
    assert!(message.contains("This symbol is required by 'value Uses.x'"));
    assert!(message.contains("'Uses.sig'"));
    assert_eq!(store.error_count(), 1);

    // only the first use reports
    assert_eq!(table.info(stub).unwrap(), TypeTable::NO_TYPE);
    assert_eq!(store.error_count(), 1);
}

#[test]
fn test_debug_setting_warns_when_stubbing() {
    logging::init_test();
    let bytes = uses_of("lib.Missing");
    let mut table = SymtabConfig::from_str("[settings]\ndebug = true\n").unwrap().build_table();
    let store = StoreReporter::new();
    table.set_reporter(Box::new(store.clone()));

    referenced_class(&mut table, &bytes);
    // one stub for the package, one for the class
    assert_eq!(store.warning_count(), 2);
    assert_eq!(store.error_count(), 0);
    assert!(store
        .messages()
        .iter()
        .any(|m| m.contains("creating stub symbol to defer error for lib.Missing")));
}

#[test]
fn test_module_advice_names_the_missing_module() {
    logging::init_test();
    let bytes = uses_of("scala.xml.Node");
    let mut table = SymbolTable::new();
    let stub = referenced_class(&mut table, &bytes);
    assert_eq!(table.full_name(stub), "scala.xml.Node");
    let message = table.info(stub).unwrap_err().to_string();
    assert!(message.contains("It looks like the scala-xml module is missing"));
}

#[test]
fn test_configured_advice_is_used() {
    logging::init_test();
    let bytes = uses_of("acme.widgets.Knob");
    let config = r#"
[[module-advice]]
prefix = "acme.widgets"
group = "com.acme"
artifact = "widgets"
"#;
    let mut table = SymtabConfig::from_str(config).unwrap().build_table();
    let stub = referenced_class(&mut table, &bytes);
    let message = table.info(stub).unwrap_err().to_string();
    assert!(message.contains("\"com.acme\" : \"widgets\""));
}

#[test]
fn test_missing_hook_supplies_symbols() {
    logging::init_test();
    let bytes = uses_of("lib.Missing");
    let mut table = SymbolTable::new();
    let hook = |t: &mut SymbolTable, owner: SymbolId, name: Name| -> SymbolId {
        if name.is_term_name() {
            t.new_package(owner, name)
        } else {
            let class = t.new_class_symbol(owner, name, Position::NONE, Flags::NONE);
            t.enter_in_owner_scope(owner, class);
            class
        }
    };
    table.set_missing_hook(Rc::new(hook));

    let class = referenced_class(&mut table, &bytes);
    assert!(!table.is_stub(class));
    assert!(table.is_class(class));
    assert_eq!(table.full_name(class), "lib.Missing");
}

#[test]
fn test_existing_class_is_found_by_name() {
    let bytes = uses_of("lib.Present");
    let mut table = SymbolTable::new();
    let (present, _) = enter_roots(&mut table, "lib.Present").unwrap();
    assert_eq!(referenced_class(&mut table, &bytes), present);
}

fn entry(out: &mut PickleBuffer, tag: u8, payload: &[u8]) {
    out.write_byte(tag);
    out.write_nat(payload.len() as u32);
    out.write_bytes(payload);
}

#[test]
fn test_corrupt_type_entry_fails_on_completion() {
    logging::init_test();
    let mut out = PickleBuffer::new();
    out.write_nat(MAJOR_VERSION);
    out.write_nat(MINOR_VERSION);
    out.write_nat(8);
    entry(&mut out, TYPE_NAME, b"C");
    entry(&mut out, TERM_NAME, b"<empty>");
    entry(&mut out, EXT_MOD_CLASS_REF, &[1]);
    entry(&mut out, CLASS_SYM, &[0, 2, 0, 4]);
    entry(&mut out, CLASSINFO_TPE, &[3]);
    entry(&mut out, TERM_NAME, b"x");
    entry(&mut out, VAL_SYM, &[5, 3, 0, 7]);
    entry(&mut out, 99, &[]);
    let bytes = out.into_bytes();

    let mut table = SymbolTable::new();
    let (class, module) = enter_roots(&mut table, "C").unwrap();
    unpickle(&mut table, &bytes, 0, class, module, "C.sig").unwrap();

    let x = table.names.term_name("x");
    let value = table.decl(class, x).unwrap();
    assert!(value.exists());
    let err = table.info(value).unwrap_err();
    assert!(matches!(err, SymbolError::BadSignature { .. }));
    assert!(err.to_string().contains("error reading Scala signature of C.sig"));
    assert_eq!(table.info(value).unwrap(), TypeTable::ERROR);
}

#[test]
fn test_truncated_pickle_is_rejected() {
    let mut out = PickleBuffer::new();
    out.write_nat(MAJOR_VERSION);
    out.write_nat(MINOR_VERSION);
    out.write_nat(1);
    out.write_byte(TERM_NAME);
    out.write_nat(10);
    out.write_bytes(b"abc");
    let bytes = out.into_bytes();

    let mut table = SymbolTable::new();
    let store = StoreReporter::new();
    table.set_reporter(Box::new(store.clone()));
    let (class, module) = enter_roots(&mut table, "T").unwrap();
    let err = unpickle(&mut table, &bytes, 0, class, module, "T.sig").unwrap_err();
    assert!(!err.is_missing_requirement());
    assert!(err.to_string().contains("T.sig"));
    assert_eq!(store.error_count(), 1);
}
