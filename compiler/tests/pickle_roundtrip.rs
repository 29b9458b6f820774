use diagnostics::Position;
use sigtab_compiler::logging;
use sigtab_compiler::pickle::{enter_roots, pickle, unpickle};
use sigtab_compiler::symtab::{
    AnnotationInfo, ClassfileAnnotArg, Constant, Flags, ScopeId, ScopeKind, SymbolId, SymbolTable, Tree, Type,
    TypeTable,
};

/// Give `class` an empty class info and return its member scope
fn class_info(table: &mut SymbolTable, class: SymbolId) -> ScopeId {
    let decls = table.scopes.create(ScopeKind::Class, class);
    let info = table.types.class_info(Vec::new(), decls, class);
    table.set_info(class, info);
    decls
}

fn module_info(table: &mut SymbolTable, module: SymbolId) -> ScopeId {
    let module_class = table.module_class(module);
    let decls = class_info(table, module_class);
    let tpe = table.types.type_ref(TypeTable::NO_PREFIX, module_class, []);
    table.set_info(module, tpe);
    decls
}

fn enter(table: &mut SymbolTable, decls: ScopeId, sym: SymbolId) {
    let name = table.raw_name(sym);
    table.scopes.get_mut(decls).enter(name, sym);
}

/// `sealed abstract class shapes.Shape` with a generic method, a value
/// that is private to its package, an annotation and a known child, plus a
/// companion holding constants
fn build_shape(table: &mut SymbolTable) -> (SymbolId, SymbolId) {
    let (class, module) = enter_roots(table, "shapes.Shape").unwrap();
    let (circle, _) = enter_roots(table, "shapes.Circle").unwrap();
    let (deprecated, _) = enter_roots(table, "scala.deprecated").unwrap();
    table.set_flag(class, Flags::SEALED | Flags::ABSTRACT);
    let decls = class_info(table, class);
    let shape_ref = table.types.type_ref(TypeTable::NO_PREFIX, class, []);

    // def area[T](scale: T): Shape
    let area = table.names.term_name("area");
    let method = table.new_method_symbol(class, area, Position::NONE, Flags::METHOD);
    let t = table.names.type_name("T");
    let tparam = table.new_type_parameter(method, t, Flags::NONE);
    let bounds = table.types.bounds(TypeTable::NO_TYPE, TypeTable::NO_TYPE);
    table.set_info(tparam, bounds);
    let scale = table.names.term_name("scale");
    let param = table.new_value_parameter(method, scale, Flags::NONE);
    let t_ref = table.types.type_ref(TypeTable::NO_PREFIX, tparam, []);
    table.set_info(param, t_ref);
    let mt = table.types.method_type(vec![param], shape_ref);
    let pt = table.types.poly_type(vec![tparam], mt);
    table.set_info(method, pt);
    enter(table, decls, method);

    // private[shapes] val secret: true
    let secret = table.names.term_name("secret");
    let value = table.new_term_symbol(class, secret, Position::NONE, Flags::NONE);
    let yes = table.types.constant_type(Constant::Boolean(true));
    table.set_info(value, yes);
    let package_class = table.raw_owner(class);
    table.set_private_within(value, package_class);
    enter(table, decls, value);

    // @deprecated("old", since = "1.0")
    let atp = table.types.type_ref(TypeTable::NO_PREFIX, deprecated, []);
    let old = Constant::String("old".to_string());
    let old_tpe = table.types.constant_type(old.clone());
    let mut annotation = AnnotationInfo::new(atp).with_args(vec![Tree::literal(old, old_tpe)]);
    let since = table.names.term_name("since");
    annotation
        .assocs
        .push((since, ClassfileAnnotArg::Literal(Constant::String("1.0".to_string()))));
    table.add_annotation(class, annotation);
    table.add_child(class, circle);

    // object Shape { val answer: 42; val small: -129L }
    let mdecls = module_info(table, module);
    let module_class = table.module_class(module);
    for (name, constant) in [("answer", Constant::Int(42)), ("small", Constant::Long(-129))] {
        let name = table.names.term_name(name);
        let sym = table.new_term_symbol(module_class, name, Position::NONE, Flags::NONE);
        let tpe = table.types.constant_type(constant);
        table.set_info(sym, tpe);
        enter(table, mdecls, sym);
    }
    (class, module)
}

fn member(table: &mut SymbolTable, owner: SymbolId, name: &str) -> SymbolId {
    let name = table.names.term_name(name);
    table.decl(owner, name).unwrap()
}

#[test]
fn test_round_trip_preserves_structure() {
    logging::init_test();
    let mut source = SymbolTable::new();
    let (class, module) = build_shape(&mut source);
    let bytes = pickle(&mut source, class, module).unwrap();
    assert_eq!(&bytes[..2], &[5, 2]);

    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "shapes.Shape").unwrap();
    let (circle, _) = enter_roots(&mut target, "shapes.Circle").unwrap();
    unpickle(&mut target, &bytes, 0, class, module, "Shape.sig").unwrap();

    assert!(target.has_all_flags(class, Flags::SEALED | Flags::ABSTRACT));
    assert_eq!(target.children(class), vec![circle]);

    let names: Vec<String> = target
        .decls(class)
        .unwrap()
        .into_iter()
        .map(|s| target.decoded_name(s).to_string())
        .collect();
    assert_eq!(names, vec!["area", "secret"]);

    // member infos stay pending until asked for
    let area = member(&mut target, class, "area");
    assert!(!target.is_complete(area));
    let info = target.info(area).unwrap();
    assert!(target.is_complete(area));
    let Type::Poly { tparams, result } = target.types.get(info).clone() else {
        panic!("expected a polymorphic method type");
    };
    assert_eq!(tparams.len(), 1);
    assert_eq!(target.decoded_name(tparams[0]), "T");
    let Type::Method { params, result } = target.types.get(result).clone() else {
        panic!("expected a method type");
    };
    assert_eq!(target.decoded_name(params[0]), "scale");
    assert_eq!(target.raw_owner(params[0]), area);
    let param_info = target.info(params[0]).unwrap();
    assert_eq!(target.types.type_symbol_direct(param_info), tparams[0]);
    assert_eq!(target.types.type_symbol_direct(result), class);

    let secret = member(&mut target, class, "secret");
    assert_eq!(target.private_within(secret), target.raw_owner(class));
    let secret_info = target.info(secret).unwrap();
    assert!(matches!(target.types.get(secret_info), Type::Constant(Constant::Boolean(true))));

    let module_class = target.module_class(module);
    let answer = member(&mut target, module_class, "answer");
    let answer_info = target.info(answer).unwrap();
    assert!(matches!(target.types.get(answer_info), Type::Constant(Constant::Int(42))));
    let small = member(&mut target, module_class, "small");
    let small_info = target.info(small).unwrap();
    assert!(matches!(target.types.get(small_info), Type::Constant(Constant::Long(-129))));
}

#[test]
fn test_annotations_reference_unknown_classes_lazily() {
    logging::init_test();
    let mut source = SymbolTable::new();
    let (class, module) = build_shape(&mut source);
    let bytes = pickle(&mut source, class, module).unwrap();

    // no scala.deprecated in this table
    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "shapes.Shape").unwrap();
    enter_roots(&mut target, "shapes.Circle").unwrap();
    unpickle(&mut target, &bytes, 0, class, module, "Shape.sig").unwrap();
    assert!(!target.reporter().has_errors());

    let annotations = target.annotations(class).to_vec();
    assert_eq!(annotations.len(), 1);
    let annotation = &annotations[0];
    let annotation_class = target.types.type_symbol_direct(annotation.atp);
    assert!(target.is_stub(annotation_class));
    assert_eq!(target.decoded_name(annotation_class), "deprecated");

    assert_eq!(annotation.args.len(), 1);
    assert_eq!(annotation.args[0].constant, Some(Constant::String("old".to_string())));
    assert_eq!(annotation.assocs.len(), 1);
    assert_eq!(target.names.as_str(annotation.assocs[0].0), "since");
    assert_eq!(
        annotation.assocs[0].1,
        ClassfileAnnotArg::Literal(Constant::String("1.0".to_string()))
    );
}

#[test]
fn test_pickle_at_offset() {
    let mut source = SymbolTable::new();
    let (class, module) = enter_roots(&mut source, "Padded").unwrap();
    class_info(&mut source, class);
    module_info(&mut source, module);
    let pickled = pickle(&mut source, class, module).unwrap();

    let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE];
    bytes.extend_from_slice(&pickled);

    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "Padded").unwrap();
    unpickle(&mut target, &bytes, 4, class, module, "Padded.class").unwrap();
    assert!(target.info(class).is_ok());
    assert!(target.info(target.module_class(module)).is_ok());
}

#[test]
fn test_overloads_come_back_as_alternatives() {
    let mut source = SymbolTable::new();
    let (class, module) = enter_roots(&mut source, "Over").unwrap();
    let decls = class_info(&mut source, class);
    module_info(&mut source, module);
    let f = source.names.term_name("f");
    for constant in [Constant::Int(1), Constant::Char(u16::from(b'c'))] {
        let method = source.new_method_symbol(class, f, Position::NONE, Flags::METHOD);
        let result = source.types.constant_type(constant);
        let tpe = source.types.nullary_method_type(result);
        source.set_info(method, tpe);
        enter(&mut source, decls, method);
    }
    let bytes = pickle(&mut source, class, module).unwrap();

    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "Over").unwrap();
    unpickle(&mut target, &bytes, 0, class, module, "Over.sig").unwrap();
    let f = target.names.term_name("f");
    assert_eq!(target.decl_alternatives(class, f).unwrap().len(), 2);
    let overloaded = target.decl(class, f).unwrap();
    assert!(target.is_overloaded(overloaded));
    assert_eq!(target.alternatives(overloaded).len(), 2);
}

#[test]
fn test_super_accessor_keeps_its_alias() {
    logging::init_test();
    let mut source = SymbolTable::new();
    let (class, module) = enter_roots(&mut source, "Sub").unwrap();
    let decls = class_info(&mut source, class);
    module_info(&mut source, module);
    let unit = source.types.constant_type(Constant::Unit);
    let result = source.types.nullary_method_type(unit);

    let t = source.names.term_name("t");
    let target = source.new_method_symbol(class, t, Position::NONE, Flags::METHOD);
    source.set_info(target, result);
    enter(&mut source, decls, target);
    let accessor_name = source.names.term_name("super$t");
    let accessor = source.new_method_symbol(class, accessor_name, Position::NONE, Flags::METHOD | Flags::SUPERACCESSOR);
    source.set_info(accessor, result);
    source.set_referenced(accessor, target).unwrap();
    enter(&mut source, decls, accessor);
    let bytes = pickle(&mut source, class, module).unwrap();

    let mut target_table = SymbolTable::new();
    let (class, module) = enter_roots(&mut target_table, "Sub").unwrap();
    unpickle(&mut target_table, &bytes, 0, class, module, "Sub.sig").unwrap();
    let accessor = member(&mut target_table, class, "super$t");
    let t = member(&mut target_table, class, "t");
    assert!(target_table.has_flag(accessor, Flags::SUPERACCESSOR));
    target_table.info(accessor).unwrap();
    assert_eq!(target_table.referenced(accessor), t);
    assert_eq!(target_table.referenced(t), sigtab_compiler::symtab::SymbolId::NONE);
}

/// `class kit.Box[A] { def draw(label: => A, sizes: Int*): Box[A] }` with a
/// companion `object Box { class Lid }`
fn build_box(table: &mut SymbolTable) -> (SymbolId, SymbolId) {
    let (class, module) = enter_roots(table, "kit.Box").unwrap();
    let (by_name, _) = enter_roots(table, "scala.<byname>").unwrap();
    let (repeated, _) = enter_roots(table, "scala.<repeated>").unwrap();
    let (int, _) = enter_roots(table, "scala.Int").unwrap();

    let a = table.names.type_name("A");
    let tparam = table.new_type_parameter(class, a, Flags::NONE);
    let bounds = table.types.bounds(TypeTable::NO_TYPE, TypeTable::NO_TYPE);
    table.set_info(tparam, bounds);
    let decls = table.scopes.create(ScopeKind::Class, class);
    let body = table.types.class_info(Vec::new(), decls, class);
    let info = table.types.poly_type(vec![tparam], body);
    table.set_info(class, info);
    let a_ref = table.types.type_ref(TypeTable::NO_PREFIX, tparam, []);
    let box_of_a = table.types.type_ref(TypeTable::NO_PREFIX, class, [a_ref]);

    let draw = table.names.term_name("draw");
    let method = table.new_method_symbol(class, draw, Position::NONE, Flags::METHOD);
    let label = table.names.term_name("label");
    let label_param = table.new_value_parameter(method, label, Flags::BYNAMEPARAM);
    let label_tpe = table.types.type_ref(TypeTable::NO_PREFIX, by_name, [a_ref]);
    table.set_info(label_param, label_tpe);
    let sizes = table.names.term_name("sizes");
    let sizes_param = table.new_value_parameter(method, sizes, Flags::NONE);
    let int_ref = table.types.type_ref(TypeTable::NO_PREFIX, int, []);
    let sizes_tpe = table.types.type_ref(TypeTable::NO_PREFIX, repeated, [int_ref]);
    table.set_info(sizes_param, sizes_tpe);
    let mt = table.types.method_type(vec![label_param, sizes_param], box_of_a);
    table.set_info(method, mt);
    enter(table, decls, method);

    let mdecls = module_info(table, module);
    let module_class = table.module_class(module);
    let lid = table.names.type_name("Lid");
    let nested = table.new_class_symbol(module_class, lid, Position::NONE, Flags::NONE);
    class_info(table, nested);
    enter(table, mdecls, nested);
    (class, module)
}

#[test]
fn test_round_trip_preserves_type_params_nesting_and_param_shapes() {
    logging::init_test();
    let mut source = SymbolTable::new();
    let (class, module) = build_box(&mut source);
    let bytes = pickle(&mut source, class, module).unwrap();

    let mut target = SymbolTable::new();
    let (class, module) = enter_roots(&mut target, "kit.Box").unwrap();
    let (by_name, _) = enter_roots(&mut target, "scala.<byname>").unwrap();
    let (repeated, _) = enter_roots(&mut target, "scala.<repeated>").unwrap();
    let (int, _) = enter_roots(&mut target, "scala.Int").unwrap();
    unpickle(&mut target, &bytes, 0, class, module, "Box.sig").unwrap();

    // the class keeps its own type parameter around its class info
    let tparams = target.type_params(class).unwrap();
    assert_eq!(tparams.len(), 1);
    assert_eq!(target.decoded_name(tparams[0]), "A");
    assert_eq!(target.raw_owner(tparams[0]), class);
    let info = target.info(class).unwrap();
    let Type::Poly { result: body, .. } = target.types.get(info).clone() else {
        panic!("expected a polymorphic class info");
    };
    assert!(matches!(target.types.get(body), Type::ClassInfo { class: c, .. } if *c == class));

    let draw = member(&mut target, class, "draw");
    let draw_info = target.info(draw).unwrap();
    let Type::Method { params, result } = target.types.get(draw_info).clone() else {
        panic!("expected a method type");
    };
    let names: Vec<String> = params.iter().map(|&p| target.decoded_name(p).to_string()).collect();
    assert_eq!(names, vec!["label", "sizes"]);
    assert!(target.has_flag(params[0], Flags::BYNAMEPARAM));
    assert!(target.has_flag(params[1], Flags::PARAM));

    let label_info = target.info(params[0]).unwrap();
    let Type::TypeRef { sym, args, .. } = target.types.get(label_info).clone() else {
        panic!("expected a by-name type");
    };
    assert_eq!(sym, by_name);
    assert_eq!(target.types.type_symbol_direct(args[0]), tparams[0]);

    let sizes_info = target.info(params[1]).unwrap();
    let Type::TypeRef { sym, args, .. } = target.types.get(sizes_info).clone() else {
        panic!("expected a repeated type");
    };
    assert_eq!(sym, repeated);
    assert_eq!(target.types.type_symbol_direct(args[0]), int);

    let Type::TypeRef { sym, args, .. } = target.types.get(result).clone() else {
        panic!("expected a class type");
    };
    assert_eq!(sym, class);
    assert_eq!(target.types.type_symbol_direct(args[0]), tparams[0]);

    // the nested class lives in the module class, not in the package
    let module_class = target.module_class(module);
    let lid_name = target.names.type_name("Lid");
    let lid = target.decl(module_class, lid_name).unwrap();
    assert!(target.is_class(lid));
    assert_eq!(target.raw_owner(lid), module_class);
    assert_eq!(target.full_name(lid), "kit.Box.Lid");
    let lid_info = target.info(lid).unwrap();
    assert!(matches!(target.types.get(lid_info), Type::ClassInfo { class: c, .. } if *c == lid));
}
