//! Benchmarks for reading signature pickles

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diagnostics::Position;
use sigtab_compiler::pickle::{enter_roots, pickle, unpickle, PickleBuffer};
use sigtab_compiler::symtab::{Flags, ScopeKind, SymbolTable, TypeTable};

/// Pickle of a class with `count` methods returning the class itself
fn generate_wide_class(count: usize) -> Vec<u8> {
    let mut table = SymbolTable::new();
    let (class, module) = enter_roots(&mut table, "bench.Wide").expect("roots");
    let decls = table.scopes.create(ScopeKind::Class, class);
    let info = table.types.class_info(Vec::new(), decls, class);
    table.set_info(class, info);
    let self_ref = table.types.type_ref(TypeTable::NO_PREFIX, class, []);
    let result = table.types.nullary_method_type(self_ref);

    for i in 0..count {
        let name = table.names.term_name(&format!("member{}", i));
        let method = table.new_method_symbol(class, name, Position::NONE, Flags::METHOD);
        table.set_info(method, result);
        table.scopes.get_mut(decls).enter(name, method);
    }

    let module_class = table.module_class(module);
    let mdecls = table.scopes.create(ScopeKind::Class, module_class);
    let minfo = table.types.class_info(Vec::new(), mdecls, module_class);
    table.set_info(module_class, minfo);
    let mtpe = table.types.type_ref(TypeTable::NO_PREFIX, module_class, []);
    table.set_info(module, mtpe);

    pickle(&mut table, class, module).expect("pickle")
}

fn benchmark_enter_symbols(c: &mut Criterion) {
    let mut group = c.benchmark_group("enter_symbols");

    for count in [10, 100, 1000].iter() {
        let bytes = generate_wide_class(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut table = SymbolTable::new();
                let (class, module) = enter_roots(&mut table, "bench.Wide").expect("roots");
                unpickle(&mut table, black_box(bytes), 0, class, module, "Wide.sig").expect("unpickle");
                black_box(table.symbol_count())
            });
        });
    }

    group.finish();
}

fn benchmark_force_infos(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_infos");

    for count in [10, 100, 1000].iter() {
        let bytes = generate_wide_class(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut table = SymbolTable::new();
                let (class, module) = enter_roots(&mut table, "bench.Wide").expect("roots");
                unpickle(&mut table, bytes, 0, class, module, "Wide.sig").expect("unpickle");
                let members = table.decls(class).expect("decls");
                for sym in members {
                    black_box(table.info(sym).expect("info"));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_nat_codec(c: &mut Criterion) {
    c.bench_function("nat_codec", |b| {
        b.iter(|| {
            let mut buf = PickleBuffer::new();
            for i in 0..1000u32 {
                buf.write_nat(black_box(i * 977));
            }
            let mut sum = 0u64;
            while buf.read_index() < buf.len() {
                sum += u64::from(buf.read_nat().expect("nat"));
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    benchmark_enter_symbols,
    benchmark_force_infos,
    benchmark_nat_codec
);
criterion_main!(benches);
