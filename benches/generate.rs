//! Benchmarks for facade generation.
//!
//! Measures the pipeline on synthetic registries:
//! - Type name rendering (nested generics)
//! - Single type generation (mixed strategies, overloads)
//! - Whole-registry runs, sequential and parallel

extern crate dotfacade;

use criterion::{criterion_group, criterion_main, Criterion};
use dotfacade::prelude::*;
use std::{hint::black_box, sync::Arc};

fn int() -> TypeRc {
    Arc::new(TypeRef::primitive(TypeFlavor::I4))
}

/// Builds `count` classes, each with a private field, a property on a hidden type and a
/// three-way overloaded private method.
fn registry(count: usize) -> MemoryMetadata {
    let metadata = MemoryMetadata::new("Bench");
    let void = Arc::new(TypeRef::primitive(TypeFlavor::Void));
    let secret = metadata
        .define(TypeRef::class("Bench", "Secret").hidden())
        .unwrap();

    for index in 0..count {
        let ty = metadata
            .define(TypeRef::class("Bench", &format!("Type{index}")))
            .unwrap();
        metadata
            .add_field(FieldDescriptor::new("value", &ty, &int(), MemberAccess::Private))
            .unwrap();
        metadata
            .add_property(
                PropertyDescriptor::new("Tag", &ty, &secret)
                    .with_getter(MemberAccess::Private)
                    .with_setter(MemberAccess::Private),
            )
            .unwrap();
        for overload in 0..3 {
            let mut method = MethodDescriptor::new("Run", &ty, &void, MemberAccess::Private);
            for param in 0..overload {
                method = method.with_param(
                    ParameterDescriptor::new(&format!("p{param}"), &int())
                        .with_default(Literal::I4(param)),
                );
            }
            metadata.add_method(method).unwrap();
        }
    }

    metadata
}

/// Benchmark rendering a nested generic instantiation.
/// Type: Outer`1+Inner`1<Dictionary`2<int, string>[], int>
fn bench_render_nested_generic(c: &mut Criterion) {
    let string = Arc::new(TypeRef::primitive(TypeFlavor::String));
    let dictionary = Arc::new(
        TypeRef::class("System.Collections.Generic", "Dictionary`2")
            .with_assembly("System.Private.CoreLib"),
    );
    let inner = Arc::new(TypeRef::generic_instance(&dictionary, vec![int(), string]));
    let array = Arc::new(TypeRef::array(&inner, 1));
    let outer = Arc::new(TypeRef::class("Bench", "Outer`1+Inner`1"));
    let ty = TypeRef::generic_instance(&outer, vec![array, int()]);

    c.bench_function("render_nested_generic", |b| {
        b.iter(|| black_box(render(black_box(&ty))));
    });
}

/// Benchmark generating the facade of a single type.
fn bench_generate_single_type(c: &mut Criterion) {
    let metadata = registry(1);
    let generator = FacadeGenerator::new(&metadata, GeneratorConfig::sequential());
    let types = metadata.types();
    let ty = &types[1];

    c.bench_function("generate_single_type", |b| {
        b.iter(|| {
            let facade = generator.generate_type(black_box(ty)).unwrap();
            black_box(facade)
        });
    });
}

/// Benchmark a sequential run over 200 types.
fn bench_run_sequential(c: &mut Criterion) {
    let metadata = registry(200);
    let generator = FacadeGenerator::new(&metadata, GeneratorConfig::sequential());

    c.bench_function("run_sequential_200", |b| {
        b.iter(|| black_box(generator.run()));
    });
}

/// Benchmark a parallel run over 200 types.
fn bench_run_parallel(c: &mut Criterion) {
    let metadata = registry(200);
    let generator = FacadeGenerator::new(&metadata, GeneratorConfig::default());

    c.bench_function("run_parallel_200", |b| {
        b.iter(|| black_box(generator.run()));
    });
}

criterion_group!(
    benches,
    bench_render_nested_generic,
    bench_generate_single_type,
    bench_run_sequential,
    bench_run_parallel,
);
criterion_main!(benches);
