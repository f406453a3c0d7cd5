//! Attribute access benchmarks.
//!
//! Measures the soft set path (hooks + coercion) against the hard path,
//! translated reads and warm definition lookups.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ormdb_entity::{DefinitionRegistry, DefinitionSchema, PropertySchema, Value};

fn registry() -> DefinitionRegistry {
    let registry = DefinitionRegistry::default();
    registry.register_schema(
        DefinitionSchema::new("Article")
            .with_property(PropertySchema::integer("id"))
            .with_property(PropertySchema::generic("title").i18n().with_length(80))
            .with_property(PropertySchema::date("published"))
            .with_property(PropertySchema::generic("tags").many()),
    );
    registry
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("attributes/set");
    let registry = registry();

    group.bench_function("soft", |b| {
        let mut entity = registry.make("Article", BTreeMap::new(), None).unwrap();
        b.iter(|| {
            entity.set("id", black_box("42")).unwrap();
            entity.set("published", black_box("2024-01-31")).unwrap();
        });
    });

    group.bench_function("raw", |b| {
        let mut entity = registry.make("Article", BTreeMap::new(), None).unwrap();
        b.iter(|| {
            entity.set_raw("id", black_box(42));
            entity.set_raw("published", black_box("2024-01-31"));
        });
    });

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("many", size), &size, |b, &size| {
            let mut entity = registry.make("Article", BTreeMap::new(), None).unwrap();
            let tags: Vec<Value> = (0..size).map(|i| Value::from(format!("tag{}", i))).collect();
            b.iter(|| {
                entity.set("tags", Value::List(tags.clone())).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("attributes/get");
    let registry = registry();
    let mut entity = registry.make("Article", BTreeMap::new(), None).unwrap();
    entity.set("title", "Hello").unwrap();
    for locale in ["fr", "de", "it", "es"] {
        entity.set_in("title", format!("title-{}", locale), locale).unwrap();
    }

    group.bench_function("active", |b| {
        b.iter(|| black_box(entity.get("title")));
    });

    group.bench_function("translated", |b| {
        b.iter(|| black_box(entity.get_in("title", "de")));
    });

    group.bench_function("to_array_i18n", |b| {
        b.iter(|| black_box(entity.to_array_i18n(&[])));
    });

    group.finish();
}

fn bench_definition_lookup(c: &mut Criterion) {
    let registry = registry();
    registry.get("Article").unwrap();

    c.bench_function("registry/get_warm", |b| {
        b.iter(|| black_box(registry.get("Article").unwrap()));
    });
}

criterion_group!(benches, bench_set, bench_get, bench_definition_lookup);
criterion_main!(benches);
