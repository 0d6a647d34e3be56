//! Criterion benchmarks for the document hot paths.
//!
//! Tracked mutation runs inline with every settings write, so it must stay
//! close to the cost of the raw `serde_json` operation.  Rendering and the
//! save path are measured over documents of growing size.
//!
//! Run with:
//! ```bash
//! cargo bench --package cfgstore-core --bench document_bench
//! ```

use std::fs;

use cfgstore_core::{ConfigProvider, DocumentFormat, Json, JsonProvider, Toml, TrackedDocument};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};
use uuid::Uuid;

// ── Fixture builders ──────────────────────────────────────────────────────────

/// A settings object with `n` sections of a few scalar fields each.
fn build_tree(n: usize) -> Value {
    let mut root = Map::new();
    for i in 0..n {
        root.insert(
            format!("section_{i:04}"),
            json!({ "enabled": i % 2 == 0, "volume": i, "label": format!("mod-{i}") }),
        );
    }
    Value::Object(root)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_tracked_set(c: &mut Criterion) {
    let mut doc = TrackedDocument::from_value(build_tree(100));
    c.bench_function("tracked_set_nested", |b| {
        b.iter(|| {
            doc.edit()
                .set(black_box("/section_0050/volume"), black_box(json!(7)))
                .ok()
        })
    });
}

fn bench_render_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for count in [10usize, 100, 1000] {
        let tree = build_tree(count);
        group.bench_with_input(BenchmarkId::new("json", count), &tree, |b, tree| {
            b.iter(|| Json::render(black_box(tree)))
        });
        group.bench_with_input(BenchmarkId::new("toml", count), &tree, |b, tree| {
            b.iter(|| Toml::render(black_box(tree)))
        });
    }
    group.finish();
}

fn bench_save_and_load(c: &mut Criterion) {
    let dir = std::env::temp_dir().join(format!("cfgstore_bench_{}", Uuid::new_v4()));
    let path = dir.join("settings.json");
    let mut provider = JsonProvider::new(&path);
    provider.replace_document(build_tree(100));

    c.bench_function("json_save_100", |b| b.iter(|| provider.save()));
    c.bench_function("json_load_100", |b| b.iter(|| provider.load()));

    fs::remove_dir_all(&dir).ok();
}

criterion_group!(
    benches,
    bench_tracked_set,
    bench_render_scaling,
    bench_save_and_load,
);
criterion_main!(benches);
