//! Benchmarks for spark-bind
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use spark_bind::binding::{parse_declarations, El};
use spark_bind::{batch, computed, Collection, Dom, MemoryDom, Store, View, ViewOptions};
use std::rc::Rc;

fn int(store: &Store, key: &str) -> i64 {
    store.get(key).as_i64().unwrap_or(0)
}

// =============================================================================
// STORE BENCHMARKS
// =============================================================================

fn bench_store_get(c: &mut Criterion) {
    let store = Store::new(json!({"name": "Charlie"}));
    c.bench_function("store_get", |b| b.iter(|| black_box(store.get("name"))));
}

fn bench_store_set(c: &mut Criterion) {
    let store = Store::new(json!({"count": 0}));
    let mut n = 0i64;
    c.bench_function("store_set", |b| {
        b.iter(|| {
            n += 1;
            store.set("count", black_box(json!(n))).unwrap();
        })
    });
}

fn bench_store_set_same_value(c: &mut Criterion) {
    let store = Store::new(json!({"count": 42}));
    c.bench_function("store_set_same_value", |b| {
        b.iter(|| store.set("count", black_box(json!(42))).unwrap())
    });
}

// =============================================================================
// COMPUTED BENCHMARKS
// =============================================================================

fn bench_computed_get_cached(c: &mut Criterion) {
    let store = Store::new(json!({"a": 1, "b": 2}));
    store.add_computed("sum", computed!(s => json!(int(s, "a") + int(s, "b"))));
    let _ = store.get("sum");
    c.bench_function("computed_get_cached", |b| b.iter(|| black_box(store.get("sum"))));
}

fn bench_computed_get_dirty(c: &mut Criterion) {
    let store = Store::new(json!({"a": 1, "b": 2}));
    store.add_computed("sum", computed!(s => json!(int(s, "a") + int(s, "b"))));
    let mut n = 0i64;
    c.bench_function("computed_get_dirty", |b| {
        b.iter(|| {
            n += 1;
            store.set("a", json!(n)).unwrap();
            black_box(store.get("sum"))
        })
    });
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let store = Store::new(json!({"c0": 0}));
            for level in 1..=depth {
                let prev = format!("c{}", level - 1);
                store.add_computed(&format!("c{level}"), computed!(s => json!(int(s, &prev) + 1)));
            }
            let top = format!("c{depth}");
            let mut n = 0i64;

            b.iter(|| {
                n += 1;
                store.set("c0", json!(n)).unwrap();
                black_box(store.get(&top))
            })
        });
    }

    group.finish();
}

fn bench_batched_writes(c: &mut Criterion) {
    let store = Store::new(json!({"a": 0, "b": 0, "c": 0}));
    store.add_computed("sum", computed!(s => json!(int(s, "a") + int(s, "b") + int(s, "c"))));
    let _sub = store.on_change("sum", |_| {});
    let mut n = 0i64;
    c.bench_function("batched_writes", |b| {
        b.iter(|| {
            n += 1;
            batch(|| {
                store.set("a", json!(n)).unwrap();
                store.set("b", json!(n)).unwrap();
                store.set("c", json!(n)).unwrap();
            });
        })
    });
}

// =============================================================================
// BINDING BENCHMARKS
// =============================================================================

fn bench_parse_declarations(c: &mut Criterion) {
    let source = "text:format('$1 $2', firstName, lastName), classes:{active: not(hidden)}, \
                  attr:{href: url, title: 'Profile'}, events:['keyup']";
    c.bench_function("parse_declarations", |b| {
        b.iter(|| black_box(parse_declarations(black_box(source)).unwrap()))
    });
}

fn bench_view_bind(c: &mut Criterion) {
    let model = Store::new(json!({"firstName": "Luke", "lastName": "Skywalker", "active": true}));
    c.bench_function("view_bind", |b| {
        b.iter(|| {
            let dom = Rc::new(MemoryDom::new());
            let root = dom.build(
                El::new("div")
                    .child(El::new("span").bind("text:firstName, toggle:active"))
                    .child(El::new("input").bind("value:lastName")),
            );
            black_box(View::new(dom, root, ViewOptions::new().model(model.clone())).unwrap())
        })
    });
}

fn bench_view_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_update");

    for count in [10, 100] {
        group.bench_with_input(BenchmarkId::new("bindings", count), &count, |b, &count| {
            let model = Store::new(json!({"name": "Luke"}));
            let dom = Rc::new(MemoryDom::new());
            let root = dom.build(
                El::new("div").children((0..count).map(|_| El::new("span").bind("text:name"))),
            );
            let _view = View::new(dom, root, ViewOptions::new().model(model.clone())).unwrap();
            let mut n = 0i64;

            b.iter(|| {
                n += 1;
                model.set("name", json!(n)).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_collection_add(c: &mut Criterion) {
    c.bench_function("collection_add", |b| {
        let dom = Rc::new(MemoryDom::new());
        let names = Collection::new().with_item_view(|dom: &Rc<dyn Dom>, record: &Store| {
            let el = El::new("li").bind("text:name").mount(dom.as_ref());
            View::new(dom.clone(), el, ViewOptions::new().model(record.clone()))
        });
        let root = dom.build(El::new("ul").bind("collection:$collection"));
        let _view = View::new(dom, root, ViewOptions::new().collection(names.clone())).unwrap();

        b.iter(|| {
            names.add_json(json!({"name": "Leia"}));
            if names.len() > 256 {
                names.reset(Vec::new());
            }
        })
    });
}

criterion_group!(
    store_benches,
    bench_store_get,
    bench_store_set,
    bench_store_set_same_value,
);

criterion_group!(
    computed_benches,
    bench_computed_get_cached,
    bench_computed_get_dirty,
    bench_computed_chain,
    bench_batched_writes,
);

criterion_group!(
    binding_benches,
    bench_parse_declarations,
    bench_view_bind,
    bench_view_update,
    bench_collection_add,
);

criterion_main!(store_benches, computed_benches, binding_benches);
