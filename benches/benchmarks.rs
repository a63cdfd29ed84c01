use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use persist_machine::path::{pick, select};
use persist_machine::{
    build_action, Action, ActionStyle, MemoryStorage, PersistConfig, PersistMachine, SliceConfig,
    Store, Structure,
};
use serde_json::{json, Value};

fn build_action_benchmark(c: &mut Criterion) {
    c.bench_function("build_action", |b| {
        b.iter(|| {
            build_action(
                black_box("data.adminAuth.sessionTokens2"),
                ActionStyle::Screaming,
            )
        });
    });
}

fn select_pick_benchmark(c: &mut Criterion) {
    let state = json!({
        "data": { "adminAuth": { "token": "abc", "level": 3, "expires": 1700000000 } },
        "todos": [ { "title": "first" }, { "title": "second" } ]
    });
    let values = vec!["token".to_string(), "level".to_string()];

    c.bench_function("select_pick", |b| {
        b.iter(|| {
            let slice = select(black_box(&state), "data.adminAuth");
            black_box(pick(&slice, Some(&values[..])));
        });
    });
}

fn reducer(state: &mut Value, action: &Action) {
    if action.is("INCREMENT") {
        let value = state["counter"]["value"].as_i64().unwrap_or(0);
        state["counter"]["value"] = json!(value + 1);
    }
}

fn dispatch_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("persisted_dispatch");

    for slice_count in [1, 10, 100].iter() {
        let mut structure = Structure::new();
        let mut state = serde_json::Map::new();
        for i in 0..*slice_count {
            structure =
                structure.slice(format!("slice{i}"), SliceConfig::new(format!("@slice{i}")));
            state.insert(format!("slice{i}"), json!({ "value": i }));
        }
        state.insert("counter".to_string(), json!({ "value": 0 }));

        let machine =
            PersistMachine::new(structure, MemoryStorage::new(), PersistConfig::default()).unwrap();
        let store = Store::new(Value::Object(state), reducer).with_middleware(machine.middleware());
        let handle = runtime.block_on(async { machine.run(&store) });

        group.bench_with_input(
            BenchmarkId::from_parameter(slice_count),
            slice_count,
            |b, _| {
                b.iter(|| {
                    runtime
                        .block_on(store.dispatch(black_box(Action::new("INCREMENT"))))
                        .unwrap();
                });
            },
        );

        runtime.block_on(handle.shutdown()).unwrap();
    }
    group.finish();
}

criterion_group!(
    benches,
    build_action_benchmark,
    select_pick_benchmark,
    dispatch_benchmark,
);
criterion_main!(benches);
