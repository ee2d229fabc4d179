use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parscript::codec::{as_map, to_foreign, to_host};
use parscript::Value;

/// A variables map the size of a busy workflow: scalars, vectors and one
/// level of nesting.
fn make_variables(entries: usize) -> Value {
    let mut map = BTreeMap::new();
    for i in 0..entries {
        let value = match i % 4 {
            0 => Value::Int(i as i64),
            1 => Value::Str(format!("value-{i}")),
            2 => Value::List((0..16).map(|n| Value::Float(n as f64 * 0.5)).collect()),
            _ => Value::Map(BTreeMap::from([
                ("ok".to_owned(), Value::Bool(i % 3 == 0)),
                ("name".to_owned(), Value::Str(format!("task{i}"))),
            ])),
        };
        map.insert(format!("var{i}"), value);
    }
    Value::Map(map)
}

fn bench_codec(c: &mut Criterion) {
    let small = make_variables(10);
    let large = make_variables(1000);
    let large_rexp = to_foreign(&large).unwrap();

    c.bench_function("to_foreign_small", |b| {
        b.iter(|| to_foreign(black_box(&small)).unwrap())
    });
    c.bench_function("to_foreign_large", |b| {
        b.iter(|| to_foreign(black_box(&large)).unwrap())
    });
    c.bench_function("to_host_large", |b| {
        b.iter(|| to_host(black_box(&large_rexp)).unwrap())
    });
    c.bench_function("as_map_large", |b| {
        b.iter(|| as_map(black_box(&large_rexp)).unwrap())
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
