//! Benchmarks for the per-command hot path: tokenizing arguments, substituting
//! `[name]` references and looking up bang names.

use criterion::{Criterion, criterion_group, criterion_main};
use indexmap::IndexMap;
use skinhost::host::BangTable;
use skinhost::services::{ValueProducers, VariableInterpolator, split_bracketed, tokenize};
use std::hint::black_box;

fn bench_tokenize(c: &mut Criterion) {
    let args = r#"MeterClock 10 "20" """raw "quoted" text""" Vendor\Clock"#;
    c.bench_function("tokenize", |b| b.iter(|| tokenize(black_box(args))));

    let batch = r#"[!Show A][!SetVariable X """[Y]"""][!Move 10 20 B][!Refresh *]"#;
    c.bench_function("split_bracketed", |b| {
        b.iter(|| split_bracketed(black_box(batch)))
    });
}

fn bench_interpolate(c: &mut Criterion) {
    let interpolator = VariableInterpolator::new();
    let mut values = IndexMap::new();
    for i in 0..32 {
        values.insert(format!("Measure{i}"), format!("{i}.5"));
    }
    let text = "!SetOption Meter Text \"[Measure3] of [Measure31] [*Measure1*] [Missing] [!Log]\"";

    c.bench_function("interpolate", |b| {
        b.iter(|| {
            interpolator
                .interpolate(black_box(text), Some(&values as &dyn ValueProducers))
                .into_owned()
        })
    });
}

fn bench_bang_lookup(c: &mut Criterion) {
    let table = BangTable::new();
    let names = [
        "!RainmeterShowMeterGroup",
        "!SetVariable",
        "!ZPos",
        "!RainmeterWriteKeyValue",
        "!NoSuchBang",
    ];

    c.bench_function("bang_lookup", |b| {
        b.iter(|| {
            for name in names {
                black_box(table.lookup(black_box(name)));
            }
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_interpolate, bench_bang_lookup);
criterion_main!(benches);
