use criterion::{criterion_group, criterion_main, Criterion};
use nsl::{compile, Options, Source};
use std::hint::black_box;

static INPUT: &str = include_str!("../../samples/big.nsl");

fn criterion_benchmark(c: &mut Criterion) {
    let options = Options::default();
    let source = Source {
        name: "big.nsl",
        text: INPUT,
    };

    c.bench_function("compile", |b| {
        b.iter(|| {
            let compiled = compile(black_box(&source), &options).unwrap();
            black_box(compiled.ir.len());
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
