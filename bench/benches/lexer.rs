use criterion::{criterion_group, criterion_main, Criterion};
use nsl::{arena::Arena, lexer, token::Token};
use std::hint::black_box;

static INPUT: &str = include_str!("../../samples/big.nsl");

fn lex<'a>(input: &str, arena: &'a Arena, tokens: &mut Vec<Token<'a>>) {
    lexer::lex(input, arena, tokens).unwrap();
    black_box(tokens.len());
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("lexer", |b| {
        b.iter(|| {
            // Identifier text is arena-allocated, so every run needs a fresh
            // arena to stay under the capacity.
            let arena = Arena::default();
            let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY * 32);
            lex(black_box(INPUT), &arena, &mut tokens);
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
