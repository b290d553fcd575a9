use criterion::{criterion_group, criterion_main, Criterion};
use lrgen::{dfa::DFA, first_follow::FirstSets, lalr, Grammar};
use lrgen_tests::grammars;
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_expression, bench_parens, bench_textbook);

fn bench_expression(c: &mut Criterion) {
    bench_automaton(c, "expression", grammars::EXPRESSION);
}

fn bench_parens(c: &mut Criterion) {
    bench_automaton(c, "parens", grammars::PARENS);
}

fn bench_textbook(c: &mut Criterion) {
    bench_automaton(c, "textbook", grammars::TEXTBOOK);
}

fn bench_automaton(c: &mut Criterion, name: &str, source: &str) {
    let grammar = Grammar::from_str(source).unwrap();
    let first_sets = FirstSets::new(&grammar);

    c.bench_function(&format!("canonical/{}", name), |b| {
        b.iter(|| {
            let _dfa = black_box(DFA::generate(&grammar, &first_sets));
        });
    });

    let canonical = DFA::generate(&grammar, &first_sets);
    c.bench_function(&format!("lalr_merge/{}", name), |b| {
        b.iter(|| {
            let _merged = black_box(lalr::merge(&grammar, &canonical).unwrap());
        });
    });
}
