// Criterion benchmarks for CS Grader response parsing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cs_grader::core::{
    assemble_testing_code, average_embeddings, parse_evaluation, parse_quick_evaluation,
    similar_solutions_context,
};
use cs_grader::models::SimilarSolution;

const EVALUATION_REPLY: &str = r#"Here is the evaluation you asked for.
{
    "score": 0.82,
    "feedback": "The solution iterates once and accumulates correctly.",
    "logical_analysis": {
        "correctness": "Correct for non-empty input",
        "efficiency": "Linear time, constant space",
        "readability": "Clear variable names"
    },
    "potential_issues": ["Empty input returns nothing", "No type checks"]
}
Let me know if you need more detail."#;

const QUICK_REPLY: &str = "Score: 0.7\n\nThe approach is mostly right.\n\n\
The loop bounds are correct.\n\nOne issue: the accumulator is never reset.\n\n\
A second problem: negative values are ignored.";

fn create_solutions(count: usize) -> Vec<SimilarSolution> {
    (0..count)
        .map(|i| SimilarSolution {
            question: format!("Question {}", i),
            pseudocode: format!("FOR i IN 1..{}\n    total = total + i", i),
            similarity: (i % 10) as f64 / 10.0,
        })
        .collect()
}

fn bench_parse_evaluation(c: &mut Criterion) {
    c.bench_function("parse_evaluation", |b| {
        b.iter(|| parse_evaluation(black_box(EVALUATION_REPLY), Vec::new()));
    });
}

fn bench_parse_quick_evaluation(c: &mut Criterion) {
    c.bench_function("parse_quick_evaluation", |b| {
        b.iter(|| parse_quick_evaluation(black_box(QUICK_REPLY), "command"));
    });
}

fn bench_assemble_testing_code(c: &mut Criterion) {
    let reply = r#"{"imports": "from main import *\nimport random", "tests": "```python\ndef test_total():\n    assert total([1, 2]) == 3\n```"}"#;
    c.bench_function("assemble_testing_code", |b| {
        b.iter(|| assemble_testing_code(black_box(reply)));
    });
}

fn bench_similar_solutions_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("similar_solutions_context");

    for count in [5, 20, 50].iter() {
        let solutions = create_solutions(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| similar_solutions_context(black_box(&solutions), 0.5));
        });
    }

    group.finish();
}

fn bench_average_embeddings(c: &mut Criterion) {
    // embed-english-v3.0 vectors have 1024 dimensions
    let a: Vec<f32> = (0..1024).map(|i| i as f32 / 1024.0).collect();
    let b: Vec<f32> = (0..1024).map(|i| 1.0 - i as f32 / 1024.0).collect();

    c.bench_function("average_embeddings_1024", |bench| {
        bench.iter(|| average_embeddings(black_box(&a), black_box(&b)));
    });
}

criterion_group!(
    benches,
    bench_parse_evaluation,
    bench_parse_quick_evaluation,
    bench_assemble_testing_code,
    bench_similar_solutions_context,
    bench_average_embeddings
);
criterion_main!(benches);
