use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use restrictions_core::{evaluate, AreaRule, MessageRule, PopulationBounds, Restriction, RuleSet};

fn restriction_with(rules: usize) -> Restriction {
    let bounds = |i: usize| PopulationBounds::new((i % 16) as i32, ((i % 16) + 8) as i32);
    Restriction {
        model: "models/props/barrier.vmdl".to_string(),
        messages: (0..rules)
            .map(|i| {
                (
                    format!("message_{i}"),
                    MessageRule {
                        bounds: bounds(i),
                        message: Some(format!("rule {i}")),
                    },
                )
            })
            .collect::<RuleSet<_>>(),
        areas: (0..rules)
            .map(|i| {
                (
                    format!("area_{i}"),
                    AreaRule {
                        bounds: bounds(i),
                        ..AreaRule::default()
                    },
                )
            })
            .collect::<RuleSet<_>>(),
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for rules in [4usize, 16, 64, 256] {
        let restriction = restriction_with(rules);
        group.bench_with_input(
            BenchmarkId::new("rules", rules),
            &restriction,
            |b, restriction| {
                b.iter(|| {
                    for players in 0..32usize {
                        criterion::black_box(evaluate(players, restriction));
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(evaluate_benches, bench_evaluate);
criterion_main!(evaluate_benches);
