//! Benchmarks for the grid archive and a short coverage search.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use covsearch::{
    compute::synthetic::{BranchTree, GaussianVariation},
    compute::{AdaptiveGridArchive, CoverageSearch, FitnessVector, Objective, ScoredCandidate},
    schema::{GridConfig, PopulationConfig, SearchConfig, SyntheticProblem},
};

/// Points on a noisy front `sum(x) ~ 1` so most of them are mutually non-dominated.
fn front_points(count: usize, objectives: u32, seed: u64) -> Vec<ScoredCandidate<()>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let raw: Vec<f64> = (0..objectives).map(|_| rng.r#gen::<f64>()).collect();
            let total: f64 = raw.iter().sum();
            let fitness: FitnessVector = raw
                .iter()
                .enumerate()
                .map(|(i, &v)| (Objective(i as u32), v / total))
                .collect();
            ScoredCandidate::new(id as u64, (), fitness)
        })
        .collect()
}

fn bench_grid_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_add");

    for objectives in [2u32, 4, 8] {
        let points = front_points(1_000, objectives, 7);
        let config = GridConfig {
            capacity: 100,
            ..Default::default()
        };
        let goals: Vec<Objective> = (0..objectives).map(Objective).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}obj", objectives)),
            &objectives,
            |b, _| {
                b.iter(|| {
                    let mut archive = AdaptiveGridArchive::new(goals.clone(), &config).unwrap();
                    for point in &points {
                        archive.add(black_box(point.clone()));
                    }
                    archive.len()
                });
            },
        );
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for goals in [15u32, 63] {
        let problem = SyntheticProblem {
            goals,
            ..Default::default()
        };
        let config = SearchConfig {
            population: PopulationConfig {
                size: 30,
                max_generations: Some(50),
                ..Default::default()
            },
            random_seed: Some(1),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(goals), &goals, |b, _| {
            b.iter(|| {
                let tree = BranchTree::new(&problem).unwrap();
                let variation = GaussianVariation::new(tree.dimensions(), &problem).unwrap();
                let mut search: CoverageSearch<Vec<f64>, _, _> = CoverageSearch::new(
                    config.clone(),
                    tree.goals(),
                    tree.dependencies(),
                    variation,
                    tree,
                )
                .unwrap();
                search.run().report.stats.covered_goals
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grid_add, bench_search);
criterion_main!(benches);
