//! covsearch CLI - Run a coverage search over the synthetic branch tree.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;

use covsearch::{
    compute::synthetic::{BranchTree, GaussianVariation},
    compute::{CoverageSearch, ProgressCallback},
    schema::{SearchConfig, SearchProgress, SyntheticProblem},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run a goal coverage search over the synthetic branch tree.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!();
        eprintln!("The problem is read from <config>.problem.json when present.");
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config = SearchConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let problem_path = config_path.with_extension("problem.json");
    let problem = if problem_path.exists() {
        SyntheticProblem::from_json_file(&problem_path).unwrap_or_else(|e| {
            eprintln!("Error loading problem: {}", e);
            std::process::exit(1);
        })
    } else {
        SyntheticProblem::default()
    };

    let tree = BranchTree::new(&problem).unwrap_or_else(|e| {
        eprintln!("Error building problem: {}", e);
        std::process::exit(1);
    });
    let variation = GaussianVariation::new(tree.dimensions(), &problem).unwrap_or_else(|e| {
        eprintln!("Error building variation: {}", e);
        std::process::exit(1);
    });

    eprintln!("Coverage Search");
    eprintln!("===============");
    eprintln!("Goals: {} ({} levels)", problem.goals, tree.dimensions());
    eprintln!("Strategy: {:?}", config.strategy);
    eprintln!("Population: {}", config.population.size);
    eprintln!("Budget: {}ms", config.budget.search_budget_ms);
    eprintln!();

    let mut search: CoverageSearch<Vec<f64>, _, _> = CoverageSearch::new(
        config,
        tree.goals(),
        tree.dependencies(),
        variation,
        tree,
    )
    .unwrap_or_else(|e| {
        eprintln!("Error setting up search: {}", e);
        std::process::exit(1);
    });

    let callback: ProgressCallback = Box::new(|progress: &SearchProgress| {
        if progress.generation % 10 == 0 {
            eprintln!(
                "  Gen {}: {}/{} covered, target={:?}, budget={}ms, queued={}, retry={}, front={}",
                progress.generation,
                progress.covered_goals,
                progress.total_goals,
                progress.target,
                progress.target_budget_ms,
                progress.worklist,
                progress.retry,
                progress.front_size
            );
        }
    });

    let outcome = search.run_with_callback(callback);
    let stats = &outcome.report.stats;

    eprintln!();
    eprintln!(
        "Stopped: {:?} after {} generations",
        stats.stop_reason, stats.generations
    );
    eprintln!(
        "Coverage: {}/{} ({:.1}%), max reached after {}ms",
        stats.covered_goals,
        stats.total_goals,
        stats.coverage * 100.0,
        stats.time_to_max_coverage_ms
    );
    eprintln!(
        "Time: {:.2}s ({:.0} evals/s)",
        stats.elapsed_seconds, stats.evaluations_per_second
    );

    match serde_json::to_string_pretty(&outcome.report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_example_config() {
    let config = SearchConfig::default();
    let problem = SyntheticProblem::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    println!();
    println!("Example problem (config.problem.json):");
    println!("{}", serde_json::to_string_pretty(&problem).unwrap());
}
