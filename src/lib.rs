//! covsearch - Many-objective goal coverage search.
//!
//! This crate provides the archive and scheduling core of a search-based
//! test generator: a bounded, crowding-aware Pareto archive over many
//! coverage goals, a first-winner goal coverage archive, and a scheduler that
//! switches the search target between reachable goals under a global time
//! budget.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, problem definition and report types
//! - `compute`: Archives, scheduler, budget monitor and search drivers
//!
//! # Example
//!
//! ```rust,no_run
//! use covsearch::{
//!     compute::CoverageSearch,
//!     compute::synthetic::{BranchTree, GaussianVariation},
//!     schema::{SearchConfig, SyntheticProblem},
//! };
//!
//! let problem = SyntheticProblem::default();
//! let tree = BranchTree::new(&problem).unwrap();
//! let variation = GaussianVariation::new(tree.dimensions(), &problem).unwrap();
//!
//! let mut search = CoverageSearch::new(
//!     SearchConfig::default(),
//!     tree.goals(),
//!     tree.dependencies(),
//!     variation,
//!     tree,
//! )
//! .unwrap();
//!
//! let outcome = search.run();
//! println!(
//!     "Covered {}/{} goals",
//!     outcome.report.stats.covered_goals, outcome.report.stats.total_goals
//! );
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{
    AdaptiveGridArchive, BudgetScheduler, Candidate, CoverageSearch, GoalCoverageArchive,
    Objective,
};
pub use schema::{SearchConfig, SearchReport};
