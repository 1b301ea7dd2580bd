//! Search drivers over the coverage archives and the target scheduler.
//!
//! Genome representation, variation operators and fitness evaluation are
//! supplied by the caller through [`Variation`] and [`GoalEvaluator`].

mod climb;
mod engine;

pub use climb::*;
pub use engine::*;

use rand::rngs::StdRng;

use super::fitness::{FitnessVector, Objective};

/// Creates and varies genomes.
pub trait Variation<G> {
    /// A fresh random genome.
    fn random(&self, rng: &mut StdRng) -> G;

    /// Perturb a genome in place.
    fn mutate(&self, genome: &mut G, rng: &mut StdRng);

    /// Recombine two parents into one child.
    fn crossover(&self, first: &G, second: &G, rng: &mut StdRng) -> G;
}

/// Result of running one genome against the instrumented target.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Distance to every goal.
    pub fitness: FitnessVector,
    /// Goals the execution satisfied.
    pub resolved: Vec<Objective>,
}

/// Runs genomes and measures their distance to every goal.
pub trait GoalEvaluator<G>: Sync {
    fn evaluate(&self, genome: &G) -> Evaluation;
}
