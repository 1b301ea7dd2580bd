//! Synthetic branch-tree problem over real-valued genomes.
//!
//! Stands in for an instrumented program: each goal is a window condition on
//! one gene, nested inside its parent's condition. Fitness follows the usual
//! approach-level plus normalized branch-distance shape, scaled into `[0, 1)`.

use rand::prelude::*;
use rand_distr::Normal;

use super::fitness::{FitnessVector, Objective};
use super::scheduler::GoalDependencies;
use super::search::{Evaluation, GoalEvaluator, Variation};
use crate::schema::{ProblemError, SyntheticProblem};

/// Nested window conditions arranged as a complete binary tree.
#[derive(Debug, Clone)]
pub struct BranchTree {
    centres: Vec<f64>,
    width: f64,
}

impl BranchTree {
    /// Build the goal tree described by `problem`.
    pub fn new(problem: &SyntheticProblem) -> Result<Self, ProblemError> {
        problem.validate()?;

        let mut rng = StdRng::seed_from_u64(problem.layout_seed);
        let reach = problem.range - problem.width;
        let centres = (0..problem.goals)
            .map(|_| rng.gen_range(-reach..=reach))
            .collect();

        Ok(Self {
            centres,
            width: problem.width,
        })
    }

    /// Every goal in the tree, in id order.
    pub fn goals(&self) -> Vec<Objective> {
        (0..self.centres.len() as u32).map(Objective).collect()
    }

    /// Goal `i` guards goals `2i + 1` and `2i + 2`.
    pub fn dependencies(&self) -> GoalDependencies {
        let n = self.centres.len();
        (0..n)
            .flat_map(|i| [2 * i + 1, 2 * i + 2].map(move |child| (i, child)))
            .filter(|&(_, child)| child < n)
            .map(|(i, child)| (Objective(i as u32), Objective(child as u32)))
            .collect()
    }

    /// Genome length: one gene per tree level.
    pub fn dimensions(&self) -> usize {
        depth(self.centres.len() - 1) + 1
    }

    /// How far `genome` is from satisfying the condition of `node` alone.
    fn gap(&self, node: usize, genome: &[f64]) -> f64 {
        let value = genome.get(depth(node)).copied().unwrap_or(0.0);
        ((value - self.centres[node]).abs() - self.width).max(0.0)
    }

    fn distance(&self, goal: usize, gaps: &[f64]) -> f64 {
        let path = path_to(goal);
        for (level, &node) in path.iter().enumerate() {
            let gap = gaps[node];
            if gap > 0.0 {
                let approach = (path.len() - 1 - level) as f64;
                return (approach + gap / (gap + 1.0)) / path.len() as f64;
            }
        }
        0.0
    }
}

impl GoalEvaluator<Vec<f64>> for BranchTree {
    fn evaluate(&self, genome: &Vec<f64>) -> Evaluation {
        let gaps: Vec<f64> = (0..self.centres.len())
            .map(|node| self.gap(node, genome))
            .collect();

        let fitness: FitnessVector = (0..self.centres.len())
            .map(|goal| (Objective(goal as u32), self.distance(goal, &gaps)))
            .collect();
        let resolved = fitness.satisfied().collect();

        Evaluation { fitness, resolved }
    }
}

fn depth(node: usize) -> usize {
    (usize::BITS - 1 - (node + 1).leading_zeros()) as usize
}

/// Nodes from the root down to `goal`.
fn path_to(goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut node = goal;
    while node > 0 {
        node = (node - 1) / 2;
        path.push(node);
    }
    path.reverse();
    path
}

/// Uniform random genomes, Gaussian mutation and uniform crossover.
#[derive(Debug, Clone)]
pub struct GaussianVariation {
    dimensions: usize,
    range: f64,
    noise: Normal<f64>,
}

impl GaussianVariation {
    /// Create operators for genomes of `dimensions` genes.
    pub fn new(dimensions: usize, problem: &SyntheticProblem) -> Result<Self, ProblemError> {
        let noise = Normal::new(0.0, problem.mutation_sigma)
            .map_err(|_| ProblemError::InvalidSigma(problem.mutation_sigma))?;
        Ok(Self {
            dimensions,
            range: problem.range,
            noise,
        })
    }
}

impl Variation<Vec<f64>> for GaussianVariation {
    fn random(&self, rng: &mut StdRng) -> Vec<f64> {
        (0..self.dimensions)
            .map(|_| rng.gen_range(-self.range..=self.range))
            .collect()
    }

    /// Perturbs one gene for sure and every other gene with probability `1/n`.
    fn mutate(&self, genome: &mut Vec<f64>, rng: &mut StdRng) {
        if genome.is_empty() {
            return;
        }
        let rate = 1.0 / genome.len() as f64;
        let forced = rng.gen_range(0..genome.len());
        for (i, gene) in genome.iter_mut().enumerate() {
            if i == forced || rng.gen_bool(rate) {
                *gene = (*gene + self.noise.sample(rng)).clamp(-self.range, self.range);
            }
        }
    }

    fn crossover(&self, first: &Vec<f64>, second: &Vec<f64>, rng: &mut StdRng) -> Vec<f64> {
        first
            .iter()
            .zip(second)
            .map(|(&a, &b)| if rng.gen_bool(0.5) { a } else { b })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(goals: u32) -> BranchTree {
        BranchTree::new(&SyntheticProblem {
            goals,
            ..Default::default()
        })
        .unwrap()
    }

    /// A genome sitting on the centre of every condition along `goal`'s path.
    fn genome_for(tree: &BranchTree, goal: usize) -> Vec<f64> {
        let mut genome = vec![0.0; tree.dimensions()];
        for node in path_to(goal) {
            genome[depth(node)] = tree.centres[node];
        }
        genome
    }

    #[test]
    fn test_tree_shape() {
        assert_eq!(depth(0), 0);
        assert_eq!(depth(2), 1);
        assert_eq!(depth(3), 2);
        assert_eq!(depth(6), 2);
        assert_eq!(depth(7), 3);
        assert_eq!(path_to(4), vec![0, 1, 4]);

        let tree = tree(7);
        assert_eq!(tree.dimensions(), 3);
        assert_eq!(tree.goals().len(), 7);

        let deps = tree.dependencies();
        let children: Vec<Objective> = deps.dependents(Objective(1)).collect();
        assert_eq!(children, vec![Objective(3), Objective(4)]);
        assert_eq!(deps.dependents(Objective(3)).count(), 0);
    }

    #[test]
    fn test_dependencies_stop_at_last_goal() {
        let deps = tree(6).dependencies();
        let children: Vec<Objective> = deps.dependents(Objective(2)).collect();
        assert_eq!(children, vec![Objective(5)]);
    }

    #[test]
    fn test_path_genome_resolves_path() {
        let tree = tree(7);
        let evaluation = tree.evaluate(&genome_for(&tree, 4));

        for goal in [0, 1, 4] {
            assert!(evaluation.resolved.contains(&Objective(goal)));
            assert_eq!(evaluation.fitness.value(Objective(goal)), 0.0);
        }
    }

    #[test]
    fn test_distance_shape() {
        let tree = tree(7);
        let mut genome = genome_for(&tree, 4);
        // Leave the root window.
        genome[0] = tree.centres[0] + tree.width + 1.0;
        let evaluation = tree.evaluate(&genome);

        let root = evaluation.fitness.value(Objective(0));
        let leaf = evaluation.fitness.value(Objective(4));
        assert!((root - 0.5).abs() < 1e-9);
        // Two levels of approach plus the same branch distance, over three levels.
        assert!((leaf - 2.5 / 3.0).abs() < 1e-9);
        assert!(evaluation.resolved.is_empty());

        for (_, value) in evaluation.fitness.iter() {
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_layout_is_reproducible() {
        assert_eq!(tree(15).centres, tree(15).centres);
        for &centre in &tree(15).centres {
            assert!(centre.abs() <= 0.9);
        }
    }

    #[test]
    fn test_variation_stays_in_range() {
        let problem = SyntheticProblem::default();
        let variation = GaussianVariation::new(4, &problem).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let mut genome = variation.random(&mut rng);
        assert_eq!(genome.len(), 4);
        let before = genome.clone();
        for _ in 0..100 {
            variation.mutate(&mut genome, &mut rng);
            assert!(genome.iter().all(|g| g.abs() <= problem.range));
        }
        assert_ne!(genome, before);

        let other = variation.random(&mut rng);
        let child = variation.crossover(&genome, &other, &mut rng);
        assert!(
            child
                .iter()
                .enumerate()
                .all(|(i, &g)| g == genome[i] || g == other[i])
        );
    }
}
