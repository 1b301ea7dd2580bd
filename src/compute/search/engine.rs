//! Search loop driving the target scheduler and the archives.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info};
use rand::prelude::*;
use rayon::prelude::*;

use crate::compute::archive::{AdaptiveGridArchive, ArchiveError, GoalCoverageArchive};
use crate::compute::clock::{Clock, SystemClock};
use crate::compute::fitness::{Candidate, Objective, ScoredCandidate};
use crate::compute::monitor::BudgetConsumptionMonitor;
use crate::compute::scheduler::{BudgetScheduler, GoalDependencies, SchedulerError};
use crate::schema::{
    ConfigError, CoverageHistory, CoveredGoal, SearchConfig, SearchProgress, SearchReport,
    SearchStats, SearchStrategy, StopReason,
};

use super::climb::accept;
use super::{GoalEvaluator, Variation};

/// An evaluated genome shared between the population and the archives.
pub type Individual<G> = Arc<ScoredCandidate<G>>;

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&SearchProgress) + Send + Sync>;

/// Errors raised while setting up a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid goal structure: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("Invalid grid archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// Everything a finished search hands back.
#[derive(Debug, Clone)]
pub struct SearchOutcome<G> {
    /// Covered goals and their covering candidates.
    pub coverage: GoalCoverageArchive<Individual<G>>,
    /// Final contents of the grid archive.
    pub front: Vec<Individual<G>>,
    pub report: SearchReport,
}

/// Coverage search over a fixed goal set.
///
/// Each generation optimizes the scheduler's current target, records every
/// goal the new candidates satisfy, lets the scheduler pick up collateral
/// coverage and switch targets, and keeps a diverse archive over all goals
/// still in play.
pub struct CoverageSearch<G: Clone, V, E, K: Clock = SystemClock> {
    config: SearchConfig,
    variation: V,
    evaluator: E,
    rng: StdRng,
    clock: K,
    scheduler: BudgetScheduler<K>,
    coverage: GoalCoverageArchive<Individual<G>>,
    grid: AdaptiveGridArchive<Individual<G>>,
    monitor: BudgetConsumptionMonitor<K>,
    population: Vec<Individual<G>>,
    history: CoverageHistory,
    generation: usize,
    evaluations: u64,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl<G, V, E> CoverageSearch<G, V, E, SystemClock>
where
    G: Clone + Send + Sync,
    V: Variation<G>,
    E: GoalEvaluator<G>,
{
    /// Create a search whose budget starts now.
    pub fn new<I>(
        config: SearchConfig,
        goals: I,
        dependencies: GoalDependencies,
        variation: V,
        evaluator: E,
    ) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = Objective>,
    {
        Self::with_clock(config, goals, dependencies, variation, evaluator, SystemClock)
    }
}

impl<G, V, E, K> CoverageSearch<G, V, E, K>
where
    G: Clone + Send + Sync,
    V: Variation<G>,
    E: GoalEvaluator<G>,
    K: Clock + Clone,
{
    /// Create a search timed by `clock`.
    pub fn with_clock<I>(
        config: SearchConfig,
        goals: I,
        dependencies: GoalDependencies,
        variation: V,
        evaluator: E,
        clock: K,
    ) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = Objective>,
    {
        config.validate()?;

        let goals: BTreeSet<Objective> = goals.into_iter().collect();
        let deadline = clock.now() + Duration::from_millis(config.budget.search_budget_ms);
        let scheduler = BudgetScheduler::new(
            goals.iter().copied(),
            dependencies,
            config.scheduler.insertion.into(),
            deadline,
            clock.clone(),
        )?;
        let grid = AdaptiveGridArchive::new(Vec::new(), &config.grid)?;
        let seed = config.random_seed.unwrap_or_else(rand::random);

        Ok(Self {
            variation,
            evaluator,
            rng: StdRng::seed_from_u64(seed),
            monitor: BudgetConsumptionMonitor::with_clock(clock.clone()),
            clock,
            scheduler,
            coverage: GoalCoverageArchive::new(goals),
            grid,
            population: Vec::new(),
            history: CoverageHistory::default(),
            generation: 0,
            evaluations: 0,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Get the coverage archive.
    pub fn coverage(&self) -> &GoalCoverageArchive<Individual<G>> {
        &self.coverage
    }

    /// Get the grid archive.
    pub fn grid(&self) -> &AdaptiveGridArchive<Individual<G>> {
        &self.grid
    }

    /// Get the target scheduler.
    pub fn scheduler(&self) -> &BudgetScheduler<K> {
        &self.scheduler
    }

    /// Get current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Create and evaluate the initial population, then pick the first target.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.coverage.set_generation(0);

        let size = match self.config.strategy {
            SearchStrategy::Generational => self.config.population.size,
            SearchStrategy::HillClimb => 1,
        };
        let genomes: Vec<G> = (0..size)
            .map(|_| self.variation.random(&mut self.rng))
            .collect();
        let initial = self.evaluate(genomes);
        self.record(&initial);
        self.population = initial.clone();

        self.scheduler.start(&self.coverage);
        self.finish_generation(&initial);
    }

    /// Evaluate genomes in parallel, assigning fresh ids.
    fn evaluate(&mut self, genomes: Vec<G>) -> Vec<Individual<G>> {
        let ids: Vec<u64> = genomes
            .iter()
            .map(|_| self.next_id.fetch_add(1, Ordering::Relaxed))
            .collect();
        let evaluator = &self.evaluator;
        let generation = self.generation;

        let evaluated: Vec<Individual<G>> = ids
            .into_par_iter()
            .zip(genomes)
            .map(|(id, genome)| {
                let evaluation = evaluator.evaluate(&genome);
                let fitness = evaluation.fitness.with_satisfied(&evaluation.resolved);
                let mut candidate = ScoredCandidate::new(id, genome, fitness);
                candidate.generation = generation;
                Arc::new(candidate)
            })
            .collect();

        self.evaluations += evaluated.len() as u64;
        evaluated
    }

    /// Record every goal the given candidates satisfy.
    fn record(&mut self, individuals: &[Individual<G>]) {
        for individual in individuals {
            let newly = self
                .coverage
                .record_all(individual, individual.fitness.satisfied());
            if !newly.is_empty() {
                debug!(
                    "{} covered {} goal(s) in generation {}",
                    individual.id,
                    newly.len(),
                    self.generation
                );
            }
        }
    }

    /// One generation of the configured strategy, returning the candidates
    /// evaluated in it.
    fn step(&mut self, target: Objective) -> Vec<Individual<G>> {
        self.generation += 1;
        self.coverage.set_generation(self.generation);

        let evaluated = match self.config.strategy {
            SearchStrategy::Generational => self.step_generational(target),
            SearchStrategy::HillClimb => self.step_hill_climb(),
        };
        self.scheduler
            .on_generation_complete(&mut self.coverage, &evaluated);
        evaluated
    }

    /// Elitism plus tournament selection on the current target.
    fn step_generational(&mut self, target: Objective) -> Vec<Individual<G>> {
        let population = &self.config.population;
        let (size, elitism) = (population.size, population.elitism);
        let (tournament_size, crossover_rate) = (population.tournament_size, population.crossover_rate);

        let mut ranked = std::mem::take(&mut self.population);
        ranked.sort_by(|a, b| a.fitness(target).total_cmp(&b.fitness(target)));

        let mut genomes = Vec::with_capacity(size.saturating_sub(elitism));
        while elitism.min(ranked.len()) + genomes.len() < size {
            let first = tournament(&mut self.rng, ranked.len(), tournament_size);
            let mut child = if self.rng.gen_bool(crossover_rate) {
                let second = tournament(&mut self.rng, ranked.len(), tournament_size);
                self.variation
                    .crossover(&ranked[first].genome, &ranked[second].genome, &mut self.rng)
            } else {
                ranked[first].genome.clone()
            };
            self.variation.mutate(&mut child, &mut self.rng);
            genomes.push(child);
        }

        let offspring = self.evaluate(genomes);
        self.record(&offspring);

        ranked.truncate(elitism);
        ranked.extend(offspring.iter().cloned());
        self.population = ranked;
        offspring
    }

    /// Mutate the incumbent several times and move to accepted mutants.
    fn step_hill_climb(&mut self) -> Vec<Individual<G>> {
        let Some(mut incumbent) = self.population.first().cloned() else {
            return Vec::new();
        };

        let genomes: Vec<G> = (0..self.config.population.size)
            .map(|_| {
                let mut genome = incumbent.genome.clone();
                self.variation.mutate(&mut genome, &mut self.rng);
                genome
            })
            .collect();
        let mutants = self.evaluate(genomes);
        self.record(&mutants);

        let objectives = self.scheduler.frontier();
        self.sync_grid_objectives(&objectives);
        for mutant in &mutants {
            if accept(&mut self.grid, &incumbent, mutant, &objectives) {
                incumbent = Arc::clone(mutant);
            }
        }

        self.population = vec![incumbent];
        mutants
    }

    /// Grid, monitor and history updates shared by every generation.
    fn finish_generation(&mut self, evaluated: &[Individual<G>]) {
        let frontier = self.scheduler.frontier();
        if frontier.len() >= 2 {
            self.sync_grid_objectives(&frontier);
            for individual in evaluated {
                self.grid.add(Arc::clone(individual));
            }
        }

        let coverage = self.coverage.coverage_ratio();
        self.monitor.check_max_coverage(coverage);

        self.history.coverage.push(coverage);
        self.history
            .targets
            .push(self.scheduler.current_target().map(Objective::id));
        self.history.front_size.push(self.grid.len());
    }

    fn sync_grid_objectives(&mut self, objectives: &[Objective]) {
        if objectives.len() >= 2 && self.grid.objectives() != objectives {
            self.grid.update_fitness_functions(objectives.to_vec());
        }
    }

    /// Get current progress.
    pub fn progress(&self) -> SearchProgress {
        SearchProgress {
            generation: self.generation,
            target: self.scheduler.current_target().map(Objective::id),
            covered_goals: self.coverage.covered_count(),
            total_goals: self.coverage.total_goals(),
            coverage: self.coverage.coverage_ratio(),
            target_budget_ms: millis(self.scheduler.budget()),
            remaining_ms: millis(self.scheduler.remaining_time()),
            worklist: self.scheduler.worklist().count(),
            retry: self.scheduler.retry_list().count(),
            front_size: self.grid.len(),
            evaluations: self.evaluations,
        }
    }

    /// Check if the search should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.coverage.is_complete() {
            return Some(StopReason::AllCovered);
        }

        if self.scheduler.current_target().is_none() {
            return Some(StopReason::Exhausted);
        }

        if self.scheduler.remaining_time().is_zero() {
            return Some(StopReason::Deadline);
        }

        if let Some(limit) = self.config.population.max_generations
            && self.generation >= limit
        {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run the search with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> SearchOutcome<G>
    where
        F: Fn(&SearchProgress),
    {
        let start = self.clock.now();
        info!(
            "searching {} goals ({:?}, budget {:?})",
            self.coverage.total_goals(),
            self.config.strategy,
            self.scheduler.remaining_time()
        );

        self.initialize();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            let Some(target) = self.scheduler.current_target() else {
                break StopReason::Exhausted;
            };

            let evaluated = self.step(target);
            self.finish_generation(&evaluated);

            callback(&self.progress());
        };

        let elapsed = self.clock.now().saturating_duration_since(start);
        info!(
            "search stopped ({:?}) after {} generations: {}/{} goals covered",
            stop_reason,
            self.generation,
            self.coverage.covered_count(),
            self.coverage.total_goals()
        );

        self.outcome(stop_reason, elapsed)
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> SearchOutcome<G> {
        self.run_with_callback(|_| {})
    }

    fn outcome(&self, stop_reason: StopReason, elapsed: Duration) -> SearchOutcome<G> {
        let elapsed_seconds = elapsed.as_secs_f64();
        let evaluations_per_second = if elapsed_seconds > 0.0 {
            self.evaluations as f64 / elapsed_seconds
        } else {
            0.0
        };

        let covered = self
            .coverage
            .entries()
            .map(|(goal, entry)| CoveredGoal {
                goal: goal.id(),
                candidate: entry.candidate.id.0,
                generation: entry.generation,
            })
            .collect();

        let report = SearchReport {
            stats: SearchStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                covered_goals: self.coverage.covered_count(),
                total_goals: self.coverage.total_goals(),
                coverage: self.coverage.coverage_ratio(),
                time_to_max_coverage_ms: millis(self.monitor.time_to_max_coverage()),
                elapsed_seconds,
                evaluations_per_second,
                stop_reason,
            },
            scheduler: self.scheduler.stats(),
            covered,
            uncovered: self
                .coverage
                .uncovered_goals()
                .iter()
                .map(|goal| goal.id())
                .collect(),
            front: self.grid.candidates().map(|c| c.id.0).collect(),
            history: self.history.clone(),
        };

        SearchOutcome {
            coverage: self.coverage.clone(),
            front: self.grid.to_vec(),
            report,
        }
    }
}

/// Tournament over a population sorted best-first: the lowest drawn index wins.
fn tournament(rng: &mut StdRng, len: usize, size: usize) -> usize {
    (0..size.max(1))
        .map(|_| rng.gen_range(0..len))
        .min()
        .unwrap_or(0)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
