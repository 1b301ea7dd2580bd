//! Which goals are covered, and by which candidate.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::compute::fitness::{Candidate, Objective};

/// The candidate that first covered a goal.
#[derive(Debug, Clone)]
pub struct CoverageEntry<C> {
    pub candidate: C,
    /// Generation in which the goal was covered.
    pub generation: usize,
}

/// Single source of truth for goal coverage.
///
/// The first candidate to reach fitness `0.0` on a goal is kept for the rest
/// of the run, even if a later one would make a smaller test. Minimizing the
/// covering artifact happens after the search.
#[derive(Debug, Clone)]
pub struct GoalCoverageArchive<C> {
    covered: BTreeMap<Objective, CoverageEntry<C>>,
    uncovered: BTreeSet<Objective>,
    generation: usize,
}

impl<C: Candidate> GoalCoverageArchive<C> {
    /// Create an archive where every goal starts uncovered.
    pub fn new<I: IntoIterator<Item = Objective>>(goals: I) -> Self {
        Self {
            covered: BTreeMap::new(),
            uncovered: goals.into_iter().collect(),
            generation: 0,
        }
    }

    /// Generation stamped on subsequent coverage entries.
    pub fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    /// Track a newly discovered goal. Returns false if it was already known.
    pub fn add_goal(&mut self, goal: Objective) -> bool {
        if self.covered.contains_key(&goal) {
            return false;
        }
        self.uncovered.insert(goal)
    }

    /// Store `candidate` as the covering candidate of `goal` if it satisfies
    /// the goal and nothing covered it before. Returns whether it was stored.
    pub fn record_if_covering(&mut self, candidate: &C, goal: Objective) -> bool {
        if candidate.fitness(goal) != 0.0 || self.covered.contains_key(&goal) {
            return false;
        }
        if !self.uncovered.remove(&goal) {
            warn!("ignoring coverage of unknown goal {}", goal);
            return false;
        }

        debug!(
            "{} covered by {} in generation {}",
            goal,
            candidate.id(),
            self.generation
        );
        self.covered.insert(
            goal,
            CoverageEntry {
                candidate: candidate.clone(),
                generation: self.generation,
            },
        );
        true
    }

    /// Record every goal in `goals` that `candidate` covers; returns the new ones.
    pub fn record_all<I>(&mut self, candidate: &C, goals: I) -> Vec<Objective>
    where
        I: IntoIterator<Item = Objective>,
    {
        goals
            .into_iter()
            .filter(|&goal| self.record_if_covering(candidate, goal))
            .collect()
    }

    /// Whether `goal` has a covering candidate.
    pub fn is_covered(&self, goal: Objective) -> bool {
        self.covered.contains_key(&goal)
    }

    /// Goals with a covering candidate.
    pub fn covered_goals(&self) -> BTreeSet<Objective> {
        self.covered.keys().copied().collect()
    }

    /// Goals still waiting for a covering candidate.
    pub fn uncovered_goals(&self) -> &BTreeSet<Objective> {
        &self.uncovered
    }

    /// The candidate that covered `goal`.
    pub fn covering_candidate(&self, goal: Objective) -> Option<&C> {
        self.covered.get(&goal).map(|entry| &entry.candidate)
    }

    /// Covered goals with their entries, in goal order.
    pub fn entries(&self) -> impl Iterator<Item = (Objective, &CoverageEntry<C>)> {
        self.covered.iter().map(|(&goal, entry)| (goal, entry))
    }

    /// Number of covered goals.
    pub fn covered_count(&self) -> usize {
        self.covered.len()
    }

    /// Number of known goals.
    pub fn total_goals(&self) -> usize {
        self.covered.len() + self.uncovered.len()
    }

    /// Fraction of goals covered; an empty goal set counts as fully covered.
    pub fn coverage_ratio(&self) -> f64 {
        let total = self.total_goals();
        if total == 0 {
            1.0
        } else {
            self.covered.len() as f64 / total as f64
        }
    }

    /// Whether every known goal is covered.
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}
