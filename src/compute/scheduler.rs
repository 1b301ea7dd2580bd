//! Target-switching scheduler.
//!
//! Hands out one uncovered goal at a time from a worklist of structurally
//! reachable goals, gives each target an equal share of the remaining search
//! time, parks targets that run out of budget on a retry list, and picks up
//! goals satisfied as a side effect of optimizing something else.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::archive::GoalCoverageArchive;
use super::clock::{Clock, SystemClock};
use super::fitness::{Candidate, Objective};
use crate::schema::{InsertionPolicy, SchedulerStats};

/// Decides where a newly unlocked goal enters the worklist.
pub trait GoalInsertion: fmt::Debug + Send + Sync {
    fn insert(&self, worklist: &mut VecDeque<Objective>, goal: Objective);
}

/// Newly unlocked goals are tried next.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFirst;

impl GoalInsertion for DepthFirst {
    fn insert(&self, worklist: &mut VecDeque<Objective>, goal: Objective) {
        worklist.push_front(goal);
    }
}

/// Newly unlocked goals queue behind everything already waiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreadthFirst;

impl GoalInsertion for BreadthFirst {
    fn insert(&self, worklist: &mut VecDeque<Objective>, goal: Objective) {
        worklist.push_back(goal);
    }
}

impl From<InsertionPolicy> for Box<dyn GoalInsertion> {
    fn from(policy: InsertionPolicy) -> Self {
        match policy {
            InsertionPolicy::DepthFirst => Box::new(DepthFirst),
            InsertionPolicy::BreadthFirst => Box::new(BreadthFirst),
        }
    }
}

/// Structural dependency relation: a goal's dependents only become
/// reachable once the goal itself is covered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalDependencies {
    edges: BTreeMap<Objective, BTreeSet<Objective>>,
}

impl GoalDependencies {
    /// Empty relation: every goal is a root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `dependent` is only reachable after `goal`.
    pub fn add(&mut self, goal: Objective, dependent: Objective) {
        self.edges.entry(goal).or_default().insert(dependent);
    }

    /// Goals unlocked by covering `goal`, in ascending order.
    pub fn dependents(&self, goal: Objective) -> impl Iterator<Item = Objective> + '_ {
        self.edges.get(&goal).into_iter().flatten().copied()
    }

    /// `(goal, dependent)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Objective, Objective)> + '_ {
        self.edges
            .iter()
            .flat_map(|(&goal, deps)| deps.iter().map(move |&dep| (goal, dep)))
    }

    /// Goals of `goals` that no other goal unlocks.
    pub fn roots(&self, goals: &BTreeSet<Objective>) -> Vec<Objective> {
        let dependents: HashSet<Objective> = self.edges.values().flatten().copied().collect();
        goals
            .iter()
            .copied()
            .filter(|goal| !dependents.contains(goal))
            .collect()
    }

    /// Whether no dependency was declared.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl FromIterator<(Objective, Objective)> for GoalDependencies {
    fn from_iter<I: IntoIterator<Item = (Objective, Objective)>>(iter: I) -> Self {
        let mut deps = Self::new();
        for (goal, dependent) in iter {
            deps.add(goal, dependent);
        }
        deps
    }
}

/// Which goal the search is currently optimizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// No target selected yet.
    NoTarget,
    /// Optimizing toward this goal.
    Active(Objective),
    /// Nothing reachable is left to search.
    Exhausted,
}

/// Scheduler construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler needs at least one goal")]
    EmptyGoalSet,
    #[error("Dependency {goal} -> {dependent} references a goal outside the goal set")]
    UnknownGoal {
        goal: Objective,
        dependent: Objective,
    },
}

/// Split the remaining time evenly over the targets still in play.
///
/// Targets in play are the goals neither covered nor parked on the retry
/// list; at least one is assumed so the division is always defined.
pub fn per_target_budget(
    remaining: Duration,
    total_goals: usize,
    covered: usize,
    retry: usize,
) -> Duration {
    let targets = total_goals.saturating_sub(covered).saturating_sub(retry).max(1);
    remaining / u32::try_from(targets).unwrap_or(u32::MAX)
}

/// Worklist-driven target scheduler with per-target time budgets.
#[derive(Debug)]
pub struct BudgetScheduler<K: Clock = SystemClock> {
    goals: BTreeSet<Objective>,
    dependencies: GoalDependencies,
    insertion: Box<dyn GoalInsertion>,
    clock: K,
    deadline: Instant,
    worklist: VecDeque<Objective>,
    retry: VecDeque<Objective>,
    /// Goals currently in the worklist or the retry list.
    queued: HashSet<Objective>,
    /// Covered goals whose dependents were already released.
    expanded: HashSet<Objective>,
    state: SchedulerState,
    target_started: Instant,
    budget: Duration,
    stats: SchedulerStats,
}

impl<K: Clock> BudgetScheduler<K> {
    /// Create a scheduler whose worklist holds the root goals in ascending
    /// order.
    pub fn new<I>(
        goals: I,
        dependencies: GoalDependencies,
        insertion: Box<dyn GoalInsertion>,
        deadline: Instant,
        clock: K,
    ) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = Objective>,
    {
        let goals: BTreeSet<Objective> = goals.into_iter().collect();
        if goals.is_empty() {
            return Err(SchedulerError::EmptyGoalSet);
        }
        if let Some((goal, dependent)) = dependencies
            .edges()
            .find(|(goal, dependent)| !goals.contains(goal) || !goals.contains(dependent))
        {
            return Err(SchedulerError::UnknownGoal { goal, dependent });
        }

        let worklist: VecDeque<Objective> = dependencies.roots(&goals).into_iter().collect();
        let queued = worklist.iter().copied().collect();
        let now = clock.now();

        Ok(Self {
            goals,
            dependencies,
            insertion,
            clock,
            deadline,
            worklist,
            retry: VecDeque::new(),
            queued,
            expanded: HashSet::new(),
            state: SchedulerState::NoTarget,
            target_started: now,
            budget: deadline.saturating_duration_since(now),
            stats: SchedulerStats::default(),
        })
    }

    /// Pick the first target. Ends in [`SchedulerState::Exhausted`] when
    /// there is nothing to search.
    pub fn start<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>) -> SchedulerState {
        self.expand_covered(archive);
        self.recompute_budget(archive);
        self.advance(archive)
    }

    /// Check one candidate against the target and every queued goal.
    ///
    /// Goals it satisfies are recorded, leave the worklist and retry list,
    /// and release their dependents. A queued goal it satisfies counts as
    /// collateral coverage even when the caller already recorded it. Returns
    /// the goals newly covered.
    pub fn observe<C: Candidate>(
        &mut self,
        archive: &mut GoalCoverageArchive<C>,
        candidate: &C,
    ) -> Vec<Objective> {
        let mut newly = Vec::new();

        if let SchedulerState::Active(target) = self.state
            && candidate.fitness(target) == 0.0
        {
            if archive.record_if_covering(candidate, target) {
                newly.push(target);
            }
            if archive.is_covered(target) {
                self.unlock(archive, target);
            }
        }

        loop {
            let hits: Vec<Objective> = self
                .worklist
                .iter()
                .chain(&self.retry)
                .copied()
                .filter(|&goal| candidate.fitness(goal) == 0.0)
                .collect();
            if hits.is_empty() {
                break;
            }
            for goal in hits {
                self.dequeue(goal);
                if archive.record_if_covering(candidate, goal) {
                    newly.push(goal);
                }
                if archive.is_covered(goal) {
                    self.stats.collateral += 1;
                    self.unlock(archive, goal);
                }
            }
        }

        newly
    }

    /// End-of-generation update: collateral coverage for the population,
    /// budget recomputation and the target transition.
    pub fn on_generation_complete<C: Candidate>(
        &mut self,
        archive: &mut GoalCoverageArchive<C>,
        population: &[C],
    ) -> SchedulerState {
        for candidate in population {
            self.observe(archive, candidate);
        }
        self.expand_covered(archive);
        self.recompute_budget(archive);

        match self.state {
            SchedulerState::Active(target) if archive.is_covered(target) => self.advance(archive),
            SchedulerState::Active(target) => {
                if self.time_on_target() > self.budget {
                    debug!(
                        "{} timed out after {:?} (budget {:?})",
                        target,
                        self.time_on_target(),
                        self.budget
                    );
                    self.stats.timeouts += 1;
                    self.queued.insert(target);
                    self.retry.push_back(target);
                    self.advance(archive)
                } else {
                    self.state
                }
            }
            SchedulerState::NoTarget | SchedulerState::Exhausted => self.advance(archive),
        }
    }

    /// Get current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The goal being optimized, if any.
    pub fn current_target(&self) -> Option<Objective> {
        match self.state {
            SchedulerState::Active(goal) => Some(goal),
            _ => None,
        }
    }

    /// Time allotted to the current target.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent on the current target since it was (re)selected.
    pub fn time_on_target(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.target_started)
    }

    /// Time left until the global deadline.
    pub fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(self.clock.now())
    }

    /// Global search deadline.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the scheduler ran dry or the global deadline passed.
    pub fn is_finished(&self) -> bool {
        self.state == SchedulerState::Exhausted || self.remaining_time().is_zero()
    }

    /// Goals waiting to be targeted, next first.
    pub fn worklist(&self) -> impl Iterator<Item = Objective> + '_ {
        self.worklist.iter().copied()
    }

    /// Goals that ran out of budget, oldest first.
    pub fn retry_list(&self) -> impl Iterator<Item = Objective> + '_ {
        self.retry.iter().copied()
    }

    /// The target plus every queued goal, sorted.
    pub fn frontier(&self) -> Vec<Objective> {
        let mut frontier: Vec<Objective> = self
            .current_target()
            .into_iter()
            .chain(self.worklist.iter().copied())
            .chain(self.retry.iter().copied())
            .collect();
        frontier.sort_unstable();
        frontier.dedup();
        frontier
    }

    /// Every goal the scheduler knows.
    pub fn goals(&self) -> &BTreeSet<Objective> {
        &self.goals
    }

    /// Get scheduling statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn advance<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>) -> SchedulerState {
        let next = match self.pop_uncovered(archive) {
            Some(goal) => Some(goal),
            None => {
                self.merge_retry();
                self.pop_uncovered(archive)
            }
        };

        let previous = self.state;
        self.state = match next {
            Some(goal) => {
                if previous != SchedulerState::Active(goal) {
                    self.stats.target_switches += 1;
                    debug!(
                        "target {:?} -> {} (budget {:?}, {} queued, {} to retry)",
                        previous,
                        goal,
                        self.budget,
                        self.worklist.len(),
                        self.retry.len()
                    );
                }
                self.target_started = self.clock.now();
                SchedulerState::Active(goal)
            }
            None => {
                if previous != SchedulerState::Exhausted {
                    info!(
                        "no reachable uncovered goals left ({} goals total)",
                        self.goals.len()
                    );
                }
                SchedulerState::Exhausted
            }
        };
        self.state
    }

    fn pop_uncovered<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>) -> Option<Objective> {
        while let Some(goal) = self.worklist.pop_front() {
            self.queued.remove(&goal);
            if !archive.is_covered(goal) {
                return Some(goal);
            }
        }
        None
    }

    fn merge_retry(&mut self) {
        if self.retry.is_empty() {
            return;
        }
        debug!("worklist empty, retrying {} goals", self.retry.len());
        self.stats.retry_merges += 1;
        self.worklist.extend(self.retry.drain(..));
    }

    fn dequeue(&mut self, goal: Objective) {
        if self.queued.remove(&goal) {
            self.worklist.retain(|&g| g != goal);
            self.retry.retain(|&g| g != goal);
        }
    }

    /// Release the dependents of a covered goal, once.
    fn unlock<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>, goal: Objective) {
        if !self.expanded.insert(goal) {
            return;
        }
        self.dequeue(goal);

        let target = self.current_target();
        let dependents: Vec<Objective> = self.dependencies.dependents(goal).collect();
        for dependent in dependents {
            if archive.is_covered(dependent)
                || self.queued.contains(&dependent)
                || Some(dependent) == target
            {
                continue;
            }
            self.insertion.insert(&mut self.worklist, dependent);
            self.queued.insert(dependent);
        }
    }

    /// Release dependents of goals the caller recorded directly.
    fn expand_covered<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>) {
        let fresh: Vec<Objective> = archive
            .entries()
            .map(|(goal, _)| goal)
            .filter(|goal| !self.expanded.contains(goal))
            .collect();
        for goal in fresh {
            self.unlock(archive, goal);
        }
    }

    fn recompute_budget<C: Candidate>(&mut self, archive: &GoalCoverageArchive<C>) {
        let covered = self
            .goals
            .iter()
            .filter(|&&goal| archive.is_covered(goal))
            .count();
        self.budget = per_target_budget(
            self.remaining_time(),
            self.goals.len(),
            covered,
            self.retry.len(),
        );
    }
}
