//! Progress and result types reported by search runs.

use serde::{Deserialize, Serialize};

/// Progress update emitted after every generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchProgress {
    /// Current generation number.
    pub generation: usize,
    /// Goal currently being optimized, if any.
    pub target: Option<u32>,
    /// Goals covered so far.
    pub covered_goals: usize,
    /// Size of the goal set.
    pub total_goals: usize,
    /// Fraction of goals covered.
    pub coverage: f64,
    /// Time allotted to the current target.
    pub target_budget_ms: u64,
    /// Time left in the global budget.
    pub remaining_ms: u64,
    /// Goals waiting in the worklist.
    pub worklist: usize,
    /// Goals waiting for a retry.
    pub retry: usize,
    /// Candidates held by the grid archive.
    pub front_size: usize,
    /// Evaluations performed so far.
    pub evaluations: u64,
}

/// Per-generation history of a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoverageHistory {
    /// Coverage ratio per generation.
    pub coverage: Vec<f64>,
    /// Target per generation.
    pub targets: Vec<Option<u32>>,
    /// Grid archive size per generation.
    pub front_size: Vec<usize>,
}

/// Counters describing scheduler activity over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Times a different goal became the target.
    pub target_switches: usize,
    /// Targets that ran out of budget.
    pub timeouts: usize,
    /// Times the retry list was merged back into an empty worklist.
    pub retry_merges: usize,
    /// Queued goals covered while another goal was the target.
    pub collateral: usize,
}

/// A covered goal and the candidate that covered it first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoveredGoal {
    pub goal: u32,
    pub candidate: u64,
    pub generation: usize,
}

/// Summary statistics of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Generations completed after the initial population.
    pub generations: usize,
    /// Total fitness evaluations performed.
    pub total_evaluations: u64,
    pub covered_goals: usize,
    pub total_goals: usize,
    /// Final coverage ratio.
    pub coverage: f64,
    /// Time from search start until the final coverage was first reached.
    pub time_to_max_coverage_ms: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Why the search stopped.
    pub stop_reason: StopReason,
}

/// Reason a search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every goal is covered.
    AllCovered,
    /// No reachable uncovered goal is left to target.
    Exhausted,
    /// The global time budget ran out.
    Deadline,
    /// Reached the generation cap.
    MaxGenerations,
    /// User cancelled.
    Cancelled,
}

/// Serializable result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub stats: SearchStats,
    pub scheduler: SchedulerStats,
    /// Covered goals in ascending order.
    pub covered: Vec<CoveredGoal>,
    /// Goals left uncovered.
    pub uncovered: Vec<u32>,
    /// Ids of the candidates left in the grid archive.
    pub front: Vec<u64>,
    pub history: CoverageHistory,
}
