//! Archives kept for the duration of a search run.
//!
//! - `grid`: bounded Pareto archive with crowding-based eviction
//! - `coverage`: goal → first covering candidate

mod coverage;
mod grid;

pub use coverage::{CoverageEntry, GoalCoverageArchive};
pub use grid::{AdaptiveGridArchive, ArchiveError, PREFER_CANDIDATE_ON_DRAW};
