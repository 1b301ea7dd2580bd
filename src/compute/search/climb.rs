//! Acceptance rule for (1+1) hill climbing with an archive of alternates.

use crate::compute::archive::{AdaptiveGridArchive, PREFER_CANDIDATE_ON_DRAW};
use crate::compute::fitness::{Candidate, Dominance, Objective, compare};

/// Whether `candidate` should replace `incumbent` as the search point.
///
/// A dominating candidate always wins and a dominated one always loses.
/// Otherwise the candidate is offered to the archive and the less crowded
/// of the two wins. With fewer than two objectives the archive is not
/// consulted, since it may still be tracking an older objective set.
pub fn accept<C: Candidate>(
    archive: &mut AdaptiveGridArchive<C>,
    incumbent: &C,
    candidate: &C,
    objectives: &[Objective],
) -> bool {
    match compare(candidate, incumbent, objectives) {
        Dominance::Dominates => true,
        Dominance::DominatedBy => false,
        Dominance::Equal | Dominance::Incomparable if objectives.len() < 2 => {
            PREFER_CANDIDATE_ON_DRAW
        }
        Dominance::Equal | Dominance::Incomparable => {
            archive.add(candidate.clone());
            archive.decide(candidate, incumbent)
        }
    }
}
