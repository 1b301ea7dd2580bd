//! Objectives, fitness vectors and Pareto dominance.
//!
//! All objectives are minimized: `0.0` means the goal is satisfied and
//! [`UNEVALUATED`] means the candidate never reached it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Fitness of an objective that was not evaluated or is unreachable.
pub const UNEVALUATED: f64 = f64::MAX;

/// Stable identifier of one coverage goal or optimization dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Objective(pub u32);

impl Objective {
    /// Create an objective from its numeric id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Numeric id of this objective.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal#{}", self.0)
    }
}

/// Identity of a candidate, used for set membership inside archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable mapping from objective to fitness value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessVector {
    values: BTreeMap<Objective, f64>,
}

impl FitnessVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a candidate's fitness over the given objectives.
    pub fn from_candidate<C: Candidate>(candidate: &C, objectives: &[Objective]) -> Self {
        objectives
            .iter()
            .map(|&objective| (objective, candidate.fitness(objective)))
            .collect()
    }

    /// Value for an objective, if present.
    pub fn get(&self, objective: Objective) -> Option<f64> {
        self.values.get(&objective).copied()
    }

    /// Value for an objective, [`UNEVALUATED`] when absent.
    pub fn value(&self, objective: Objective) -> f64 {
        self.get(objective).unwrap_or(UNEVALUATED)
    }

    /// Whether the objective is satisfied (fitness `0.0`).
    pub fn is_satisfied(&self, objective: Objective) -> bool {
        self.get(objective) == Some(0.0)
    }

    /// Objectives with fitness `0.0`.
    pub fn satisfied(&self) -> impl Iterator<Item = Objective> + '_ {
        self.values
            .iter()
            .filter(|&(_, &v)| v == 0.0)
            .map(|(&objective, _)| objective)
    }

    /// A copy with the given objectives forced to `0.0`.
    pub fn with_satisfied(&self, objectives: &[Objective]) -> Self {
        self.iter()
            .chain(objectives.iter().map(|&objective| (objective, 0.0)))
            .collect()
    }

    /// Iterate over `(objective, value)` pairs in objective order.
    pub fn iter(&self) -> impl Iterator<Item = (Objective, f64)> + '_ {
        self.values.iter().map(|(&objective, &v)| (objective, v))
    }

    /// Number of evaluated objectives.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no objective was evaluated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Objective, f64)> for FitnessVector {
    fn from_iter<I: IntoIterator<Item = (Objective, f64)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(objective, v)| (objective, sanitize(v)))
                .collect(),
        }
    }
}

/// Distances are non-negative; NaN carries no usable information.
fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        UNEVALUATED
    } else {
        value.max(0.0)
    }
}

/// The capabilities the archives and scheduler need from a solution.
///
/// Candidates are created by the external evolutionary engine. Archives only
/// hold clones, so implementors that are expensive to copy should be wrapped
/// in an [`Arc`].
pub trait Candidate: Clone {
    /// Identity used for archive membership.
    fn id(&self) -> CandidateId;

    /// Fitness for an objective (`0.0` = satisfied, minimization).
    fn fitness(&self, objective: Objective) -> f64;

    /// Pareto dominance over a subset of objectives.
    fn dominates(&self, other: &Self, objectives: &[Objective]) -> bool {
        compare(self, other, objectives) == Dominance::Dominates
    }
}

impl<T: Candidate> Candidate for Arc<T> {
    fn id(&self) -> CandidateId {
        (**self).id()
    }

    fn fitness(&self, objective: Objective) -> f64 {
        (**self).fitness(objective)
    }

    fn dominates(&self, other: &Self, objectives: &[Objective]) -> bool {
        (**self).dominates(&**other, objectives)
    }
}

/// An evaluated genome with its materialized fitness vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate<G> {
    /// Unique identifier.
    pub id: CandidateId,
    /// The evolvable representation.
    pub genome: G,
    /// Per-objective distances.
    pub fitness: FitnessVector,
    /// Generation the candidate was evaluated in.
    pub generation: usize,
}

impl<G> ScoredCandidate<G> {
    /// Create a candidate evaluated in generation 0.
    pub fn new(id: u64, genome: G, fitness: FitnessVector) -> Self {
        Self {
            id: CandidateId(id),
            genome,
            fitness,
            generation: 0,
        }
    }
}

impl<G: Clone> Candidate for ScoredCandidate<G> {
    fn id(&self) -> CandidateId {
        self.id
    }

    fn fitness(&self, objective: Objective) -> f64 {
        self.fitness.value(objective)
    }
}

/// Outcome of comparing two candidates under Pareto dominance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// The first candidate dominates the second.
    Dominates,
    /// The second candidate dominates the first.
    DominatedBy,
    /// Identical on every objective.
    Equal,
    /// Each is strictly better somewhere.
    Incomparable,
}

/// Compare two candidates over the given objectives.
pub fn compare<C: Candidate>(a: &C, b: &C, objectives: &[Objective]) -> Dominance {
    compare_by(objectives, |objective| (a.fitness(objective), b.fitness(objective)))
}

/// Compare two materialized fitness vectors over the given objectives.
pub fn compare_vectors(a: &FitnessVector, b: &FitnessVector, objectives: &[Objective]) -> Dominance {
    compare_by(objectives, |objective| (a.value(objective), b.value(objective)))
}

/// `a` is no worse than `b` everywhere and strictly better somewhere.
pub fn dominates<C: Candidate>(a: &C, b: &C, objectives: &[Objective]) -> bool {
    compare(a, b, objectives) == Dominance::Dominates
}

fn compare_by<F>(objectives: &[Objective], mut values: F) -> Dominance
where
    F: FnMut(Objective) -> (f64, f64),
{
    let mut better = false;
    let mut worse = false;

    for &objective in objectives {
        let (a, b) = values(objective);
        match a.partial_cmp(&b) {
            Some(Ordering::Less) => better = true,
            Some(Ordering::Greater) => worse = true,
            _ => {}
        }
        if better && worse {
            return Dominance::Incomparable;
        }
    }

    match (better, worse) {
        (true, false) => Dominance::Dominates,
        (false, true) => Dominance::DominatedBy,
        _ => Dominance::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: u64, values: &[f64]) -> ScoredCandidate<()> {
        let fitness = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (Objective(i as u32), v))
            .collect();
        ScoredCandidate::new(id, (), fitness)
    }

    fn objectives(n: usize) -> Vec<Objective> {
        (0..n as u32).map(Objective).collect()
    }

    #[test]
    fn test_dominance_basic() {
        let objs = objectives(2);
        let a = candidate(1, &[0.0, 0.3]);
        let b = candidate(2, &[0.2, 0.3]);
        let c = candidate(3, &[0.2, 0.0]);

        assert!(dominates(&a, &b, &objs));
        assert!(!dominates(&b, &a, &objs));
        assert_eq!(compare(&a, &c, &objs), Dominance::Incomparable);
        assert_eq!(compare(&b, &c, &objs), Dominance::DominatedBy);
    }

    #[test]
    fn test_dominance_is_irreflexive() {
        let objs = objectives(3);
        let a = candidate(1, &[0.1, 0.2, 0.3]);
        assert_eq!(compare(&a, &a, &objs), Dominance::Equal);
        assert!(!a.dominates(&a, &objs));
    }

    #[test]
    fn test_dominance_respects_objective_subset() {
        let a = candidate(1, &[0.0, 0.9]);
        let b = candidate(2, &[0.5, 0.1]);
        assert!(dominates(&a, &b, &[Objective(0)]));
        assert!(dominates(&b, &a, &[Objective(1)]));
        assert!(!dominates(&a, &b, &[]));
    }

    #[test]
    fn test_missing_objective_is_unevaluated() {
        let a = candidate(1, &[0.4]);
        assert_eq!(a.fitness(Objective(7)), UNEVALUATED);
        assert!(!dominates(&candidate(2, &[0.4]), &a, &[Objective(7)]));
        assert!(dominates(&candidate(3, &[0.4, 0.0]), &a, &[Objective(1)]));
    }

    #[test]
    fn test_fitness_vector_sanitizes_values() {
        let v: FitnessVector = [(Objective(0), f64::NAN), (Objective(1), -0.5)]
            .into_iter()
            .collect();
        assert_eq!(v.value(Objective(0)), UNEVALUATED);
        assert_eq!(v.value(Objective(1)), 0.0);
        assert!(v.is_satisfied(Objective(1)));
    }

    #[test]
    fn test_with_satisfied_overrides() {
        let v: FitnessVector = [(Objective(0), 0.7), (Objective(1), 0.2)]
            .into_iter()
            .collect();
        let forced = v.with_satisfied(&[Objective(1), Objective(4)]);
        assert_eq!(forced.value(Objective(0)), 0.7);
        assert_eq!(forced.satisfied().collect::<Vec<_>>(), vec![Objective(1), Objective(4)]);
        assert_eq!(v.value(Objective(1)), 0.2);
    }

    #[test]
    fn test_arc_candidate_delegates() {
        let objs = objectives(2);
        let a = Arc::new(candidate(1, &[0.0, 0.0]));
        let b = Arc::new(candidate(2, &[0.1, 0.0]));
        assert_eq!(a.id(), CandidateId(1));
        assert!(a.dominates(&b, &objs));
    }

    proptest! {
        #[test]
        fn prop_dominance_is_asymmetric(
            a in prop::collection::vec(0.0f64..4.0, 4),
            b in prop::collection::vec(0.0f64..4.0, 4),
        ) {
            let objs = objectives(4);
            let (a, b) = (candidate(1, &a), candidate(2, &b));
            prop_assert!(!(dominates(&a, &b, &objs) && dominates(&b, &a, &objs)));
        }

        #[test]
        fn prop_dominance_is_transitive(
            a in prop::collection::vec(0u8..4, 3),
            b in prop::collection::vec(0u8..4, 3),
            c in prop::collection::vec(0u8..4, 3),
        ) {
            let objs = objectives(3);
            let to_f = |v: &[u8]| v.iter().map(|&x| f64::from(x)).collect::<Vec<_>>();
            let (a, b, c) = (candidate(1, &to_f(&a)), candidate(2, &to_f(&b)), candidate(3, &to_f(&c)));
            if dominates(&a, &b, &objs) && dominates(&b, &c, &objs) {
                prop_assert!(dominates(&a, &c, &objs));
            }
        }

        #[test]
        fn prop_vector_and_candidate_comparison_agree(
            a in prop::collection::vec(0.0f64..2.0, 3),
            b in prop::collection::vec(0.0f64..2.0, 3),
        ) {
            let objs = objectives(3);
            let (a, b) = (candidate(1, &a), candidate(2, &b));
            prop_assert_eq!(compare(&a, &b, &objs), compare_vectors(&a.fitness, &b.fitness, &objs));
        }
    }
}
