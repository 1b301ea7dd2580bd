//! Bounded archive of mutually non-dominated candidates, kept diverse with an
//! adaptive hyper-grid over objective space.
//!
//! The grid is a lazily built k-d-like tree: every internal region bisects
//! each tracked objective at its midpoint, and a child exists only once a
//! candidate has been routed into it. Regions live in an index-addressed
//! arena with parent indices, so crowding comparisons can walk from a leaf to
//! the root. Empty regions are released as soon as their last member leaves.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, trace};

use crate::compute::fitness::{Candidate, CandidateId, Objective};
use crate::schema::GridConfig;

/// Outcome of [`AdaptiveGridArchive::decide`] when both candidates are equally
/// crowded at every level up to the root. Accepting the candidate lets a
/// hill climber drift across plateaus.
pub const PREFER_CANDIDATE_ON_DRAW: bool = true;

type RegionId = usize;

/// Grid construction errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive capacity must be non-zero")]
    ZeroCapacity,
    #[error(
        "Bounds must cover all {objectives} objectives (got {lower} lower, {upper} upper)"
    )]
    BoundsMismatch {
        objectives: usize,
        lower: usize,
        upper: usize,
    },
    #[error("Invalid bounds for {objective}: [{lower}, {upper}]")]
    InvalidBounds {
        objective: Objective,
        lower: f64,
        upper: f64,
    },
}

/// A hyper-rectangle of objective space.
#[derive(Debug, Clone)]
struct Region {
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Bisections left below this region; leaves have none.
    depth: usize,
    parent: Option<RegionId>,
    /// Children keyed by orthant (`true` = upper half on that objective).
    children: Vec<(Vec<bool>, RegionId)>,
    /// Members, leaves only.
    members: Vec<CandidateId>,
    /// Members anywhere below (and including) this region.
    occupancy: usize,
}

impl Region {
    fn new(lower: Vec<f64>, upper: Vec<f64>, depth: usize, parent: Option<RegionId>) -> Self {
        Self {
            lower,
            upper,
            depth,
            parent,
            children: Vec::new(),
            members: Vec::new(),
            occupancy: 0,
        }
    }

    fn is_leaf(&self) -> bool {
        self.depth == 0
    }

    /// Orthant of `point`. A value sitting exactly on a midpoint belongs to
    /// the lower half.
    fn orthant(&self, point: &[f64]) -> Vec<bool> {
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| v > midpoint(lo, hi))
            .collect()
    }

    fn child(&self, orthant: &[bool]) -> Option<RegionId> {
        self.children
            .iter()
            .find(|(key, _)| key.as_slice() == orthant)
            .map(|&(_, id)| id)
    }

    fn child_bounds(&self, orthant: &[bool]) -> (Vec<f64>, Vec<f64>) {
        let mut lower = self.lower.clone();
        let mut upper = self.upper.clone();
        for (i, &upper_half) in orthant.iter().enumerate() {
            let mid = midpoint(self.lower[i], self.upper[i]);
            if upper_half {
                lower[i] = mid;
            } else {
                upper[i] = mid;
            }
        }
        (lower, upper)
    }
}

fn midpoint(lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) / 2.0
}

/// An archived candidate and where it sits in the grid.
#[derive(Debug, Clone)]
struct Member<C> {
    candidate: C,
    point: Vec<f64>,
    leaf: RegionId,
    /// Insertion order, used to pick eviction victims and to rebuild stably.
    seq: u64,
}

/// Bounded, crowding-aware Pareto archive.
#[derive(Debug, Clone)]
pub struct AdaptiveGridArchive<C: Candidate> {
    objectives: Vec<Objective>,
    /// Explicit per-objective bounds; objectives without one use `default_bounds`.
    bounds: BTreeMap<Objective, (f64, f64)>,
    default_bounds: (f64, f64),
    depth: usize,
    capacity: usize,
    regions: Vec<Option<Region>>,
    free: Vec<RegionId>,
    root: RegionId,
    members: BTreeMap<CandidateId, Member<C>>,
    next_seq: u64,
}

impl<C: Candidate> AdaptiveGridArchive<C> {
    /// Create an archive using the configured bounds for every objective.
    pub fn new(objectives: Vec<Objective>, config: &GridConfig) -> Result<Self, ArchiveError> {
        let lower = vec![config.lower_bound; objectives.len()];
        let upper = vec![config.upper_bound; objectives.len()];
        let mut archive =
            Self::with_bounds(objectives, lower, upper, config.depth, config.capacity)?;
        archive.default_bounds = (config.lower_bound, config.upper_bound);
        Ok(archive)
    }

    /// Create an archive with explicit per-objective bounds.
    pub fn with_bounds(
        objectives: Vec<Objective>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        depth: usize,
        capacity: usize,
    ) -> Result<Self, ArchiveError> {
        if capacity == 0 {
            return Err(ArchiveError::ZeroCapacity);
        }
        if lower.len() != objectives.len() || upper.len() != objectives.len() {
            return Err(ArchiveError::BoundsMismatch {
                objectives: objectives.len(),
                lower: lower.len(),
                upper: upper.len(),
            });
        }

        let mut bounds = BTreeMap::new();
        for ((&objective, &lo), &hi) in objectives.iter().zip(&lower).zip(&upper) {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(ArchiveError::InvalidBounds {
                    objective,
                    lower: lo,
                    upper: hi,
                });
            }
            bounds.insert(objective, (lo, hi));
        }

        let mut archive = Self {
            objectives,
            bounds,
            default_bounds: (0.0, 1.0),
            depth,
            capacity,
            regions: Vec::new(),
            free: Vec::new(),
            root: 0,
            members: BTreeMap::new(),
            next_seq: 0,
        };
        archive.reset_grid();
        Ok(archive)
    }

    /// Offer a candidate to the archive.
    ///
    /// Members dominated by `candidate` are pruned first. The candidate is
    /// rejected if a remaining member dominates it, if it is already archived,
    /// or if the archive is full and the candidate would land in the most
    /// crowded leaf. Otherwise a member of the most crowded leaf makes room
    /// when needed and the candidate is inserted.
    pub fn add(&mut self, candidate: C) -> bool {
        let id = candidate.id();
        if self.members.contains_key(&id) {
            return false;
        }

        self.remove_dominated(&candidate);

        if self
            .members
            .values()
            .any(|m| m.candidate.dominates(&candidate, &self.objectives))
        {
            return false;
        }

        let point = self.locate(&candidate);

        if self.members.len() >= self.capacity {
            let Some(crowded) = self.most_crowded_leaf() else {
                return false;
            };
            if self.leaf_for(&point) == Some(crowded) {
                trace!("rejecting {} inside the most crowded region", id);
                return false;
            }
            let victim = self.region(crowded).members[0];
            debug!(
                "evicting {} from region {} ({} members) to admit {}",
                victim,
                crowded,
                self.region(crowded).members.len(),
                id
            );
            self.evict(victim);
        }

        self.insert_member(candidate, point);
        true
    }

    /// Remove every member dominated by `candidate`, returning them.
    pub fn remove_dominated(&mut self, candidate: &C) -> Vec<C> {
        let dominated: Vec<CandidateId> = self
            .members
            .iter()
            .filter(|(_, m)| candidate.dominates(&m.candidate, &self.objectives))
            .map(|(&id, _)| id)
            .collect();

        dominated
            .into_iter()
            .filter_map(|id| self.evict(id))
            .collect()
    }

    /// Whether `candidate` should replace `incumbent` as the current search
    /// point: the one sitting in the less crowded region wins, comparing leaf
    /// occupancy first and then each ancestor up to the root.
    pub fn decide(&self, candidate: &C, incumbent: &C) -> bool {
        let challenger = self.occupancy_path(&self.locate(candidate));
        let current = self.occupancy_path(&self.locate(incumbent));

        for (c, i) in challenger.iter().rev().zip(current.iter().rev()) {
            match c.cmp(i) {
                Ordering::Less => return true,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
        PREFER_CANDIDATE_ON_DRAW
    }

    /// Rebuild the grid over a new objective set and reinsert every member.
    ///
    /// Members are re-offered through [`add`](Self::add) in their original
    /// insertion order, so any that became dominated under the new objectives
    /// are dropped.
    pub fn update_fitness_functions(&mut self, objectives: Vec<Objective>) {
        debug!(
            "rebuilding grid: {} -> {} objectives, {} members",
            self.objectives.len(),
            objectives.len(),
            self.members.len()
        );

        let mut previous: Vec<Member<C>> =
            std::mem::take(&mut self.members).into_values().collect();
        previous.sort_by_key(|m| m.seq);

        self.objectives = objectives;
        self.reset_grid();

        for member in previous {
            self.add(member.candidate);
        }
    }

    /// Archived candidates.
    pub fn candidates(&self) -> impl Iterator<Item = &C> {
        self.members.values().map(|m| &m.candidate)
    }

    /// Archived candidates as an owned list.
    pub fn to_vec(&self) -> Vec<C> {
        self.candidates().cloned().collect()
    }

    /// Whether a candidate with this id is archived.
    pub fn contains(&self, id: CandidateId) -> bool {
        self.members.contains_key(&id)
    }

    /// Number of members sharing the leaf `candidate` falls into.
    pub fn occupancy(&self, candidate: &C) -> usize {
        self.leaf_for(&self.locate(candidate))
            .map_or(0, |leaf| self.region(leaf).members.len())
    }

    /// Objectives the grid is currently built over.
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Maximum number of members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum subdivision depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of archived candidates.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Regions currently materialized, root included.
    pub fn region_count(&self) -> usize {
        self.regions.len() - self.free.len()
    }

    // ------------------------------------------------------------------
    // Grid maintenance
    // ------------------------------------------------------------------

    fn reset_grid(&mut self) {
        let (lower, upper) = self
            .objectives
            .iter()
            .map(|objective| {
                self.bounds
                    .get(objective)
                    .copied()
                    .unwrap_or(self.default_bounds)
            })
            .unzip();

        self.regions = vec![Some(Region::new(lower, upper, self.depth, None))];
        self.free.clear();
        self.root = 0;
    }

    /// Project a candidate into the root region.
    ///
    /// # Panics
    ///
    /// If the candidate reports NaN for a tracked objective.
    fn locate(&self, candidate: &C) -> Vec<f64> {
        let root = self.region(self.root);
        self.objectives
            .iter()
            .enumerate()
            .map(|(i, &objective)| {
                let value = candidate.fitness(objective);
                assert!(
                    !value.is_nan(),
                    "candidate {} has no fitness for {}",
                    candidate.id(),
                    objective
                );
                value.clamp(root.lower[i], root.upper[i])
            })
            .collect()
    }

    fn region(&self, id: RegionId) -> &Region {
        self.regions[id]
            .as_ref()
            .expect("region ids held by the grid are live")
    }

    fn region_mut(&mut self, id: RegionId) -> &mut Region {
        self.regions[id]
            .as_mut()
            .expect("region ids held by the grid are live")
    }

    fn allocate(&mut self, region: Region) -> RegionId {
        match self.free.pop() {
            Some(id) => {
                self.regions[id] = Some(region);
                id
            }
            None => {
                self.regions.push(Some(region));
                self.regions.len() - 1
            }
        }
    }

    fn spawn_child(&mut self, parent: RegionId, orthant: Vec<bool>) -> RegionId {
        let (lower, upper, depth) = {
            let region = self.region(parent);
            let (lower, upper) = region.child_bounds(&orthant);
            (lower, upper, region.depth - 1)
        };
        let child = self.allocate(Region::new(lower, upper, depth, Some(parent)));
        self.region_mut(parent).children.push((orthant, child));
        child
    }

    /// Leaf `point` would land in, if that path exists.
    fn leaf_for(&self, point: &[f64]) -> Option<RegionId> {
        let mut current = self.root;
        loop {
            let region = self.region(current);
            if region.is_leaf() {
                return Some(current);
            }
            current = region.child(&region.orthant(point))?;
        }
    }

    /// Occupancy of every region on the path from the root to the leaf
    /// `point` maps to; regions that do not exist count as empty.
    fn occupancy_path(&self, point: &[f64]) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.depth + 1);
        let mut current = Some(self.root);
        for _ in 0..=self.depth {
            match current {
                Some(id) => {
                    let region = self.region(id);
                    path.push(region.occupancy);
                    current = if region.is_leaf() {
                        None
                    } else {
                        region.child(&region.orthant(point))
                    };
                }
                None => path.push(0),
            }
        }
        path
    }

    /// The leaf with the most members; ties go to the earliest region slot.
    fn most_crowded_leaf(&self) -> Option<RegionId> {
        let mut best: Option<(RegionId, usize)> = None;
        for (id, region) in self.regions.iter().enumerate() {
            let Some(region) = region else { continue };
            if !region.is_leaf() || region.members.is_empty() {
                continue;
            }
            if best.is_none_or(|(_, count)| region.members.len() > count) {
                best = Some((id, region.members.len()));
            }
        }
        best.map(|(id, _)| id)
    }

    fn insert_member(&mut self, candidate: C, point: Vec<f64>) {
        let id = candidate.id();
        let leaf = self.insert_into_grid(id, &point);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(
            id,
            Member {
                candidate,
                point,
                leaf,
                seq,
            },
        );
    }

    fn insert_into_grid(&mut self, id: CandidateId, point: &[f64]) -> RegionId {
        let mut current = self.root;
        loop {
            let next = {
                let region = self.region_mut(current);
                region.occupancy += 1;
                if region.is_leaf() {
                    region.members.push(id);
                    return current;
                }
                let orthant = region.orthant(point);
                region.child(&orthant).ok_or(orthant)
            };
            current = match next {
                Ok(child) => child,
                Err(orthant) => self.spawn_child(current, orthant),
            };
        }
    }

    fn evict(&mut self, id: CandidateId) -> Option<C> {
        let member = self.members.remove(&id)?;
        self.remove_from_grid(id, member.leaf);
        Some(member.candidate)
    }

    fn remove_from_grid(&mut self, id: CandidateId, leaf: RegionId) {
        let members = &mut self.region_mut(leaf).members;
        if let Some(pos) = members.iter().position(|&m| m == id) {
            members.remove(pos);
        }

        let mut current = Some(leaf);
        while let Some(region_id) = current {
            let region = self.region_mut(region_id);
            region.occupancy -= 1;
            let parent = region.parent;
            if region.occupancy == 0
                && let Some(parent_id) = parent
            {
                self.regions[region_id] = None;
                self.free.push(region_id);
                self.region_mut(parent_id)
                    .children
                    .retain(|&(_, child)| child != region_id);
            }
            current = parent;
        }
    }

    /// Structural checks used by tests.
    #[cfg(test)]
    fn assert_consistent(&self) {
        let mut leaf_total = 0;
        for (id, region) in self.regions.iter().enumerate() {
            let Some(region) = region else { continue };
            if region.is_leaf() {
                leaf_total += region.members.len();
                assert_eq!(region.occupancy, region.members.len());
            } else {
                let below: usize = region
                    .children
                    .iter()
                    .map(|&(_, child)| self.region(child).occupancy)
                    .sum();
                assert_eq!(region.occupancy, below, "region {id}");
            }
            if id != self.root {
                assert!(region.occupancy > 0, "empty region {id} left behind");
            }
        }
        assert_eq!(leaf_total, self.members.len());
        for (id, member) in &self.members {
            assert!(self.region(member.leaf).members.contains(id));
            assert_eq!(self.leaf_for(&member.point), Some(member.leaf));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::fitness::{ScoredCandidate, dominates};
    use proptest::prelude::*;

    type Point = ScoredCandidate<()>;

    fn point(id: u64, values: &[f64]) -> Point {
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

    fn archive(dims: usize, depth: usize, capacity: usize) -> AdaptiveGridArchive<Point> {
        let config = GridConfig {
            capacity,
            depth,
            lower_bound: 0.0,
            upper_bound: 1.0,
        };
        AdaptiveGridArchive::new(objectives(dims), &config).unwrap()
    }

    fn ids(archive: &AdaptiveGridArchive<Point>) -> Vec<u64> {
        archive.candidates().map(|c| c.id.0).collect()
    }

    #[test]
    fn test_incomparable_candidates_both_accepted() {
        let mut archive = archive(2, 3, 10);
        assert!(archive.add(point(1, &[0.0, 0.3])));
        assert!(archive.add(point(2, &[0.2, 0.0])));
        assert_eq!(archive.len(), 2);
        archive.assert_consistent();
    }

    #[test]
    fn test_dominated_candidate_rejected() {
        let mut archive = archive(2, 3, 10);
        assert!(archive.add(point(1, &[0.1, 0.1])));
        assert!(!archive.add(point(2, &[0.2, 0.1])));
        assert_eq!(ids(&archive), vec![1]);
    }

    #[test]
    fn test_dominating_candidate_prunes_members() {
        let mut archive = archive(2, 3, 10);
        archive.add(point(1, &[0.2, 0.6]));
        archive.add(point(2, &[0.6, 0.2]));
        archive.add(point(3, &[0.9, 0.0]));

        assert!(archive.add(point(4, &[0.1, 0.1])));
        assert_eq!(ids(&archive), vec![3, 4]);
        archive.assert_consistent();
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut archive = archive(2, 2, 10);
        assert!(archive.add(point(1, &[0.3, 0.3])));
        assert!(!archive.add(point(1, &[0.3, 0.3])));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_equal_vectors_coexist() {
        let mut archive = archive(2, 2, 10);
        assert!(archive.add(point(1, &[0.3, 0.3])));
        assert!(archive.add(point(2, &[0.3, 0.3])));
        assert_eq!(archive.occupancy(&point(9, &[0.3, 0.3])), 2);
    }

    #[test]
    fn test_remove_dominated_returns_evicted() {
        let mut archive = archive(2, 2, 10);
        archive.add(point(1, &[0.5, 0.5]));
        archive.add(point(2, &[0.1, 0.9]));

        let removed = archive.remove_dominated(&point(3, &[0.4, 0.4]));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, CandidateId(1));
        assert_eq!(ids(&archive), vec![2]);
        archive.assert_consistent();
    }

    #[test]
    fn test_full_archive_admits_candidate_in_empty_region() {
        let mut archive = archive(2, 2, 2);
        archive.add(point(1, &[0.1, 0.9]));
        archive.add(point(2, &[0.9, 0.1]));

        assert!(archive.add(point(3, &[0.5, 0.5])));
        assert_eq!(archive.len(), 2);
        assert!(archive.contains(CandidateId(3)));
        archive.assert_consistent();
    }

    #[test]
    fn test_full_archive_rejects_candidate_in_crowded_region() {
        let mut archive = archive(2, 1, 3);
        archive.add(point(1, &[0.1, 0.9]));
        archive.add(point(2, &[0.2, 0.8]));
        archive.add(point(3, &[0.9, 0.1]));

        assert!(!archive.add(point(4, &[0.15, 0.85])));
        assert_eq!(ids(&archive), vec![1, 2, 3]);
    }

    #[test]
    fn test_full_archive_evicts_from_crowded_region() {
        let mut archive = archive(2, 1, 3);
        archive.add(point(1, &[0.1, 0.9]));
        archive.add(point(2, &[0.2, 0.8]));
        archive.add(point(3, &[0.9, 0.1]));

        assert!(archive.add(point(4, &[0.6, 0.4])));
        assert_eq!(archive.len(), 3);
        assert_eq!(ids(&archive), vec![2, 3, 4]);
        archive.assert_consistent();
    }

    #[test]
    fn test_midpoint_values_go_to_lower_half() {
        let mut archive = archive(2, 1, 10);
        archive.add(point(1, &[0.5, 0.5]));
        archive.add(point(2, &[0.25, 0.75]));
        archive.add(point(3, &[0.75, 0.25]));
        // (0.5, 0.5) shares the lower/lower leaf with nothing else.
        assert_eq!(archive.occupancy(&point(9, &[0.1, 0.1])), 1);
        assert_eq!(archive.occupancy(&point(9, &[0.5, 0.5])), 1);
        assert_eq!(archive.occupancy(&point(9, &[0.5000001, 0.5])), 1);
        assert_eq!(archive.occupancy(&point(9, &[0.75, 0.75])), 0);
        archive.assert_consistent();
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut archive = archive(2, 2, 10);
        assert!(archive.add(point(1, &[f64::MAX, 0.0])));
        assert!(archive.add(point(2, &[0.0, 7.5])));
        assert_eq!(archive.occupancy(&point(9, &[1.0, 0.0])), 1);
        archive.assert_consistent();
    }

    #[test]
    fn test_regions_created_lazily_and_released() {
        let mut archive = archive(2, 3, 10);
        assert_eq!(archive.region_count(), 1);

        archive.add(point(1, &[0.1, 0.9]));
        assert_eq!(archive.region_count(), 4);

        archive.add(point(2, &[0.9, 0.1]));
        assert_eq!(archive.region_count(), 7);

        archive.remove_dominated(&point(3, &[0.05, 0.85]));
        assert_eq!(archive.region_count(), 4);
        archive.assert_consistent();
    }

    #[test]
    fn test_decide_prefers_less_crowded_leaf() {
        let mut archive = archive(2, 2, 10);
        archive.add(point(1, &[0.1, 0.9]));
        archive.add(point(2, &[0.05, 0.95]));

        let crowded = point(10, &[0.08, 0.92]);
        let lonely = point(11, &[0.6, 0.3]);
        assert!(archive.decide(&lonely, &crowded));
        assert!(!archive.decide(&crowded, &lonely));
    }

    #[test]
    fn test_decide_walks_up_on_leaf_tie() {
        let mut archive = archive(2, 2, 10);
        archive.add(point(1, &[0.1, 0.9]));
        archive.add(point(2, &[0.4, 0.6]));
        archive.add(point(3, &[0.9, 0.05]));

        // Both leaves hold one member; the first quadrant holds two.
        let in_busy_quadrant = point(10, &[0.45, 0.55]);
        let in_quiet_quadrant = point(11, &[0.95, 0.2]);
        assert_eq!(archive.occupancy(&in_busy_quadrant), 1);
        assert_eq!(archive.occupancy(&in_quiet_quadrant), 1);

        assert!(!archive.decide(&in_busy_quadrant, &in_quiet_quadrant));
        assert!(archive.decide(&in_quiet_quadrant, &in_busy_quadrant));
    }

    #[test]
    fn test_decide_draw_uses_fallback() {
        let mut archive = archive(2, 2, 10);
        archive.add(point(1, &[0.1, 0.9]));
        let a = point(10, &[0.12, 0.88]);
        let b = point(11, &[0.13, 0.87]);
        assert_eq!(archive.decide(&a, &b), PREFER_CANDIDATE_ON_DRAW);
    }

    #[test]
    fn test_update_fitness_functions_rebuilds_grid() {
        let mut archive = archive(2, 2, 10);
        archive.add(point(1, &[0.2, 0.5, 0.1]));
        archive.add(point(2, &[0.2, 0.5, 0.3]));
        archive.add(point(3, &[0.7, 0.1, 0.9]));
        assert_eq!(archive.len(), 3);

        archive.update_fitness_functions(objectives(3));

        assert_eq!(archive.objectives().len(), 3);
        // Equal on the first two objectives, but 1 beats 2 on the third.
        assert_eq!(ids(&archive), vec![1, 3]);
        archive.assert_consistent();
    }

    #[test]
    fn test_invalid_construction() {
        let err = AdaptiveGridArchive::<Point>::with_bounds(objectives(2), vec![0.0], vec![1.0, 1.0], 2, 4)
            .unwrap_err();
        assert_eq!(
            err,
            ArchiveError::BoundsMismatch {
                objectives: 2,
                lower: 1,
                upper: 2
            }
        );

        let err = AdaptiveGridArchive::<Point>::with_bounds(objectives(1), vec![1.0], vec![0.0], 2, 4)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidBounds { .. }));

        let err = AdaptiveGridArchive::<Point>::with_bounds(objectives(1), vec![0.0], vec![1.0], 2, 0)
            .unwrap_err();
        assert_eq!(err, ArchiveError::ZeroCapacity);
    }

    #[test]
    #[should_panic(expected = "has no fitness")]
    fn test_nan_fitness_fails_fast() {
        #[derive(Clone)]
        struct Broken;
        impl Candidate for Broken {
            fn id(&self) -> CandidateId {
                CandidateId(0)
            }
            fn fitness(&self, _: Objective) -> f64 {
                f64::NAN
            }
        }
        let mut archive =
            AdaptiveGridArchive::<Broken>::with_bounds(objectives(1), vec![0.0], vec![1.0], 1, 2)
                .unwrap();
        archive.add(Broken);
    }

    proptest! {
        #[test]
        fn prop_archive_invariants(
            points in prop::collection::vec(prop::collection::vec(0.0f64..1.2, 3), 1..60),
            capacity in 1usize..8,
            depth in 0usize..4,
        ) {
            let mut archive = archive(3, depth, capacity);
            let objs = objectives(3);
            for (i, values) in points.iter().enumerate() {
                archive.add(point(i as u64, values));

                prop_assert!(archive.len() <= capacity);
                let members = archive.to_vec();
                for a in &members {
                    for b in &members {
                        prop_assert!(!dominates(a, b, &objs));
                    }
                }
            }
            archive.assert_consistent();
        }
    }
}
