//! Greedy maximum-coverage selection over candidate segment groups.
//!
//! Each round picks the candidate covering the most not-yet-covered clients
//! (ties go to the earliest candidate). Selection stops at the group cap,
//! when the best marginal gain falls below the floor, or when the pool is
//! exhausted. This is the standard `1 - 1/e` approximation for maximum
//! coverage.

use std::collections::BTreeSet;

use audience_core::types::SegmentGroup;
use tracing::debug;

use crate::{MAX_SEGMENT_GROUPS, MIN_GROUP_SIZE};

/// Bounds applied to one selection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub max_groups: usize,
    /// Minimum marginal gain for a candidate to be picked.
    pub min_gain: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_groups: MAX_SEGMENT_GROUPS,
            min_gain: MIN_GROUP_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Chosen groups, in selection order.
    pub groups: Vec<SegmentGroup>,
    /// Union of the chosen groups' members.
    pub covered: BTreeSet<String>,
}

pub struct CoverageSelector {
    limits: SelectionLimits,
}

impl CoverageSelector {
    pub fn new(limits: SelectionLimits) -> Self {
        Self { limits }
    }

    pub fn select(&self, candidates: Vec<SegmentGroup>) -> Selection {
        let mut pool = candidates;
        let mut selection = Selection::default();
        // A zero gain never counts as progress.
        let floor = self.limits.min_gain.max(1);

        while !pool.is_empty() && selection.groups.len() < self.limits.max_groups {
            let mut best: Option<(usize, usize)> = None;
            for (pos, candidate) in pool.iter().enumerate() {
                let gain = marginal_gain(candidate, &selection.covered);
                if best.map_or(true, |(_, best_gain)| gain > best_gain) {
                    best = Some((pos, gain));
                }
            }

            let Some((pos, gain)) = best else {
                break;
            };
            if gain < floor {
                debug!(gain, floor, "Best marginal gain below floor, stopping");
                break;
            }

            let chosen = pool.remove(pos);
            debug!(
                criterion = %chosen.criterion,
                value = %chosen.value,
                gain,
                "Segment group selected"
            );
            selection.covered.extend(chosen.member_ids.iter().cloned());
            selection.groups.push(chosen);
        }

        selection
    }
}

/// Members of `group` not yet in `covered`.
pub fn marginal_gain(group: &SegmentGroup, covered: &BTreeSet<String>) -> usize {
    group
        .member_ids
        .iter()
        .filter(|id| !covered.contains(*id))
        .count()
}
