//! Assignment counters behind bounded-load balancing.
//!
//! Counters reflect runtime traffic, not topology: they are never serialized
//! and are reset whenever the whole target set is replaced.

use crate::target::TargetIndex;
use dashmap::DashMap;
use serde::Serialize;

/// Per-target count of balanced picks.
#[derive(Debug, Default)]
pub struct LoadTracker {
    counters: DashMap<TargetIndex, u64>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `target` (zero if never picked).
    pub fn load(&self, target: TargetIndex) -> u64 {
        self.counters.get(&target).map(|c| *c).unwrap_or(0)
    }

    /// Choose the least-loaded candidate and charge it one assignment.
    ///
    /// Candidates are given in ring-walk order; on equal load the earlier
    /// one wins, so a key keeps resolving to its primary target while load
    /// is even. Two concurrent picks may observe the same counters and
    /// choose the same target; the counters themselves never lose updates.
    pub fn pick(&self, candidates: &[TargetIndex]) -> Option<TargetIndex> {
        let mut best: Option<(TargetIndex, u64)> = None;
        for &candidate in candidates {
            let load = self.load(candidate);
            if best.map_or(true, |(_, lowest)| load < lowest) {
                best = Some((candidate, load));
            }
        }
        let (chosen, _) = best?;
        *self.counters.entry(chosen).or_insert(0) += 1;
        Some(chosen)
    }

    /// Drop the counter of a target that left the ring.
    pub fn forget(&self, target: TargetIndex) {
        self.counters.remove(&target);
    }

    /// Reset every counter.
    pub fn clear(&self) {
        self.counters.clear();
    }
}

/// Summary of the balanced-pick counters across all targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadStats {
    pub total: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
}

impl LoadStats {
    /// Compute stats over one load value per target.
    pub fn from_loads(loads: &[u64]) -> Self {
        if loads.is_empty() {
            return Self {
                total: 0,
                min: 0,
                max: 0,
                mean: 0.0,
                stddev: 0.0,
            };
        }
        let total: u64 = loads.iter().sum();
        let mean = total as f64 / loads.len() as f64;
        let variance = loads
            .iter()
            .map(|&l| {
                let d = l as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / loads.len() as f64;
        Self {
            total,
            min: loads.iter().copied().min().unwrap_or(0),
            max: loads.iter().copied().max().unwrap_or(0),
            mean,
            stddev: variance.sqrt(),
        }
    }

    /// `max / min`, or infinity when some target has no load yet.
    pub fn max_min_ratio(&self) -> f64 {
        if self.min == 0 {
            f64::INFINITY
        } else {
            self.max as f64 / self.min as f64
        }
    }
}
