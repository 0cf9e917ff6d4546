//! Targets placed on the ring.
//!
//! A target is a named destination (cache shard, storage node) with a
//! weight. Targets are identified on the ring by a compact [`TargetIndex`]
//! that stays fixed for the target's lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight used when a caller does not specify one.
pub const DEFAULT_WEIGHT: u32 = 1;

/// Longest accepted target name in bytes (the serialized length is a `u16`).
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Stable identifier of a target within one ring.
///
/// Assigned in insertion order and never reused after removal, so it doubles
/// as the deterministic tie-break between points that hash to the same token.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetIndex(pub u32);

impl fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A weighted target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique name; also the label hashed to place the target's points.
    pub name: String,
    /// Relative share of the ring, at least 1.
    pub weight: u32,
    /// Stable index.
    pub index: TargetIndex,
}

impl Target {
    pub fn new(name: impl Into<String>, weight: u32, index: TargetIndex) -> Self {
        Self {
            name: name.into(),
            weight,
            index,
        }
    }

    /// Number of ring points this target contributes for a given
    /// points-per-weight constant.
    #[inline]
    pub fn point_count(&self, points_per_weight: u32) -> u64 {
        u64::from(self.weight) * u64::from(points_per_weight)
    }
}
