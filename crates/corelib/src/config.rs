//! Ring configuration.

use crate::error::{Error, Result};
use crate::partitioner::PartitionerKind;
use serde::{Deserialize, Serialize};

/// Points placed on the ring per unit of target weight.
pub const DEFAULT_POINTS_PER_WEIGHT: u32 = 128;

/// Largest weight accepted by default.
pub const DEFAULT_MAX_WEIGHT: u32 = 1024;

/// Upper bound for `points_per_weight`.
pub const MAX_POINTS_PER_WEIGHT: u32 = 1 << 16;

/// Most points a single ring may hold (16 bytes each once built).
pub const MAX_RING_POINTS: u64 = 1 << 24;

/// When the point continuum is rebuilt after a topology change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildPolicy {
    /// Mutations only invalidate; the next lookup rebuilds. Mutations stay
    /// cheap and back-to-back changes cost a single rebuild.
    #[default]
    Lazy,
    /// Every mutation rebuilds before returning, so lookups never pay for it.
    Eager,
}

/// Tunables of a [`HashRing`](crate::ring::HashRing).
///
/// `points_per_weight` and `partitioner` describe the ring layout and are
/// recorded in serialized rings; loading a snapshot adopts the snapshot's
/// values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub points_per_weight: u32,
    pub partitioner: PartitionerKind,
    pub max_weight: u32,
    pub rebuild: RebuildPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            points_per_weight: DEFAULT_POINTS_PER_WEIGHT,
            partitioner: PartitionerKind::default(),
            max_weight: DEFAULT_MAX_WEIGHT,
            rebuild: RebuildPolicy::default(),
        }
    }
}

impl RingConfig {
    /// Rejects zero values, a `points_per_weight` above
    /// [`MAX_POINTS_PER_WEIGHT`], and a single maximum-weight target that
    /// would exceed [`MAX_RING_POINTS`] on its own.
    pub fn validate(&self) -> Result<()> {
        if self.points_per_weight == 0 {
            return Err(Error::invalid_parameter("points_per_weight must be at least 1"));
        }
        if self.points_per_weight > MAX_POINTS_PER_WEIGHT {
            return Err(Error::invalid_parameter(format!(
                "points_per_weight {} above limit {MAX_POINTS_PER_WEIGHT}",
                self.points_per_weight
            )));
        }
        if self.max_weight == 0 {
            return Err(Error::invalid_parameter("max_weight must be at least 1"));
        }
        let per_target = u64::from(self.points_per_weight) * u64::from(self.max_weight);
        if per_target > MAX_RING_POINTS {
            return Err(Error::invalid_parameter(format!(
                "max_weight {} at {} points per weight gives {per_target} points, limit is {MAX_RING_POINTS}",
                self.max_weight, self.points_per_weight
            )));
        }
        Ok(())
    }
}

/// Fails with [`Error::InvalidParameter`] when a ring would hold more than
/// [`MAX_RING_POINTS`] points.
pub(crate) fn check_ring_points(points: u64) -> Result<()> {
    if points > MAX_RING_POINTS {
        return Err(Error::invalid_parameter(format!(
            "{points} ring points above limit {MAX_RING_POINTS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.points_per_weight, 128);
        assert_eq!(config.rebuild, RebuildPolicy::Lazy);
    }

    #[test]
    fn test_rejects_zero_values() {
        let config = RingConfig {
            points_per_weight: 0,
            ..RingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));

        let config = RingConfig {
            max_weight: 0,
            ..RingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_oversized_layouts() {
        let config = RingConfig {
            points_per_weight: u32::MAX,
            max_weight: u32::MAX,
            ..RingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));

        let config = RingConfig {
            points_per_weight: MAX_POINTS_PER_WEIGHT + 1,
            max_weight: 1,
            ..RingConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));

        // Exactly at the ceiling is still accepted.
        let config = RingConfig {
            points_per_weight: MAX_POINTS_PER_WEIGHT,
            max_weight: 256,
            ..RingConfig::default()
        };
        assert!(config.validate().is_ok());
        let config = RingConfig {
            max_weight: 257,
            ..config
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_check_ring_points() {
        assert!(check_ring_points(MAX_RING_POINTS).is_ok());
        assert!(matches!(
            check_ring_points(MAX_RING_POINTS + 1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(check_ring_points(u64::MAX).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RingConfig =
            serde_json::from_str(r#"{"points_per_weight": 40, "rebuild": "eager"}"#).unwrap();
        assert_eq!(config.points_per_weight, 40);
        assert_eq!(config.rebuild, RebuildPolicy::Eager);
        assert_eq!(config.partitioner, PartitionerKind::Xxh3);
        assert_eq!(config.max_weight, DEFAULT_MAX_WEIGHT);
    }
}
