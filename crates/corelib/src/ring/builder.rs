//! Fluent construction of a [`HashRing`].

use crate::config::{check_ring_points, RebuildPolicy, RingConfig};
use crate::error::Result;
use crate::partitioner::PartitionerKind;
use crate::ring::ring::HashRing;
use crate::table::TargetTable;
use crate::target::DEFAULT_WEIGHT;

/// Builder for a [`HashRing`] with an initial set of targets.
///
/// Targets get stable indices in the order they are added. The continuum is
/// built at most once, after all targets are in place.
///
/// # Example
///
/// ```rust
/// use chash_core::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .with_points_per_weight(64)
///     .add_target("cache-1")
///     .add_target_with_weight("cache-2", 2)
///     .build()
///     .unwrap();
/// assert_eq!(ring.points_count(), 64 * 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RingBuilder {
    config: RingConfig,
    targets: Vec<(String, u32)>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration.
    pub fn with_config(mut self, config: RingConfig) -> Self {
        self.config = config;
        self
    }

    /// Points per unit of weight (default 128).
    pub fn with_points_per_weight(mut self, points_per_weight: u32) -> Self {
        self.config.points_per_weight = points_per_weight;
        self
    }

    pub fn with_partitioner(mut self, partitioner: PartitionerKind) -> Self {
        self.config.partitioner = partitioner;
        self
    }

    pub fn with_max_weight(mut self, max_weight: u32) -> Self {
        self.config.max_weight = max_weight;
        self
    }

    pub fn with_rebuild_policy(mut self, rebuild: RebuildPolicy) -> Self {
        self.config.rebuild = rebuild;
        self
    }

    /// Add a target with the default weight.
    pub fn add_target(self, name: impl Into<String>) -> Self {
        self.add_target_with_weight(name, DEFAULT_WEIGHT)
    }

    pub fn add_target_with_weight(mut self, name: impl Into<String>, weight: u32) -> Self {
        self.targets.push((name.into(), weight));
        self
    }

    /// Validate the configuration and targets and build the ring.
    ///
    /// Fails with the same errors [`HashRing::add_target`] would report for
    /// the first offending target, including the ring point ceiling.
    pub fn build(self) -> Result<HashRing> {
        self.config.validate()?;
        let mut table = TargetTable::new();
        for (name, weight) in &self.targets {
            table.insert(name, *weight, self.config.max_weight)?;
        }
        check_ring_points(table.point_count(self.config.points_per_weight))?;
        Ok(HashRing::from_table(self.config, table))
    }
}
