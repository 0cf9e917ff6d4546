//! The ring engine.

use crate::codec;
use crate::config::{check_ring_points, RebuildPolicy, RingConfig};
use crate::error::{Error, Result};
use crate::partitioner::{Partitioner, PartitionerKind};
use crate::ring::balance::{LoadStats, LoadTracker};
use crate::ring::continuum::Continuum;
use crate::table::TargetTable;
use crate::target::Target;
use bytes::Bytes;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ring space size as a float, for turning token widths into fractions.
const RING_SPAN: f64 = 18_446_744_073_709_551_616.0;

/// Consistent hash ring over a weighted, mutable set of named targets.
///
/// The ring owns its topology (a [`TargetTable`]), the point continuum
/// derived from it, and the assignment counters used by
/// [`lookup_balance`](HashRing::lookup_balance). Nothing is shared between
/// instances.
///
/// # Concurrency
///
/// All methods take `&self`. Topology changes take an exclusive lock;
/// lookups share a read lock once the continuum is built, so a ring can sit
/// behind an `Arc` and serve many readers while an occasional writer
/// reconfigures it. A failed mutation never changes anything.
///
/// # Rebuilds
///
/// With [`RebuildPolicy::Lazy`] a mutation only drops the continuum and the
/// next lookup rebuilds it (O(P log P), P = total points). With
/// [`RebuildPolicy::Eager`] the mutation rebuilds before returning. Either
/// way, prefer [`set_targets`](HashRing::set_targets) over many single adds.
pub struct HashRing {
    config: RingConfig,
    state: RwLock<RingState>,
    loads: LoadTracker,
}

struct RingState {
    table: TargetTable,
    partitioner: Box<dyn Partitioner>,
    points_per_weight: u32,
    /// `None` until built; always `None` for an empty table.
    continuum: Option<Continuum>,
}

impl RingState {
    fn invalidate(&mut self, policy: RebuildPolicy) {
        self.continuum = None;
        if policy == RebuildPolicy::Eager && !self.table.is_empty() {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let started = Instant::now();
        let continuum =
            Continuum::build(&self.table, self.partitioner.as_ref(), self.points_per_weight);
        let elapsed = started.elapsed();

        metrics::counter!("chash_ring_rebuilds_total").increment(1);
        metrics::histogram!("chash_ring_rebuild_seconds").record(elapsed.as_secs_f64());
        metrics::gauge!("chash_ring_points").set(continuum.len() as f64);
        debug!(
            targets = self.table.len(),
            points = continuum.len(),
            ?elapsed,
            "rebuilt continuum"
        );

        self.continuum = Some(continuum);
    }
}

impl HashRing {
    /// Create an empty ring with the default configuration.
    pub fn new() -> Self {
        Self::from_table(RingConfig::default(), TargetTable::new())
    }

    /// Create an empty ring with a custom configuration.
    pub fn with_config(config: RingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_table(config, TargetTable::new()))
    }

    /// Assemble a ring around an existing table. `config` must be valid.
    pub(crate) fn from_table(config: RingConfig, table: TargetTable) -> Self {
        let mut state = RingState {
            table,
            partitioner: config.partitioner.build(),
            points_per_weight: config.points_per_weight,
            continuum: None,
        };
        state.invalidate(config.rebuild);
        Self {
            config,
            state: RwLock::new(state),
            loads: LoadTracker::new(),
        }
    }

    /// Configuration the ring was created with.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Partitioner currently placing points (a loaded snapshot may differ
    /// from the configured one).
    pub fn partitioner_kind(&self) -> PartitionerKind {
        self.state.read().partitioner.kind()
    }

    /// Points per unit of weight currently in effect.
    pub fn points_per_weight(&self) -> u32 {
        self.state.read().points_per_weight
    }

    // ------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------

    /// Add a target with the next stable index.
    ///
    /// Fails with [`Error::DuplicateTarget`] if the name is taken and with
    /// [`Error::InvalidParameter`] for an empty or over-long name or a weight
    /// outside `1..=max_weight`, or when the ring would grow past
    /// [`MAX_RING_POINTS`](crate::config::MAX_RING_POINTS) points. Callers
    /// without a weight of their own pass
    /// [`DEFAULT_WEIGHT`](crate::target::DEFAULT_WEIGHT).
    pub fn add_target(&self, name: &str, weight: u32) -> Result<()> {
        let mut state = self.state.write();
        let k = u64::from(state.points_per_weight);
        check_ring_points(
            state
                .table
                .point_count(state.points_per_weight)
                .saturating_add(u64::from(weight).saturating_mul(k)),
        )?;
        let index = state.table.insert(name, weight, self.config.max_weight)?;
        state.invalidate(self.config.rebuild);
        debug!(target_name = name, weight, %index, "added target");
        Ok(())
    }

    /// Remove a target. Other targets keep their indices and counters.
    pub fn remove_target(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        let removed = state.table.remove(name)?;
        self.loads.forget(removed.index);
        state.invalidate(self.config.rebuild);
        debug!(target_name = name, index = %removed.index, "removed target");
        Ok(())
    }

    /// Replace the whole target set in one step.
    ///
    /// Returns the number of ring points the new set produces. The input is
    /// validated completely before anything changes, including the
    /// [`MAX_RING_POINTS`](crate::config::MAX_RING_POINTS) ceiling; on error
    /// the previous targets stay in place. Indices are assigned in name order
    /// and load counters are reset.
    pub fn set_targets<I, S>(&self, targets: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let table = TargetTable::from_weights(targets, self.config.max_weight)?;
        let mut state = self.state.write();
        let points = table.point_count(state.points_per_weight);
        check_ring_points(points)?;
        let points = usize::try_from(points).unwrap_or(usize::MAX);
        state.table = table;
        self.loads.clear();
        state.invalidate(self.config.rebuild);
        info!(targets = state.table.len(), points, "replaced target set");
        Ok(points)
    }

    /// Remove every target and reset load counters. Idempotent.
    pub fn clear_targets(&self) {
        let mut state = self.state.write();
        state.table.clear();
        state.continuum = None;
        self.loads.clear();
        debug!("cleared targets");
    }

    /// Number of targets (not points).
    pub fn targets_count(&self) -> usize {
        self.state.read().table.len()
    }

    /// Number of points the current targets place on the ring.
    pub fn points_count(&self) -> usize {
        let state = self.state.read();
        usize::try_from(state.table.point_count(state.points_per_weight)).unwrap_or(usize::MAX)
    }

    /// Snapshot of all targets in stable-index order.
    pub fn targets(&self) -> Vec<Target> {
        self.state.read().table.iter().cloned().collect()
    }

    /// Look a target up by name.
    pub fn target(&self, name: &str) -> Option<Target> {
        self.state.read().table.get(name).cloned()
    }

    /// Build the continuum now instead of on the next lookup.
    ///
    /// Returns the number of points on the ring, or [`Error::EmptyRing`].
    pub fn freeze(&self) -> Result<usize> {
        self.with_continuum(|_, continuum| continuum.len())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Up to `count` distinct targets for `key`, in ring-walk order.
    ///
    /// The first name is the key's primary target; the rest are the next
    /// distinct targets met clockwise, which makes the list suitable for
    /// replica placement or failover. When `count` exceeds the number of
    /// targets every target is returned once.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `count` is zero
    /// - [`Error::EmptyRing`] if there are no targets
    ///
    /// # Performance
    /// O(log P) to locate the key plus a short clockwise walk.
    pub fn lookup_list(&self, key: impl AsRef<[u8]>, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Err(Error::invalid_parameter("lookup count must be at least 1"));
        }
        let key = key.as_ref();
        self.with_continuum(|state, continuum| {
            let token = state.partitioner.partition(key);
            continuum
                .walk(token, count)
                .into_iter()
                .filter_map(|index| continuum.name(index))
                .map(|name| name.to_string())
                .collect()
        })
    }

    /// Primary target for `key`.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Result<String> {
        self.lookup_list(key, 1)?
            .into_iter()
            .next()
            .ok_or(Error::EmptyRing)
    }

    /// Pick one target for `key` among its first `count` ring-walk
    /// candidates, preferring the one with the fewest balanced picks so far.
    ///
    /// Ties go to the earlier candidate, so under even load a key keeps
    /// landing on its primary target; as load skews, picks spill over to the
    /// next candidates. Each call charges the chosen target one assignment.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `count` is zero
    /// - [`Error::EmptyRing`] if there are no targets
    pub fn lookup_balance(&self, key: impl AsRef<[u8]>, count: usize) -> Result<String> {
        if count == 0 {
            return Err(Error::invalid_parameter("balance count must be at least 1"));
        }
        let key = key.as_ref();
        // The pick happens under the shared lock, so a concurrent topology
        // change cannot reset counters between choosing and charging.
        let chosen = self.with_continuum(|state, continuum| {
            let token = state.partitioner.partition(key);
            let candidates = continuum.walk(token, count);
            self.loads
                .pick(&candidates)
                .and_then(|index| continuum.name(index))
                .map(|name| name.to_string())
        })?;
        metrics::counter!("chash_balance_picks_total").increment(1);
        chosen.ok_or(Error::EmptyRing)
    }

    /// Balanced-pick counters per target, in stable-index order.
    pub fn loads(&self) -> Vec<(String, u64)> {
        let state = self.state.read();
        state
            .table
            .iter()
            .map(|t| (t.name.clone(), self.loads.load(t.index)))
            .collect()
    }

    /// Summary of the balanced-pick counters.
    pub fn load_stats(&self) -> LoadStats {
        let state = self.state.read();
        let loads: Vec<u64> = state.table.iter().map(|t| self.loads.load(t.index)).collect();
        LoadStats::from_loads(&loads)
    }

    /// Reset every balanced-pick counter to zero.
    pub fn reset_loads(&self) {
        let _state = self.state.write();
        self.loads.clear();
    }

    /// Fraction of the key space owned by each target, in stable-index
    /// order. Fractions add up to 1.
    pub fn ownership(&self) -> Result<Vec<(String, f64)>> {
        self.with_continuum(|_, continuum| {
            continuum
                .ownership()
                .into_iter()
                .filter_map(|(index, width)| {
                    continuum
                        .name(index)
                        .map(|name| (name.to_string(), width as f64 / RING_SPAN))
                })
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Encode the ring topology. Points and load counters are not included.
    ///
    /// The bytes depend only on the `(name, weight)` set and the layout, so
    /// two rings holding the same targets serialize identically however they
    /// were built.
    pub fn serialize(&self) -> Bytes {
        let state = self.state.read();
        codec::encode(&state.table, state.partitioner.kind(), state.points_per_weight)
    }

    /// Replace the topology with a serialized one.
    ///
    /// Returns the number of targets loaded. The snapshot's partitioner and
    /// points-per-weight are adopted so the regenerated ring matches the one
    /// that was saved. Targets are renumbered in name order and load
    /// counters are reset. Weights above the configured `max_weight` are
    /// rejected as [`Error::InvalidFormat`]. On error nothing changes.
    pub fn unserialize(&self, input: &[u8]) -> Result<usize> {
        let snapshot = codec::decode(input, self.config.max_weight)?;
        if snapshot.points_per_weight != self.config.points_per_weight
            || snapshot.partitioner != self.config.partitioner
        {
            warn!(
                snapshot_points_per_weight = snapshot.points_per_weight,
                configured_points_per_weight = self.config.points_per_weight,
                snapshot_partitioner = %snapshot.partitioner,
                configured_partitioner = %self.config.partitioner,
                "snapshot layout differs from configuration, using snapshot layout"
            );
        }

        let count = snapshot.table.len();
        let mut state = self.state.write();
        state.table = snapshot.table;
        state.partitioner = snapshot.partitioner.build();
        state.points_per_weight = snapshot.points_per_weight;
        self.loads.clear();
        state.invalidate(self.config.rebuild);
        info!(targets = count, bytes = input.len(), "loaded ring snapshot");
        Ok(count)
    }

    /// Write [`serialize`](HashRing::serialize) output to `path`, replacing
    /// any existing file. Returns the number of bytes written.
    pub fn serialize_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = self.serialize();
        std::fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote ring snapshot");
        Ok(bytes.len())
    }

    /// Load a snapshot written by [`serialize_to_file`](HashRing::serialize_to_file).
    /// Returns the number of targets loaded.
    pub fn unserialize_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "read ring snapshot");
        self.unserialize(&bytes)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run `f` against a built continuum under the shared lock, building it
    /// first if a mutation dropped it.
    fn with_continuum<R>(&self, f: impl FnOnce(&RingState, &Continuum) -> R) -> Result<R> {
        {
            let state = self.state.read();
            if let Some(continuum) = &state.continuum {
                return Ok(f(&state, continuum));
            }
            if state.table.is_empty() {
                return Err(Error::EmptyRing);
            }
        }

        let mut state = self.state.write();
        // Another caller may have rebuilt or cleared the ring meanwhile.
        if state.continuum.is_none() && !state.table.is_empty() {
            state.rebuild();
        }
        let state = RwLockWriteGuard::downgrade(state);
        match &state.continuum {
            Some(continuum) => Ok(f(&state, continuum)),
            None => Err(Error::EmptyRing),
        }
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HashRing")
            .field("partitioner", &state.partitioner.name())
            .field("points_per_weight", &state.points_per_weight)
            .field("targets", &state.table.len())
            .field("built", &state.continuum.is_some())
            .finish()
    }
}
