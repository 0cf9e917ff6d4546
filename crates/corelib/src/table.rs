//! Target table: the authoritative ring topology.
//!
//! The table maps names to weighted targets and keeps them in stable-index
//! order. It is the only part of a ring that is ever serialized; the point
//! continuum is always derived from it.

use crate::error::{Error, Result};
use crate::target::{Target, TargetIndex, MAX_NAME_LEN};
use std::collections::HashMap;

/// Named, weighted targets in stable-index order.
///
/// # Invariants
///
/// - names are unique and non-empty
/// - every weight is at least 1
/// - `targets` is sorted by strictly ascending index
/// - every index is below `next_index`; indices are never handed out twice
#[derive(Clone, Debug, Default)]
pub struct TargetTable {
    targets: Vec<Target>,
    by_name: HashMap<String, TargetIndex>,
    next_index: u32,
}

impl TargetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table holding exactly `targets`.
    ///
    /// Indices are assigned in ascending name order, so the same set of
    /// `(name, weight)` pairs always yields the same table no matter how the
    /// caller iterated them. Fails without side effects on the first invalid
    /// entry or duplicate name.
    pub fn from_weights<I, S>(targets: I, max_weight: u32) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, u32)> = targets
            .into_iter()
            .map(|(name, weight)| (name.into(), weight))
            .collect();
        for (name, weight) in &entries {
            validate(name, *weight, max_weight)?;
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(Error::DuplicateTarget(pair[0].0.clone()));
        }

        let mut table = Self::new();
        table.targets.reserve(entries.len());
        for (name, weight) in entries {
            table.push(name, weight);
        }
        Ok(table)
    }

    /// Rebuild a table from decoded parts, checking every invariant.
    ///
    /// Violations are reported as [`Error::InvalidFormat`] since the parts
    /// come from a serialized buffer. Numbering continues after the highest
    /// index present.
    pub(crate) fn from_parts(targets: Vec<Target>, max_weight: u32) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(targets.len());
        let mut previous: Option<TargetIndex> = None;
        for target in &targets {
            if target.name.is_empty() {
                return Err(Error::invalid_format("empty target name"));
            }
            if target.weight == 0 || target.weight > max_weight {
                return Err(Error::invalid_format(format!(
                    "target '{}' has weight {} outside 1..={max_weight}",
                    target.name, target.weight
                )));
            }
            if previous.is_some_and(|prev| prev >= target.index) {
                return Err(Error::invalid_format(format!(
                    "target indices not strictly ascending at '{}'",
                    target.name
                )));
            }
            if target.index.0 == u32::MAX {
                return Err(Error::invalid_format(format!(
                    "target '{}' has reserved index {}",
                    target.name,
                    u32::MAX
                )));
            }
            if by_name.insert(target.name.clone(), target.index).is_some() {
                return Err(Error::invalid_format(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
            previous = Some(target.index);
        }
        Ok(Self {
            targets,
            by_name,
            next_index: previous.map_or(0, |last| last.0 + 1),
        })
    }

    /// Add a target with the next stable index.
    pub fn insert(&mut self, name: &str, weight: u32, max_weight: u32) -> Result<TargetIndex> {
        validate(name, weight, max_weight)?;
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicateTarget(name.to_owned()));
        }
        if self.next_index == u32::MAX {
            return Err(Error::invalid_parameter("target index space exhausted"));
        }
        Ok(self.push(name.to_owned(), weight))
    }

    /// Remove a target. Remaining targets keep their indices.
    pub fn remove(&mut self, name: &str) -> Result<Target> {
        let index = self
            .by_name
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        // The name map and the vector are kept in lockstep.
        match self.position(index) {
            Some(pos) => Ok(self.targets.remove(pos)),
            None => Err(Error::NotFound(name.to_owned())),
        }
    }

    /// Remove every target and restart index numbering.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.by_name.clear();
        self.next_index = 0;
    }

    /// Number of targets (not points).
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Index the next inserted target will receive.
    #[inline]
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Look a target up by name.
    pub fn get(&self, name: &str) -> Option<&Target> {
        let index = *self.by_name.get(name)?;
        self.by_index(index)
    }

    /// Look a target up by stable index.
    pub fn by_index(&self, index: TargetIndex) -> Option<&Target> {
        self.position(index).map(|pos| &self.targets[pos])
    }

    /// Targets in stable-index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    /// Sum of all weights, saturating at `u64::MAX`.
    pub fn total_weight(&self) -> u64 {
        self.targets
            .iter()
            .fold(0u64, |sum, t| sum.saturating_add(u64::from(t.weight)))
    }

    /// Number of ring points the table produces for `points_per_weight`,
    /// saturating at `u64::MAX`.
    pub fn point_count(&self, points_per_weight: u32) -> u64 {
        self.total_weight().saturating_mul(u64::from(points_per_weight))
    }

    /// Targets sorted by name, paired with their rank in that order.
    ///
    /// The rank depends only on the set of names, not on how the table was
    /// built, which makes it the canonical numbering used for serialization
    /// and for ordering points that share a token.
    pub fn by_name_order(&self) -> Vec<(u32, &Target)> {
        let mut sorted: Vec<&Target> = self.targets.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        (0u32..).zip(sorted).collect()
    }

    fn push(&mut self, name: String, weight: u32) -> TargetIndex {
        let index = TargetIndex(self.next_index);
        self.next_index += 1;
        self.by_name.insert(name.clone(), index);
        self.targets.push(Target::new(name, weight, index));
        index
    }

    fn position(&self, index: TargetIndex) -> Option<usize> {
        self.targets.binary_search_by_key(&index, |t| t.index).ok()
    }
}

impl<'a> IntoIterator for &'a TargetTable {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate(name: &str, weight: u32, max_weight: u32) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_parameter("target name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_parameter(format!(
            "target name is {} bytes, limit is {}",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    if weight == 0 || weight > max_weight {
        return Err(Error::invalid_parameter(format!(
            "weight {weight} for '{name}' outside 1..={max_weight}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 1024;

    #[test]
    fn test_insert_assigns_sequential_indices() {
        let mut table = TargetTable::new();
        assert_eq!(table.insert("a", 1, MAX).unwrap(), TargetIndex(0));
        assert_eq!(table.insert("b", 3, MAX).unwrap(), TargetIndex(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.total_weight(), 4);
        assert_eq!(table.point_count(10), 40);
    }

    #[test]
    fn test_insert_rejects_bad_input() {
        let mut table = TargetTable::new();
        assert!(matches!(table.insert("", 1, MAX), Err(Error::InvalidParameter(_))));
        assert!(matches!(table.insert("a", 0, MAX), Err(Error::InvalidParameter(_))));
        assert!(matches!(
            table.insert("a", MAX + 1, MAX),
            Err(Error::InvalidParameter(_))
        ));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(table.insert(&long, 1, MAX), Err(Error::InvalidParameter(_))));
        assert!(table.is_empty());
        assert_eq!(table.next_index(), 0);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut table = TargetTable::new();
        table.insert("a", 1, MAX).unwrap();
        assert!(matches!(table.insert("a", 2, MAX), Err(Error::DuplicateTarget(_))));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").unwrap().weight, 1);
    }

    #[test]
    fn test_remove_keeps_indices() {
        let mut table = TargetTable::new();
        table.insert("a", 1, MAX).unwrap();
        table.insert("b", 1, MAX).unwrap();
        table.insert("c", 1, MAX).unwrap();

        let removed = table.remove("b").unwrap();
        assert_eq!(removed.index, TargetIndex(1));
        assert_eq!(table.get("c").unwrap().index, TargetIndex(2));
        assert!(table.by_index(TargetIndex(1)).is_none());

        // Removed indices are not handed out again.
        assert_eq!(table.insert("b", 1, MAX).unwrap(), TargetIndex(3));
    }

    #[test]
    fn test_remove_missing() {
        let mut table = TargetTable::new();
        assert!(matches!(table.remove("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let mut table = TargetTable::new();
        table.insert("a", 1, MAX).unwrap();
        table.insert("b", 1, MAX).unwrap();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.insert("z", 1, MAX).unwrap(), TargetIndex(0));
    }

    #[test]
    fn test_from_weights_orders_by_name() {
        let forward = TargetTable::from_weights([("b", 2), ("a", 1), ("c", 3)], MAX).unwrap();
        let reverse = TargetTable::from_weights([("c", 3), ("b", 2), ("a", 1)], MAX).unwrap();
        let names: Vec<_> = forward.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(
            forward.iter().collect::<Vec<_>>(),
            reverse.iter().collect::<Vec<_>>()
        );
        assert_eq!(forward.next_index(), 3);
    }

    #[test]
    fn test_from_weights_rejects_duplicates_and_bad_weights() {
        assert!(matches!(
            TargetTable::from_weights([("a", 1), ("a", 2)], MAX),
            Err(Error::DuplicateTarget(name)) if name == "a"
        ));
        assert!(matches!(
            TargetTable::from_weights([("a", 1), ("b", 0)], MAX),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_parts_checks_invariants() {
        let ok = vec![
            Target::new("a", 1, TargetIndex(0)),
            Target::new("c", 2, TargetIndex(4)),
        ];
        let table = TargetTable::from_parts(ok, MAX).unwrap();
        assert_eq!(table.get("c").unwrap().index, TargetIndex(4));
        assert_eq!(table.next_index(), 5);
        assert_eq!(TargetTable::from_parts(Vec::new(), MAX).unwrap().next_index(), 0);

        let unordered = vec![
            Target::new("a", 1, TargetIndex(2)),
            Target::new("b", 1, TargetIndex(1)),
        ];
        assert!(matches!(
            TargetTable::from_parts(unordered, MAX),
            Err(Error::InvalidFormat(_))
        ));

        let reserved = vec![Target::new("a", 1, TargetIndex(u32::MAX))];
        assert!(matches!(
            TargetTable::from_parts(reserved, MAX),
            Err(Error::InvalidFormat(_))
        ));

        let dup = vec![
            Target::new("a", 1, TargetIndex(0)),
            Target::new("a", 1, TargetIndex(1)),
        ];
        assert!(matches!(
            TargetTable::from_parts(dup, MAX),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_from_parts_enforces_max_weight() {
        let heavy = vec![Target::new("a", MAX + 1, TargetIndex(0))];
        assert!(matches!(
            TargetTable::from_parts(heavy, MAX),
            Err(Error::InvalidFormat(_))
        ));
        let huge = vec![Target::new("a", u32::MAX, TargetIndex(0))];
        assert!(matches!(
            TargetTable::from_parts(huge, MAX),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_point_count_saturates() {
        let mut table = TargetTable::new();
        table.insert("a", u32::MAX, u32::MAX).unwrap();
        table.insert("b", u32::MAX, u32::MAX).unwrap();
        assert_eq!(table.total_weight(), 2 * u64::from(u32::MAX));
        assert_eq!(table.point_count(u32::MAX), u64::MAX);
    }

    #[test]
    fn test_name_order_ignores_insertion_history() {
        let mut table = TargetTable::new();
        table.insert("c", 1, MAX).unwrap();
        table.insert("x", 1, MAX).unwrap();
        table.insert("a", 2, MAX).unwrap();
        table.remove("x").unwrap();
        let ranked: Vec<(u32, &str, TargetIndex)> = table
            .by_name_order()
            .into_iter()
            .map(|(rank, t)| (rank, t.name.as_str(), t.index))
            .collect();
        assert_eq!(
            ranked,
            vec![(0, "a", TargetIndex(2)), (1, "c", TargetIndex(0))]
        );
    }
}
