//! Sorted point continuum and the ring walk.

use crate::partitioner::Partitioner;
use crate::point::{write_label, Point};
use crate::table::TargetTable;
use crate::target::TargetIndex;
use crate::token::Token;
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable, sorted snapshot of every point derived from a target table.
///
/// A continuum is rebuilt from scratch after each topology change and never
/// mutated afterwards, so lookups can walk it under a shared lock.
#[derive(Debug, Clone)]
pub struct Continuum {
    /// Sorted by token; points sharing a token are ordered by target name.
    /// No duplicates.
    points: Vec<Point>,
    /// Target names by stable index, ascending.
    names: Vec<(TargetIndex, Arc<str>)>,
}

impl Continuum {
    /// Place and sort all points of `table`.
    ///
    /// When two targets hash a point to the same token, the target whose
    /// name sorts first comes first, so the layout depends only on the
    /// target set and never on stable indices.
    ///
    /// # Performance
    /// - **Time**: O(P log P) where P = `table.point_count(points_per_weight)`
    /// - **Space**: O(P)
    pub fn build(table: &TargetTable, partitioner: &dyn Partitioner, points_per_weight: u32) -> Self {
        let capacity = usize::try_from(table.point_count(points_per_weight)).unwrap_or(0);
        let mut placed: Vec<(Token, u32, TargetIndex)> = Vec::with_capacity(capacity);
        let mut label = Vec::new();

        for (rank, target) in table.by_name_order() {
            for ordinal in 0..target.point_count(points_per_weight) {
                write_label(&mut label, &target.name, ordinal);
                placed.push((partitioner.partition(&label), rank, target.index));
            }
        }

        placed.sort_unstable();
        // Only a 64-bit collision between two labels of the same target can
        // produce an equal pair.
        placed.dedup();
        let points = placed
            .into_iter()
            .map(|(token, _, index)| Point::new(token, index))
            .collect();

        let names = table
            .iter()
            .map(|t| (t.index, Arc::from(t.name.as_str())))
            .collect();

        Self { points, names }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of distinct targets on the ring.
    #[inline]
    pub fn target_count(&self) -> usize {
        self.names.len()
    }

    /// All points in ring order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Name of the target with the given index.
    pub fn name(&self, index: TargetIndex) -> Option<&Arc<str>> {
        self.names
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|pos| &self.names[pos].1)
    }

    /// Position of the first point at or after `token`, wrapping to 0.
    #[inline]
    pub fn successor(&self, token: Token) -> usize {
        let idx = self.points.partition_point(|p| p.token < token);
        if idx == self.points.len() {
            0
        } else {
            idx
        }
    }

    /// Walk clockwise from `token` and collect up to `count` distinct
    /// targets in the order they are met.
    ///
    /// Returns `min(count, target_count())` indices; empty only when the
    /// continuum is empty or `count` is zero.
    ///
    /// # Performance
    /// - **Time**: O(log P) to find the start, then proportional to the
    ///   number of points skipped before enough distinct targets are seen
    pub fn walk(&self, token: Token, count: usize) -> Vec<TargetIndex> {
        let wanted = count.min(self.names.len());
        let mut found = Vec::with_capacity(wanted);
        if wanted == 0 || self.points.is_empty() {
            return found;
        }

        let start = self.successor(token);
        let mut seen = HashSet::with_capacity(wanted);
        let (before, after) = self.points.split_at(start);
        for point in after.iter().chain(before) {
            if seen.insert(point.target) {
                found.push(point.target);
                if found.len() == wanted {
                    break;
                }
            }
        }
        found
    }

    /// Width of the key range owned by each target, in token units.
    ///
    /// A key belongs to the first point at or after its token, so each point
    /// owns the arc from its predecessor (exclusive) up to itself. Widths of
    /// all targets add up to 2^64.
    pub fn ownership(&self) -> Vec<(TargetIndex, u128)> {
        let mut owned: Vec<(TargetIndex, u128)> =
            self.names.iter().map(|(index, _)| (*index, 0)).collect();
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return owned;
        };

        let mut credit = |target: TargetIndex, width: u128| {
            if let Ok(pos) = owned.binary_search_by_key(&target, |(i, _)| *i) {
                owned[pos].1 += width;
            }
        };

        // The first point also owns the wrap-around arc past the last one.
        let span = u128::from(first.token.distance_to(last.token));
        credit(first.target, (1u128 << 64) - span);
        for pair in self.points.windows(2) {
            credit(pair[1].target, u128::from(pair[0].token.distance_to(pair[1].token)));
        }
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Xxh3Partitioner;

    fn table(entries: &[(&str, u32)]) -> TargetTable {
        let mut table = TargetTable::new();
        for (name, weight) in entries {
            table.insert(name, *weight, 1024).unwrap();
        }
        table
    }

    fn manual(points: Vec<Point>, names: &[(u32, &str)]) -> Continuum {
        Continuum {
            points,
            names: names
                .iter()
                .map(|(i, n)| (TargetIndex(*i), Arc::from(*n)))
                .collect(),
        }
    }

    #[test]
    fn test_build_point_counts_follow_weight() {
        let continuum = Continuum::build(&table(&[("a", 1), ("b", 3)]), &Xxh3Partitioner, 8);
        assert_eq!(continuum.len(), 32);
        assert_eq!(continuum.target_count(), 2);
        let b_points = continuum
            .points()
            .iter()
            .filter(|p| p.target == TargetIndex(1))
            .count();
        assert_eq!(b_points, 24);
    }

    #[test]
    fn test_build_is_sorted() {
        let continuum = Continuum::build(&table(&[("a", 2), ("b", 1), ("c", 1)]), &Xxh3Partitioner, 16);
        assert!(continuum.points().windows(2).all(|w| w[0].token <= w[1].token));
        assert!(continuum.points().windows(2).all(|w| w[0] != w[1]));
    }

    /// Puts every label on the same token.
    struct Collide;

    impl Partitioner for Collide {
        fn partition(&self, _key: &[u8]) -> Token {
            Token(7)
        }

        fn kind(&self) -> crate::partitioner::PartitionerKind {
            crate::partitioner::PartitionerKind::Xxh3
        }

        fn name(&self) -> &'static str {
            "Collide"
        }
    }

    #[test]
    fn test_shared_token_goes_to_first_name() {
        // "b" gets index 0, "a" index 1.
        let continuum = Continuum::build(&table(&[("b", 1), ("a", 1)]), &Collide, 1);
        assert_eq!(continuum.len(), 2);
        assert_eq!(continuum.walk(Token(0), 1), vec![TargetIndex(1)]);
        assert_eq!(continuum.walk(Token(0), 2), vec![TargetIndex(1), TargetIndex(0)]);

        let reordered = Continuum::build(&table(&[("a", 1), ("b", 1)]), &Collide, 1);
        let first = reordered.walk(Token(0), 1)[0];
        assert_eq!(reordered.name(first).map(|n| &**n), Some("a"));
    }

    #[test]
    fn test_successor_and_wrap() {
        let c = manual(
            vec![
                Point::new(Token(10), TargetIndex(0)),
                Point::new(Token(20), TargetIndex(1)),
                Point::new(Token(30), TargetIndex(2)),
            ],
            &[(0, "a"), (1, "b"), (2, "c")],
        );
        assert_eq!(c.successor(Token(0)), 0);
        assert_eq!(c.successor(Token(10)), 0);
        assert_eq!(c.successor(Token(11)), 1);
        assert_eq!(c.successor(Token(30)), 2);
        assert_eq!(c.successor(Token(31)), 0);
    }

    #[test]
    fn test_walk_collects_distinct_in_ring_order() {
        let c = manual(
            vec![
                Point::new(Token(10), TargetIndex(0)),
                Point::new(Token(20), TargetIndex(0)),
                Point::new(Token(30), TargetIndex(1)),
                Point::new(Token(40), TargetIndex(0)),
                Point::new(Token(50), TargetIndex(2)),
            ],
            &[(0, "a"), (1, "b"), (2, "c")],
        );
        assert_eq!(c.walk(Token(15), 2), vec![TargetIndex(0), TargetIndex(1)]);
        assert_eq!(
            c.walk(Token(45), 3),
            vec![TargetIndex(2), TargetIndex(0), TargetIndex(1)]
        );
        // Asking for more than exists returns every target once.
        assert_eq!(c.walk(Token(35), 10).len(), 3);
        assert!(c.walk(Token(35), 0).is_empty());
    }

    #[test]
    fn test_walk_follows_stored_order_at_shared_token() {
        let c = manual(
            vec![
                Point::new(Token(10), TargetIndex(3)),
                Point::new(Token(10), TargetIndex(7)),
            ],
            &[(3, "low"), (7, "high")],
        );
        assert_eq!(c.walk(Token(5), 1), vec![TargetIndex(3)]);
    }

    #[test]
    fn test_ownership_sums_to_full_ring() {
        let continuum = Continuum::build(&table(&[("a", 1), ("b", 2), ("c", 1)]), &Xxh3Partitioner, 32);
        let total: u128 = continuum.ownership().iter().map(|(_, w)| *w).sum();
        assert_eq!(total, 1u128 << 64);
    }

    #[test]
    fn test_ownership_single_point_owns_everything() {
        let c = manual(vec![Point::new(Token(77), TargetIndex(0))], &[(0, "a")]);
        assert_eq!(c.ownership(), vec![(TargetIndex(0), 1u128 << 64)]);
    }

    #[test]
    fn test_ownership_arcs() {
        let c = manual(
            vec![
                Point::new(Token(100), TargetIndex(0)),
                Point::new(Token(300), TargetIndex(1)),
            ],
            &[(0, "a"), (1, "b")],
        );
        let owned = c.ownership();
        assert_eq!(owned[1], (TargetIndex(1), 200));
        assert_eq!(owned[0], (TargetIndex(0), (1u128 << 64) - 200));
    }
}
