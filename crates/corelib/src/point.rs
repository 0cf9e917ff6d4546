//! Ring points.
//!
//! # Points
//!
//! Each target owns many points on the ring instead of a single one. A
//! target of weight `w` gets `k * w` points, where `k` is the ring-wide
//! points-per-weight constant. This gives:
//!
//! 1. **Weighted shares**: a target's slice of the key space is proportional
//!    to its weight
//! 2. **Small churn**: adding or removing a target moves roughly
//!    `1 / targets` of the keys
//! 3. **Smooth spread**: the keys a removed target owned are redistributed
//!    across all survivors rather than dumped on one neighbour
//!
//! # Performance Characteristics
//!
//! - **Memory**: 16 bytes per point (`u64` token, `u32` index, padding)
//! - **Lookup**: O(log P) where P = total points
//! - **Rebuild**: O(P log P)

use crate::target::TargetIndex;
use crate::token::Token;
use std::io::Write;

/// A single placement of a target on the ring.
///
/// Ordered by token, then by target index. A continuum orders points that
/// share a token by target name instead; see
/// [`Continuum::build`](crate::ring::Continuum::build).
///
/// # Invariants
///
/// - A continuum never holds two equal points
/// - `target` always refers to a target present in the table the continuum
///   was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    /// Position on the ring.
    pub token: Token,
    /// Target owning this point.
    pub target: TargetIndex,
}

impl Point {
    #[inline]
    pub fn new(token: Token, target: TargetIndex) -> Self {
        Self { token, target }
    }
}

/// Writes the hash label of point `ordinal` of `name` into `buf`,
/// replacing its contents.
///
/// The label is `name ++ ":" ++ decimal(ordinal)`. Decimal digits never
/// contain `:`, so distinct `(name, ordinal)` pairs give distinct labels.
pub(crate) fn write_label(buf: &mut Vec<u8>, name: &str, ordinal: u64) {
    buf.clear();
    buf.extend_from_slice(name.as_bytes());
    buf.push(b':');
    // Writing into a Vec cannot fail.
    let _ = write!(buf, "{ordinal}");
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point(token={}, target={})", self.token, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_format() {
        let mut buf = Vec::new();
        write_label(&mut buf, "cache-1", 42);
        assert_eq!(buf, b"cache-1:42");
        write_label(&mut buf, "a\0b", 0);
        assert_eq!(buf, b"a\0b:0");
    }

    #[test]
    fn test_ordering_breaks_ties_by_index() {
        let a = Point::new(Token(100), TargetIndex(2));
        let b = Point::new(Token(100), TargetIndex(1));
        let c = Point::new(Token(50), TargetIndex(9));
        let mut points = vec![a, b, c];
        points.sort();
        assert_eq!(points, vec![c, b, a]);
    }
}
