//! Ring coordinates.
//!
//! A [`Token`] is a position on the 64-bit ring. Keys and target points are
//! both mapped to tokens by a [`Partitioner`](crate::partitioner::Partitioner);
//! the ring is read clockwise, wrapping from `u64::MAX` back to `0`.

use std::fmt;

/// Position on the hash ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Token(pub u64);

impl Token {
    /// Start of the ring.
    pub const MIN: Token = Token(0);
    /// End of the ring.
    pub const MAX: Token = Token(u64::MAX);

    /// Clockwise distance from `self` to `other`.
    ///
    /// The result wraps, so the distance from a token to a smaller one goes
    /// through the end of the ring. The distance from a token to itself is
    /// zero.
    #[inline]
    pub fn distance_to(self, other: Token) -> u64 {
        other.0.wrapping_sub(self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_forward() {
        assert_eq!(Token(100).distance_to(Token(200)), 100);
    }

    #[test]
    fn test_distance_wraps() {
        // 10 steps to the end, one to wrap onto 0, then 5 more.
        assert_eq!(Token(u64::MAX - 9).distance_to(Token(5)), 16);
        assert_eq!(Token::MAX.distance_to(Token::MIN), 1);
    }

    #[test]
    fn test_distance_to_self() {
        assert_eq!(Token(42).distance_to(Token(42)), 0);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Token(255).to_string(), "00000000000000ff");
    }
}
