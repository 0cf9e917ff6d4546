//! SipHash-1-3 partitioner.

use crate::partitioner::traits::{Partitioner, PartitionerKind};
use crate::token::Token;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Partitioner backed by SipHash-1-3 with a zero key.
///
/// Only the raw bytes are fed to the hasher. Going through `Hash for [u8]`
/// would prepend a `usize` length and make tokens depend on pointer width.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sip13Partitioner;

impl Partitioner for Sip13Partitioner {
    #[inline]
    fn partition(&self, key: &[u8]) -> Token {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        Token(hasher.finish())
    }

    fn kind(&self) -> PartitionerKind {
        PartitionerKind::Sip13
    }

    fn name(&self) -> &'static str {
        "Sip13Partitioner"
    }
}
