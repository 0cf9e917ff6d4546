//! XXH3 partitioner (default).

use crate::partitioner::traits::{Partitioner, PartitionerKind};
use crate::token::Token;
use xxhash_rust::xxh3::xxh3_64;

/// Partitioner backed by 64-bit XXH3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    #[inline]
    fn partition(&self, key: &[u8]) -> Token {
        Token(xxh3_64(key))
    }

    fn kind(&self) -> PartitionerKind {
        PartitionerKind::Xxh3
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}
