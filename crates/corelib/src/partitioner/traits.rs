//! Core partitioner trait definitions.

use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A partitioner hashes byte strings onto the ring.
///
/// Implementations must be pure and produce the same token for the same
/// bytes on every platform and every release: changing the output reshuffles
/// the entire ring, and serialized rings only record which partitioner was
/// used, not the tokens themselves.
pub trait Partitioner: Send + Sync + 'static {
    /// Maps arbitrary bytes (including empty input and NUL bytes) to a token.
    fn partition(&self, key: &[u8]) -> Token;

    /// Identifies the algorithm in configuration and serialized rings.
    fn kind(&self) -> PartitionerKind;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}

/// Hash algorithms a ring can be built with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionerKind {
    /// XXH3, 64-bit output, seed 0.
    #[default]
    Xxh3,
    /// SipHash-1-3 with an all-zero key.
    Sip13,
}

impl PartitionerKind {
    /// Tag written to the serialized header.
    pub fn id(self) -> u8 {
        match self {
            PartitionerKind::Xxh3 => 1,
            PartitionerKind::Sip13 => 2,
        }
    }

    /// Inverse of [`PartitionerKind::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(PartitionerKind::Xxh3),
            2 => Some(PartitionerKind::Sip13),
            _ => None,
        }
    }

    /// Instantiates the partitioner for this kind.
    pub fn build(self) -> Box<dyn Partitioner> {
        match self {
            PartitionerKind::Xxh3 => Box::new(super::Xxh3Partitioner),
            PartitionerKind::Sip13 => Box::new(super::Sip13Partitioner),
        }
    }
}

impl fmt::Display for PartitionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionerKind::Xxh3 => f.write_str("xxh3"),
            PartitionerKind::Sip13 => f.write_str("sip13"),
        }
    }
}

impl FromStr for PartitionerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xxh3" => Ok(PartitionerKind::Xxh3),
            "sip13" | "siphash" => Ok(PartitionerKind::Sip13),
            other => Err(format!("unknown partitioner '{other}' (expected xxh3 or sip13)")),
        }
    }
}
