//! Consistent hashing ring engine.
//!
//! Maps arbitrary keys onto a weighted, changing set of named targets
//! (cache shards, storage nodes):
//! - Partitioners hashing bytes onto a 64-bit ring
//! - A target table with stable indices
//! - A sorted point continuum with logarithmic lookups
//! - Replica lists and bounded-load balanced picks
//! - A versioned, checksummed binary snapshot format
//!
//! ```rust
//! use chash_core::HashRing;
//!
//! let ring = HashRing::new();
//! ring.set_targets([("cache-a", 1), ("cache-b", 1), ("cache-c", 2)]).unwrap();
//!
//! let replicas = ring.lookup_list("user:42", 2).unwrap();
//! assert_eq!(replicas.len(), 2);
//! assert_ne!(replicas[0], replicas[1]);
//!
//! let restored = HashRing::new();
//! restored.unserialize(&ring.serialize()).unwrap();
//! assert_eq!(restored.lookup_list("user:42", 2).unwrap(), replicas);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod partitioner;
pub mod point;
pub mod ring;
pub mod table;
pub mod target;
pub mod token;

pub use config::{RebuildPolicy, RingConfig};
pub use error::{Error, ErrorKind, Result};
pub use partitioner::{Partitioner, PartitionerKind};
pub use point::Point;
pub use ring::{HashRing, LoadStats, Ring, RingBuilder};
pub use table::TargetTable;
pub use target::{Target, TargetIndex, DEFAULT_WEIGHT};
pub use token::Token;
