//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners convert byte strings (keys and point labels) into tokens
//! that can be placed on the hash ring.

pub mod sip;
pub mod traits;
pub mod xxh3;

pub use sip::Sip13Partitioner;
pub use traits::{Partitioner, PartitionerKind};
pub use xxh3::Xxh3Partitioner;
