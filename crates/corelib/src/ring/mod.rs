//! Consistent hash ring implementation.
//!
//! The ring keeps a sorted continuum of points derived from the target
//! table and answers lookups by binary search plus a clockwise walk.

pub mod balance;
pub mod builder;
pub mod continuum;
pub mod ring;

pub use balance::{LoadStats, LoadTracker};
pub use builder::RingBuilder;
pub use continuum::Continuum;
pub use ring::HashRing;

/// Shorter name for [`HashRing`].
pub type Ring = HashRing;
