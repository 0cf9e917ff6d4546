//! Binary snapshot format.
//!
//! Only the target set and the two layout parameters are stored; points
//! are regenerated on load, so a decoded ring is identical to one freshly
//! built from the same targets.
//!
//! The encoding is canonical: targets are written in name order and
//! numbered by their rank in that order, so the bytes depend only on the
//! `(name, weight)` set and the layout, never on how the ring was built.
//!
//! ```text
//! magic         4  "CHSH"
//! version       u16
//! partitioner   u8   PartitionerKind id
//! flags         u8   reserved, zero
//! k             u32  points per weight
//! target_count  u32
//! target_count times, ascending name:
//!   name_len u16 | name | weight u32 | index u32 (= position)
//! checksum      u64  XXH3-64 of everything above
//! ```
//!
//! All integers are big-endian.

use crate::config::{MAX_POINTS_PER_WEIGHT, MAX_RING_POINTS};
use crate::error::{Error, Result};
use crate::partitioner::PartitionerKind;
use crate::table::TargetTable;
use crate::target::{Target, TargetIndex};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use xxhash_rust::xxh3::xxh3_64;

/// Leading bytes of every snapshot.
pub const MAGIC: [u8; 4] = *b"CHSH";

/// Format version written by this build.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 4;
const CHECKSUM_LEN: usize = 8;
/// name_len + weight + index, excluding the name itself.
const ENTRY_FIXED_LEN: usize = 2 + 4 + 4;

/// Everything a snapshot carries.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub partitioner: PartitionerKind,
    pub points_per_weight: u32,
    /// Indices follow name order, starting at 0.
    pub table: TargetTable,
}

/// Encode a ring layout. Equal target sets give equal bytes.
pub fn encode(table: &TargetTable, partitioner: PartitionerKind, points_per_weight: u32) -> Bytes {
    let ranked = table.by_name_order();
    let names_len: usize = ranked.iter().map(|(_, t)| t.name.len()).sum();
    let mut buf = BytesMut::with_capacity(
        HEADER_LEN + ranked.len() * ENTRY_FIXED_LEN + names_len + CHECKSUM_LEN,
    );

    let count = u32::try_from(ranked.len()).unwrap_or(u32::MAX);
    debug_assert_eq!(count as usize, ranked.len());

    buf.put_slice(&MAGIC);
    buf.put_u16(FORMAT_VERSION);
    buf.put_u8(partitioner.id());
    buf.put_u8(0);
    buf.put_u32(points_per_weight);
    buf.put_u32(count);

    for (rank, target) in ranked {
        let name_len = u16::try_from(target.name.len()).unwrap_or(u16::MAX);
        debug_assert_eq!(usize::from(name_len), target.name.len());
        buf.put_u16(name_len);
        buf.put_slice(target.name.as_bytes());
        buf.put_u32(target.weight);
        buf.put_u32(rank);
    }

    let checksum = xxh3_64(&buf);
    buf.put_u64(checksum);
    buf.freeze()
}

/// Decode and validate a snapshot.
///
/// Weights above `max_weight`, a points-per-weight above
/// [`MAX_POINTS_PER_WEIGHT`] and layouts that would place more than
/// [`MAX_RING_POINTS`] points are rejected like any other corruption.
pub fn decode(input: &[u8], max_weight: u32) -> Result<Snapshot> {
    if input.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(Error::invalid_format(format!(
            "buffer is {} bytes, a snapshot needs at least {}",
            input.len(),
            HEADER_LEN + CHECKSUM_LEN
        )));
    }
    if input[..MAGIC.len()] != MAGIC {
        return Err(Error::invalid_format("bad magic"));
    }

    let (body, mut trailer) = input.split_at(input.len() - CHECKSUM_LEN);
    let mut buf = &body[MAGIC.len()..];

    let version = buf.get_u16();
    if version != FORMAT_VERSION {
        return Err(Error::invalid_format(format!(
            "unsupported version {version}, this build reads version {FORMAT_VERSION}"
        )));
    }

    let expected = trailer.get_u64();
    let actual = xxh3_64(body);
    if expected != actual {
        return Err(Error::invalid_format(format!(
            "checksum mismatch: stored {expected:016x}, computed {actual:016x}"
        )));
    }

    let partitioner_id = buf.get_u8();
    let partitioner = PartitionerKind::from_id(partitioner_id)
        .ok_or_else(|| Error::invalid_format(format!("unknown partitioner id {partitioner_id}")))?;
    let flags = buf.get_u8();
    if flags != 0 {
        return Err(Error::invalid_format(format!("unknown flags {flags:#04x}")));
    }
    let points_per_weight = buf.get_u32();
    if points_per_weight == 0 || points_per_weight > MAX_POINTS_PER_WEIGHT {
        return Err(Error::invalid_format(format!(
            "points per weight {points_per_weight} outside 1..={MAX_POINTS_PER_WEIGHT}"
        )));
    }
    let count = buf.get_u32() as usize;

    // Each entry takes at least ENTRY_FIXED_LEN + 1 bytes; reject absurd
    // counts before allocating for them.
    if count > buf.remaining() / (ENTRY_FIXED_LEN + 1) {
        return Err(Error::invalid_format(format!(
            "target count {count} does not fit in {} remaining bytes",
            buf.remaining()
        )));
    }

    let mut targets: Vec<Target> = Vec::with_capacity(count);
    for position in 0..count {
        ensure(buf, 2, position)?;
        let name_len = buf.get_u16() as usize;
        ensure(buf, name_len + 8, position)?;
        let name = std::str::from_utf8(&buf[..name_len])
            .map_err(|e| Error::invalid_format(format!("target {position}: name is not UTF-8: {e}")))?
            .to_owned();
        buf.advance(name_len);
        let weight = buf.get_u32();
        let index = buf.get_u32();

        if index as usize != position {
            return Err(Error::invalid_format(format!(
                "target {position} ('{name}') carries index {index}"
            )));
        }
        if targets.last().is_some_and(|prev| prev.name >= name) {
            return Err(Error::invalid_format(format!(
                "target '{name}' out of name order"
            )));
        }
        targets.push(Target::new(name, weight, TargetIndex(index)));
    }

    if buf.has_remaining() {
        return Err(Error::invalid_format(format!(
            "{} trailing bytes after target list",
            buf.remaining()
        )));
    }

    let table = TargetTable::from_parts(targets, max_weight)?;
    let points = table.point_count(points_per_weight);
    if points > MAX_RING_POINTS {
        return Err(Error::invalid_format(format!(
            "snapshot places {points} points, limit is {MAX_RING_POINTS}"
        )));
    }
    Ok(Snapshot {
        partitioner,
        points_per_weight,
        table,
    })
}

fn ensure(buf: &[u8], needed: usize, position: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Error::invalid_format(format!(
            "truncated at target {position}: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}
