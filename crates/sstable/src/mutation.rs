//! The in-memory mutation model the flush path consumes.
//!
//! A mutation source is any `Iterator<Item = Partition>` yielding partitions
//! in partitioner order, each with its clustered rows in clustering order and
//! each row's cells in column-id order.

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{self, Decode, Encode};
use crate::error::Result;
use crate::reader::RandomAccessReader;
use crate::schema::ColumnId;

/// A deletion marker: when it was written and when it takes local effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    /// Write timestamp (`marked_for_delete_at`).
    pub timestamp: i64,
    /// Local deletion time, seconds since the epoch.
    pub deletion_time: i32,
}

/// The partition-level deletion record as stored in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTime {
    pub local_deletion_time: i32,
    pub marked_for_delete_at: i64,
}

impl DeletionTime {
    /// The sentinel written for live, undeleted partitions.
    pub const LIVE: DeletionTime = DeletionTime {
        local_deletion_time: i32::MAX,
        marked_for_delete_at: i64::MIN,
    };

    pub fn is_live(&self) -> bool {
        *self == Self::LIVE
    }
}

impl From<Tombstone> for DeletionTime {
    fn from(t: Tombstone) -> Self {
        Self {
            local_deletion_time: t.deletion_time,
            marked_for_delete_at: t.timestamp,
        }
    }
}

impl Encode for DeletionTime {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_i32::<BigEndian>(self.local_deletion_time)?;
        out.write_i64::<BigEndian>(self.marked_for_delete_at)?;
        Ok(())
    }
}

impl Decode for DeletionTime {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let local_deletion_time = codec::get_i32(src)?;
        let marked_for_delete_at = codec::get_i64(src)?;
        Ok(Self {
            local_deletion_time,
            marked_for_delete_at,
        })
    }
}

/// An atomic cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// A live value.
    Live { timestamp: i64, value: Vec<u8> },
    /// A live value with a time-to-live.
    Expiring {
        timestamp: i64,
        /// TTL in seconds.
        ttl: u32,
        /// Absolute expiry, seconds since the epoch.
        expiry: i32,
        value: Vec<u8>,
    },
    /// A deleted cell (tombstone).
    Dead { timestamp: i64, deletion_time: i32 },
    /// A counter shard. Reserved by the format; flushing one fails with
    /// `NotImplemented`.
    Counter { timestamp: i64, value: Vec<u8> },
}

impl Cell {
    pub fn timestamp(&self) -> i64 {
        match self {
            Cell::Live { timestamp, .. }
            | Cell::Expiring { timestamp, .. }
            | Cell::Dead { timestamp, .. }
            | Cell::Counter { timestamp, .. } => *timestamp,
        }
    }
}

/// A mutation of a collection column: an optional tombstone covering the
/// whole collection, then the surviving element cells keyed by element key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionMutation {
    pub tombstone: Option<Tombstone>,
    pub cells: Vec<(Vec<u8>, Cell)>,
}

/// The value stored under one column id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Atomic(Cell),
    Collection(CollectionMutation),
}

/// A clustered row: cells sharing one clustering key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusteredRow {
    /// Exploded clustering key components.
    pub clustering_key: Vec<Vec<u8>>,
    /// Row-marker timestamp; absent means no row marker is written.
    pub created_at: Option<i64>,
    /// Row-level deletion. Reserved by the format; flushing one fails with
    /// `NotImplemented`.
    pub deletion: Option<Tombstone>,
    /// Cells by column id, iterated in id order.
    pub cells: BTreeMap<ColumnId, ColumnValue>,
}

/// A range tombstone over a clustering prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTombstone {
    /// Exploded clustering-prefix components.
    pub prefix: Vec<Vec<u8>>,
    pub tombstone: Tombstone,
}

/// One partition of a mutation stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    /// Partition key bytes.
    pub key: Vec<u8>,
    /// Partition-level tombstone, if the whole partition was deleted.
    pub tombstone: Option<Tombstone>,
    /// Static cells by column id.
    pub static_row: BTreeMap<ColumnId, ColumnValue>,
    /// Prefix-level range tombstones.
    pub range_tombstones: Vec<RangeTombstone>,
    /// Clustered rows in clustering order.
    pub rows: Vec<ClusteredRow>,
}

impl Partition {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}
