//! Index file records: one per partition, pointing at its data-file offset.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{self, Decode};
use crate::error::Result;
use crate::reader::RandomAccessReader;

/// A single index record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Partition key bytes.
    pub key: Vec<u8>,
    /// Data-file offset of the partition.
    pub position: u64,
    /// Promoted per-partition index payload. Never emitted by this engine
    /// (size 0), but parsed so foreign files round-trip.
    pub promoted_index: Vec<u8>,
}

impl Decode for IndexEntry {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let key = codec::get_str16(src)?;
        let position = codec::get_u64(src)?;
        let promoted_index = codec::get_str32(src)?;
        Ok(Self {
            key,
            position,
            promoted_index,
        })
    }
}

/// Appends an index record for `key` at data offset `position`.
pub fn write_index_entry<W: Write>(out: &mut W, key: &[u8], position: u64) -> Result<()> {
    codec::put_str16(out, key)?;
    out.write_u64::<BigEndian>(position)?;
    // Promoted indexes are not supported; the size is always zero.
    out.write_u32::<BigEndian>(0)?;
    Ok(())
}
