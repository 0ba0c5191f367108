//! The Summary component: every 128th partition key, used to land a seek in
//! the right neighborhood of the Index file.
//!
//! NOTE: the `positions` block and each entry's trailing 8-byte position are
//! stored in NATIVE byte order, not big-endian. This matches the established
//! on-disk format and is a portability hazard between machines of different
//! endianness; do not "fix" it without a format version bump.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, NativeEndian, ByteOrder, WriteBytesExt};

use crate::codec::{self, Decode, Encode};
use crate::error::{Error, Result};
use crate::reader::RandomAccessReader;

/// One summary entry per this many partition keys.
pub const BASE_SAMPLING_LEVEL: u32 = 128;

/// Serialized size of [`SummaryHeader`].
pub(crate) const SUMMARY_HEADER_SIZE: u64 = 24;

/// Fixed-size summary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryHeader {
    pub min_index_interval: u32,
    /// Number of entries.
    pub size: u32,
    /// Byte size of the positions-plus-entries block that follows the header.
    pub memory_size: u64,
    pub sampling_level: u32,
    pub size_at_full_sampling: u32,
}

/// A sampled partition key and the index-file offset of its index record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub key: Vec<u8>,
    pub position: u64,
}

/// The Summary component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub header: SummaryHeader,
    /// Cumulative byte offset of each entry within the entry block,
    /// including the leading positions block itself.
    pub positions: Vec<u32>,
    pub entries: Vec<SummaryEntry>,
    pub first_key: Vec<u8>,
    pub last_key: Vec<u8>,
    /// Running count of keys observed during a flush; drives sampling.
    keys_written: u64,
}

impl Summary {
    /// Resets the summary for a flush expected to see roughly
    /// `expected_partition_count` partitions.
    pub fn prepare(&mut self, expected_partition_count: u64) -> Result<()> {
        self.header.min_index_interval = BASE_SAMPLING_LEVEL;
        self.header.sampling_level = BASE_SAMPLING_LEVEL;
        let max_expected_entries = expected_partition_count / BASE_SAMPLING_LEVEL as u64
            + u64::from(expected_partition_count % BASE_SAMPLING_LEVEL as u64 != 0);
        if max_expected_entries > u32::MAX as u64 {
            return Err(Error::Overflow {
                value: max_expected_entries,
                width: 32,
            });
        }
        self.positions = Vec::with_capacity(max_expected_entries as usize);
        self.entries = Vec::with_capacity(max_expected_entries as usize);
        self.keys_written = 0;
        self.header.memory_size = 0;
        Ok(())
    }

    /// Records the key's index-file offset if it falls on a sampling
    /// boundary. Call once per partition, in partition order.
    pub fn maybe_add_entry(&mut self, key: &[u8], index_offset: u64) {
        if self.keys_written % self.header.min_index_interval as u64 == 0 {
            self.entries.push(SummaryEntry {
                key: key.to_vec(),
                position: index_offset,
            });
        }
        self.keys_written += 1;
    }

    /// Finalizes counts, positions and the first/last keys.
    ///
    /// `last_key` being absent means a single partition was written and the
    /// last key equals the first; both absent means an empty table.
    pub fn seal(&mut self, first_key: Option<Vec<u8>>, last_key: Option<Vec<u8>>) -> Result<()> {
        self.header.size = codec::truncate32(self.entries.len())?;
        self.header.size_at_full_sampling = self.header.size;

        self.header.memory_size = self.header.size as u64 * 4;
        self.positions.clear();
        for entry in &self.entries {
            self.positions.push(codec::truncate32(self.header.memory_size as usize)?);
            self.header.memory_size += entry.key.len() as u64 + 8;
        }

        self.first_key = first_key.unwrap_or_default();
        self.last_key = match last_key {
            Some(key) => key,
            None => self.first_key.clone(),
        };
        Ok(())
    }

    /// Bounds-checked access to a summary entry.
    pub fn entry(&self, i: usize) -> Option<&SummaryEntry> {
        self.entries.get(i)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Encode for Summary {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32::<BigEndian>(self.header.min_index_interval)?;
        out.write_u32::<BigEndian>(self.header.size)?;
        out.write_u64::<BigEndian>(self.header.memory_size)?;
        out.write_u32::<BigEndian>(self.header.sampling_level)?;
        out.write_u32::<BigEndian>(self.header.size_at_full_sampling)?;

        // Positions and entry tails are native-order; see the module note.
        for position in &self.positions {
            out.write_u32::<NativeEndian>(*position)?;
        }
        for entry in &self.entries {
            out.write_all(&entry.key)?;
            out.write_u64::<NativeEndian>(entry.position)?;
        }

        codec::put_str16(out, &self.first_key)?;
        codec::put_str16(out, &self.last_key)?;
        Ok(())
    }
}

impl Decode for Summary {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let header = SummaryHeader {
            min_index_interval: codec::get_u32(src)?,
            size: codec::get_u32(src)?,
            memory_size: codec::get_u64(src)?,
            sampling_level: codec::get_u32(src)?,
            size_at_full_sampling: codec::get_u32(src)?,
        };

        let size = header.size as usize;
        let buf = codec::get_bytes(src, size * 4)?;
        let mut positions: Vec<u32> = buf.chunks_exact(4).map(NativeEndian::read_u32).collect();

        // The keys inside the entry block are not sized, so entry i's span is
        // [positions[i], positions[i+1]). Pushing the block's total size as a
        // sentinel makes the last entry's span computable without a special
        // case; it is removed again below.
        positions.push(codec::truncate32(header.memory_size as usize)?);

        src.seek(SUMMARY_HEADER_SIZE + header.memory_size)?;
        let first_key = codec::get_str16(src)?;
        let last_key = codec::get_str16(src)?;

        src.seek(positions[0] as u64 + SUMMARY_HEADER_SIZE)?;
        let mut entries = Vec::with_capacity(size);
        for i in 0..size {
            let entry_size = (positions[i + 1] - positions[i]) as usize;
            if entry_size < 8 {
                return Err(Error::BufferUndersize {
                    got: entry_size,
                    expected: 8,
                });
            }
            let buf = codec::get_bytes(src, entry_size)?;
            let key_size = entry_size - 8;
            entries.push(SummaryEntry {
                key: buf[..key_size].to_vec(),
                position: NativeEndian::read_u64(&buf[key_size..]),
            });
        }
        positions.pop();

        Ok(Self {
            header,
            positions,
            entries,
            first_key,
            last_key,
            keys_written: 0,
        })
    }
}
