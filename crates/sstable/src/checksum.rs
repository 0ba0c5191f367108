//! Per-chunk CRC accounting for uncompressed data files, plus the digest and
//! CRC component writers used at seal time.

use std::io::{self, Read, Seek, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;

use crate::codec::{self, Decode, Encode};
use crate::error::Result;
use crate::reader::{RandomAccessReader, SMALL_BUFFER_SIZE};
use crate::writer::{FileWriter, SequentialWriter};

/// Chunk granularity for the per-chunk CRC array.
pub const CHECKSUM_CHUNK_SIZE: u32 = 32 * 1024;

/// The CRC component: one CRC-32 per fixed-size chunk of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Checksum {
    /// Chunk length the checksums were computed over.
    pub chunk_size: u32,
    /// One CRC-32 per chunk, in file order.
    pub checksums: Vec<u32>,
}

impl Encode for Checksum {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32::<BigEndian>(self.chunk_size)?;
        out.write_u32::<BigEndian>(codec::truncate32(self.checksums.len())?)?;
        codec::put_packed_u32(out, &self.checksums)?;
        Ok(())
    }
}

impl Decode for Checksum {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let chunk_size = codec::get_u32(src)?;
        let len = codec::get_u32(src)? as usize;
        let checksums = codec::get_packed_u32(src, len)?;
        Ok(Self {
            chunk_size,
            checksums,
        })
    }
}

/// A [`FileWriter`] that additionally maintains a CRC-32 per chunk and a
/// rolling CRC-32 over the whole stream.
///
/// Used for the data file when compression is off: the chunk CRCs become the
/// CRC component and the rolling checksum becomes the digest.
pub struct ChecksummedWriter {
    inner: FileWriter,
    checksum: Checksum,
    chunk_hasher: Crc32,
    chunk_filled: u32,
    full_hasher: Crc32,
}

impl ChecksummedWriter {
    pub fn new(inner: FileWriter) -> Self {
        Self {
            inner,
            checksum: Checksum {
                chunk_size: CHECKSUM_CHUNK_SIZE,
                checksums: Vec::new(),
            },
            chunk_hasher: Crc32::new(),
            chunk_filled: 0,
            full_hasher: Crc32::new(),
        }
    }

    /// Seals the trailing partial chunk, closes the file, and hands back the
    /// full-stream checksum and the per-chunk CRC record.
    pub fn close(mut self) -> Result<(u32, Checksum)> {
        if self.chunk_filled > 0 {
            let hasher = std::mem::take(&mut self.chunk_hasher);
            self.checksum.checksums.push(hasher.finalize());
        }
        self.inner.close()?;
        Ok((self.full_hasher.finalize(), self.checksum))
    }
}

impl Write for ChecksummedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        self.full_hasher.update(buf);

        let mut rest = buf;
        while !rest.is_empty() {
            let room = (self.checksum.chunk_size - self.chunk_filled) as usize;
            let take = room.min(rest.len());
            self.chunk_hasher.update(&rest[..take]);
            self.chunk_filled += take as u32;
            if self.chunk_filled == self.checksum.chunk_size {
                let hasher = std::mem::take(&mut self.chunk_hasher);
                self.checksum.checksums.push(hasher.finalize());
                self.chunk_filled = 0;
            }
            rest = &rest[take..];
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.inner)
    }
}

impl SequentialWriter for ChecksummedWriter {
    fn offset(&self) -> u64 {
        self.inner.offset()
    }
}

/// Writes the digest component: the full data-file checksum as decimal ASCII.
pub fn write_digest(path: &Path, full_checksum: u32) -> Result<()> {
    tracing::debug!("writing digest file {}", path.display());
    let mut out = FileWriter::create_exclusive(path, SMALL_BUFFER_SIZE)?;
    out.write_all(full_checksum.to_string().as_bytes())?;
    out.flush()?;
    out.close()
}

/// Writes the CRC component from the sealed per-chunk checksum record.
pub fn write_crc(path: &Path, checksum: &Checksum) -> Result<()> {
    tracing::debug!("writing CRC file {}", path.display());
    let mut out = FileWriter::create_exclusive(path, SMALL_BUFFER_SIZE)?;
    checksum.encode(&mut out)?;
    out.flush()?;
    out.close()
}
