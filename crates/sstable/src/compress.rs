//! Block compression for the data file and the CompressionInfo component.
//!
//! The data stream is cut into fixed-size uncompressed chunks; each chunk is
//! compressed independently and appended to the file, and the byte offset of
//! every compressed chunk is collected into the compression metadata. Index
//! records and row sizes keep referring to *uncompressed* positions, so the
//! metadata's offsets array is the only way to translate a logical position
//! into a file position.

use std::fs::File;
use std::io::{self, Read, Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;

use crate::codec::{self, Decode, Encode};
use crate::error::{Error, Result};
use crate::reader::{RandomAccessReader, DATA_BUFFER_SIZE};
use crate::writer::{FileWriter, SequentialWriter};

/// Default uncompressed chunk length (64 KiB).
pub const DEFAULT_CHUNK_LENGTH: u32 = 64 * 1024;

/// Block compressor selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    None,
    Snappy,
}

impl Compressor {
    /// Name stored in the CompressionInfo component.
    pub fn name(self) -> &'static str {
        match self {
            Compressor::None => "",
            Compressor::Snappy => "SnappyCompressor",
        }
    }

    /// Reverse-maps an on-disk compressor name.
    pub fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"" => Ok(Compressor::None),
            b"SnappyCompressor" => Ok(Compressor::Snappy),
            other => Err(Error::BadEnumValue {
                what: "compressor",
                value: String::from_utf8_lossy(other).into_owned(),
            }),
        }
    }
}

/// Compression settings supplied by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    pub compressor: Compressor,
    pub chunk_length: u32,
}

impl CompressionParams {
    /// No compression; the data file gets a CRC component instead.
    pub fn none() -> Self {
        Self {
            compressor: Compressor::None,
            chunk_length: DEFAULT_CHUNK_LENGTH,
        }
    }

    pub fn snappy(chunk_length: u32) -> Self {
        Self {
            compressor: Compressor::Snappy,
            chunk_length,
        }
    }
}

/// The CompressionInfo component, plus the runtime state the writer and
/// reader need (rolling checksum, compressed file length).
#[derive(Debug, Clone, Default)]
pub struct Compression {
    /// Compressor name, e.g. `SnappyCompressor`.
    pub name: Vec<u8>,
    /// Free-form options, e.g. `crc_check_chance`.
    pub options: Vec<(Vec<u8>, Vec<u8>)>,
    /// Uncompressed chunk length.
    pub chunk_len: u32,
    /// Total uncompressed data length.
    pub data_len: u64,
    /// File offset of each compressed chunk, in order.
    pub offsets: Vec<u64>,

    // Not serialized: sealed by the writer, refreshed on load.
    full_checksum: u32,
    compressed_file_length: u64,
}

impl Compression {
    /// Fresh metadata for a flush with the given schema parameters.
    pub fn prepare(params: &CompressionParams) -> Self {
        Self {
            name: params.compressor.name().as_bytes().to_vec(),
            // Probability of verifying a compressed chunk's checksum on read.
            options: vec![(b"crc_check_chance".to_vec(), b"1.0".to_vec())],
            chunk_len: params.chunk_length,
            data_len: 0,
            offsets: Vec::new(),
            full_checksum: 0,
            compressed_file_length: 0,
        }
    }

    pub fn compressor(&self) -> Result<Compressor> {
        Compressor::from_name(&self.name)
    }

    /// Records the on-disk size of the data file. Called once the size is
    /// known: at writer close, and again after `load` opens the data file.
    pub fn update(&mut self, compressed_file_length: u64) {
        self.compressed_file_length = compressed_file_length;
    }

    /// Rolling CRC-32 over the compressed chunks, as sealed by the writer.
    pub fn full_checksum(&self) -> u32 {
        self.full_checksum
    }

    pub fn compressed_file_length(&self) -> u64 {
        self.compressed_file_length
    }

    pub fn uncompressed_file_length(&self) -> u64 {
        self.data_len
    }

    /// Byte span `[start, end)` of compressed chunk `idx` within the file.
    fn chunk_span(&self, idx: usize) -> (u64, u64) {
        let start = self.offsets[idx];
        let end = self
            .offsets
            .get(idx + 1)
            .copied()
            .unwrap_or(self.compressed_file_length);
        (start, end)
    }
}

impl Encode for Compression {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        codec::put_str16(out, &self.name)?;
        out.write_u32::<BigEndian>(codec::truncate32(self.options.len())?)?;
        for (key, value) in &self.options {
            codec::put_str16(out, key)?;
            codec::put_str16(out, value)?;
        }
        out.write_u32::<BigEndian>(self.chunk_len)?;
        out.write_u64::<BigEndian>(self.data_len)?;
        out.write_u32::<BigEndian>(codec::truncate32(self.offsets.len())?)?;
        codec::put_packed_u64(out, &self.offsets)?;
        Ok(())
    }
}

impl Decode for Compression {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let name = codec::get_str16(src)?;
        let option_count = codec::get_u32(src)? as usize;
        let mut options = Vec::with_capacity(option_count);
        for _ in 0..option_count {
            let key = codec::get_str16(src)?;
            let value = codec::get_str16(src)?;
            options.push((key, value));
        }
        let chunk_len = codec::get_u32(src)?;
        let data_len = codec::get_u64(src)?;
        let offset_count = codec::get_u32(src)? as usize;
        let offsets = codec::get_packed_u64(src, offset_count)?;
        Ok(Self {
            name,
            options,
            chunk_len,
            data_len,
            offsets,
            full_checksum: 0,
            compressed_file_length: 0,
        })
    }
}

/// A sequential writer that cuts the stream into `chunk_len` uncompressed
/// chunks, compresses each, and appends the result to the file.
///
/// `offset()` reports the *uncompressed* position. Per-chunk CRCs are not
/// kept; the rolling checksum over the compressed chunks stands in for the
/// CRC component and feeds the digest.
pub struct CompressedWriter {
    inner: FileWriter,
    compression: Compression,
    staged: Vec<u8>,
    encoder: snap::raw::Encoder,
    full_hasher: Crc32,
}

impl CompressedWriter {
    pub fn new(file: File, compression: Compression) -> Self {
        let chunk_len = compression.chunk_len as usize;
        Self {
            inner: FileWriter::new(file, DATA_BUFFER_SIZE),
            compression,
            staged: Vec::with_capacity(chunk_len),
            encoder: snap::raw::Encoder::new(),
            full_hasher: Crc32::new(),
        }
    }

    fn flush_chunk(&mut self) -> io::Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let compressed = self
            .encoder
            .compress_vec(&self.staged)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.compression.offsets.push(self.inner.offset());
        self.full_hasher.update(&compressed);
        self.inner.write_all(&compressed)?;
        self.staged.clear();
        Ok(())
    }

    /// Compresses the trailing partial chunk, closes the file, and hands back
    /// the sealed compression metadata.
    pub fn close(mut self) -> Result<Compression> {
        self.flush_chunk()?;
        let compressed_len = self.inner.offset();
        self.inner.close()?;
        let mut compression = self.compression;
        compression.full_checksum = self.full_hasher.finalize();
        compression.update(compressed_len);
        Ok(compression)
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk_len = self.compression.chunk_len as usize;
        let mut rest = buf;
        while !rest.is_empty() {
            let take = (chunk_len - self.staged.len()).min(rest.len());
            self.staged.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.staged.len() == chunk_len {
                self.flush_chunk()?;
            }
        }
        self.compression.data_len += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.inner)
    }
}

impl SequentialWriter for CompressedWriter {
    fn offset(&self) -> u64 {
        self.compression.data_len
    }

    fn compression_lengths(&self) -> Option<(u64, u64)> {
        Some((self.inner.offset(), self.compression.data_len))
    }
}

/// Reads `len` bytes of *uncompressed* data starting at logical position
/// `pos`, decompressing as many chunks as the range spans.
///
/// Short reads past the end of the data simply return fewer bytes, mirroring
/// the plain read path.
pub fn compressed_read(
    file: &File,
    compression: &Compression,
    pos: u64,
    len: usize,
) -> Result<Vec<u8>> {
    let chunk_len = compression.chunk_len as u64;
    let mut decoder = snap::raw::Decoder::new();
    let mut out = Vec::with_capacity(len);
    let mut pos = pos;
    let mut remaining = len;

    while remaining > 0 && pos < compression.data_len {
        let chunk_idx = (pos / chunk_len) as usize;
        if chunk_idx >= compression.offsets.len() {
            break;
        }
        let (start, end) = compression.chunk_span(chunk_idx);
        let mut stream = RandomAccessReader::new(file.try_clone()?, DATA_BUFFER_SIZE)?;
        stream.seek(start)?;
        let compressed = codec::get_bytes(&mut stream, (end - start) as usize)?;
        let plain = decoder
            .decompress_vec(&compressed)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let skip = (pos % chunk_len) as usize;
        if skip >= plain.len() {
            break;
        }
        let take = remaining.min(plain.len() - skip);
        out.extend_from_slice(&plain[skip..skip + take]);
        pos += take as u64;
        remaining -= take;
    }
    Ok(out)
}
