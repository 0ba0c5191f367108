//! Parse/serialize primitives shared by every component codec.
//!
//! All integers, enums, booleans and doubles are big-endian on disk; the one
//! sanctioned exception (the summary's native-order positions and entry
//! tails) lives in `summary.rs`. Length-prefixed byte strings check that the
//! payload length fits the fixed-width prefix before writing anything.
//!
//! Each typed record spells out its field order once in an `encode` and a
//! matching `decode`; there is no reflection or macro-driven dispatch, so the
//! wire layout of every component can be read off its codec directly.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::{Error, Result};
use crate::reader::RandomAccessReader;

/// A record that serializes itself into a byte sink.
pub trait Encode {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()>;
}

/// A record that parses itself from a random-access source.
pub trait Decode: Sized {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self>;
}

/// Fails with `BufferUndersize` unless `buf` holds at least `expected` bytes.
///
/// Companion to `read_exactly`: anything shorter than what was asked for is
/// either end-of-stream or corruption, and the caller decides which.
pub fn check_buf_size(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(Error::BufferUndersize {
            got: buf.len(),
            expected,
        });
    }
    Ok(())
}

/// Narrows a length to a `u16` size prefix, failing with `Overflow`.
pub fn truncate16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::Overflow {
        value: len as u64,
        width: 16,
    })
}

/// Narrows a length to a `u32` size prefix, failing with `Overflow`.
pub fn truncate32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Overflow {
        value: len as u64,
        width: 32,
    })
}

// ---- read side ----

pub fn get_u8<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<u8> {
    let buf = src.read_exactly(1)?;
    check_buf_size(&buf, 1)?;
    Ok(buf[0])
}

pub fn get_u16<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<u16> {
    let buf = src.read_exactly(2)?;
    check_buf_size(&buf, 2)?;
    Ok(BigEndian::read_u16(&buf))
}

pub fn get_u32<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<u32> {
    let buf = src.read_exactly(4)?;
    check_buf_size(&buf, 4)?;
    Ok(BigEndian::read_u32(&buf))
}

pub fn get_u64<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<u64> {
    let buf = src.read_exactly(8)?;
    check_buf_size(&buf, 8)?;
    Ok(BigEndian::read_u64(&buf))
}

pub fn get_i16<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<i16> {
    Ok(get_u16(src)? as i16)
}

pub fn get_i32<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<i32> {
    Ok(get_u32(src)? as i32)
}

pub fn get_i64<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<i64> {
    Ok(get_u64(src)? as i64)
}

/// Doubles travel as the big-endian image of their IEEE-754 bit pattern.
pub fn get_f64<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<f64> {
    Ok(f64::from_bits(get_u64(src)?))
}

pub fn get_bool<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<bool> {
    Ok(get_u8(src)? != 0)
}

/// Reads exactly `n` raw bytes, failing with `BufferUndersize` when short.
pub fn get_bytes<R: Read + Seek>(src: &mut RandomAccessReader<R>, n: usize) -> Result<Vec<u8>> {
    let buf = src.read_exactly(n)?;
    check_buf_size(&buf, n)?;
    Ok(buf)
}

/// Reads a `u16`-prefixed byte string.
pub fn get_str16<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Vec<u8>> {
    let len = get_u16(src)? as usize;
    get_bytes(src, len)
}

/// Reads a `u32`-prefixed byte string.
pub fn get_str32<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Vec<u8>> {
    let len = get_u32(src)? as usize;
    get_bytes(src, len)
}

/// Reads `count` big-endian `u32`s stored as one contiguous block.
pub fn get_packed_u32<R: Read + Seek>(
    src: &mut RandomAccessReader<R>,
    count: usize,
) -> Result<Vec<u32>> {
    let buf = get_bytes(src, count * 4)?;
    Ok(buf.chunks_exact(4).map(BigEndian::read_u32).collect())
}

/// Reads `count` big-endian `u64`s stored as one contiguous block.
pub fn get_packed_u64<R: Read + Seek>(
    src: &mut RandomAccessReader<R>,
    count: usize,
) -> Result<Vec<u64>> {
    let buf = get_bytes(src, count * 8)?;
    Ok(buf.chunks_exact(8).map(BigEndian::read_u64).collect())
}

// ---- write side ----

pub fn put_bool<W: Write>(out: &mut W, v: bool) -> Result<()> {
    out.write_u8(v as u8)?;
    Ok(())
}

pub fn put_f64<W: Write>(out: &mut W, v: f64) -> Result<()> {
    out.write_u64::<BigEndian>(v.to_bits())?;
    Ok(())
}

/// Writes a `u16`-prefixed byte string, checking the length fits.
pub fn put_str16<W: Write>(out: &mut W, v: &[u8]) -> Result<()> {
    out.write_u16::<BigEndian>(truncate16(v.len())?)?;
    out.write_all(v)?;
    Ok(())
}

/// Writes a `u32`-prefixed byte string, checking the length fits.
pub fn put_str32<W: Write>(out: &mut W, v: &[u8]) -> Result<()> {
    out.write_u32::<BigEndian>(truncate32(v.len())?)?;
    out.write_all(v)?;
    Ok(())
}

/// Writes a slice of `u32`s as one contiguous big-endian block (no prefix).
pub fn put_packed_u32<W: Write>(out: &mut W, vs: &[u32]) -> Result<()> {
    for v in vs {
        out.write_u32::<BigEndian>(*v)?;
    }
    Ok(())
}

/// Writes a slice of `u64`s as one contiguous big-endian block (no prefix).
pub fn put_packed_u64<W: Write>(out: &mut W, vs: &[u64]) -> Result<()> {
    for v in vs {
        out.write_u64::<BigEndian>(*v)?;
    }
    Ok(())
}
