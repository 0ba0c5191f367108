use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// A sequential byte sink with a queryable append offset.
///
/// The offset counts every byte handed to the writer, independent of what is
/// still sitting in a buffer or (for the compressed variant) how the bytes
/// land on disk. Index records and row-size statistics are derived from it.
pub trait SequentialWriter: Write {
    /// Count of bytes appended so far.
    fn offset(&self) -> u64;

    /// `(compressed, uncompressed)` byte counts when a block compressor is
    /// interposed between the producer and the file; `None` otherwise.
    fn compression_lengths(&self) -> Option<(u64, u64)> {
        None
    }
}

/// Buffered append-only file writer.
///
/// `close` flushes, fsyncs and drops the file handle; a writer that is merely
/// dropped leaves durability to the OS.
pub struct FileWriter {
    out: BufWriter<File>,
    offset: u64,
}

impl FileWriter {
    /// Wraps an already-open file.
    pub fn new(file: File, buffer_size: usize) -> Self {
        Self {
            out: BufWriter::with_capacity(buffer_size, file),
            offset: 0,
        }
    }

    /// Creates (or truncates) `path` for writing.
    pub fn create<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file, buffer_size))
    }

    /// Creates `path`, failing if it already exists.
    ///
    /// Digest and CRC files are written this way: a leftover file from an
    /// earlier generation with the same number is a bug worth surfacing.
    pub fn create_exclusive<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Self::new(file, buffer_size))
    }

    /// Count of bytes appended so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Flushes buffered bytes to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes, fsyncs and closes the underlying file.
    pub fn close(self) -> Result<()> {
        let file = self.out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write_all(buf)?;
        self.offset += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl SequentialWriter for FileWriter {
    fn offset(&self) -> u64 {
        self.offset
    }
}
