use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

/// Buffer size for the small metadata components (TOC, summary, statistics...).
pub const SMALL_BUFFER_SIZE: usize = 4 * 1024;
/// Buffer size for the data and index files.
pub const DATA_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered random-access reader with a single cursor.
///
/// `seek` repositions the cursor (discarding buffered bytes) and
/// `read_exactly` consumes a known quantity from it. A short read is not an
/// error at this level: the returned buffer is truncated and [`eof`] flips to
/// `true`, so callers can distinguish a clean end-of-stream from a record cut
/// off mid-parse.
///
/// [`eof`]: RandomAccessReader::eof
pub struct RandomAccessReader<R: Read + Seek> {
    stream: BufReader<R>,
    eof: bool,
}

impl RandomAccessReader<File> {
    /// Opens `path` read-only and positions the cursor at offset 0.
    pub fn open<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, buffer_size)
    }
}

impl<R: Read + Seek> RandomAccessReader<R> {
    /// Wraps an already-open source, rewinding it to offset 0.
    ///
    /// The reader owns `inner` for its lifetime; to share one underlying file
    /// between cursors, hand each reader a duplicated handle
    /// (`File::try_clone`).
    pub fn new(inner: R, buffer_size: usize) -> Result<Self> {
        let mut stream = BufReader::with_capacity(buffer_size, inner);
        stream.seek(SeekFrom::Start(0))?;
        Ok(Self { stream, eof: false })
    }

    /// Repositions the cursor at `pos`, discarding any buffered bytes.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(pos))?;
        self.eof = false;
        Ok(())
    }

    /// Reads exactly `n` bytes, or as many as remain before end-of-stream.
    ///
    /// A buffer shorter than `n` means the stream ended; `eof()` reports
    /// `true` afterwards.
    pub fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    buf.truncate(filled);
                    break;
                }
                Ok(read) => filled += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(buf)
    }

    /// Whether the last `read_exactly` ran into end-of-stream.
    pub fn eof(&self) -> bool {
        self.eof
    }
}
