use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the sstable engine.
///
/// Malformed-table conditions each carry a human-readable explanation of what
/// the parser saw; `Io` wraps underlying filesystem failures untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// A component file the TOC promises is missing on disk.
    #[error("{}: file not found", .path.display())]
    NotFound {
        /// Path of the missing component file.
        path: PathBuf,
    },

    /// The TOC file fills a whole page, which no valid TOC does.
    #[error("TOC too big: {size} bytes")]
    Oversize {
        /// Observed file size.
        size: u64,
    },

    /// The TOC parsed to zero components.
    #[error("empty TOC")]
    EmptyToc,

    /// A TOC line does not name a known component suffix.
    #[error("unrecognized TOC component: {0}")]
    UnknownComponent(String),

    /// A read returned fewer bytes than the codec asked for.
    #[error("buffer improperly sized to hold requested data: got {got}, expected {expected}")]
    BufferUndersize {
        /// Bytes actually available.
        got: usize,
        /// Bytes the codec needed.
        expected: usize,
    },

    /// The stream ended inside a record.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A statistics record kind that the serializer has no payload for.
    #[error("unknown metadata kind: {0}")]
    UnknownMetadataKind(u32),

    /// An on-disk discriminant that maps to no known enum value.
    #[error("bad {what} value: {value}")]
    BadEnumValue {
        /// Which enum was being decoded.
        what: &'static str,
        /// The offending on-disk value.
        value: String,
    },

    /// A length did not fit the fixed-width size prefix it must be written as.
    #[error("size overflow: {value} does not fit in {width} bits")]
    Overflow {
        /// The value that failed to narrow.
        value: u64,
        /// Width of the target size prefix.
        width: u32,
    },

    /// An underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A construct the on-disk format reserves but this engine does not emit.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
