//! # SSTable - Sorted String Table
//!
//! The on-disk table engine of the Atoll wide-column store: an immutable,
//! sorted, partitioned table stored as a set of sibling component files in
//! one directory. Tables are *write-once, read-many* -- a flush serializes a
//! mutation stream into a fresh component set, and a load discovers and
//! parses that set for random reads.
//!
//! ## Component files
//!
//! Every file is named `{version}-{generation}-{format}-{suffix}`:
//!
//! ```text
//! ┌──────────────────────┬────────────────────────────────────────────────┐
//! │ Data.db              │ partitions in partitioner order: key, deletion │
//! │                      │ time, static row, range tombstones, clustered  │
//! │                      │ rows and cells, 16-bit end-of-row marker       │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ Index.db             │ per partition: key, data offset, promoted-     │
//! │                      │ index size (always 0)                          │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ Summary.db           │ every 128th key + index offset, for seeking    │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ Filter.db            │ bloom filter over the partition keys           │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ Statistics.db        │ kind→offset hash, then validation, compaction  │
//! │                      │ and stats metadata records                     │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ CRC.db               │ per-chunk CRC-32 of Data.db (uncompressed)     │
//! │ CompressionInfo.db   │ chunk offsets + lengths (compressed)           │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ Digest.sha1          │ full Data.db checksum, decimal ASCII           │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ TOC.txt              │ one component suffix per line, written last    │
//! └──────────────────────┴────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one of CRC.db / CompressionInfo.db exists in a sealed table. The
//! TOC is written after everything else, so a reader that finds a TOC is
//! guaranteed to find every component it lists.
//!
//! All on-disk integers are big-endian, with one legacy exception: the
//! summary's positions block and entry tails are native byte order (see
//! [`summary`]).
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                               |
//! |--------------|-------------------------------------------------------|
//! | [`codec`]    | parse/serialize primitives, `Encode`/`Decode` traits  |
//! | [`reader`]   | buffered re-seekable random-access reader             |
//! | [`writer`]   | buffered sequential writer with offset tracking       |
//! | [`checksum`] | per-chunk CRCs, digest and CRC component writers      |
//! | [`compress`] | snappy chunk pipeline + CompressionInfo component     |
//! | [`summary`]  | summary sampling, sealing and codec                   |
//! | [`metadata`] | statistics records, histograms, flush collector       |
//! | [`index`]    | index records                                         |
//! | [`mutation`] | the in-memory partition/row/cell model                |
//! | [`schema`]   | column definitions and flush parameters               |
//! | [`composite`]| composite column names and range bounds               |
//! | `sstable`    | the [`SsTable`] handle: load, flush, seal, queries    |

pub mod checksum;
pub mod codec;
pub mod composite;
pub mod compress;
pub mod error;
pub mod index;
pub mod metadata;
pub mod mutation;
pub mod reader;
pub mod schema;
pub mod summary;
pub mod writer;

mod sstable;

pub use crate::error::{Error, Result};
pub use crate::sstable::{ComponentType, Format, SsTable, Version};

#[cfg(test)]
mod tests;
