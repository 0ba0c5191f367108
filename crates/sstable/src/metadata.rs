//! The Statistics component: a type→offset map followed by the metadata
//! records themselves, plus the per-flush collector that accumulates them.
//!
//! The file starts with a hash mapping each metadata kind to the byte offset
//! its record begins at. Offsets are pre-computed before anything is emitted,
//! because the output stream cannot seek backwards; records are then written
//! in ascending-offset order.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{self, Decode, Encode};
use crate::error::{Error, Result};
use crate::reader::RandomAccessReader;

/// Bucket count of the row-size histogram.
const ROW_SIZE_HISTOGRAM_BUCKETS: usize = 150;
/// Bucket count of the column-count histogram.
const COLUMN_COUNT_HISTOGRAM_BUCKETS: usize = 114;
/// Maximum bin count of the tombstone drop-time histogram.
const TOMBSTONE_HISTOGRAM_BIN_COUNT: u32 = 100;

/// Ratio recorded when compression is off.
const NO_COMPRESSION_RATIO: f64 = -1.0;

/// Kinds of metadata record the Statistics file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MetadataType {
    Validation = 0,
    Compaction = 1,
    Stats = 2,
}

impl MetadataType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(MetadataType::Validation),
            1 => Some(MetadataType::Compaction),
            2 => Some(MetadataType::Stats),
            _ => None,
        }
    }
}

/// Number of metadata kinds a sealed Statistics file carries.
const METADATA_TYPE_COUNT: u32 = 3;

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// A histogram with exponentially growing bucket boundaries.
///
/// `buckets` has one more slot than `bucket_offsets`; the extra final bucket
/// counts values beyond the largest boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatedHistogram {
    pub bucket_offsets: Vec<u64>,
    pub buckets: Vec<u64>,
}

impl EstimatedHistogram {
    /// Builds an empty histogram with `bucket_count` buckets. Boundaries grow
    /// by roughly 20% per bucket starting at 1.
    pub fn new(bucket_count: usize) -> Self {
        let mut offsets = Vec::with_capacity(bucket_count.saturating_sub(1));
        let mut last: u64 = 1;
        if bucket_count > 1 {
            offsets.push(last);
            for _ in 2..bucket_count {
                let mut next = ((last as f64) * 1.2).round() as u64;
                if next == last {
                    next += 1;
                }
                offsets.push(next);
                last = next;
            }
        }
        let buckets = vec![0u64; offsets.len() + 1];
        Self {
            bucket_offsets: offsets,
            buckets,
        }
    }

    /// Counts `value` in the first bucket whose boundary is not below it.
    pub fn add(&mut self, value: u64) {
        let idx = self.bucket_offsets.partition_point(|&o| o < value);
        self.buckets[idx] += 1;
    }

    /// Total of all bucket counts.
    pub fn count(&self) -> u64 {
        self.buckets.iter().sum()
    }

    pub(crate) fn encoded_size(&self) -> usize {
        4 + self.buckets.len() * 16
    }
}

impl Encode for EstimatedHistogram {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        let len = codec::truncate32(self.buckets.len())?;
        out.write_u32::<BigEndian>(len)?;
        // Each bucket is preceded by its boundary; the first boundary is
        // written twice (for buckets 0 and 1). The matching decode discards
        // the extra copy, so the pairing round-trips. Established on-disk
        // behavior; keep it.
        for i in 0..self.buckets.len() {
            let offset_idx = if i == 0 { 0 } else { i - 1 };
            let offset = self.bucket_offsets.get(offset_idx).copied().unwrap_or(0);
            out.write_u64::<BigEndian>(offset)?;
            out.write_u64::<BigEndian>(self.buckets[i])?;
        }
        Ok(())
    }
}

impl Decode for EstimatedHistogram {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let len = codec::get_u32(src)? as usize;
        if len == 0 {
            return Err(Error::BadEnumValue {
                what: "estimated histogram length",
                value: "0".to_string(),
            });
        }
        let pairs = codec::get_packed_u64(src, len * 2)?;
        let mut bucket_offsets = vec![0u64; len - 1];
        let mut buckets = vec![0u64; len];
        for i in 0..len {
            let offset_idx = if i == 0 { 0 } else { i - 1 };
            if !bucket_offsets.is_empty() {
                bucket_offsets[offset_idx] = pairs[i * 2];
            }
            buckets[i] = pairs[i * 2 + 1];
        }
        Ok(Self {
            bucket_offsets,
            buckets,
        })
    }
}

/// A bounded streaming histogram over floating-point points.
///
/// When an update would exceed the bin limit, the two closest bins are merged
/// into their weighted midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingHistogram {
    pub max_bin_count: u32,
    /// (point, count) bins, sorted by point.
    pub bins: Vec<(f64, u64)>,
}

impl StreamingHistogram {
    pub fn new(max_bin_count: u32) -> Self {
        Self {
            max_bin_count,
            bins: Vec::new(),
        }
    }

    pub fn update(&mut self, point: f64) {
        self.update_with(point, 1);
    }

    pub fn update_with(&mut self, point: f64, count: u64) {
        match self.bins.binary_search_by(|bin| bin.0.total_cmp(&point)) {
            Ok(i) => self.bins[i].1 += count,
            Err(i) => {
                self.bins.insert(i, (point, count));
                self.trim();
            }
        }
    }

    /// Folds another histogram's bins into this one.
    pub fn merge(&mut self, other: &StreamingHistogram) {
        for &(point, count) in &other.bins {
            self.update_with(point, count);
        }
    }

    pub fn count(&self) -> u64 {
        self.bins.iter().map(|bin| bin.1).sum()
    }

    fn trim(&mut self) {
        while self.bins.len() > self.max_bin_count as usize {
            let mut closest = 0;
            let mut smallest = f64::INFINITY;
            for i in 0..self.bins.len() - 1 {
                let delta = self.bins[i + 1].0 - self.bins[i].0;
                if delta < smallest {
                    smallest = delta;
                    closest = i;
                }
            }
            let (p1, c1) = self.bins[closest];
            let (p2, c2) = self.bins[closest + 1];
            let merged_count = c1 + c2;
            let merged_point = (p1 * c1 as f64 + p2 * c2 as f64) / merged_count as f64;
            self.bins[closest] = (merged_point, merged_count);
            self.bins.remove(closest + 1);
        }
    }

    pub(crate) fn encoded_size(&self) -> usize {
        4 + 4 + self.bins.len() * 16
    }
}

impl Encode for StreamingHistogram {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32::<BigEndian>(self.max_bin_count)?;
        out.write_u32::<BigEndian>(codec::truncate32(self.bins.len())?)?;
        for (point, count) in &self.bins {
            codec::put_f64(out, *point)?;
            out.write_u64::<BigEndian>(*count)?;
        }
        Ok(())
    }
}

impl Decode for StreamingHistogram {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let max_bin_count = codec::get_u32(src)?;
        let len = codec::get_u32(src)? as usize;
        let mut bins = Vec::with_capacity(len);
        for _ in 0..len {
            let point = codec::get_f64(src)?;
            let count = codec::get_u64(src)?;
            bins.push((point, count));
        }
        Ok(Self {
            max_bin_count,
            bins,
        })
    }
}

// ---------------------------------------------------------------------------
// Metadata records
// ---------------------------------------------------------------------------

/// Commit-log position the flushed data covers up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayPosition {
    pub segment_id: u64,
    pub position: u32,
}

impl ReplayPosition {
    pub(crate) fn encoded_size(&self) -> usize {
        12
    }
}

impl Encode for ReplayPosition {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u64::<BigEndian>(self.segment_id)?;
        out.write_u32::<BigEndian>(self.position)?;
        Ok(())
    }
}

impl Decode for ReplayPosition {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let segment_id = codec::get_u64(src)?;
        let position = codec::get_u32(src)?;
        Ok(Self {
            segment_id,
            position,
        })
    }
}

/// Validation metadata: what a reader needs to sanity-check the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationMetadata {
    /// Partitioner name the table was written under.
    pub partitioner: Vec<u8>,
    /// Bloom-filter false-positive chance.
    pub filter_chance: f64,
}

impl ValidationMetadata {
    pub(crate) fn encoded_size(&self) -> usize {
        2 + self.partitioner.len() + 8
    }
}

impl Encode for ValidationMetadata {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        codec::put_str16(out, &self.partitioner)?;
        codec::put_f64(out, self.filter_chance)?;
        Ok(())
    }
}

impl Decode for ValidationMetadata {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let partitioner = codec::get_str16(src)?;
        let filter_chance = codec::get_f64(src)?;
        Ok(Self {
            partitioner,
            filter_chance,
        })
    }
}

/// Compaction metadata: table ancestry and cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompactionMetadata {
    /// Generations this table was compacted from; empty on a fresh flush.
    pub ancestors: Vec<u32>,
    /// Serialized cardinality estimator; empty when none was kept.
    pub cardinality: Vec<u8>,
}

impl CompactionMetadata {
    pub(crate) fn encoded_size(&self) -> usize {
        4 + self.ancestors.len() * 4 + 4 + self.cardinality.len()
    }
}

impl Encode for CompactionMetadata {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32::<BigEndian>(codec::truncate32(self.ancestors.len())?)?;
        codec::put_packed_u32(out, &self.ancestors)?;
        out.write_u32::<BigEndian>(codec::truncate32(self.cardinality.len())?)?;
        out.write_all(&self.cardinality)?;
        Ok(())
    }
}

impl Decode for CompactionMetadata {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let ancestor_count = codec::get_u32(src)? as usize;
        let ancestors = codec::get_packed_u32(src, ancestor_count)?;
        let cardinality_len = codec::get_u32(src)? as usize;
        let cardinality = codec::get_bytes(src, cardinality_len)?;
        Ok(Self {
            ancestors,
            cardinality,
        })
    }
}

/// Aggregate statistics over everything the flush wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsMetadata {
    pub estimated_row_size: EstimatedHistogram,
    pub estimated_column_count: EstimatedHistogram,
    pub position: ReplayPosition,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
    pub max_local_deletion_time: i32,
    pub compression_ratio: f64,
    pub estimated_tombstone_drop_time: StreamingHistogram,
    pub sstable_level: u32,
    pub repaired_at: i64,
    pub min_column_names: Vec<Vec<u8>>,
    pub max_column_names: Vec<Vec<u8>>,
    pub has_legacy_counter_shards: bool,
}

fn column_names_encoded_size(names: &[Vec<u8>]) -> usize {
    4 + names.iter().map(|n| 2 + n.len()).sum::<usize>()
}

fn put_column_names<W: Write>(out: &mut W, names: &[Vec<u8>]) -> Result<()> {
    out.write_u32::<BigEndian>(codec::truncate32(names.len())?)?;
    for name in names {
        codec::put_str16(out, name)?;
    }
    Ok(())
}

fn get_column_names<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Vec<Vec<u8>>> {
    let len = codec::get_u32(src)? as usize;
    let mut names = Vec::with_capacity(len);
    for _ in 0..len {
        names.push(codec::get_str16(src)?);
    }
    Ok(names)
}

impl StatsMetadata {
    pub(crate) fn encoded_size(&self) -> usize {
        self.estimated_row_size.encoded_size()
            + self.estimated_column_count.encoded_size()
            + self.position.encoded_size()
            + 8 // min_timestamp
            + 8 // max_timestamp
            + 4 // max_local_deletion_time
            + 8 // compression_ratio
            + self.estimated_tombstone_drop_time.encoded_size()
            + 4 // sstable_level
            + 8 // repaired_at
            + column_names_encoded_size(&self.min_column_names)
            + column_names_encoded_size(&self.max_column_names)
            + 1 // has_legacy_counter_shards
    }
}

impl Encode for StatsMetadata {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        self.estimated_row_size.encode(out)?;
        self.estimated_column_count.encode(out)?;
        self.position.encode(out)?;
        out.write_i64::<BigEndian>(self.min_timestamp)?;
        out.write_i64::<BigEndian>(self.max_timestamp)?;
        out.write_i32::<BigEndian>(self.max_local_deletion_time)?;
        codec::put_f64(out, self.compression_ratio)?;
        self.estimated_tombstone_drop_time.encode(out)?;
        out.write_u32::<BigEndian>(self.sstable_level)?;
        out.write_i64::<BigEndian>(self.repaired_at)?;
        put_column_names(out, &self.min_column_names)?;
        put_column_names(out, &self.max_column_names)?;
        codec::put_bool(out, self.has_legacy_counter_shards)?;
        Ok(())
    }
}

impl Decode for StatsMetadata {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let estimated_row_size = EstimatedHistogram::decode(src)?;
        let estimated_column_count = EstimatedHistogram::decode(src)?;
        let position = ReplayPosition::decode(src)?;
        let min_timestamp = codec::get_i64(src)?;
        let max_timestamp = codec::get_i64(src)?;
        let max_local_deletion_time = codec::get_i32(src)?;
        let compression_ratio = codec::get_f64(src)?;
        let estimated_tombstone_drop_time = StreamingHistogram::decode(src)?;
        let sstable_level = codec::get_u32(src)?;
        let repaired_at = codec::get_i64(src)?;
        let min_column_names = get_column_names(src)?;
        let max_column_names = get_column_names(src)?;
        let has_legacy_counter_shards = codec::get_bool(src)?;
        Ok(Self {
            estimated_row_size,
            estimated_column_count,
            position,
            min_timestamp,
            max_timestamp,
            max_local_deletion_time,
            compression_ratio,
            estimated_tombstone_drop_time,
            sstable_level,
            repaired_at,
            min_column_names,
            max_column_names,
            has_legacy_counter_shards,
        })
    }
}

/// A metadata record tagged by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataRecord {
    Validation(ValidationMetadata),
    Compaction(CompactionMetadata),
    Stats(StatsMetadata),
}

impl MetadataRecord {
    pub fn kind(&self) -> MetadataType {
        match self {
            MetadataRecord::Validation(_) => MetadataType::Validation,
            MetadataRecord::Compaction(_) => MetadataType::Compaction,
            MetadataRecord::Stats(_) => MetadataType::Stats,
        }
    }

    pub(crate) fn encoded_size(&self) -> usize {
        match self {
            MetadataRecord::Validation(v) => v.encoded_size(),
            MetadataRecord::Compaction(c) => c.encoded_size(),
            MetadataRecord::Stats(s) => s.encoded_size(),
        }
    }
}

impl Encode for MetadataRecord {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        match self {
            MetadataRecord::Validation(v) => v.encode(out),
            MetadataRecord::Compaction(c) => c.encode(out),
            MetadataRecord::Stats(s) => s.encode(out),
        }
    }
}

// ---------------------------------------------------------------------------
// The Statistics component
// ---------------------------------------------------------------------------

/// The Statistics component: the kind→offset hash plus the parsed records.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// (raw kind, file offset) pairs as written, offsets ascending.
    pub offsets: Vec<(u32, u32)>,
    /// Parsed records for the kinds this engine knows.
    pub contents: Vec<MetadataRecord>,
}

impl Statistics {
    /// Pre-computes offsets and installs the three records, Validation first.
    pub fn seal(
        &mut self,
        collector: &MetadataCollector,
        partitioner: &str,
        bloom_filter_fp_chance: f64,
    ) {
        // Hash length, then one (kind, offset) pair per record.
        let mut offset = 4 + METADATA_TYPE_COUNT * (4 + 4);

        let validation = ValidationMetadata {
            partitioner: partitioner.as_bytes().to_vec(),
            filter_chance: bloom_filter_fp_chance,
        };
        let compaction = collector.construct_compaction();
        let stats = collector.construct_stats();

        self.offsets.clear();
        self.contents.clear();

        self.offsets.push((MetadataType::Validation as u32, offset));
        offset += validation.encoded_size() as u32;
        self.contents.push(MetadataRecord::Validation(validation));

        self.offsets.push((MetadataType::Compaction as u32, offset));
        offset += compaction.encoded_size() as u32;
        self.contents.push(MetadataRecord::Compaction(compaction));

        self.offsets.push((MetadataType::Stats as u32, offset));
        self.contents.push(MetadataRecord::Stats(stats));
    }

    /// Looks up a parsed record by kind.
    pub fn get(&self, kind: MetadataType) -> Option<&MetadataRecord> {
        self.contents.iter().find(|record| record.kind() == kind)
    }
}

impl Encode for Statistics {
    fn encode<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32::<BigEndian>(codec::truncate32(self.offsets.len())?)?;
        for (kind, offset) in &self.offsets {
            out.write_u32::<BigEndian>(*kind)?;
            out.write_u32::<BigEndian>(*offset)?;
        }

        // The stream cannot seek backwards, so records go out in the order of
        // the offsets just written.
        let mut ordered: Vec<(u32, u32)> = self.offsets.clone();
        ordered.sort_by_key(|&(_, offset)| offset);
        for (raw_kind, _) in ordered {
            let kind = MetadataType::from_u32(raw_kind)
                .ok_or(Error::UnknownMetadataKind(raw_kind))?;
            let record = self
                .get(kind)
                .ok_or(Error::UnknownMetadataKind(raw_kind))?;
            record.encode(out)?;
        }
        Ok(())
    }
}

impl Decode for Statistics {
    fn decode<R: Read + Seek>(src: &mut RandomAccessReader<R>) -> Result<Self> {
        let len = codec::get_u32(src)? as usize;
        let mut offsets = Vec::with_capacity(len);
        for _ in 0..len {
            let kind = codec::get_u32(src)?;
            let offset = codec::get_u32(src)?;
            offsets.push((kind, offset));
        }

        let mut contents = Vec::new();
        for &(raw_kind, offset) in &offsets {
            let Some(kind) = MetadataType::from_u32(raw_kind) else {
                tracing::warn!("invalid metadata type in statistics file: {}", raw_kind);
                continue;
            };
            src.seek(offset as u64)?;
            let record = match kind {
                MetadataType::Validation => {
                    MetadataRecord::Validation(ValidationMetadata::decode(src)?)
                }
                MetadataType::Compaction => {
                    MetadataRecord::Compaction(CompactionMetadata::decode(src)?)
                }
                MetadataType::Stats => MetadataRecord::Stats(StatsMetadata::decode(src)?),
            };
            contents.push(record);
        }

        Ok(Self { offsets, contents })
    }
}

// ---------------------------------------------------------------------------
// Per-flush statistics collection
// ---------------------------------------------------------------------------

/// Componentwise minimum of observed column names.
pub(crate) fn min_components(current: &mut Vec<Vec<u8>>, names: &[&[u8]]) {
    for (i, name) in names.iter().enumerate() {
        if i >= current.len() {
            current.push(name.to_vec());
        } else if *name < current[i].as_slice() {
            current[i] = name.to_vec();
        }
    }
}

/// Componentwise maximum of observed column names.
pub(crate) fn max_components(current: &mut Vec<Vec<u8>>, names: &[&[u8]]) {
    for (i, name) in names.iter().enumerate() {
        if i >= current.len() {
            current.push(name.to_vec());
        } else if *name > current[i].as_slice() {
            current[i] = name.to_vec();
        }
    }
}

/// Per-partition accumulator, reset after every partition.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    /// Data-file offset where the partition started.
    pub start_offset: u64,
    /// Byte size of the partition once fully written.
    pub row_size: u64,
    pub column_count: u64,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
    pub max_local_deletion_time: i32,
    pub tombstone_histogram: StreamingHistogram,
    pub min_column_names: Vec<Vec<u8>>,
    pub max_column_names: Vec<Vec<u8>>,
    pub has_legacy_counter_shards: bool,
}

impl ColumnStats {
    pub fn new() -> Self {
        Self {
            start_offset: 0,
            row_size: 0,
            column_count: 0,
            min_timestamp: i64::MAX,
            max_timestamp: i64::MIN,
            max_local_deletion_time: i32::MIN,
            tombstone_histogram: StreamingHistogram::new(TOMBSTONE_HISTOGRAM_BIN_COUNT),
            min_column_names: Vec::new(),
            max_column_names: Vec::new(),
            has_legacy_counter_shards: false,
        }
    }

    pub fn update_min_timestamp(&mut self, timestamp: i64) {
        self.min_timestamp = self.min_timestamp.min(timestamp);
    }

    pub fn update_max_timestamp(&mut self, timestamp: i64) {
        self.max_timestamp = self.max_timestamp.max(timestamp);
    }

    pub fn update_max_local_deletion_time(&mut self, deletion_time: i32) {
        self.max_local_deletion_time = self.max_local_deletion_time.max(deletion_time);
    }
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-flush accumulator merged from every partition's [`ColumnStats`].
#[derive(Debug, Clone)]
pub struct MetadataCollector {
    estimated_row_size: EstimatedHistogram,
    estimated_column_count: EstimatedHistogram,
    replay_position: ReplayPosition,
    min_timestamp: i64,
    max_timestamp: i64,
    max_local_deletion_time: i32,
    compression_ratio: f64,
    estimated_tombstone_drop_time: StreamingHistogram,
    sstable_level: u32,
    repaired_at: i64,
    min_column_names: Vec<Vec<u8>>,
    max_column_names: Vec<Vec<u8>>,
    has_legacy_counter_shards: bool,
    ancestors: Vec<u32>,
    partition_count: u64,
}

impl MetadataCollector {
    pub fn new() -> Self {
        Self {
            estimated_row_size: EstimatedHistogram::new(ROW_SIZE_HISTOGRAM_BUCKETS),
            estimated_column_count: EstimatedHistogram::new(COLUMN_COUNT_HISTOGRAM_BUCKETS),
            replay_position: ReplayPosition::default(),
            min_timestamp: i64::MAX,
            max_timestamp: i64::MIN,
            max_local_deletion_time: i32::MIN,
            compression_ratio: NO_COMPRESSION_RATIO,
            estimated_tombstone_drop_time: StreamingHistogram::new(
                TOMBSTONE_HISTOGRAM_BIN_COUNT,
            ),
            sstable_level: 0,
            repaired_at: 0,
            min_column_names: Vec::new(),
            max_column_names: Vec::new(),
            has_legacy_counter_shards: false,
            ancestors: Vec::new(),
            partition_count: 0,
        }
    }

    /// Accounts one partition key.
    pub fn add_key(&mut self, _key: &[u8]) {
        self.partition_count += 1;
    }

    pub fn partition_count(&self) -> u64 {
        self.partition_count
    }

    /// Folds one partition's statistics into the flush aggregate.
    pub fn update(&mut self, stats: ColumnStats) {
        self.estimated_row_size.add(stats.row_size);
        self.estimated_column_count.add(stats.column_count);
        self.min_timestamp = self.min_timestamp.min(stats.min_timestamp);
        self.max_timestamp = self.max_timestamp.max(stats.max_timestamp);
        self.max_local_deletion_time = self
            .max_local_deletion_time
            .max(stats.max_local_deletion_time);
        self.estimated_tombstone_drop_time
            .merge(&stats.tombstone_histogram);
        let min_refs: Vec<&[u8]> = stats.min_column_names.iter().map(|n| n.as_slice()).collect();
        min_components(&mut self.min_column_names, &min_refs);
        let max_refs: Vec<&[u8]> = stats.max_column_names.iter().map(|n| n.as_slice()).collect();
        max_components(&mut self.max_column_names, &max_refs);
        self.has_legacy_counter_shards |= stats.has_legacy_counter_shards;
    }

    /// Records the achieved compression ratio once the data file is sealed.
    pub fn add_compression_ratio(&mut self, compressed: u64, uncompressed: u64) {
        if uncompressed > 0 {
            self.compression_ratio = compressed as f64 / uncompressed as f64;
        }
    }

    pub fn construct_compaction(&self) -> CompactionMetadata {
        CompactionMetadata {
            ancestors: self.ancestors.clone(),
            cardinality: Vec::new(),
        }
    }

    pub fn construct_stats(&self) -> StatsMetadata {
        StatsMetadata {
            estimated_row_size: self.estimated_row_size.clone(),
            estimated_column_count: self.estimated_column_count.clone(),
            position: self.replay_position,
            min_timestamp: self.min_timestamp,
            max_timestamp: self.max_timestamp,
            max_local_deletion_time: self.max_local_deletion_time,
            compression_ratio: self.compression_ratio,
            estimated_tombstone_drop_time: self.estimated_tombstone_drop_time.clone(),
            sstable_level: self.sstable_level,
            repaired_at: self.repaired_at,
            min_column_names: self.min_column_names.clone(),
            max_column_names: self.max_column_names.clone(),
            has_legacy_counter_shards: self.has_legacy_counter_shards,
        }
    }
}

impl Default for MetadataCollector {
    fn default() -> Self {
        Self::new()
    }
}
