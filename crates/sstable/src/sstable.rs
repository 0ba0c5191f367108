//! The sstable handle: component bookkeeping, load, flush and sealing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use bloom::BloomFilter;
use byteorder::{BigEndian, WriteBytesExt};

use crate::checksum::{self, ChecksummedWriter};
use crate::codec::{self, Decode, Encode};
use crate::composite::{Composite, CompositeMarker};
use crate::compress::{self, CompressedWriter, Compression, Compressor};
use crate::error::{Error, Result};
use crate::index::{write_index_entry, IndexEntry};
use crate::metadata::{self, ColumnStats, MetadataCollector, Statistics};
use crate::mutation::{
    Cell, ClusteredRow, CollectionMutation, ColumnValue, DeletionTime, Partition, Tombstone,
};
use crate::reader::{RandomAccessReader, DATA_BUFFER_SIZE, SMALL_BUFFER_SIZE};
use crate::schema::{ColumnId, Schema};
use crate::summary::Summary;
use crate::writer::{FileWriter, SequentialWriter};

/// Cell mask bytes, written ahead of every cell's fields.
mod masks {
    pub const NONE: u8 = 0x00;
    pub const DELETION: u8 = 0x01;
    pub const EXPIRATION: u8 = 0x02;
    pub const RANGE_TOMBSTONE: u8 = 0x10;
}

/// The component files that jointly constitute one sstable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComponentType {
    Index,
    CompressionInfo,
    Data,
    Toc,
    Summary,
    Digest,
    Crc,
    Filter,
    Statistics,
}

impl ComponentType {
    pub const ALL: [ComponentType; 9] = [
        ComponentType::Index,
        ComponentType::CompressionInfo,
        ComponentType::Data,
        ComponentType::Toc,
        ComponentType::Summary,
        ComponentType::Digest,
        ComponentType::Crc,
        ComponentType::Filter,
        ComponentType::Statistics,
    ];

    /// Filename suffix of this component.
    pub fn file_suffix(self) -> &'static str {
        match self {
            ComponentType::Index => "Index.db",
            ComponentType::CompressionInfo => "CompressionInfo.db",
            ComponentType::Data => "Data.db",
            ComponentType::Toc => "TOC.txt",
            ComponentType::Summary => "Summary.db",
            ComponentType::Digest => "Digest.sha1",
            ComponentType::Crc => "CRC.db",
            ComponentType::Filter => "Filter.db",
            ComponentType::Statistics => "Statistics.db",
        }
    }

    /// Reverse-maps a filename suffix.
    pub fn from_file_suffix(suffix: &str) -> Option<ComponentType> {
        Self::ALL.iter().copied().find(|c| c.file_suffix() == suffix)
    }
}

/// On-disk format version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    La,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::La => "la",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "la" => Ok(Version::La),
            other => Err(Error::BadEnumValue {
                what: "sstable version",
                value: other.to_string(),
            }),
        }
    }
}

/// On-disk layout family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Big,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Big => "big",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "big" => Ok(Format::Big),
            other => Err(Error::BadEnumValue {
                what: "sstable format",
                value: other.to_string(),
            }),
        }
    }
}

/// A handle to one sstable: a generation-numbered set of sibling component
/// files in a directory.
///
/// `load` discovers and parses the metadata components and opens the data and
/// index files for random reads. `write_components` consumes a mutation
/// stream and produces a fresh, fully sealed component set.
///
/// The handle is not safe for concurrent mutation; concurrent read-only
/// access goes through per-call cursors over duplicated file handles.
pub struct SsTable {
    dir: PathBuf,
    version: Version,
    generation: u64,
    format: Format,
    components: BTreeSet<ComponentType>,
    summary: Summary,
    statistics: Statistics,
    compression: Option<Compression>,
    filter: Option<BloomFilter>,
    collector: MetadataCollector,
    c_stats: ColumnStats,
    data_file: Option<File>,
    index_file: Option<File>,
    data_file_size: u64,
    bytes_on_disk: u64,
    marked_for_deletion: bool,
}

impl SsTable {
    pub fn new(dir: impl Into<PathBuf>, generation: u64) -> Self {
        Self {
            dir: dir.into(),
            version: Version::La,
            generation,
            format: Format::Big,
            components: BTreeSet::new(),
            summary: Summary::default(),
            statistics: Statistics::default(),
            compression: None,
            filter: None,
            collector: MetadataCollector::new(),
            c_stats: ColumnStats::new(),
            data_file: None,
            index_file: None,
            data_file_size: 0,
            bytes_on_disk: 0,
            marked_for_deletion: false,
        }
    }

    /// Path of one component file:
    /// `{dir}/{version}-{generation}-{format}-{suffix}`.
    pub fn filename(&self, component: ComponentType) -> PathBuf {
        Self::component_filename(
            &self.dir,
            self.version,
            self.generation,
            self.format,
            component,
        )
    }

    /// Component path without a handle.
    pub fn component_filename(
        dir: &Path,
        version: Version,
        generation: u64,
        format: Format,
        component: ComponentType,
    ) -> PathBuf {
        dir.join(format!(
            "{}-{}-{}-{}",
            version.as_str(),
            generation,
            format.as_str(),
            component.file_suffix()
        ))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_component(&self, component: ComponentType) -> bool {
        self.components.contains(&component)
    }

    pub fn components(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.components.iter().copied()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn compression(&self) -> Option<&Compression> {
        self.compression.as_ref()
    }

    pub fn filter(&self) -> Option<&BloomFilter> {
        self.filter.as_ref()
    }

    /// First partition key the table holds.
    pub fn first_key(&self) -> &[u8] {
        &self.summary.first_key
    }

    /// Last partition key the table holds.
    pub fn last_key(&self) -> &[u8] {
        &self.summary.last_key
    }

    /// Arranges for every component file to be unlinked when the handle is
    /// dropped.
    pub fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    // -----------------------------------------------------------------------
    // Load path
    // -----------------------------------------------------------------------

    /// Loads the table: TOC first, then each metadata component, then the
    /// data and index files are opened for random reads.
    pub fn load(&mut self) -> Result<()> {
        self.read_toc()?;
        self.read_statistics()?;
        self.read_compression()?;
        self.read_filter()?;
        self.read_summary()?;
        self.open_data()?;
        // The compression metadata needs the on-disk file size before it can
        // translate logical positions near the end of the data.
        if let Some(compression) = &mut self.compression {
            compression.update(self.data_file_size);
        }
        Ok(())
    }

    fn open_component(&self, component: ComponentType) -> Result<File> {
        let path = self.filename(component);
        File::open(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound { path }
            } else {
                Error::Io(e)
            }
        })
    }

    /// Parses the TOC into the present-components set.
    ///
    /// The file is supposed to be tiny; one that fills a whole page means
    /// something fishy is going on, and is rejected outright.
    fn read_toc(&mut self) -> Result<()> {
        let path = self.filename(ComponentType::Toc);
        tracing::debug!("reading TOC file {}", path.display());

        let file = self.open_component(ComponentType::Toc)?;
        let size = file.metadata()?.len();
        if size >= 4096 {
            return Err(Error::Oversize { size });
        }
        let contents = io::read_to_string(file)?;

        for line in contents.split('\n') {
            // accept trailing newlines
            if line.is_empty() {
                continue;
            }
            match ComponentType::from_file_suffix(line) {
                Some(component) => {
                    self.components.insert(component);
                }
                None => return Err(Error::UnknownComponent(line.to_string())),
            }
        }
        if self.components.is_empty() {
            return Err(Error::EmptyToc);
        }
        Ok(())
    }

    fn write_toc(&self) -> Result<()> {
        let path = self.filename(ComponentType::Toc);
        tracing::debug!("writing TOC file {}", path.display());

        let mut out = FileWriter::create(&path, SMALL_BUFFER_SIZE)?;
        for component in &self.components {
            out.write_all(component.file_suffix().as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        out.close()
    }

    fn read_simple<T: Decode>(&self, component: ComponentType) -> Result<T> {
        let path = self.filename(component);
        tracing::debug!("reading {} file {}", component.file_suffix(), path.display());
        let file = self.open_component(component)?;
        let mut src = RandomAccessReader::new(file, SMALL_BUFFER_SIZE)?;
        T::decode(&mut src)
    }

    fn write_simple<T: Encode>(&self, component: ComponentType, value: &T) -> Result<()> {
        let path = self.filename(component);
        tracing::debug!("writing {} file {}", component.file_suffix(), path.display());
        let mut out = FileWriter::create(&path, SMALL_BUFFER_SIZE)?;
        value.encode(&mut out)?;
        out.flush()?;
        out.close()
    }

    fn read_statistics(&mut self) -> Result<()> {
        self.statistics = self.read_simple(ComponentType::Statistics)?;
        Ok(())
    }

    fn read_compression(&mut self) -> Result<()> {
        if !self.has_component(ComponentType::CompressionInfo) {
            return Ok(());
        }
        self.compression = Some(self.read_simple(ComponentType::CompressionInfo)?);
        Ok(())
    }

    fn write_compression(&self) -> Result<()> {
        if let (true, Some(compression)) = (
            self.has_component(ComponentType::CompressionInfo),
            &self.compression,
        ) {
            self.write_simple(ComponentType::CompressionInfo, compression)?;
        }
        Ok(())
    }

    fn read_summary(&mut self) -> Result<()> {
        self.summary = self.read_simple(ComponentType::Summary)?;
        Ok(())
    }

    fn read_filter(&mut self) -> Result<()> {
        if !self.has_component(ComponentType::Filter) {
            self.filter = None;
            return Ok(());
        }
        let path = self.filename(ComponentType::Filter);
        tracing::debug!("reading Filter.db file {}", path.display());
        let file = self.open_component(ComponentType::Filter)?;
        let mut reader = BufReader::with_capacity(SMALL_BUFFER_SIZE, file);
        self.filter = Some(BloomFilter::read_from(&mut reader)?);
        Ok(())
    }

    fn write_filter(&self) -> Result<()> {
        if let (true, Some(filter)) = (self.has_component(ComponentType::Filter), &self.filter) {
            let path = self.filename(ComponentType::Filter);
            tracing::debug!("writing Filter.db file {}", path.display());
            let mut out = FileWriter::create(&path, SMALL_BUFFER_SIZE)?;
            filter.write_to(&mut out)?;
            out.flush()?;
            out.close()?;
        }
        Ok(())
    }

    fn open_data(&mut self) -> Result<()> {
        let index = self.open_component(ComponentType::Index)?;
        let data = self.open_component(ComponentType::Data)?;
        self.data_file_size = data.metadata()?.len();
        self.index_file = Some(index);
        self.data_file = Some(data);
        Ok(())
    }

    fn create_data(&self) -> Result<(File, File)> {
        let data = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.filename(ComponentType::Data))?;
        let index = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.filename(ComponentType::Index))?;
        Ok((data, index))
    }

    // -----------------------------------------------------------------------
    // Read queries
    // -----------------------------------------------------------------------

    /// Parses up to `quantity` index records starting at `position`.
    ///
    /// Running out of file at a record boundary ends the scan silently. A
    /// short read that is not at end-of-file propagates as corruption. The
    /// two cases cannot be told apart perfectly: hitting end-of-file in the
    /// middle of a record also terminates the scan, since distinguishing it
    /// would require tracking the stream's true position through the buffer.
    pub fn read_indexes(&self, position: u64, quantity: u64) -> Result<Vec<IndexEntry>> {
        let file = self.shared_handle(&self.index_file, "index")?;
        let mut stream = RandomAccessReader::new(file, SMALL_BUFFER_SIZE)?;
        stream.seek(position)?;

        let mut indexes = Vec::new();
        let mut count = 0u64;
        while count < quantity {
            match IndexEntry::decode(&mut stream) {
                Ok(entry) => {
                    indexes.push(entry);
                    count += 1;
                }
                Err(Error::BufferUndersize { .. }) if stream.eof() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(indexes)
    }

    /// Reads up to `len` bytes of (uncompressed) data at logical position
    /// `pos`, decompressing transparently when the table is compressed.
    pub fn data_read(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        match &self.compression {
            Some(compression) => {
                let file = self.data_file.as_ref().ok_or_else(|| {
                    Error::Io(io::Error::new(ErrorKind::Other, "data file is not open"))
                })?;
                compress::compressed_read(file, compression, pos, len)
            }
            None => {
                let file = self.shared_handle(&self.data_file, "data")?;
                let mut stream = RandomAccessReader::new(file, DATA_BUFFER_SIZE)?;
                stream.seek(pos)?;
                stream.read_exactly(len)
            }
        }
    }

    /// Uncompressed length of the data.
    pub fn data_size(&self) -> u64 {
        match &self.compression {
            Some(compression) => compression.uncompressed_file_length(),
            None => self.data_file_size,
        }
    }

    /// Total on-disk size of every component file, cached after first call.
    pub fn bytes_on_disk(&mut self) -> Result<u64> {
        if self.bytes_on_disk != 0 {
            return Ok(self.bytes_on_disk);
        }
        let mut total = 0;
        for component in &self.components {
            total += fs::metadata(self.filename(*component))?.len();
        }
        self.bytes_on_disk = total;
        Ok(total)
    }

    /// Duplicates a shared file handle for a per-call cursor.
    fn shared_handle(&self, slot: &Option<File>, what: &str) -> Result<File> {
        let file = slot.as_ref().ok_or_else(|| {
            Error::Io(io::Error::new(
                ErrorKind::Other,
                format!("{} file is not open", what),
            ))
        })?;
        Ok(file.try_clone()?)
    }

    // -----------------------------------------------------------------------
    // Flush path
    // -----------------------------------------------------------------------

    /// Serializes a mutation stream into a fresh, fully sealed component set.
    ///
    /// `reader` must yield partitions in partitioner order, with clustered
    /// rows in clustering order and cells in column-id order.
    /// `estimated_partitions` sizes the bloom filter and the summary.
    pub fn write_components<I>(
        &mut self,
        reader: I,
        estimated_partitions: u64,
        schema: &Schema,
    ) -> Result<()>
    where
        I: Iterator<Item = Partition>,
    {
        fs::create_dir_all(&self.dir)?;
        let (data_file, index_file) = self.create_data()?;
        self.prepare_write_components(reader, estimated_partitions, schema, data_file, index_file)?;
        self.write_simple(ComponentType::Summary, &self.summary)?;
        self.write_filter()?;
        self.write_simple(ComponentType::Statistics, &self.statistics)?;
        self.write_compression()?;
        // The TOC goes last: a reader that finds one is guaranteed to find
        // every component it lists.
        self.write_toc()?;
        Ok(())
    }

    /// Runs the partition loop behind either the checksummed or the
    /// compressed data writer, then writes the digest (and CRC, when
    /// uncompressed).
    fn prepare_write_components<I>(
        &mut self,
        reader: I,
        estimated_partitions: u64,
        schema: &Schema,
        data_file: File,
        index_file: File,
    ) -> Result<()>
    where
        I: Iterator<Item = Partition>,
    {
        let index = FileWriter::new(index_file, DATA_BUFFER_SIZE);

        // The CRC component is only present when compression is off.
        if schema.compressor_params().compressor == Compressor::None {
            let mut out = ChecksummedWriter::new(FileWriter::new(data_file, DATA_BUFFER_SIZE));
            self.components.insert(ComponentType::Crc);
            self.do_write_components(reader, estimated_partitions, schema, &mut out, index)?;
            let (full_checksum, crc_record) = out.close()?;

            checksum::write_digest(&self.filename(ComponentType::Digest), full_checksum)?;
            checksum::write_crc(&self.filename(ComponentType::Crc), &crc_record)?;
        } else {
            let compression = Compression::prepare(schema.compressor_params());
            let mut out = CompressedWriter::new(data_file, compression);
            self.components.insert(ComponentType::CompressionInfo);
            self.do_write_components(reader, estimated_partitions, schema, &mut out, index)?;
            let compression = out.close()?;

            checksum::write_digest(
                &self.filename(ComponentType::Digest),
                compression.full_checksum(),
            )?;
            self.compression = Some(compression);
        }
        Ok(())
    }

    /// The single sequential producer: per partition it feeds the summary
    /// sampler, the bloom filter, the statistics collector, the index writer
    /// and the data writer, then seals summary and statistics.
    fn do_write_components<W, I>(
        &mut self,
        reader: I,
        estimated_partitions: u64,
        schema: &Schema,
        out: &mut W,
        index: FileWriter,
    ) -> Result<()>
    where
        W: SequentialWriter,
        I: Iterator<Item = Partition>,
    {
        let mut index = index;

        let filter_fp_chance = schema.bloom_filter_fp_chance();
        if filter_fp_chance != 1.0 {
            self.components.insert(ComponentType::Filter);
            self.filter = Some(BloomFilter::new(
                estimated_partitions.max(1),
                filter_fp_chance,
            ));
        } else {
            self.filter = None;
        }

        self.summary.prepare(estimated_partitions)?;

        let mut first_key: Option<Vec<u8>> = None;
        let mut last_key: Option<Vec<u8>> = None;

        for partition in reader {
            // Remember where the partition starts to compute its size later.
            self.c_stats.start_offset = out.offset();

            self.summary.maybe_add_entry(&partition.key, index.offset());
            if let Some(filter) = &mut self.filter {
                filter.insert(&partition.key);
            }
            self.collector.add_key(&partition.key);

            // The index record points at the data offset *before* the
            // partition key is written.
            write_index_entry(&mut index, &partition.key, out.offset())?;

            codec::put_str16(out, &partition.key)?;

            let deletion_time = match partition.tombstone {
                Some(tombstone) => {
                    let d = DeletionTime::from(tombstone);
                    self.c_stats
                        .tombstone_histogram
                        .update(d.local_deletion_time as f64);
                    self.c_stats
                        .update_max_local_deletion_time(d.local_deletion_time);
                    self.c_stats.update_min_timestamp(d.marked_for_delete_at);
                    self.c_stats.update_max_timestamp(d.marked_for_delete_at);
                    d
                }
                None => DeletionTime::LIVE,
            };
            deletion_time.encode(out)?;

            self.write_static_row(out, schema, &partition.static_row)?;
            for range_tombstone in &partition.range_tombstones {
                let prefix = Composite::from_clustering(schema, &range_tombstone.prefix)?;
                self.write_range_tombstone(out, &prefix, &[], Some(range_tombstone.tombstone))?;
            }
            for row in &partition.rows {
                self.write_clustered_row(out, schema, row)?;
            }
            out.write_i16::<BigEndian>(0)?; // end-of-row marker

            self.c_stats.row_size = out.offset() - self.c_stats.start_offset;
            let stats = std::mem::take(&mut self.c_stats);
            self.collector.update(stats);

            if first_key.is_none() {
                first_key = Some(partition.key);
            } else {
                last_key = Some(partition.key);
            }
        }

        self.summary.seal(first_key, last_key)?;

        index.close()?;
        self.index_file = None;

        self.components.extend([
            ComponentType::Toc,
            ComponentType::Statistics,
            ComponentType::Digest,
            ComponentType::Index,
            ComponentType::Summary,
            ComponentType::Data,
        ]);

        if let Some((compressed, uncompressed)) = out.compression_lengths() {
            self.collector.add_compression_ratio(compressed, uncompressed);
        }

        self.statistics
            .seal(&self.collector, schema.partitioner_name(), filter_fp_chance);
        Ok(())
    }

    /// Writes a composite column name: the clustering prefix followed by the
    /// given components and marker, the whole thing length-prefixed.
    fn write_column_name<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        clustering_key: &Composite,
        column_names: &[&[u8]],
        marker: CompositeMarker,
    ) -> Result<()> {
        metadata::min_components(&mut self.c_stats.min_column_names, column_names);
        metadata::max_components(&mut self.c_stats.max_column_names, column_names);

        let composite = Composite::from_exploded(column_names, marker)?;
        let mut prefix = clustering_key.as_bytes();
        // A composite that serializes to just the marker byte replaces the
        // clustering key's own trailing end-of-component byte rather than
        // appending a new component.
        if composite.len() == 1 && !prefix.is_empty() {
            prefix = &prefix[..prefix.len() - 1];
        }
        let size = codec::truncate16(prefix.len() + composite.len())?;
        out.write_u16::<BigEndian>(size)?;
        out.write_all(prefix)?;
        out.write_all(composite.as_bytes())?;
        Ok(())
    }

    /// Writes a bare, non-composite column name.
    fn write_column_name_bare<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        column_name: &[u8],
    ) -> Result<()> {
        metadata::min_components(&mut self.c_stats.min_column_names, &[column_name]);
        metadata::max_components(&mut self.c_stats.max_column_names, &[column_name]);

        codec::put_str16(out, column_name)?;
        Ok(())
    }

    /// Writes the cell fields that follow a column name.
    fn write_cell<W: SequentialWriter>(&mut self, out: &mut W, cell: &Cell) -> Result<()> {
        match cell {
            Cell::Counter { .. } => return Err(Error::NotImplemented("counter cells")),
            Cell::Dead {
                timestamp,
                deletion_time,
            } => {
                update_cell_stats(&mut self.c_stats, *timestamp);
                self.c_stats
                    .tombstone_histogram
                    .update(*deletion_time as f64);
                out.write_u8(masks::DELETION)?;
                out.write_u64::<BigEndian>(*timestamp as u64)?;
                out.write_u32::<BigEndian>(4)?; // size of the deletion time
                out.write_i32::<BigEndian>(*deletion_time)?;
            }
            Cell::Expiring {
                timestamp,
                ttl,
                expiry,
                value,
            } => {
                update_cell_stats(&mut self.c_stats, *timestamp);
                out.write_u8(masks::EXPIRATION)?;
                out.write_u32::<BigEndian>(*ttl)?;
                out.write_i32::<BigEndian>(*expiry)?;
                out.write_u64::<BigEndian>(*timestamp as u64)?;
                codec::put_str32(out, value)?;
            }
            Cell::Live { timestamp, value } => {
                update_cell_stats(&mut self.c_stats, *timestamp);
                out.write_u8(masks::NONE)?;
                out.write_u64::<BigEndian>(*timestamp as u64)?;
                codec::put_str32(out, value)?;
            }
        }
        Ok(())
    }

    /// Writes the row-marker cell that leads a clustered row, when the row
    /// carries a creation timestamp.
    fn write_row_marker<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        row: &ClusteredRow,
        clustering_key: &Composite,
    ) -> Result<()> {
        let Some(timestamp) = row.created_at else {
            return Ok(());
        };

        self.write_column_name(out, clustering_key, &[&[]], CompositeMarker::None)?;
        update_cell_stats(&mut self.c_stats, timestamp);
        out.write_u8(masks::NONE)?;
        out.write_u64::<BigEndian>(timestamp as u64)?;
        out.write_u32::<BigEndian>(0)?; // zero-length value
        Ok(())
    }

    /// Writes a range tombstone over `prefix` + `suffix`: both bound markers
    /// around the mask, then the deletion time and timestamp.
    fn write_range_tombstone<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        prefix: &Composite,
        suffix: &[&[u8]],
        tombstone: Option<Tombstone>,
    ) -> Result<()> {
        let Some(tombstone) = tombstone else {
            return Ok(());
        };

        self.write_column_name(out, prefix, suffix, CompositeMarker::StartRange)?;
        out.write_u8(masks::RANGE_TOMBSTONE)?;
        self.write_column_name(out, prefix, suffix, CompositeMarker::EndRange)?;

        update_cell_stats(&mut self.c_stats, tombstone.timestamp);
        self.c_stats
            .tombstone_histogram
            .update(tombstone.deletion_time as f64);

        out.write_i32::<BigEndian>(tombstone.deletion_time)?;
        out.write_u64::<BigEndian>(tombstone.timestamp as u64)?;
        Ok(())
    }

    /// Writes a collection column: its covering tombstone, then one cell per
    /// surviving element.
    fn write_collection<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        clustering_key: &Composite,
        column_name: &[u8],
        collection: &CollectionMutation,
    ) -> Result<()> {
        self.write_range_tombstone(out, clustering_key, &[column_name], collection.tombstone)?;
        for (element_key, cell) in &collection.cells {
            self.write_column_name(
                out,
                clustering_key,
                &[column_name, element_key],
                CompositeMarker::None,
            )?;
            self.write_cell(out, cell)?;
        }
        Ok(())
    }

    /// Writes one clustered row: row marker first (compound schemas), then
    /// every cell in column-id order.
    fn write_clustered_row<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        schema: &Schema,
        row: &ClusteredRow,
    ) -> Result<()> {
        if row.deletion.is_some() {
            return Err(Error::NotImplemented("row-level deletion"));
        }

        let clustering_key = Composite::from_clustering(schema, &row.clustering_key)?;

        if schema.is_compound() {
            self.write_row_marker(out, row, &clustering_key)?;
        }

        for (&column_id, value) in &row.cells {
            let column = schema
                .regular_column_at(column_id)
                .ok_or_else(|| Error::BadEnumValue {
                    what: "regular column id",
                    value: column_id.to_string(),
                })?;
            match value {
                ColumnValue::Collection(collection) => {
                    self.write_collection(out, &clustering_key, &column.name, collection)?;
                }
                ColumnValue::Atomic(cell) => {
                    if schema.is_compound() {
                        self.write_column_name(
                            out,
                            &clustering_key,
                            &[&column.name],
                            CompositeMarker::None,
                        )?;
                    } else {
                        self.write_column_name_bare(out, &column.name)?;
                    }
                    self.write_cell(out, cell)?;
                }
            }
        }
        Ok(())
    }

    /// Writes the static row's cells under the static clustering prefix.
    fn write_static_row<W: SequentialWriter>(
        &mut self,
        out: &mut W,
        schema: &Schema,
        static_row: &BTreeMap<ColumnId, ColumnValue>,
    ) -> Result<()> {
        for (&column_id, value) in static_row {
            let column = schema
                .static_column_at(column_id)
                .ok_or_else(|| Error::BadEnumValue {
                    what: "static column id",
                    value: column_id.to_string(),
                })?;
            let static_prefix = Composite::static_prefix();
            match value {
                ColumnValue::Collection(collection) => {
                    self.write_collection(out, &static_prefix, &column.name, collection)?;
                }
                ColumnValue::Atomic(cell) => {
                    self.write_column_name(
                        out,
                        &static_prefix,
                        &[&column.name],
                        CompositeMarker::None,
                    )?;
                    self.write_cell(out, cell)?;
                }
            }
        }
        Ok(())
    }
}

fn update_cell_stats(stats: &mut ColumnStats, timestamp: i64) {
    stats.update_min_timestamp(timestamp);
    stats.update_max_timestamp(timestamp);
    stats.column_count += 1;
}

impl Drop for SsTable {
    fn drop(&mut self) {
        // Dropping the data/index handles closes them; close failures are not
        // observable at this point and are deliberately ignored.
        if self.marked_for_deletion {
            // Unlink every component file, best effort. A failure here is
            // only logged: the generation number is never reused and startup
            // sweeps leftover files again.
            for component in self.components.clone() {
                let path = self.filename(component);
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(
                        "failed to delete sstable file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }
}
