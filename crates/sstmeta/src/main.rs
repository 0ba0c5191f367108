//! # sstmeta - SSTable Inspector
//!
//! Loads one sstable generation from a directory and prints what the
//! metadata components say about it: the TOC, summary shape, key range,
//! validation and stats records, and compression layout. Useful for
//! debugging flush output and for eyeballing tables in production
//! directories.
//!
//! ## Usage
//!
//! ```text
//! $ sstmeta data/ks/tbl 5
//! sstable data/ks/tbl generation 5
//! components: Index.db Data.db TOC.txt Summary.db ...
//! summary: 3 entries (interval 128)
//! ...
//! ```
//!
//! Logging verbosity is controlled with `RUST_LOG` (e.g. `RUST_LOG=debug`).

use anyhow::{bail, Context, Result};
use sstable::metadata::{MetadataRecord, MetadataType};
use sstable::SsTable;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: sstmeta <directory> <generation>");
    }
    let dir = &args[1];
    let generation: u64 = args[2]
        .parse()
        .context("generation must be a decimal integer")?;

    let mut sst = SsTable::new(dir, generation);
    sst.load()
        .with_context(|| format!("failed to load sstable generation {} in {}", generation, dir))?;

    println!("sstable {} generation {}", dir, generation);

    print!("components:");
    for component in sst.components() {
        print!(" {}", component.file_suffix());
    }
    println!();

    let on_disk = sst.bytes_on_disk()?;
    println!("data size: {} bytes ({} on disk)", sst.data_size(), on_disk);

    let summary = sst.summary();
    println!(
        "summary: {} entries (interval {})",
        summary.entry_count(),
        summary.header.min_index_interval
    );
    println!("first key: {}", hex(sst.first_key()));
    println!("last key:  {}", hex(sst.last_key()));

    if let Some(MetadataRecord::Validation(validation)) =
        sst.statistics().get(MetadataType::Validation)
    {
        println!(
            "partitioner: {}",
            String::from_utf8_lossy(&validation.partitioner)
        );
        println!("bloom filter fp chance: {}", validation.filter_chance);
    }
    if let Some(MetadataRecord::Stats(stats)) = sst.statistics().get(MetadataType::Stats) {
        println!("partitions: {}", stats.estimated_row_size.count());
        println!(
            "timestamps: {} .. {}",
            stats.min_timestamp, stats.max_timestamp
        );
        println!("compression ratio: {}", stats.compression_ratio);
        println!(
            "level: {}, repaired at: {}",
            stats.sstable_level, stats.repaired_at
        );
    }
    if let Some(compression) = sst.compression() {
        println!(
            "compression: {} ({} chunks of {} bytes, {} -> {} bytes)",
            String::from_utf8_lossy(&compression.name),
            compression.offsets.len(),
            compression.chunk_len,
            compression.uncompressed_file_length(),
            compression.compressed_file_length(),
        );
    }

    Ok(())
}
