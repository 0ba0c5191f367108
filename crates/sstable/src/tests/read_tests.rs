use std::fs;
use std::fs::OpenOptions;

use tempfile::tempdir;

use super::helpers::{compound_schema, flush_range};
use crate::error::Error;
use crate::metadata::{MetadataRecord, MetadataType};
use crate::{ComponentType, SsTable};

#[test]
fn load_recovers_everything_the_flush_wrote() {
    let dir = tempdir().unwrap();
    let flushed = flush_range(dir.path(), 3, 300, &compound_schema());
    let flushed_components: Vec<ComponentType> = flushed.components().collect();

    let mut sst = SsTable::new(dir.path(), 3);
    sst.load().unwrap();

    let loaded_components: Vec<ComponentType> = sst.components().collect();
    assert_eq!(loaded_components, flushed_components);

    assert_eq!(sst.summary().header.size, 3);
    assert_eq!(sst.summary().header.min_index_interval, 128);
    assert_eq!(sst.first_key(), b"k000");
    assert_eq!(sst.last_key(), b"k299");
    assert!(sst.data_size() > 0);

    match sst.statistics().get(MetadataType::Validation) {
        Some(MetadataRecord::Validation(validation)) => {
            assert_eq!(
                validation.partitioner,
                b"org.apache.cassandra.dht.Murmur3Partitioner"
            );
            assert_eq!(validation.filter_chance, 0.01);
        }
        other => panic!("missing validation metadata: {:?}", other),
    }

    // The loaded filter answers for every key that was flushed.
    let filter = sst.filter().expect("filter should be present");
    for i in 0..300 {
        assert!(filter.may_contain(format!("k{:03}", i).as_bytes()));
    }
}

#[test]
fn loaded_stats_cover_the_flushed_partitions() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 42, &compound_schema());

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();

    match sst.statistics().get(MetadataType::Stats) {
        Some(MetadataRecord::Stats(stats)) => {
            assert_eq!(stats.estimated_row_size.count(), 42);
            assert_eq!(stats.estimated_column_count.count(), 42);
            assert_eq!(stats.min_timestamp, 0);
            assert_eq!(stats.max_timestamp, 41);
            assert_eq!(stats.compression_ratio, -1.0);
        }
        other => panic!("missing stats metadata: {:?}", other),
    }
}

#[test]
fn read_indexes_stops_silently_at_truncation() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 5, &compound_schema());

    // Each record is 2 + 4 (key "kNNN") + 8 + 4 = 18 bytes; cut the file in
    // the middle of the third record.
    let index_path = SsTable::new(dir.path(), 1).filename(ComponentType::Index);
    let file = OpenOptions::new().write(true).open(&index_path).unwrap();
    file.set_len(2 * 18 + 9).unwrap();
    drop(file);

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();
    let entries = sst.read_indexes(0, 1000).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, b"k000");
    assert_eq!(entries[1].key, b"k001");
}

#[test]
fn read_indexes_window_honors_position_and_quantity() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 10, &compound_schema());

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();

    // Start at the third record (18 bytes each) and take two.
    let entries = sst.read_indexes(2 * 18, 2).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, b"k002");
    assert_eq!(entries[1].key, b"k003");
}

#[test]
fn unknown_metadata_kind_is_tolerated_on_load() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 10, &compound_schema());

    // Rewrite Statistics.db with a fourth hash entry of an unknown kind.
    // Growing the hash by 8 bytes shifts every record offset by 8.
    let path = SsTable::new(dir.path(), 1).filename(ComponentType::Statistics);
    let bytes = fs::read(&path).unwrap();
    let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    assert_eq!(count, 3);

    let mut patched = Vec::new();
    patched.extend_from_slice(&(count as u32 + 1).to_be_bytes());
    for i in 0..count {
        let base = 4 + i * 8;
        let kind = u32::from_be_bytes(bytes[base..base + 4].try_into().unwrap());
        let offset = u32::from_be_bytes(bytes[base + 4..base + 8].try_into().unwrap());
        patched.extend_from_slice(&kind.to_be_bytes());
        patched.extend_from_slice(&(offset + 8).to_be_bytes());
    }
    patched.extend_from_slice(&99u32.to_be_bytes()); // unknown kind
    patched.extend_from_slice(&(bytes.len() as u32 + 8).to_be_bytes()); // unused bytes
    patched.extend_from_slice(&bytes[4 + count * 8..]);
    fs::write(&path, patched).unwrap();

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();
    assert_eq!(sst.statistics().offsets.len(), 4);
    assert_eq!(sst.statistics().contents.len(), 3);
    assert!(sst.statistics().get(MetadataType::Stats).is_some());
}

#[test]
fn missing_toc_is_not_found() {
    let dir = tempdir().unwrap();
    let mut sst = SsTable::new(dir.path(), 1);
    match sst.load() {
        Err(Error::NotFound { path }) => {
            assert!(path.ends_with("la-1-big-TOC.txt"));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn empty_toc_is_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("la-1-big-TOC.txt"), "").unwrap();

    let mut sst = SsTable::new(dir.path(), 1);
    assert!(matches!(sst.load(), Err(Error::EmptyToc)));
}

#[test]
fn unknown_toc_component_is_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("la-1-big-TOC.txt"), "Data.db\nBogus.db\n").unwrap();

    let mut sst = SsTable::new(dir.path(), 1);
    match sst.load() {
        Err(Error::UnknownComponent(name)) => assert_eq!(name, "Bogus.db"),
        other => panic!("expected UnknownComponent, got {:?}", other),
    }
}

#[test]
fn oversize_toc_is_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("la-1-big-TOC.txt"), vec![b'\n'; 5000]).unwrap();

    let mut sst = SsTable::new(dir.path(), 1);
    match sst.load() {
        Err(Error::Oversize { size }) => assert_eq!(size, 5000),
        other => panic!("expected Oversize, got {:?}", other),
    }
}

#[test]
fn listed_but_missing_component_is_not_found() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 5, &compound_schema());
    let summary_path = SsTable::new(dir.path(), 1).filename(ComponentType::Summary);
    fs::remove_file(&summary_path).unwrap();

    let mut sst = SsTable::new(dir.path(), 1);
    match sst.load() {
        Err(Error::NotFound { path }) => assert_eq!(path, summary_path),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn data_read_returns_raw_bytes() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 5, &compound_schema());

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();

    let raw = fs::read(sst.filename(ComponentType::Data)).unwrap();
    assert_eq!(sst.data_read(0, 16).unwrap()[..], raw[..16]);
    assert_eq!(sst.data_read(3, 7).unwrap()[..], raw[3..10]);
    // A read past the end comes back short.
    let tail = sst.data_read(raw.len() as u64 - 4, 100).unwrap();
    assert_eq!(tail[..], raw[raw.len() - 4..]);
}

#[test]
fn marked_for_deletion_unlinks_components_on_drop() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 5, &compound_schema());

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();
    let paths: Vec<_> = sst.components().map(|c| sst.filename(c)).collect();
    assert!(paths.iter().all(|p| p.exists()));

    sst.mark_for_deletion();
    drop(sst);
    assert!(paths.iter().all(|p| !p.exists()));
}
