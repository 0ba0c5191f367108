use std::fs;

use crc32fast::Hasher as Crc32;
use tempfile::tempdir;

use super::helpers::{compound_schema, flush_range, simple_partition};
use crate::compress::CompressionParams;
use crate::error::Error;
use crate::mutation::{
    Cell, ClusteredRow, CollectionMutation, ColumnValue, Partition, RangeTombstone, Tombstone,
};
use crate::schema::{ColumnDefinition, Schema};
use crate::{ComponentType, SsTable};

#[test]
fn trivial_flush_byte_layout() {
    let dir = tempdir().unwrap();
    let schema = Schema::new(true, vec![], vec![ColumnDefinition::new("c")]);
    let partition = simple_partition(b"k", 42, &[0x01, 0x02]);

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &schema)
        .unwrap();

    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();
    let expected: Vec<u8> = vec![
        0x00, 0x01, b'k', // partition key
        0x7f, 0xff, 0xff, 0xff, // live local deletion time
        0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // live marked-for-delete
        0x00, 0x04, 0x00, 0x01, b'c', 0x00, // composite column name
        0x00, // live mask
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, // timestamp 42
        0x00, 0x00, 0x00, 0x02, 0x01, 0x02, // value
        0x00, 0x00, // end-of-row marker
    ];
    assert_eq!(data, expected);

    // One index record: the key at data offset 0, promoted-index size 0.
    let index = fs::read(sst.filename(ComponentType::Index)).unwrap();
    assert_eq!(
        index,
        vec![0x00, 0x01, b'k', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    );

    assert_eq!(sst.summary().entry_count(), 1);
    assert_eq!(sst.first_key(), b"k");
    assert_eq!(sst.last_key(), b"k");

    // The digest is the decimal CRC of the data file.
    let mut hasher = Crc32::new();
    hasher.update(&data);
    let digest = fs::read_to_string(sst.filename(ComponentType::Digest)).unwrap();
    assert_eq!(digest.parse::<u32>().unwrap(), hasher.finalize());

    // The TOC lists exactly the present components.
    let toc = fs::read_to_string(sst.filename(ComponentType::Toc)).unwrap();
    let mut listed: Vec<&str> = toc.lines().collect();
    listed.sort_unstable();
    let mut expected_toc = vec![
        "CRC.db",
        "Data.db",
        "Digest.sha1",
        "Filter.db",
        "Index.db",
        "Statistics.db",
        "Summary.db",
        "TOC.txt",
    ];
    expected_toc.sort_unstable();
    assert_eq!(listed, expected_toc);
}

#[test]
fn flush_samples_every_128th_partition() {
    let dir = tempdir().unwrap();
    let sst = flush_range(dir.path(), 1, 300, &compound_schema());

    let summary = sst.summary();
    assert_eq!(summary.header.size, 3);
    assert_eq!(summary.entry(0).unwrap().key, b"k000");
    assert_eq!(summary.entry(1).unwrap().key, b"k128");
    assert_eq!(summary.entry(2).unwrap().key, b"k256");
    assert_eq!(sst.first_key(), b"k000");
    assert_eq!(sst.last_key(), b"k299");
}

#[test]
fn uncompressed_flush_has_crc_not_compression_info() {
    let dir = tempdir().unwrap();
    let sst = flush_range(dir.path(), 1, 10, &compound_schema());

    assert!(sst.has_component(ComponentType::Crc));
    assert!(!sst.has_component(ComponentType::CompressionInfo));
    assert!(sst.filename(ComponentType::Crc).exists());
    assert!(!sst.filename(ComponentType::CompressionInfo).exists());
}

#[test]
fn compressed_flush_has_compression_info_not_crc() {
    let dir = tempdir().unwrap();
    let mut schema = compound_schema();
    schema.set_compressor_params(CompressionParams::snappy(4096));
    let sst = flush_range(dir.path(), 1, 10, &schema);

    assert!(sst.has_component(ComponentType::CompressionInfo));
    assert!(!sst.has_component(ComponentType::Crc));
    assert!(sst.filename(ComponentType::CompressionInfo).exists());
    assert!(!sst.filename(ComponentType::Crc).exists());
}

#[test]
fn compressed_data_reads_back_identical() {
    let plain_dir = tempdir().unwrap();
    let snappy_dir = tempdir().unwrap();

    let schema = compound_schema();
    flush_range(plain_dir.path(), 1, 200, &schema);

    let mut snappy_schema = compound_schema();
    snappy_schema.set_compressor_params(CompressionParams::snappy(512));
    flush_range(snappy_dir.path(), 1, 200, &snappy_schema);

    let plain_bytes = fs::read(
        SsTable::new(plain_dir.path(), 1).filename(ComponentType::Data),
    )
    .unwrap();

    let mut sst = SsTable::new(snappy_dir.path(), 1);
    sst.load().unwrap();
    assert_eq!(sst.data_size(), plain_bytes.len() as u64);

    let read_back = sst.data_read(0, plain_bytes.len()).unwrap();
    assert_eq!(read_back, plain_bytes);

    // A read in the middle of a chunk boundary also matches.
    let middle = sst.data_read(700, 1000).unwrap();
    assert_eq!(middle[..], plain_bytes[700..1700]);
}

#[test]
fn no_filter_when_fp_chance_is_one() {
    let dir = tempdir().unwrap();
    let mut schema = compound_schema();
    schema.set_bloom_filter_fp_chance(1.0);
    let sst = flush_range(dir.path(), 1, 10, &schema);

    assert!(!sst.has_component(ComponentType::Filter));
    assert!(sst.filter().is_none());
    assert!(!sst.filename(ComponentType::Filter).exists());
}

#[test]
fn empty_flush_produces_valid_table() {
    let dir = tempdir().unwrap();
    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::empty(), 0, &compound_schema())
        .unwrap();

    assert_eq!(sst.summary().entry_count(), 0);
    assert!(sst.first_key().is_empty());

    let mut reloaded = SsTable::new(dir.path(), 1);
    reloaded.load().unwrap();
    assert_eq!(reloaded.summary().entry_count(), 0);
    assert_eq!(reloaded.data_size(), 0);
}

#[test]
fn counter_cells_are_not_implemented() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    let mut row = ClusteredRow::default();
    row.cells.insert(
        0,
        ColumnValue::Atomic(Cell::Counter {
            timestamp: 1,
            value: vec![0; 8],
        }),
    );
    partition.rows.push(row);

    let mut sst = SsTable::new(dir.path(), 1);
    let err = sst
        .write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap_err();
    assert!(matches!(err, Error::NotImplemented("counter cells")));
}

#[test]
fn row_level_deletion_is_not_implemented() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    partition.rows.push(ClusteredRow {
        deletion: Some(Tombstone {
            timestamp: 1,
            deletion_time: 2,
        }),
        ..Default::default()
    });

    let mut sst = SsTable::new(dir.path(), 1);
    let err = sst
        .write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap_err();
    assert!(matches!(err, Error::NotImplemented("row-level deletion")));
}

#[test]
fn row_marker_precedes_cells_in_compound_rows() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    let mut row = ClusteredRow {
        clustering_key: vec![b"ck".to_vec()],
        created_at: Some(7),
        ..Default::default()
    };
    row.cells.insert(
        0,
        ColumnValue::Atomic(Cell::Live {
            timestamp: 7,
            value: b"v".to_vec(),
        }),
    );
    partition.rows.push(row);

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap();
    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();

    // Row marker: clustering key + empty component, live mask, timestamp,
    // zero-length value.
    let marker: &[u8] = &[
        0x00, 0x08, 0x00, 0x02, b'c', b'k', 0x00, 0x00, 0x00, 0x00, // name
        0x00, // mask
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, // timestamp
        0x00, 0x00, 0x00, 0x00, // value length 0
    ];
    let pos = data
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("row marker not found");

    // The first cell's composite name follows directly.
    let cell_name: &[u8] = &[0x00, 0x09, 0x00, 0x02, b'c', b'k', 0x00, 0x00, 0x01, b'c', 0x00];
    assert_eq!(&data[pos + marker.len()..pos + marker.len() + cell_name.len()], cell_name);
}

#[test]
fn range_tombstone_bounds_carry_markers() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    partition.range_tombstones.push(RangeTombstone {
        prefix: vec![b"ck".to_vec()],
        tombstone: Tombstone {
            timestamp: 5,
            deletion_time: 100,
        },
    });

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap();
    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();

    // Start bound (marker replaces the prefix's end-of-component byte), the
    // range-tombstone mask, end bound, then deletion time and timestamp.
    let expected: &[u8] = &[
        0x00, 0x05, 0x00, 0x02, b'c', b'k', 0xff, // start bound
        0x10, // range tombstone mask
        0x00, 0x05, 0x00, 0x02, b'c', b'k', 0x01, // end bound
        0x00, 0x00, 0x00, 0x64, // deletion time 100
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, // timestamp 5
    ];
    assert!(
        data.windows(expected.len()).any(|w| w == expected),
        "range tombstone bytes not found in data file"
    );
}

#[test]
fn static_cells_use_the_static_prefix() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    partition.static_row.insert(
        0,
        ColumnValue::Atomic(Cell::Live {
            timestamp: 3,
            value: b"sv".to_vec(),
        }),
    );

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap();
    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();

    // Static column name: 0xffff prefix then the composite for column "s".
    let expected: &[u8] = &[0x00, 0x06, 0xff, 0xff, 0x00, 0x01, b's', 0x00];
    assert!(
        data.windows(expected.len()).any(|w| w == expected),
        "static prefix bytes not found in data file"
    );
}

#[test]
fn collection_cells_follow_their_tombstone() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    let mut row = ClusteredRow {
        clustering_key: vec![b"ck".to_vec()],
        ..Default::default()
    };
    row.cells.insert(
        1, // column "d"
        ColumnValue::Collection(CollectionMutation {
            tombstone: Some(Tombstone {
                timestamp: 9,
                deletion_time: 50,
            }),
            cells: vec![(
                b"e1".to_vec(),
                Cell::Live {
                    timestamp: 10,
                    value: b"ev".to_vec(),
                },
            )],
        }),
    );
    partition.rows.push(row);

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap();
    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();

    // The covering tombstone's start bound: clustering key + column name,
    // with the start-range marker on the last component.
    let bound: &[u8] = &[0x00, 0x09, 0x00, 0x02, b'c', b'k', 0x00, 0x00, 0x01, b'd', 0xff];
    let bound_pos = data
        .windows(bound.len())
        .position(|w| w == bound)
        .expect("collection tombstone bound not found");

    // The element cell's name: clustering key + column name + element key.
    let element: &[u8] = &[
        0x00, 0x0e, 0x00, 0x02, b'c', b'k', 0x00, 0x00, 0x01, b'd', 0x00, 0x00, 0x02, b'e',
        b'1', 0x00,
    ];
    let element_pos = data
        .windows(element.len())
        .position(|w| w == element)
        .expect("collection element cell not found");
    assert!(bound_pos < element_pos);
}

#[test]
fn partition_tombstone_is_recorded() {
    let dir = tempdir().unwrap();
    let mut partition = Partition::new(b"k".to_vec());
    partition.tombstone = Some(Tombstone {
        timestamp: 123,
        deletion_time: 456,
    });

    let mut sst = SsTable::new(dir.path(), 1);
    sst.write_components(std::iter::once(partition), 1, &compound_schema())
        .unwrap();
    let data = fs::read(sst.filename(ComponentType::Data)).unwrap();

    // Key, then (local_deletion_time, marked_for_delete_at).
    let mut expected = vec![0x00, 0x01, b'k'];
    expected.extend_from_slice(&456i32.to_be_bytes());
    expected.extend_from_slice(&123i64.to_be_bytes());
    assert_eq!(data[..expected.len()], expected[..]);
}

#[test]
fn index_offsets_track_data_offsets() {
    let dir = tempdir().unwrap();
    flush_range(dir.path(), 1, 50, &compound_schema());

    let mut sst = SsTable::new(dir.path(), 1);
    sst.load().unwrap();
    let entries = sst.read_indexes(0, 1000).unwrap();
    assert_eq!(entries.len(), 50);

    assert_eq!(entries[0].position, 0);
    for pair in entries.windows(2) {
        assert!(pair[0].key < pair[1].key);
        assert!(pair[0].position < pair[1].position);
    }
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.key, format!("k{:03}", i).as_bytes());
    }
}
