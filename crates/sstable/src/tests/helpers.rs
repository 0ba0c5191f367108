use std::io::Cursor;
use std::path::Path;

use crate::codec::Encode;
use crate::mutation::{Cell, ClusteredRow, ColumnValue, Partition};
use crate::reader::RandomAccessReader;
use crate::schema::{ColumnDefinition, Schema};
use crate::SsTable;

/// A compound schema with one static column `s` and regular columns `c`, `d`.
pub fn compound_schema() -> Schema {
    Schema::new(
        true,
        vec![ColumnDefinition::new("s")],
        vec![ColumnDefinition::new("c"), ColumnDefinition::new("d")],
    )
}

pub fn live_cell(timestamp: i64, value: &[u8]) -> ColumnValue {
    ColumnValue::Atomic(Cell::Live {
        timestamp,
        value: value.to_vec(),
    })
}

/// A partition with a single clustering-less row holding one live cell in
/// column 0.
pub fn simple_partition(key: &[u8], timestamp: i64, value: &[u8]) -> Partition {
    let mut partition = Partition::new(key);
    let mut row = ClusteredRow::default();
    row.cells.insert(0, live_cell(timestamp, value));
    partition.rows.push(row);
    partition
}

/// Partitions keyed `k000`, `k001`, ... in partitioner order.
pub fn key_range_partitions(count: usize) -> Vec<Partition> {
    (0..count)
        .map(|i| simple_partition(format!("k{:03}", i).as_bytes(), i as i64, b"v"))
        .collect()
}

/// Flushes `count` generated partitions into `dir` as `generation`.
pub fn flush_range(dir: &Path, generation: u64, count: usize, schema: &Schema) -> SsTable {
    let mut sst = SsTable::new(dir, generation);
    sst.write_components(
        key_range_partitions(count).into_iter(),
        count as u64,
        schema,
    )
    .unwrap();
    sst
}

pub fn encode_to_vec<T: Encode>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf).unwrap();
    buf
}

pub fn reader_over(bytes: Vec<u8>) -> RandomAccessReader<Cursor<Vec<u8>>> {
    RandomAccessReader::new(Cursor::new(bytes), 4096).unwrap()
}
