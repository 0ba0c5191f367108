//! The slice of the schema abstraction the table engine needs: column
//! definitions by id, compoundness, and the per-table flush parameters.

use crate::compress::CompressionParams;

/// Index of a column within its kind (static or regular).
pub type ColumnId = u32;

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Raw column name bytes as they appear in cell names.
    pub name: Vec<u8>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into() }
    }
}

/// Table schema as seen by the flush and load paths.
#[derive(Debug, Clone)]
pub struct Schema {
    compound: bool,
    static_columns: Vec<ColumnDefinition>,
    regular_columns: Vec<ColumnDefinition>,
    partitioner: String,
    bloom_filter_fp_chance: f64,
    compression: CompressionParams,
}

impl Schema {
    pub fn new(
        compound: bool,
        static_columns: Vec<ColumnDefinition>,
        regular_columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            compound,
            static_columns,
            regular_columns,
            partitioner: "org.apache.cassandra.dht.Murmur3Partitioner".to_string(),
            bloom_filter_fp_chance: 0.01,
            compression: CompressionParams::none(),
        }
    }

    /// Whether cell names are composites of clustering key plus column name.
    pub fn is_compound(&self) -> bool {
        self.compound
    }

    pub fn static_column_at(&self, id: ColumnId) -> Option<&ColumnDefinition> {
        self.static_columns.get(id as usize)
    }

    pub fn regular_column_at(&self, id: ColumnId) -> Option<&ColumnDefinition> {
        self.regular_columns.get(id as usize)
    }

    pub fn partitioner_name(&self) -> &str {
        &self.partitioner
    }

    pub fn set_partitioner(&mut self, name: impl Into<String>) {
        self.partitioner = name.into();
    }

    /// Target false-positive chance for the bloom filter; 1.0 disables the
    /// Filter component entirely.
    pub fn bloom_filter_fp_chance(&self) -> f64 {
        self.bloom_filter_fp_chance
    }

    pub fn set_bloom_filter_fp_chance(&mut self, chance: f64) {
        self.bloom_filter_fp_chance = chance;
    }

    pub fn compressor_params(&self) -> &CompressionParams {
        &self.compression
    }

    pub fn set_compressor_params(&mut self, params: CompressionParams) {
        self.compression = params;
    }
}
