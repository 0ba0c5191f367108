//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing,
//! backing the `Filter.db` component of an sstable.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives). The false positive rate depends on the
//! number of bits and hash functions used.
//!
//! ## Usage in Atoll
//!
//! Every sealed sstable whose schema requests a false-positive chance below
//! 1.0 carries a filter built from its partition keys. During point lookups
//! the engine checks the filter first -- if it says "not present", the
//! sstable is skipped entirely, avoiding index and data file I/O.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(1000, 0.01);
//! bf.insert(b"hello");
//! assert!(bf.may_contain(b"hello"));
//! ```

use std::io::{self, Read, Write};

/// A bloom filter backed by a vector of 64-bit words with `k` independent
/// hash functions.
///
/// Uses double hashing: `h(i) = h1 + i * h2` where `h1` and `h2` are derived
/// from FNV-1a with two different seeds.
pub struct BloomFilter {
    /// The bit vector, packed into 64-bit words.
    words: Vec<u64>,
    /// Number of hash functions (k).
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a new bloom filter sized for `expected_items` with the given
    /// target `false_positive_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0 or `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: u64, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        // Optimal number of bits: m = -n * ln(p) / (ln(2)^2)
        let n = expected_items as f64;
        let m = (-n * false_positive_rate.ln() / (std::f64::consts::LN_2.powi(2))).ceil() as u64;
        let m = m.max(64);

        // Optimal number of hashes: k = (m/n) * ln(2)
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        let word_len = ((m + 63) / 64) as usize;

        Self {
            words: vec![0u64; word_len],
            num_hashes: k,
        }
    }

    /// Creates a bloom filter from raw parts (used during deserialization).
    fn from_raw(words: Vec<u64>, num_hashes: u32) -> Self {
        Self { words, num_hashes }
    }

    /// Inserts a key into the bloom filter.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let bit_idx = self.bit_index(h1, h2, i);
            self.set_bit(bit_idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let bit_idx = self.bit_index(h1, h2, i);
            if !self.get_bit(bit_idx) {
                return false;
            }
        }
        true
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.words.len() as u64 * 64
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns the size of the serialized filter in bytes.
    ///
    /// Layout: `num_hashes(u32) + word_count(u32) + words`.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        4 + 4 + self.words.len() * 8
    }

    /// Serializes the bloom filter to a writer.
    ///
    /// Wire format (all big-endian):
    /// ```text
    /// [num_hashes: u32][word_count: u32][words: u64 each]
    /// ```
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.num_hashes.to_be_bytes())?;
        w.write_all(&(self.words.len() as u32).to_be_bytes())?;
        for word in &self.words {
            w.write_all(&word.to_be_bytes())?;
        }
        Ok(())
    }

    /// Deserializes a bloom filter from a reader.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf8 = [0u8; 8];
        let mut buf4 = [0u8; 4];

        r.read_exact(&mut buf4)?;
        let num_hashes = u32::from_be_bytes(buf4);

        r.read_exact(&mut buf4)?;
        let word_count = u32::from_be_bytes(buf4) as usize;

        // Safety cap: the bitset should not exceed 128 MiB
        const MAX_FILTER_WORDS: usize = 16 * 1024 * 1024;
        if word_count > MAX_FILTER_WORDS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bloom filter too large: {} words", word_count),
            ));
        }

        let mut words = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            r.read_exact(&mut buf8)?;
            words.push(u64::from_be_bytes(buf8));
        }

        Ok(Self::from_raw(words, num_hashes))
    }

    // ---- Internal helpers ----

    /// Double hashing: h(i) = (h1 + i * h2) mod num_bits.
    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits()
    }

    fn set_bit(&mut self, idx: u64) {
        let word_idx = (idx / 64) as usize;
        let bit_offset = idx % 64;
        self.words[word_idx] |= 1 << bit_offset;
    }

    fn get_bit(&self, idx: u64) -> bool {
        let word_idx = (idx / 64) as usize;
        let bit_offset = idx % 64;
        (self.words[word_idx] >> bit_offset) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits())
            .field("num_hashes", &self.num_hashes)
            .finish()
    }
}

/// Computes two independent 64-bit hashes using FNV-1a with different seeds.
fn hash_pair(key: &[u8]) -> (u64, u64) {
    let h1 = fnv1a_64(key, 0xcbf29ce484222325);
    let h2 = fnv1a_64(key, 0x517cc1b727220a95);
    (h1, h2)
}

/// FNV-1a 64-bit hash with a configurable starting basis.
fn fnv1a_64(data: &[u8], basis: u64) -> u64 {
    const FNV_PRIME: u64 = 0x00000100000001b3;
    let mut hash = basis;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
