use byteorder::{BigEndian, WriteBytesExt};

use super::helpers::{encode_to_vec, reader_over};
use crate::checksum::Checksum;
use crate::codec::{self, Decode};
use crate::compress::Compression;
use crate::error::Error;
use crate::index::{write_index_entry, IndexEntry};
use crate::mutation::DeletionTime;

#[test]
fn integers_roundtrip_big_endian() {
    let mut buf = Vec::new();
    buf.write_u8(0xab).unwrap();
    buf.write_u16::<BigEndian>(0x1234).unwrap();
    buf.write_u32::<BigEndian>(0xdead_beef).unwrap();
    buf.write_u64::<BigEndian>(0x0123_4567_89ab_cdef).unwrap();
    buf.write_i32::<BigEndian>(-7).unwrap();
    buf.write_i64::<BigEndian>(i64::MIN).unwrap();

    let mut src = reader_over(buf);
    assert_eq!(codec::get_u8(&mut src).unwrap(), 0xab);
    assert_eq!(codec::get_u16(&mut src).unwrap(), 0x1234);
    assert_eq!(codec::get_u32(&mut src).unwrap(), 0xdead_beef);
    assert_eq!(codec::get_u64(&mut src).unwrap(), 0x0123_4567_89ab_cdef);
    assert_eq!(codec::get_i32(&mut src).unwrap(), -7);
    assert_eq!(codec::get_i64(&mut src).unwrap(), i64::MIN);
}

#[test]
fn short_stream_is_buffer_undersize() {
    let mut src = reader_over(vec![0x01, 0x02]);
    match codec::get_u32(&mut src) {
        Err(Error::BufferUndersize { got, expected }) => {
            assert_eq!(got, 2);
            assert_eq!(expected, 4);
        }
        other => panic!("expected BufferUndersize, got {:?}", other),
    }
    assert!(src.eof());
}

#[test]
fn doubles_travel_as_bit_patterns() {
    let mut buf = Vec::new();
    codec::put_f64(&mut buf, 0.01).unwrap();
    assert_eq!(buf, 0.01f64.to_bits().to_be_bytes());

    let mut src = reader_over(buf);
    assert_eq!(codec::get_f64(&mut src).unwrap(), 0.01);
}

#[test]
fn bools_are_single_bytes() {
    let mut buf = Vec::new();
    codec::put_bool(&mut buf, true).unwrap();
    codec::put_bool(&mut buf, false).unwrap();
    assert_eq!(buf, [1, 0]);

    let mut src = reader_over(buf);
    assert!(codec::get_bool(&mut src).unwrap());
    assert!(!codec::get_bool(&mut src).unwrap());
}

#[test]
fn str16_roundtrip() {
    let mut buf = Vec::new();
    codec::put_str16(&mut buf, b"hello").unwrap();
    assert_eq!(buf[..2], [0x00, 0x05]);

    let mut src = reader_over(buf);
    assert_eq!(codec::get_str16(&mut src).unwrap(), b"hello");
}

#[test]
fn str16_overflow_is_rejected() {
    let payload = vec![0u8; 65536];
    let mut buf = Vec::new();
    match codec::put_str16(&mut buf, &payload) {
        Err(Error::Overflow { value, width }) => {
            assert_eq!(value, 65536);
            assert_eq!(width, 16);
        }
        other => panic!("expected Overflow, got {:?}", other),
    }
    // Nothing must have been written before the check fired.
    assert!(buf.is_empty());
}

#[test]
fn str32_accepts_what_str16_rejects() {
    let payload = vec![7u8; 65536];
    let mut buf = Vec::new();
    codec::put_str32(&mut buf, &payload).unwrap();

    let mut src = reader_over(buf);
    assert_eq!(codec::get_str32(&mut src).unwrap(), payload);
}

#[test]
fn packed_arrays_roundtrip() {
    let mut buf = Vec::new();
    codec::put_packed_u32(&mut buf, &[1, 2, 0xffff_ffff]).unwrap();
    codec::put_packed_u64(&mut buf, &[42, u64::MAX]).unwrap();

    let mut src = reader_over(buf);
    assert_eq!(
        codec::get_packed_u32(&mut src, 3).unwrap(),
        vec![1, 2, 0xffff_ffff]
    );
    assert_eq!(
        codec::get_packed_u64(&mut src, 2).unwrap(),
        vec![42, u64::MAX]
    );
}

#[test]
fn live_deletion_time_bytes() {
    let buf = encode_to_vec(&DeletionTime::LIVE);
    assert_eq!(
        buf,
        [0x7f, 0xff, 0xff, 0xff, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert!(DeletionTime::LIVE.is_live());
}

#[test]
fn deletion_time_roundtrip() {
    let d = DeletionTime {
        local_deletion_time: 1234,
        marked_for_delete_at: -99,
    };
    let mut src = reader_over(encode_to_vec(&d));
    assert_eq!(DeletionTime::decode(&mut src).unwrap(), d);
}

#[test]
fn index_entry_roundtrip() {
    let mut buf = Vec::new();
    write_index_entry(&mut buf, b"pk", 0xdead).unwrap();

    let mut src = reader_over(buf);
    let entry = IndexEntry::decode(&mut src).unwrap();
    assert_eq!(entry.key, b"pk");
    assert_eq!(entry.position, 0xdead);
    assert!(entry.promoted_index.is_empty());
}

#[test]
fn checksum_roundtrip() {
    let record = Checksum {
        chunk_size: 32 * 1024,
        checksums: vec![1, 2, 3, 0xffff_ffff],
    };
    let mut src = reader_over(encode_to_vec(&record));
    assert_eq!(Checksum::decode(&mut src).unwrap(), record);
}

#[test]
fn compression_roundtrip() {
    let mut compression = Compression::default();
    compression.name = b"SnappyCompressor".to_vec();
    compression.options = vec![(b"crc_check_chance".to_vec(), b"1.0".to_vec())];
    compression.chunk_len = 65536;
    compression.data_len = 1_000_000;
    compression.offsets = vec![0, 4000, 8123];

    let mut src = reader_over(encode_to_vec(&compression));
    let parsed = Compression::decode(&mut src).unwrap();
    assert_eq!(parsed.name, compression.name);
    assert_eq!(parsed.options, compression.options);
    assert_eq!(parsed.chunk_len, compression.chunk_len);
    assert_eq!(parsed.data_len, compression.data_len);
    assert_eq!(parsed.offsets, compression.offsets);
}
