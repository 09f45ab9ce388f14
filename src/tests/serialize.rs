use std::net::IpAddr;

use crate::tests::bare_options;
use crate::tests::decode::decode_value;
use crate::{Tree, Value};

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Byte offset where the data section begins: right after the node section and its
/// 16-byte zero separator.
fn data_section_start(out: &[u8]) -> usize {
    let separator = [0u8; 16];
    let node_section_len = out.windows(16).position(|w| w == separator).expect("separator not found");
    node_section_len + 16
}

fn record_bytes(record_size: u8) -> usize {
    match record_size {
        24 => 6,
        28 => 7,
        32 => 8,
        other => panic!("unsupported record_size {other}"),
    }
}

#[test]
fn write_to_reports_the_exact_byte_count_written() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 32, Value::from("hello")).unwrap();

    let mut out = Vec::new();
    let written = tree.write_to(&mut out).unwrap();
    assert_eq!(written as usize, out.len());
}

#[test]
fn write_to_finalizes_automatically() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 32, Value::from("hello")).unwrap();
    assert!(!tree.is_finalized());

    let mut out = Vec::new();
    tree.write_to(&mut out).unwrap();
    assert!(tree.is_finalized());
}

#[test]
fn node_section_is_sized_by_record_size_and_node_count() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 32, Value::from("hello")).unwrap();

    let mut out = Vec::new();
    tree.write_to(&mut out).unwrap();

    // The node section ends where the 16 zero separator bytes begin.
    let separator = [0u8; 16];
    let node_section_len = out.windows(16).position(|w| w == separator).expect("separator not found");
    assert_eq!(node_section_len % record_bytes(tree.options().record_size), 0);
}

#[test]
fn metadata_sentinel_is_present_after_the_data_section() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 32, Value::from("hello")).unwrap();

    let mut out = Vec::new();
    tree.write_to(&mut out).unwrap();

    let sentinel = b"\xAB\xCD\xEFMaxMind.com";
    assert!(out.windows(sentinel.len()).any(|w| w == sentinel));
}

/// A repeated nested value inside one stored `Value` is pointer-deduplicated, so the
/// data section is smaller than an otherwise-identical tree whose nested values
/// differ (and therefore can't share an encoding).
#[test]
fn repeated_nested_value_shrinks_the_data_section() {
    let mut with_repeat = Tree::new(bare_options()).unwrap();
    with_repeat
        .insert(addr("2003::"), 32, Value::Slice(vec![Value::from("dup"), Value::from("dup")]))
        .unwrap();

    let mut without_repeat = Tree::new(bare_options()).unwrap();
    without_repeat
        .insert(addr("2003::"), 32, Value::Slice(vec![Value::from("dup"), Value::from("xyz")]))
        .unwrap();

    let mut repeat_out = Vec::new();
    let mut plain_out = Vec::new();
    with_repeat.write_to(&mut repeat_out).unwrap();
    without_repeat.write_to(&mut plain_out).unwrap();

    assert!(repeat_out.len() < plain_out.len());
}

/// A tree with exactly one inserted network writes exactly one value into the data
/// section, so decoding from its first byte recovers that value whole, with nothing
/// left over before the metadata sentinel.
fn round_trip_single_value(value: Value) -> Value {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 32, value).unwrap();

    let mut out = Vec::new();
    tree.write_to(&mut out).unwrap();

    let start = data_section_start(&out);
    let (decoded, next) = decode_value(&out, start);

    let sentinel = b"\xAB\xCD\xEFMaxMind.com";
    let sentinel_start = out.windows(sentinel.len()).position(|w| w == sentinel).expect("sentinel not found");
    assert_eq!(next, sentinel_start, "decoded value did not consume exactly the data section");

    decoded
}

/// A repeated `bool` is only 2 bytes encoded, smaller than any pointer to it, so the
/// second occurrence must be re-encoded inline rather than replaced with a pointer.
/// This is exactly the case where writing nothing for the second occurrence would
/// desync the slice's byte stream.
#[test]
fn repeated_short_bool_round_trips_without_corruption() {
    let value = Value::Slice(vec![Value::Bool(true), Value::Bool(true)]);
    assert_eq!(round_trip_single_value(value.clone()), value);
}

/// Same shape of bug, with a small `uint16` instead of a `bool`.
#[test]
fn repeated_short_uint16_round_trips_without_corruption() {
    let value = Value::Slice(vec![Value::Uint16(100), Value::Uint16(100)]);
    assert_eq!(round_trip_single_value(value.clone()), value);
}

/// `write_to` accepts any `io::Write`, including a real file; this exercises that
/// path end to end instead of only ever writing into an in-memory `Vec<u8>`.
#[test]
fn write_to_round_trips_through_a_real_file() {
    let mut tree = Tree::new(bare_options()).unwrap();
    let value = Value::Slice(vec![Value::Uint16(100), Value::Uint16(100)]);
    tree.insert(addr("2003::"), 32, value.clone()).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    let written = tree.write_to(&mut file).unwrap();

    let on_disk = std::fs::read(file.path()).unwrap();
    assert_eq!(on_disk.len() as u64, written);

    let start = data_section_start(&on_disk);
    let (decoded, _) = decode_value(&on_disk, start);
    assert_eq!(decoded, value);
}
