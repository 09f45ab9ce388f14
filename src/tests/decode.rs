//! A minimal, independent decoder for the control-byte format `encode.rs` writes.
//!
//! Kept deliberately separate from `encode.rs` (duplicating its tag table rather than
//! importing it) so that a bug shared between encoder and decoder can't cancel itself
//! out in a round-trip test -- the point is to check the bytes actually on the wire,
//! not to check that the encoder agrees with itself.

use std::collections::BTreeMap;

use crate::encode::decode_pointer;
use crate::value::Value;

const TAG_POINTER: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_UINT16: u8 = 5;
const TAG_UINT32: u8 = 6;
const TAG_MAP: u8 = 7;
const TAG_EXTENDED: u8 = 0;
const TAG_UINT64: u8 = 9;
const TAG_SLICE: u8 = 11;
const TAG_BOOL: u8 = 14;

const FIRST_SIZE: usize = 29;
const SECOND_SIZE: usize = FIRST_SIZE + 256;
const THIRD_SIZE: usize = SECOND_SIZE + (1 << 16);

/// Decode one value starting at `offset`, returning it plus the offset just past it.
/// Follows pointers transparently (the returned offset is past the pointer's own
/// bytes, not past whatever it points to).
pub(super) fn decode_value(buf: &[u8], offset: usize) -> (Value, usize) {
    let control = buf[offset];
    if control >> 5 == TAG_POINTER {
        let (target, total_len) = decode_pointer(control, &buf[offset + 1..]).expect("malformed pointer");
        let (value, _) = decode_value(buf, target as usize);
        return (value, offset + total_len);
    }

    let (tag, size, payload) = decode_control(buf, offset);
    match tag {
        TAG_STRING => {
            let s = String::from_utf8(buf[payload..payload + size].to_vec()).expect("valid utf8 string");
            (Value::String(s), payload + size)
        }
        TAG_BYTES => (Value::Bytes(buf[payload..payload + size].to_vec()), payload + size),
        TAG_UINT16 => (Value::Uint16(read_be(buf, payload, size) as u16), payload + size),
        TAG_UINT32 => (Value::Uint32(read_be(buf, payload, size) as u32), payload + size),
        TAG_UINT64 => (Value::Uint64(read_be(buf, payload, size)), payload + size),
        TAG_FLOAT64 => {
            let bytes: [u8; 8] = buf[payload..payload + 8].try_into().unwrap();
            (Value::Float64(f64::from_be_bytes(bytes)), payload + 8)
        }
        TAG_BOOL => (Value::Bool(size == 1), payload),
        TAG_MAP => {
            let mut next = payload;
            let mut entries = BTreeMap::new();
            for _ in 0..size {
                let (key, after_key) = decode_value(buf, next);
                let Value::String(key) = key else { panic!("map key was not a string") };
                let (value, after_value) = decode_value(buf, after_key);
                entries.insert(key, value);
                next = after_value;
            }
            (Value::Map(entries), next)
        }
        TAG_SLICE => {
            let mut next = payload;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                let (item, after) = decode_value(buf, next);
                items.push(item);
                next = after;
            }
            (Value::Slice(items), next)
        }
        other => panic!("test decoder does not support tag {other}"),
    }
}

fn decode_control(buf: &[u8], offset: usize) -> (u8, usize, usize) {
    let b0 = buf[offset];
    let tag_field = b0 >> 5;
    let (tag, size_class, header_len) = if tag_field == TAG_EXTENDED {
        (buf[offset + 1] + 7, b0 & 0x1F, 2)
    } else {
        (tag_field, b0 & 0x1F, 1)
    };

    let (size, extra_len) = match size_class {
        0..=28 => (size_class as usize, 0),
        29 => (FIRST_SIZE + buf[offset + header_len] as usize, 1),
        30 => {
            let hi = buf[offset + header_len] as usize;
            let lo = buf[offset + header_len + 1] as usize;
            (SECOND_SIZE + (hi << 8 | lo), 2)
        }
        _ => {
            let b0 = buf[offset + header_len] as usize;
            let b1 = buf[offset + header_len + 1] as usize;
            let b2 = buf[offset + header_len + 2] as usize;
            (THIRD_SIZE + (b0 << 16 | b1 << 8 | b2), 3)
        }
    };

    (tag, size, offset + header_len + extra_len)
}

fn read_be(buf: &[u8], start: usize, len: usize) -> u64 {
    buf[start..start + len].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
