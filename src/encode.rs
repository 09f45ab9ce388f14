//! Control-byte encoding for [`Value`](crate::value::Value), shared by the data
//! section writer (which deduplicates via pointers) and the plain metadata encoder
//! (which never does).

use byteorder::{BigEndian, ByteOrder};

use crate::error::{EncodingError, Result};
use crate::value::Value;

const TAG_POINTER: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_UINT16: u8 = 5;
const TAG_UINT32: u8 = 6;
const TAG_MAP: u8 = 7;
const TAG_EXTENDED: u8 = 0;
const TAG_INT32: u8 = 8;
const TAG_UINT64: u8 = 9;
const TAG_UINT128: u8 = 10;
const TAG_SLICE: u8 = 11;
const TAG_BOOL: u8 = 14;
const TAG_FLOAT32: u8 = 15;

const FIRST_SIZE: usize = 29;
const SECOND_SIZE: usize = FIRST_SIZE + 256;
const THIRD_SIZE: usize = SECOND_SIZE + (1 << 16);
/// `65821 + 2^24 - 1`: the largest size a 3-byte leftover field can address.
pub const MAX_SIZE: usize = THIRD_SIZE + (1 << 24) - 1;

const POINTER_SIZE_0: u64 = 2048;
const POINTER_SIZE_1: u64 = POINTER_SIZE_0 + (1 << 19);
const POINTER_SIZE_2: u64 = POINTER_SIZE_1 + (1 << 27);

/// Destination for a [`Value`]'s encoding. Implementors decide, per nested child,
/// whether to inline it or substitute a pointer to a prior occurrence.
pub trait ValueSink {
    fn buf(&mut self) -> &mut Vec<u8>;

    /// Encode `value`, possibly as a pointer to an earlier occurrence. Returns the
    /// number of bytes appended to `self.buf()`.
    fn offer(&mut self, value: &Value) -> Result<usize>;
}

/// A sink with no deduplication: every value is encoded inline, every time. Used for
/// the metadata section and for the "no pointers" data section mode.
pub struct InlineSink<'a> {
    pub buf: &'a mut Vec<u8>,
}

impl ValueSink for InlineSink<'_> {
    fn buf(&mut self) -> &mut Vec<u8> {
        self.buf
    }

    fn offer(&mut self, value: &Value) -> Result<usize> {
        write_value(value, self)
    }
}

/// Write `value`'s control byte and payload into `sink`, recursing into `sink.offer`
/// for `Map`/`Slice` children so that nested values participate in whatever
/// deduplication policy `sink` implements.
pub fn write_value<S: ValueSink>(value: &Value, sink: &mut S) -> Result<usize> {
    match value {
        Value::Bool(b) => {
            write_control(sink.buf(), TAG_BOOL, if *b { 1 } else { 0 })?;
            Ok(1)
        }
        Value::Bytes(bytes) => {
            let start = sink.buf().len();
            write_control(sink.buf(), TAG_BYTES, bytes.len())?;
            sink.buf().extend_from_slice(bytes);
            Ok(sink.buf().len() - start)
        }
        Value::String(s) => {
            let start = sink.buf().len();
            write_control(sink.buf(), TAG_STRING, s.len())?;
            sink.buf().extend_from_slice(s.as_bytes());
            Ok(sink.buf().len() - start)
        }
        Value::Float32(f) => {
            write_control(sink.buf(), TAG_FLOAT32, 4)?;
            let mut bytes = [0u8; 4];
            BigEndian::write_f32(&mut bytes, *f);
            sink.buf().extend_from_slice(&bytes);
            Ok(1 + 4)
        }
        Value::Float64(f) => {
            write_control(sink.buf(), TAG_FLOAT64, 8)?;
            let mut bytes = [0u8; 8];
            BigEndian::write_f64(&mut bytes, *f);
            sink.buf().extend_from_slice(&bytes);
            Ok(1 + 8)
        }
        Value::Int32(v) => {
            let bytes = v.to_be_bytes();
            let trimmed = minimal_be(&bytes);
            let start = sink.buf().len();
            write_control(sink.buf(), TAG_INT32, trimmed.len())?;
            sink.buf().extend_from_slice(trimmed);
            Ok(sink.buf().len() - start)
        }
        Value::Uint16(v) => write_minimal_uint(sink, TAG_UINT16, &v.to_be_bytes()),
        Value::Uint32(v) => write_minimal_uint(sink, TAG_UINT32, &v.to_be_bytes()),
        Value::Uint64(v) => write_minimal_uint(sink, TAG_UINT64, &v.to_be_bytes()),
        Value::Uint128(v) => write_minimal_uint(sink, TAG_UINT128, &v.to_be_bytes()),
        Value::Map(map) => {
            let start = sink.buf().len();
            write_control(sink.buf(), TAG_MAP, map.len())?;
            let mut written = sink.buf().len() - start;
            for (key, value) in map {
                written += sink.offer(&Value::String(key.clone()))?;
                written += sink.offer(value)?;
            }
            Ok(written)
        }
        Value::Slice(items) => {
            let start = sink.buf().len();
            write_control(sink.buf(), TAG_SLICE, items.len())?;
            let mut written = sink.buf().len() - start;
            for item in items {
                written += sink.offer(item)?;
            }
            Ok(written)
        }
        Value::Pointer(offset) => encode_pointer(sink.buf(), *offset as u64),
    }
}

fn write_minimal_uint<S: ValueSink>(sink: &mut S, tag: u8, be_bytes: &[u8]) -> Result<usize> {
    let trimmed = minimal_be(be_bytes);
    let start = sink.buf().len();
    write_control(sink.buf(), tag, trimmed.len())?;
    sink.buf().extend_from_slice(trimmed);
    Ok(sink.buf().len() - start)
}

/// Strip leading zero bytes; an all-zero value encodes as an empty payload.
fn minimal_be(bytes: &[u8]) -> &[u8] {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first_nonzero..]
}

fn write_control(buf: &mut Vec<u8>, tag: u8, size: usize) -> Result<()> {
    let (size_class, extra, extra_len) = size_field(size)?;
    if tag <= 7 {
        buf.push((tag << 5) | size_class);
    } else {
        buf.push(size_class);
        buf.push(tag - 7);
    }
    buf.extend_from_slice(&extra[..extra_len]);
    Ok(())
}

fn size_field(size: usize) -> Result<(u8, [u8; 3], usize)> {
    if size < FIRST_SIZE {
        return Ok((size as u8, [0; 3], 0));
    }
    if size <= SECOND_SIZE {
        let leftover = (size - FIRST_SIZE) as u32;
        return Ok((29, [leftover as u8, 0, 0], 1));
    }
    if size <= THIRD_SIZE {
        let leftover = (size - SECOND_SIZE) as u32;
        let mut extra = [0u8; 3];
        BigEndian::write_u16(&mut extra[..2], leftover as u16);
        return Ok((30, extra, 2));
    }
    if size <= MAX_SIZE {
        let leftover = (size - THIRD_SIZE) as u32;
        let mut extra = [0u8; 3];
        extra[0] = ((leftover >> 16) & 0xFF) as u8;
        extra[1] = ((leftover >> 8) & 0xFF) as u8;
        extra[2] = (leftover & 0xFF) as u8;
        return Ok((31, extra, 3));
    }
    Err(EncodingError::ValueTooLarge { size, max: MAX_SIZE }.into())
}

/// Written size, in bytes, of a pointer addressing `offset`. Used by the data section
/// writer to decide whether substituting a pointer would actually shrink the output.
pub fn pointer_size(offset: u64) -> usize {
    if offset < POINTER_SIZE_0 {
        2
    } else if offset < POINTER_SIZE_1 {
        3
    } else if offset < POINTER_SIZE_2 {
        4
    } else {
        5
    }
}

fn encode_pointer(buf: &mut Vec<u8>, offset: u64) -> Result<usize> {
    if offset < POINTER_SIZE_0 {
        let hi = ((offset >> 8) & 0x7) as u8;
        buf.push((TAG_POINTER << 5) | hi);
        buf.push((offset & 0xFF) as u8);
        Ok(2)
    } else if offset < POINTER_SIZE_1 {
        let v = offset - POINTER_SIZE_0;
        let hi = ((v >> 16) & 0x7) as u8;
        buf.push((TAG_POINTER << 5) | (1 << 3) | hi);
        buf.push(((v >> 8) & 0xFF) as u8);
        buf.push((v & 0xFF) as u8);
        Ok(3)
    } else if offset < POINTER_SIZE_2 {
        let v = offset - POINTER_SIZE_1;
        let hi = ((v >> 24) & 0x7) as u8;
        buf.push((TAG_POINTER << 5) | (2 << 3) | hi);
        buf.push(((v >> 16) & 0xFF) as u8);
        buf.push(((v >> 8) & 0xFF) as u8);
        buf.push((v & 0xFF) as u8);
        Ok(4)
    } else if offset <= u32::MAX as u64 {
        buf.push((TAG_POINTER << 5) | (3 << 3));
        buf.extend_from_slice(&(offset as u32).to_be_bytes());
        Ok(5)
    } else {
        Err(EncodingError::PointerOutOfRange { offset }.into())
    }
}

/// Decode a pointer's address and total written size from its control byte and the
/// bytes following it. Used by [`crate::visitor`] consumers that walk an encoded
/// stream (the reconstruction path, and tests asserting §8 property 5).
pub fn decode_pointer(control: u8, rest: &[u8]) -> Option<(u64, usize)> {
    if control >> 5 != TAG_POINTER {
        return None;
    }
    let size_class = (control >> 3) & 0x3;
    let hi = (control & 0x7) as u64;
    match size_class {
        0 => rest.first().map(|&b0| ((hi << 8) | b0 as u64, 2)),
        1 => {
            if rest.len() < 2 {
                return None;
            }
            let v = (hi << 16) | ((rest[0] as u64) << 8) | rest[1] as u64;
            Some((v + POINTER_SIZE_0, 3))
        }
        2 => {
            if rest.len() < 3 {
                return None;
            }
            let v = (hi << 24) | ((rest[0] as u64) << 16) | ((rest[1] as u64) << 8) | rest[2] as u64;
            Some((v + POINTER_SIZE_1, 4))
        }
        3 => {
            if rest.len() < 4 {
                return None;
            }
            let v = BigEndian::read_u32(&rest[..4]) as u64;
            Some((v, 5))
        }
        _ => None,
    }
}
