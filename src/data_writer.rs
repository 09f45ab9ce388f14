//! The data section writer: an append-only byte buffer plus a `fingerprint ->
//! (first_offset, encoded_size)` map, used to substitute back-reference pointers for
//! repeated values whenever that would shrink the output.

use std::collections::HashMap;

use tracing::trace;

use crate::encode::{pointer_size, write_value, ValueSink};
use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::value::Value;

struct Occurrence {
    offset: u64,
    encoded_size: usize,
}

pub struct DataSectionWriter {
    buf: Vec<u8>,
    fingerprinter: Fingerprinter,
    occurrences: HashMap<u64, Occurrence>,
    /// When true, step 2 of `write_or_write_pointer` (§4.4) is disabled: every value
    /// is encoded inline, even on repeat.
    no_pointers: bool,
}

impl DataSectionWriter {
    pub fn new(no_pointers: bool) -> Self {
        DataSectionWriter {
            buf: Vec::new(),
            fingerprinter: Fingerprinter::new(),
            occurrences: HashMap::new(),
            no_pointers,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The central operation of §4.4: fingerprint `value`; if it was seen before and
    /// a pointer to it would be smaller than re-encoding it, write the pointer.
    /// Otherwise encode inline and (on first sight) remember the offset. Returns the
    /// offset at which `value`'s first (canonical) encoding begins -- this is what
    /// node record emission uses to address the value, regardless of whether *this*
    /// call wrote a pointer or the inline bytes.
    pub fn write_or_write_pointer(&mut self, value: &Value) -> Result<u64> {
        let fingerprint = self.fingerprinter.fingerprint(value)?;

        if !self.no_pointers {
            if let Some(occurrence) = self.occurrences.get(&fingerprint) {
                let offset = occurrence.offset;
                let encoded_size = occurrence.encoded_size;
                if encoded_size > pointer_size(offset) {
                    trace!(offset, "substituting pointer for repeated value");
                    write_value(&Value::Pointer(offset as u32), &mut DirectSink { buf: &mut self.buf })?;
                } else {
                    // A pointer wouldn't shrink anything here, but the value still has
                    // to occupy its slot in the byte stream -- re-encode it in place
                    // rather than silently contributing zero bytes.
                    write_value(value, self)?;
                }
                return Ok(offset);
            }
        }

        let offset = self.buf.len() as u64;
        let written = write_value(value, self)?;
        if !self.no_pointers {
            self.occurrences.entry(fingerprint).or_insert(Occurrence { offset, encoded_size: written });
        }
        Ok(offset)
    }
}

impl ValueSink for DataSectionWriter {
    fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    fn offer(&mut self, value: &Value) -> Result<usize> {
        let before = self.buf.len();
        self.write_or_write_pointer(value)?;
        Ok(self.buf.len() - before)
    }
}

/// A bare sink used only to write a pointer's own bytes, bypassing `offer`'s dedup
/// logic (a pointer is never itself a candidate for further deduplication).
struct DirectSink<'a> {
    buf: &'a mut Vec<u8>,
}

impl ValueSink for DirectSink<'_> {
    fn buf(&mut self) -> &mut Vec<u8> {
        self.buf
    }

    fn offer(&mut self, value: &Value) -> Result<usize> {
        write_value(value, self)
    }
}
