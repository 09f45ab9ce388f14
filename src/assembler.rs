//! Final serialization: record-size packing, file layout, and metadata, per
//! spec.md §4.8.

use std::collections::BTreeMap;
use std::io::Write;

use crate::data_writer::DataSectionWriter;
use crate::encode::{write_value, InlineSink};
use crate::error::{EncodingError, Error, Result};
use crate::node::Record;
use crate::trie::Tree;
use crate::value::Value;

/// Bytes preceding the metadata map: `0xAB 0xCD 0xEF` followed by `MaxMind.com`.
const METADATA_SENTINEL: &[u8] = b"\xAB\xCD\xEFMaxMind.com";
/// The zero bytes separating the node section from the data section.
const SEPARATOR: [u8; 16] = [0; 16];

impl Tree {
    /// Serializes the tree to `out`: the node section, a 16-byte separator, the
    /// deduplicated data section, the metadata sentinel, then the metadata map.
    /// Finalizes first if the tree hasn't been (or was invalidated by an insert
    /// since the last `finalize()`). Returns the number of bytes written.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<u64> {
        if !self.is_finalized() {
            self.finalize();
        }
        let node_count = self.node_count.expect("just finalized");

        let mut data_writer = DataSectionWriter::new(false);
        let mut data_offsets: std::collections::HashMap<u32, u64> = std::collections::HashMap::new();

        // Pass 1: establish each distinct Data value's canonical offset, in
        // finalize (pre-order) order, so pointer selection is deterministic.
        for &node_idx in &self.emission_order {
            let node = self.arena.get(node_idx)?;
            for record in [node.left, node.right] {
                if let Record::Data(handle) = record {
                    if let std::collections::hash_map::Entry::Vacant(slot) = data_offsets.entry(handle) {
                        let value = self
                            .data
                            .get(handle)
                            .ok_or_else(|| Error::Arena(format!("dangling data handle {handle}")))?;
                        let offset = data_writer.write_or_write_pointer(value)?;
                        slot.insert(offset);
                    }
                }
            }
        }

        let mut written: u64 = 0;

        // Pass 2: emit node records now that every Data offset is known.
        for &node_idx in &self.emission_order {
            let node = self.arena.get(node_idx)?;
            let left = self.record_address(node.left, node_count, &data_offsets)?;
            let right = self.record_address(node.right, node_count, &data_offsets)?;
            written += pack_record_pair(out, self.options.record_size, left, right)? as u64;
        }

        out.write_all(&SEPARATOR)?;
        written += SEPARATOR.len() as u64;

        let data_bytes = data_writer.into_bytes();
        out.write_all(&data_bytes)?;
        written += data_bytes.len() as u64;

        out.write_all(METADATA_SENTINEL)?;
        written += METADATA_SENTINEL.len() as u64;

        let metadata = self.build_metadata(node_count);
        let mut metadata_buf = Vec::new();
        write_value(&metadata, &mut InlineSink { buf: &mut metadata_buf })?;
        out.write_all(&metadata_buf)?;
        written += metadata_buf.len() as u64;

        Ok(written)
    }

    /// The integer a node record stores for `record`: a node number for
    /// `Node`/`FixedNode`/`Alias`, `node_count` (the "no such record" sentinel) for
    /// `Empty`/`Reserved`, or `node_count + 16 + data_offset` for `Data`.
    fn record_address(
        &self,
        record: Record,
        node_count: u32,
        data_offsets: &std::collections::HashMap<u32, u64>,
    ) -> Result<u64> {
        match record {
            Record::Node(idx) | Record::FixedNode(idx) | Record::Alias(idx) => {
                let target = self.arena.get(idx)?;
                let num = target
                    .node_num
                    .ok_or_else(|| Error::Arena(format!("node {idx} was never numbered by finalize")))?;
                Ok(num as u64)
            }
            Record::Empty | Record::Reserved | Record::Unused => Ok(node_count as u64),
            Record::Data(handle) => {
                let offset = data_offsets
                    .get(&handle)
                    .ok_or_else(|| Error::Arena(format!("data handle {handle} missing from offset table")))?;
                Ok(node_count as u64 + 16 + offset)
            }
        }
    }

    fn build_metadata(&self, node_count: u32) -> Value {
        let mut metadata = BTreeMap::new();
        metadata.insert("binary_format_major_version".to_owned(), Value::Uint16(2));
        metadata.insert("binary_format_minor_version".to_owned(), Value::Uint16(0));
        metadata.insert("build_epoch".to_owned(), Value::Uint64(self.options.build_epoch as u64));
        metadata.insert("database_type".to_owned(), Value::String(self.options.database_type.clone()));

        let description: BTreeMap<String, Value> = self
            .options
            .description
            .iter()
            .map(|(language, text)| (language.clone(), Value::String(text.clone())))
            .collect();
        metadata.insert("description".to_owned(), Value::Map(description));

        metadata.insert("ip_version".to_owned(), Value::Uint16(self.options.ip_version));

        let languages = self.options.languages.iter().map(|l| Value::String(l.clone())).collect();
        metadata.insert("languages".to_owned(), Value::Slice(languages));

        metadata.insert("node_count".to_owned(), Value::Uint32(node_count));
        metadata.insert("record_size".to_owned(), Value::Uint16(self.options.record_size as u16));

        Value::Map(metadata)
    }
}

/// Packs one `(left, right)` record pair per spec.md §4.8 and writes it to `out`,
/// returning the number of bytes written.
fn pack_record_pair<W: Write>(out: &mut W, record_size: u8, left: u64, right: u64) -> Result<usize> {
    let l = left.to_be_bytes();
    let r = right.to_be_bytes();
    match record_size {
        24 => {
            out.write_all(&l[5..8])?;
            out.write_all(&r[5..8])?;
            Ok(6)
        }
        28 => {
            let l_top = ((left >> 24) & 0xF) as u8;
            let r_top = ((right >> 24) & 0xF) as u8;
            let middle = (l_top << 4) | r_top;
            out.write_all(&[l[5], l[6], l[7], middle, r[5], r[6], r[7]])?;
            Ok(7)
        }
        32 => {
            out.write_all(&l[4..8])?;
            out.write_all(&r[4..8])?;
            Ok(8)
        }
        other => Err(Error::Encoding(EncodingError::UnsupportedRecordSize(other))),
    }
}
