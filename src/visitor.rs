//! Reconstruction of a [`Value`] from an external decoder's callback stream, per
//! spec.md §6.3. Grounded on the original's stack-machine deserializer: containers
//! are pushed onto a stack and filled as their children arrive, rather than buffered
//! as a flat event list and resolved later.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::Value;

enum Frame {
    Map { expected_pairs: usize, received_pairs: usize, pending_key: Option<String>, entries: BTreeMap<String, Value> },
    Slice { expected_items: usize, items: Vec<Value> },
}

/// Accepts the callback sequence an external MMDB decoder would emit for a single
/// value graph and reconstructs the equivalent [`Value`].
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        ValueBuilder::default()
    }

    pub fn start_map(&mut self, pairs: usize) {
        self.stack.push(Frame::Map {
            expected_pairs: pairs,
            received_pairs: 0,
            pending_key: None,
            entries: BTreeMap::new(),
        });
    }

    pub fn start_slice(&mut self, len: usize) {
        self.stack.push(Frame::Slice { expected_items: len, items: Vec::with_capacity(len) });
    }

    pub fn string(&mut self, v: String) -> Result<()> {
        self.deliver(Value::String(v))
    }

    pub fn uint16(&mut self, v: u16) -> Result<()> {
        self.deliver(Value::Uint16(v))
    }

    pub fn uint32(&mut self, v: u32) -> Result<()> {
        self.deliver(Value::Uint32(v))
    }

    pub fn uint64(&mut self, v: u64) -> Result<()> {
        self.deliver(Value::Uint64(v))
    }

    pub fn int32(&mut self, v: i32) -> Result<()> {
        self.deliver(Value::Int32(v))
    }

    pub fn uint128(&mut self, v: u128) -> Result<()> {
        self.deliver(Value::Uint128(v))
    }

    pub fn float32(&mut self, v: f32) -> Result<()> {
        self.deliver(Value::Float32(v))
    }

    pub fn float64(&mut self, v: f64) -> Result<()> {
        self.deliver(Value::Float64(v))
    }

    pub fn bytes(&mut self, v: Vec<u8>) -> Result<()> {
        self.deliver(Value::Bytes(v))
    }

    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.deliver(Value::Bool(v))
    }

    /// Closes the most recently opened `Map` or `Slice`, delivering it as a value to
    /// whatever container (or the root) is next on the stack.
    pub fn end(&mut self) -> Result<()> {
        let frame = self.stack.pop().ok_or_else(|| Error::Reconstruction("end() with no open container".into()))?;
        let value = match frame {
            Frame::Map { expected_pairs, received_pairs, pending_key, entries } => {
                if pending_key.is_some() {
                    return Err(Error::Reconstruction("map ended with a key but no value".into()));
                }
                if received_pairs != expected_pairs {
                    return Err(Error::Reconstruction(format!(
                        "map declared {expected_pairs} pairs but received {received_pairs}"
                    )));
                }
                Value::Map(entries)
            }
            Frame::Slice { expected_items, items } => {
                if items.len() != expected_items {
                    return Err(Error::Reconstruction(format!(
                        "slice declared {expected_items} items but received {}",
                        items.len()
                    )));
                }
                Value::Slice(items)
            }
        };
        self.deliver(value)
    }

    /// The fully reconstructed value, once the matching `end()` for every
    /// `start_map`/`start_slice` has been delivered.
    pub fn build(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(Error::Reconstruction("build() called with unclosed containers".into()));
        }
        self.root.ok_or_else(|| Error::Reconstruction("build() called before any value was delivered".into()))
    }

    fn deliver(&mut self, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(Error::Reconstruction("a second top-level value was delivered".into()));
                }
                self.root = Some(value);
            }
            Some(Frame::Slice { items, .. }) => items.push(value),
            Some(Frame::Map { pending_key, entries, received_pairs, .. }) => match pending_key.take() {
                None => {
                    let Value::String(key) = value else {
                        return Err(Error::Reconstruction("map key event did not carry a String".into()));
                    };
                    *pending_key = Some(key);
                }
                Some(key) => {
                    entries.insert(key, value);
                    *received_pairs += 1;
                }
            },
        }
        Ok(())
    }
}
