//! The interner: deduplicates [`Value`]s by structural identity and hands out small
//! [`Handle`]s that trie [`crate::node::Record::Data`] records carry instead of the
//! value itself.

use std::collections::HashMap;

use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::nohash_hasher::IntMap;
use crate::value::Value;

/// A small, `Copy` reference to an interned value. Unique per distinct `Value` (by
/// structural identity) for the lifetime of the [`DataMap`] that produced it.
pub type Handle = u32;

struct Entry {
    value: Value,
    fingerprint: u64,
    refcount: u32,
}

#[derive(Default)]
pub struct DataMap {
    fingerprinter: Fingerprinter,
    by_fingerprint: HashMap<u64, Handle>,
    entries: IntMap<Handle, Entry>,
    next_handle: Handle,
}

impl DataMap {
    pub fn new() -> Self {
        DataMap::default()
    }

    /// Interns `value`, returning a handle shared by every structurally equal value
    /// stored through this map. Increments the refcount on repeat stores.
    pub fn store(&mut self, value: Value) -> Result<Handle> {
        let fingerprint = self.fingerprinter.fingerprint(&value)?;
        if let Some(&handle) = self.by_fingerprint.get(&fingerprint) {
            self.entries.get_mut(&handle).expect("handle in by_fingerprint must exist").refcount += 1;
            return Ok(handle);
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.by_fingerprint.insert(fingerprint, handle);
        self.entries.insert(handle, Entry { value, fingerprint, refcount: 1 });
        Ok(handle)
    }

    /// Decrements `handle`'s refcount, dropping the entry entirely once it reaches
    /// zero. A no-op for handles that no longer exist (defensive against double-free
    /// bugs surfacing as a panic rather than silent corruption would be worse here).
    pub fn remove(&mut self, handle: Handle) {
        let Some(entry) = self.entries.get_mut(&handle) else { return };
        entry.refcount -= 1;
        if entry.refcount == 0 {
            let fingerprint = entry.fingerprint;
            self.entries.remove(&handle);
            self.by_fingerprint.remove(&fingerprint);
        }
    }

    /// Increments `handle`'s refcount without interning anything new. Used when a
    /// trie split duplicates a `Data` record across two new child slots.
    pub fn retain(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.refcount += 1;
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&Value> {
        self.entries.get(&handle).map(|e| &e.value)
    }

    pub fn refcount(&self, handle: Handle) -> u32 {
        self.entries.get(&handle).map_or(0, |e| e.refcount)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
