//! Produces a stable 64-bit fingerprint of a [`Value`] for use as a deduplication key.
//!
//! Mirrors the original implementation's per-writer `hash/maphash.Hash`: the hasher is
//! seeded once, randomly, when the writer is constructed, and every fingerprint for
//! that writer's lifetime is computed with the same seed. Two structurally equal
//! values always fingerprint identically within one writer; the seed need not (and, by
//! design, does not) stay stable across processes.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

use crate::encode::{write_value, InlineSink};
use crate::error::Result;
use crate::value::Value;

#[derive(Debug)]
pub struct Fingerprinter {
    build_hasher: RandomState,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Fingerprinter { build_hasher: RandomState::new() }
    }

    pub fn fingerprint(&self, value: &Value) -> Result<u64> {
        let mut buf = Vec::new();
        write_value(value, &mut InlineSink { buf: &mut buf })?;
        let mut hasher = self.build_hasher.build_hasher();
        hasher.write(&buf);
        Ok(hasher.finish())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
