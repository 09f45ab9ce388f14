//! Build MaxMind DB (MMDB) files from IP network to value mappings.
//!
//! A [`Tree`] holds a binary prefix trie over the unified IPv4/IPv6 address space and
//! a deduplicated value store. Networks are inserted with [`Tree::insert`] (or
//! [`Tree::insert_func`] for merge semantics, or [`Tree::insert_cidr_range`] for an
//! address range), looked up with [`Tree::get`], and the whole tree is serialized to
//! the MMDB binary format with [`Tree::write_to`] after [`Tree::finalize`].

mod address;
mod arena;
mod assembler;
mod data_map;
mod data_writer;
mod encode;
mod error;
mod fingerprint;
pub mod merge;
mod networks;
mod node;
mod nohash_hasher;
mod options;
mod trie;
pub mod visitor;
mod value;

#[cfg(test)]
mod tests;

pub use address::Network;
pub use error::{EncodingError, Error, Result};
pub use options::Options;
pub use trie::Tree;
pub use value::Value;
