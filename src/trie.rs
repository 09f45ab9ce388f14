//! The binary prefix trie: insertion, splitting, reserved/aliased-network policing,
//! merge dispatch, and finalize-time numbering.

use std::net::IpAddr;

use tracing::{debug, trace, warn};

use crate::address::{bit_at, embed, embed_network, Network};
use crate::arena::NodeArena;
use crate::data_map::DataMap;
use crate::error::{Error, Result};
use crate::networks;
use crate::node::Record;
use crate::options::Options;
use crate::value::Value;

/// What a terminal site in the trie should become once reached. `Data` is the only
/// variant reachable through the public API; `FixedNode`, `Alias`, and `Reserved` are
/// used internally to seed the tree's fixed subtrees at construction time.
pub(crate) enum Terminal<'a> {
    Data(&'a mut dyn FnMut(Option<Value>) -> Result<Option<Value>>),
    FixedNode,
    Alias(u32),
    Reserved,
}

/// An MMDB search tree under construction.
pub struct Tree {
    pub(crate) arena: NodeArena,
    pub(crate) data: DataMap,
    pub(crate) options: Options,
    /// Node numbers assigned by the last `finalize()` call; `None` until finalized,
    /// and reset to `None` by any subsequent mutation.
    pub(crate) node_count: Option<u32>,
    /// Arena indices in finalize (pre-order) order; valid exactly when `node_count`
    /// is `Some`.
    pub(crate) emission_order: Vec<u32>,
}

impl Tree {
    pub fn new(options: Options) -> Result<Tree> {
        options.validate()?;

        let mut tree =
            Tree { arena: NodeArena::new(), data: DataMap::new(), options, node_count: None, emission_order: Vec::new() };

        tree.seed_networks()?;
        Ok(tree)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn seed_networks(&mut self) -> Result<()> {
        let fixed = networks::IPV4_FIXED_NODE;
        let fixed_index = self.seed_fixed_node(fixed.address, fixed.prefix_len)?;
        debug!(fixed_index, "seeded IPv4 fixed node at ::/96");

        if !self.options.disable_ipv4_aliasing {
            for alias in networks::aliased_networks() {
                self.seed_alias(alias.address, alias.prefix_len, fixed_index)?;
            }
        }

        if !self.options.include_reserved_networks {
            for reserved in networks::reserved_networks() {
                self.seed_reserved(reserved.address, reserved.prefix_len)?;
            }
        }

        self.node_count = None;
        Ok(())
    }

    fn seed_fixed_node(&mut self, address: u128, prefix_len: u8) -> Result<u32> {
        self.insert_internal(address, prefix_len, &mut Terminal::FixedNode)?;
        match self.record_at(address, prefix_len)? {
            Record::FixedNode(idx) => Ok(idx),
            other => Err(Error::Arena(format!("expected FixedNode after seeding, found {other:?}"))),
        }
    }

    fn seed_alias(&mut self, address: u128, prefix_len: u8, target: u32) -> Result<()> {
        self.insert_internal(address, prefix_len, &mut Terminal::Alias(target))
    }

    fn seed_reserved(&mut self, address: u128, prefix_len: u8) -> Result<()> {
        self.insert_internal(address, prefix_len, &mut Terminal::Reserved)
    }

    /// Inserts `value` at `addr`/`prefix_len`, replacing whatever was there.
    pub fn insert(&mut self, addr: IpAddr, prefix_len: u8, value: Value) -> Result<()> {
        self.insert_func(addr, prefix_len, move |_old| Ok(Some(value.clone())))
    }

    /// Inserts at `addr`/`prefix_len` via a caller-supplied merge function, called
    /// with the existing value (if any) and returning the value that should replace
    /// it, or `None` to remove the record entirely.
    pub fn insert_func(
        &mut self,
        addr: IpAddr,
        prefix_len: u8,
        mut merge: impl FnMut(Option<Value>) -> Result<Option<Value>>,
    ) -> Result<()> {
        let (address, prefix_len) = embed_network(addr, prefix_len);
        self.insert_internal(address, prefix_len, &mut Terminal::Data(&mut merge))
    }

    /// Inserts `value` at every network in the minimal CIDR covering of the inclusive
    /// range `[start, end]`.
    pub fn insert_cidr_range(&mut self, start: IpAddr, end: IpAddr, value: Value) -> Result<()> {
        let (start_addr, end_addr, bits) = match (start, end) {
            (IpAddr::V4(s), IpAddr::V4(e)) => (u128::from(u32::from(s)), u128::from(u32::from(e)), 32),
            (IpAddr::V6(s), IpAddr::V6(e)) => (u128::from(s), u128::from(e), 128),
            _ => {
                return Err(Error::Config(
                    "insert_cidr_range requires start and end to be the same IP version".into(),
                ))
            }
        };

        for (addr, host_prefix) in cidr_covering(start_addr, end_addr, bits) {
            let embedded_prefix = if bits == 32 { 96 + host_prefix } else { host_prefix };
            let value = value.clone();
            self.insert_internal(addr, embedded_prefix, &mut Terminal::Data(&mut move |_old| Ok(Some(value.clone()))))?;
        }
        Ok(())
    }

    /// Returns the value stored for `addr`, and the network of the record that
    /// answered the lookup (following aliases transparently).
    pub fn get(&self, addr: IpAddr) -> (Network, Option<Value>) {
        let address = embed(addr);
        let (depth, record) = self.get_record(address);
        let value = match record {
            Record::Data(handle) => self.data.get(handle).cloned(),
            _ => None,
        };
        (Network::new(address, depth), value)
    }

    fn get_record(&self, address: u128) -> (u8, Record) {
        let mut node_idx = self.arena.root_index();
        let mut depth: u8 = 0;
        loop {
            let bit = bit_at(address, depth);
            let record =
                self.arena.get(node_idx).expect("get: arena invariant violated").record(bit);
            depth += 1;
            match record {
                Record::Node(idx) | Record::FixedNode(idx) | Record::Alias(idx) => {
                    if depth == 128 {
                        return (128, Record::Empty);
                    }
                    node_idx = idx;
                }
                terminal => return (depth, terminal),
            }
        }
    }

    fn record_at(&self, address: u128, prefix_len: u8) -> Result<Record> {
        let mut node_idx = self.arena.root_index();
        for depth in 0..prefix_len {
            let bit = bit_at(address, depth);
            let record = self.arena.get(node_idx)?.record(bit);
            if depth + 1 == prefix_len {
                return Ok(record);
            }
            node_idx = record
                .node_index()
                .ok_or_else(|| Error::Arena("seed path terminated before reaching prefix_len".into()))?;
        }
        Err(Error::Arena("record_at called with prefix_len == 0".into()))
    }

    fn insert_internal(&mut self, address: u128, prefix_len: u8, term: &mut Terminal<'_>) -> Result<()> {
        if prefix_len == 0 {
            return Err(Error::Config("cannot insert a value into the root node of the tree".into()));
        }
        self.node_count = None;
        let root = self.arena.root_index();
        self.descend(root, 0, address, prefix_len, term)
    }

    /// Processes `node_idx`'s two children at `depth + 1`, per spec.md §4.6 rule 1:
    /// once we are at or past the target depth, both children must be visited (to
    /// overwrite/merge any deeper existing structure), not just the bit-selected one.
    fn descend(&mut self, node_idx: u32, depth: u8, ip: u128, prefix_len: u8, term: &mut Terminal<'_>) -> Result<()> {
        let new_depth = depth + 1;
        if new_depth > prefix_len {
            self.insert_child(node_idx, 0, depth, ip, prefix_len, term)?;
            self.insert_child(node_idx, 1, depth, ip, prefix_len, term)?;
        } else {
            let bit = bit_at(ip, depth);
            self.insert_child(node_idx, bit, depth, ip, prefix_len, term)?;
        }
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent_idx: u32,
        bit: u8,
        depth: u8,
        ip: u128,
        prefix_len: u8,
        term: &mut Terminal<'_>,
    ) -> Result<()> {
        let new_depth = depth + 1;
        let record = self.arena.get(parent_idx)?.record(bit);

        match record {
            Record::Node(child_idx) | Record::FixedNode(child_idx) => {
                self.descend(child_idx, new_depth, ip, prefix_len, term)?;
                self.maybe_merge_children(parent_idx, bit)?;
            }
            Record::Alias(_) => {
                if prefix_len < new_depth {
                    trace!(prefix_len, new_depth, "insertion contains an aliased network; absorbing");
                } else {
                    return Err(Error::AliasedNetwork { ip: addr_of(ip), prefix_len });
                }
            }
            Record::Reserved => {
                if prefix_len >= new_depth {
                    warn!(prefix_len, new_depth, "rejected insertion into a reserved network");
                    return Err(Error::ReservedNetwork { ip: addr_of(ip), prefix_len });
                }
                trace!(prefix_len, new_depth, "insertion contains a reserved network; absorbing");
            }
            Record::Empty | Record::Data(_) | Record::Unused => {
                if new_depth >= prefix_len {
                    self.apply_terminal(parent_idx, bit, record, term)?;
                } else {
                    let new_node_idx = self.arena.acquire_node();
                    if let Record::Data(handle) = record {
                        self.data.retain(handle);
                    }
                    {
                        let new_node = self.arena.get_mut(new_node_idx)?;
                        new_node.left = record;
                        new_node.right = record;
                    }
                    self.arena.get_mut(parent_idx)?.set_record(bit, Record::Node(new_node_idx));
                    self.descend(new_node_idx, new_depth, ip, prefix_len, term)?;
                    self.maybe_merge_children(parent_idx, bit)?;
                }
            }
        }
        Ok(())
    }

    fn apply_terminal(&mut self, parent_idx: u32, bit: u8, current: Record, term: &mut Terminal<'_>) -> Result<()> {
        match term {
            Terminal::Data(merge) => {
                let old_handle = match current {
                    Record::Data(h) => Some(h),
                    _ => None,
                };
                let old_value = old_handle.and_then(|h| self.data.get(h).cloned());
                match merge(old_value.clone())? {
                    None => {
                        if let Some(h) = old_handle {
                            self.data.remove(h);
                        }
                        self.arena.get_mut(parent_idx)?.set_record(bit, Record::Empty);
                    }
                    Some(v) => {
                        if old_value.as_ref() != Some(&v) {
                            if let Some(h) = old_handle {
                                self.data.remove(h);
                            }
                            let handle = self.data.store(v)?;
                            self.arena.get_mut(parent_idx)?.set_record(bit, Record::Data(handle));
                        }
                    }
                }
            }
            Terminal::FixedNode => {
                let new_node_idx = self.arena.acquire_node();
                {
                    let node = self.arena.get_mut(new_node_idx)?;
                    node.left = Record::Empty;
                    node.right = Record::Empty;
                }
                self.arena.get_mut(parent_idx)?.set_record(bit, Record::FixedNode(new_node_idx));
            }
            Terminal::Alias(target) => {
                self.arena.get_mut(parent_idx)?.set_record(bit, Record::Alias(*target));
            }
            Terminal::Reserved => {
                self.arena.get_mut(parent_idx)?.set_record(bit, Record::Reserved);
            }
        }
        Ok(())
    }

    /// Collapses `parent_idx`'s `bit` child node into a single terminal record when
    /// its two children are now identical, per spec.md §4.6. A record typed
    /// `FixedNode` is never collapsed (it anchors live aliases), which this function
    /// enforces simply by only matching `Record::Node`.
    fn maybe_merge_children(&mut self, parent_idx: u32, bit: u8) -> Result<()> {
        let Record::Node(child_idx) = self.arena.get(parent_idx)?.record(bit) else {
            return Ok(());
        };
        let child = self.arena.get(child_idx)?;
        let collapsed = match (child.left, child.right) {
            (Record::Empty, Record::Empty) => Some(Record::Empty),
            (Record::Reserved, Record::Reserved) => Some(Record::Reserved),
            (Record::Data(a), Record::Data(b)) if a == b => {
                self.data.remove(a);
                Some(Record::Data(a))
            }
            _ => None,
        };

        if let Some(record) = collapsed {
            self.arena.return_node(child_idx)?;
            self.arena.get_mut(parent_idx)?.set_record(bit, record);
        }
        Ok(())
    }

    /// Assigns pre-order node numbers to every reachable node. Idempotent: may be
    /// called again after more insertions (which first reset `node_count` to `None`).
    pub fn finalize(&mut self) {
        self.emission_order.clear();
        let mut next_num = 0u32;
        let root = self.arena.root_index();
        self.finalize_node(root, &mut next_num);
        self.node_count = Some(next_num);
    }

    fn finalize_node(&mut self, node_idx: u32, next_num: &mut u32) {
        let num = *next_num;
        *next_num += 1;
        self.emission_order.push(node_idx);

        let node = self.arena.get_mut(node_idx).expect("finalize: valid node index");
        node.node_num = Some(num);
        let (left, right) = (node.left, node.right);

        // Only Node/FixedNode own a subtree that needs numbering; Alias records
        // reference a node numbered via its own (FixedNode) path.
        for record in [left, right] {
            if let Record::Node(idx) | Record::FixedNode(idx) = record {
                self.finalize_node(idx, next_num);
            }
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.node_count.is_some()
    }
}

fn addr_of(address: u128) -> IpAddr {
    Network::new(address, 128).addr()
}

/// Minimal CIDR covering of the inclusive range `[start, end]` within a `bits`-wide
/// address space, via the standard greedy algorithm: repeatedly take the largest
/// alignment-permitted block whose last address does not exceed `end`.
fn cidr_covering(start: u128, end: u128, bits: u32) -> Vec<(u128, u8)> {
    let mut result = Vec::new();
    let mut cur = start;
    loop {
        let max_host_bits = if cur == 0 { bits } else { cur.trailing_zeros().min(bits) };
        let mut host_bits = max_host_bits;
        loop {
            let block_size = block_size_for(host_bits);
            match cur.checked_add(block_size.saturating_sub(1)) {
                Some(last) if last <= end => break,
                _ => {
                    if host_bits == 0 {
                        break;
                    }
                    host_bits -= 1;
                }
            }
        }

        result.push((cur, (bits - host_bits) as u8));

        match cur.checked_add(block_size_for(host_bits)) {
            Some(next) if next <= end => cur = next,
            _ => break,
        }
    }
    result
}

fn block_size_for(host_bits: u32) -> u128 {
    if host_bits >= 128 {
        u128::MAX
    } else {
        1u128 << host_bits
    }
}
