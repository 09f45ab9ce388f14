//! A densely packed, `Vec`-backed array of trie nodes with free-list reuse. Nodes are
//! addressed by index rather than by pointer so that a [`crate::node::Record`] can be
//! `Copy` and the whole tree can be serialized by walking indices.

use crate::error::{Error, Result};
use crate::node::{Node, Record};

const INITIAL_CAPACITY: usize = 1024;

pub struct NodeArena {
    nodes: Vec<Node>,
    free: Vec<u32>,
}

impl NodeArena {
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(INITIAL_CAPACITY);
        nodes.push(root_node());
        NodeArena { nodes, free: Vec::new() }
    }

    pub fn root_index(&self) -> u32 {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, index: u32) -> Result<&Node> {
        self.nodes.get(index as usize).ok_or_else(|| {
            Error::Arena(format!("node index {index} out of bounds ({} nodes)", self.nodes.len()))
        })
    }

    pub fn get_mut(&mut self, index: u32) -> Result<&mut Node> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index as usize)
            .ok_or_else(|| Error::Arena(format!("node index {index} out of bounds ({len} nodes)")))
    }

    /// Pops a slot from the free stack if one is available; otherwise appends a
    /// fresh, reset node (growing the backing vector as needed).
    pub fn acquire_node(&mut self) -> u32 {
        if let Some(index) = self.free.pop() {
            self.nodes[index as usize] = Node::reset();
            return index;
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(Node::reset());
        index
    }

    /// Returns `index` to the free stack for reuse. Fails for the root, for an
    /// out-of-range index, or for a node with a `FixedNode` child (those anchor
    /// aliases and must never move or disappear).
    pub fn return_node(&mut self, index: u32) -> Result<()> {
        if index == 0 {
            return Err(Error::Arena("attempted to return the root node".into()));
        }
        if index as usize >= self.nodes.len() {
            return Err(Error::Arena(format!("attempted to return out-of-range node {index}")));
        }
        let node = &self.nodes[index as usize];
        if matches!(node.left, Record::FixedNode(_)) || matches!(node.right, Record::FixedNode(_)) {
            return Err(Error::Arena(format!("attempted to return fixed node {index}")));
        }
        self.nodes[index as usize] = Node::reset();
        self.free.push(index);
        Ok(())
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

fn root_node() -> Node {
    let mut node = Node::reset();
    node.left = Record::Empty;
    node.right = Record::Empty;
    node
}
