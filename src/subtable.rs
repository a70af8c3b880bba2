//! Per-level unique subtables with intrusive collision chains.
//!
//! The manager keeps one flat `Vec<Node>` for node storage and one
//! subtable per level for hash-consing:
//!
//! ```text
//! subtables[0] → Subtable for the variable at level 0
//! subtables[1] → Subtable for the variable at level 1
//! ...
//! ```
//!
//! Each subtable is an array of bucket heads. Collision chains are threaded
//! through `Node.next`, so nodes themselves form the linked lists:
//!
//! ```text
//! Subtable for level k:
//! ┌─────────────────────────────────────────────────┐
//! │ buckets: [NodeId; 2^bits]                       │
//! │   [0] ─────► Node@5 ──► Node@12 ──► ∅           │
//! │   [1] ─────► ∅                                  │
//! │   [2] ─────► Node@3 ──► ∅                       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The variable is implicit in the subtable, so the bucket is chosen from
//! the `(low, high)` children only. Reordering moves a whole subtable from
//! one level to another without rehashing.

use crate::node::Node;
use crate::reference::Ref;
use crate::types::{NodeId, Var};
use crate::utils::MyHash;

/// Default number of bucket bits (2^8 = 256 buckets per level).
pub const DEFAULT_BUCKET_BITS: usize = 8;

/// Average chain length that triggers a resize.
const MAX_CHAIN_LENGTH: usize = 4;

/// A subtable storing BDD nodes for a single variable.
#[derive(Debug, Clone)]
pub struct Subtable {
    /// The variable for all nodes in this subtable.
    pub variable: Var,

    /// Bucket array: each entry is the head of a collision chain.
    /// [`NO_NEXT`](Node::NO_NEXT) marks an empty bucket.
    buckets: Vec<NodeId>,

    bitmask: u64,

    count: usize,
}

impl Subtable {
    pub fn new(variable: Var) -> Self {
        Self::with_bucket_bits(variable, DEFAULT_BUCKET_BITS)
    }

    /// Create a new subtable with `2^bits` buckets.
    pub fn with_bucket_bits(variable: Var, bits: usize) -> Self {
        let num_buckets = 1 << bits;
        Self {
            variable,
            buckets: vec![Node::NO_NEXT; num_buckets],
            bitmask: (num_buckets - 1) as u64,
            count: 0,
        }
    }

    #[inline]
    fn bucket_index(&self, low: Ref, high: Ref) -> usize {
        (hash_children(low, high) & self.bitmask) as usize
    }

    /// Look up a node by its children.
    pub fn find(&self, low: Ref, high: Ref, nodes: &[Node]) -> Option<NodeId> {
        let mut current = self.buckets[self.bucket_index(low, high)];

        while current != Node::NO_NEXT {
            let node = &nodes[current.index()];
            if node.low == low && node.high == high {
                return Some(current);
            }
            current = node.next;
        }

        None
    }

    /// Insert a node (prepend to its collision chain) and update `nodes[id].next`.
    pub fn insert(&mut self, id: NodeId, nodes: &mut [Node]) {
        let node = &nodes[id.index()];
        debug_assert_eq!(node.variable, self.variable, "node {} inserted into subtable of {}", id, self.variable);
        let bucket = self.bucket_index(node.low, node.high);
        nodes[id.index()].next = self.buckets[bucket];
        self.buckets[bucket] = id;
        self.count += 1;
    }

    /// Insert with automatic resizing if chains grow too long.
    pub fn insert_with_resize(&mut self, id: NodeId, nodes: &mut [Node]) {
        if self.should_resize() {
            self.resize(nodes);
        }
        self.insert(id, nodes);
    }

    /// Unlink every node for which `keep` returns false.
    ///
    /// Returns the ids of the removed nodes, in chain order.
    pub fn sweep(&mut self, nodes: &mut [Node], mut keep: impl FnMut(NodeId, &Node) -> bool) -> Vec<NodeId> {
        let mut removed = Vec::new();

        for b in 0..self.buckets.len() {
            let mut prev = Node::NO_NEXT;
            let mut current = self.buckets[b];

            while current != Node::NO_NEXT {
                let next = nodes[current.index()].next;
                if keep(current, &nodes[current.index()]) {
                    prev = current;
                } else {
                    if prev == Node::NO_NEXT {
                        self.buckets[b] = next;
                    } else {
                        nodes[prev.index()].next = next;
                    }
                    nodes[current.index()].next = Node::NO_NEXT;
                    self.count -= 1;
                    removed.push(current);
                }
                current = next;
            }
        }

        removed
    }

    /// Remove all nodes, returning their ids.
    pub fn drain(&mut self, nodes: &mut [Node]) -> Vec<NodeId> {
        self.sweep(nodes, |_, _| false)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over all node ids in this subtable.
    pub fn indices<'a>(&'a self, nodes: &'a [Node]) -> impl Iterator<Item = NodeId> + 'a {
        self.buckets.iter().flat_map(move |&head| ChainIter { current: head, nodes })
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Number of non-empty buckets.
    pub fn occupied_buckets(&self) -> usize {
        self.buckets.iter().filter(|&&head| head != Node::NO_NEXT).count()
    }

    /// Bytes held by the bucket array.
    pub fn memory_bytes(&self) -> usize {
        self.buckets.capacity() * std::mem::size_of::<NodeId>()
    }

    pub fn should_resize(&self) -> bool {
        self.count > self.buckets.len() * MAX_CHAIN_LENGTH
    }

    /// Double the bucket count and rehash all nodes.
    pub fn resize(&mut self, nodes: &mut [Node]) {
        log::debug!(
            "Resizing subtable for {}: {} -> {} buckets",
            self.variable,
            self.buckets.len(),
            self.buckets.len() * 2
        );

        let indices: Vec<NodeId> = self.indices(nodes).collect();

        let new_num_buckets = self.buckets.len() * 2;
        self.buckets = vec![Node::NO_NEXT; new_num_buckets];
        self.bitmask = (new_num_buckets - 1) as u64;
        self.count = 0;

        for id in indices {
            self.insert(id, nodes);
        }
    }
}

#[inline]
fn hash_children(low: Ref, high: Ref) -> u64 {
    MyHash::hash(&(low.raw() as u64, high.raw() as u64))
}

/// Iterator over a collision chain.
struct ChainIter<'a> {
    current: NodeId,
    nodes: &'a [Node],
}

impl Iterator for ChainIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == Node::NO_NEXT {
            return None;
        }
        let id = self.current;
        self.current = self.nodes[id.index()].next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn one() -> Ref {
        Ref::positive(NodeId::TERMINAL)
    }

    fn make_test_nodes() -> Vec<Node> {
        let v = Var::new(0);
        let mut nodes = vec![Node::default(); 5];
        nodes[0] = Node::terminal();
        nodes[1] = Node::new(v, -one(), one());
        nodes[2] = Node::new(v, Ref::positive(NodeId::new(1)), one());
        nodes[3] = Node::new(v, -one(), Ref::positive(NodeId::new(2)));
        nodes[4] = Node::new(v, Ref::negative(NodeId::new(2)), Ref::positive(NodeId::new(3)));
        nodes
    }

    #[test]
    fn test_subtable_basic() {
        let mut nodes = make_test_nodes();
        let mut st = Subtable::new(Var::new(0));

        assert!(st.find(-one(), one(), &nodes).is_none());

        st.insert(NodeId::new(1), &mut nodes);
        assert_eq!(st.find(-one(), one(), &nodes), Some(NodeId::new(1)));
        assert_eq!(st.len(), 1);

        let removed = st.drain(&mut nodes);
        assert_eq!(removed, vec![NodeId::new(1)]);
        assert!(st.find(-one(), one(), &nodes).is_none());
        assert!(st.is_empty());
    }

    #[test]
    fn test_subtable_collision_chain() {
        let mut nodes = make_test_nodes();
        let mut st = Subtable::with_bucket_bits(Var::new(0), 0); // a single bucket

        for i in 1..=4 {
            st.insert(NodeId::new(i), &mut nodes);
        }
        assert_eq!(st.len(), 4);

        for i in 1..=4 {
            let n = nodes[i as usize];
            assert_eq!(st.find(n.low, n.high, &nodes), Some(NodeId::new(i)));
        }

        // Remove the middle of the chain
        let removed = st.sweep(&mut nodes, |id, _| id != NodeId::new(2));
        assert_eq!(removed, vec![NodeId::new(2)]);
        assert_eq!(st.len(), 3);
        assert!(st.find(nodes[2].low, nodes[2].high, &nodes).is_none());
        assert_eq!(st.find(nodes[3].low, nodes[3].high, &nodes), Some(NodeId::new(3)));
        assert_eq!(st.find(nodes[1].low, nodes[1].high, &nodes), Some(NodeId::new(1)));
    }

    #[test]
    fn test_subtable_indices_iteration() {
        let mut nodes = make_test_nodes();
        let mut st = Subtable::new(Var::new(0));

        st.insert(NodeId::new(1), &mut nodes);
        st.insert(NodeId::new(3), &mut nodes);

        let mut indices: Vec<_> = st.indices(&nodes).map(|n| n.index()).collect();
        indices.sort();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_subtable_resize() {
        let mut nodes = make_test_nodes();
        let mut st = Subtable::with_bucket_bits(Var::new(0), 1);
        assert_eq!(st.num_buckets(), 2);

        for i in 1..=4 {
            st.insert(NodeId::new(i), &mut nodes);
        }
        assert!(!st.should_resize());

        st.resize(&mut nodes);
        assert_eq!(st.num_buckets(), 4);
        assert_eq!(st.len(), 4);
        for i in 1..=4 {
            let n = nodes[i as usize];
            assert_eq!(st.find(n.low, n.high, &nodes), Some(NodeId::new(i)));
        }
    }
}
