use crate::reference::Ref;
use crate::types::{NodeId, Var};
use crate::utils::MyHash;

/// A BDD decision node.
///
/// # Invariants
///
/// - `high` is never complemented (canonical form with complement edges)
/// - `low != high`
/// - `rc` counts external references only (handles); internal edges are
///   not counted, reachability from referenced nodes keeps a node alive
/// - A free slot has `low == Ref::INVALID`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub variable: Var,
    pub low: Ref,
    pub high: Ref,
    /// Next node in the subtable collision chain.
    pub next: NodeId,
    pub rc: u32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: Var::TERMINAL,
            low: Ref::INVALID,
            high: Ref::INVALID,
            next: Self::NO_NEXT,
            rc: 0,
        }
    }
}

impl Node {
    /// Sentinel value for end of hash collision chain.
    pub const NO_NEXT: NodeId = NodeId::INVALID;

    pub fn new(variable: Var, low: Ref, high: Ref) -> Self {
        Self {
            variable,
            low,
            high,
            next: Self::NO_NEXT,
            rc: 0,
        }
    }

    /// The terminal node: variable and children are sentinels.
    pub fn terminal() -> Self {
        Self {
            variable: Var::TERMINAL,
            low: Ref::positive(NodeId::TERMINAL),
            high: Ref::positive(NodeId::TERMINAL),
            next: Self::NO_NEXT,
            rc: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.low.is_valid()
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        MyHash::hash(&(self.variable.id() as u64, self.low.raw() as u64, self.high.raw() as u64))
    }
}
