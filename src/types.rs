//! Type-safe wrappers for node ids, variables and levels.
//!
//! Variables and levels are both small integers, and mixing them up is the
//! classic reordering bug. Keeping them in distinct newtypes makes the
//! compiler catch it.

use std::fmt;

/// A node identifier (index into the node storage array).
///
/// # Invariants
///
/// - `NodeId(0)` is the single terminal node (the constant `true`;
///   `false` is its complement)
/// - Decision nodes start at index 1
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The terminal node.
    pub const TERMINAL: NodeId = NodeId(0);

    /// Sentinel for empty buckets and end of collision chains.
    /// Only 31 bits are usable because [`Ref`](crate::reference::Ref) spends one on the complement flag.
    pub const INVALID: NodeId = NodeId(0x7FFF_FFFF);

    /// Creates a new node id.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit into 31 bits.
    pub const fn new(index: u32) -> Self {
        assert!(index <= 0x7FFF_FFFF, "NodeId must fit into 31 bits");
        NodeId(index)
    }

    pub(crate) const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the node index as a `usize` for array indexing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(index: u32) -> Self {
        NodeId::new(index)
    }
}

/// A variable index (0-based).
///
/// The index is the permanent identity of a variable: it is assigned once
/// at creation and never changes, while the variable's [`Level`] moves
/// under reordering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Pseudo-variable carried by the terminal node.
    pub const TERMINAL: Var = Var(u32::MAX);

    pub const fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the raw variable index.
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the variable index as a `usize` for array indexing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminal() {
            write!(f, "x⊤")
        } else {
            write!(f, "x{}", self.0)
        }
    }
}

impl From<u32> for Var {
    fn from(index: u32) -> Self {
        Var::new(index)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A level in the variable ordering (0 = top).
///
/// # Invariants
///
/// - Level 0 is the topmost level (closest to root)
/// - Levels increase downward toward terminals
/// - The terminal node sits at [`Level::TERMINAL`], below every variable
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u32);

impl Level {
    pub const TERMINAL: Level = Level(u32::MAX);

    pub const fn new(index: u32) -> Self {
        Level(index)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the next level down (index + 1).
    pub fn next(self) -> Self {
        Level(self.0 + 1)
    }

    /// Returns the previous level up (index - 1), or None if at level 0.
    pub fn prev(self) -> Option<Self> {
        if self.0 > 0 {
            Some(Level(self.0 - 1))
        } else {
            None
        }
    }

    pub fn is_top(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}
