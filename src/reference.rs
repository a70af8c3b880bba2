use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::types::NodeId;

/// A reference to a BDD node, potentially complemented.
///
/// Uses a 32-bit representation where the least significant bit indicates
/// negation and the remaining bits store the node id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// Sentinel value representing an absent reference.
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    /// Creates a new reference with the given node id and negation flag.
    pub const fn new(id: NodeId, negated: bool) -> Self {
        Self((id.raw() << 1) | (negated as u32))
    }

    /// Creates a positive (regular) reference.
    pub const fn positive(id: NodeId) -> Self {
        Self::new(id, false)
    }

    /// Creates a negative (complemented) reference.
    pub const fn negative(id: NodeId) -> Self {
        Self::new(id, true)
    }

    /// Returns the node id this reference points to.
    #[inline]
    pub const fn id(self) -> NodeId {
        // INVALID maps onto NodeId::INVALID here.
        NodeId::from_raw(self.0 >> 1)
    }

    #[inline]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Strips the complement bit.
    #[inline]
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    /// Complements the reference when `flag` is set.
    #[inline]
    pub const fn negate_if(self, flag: bool) -> Self {
        Self(self.0 ^ (flag as u32))
    }

    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Returns the raw underlying value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::INVALID
    }
}

// -Ref
impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "~{}", self.id())
        } else {
            write!(f, "{}", self.id())
        }
    }
}
