//! Reference-counted handles to Boolean functions.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::ops::Operator;
use crate::reference::Ref;

/// A Boolean function owned by a [`Manager`].
///
/// Each handle holds one reference on its engine node: cloning takes
/// another one, dropping releases it. Nodes without references are
/// reclaimed by the next garbage collection.
///
/// Equality is node identity, which for canonical BDDs is semantic
/// equivalence. Comparing functions of different managers panics; use
/// [`try_eq`](Self::try_eq) to get an error instead.
pub struct Function {
    manager: Manager,
    node: Ref,
}

impl Function {
    pub(crate) fn new(manager: &Manager, node: Ref) -> Self {
        assert!(node.is_valid(), "invalid node reference");
        manager.bdd().ref_node(node);
        Self {
            manager: manager.clone(),
            node,
        }
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The engine reference behind this handle.
    pub fn node(&self) -> Ref {
        self.node
    }

    pub fn is_one(&self) -> bool {
        self.manager.bdd().is_one(self.node)
    }

    pub fn is_zero(&self) -> bool {
        self.manager.bdd().is_zero(self.node)
    }

    pub fn is_constant(&self) -> bool {
        self.manager.bdd().is_terminal(self.node)
    }

    /// Whether the edge to the node is complemented.
    pub fn is_negated(&self) -> bool {
        self.node.is_negated()
    }

    /// The same function through a regular edge, i.e. `¬self` if negated.
    pub fn regular(&self) -> Function {
        Function::new(&self.manager, self.node.regular())
    }

    /// Index of the top variable, `None` for constants.
    pub fn index(&self) -> Option<u32> {
        let var = self.manager.bdd().variable(self.node.id());
        (!var.is_terminal()).then(|| var.id())
    }

    /// Name of the top variable, `None` for constants.
    pub fn var_name(&self) -> Option<String> {
        self.index().and_then(|i| self.manager.name_of(i))
    }

    /// Current level of the top variable, `None` for constants.
    pub fn level(&self) -> Option<u32> {
        self.index().map(|_| self.manager.bdd().top_level(self.node).raw())
    }

    /// Number of references held on the node.
    pub fn ref_count(&self) -> u32 {
        self.manager.bdd().ref_count(self.node)
    }

    /// The function with the top variable set to false, `None` for constants.
    pub fn low(&self) -> Option<Function> {
        (!self.is_constant()).then(|| Function::new(&self.manager, self.manager.bdd().low_node(self.node)))
    }

    /// The function with the top variable set to true, `None` for constants.
    pub fn high(&self) -> Option<Function> {
        (!self.is_constant()).then(|| Function::new(&self.manager, self.manager.bdd().high_node(self.node)))
    }

    /// Number of distinct nodes reachable from this function, terminal included.
    pub fn node_count(&self) -> usize {
        self.manager.bdd().dag_size(self.node)
    }

    /// Equality that reports functions of different managers as an error.
    pub fn try_eq(&self, other: &Function) -> Result<bool> {
        if self.manager != other.manager {
            return Err(Error::ManagerMismatch);
        }
        Ok(self.node == other.node)
    }

    fn binary(&self, op: Operator, other: &Function) -> Function {
        self.manager
            .apply_op(op, self, Some(other))
            .unwrap_or_else(|e| panic!("{} {} {}: {}", self, op, other, e))
    }
}

impl Clone for Function {
    fn clone(&self) -> Self {
        Function::new(&self.manager, self.node)
    }
}

impl Drop for Function {
    fn drop(&mut self) {
        self.manager.bdd().deref_node(self.node);
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match self.try_eq(other) {
            Ok(eq) => eq,
            Err(_) => panic!(
                "ownership violation: comparing functions of managers #{} and #{}",
                self.manager.id(),
                other.manager.id()
            ),
        }
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.manager.id().hash(state);
        self.node.hash(state);
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("manager", &self.manager.id())
            .field("node", &self.node)
            .finish()
    }
}

impl Not for &Function {
    type Output = Function;

    fn not(self) -> Function {
        Function::new(&self.manager, -self.node)
    }
}

impl Not for Function {
    type Output = Function;

    fn not(self) -> Function {
        !&self
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for &Function {
            type Output = Function;

            fn $method(self, rhs: &Function) -> Function {
                self.binary($op, rhs)
            }
        }

        impl $trait for Function {
            type Output = Function;

            fn $method(self, rhs: Function) -> Function {
                self.binary($op, &rhs)
            }
        }
    };
}

impl_binary_op!(BitAnd, bitand, Operator::And);
impl_binary_op!(BitOr, bitor, Operator::Or);
impl_binary_op!(BitXor, bitxor, Operator::Xor);

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn setup() -> (Manager, Function, Function) {
        let mgr = Manager::new();
        mgr.declare(&["x", "y"]).unwrap();
        let x = mgr.var("x").unwrap();
        let y = mgr.var("y").unwrap();
        (mgr, x, y)
    }

    #[test]
    fn test_clone_and_drop_balance() {
        let (_mgr, x, _y) = setup();
        let base = x.ref_count();
        let copies: Vec<Function> = (0..5).map(|_| x.clone()).collect();
        assert_eq!(x.ref_count(), base + 5);
        drop(copies);
        assert_eq!(x.ref_count(), base);
    }

    #[test]
    fn test_accessors() {
        let (mgr, x, y) = setup();
        let f = &x & &y;
        assert_eq!(f.index(), Some(0));
        assert_eq!(f.var_name().as_deref(), Some("x"));
        assert_eq!(f.level(), Some(0));
        assert_eq!(f.node_count(), 3);
        assert_eq!(f.high().unwrap(), y);
        assert!(f.low().unwrap().is_zero());

        let one = mgr.one();
        assert!(one.is_constant());
        assert_eq!(one.index(), None);
        assert!(one.low().is_none());
        assert_eq!(one.node_count(), 1);
    }

    #[test]
    fn test_children_of_complement() {
        let (_mgr, x, y) = setup();
        let f = !(&x & &y);
        // ¬(x ∧ y) restricted to x = 1 is ¬y
        assert_eq!(f.high().unwrap(), !&y);
        assert!(f.low().unwrap().is_one());
        assert!(!f.regular().is_negated());
        assert_eq!(f.is_negated(), f.regular() != f);
    }

    #[test]
    fn test_operators() {
        let (_mgr, x, y) = setup();
        assert_eq!(&x & &y, &y & &x);
        assert_eq!(!!x.clone(), x);
        assert_eq!(&x ^ &x, x.manager().zero());
        assert_eq!(!(&x | &y), &!&x & &!&y);
        assert_eq!(x.clone() & y.clone(), &x & &y);
    }

    #[test]
    fn test_try_eq_across_managers() {
        let (_m1, x1, _) = setup();
        let (_m2, x2, _) = setup();
        assert!(matches!(x1.try_eq(&x2), Err(Error::ManagerMismatch)));
        assert!(x1.try_eq(&x1.clone()).unwrap());
    }

    #[test]
    #[should_panic(expected = "ownership violation")]
    fn test_eq_across_managers_panics() {
        let (_m1, x1, _) = setup();
        let (_m2, x2, _) = setup();
        let _ = x1 == x2;
    }

    #[test]
    #[should_panic(expected = "different managers")]
    fn test_operator_across_managers_panics() {
        let (_m1, x1, _) = setup();
        let (_m2, x2, _) = setup();
        let _ = &x1 & &x2;
    }

    #[test]
    fn test_hash_set() {
        use std::collections::HashSet;

        let (_mgr, x, y) = setup();
        let set: HashSet<Function> = [x.clone(), y.clone(), x.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
