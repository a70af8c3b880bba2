//! Dynamic variable reordering.
//!
//! # Variable ordering
//!
//! The size of a BDD is highly sensitive to the variable order. For
//! `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)` the interleaved order
//! `x₁, y₁, x₂, y₂, ...` gives O(n) nodes while `x₁, ..., xₙ, y₁, ..., yₙ`
//! gives O(2ⁿ). Finding the optimal order is NP-complete, so we use
//! Rudell's sifting heuristic.
//!
//! # In-place swap
//!
//! All reordering is built on [`swap_adjacent`](Bdd::swap_adjacent), which
//! exchanges the variables at two neighbouring levels *in place*: a node
//! that represented `f` before the swap still represents `f` afterwards.
//! Handles held by callers therefore stay valid across reordering.
//!
//! For a node `f = (x, f0, f1)` whose children depend on `y`:
//!
//! ```text
//!        x                y
//!      /   \            /   \
//!     y     y   ==>    x     x
//!    / \   / \        / \   / \
//!  f00 f01 f10 f11  f00 f10 f01 f11
//! ```
//!
//! the node is rewritten to `(y, mk(x, f00, f10), mk(x, f01, f11))`. Nodes
//! of `x` that do not depend on `y` just move one level down, and the nodes
//! of `y` move one level up unchanged.
//!
//! # Sifting
//!
//! Each variable in turn (most used first) is moved up to the top, then
//! down to the bottom, and finally back to the level where the diagram was
//! smallest. A direction is abandoned early once the size exceeds
//! `max_growth` times the best size seen. At most `max_vars` variables are
//! sifted and at most `max_swaps` swaps are performed in one pass.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info};

use crate::bdd::Bdd;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::{Level, NodeId, Var};

/// Statistics collected during reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderStats {
    /// Number of variable swaps performed
    pub swaps: usize,
    /// Live node count before reordering
    pub initial_size: usize,
    /// Live node count after reordering
    pub final_size: usize,
    /// Number of variables sifted
    pub variables_processed: usize,
}

impl ReorderStats {
    /// Calculate the size reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }
}

impl Bdd {
    /// Swaps the variables at `level` and `level + 1` in place.
    ///
    /// # Panics
    ///
    /// Panics if `level + 1` is not a valid level.
    pub fn swap_adjacent(&self, level: Level) {
        let i = level.index();
        assert!(i + 1 < self.num_vars(), "Level {} out of bounds (only {} levels)", level.next(), self.num_vars());

        let (x, y) = {
            let mut order = self.var_order_mut();
            let (x, y) = (order[i], order[i + 1]);
            order.swap(i, i + 1);
            (x, y)
        };
        {
            let mut level_map = self.level_map_mut();
            level_map[x.index()] = level.next();
            level_map[y.index()] = level;
        }

        // subtables[i] now belongs to y and subtables[i + 1] to x
        let x_nodes = {
            let mut subtables = self.subtables_mut();
            subtables.swap(i, i + 1);
            let mut nodes = self.nodes_mut();
            subtables[i + 1].drain(&mut nodes)
        };

        let depends_on_y = |id: NodeId| {
            let node = self.node(id);
            self.variable(node.low.id()) == y || self.variable(node.high.id()) == y
        };
        let (rewrite, keep): (Vec<NodeId>, Vec<NodeId>) = x_nodes.into_iter().partition(|&id| depends_on_y(id));
        debug!("Swap {} <-> {} at level {}: {} nodes rewritten, {} moved", x, y, level, rewrite.len(), keep.len());

        {
            let mut subtables = self.subtables_mut();
            let mut nodes = self.nodes_mut();
            for &id in &keep {
                subtables[i + 1].insert_with_resize(id, &mut nodes);
            }
        }

        for id in rewrite {
            let node = self.node(id);
            let (f00, f01) = self.cofactors_by(node.low, y);
            let (f10, f11) = self.cofactors_by(node.high, y);

            let low = self.mk_node(x, f00, f10);
            let high = self.mk_node(x, f01, f11);
            debug_assert!(!high.is_negated());
            debug_assert_ne!(low, high);

            let mut subtables = self.subtables_mut();
            let mut nodes = self.nodes_mut();
            nodes[id.index()] = Node {
                variable: y,
                low,
                high,
                next: Node::NO_NEXT,
                rc: node.rc,
            };
            subtables[i].insert_with_resize(id, &mut nodes);
        }

        self.cache_mut().clear();
    }

    /// Children of `f` with respect to `y`, or `(f, f)` if `f`'s top variable is not `y`.
    fn cofactors_by(&self, f: Ref, y: Var) -> (Ref, Ref) {
        if self.variable(f.id()) == y {
            (self.low_node(f), self.high_node(f))
        } else {
            (f, f)
        }
    }

    /// Moves `var` to `target` by adjacent swaps. Returns the number of swaps.
    pub fn move_variable_to_level(&self, var: Var, target: Level) -> usize {
        let mut current = self.level(var);
        let mut swaps = 0;

        while current < target {
            self.swap_adjacent(current);
            current = current.next();
            swaps += 1;
        }
        while let Some(prev) = current.prev().filter(|_| current > target) {
            self.swap_adjacent(prev);
            current = prev;
            swaps += 1;
        }

        swaps
    }

    /// Reorders to `order` (top to bottom), which must be a permutation of all variables.
    pub fn shuffle(&self, order: &[Var]) -> usize {
        assert_eq!(order.len(), self.num_vars(), "order must list every variable");

        let start = Instant::now();
        let mut swaps = 0;
        for (t, &var) in order.iter().enumerate() {
            swaps += self.move_variable_to_level(var, Level::new(t as u32));
        }
        self.collect_garbage();
        debug!("Shuffle to {:?}: {} swaps in {:?}", order, swaps, start.elapsed());

        swaps
    }

    /// Number of allocated nodes per variable.
    fn variable_usage_counts(&self) -> HashMap<Var, usize> {
        self.subtables().iter().map(|st| (st.variable, st.len())).collect()
    }

    /// One sifting pass over all variables, bounded by the current options.
    pub fn sift(&self) -> ReorderStats {
        let options = self.options();
        self.collect_garbage();
        let initial_size = self.allocated_nodes();

        let usage = self.variable_usage_counts();
        let mut vars: Vec<Var> = self.var_order().into_iter().filter(|v| usage[v] > 0).collect();
        vars.sort_by(|a, b| usage[b].cmp(&usage[a]).then(a.cmp(b)));
        vars.truncate(options.max_vars);

        let mut swaps_left = options.max_swaps;
        let mut processed = 0;
        for &var in &vars {
            if swaps_left == 0 {
                debug!("Sifting stopped: swap budget exhausted");
                break;
            }
            self.sift_variable(var, options.max_growth, &mut swaps_left);
            processed += 1;
        }

        let final_size = self.allocated_nodes();
        ReorderStats {
            swaps: options.max_swaps - swaps_left,
            initial_size,
            final_size,
            variables_processed: processed,
        }
    }

    /// Sifts one variable to its locally best level.
    fn sift_variable(&self, var: Var, max_growth: f64, swaps_left: &mut usize) {
        let n = self.num_vars() as u32;
        let mut current = self.level(var);
        let mut best_level = current;
        let mut best_size = self.allocated_nodes();

        let step = |to: Level, from: Level, swaps_left: &mut usize| -> Option<usize> {
            if *swaps_left == 0 {
                return None;
            }
            self.swap_adjacent(from.min(to));
            self.collect_garbage();
            *swaps_left -= 1;
            Some(self.allocated_nodes())
        };

        // Up
        while let Some(prev) = current.prev() {
            let Some(size) = step(prev, current, swaps_left) else { break };
            current = prev;
            if size < best_size {
                best_size = size;
                best_level = current;
            } else if size as f64 > max_growth * best_size as f64 {
                break;
            }
        }

        // Down
        while current.raw() + 1 < n {
            let next = current.next();
            let Some(size) = step(next, current, swaps_left) else { break };
            current = next;
            if size < best_size {
                best_size = size;
                best_level = current;
            } else if size as f64 > max_growth * best_size as f64 {
                break;
            }
        }

        // Returning to the best level is not limited by the budget
        let back = self.move_variable_to_level(var, best_level);
        self.collect_garbage();
        *swaps_left = swaps_left.saturating_sub(back);
        debug!("Sifted {} to level {} (size {})", var, best_level, best_size);
    }

    /// Sifting pass with timing and counters, used by explicit and automatic reordering.
    pub fn reorder_sift(&self) -> ReorderStats {
        self.reordering_active().set(true);
        let start = Instant::now();
        let stats = self.sift();
        let elapsed = start.elapsed();
        self.reordering_active().set(false);

        let mut counters = self.counters_mut();
        counters.reorderings += 1;
        counters.reorder_time += elapsed;
        info!(
            "Reordering: {} -> {} nodes, {} swaps, {} variables, {:?}",
            stats.initial_size, stats.final_size, stats.swaps, stats.variables_processed, elapsed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::tests::assert_truth_table;

    fn vars(bdd: &Bdd, n: u32) -> Vec<Ref> {
        (0..n).map(|i| bdd.mk_var(Var::new(i))).collect()
    }

    /// (x0 ∧ x3) ∨ (x1 ∧ x4) ∨ (x2 ∧ x5): exponential in the identity order.
    fn pairs(bdd: &Bdd) -> Ref {
        let v = vars(bdd, 6);
        let mut f = bdd.zero();
        for i in 0..3 {
            f = bdd.apply_or(f, bdd.apply_and(v[i], v[i + 3]));
        }
        f
    }

    fn pairs_fn(a: &[bool]) -> bool {
        (a[0] && a[3]) || (a[1] && a[4]) || (a[2] && a[5])
    }

    #[test]
    fn test_swap_preserves_function_and_handle() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);
        let f = bdd.apply_or(bdd.apply_and(v[0], v[1]), v[2]);
        bdd.ref_node(f);

        bdd.swap_adjacent(Level::new(0));
        assert_eq!(bdd.var_order(), vec![Var::new(1), Var::new(0), Var::new(2)]);
        assert_eq!(bdd.level(Var::new(0)), Level::new(1));
        bdd.check_consistency().unwrap();
        assert_truth_table(&bdd, f, 3, |a| (a[0] && a[1]) || a[2]);

        bdd.swap_adjacent(Level::new(1));
        bdd.check_consistency().unwrap();
        assert_truth_table(&bdd, f, 3, |a| (a[0] && a[1]) || a[2]);

        bdd.deref_node(f);
    }

    #[test]
    fn test_swap_keeps_canonicity() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 2);
        let f = bdd.apply_xor(v[0], v[1]);
        bdd.ref_node(f);

        bdd.swap_adjacent(Level::new(0));
        bdd.collect_garbage();
        bdd.check_consistency().unwrap();

        // Rebuilding the same function finds the rewritten node
        let g = bdd.apply_xor(bdd.mk_var(Var::new(1)), bdd.mk_var(Var::new(0)));
        assert_eq!(g, f);
        bdd.deref_node(f);
    }

    #[test]
    fn test_move_variable_to_level() {
        let bdd = Bdd::default();
        let f = pairs(&bdd);
        bdd.ref_node(f);

        assert_eq!(bdd.move_variable_to_level(Var::new(0), Level::new(4)), 4);
        assert_eq!(bdd.level(Var::new(0)), Level::new(4));
        assert_truth_table(&bdd, f, 6, pairs_fn);

        assert_eq!(bdd.move_variable_to_level(Var::new(0), Level::new(0)), 4);
        assert_eq!(bdd.move_variable_to_level(Var::new(0), Level::new(0)), 0);
        bdd.check_consistency().unwrap();
        bdd.deref_node(f);
    }

    #[test]
    fn test_shuffle() {
        let bdd = Bdd::default();
        let f = pairs(&bdd);
        bdd.ref_node(f);
        bdd.collect_garbage();
        let before = bdd.allocated_nodes();

        let order: Vec<Var> = [0, 3, 1, 4, 2, 5].into_iter().map(Var::new).collect();
        bdd.shuffle(&order);
        assert_eq!(bdd.var_order(), order);
        bdd.check_consistency().unwrap();
        assert_truth_table(&bdd, f, 6, pairs_fn);
        assert!(bdd.allocated_nodes() < before);
        assert_eq!(bdd.allocated_nodes(), 6);
        bdd.deref_node(f);
    }

    #[test]
    fn test_sift_reduces_size() {
        let bdd = Bdd::default();
        let f = pairs(&bdd);
        bdd.ref_node(f);

        let stats = bdd.reorder_sift();
        assert!(stats.final_size < stats.initial_size);
        assert!(stats.reduction_ratio() > 0.0);
        assert_eq!(bdd.counters().reorderings, 1);
        bdd.check_consistency().unwrap();
        assert_truth_table(&bdd, f, 6, pairs_fn);
        bdd.deref_node(f);
    }

    #[test]
    fn test_sift_respects_swap_budget() {
        let bdd = Bdd::default();
        let f = pairs(&bdd);
        bdd.ref_node(f);
        bdd.options_mut().max_swaps = 3;

        let stats = bdd.sift();
        assert!(stats.swaps <= 3);
        assert!(stats.variables_processed <= 3);
        bdd.check_consistency().unwrap();
        assert_truth_table(&bdd, f, 6, pairs_fn);
        bdd.deref_node(f);
    }
}
