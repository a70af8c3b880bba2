//! Cubes: conjunctions of literals, and their positional array form.
//!
//! The array form has one entry per variable index:
//! [`CUBE_FALSE`], [`CUBE_TRUE`] or [`CUBE_DONT_CARE`].

use log::trace;

use crate::bdd::{Bdd, OpKey};
use crate::reference::Ref;
use crate::types::Var;

pub const CUBE_FALSE: u8 = 0;
pub const CUBE_TRUE: u8 = 1;
pub const CUBE_DONT_CARE: u8 = 2;

impl Bdd {
    /// Builds the cube of the given literals, in any order.
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = (Var, bool)>) -> Ref {
        let mut literals: Vec<(Var, bool)> = literals.into_iter().collect();
        for &(v, _) in &literals {
            self.ensure_var(v);
        }
        // Bottom-up: deepest level first
        literals.sort_by_key(|&(v, _)| std::cmp::Reverse(self.level(v)));
        literals.dedup_by_key(|&mut (v, _)| v);

        let mut current = self.one();
        for (v, value) in literals {
            current = if value {
                self.mk_node(v, self.zero(), current)
            } else {
                self.mk_node(v, current, self.zero())
            };
        }
        current
    }

    /// Positive cube over `vars`.
    pub fn cube_from_vars(&self, vars: &[Var]) -> Ref {
        self.mk_cube(vars.iter().map(|&v| (v, true)))
    }

    /// Builds a cube from its positional array form.
    ///
    /// Entries other than [`CUBE_FALSE`] and [`CUBE_TRUE`] are treated as don't-care.
    pub fn cube_from_array(&self, array: &[u8]) -> Ref {
        self.mk_cube(array.iter().enumerate().filter_map(|(i, &e)| match e {
            CUBE_FALSE => Some((Var::new(i as u32), false)),
            CUBE_TRUE => Some((Var::new(i as u32), true)),
            _ => None,
        }))
    }

    /// Positional array of a cube, one entry per variable.
    ///
    /// Returns `None` if `f` is not a cube (constant `false` included).
    pub fn array_from_cube(&self, f: Ref) -> Option<Vec<u8>> {
        let mut array = vec![CUBE_DONT_CARE; self.num_vars()];
        let mut current = f;

        while !self.is_terminal(current) {
            let v = self.variable(current.id());
            let low = self.low_node(current);
            let high = self.high_node(current);
            if self.is_zero(low) {
                array[v.index()] = CUBE_TRUE;
                current = high;
            } else if self.is_zero(high) {
                array[v.index()] = CUBE_FALSE;
                current = low;
            } else {
                return None;
            }
        }

        self.is_one(current).then_some(array)
    }

    /// Variables `f` depends on, top to bottom.
    pub fn support_vars(&self, f: Ref) -> Vec<Var> {
        let mut vars: Vec<Var> = self
            .descendants([f])
            .into_iter()
            .map(|id| self.variable(id))
            .collect();
        vars.sort_by_key(|&v| self.level(v));
        vars.dedup();
        vars
    }

    /// The support of `f` as a positive cube.
    pub fn support(&self, f: Ref) -> Ref {
        self.cube_from_vars(&self.support_vars(f))
    }

    /// Restricts `f` to the assignment described by `cube`.
    pub fn cofactor(&self, f: Ref, cube: Ref) -> Ref {
        trace!("cofactor(f = {}, cube = {})", f, cube);
        debug_assert!(!self.is_zero(cube), "cofactor by the empty cube");

        if self.is_one(cube) || self.is_terminal(f) {
            return f;
        }

        let lf = self.top_level(f);
        let lc = self.top_level(cube);

        if lc < lf {
            // f does not depend on the top cube variable
            let low = self.low_node(cube);
            let rest = if self.is_zero(low) { self.high_node(cube) } else { low };
            return self.cofactor(f, rest);
        }

        let key = OpKey::Cofactor(f, cube);
        if let Some(&res) = self.cache().get(&key) {
            return res;
        }

        let res = if lc == lf {
            let low = self.low_node(cube);
            if self.is_zero(low) {
                self.cofactor(self.high_node(f), self.high_node(cube))
            } else {
                self.cofactor(self.low_node(f), low)
            }
        } else {
            let v = self.variable(f.id());
            let low = self.cofactor(self.low_node(f), cube);
            let high = self.cofactor(self.high_node(f), cube);
            self.mk_node(v, low, high)
        };

        self.cache_mut().insert(key, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Level;

    #[test]
    fn test_cube_array_round_trip() {
        let bdd = Bdd::default();
        bdd.ensure_var(Var::new(3));

        let array = vec![CUBE_TRUE, CUBE_DONT_CARE, CUBE_FALSE, CUBE_TRUE];
        let cube = bdd.cube_from_array(&array);
        assert_eq!(bdd.array_from_cube(cube), Some(array));
        assert!(bdd.eval(cube, &[true, false, false, true]));
        assert!(bdd.eval(cube, &[true, true, false, true]));
        assert!(!bdd.eval(cube, &[true, true, true, true]));
    }

    #[test]
    fn test_empty_cube_is_one() {
        let bdd = Bdd::default();
        assert_eq!(bdd.cube_from_array(&[]), bdd.one());
        assert_eq!(bdd.array_from_cube(bdd.one()), Some(vec![]));
    }

    #[test]
    fn test_non_cube() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(Var::new(0));
        let y = bdd.mk_var(Var::new(1));
        assert_eq!(bdd.array_from_cube(bdd.apply_or(x, y)), None);
        assert_eq!(bdd.array_from_cube(bdd.zero()), None);
        assert_eq!(bdd.array_from_cube(-x), Some(vec![CUBE_FALSE, CUBE_DONT_CARE]));
    }

    #[test]
    fn test_cube_respects_level_order() {
        let bdd = Bdd::default();
        bdd.ensure_var(Var::new(1));
        let z = bdd.new_var_at_level(Level::new(0));
        let cube = bdd.cube_from_vars(&[Var::new(0), z, Var::new(1)]);
        assert_eq!(bdd.variable(cube.id()), z);
        bdd.check_consistency().unwrap();
        assert_eq!(bdd.array_from_cube(cube), Some(vec![CUBE_TRUE; 3]));
    }

    #[test]
    fn test_support() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(Var::new(0));
        let z = bdd.mk_var(Var::new(2));
        let f = bdd.apply_xor(x, z);

        assert_eq!(bdd.support_vars(f), vec![Var::new(0), Var::new(2)]);
        assert_eq!(bdd.support(f), bdd.apply_and(x, z));
        assert_eq!(bdd.support(bdd.one()), bdd.one());
    }

    #[test]
    fn test_cofactor() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(Var::new(0));
        let y = bdd.mk_var(Var::new(1));
        let z = bdd.mk_var(Var::new(2));
        let f = bdd.apply_or(bdd.apply_and(x, y), z);

        let x1 = bdd.mk_cube([(Var::new(0), true)]);
        assert_eq!(bdd.cofactor(f, x1), bdd.apply_or(y, z));

        let x0 = bdd.mk_cube([(Var::new(0), false)]);
        assert_eq!(bdd.cofactor(f, x0), z);

        let y1z0 = bdd.mk_cube([(Var::new(1), true), (Var::new(2), false)]);
        assert_eq!(bdd.cofactor(f, y1z0), x);

        assert_eq!(bdd.cofactor(f, bdd.one()), f);
        assert_eq!(bdd.cofactor(-f, x0), -z);
    }
}
