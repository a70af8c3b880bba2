use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::cube::{CUBE_DONT_CARE, CUBE_FALSE, CUBE_TRUE};
use crate::reference::Ref;
use crate::types::Var;

impl Bdd {
    /// Returns one satisfying path of `f` as literals, top to bottom.
    ///
    /// Variables not on the path are unconstrained.
    /// Returns `None` if `f` is the constant false function.
    pub fn one_sat(&self, f: Ref) -> Option<Vec<(Var, bool)>> {
        if self.is_zero(f) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = f;

        // Walk down, always picking a satisfiable branch
        while !self.is_one(current) {
            let var = self.variable(current.id());
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push((var, true));
                current = high;
            } else {
                path.push((var, false));
                current = self.low_node(current);
            }
        }

        Some(path)
    }

    /// One satisfying cube of `f` in positional array form.
    pub fn pick_cube(&self, f: Ref) -> Option<Vec<u8>> {
        let path = self.one_sat(f)?;
        let mut array = vec![CUBE_DONT_CARE; self.num_vars()];
        for (v, value) in path {
            array[v.index()] = if value { CUBE_TRUE } else { CUBE_FALSE };
        }
        Some(array)
    }

    /// Number of satisfying assignments of `f` over `num_vars` variables.
    pub fn sat_count(&self, f: Ref, num_vars: usize) -> BigUint {
        let max = BigUint::from(1u32) << num_vars;
        let mut cache = HashMap::new();
        self.sat_count_(f, &max, &mut cache)
    }

    fn sat_count_(&self, f: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(f) {
            return BigUint::ZERO;
        } else if self.is_one(f) {
            return max.clone();
        }

        let regular = f.regular();
        let count = match cache.get(&regular) {
            Some(count) => count.clone(),
            None => {
                let low = self.sat_count_(self.low_node(regular), max, cache);
                let high = self.sat_count_(self.high_node(regular), max, cache);
                let count: BigUint = (low + high) >> 1;
                cache.insert(regular, count.clone());
                count
            }
        };

        if f.is_negated() {
            max - count
        } else {
            count
        }
    }
}
