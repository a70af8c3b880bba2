//! Abstraction and substitution primitives.

use std::collections::HashMap;

use log::trace;

use crate::bdd::{Bdd, OpKey};
use crate::reference::Ref;
use crate::types::Var;

impl Bdd {
    /// Existential abstraction of the variables in the positive cube `cube`.
    pub fn exists(&self, f: Ref, cube: Ref) -> Ref {
        trace!("exists(f = {}, cube = {})", f, cube);

        if self.is_terminal(f) || self.is_one(cube) {
            return f;
        }

        // Drop cube variables above the top of f
        let lf = self.top_level(f);
        let mut cube = cube;
        while !self.is_one(cube) && self.top_level(cube) < lf {
            cube = self.high_node(cube);
        }
        if self.is_one(cube) {
            return f;
        }

        let key = OpKey::Exists(f, cube);
        if let Some(&res) = self.cache().get(&key) {
            return res;
        }

        let low = self.low_node(f);
        let high = self.high_node(f);
        let res = if self.top_level(cube) == lf {
            let rest = self.high_node(cube);
            let e = self.exists(low, rest);
            if self.is_one(e) {
                e
            } else {
                let t = self.exists(high, rest);
                self.apply_or(e, t)
            }
        } else {
            let v = self.variable(f.id());
            let e = self.exists(low, cube);
            let t = self.exists(high, cube);
            self.mk_node(v, e, t)
        };

        self.cache_mut().insert(key, res);
        res
    }

    /// Universal abstraction: `∀cube. f = ¬∃cube. ¬f`.
    pub fn forall(&self, f: Ref, cube: Ref) -> Ref {
        -self.exists(-f, cube)
    }

    /// `∃cube. (f ∧ g)` without building the conjunction first.
    pub fn and_exists(&self, f: Ref, g: Ref, cube: Ref) -> Ref {
        trace!("and_exists(f = {}, g = {}, cube = {})", f, g, cube);

        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return self.zero();
        }
        if self.is_one(f) && self.is_one(g) {
            return self.one();
        }
        if self.is_one(cube) {
            return self.apply_and(f, g);
        }
        if self.is_one(f) || f == g {
            return self.exists(g, cube);
        }
        if self.is_one(g) {
            return self.exists(f, cube);
        }

        // Commutative: normalize the operand order for the cache
        let (f, g) = if f.raw() <= g.raw() { (f, g) } else { (g, f) };

        let top = self.top_level(f).min(self.top_level(g));
        let mut cube = cube;
        while !self.is_one(cube) && self.top_level(cube) < top {
            cube = self.high_node(cube);
        }
        if self.is_one(cube) {
            return self.apply_and(f, g);
        }

        let key = OpKey::AndExists(f, g, cube);
        if let Some(&res) = self.cache().get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, top);
        let (g0, g1) = self.top_cofactors(g, top);

        let res = if self.top_level(cube) == top {
            let rest = self.high_node(cube);
            let t = self.and_exists(f1, g1, rest);
            if self.is_one(t) {
                t
            } else {
                let e = self.and_exists(f0, g0, rest);
                self.apply_or(t, e)
            }
        } else {
            let v = if self.top_level(f) == top {
                self.variable(f.id())
            } else {
                self.variable(g.id())
            };
            let e = self.and_exists(f0, g0, cube);
            let t = self.and_exists(f1, g1, cube);
            self.mk_node(v, e, t)
        };

        self.cache_mut().insert(key, res);
        res
    }

    /// Renames variables according to `perm`, indexed by variable index.
    ///
    /// All renamings happen at once: `perm` may map `x → y` and `y → x`.
    pub fn permute(&self, f: Ref, perm: &[Var]) -> Ref {
        let vector: Vec<Ref> = perm.iter().map(|&v| self.mk_var(v)).collect();
        self.vector_compose(f, &vector)
    }

    /// Exchanges `xs[i]` and `ys[i]` simultaneously for every `i`.
    pub fn swap_variables(&self, f: Ref, xs: &[Var], ys: &[Var]) -> Ref {
        assert_eq!(xs.len(), ys.len(), "swap lists must have equal length");
        for &v in xs.iter().chain(ys) {
            self.ensure_var(v);
        }

        let mut perm: Vec<Var> = (0..self.num_vars() as u32).map(Var::new).collect();
        for (&x, &y) in xs.iter().zip(ys) {
            perm[x.index()] = y;
            perm[y.index()] = x;
        }
        self.permute(f, &perm)
    }

    /// Substitutes `vector[v]` for every variable `v` of `f` simultaneously.
    ///
    /// Variables beyond the end of `vector` are left in place.
    pub fn vector_compose(&self, f: Ref, vector: &[Ref]) -> Ref {
        let mut cache = HashMap::new();
        self.vector_compose_(f, vector, &mut cache)
    }

    fn vector_compose_(&self, f: Ref, vector: &[Ref], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let regular = f.regular();
        if let Some(&res) = cache.get(&regular) {
            return res.negate_if(f.is_negated());
        }

        let v = self.variable(regular.id());
        let low = self.vector_compose_(self.low_node(regular), vector, cache);
        let high = self.vector_compose_(self.high_node(regular), vector, cache);
        let g = match vector.get(v.index()) {
            Some(&g) => g,
            None => self.mk_var(v),
        };
        let res = self.apply_ite(g, high, low);

        cache.insert(regular, res);
        res.negate_if(f.is_negated())
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

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);
        let f = bdd.apply_and(v[0], bdd.apply_or(v[1], v[2]));

        let c0 = bdd.cube_from_vars(&[Var::new(0)]);
        assert_eq!(bdd.exists(f, c0), bdd.apply_or(v[1], v[2]));

        let c12 = bdd.cube_from_vars(&[Var::new(1), Var::new(2)]);
        assert_eq!(bdd.exists(f, c12), v[0]);

        assert_eq!(bdd.exists(f, bdd.one()), f);
        let all = bdd.cube_from_vars(&[Var::new(0), Var::new(1), Var::new(2)]);
        assert_eq!(bdd.exists(f, all), bdd.one());
    }

    #[test]
    fn test_forall() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 2);
        let f = bdd.apply_or(v[0], v[1]);
        let c0 = bdd.cube_from_vars(&[Var::new(0)]);
        assert_eq!(bdd.forall(f, c0), v[1]);
        assert_eq!(bdd.forall(bdd.apply_imply(v[0], v[0]), c0), bdd.one());
    }

    #[test]
    fn test_and_exists_matches_composition() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 4);
        let f = bdd.apply_or(bdd.apply_and(v[0], v[1]), v[3]);
        let g = bdd.apply_xor(v[1], v[2]);

        for cube_vars in [vec![1], vec![0, 1], vec![1, 2, 3], vec![]] {
            let vs: Vec<Var> = cube_vars.into_iter().map(Var::new).collect();
            let cube = bdd.cube_from_vars(&vs);
            let expected = bdd.exists(bdd.apply_and(f, g), cube);
            assert_eq!(bdd.and_exists(f, g, cube), expected, "cube {:?}", vs);
        }
    }

    #[test]
    fn test_swap_variables_is_simultaneous() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);
        // f = x0 ∧ ¬x1 ∧ x2
        let f = bdd.apply_and(bdd.apply_and(v[0], -v[1]), v[2]);

        // x0 ↔ x1
        let g = bdd.swap_variables(f, &[Var::new(0)], &[Var::new(1)]);
        assert_eq!(g, bdd.apply_and(bdd.apply_and(v[1], -v[0]), v[2]));

        // x0 ↔ x2 leaves the symmetric part alone
        let h = bdd.swap_variables(f, &[Var::new(0)], &[Var::new(2)]);
        assert_eq!(h, f);
    }

    #[test]
    fn test_permute_rotation() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);
        let f = bdd.apply_and(v[0], -v[1]);

        // x0 → x1, x1 → x2, x2 → x0; renaming one pair at a time would give x2 ∧ ¬x2
        let perm = [Var::new(1), Var::new(2), Var::new(0)];
        assert_eq!(bdd.permute(f, &perm), bdd.apply_and(v[1], -v[2]));
    }

    #[test]
    fn test_vector_compose() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);
        let f = bdd.apply_and(v[0], v[1]);

        // x0 := x1 ∨ x2, x1 := ¬x0
        let g = bdd.vector_compose(f, &[bdd.apply_or(v[1], v[2]), -v[0]]);
        assert_truth_table(&bdd, g, 3, |a| (a[1] || a[2]) && !a[0]);
    }
}
