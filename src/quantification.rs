//! Quantification, renaming and substitution over named variables.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{Error, Result};
use crate::function::Function;
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::Var;

impl Manager {
    /// `∃qvars. u`, or `∀qvars. u` if `forall` is set.
    pub fn quantify(&self, u: &Function, qvars: &[&str], forall: bool) -> Result<Function> {
        self.check_owner(u)?;
        let cube = self.encode_ordered_ref(qvars)?;
        let res = if forall {
            self.bdd().forall(u.node(), cube)
        } else {
            self.bdd().exists(u.node(), cube)
        };
        Ok(self.wrap(res))
    }

    pub fn exist(&self, u: &Function, qvars: &[&str]) -> Result<Function> {
        self.quantify(u, qvars, false)
    }

    pub fn forall(&self, u: &Function, qvars: &[&str]) -> Result<Function> {
        self.quantify(u, qvars, true)
    }

    /// `∃qvars. (u ∧ v)`, computed without the intermediate conjunction.
    pub fn and_exists(&self, u: &Function, v: &Function, qvars: &[&str]) -> Result<Function> {
        self.check_owner(u)?;
        self.check_owner(v)?;
        let cube = self.encode_ordered_ref(qvars)?;
        Ok(self.wrap(self.bdd().and_exists(u.node(), v.node(), cube)))
    }

    /// `∀qvars. (u ∨ v)`, the dual of [`and_exists`](Self::and_exists).
    pub fn or_forall(&self, u: &Function, v: &Function, qvars: &[&str]) -> Result<Function> {
        self.check_owner(u)?;
        self.check_owner(v)?;
        let cube = self.encode_ordered_ref(qvars)?;
        Ok(self.wrap(-self.bdd().and_exists(-u.node(), -v.node(), cube)))
    }

    /// Renames variables of `u` as given by `renaming`.
    ///
    /// Every pair `x → y` is applied as a simultaneous exchange of `x` and
    /// `y`. The domain and the codomain of `renaming` must be disjoint and
    /// no two names may map to the same target, otherwise the call fails
    /// with [`Error::AmbiguousRename`].
    pub fn rename(&self, u: &Function, renaming: &BTreeMap<String, String>) -> Result<Function> {
        self.check_owner(u)?;
        let xs = self.lookup_all(renaming.keys().map(String::as_str))?;
        let ys = self.lookup_all(renaming.values().map(String::as_str))?;

        let overlap: Vec<String> = renaming
            .values()
            .filter(|target| renaming.contains_key(*target))
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(Error::AmbiguousRename(overlap));
        }

        let mut targets = BTreeSet::new();
        let shared: BTreeSet<String> = renaming
            .values()
            .filter(|&target| !targets.insert(target))
            .cloned()
            .collect();
        if !shared.is_empty() {
            return Err(Error::AmbiguousRename(shared.into_iter().collect()));
        }

        debug!("rename {:?}", renaming);
        Ok(self.wrap(self.bdd().swap_variables(u.node(), &xs, &ys)))
    }

    /// Substitutes functions for variables of `u`, all at once.
    pub fn compose(&self, u: &Function, substitution: &BTreeMap<String, Function>) -> Result<Function> {
        self.check_owner(u)?;
        for g in substitution.values() {
            self.check_owner(g)?;
        }
        let vars = self.lookup_all(substitution.keys().map(String::as_str))?;

        let bdd = self.bdd();
        let mut vector: Vec<Ref> = (0..bdd.num_vars() as u32).map(|i| bdd.mk_var(Var::new(i))).collect();
        for (var, g) in vars.iter().zip(substitution.values()) {
            vector[var.index()] = g.node();
        }
        Ok(self.wrap(bdd.vector_compose(u.node(), &vector)))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn setup() -> (Manager, [Function; 4]) {
        let mgr = Manager::new();
        mgr.declare(&["a", "b", "c", "d"]).unwrap();
        let vars = ["a", "b", "c", "d"].map(|n| mgr.var(n).unwrap());
        (mgr, vars)
    }

    fn renaming(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|&(x, y)| (x.to_string(), y.to_string())).collect()
    }

    #[test]
    fn test_exist_and_forall() {
        let (mgr, [a, b, c, _]) = setup();
        let f = &(&a & &b) | &c;
        assert_eq!(mgr.exist(&f, &["a"]).unwrap(), &b | &c);
        assert_eq!(mgr.forall(&f, &["a"]).unwrap(), c);
        assert!(mgr.exist(&f, &["a", "b", "c"]).unwrap().is_one());
        assert_eq!(mgr.quantify(&f, &[], true).unwrap(), f);
        assert!(matches!(mgr.exist(&f, &["q"]), Err(Error::UnknownVariable(_))));
    }

    #[test]
    fn test_and_exists_matches_two_steps() {
        let (mgr, [a, b, c, d]) = setup();
        let u = &(&a ^ &b) | &d;
        let v = &(&b & &c) | &!&d;
        let expected = mgr.exist(&(&u & &v), &["b", "d"]).unwrap();
        assert_eq!(mgr.and_exists(&u, &v, &["b", "d"]).unwrap(), expected);
    }

    #[test]
    fn test_or_forall_is_dual() {
        let (mgr, [a, b, c, _]) = setup();
        let u = &a & &b;
        let v = &!&a & &c;
        let expected = mgr.forall(&(&u | &v), &["a"]).unwrap();
        assert_eq!(mgr.or_forall(&u, &v, &["a"]).unwrap(), expected);
        assert_eq!(expected, &b & &c);
    }

    #[test]
    fn test_rename() {
        let (mgr, [a, b, c, d]) = setup();
        let f = &a & &!&b;
        let g = mgr.rename(&f, &renaming(&[("a", "c"), ("b", "d")])).unwrap();
        assert_eq!(g, &c & &!&d);
        assert_eq!(
            mgr.support(&g).unwrap().into_iter().collect::<Vec<_>>(),
            vec!["c", "d"]
        );
    }

    #[test]
    fn test_rename_swaps_targets_in_support() {
        let (mgr, [a, b, _, _]) = setup();
        let f = &a & &!&b;
        // a and b trade places
        assert_eq!(mgr.rename(&f, &renaming(&[("a", "b")])).unwrap(), &b & &!&a);
    }

    #[test]
    fn test_rename_rejects_ambiguous_maps() {
        let (mgr, [a, _, _, _]) = setup();
        assert!(matches!(
            mgr.rename(&a, &renaming(&[("a", "b"), ("b", "c")])),
            Err(Error::AmbiguousRename(names)) if names == vec!["b".to_string()]
        ));
        assert!(matches!(
            mgr.rename(&a, &renaming(&[("a", "c"), ("b", "c")])),
            Err(Error::AmbiguousRename(names)) if names == vec!["c".to_string()]
        ));
        assert!(matches!(
            mgr.rename(&a, &renaming(&[("a", "zz")])),
            Err(Error::UnknownVariable(n)) if n == "zz"
        ));
    }

    #[test]
    fn test_compose() {
        let (mgr, [a, b, c, d]) = setup();
        let f = &a ^ &b;
        let sub: BTreeMap<String, Function> = [("a".to_string(), &c & &d), ("b".to_string(), a.clone())].into();
        assert_eq!(mgr.compose(&f, &sub).unwrap(), &(&c & &d) ^ &a);
        assert_eq!(mgr.compose(&f, &BTreeMap::new()).unwrap(), f);
    }
}
