//! Copying functions between managers.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::manager::Manager;
use crate::reference::Ref;

impl Bdd {
    /// Rebuilds `f` in `target`, mapping each variable to the same index.
    ///
    /// The result is correct for any variable order of `target`.
    pub fn copy_into(&self, f: Ref, target: &Bdd) -> Ref {
        let mut cache = HashMap::new();
        self.copy_into_(f, target, &mut cache)
    }

    fn copy_into_(&self, f: Ref, target: &Bdd, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return target.constant(self.is_one(f));
        }

        let regular = f.regular();
        if let Some(&res) = cache.get(&regular) {
            return res.negate_if(f.is_negated());
        }

        let v = self.variable(regular.id());
        let low = self.copy_into_(self.low_node(regular), target, cache);
        let high = self.copy_into_(self.high_node(regular), target, cache);
        target.ensure_var(v);
        let res = target.apply_ite(target.mk_var(v), high, low);

        cache.insert(regular, res);
        res.negate_if(f.is_negated())
    }
}

impl Manager {
    /// Copies `u` from this manager into `target`.
    ///
    /// Every variable in the support of `u` must be registered in `target`
    /// under the same name and index, otherwise this fails with
    /// [`Error::MissingVariables`] or [`Error::IndexMismatch`] and
    /// `target` is left untouched.
    pub fn transfer(&self, u: &Function, target: &Manager) -> Result<Function> {
        self.check_owner(u)?;
        if target == self {
            return Ok(u.clone());
        }

        // Computing the support must not trigger a reordering
        let reordering = self.reordering();
        self.set_reordering(false);
        let support = self.support(u);
        self.set_reordering(reordering);
        let support = support?;

        let missing: Vec<String> = support.iter().filter(|name| !target.contains(name)).cloned().collect();
        if !missing.is_empty() {
            return Err(Error::MissingVariables(missing));
        }
        for name in &support {
            let source_index = self.index_of(name)?;
            let target_index = target.index_of(name)?;
            if source_index != target_index {
                return Err(Error::IndexMismatch {
                    name: name.clone(),
                    source_index,
                    target_index,
                });
            }
        }

        debug!(
            "Transferring {} ({} nodes) from manager #{} to #{}",
            u,
            u.node_count(),
            self.id(),
            target.id()
        );
        let res = self.bdd().copy_into(u.node(), target.bdd());
        Ok(target.wrap(res))
    }
}
