//! Name ↔ index bookkeeping for the variables of one manager.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::Var;

/// Bidirectional map between variable names and engine indices.
///
/// Levels are not stored here: they change under reordering and are always
/// read from the engine.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    by_name: HashMap<String, Var>,
    /// Indexed by variable index; `None` for engine variables without a name.
    by_index: Vec<Option<String>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of named variables.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn var(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    /// Like [`var`](Self::var), failing with [`Error::UnknownVariable`].
    pub fn lookup(&self, name: &str) -> Result<Var> {
        self.var(name).ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    pub fn name(&self, var: Var) -> Option<&str> {
        self.by_index.get(var.index()).and_then(|n| n.as_deref())
    }

    /// Names indexed by variable index.
    pub fn names_by_index(&self) -> &[Option<String>] {
        &self.by_index
    }

    /// All named variables, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Var)> {
        self.by_name.iter().map(|(name, &var)| (name.as_str(), var))
    }

    /// Smallest index not bound to a name.
    pub fn next_free_index(&self) -> u32 {
        self.by_index
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.by_index.len()) as u32
    }

    /// Decides which variable `name` gets, without changing anything.
    ///
    /// Returns `Ok((var, true))` if `name` is already registered (and the
    /// requested index, if any, matches), `Ok((var, false))` if it would be
    /// newly bound to `var`.
    pub fn resolve(&self, name: &str, index: Option<u32>) -> Result<(Var, bool)> {
        if let Some(var) = self.var(name) {
            return match index {
                Some(requested) if requested != var.id() => Err(Error::NameConflict {
                    name: name.to_string(),
                    existing: var.id(),
                    requested,
                }),
                _ => Ok((var, true)),
            };
        }

        let index = index.unwrap_or_else(|| self.next_free_index());
        if let Some(existing) = self.name(Var::new(index)) {
            return Err(Error::DuplicateIndex {
                index,
                existing: existing.to_string(),
                requested: name.to_string(),
            });
        }
        Ok((Var::new(index), false))
    }

    /// Records `name ↔ var`. Both must be unbound.
    pub fn bind(&mut self, name: &str, var: Var) {
        debug_assert!(!self.contains(name), "`{}` is already registered", name);
        debug_assert!(self.name(var).is_none(), "{} is already named", var);

        if self.by_index.len() <= var.index() {
            self.by_index.resize(var.index() + 1, None);
        }
        self.by_index[var.index()] = Some(name.to_string());
        self.by_name.insert(name.to_string(), var);
    }

    /// Checks that the two maps are exact inverses.
    pub fn check_consistency(&self) -> Result<(), String> {
        let named = self.by_index.iter().filter(|n| n.is_some()).count();
        if named != self.by_name.len() {
            return Err(format!("{} names but {} named indices", self.by_name.len(), named));
        }
        for (name, &var) in &self.by_name {
            if self.name(var) != Some(name.as_str()) {
                return Err(format!("`{}` maps to {} but {} maps to {:?}", name, var, var, self.name(var)));
            }
        }
        Ok(())
    }
}
