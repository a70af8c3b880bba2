//! Conversion between name-keyed assignments and cubes.
//!
//! The engine's positional form has one entry per variable index: `0` for
//! false, `1` for true and `2` for don't-care.

use std::collections::BTreeMap;

use crate::cube::{CUBE_DONT_CARE, CUBE_FALSE, CUBE_TRUE};
use crate::error::{Error, Result};
use crate::function::Function;
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::Var;

/// A partial assignment of truth values to named variables.
pub type Assignment = BTreeMap<String, bool>;

impl Manager {
    /// The cube of `assignment`. Variables not mentioned are don't-care.
    pub fn encode(&self, assignment: &Assignment) -> Result<Function> {
        let cube = self.encode_ref(assignment)?;
        Ok(self.wrap(cube))
    }

    /// Like [`encode`](Self::encode) for integer values, which must be `0` or `1`.
    pub fn encode_values<'a>(&self, values: impl IntoIterator<Item = (&'a str, i64)>) -> Result<Function> {
        let mut assignment = Assignment::new();
        for (name, value) in values {
            let value = match value {
                0 => false,
                1 => true,
                _ => return Err(Error::invalid_value(name, value)),
            };
            assignment.insert(name.to_string(), value);
        }
        self.encode(&assignment)
    }

    pub(crate) fn encode_ref(&self, assignment: &Assignment) -> Result<Ref> {
        let vars = self.lookup_all(assignment.keys().map(String::as_str))?;

        let mut array = vec![CUBE_DONT_CARE; self.bdd().num_vars()];
        for (var, &value) in vars.iter().zip(assignment.values()) {
            array[var.index()] = if value { CUBE_TRUE } else { CUBE_FALSE };
        }
        Ok(self.bdd().cube_from_array(&array))
    }

    /// The assignment described by `cube`, without don't-care entries.
    ///
    /// Fails with [`Error::InvalidValue`] if `cube` is not a conjunction of literals.
    pub fn decode(&self, cube: &Function) -> Result<Assignment> {
        self.check_owner(cube)?;
        let array = self
            .bdd()
            .array_from_cube(cube.node())
            .ok_or_else(|| Error::invalid_value("cube", cube))?;
        self.decode_array(&array)
    }

    pub(crate) fn decode_array(&self, array: &[u8]) -> Result<Assignment> {
        let registry = self.registry();
        let mut assignment = Assignment::new();
        for (index, &entry) in array.iter().enumerate() {
            let value = match entry {
                CUBE_DONT_CARE => continue,
                CUBE_FALSE => false,
                CUBE_TRUE => true,
                _ => {
                    return Err(Error::UnknownPolarity {
                        index: index as u32,
                        value: entry,
                    })
                }
            };
            let name = registry
                .name(Var::new(index as u32))
                .ok_or_else(|| Error::Inconsistent(format!("cube constrains unnamed variable x{}", index)))?;
            assignment.insert(name.to_string(), value);
        }
        Ok(assignment)
    }

    /// The positive cube of the given variables.
    pub fn encode_ordered(&self, names: &[&str]) -> Result<Function> {
        let cube = self.encode_ordered_ref(names)?;
        Ok(self.wrap(cube))
    }

    pub(crate) fn encode_ordered_ref(&self, names: &[&str]) -> Result<Ref> {
        let vars = self.lookup_all(names.iter().copied())?;
        Ok(self.bdd().cube_from_vars(&vars))
    }
}
