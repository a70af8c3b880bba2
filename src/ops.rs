//! Boolean operators by token, if-then-else, cofactors and support.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use log::trace;

use crate::codec::Assignment;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::manager::Manager;

/// The operators accepted by [`Manager::apply`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Not,
    And,
    Or,
    Xor,
    /// `u → v`
    Implies,
    /// `u ↔ v`
    Bimplies,
    /// `u ∧ ¬v`
    Diff,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Not,
        Operator::And,
        Operator::Or,
        Operator::Xor,
        Operator::Implies,
        Operator::Bimplies,
        Operator::Diff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Implies => "implies",
            Operator::Bimplies => "bimplies",
            Operator::Diff => "diff",
        }
    }

    /// Number of operands.
    pub fn arity(self) -> usize {
        match self {
            Operator::Not => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s {
            "not" | "!" | "~" => Operator::Not,
            "and" | "&" | "/\\" => Operator::And,
            "or" | "|" | "\\/" => Operator::Or,
            "xor" | "^" => Operator::Xor,
            "implies" | "->" => Operator::Implies,
            "bimplies" | "equiv" | "<->" => Operator::Bimplies,
            "diff" | "-" => Operator::Diff,
            _ => return Err(Error::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl Manager {
    /// Applies the operator named by `op` to `u` and, for binary operators, `v`.
    pub fn apply(&self, op: &str, u: &Function, v: Option<&Function>) -> Result<Function> {
        self.apply_op(op.parse()?, u, v)
    }

    pub fn apply_op(&self, op: Operator, u: &Function, v: Option<&Function>) -> Result<Function> {
        let found = 1 + v.is_some() as usize;
        if found != op.arity() {
            return Err(Error::Arity {
                op: op.to_string(),
                expected: op.arity(),
                found,
            });
        }
        self.check_owner(u)?;
        if let Some(v) = v {
            self.check_owner(v)?;
        }
        trace!("apply({}, {}, {:?})", op, u, v.map(|v| v.node()));

        let bdd = self.bdd();
        let (f, g) = (u.node(), v.map_or(bdd.one(), |v| v.node()));
        let res = match op {
            Operator::Not => bdd.apply_not(f),
            Operator::And => bdd.apply_and(f, g),
            Operator::Or => bdd.apply_or(f, g),
            Operator::Xor => bdd.apply_xor(f, g),
            Operator::Implies => bdd.apply_imply(f, g),
            Operator::Bimplies => bdd.apply_eq(f, g),
            Operator::Diff => bdd.apply_diff(f, g),
        };
        Ok(self.wrap(res))
    }

    /// If-then-else: `(g ∧ u) ∨ (¬g ∧ v)`.
    pub fn ite(&self, g: &Function, u: &Function, v: &Function) -> Result<Function> {
        for f in [g, u, v] {
            self.check_owner(f)?;
        }
        Ok(self.wrap(self.bdd().apply_ite(g.node(), u.node(), v.node())))
    }

    /// Restricts `f` to the partial assignment.
    pub fn cofactor(&self, f: &Function, assignment: &Assignment) -> Result<Function> {
        self.check_owner(f)?;
        let cube = self.encode_ref(assignment)?;
        Ok(self.wrap(self.bdd().cofactor(f.node(), cube)))
    }

    /// Names of the variables `f` depends on.
    pub fn support(&self, f: &Function) -> Result<BTreeSet<String>> {
        self.check_owner(f)?;
        let cube = self.bdd().support(f.node());
        let array = self
            .bdd()
            .array_from_cube(cube)
            .ok_or_else(|| Error::Inconsistent(format!("support of {} is not a cube", f)))?;

        let assignment = self.decode_array(&array)?;
        let mut names = BTreeSet::new();
        for (name, value) in assignment {
            if !value {
                let index = self.index_of(&name)?;
                return Err(Error::UnknownPolarity { index, value: 0 });
            }
            names.insert(name);
        }
        Ok(names)
    }
}
