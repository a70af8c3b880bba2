use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the [`Manager`](crate::manager::Manager) layer.
///
/// Input-validation errors (`UnknownVariable`, `UnknownOperator`,
/// `UnknownParameter`, `InvalidValue`, `DuplicateIndex`, `NameConflict`,
/// `AmbiguousRename`, `MissingVariables`, `Arity`, `InvalidLevel`) leave the
/// manager untouched. `UnknownPolarity`, `Inconsistent` and
/// `OwnershipViolation` mean an invariant is broken and the manager should
/// not be used further.
#[derive(Debug, Error)]
pub enum Error {
    #[error("operands belong to different managers")]
    ManagerMismatch,

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("unknown configuration parameter `{0}`")]
    UnknownParameter(String),

    #[error("index {index} is already bound to `{existing}`, cannot bind it to `{requested}`")]
    DuplicateIndex { index: u32, existing: String, requested: String },

    #[error("variable `{name}` already has index {existing}, not {requested}")]
    NameConflict { name: String, existing: u32, requested: u32 },

    #[error("rename domain and codomain overlap on {0:?}")]
    AmbiguousRename(Vec<String>),

    #[error("target manager lacks variables {0:?}")]
    MissingVariables(Vec<String>),

    #[error("variable `{name}` has index {source_index} in the source manager but {target_index} in the target")]
    IndexMismatch { name: String, source_index: u32, target_index: u32 },

    #[error("invalid value for `{name}`: {value}")]
    InvalidValue { name: String, value: String },

    #[error("unexpected cube entry {value} at index {index}")]
    UnknownPolarity { index: u32, value: u8 },

    #[error("operator `{op}` takes {expected} operand(s), got {found}")]
    Arity { op: String, expected: usize, found: usize },

    #[error("no variable at level {0}")]
    InvalidLevel(u32),

    #[error("failed to load `{}`: {reason}", path.display())]
    LoadFailure { path: PathBuf, reason: String },

    #[error("ownership violation: {0}")]
    OwnershipViolation(String),

    #[error("consistency check failed: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_value(name: impl Into<String>, value: impl ToString) -> Self {
        Error::InvalidValue {
            name: name.into(),
            value: value.to_string(),
        }
    }
}
