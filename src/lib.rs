//! # bdd-manager: named-variable BDD management
//!
//! **`bdd-manager`** wraps a complement-edge **Binary Decision Diagram** engine with the bookkeeping
//! an application needs around it: variables are referred to by name, functions are reference-counted
//! handles tied to the manager that created them, and whole functions can be moved between managers
//! or saved to disk and loaded back under a different variable order.
//!
//! ## Layers
//!
//! - **Engine** ([`bdd`], [`cube`], [`quantify`], [`reorder`], [`sat`], [`dddmp`]):
//!   the unique table, the computed table, `ite`-based operators, abstraction, dynamic reordering
//!   by sifting and DDDMP text dumps. The engine works on raw [`Ref`][crate::reference::Ref] edges
//!   and 0-based variable indices.
//! - **Manager** ([`manager`], [`registry`], [`function`]): the name ↔ index registry and the
//!   [`Function`] handle. A `Function` holds one reference on its node; dropping it releases
//!   the reference, and unreferenced nodes are reclaimed by garbage collection.
//! - **Operations** ([`ops`], [`codec`], [`quantification`], [`transfer`], [`persist`]):
//!   everything addressed by variable name.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bdd_manager::Manager;
//!
//! let mgr = Manager::new();
//! mgr.declare(&["x", "y"])?;
//! let x = mgr.var("x")?;
//! let y = mgr.var("y")?;
//!
//! let f = &x & &y;
//! assert_eq!(mgr.support(&f)?.len(), 2);
//! assert_eq!(mgr.exist(&f, &["x"])?, y);
//! assert_eq!(mgr.apply("implies", &x, Some(&y))?, &!&x | &y);
//! # Ok::<(), bdd_manager::Error>(())
//! ```
//!
//! Functions of different managers never mix: binary operators panic, and
//! the `Manager` methods return [`Error::ManagerMismatch`].

pub mod bdd;
pub mod cache;
pub mod codec;
pub mod config;
pub mod cube;
pub mod dddmp;
pub mod error;
pub mod function;
pub mod manager;
pub mod node;
pub mod ops;
pub mod persist;
pub mod quantification;
pub mod quantify;
pub mod reference;
pub mod registry;
pub mod reorder;
pub mod sat;
pub mod stats;
pub mod subtable;
pub mod transfer;
pub mod types;
pub mod utils;

pub use codec::Assignment;
pub use config::{BddConfig, OptionValue, Options};
pub use error::{Error, Result};
pub use function::Function;
pub use manager::Manager;
pub use ops::Operator;
pub use reorder::ReorderStats;
pub use stats::Statistics;
