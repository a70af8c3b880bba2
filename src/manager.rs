//! The manager: one engine plus the names of its variables.

use std::cell::{Ref as CellRef, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::codec::Assignment;
use crate::config::{BddConfig, ConfigKey, OptionValue, Options, Setting};
use crate::error::{Error, Result};
use crate::function::Function;
use crate::reference::Ref;
use crate::registry::VariableRegistry;
use crate::reorder::ReorderStats;
use crate::stats::Statistics;
use crate::types::{Level, Var};

static NEXT_MANAGER_ID: AtomicUsize = AtomicUsize::new(0);

struct Inner {
    id: usize,
    bdd: Bdd,
    registry: RefCell<VariableRegistry>,
}

/// A BDD manager with named variables.
///
/// `Manager` is a cheap handle: clones share the same engine. Every
/// [`Function`] keeps its manager alive, so the engine is torn down only
/// after the last function is gone. Use [`close`](Self::close) to check
/// that nothing is left.
#[derive(Clone)]
pub struct Manager {
    inner: Rc<Inner>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("id", &self.inner.id)
            .field("vars", &self.inner.registry.borrow().len())
            .field("bdd", &self.inner.bdd)
            .finish()
    }
}

impl PartialEq for Manager {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Manager {}

impl Manager {
    pub fn new() -> Self {
        Self::with_config(BddConfig::default())
    }

    pub fn with_config(config: BddConfig) -> Self {
        let id = NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        debug!("Creating manager #{}", id);
        Self {
            inner: Rc::new(Inner {
                id,
                bdd: Bdd::new(config),
                registry: RefCell::new(VariableRegistry::new()),
            }),
        }
    }

    /// Process-unique id of this manager.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// The underlying engine.
    pub fn bdd(&self) -> &Bdd {
        &self.inner.bdd
    }

    pub(crate) fn registry(&self) -> CellRef<'_, VariableRegistry> {
        self.inner.registry.borrow()
    }

    /// Wraps an engine result and runs the engine's housekeeping.
    pub(crate) fn wrap(&self, node: Ref) -> Function {
        let f = Function::new(self, node);
        self.bdd().safe_point();
        f
    }

    /// Fails with [`Error::ManagerMismatch`] unless `f` belongs to `self`.
    pub(crate) fn check_owner(&self, f: &Function) -> Result<()> {
        if f.manager() == self {
            Ok(())
        } else {
            Err(Error::ManagerMismatch)
        }
    }

    /// Tears the manager down.
    ///
    /// Fails with [`Error::OwnershipViolation`] if functions or other
    /// manager handles are still alive; in that case nothing is released.
    pub fn close(self) -> Result<()> {
        let holders = Rc::strong_count(&self.inner) - 1;
        if holders > 0 {
            return Err(Error::OwnershipViolation(format!(
                "manager #{} closed with {} live handle(s) and {} referenced node(s)",
                self.inner.id,
                holders,
                self.bdd().check_zero_ref()
            )));
        }
        debug!("Closing manager #{}", self.inner.id);
        Ok(())
    }
}

// ============================================================================
// Variables
// ============================================================================

impl Manager {
    /// Registers `name`, optionally at an explicit index, and returns its index.
    ///
    /// Registering an existing name is a lookup; it fails with
    /// [`Error::NameConflict`] if `index` differs from the existing one.
    /// A new name fails with [`Error::DuplicateIndex`] if `index` is
    /// already bound to another name.
    pub fn add_var(&self, name: &str, index: Option<u32>) -> Result<u32> {
        let (var, existing) = self.registry().resolve(name, index)?;
        if !existing {
            self.bdd().ensure_var(var);
            self.inner.registry.borrow_mut().bind(name, var);
            debug!("Registered `{}` as {} at level {}", name, var, self.bdd().level(var));
        }
        Ok(var.id())
    }

    /// Registers every name with the next free index.
    pub fn declare(&self, names: &[&str]) -> Result<Vec<u32>> {
        names.iter().map(|name| self.add_var(name, None)).collect()
    }

    /// Registers `name` as a new variable positioned at `level`.
    ///
    /// Variables at `level` and below move one level down. Returns the
    /// existing index if `name` is already registered (its level is not
    /// changed). Fails with [`Error::InvalidLevel`] if `level` is past the
    /// bottom, i.e. greater than the number of variables.
    pub fn insert_var_at_level(&self, name: &str, level: u32) -> Result<u32> {
        if let Some(var) = self.registry().var(name) {
            return Ok(var.id());
        }
        if level as usize > self.bdd().num_vars() {
            return Err(Error::InvalidLevel(level));
        }
        let var = self.bdd().new_var_at_level(Level::new(level));
        self.inner.registry.borrow_mut().bind(name, var);
        debug!("Registered `{}` as {} at level {}", name, var, self.bdd().level(var));
        Ok(var.id())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry().contains(name)
    }

    /// Number of named variables.
    pub fn num_vars(&self) -> usize {
        self.registry().len()
    }

    /// The projection function of `name`.
    pub fn var(&self, name: &str) -> Result<Function> {
        let var = self.registry().lookup(name)?;
        Ok(self.wrap(self.bdd().mk_var(var)))
    }

    pub fn index_of(&self, name: &str) -> Result<u32> {
        Ok(self.registry().lookup(name)?.id())
    }

    pub fn name_of(&self, index: u32) -> Option<String> {
        self.registry().name(Var::new(index)).map(String::from)
    }

    pub fn level_of(&self, name: &str) -> Result<u32> {
        let var = self.registry().lookup(name)?;
        Ok(self.bdd().level(var).raw())
    }

    /// Name of the variable at `level`.
    ///
    /// Fails with [`Error::InvalidLevel`] if the level is out of range or
    /// holds an unnamed variable.
    pub fn var_at_level(&self, level: u32) -> Result<String> {
        self.bdd()
            .var_at_level(Level::new(level))
            .and_then(|var| self.name_of(var.id()))
            .ok_or(Error::InvalidLevel(level))
    }

    /// Named variables, top to bottom.
    pub fn vars(&self) -> Vec<String> {
        let registry = self.registry();
        self.bdd()
            .var_order()
            .into_iter()
            .filter_map(|var| registry.name(var).map(String::from))
            .collect()
    }

    /// Current level of every named variable.
    pub fn levels(&self) -> BTreeMap<String, u32> {
        self.registry()
            .iter()
            .map(|(name, var)| (name.to_string(), self.bdd().level(var).raw()))
            .collect()
    }

    /// Resolves every name, failing on the first unknown one.
    pub(crate) fn lookup_all<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Vec<Var>> {
        let registry = self.registry();
        names.into_iter().map(|name| registry.lookup(name)).collect()
    }

    /// Checks the registry maps and the engine's unique table.
    pub fn check_consistency(&self) -> Result<()> {
        let registry = self.registry();
        registry.check_consistency().map_err(Error::Inconsistent)?;
        for (name, var) in registry.iter() {
            if var.index() >= self.bdd().num_vars() {
                return Err(Error::Inconsistent(format!("`{}` is {} but the engine has {} variables", name, var, self.bdd().num_vars())));
            }
        }
        self.bdd().check_consistency().map_err(Error::Inconsistent)
    }
}

// ============================================================================
// Constants, counting
// ============================================================================

impl Manager {
    pub fn one(&self) -> Function {
        Function::new(self, self.bdd().one())
    }

    pub fn zero(&self) -> Function {
        Function::new(self, self.bdd().zero())
    }

    pub fn constant(&self, value: bool) -> Function {
        Function::new(self, self.bdd().constant(value))
    }

    /// Number of satisfying assignments of `u` over `nvars` variables.
    pub fn count(&self, u: &Function, nvars: usize) -> Result<BigUint> {
        self.check_owner(u)?;
        Ok(self.bdd().sat_count(u.node(), nvars))
    }

    /// One satisfying assignment of `u`, over the variables it constrains.
    pub fn pick(&self, u: &Function) -> Result<Option<Assignment>> {
        self.check_owner(u)?;
        match self.bdd().pick_cube(u.node()) {
            Some(array) => self.decode_array(&array).map(Some),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Configuration and maintenance
// ============================================================================

impl Manager {
    /// Current options.
    pub fn options(&self) -> Options {
        self.bdd().options()
    }

    /// Reads one option by key.
    pub fn get(&self, key: &str) -> Result<OptionValue> {
        let key: ConfigKey = key.parse()?;
        Ok(self.options().get(key))
    }

    /// Applies the given options and returns the options as they were before.
    ///
    /// Every key and value is validated before anything is applied. Writes
    /// to read-only keys are logged and ignored.
    pub fn configure(&self, options: &[(&str, OptionValue)]) -> Result<Options> {
        let mut settings = Vec::with_capacity(options.len());
        for &(key, value) in options {
            let key: ConfigKey = key.parse()?;
            match Setting::parse(key, value)? {
                Some(setting) => settings.push(setting),
                None => warn!("Ignoring write to read-only option `{}`", key),
            }
        }

        let previous = self.options();
        for setting in settings {
            self.bdd().apply_setting(setting);
        }
        Ok(previous)
    }

    /// Writes back a snapshot returned by [`configure`](Self::configure).
    pub fn restore(&self, options: &Options) {
        for setting in options.settings() {
            self.bdd().apply_setting(setting);
        }
    }

    pub fn reordering(&self) -> bool {
        self.options().reordering
    }

    pub fn set_reordering(&self, enabled: bool) {
        self.bdd().apply_setting(Setting::Reordering(enabled));
    }

    pub fn garbage_collection(&self) -> bool {
        self.options().garbage_collection
    }

    pub fn set_garbage_collection(&self, enabled: bool) {
        self.bdd().apply_setting(Setting::GarbageCollection(enabled));
    }

    pub fn max_memory(&self) -> u64 {
        self.options().max_memory
    }

    pub fn set_max_memory(&self, bytes: u64) {
        self.bdd().apply_setting(Setting::MaxMemory(bytes));
    }

    pub fn loose_up_to(&self) -> usize {
        self.options().loose_up_to
    }

    pub fn set_loose_up_to(&self, nodes: usize) {
        self.bdd().apply_setting(Setting::LooseUpTo(nodes));
    }

    pub fn max_cache_hard(&self) -> usize {
        self.options().max_cache_hard
    }

    pub fn set_max_cache_hard(&self, slots: usize) -> Result<()> {
        self.set(ConfigKey::MaxCacheHard, OptionValue::Int(slots as i64))
    }

    pub fn min_hit(&self) -> u32 {
        self.options().min_hit
    }

    pub fn set_min_hit(&self, percent: u32) -> Result<()> {
        self.set(ConfigKey::MinHit, OptionValue::Int(percent as i64))
    }

    pub fn max_growth(&self) -> f64 {
        self.options().max_growth
    }

    pub fn set_max_growth(&self, growth: f64) -> Result<()> {
        self.set(ConfigKey::MaxGrowth, OptionValue::Float(growth))
    }

    pub fn max_swaps(&self) -> usize {
        self.options().max_swaps
    }

    pub fn set_max_swaps(&self, swaps: usize) {
        self.bdd().apply_setting(Setting::MaxSwaps(swaps));
    }

    pub fn max_vars(&self) -> usize {
        self.options().max_vars
    }

    pub fn set_max_vars(&self, vars: usize) {
        self.bdd().apply_setting(Setting::MaxVars(vars));
    }

    /// Current computed table size. Read-only.
    pub fn max_cache_soft(&self) -> usize {
        self.options().max_cache_soft
    }

    fn set(&self, key: ConfigKey, value: OptionValue) -> Result<()> {
        if let Some(setting) = Setting::parse(key, value)? {
            self.bdd().apply_setting(setting);
        }
        Ok(())
    }

    pub fn statistics(&self, exact_node_count: bool) -> Statistics {
        self.bdd().statistics(exact_node_count)
    }

    /// Reorders the variables.
    ///
    /// Without `order`, runs one sifting pass. With `order`, the named
    /// variables are placed in the order of their requested levels, on the
    /// levels they currently occupy together; a map covering every variable
    /// with levels `0..n` therefore yields exactly those levels.
    pub fn reorder(&self, order: Option<&BTreeMap<String, u32>>) -> Result<Option<ReorderStats>> {
        match order {
            None => Ok(Some(self.bdd().reorder_sift())),
            Some(order) => {
                self.reorder_to(order)?;
                Ok(None)
            }
        }
    }

    pub(crate) fn reorder_to(&self, order: &BTreeMap<String, u32>) -> Result<()> {
        let vars = self.lookup_all(order.keys().map(String::as_str))?;
        let mut seen = HashSet::new();
        for &level in order.values() {
            if !seen.insert(level) {
                return Err(Error::InvalidLevel(level));
            }
        }

        let mut requested: Vec<(u32, Var)> = order.values().copied().zip(vars).collect();
        requested.sort_unstable();
        let mut slots: Vec<Level> = requested.iter().map(|&(_, v)| self.bdd().level(v)).collect();
        slots.sort_unstable();

        let mut permutation = self.bdd().var_order();
        for (&slot, &(_, var)) in slots.iter().zip(&requested) {
            permutation[slot.index()] = var;
        }
        if permutation != self.bdd().var_order() {
            let swaps = self.bdd().shuffle(&permutation);
            info!("Reordered {} variables with {} swaps", requested.len(), swaps);
        }
        Ok(())
    }

    /// Frees every node not reachable from a live function.
    pub fn collect_garbage(&self) -> usize {
        self.bdd().collect_garbage()
    }
}
