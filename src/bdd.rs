use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::cache::ComputedTable;
use crate::config::{BddConfig, Options};
use crate::node::Node;
use crate::reference::Ref;
use crate::subtable::Subtable;
use crate::types::{Level, NodeId, Var};
use crate::utils::{pairing2, pairing3, MyHash};

/// Computed table keys, one variant per memoized operation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum OpKey {
    #[default]
    Empty,
    Ite(Ref, Ref, Ref),
    Cofactor(Ref, Ref),
    Exists(Ref, Ref),
    AndExists(Ref, Ref, Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match *self {
            OpKey::Empty => 0,
            OpKey::Ite(f, g, h) => MyHash::hash(&(f.raw() as u64, g.raw() as u64, h.raw() as u64)),
            OpKey::Cofactor(f, c) => MyHash::hash(&(1u64, pairing2(f.raw() as u64, c.raw() as u64))),
            OpKey::Exists(f, c) => MyHash::hash(&(2u64, pairing2(f.raw() as u64, c.raw() as u64))),
            OpKey::AndExists(f, g, c) => {
                MyHash::hash(&(3u64, pairing3(f.raw() as u64, g.raw() as u64, c.raw() as u64)))
            }
        }
    }
}

/// Bookkeeping behind [`Statistics`](crate::stats::Statistics).
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub peak_nodes: usize,
    pub peak_live: usize,
    pub reorderings: usize,
    pub reorder_time: Duration,
    pub gc_runs: usize,
    pub gc_time: Duration,
    pub reclaimed: usize,
    /// Live node count that triggers the next automatic reordering.
    pub next_reorder: usize,
    /// Allocated node count that triggers the next automatic collection.
    pub next_gc: usize,
}

/// Live node count that triggers the first automatic reordering.
pub(crate) const FIRST_REORDER: usize = 4004;

/// The decision diagram engine.
///
/// Nodes live in one flat vector and are hash-consed through one
/// [`Subtable`] per level. Negation is a complement bit on [`Ref`], so the
/// single terminal represents `true` and its complement `false`.
///
/// Reference counts on nodes track external holders only. A node is alive
/// while it is reachable from a node with a positive count; everything else
/// is reclaimed by [`collect_garbage`](Self::collect_garbage), which only
/// ever runs at safe points between top-level operations.
pub struct Bdd {
    nodes: RefCell<Vec<Node>>,
    free: RefCell<Vec<NodeId>>,
    subtables: RefCell<Vec<Subtable>>,
    level_map: RefCell<Vec<Level>>,
    var_order: RefCell<Vec<Var>>,
    cache: RefCell<ComputedTable<OpKey, Ref>>,
    config: BddConfig,
    options: RefCell<Options>,
    counters: RefCell<Counters>,
    /// Set while a reordering pass runs, to prevent re-entrant triggers.
    reordering_active: Cell<bool>,
}

impl Bdd {
    pub fn new(config: BddConfig) -> Self {
        let mut nodes = Vec::with_capacity(config.capacity.max(1));
        nodes.push(Node::terminal());

        let mut options = config.options.clone();
        options.max_cache_soft = 1 << config.cache_bits;
        let counters = Counters {
            next_reorder: FIRST_REORDER,
            next_gc: options.loose_up_to,
            ..Default::default()
        };

        Self {
            nodes: RefCell::new(nodes),
            free: RefCell::new(Vec::new()),
            subtables: RefCell::new(Vec::new()),
            level_map: RefCell::new(Vec::new()),
            var_order: RefCell::new(Vec::new()),
            cache: RefCell::new(ComputedTable::new(config.cache_bits)),
            options: RefCell::new(options),
            counters: RefCell::new(counters),
            reordering_active: Cell::new(false),
            config,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("num_vars", &self.num_vars())
            .field("allocated", &self.allocated_nodes())
            .field("capacity", &self.nodes.borrow().capacity())
            .finish()
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        let referenced = self.check_zero_ref();
        debug_assert_eq!(referenced, 0, "engine dropped with {} referenced nodes", referenced);
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Bdd {
    pub fn one(&self) -> Ref {
        Ref::positive(NodeId::TERMINAL)
    }

    pub fn zero(&self) -> Ref {
        Ref::negative(NodeId::TERMINAL)
    }

    pub fn constant(&self, value: bool) -> Ref {
        if value {
            self.one()
        } else {
            self.zero()
        }
    }

    pub fn is_one(&self, f: Ref) -> bool {
        f == self.one()
    }

    pub fn is_zero(&self, f: Ref) -> bool {
        f == self.zero()
    }

    pub fn is_terminal(&self, f: Ref) -> bool {
        f.id().is_terminal()
    }

    pub fn node(&self, id: NodeId) -> Node {
        self.nodes.borrow()[id.index()]
    }

    pub fn variable(&self, id: NodeId) -> Var {
        self.nodes.borrow()[id.index()].variable
    }

    /// Low (else) child of `f`, with `f`'s complement pushed down.
    pub fn low_node(&self, f: Ref) -> Ref {
        self.nodes.borrow()[f.id().index()].low.negate_if(f.is_negated())
    }

    /// High (then) child of `f`, with `f`'s complement pushed down.
    pub fn high_node(&self, f: Ref) -> Ref {
        self.nodes.borrow()[f.id().index()].high.negate_if(f.is_negated())
    }

    pub fn config(&self) -> &BddConfig {
        &self.config
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    pub(crate) fn options_mut(&self) -> std::cell::RefMut<'_, Options> {
        self.options.borrow_mut()
    }

    pub(crate) fn counters(&self) -> std::cell::Ref<'_, Counters> {
        self.counters.borrow()
    }

    pub(crate) fn counters_mut(&self) -> std::cell::RefMut<'_, Counters> {
        self.counters.borrow_mut()
    }

    pub(crate) fn cache(&self) -> std::cell::Ref<'_, ComputedTable<OpKey, Ref>> {
        self.cache.borrow()
    }

    pub(crate) fn cache_mut(&self) -> std::cell::RefMut<'_, ComputedTable<OpKey, Ref>> {
        self.cache.borrow_mut()
    }

    pub(crate) fn nodes(&self) -> std::cell::Ref<'_, Vec<Node>> {
        self.nodes.borrow()
    }

    pub(crate) fn nodes_mut(&self) -> std::cell::RefMut<'_, Vec<Node>> {
        self.nodes.borrow_mut()
    }

    pub(crate) fn subtables(&self) -> std::cell::Ref<'_, Vec<Subtable>> {
        self.subtables.borrow()
    }

    pub(crate) fn subtables_mut(&self) -> std::cell::RefMut<'_, Vec<Subtable>> {
        self.subtables.borrow_mut()
    }

    pub(crate) fn level_map_mut(&self) -> std::cell::RefMut<'_, Vec<Level>> {
        self.level_map.borrow_mut()
    }

    pub(crate) fn var_order_mut(&self) -> std::cell::RefMut<'_, Vec<Var>> {
        self.var_order.borrow_mut()
    }

    pub(crate) fn reordering_active(&self) -> &Cell<bool> {
        &self.reordering_active
    }

    /// Bytes held by node storage and the free list.
    pub(crate) fn storage_bytes(&self) -> usize {
        self.nodes.borrow().capacity() * std::mem::size_of::<Node>()
            + self.free.borrow().capacity() * std::mem::size_of::<NodeId>()
    }

    /// Number of allocated decision nodes, dead ones included.
    pub fn allocated_nodes(&self) -> usize {
        self.nodes.borrow().len() - 1 - self.free.borrow().len()
    }
}

// ============================================================================
// Variables and levels
// ============================================================================

impl Bdd {
    pub fn num_vars(&self) -> usize {
        self.level_map.borrow().len()
    }

    /// Current level of `v`.
    pub fn level(&self, v: Var) -> Level {
        if v.is_terminal() {
            return Level::TERMINAL;
        }
        self.level_map.borrow()[v.index()]
    }

    /// Variable at `level`, if any.
    pub fn var_at_level(&self, level: Level) -> Option<Var> {
        self.var_order.borrow().get(level.index()).copied()
    }

    /// The current order, top to bottom.
    pub fn var_order(&self) -> Vec<Var> {
        self.var_order.borrow().clone()
    }

    /// Level of the top node of `f` ([`Level::TERMINAL`] for constants).
    pub fn top_level(&self, f: Ref) -> Level {
        self.level(self.variable(f.id()))
    }

    /// Creates variables up to and including `v`, appended at the bottom of the order.
    pub fn ensure_var(&self, v: Var) {
        while self.num_vars() <= v.index() {
            let new_var = Var::new(self.num_vars() as u32);
            let level = Level::new(self.var_order.borrow().len() as u32);
            self.var_order.borrow_mut().push(new_var);
            self.level_map.borrow_mut().push(level);
            self.subtables
                .borrow_mut()
                .push(Subtable::with_bucket_bits(new_var, self.config.subtable_bits));
            debug!("New variable {} at level {}", new_var, level);
        }
    }

    /// Creates a fresh variable positioned at `level`.
    ///
    /// Variables at `level` and below move one level down. Existing nodes
    /// are unaffected since the new variable occurs in none of them.
    pub fn new_var_at_level(&self, level: Level) -> Var {
        let new_var = Var::new(self.num_vars() as u32);
        let level = Level::new(level.raw().min(self.num_vars() as u32));

        self.var_order.borrow_mut().insert(level.index(), new_var);
        self.subtables
            .borrow_mut()
            .insert(level.index(), Subtable::with_bucket_bits(new_var, self.config.subtable_bits));
        self.level_map.borrow_mut().push(level);

        let order = self.var_order.borrow();
        let mut level_map = self.level_map.borrow_mut();
        for (l, v) in order.iter().enumerate().skip(level.index()) {
            level_map[v.index()] = Level::new(l as u32);
        }
        debug!("New variable {} inserted at level {}", new_var, level);

        new_var
    }

    /// The projection function of `v`.
    pub fn mk_var(&self, v: Var) -> Ref {
        self.ensure_var(v);
        self.mk_node(v, self.zero(), self.one())
    }
}

// ============================================================================
// Node construction
// ============================================================================

impl Bdd {
    /// Returns the unique node `(v, low, high)`, creating it if needed.
    pub fn mk_node(&self, v: Var, low: Ref, high: Ref) -> Ref {
        trace!("mk(v = {}, low = {}, high = {})", v, low, high);
        debug_assert!(!v.is_terminal());
        debug_assert!(self.level(v) < self.top_level(low) && self.level(v) < self.top_level(high));

        // The high edge of a stored node is always regular
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        if low == high {
            return low;
        }

        let level = self.level(v);
        if let Some(id) = self.subtables.borrow()[level.index()].find(low, high, &self.nodes.borrow()) {
            return Ref::positive(id);
        }

        let id = self.alloc(Node::new(v, low, high));
        self.subtables.borrow_mut()[level.index()].insert_with_resize(id, &mut self.nodes.borrow_mut());
        Ref::positive(id)
    }

    fn alloc(&self, node: Node) -> NodeId {
        let id = if let Some(id) = self.free.borrow_mut().pop() {
            self.nodes.borrow_mut()[id.index()] = node;
            id
        } else {
            let mut nodes = self.nodes.borrow_mut();
            let id = NodeId::new(nodes.len() as u32);
            nodes.push(node);
            id
        };

        let allocated = self.allocated_nodes();
        let mut counters = self.counters.borrow_mut();
        counters.peak_nodes = counters.peak_nodes.max(allocated);
        id
    }

    /// Cofactors of `f` with respect to the variable at `level`.
    pub fn top_cofactors(&self, f: Ref, level: Level) -> (Ref, Ref) {
        if self.is_terminal(f) || level < self.top_level(f) {
            return (f, f);
        }
        debug_assert_eq!(level, self.top_level(f));
        (self.low_node(f), self.high_node(f))
    }
}

// ============================================================================
// Boolean operations
// ============================================================================

impl Bdd {
    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        trace!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // ite(1,G,H) => G, ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // ite(F,G,G) => G
        if g == h {
            return g;
        }
        // ite(F,1,0) => F, ite(F,0,1) => ~F
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            self.one()
        } else if g == -f {
            self.zero()
        } else {
            g
        };
        let h = if h == f {
            self.zero()
        } else if h == -f {
            self.one()
        } else {
            h
        };
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        let i = self.top_level(f);
        let j = self.top_level(g);
        let k = self.top_level(h);

        // Equivalent pairs (choose the one with the topmost first argument):
        //   ite(F,1,H) == ite(H,1,F)
        //   ite(F,G,0) == ite(G,F,0)
        //   ite(F,G,1) == ite(~G,~F,1)
        //   ite(F,0,H) == ite(~H,0,~F)
        //   ite(F,G,~G) == ite(G,F,~F)
        let (f, g, h) = if self.is_one(g) && k < i {
            (h, self.one(), f)
        } else if self.is_zero(h) && j < i {
            (g, f, self.zero())
        } else if self.is_one(h) && j < i {
            (-g, -f, self.one())
        } else if self.is_zero(g) && k < i {
            (-h, self.zero(), -f)
        } else if g == -h && j < i {
            (g, f, -f)
        } else {
            (f, g, h)
        };

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };

        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() { (-g, -h, true) } else { (g, h, false) };

        let key = OpKey::Ite(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res.negate_if(negate);
        }

        let m = self.top_level(f).min(self.top_level(g)).min(self.top_level(h));
        debug_assert!(m != Level::TERMINAL);
        let v = self.var_order.borrow()[m.index()];

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(v, e, t);
        self.cache.borrow_mut().insert(key, res);

        res.negate_if(negate)
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero())
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one(), v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one())
    }

    /// `u ∧ ¬v`
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, self.zero())
    }

    /// Evaluates `f` under `assignment`, indexed by variable index.
    ///
    /// Variables beyond the end of `assignment` read as `false`.
    pub fn eval(&self, f: Ref, assignment: &[bool]) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.id());
            current = if assignment.get(v.index()).copied().unwrap_or(false) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }
}

// ============================================================================
// Reference counting and garbage collection
// ============================================================================

impl Bdd {
    /// Takes one external reference on the node behind `f`.
    pub fn ref_node(&self, f: Ref) {
        if self.is_terminal(f) {
            return;
        }
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[f.id().index()];
        debug_assert!(!node.is_free(), "ref of freed node {}", f);
        node.rc = node.rc.checked_add(1).expect("reference count overflow");
    }

    /// Releases one external reference on the node behind `f`.
    ///
    /// Internal edges are not counted, so releasing the last reference only
    /// makes the node (and whatever it alone kept reachable) collectable.
    ///
    /// # Panics
    ///
    /// Panics if the node has no references left.
    pub fn deref_node(&self, f: Ref) -> u32 {
        if self.is_terminal(f) {
            return 0;
        }
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[f.id().index()];
        assert!(node.rc > 0, "reference count underflow on {}", f);
        node.rc -= 1;
        node.rc
    }

    /// Releases one reference and, if that was the last one, reclaims the
    /// nodes that are no longer reachable right away.
    ///
    /// Returns the number of reclaimed nodes.
    pub fn deref_recursive(&self, f: Ref) -> usize {
        if self.deref_node(f) == 0 && !self.is_terminal(f) {
            self.collect_garbage()
        } else {
            0
        }
    }

    pub fn ref_count(&self, f: Ref) -> u32 {
        self.nodes.borrow()[f.id().index()].rc
    }

    /// Number of nodes with a positive reference count.
    pub fn check_zero_ref(&self) -> usize {
        self.nodes.borrow().iter().skip(1).filter(|n| !n.is_free() && n.rc > 0).count()
    }

    /// Nodes with a positive reference count, as regular references.
    fn referenced_roots(&self) -> Vec<Ref> {
        self.nodes
            .borrow()
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, n)| !n.is_free() && n.rc > 0)
            .map(|(i, _)| Ref::positive(NodeId::new(i as u32)))
            .collect()
    }

    /// Ids of all decision nodes reachable from `roots`.
    pub fn descendants(&self, roots: impl IntoIterator<Item = Ref>) -> HashSet<NodeId> {
        let nodes = self.nodes.borrow();
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = roots.into_iter().map(|r| r.id()).collect();

        while let Some(id) = stack.pop() {
            if id.is_terminal() || !visited.insert(id) {
                continue;
            }
            let node = &nodes[id.index()];
            stack.push(node.low.id());
            stack.push(node.high.id());
        }

        visited
    }

    /// Number of distinct nodes reachable from `f`, terminal included.
    pub fn dag_size(&self, f: Ref) -> usize {
        self.descendants([f]).len() + 1
    }

    /// Number of decision nodes kept alive by external references.
    pub fn live_nodes(&self) -> usize {
        self.descendants(self.referenced_roots()).len()
    }

    /// Frees every node not reachable from a referenced node.
    ///
    /// Clears the computed table. Returns the number of reclaimed nodes.
    pub fn collect_garbage(&self) -> usize {
        let start = Instant::now();
        let alive = self.descendants(self.referenced_roots());

        let mut reclaimed = Vec::new();
        {
            let mut nodes = self.nodes.borrow_mut();
            for subtable in self.subtables.borrow_mut().iter_mut() {
                reclaimed.extend(subtable.sweep(&mut nodes, |id, _| alive.contains(&id)));
            }
            for &id in &reclaimed {
                nodes[id.index()] = Node::default();
            }
        }
        self.free.borrow_mut().extend(reclaimed.iter().copied());
        self.cache.borrow_mut().clear();

        let elapsed = start.elapsed();
        let mut counters = self.counters.borrow_mut();
        counters.gc_runs += 1;
        counters.gc_time += elapsed;
        counters.reclaimed += reclaimed.len();
        counters.peak_live = counters.peak_live.max(alive.len());
        counters.next_gc = self.options.borrow().loose_up_to.max(2 * alive.len());
        debug!("Garbage collection: reclaimed {} nodes, {} alive, in {:?}", reclaimed.len(), alive.len(), elapsed);

        reclaimed.len()
    }

    /// Housekeeping between top-level operations: automatic collection,
    /// computed table growth and automatic reordering.
    pub fn safe_point(&self) {
        let (gc_enabled, reordering, min_hit, max_cache_hard) = {
            let o = self.options.borrow();
            (o.garbage_collection, o.reordering, o.min_hit, o.max_cache_hard)
        };

        if gc_enabled && self.allocated_nodes() > self.counters.borrow().next_gc {
            self.collect_garbage();
        }

        if self.cache.borrow().should_grow(min_hit, max_cache_hard) {
            let mut cache = self.cache.borrow_mut();
            cache.grow();
            self.options.borrow_mut().max_cache_soft = cache.capacity();
        }

        if reordering && !self.reordering_active.get() {
            let live = self.live_nodes();
            {
                let mut counters = self.counters.borrow_mut();
                counters.peak_live = counters.peak_live.max(live);
            }
            if live > self.counters.borrow().next_reorder {
                debug!("Automatic reordering triggered at {} live nodes", live);
                self.reorder_sift();
                let live = self.live_nodes();
                self.counters.borrow_mut().next_reorder = (2 * live).max(FIRST_REORDER);
            }
        }
    }
}

// ============================================================================
// Consistency
// ============================================================================

impl Bdd {
    /// Checks the structural invariants of the unique table.
    ///
    /// Every allocated node sits in the subtable of its variable's level,
    /// is canonical (regular high edge, distinct children), points only to
    /// allocated nodes strictly below it, and has no duplicate.
    pub fn check_consistency(&self) -> Result<(), String> {
        let nodes = self.nodes.borrow();
        let subtables = self.subtables.borrow();
        let order = self.var_order.borrow();
        let level_map = self.level_map.borrow();

        if order.len() != level_map.len() || order.len() != subtables.len() {
            return Err(format!(
                "order has {} entries, level map {}, subtables {}",
                order.len(),
                level_map.len(),
                subtables.len()
            ));
        }
        for (l, v) in order.iter().enumerate() {
            if level_map[v.index()].index() != l {
                return Err(format!("{} is at level {} but the level map says {}", v, l, level_map[v.index()]));
            }
            if subtables[l].variable != *v {
                return Err(format!("subtable at level {} holds {} instead of {}", l, subtables[l].variable, v));
            }
        }

        let level_of = |r: Ref| -> Level {
            let var = nodes[r.id().index()].variable;
            if var.is_terminal() {
                Level::TERMINAL
            } else {
                level_map[var.index()]
            }
        };

        let mut seen = HashSet::new();
        let mut indexed = 0;
        for (l, subtable) in subtables.iter().enumerate() {
            for id in subtable.indices(&nodes) {
                let node = &nodes[id.index()];
                if node.is_free() {
                    return Err(format!("freed node {} is still indexed", id));
                }
                if node.variable != subtable.variable {
                    return Err(format!("node {} has {} but sits in the subtable of {}", id, node.variable, subtable.variable));
                }
                if node.high.is_negated() || node.low == node.high {
                    return Err(format!("node {} is not canonical", id));
                }
                for child in [node.low, node.high] {
                    if child.id().index() >= nodes.len() || nodes[child.id().index()].is_free() {
                        return Err(format!("node {} points to a missing node {}", id, child));
                    }
                    if level_of(child).index() <= l {
                        return Err(format!("node {} at level {} points up to {}", id, l, child));
                    }
                }
                if !seen.insert((l, node.low, node.high)) {
                    return Err(format!("node {} is a duplicate", id));
                }
                indexed += 1;
            }
        }

        let allocated = nodes.len() - 1 - self.free.borrow().len();
        if indexed != allocated {
            return Err(format!("{} nodes allocated but {} indexed", allocated, indexed));
        }

        Ok(())
    }
}
