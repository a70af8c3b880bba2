//! Engine statistics.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::bdd::Bdd;

/// A snapshot of the engine counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// Live decision nodes. Exact only if `exact` is set, otherwise the
    /// allocated count (dead nodes awaiting collection included).
    pub live_nodes: usize,
    pub exact: bool,
    pub peak_nodes: usize,
    pub peak_live_nodes: usize,
    pub num_vars: usize,

    pub reorderings: usize,
    pub reorder_time: Duration,
    pub gc_runs: usize,
    pub gc_time: Duration,
    pub reclaimed_nodes: usize,

    /// Bytes held by node storage, unique tables and the computed table.
    pub memory_bytes: usize,

    pub unique_slots: usize,
    pub unique_occupied: usize,
    /// Fraction of unique table buckets that are non-empty.
    pub unique_utilization: f64,

    pub cache_slots: usize,
    pub cache_lookups: usize,
    pub cache_hits: usize,
    pub cache_inserts: usize,
    pub cache_collisions: usize,
    pub cache_deletions: usize,
}

impl Statistics {
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.cache_lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.cache_lookups as f64
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let approx = if self.exact { "" } else { " (approx.)" };
        writeln!(f, "Nodes:       {}{} live, {} peak, {} peak live", self.live_nodes, approx, self.peak_nodes, self.peak_live_nodes)?;
        writeln!(f, "Variables:   {}", self.num_vars)?;
        writeln!(f, "Reordering:  {} runs in {:?}", self.reorderings, self.reorder_time)?;
        writeln!(f, "GC:          {} runs in {:?}, {} nodes reclaimed", self.gc_runs, self.gc_time, self.reclaimed_nodes)?;
        writeln!(f, "Memory:      {} bytes", self.memory_bytes)?;
        writeln!(
            f,
            "Unique:      {}/{} buckets used ({:.1}%)",
            self.unique_occupied,
            self.unique_slots,
            100.0 * self.unique_utilization
        )?;
        write!(
            f,
            "Cache:       {} slots, {} lookups, {} hits ({:.1}%), {} inserts, {} collisions, {} deletions",
            self.cache_slots,
            self.cache_lookups,
            self.cache_hits,
            100.0 * self.cache_hit_ratio(),
            self.cache_inserts,
            self.cache_collisions,
            self.cache_deletions
        )
    }
}

impl Bdd {
    /// Collects the current counters.
    ///
    /// With `exact_node_count`, live nodes are counted by traversal from the
    /// referenced nodes instead of reporting the allocated count.
    pub fn statistics(&self, exact_node_count: bool) -> Statistics {
        let live_nodes = if exact_node_count {
            self.live_nodes()
        } else {
            self.allocated_nodes()
        };

        let (unique_slots, unique_occupied, unique_bytes) = self
            .subtables()
            .iter()
            .fold((0, 0, 0), |(slots, occupied, bytes), st| {
                (slots + st.num_buckets(), occupied + st.occupied_buckets(), bytes + st.memory_bytes())
            });
        let unique_utilization = if unique_slots == 0 {
            0.0
        } else {
            unique_occupied as f64 / unique_slots as f64
        };

        let cache = self.cache();
        let cache_counters = cache.counters();
        let memory_bytes = self.storage_bytes() + unique_bytes + cache.memory_bytes();

        let counters = self.counters();
        Statistics {
            live_nodes,
            exact: exact_node_count,
            peak_nodes: counters.peak_nodes,
            peak_live_nodes: counters.peak_live.max(if exact_node_count { live_nodes } else { 0 }),
            num_vars: self.num_vars(),
            reorderings: counters.reorderings,
            reorder_time: counters.reorder_time,
            gc_runs: counters.gc_runs,
            gc_time: counters.gc_time,
            reclaimed_nodes: counters.reclaimed,
            memory_bytes,
            unique_slots,
            unique_occupied,
            unique_utilization,
            cache_slots: cache_counters.slots,
            cache_lookups: cache_counters.lookups,
            cache_hits: cache_counters.hits,
            cache_inserts: cache_counters.inserts,
            cache_collisions: cache_counters.collisions,
            cache_deletions: cache_counters.deletions,
        }
    }
}
