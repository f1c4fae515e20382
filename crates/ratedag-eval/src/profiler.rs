//! Per-node timing and cache-hit counters (`spec.md` §4.6).
//!
//! The Evaluator holds an `Option<&mut Profiler>` and simply skips every
//! call site when it's `None`, so a disabled profiler costs nothing
//! beyond a branch — it is never a correctness input.

use std::collections::HashMap;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing and hit/miss counters accumulated for one node across an
/// evaluation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    /// Time spent directly in this node's kind-compute, exclusive of
    /// descendant evaluation time (`spec.md` §4.4 step 4).
    pub total_time: Duration,
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Aggregate view over every node touched by one evaluation
/// (`spec.md` §3 "ProfilerStats").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStats {
    pub total_time: Duration,
    pub total_calls: u64,
    pub cache_hit_rate: f64,
    pub slowest_node: Option<String>,
    pub most_called_node: Option<String>,
}

/// Collects per-node timing and hit/miss counts for one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiler {
    stats: HashMap<String, NodeStats>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&mut self, node: &str) {
        self.stats.entry(node.to_string()).or_default().cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self, node: &str) {
        let entry = self.stats.entry(node.to_string()).or_default();
        entry.cache_misses += 1;
        entry.calls += 1;
    }

    /// Accumulate `elapsed` self-time (exclusive of descendants) for
    /// `node`'s kind-compute.
    pub fn record_self_time(&mut self, node: &str, elapsed: Duration) {
        self.stats.entry(node.to_string()).or_default().total_time += elapsed;
    }

    pub fn node_stats(&self, node: &str) -> Option<&NodeStats> {
        self.stats.get(node)
    }

    pub fn aggregate(&self) -> AggregateStats {
        let total_time = self.stats.values().map(|s| s.total_time).sum();
        let total_calls = self.stats.values().map(|s| s.calls).sum();
        let total_hits: u64 = self.stats.values().map(|s| s.cache_hits).sum();
        let total_misses: u64 = self.stats.values().map(|s| s.cache_misses).sum();
        let cache_hit_rate = if total_hits + total_misses == 0 {
            0.0
        } else {
            total_hits as f64 / (total_hits + total_misses) as f64
        };
        let slowest_node = self
            .stats
            .iter()
            .max_by_key(|(_, s)| s.total_time)
            .map(|(name, _)| name.clone());
        let most_called_node = self
            .stats
            .iter()
            .max_by_key(|(_, s)| s.calls)
            .map(|(name, _)| name.clone());

        AggregateStats {
            total_time,
            total_calls,
            cache_hit_rate,
            slowest_node,
            most_called_node,
        }
    }

    /// Human-readable report sorted by total elapsed time, descending
    /// (`spec.md` §4.6).
    pub fn report_text(&self) -> String {
        let mut rows: Vec<(&String, &NodeStats)> = self.stats.iter().collect();
        rows.sort_by(|a, b| b.1.total_time.cmp(&a.1.total_time));

        let mut out = String::new();
        for (name, stats) in rows {
            out.push_str(&format!(
                "{name}: {:?} ({} calls, {} hits, {} misses)\n",
                stats.total_time, stats.calls, stats.cache_hits, stats.cache_misses
            ));
        }
        out
    }
}
