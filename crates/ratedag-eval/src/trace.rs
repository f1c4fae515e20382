//! Per-evaluation trace: every node touched, its computed value, kind,
//! and the path by which it was first reached (`spec.md` §3 "Trace").

use std::collections::HashMap;

use ratedag_common::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One node's record in a [`Trace`]: the value computed, its kind tag,
/// and the ordered ancestor path from the evaluation target down to
/// this node, as it stood the first time the node was reached.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub value: Value,
    pub kind: &'static str,
    pub path: Vec<String>,
}

/// A mapping from node name to its [`TraceRecord`], populated once per
/// node — a cache hit for an already-recorded node is not re-recorded
/// (`spec.md` §4.4 step 1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    records: HashMap<String, TraceRecord>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.records.contains_key(node)
    }

    pub fn record(&mut self, node: &str, value: Value, kind: &'static str, path: Vec<String>) {
        self.records
            .entry(node.to_string())
            .or_insert(TraceRecord { value, kind, path });
    }

    pub fn get(&self, node: &str) -> Option<&TraceRecord> {
        self.records.get(node)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TraceRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}
