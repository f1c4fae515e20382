//! The Graph: an owning container of nodes keyed by name (`spec.md` §4.2).
//!
//! Construction assigns each node a dense integer index so the
//! Evaluator's per-call cache and in-progress set can be plain vectors
//! rather than hash maps keyed by name (`spec.md` §9 "Per-call cache →
//! scalar-indexed table").

use rustc_hash::FxHashMap;

use ratedag_common::{ErrorKind, EvaluationError};

use crate::node::Node;
use crate::table::{ExactMatchTable, OrderedRangeTable};

/// A dense, zero-based index assigned to a node at graph-construction
/// time. Stable for the lifetime of the Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Product metadata carried through from the declaration as opaque
/// strings for reporting (`spec.md` §3 "Graph").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphMeta {
    pub product: String,
    pub version: String,
    pub currency: String,
    pub metadata: Vec<(String, String)>,
}

/// The read-only registry of named tables a LOOKUP node resolves
/// against (`spec.md` §6 "Tables are resolved by symbolic name").
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    range_tables: FxHashMap<String, OrderedRangeTable>,
    exact_tables: FxHashMap<String, ExactMatchTable>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range_table(mut self, name: impl Into<String>, table: OrderedRangeTable) -> Self {
        self.range_tables.insert(name.into(), table);
        self
    }

    pub fn with_exact_table(mut self, name: impl Into<String>, table: ExactMatchTable) -> Self {
        self.exact_tables.insert(name.into(), table);
        self
    }

    pub fn range_table(&self, name: &str) -> Option<&OrderedRangeTable> {
        self.range_tables.get(name)
    }

    pub fn exact_table(&self, name: &str) -> Option<&ExactMatchTable> {
        self.exact_tables.get(name)
    }
}

/// An owning container of nodes by unique name (`spec.md` §4.2).
///
/// Duplicate names at construction are fatal. The Graph resolves
/// dependency references eagerly (`UnresolvedReference` is caught here,
/// not at evaluation time) but does *not* check for cycles — that is
/// the Evaluator's job, performed implicitly via the traversal stack.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: FxHashMap<String, NodeId>,
    meta: GraphMeta,
    tables: TableRegistry,
}

impl Graph {
    /// Build a graph from parsed node descriptors and a table registry
    /// (`spec.md` §6 "Construct a Graph from parsed node descriptors").
    pub fn build(
        nodes: Vec<Node>,
        meta: GraphMeta,
        tables: TableRegistry,
    ) -> Result<Self, EvaluationError> {
        let mut index = FxHashMap::default();
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), NodeId(i as u32)).is_some() {
                return Err(EvaluationError::new(ErrorKind::InternalError)
                    .with_message(format!("duplicate node name '{}'", node.name)));
            }
        }

        let graph = Self {
            nodes,
            index,
            meta,
            tables,
        };
        graph.validate_references()?;
        Ok(graph)
    }

    fn validate_references(&self) -> Result<(), EvaluationError> {
        for node in &self.nodes {
            for dep in node.kind.dependencies() {
                if !self.index.contains_key(&dep) {
                    return Err(EvaluationError::new(ErrorKind::UnresolvedReference)
                        .with_message(format!(
                            "node '{}' references unknown node '{}'",
                            node.name, dep
                        )));
                }
            }
            if let crate::node::NodeKind::Lookup { table, .. } = &node.kind {
                let found = self.tables.range_table(table).is_some()
                    || self.tables.exact_table(table).is_some();
                if !found {
                    return Err(EvaluationError::new(ErrorKind::UnresolvedReference)
                        .with_message(format!(
                            "node '{}' references unknown table '{}'",
                            node.name, table
                        )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|id| &self.nodes[id.index()])
    }

    pub fn get_by_id(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn meta(&self) -> &GraphMeta {
        &self.meta
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Iterate nodes for visualization consumers: name, kind tag, and
    /// dependency names (`spec.md` §6).
    pub fn iter_nodes(&self) -> impl Iterator<Item = (&str, &'static str, Vec<String>)> {
        self.nodes.iter().map(|n| {
            (
                n.name.as_str(),
                n.kind.tag(),
                n.kind.dependencies().into_iter().collect(),
            )
        })
    }
}
