//! `ratedag` is the embeddable surface of a deterministic pricing
//! engine: a DAG of typed computation nodes evaluated against a
//! caller-supplied [`Context`] to produce a [`Value`] (`spec.md` §6).
//!
//! ```rust
//! use ratedag::{CompareOp, Context, DataType, Evaluator, Graph, GraphMeta, Node, NodeKind, Refs, TableRegistry, Value};
//!
//! let nodes = vec![
//!     Node::new("base_premium", NodeKind::Input { name: "base_premium".into(), dtype: DataType::Decimal }),
//!     Node::new("fee", NodeKind::Constant { value: Value::from(25i64) }),
//!     Node::new("total", {
//!         let mut inputs = Refs::new();
//!         inputs.push("base_premium".into());
//!         inputs.push("fee".into());
//!         NodeKind::Add { inputs }
//!     }),
//! ];
//! let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
//! let ctx = Context::new().set("base_premium", 500i64);
//! let total = Evaluator::evaluate(&graph, "total", &ctx).unwrap();
//! assert_eq!(total, Value::from(525i64));
//! ```

pub mod doc_examples;

pub use ratedag_common::{round, Decimal, ErrorContext, ErrorKind, EvalResult, EvaluationError, RoundingMode, Value};
pub use ratedag_eval::{
    evaluate_batch, AggregateStats, BatchResults, Branch, CaseKey, CompareOp, Context, DataType,
    EvalConfig, Evaluator, ExactKey, ExactKeyType, ExactMatchTable, Graph, GraphMeta, LookupMode,
    Node, NodeId, NodeKind, NodeStats, OrderedRangeTable, Profiler, Refs, TableRegistry, Trace,
    TraceRecord,
};
