//! Deterministic graph evaluator for declarative P&C insurance tariffs.
//!
//! A [`graph::Graph`] of named [`node::Node`]s is evaluated for one
//! [`context::Context`] by [`engine::Evaluator`], or for many contexts
//! at once via [`engine::evaluate_batch`]. Lookup tables live in
//! [`table`]; [`trace::Trace`] and [`profiler::Profiler`] are optional
//! evaluation-time observers.

pub mod config;
pub mod context;
pub mod engine;
pub mod graph;
pub mod node;
pub mod profiler;
pub mod table;
pub mod trace;

pub use config::EvalConfig;
pub use context::Context;
pub use engine::{evaluate_batch, BatchResults, Evaluator};
pub use graph::{Graph, GraphMeta, NodeId, TableRegistry};
pub use node::{Branch, CaseKey, CompareOp, DataType, LookupMode, Node, NodeKind, Refs};
pub use profiler::{AggregateStats, NodeStats, Profiler};
pub use table::{ExactKey, ExactKeyType, ExactMatchTable, OrderedRangeTable};
pub use trace::{Trace, TraceRecord};

pub use ratedag_common::{round, Decimal, ErrorContext, ErrorKind, EvalResult, EvaluationError, RoundingMode, Value};
