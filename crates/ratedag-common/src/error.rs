//! Structured error representation for the evaluator.
//!
//! - **`ErrorKind`**   : the canonical set of evaluation failure modes
//! - **`ErrorContext`**: the node/path/context snapshot captured at the
//!   outermost failing node
//! - **`EvaluationError`**: one struct that glues the two together
//!
//! Inner recursive frames re-raise without re-wrapping; only the
//! outermost failing node pays for the context snapshot.

use std::{error::Error, fmt};

use crate::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The taxonomy of evaluation failures (`spec.md` §7).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An INPUT node's name is absent from context when a concrete value
    /// was demanded and no fallback path tolerated absence.
    MissingInput,
    /// A node expected decimal and received text, or vice versa.
    TypeMismatch,
    /// A table query found no matching row and no default was supplied.
    LookupMiss,
    /// A dependency cycle was detected during traversal.
    Cycle,
    /// A dependency reference names a node that does not exist in the graph.
    UnresolvedReference,
    /// A numeric operation failed (invalid literal, invalid rounding spec, ...).
    DomainError,
    /// Catch-all for failures that don't fit another kind.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingInput => "MissingInput",
            Self::TypeMismatch => "TypeMismatch",
            Self::LookupMiss => "LookupMiss",
            Self::Cycle => "Cycle",
            Self::UnresolvedReference => "UnresolvedReference",
            Self::DomainError => "DomainError",
            Self::InternalError => "InternalError",
        })
    }
}

/// Snapshot of the context values relevant to the failing evaluation,
/// captured once at the outermost failing node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorContext {
    /// Node name at which the failure surfaced.
    pub node: String,
    /// Ordered ancestor path from the evaluation target down to `node`.
    pub path: Vec<String>,
    /// Context entries, sorted by key for deterministic reporting.
    pub context: Vec<(String, Value)>,
}

/// A structured, single-wrap evaluation failure.
///
/// Built once, at the outermost failing node, by the Evaluator (see
/// `spec.md` §7 "Propagation policy"). Inner recursive frames re-raise
/// the same `EvaluationError` without touching it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    pub context: Option<ErrorContext>,
}

impl From<ErrorKind> for EvaluationError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
        }
    }
}

impl EvaluationError {
    pub fn new(kind: ErrorKind) -> Self {
        kind.into()
    }

    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the node/path/context snapshot. Idempotent: once a context
    /// is attached, later calls are no-ops, so re-raising through
    /// intermediate frames never overwrites the original capture point.
    pub fn with_context(mut self, ctx: ErrorContext) -> Self {
        if self.context.is_none() {
            self.context = Some(ctx);
        }
        self
    }

    /// True once this error has been captured with its node/path/context
    /// snapshot — the boundary past which frames re-raise unchanged.
    pub fn is_captured(&self) -> bool {
        self.context.is_some()
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(ref ctx) = self.context {
            write!(f, " at node '{}'", ctx.node)?;
            if !ctx.path.is_empty() {
                write!(f, " (path: {})", ctx.path.join(" -> "))?;
            }
        }
        Ok(())
    }
}

impl Error for EvaluationError {}

pub type EvalResult<T> = Result<T, EvaluationError>;
