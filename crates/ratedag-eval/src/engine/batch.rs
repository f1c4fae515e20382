//! Batch evaluation across many independent contexts against one graph
//! (`spec.md` §4.5).
//!
//! Rows are independent — no inter-row memoization is performed, since
//! differing contexts would invalidate it — but evaluation is pure
//! given `(Graph, Tables, Context)`, so the driver may run rows
//! concurrently as long as the observable result is identical to
//! running them in sequence.

use ratedag_common::{EvaluationError, Value};

use crate::config::EvalConfig;
use crate::context::Context;
use crate::graph::Graph;
use crate::profiler::Profiler;
use crate::trace::Trace;

use super::Evaluator;

/// The parallel `values`/`errors` sequences `evaluate_batch` produces
/// under `collect_errors = true`: `values[i]` is the row's value (or
/// `Value::Absent` if it failed) and `errors[i]` is `Some` exactly when
/// row `i` failed (`spec.md` §4.5). `traces[i]`/`profiles[i]` are `Some`
/// exactly when `EvalConfig::capture_trace`/`profile` was set for the
/// batch, one independent [`Trace`]/[`Profiler`] per row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResults {
    pub values: Vec<Value>,
    pub errors: Vec<Option<EvaluationError>>,
    pub traces: Vec<Option<Trace>>,
    pub profiles: Vec<Option<Profiler>>,
}

impl BatchResults {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct RowOutcome {
    result: Result<Value, EvaluationError>,
    trace: Option<Trace>,
    profiler: Option<Profiler>,
}

/// Evaluate `target` once per entry in `contexts`, in input order.
///
/// With `collect_errors = false`, the first failing row (by input
/// order, regardless of whether rows ran concurrently) aborts the
/// whole batch and its error is returned; no partial results are
/// produced. With `collect_errors = true`, every row is evaluated
/// independently: a failing row's value slot is `Value::Absent` and its
/// error is captured in the parallel `errors` sequence, while every
/// other row's result is unaffected.
///
/// Output order always matches `contexts`' order, whether or not rows
/// run concurrently under [`EvalConfig::parallel_batch`]. When
/// `config.capture_trace`/`profile` is set, every row gets its own
/// [`Trace`]/[`Profiler`] (no cross-row sharing, since each row is its
/// own evaluation with its own context).
pub fn evaluate_batch(
    graph: &Graph,
    target: &str,
    contexts: &[Context],
    collect_errors: bool,
    config: &EvalConfig,
) -> Result<BatchResults, EvaluationError> {
    let raw: Vec<RowOutcome> = if config.parallel_batch {
        evaluate_rows_parallel(graph, target, contexts, config)
    } else {
        evaluate_rows_sequential(graph, target, contexts, config)
    };

    if !collect_errors {
        if let Some(err) = raw.iter().find_map(|r| r.result.as_ref().err()) {
            return Err(err.clone());
        }
    }

    let mut values = Vec::with_capacity(raw.len());
    let mut errors = Vec::with_capacity(raw.len());
    let mut traces = Vec::with_capacity(raw.len());
    let mut profiles = Vec::with_capacity(raw.len());
    for row in raw {
        match row.result {
            Ok(v) => {
                values.push(v);
                errors.push(None);
            }
            Err(e) => {
                values.push(Value::Absent);
                errors.push(Some(e));
            }
        }
        traces.push(row.trace);
        profiles.push(row.profiler);
    }

    let result = BatchResults {
        values,
        errors,
        traces,
        profiles,
    };
    log_summary(target, &result);
    Ok(result)
}

fn log_summary(target: &str, result: &BatchResults) {
    #[cfg(feature = "tracing")]
    {
        let errors = result.errors.iter().filter(|e| e.is_some()).count();
        tracing::info!(
            eval_target = target,
            rows = result.len(),
            errors,
            "batch evaluation complete"
        );
    }
    #[cfg(not(feature = "tracing"))]
    let _ = (target, result);
}

fn evaluate_row(graph: &Graph, target: &str, ctx: &Context, config: &EvalConfig) -> RowOutcome {
    let mut trace = config.capture_trace.then(Trace::new);
    let mut profiler = config.profile.then(Profiler::new);
    let result = Evaluator::evaluate_with(graph, target, ctx, trace.as_mut(), profiler.as_mut());
    RowOutcome {
        result,
        trace,
        profiler,
    }
}

fn evaluate_rows_sequential(
    graph: &Graph,
    target: &str,
    contexts: &[Context],
    config: &EvalConfig,
) -> Vec<RowOutcome> {
    contexts
        .iter()
        .map(|ctx| evaluate_row(graph, target, ctx, config))
        .collect()
}

/// Same result as [`evaluate_rows_sequential`], computed with a rayon
/// work-stealing pool; `.collect()` on an indexed parallel iterator
/// reassembles rows in their original order (`spec.md` §4.5 "must
/// preserve output ordering"). `config.batch_threads` builds a scoped
/// pool of that size; `None` runs on rayon's global pool.
fn evaluate_rows_parallel(
    graph: &Graph,
    target: &str,
    contexts: &[Context],
    config: &EvalConfig,
) -> Vec<RowOutcome> {
    use rayon::prelude::*;

    let run = || {
        contexts
            .par_iter()
            .map(|ctx| evaluate_row(graph, target, ctx, config))
            .collect()
    };

    match config.batch_threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .expect("valid rayon thread pool configuration")
            .install(run),
        None => run(),
    }
}
