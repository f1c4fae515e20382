//! Evaluation configuration (`SPEC_FULL.md` §4.7).
//!
//! There is no file/env/persisted configuration surface at the core
//! level (`spec.md` §6) — `EvalConfig` is a plain struct the embedding
//! host constructs and passes in.

/// Controls what an evaluation observes and how a batch may be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Populate a [`crate::trace::Trace`] during evaluation.
    pub capture_trace: bool,
    /// Run the [`crate::profiler::Profiler`] during evaluation.
    pub profile: bool,
    /// Allow `evaluate_batch` to evaluate rows concurrently.
    pub parallel_batch: bool,
    /// Size of the rayon thread pool `evaluate_batch` builds when
    /// `parallel_batch` is set. `None` uses rayon's global pool (sized
    /// to the available parallelism).
    pub batch_threads: Option<usize>,
}

impl Default for EvalConfig {
    /// The cheapest possible path: no trace, no profiler, sequential
    /// batch. Matches "the profiler is never a correctness input" and
    /// "no internal parallelism within one evaluation" (`spec.md` §5).
    fn default() -> Self {
        Self {
            capture_trace: false,
            profile: false,
            parallel_batch: false,
            batch_threads: None,
        }
    }
}

impl EvalConfig {
    pub fn with_trace(mut self) -> Self {
        self.capture_trace = true;
        self
    }

    pub fn with_profiler(mut self) -> Self {
        self.profile = true;
        self
    }

    pub fn with_parallel_batch(mut self) -> Self {
        self.parallel_batch = true;
        self
    }

    pub fn with_batch_threads(mut self, threads: usize) -> Self {
        self.parallel_batch = true;
        self.batch_threads = Some(threads);
        self
    }
}
