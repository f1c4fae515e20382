//! The memoized single-context Evaluator (`spec.md` §4.4).
//!
//! A per-evaluation cache maps dense `NodeId` to computed `Value`
//! (`spec.md` §9 "Per-call cache → scalar-indexed table"); an
//! in-progress bitset plus an ordered name stack double as cycle
//! detector and path-for-trace/error source.

pub mod batch;

use std::time::{Duration, Instant};

use ratedag_common::{ErrorContext, ErrorKind, EvaluationError, Value};

use crate::context::Context;
use crate::graph::{Graph, NodeId};
use crate::node::{Branch, CompareOp, DataType, LookupMode, Node, NodeKind};
use crate::profiler::Profiler;
use crate::trace::Trace;

pub use batch::{evaluate_batch, BatchResults};

pub struct Evaluator<'a> {
    graph: &'a Graph,
    context: &'a Context,
    cache: Vec<Option<Value>>,
    in_progress: Vec<bool>,
    stack: Vec<String>,
    child_time: Vec<Duration>,
    trace: Option<&'a mut Trace>,
    profiler: Option<&'a mut Profiler>,
}

impl<'a> Evaluator<'a> {
    fn new(
        graph: &'a Graph,
        context: &'a Context,
        trace: Option<&'a mut Trace>,
        profiler: Option<&'a mut Profiler>,
    ) -> Self {
        Self {
            graph,
            context,
            cache: vec![None; graph.len()],
            in_progress: vec![false; graph.len()],
            stack: Vec::new(),
            child_time: Vec::new(),
            trace,
            profiler,
        }
    }

    /// `evaluate(graph, target, context) -> value` (`spec.md` §4.4).
    pub fn evaluate(
        graph: &Graph,
        target: &str,
        context: &Context,
    ) -> Result<Value, EvaluationError> {
        Self::evaluate_with(graph, target, context, None, None)
    }

    /// Same, optionally populating a [`Trace`] and/or a [`Profiler`].
    pub fn evaluate_with(
        graph: &Graph,
        target: &str,
        context: &Context,
        trace: Option<&mut Trace>,
        profiler: Option<&mut Profiler>,
    ) -> Result<Value, EvaluationError> {
        let id = graph.id_of(target).ok_or_else(|| {
            EvaluationError::new(ErrorKind::UnresolvedReference)
                .with_message(format!("unknown evaluation target '{target}'"))
        })?;
        let mut evaluator = Evaluator::new(graph, context, trace, profiler);
        evaluator.eval_node(id)
    }

    fn context_snapshot(&self) -> Vec<(String, Value)> {
        let mut snap: Vec<(String, Value)> = self
            .context
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        snap.sort_by(|a, b| a.0.cmp(&b.0));
        snap
    }

    fn capture(&self, node: &str, err: EvaluationError) -> EvaluationError {
        if err.is_captured() {
            return err;
        }
        err.with_context(ErrorContext {
            node: node.to_string(),
            path: self.stack.clone(),
            context: self.context_snapshot(),
        })
    }

    fn eval_dep(&mut self, name: &str) -> Result<Value, EvaluationError> {
        let id = self
            .graph
            .id_of(name)
            .expect("dependency reference validated at graph construction");
        self.eval_node(id)
    }

    fn eval_node(&mut self, id: NodeId) -> Result<Value, EvaluationError> {
        let node = self.graph.get_by_id(id);
        let name = node.name.as_str();
        let kind_tag = node.kind.tag();

        if let Some(value) = self.cache[id.index()].clone() {
            if let Some(ref mut p) = self.profiler {
                p.record_cache_hit(name);
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(node = name, "cache hit");
            if let Some(ref mut t) = self.trace {
                if !t.contains(name) {
                    t.record(name, value.clone(), kind_tag, self.stack.clone());
                }
            }
            return Ok(value);
        }

        if self.in_progress[id.index()] {
            let err = EvaluationError::new(ErrorKind::Cycle)
                .with_message(format!("cycle detected re-entering node '{name}'"));
            return Err(self.capture(name, err));
        }

        if let Some(ref mut p) = self.profiler {
            p.record_cache_miss(name);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(node = name, kind = kind_tag, "evaluating node");

        let path_for_trace = self.stack.clone();
        self.in_progress[id.index()] = true;
        self.stack.push(name.to_string());
        self.child_time.push(Duration::ZERO);

        let start = Instant::now();
        let result = self.compute(node);
        let elapsed_total = start.elapsed();

        let child_elapsed = self.child_time.pop().unwrap_or(Duration::ZERO);
        let self_time = elapsed_total.saturating_sub(child_elapsed);
        if let Some(parent_child_time) = self.child_time.last_mut() {
            *parent_child_time += elapsed_total;
        }

        self.in_progress[id.index()] = false;
        self.stack.pop();

        if let Some(ref mut p) = self.profiler {
            p.record_self_time(name, self_time);
        }

        match result {
            Ok(value) => {
                if let Some(ref mut t) = self.trace {
                    if !t.contains(name) {
                        t.record(name, value.clone(), kind_tag, path_for_trace);
                    }
                }
                self.cache[id.index()] = Some(value.clone());
                Ok(value)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(node = name, error = %e, "node evaluation failed");
                Err(self.capture(name, e))
            }
        }
    }

    fn eval_branch(&mut self, branch: &Branch) -> Result<Value, EvaluationError> {
        match branch {
            Branch::Constant(v) => Ok(v.clone()),
            Branch::Ref(name) => self.eval_dep(name),
        }
    }

    fn compute(&mut self, node: &Node) -> Result<Value, EvaluationError> {
        let name = node.name.clone();
        match &node.kind {
            NodeKind::Input { name: input_name, dtype } => self.compute_input(&name, input_name, *dtype),
            NodeKind::Constant { value } => Ok(value.clone()),
            NodeKind::Add { inputs } => {
                self.compute_fold(&name, inputs, ratedag_common::Decimal::ZERO, |a, b| a + b)
            }
            NodeKind::Multiply { inputs } => {
                self.compute_fold(&name, inputs, ratedag_common::Decimal::ONE, |a, b| a * b)
            }
            NodeKind::Lookup { table, key_node, mode } => {
                self.compute_lookup(&name, table, key_node, *mode)
            }
            NodeKind::If {
                cond,
                op,
                threshold,
                then_branch,
                else_branch,
            } => self.compute_if(&name, cond, *op, *threshold, then_branch, else_branch),
            NodeKind::Round { input, decimals, mode } => self.compute_round(&name, input, *decimals, *mode),
            NodeKind::Switch { var, cases, default } => self.compute_switch(var, cases, default),
            NodeKind::Coalesce { inputs } => self.compute_coalesce(inputs),
            NodeKind::Min { inputs } => self.compute_extremum(&name, inputs, true),
            NodeKind::Max { inputs } => self.compute_extremum(&name, inputs, false),
            NodeKind::Abs { input } => self.compute_abs(&name, input),
        }
    }

    fn compute_input(
        &mut self,
        name: &str,
        input_name: &str,
        dtype: DataType,
    ) -> Result<Value, EvaluationError> {
        let raw = self.context.get(input_name);
        match (dtype, raw) {
            (_, Value::Absent) => Ok(Value::Absent),
            (DataType::Decimal, v @ Value::Decimal(_)) => Ok(v),
            (DataType::Decimal, v @ Value::Text(_)) => v.coerce_to_decimal(name),
            (DataType::Text, v @ Value::Text(_)) => Ok(v),
            (DataType::Text, Value::Decimal(_)) => Err(EvaluationError::new(ErrorKind::TypeMismatch)
                .with_message(format!(
                    "INPUT '{name}' declared as text but context provided a decimal"
                ))),
        }
    }

    fn compute_fold(
        &mut self,
        name: &str,
        inputs: &crate::node::Refs,
        identity: ratedag_common::Decimal,
        op: fn(ratedag_common::Decimal, ratedag_common::Decimal) -> ratedag_common::Decimal,
    ) -> Result<Value, EvaluationError> {
        let mut acc = identity;
        let mut any_absent = false;
        for input in inputs {
            let v = self.eval_dep(input)?;
            match v {
                Value::Absent => any_absent = true,
                Value::Decimal(d) => acc = op(acc, d),
                Value::Text(_) => {
                    return Err(EvaluationError::new(ErrorKind::TypeMismatch).with_message(
                        format!("node '{name}' received a text operand, expected decimal"),
                    ))
                }
            }
        }
        if any_absent {
            Ok(Value::Absent)
        } else {
            Ok(Value::Decimal(acc))
        }
    }

    fn compute_lookup(
        &mut self,
        name: &str,
        table: &str,
        key_node: &str,
        mode: LookupMode,
    ) -> Result<Value, EvaluationError> {
        let key = self.eval_dep(key_node)?;
        if key.is_absent() {
            return Ok(Value::Absent);
        }
        match mode {
            LookupMode::Range => {
                let key_dec = key.require_decimal(name)?;
                let range_table = self.graph.tables().range_table(table).expect(
                    "table reference validated at graph construction",
                );
                range_table.lookup(key_dec)
            }
            LookupMode::Exact => {
                let exact_table = self.graph.tables().exact_table(table).expect(
                    "table reference validated at graph construction",
                );
                exact_table.lookup(&key)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compute_if(
        &mut self,
        name: &str,
        cond: &str,
        op: CompareOp,
        threshold: ratedag_common::Decimal,
        then_branch: &Branch,
        else_branch: &Branch,
    ) -> Result<Value, EvaluationError> {
        let cond_val = self.eval_dep(cond)?;
        let cond_dec = cond_val.require_decimal(name)?;
        if op.apply(cond_dec, threshold) {
            self.eval_branch(then_branch)
        } else {
            self.eval_branch(else_branch)
        }
    }

    fn compute_round(
        &mut self,
        name: &str,
        input: &str,
        decimals: u32,
        mode: ratedag_common::RoundingMode,
    ) -> Result<Value, EvaluationError> {
        let v = self.eval_dep(input)?;
        if v.is_absent() {
            return Ok(Value::Absent);
        }
        let d = v.require_decimal(name)?;
        Ok(Value::Decimal(ratedag_common::round(d, decimals, mode)))
    }

    fn compute_switch(
        &mut self,
        var: &str,
        cases: &[(crate::node::CaseKey, Branch)],
        default: &Option<Branch>,
    ) -> Result<Value, EvaluationError> {
        let v = self.eval_dep(var)?;
        if v.is_absent() {
            return match default {
                Some(branch) => self.eval_branch(branch),
                None => Ok(Value::Absent),
            };
        }
        for (key, branch) in cases {
            if key.matches(&v) {
                return self.eval_branch(branch);
            }
        }
        match default {
            Some(branch) => self.eval_branch(branch),
            None => Ok(Value::Absent),
        }
    }

    fn compute_coalesce(&mut self, inputs: &crate::node::Refs) -> Result<Value, EvaluationError> {
        for input in inputs {
            let v = self.eval_dep(input)?;
            if !v.is_absent() {
                return Ok(v);
            }
        }
        Ok(Value::Absent)
    }

    fn compute_extremum(
        &mut self,
        name: &str,
        inputs: &crate::node::Refs,
        want_min: bool,
    ) -> Result<Value, EvaluationError> {
        let mut best: Option<ratedag_common::Decimal> = None;
        for input in inputs {
            let v = self.eval_dep(input)?;
            match v {
                Value::Absent => continue,
                Value::Decimal(d) => {
                    best = Some(match best {
                        None => d,
                        Some(current) => {
                            if want_min {
                                current.min(d)
                            } else {
                                current.max(d)
                            }
                        }
                    });
                }
                Value::Text(_) => {
                    return Err(EvaluationError::new(ErrorKind::TypeMismatch).with_message(
                        format!("node '{name}' received a text operand, expected decimal"),
                    ))
                }
            }
        }
        Ok(best.map(Value::Decimal).unwrap_or(Value::Absent))
    }

    fn compute_abs(&mut self, name: &str, input: &str) -> Result<Value, EvaluationError> {
        let v = self.eval_dep(input)?;
        if v.is_absent() {
            return Ok(Value::Absent);
        }
        let d = v.require_decimal(name)?;
        Ok(Value::Decimal(d.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphMeta, TableRegistry};
    use crate::node::{Branch, CaseKey, CompareOp, DataType, Refs};
    use crate::table::OrderedRangeTable;
    use ratedag_common::RoundingMode;
    use std::str::FromStr;

    fn d(s: &str) -> ratedag_common::Decimal {
        ratedag_common::Decimal::from_str(s).unwrap()
    }

    #[test]
    fn constants_only_add() {
        let nodes = vec![
            Node::new("base", NodeKind::Constant { value: Value::from(500i64) }),
            Node::new("fee", NodeKind::Constant { value: Value::from(25i64) }),
            Node::new("total", {
                let mut inputs = Refs::new();
                inputs.push("base".into());
                inputs.push("fee".into());
                NodeKind::Add { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let value = Evaluator::evaluate(&graph, "total", &Context::new()).unwrap();
        assert_eq!(value, Value::Decimal(d("525")));
    }

    #[test]
    fn add_lifts_absent_operand() {
        let nodes = vec![
            Node::new(
                "base",
                NodeKind::Input {
                    name: "base".into(),
                    dtype: DataType::Decimal,
                },
            ),
            Node::new("fee", NodeKind::Constant { value: Value::from(25i64) }),
            Node::new("total", {
                let mut inputs = Refs::new();
                inputs.push("base".into());
                inputs.push("fee".into());
                NodeKind::Add { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let value = Evaluator::evaluate(&graph, "total", &Context::new()).unwrap();
        assert_eq!(value, Value::Absent);
    }

    #[test]
    fn coalesce_short_circuits_at_first_present_value() {
        let nodes = vec![
            Node::new(
                "primary",
                NodeKind::Input {
                    name: "primary".into(),
                    dtype: DataType::Decimal,
                },
            ),
            Node::new("fallback", NodeKind::Constant { value: Value::from(9i64) }),
            Node::new("chosen", {
                let mut inputs = Refs::new();
                inputs.push("primary".into());
                inputs.push("fallback".into());
                NodeKind::Coalesce { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();

        let ctx = Context::new().set("primary", 3i64);
        let value = Evaluator::evaluate(&graph, "chosen", &ctx).unwrap();
        assert_eq!(value, Value::Decimal(d("3")));

        let value = Evaluator::evaluate(&graph, "chosen", &Context::new()).unwrap();
        assert_eq!(value, Value::Decimal(d("9")));
    }

    #[test]
    fn if_selects_one_branch() {
        let nodes = vec![
            Node::new(
                "age",
                NodeKind::Input {
                    name: "age".into(),
                    dtype: DataType::Decimal,
                },
            ),
            Node::new(
                "result",
                NodeKind::If {
                    cond: "age".into(),
                    op: CompareOp::Ge,
                    threshold: d("18"),
                    then_branch: Branch::Constant(Value::from(1i64)),
                    else_branch: Branch::Constant(Value::from(0i64)),
                },
            ),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let ctx = Context::new().set("age", 21i64);
        assert_eq!(
            Evaluator::evaluate(&graph, "result", &ctx).unwrap(),
            Value::Decimal(d("1"))
        );
        let ctx = Context::new().set("age", 10i64);
        assert_eq!(
            Evaluator::evaluate(&graph, "result", &ctx).unwrap(),
            Value::Decimal(d("0"))
        );
    }

    #[test]
    fn switch_falls_back_to_default_on_no_match() {
        let nodes = vec![
            Node::new(
                "vehicle_type",
                NodeKind::Input {
                    name: "vehicle_type".into(),
                    dtype: DataType::Text,
                },
            ),
            Node::new(
                "factor",
                NodeKind::Switch {
                    var: "vehicle_type".into(),
                    cases: vec![(
                        CaseKey::Text("SUV".into()),
                        Branch::Constant(Value::from("1.4")),
                    )],
                    default: Some(Branch::Constant(Value::from("1.0"))),
                },
            ),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let ctx = Context::new().set("vehicle_type", "SEDAN");
        assert_eq!(
            Evaluator::evaluate(&graph, "factor", &ctx).unwrap(),
            Value::Text("1.0".into())
        );
    }

    #[test]
    fn round_applies_half_up() {
        let nodes = vec![
            Node::new("raw", NodeKind::Constant { value: Value::Decimal(d("2.345")) }),
            Node::new(
                "rounded",
                NodeKind::Round {
                    input: "raw".into(),
                    decimals: 2,
                    mode: RoundingMode::HalfUp,
                },
            ),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let value = Evaluator::evaluate(&graph, "rounded", &Context::new()).unwrap();
        assert_eq!(value, Value::Decimal(d("2.35")));
    }

    #[test]
    fn min_and_max_ignore_absent_operands() {
        let nodes = vec![
            Node::new(
                "a",
                NodeKind::Input {
                    name: "a".into(),
                    dtype: DataType::Decimal,
                },
            ),
            Node::new("b", NodeKind::Constant { value: Value::Decimal(d("7")) }),
            Node::new("c", NodeKind::Constant { value: Value::Decimal(d("3")) }),
            Node::new("lowest", {
                let mut inputs = Refs::new();
                inputs.push("a".into());
                inputs.push("b".into());
                inputs.push("c".into());
                NodeKind::Min { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let value = Evaluator::evaluate(&graph, "lowest", &Context::new()).unwrap();
        assert_eq!(value, Value::Decimal(d("3")));
    }

    #[test]
    fn cycle_is_detected() {
        let nodes = vec![
            Node::new("a", {
                let mut inputs = Refs::new();
                inputs.push("b".into());
                NodeKind::Add { inputs }
            }),
            Node::new("b", {
                let mut inputs = Refs::new();
                inputs.push("a".into());
                NodeKind::Add { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let err = Evaluator::evaluate(&graph, "a", &Context::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);
    }

    #[test]
    fn lookup_miss_surfaces_as_lookup_miss_error() {
        let table = OrderedRangeTable::build(vec![(d("0"), d("10"), Value::from(1i64))], None);
        let tables = TableRegistry::new().with_range_table("band", table);
        let nodes = vec![
            Node::new("key", NodeKind::Constant { value: Value::Decimal(d("50")) }),
            Node::new(
                "factor",
                NodeKind::Lookup {
                    table: "band".into(),
                    key_node: "key".into(),
                    mode: LookupMode::Range,
                },
            ),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), tables).unwrap();
        let err = Evaluator::evaluate(&graph, "factor", &Context::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LookupMiss);
        assert_eq!(err.context.as_ref().unwrap().node, "factor");
    }

    #[test]
    fn evaluation_is_memoized_and_deterministic() {
        let nodes = vec![
            Node::new("base", NodeKind::Constant { value: Value::from(10i64) }),
            Node::new("doubled", {
                let mut inputs = Refs::new();
                inputs.push("base".into());
                inputs.push("base".into());
                NodeKind::Add { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let mut profiler = Profiler::new();
        let value =
            Evaluator::evaluate_with(&graph, "doubled", &Context::new(), None, Some(&mut profiler))
                .unwrap();
        assert_eq!(value, Value::Decimal(d("20")));
        // "base" is referenced twice by "doubled" but must only be computed
        // once: one miss, one hit.
        let stats = profiler.node_stats("base").unwrap();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn trace_records_every_visited_node_once() {
        let nodes = vec![
            Node::new("base", NodeKind::Constant { value: Value::from(10i64) }),
            Node::new("fee", NodeKind::Constant { value: Value::from(1i64) }),
            Node::new("total", {
                let mut inputs = Refs::new();
                inputs.push("base".into());
                inputs.push("fee".into());
                NodeKind::Add { inputs }
            }),
        ];
        let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
        let mut trace = Trace::new();
        Evaluator::evaluate_with(&graph, "total", &Context::new(), Some(&mut trace), None).unwrap();
        assert_eq!(trace.len(), 3);
        assert!(trace.get("base").is_some());
        assert!(trace.get("total").is_some());
    }

    proptest::proptest! {
        // spec.md §8: "for all (G, T, C), two evaluations return the
        // same decimal bits and the same trace."
        #[test]
        fn evaluation_is_deterministic_across_runs(a in -10_000i64..10_000, b in -10_000i64..10_000, c in -10_000i64..10_000) {
            let nodes = vec![
                Node::new("a", NodeKind::Input { name: "a".into(), dtype: DataType::Decimal }),
                Node::new("b", NodeKind::Input { name: "b".into(), dtype: DataType::Decimal }),
                Node::new("c", NodeKind::Input { name: "c".into(), dtype: DataType::Decimal }),
                Node::new("total", {
                    let mut inputs = Refs::new();
                    inputs.push("a".into());
                    inputs.push("b".into());
                    inputs.push("c".into());
                    NodeKind::Add { inputs }
                }),
            ];
            let graph = Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap();
            let ctx = Context::new().set("a", a).set("b", b).set("c", c);

            let mut trace1 = Trace::new();
            let v1 = Evaluator::evaluate_with(&graph, "total", &ctx, Some(&mut trace1), None).unwrap();
            let mut trace2 = Trace::new();
            let v2 = Evaluator::evaluate_with(&graph, "total", &ctx, Some(&mut trace2), None).unwrap();

            proptest::prop_assert_eq!(v1, v2);
            proptest::prop_assert_eq!(trace1.len(), trace2.len());
            for name in ["a", "b", "c", "total"] {
                proptest::prop_assert_eq!(trace1.get(name), trace2.get(name));
            }
        }
    }
}
