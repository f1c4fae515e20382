//! Worked end-to-end scenarios, kept here to avoid repetitive setup in
//! doctests elsewhere (`spec.md` §8).

use crate::{
    Branch, CaseKey, CompareOp, DataType, Graph, GraphMeta, LookupMode, Node, NodeKind,
    OrderedRangeTable, Refs, RoundingMode, TableRegistry, Value,
};

/// A motor-premium graph: base rate looked up by driver age (range
/// table), a vehicle-make multiplier (exact table), a young-driver
/// surcharge (IF), and a final rounding step.
///
/// ```rust
/// use ratedag::Context;
/// use ratedag::doc_examples::motor_premium_graph;
///
/// let graph = motor_premium_graph();
/// let ctx = Context::new().set("age", 22i64).set("make", "BMW");
/// let premium = ratedag::Evaluator::evaluate(&graph, "premium", &ctx).unwrap();
/// assert_eq!(premium, ratedag::Value::Decimal("1.52".parse().unwrap()));
/// ```
pub fn motor_premium_graph() -> Graph {
    let age_band = OrderedRangeTable::build(
        vec![
            (dec("18"), dec("25"), Value::Decimal(dec("1.20"))),
            (dec("26"), dec("65"), Value::Decimal(dec("1.00"))),
            (dec("66"), dec("99"), Value::Decimal(dec("1.10"))),
        ],
        None,
    );
    let make_multiplier = crate::ExactMatchTable::build(
        crate::ExactKeyType::Text,
        vec![
            (crate::ExactKey::Text("BMW".into()), Value::Decimal(dec("1.15"))),
            (crate::ExactKey::Text("TOYOTA".into()), Value::Decimal(dec("0.95"))),
        ],
        Some(Value::Decimal(dec("1.00"))),
    );
    let tables = TableRegistry::new()
        .with_range_table("age_band", age_band)
        .with_exact_table("make_multiplier", make_multiplier);

    let nodes = vec![
        Node::new(
            "age",
            NodeKind::Input {
                name: "age".into(),
                dtype: DataType::Decimal,
            },
        ),
        Node::new(
            "make",
            NodeKind::Input {
                name: "make".into(),
                dtype: DataType::Text,
            },
        ),
        Node::new(
            "age_factor",
            NodeKind::Lookup {
                table: "age_band".into(),
                key_node: "age".into(),
                mode: LookupMode::Range,
            },
        ),
        Node::new(
            "make_factor",
            NodeKind::Lookup {
                table: "make_multiplier".into(),
                key_node: "make".into(),
                mode: LookupMode::Exact,
            },
        ),
        Node::new(
            "surcharge",
            NodeKind::If {
                cond: "age".into(),
                op: CompareOp::Lt,
                threshold: dec("25"),
                then_branch: Branch::Constant(Value::Decimal(dec("1.10"))),
                else_branch: Branch::Constant(Value::Decimal(dec("1.00"))),
            },
        ),
        Node::new("premium_raw", {
            let mut inputs = Refs::new();
            inputs.push("age_factor".into());
            inputs.push("make_factor".into());
            inputs.push("surcharge".into());
            NodeKind::Multiply { inputs }
        }),
        Node::new(
            "premium",
            NodeKind::Round {
                input: "premium_raw".into(),
                decimals: 2,
                mode: RoundingMode::HalfUp,
            },
        ),
    ];

    Graph::build(nodes, GraphMeta::default(), tables).unwrap()
}

/// COALESCE falling back to a declared default when the preferred
/// input is absent from context.
///
/// ```rust
/// use ratedag::Context;
/// use ratedag::doc_examples::coalesce_fallback_graph;
///
/// let graph = coalesce_fallback_graph();
/// let value = ratedag::Evaluator::evaluate(&graph, "rate", &Context::new()).unwrap();
/// assert_eq!(value, ratedag::Value::from(9i64));
/// ```
pub fn coalesce_fallback_graph() -> Graph {
    let nodes = vec![
        Node::new(
            "negotiated_rate",
            NodeKind::Input {
                name: "negotiated_rate".into(),
                dtype: DataType::Decimal,
            },
        ),
        Node::new("standard_rate", NodeKind::Constant { value: Value::from(9i64) }),
        Node::new("rate", {
            let mut inputs = Refs::new();
            inputs.push("negotiated_rate".into());
            inputs.push("standard_rate".into());
            NodeKind::Coalesce { inputs }
        }),
    ];
    Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap()
}

/// A capped MAX/MIN chain: a computed liability figure floored at a
/// statutory minimum and capped at a policy maximum.
///
/// ```rust
/// use ratedag::Context;
/// use ratedag::doc_examples::capped_liability_graph;
///
/// let graph = capped_liability_graph();
/// let ctx = Context::new().set("computed", 50000i64);
/// let value = ratedag::Evaluator::evaluate(&graph, "capped", &ctx).unwrap();
/// assert_eq!(value, ratedag::Value::from(25000i64));
/// ```
pub fn capped_liability_graph() -> Graph {
    let nodes = vec![
        Node::new(
            "computed",
            NodeKind::Input {
                name: "computed".into(),
                dtype: DataType::Decimal,
            },
        ),
        Node::new("minimum", NodeKind::Constant { value: Value::from(1000i64) }),
        Node::new("maximum", NodeKind::Constant { value: Value::from(25000i64) }),
        Node::new("floored", {
            let mut inputs = Refs::new();
            inputs.push("computed".into());
            inputs.push("minimum".into());
            NodeKind::Max { inputs }
        }),
        Node::new("capped", {
            let mut inputs = Refs::new();
            inputs.push("floored".into());
            inputs.push("maximum".into());
            NodeKind::Min { inputs }
        }),
    ];
    Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap()
}

/// SWITCH over a policy-tier discriminator, falling back to a default
/// tier when the supplied tier name is unrecognized.
///
/// ```rust
/// use ratedag::Context;
/// use ratedag::doc_examples::tier_switch_graph;
///
/// let graph = tier_switch_graph();
/// let ctx = Context::new().set("tier", "GOLD");
/// let value = ratedag::Evaluator::evaluate(&graph, "discount", &ctx).unwrap();
/// assert_eq!(value, ratedag::Value::Decimal("0.15".parse().unwrap()));
/// ```
pub fn tier_switch_graph() -> Graph {
    let nodes = vec![
        Node::new(
            "tier",
            NodeKind::Input {
                name: "tier".into(),
                dtype: DataType::Text,
            },
        ),
        Node::new(
            "discount",
            NodeKind::Switch {
                var: "tier".into(),
                cases: vec![
                    (
                        CaseKey::Text("GOLD".into()),
                        Branch::Constant(Value::Decimal(dec("0.15"))),
                    ),
                    (
                        CaseKey::Text("SILVER".into()),
                        Branch::Constant(Value::Decimal(dec("0.10"))),
                    ),
                ],
                default: Some(Branch::Constant(Value::Decimal(dec("0.0")))),
            },
        ),
    ];
    Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap()
}

/// A capped MIN/MAX chain like [`capped_liability_graph`], but with
/// `computed` routed through an IF guard whose condition hard-demands a
/// decimal (`spec.md` §4.1: IF's condition operand is never lifted).
/// MIN/MAX tolerate an absent operand, so a batch built directly on
/// [`capped_liability_graph`] would silently treat a missing `computed`
/// as "ignore this operand" rather than failing the row — the guard
/// makes a missing input an actual per-row error to demonstrate
/// `evaluate_batch`'s `collect_errors` modes.
pub fn batch_liability_graph() -> Graph {
    let nodes = vec![
        Node::new(
            "computed",
            NodeKind::Input {
                name: "computed".into(),
                dtype: DataType::Decimal,
            },
        ),
        Node::new("minimum", NodeKind::Constant { value: Value::from(1000i64) }),
        Node::new("maximum", NodeKind::Constant { value: Value::from(25000i64) }),
        Node::new(
            "guarded",
            NodeKind::If {
                cond: "computed".into(),
                op: CompareOp::Ge,
                threshold: dec("0"),
                then_branch: Branch::Ref("computed".into()),
                else_branch: Branch::Ref("computed".into()),
            },
        ),
        Node::new("floored", {
            let mut inputs = Refs::new();
            inputs.push("guarded".into());
            inputs.push("minimum".into());
            NodeKind::Max { inputs }
        }),
        Node::new("capped", {
            let mut inputs = Refs::new();
            inputs.push("floored".into());
            inputs.push("maximum".into());
            NodeKind::Min { inputs }
        }),
    ];
    Graph::build(nodes, GraphMeta::default(), TableRegistry::new()).unwrap()
}

/// Batch evaluation of [`batch_liability_graph`] over several rows, one
/// of which is missing its required input.
///
/// With `collect_errors = true` the bad row's error is isolated and
/// every other row still produces a value; with `collect_errors = false`
/// the same bad row aborts the whole batch.
///
/// ```rust
/// use ratedag::EvalConfig;
/// use ratedag::doc_examples::{batch_liability_contexts, batch_liability_graph};
///
/// let graph = batch_liability_graph();
/// let contexts = batch_liability_contexts();
///
/// let isolated = ratedag::evaluate_batch(
///     &graph, "capped", &contexts, true, &EvalConfig::default(),
/// ).unwrap();
/// assert_eq!(isolated.values[0], ratedag::Value::from(25000i64));
/// assert!(isolated.errors[1].is_some());
/// assert_eq!(isolated.values[2], ratedag::Value::from(1000i64));
///
/// let aborted = ratedag::evaluate_batch(
///     &graph, "capped", &contexts, false, &EvalConfig::default(),
/// );
/// assert!(aborted.is_err());
/// ```
pub fn batch_liability_contexts() -> Vec<crate::Context> {
    vec![
        crate::Context::new().set("computed", 50000i64),
        crate::Context::new(), // missing "computed" -> MissingInput at "guarded"
        crate::Context::new().set("computed", 500i64),
    ]
}

fn dec(s: &str) -> ratedag_common::Decimal {
    s.parse().unwrap()
}
