//! The node algebra: twelve computation kinds forming the tariff DAG
//! (`spec.md` §4.1). Modeled as a single tagged enum rather than a
//! virtual-dispatch class hierarchy — the Evaluator matches on `kind`
//! exhaustively, so the algebra is closed and auditable (`spec.md` §9).

use smallvec::{smallvec, SmallVec};

use ratedag_common::{Decimal, Value};

/// Small inline vector for dependency/operand lists — most nodes
/// reference a handful of other nodes, so this avoids a heap
/// allocation per node in the common case.
pub type Refs = SmallVec<[String; 4]>;

/// The declared type of an INPUT node (`spec.md` §4.1 "INPUT").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Decimal,
    Text,
}

/// Comparison operator for IF (`spec.md` §4.1 "IF").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn apply(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

/// Which table variant a LOOKUP node queries (`spec.md` §4.1 "LOOKUP").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    Range,
    Exact,
}

/// A then/else (or SWITCH case/default) value: either a constant baked
/// at declaration time, or a reference to another node in the graph.
/// `spec.md` §9 requires the dual form for IF; we extend the same
/// `Branch` type to SWITCH case values and default since nothing in the
/// spec forbids a SWITCH branch from being a reference (see
/// `SPEC_FULL.md` §9 for the recorded decision).
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Constant(Value),
    Ref(String),
}

/// A SWITCH case key: typed according to the incoming discriminator
/// value (`spec.md` §4.1 "SWITCH").
#[derive(Debug, Clone, PartialEq)]
pub enum CaseKey {
    Text(String),
    Decimal(Decimal),
}

impl CaseKey {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (CaseKey::Text(k), Value::Text(v)) => k == v,
            (CaseKey::Decimal(k), Value::Decimal(v)) => k == v,
            _ => false,
        }
    }
}

/// One of the twelve node kinds. Kind-specific parameters are
/// compile-time constants captured at declaration time; dependency
/// references are names of other nodes in the same graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Input {
        name: String,
        dtype: DataType,
    },
    Constant {
        value: Value,
    },
    Add {
        inputs: Refs,
    },
    Multiply {
        inputs: Refs,
    },
    Lookup {
        table: String,
        key_node: String,
        mode: LookupMode,
    },
    If {
        cond: String,
        op: CompareOp,
        threshold: Decimal,
        then_branch: Branch,
        else_branch: Branch,
    },
    Round {
        input: String,
        decimals: u32,
        mode: ratedag_common::RoundingMode,
    },
    Switch {
        var: String,
        cases: Vec<(CaseKey, Branch)>,
        default: Option<Branch>,
    },
    Coalesce {
        inputs: Refs,
    },
    Min {
        inputs: Refs,
    },
    Max {
        inputs: Refs,
    },
    Abs {
        input: String,
    },
}

impl NodeKind {
    /// Short tag used in traces and diagnostics (`spec.md` §3 "Trace").
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Input { .. } => "INPUT",
            NodeKind::Constant { .. } => "CONSTANT",
            NodeKind::Add { .. } => "ADD",
            NodeKind::Multiply { .. } => "MULTIPLY",
            NodeKind::Lookup { .. } => "LOOKUP",
            NodeKind::If { .. } => "IF",
            NodeKind::Round { .. } => "ROUND",
            NodeKind::Switch { .. } => "SWITCH",
            NodeKind::Coalesce { .. } => "COALESCE",
            NodeKind::Min { .. } => "MIN",
            NodeKind::Max { .. } => "MAX",
            NodeKind::Abs { .. } => "ABS",
        }
    }

    /// All direct dependency names, in the declared (left-to-right)
    /// order the evaluator must resolve them in (`spec.md` §5
    /// "Ordering guarantees"). For IF/SWITCH this lists every branch
    /// that *could* be taken — the evaluator still only visits the
    /// selected one at run time.
    pub fn dependencies(&self) -> Refs {
        match self {
            NodeKind::Input { .. } | NodeKind::Constant { .. } => Refs::new(),
            NodeKind::Add { inputs }
            | NodeKind::Multiply { inputs }
            | NodeKind::Coalesce { inputs }
            | NodeKind::Min { inputs }
            | NodeKind::Max { inputs } => inputs.clone(),
            NodeKind::Lookup { key_node, .. } => smallvec![key_node.clone()],
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let mut deps = Refs::new();
                deps.push(cond.clone());
                if let Branch::Ref(r) = then_branch {
                    deps.push(r.clone());
                }
                if let Branch::Ref(r) = else_branch {
                    deps.push(r.clone());
                }
                deps
            }
            NodeKind::Round { input, .. } | NodeKind::Abs { input } => {
                smallvec![input.clone()]
            }
            NodeKind::Switch { var, cases, default } => {
                let mut deps = Refs::new();
                deps.push(var.clone());
                for (_, branch) in cases {
                    if let Branch::Ref(r) = branch {
                        deps.push(r.clone());
                    }
                }
                if let Some(Branch::Ref(r)) = default {
                    deps.push(r.clone());
                }
                deps
            }
        }
    }
}

/// A named node in the graph: a unique name, its kind, and (implicitly,
/// via `kind.dependencies()`) its edges to other nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}
