use std::fmt::{self, Display};
use std::str::FromStr;

use crate::decimal::Decimal;
use crate::error::{ErrorKind, EvaluationError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The result of evaluating any node: `Absent` (a first-class null),
/// a fixed-precision `Decimal`, or `Text`. Decimal and text are
/// disjoint — the engine never converts between them implicitly
/// (`spec.md` §3 "Value").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Decimal(Decimal),
    Text(String),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Demand a decimal, failing with `TypeMismatch` on text and
    /// `MissingInput` on absence. Used by nodes that cannot lift null
    /// themselves (e.g. IF's condition).
    pub fn require_decimal(&self, node: &str) -> Result<Decimal, EvaluationError> {
        match self {
            Value::Decimal(d) => Ok(*d),
            Value::Text(_) => Err(EvaluationError::new(ErrorKind::TypeMismatch)
                .with_message(format!("node '{node}' expected a decimal value, found text"))),
            Value::Absent => Err(EvaluationError::new(ErrorKind::MissingInput)
                .with_message(format!("node '{node}' requires a value but found Absent"))),
        }
    }

    pub fn require_text(&self, node: &str) -> Result<&str, EvaluationError> {
        match self {
            Value::Text(s) => Ok(s.as_str()),
            Value::Decimal(_) => Err(EvaluationError::new(ErrorKind::TypeMismatch)
                .with_message(format!("node '{node}' expected text, found a decimal value"))),
            Value::Absent => Err(EvaluationError::new(ErrorKind::MissingInput)
                .with_message(format!("node '{node}' requires a value but found Absent"))),
        }
    }

    /// Coerce a caller-supplied context value into a decimal, accepting
    /// integer/decimal literals and textual digits (`spec.md` §4.1
    /// "INPUT"). Returns `TypeMismatch` for anything that doesn't parse.
    pub fn coerce_to_decimal(&self, node: &str) -> Result<Value, EvaluationError> {
        match self {
            Value::Decimal(_) => Ok(self.clone()),
            Value::Text(s) => Decimal::from_str(s.trim()).map(Value::Decimal).map_err(|_| {
                EvaluationError::new(ErrorKind::TypeMismatch)
                    .with_message(format!("node '{node}': '{s}' is not a valid decimal literal"))
            }),
            Value::Absent => Ok(Value::Absent),
        }
    }

    /// Numeric equality for SWITCH/case matching, decimal vs decimal.
    pub fn numeric_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "<absent>"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Decimal(Decimal::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
