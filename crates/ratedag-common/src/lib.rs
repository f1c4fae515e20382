pub mod decimal;
pub mod error;
pub mod value;

pub use decimal::{round, Decimal, RoundingMode};
pub use error::{ErrorContext, ErrorKind, EvalResult, EvaluationError};
pub use value::Value;
