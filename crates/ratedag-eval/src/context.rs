//! The per-evaluation input context (`spec.md` §3 "Context").

use rustc_hash::FxHashMap;

use ratedag_common::Value;

/// Caller-supplied mapping from input names to values for one
/// evaluation. Keys not referenced by any INPUT node are permitted and
/// simply ignored; missing keys read back as `Value::Absent`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: FxHashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Absent if the key was never supplied (`spec.md` §3).
    pub fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Absent)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_absent() {
        let ctx = Context::new().set("a", 1i64);
        assert_eq!(ctx.get("b"), Value::Absent);
    }

    #[test]
    fn unreferenced_keys_are_tolerated() {
        let ctx = Context::new().set("unused", "whatever");
        assert_eq!(ctx.get("unused"), Value::Text("whatever".into()));
    }
}
