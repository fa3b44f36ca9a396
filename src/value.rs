//! Runtime values that flow through the shape type system.
//!
//! A `Value` is what a caller supplies for a field and what an `Instance`
//! holds after validation. It deliberately mirrors JSON plus one extra leaf:
//! `Instance`, the only representation of shape-typed data. There is no
//! dict arm that "counts as" a shape; promotion to a typed record happens
//! exclusively through `instance::InstanceBuilder`.

use crate::instance::Instance;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent/None. Only valid at optional field positions.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Ordered entries; keys are primitive values (bool/int/str).
    Dict(Vec<(Value, Value)>),
    Instance(Instance),
}

impl Value {
    /// Short kind name for error messages ("expected int, got str").
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Instance(_) => "instance",
        }
    }

    /// Compact single-line rendering used inside error messages. Collections
    /// are summarized, not dumped, so messages stay readable.
    pub fn brief(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(xs) => format!("[{} items]", xs.len()),
            Value::Dict(es) => format!("{{{} entries}}", es.len()),
            Value::Instance(i) => format!("shape instance #{}", i.shape().index()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(xs: Vec<T>) -> Self {
        Value::List(xs.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_error_vocabulary() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1i64).kind(), "int");
        assert_eq!(Value::from("x").kind(), "str");
        assert_eq!(Value::from(vec![1i64, 2]).kind(), "list");
    }

    #[test]
    fn brief_summarizes_collections() {
        let v = Value::from(vec!["a", "b", "c"]);
        assert_eq!(v.brief(), "[3 items]");
        let d = Value::Dict(vec![(Value::from("k"), Value::from(1i64))]);
        assert_eq!(d.brief(), "{1 entries}");
    }
}
