//! Instance construction: the only path from loose values to a typed record.
//!
//! `InstanceBuilder` collects keyword-style field values, merges declared
//! defaults, runs every resulting value through the type checker, and only
//! then emits an `Instance`. An `Instance` is immutable and tagged with its
//! shape handle; there is no other way to make one, which is what lets the
//! rest of the system trust that any `Instance` it meets has already been
//! validated.

use indexmap::IndexMap;

use crate::check;
use crate::error::{Error, Result};
use crate::shape::{ShapeId, ShapeRegistry};
use crate::value::Value;

/// An immutable, validated record conforming to exactly one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    shape: ShapeId,
    /// One entry per declared field, in declaration order.
    values: IndexMap<String, Value>,
}

impl Instance {
    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    /// Exact-shape test: handle equality, never structural comparison.
    pub fn is_instance_of(&self, shape: ShapeId) -> bool {
        self.shape == shape
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Field values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

enum Arg {
    /// Explicitly requested "keep the declared default". Lets callers
    /// forward a placeholder without clobbering the shape's default.
    UseDefault,
    Set(Value),
}

pub struct InstanceBuilder {
    shape: ShapeId,
    supplied: IndexMap<String, Arg>,
}

impl InstanceBuilder {
    pub fn new(shape: ShapeId) -> Self {
        Self { shape, supplied: IndexMap::new() }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.supplied.insert(field.to_string(), Arg::Set(value.into()));
        self
    }

    /// Sentinel: the field was mentioned, but the declared default wins.
    pub fn use_default(mut self, field: &str) -> Self {
        self.supplied.insert(field.to_string(), Arg::UseDefault);
        self
    }

    /// Validate and emit. Fails on unknown field names, on required fields
    /// with no value, and on any value the type checker rejects.
    pub fn build(self, reg: &ShapeRegistry) -> Result<Instance> {
        let def = reg.get(self.shape);

        for name in self.supplied.keys() {
            if !def.fields.contains_key(name) {
                return Err(Error::Validation {
                    field: name.clone(),
                    reason: "no such field on this shape".to_string(),
                });
            }
        }

        let mut values: IndexMap<String, Value> = IndexMap::with_capacity(def.fields.len());
        for (name, fdef) in &def.fields {
            let value = match self.supplied.get(name) {
                Some(Arg::Set(v)) => v.clone(),
                Some(Arg::UseDefault) | None => match fdef.effective_default() {
                    Some(v) => v,
                    None => {
                        return Err(Error::Validation {
                            field: name.clone(),
                            reason: "required but is None".to_string(),
                        });
                    }
                },
            };
            if let Some(reason) = check::check_field(reg, &value, fdef) {
                return Err(Error::Validation { field: name.clone(), reason });
            }
            values.insert(name.clone(), value);
        }

        Ok(Instance { shape: self.shape, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{dict, field, list, ShapeRegistry, Ty};

    #[test]
    fn defaults_fill_unsupplied_fields() {
        let mut reg = ShapeRegistry::new();
        let t = reg
            .shape(vec![("answer", field(Ty::Int).with_default(42i64))])
            .unwrap();
        let inst = InstanceBuilder::new(t).build(&reg).unwrap();
        assert_eq!(inst.get("answer"), Some(&Value::Int(42)));

        let inst = InstanceBuilder::new(t).set("answer", 3i64).build(&reg).unwrap();
        assert_eq!(inst.get("answer"), Some(&Value::Int(3)));
    }

    #[test]
    fn use_default_sentinel_never_clobbers() {
        let mut reg = ShapeRegistry::new();
        let t = reg
            .shape(vec![
                ("name", field(Ty::Str)),
                ("count", field(Ty::Int).with_default(7i64)),
            ])
            .unwrap();
        let inst = InstanceBuilder::new(t)
            .set("name", "x")
            .use_default("count")
            .build(&reg)
            .unwrap();
        assert_eq!(inst.get("count"), Some(&Value::Int(7)));
    }

    #[test]
    fn unknown_field_fails() {
        let mut reg = ShapeRegistry::new();
        let t = reg.shape(vec![("answer", field(Ty::Int))]).unwrap();
        let err = InstanceBuilder::new(t)
            .set("answer", 1i64)
            .set("undefined_field", "boo")
            .build(&reg)
            .unwrap_err();
        assert!(err.to_string().contains("no such field"), "{err}");
    }

    #[test]
    fn missing_required_field_fails() {
        let mut reg = ShapeRegistry::new();
        let t = reg
            .shape(vec![
                ("name", field(Ty::Str)),
                ("count", field(Ty::Int).with_default(0i64)),
            ])
            .unwrap();
        // count defaults, name must be supplied
        let err = InstanceBuilder::new(t).set("count", 5i64).build(&reg).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("name"), "{msg}");
        assert!(msg.contains("required but is None"), "{msg}");
    }

    #[test]
    fn wrong_typed_value_names_the_field() {
        let mut reg = ShapeRegistry::new();
        let t = reg.shape(vec![("answer", field(Ty::Int))]).unwrap();
        for bad in [Value::from("hello"), Value::from(true)] {
            let err = InstanceBuilder::new(t).set("answer", bad).build(&reg).unwrap_err();
            assert!(err.to_string().starts_with("field 'answer'"), "{err}");
        }
    }

    #[test]
    fn is_instance_of_compares_handles_not_structure() {
        let mut reg = ShapeRegistry::new();
        let a = reg.shape(vec![("x", field(Ty::Int))]).unwrap();
        let b = reg.shape(vec![("x", field(Ty::Int))]).unwrap();
        let inst = InstanceBuilder::new(a).set("x", 1i64).build(&reg).unwrap();
        assert!(inst.is_instance_of(a));
        assert!(!inst.is_instance_of(b));
    }

    #[test]
    fn optional_field_defaults_to_null() {
        let mut reg = ShapeRegistry::new();
        let t = reg
            .shape(vec![("note", field(Ty::Str).optional())])
            .unwrap();
        let inst = InstanceBuilder::new(t).build(&reg).unwrap();
        assert_eq!(inst.get("note"), Some(&Value::Null));
    }

    #[test]
    fn nested_shape_must_be_an_instance() {
        let mut reg = ShapeRegistry::new();
        let inner = reg
            .shape(vec![("is_in", field(dict(Ty::Str, Ty::Str)).optional())])
            .unwrap();
        let outer = reg
            .shape(vec![
                ("is_out", field(Ty::Path)),
                ("nested", field(Ty::Shape(inner))),
            ])
            .unwrap();

        let nested = InstanceBuilder::new(inner)
            .set(
                "is_in",
                Value::Dict(vec![(Value::from("hello"), Value::from("world"))]),
            )
            .build(&reg)
            .unwrap();
        let ok = InstanceBuilder::new(outer)
            .set("is_out", "/a/path")
            .set("nested", nested)
            .build(&reg);
        assert!(ok.is_ok());

        // same data as a raw dict: rejected, never promoted
        let raw = Value::Dict(vec![(
            Value::from("is_in"),
            Value::Dict(vec![(Value::from("hello"), Value::from("world"))]),
        )]);
        let err = InstanceBuilder::new(outer)
            .set("is_out", "/a/path")
            .set("nested", raw)
            .build(&reg)
            .unwrap_err();
        assert!(err.to_string().contains("is not an instance of"), "{err}");
    }

    #[test]
    fn collections_of_shapes_validate_elementwise() {
        let mut reg = ShapeRegistry::new();
        let bottom = reg.shape(vec![("answer", field(Ty::Int))]).unwrap();
        let t = reg
            .shape(vec![(
                "dct",
                field(dict(Ty::Str, list(Ty::Shape(bottom)))),
            )])
            .unwrap();
        let elem = InstanceBuilder::new(bottom)
            .set("answer", 42i64)
            .build(&reg)
            .unwrap();
        let inst = InstanceBuilder::new(t)
            .set(
                "dct",
                Value::Dict(vec![(
                    Value::from("a"),
                    Value::List(vec![Value::Instance(elem)]),
                )]),
            )
            .build(&reg)
            .unwrap();
        assert!(matches!(inst.get("dct"), Some(Value::Dict(_))));
    }

    #[test]
    fn list_elements_are_checked() {
        let mut reg = ShapeRegistry::new();
        let t = reg.shape(vec![("lst", field(list(Ty::Int)))]).unwrap();
        let ok = InstanceBuilder::new(t)
            .set("lst", vec![1i64, 2, 3])
            .build(&reg);
        assert!(ok.is_ok());

        let err = InstanceBuilder::new(t)
            .set(
                "lst",
                Value::List(vec![Value::from(1i64), Value::from(2i64), Value::from("3")]),
            )
            .build(&reg)
            .unwrap_err();
        assert!(err.to_string().contains("index 2"), "{err}");
    }
}
