//! Structural type checking: `check(value, type) -> Option<error message>`.
//!
//! This is the single validation function used by the instance builder and
//! mirrored by the serializer. It is pure and total over the closed `Ty`
//! sum; `None` means the value conforms.
//!
//! Rules worth calling out:
//! - `float` accepts an int value (widening); `int` does not accept a float.
//! - A shape type only matches an `Instance` constructed for exactly that
//!   shape handle. Dicts never pass as shapes.
//! - Unions scan alternatives in declared order and stop at the first match;
//!   a non-match aggregates every branch's own failure reason.

pub mod target;

use crate::shape::{FieldDef, ShapeRegistry, Ty};
use crate::value::Value;

pub fn check(reg: &ShapeRegistry, value: &Value, ty: &Ty) -> Option<String> {
    match ty {
        Ty::Bool => match value {
            Value::Bool(_) => None,
            other => Some(format!("expected bool, got {}", other.brief())),
        },
        Ty::Int => match value {
            Value::Int(_) => None,
            other => Some(format!("expected int, got {}", other.brief())),
        },
        Ty::Float => match value {
            // ints widen into float fields
            Value::Float(_) | Value::Int(_) => None,
            other => Some(format!("expected float, got {}", other.brief())),
        },
        Ty::Str => match value {
            Value::Str(_) => None,
            other => Some(format!("expected str, got {}", other.brief())),
        },
        Ty::Path => match value {
            Value::Str(_) => None,
            other => Some(format!("expected path, got {}", other.brief())),
        },
        Ty::Target => match value {
            Value::Str(s) => target::check_target_literal(s),
            other => Some(format!("expected target, got {}", other.brief())),
        },
        Ty::Shape(id) => match value {
            Value::Instance(inst) if inst.shape() == *id => None,
            other => Some(format!(
                "{} is not an instance of {}",
                other.brief(),
                ty.describe(reg)
            )),
        },
        Ty::List(item) => match value {
            Value::List(xs) => {
                for (i, x) in xs.iter().enumerate() {
                    if let Some(err) = check(reg, x, item) {
                        return Some(format!("index {i}: {err}"));
                    }
                }
                None
            }
            other => Some(format!("expected list, got {}", other.brief())),
        },
        Ty::Dict(key_ty, val_ty) => match value {
            Value::Dict(entries) => {
                for (k, v) in entries {
                    if let Some(err) = check(reg, k, key_ty) {
                        return Some(format!("key {}: {err}", k.brief()));
                    }
                    if let Some(err) = check(reg, v, val_ty) {
                        return Some(format!("value for key {}: {err}", k.brief()));
                    }
                }
                None
            }
            other => Some(format!("expected dict, got {}", other.brief())),
        },
        Ty::Union(alts) => {
            let mut reasons = Vec::with_capacity(alts.len());
            for alt in alts {
                match check(reg, value, alt) {
                    None => return None,
                    Some(err) => reasons.push(err),
                }
            }
            Some(format!(
                "{} not matched in {}: {}",
                value.brief(),
                ty.describe(reg),
                reasons.join("; ")
            ))
        }
        Ty::Enum(opts) => match value {
            Value::Str(s) if opts.contains(s) => None,
            other => Some(format!(
                "expected one of ({}), got {}",
                opts.join(", "),
                other.brief()
            )),
        },
    }
}

/// Field-level check: null is acceptable only when the field is optional.
pub fn check_field(reg: &ShapeRegistry, value: &Value, def: &FieldDef) -> Option<String> {
    if matches!(value, Value::Null) {
        if def.optional {
            return None;
        }
        return Some("required but is None".to_string());
    }
    check(reg, value, &def.ty)
}

/// Index of the first union alternative the value conforms to. The tie-break
/// rule of the whole system: a linear scan with early exit, never a keyed
/// dispatch, so ambiguous values map to a deterministic branch.
pub fn union_branch(reg: &ShapeRegistry, value: &Value, alts: &[Ty]) -> Option<usize> {
    alts.iter()
        .position(|alt| check(reg, value, alt).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;
    use crate::shape::{dict, enum_, field, list, union, ShapeRegistry};

    fn assert_ok(reg: &ShapeRegistry, v: &Value, t: &Ty) {
        let res = check(reg, v, t);
        assert!(res.is_none(), "expected pass, got: {res:?}");
    }

    fn assert_fails(reg: &ShapeRegistry, v: &Value, t: &Ty) {
        assert!(check(reg, v, t).is_some(), "expected failure for {v:?} against {t:?}");
    }

    #[test]
    fn accepts_conforming_values() {
        let reg = ShapeRegistry::new();
        let cases: Vec<(Value, Ty)> = vec![
            (Value::from(2i64), Ty::Int),
            (Value::from(false), Ty::Bool),
            (Value::from("hello"), Ty::Str),
            (Value::from(2i64), Ty::Float), // int widens into float
            (Value::from(2.5), Ty::Float),
            (Value::from("/hello/world"), Ty::Path),
            (Value::from("@cell//project/path:rule"), Ty::Target),
            (Value::from(":rule"), Ty::Target),
            (
                Value::Dict(vec![(Value::from("a"), Value::from("b"))]),
                dict(Ty::Str, Ty::Str),
            ),
            (Value::from("world"), enum_(vec!["hello", "world"]).unwrap()),
            (Value::from(1i64), union(vec![Ty::Str, Ty::Int]).unwrap()),
            (Value::from("hello"), union(vec![Ty::Str, Ty::Int]).unwrap()),
            (Value::List(vec![]), list(Ty::Str)),
        ];
        for (v, t) in &cases {
            assert_ok(&reg, v, t);
        }
    }

    #[test]
    fn rejects_non_conforming_values() {
        let reg = ShapeRegistry::new();
        let cases: Vec<(Value, Ty)> = vec![
            (Value::from(2i64), Ty::Bool),
            (Value::from("hello"), Ty::Int),
            (Value::from(2.5), Ty::Int), // no float -> int narrowing
            (Value::from(true), Ty::Str),
            (
                Value::Dict(vec![(Value::from("a"), Value::from(1i64))]),
                dict(Ty::Str, Ty::Str),
            ),
            (
                Value::Dict(vec![(Value::from(1i64), Value::from("b"))]),
                dict(Ty::Str, Ty::Str),
            ),
            (Value::from("nope"), dict(Ty::Str, Ty::Str)),
            (Value::from("nope"), list(Ty::Str)),
            (Value::from("goodbye"), enum_(vec!["hello", "world"]).unwrap()),
            (Value::from(1i64), Ty::Path),
            (Value::from(2i64), Ty::Target),
            (Value::from("invalid_target"), Ty::Target),
            (Value::from("also:invalid_target"), Ty::Target),
            (Value::from("nope"), union(vec![Ty::Bool, Ty::Int]).unwrap()),
        ];
        for (v, t) in &cases {
            assert_fails(&reg, v, t);
        }
    }

    #[test]
    fn list_failure_reports_first_bad_index() {
        let reg = ShapeRegistry::new();
        let v = Value::List(vec![Value::from(1i64), Value::from(2i64), Value::from("3")]);
        let err = check(&reg, &v, &list(Ty::Int)).unwrap();
        assert!(err.starts_with("index 2:"), "{err}");
    }

    #[test]
    fn dict_failure_distinguishes_key_and_value() {
        let reg = ShapeRegistry::new();
        let bad_key = Value::Dict(vec![(Value::from(1i64), Value::from("b"))]);
        let err = check(&reg, &bad_key, &dict(Ty::Str, Ty::Str)).unwrap();
        assert!(err.starts_with("key 1:"), "{err}");

        let bad_val = Value::Dict(vec![(Value::from("a"), Value::from(1i64))]);
        let err = check(&reg, &bad_val, &dict(Ty::Str, Ty::Str)).unwrap();
        assert!(err.starts_with("value for key a:"), "{err}");
    }

    #[test]
    fn union_takes_first_matching_branch() {
        let reg = ShapeRegistry::new();
        let u = union(vec![Ty::Int, Ty::Str]).unwrap();
        let alts = match &u {
            Ty::Union(alts) => alts,
            _ => unreachable!(),
        };
        // "5" fails the int check, so it lands in branch 1 (str)
        assert_eq!(union_branch(&reg, &Value::from("5"), alts), Some(1));
        assert_eq!(union_branch(&reg, &Value::from(5i64), alts), Some(0));
        // bool/int overlap does not exist here, but ambiguity resolution is
        // positional: float accepts ints, yet int is listed first
        let overlap = vec![Ty::Int, Ty::Float];
        assert_eq!(union_branch(&reg, &Value::from(7i64), &overlap), Some(0));
    }

    #[test]
    fn union_error_aggregates_every_branch() {
        let reg = ShapeRegistry::new();
        let u = union(vec![Ty::Bool, Ty::Int]).unwrap();
        let err = check(&reg, &Value::from("foo"), &u).unwrap();
        assert_eq!(
            err,
            "foo not matched in union(bool, int): \
             expected bool, got foo; expected int, got foo"
        );
    }

    #[test]
    fn nested_union_flattens_through_alternatives() {
        let reg = ShapeRegistry::new();
        let inner = union(vec![Ty::Str, Ty::Int]).unwrap();
        let outer = union(vec![inner, Ty::Bool]).unwrap();
        for v in [Value::from("hi"), Value::from(1i64), Value::from(true)] {
            assert_ok(&reg, &v, &outer);
        }
    }

    #[test]
    fn shape_check_requires_exact_instance() {
        let mut reg = ShapeRegistry::new();
        let inner = reg.shape(vec![("z", field(Ty::Int))]).unwrap();
        let other = reg.shape(vec![("z", field(Ty::Int))]).unwrap();
        let inst = InstanceBuilder::new(inner)
            .set("z", 3i64)
            .build(&reg)
            .unwrap();

        assert_ok(&reg, &Value::Instance(inst.clone()), &Ty::Shape(inner));
        // structurally identical shape, different handle: not an instance
        let err = check(&reg, &Value::Instance(inst), &Ty::Shape(other)).unwrap();
        assert!(err.contains("is not an instance of"), "{err}");
        // a dict never passes as a shape
        let dict_twin = Value::Dict(vec![(Value::from("z"), Value::from(3i64))]);
        assert_fails(&reg, &dict_twin, &Ty::Shape(inner));
    }

    #[test]
    fn union_of_shapes_matches_by_handle() {
        let mut reg = ShapeRegistry::new();
        let s = reg.shape(vec![("s", field(Ty::Str))]).unwrap();
        let n = reg.shape(vec![("n", field(Ty::Int))]).unwrap();
        let u = union(vec![Ty::Shape(s), Ty::Shape(n)]).unwrap();
        let inst = InstanceBuilder::new(n).set("n", 10i64).build(&reg).unwrap();
        assert_ok(&reg, &Value::Instance(inst), &u);
    }

    #[test]
    fn optional_field_accepts_null() {
        let reg = ShapeRegistry::new();
        let opt = field(Ty::Str).optional();
        assert!(check_field(&reg, &Value::Null, &opt).is_none());
        let req = field(Ty::Str);
        let err = check_field(&reg, &Value::Null, &req).unwrap();
        assert_eq!(err, "required but is None");
        // optional still type-checks present values
        assert!(check_field(&reg, &Value::from(1i64), &opt).is_some());
    }
}
