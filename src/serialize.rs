//! Recursive serialization of instances to plain JSON values.
//!
//! The walk mirrors the type checker's dispatch exactly, with one extra
//! concern: target-reference leaves. Targets name build artifacts whose
//! on-disk paths are not stable cache keys, so serializing one is only legal
//! under an explicit policy:
//!
//! - `TargetPolicy::Fail`: any reachable target leaf aborts with an
//!   actionable error, however deeply nested.
//! - `TargetPolicy::Resolve`: emits `{"name": t, "path": "$(location t)"}`,
//!   deferring path resolution to the build host. Deliberately still not a
//!   literal filesystem path.
//!
//! Shape fields are emitted in declaration order and unions serialize through
//! the checker's first-match branch, so output is deterministic byte-for-byte
//! across runs.

use serde_json::{json, Map, Value as Json};

use crate::check;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::shape::{ShapeRegistry, Ty};
use crate::value::Value;

/// Passed by value through the whole recursion; never ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPolicy {
    Fail,
    Resolve,
}

pub fn to_plain(reg: &ShapeRegistry, inst: &Instance, policy: TargetPolicy) -> Result<Json> {
    instance_to_plain(reg, "", inst, policy)
}

fn instance_to_plain(
    reg: &ShapeRegistry,
    path: &str,
    inst: &Instance,
    policy: TargetPolicy,
) -> Result<Json> {
    let def = reg.get(inst.shape());
    let mut out = Map::with_capacity(def.fields.len());
    // declaration order, not any map iteration order
    for (name, fdef) in &def.fields {
        let value = inst
            .get(name)
            .expect("instance invariant: every declared field is present");
        let fpath = join_path(path, name);
        out.insert(
            name.clone(),
            value_to_plain(reg, &fpath, value, &fdef.ty, policy)?,
        );
    }
    Ok(Json::Object(out))
}

/// Serialize one value against its type. Public because IR extraction uses
/// the same canonicalization for field defaults.
pub fn value_to_plain(
    reg: &ShapeRegistry,
    path: &str,
    value: &Value,
    ty: &Ty,
    policy: TargetPolicy,
) -> Result<Json> {
    if let Value::Null = value {
        return Ok(Json::Null);
    }
    match ty {
        Ty::Bool | Ty::Int | Ty::Float | Ty::Str | Ty::Path | Ty::Enum(_) => Ok(leaf_json(value)),
        Ty::Target => {
            let target = match value {
                Value::Str(s) => s.clone(),
                other => other.brief(),
            };
            match policy {
                TargetPolicy::Fail => Err(Error::TargetSerialization {
                    field: path.to_string(),
                    target,
                }),
                TargetPolicy::Resolve => Ok(json!({
                    "name": target,
                    "path": format!("$(location {target})"),
                })),
            }
        }
        Ty::Shape(_) => match value {
            // already validated at construction time; not re-checked here
            Value::Instance(inst) => instance_to_plain(reg, path, inst, policy),
            other => Err(Error::Validation {
                field: path.to_string(),
                reason: format!("{} is not an instance", other.brief()),
            }),
        },
        Ty::List(item) => match value {
            Value::List(xs) => {
                let mut out = Vec::with_capacity(xs.len());
                for (i, x) in xs.iter().enumerate() {
                    let fpath = format!("{path}[{i}]");
                    out.push(value_to_plain(reg, &fpath, x, item, policy)?);
                }
                Ok(Json::Array(out))
            }
            other => Err(Error::Validation {
                field: path.to_string(),
                reason: format!("expected list, got {}", other.brief()),
            }),
        },
        Ty::Dict(_, val_ty) => match value {
            Value::Dict(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = plain_key(k);
                    let fpath = format!("{path}[{key}]");
                    out.insert(key, value_to_plain(reg, &fpath, v, val_ty, policy)?);
                }
                Ok(Json::Object(out))
            }
            other => Err(Error::Validation {
                field: path.to_string(),
                reason: format!("expected dict, got {}", other.brief()),
            }),
        },
        Ty::Union(alts) => match check::union_branch(reg, value, alts) {
            // same first-match rule as validation
            Some(i) => value_to_plain(reg, path, value, &alts[i], policy),
            None => Err(Error::Validation {
                field: path.to_string(),
                reason: check::check(reg, value, ty)
                    .unwrap_or_else(|| "no union branch matched".to_string()),
            }),
        },
    }
}

fn leaf_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Str(s) => Json::String(s.clone()),
        _ => unreachable!("leaf_json only called for primitive values"),
    }
}

/// Dict keys are primitives; JSON object keys are strings.
fn plain_key(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.brief(),
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
