//! JSON Schema-ish emission from the IR.
//!
//! For tooling that only needs the shape of the serialized data, not
//! behavior. One document per module: named types under `$defs`, references
//! via `$ref`. Mirrors what `serialize::to_plain` produces: optional fields
//! are nullable, targets appear in their resolved `{name, path}` form,
//! unions become `oneOf` in declared order.

use serde_json::{json, Map, Value as Json};

use crate::ir::{ComplexIr, IrType, Module, Primitive};

pub fn schema_for_module(m: &Module) -> Json {
    let mut defs = Map::new();
    for (name, complex) in &m.types {
        defs.insert(name.clone(), schema_for_complex(m, complex));
    }
    json!({
        "$id": m.target.as_str(),
        "title": m.name,
        "$defs": Json::Object(defs),
    })
}

fn schema_for_complex(m: &Module, complex: &ComplexIr) -> Json {
    match complex {
        ComplexIr::Struct(s) => {
            let mut props = Map::new();
            let mut required: Vec<String> = Vec::new();
            for (fname, f) in &s.fields {
                let mut field_schema = schema_for_type(m, &f.ty);
                if !f.required {
                    field_schema = nullable(field_schema);
                }
                if let Some(default) = &f.default {
                    if let Json::Object(o) = &mut field_schema {
                        o.insert("default".to_string(), default.clone());
                    }
                }
                props.insert(fname.clone(), field_schema);
                if f.required {
                    required.push(fname.clone());
                }
            }
            let mut out = Map::new();
            out.insert("type".to_string(), Json::from("object"));
            out.insert("properties".to_string(), Json::Object(props));
            if !required.is_empty() {
                out.insert(
                    "required".to_string(),
                    Json::Array(required.into_iter().map(Json::from).collect()),
                );
            }
            Json::Object(out)
        }
        ComplexIr::Union(u) => {
            json!({ "oneOf": u.alts.iter().map(|a| schema_for_type(m, a)).collect::<Vec<_>>() })
        }
        ComplexIr::Enum(e) => {
            json!({ "type": "string", "enum": e.options })
        }
    }
}

pub fn schema_for_type(m: &Module, t: &IrType) -> Json {
    match t {
        IrType::Primitive(p) => match p {
            Primitive::Bool => json!({ "type": "boolean" }),
            Primitive::Int => json!({ "type": "integer" }),
            Primitive::Float => json!({ "type": "number" }),
            Primitive::Str | Primitive::Path => json!({ "type": "string" }),
            // the serialized form under the resolve policy
            Primitive::Target => json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "path": { "type": "string" },
                },
                "required": ["name", "path"],
            }),
        },
        IrType::List { item } => json!({
            "type": "array",
            "items": schema_for_type(m, item),
        }),
        IrType::Dict { value, .. } => json!({
            // JSON object keys are strings regardless of the declared key type
            "type": "object",
            "additionalProperties": schema_for_type(m, value),
        }),
        IrType::Named(n) => json!({ "$ref": format!("#/$defs/{n}") }),
        IrType::Foreign { target, name, .. } => {
            json!({ "$ref": format!("{}#/$defs/{name}", target.base_target()) })
        }
    }
}

fn nullable(inner: Json) -> Json {
    json!({ "oneOf": [inner, { "type": "null" }] })
}
