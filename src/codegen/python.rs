//! Python backend: pydantic models, data-only (no wire support).
//!
//! Lists render as `typing.Tuple[T, ...]` to discourage mutation, matching
//! the immutability contract of instances. Defaults are
//! `Field(default_factory=lambda: json.loads('...'))` so the canonical JSON
//! is evaluated at first use instead of being transliterated into Python
//! literals.

use serde::Serialize;
use tera::Tera;

use crate::codegen::{ensure_ident, enum_variant_ident};
use crate::error::{Error, Result};
use crate::ir::{ComplexIr, IrStruct, IrType, IrUnion, Module, Primitive};

pub fn render_type(tera: &Tera, m: &Module, complex: &ComplexIr) -> Result<String> {
    let (template, ctx) = match complex {
        ComplexIr::Struct(s) => ("struct", struct_context(m, s)?),
        ComplexIr::Union(u) => ("union", union_context(m, u)?),
        ComplexIr::Enum(e) => {
            ensure_ident("enum", &e.name)?;
            let variants: Vec<EnumVariantCtx> = e
                .options
                .iter()
                .map(|v| EnumVariantCtx {
                    ident: enum_variant_ident(v),
                    literal: py_str_literal(v),
                })
                .collect();
            let mut ctx = tera::Context::new();
            ctx.insert("name", &e.name);
            ctx.insert("doc", &e.doc);
            ctx.insert("variants", &variants);
            ("enum", ctx)
        }
    };
    tera.render(template, &ctx)
        .map_err(|e| Error::Codegen(format!("python {template} template failed: {e}")))
}

#[derive(Serialize)]
struct EnumVariantCtx {
    ident: String,
    literal: String,
}

#[derive(Serialize)]
struct FieldCtx {
    name: String,
    ty: String,
    default_expr: Option<String>,
}

#[derive(Serialize)]
pub struct ImportCtx {
    pub module: String,
    pub names: String,
}

fn struct_context(m: &Module, s: &IrStruct) -> Result<tera::Context> {
    ensure_ident("struct", &s.name)?;
    let mut fields = Vec::with_capacity(s.fields.len());
    for (fname, f) in &s.fields {
        ensure_ident("field", fname)?;
        let default_expr = match &f.default {
            Some(d) if d.is_null() => Some("None".to_string()),
            Some(d) => {
                let canonical = serde_json::to_string(d).expect("json renders");
                Some(format!(
                    "Field(default_factory=lambda: json.loads({}))",
                    py_str_literal(&canonical)
                ))
            }
            None => None,
        };
        fields.push(FieldCtx {
            name: fname.clone(),
            ty: field_type(m, &f.ty, f.required),
            default_expr,
        });
    }
    let mut ctx = tera::Context::new();
    ctx.insert("name", &s.name);
    ctx.insert("doc", &s.doc);
    ctx.insert("fields", &fields);
    Ok(ctx)
}

fn union_context(m: &Module, u: &IrUnion) -> Result<tera::Context> {
    ensure_ident("union", &u.name)?;
    let alts: Vec<String> = u.alts.iter().map(|a| base_type(m, a)).collect();
    let mut ctx = tera::Context::new();
    ctx.insert("name", &u.name);
    ctx.insert("doc", &u.doc);
    ctx.insert("alts", &alts.join(", "));
    Ok(ctx)
}

/// Imports for types referenced from dependency modules, grouped per module
/// in first-reference order.
pub fn foreign_imports(m: &Module) -> Vec<ImportCtx> {
    let mut grouped: indexmap::IndexMap<String, Vec<String>> = indexmap::IndexMap::new();
    for complex in m.types.values() {
        match complex {
            ComplexIr::Struct(s) => {
                for f in s.fields.values() {
                    collect_foreign(&f.ty, &mut grouped);
                }
            }
            ComplexIr::Union(u) => {
                for a in &u.alts {
                    collect_foreign(a, &mut grouped);
                }
            }
            ComplexIr::Enum(_) => {}
        }
    }
    grouped
        .into_iter()
        .map(|(module, names)| ImportCtx { module, names: names.join(", ") })
        .collect()
}

fn collect_foreign(ty: &IrType, grouped: &mut indexmap::IndexMap<String, Vec<String>>) {
    match ty {
        IrType::Foreign { target, name, .. } => {
            let entry = grouped.entry(target.basename().to_string()).or_default();
            if !entry.contains(name) {
                entry.push(name.clone());
            }
        }
        IrType::List { item } => collect_foreign(item, grouped),
        IrType::Dict { key, value } => {
            collect_foreign(key, grouped);
            collect_foreign(value, grouped);
        }
        IrType::Primitive(_) | IrType::Named(_) => {}
    }
}

fn field_type(m: &Module, ty: &IrType, required: bool) -> String {
    let base = base_type(m, ty);
    if required {
        base
    } else {
        format!("typing.Optional[{base}]")
    }
}

fn base_type(m: &Module, ty: &IrType) -> String {
    match ty {
        IrType::Primitive(p) => match p {
            Primitive::Bool => "bool".to_string(),
            Primitive::Int => "int".to_string(),
            Primitive::Float => "float".to_string(),
            Primitive::Str => "str".to_string(),
            Primitive::Path => "Path".to_string(),
            Primitive::Target => "Target".to_string(),
        },
        // lie and say lists are tuples to discourage mutation
        IrType::List { item } => format!("typing.Tuple[{}, ...]", base_type(m, item)),
        IrType::Dict { key, value } => format!(
            "typing.Mapping[{}, {}]",
            base_type(m, key),
            base_type(m, value)
        ),
        IrType::Named(n) => n.clone(),
        IrType::Foreign { name, .. } => name.clone(),
    }
}

fn py_str_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
