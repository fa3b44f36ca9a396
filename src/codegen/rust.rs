//! Rust backend: records with serde derives, default accessors that parse
//! the canonical JSON at first use, and binary wire (de)serialization for
//! thrift-enabled shapes.
//!
//! Everything with logic is pre-rendered here into plain strings; the tera
//! templates only lay the strings out. Wire statements are emitted in
//! ascending field-id order, and the generated reader is the two-state loop
//! (`Reading` until the stop marker, then `Done`) that skips unknown ids and
//! fails with a typed error when a required field never shows up.

use serde::Serialize;
use tera::Tera;

use crate::codegen::{ensure_ident, enum_variant_ident, wire_encodable};
use crate::error::{Error, Result};
use crate::ir::{ComplexIr, ComplexKind, IrStruct, IrType, IrUnion, Module, Primitive};

const WIRE: &str = "::shapegen::wire";

pub fn render_type(tera: &Tera, m: &Module, complex: &ComplexIr) -> Result<String> {
    let (template, ctx) = match complex {
        ComplexIr::Struct(s) => ("struct", struct_context(m, s)?),
        ComplexIr::Union(u) => ("union", union_context(m, u)?),
        ComplexIr::Enum(e) => {
            ensure_ident("enum", &e.name)?;
            let variants: Vec<EnumVariantCtx> = e
                .options
                .iter()
                .map(|v| EnumVariantCtx { ident: enum_variant_ident(v), value: v.clone() })
                .collect();
            let mut ctx = tera::Context::new();
            ctx.insert("name", &e.name);
            ctx.insert("doc", &e.doc);
            ctx.insert("variants", &variants);
            ("enum", ctx)
        }
    };
    tera.render(template, &ctx)
        .map_err(|e| Error::Codegen(format!("rust {template} template failed: {e}")))
}

#[derive(Serialize)]
struct EnumVariantCtx {
    ident: String,
    value: String,
}

#[derive(Serialize)]
struct FieldCtx {
    name: String,
    ty: String,
    serde_attr: Option<String>,
    default_fn: Option<String>,
    default_raw: Option<String>,
}

#[derive(Serialize)]
struct UnionVariantCtx {
    ident: String,
    ty: String,
    id: i16,
    ttype: String,
    write_stmt: String,
    read_expr: String,
}

fn struct_context(m: &Module, s: &IrStruct) -> Result<tera::Context> {
    ensure_ident("struct", &s.name)?;
    let mut fields = Vec::with_capacity(s.fields.len());
    for (fname, f) in &s.fields {
        ensure_ident("field", fname)?;
        // the implicit null default of an optional field is plain
        // #[serde(default)]; everything else parses canonical json lazily
        let (serde_attr, default_fn, default_raw) = match &f.default {
            Some(d) if d.is_null() && !f.required => {
                (Some("#[serde(default)]".to_string()), None, None)
            }
            Some(default) => {
                let func = format!("{}_{}_default", s.name, fname);
                (
                    Some(format!("#[serde(default = \"{func}\")]")),
                    Some(func),
                    Some(raw_str_literal(
                        &serde_json::to_string(default).expect("json renders"),
                    )),
                )
            }
            None => (None, None, None),
        };
        fields.push(FieldCtx {
            name: fname.clone(),
            ty: field_type(m, &f.ty, f.required),
            serde_attr,
            default_fn,
            default_raw,
        });
    }

    let wire = s.wire_enabled();
    let mut write_stmts = Vec::new();
    let mut read_decls = Vec::new();
    let mut read_arms = Vec::new();
    let mut read_build = Vec::new();
    if wire {
        // extraction guarantees all-or-nothing ids, but IR files can be
        // hand-authored; refuse a partial mapping instead of guessing
        for (fname, f) in &s.fields {
            if f.thrift_id.is_none() {
                return Err(Error::Codegen(format!(
                    "'{}' is wire-enabled but field '{fname}' has no thrift id",
                    s.name
                )));
            }
        }
        // writer: ascending field-id order, required or non-null only
        let mut by_id: Vec<(&String, &crate::ir::IrField)> = s.fields.iter().collect();
        by_id.sort_by_key(|(_, f)| f.thrift_id.unwrap_or(i16::MAX));
        for (fname, f) in &by_id {
            let id = f.thrift_id.unwrap_or(i16::MAX);
            if !wire_encodable(m, &f.ty) {
                return Err(Error::Codegen(format!(
                    "wire-enabled '{}' field '{fname}' references a type with \
                     no thrift mapping",
                    s.name
                )));
            }
            let begin = format!(
                "w.write_field_begin({}, {id});",
                ttype_expr(m, &f.ty)?
            );
            let body = write_value(m, &f.ty, "v", 0)?;
            let stmt = if f.required {
                format!(
                    "{{\n            let v = &self.{fname};\n            {begin}\n            {}\n        }}",
                    indent_continuations(&body, 12)
                )
            } else {
                format!(
                    "if let Some(v) = &self.{fname} {{\n            {begin}\n            {}\n        }}",
                    indent_continuations(&body, 12)
                )
            };
            write_stmts.push(stmt);
        }

        // reader: one slot per declared field, filled as ids are recognized
        for (fname, f) in &s.fields {
            let id = f.thrift_id.unwrap_or(i16::MAX);
            let base = base_type(m, &f.ty);
            read_decls.push(format!("let mut f_{fname}: Option<{base}> = None;"));
            read_arms.push(format!(
                "Some((ty, {id})) if ty == {} => f_{fname} = Some({}),",
                ttype_expr(m, &f.ty)?,
                read_value(m, &f.ty, 0)?
            ));
            let build = match (f.required, &f.default) {
                (true, None) => format!(
                    "{fname}: f_{fname}.ok_or({WIRE}::WireError::MissingRequiredField {{ \
                     field: \"{fname}\", id: {id} }})?,"
                ),
                (true, Some(_)) => format!(
                    "{fname}: f_{fname}.unwrap_or_else({}_{fname}_default),",
                    s.name
                ),
                (false, Some(d)) if !d.is_null() => format!(
                    "{fname}: f_{fname}.or_else(|| {}_{fname}_default()),",
                    s.name
                ),
                (false, _) => format!("{fname}: f_{fname},"),
            };
            read_build.push(build);
        }
    }

    let mut ctx = tera::Context::new();
    ctx.insert("name", &s.name);
    ctx.insert("doc", &s.doc);
    ctx.insert("fields", &fields);
    ctx.insert("wire", &wire);
    ctx.insert("write_stmts", &write_stmts);
    ctx.insert("read_decls", &read_decls);
    ctx.insert("read_arms", &read_arms);
    ctx.insert("read_build", &read_build);
    Ok(ctx)
}

fn union_context(m: &Module, u: &IrUnion) -> Result<tera::Context> {
    ensure_ident("union", &u.name)?;
    let wire = u.alts.iter().all(|a| wire_encodable(m, a));
    let mut variants = Vec::with_capacity(u.alts.len());
    for (i, alt) in u.alts.iter().enumerate() {
        let id = (i + 1) as i16;
        let (ttype, write_stmt, read_expr) = if wire {
            (
                ttype_expr(m, alt)?,
                indent_continuations(&write_value(m, alt, "v", 0)?, 16),
                read_value(m, alt, 0)?,
            )
        } else {
            (String::new(), String::new(), String::new())
        };
        variants.push(UnionVariantCtx {
            ident: union_variant_ident(alt, i),
            ty: base_type(m, alt),
            id,
            ttype,
            write_stmt,
            read_expr,
        });
    }
    let mut ctx = tera::Context::new();
    ctx.insert("name", &u.name);
    ctx.insert("doc", &u.doc);
    ctx.insert("wire", &wire);
    ctx.insert("variants", &variants);
    Ok(ctx)
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE SPELLING
// ————————————————————————————————————————————————————————————————————————————

fn field_type(m: &Module, ty: &IrType, required: bool) -> String {
    let base = base_type(m, ty);
    if required { base } else { format!("Option<{base}>") }
}

fn base_type(m: &Module, ty: &IrType) -> String {
    match ty {
        IrType::Primitive(p) => match p {
            Primitive::Bool => "bool".to_string(),
            Primitive::Int => "i64".to_string(),
            Primitive::Float => "f64".to_string(),
            Primitive::Str => "String".to_string(),
            Primitive::Path => "::std::path::PathBuf".to_string(),
            Primitive::Target => "::shapegen::runtime::TargetRef".to_string(),
        },
        IrType::List { item } => format!("Vec<{}>", base_type(m, item)),
        IrType::Dict { key, value } => format!(
            "::std::collections::BTreeMap<{}, {}>",
            base_type(m, key),
            base_type(m, value)
        ),
        IrType::Named(n) => n.clone(),
        IrType::Foreign { target, name, .. } => {
            format!("crate::{}::{name}", target.basename())
        }
    }
}

fn ttype_expr(m: &Module, ty: &IrType) -> Result<String> {
    let tag = match ty {
        IrType::Primitive(Primitive::Bool) => "BOOL",
        IrType::Primitive(Primitive::Int) => "I32",
        IrType::Primitive(Primitive::Float) => "DOUBLE",
        IrType::Primitive(Primitive::Str) | IrType::Primitive(Primitive::Path) => "STRING",
        IrType::Primitive(Primitive::Target) => "STRUCT",
        IrType::List { .. } => "LIST",
        IrType::Dict { .. } => "MAP",
        IrType::Named(n) => match m.get(n) {
            Some(ComplexIr::Enum(_)) => "STRING",
            Some(_) => "STRUCT",
            None => {
                return Err(Error::Codegen(format!("unknown type reference '{n}'")));
            }
        },
        IrType::Foreign { kind, .. } => match kind {
            ComplexKind::Enum => "STRING",
            ComplexKind::Struct | ComplexKind::Union => "STRUCT",
        },
    };
    Ok(format!("{WIRE}::ttype::{tag}"))
}

// ————————————————————————————————————————————————————————————————————————————
// WIRE STATEMENTS
// ————————————————————————————————————————————————————————————————————————————

/// Statement(s) writing `expr` (a `&T`) of the given type. `depth` feeds
/// loop-variable naming for nested collections.
fn write_value(m: &Module, ty: &IrType, expr: &str, depth: usize) -> Result<String> {
    Ok(match ty {
        IrType::Primitive(Primitive::Bool) => format!("w.write_bool(*{expr});"),
        IrType::Primitive(Primitive::Int) => format!("w.write_int(*{expr})?;"),
        IrType::Primitive(Primitive::Float) => format!("w.write_double(*{expr});"),
        IrType::Primitive(Primitive::Str) => format!("w.write_string({expr})?;"),
        IrType::Primitive(Primitive::Path) => format!(
            "w.write_string({expr}.to_str().ok_or({WIRE}::WireError::BadUtf8)?)?;"
        ),
        IrType::Primitive(Primitive::Target) => format!("{expr}.wire_write(w)?;"),
        IrType::List { item } => {
            let var = format!("it{depth}");
            let inner = write_value(m, item, &var, depth + 1)?;
            format!(
                "w.write_list_begin({}, {expr}.len())?;\nfor {var} in {expr} {{\n    {}\n}}",
                ttype_expr(m, item)?,
                indent_continuations(&inner, 4)
            )
        }
        IrType::Dict { key, value } => {
            let kvar = format!("k{depth}");
            let vvar = format!("val{depth}");
            let kw = write_value(m, key, &kvar, depth + 1)?;
            let vw = write_value(m, value, &vvar, depth + 1)?;
            format!(
                "w.write_map_begin({}, {}, {expr}.len())?;\nfor ({kvar}, {vvar}) in {expr} {{\n    {}\n    {}\n}}",
                ttype_expr(m, key)?,
                ttype_expr(m, value)?,
                indent_continuations(&kw, 4),
                indent_continuations(&vw, 4)
            )
        }
        IrType::Named(n) => match m.get(n) {
            Some(ComplexIr::Enum(_)) => format!("w.write_string({expr}.as_str())?;"),
            Some(_) => format!("{expr}.wire_write(w)?;"),
            None => return Err(Error::Codegen(format!("unknown type reference '{n}'"))),
        },
        IrType::Foreign { kind, .. } => match kind {
            ComplexKind::Enum => format!("w.write_string({expr}.as_str())?;"),
            _ => format!("{expr}.wire_write(w)?;"),
        },
    })
}

/// Expression reading one value of the given type from reader `r`.
fn read_value(m: &Module, ty: &IrType, depth: usize) -> Result<String> {
    Ok(match ty {
        IrType::Primitive(Primitive::Bool) => "r.read_bool()?".to_string(),
        IrType::Primitive(Primitive::Int) => "r.read_int()?".to_string(),
        IrType::Primitive(Primitive::Float) => "r.read_double()?".to_string(),
        IrType::Primitive(Primitive::Str) => "r.read_string()?".to_string(),
        IrType::Primitive(Primitive::Path) => {
            "::std::path::PathBuf::from(r.read_string()?)".to_string()
        }
        IrType::Primitive(Primitive::Target) => {
            format!("{}::runtime::TargetRef::wire_read(r)?", "::shapegen")
        }
        IrType::List { item } => {
            let inner = read_value(m, item, depth + 1)?;
            format!(
                "{{\n    let (_ety{depth}, len{depth}) = r.read_list_begin()?;\n    \
                 let mut out{depth} = Vec::new();\n    \
                 for _ in 0..len{depth} {{\n        out{depth}.push({});\n    }}\n    \
                 out{depth}\n}}",
                indent_continuations(&inner, 8)
            )
        }
        IrType::Dict { key, value } => {
            let kr = read_value(m, key, depth + 1)?;
            let vr = read_value(m, value, depth + 1)?;
            format!(
                "{{\n    let (_kt{depth}, _vt{depth}, len{depth}) = r.read_map_begin()?;\n    \
                 let mut out{depth} = ::std::collections::BTreeMap::new();\n    \
                 for _ in 0..len{depth} {{\n        \
                 let k{depth} = {};\n        \
                 let v{depth} = {};\n        \
                 out{depth}.insert(k{depth}, v{depth});\n    }}\n    \
                 out{depth}\n}}",
                indent_continuations(&kr, 8),
                indent_continuations(&vr, 8)
            )
        }
        IrType::Named(n) => match m.get(n) {
            Some(ComplexIr::Enum(_)) => format!("{n}::from_wire_str(&r.read_string()?)?"),
            Some(_) => format!("{n}::wire_read(r)?"),
            None => return Err(Error::Codegen(format!("unknown type reference '{n}'"))),
        },
        IrType::Foreign { target, name, kind } => {
            let path = format!("crate::{}::{name}", target.basename());
            match kind {
                ComplexKind::Enum => format!("{path}::from_wire_str(&r.read_string()?)?"),
                _ => format!("{path}::wire_read(r)?"),
            }
        }
    })
}

// ————————————————————————————————————————————————————————————————————————————
// SMALL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Raw string literal with enough `#`s that the payload can never close it
/// early. This is the whole point of shipping defaults as canonical JSON.
fn raw_str_literal(s: &str) -> String {
    let mut hashes = 1;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            let mut run = 0;
            while i + 1 + run < bytes.len() && bytes[i + 1 + run] == b'#' {
                run += 1;
            }
            hashes = hashes.max(run + 1);
        }
        i += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{s}\"{fence}")
}

fn union_variant_ident(ty: &IrType, index: usize) -> String {
    match ty {
        IrType::Primitive(p) => match p {
            Primitive::Bool => "Bool".to_string(),
            Primitive::Int => "Int".to_string(),
            Primitive::Float => "Float".to_string(),
            Primitive::Str => "Str".to_string(),
            Primitive::Path => "Path".to_string(),
            Primitive::Target => "Target".to_string(),
        },
        IrType::Named(n) => n.clone(),
        IrType::Foreign { name, .. } => name.clone(),
        _ => format!("Alt{index}"),
    }
}

/// Re-indent every line after the first so multi-line statements sit
/// correctly when the template splices them in.
fn indent_continuations(s: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    let mut lines = s.lines();
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(&pad);
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_literal_survives_embedded_quotes_and_hashes() {
        assert_eq!(raw_str_literal(r#"{"a":1}"#), r##"r#"{"a":1}"#"##);
        // a payload that would close a one-hash raw string gets two hashes
        let tricky = r##"{"s":"x\"#y"}"##;
        let lit = raw_str_literal(tricky);
        assert!(lit.starts_with("r##\""), "{lit}");
        assert!(lit.ends_with("\"##"), "{lit}");
    }

    #[test]
    fn enum_variant_idents_are_sanitized() {
        assert_eq!(enum_variant_ident("good-day"), "GOOD_DAY");
        assert_eq!(enum_variant_ident("hello"), "HELLO");
        assert_eq!(enum_variant_ident("7zip"), "_7ZIP");
    }

    #[test]
    fn continuation_indentation_leaves_first_line_alone() {
        let s = "a\nb\nc";
        assert_eq!(indent_continuations(s, 4), "a\n    b\n    c");
    }
}
