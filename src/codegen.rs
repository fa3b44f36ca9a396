//! Code generation: IR module → typed source for one backend.
//!
//! Rendering is template-based (tera). Each backend registers a small set of
//! templates (module preamble, struct, enum, union); anything that needs
//! real logic (type spelling, default literals, wire statements) is
//! pre-rendered into plain strings by the backend and handed to the
//! template, so the templates stay declarative.
//!
//! Types render in transitive-dependency order. Python needs definitions
//! before use; Rust does not, but sorting both identically keeps the
//! artifacts diffable against each other. The IR cannot contain cycles,
//! which makes the ordering a simple count, not a topological sort.

pub mod python;
pub mod rust;

use std::path::Path;

use tera::Tera;

use crate::error::{Error, Result};
use crate::ir::{ComplexIr, IrType, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Rust,
    Python,
}

impl Backend {
    fn embedded_templates(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Backend::Rust => &[
                ("module", include_str!("../templates/rust/module.tera")),
                ("struct", include_str!("../templates/rust/struct.tera")),
                ("enum", include_str!("../templates/rust/enum.tera")),
                ("union", include_str!("../templates/rust/union.tera")),
            ],
            Backend::Python => &[
                ("module", include_str!("../templates/python/module.tera")),
                ("struct", include_str!("../templates/python/struct.tera")),
                ("enum", include_str!("../templates/python/enum.tera")),
                ("union", include_str!("../templates/python/union.tera")),
            ],
        }
    }
}

pub struct Renderer {
    backend: Backend,
    tera: Tera,
}

impl Renderer {
    /// Set up a renderer. When `templates_dir` is given, `<name>.tera` files
    /// found there replace the embedded defaults one by one.
    pub fn new(backend: Backend, templates_dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();
        for (name, embedded) in backend.embedded_templates() {
            let source = match templates_dir {
                Some(dir) => {
                    let candidate = dir.join(format!("{name}.tera"));
                    if candidate.is_file() {
                        std::fs::read_to_string(&candidate).map_err(|e| {
                            Error::Codegen(format!(
                                "cannot read template {}: {e}",
                                candidate.display()
                            ))
                        })?
                    } else {
                        (*embedded).to_string()
                    }
                }
                None => (*embedded).to_string(),
            };
            tera.add_raw_template(name, &source).map_err(|e| {
                Error::Codegen(format!("template '{name}' failed to parse: {e}"))
            })?;
        }
        Ok(Self { backend, tera })
    }

    /// Render one module to a single source file.
    pub fn render_module(&self, m: &Module) -> Result<String> {
        let mut body = String::new();
        for (_, complex) in ordered_types(m) {
            let block = match self.backend {
                Backend::Rust => rust::render_type(&self.tera, m, complex)?,
                Backend::Python => python::render_type(&self.tera, m, complex)?,
            };
            body.push_str(&block);
            body.push('\n');
        }

        let mut ctx = tera::Context::new();
        ctx.insert("module", &m.name);
        ctx.insert("target", m.target.as_str());
        ctx.insert("date", &generation_date());
        ctx.insert("imports", &python::foreign_imports(m));
        ctx.insert("body", body.trim_end());
        let code = self
            .tera
            .render("module", &ctx)
            .map_err(|e| Error::Codegen(format!("module template failed: {e}")))?;
        // the templates spell the banner marker defused so this source file
        // is not itself flagged as generated
        Ok(code.replace("@_generated", concat!('@', "generated")))
    }
}

/// Types ordered by how many other types they transitively depend on;
/// declaration order breaks ties, so output is stable.
fn ordered_types(m: &Module) -> Vec<(&String, &ComplexIr)> {
    let mut types: Vec<(usize, (&String, &ComplexIr))> =
        m.types.iter().enumerate().collect();
    types.sort_by_key(|(i, (_, c))| (dependency_count(m, c), *i));
    types.into_iter().map(|(_, entry)| entry).collect()
}

fn dependency_count(m: &Module, complex: &ComplexIr) -> usize {
    match complex {
        ComplexIr::Struct(s) => s
            .fields
            .values()
            .map(|f| type_dependency_count(m, &f.ty))
            .sum(),
        ComplexIr::Union(u) => u.alts.iter().map(|a| type_dependency_count(m, a)).sum(),
        ComplexIr::Enum(_) => 0,
    }
}

fn type_dependency_count(m: &Module, ty: &IrType) -> usize {
    match ty {
        IrType::Primitive(_) => 0,
        IrType::List { item } => type_dependency_count(m, item),
        IrType::Dict { key, value } => {
            type_dependency_count(m, key) + type_dependency_count(m, value)
        }
        IrType::Named(n) => {
            1 + m.get(n).map_or(0, |c| dependency_count(m, c))
        }
        IrType::Foreign { .. } => 1,
    }
}

/// Whether a type can appear inside a wire-enabled struct.
pub(crate) fn wire_encodable(m: &Module, ty: &IrType) -> bool {
    match ty {
        IrType::Primitive(_) => true,
        IrType::List { item } => wire_encodable(m, item),
        IrType::Dict { key, value } => wire_encodable(m, key) && wire_encodable(m, value),
        IrType::Named(n) => match m.get(n) {
            Some(ComplexIr::Enum(_)) => true,
            Some(ComplexIr::Struct(s)) => s.wire_enabled(),
            Some(ComplexIr::Union(u)) => u.alts.iter().all(|a| wire_encodable(m, a)),
            None => false,
        },
        // a foreign module's wire support was validated by its own extraction
        IrType::Foreign { .. } => true,
    }
}

/// Date stamped into the generated-file banner. Honors SOURCE_DATE_EPOCH so
/// reproducible-build environments get byte-identical artifacts.
fn generation_date() -> String {
    if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
        if let Ok(secs) = epoch.parse::<i64>() {
            if let Some(dt) = chrono::DateTime::from_timestamp(secs, 0) {
                return dt.format("%Y-%m-%d").to_string();
            }
        }
    }
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Enum members become UPPER_SNAKE identifiers in every backend; the
/// original string value rides along for (de)serialization.
pub(crate) fn enum_variant_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Names must be valid identifiers in every backend we render.
pub(crate) fn ensure_ident(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Ok(());
    }
    Err(Error::Codegen(format!(
        "{kind} '{name}' is not a valid identifier for generated code"
    )))
}
