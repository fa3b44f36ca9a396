//! Type descriptors and the declaration surface.
//!
//! A `Ty` is a closed sum over everything a field can be typed as. Shapes
//! (record types) are interned in a `ShapeRegistry` and referenced by a
//! stable `ShapeId` handle; handle equality IS shape identity, which is what
//! makes "instance of exactly this shape" a cheap, unambiguous test.
//!
//! Declaration errors (duplicate fields, reserved prefixes, degenerate
//! unions, bad enum values, bad defaults) are caught here, eagerly, at the
//! moment of declaration. Nothing downstream ever sees a malformed shape.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::check;
use crate::error::{Error, Result};
use crate::value::Value;

/// Field names starting with this prefix are reserved for internal use.
const RESERVED_FIELD_PREFIX: &str = "_";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Interned handle to a `ShapeDef` in a `ShapeRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(usize);

impl ShapeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Bool,
    Int,
    Float,
    Str,
    /// Checked as a string; purely syntactic, no filesystem access.
    Path,
    /// Opaque build-target reference; special-cased at serialization time.
    Target,
    Shape(ShapeId),
    List(Box<Ty>),
    Dict(Box<Ty>, Box<Ty>),
    /// Ordered alternatives; first match wins, always.
    Union(Vec<Ty>),
    Enum(Vec<String>),
}

impl Ty {
    /// Human-readable type name for error messages.
    pub fn describe(&self, reg: &ShapeRegistry) -> String {
        match self {
            Ty::Bool => "bool".to_string(),
            Ty::Int => "int".to_string(),
            Ty::Float => "float".to_string(),
            Ty::Str => "str".to_string(),
            Ty::Path => "path".to_string(),
            Ty::Target => "target".to_string(),
            Ty::Shape(id) => match &reg.get(*id).name {
                Some(name) => format!("shape {name}"),
                None => format!("shape #{}", id.index()),
            },
            Ty::List(item) => format!("list({})", item.describe(reg)),
            Ty::Dict(k, v) => format!("dict({}, {})", k.describe(reg), v.describe(reg)),
            Ty::Union(alts) => {
                let names: Vec<String> = alts.iter().map(|t| t.describe(reg)).collect();
                format!("union({})", names.join(", "))
            }
            Ty::Enum(opts) => format!("enum({})", opts.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub ty: Ty,
    pub optional: bool,
    pub default: Option<Value>,
}

/// A record type: ordered field name → field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDef {
    /// Top-level shapes get their declared name; anonymous nested shapes are
    /// named during IR extraction.
    pub name: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    /// Wire field-number mapping (id → field name). Presence opts the shape
    /// into binary wire support; the bijection against `fields` is enforced
    /// at IR extraction.
    pub thrift: Option<BTreeMap<i16, String>>,
    pub doc: Option<String>,
    /// Set when imported from a dependency's IR; holds the owning module
    /// target. Foreign shapes are referenced, never re-extracted.
    pub foreign: Option<String>,
}

#[derive(Debug, Default)]
pub struct ShapeRegistry {
    defs: Vec<ShapeDef>,
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATION SURFACE
// ————————————————————————————————————————————————————————————————————————————

/// Required field of the given type, no default.
pub fn field(ty: Ty) -> FieldDef {
    FieldDef { ty, optional: false, default: None }
}

impl FieldDef {
    /// Optional field. With no explicit default, the default is implicitly
    /// `Value::Null`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The value this field takes when the caller does not supply one.
    /// Optional fields without an explicit default fall back to null.
    pub fn effective_default(&self) -> Option<Value> {
        match (&self.default, self.optional) {
            (Some(v), _) => Some(v.clone()),
            (None, true) => Some(Value::Null),
            (None, false) => None,
        }
    }
}

pub fn list(item: Ty) -> Ty {
    Ty::List(Box::new(item))
}

pub fn dict(key: Ty, value: Ty) -> Ty {
    Ty::Dict(Box::new(key), Box::new(value))
}

/// Ordered union. Order is significant: validation and serialization both
/// scan alternatives linearly and take the first match.
pub fn union(alts: Vec<Ty>) -> Result<Ty> {
    if alts.len() < 2 {
        return Err(Error::Decl(format!(
            "union needs at least two alternatives, got {}",
            alts.len()
        )));
    }
    Ok(Ty::Union(alts))
}

pub fn enum_<S: Into<String>>(values: Vec<S>) -> Result<Ty> {
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    if values.is_empty() {
        return Err(Error::Decl("enum needs at least one value".to_string()));
    }
    for (i, v) in values.iter().enumerate() {
        if v.is_empty() {
            return Err(Error::Decl(format!("enum value at {i} is empty")));
        }
        if values[..i].contains(v) {
            return Err(Error::Decl(format!("enum value '{v}' appears more than once")));
        }
    }
    Ok(Ty::Enum(values))
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an anonymous shape. Field order is the declaration order and
    /// is preserved all the way through serialization and codegen.
    pub fn shape(&mut self, fields: Vec<(&str, FieldDef)>) -> Result<ShapeId> {
        self.declare(None, fields, None, None)
    }

    /// Declare a named, top-level shape.
    pub fn shape_named(&mut self, name: &str, fields: Vec<(&str, FieldDef)>) -> Result<ShapeId> {
        self.declare(Some(name.to_string()), fields, None, None)
    }

    /// Declare a named shape that opts into binary wire support via an
    /// explicit field-number mapping.
    pub fn shape_with_thrift(
        &mut self,
        name: &str,
        fields: Vec<(&str, FieldDef)>,
        thrift: BTreeMap<i16, String>,
    ) -> Result<ShapeId> {
        self.declare(Some(name.to_string()), fields, Some(thrift), None)
    }

    pub(crate) fn declare(
        &mut self,
        name: Option<String>,
        fields: Vec<(&str, FieldDef)>,
        thrift: Option<BTreeMap<i16, String>>,
        doc: Option<String>,
    ) -> Result<ShapeId> {
        let mut map: IndexMap<String, FieldDef> = IndexMap::with_capacity(fields.len());
        for (fname, def) in fields {
            if fname.is_empty() {
                return Err(Error::Decl("field name must not be empty".to_string()));
            }
            if fname.starts_with(RESERVED_FIELD_PREFIX) {
                return Err(Error::Decl(format!(
                    "field name must not start with {RESERVED_FIELD_PREFIX}: {fname}"
                )));
            }
            if map.insert(fname.to_string(), def).is_some() {
                return Err(Error::Decl(format!("duplicate field name: {fname}")));
            }
        }

        if let Some(thrift) = &thrift {
            for (&id, fname) in thrift {
                if id <= 0 {
                    return Err(Error::Decl(format!(
                        "thrift field id for '{fname}' must be positive, got {id}"
                    )));
                }
            }
        }

        let id = ShapeId(self.defs.len());
        self.defs.push(ShapeDef { name, fields: map, thrift, doc, foreign: None });

        // Defaults are validated after interning so that a shape whose field
        // defaults to an instance of an earlier shape resolves normally.
        let def = &self.defs[id.0];
        for (fname, fdef) in &def.fields {
            if let Some(default) = &fdef.default {
                if let Some(err) = check::check(self, default, &fdef.ty) {
                    return Err(Error::Decl(format!(
                        "default for field '{fname}' is invalid: {err}"
                    )));
                }
            }
        }

        Ok(id)
    }

    /// Register a shape imported from a dependency module's IR. Its fields
    /// are usable in type positions but it is never re-extracted.
    pub(crate) fn declare_foreign(
        &mut self,
        name: String,
        fields: IndexMap<String, FieldDef>,
        target: String,
    ) -> ShapeId {
        let id = ShapeId(self.defs.len());
        self.defs.push(ShapeDef {
            name: Some(name),
            fields,
            thrift: None,
            doc: None,
            foreign: Some(target),
        });
        id
    }

    pub fn get(&self, id: ShapeId) -> &ShapeDef {
        &self.defs[id.0]
    }

    pub(crate) fn set_name(&mut self, id: ShapeId, name: String) {
        self.defs[id.0].name = Some(name);
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;

    #[test]
    fn field_order_is_declaration_order() {
        let mut reg = ShapeRegistry::new();
        let id = reg
            .shape(vec![("zulu", field(Ty::Str)), ("alpha", field(Ty::Int))])
            .unwrap();
        let names: Vec<&String> = reg.get(id).fields.keys().collect();
        assert_eq!(names, ["zulu", "alpha"]);
    }

    #[test]
    fn reserved_prefix_is_rejected() {
        let mut reg = ShapeRegistry::new();
        reg.shape(vec![("ohai", field(Ty::Int))]).unwrap();
        let err = reg.shape(vec![("_ohai", field(Ty::Int))]).unwrap_err();
        assert!(err.to_string().contains("must not start with _"), "{err}");
    }

    #[test]
    fn duplicate_field_name_is_rejected() {
        let mut reg = ShapeRegistry::new();
        let err = reg
            .shape(vec![("x", field(Ty::Int)), ("x", field(Ty::Str))])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field name: x"), "{err}");
    }

    #[test]
    fn union_needs_two_alternatives() {
        assert!(union(vec![]).is_err());
        assert!(union(vec![Ty::Int]).is_err());
        assert!(union(vec![Ty::Int, Ty::Str]).is_ok());
    }

    #[test]
    fn enum_values_must_be_unique_and_non_empty() {
        assert!(enum_(vec!["hello", "world"]).is_ok());
        assert!(enum_(Vec::<String>::new()).is_err());
        assert!(enum_(vec![""]).is_err());
        assert!(enum_(vec!["a", "a"]).is_err());
    }

    #[test]
    fn bad_default_is_a_declaration_error() {
        let mut reg = ShapeRegistry::new();
        let err = reg
            .shape(vec![("answer", field(Ty::Int).with_default("forty-two"))])
            .unwrap_err();
        assert!(err.to_string().contains("default for field 'answer'"), "{err}");
    }

    #[test]
    fn zero_field_shape_is_constructible() {
        let mut reg = ShapeRegistry::new();
        let id = reg.shape(vec![]).unwrap();
        let inst = InstanceBuilder::new(id).build(&reg).unwrap();
        assert_eq!(inst.shape(), id);
    }

    #[test]
    fn non_positive_thrift_id_is_rejected() {
        let mut reg = ShapeRegistry::new();
        let mut thrift = BTreeMap::new();
        thrift.insert(0i16, "x".to_string());
        let err = reg
            .shape_with_thrift("t", vec![("x", field(Ty::Int))], thrift)
            .unwrap_err();
        assert!(err.to_string().contains("must be positive"), "{err}");
    }
}
