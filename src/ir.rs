//! Language-neutral intermediate representation for shape modules.
//!
//! The IR is what the extractor produces and the only thing the code
//! generator consumes; it is agnostic to how shapes were declared. Modules
//! round-trip through JSON so one extraction can feed several render passes
//! and serve as a dependency input to other extractions.
//!
//! Every complex type (struct/union/enum) lives at module level under a
//! name; field types reference them by name, or by `Foreign` when they come
//! from another module's IR. Field order inside a struct is declaration
//! order and is load-bearing for serialization and codegen.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::Error;

// ————————————————————————————————————————————————————————————————————————————
// MODULE TARGET
// ————————————————————————————————————————————————————————————————————————————

/// Build target that uniquely identifies a shape module, e.g.
/// `//demo/shapes:characters.shape`. Used to derive artifact names and to
/// key dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleTarget(String);

impl TryFrom<String> for ModuleTarget {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        if !s.contains(':') {
            return Err(Error::Extract(format!(
                "module target must contain ':', got '{s}'"
            )));
        }
        if !s.ends_with(".shape") {
            return Err(Error::Extract(format!(
                "module target must end with '.shape', got '{s}'"
            )));
        }
        Ok(Self(s))
    }
}

impl TryFrom<&str> for ModuleTarget {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Error> {
        s.to_string().try_into()
    }
}

impl From<ModuleTarget> for String {
    fn from(t: ModuleTarget) -> Self {
        t.0
    }
}

impl std::fmt::Display for ModuleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ModuleTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rule-name portion, without the `.shape` suffix.
    pub fn basename(&self) -> &str {
        self.0
            .rsplit_once(':')
            .expect("validated at construction")
            .1
            .strip_suffix(".shape")
            .expect("validated at construction")
    }

    /// Cell-relative portion of the target, without the `.shape` suffix.
    pub fn base_target(&self) -> &str {
        self.0
            .find("//")
            .map_or(self.0.as_str(), |idx| &self.0[idx..])
            .strip_suffix(".shape")
            .expect("validated at construction")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// All the types declared by one shape module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub target: ModuleTarget,
    pub types: IndexMap<String, ComplexIr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Module {
    pub fn get(&self, name: &str) -> Option<&ComplexIr> {
        self.types.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrType {
    Primitive(Primitive),
    List { item: Box<IrType> },
    Dict { key: Box<IrType>, value: Box<IrType> },
    /// Named complex type declared in the same module.
    Named(String),
    /// Type imported from a dependency module's IR. The kind is recorded so
    /// a renderer can pick wire/type forms without loading the dependency.
    Foreign { target: ModuleTarget, name: String, kind: ComplexKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexKind {
    Struct,
    Union,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
    Path,
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexIr {
    Struct(IrStruct),
    Union(IrUnion),
    Enum(IrEnum),
}

impl ComplexIr {
    pub fn name(&self) -> &str {
        match self {
            ComplexIr::Struct(s) => &s.name,
            ComplexIr::Union(u) => &u.name,
            ComplexIr::Enum(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrStruct {
    pub name: String,
    /// Declaration order preserved.
    pub fields: IndexMap<String, IrField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl IrStruct {
    /// A struct is wire-enabled when its fields carry thrift ids. The
    /// extractor guarantees all-or-nothing.
    pub fn wire_enabled(&self) -> bool {
        self.fields.values().any(|f| f.thrift_id.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrField {
    #[serde(rename = "type")]
    pub ty: IrType,
    pub required: bool,
    /// Canonical JSON rendering of the declared default, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,
    /// Wire field id; present on every field of a wire-enabled struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thrift_id: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrUnion {
    pub name: String,
    /// Ordered alternatives; order is the first-match rule.
    pub alts: Vec<IrType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrEnum {
    pub name: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_target_validation() {
        let err = ModuleTarget::try_from("//some/target:path").unwrap_err();
        assert!(err.to_string().contains("must end with '.shape'"), "{err}");
        let err = ModuleTarget::try_from("no-colon.shape").unwrap_err();
        assert!(err.to_string().contains("must contain ':'"), "{err}");

        let t = ModuleTarget::try_from("//some/target:path.shape").unwrap();
        assert_eq!(t.basename(), "path");
        assert_eq!(t.base_target(), "//some/target:path");

        let t = ModuleTarget::try_from("cell//some/target:path.shape").unwrap();
        assert_eq!(t.basename(), "path");
        assert_eq!(t.base_target(), "//some/target:path");

        let t = ModuleTarget::try_from(":relative.shape").unwrap();
        assert_eq!(t.basename(), "relative");
        assert_eq!(t.base_target(), ":relative");
    }

    #[test]
    fn module_round_trips_through_json() {
        let mut fields = IndexMap::new();
        fields.insert(
            "hello".to_string(),
            IrField {
                ty: IrType::Primitive(Primitive::Str),
                required: true,
                default: None,
                thrift_id: Some(1),
            },
        );
        fields.insert(
            "count".to_string(),
            IrField {
                ty: IrType::Primitive(Primitive::Int),
                required: true,
                default: Some(json!(0)),
                thrift_id: Some(2),
            },
        );
        let mut types = IndexMap::new();
        types.insert(
            "top".to_string(),
            ComplexIr::Struct(IrStruct { name: "top".to_string(), fields, doc: None }),
        );
        let module = Module {
            name: "simple".to_string(),
            target: ModuleTarget::try_from("//shapes:simple.shape").unwrap(),
            types,
            doc: None,
        };

        let text = serde_json::to_string_pretty(&module).unwrap();
        let back: Module = serde_json::from_str(&text).unwrap();
        assert_eq!(module, back);
        // field order survives the round trip
        let s = match back.get("top").unwrap() {
            ComplexIr::Struct(s) => s,
            _ => panic!("expected struct"),
        };
        let names: Vec<&String> = s.fields.keys().collect();
        assert_eq!(names, ["hello", "count"]);
        assert!(s.wire_enabled());
    }

    #[test]
    fn nested_irtype_serializes_tagged() {
        let t = IrType::List {
            item: Box::new(IrType::Dict {
                key: Box::new(IrType::Primitive(Primitive::Str)),
                value: Box::new(IrType::Named("inner".to_string())),
            }),
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            json!({"list": {"item": {"dict": {
                "key": {"primitive": "str"},
                "value": {"named": "inner"},
            }}}})
        );
        let back: IrType = serde_json::from_value(v).unwrap();
        assert_eq!(t, back);
    }
}
