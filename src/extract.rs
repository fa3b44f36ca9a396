//! IR extraction: resolved declarations → `ir::Module`.
//!
//! The extractor is a single-shot batch pass. It preserves field declaration
//! order, canonicalizes every default to JSON (through the serializer, so a
//! target reference hiding in a default is a hard error), validates the
//! thrift field-number mapping bijectively against the declared field set,
//! and hoists anonymous inline complex types to module level under
//! deterministic path-based names (`parent_field`, `parent_field_item`, ...)
//! so repeated extraction of the same declarations is byte-identical.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::decl::{LoadedModule, NamedDecl, ShapeTerm, TyTerm};
use crate::error::{Error, Result};
use crate::ir::{ComplexIr, IrEnum, IrField, IrStruct, IrType, IrUnion, Module};
use crate::serialize::{self, TargetPolicy};

pub fn extract_module(m: &LoadedModule) -> Result<Module> {
    let mut ex = Extractor { m, out: IndexMap::new() };

    for (name, decl) in &m.types {
        let complex = match decl {
            NamedDecl::Shape(term) => ComplexIr::Struct(ex.lower_struct(name, term)?),
            NamedDecl::EnumAlias(values) => ComplexIr::Enum(IrEnum {
                name: name.clone(),
                options: values.clone(),
                doc: None,
            }),
            NamedDecl::UnionAlias(terms) => {
                let alts = terms
                    .iter()
                    .enumerate()
                    .map(|(i, t)| ex.lower_term(&format!("{name}_{i}"), t))
                    .collect::<Result<Vec<_>>>()?;
                ComplexIr::Union(IrUnion { name: name.clone(), alts, doc: None })
            }
        };
        ex.out.insert(name.clone(), complex);
    }

    Ok(Module {
        name: m.name.clone(),
        target: m.target.clone(),
        types: ex.out,
        doc: m.doc.clone(),
    })
}

struct Extractor<'a> {
    m: &'a LoadedModule,
    /// Output types; hoisted anonymous types land here before their parent.
    out: IndexMap<String, ComplexIr>,
}

impl<'a> Extractor<'a> {
    fn lower_struct(&mut self, name: &str, term: &ShapeTerm) -> Result<IrStruct> {
        let id_of = validate_thrift(name, term)?;
        let shape_def = self.m.registry.get(term.id);

        let mut fields: IndexMap<String, IrField> = IndexMap::with_capacity(term.fields.len());
        for (fname, fterm) in &term.fields {
            let ty = self.lower_term(&format!("{name}_{fname}"), &fterm.term)?;
            let default = match &fterm.default {
                Some(value) => {
                    let field_ty = &shape_def.fields[fname.as_str()].ty;
                    let json = serialize::value_to_plain(
                        &self.m.registry,
                        fname,
                        value,
                        field_ty,
                        TargetPolicy::Fail,
                    )
                    .map_err(|e| {
                        Error::Extract(format!("default for '{name}.{fname}': {e}"))
                    })?;
                    Some(json)
                }
                None if fterm.optional => Some(serde_json::Value::Null),
                None => None,
            };
            fields.insert(
                fname.clone(),
                IrField {
                    ty,
                    required: !fterm.optional,
                    default,
                    thrift_id: id_of.get(fname.as_str()).copied(),
                },
            );
        }

        Ok(IrStruct { name: name.to_string(), fields, doc: term.doc.clone() })
    }

    fn lower_term(&mut self, path: &str, term: &TyTerm) -> Result<IrType> {
        Ok(match term {
            TyTerm::Prim(p) => IrType::Primitive(*p),
            TyTerm::List(item) => IrType::List {
                item: Box::new(self.lower_term(&format!("{path}_item"), item)?),
            },
            TyTerm::Dict(k, v) => IrType::Dict {
                key: Box::new(self.lower_term(&format!("{path}_key"), k)?),
                value: Box::new(self.lower_term(&format!("{path}_value"), v)?),
            },
            TyTerm::Ref(n) => IrType::Named(n.clone()),
            TyTerm::Foreign { target, name, kind } => IrType::Foreign {
                target: target.clone(),
                name: name.clone(),
                kind: *kind,
            },
            TyTerm::InlineShape(st) => {
                self.claim(path)?;
                let s = self.lower_struct(path, st)?;
                self.out.insert(path.to_string(), ComplexIr::Struct(s));
                IrType::Named(path.to_string())
            }
            TyTerm::InlineUnion(terms) => {
                self.claim(path)?;
                let alts = terms
                    .iter()
                    .enumerate()
                    .map(|(i, t)| self.lower_term(&format!("{path}_{i}"), t))
                    .collect::<Result<Vec<_>>>()?;
                self.out.insert(
                    path.to_string(),
                    ComplexIr::Union(IrUnion { name: path.to_string(), alts, doc: None }),
                );
                IrType::Named(path.to_string())
            }
            TyTerm::InlineEnum(values) => {
                self.claim(path)?;
                self.out.insert(
                    path.to_string(),
                    ComplexIr::Enum(IrEnum {
                        name: path.to_string(),
                        options: values.clone(),
                        doc: None,
                    }),
                );
                IrType::Named(path.to_string())
            }
        })
    }

    /// Synthesized names must not shadow declared or already-hoisted types.
    fn claim(&self, path: &str) -> Result<()> {
        if self.m.types.contains_key(path) || self.out.contains_key(path) {
            return Err(Error::Extract(format!(
                "synthesized type name '{path}' collides with an existing type; \
                 rename the declared type or the field"
            )));
        }
        Ok(())
    }
}

/// Enforce the thrift mapping bijection: every declared field appears
/// exactly once, no extras, no omissions. Returns field name → id.
fn validate_thrift<'t>(name: &str, term: &'t ShapeTerm) -> Result<BTreeMap<&'t str, i16>> {
    let mut id_of: BTreeMap<&str, i16> = BTreeMap::new();
    let Some(thrift) = &term.thrift else {
        return Ok(id_of);
    };
    for (&id, fname) in thrift {
        if !term.fields.contains_key(fname.as_str()) {
            return Err(Error::ThriftMapping {
                shape: name.to_string(),
                reason: format!("names unknown field '{fname}' (id {id})"),
            });
        }
        if id_of.insert(fname.as_str(), id).is_some() {
            return Err(Error::ThriftMapping {
                shape: name.to_string(),
                reason: format!("maps field '{fname}' more than once"),
            });
        }
    }
    for fname in term.fields.keys() {
        if !id_of.contains_key(fname.as_str()) {
            return Err(Error::ThriftMapping {
                shape: name.to_string(),
                reason: format!("is missing field '{fname}'"),
            });
        }
    }
    Ok(id_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::load_module;
    use serde_json::json;

    fn load(types: serde_json::Value) -> LoadedModule {
        let text = json!({
            "name": "m", "target": "//demo:m.shape", "types": types
        })
        .to_string();
        load_module(&text, &[]).unwrap()
    }

    #[test]
    fn field_order_and_thrift_ids_are_preserved() {
        let m = load(json!({
            "t": {
                "fields": {"zulu": "str", "alpha": {"type": "int", "default": 3}},
                "thrift": {"1": "zulu", "2": "alpha"}
            }
        }));
        let module = extract_module(&m).unwrap();
        let s = match module.get("t").unwrap() {
            ComplexIr::Struct(s) => s,
            _ => panic!(),
        };
        let names: Vec<&String> = s.fields.keys().collect();
        assert_eq!(names, ["zulu", "alpha"]);
        assert_eq!(s.fields["zulu"].thrift_id, Some(1));
        assert_eq!(s.fields["alpha"].thrift_id, Some(2));
        assert_eq!(s.fields["alpha"].default, Some(json!(3)));
        assert!(s.wire_enabled());
    }

    #[test]
    fn thrift_mapping_must_cover_every_field() {
        let m = load(json!({
            "t": {"fields": {"a": "int", "b": "int"}, "thrift": {"1": "a"}}
        }));
        let err = extract_module(&m).unwrap_err();
        assert!(err.to_string().contains("is missing field 'b'"), "{err}");
    }

    #[test]
    fn thrift_mapping_rejects_unknown_and_duplicate_fields() {
        let m = load(json!({
            "t": {"fields": {"a": "int"}, "thrift": {"1": "a", "2": "ghost"}}
        }));
        let err = extract_module(&m).unwrap_err();
        assert!(err.to_string().contains("unknown field 'ghost'"), "{err}");

        let m = load(json!({
            "t": {"fields": {"a": "int", "b": "int"}, "thrift": {"1": "a", "2": "a"}}
        }));
        let err = extract_module(&m).unwrap_err();
        assert!(
            err.to_string().contains("maps field 'a' more than once"),
            "{err}"
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let decl = json!({
            "t": {"fields": {
                "color": {"enum": ["red", "blue"]},
                "pos": {"type": {"shape": {"fields": {"x": "int"}}}, "optional": true}
            }}
        });
        let a = extract_module(&load(decl.clone())).unwrap();
        let b = extract_module(&load(decl)).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn anonymous_complexes_are_hoisted_with_path_names() {
        let m = load(json!({
            "t": {"fields": {
                "color": {"enum": ["red", "blue"]},
                "tags": {"list": {"enum": ["a", "b"]}}
            }}
        }));
        let module = extract_module(&m).unwrap();
        let names: Vec<&String> = module.types.keys().collect();
        // hoisted children come before their parent
        assert_eq!(names, ["t_color", "t_tags_item", "t"]);
        let s = match module.get("t").unwrap() {
            ComplexIr::Struct(s) => s,
            _ => panic!(),
        };
        assert_eq!(s.fields["color"].ty, IrType::Named("t_color".to_string()));
    }

    #[test]
    fn synthesized_name_collision_is_fatal() {
        let m = load(json!({
            "t_color": {"enum": ["x"]},
            "t": {"fields": {"color": {"enum": ["red"]}}}
        }));
        let err = extract_module(&m).unwrap_err();
        assert!(err.to_string().contains("collides"), "{err}");
    }

    #[test]
    fn target_in_default_aborts_extraction() {
        let m = load(json!({
            "t": {"fields": {
                "loc": {"type": "target", "default": "//demo:artifact"}
            }}
        }));
        let err = extract_module(&m).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("default for 't.loc'"), "{msg}");
        assert!(msg.contains("cannot safely be serialized"), "{msg}");
    }

    #[test]
    fn optional_without_default_gets_null_default() {
        let m = load(json!({
            "t": {"fields": {"note": {"type": "str", "optional": true}}}
        }));
        let module = extract_module(&m).unwrap();
        let s = match module.get("t").unwrap() {
            ComplexIr::Struct(s) => s,
            _ => panic!(),
        };
        assert_eq!(s.fields["note"].default, Some(serde_json::Value::Null));
        assert!(!s.fields["note"].required);
        assert!(!s.wire_enabled());
    }

    #[test]
    fn instance_default_canonicalizes_to_object() {
        let m = load(json!({
            "inner_t": {"fields": {"flag": "bool", "n": {"type": "int", "default": 1}}},
            "outer_t": {"fields": {
                "nested": {"type": "inner_t", "default": {"flag": true}}
            }}
        }));
        let module = extract_module(&m).unwrap();
        let s = match module.get("outer_t").unwrap() {
            ComplexIr::Struct(s) => s,
            _ => panic!(),
        };
        // defaults inside the instance are filled and serialized in
        // declaration order
        assert_eq!(
            s.fields["nested"].default,
            Some(json!({"flag": true, "n": 1}))
        );
    }
}
