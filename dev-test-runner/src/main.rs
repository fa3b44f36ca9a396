//! End-to-end smoke run: declare → construct → serialize → extract → render.
//!
//! Everything printed here goes through the same code paths the CLI uses;
//! this exists to eyeball the whole pipeline on one realistic module.

use shapegen::codegen::{Backend, Renderer};
use shapegen::{decl, extract, schema};
use shapegen::{to_plain, InstanceBuilder, ShapeRegistry, TargetPolicy, Ty, Value};
use shapegen::{field, list, union};

fn demo_declaration() -> String {
    serde_json::json!({
        "name": "characters",
        "target": "//demo/shapes:characters.shape",
        "types": {
            "color_t": {"enum": ["red", "green", "blue"]},
            "friend_t": {
                "fields": {"name": "str"},
                "thrift": {"1": "name"}
            },
            "lightsaber_t": {
                "fields": {
                    "color": {"type": "color_t", "default": "green"},
                    "source": {"type": "target", "optional": true}
                },
                "thrift": {"1": "color", "2": "source"}
            },
            "character_t": {
                "fields": {
                    "name": "str",
                    "appears_in": {"list": "int"},
                    "friends": {"type": {"list": "friend_t"}, "default": []},
                    "weapon": {"type": {"union": ["lightsaber_t", "str"]}, "optional": true},
                    "personnel_file": {"type": "path", "optional": true}
                },
                "thrift": {
                    "1": "name", "2": "appears_in", "3": "friends",
                    "4": "weapon", "5": "personnel_file"
                }
            }
        }
    })
    .to_string()
}

fn run_api_surface() {
    // the same shapes the declaration file describes, built through the
    // programmatic declaration surface
    let mut reg = ShapeRegistry::new();
    let friend = reg
        .shape_named("friend_t", vec![("name", field(Ty::Str))])
        .expect("friend_t declares");
    let character = reg
        .shape_named(
            "character_t",
            vec![
                ("name", field(Ty::Str)),
                ("appears_in", field(list(Ty::Int))),
                (
                    "friends",
                    field(list(Ty::Shape(friend))).with_default(Value::List(vec![])),
                ),
                (
                    "weapon",
                    field(union(vec![Ty::Target, Ty::Str]).expect("union declares")).optional(),
                ),
            ],
        )
        .expect("character_t declares");

    let han = InstanceBuilder::new(friend)
        .set("name", "Han Solo")
        .build(&reg)
        .expect("han builds");
    let luke = InstanceBuilder::new(character)
        .set("name", "Luke Skywalker")
        .set("appears_in", vec![4i64, 5, 6])
        .set("friends", Value::List(vec![Value::Instance(han)]))
        .set("weapon", "//demo:luke-lightsaber")
        .build(&reg)
        .expect("luke builds");

    // a target is reachable through the union, so the fail policy must trip
    let refused = to_plain(&reg, &luke, TargetPolicy::Fail);
    eprintln!("fail policy says: {}", refused.unwrap_err());

    let plain = to_plain(&reg, &luke, TargetPolicy::Resolve).expect("resolve serializes");
    println!("{}", serde_json::to_string_pretty(&plain).expect("plain is json"));
}

fn main() {
    run_api_surface();

    let module = decl::load_module(&demo_declaration(), &[]).expect("declaration loads");
    let ir = extract::extract_module(&module).expect("extraction succeeds");
    println!("{}", serde_json::to_string_pretty(&ir).expect("ir is json"));

    for backend in [Backend::Rust, Backend::Python] {
        let renderer = Renderer::new(backend, None).expect("templates parse");
        println!("{}", renderer.render_module(&ir).expect("module renders"));
    }

    let doc = schema::schema_for_module(&ir);
    println!("{}", serde_json::to_string_pretty(&doc).expect("schema is json"));
}
