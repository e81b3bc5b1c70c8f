//! Semantic Model Tests
//!
//! The tree must survive the front-end process boundary: serde round-trips
//! and the arena/oracle contracts.

use sharplua_semantic::build::{self, ModelBuilder};
use sharplua_semantic::decl::{MemberDecl, MethodDecl, TypeDecl, TypeMember};
use sharplua_semantic::symbol::MethodInfo;
use sharplua_semantic::types::{SpecialType, TypeRef};
use sharplua_semantic::{CompilationUnit, LineIndex, MetadataIndex, MetadataProvider};
use text_size::TextRange;

#[test]
fn units_round_trip_through_json() {
    let mut b = ModelBuilder::new();
    let ns = b.namespace("App", None);
    let class = b.class("Greeter", Some(ns));
    let m = b.static_method(
        "Greet",
        class,
        MethodInfo::new(TypeRef::Special(SpecialType::Void)),
    );
    let name = b.param(m, "name", TypeRef::Special(SpecialType::String));
    let arena = b.finish();

    let mut unit = CompilationUnit::new("Greeter.cs");
    unit.line_index = LineIndex::from_source("class Greeter\n{\n}\n");
    unit.members.push(MemberDecl::Type(TypeDecl {
        symbol: class,
        doc: None,
        attributes: Vec::new(),
        members: vec![TypeMember::Method(MethodDecl {
            symbol: m,
            body: Some(build::block(vec![build::expr_stmt(build::ident(
                name,
                TypeRef::Special(SpecialType::String),
            ))])),
            doc: None,
            span: TextRange::default(),
        })],
        span: TextRange::default(),
    }));

    let arena_json = serde_json::to_string(&arena).unwrap();
    let unit_json = serde_json::to_string(&unit).unwrap();
    let arena2: sharplua_semantic::SymbolArena = serde_json::from_str(&arena_json).unwrap();
    let unit2: CompilationUnit = serde_json::from_str(&unit_json).unwrap();

    assert_eq!(arena2.len(), arena.len());
    assert_eq!(arena2.get(class).name, "Greeter");
    assert_eq!(unit2.file, "Greeter.cs");
    assert_eq!(unit2.members.len(), 1);
}

#[test]
fn metadata_oracle_is_keyed_by_qualified_name() {
    let mut b = ModelBuilder::new();
    let ns = b.namespace("Sys", None);
    let class = b.class("Math", Some(ns));
    let m = b.static_method(
        "Abs",
        class,
        MethodInfo::new(TypeRef::Special(SpecialType::Int32)),
    );
    let arena = b.finish();

    let mut index = MetadataIndex::new();
    index.add_template("Sys.Math.Abs", "math.abs({0})");
    index.mark_ignored("Sys.Math.Obsolete");

    assert_eq!(index.code_template(&arena, m), Some("math.abs({0})"));
    assert!(!index.is_ignored(&arena, m));
    assert!(!index.wants_no_field(&arena, m));
}

#[test]
fn ctor_counts_travel_with_type_info() {
    let mut b = ModelBuilder::new();
    let class = b.type_with(
        "A",
        None,
        sharplua_semantic::TypeInfo {
            ctors: 3,
            ..Default::default()
        },
    );
    let arena = b.finish();
    assert_eq!(arena.get(class).as_type().unwrap().ctors, 3);
}
