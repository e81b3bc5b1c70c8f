//! Pipeline Tests
//!
//! End-to-end driver runs over a temporary source tree.

use sharplua_cli::cli::Cli;
use sharplua_cli::pipeline::{self, PipelineError, UnitPayload};
use sharplua_semantic::build::{self, ModelBuilder};
use sharplua_semantic::decl::{MemberDecl, MethodDecl, TypeDecl, TypeMember};
use sharplua_semantic::symbol::MethodInfo;
use sharplua_semantic::types::{SpecialType, TypeRef};
use sharplua_semantic::CompilationUnit;
use std::fs;
use std::path::Path;
use text_size::TextRange;

fn sample_payload() -> UnitPayload {
    let mut b = ModelBuilder::new();
    let class = b.class("Greeter", None);
    let m = b.static_method(
        "Greet",
        class,
        MethodInfo::new(TypeRef::Special(SpecialType::Int32)),
    );
    let arena = b.finish();

    let mut unit = CompilationUnit::new("Greeter.cs");
    unit.members.push(MemberDecl::Type(TypeDecl {
        symbol: class,
        doc: None,
        attributes: Vec::new(),
        members: vec![TypeMember::Method(MethodDecl {
            symbol: m,
            body: Some(build::block(vec![build::ret(Some(build::int(42)))])),
            doc: None,
            span: TextRange::default(),
        })],
        span: TextRange::default(),
    }));
    UnitPayload { arena, unit }
}

fn cli_for(source: &Path, dest: &Path) -> Cli {
    Cli {
        source: source.to_path_buf(),
        dest: dest.to_path_buf(),
        libs: Vec::new(),
        meta: Vec::new(),
        csc: None,
        classic: false,
        indent: 2,
        semicolons: false,
        export_attributes: false,
    }
}

#[test]
fn compiles_a_tree_into_the_mirrored_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    let dest = dir.path().join("out");
    fs::create_dir_all(source.join("App")).unwrap();

    let payload = sample_payload();
    fs::write(
        source.join("App/Greeter.cs.json"),
        serde_json::to_string(&payload).unwrap(),
    )
    .unwrap();

    pipeline::run(&cli_for(&source, &dest)).unwrap();

    let lua = fs::read_to_string(dest.join("App/Greeter.lua")).unwrap();
    assert!(lua.contains("local System = System"), "{}", lua);
    assert!(lua.contains("namespace.class(\"Greeter\""), "{}", lua);
    assert!(lua.contains("return 42"), "{}", lua);

    // Determinism: a second run reproduces the same bytes.
    pipeline::run(&cli_for(&source, &dest)).unwrap();
    assert_eq!(lua, fs::read_to_string(dest.join("App/Greeter.lua")).unwrap());
}

#[test]
fn empty_source_trees_are_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    let dest = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();

    let err = pipeline::run(&cli_for(&source, &dest)).unwrap_err();
    assert!(matches!(err, PipelineError::NoInput(_)));
}

#[test]
fn malformed_trees_fail_with_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    let dest = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("Broken.cs.json"), "not json").unwrap();

    let err = pipeline::run(&cli_for(&source, &dest)).unwrap_err();
    match err {
        PipelineError::Decode { path, .. } => {
            assert!(path.ends_with("Broken.cs.json"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn metadata_files_feed_the_template_engine() {
    let dir = tempfile::tempdir().unwrap();
    let meta_path = dir.path().join("meta.json");
    fs::write(
        &meta_path,
        r#"{ "templates": { "Console.WriteLine": "print({0})" } }"#,
    )
    .unwrap();

    let index = pipeline::load_metadata(&[meta_path]).unwrap();
    assert!(!index.is_empty());
}
