//! Declaration Lowering Tests
//!
//! Constructor dispatch, field-like vs accessor-backed properties, enums,
//! iterator wrapping and attribute-tag handling.

use sharplua_emit::{compile_unit, RenderConfig, TransformOptions};
use sharplua_semantic::build::{self, ModelBuilder};
use sharplua_semantic::decl::{
    AccessorDecl, CtorDecl, CtorInitKind, CtorInitializer, DocComment, FieldDecl, MemberDecl,
    MethodDecl, NamespaceDecl, PropertyDecl, TypeDecl, TypeMember,
};
use sharplua_semantic::stmt::Stmt;
use sharplua_semantic::symbol::{MethodInfo, ParamMode, PropertyInfo, TypeInfo, TypeKind};
use sharplua_semantic::types::{ConstValue, SpecialType, TypeRef};
use sharplua_semantic::{CompilationUnit, MetadataIndex, SymbolArena, SymbolId};
use text_size::TextRange;

const INT: TypeRef = TypeRef::Special(SpecialType::Int32);
const VOID: TypeRef = TypeRef::Special(SpecialType::Void);

fn type_decl(symbol: SymbolId, members: Vec<TypeMember>) -> TypeDecl {
    TypeDecl {
        symbol,
        doc: None,
        attributes: Vec::new(),
        members,
        span: TextRange::default(),
    }
}

fn compile_types(arena: &SymbolArena, decls: Vec<TypeDecl>) -> String {
    let mut unit = CompilationUnit::new("Test.cs");
    for decl in decls {
        unit.members.push(MemberDecl::Type(decl));
    }
    compile_unit(
        &unit,
        arena,
        &MetadataIndex::new(),
        TransformOptions::default(),
        RenderConfig::default(),
    )
    .unwrap()
}

fn ctor_decl(symbol: SymbolId, initializer: Option<CtorInitializer>) -> TypeMember {
    TypeMember::Ctor(CtorDecl {
        symbol,
        initializer,
        body: Default::default(),
        doc: None,
        span: TextRange::default(),
    })
}

#[test]
fn constructors_index_one_based_and_chain_correctly() {
    let mut b = ModelBuilder::new();
    let base = b.type_with(
        "B",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            ctors: 1,
            ..TypeInfo::default()
        },
    );
    let mut info = MethodInfo::new(VOID);
    info.ctor_index = 1;
    let b_ctor = b.method("ctor", base, info);
    b.param(b_ctor, "x", INT);

    let derived = b.type_with(
        "A",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            base: Some(TypeRef::named(base)),
            ctors: 2,
            ..TypeInfo::default()
        },
    );
    let mut info = MethodInfo::new(VOID);
    info.ctor_index = 1;
    let a_ctor1 = b.method("ctor", derived, info);
    let x = b.param(a_ctor1, "x", INT);
    let mut info = MethodInfo::new(VOID);
    info.ctor_index = 2;
    let a_ctor2 = b.method("ctor", derived, info);
    let arena = b.finish();

    // class A : B { public A(int x) : base(x) {} public A() : this(0) {} }
    let decls = vec![
        type_decl(base, vec![ctor_decl(b_ctor, None)]),
        type_decl(
            derived,
            vec![
                ctor_decl(
                    a_ctor1,
                    Some(CtorInitializer {
                        kind: CtorInitKind::Base,
                        ctor: b_ctor,
                        args: vec![build::ident(x, INT)],
                        span: TextRange::default(),
                    }),
                ),
                ctor_decl(
                    a_ctor2,
                    Some(CtorInitializer {
                        kind: CtorInitKind::This,
                        ctor: a_ctor1,
                        args: vec![build::int(0)],
                        span: TextRange::default(),
                    }),
                ),
            ],
        ),
    ];
    let out = compile_types(&arena, decls);
    assert!(out.contains("__inherits__ = function(global) return { B } end"), "{}", out);
    assert!(out.contains("__ctor__ = {"), "{}", out);
    // Single base constructor: unindexed call.
    assert!(out.contains("B.__ctor__(this, x)"), "{}", out);
    // Sideways chain to the first of two overloads: indexed call.
    assert!(out.contains("A.__ctor__[1](this, 0)"), "{}", out);
}

#[test]
fn implicit_base_call_is_synthesised() {
    let mut b = ModelBuilder::new();
    let base = b.type_with(
        "B",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            ctors: 1,
            ..TypeInfo::default()
        },
    );
    let mut info = MethodInfo::new(VOID);
    info.ctor_index = 1;
    let b_ctor = b.method("ctor", base, info);

    let derived = b.type_with(
        "A",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            base: Some(TypeRef::named(base)),
            ctors: 1,
            ..TypeInfo::default()
        },
    );
    let mut info = MethodInfo::new(VOID);
    info.ctor_index = 1;
    let a_ctor = b.method("ctor", derived, info);
    let arena = b.finish();

    let decls = vec![
        type_decl(base, vec![ctor_decl(b_ctor, None)]),
        type_decl(derived, vec![ctor_decl(a_ctor, None)]),
    ];
    let out = compile_types(&arena, decls);
    assert!(out.contains("B.__ctor__(this)"), "{}", out);
}

#[test]
fn auto_properties_become_fields_unless_forced() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let plain = b.property("Count", class, PropertyInfo::auto(INT));
    let forced = b.property("Size", class, PropertyInfo::auto(INT));
    let arena = b.finish();

    let members = vec![
        TypeMember::Property(PropertyDecl {
            symbol: plain,
            getter: Some(AccessorDecl {
                body: None,
                value_param: None,
                span: TextRange::default(),
            }),
            setter: Some(AccessorDecl {
                body: None,
                value_param: None,
                span: TextRange::default(),
            }),
            init: None,
            doc: None,
            span: TextRange::default(),
        }),
        TypeMember::Property(PropertyDecl {
            symbol: forced,
            getter: Some(AccessorDecl {
                body: None,
                value_param: None,
                span: TextRange::default(),
            }),
            setter: Some(AccessorDecl {
                body: None,
                value_param: None,
                span: TextRange::default(),
            }),
            init: None,
            doc: Some(DocComment::new(vec![
                "Buffer size.".to_string(),
                "@CSharpLua.NoField".to_string(),
            ])),
            span: TextRange::default(),
        }),
    ];
    let out = compile_types(&arena, vec![type_decl(class, members)]);
    // Field-like: a plain slot with its zero value.
    assert!(out.contains("Count = 0"), "{}", out);
    assert!(!out.contains("get_Count"), "{}", out);
    // Tagged no-field: accessor pair over the backing slot.
    assert!(out.contains("get_Size = function(this)"), "{}", out);
    assert!(out.contains("return this.Size"), "{}", out);
    assert!(out.contains("set_Size = function(this, value)"), "{}", out);
    assert!(out.contains("this.Size = value"), "{}", out);
}

#[test]
fn enums_inline_member_values() {
    let mut b = ModelBuilder::new();
    let color = b.enum_type("Color", None);
    let red = b.const_field("Red", color, INT, ConstValue::Int(0));
    let green = b.const_field("Green", color, INT, ConstValue::Int(1));
    let arena = b.finish();

    let members = vec![
        TypeMember::Field(FieldDecl {
            symbol: red,
            init: None,
            doc: None,
            span: TextRange::default(),
        }),
        TypeMember::Field(FieldDecl {
            symbol: green,
            init: None,
            doc: None,
            span: TextRange::default(),
        }),
    ];
    let out = compile_types(&arena, vec![type_decl(color, members)]);
    assert!(out.contains("namespace.enum(\"Color\""), "{}", out);
    assert!(out.contains("Red = 0"), "{}", out);
    assert!(out.contains("Green = 1"), "{}", out);
}

#[test]
fn iterator_methods_wrap_their_bodies() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let mut info = MethodInfo::new(TypeRef::Special(SpecialType::Object));
    info.is_iterator = true;
    let m = b.static_method("Walk", class, info);
    let arena = b.finish();

    let body = vec![
        Stmt::YieldReturn(sharplua_semantic::stmt::YieldReturnStmt {
            value: build::int(1),
            span: TextRange::default(),
        }),
        Stmt::YieldBreak(sharplua_semantic::stmt::YieldBreakStmt {
            span: TextRange::default(),
        }),
    ];
    let members = vec![TypeMember::Method(MethodDecl {
        symbol: m,
        body: Some(build::block(body)),
        doc: None,
        span: TextRange::default(),
    })];
    let out = compile_types(&arena, vec![type_decl(class, members)]);
    assert!(
        out.contains("return System.yieldIteratorEnumerable(function()"),
        "{}",
        out
    );
    assert!(out.contains("System.yieldReturn(1)"), "{}", out);
}

#[test]
fn operators_take_stable_names() {
    let mut b = ModelBuilder::new();
    let class = b.class("Vec", None);
    let mut info = MethodInfo::new(TypeRef::named(class));
    info.operator = Some(sharplua_semantic::OperatorKind::Addition);
    let op = b.static_method("Addition", class, info);
    b.param(op, "left", TypeRef::named(class));
    b.param(op, "right", TypeRef::named(class));
    let arena = b.finish();

    let members = vec![TypeMember::Method(MethodDecl {
        symbol: op,
        body: Some(Default::default()),
        doc: None,
        span: TextRange::default(),
    })];
    let out = compile_types(&arena, vec![type_decl(class, members)]);
    assert!(out.contains("op_Addition = function(left, right)"), "{}", out);
}

#[test]
fn ignored_members_are_skipped() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let kept = b.static_method("Kept", class, MethodInfo::new(VOID));
    let dropped = b.static_method("Dropped", class, MethodInfo::new(VOID));
    let arena = b.finish();

    let members = vec![
        TypeMember::Method(MethodDecl {
            symbol: kept,
            body: Some(Default::default()),
            doc: None,
            span: TextRange::default(),
        }),
        TypeMember::Method(MethodDecl {
            symbol: dropped,
            body: Some(Default::default()),
            doc: Some(DocComment::new(vec!["@CSharpLua.Ignore".to_string()])),
            span: TextRange::default(),
        }),
    ];
    let out = compile_types(&arena, vec![type_decl(class, members)]);
    assert!(out.contains("Kept = function"), "{}", out);
    assert!(!out.contains("Dropped"), "{}", out);
}

#[test]
fn ref_out_methods_return_their_parameters() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let m = b.static_method("TryParse", class, MethodInfo::new(VOID));
    b.param_with(m, "result", INT, ParamMode::Out, None);
    let arena = b.finish();

    let members = vec![TypeMember::Method(MethodDecl {
        symbol: m,
        body: Some(Default::default()),
        doc: None,
        span: TextRange::default(),
    })];
    let out = compile_types(&arena, vec![type_decl(class, members)]);
    // A fall-off-the-end ref/out method reports parameter values.
    assert!(out.contains("TryParse = function(result)"), "{}", out);
    assert!(out.contains("return result"), "{}", out);
}

#[test]
fn namespaces_nest_through_the_runtime_helper() {
    let mut b = ModelBuilder::new();
    let outer = b.namespace("Outer", None);
    let inner = b.namespace("Inner", Some(outer));
    let class = b.class("C", Some(inner));
    let arena = b.finish();

    let mut unit = CompilationUnit::new("Test.cs");
    unit.members.push(MemberDecl::Namespace(NamespaceDecl {
        symbol: outer,
        members: vec![MemberDecl::Namespace(NamespaceDecl {
            symbol: inner,
            members: vec![MemberDecl::Type(type_decl(class, Vec::new()))],
            span: TextRange::default(),
        })],
        span: TextRange::default(),
    }));
    let out = compile_unit(
        &unit,
        &arena,
        &MetadataIndex::new(),
        TransformOptions::default(),
        RenderConfig::default(),
    )
    .unwrap();
    assert!(out.contains("System.namespace(\"Outer\", function(namespace)"), "{}", out);
    assert!(
        out.contains("namespace.namespace(\"Inner\", function(namespace)"),
        "{}",
        out
    );
    assert!(out.contains("namespace.class(\"C\""), "{}", out);
}

#[test]
fn nested_types_render_dotted_after_their_parent() {
    let mut b = ModelBuilder::new();
    let outer = b.class("Outer", None);
    let inner = b.class("Inner", Some(outer));
    let arena = b.finish();

    let decl = TypeDecl {
        symbol: outer,
        doc: None,
        attributes: Vec::new(),
        members: vec![TypeMember::Nested(type_decl(inner, Vec::new()))],
        span: TextRange::default(),
    };
    let out = compile_types(&arena, vec![decl]);
    assert!(out.contains("namespace.class(\"Outer\""), "{}", out);
    assert!(out.contains("namespace.class(\"Outer.Inner\""), "{}", out);
}
