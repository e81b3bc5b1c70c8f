//! Expression Lowering Tests
//!
//! Conditional access, null coalescing, interpolation, tuples, object
//! creation and the other §-level expression rewrites, checked against the
//! rendered output of whole units.

use sharplua_emit::{compile_unit, RenderConfig, TransformOptions};
use sharplua_semantic::build::{self, ModelBuilder};
use sharplua_semantic::decl::{MemberDecl, MethodDecl, TypeDecl, TypeMember};
use sharplua_semantic::expr::{
    AccessLink, BinaryExpr, BinaryOp, ConditionalAccessExpr, Expr, InterpolatedExpr,
    InterpolationPart, InvocationExpr, IsExpr, LinkKind, MemberExpr, ObjectCreationExpr,
    TupleExpr,
};
use sharplua_semantic::stmt::{BlockStmt, IfStmt, LocalDeclStmt, LocalDeclarator, Stmt};
use sharplua_semantic::symbol::{MethodInfo, TypeInfo, TypeKind};
use sharplua_semantic::types::{ConstValue, SpecialType, TypeRef};
use sharplua_semantic::{CompilationUnit, MetadataIndex, SymbolArena, SymbolId};
use text_size::TextRange;

const INT: TypeRef = TypeRef::Special(SpecialType::Int32);
const VOID: TypeRef = TypeRef::Special(SpecialType::Void);
const STRING: TypeRef = TypeRef::Special(SpecialType::String);

fn method_decl(symbol: SymbolId, body: Vec<Stmt>) -> TypeMember {
    TypeMember::Method(MethodDecl {
        symbol,
        body: Some(build::block(body)),
        doc: None,
        span: TextRange::default(),
    })
}

fn unit_of(class: SymbolId, members: Vec<TypeMember>) -> CompilationUnit {
    let mut unit = CompilationUnit::new("Test.cs");
    unit.members.push(MemberDecl::Type(TypeDecl {
        symbol: class,
        doc: None,
        attributes: Vec::new(),
        members,
        span: TextRange::default(),
    }));
    unit
}

fn compile(arena: &SymbolArena, unit: &CompilationUnit) -> String {
    compile_unit(
        unit,
        arena,
        &MetadataIndex::new(),
        TransformOptions::default(),
        RenderConfig::default(),
    )
    .unwrap()
}

fn invoke(method: SymbolId, args: Vec<Expr>, ty: TypeRef) -> Expr {
    Expr::Invocation(InvocationExpr {
        callee: Box::new(Expr::Member(MemberExpr {
            target: None,
            member: method,
            ty: ty.clone(),
            span: TextRange::default(),
        })),
        args,
        method: Some(method),
        type_args: Vec::new(),
        ty,
        span: TextRange::default(),
    })
}

#[test]
fn conditional_access_with_coalesce_matches_the_sketch() {
    let mut b = ModelBuilder::new();
    let boxc = b.class("Box", None);
    b.arena.get_mut(boxc).from_metadata = true;
    let field = b.field("b", boxc, INT);
    b.arena.get_mut(field).from_metadata = true;

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let a = b.param(m, "a", TypeRef::named(boxc));
    let x = b.local(m, "x", INT);
    let arena = b.finish();

    // int x = a?.b ?? 0;
    let chain = Expr::ConditionalAccess(ConditionalAccessExpr {
        root: Box::new(build::ident(a, TypeRef::named(boxc))),
        links: vec![AccessLink {
            conditional: true,
            kind: LinkKind::Member { member: field },
            ty: TypeRef::nullable(INT),
        }],
        ty: TypeRef::nullable(INT),
        span: TextRange::default(),
    });
    let coalesce = Expr::Binary(BinaryExpr {
        op: BinaryOp::Coalesce,
        left: Box::new(chain),
        right: Box::new(build::int(0)),
        operator_method: None,
        ty: INT,
        span: TextRange::default(),
    });
    let body = vec![Stmt::LocalDecl(LocalDeclStmt {
        declarators: vec![LocalDeclarator {
            symbol: x,
            init: Some(coalesce),
        }],
        span: TextRange::default(),
    })];

    let unit = unit_of(class, vec![method_decl(m, body)]);
    let out = compile(&arena, &unit);
    assert!(out.contains("local t0 = a"), "{}", out);
    assert!(out.contains("if t0 ~= nil then"), "{}", out);
    assert!(out.contains("t0 = t0.b"), "{}", out);
    assert!(out.contains("local x = t0 or 0"), "{}", out);
}

#[test]
fn conditional_access_in_statement_position_discards_the_value() {
    let mut b = ModelBuilder::new();
    let widget = b.class("Widget", None);
    b.arena.get_mut(widget).from_metadata = true;
    let dispose = b.method("Dispose", widget, MethodInfo::new(VOID));
    b.arena.get_mut(dispose).from_metadata = true;

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let w = b.param(m, "w", TypeRef::named(widget));
    let arena = b.finish();

    // w?.Dispose();
    let chain = Expr::ConditionalAccess(ConditionalAccessExpr {
        root: Box::new(build::ident(w, TypeRef::named(widget))),
        links: vec![AccessLink {
            conditional: true,
            kind: LinkKind::Invoke {
                args: Vec::new(),
                method: Some(dispose),
            },
            ty: VOID,
        }],
        ty: VOID,
        span: TextRange::default(),
    });
    let unit = unit_of(class, vec![method_decl(m, vec![build::expr_stmt(chain)])]);
    let out = compile(&arena, &unit);
    assert!(out.contains("local t0 = w"), "{}", out);
    assert!(out.contains("t0:Dispose()"), "{}", out);
    // The trailing re-assignment is omitted in statement position.
    assert!(!out.contains("t0 = t0:Dispose()"), "{}", out);
}

#[test]
fn string_interpolation_lowers_to_format() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let name = b.param(m, "name", STRING);
    let s = b.local(m, "s", STRING);
    let arena = b.finish();

    // string s = $"hi {name}";
    let interpolated = Expr::Interpolated(InterpolatedExpr {
        parts: vec![
            InterpolationPart::Text("hi ".to_string()),
            InterpolationPart::Expr(build::ident(name, STRING)),
        ],
        span: TextRange::default(),
    });
    let body = vec![Stmt::LocalDecl(LocalDeclStmt {
        declarators: vec![LocalDeclarator {
            symbol: s,
            init: Some(interpolated),
        }],
        span: TextRange::default(),
    })];
    let unit = unit_of(class, vec![method_decl(m, body)]);
    let out = compile(&arena, &unit);
    assert!(out.contains("local s = (\"hi {0}\"):format(name)"), "{}", out);
}

#[test]
fn tuple_values_create_and_deconstruction_flattens() {
    let mut b = ModelBuilder::new();
    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let t = b.local(m, "t", TypeRef::Tuple(vec![INT, INT]));
    let arena = b.finish();

    // var t = (1, 2);
    let tuple = Expr::Tuple(TupleExpr {
        elements: vec![build::int(1), build::int(2)],
        span: TextRange::default(),
    });
    let body = vec![Stmt::LocalDecl(LocalDeclStmt {
        declarators: vec![LocalDeclarator {
            symbol: t,
            init: Some(tuple),
        }],
        span: TextRange::default(),
    })];
    let unit = unit_of(class, vec![method_decl(m, body)]);
    let out = compile(&arena, &unit);
    assert!(
        out.contains("local t = System.ValueTuple.create{ 1, 2 }"),
        "{}",
        out
    );
}

#[test]
fn object_creation_uses_the_frozen_ctor_selector() {
    let mut b = ModelBuilder::new();
    let point = b.type_with(
        "Point",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            ctors: 2,
            ..TypeInfo::default()
        },
    );
    let mut first = MethodInfo::new(VOID);
    first.ctor_index = 1;
    let ctor1 = b.method("ctor", point, first);
    let mut second = MethodInfo::new(VOID);
    second.ctor_index = 2;
    let ctor2 = b.method("ctor", point, second);
    b.param(ctor2, "x", INT);

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let p = b.local(m, "p", TypeRef::named(point));
    let q = b.local(m, "q", TypeRef::named(point));
    let arena = b.finish();

    let new_first = Expr::ObjectCreation(ObjectCreationExpr {
        ty: TypeRef::named(point),
        ctor: Some(ctor1),
        args: Vec::new(),
        initializer: None,
        span: TextRange::default(),
    });
    let new_second = Expr::ObjectCreation(ObjectCreationExpr {
        ty: TypeRef::named(point),
        ctor: Some(ctor2),
        args: vec![build::int(3)],
        initializer: None,
        span: TextRange::default(),
    });
    let body = vec![
        Stmt::LocalDecl(LocalDeclStmt {
            declarators: vec![LocalDeclarator {
                symbol: p,
                init: Some(new_first),
            }],
            span: TextRange::default(),
        }),
        Stmt::LocalDecl(LocalDeclStmt {
            declarators: vec![LocalDeclarator {
                symbol: q,
                init: Some(new_second),
            }],
            span: TextRange::default(),
        }),
    ];

    let unit = unit_of(class, vec![method_decl(m, body)]);
    let out = compile(&arena, &unit);
    // First overload calls the type table, later overloads go through the
    // runtime allocator with their 1-based index.
    assert!(out.contains("local p = Point()"), "{}", out);
    assert!(out.contains("local q = System.new(Point, 2, 3)"), "{}", out);
}

#[test]
fn trailing_arguments_equal_to_defaults_are_dropped() {
    let mut b = ModelBuilder::new();
    let util = b.class("Util", None);
    b.arena.get_mut(util).from_metadata = true;
    let f = b.static_method("Write", util, MethodInfo::new(VOID));
    b.arena.get_mut(f).from_metadata = true;
    b.param(f, "value", INT);
    b.param_with(
        f,
        "indent",
        INT,
        sharplua_semantic::ParamMode::Value,
        Some(ConstValue::Int(4)),
    );

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let arena = b.finish();

    let call = invoke(f, vec![build::int(7), build::int(4)], VOID);
    let unit = unit_of(class, vec![method_decl(m, vec![build::expr_stmt(call)])]);
    let out = compile(&arena, &unit);
    assert!(out.contains("Util.Write(7)"), "{}", out);
    assert!(!out.contains("Util.Write(7, 4)"), "{}", out);
}

#[test]
fn is_pattern_binds_and_folds_proven_tests() {
    let mut b = ModelBuilder::new();
    let animal = b.class("Animal", None);
    b.arena.get_mut(animal).from_metadata = true;
    let dog = b.type_with(
        "Dog",
        None,
        TypeInfo {
            kind: TypeKind::Class,
            base: Some(TypeRef::named(animal)),
            ..TypeInfo::default()
        },
    );
    b.arena.get_mut(dog).from_metadata = true;

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let o = b.param(m, "o", TypeRef::named(dog));
    let d = b.local(m, "d", TypeRef::named(animal));
    let arena = b.finish();

    // `o is Animal d` where o's static type is already a Dog: constant true.
    let is_expr = Expr::Is(IsExpr {
        operand: Box::new(build::ident(o, TypeRef::named(dog))),
        target: TypeRef::named(animal),
        binding: Some(d),
        span: TextRange::default(),
    });
    let body = vec![Stmt::If(IfStmt {
        condition: is_expr,
        then_branch: BlockStmt::default(),
        else_branch: None,
        span: TextRange::default(),
    })];
    let unit = unit_of(class, vec![method_decl(m, body)]);
    let out = compile(&arena, &unit);
    assert!(out.contains("local d = o"), "{}", out);
    assert!(out.contains("if true then"), "{}", out);
    assert!(!out.contains("System.is"), "{}", out);
}

#[test]
fn code_templates_override_the_default_translation() {
    let mut b = ModelBuilder::new();
    let console = b.class("Console", None);
    b.arena.get_mut(console).from_metadata = true;
    let write = b.static_method("WriteLine", console, MethodInfo::new(VOID));
    b.arena.get_mut(write).from_metadata = true;
    b.param(write, "value", STRING);

    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let arena = b.finish();

    let mut metadata = MetadataIndex::new();
    metadata.add_template("Console.WriteLine", "print({0})");

    let call = invoke(write, vec![build::string("hi")], VOID);
    let unit = unit_of(class, vec![method_decl(m, vec![build::expr_stmt(call)])]);
    let out = compile_unit(
        &unit,
        &arena,
        &metadata,
        TransformOptions::default(),
        RenderConfig::default(),
    )
    .unwrap();
    assert!(out.contains("print(\"hi\")"), "{}", out);
    assert!(!out.contains("Console.WriteLine"), "{}", out);
}

#[test]
fn typeof_on_an_enum_marks_it_for_export() {
    let mut b = ModelBuilder::new();
    let color = b.enum_type("Color", None);
    let class = b.class("C", None);
    let m = b.static_method("M", class, MethodInfo::new(VOID));
    let arena = b.finish();

    let expr = Expr::TypeOf(sharplua_semantic::expr::TypeOfExpr {
        target: TypeRef::named(color),
        span: TextRange::default(),
    });
    let unit = unit_of(class, vec![method_decl(m, vec![build::expr_stmt(expr)])]);
    let out = compile(&arena, &unit);
    assert!(out.contains("System.typeof(Color)"), "{}", out);
    assert!(out.contains("System.exportEnum(\"Color\")"), "{}", out);
}
