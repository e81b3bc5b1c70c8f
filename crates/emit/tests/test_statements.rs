//! Statement Lowering Tests
//!
//! Try/catch/finally return propagation, using, foreach/continue, switch
//! dispatch with goto case, and the classic-dialect fallbacks.

use sharplua_emit::{compile_unit, EmitError, RenderConfig, TransformOptions};
use sharplua_semantic::build::{self, ModelBuilder};
use sharplua_semantic::decl::{MemberDecl, MethodDecl, TypeDecl, TypeMember};
use sharplua_semantic::expr::{Expr, InvocationExpr, MemberExpr};
use sharplua_semantic::stmt::{
    BlockStmt, CatchClause, ForEachStmt, GotoStmt, GotoTarget, IfStmt, Stmt, SwitchLabel,
    SwitchSection, SwitchStmt, TryStmt, UsingResource, UsingStmt,
};
use sharplua_semantic::symbol::MethodInfo;
use sharplua_semantic::types::{ConstValue, SpecialType, TypeRef};
use sharplua_semantic::{CompilationUnit, MetadataIndex, SymbolArena, SymbolId};
use text_size::TextRange;

const INT: TypeRef = TypeRef::Special(SpecialType::Int32);
const VOID: TypeRef = TypeRef::Special(SpecialType::Void);
const BOOL: TypeRef = TypeRef::Special(SpecialType::Bool);

struct Fixture {
    b: ModelBuilder,
    class: SymbolId,
}

impl Fixture {
    fn new() -> Self {
        let mut b = ModelBuilder::new();
        let class = b.class("C", None);
        Fixture { b, class }
    }

    /// A static helper on a metadata type, callable without declarations.
    fn helper(&mut self, name: &str, ret: TypeRef) -> SymbolId {
        let util = self.b.class("Util", None);
        self.b.arena.get_mut(util).from_metadata = true;
        let m = self.b.static_method(name, util, MethodInfo::new(ret));
        self.b.arena.get_mut(m).from_metadata = true;
        m
    }

    fn compile(self, method: SymbolId, body: Vec<Stmt>) -> String {
        self.compile_with(method, body, TransformOptions::default())
    }

    fn compile_with(
        self,
        method: SymbolId,
        body: Vec<Stmt>,
        options: TransformOptions,
    ) -> String {
        self.try_compile(method, body, options).unwrap()
    }

    fn try_compile(
        self,
        method: SymbolId,
        body: Vec<Stmt>,
        options: TransformOptions,
    ) -> Result<String, EmitError> {
        let class = self.class;
        let arena = self.b.finish();
        let mut unit = CompilationUnit::new("Test.cs");
        unit.members.push(MemberDecl::Type(TypeDecl {
            symbol: class,
            doc: None,
            attributes: Vec::new(),
            members: vec![TypeMember::Method(MethodDecl {
                symbol: method,
                body: Some(build::block(body)),
                doc: None,
                span: TextRange::default(),
            })],
            span: TextRange::default(),
        }));
        compile_unit(
            &unit,
            &arena,
            &MetadataIndex::new(),
            options,
            RenderConfig::default(),
        )
    }
}

fn call(method: SymbolId, args: Vec<Expr>, ty: TypeRef) -> Expr {
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
fn try_with_returns_propagates_through_the_call_site() {
    let mut fx = Fixture::new();
    let f = fx.helper("f", INT);
    let g = fx.helper("g", VOID);
    let ioex = fx.b.class("IOException", None);
    fx.b.arena.get_mut(ioex).from_metadata = true;
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(INT));
    let e_binding = fx.b.local(m, "ex", TypeRef::named(ioex));

    // try { return f(); } catch (IOException ex) { return 0; }
    // finally { g(); }
    let body = vec![Stmt::Try(TryStmt {
        block: build::block(vec![build::ret(Some(call(f, Vec::new(), INT)))]),
        catches: vec![CatchClause {
            ty: Some(TypeRef::named(ioex)),
            binding: Some(e_binding),
            filter: None,
            body: build::block(vec![build::ret(Some(build::int(0)))]),
            span: TextRange::default(),
        }],
        finally: Some(build::block(vec![build::expr_stmt(call(
            g,
            Vec::new(),
            VOID,
        ))])),
        span: TextRange::default(),
    })];

    let out = fx.compile(m, body);
    assert!(out.contains("local ok, v = System.try(function()"), "{}", out);
    assert!(out.contains("return true, Util.f()"), "{}", out);
    assert!(out.contains("local ex = e"), "{}", out);
    assert!(out.contains("if System.is(e, IOException) then"), "{}", out);
    assert!(out.contains("return true, 0"), "{}", out);
    // No unconditional catch: the implicit rethrow arm.
    assert!(out.contains("return true, e"), "{}", out);
    assert!(out.contains("Util.g()"), "{}", out);
    assert!(out.contains("if ok then return v end"), "{}", out);
}

#[test]
fn try_without_returns_stays_a_plain_call() {
    let mut fx = Fixture::new();
    let f = fx.helper("f", VOID);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));

    let body = vec![Stmt::Try(TryStmt {
        block: build::block(vec![build::expr_stmt(call(f, Vec::new(), VOID))]),
        catches: Vec::new(),
        finally: Some(BlockStmt::default()),
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("System.try(function()"), "{}", out);
    assert!(!out.contains("local ok"), "{}", out);
    // No catch clauses: nil placeholder before the finally closure.
    assert!(out.contains("end, nil, function()"), "{}", out);
}

#[test]
fn using_participates_in_return_propagation() {
    let mut fx = Fixture::new();
    let open = fx.helper("open", INT);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(INT));
    let r = fx.b.local(m, "r", INT);

    let body = vec![Stmt::Using(UsingStmt {
        resources: vec![UsingResource {
            symbol: Some(r),
            init: call(open, Vec::new(), INT),
        }],
        body: build::block(vec![build::ret(Some(build::ident(r, INT)))]),
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(
        out.contains("local ok, v = System.using(Util.open(), function(r)"),
        "{}",
        out
    );
    assert!(out.contains("return true, r"), "{}", out);
    assert!(out.contains("if ok then return v end"), "{}", out);
}

#[test]
fn multiple_resources_use_using_x() {
    let mut fx = Fixture::new();
    let open = fx.helper("open", INT);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let a = fx.b.local(m, "a", INT);
    let b2 = fx.b.local(m, "b", INT);

    let body = vec![Stmt::Using(UsingStmt {
        resources: vec![
            UsingResource {
                symbol: Some(a),
                init: call(open, Vec::new(), INT),
            },
            UsingResource {
                symbol: Some(b2),
                init: call(open, Vec::new(), INT),
            },
        ],
        body: BlockStmt::default(),
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("System.usingX(function(a, b)"), "{}", out);
    assert!(out.contains("end, Util.open(), Util.open())"), "{}", out);
}

#[test]
fn foreach_with_continue_uses_each_and_the_label() {
    let mut fx = Fixture::new();
    let p = fx.helper("p", BOOL);
    let use_fn = fx.helper("consume", VOID);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let xs = fx.b.param(m, "xs", TypeRef::array(INT));
    let x = fx.b.local(m, "x", INT);

    // foreach (var x in xs) { if (p(x)) continue; consume(x); }
    let body = vec![Stmt::ForEach(ForEachStmt {
        symbol: x,
        collection: build::ident(xs, TypeRef::array(INT)),
        body: build::block(vec![
            Stmt::If(IfStmt {
                condition: call(p, vec![build::ident(x, INT)], BOOL),
                then_branch: build::block(vec![Stmt::Continue(
                    sharplua_semantic::stmt::ContinueStmt {
                        span: TextRange::default(),
                    },
                )]),
                else_branch: None,
                span: TextRange::default(),
            }),
            build::expr_stmt(call(use_fn, vec![build::ident(x, INT)], VOID)),
        ]),
        numeric: None,
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(
        out.contains("for _, x in System.each(xs) do"),
        "{}",
        out
    );
    assert!(out.contains("goto continue"), "{}", out);
    assert!(out.contains("::continue::"), "{}", out);
}

#[test]
fn classic_continue_falls_back_to_the_flag_scheme() {
    let mut fx = Fixture::new();
    let p = fx.helper("p", BOOL);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let xs = fx.b.param(m, "xs", TypeRef::array(INT));
    let x = fx.b.local(m, "x", INT);

    let body = vec![Stmt::ForEach(ForEachStmt {
        symbol: x,
        collection: build::ident(xs, TypeRef::array(INT)),
        body: build::block(vec![Stmt::If(IfStmt {
            condition: call(p, vec![build::ident(x, INT)], BOOL),
            then_branch: build::block(vec![Stmt::Continue(
                sharplua_semantic::stmt::ContinueStmt {
                    span: TextRange::default(),
                },
            )]),
            else_branch: None,
            span: TextRange::default(),
        })]),
        numeric: None,
        span: TextRange::default(),
    })];
    let options = TransformOptions {
        classic: true,
        ..TransformOptions::default()
    };
    let out = fx.compile_with(m, body, options);
    assert!(out.contains("local __continue__"), "{}", out);
    assert!(out.contains("__continue__ = true"), "{}", out);
    assert!(out.contains("until true"), "{}", out);
    assert!(out.contains("if not __continue__ then"), "{}", out);
    assert!(!out.contains("goto"), "{}", out);
}

#[test]
fn switch_with_goto_case_re_enters_the_dispatch() {
    let mut fx = Fixture::new();
    let f = fx.helper("f", VOID);
    let g = fx.helper("g", VOID);
    let h = fx.helper("h", VOID);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let k = fx.b.param(m, "k", INT);

    // switch (k) { case 1: f(); goto case 2; case 2: g(); break;
    //              default: h(); break; }
    let body = vec![Stmt::Switch(SwitchStmt {
        selector: build::ident(k, INT),
        sections: vec![
            SwitchSection {
                labels: vec![SwitchLabel::Case(ConstValue::Int(1))],
                body: vec![
                    build::expr_stmt(call(f, Vec::new(), VOID)),
                    Stmt::Goto(GotoStmt {
                        target: GotoTarget::Case(ConstValue::Int(2)),
                        span: TextRange::default(),
                    }),
                ],
            },
            SwitchSection {
                labels: vec![SwitchLabel::Case(ConstValue::Int(2))],
                body: vec![
                    build::expr_stmt(call(g, Vec::new(), VOID)),
                    Stmt::Break(sharplua_semantic::stmt::BreakStmt {
                        span: TextRange::default(),
                    }),
                ],
            },
            SwitchSection {
                labels: vec![SwitchLabel::Default],
                body: vec![
                    build::expr_stmt(call(h, Vec::new(), VOID)),
                    Stmt::Break(sharplua_semantic::stmt::BreakStmt {
                        span: TextRange::default(),
                    }),
                ],
            },
        ],
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("local case1, redirect"), "{}", out);
    assert!(out.contains("::switch::"), "{}", out);
    assert!(out.contains("if not redirect and (k == 1) then"), "{}", out);
    assert!(out.contains("case1, redirect = true, true"), "{}", out);
    assert!(out.contains("goto switch"), "{}", out);
    assert!(
        out.contains("elseif case1 or not redirect and (k == 2) then"),
        "{}",
        out
    );
    assert!(out.contains("elseif not redirect then"), "{}", out);
}

#[test]
fn plain_switch_lowers_to_if_elseif_else() {
    let mut fx = Fixture::new();
    let f = fx.helper("f", VOID);
    let g = fx.helper("g", VOID);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let k = fx.b.param(m, "k", INT);

    let body = vec![Stmt::Switch(SwitchStmt {
        selector: build::ident(k, INT),
        sections: vec![
            SwitchSection {
                labels: vec![
                    SwitchLabel::Case(ConstValue::Int(1)),
                    SwitchLabel::Case(ConstValue::Int(2)),
                ],
                body: vec![
                    build::expr_stmt(call(f, Vec::new(), VOID)),
                    Stmt::Break(sharplua_semantic::stmt::BreakStmt {
                        span: TextRange::default(),
                    }),
                ],
            },
            SwitchSection {
                labels: vec![SwitchLabel::Default],
                body: vec![
                    build::expr_stmt(call(g, Vec::new(), VOID)),
                    Stmt::Break(sharplua_semantic::stmt::BreakStmt {
                        span: TextRange::default(),
                    }),
                ],
            },
        ],
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("if k == 1 or k == 2 then"), "{}", out);
    assert!(out.contains("else"), "{}", out);
    assert!(!out.contains("redirect"), "{}", out);
    assert!(!out.contains("goto"), "{}", out);
}

#[test]
fn goto_case_is_rejected_in_the_classic_dialect() {
    let mut fx = Fixture::new();
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let k = fx.b.param(m, "k", INT);

    let body = vec![Stmt::Switch(SwitchStmt {
        selector: build::ident(k, INT),
        sections: vec![SwitchSection {
            labels: vec![SwitchLabel::Case(ConstValue::Int(1))],
            body: vec![Stmt::Goto(GotoStmt {
                target: GotoTarget::Default,
                span: TextRange::default(),
            })],
        }],
        span: TextRange::default(),
    })];
    let options = TransformOptions {
        classic: true,
        ..TransformOptions::default()
    };
    let err = fx.try_compile(m, body, options).unwrap_err();
    assert!(matches!(err, EmitError::Unsupported { .. }));
}

#[test]
fn deconstructing_assignment_flattens_to_multi_assign() {
    let mut fx = Fixture::new();
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let a = fx.b.local(m, "a", INT);
    let b2 = fx.b.local(m, "b", INT);

    use sharplua_semantic::expr::{AssignmentExpr, TupleExpr};
    let body = vec![
        Stmt::LocalDecl(sharplua_semantic::stmt::LocalDeclStmt {
            declarators: vec![
                sharplua_semantic::stmt::LocalDeclarator {
                    symbol: a,
                    init: None,
                },
                sharplua_semantic::stmt::LocalDeclarator {
                    symbol: b2,
                    init: None,
                },
            ],
            span: TextRange::default(),
        }),
        build::expr_stmt(Expr::Assignment(AssignmentExpr {
            target: Box::new(Expr::Tuple(TupleExpr {
                elements: vec![build::ident(a, INT), build::ident(b2, INT)],
                span: TextRange::default(),
            })),
            op: None,
            value: Box::new(Expr::Tuple(TupleExpr {
                elements: vec![build::int(1), build::int(2)],
                span: TextRange::default(),
            })),
            ty: TypeRef::Tuple(vec![INT, INT]),
            span: TextRange::default(),
        })),
    ];
    let out = fx.compile(m, body);
    assert!(out.contains("a, b = 1, 2"), "{}", out);
}

#[test]
fn lock_emits_keyword_comment_and_do_block() {
    let mut fx = Fixture::new();
    let f = fx.helper("f", VOID);
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));
    let gate = fx.b.param(m, "gate", TypeRef::Special(SpecialType::Object));

    let body = vec![Stmt::Lock(sharplua_semantic::stmt::LockStmt {
        target: build::ident(gate, TypeRef::Special(SpecialType::Object)),
        body: build::block(vec![build::expr_stmt(call(f, Vec::new(), VOID))]),
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("-- lock(gate)"), "{}", out);
    assert!(out.contains("do\n"), "{}", out);
    assert!(out.contains("Util.f()"), "{}", out);
}

#[test]
fn bare_throw_rethrows_the_catch_parameter() {
    let mut fx = Fixture::new();
    let m = fx.b.static_method("M", fx.class, MethodInfo::new(VOID));

    let body = vec![Stmt::Try(TryStmt {
        block: BlockStmt::default(),
        catches: vec![CatchClause {
            ty: None,
            binding: None,
            filter: None,
            body: build::block(vec![Stmt::Throw(sharplua_semantic::stmt::ThrowStmt {
                value: None,
                span: TextRange::default(),
            })]),
            span: TextRange::default(),
        }],
        finally: None,
        span: TextRange::default(),
    })];
    let out = fx.compile(m, body);
    assert!(out.contains("System.throw(e)"), "{}", out);
}
