//! Renderer Tests
//!
//! Determinism, indentation, blank-line coalescing, adapter expansion and
//! dialect gates of the Lua pretty printer.

use sharplua_emit::lua::stmt::IfStmt;
use sharplua_emit::lua::{
    ContinueKind, CtorAdapter, FunctionExpr, GotoCaseAdapter, LuaBinaryOp, LuaBlock, LuaChunk,
    LuaExpr, LuaStmt, LuaTypeDecl, ReturnWrap, TryAdapter, TypeDeclKind,
};
use sharplua_emit::{render, render_expr, RenderConfig};

fn chunk(statements: Vec<LuaStmt>) -> LuaChunk {
    LuaChunk { statements }
}

#[test]
fn rendering_is_deterministic() {
    let c = chunk(vec![
        LuaStmt::Local {
            names: vec!["x".to_string()],
            values: vec![LuaExpr::int(1)],
        },
        LuaStmt::Return(vec![LuaExpr::name("x")]),
    ]);
    let first = render(&c, RenderConfig::default());
    let second = render(&c, RenderConfig::default());
    assert_eq!(first, second);
    assert_eq!(first, "local x = 1\nreturn x\n");
}

#[test]
fn nested_blocks_indent_by_one_level() {
    let body = LuaBlock::new(vec![LuaStmt::Return(vec![LuaExpr::int(1)])]);
    let c = chunk(vec![LuaStmt::If(IfStmt::new(LuaExpr::name("a"), body))]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "if a then\n  return 1\nend\n"
    );

    let wide = RenderConfig {
        indent: 4,
        ..RenderConfig::default()
    };
    let body = LuaBlock::new(vec![LuaStmt::Return(vec![LuaExpr::int(1)])]);
    let c = chunk(vec![LuaStmt::If(IfStmt::new(LuaExpr::name("a"), body))]);
    assert_eq!(render(&c, wide), "if a then\n    return 1\nend\n");
}

#[test]
fn elseif_chain_renders_flat() {
    let mut stmt = IfStmt::new(
        LuaExpr::name("a"),
        LuaBlock::new(vec![LuaStmt::Return(vec![LuaExpr::int(1)])]),
    );
    stmt.elseifs.push((
        LuaExpr::name("b"),
        LuaBlock::new(vec![LuaStmt::Return(vec![LuaExpr::int(2)])]),
    ));
    stmt.else_block = Some(LuaBlock::new(vec![LuaStmt::Return(Vec::new())]));
    let c = chunk(vec![LuaStmt::If(stmt)]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "if a then\n  return 1\nelseif b then\n  return 2\nelse\n  return\nend\n"
    );
}

#[test]
fn blank_lines_coalesce_to_the_larger_run() {
    let c = chunk(vec![
        LuaStmt::Comment("first".to_string()),
        LuaStmt::BlankLines(1),
        LuaStmt::BlankLines(2),
        LuaStmt::Comment("second".to_string()),
    ]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "-- first\n\n\n-- second\n"
    );
}

#[test]
fn semicolon_policy_terminates_simple_statements() {
    let c = chunk(vec![
        LuaStmt::Local {
            names: vec!["x".to_string()],
            values: vec![LuaExpr::int(1)],
        },
        LuaStmt::Break,
    ]);
    let config = RenderConfig {
        semicolons: true,
        ..RenderConfig::default()
    };
    assert_eq!(render(&c, config), "local x = 1;\nbreak;\n");
}

#[test]
fn loops_render_their_lua_shapes() {
    let body = LuaBlock::new(vec![LuaStmt::Expr(LuaExpr::rt_call(
        "f",
        vec![LuaExpr::name("i")],
    ))]);
    let c = chunk(vec![LuaStmt::NumericFor {
        var: "i".to_string(),
        start: LuaExpr::int(1),
        limit: LuaExpr::int(10),
        step: None,
        body,
    }]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "for i = 1, 10 do\n  f(i)\nend\n"
    );

    let body = LuaBlock::new(vec![LuaStmt::Break]);
    let c = chunk(vec![LuaStmt::Repeat {
        body,
        until: LuaExpr::name("done"),
    }]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "repeat\n  break\nuntil done\n"
    );
}

#[test]
fn try_adapter_expands_to_checked_call() {
    let adapter = TryAdapter {
        call: LuaExpr::rt_call("System.try", Vec::new()),
        wrap: ReturnWrap::Check {
            ok: "ok".to_string(),
            value: Some("v".to_string()),
            protected: false,
        },
    };
    let c = chunk(vec![LuaStmt::TryAdapter(adapter)]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "local ok, v = System.try()\nif ok then return v end\n"
    );
}

#[test]
fn nested_try_adapter_re_returns_with_marker() {
    let adapter = TryAdapter {
        call: LuaExpr::rt_call("System.try", Vec::new()),
        wrap: ReturnWrap::Check {
            ok: "ok".to_string(),
            value: Some("v".to_string()),
            protected: true,
        },
    };
    let c = chunk(vec![LuaStmt::TryAdapter(adapter)]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "local ok, v = System.try()\nif ok then return true, v end\n"
    );
}

#[test]
fn continue_adapter_renders_per_dialect_choice() {
    let c = chunk(vec![LuaStmt::ContinueAdapter(ContinueKind::Goto(
        "continue".to_string(),
    ))]);
    assert_eq!(render(&c, RenderConfig::default()), "goto continue\n");

    let c = chunk(vec![LuaStmt::ContinueAdapter(ContinueKind::Flag(
        "__continue__".to_string(),
    ))]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "__continue__ = true\nbreak\n"
    );
}

#[test]
fn goto_case_adapter_raises_flags_then_jumps() {
    let c = chunk(vec![LuaStmt::GotoCaseAdapter(GotoCaseAdapter {
        flags: vec!["case1".to_string(), "redirect".to_string()],
        label: "switch".to_string(),
    })]);
    assert_eq!(
        render(&c, RenderConfig::default()),
        "case1, redirect = true, true\ngoto switch\n"
    );
}

#[test]
fn type_decl_indexes_multiple_ctors() {
    let mut decl = LuaTypeDecl::new("A", TypeDeclKind::Class);
    decl.ctors.push(CtorAdapter {
        func: FunctionExpr::new(
            vec!["this".to_string(), "x".to_string()],
            LuaBlock::default(),
        ),
    });
    decl.ctors.push(CtorAdapter {
        func: FunctionExpr::new(vec!["this".to_string()], LuaBlock::default()),
    });
    let c = chunk(vec![LuaStmt::TypeDecl(decl)]);
    let out = render(&c, RenderConfig::default());
    assert_eq!(
        out,
        "namespace.class(\"A\", function(namespace)\n  return {\n    __ctor__ = {\n      function(this, x) end,\n      function(this) end,\n    },\n  }\nend)\n"
    );
}

#[test]
fn classic_dialect_routes_operators_through_helpers() {
    let shl = LuaExpr::binary(LuaBinaryOp::Shl, LuaExpr::name("a"), LuaExpr::int(2));
    assert_eq!(render_expr(&shl, RenderConfig::default()), "a << 2");
    let classic = RenderConfig {
        classic: true,
        ..RenderConfig::default()
    };
    assert_eq!(render_expr(&shl, classic), "System.sl(a, 2)");

    let idiv = LuaExpr::binary(LuaBinaryOp::IDiv, LuaExpr::name("a"), LuaExpr::name("b"));
    assert_eq!(render_expr(&idiv, RenderConfig::default()), "a // b");
    assert_eq!(render_expr(&idiv, classic), "System.div(a, b)");
}

#[test]
fn char_literal_carries_source_comment() {
    let c = LuaExpr::Literal(sharplua_emit::lua::LuaLiteral::Char('a'));
    assert_eq!(render_expr(&c, RenderConfig::default()), "97 --[[ 'a' ]]");
}

#[test]
fn single_table_argument_uses_sugar_form() {
    let call = LuaExpr::call(
        LuaExpr::name("System.ValueTuple.create"),
        vec![LuaExpr::Table(vec![
            sharplua_emit::lua::TableItem::Value(LuaExpr::int(1)),
            sharplua_emit::lua::TableItem::Value(LuaExpr::int(2)),
        ])],
    );
    assert_eq!(
        render_expr(&call, RenderConfig::default()),
        "System.ValueTuple.create{ 1, 2 }"
    );
}
