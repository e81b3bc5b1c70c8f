//! Statement lowering, including the control-flow rewrites.

use crate::error::EmitResult;
use crate::lua::stmt::IfStmt;
use crate::lua::{
    ContinueKind, FunctionExpr, GotoCaseAdapter, LuaBinaryOp, LuaBlock, LuaExpr, LuaStmt,
    LuaUnaryOp, ReturnWrap, TryAdapter, UsingAdapter,
};
use crate::names::escape_identifier;
use crate::runtime;
use crate::transform::context::{Breakable, GotoCaseInfo, Transformer};
use crate::transform::expr::ExprLowering;
use sharplua_semantic::expr::{BinaryOp, Expr, InvocationExpr, TupleExpr};
use sharplua_semantic::stmt::{
    BlockStmt, CatchClause, DoWhileStmt, ForEachStmt, ForStmt, GotoTarget, IfStmt as SemIfStmt,
    LocalDeclStmt, LocalFunctionStmt, Stmt, SwitchLabel, SwitchSection, SwitchStmt, TryStmt,
    UsingStmt, WhileStmt,
};
use sharplua_semantic::symbol::{ParamMode, SymbolKind};
use text_size::TextRange;

pub struct StmtLowering;

impl StmtLowering {
    /// Lower a source block's statements into the current block frame.
    ///
    /// Several local functions in one block are pre-declared first so they
    /// can be mutually recursive.
    pub fn lower_block_into(ctx: &mut Transformer, block: &BlockStmt) -> EmitResult<()> {
        let local_fns: Vec<_> = block
            .statements
            .iter()
            .filter_map(|s| match s {
                Stmt::LocalFunction(f) => Some(f.symbol),
                _ => None,
            })
            .collect();
        let predeclare = local_fns.len() > 1;
        if predeclare {
            let mut names = Vec::new();
            for symbol in &local_fns {
                names.push(ctx.names.lua_name(ctx.arena, *symbol)?);
            }
            ctx.push_stmt(LuaStmt::Local {
                names,
                values: Vec::new(),
            });
        }
        for stmt in &block.statements {
            match stmt {
                Stmt::LocalFunction(f) if predeclare => {
                    let name = ctx.names.lua_name(ctx.arena, f.symbol)?;
                    let func = Self::local_function_value(ctx, f)?;
                    ctx.push_stmt(LuaStmt::Assign {
                        targets: vec![LuaExpr::name(name)],
                        values: vec![LuaExpr::Function(func)],
                    });
                }
                other => Self::lower(ctx, other)?,
            }
        }
        Ok(())
    }

    pub fn lower(ctx: &mut Transformer, stmt: &Stmt) -> EmitResult<()> {
        match stmt {
            Stmt::Block(b) => {
                let block = ctx.with_block(|ctx| Self::lower_block_into(ctx, b))?;
                ctx.push_stmt(LuaStmt::Do(block));
                Ok(())
            }
            Stmt::Expr(s) => Self::lower_expr_statement(ctx, &s.expr),
            Stmt::LocalDecl(s) => Self::lower_local_decl(ctx, s),
            Stmt::If(s) => Self::lower_if(ctx, s),
            Stmt::While(s) => Self::lower_while(ctx, s),
            Stmt::DoWhile(s) => Self::lower_do_while(ctx, s),
            Stmt::For(s) => Self::lower_for(ctx, s),
            Stmt::ForEach(s) => Self::lower_foreach(ctx, s),
            Stmt::Switch(s) => Self::lower_switch(ctx, s),
            Stmt::Break(s) => Self::lower_break(ctx, s.span),
            Stmt::Continue(s) => Self::lower_continue(ctx, s.span),
            Stmt::Return(s) => Self::lower_return(ctx, s.value.as_ref()),
            Stmt::Throw(s) => Self::lower_throw(ctx, s.value.as_ref(), s.span),
            Stmt::Try(s) => Self::lower_try(ctx, s),
            Stmt::Using(s) => Self::lower_using(ctx, s),
            Stmt::Lock(s) => {
                let target = ExprLowering::lower(ctx, &s.target)?;
                let rendered = Self::render_for_comment(ctx, &target);
                ctx.push_stmt(LuaStmt::Comment(format!("lock({})", rendered)));
                let body = ctx.with_block(|ctx| Self::lower_block_into(ctx, &s.body))?;
                ctx.push_stmt(LuaStmt::Do(body));
                Ok(())
            }
            Stmt::Unsafe(s) => {
                ctx.push_stmt(LuaStmt::Comment("unsafe".to_string()));
                let body = ctx.with_block(|ctx| Self::lower_block_into(ctx, &s.body))?;
                ctx.push_stmt(LuaStmt::Do(body));
                Ok(())
            }
            Stmt::Fixed(s) => {
                ctx.push_stmt(LuaStmt::Comment("fixed".to_string()));
                let body = ctx.with_block(|ctx| {
                    Self::lower_local_decl(ctx, &s.declarations)?;
                    Self::lower_block_into(ctx, &s.body)
                })?;
                ctx.push_stmt(LuaStmt::Do(body));
                Ok(())
            }
            Stmt::Goto(s) => Self::lower_goto(ctx, &s.target, s.span),
            Stmt::Labeled(s) => {
                if ctx.options.classic {
                    return Err(ctx.unsupported("labels in the classic dialect", s.span));
                }
                ctx.push_stmt(LuaStmt::Label(escape_identifier(&s.label)));
                Self::lower(ctx, &s.stmt)
            }
            Stmt::YieldReturn(s) => {
                let value = ExprLowering::lower(ctx, &s.value)?;
                ctx.push_stmt(LuaStmt::Expr(LuaExpr::rt_call(
                    runtime::YIELD_RETURN,
                    vec![value],
                )));
                Ok(())
            }
            Stmt::YieldBreak(_) => {
                ctx.push_stmt(LuaStmt::Return(Vec::new()));
                Ok(())
            }
            Stmt::LocalFunction(f) => {
                let name = ctx.names.lua_name(ctx.arena, f.symbol)?;
                let func = Self::local_function_value(ctx, f)?;
                ctx.push_stmt(LuaStmt::LocalFunction { name, func });
                Ok(())
            }
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn render_for_comment(ctx: &Transformer, expr: &LuaExpr) -> String {
        let config = crate::render::RenderConfig {
            classic: ctx.options.classic,
            ..Default::default()
        };
        crate::render::render_expr(expr, config)
    }

    fn local_function_value(
        ctx: &mut Transformer,
        f: &LocalFunctionStmt,
    ) -> EmitResult<FunctionExpr> {
        let frame = ctx.method_frame(f.symbol)?;
        let info = ctx
            .arena
            .get(f.symbol)
            .as_method()
            .expect("local function without method info")
            .clone();
        let mut params = Vec::new();
        for p in &info.params {
            params.push(ctx.names.lua_name(ctx.arena, p.symbol)?);
        }
        let body = f.body.clone();
        let scope = Some(f.symbol);
        let (block, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(scope, false, |ctx| Self::lower_block_into(ctx, &body))
        })?;
        Ok(FunctionExpr::new(params, block))
    }

    // Expression statements

    fn lower_expr_statement(ctx: &mut Transformer, expr: &Expr) -> EmitResult<()> {
        match expr {
            Expr::Assignment(a) => Self::lower_assign(ctx, &a.target, a.op, &a.value),
            Expr::ConditionalAccess(c) => {
                ExprLowering::lower_conditional_access(ctx, c, true)?;
                Ok(())
            }
            Expr::Invocation(inv) => Self::lower_invocation_statement(ctx, inv),
            other => {
                let lowered = ExprLowering::lower(ctx, other)?;
                if matches!(
                    lowered,
                    LuaExpr::Call(_) | LuaExpr::Literal(crate::lua::LuaLiteral::Verbatim(_))
                ) {
                    ctx.push_stmt(LuaStmt::Expr(lowered));
                }
                Ok(())
            }
        }
    }

    fn lower_invocation_statement(ctx: &mut Transformer, inv: &InvocationExpr) -> EmitResult<()> {
        let params = inv
            .method
            .and_then(|m| ctx.arena.get(m).as_method().map(|i| i.params.clone()));
        let has_ref_out = params
            .as_ref()
            .map(|p| p.iter().any(|p| p.mode != ParamMode::Value))
            .unwrap_or(false);
        if !has_ref_out {
            let lowered = ExprLowering::lower(ctx, &Expr::Invocation(inv.clone()))?;
            ctx.push_stmt(LuaStmt::Expr(lowered));
            return Ok(());
        }
        let method = inv.method.expect("ref/out call without method symbol");
        let params = params.expect("checked above");
        let returns_void = ctx
            .arena
            .get(method)
            .as_method()
            .map(|m| m.returns_void())
            .unwrap_or(true);
        let ret = if returns_void {
            None
        } else {
            Some(ctx.alloc_temp())
        };
        if let Some(ret) = &ret {
            ctx.push_stmt(LuaStmt::Local {
                names: vec![ret.clone()],
                values: Vec::new(),
            });
        }
        let targets = ExprLowering::ref_out_targets(ctx, inv, &params, ret)?;
        let call = ExprLowering::build_ref_out_call(ctx, inv, method, &params)?;
        ctx.push_stmt(LuaStmt::Assign {
            targets,
            values: vec![call],
        });
        Ok(())
    }

    // Assignment

    pub fn lower_assign(
        ctx: &mut Transformer,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
    ) -> EmitResult<()> {
        if let Expr::Tuple(t) = target {
            return Self::lower_deconstruct(ctx, t, value);
        }
        if let Some(op) = op {
            if Self::event_symbol(ctx, target).is_some() {
                return Self::lower_event_assign(ctx, target, op, value);
            }
            if op == BinaryOp::Coalesce {
                // `x ??= v` assigns only when the target is nil.
                let read = ExprLowering::lower(ctx, target)?;
                let assign = ctx.with_block(|ctx| {
                    Self::lower_assign(ctx, target, None, value)
                })?;
                ctx.push_stmt(LuaStmt::If(IfStmt::new(LuaExpr::eq_nil(read), assign)));
                return Ok(());
            }
        }

        // A ref/out call on the right-hand side widens the assignment.
        if op.is_none() {
            if let Expr::Invocation(inv) = value {
                if let Some(method) = inv.method {
                    let params = ctx
                        .arena
                        .get(method)
                        .as_method()
                        .map(|m| m.params.clone())
                        .unwrap_or_default();
                    if params.iter().any(|p| p.mode != ParamMode::Value) {
                        let target_lua = ExprLowering::lower(ctx, target)?;
                        let mut targets =
                            ExprLowering::ref_out_targets(ctx, inv, &params, None)?;
                        targets.insert(0, target_lua);
                        let call = ExprLowering::build_ref_out_call(ctx, inv, method, &params)?;
                        ctx.push_stmt(LuaStmt::Assign {
                            targets,
                            values: vec![call],
                        });
                        return Ok(());
                    }
                }
            }
        }

        // Indexer and array element targets go through `set`.
        if let Expr::Index(ix) = target {
            let recv = ExprLowering::lower(ctx, &ix.target)?;
            let recv = if op.is_some() {
                Self::ensure_name(ctx, recv)?
            } else {
                recv
            };
            let mut args = Vec::new();
            for a in &ix.args {
                let lowered = ExprLowering::lower(ctx, a)?;
                args.push(if op.is_some() {
                    Self::ensure_name(ctx, lowered)?
                } else {
                    lowered
                });
            }
            let rhs = match op {
                None => ExprLowering::lower(ctx, value)?,
                Some(op) => {
                    let read = LuaExpr::call(
                        LuaExpr::method(recv.clone(), "get"),
                        args.clone(),
                    );
                    Self::compound_rhs(ctx, read, op, target, value)?
                }
            };
            let mut call_args = args;
            call_args.push(rhs);
            ctx.push_stmt(LuaStmt::Expr(LuaExpr::call(
                LuaExpr::method(recv, "set"),
                call_args,
            )));
            return Ok(());
        }

        let mut target_lua = ExprLowering::lower(ctx, target)?;
        if op.is_some() {
            // The receiver of a compound target must evaluate once.
            if let LuaExpr::Property(p) = &mut target_lua {
                if let Some(t) = &p.target {
                    let simple = Self::ensure_name(ctx, (**t).clone())?;
                    p.target = Some(Box::new(simple));
                }
            }
        }
        let rhs = match op {
            None => ExprLowering::lower(ctx, value)?,
            Some(op) => {
                let read = target_lua.clone();
                Self::compound_rhs(ctx, read, op, target, value)?
            }
        };
        ctx.push_stmt(LuaStmt::Assign {
            targets: vec![target_lua],
            values: vec![rhs],
        });
        Ok(())
    }

    fn ensure_name(ctx: &mut Transformer, expr: LuaExpr) -> EmitResult<LuaExpr> {
        if matches!(expr, LuaExpr::Name(_)) || !ctx.in_function() {
            return Ok(expr);
        }
        let temp = ctx.alloc_temp();
        ctx.push_stmt(LuaStmt::Local {
            names: vec![temp.clone()],
            values: vec![expr],
        });
        Ok(LuaExpr::name(temp))
    }

    /// Right-hand side of a compound assignment: `read op value`, with the
    /// same operator mapping as plain binary lowering.
    fn compound_rhs(
        ctx: &mut Transformer,
        read: LuaExpr,
        op: BinaryOp,
        target: &Expr,
        value: &Expr,
    ) -> EmitResult<LuaExpr> {
        use sharplua_semantic::types::SpecialType;
        let value_lua = ExprLowering::lower(ctx, value)?;
        let target_ty = target.ty();
        let value_ty = value.ty();
        let both_integral = target_ty
            .special()
            .map(SpecialType::is_integral)
            .unwrap_or(false)
            && value_ty
                .special()
                .map(SpecialType::is_integral)
                .unwrap_or(false);
        let lua_op = match op {
            BinaryOp::Add if target_ty.is_string() => LuaBinaryOp::Concat,
            BinaryOp::Add => LuaBinaryOp::Add,
            BinaryOp::Sub => LuaBinaryOp::Sub,
            BinaryOp::Mul => LuaBinaryOp::Mul,
            BinaryOp::Div if both_integral => LuaBinaryOp::IDiv,
            BinaryOp::Div => LuaBinaryOp::Div,
            BinaryOp::Mod => {
                let helper = if both_integral {
                    runtime::MOD
                } else {
                    runtime::FMOD
                };
                return Ok(LuaExpr::rt_call(helper, vec![read, value_lua]));
            }
            BinaryOp::BitAnd => LuaBinaryOp::BAnd,
            BinaryOp::BitOr => LuaBinaryOp::BOr,
            BinaryOp::BitXor => LuaBinaryOp::BXor,
            BinaryOp::Shl => LuaBinaryOp::Shl,
            BinaryOp::Shr => LuaBinaryOp::Shr,
            other => {
                return Err(ctx.contract(
                    format!("operator {:?} is not a compound-assignment operator", other),
                    target.span(),
                ))
            }
        };
        Ok(LuaExpr::binary(lua_op, read, value_lua))
    }

    fn event_symbol(ctx: &Transformer, target: &Expr) -> Option<sharplua_semantic::SymbolId> {
        let symbol = match target {
            Expr::Member(m) => m.member,
            Expr::Identifier(i) => i.symbol,
            _ => return None,
        };
        matches!(ctx.arena.get(symbol).kind, SymbolKind::Event(_)).then_some(symbol)
    }

    /// `e += h` / `e -= h`: accessor events call `add_E`/`remove_E`;
    /// field-like events combine in place.
    fn lower_event_assign(
        ctx: &mut Transformer,
        target: &Expr,
        op: BinaryOp,
        value: &Expr,
    ) -> EmitResult<()> {
        let symbol = Self::event_symbol(ctx, target).expect("checked by caller");
        let data = ctx.arena.get(symbol).clone();
        let SymbolKind::Event(info) = &data.kind else {
            unreachable!("event symbol");
        };
        let adding = matches!(op, BinaryOp::Add);
        let name = ctx.names.lua_name(ctx.arena, symbol)?;
        let receiver = match target {
            Expr::Member(m) => match (&m.target, data.is_static) {
                (_, true) => {
                    let ty = data.containing.expect("static event without type");
                    LuaExpr::name(ctx.names.type_path(ctx.arena, ty)?)
                }
                (Some(t), false) => ExprLowering::lower(ctx, t)?,
                (None, false) => LuaExpr::name("this"),
            },
            _ => LuaExpr::name("this"),
        };
        let handler = ExprLowering::lower(ctx, value)?;

        if info.has_accessors || info.is_interface_impl || info.is_overridable {
            let accessor = format!(
                "{}{}",
                if adding {
                    runtime::ADD_PREFIX
                } else {
                    runtime::REMOVE_PREFIX
                },
                name
            );
            let call = if data.is_static {
                LuaExpr::call(LuaExpr::member(receiver, accessor), vec![handler])
            } else {
                LuaExpr::call(LuaExpr::method(receiver, accessor), vec![handler])
            };
            ctx.push_stmt(LuaStmt::Expr(call));
            return Ok(());
        }

        let receiver = Self::ensure_name(ctx, receiver)?;
        let field = LuaExpr::member(receiver, name);
        let helper = if adding {
            runtime::DELEGATE_COMBINE
        } else {
            runtime::DELEGATE_REMOVE
        };
        let combined = LuaExpr::rt_call(helper, vec![field.clone(), handler]);
        ctx.push_stmt(LuaStmt::Assign {
            targets: vec![field],
            values: vec![combined],
        });
        Ok(())
    }

    fn lower_deconstruct(
        ctx: &mut Transformer,
        targets: &TupleExpr,
        value: &Expr,
    ) -> EmitResult<()> {
        let mut lowered_targets = Vec::new();
        for t in &targets.elements {
            lowered_targets.push(ExprLowering::lower(ctx, t)?);
        }
        let values = match value {
            Expr::Tuple(vt) => {
                let mut vs = Vec::new();
                for v in &vt.elements {
                    vs.push(ExprLowering::lower(ctx, v)?);
                }
                vs
            }
            other => {
                let tuple = ExprLowering::lower(ctx, other)?;
                let tuple = Self::ensure_name(ctx, tuple)?;
                (1..=targets.elements.len() as i64)
                    .map(|i| LuaExpr::index(tuple.clone(), LuaExpr::int(i)))
                    .collect()
            }
        };

        // Accessor-backed property targets cannot sit in a multi-assign;
        // spill the values to temporaries and assign one by one, keeping
        // left-to-right order.
        let needs_spill = lowered_targets
            .iter()
            .any(|t| matches!(t, LuaExpr::Property(p) if !p.field_like));
        if !needs_spill {
            ctx.push_stmt(LuaStmt::Assign {
                targets: lowered_targets,
                values,
            });
            return Ok(());
        }
        let temps: Vec<String> = (0..values.len()).map(|_| ctx.alloc_temp()).collect();
        ctx.push_stmt(LuaStmt::Local {
            names: temps.clone(),
            values,
        });
        for (target, temp) in lowered_targets.into_iter().zip(temps) {
            ctx.push_stmt(LuaStmt::Assign {
                targets: vec![target],
                values: vec![LuaExpr::name(temp)],
            });
        }
        Ok(())
    }

    // Declarations

    fn lower_local_decl(ctx: &mut Transformer, s: &LocalDeclStmt) -> EmitResult<()> {
        for d in &s.declarators {
            let name = ctx.names.lua_name(ctx.arena, d.symbol)?;
            match &d.init {
                None => ctx.push_stmt(LuaStmt::Local {
                    names: vec![name],
                    values: Vec::new(),
                }),
                Some(Expr::Invocation(inv)) if Self::has_ref_out(ctx, inv) => {
                    let method = inv.method.expect("ref/out call without method symbol");
                    let params = ctx
                        .arena
                        .get(method)
                        .as_method()
                        .map(|m| m.params.clone())
                        .unwrap_or_default();
                    ctx.push_stmt(LuaStmt::Local {
                        names: vec![name.clone()],
                        values: Vec::new(),
                    });
                    let targets =
                        ExprLowering::ref_out_targets(ctx, inv, &params, Some(name))?;
                    let call = ExprLowering::build_ref_out_call(ctx, inv, method, &params)?;
                    ctx.push_stmt(LuaStmt::Assign {
                        targets,
                        values: vec![call],
                    });
                }
                Some(init) => {
                    let value = ExprLowering::lower(ctx, init)?;
                    ctx.push_stmt(LuaStmt::Local {
                        names: vec![name],
                        values: vec![value],
                    });
                }
            }
        }
        Ok(())
    }

    fn has_ref_out(ctx: &Transformer, inv: &InvocationExpr) -> bool {
        inv.method
            .and_then(|m| ctx.arena.get(m).as_method())
            .map(|i| i.params.iter().any(|p| p.mode != ParamMode::Value))
            .unwrap_or(false)
    }

    // Control flow

    fn lower_if(ctx: &mut Transformer, s: &SemIfStmt) -> EmitResult<()> {
        let condition = ExprLowering::lower(ctx, &s.condition)?;
        let then_block = ctx.with_block(|ctx| Self::lower_block_into(ctx, &s.then_branch))?;
        let mut stmt = IfStmt::new(condition, then_block);

        let mut else_branch = s.else_branch.as_deref();
        loop {
            match else_branch {
                None => break,
                Some(Stmt::If(elif)) => {
                    // A condition that needs hoisted temporaries cannot
                    // ride an elseif; nest the whole tail in the else.
                    let (pre, cond) = Self::hoisted_expr(ctx, &elif.condition)?;
                    if !pre.is_empty() {
                        let else_block = ctx.with_block(|ctx| Self::lower_if(ctx, elif))?;
                        stmt.else_block = Some(else_block);
                        ctx.push_stmt(LuaStmt::If(stmt));
                        return Ok(());
                    }
                    let body =
                        ctx.with_block(|ctx| Self::lower_block_into(ctx, &elif.then_branch))?;
                    stmt.elseifs.push((cond, body));
                    else_branch = elif.else_branch.as_deref();
                }
                Some(Stmt::Block(b)) => {
                    let block = ctx.with_block(|ctx| Self::lower_block_into(ctx, b))?;
                    stmt.else_block = Some(block);
                    break;
                }
                Some(other) => {
                    let block = ctx.with_block(|ctx| Self::lower(ctx, other))?;
                    stmt.else_block = Some(block);
                    break;
                }
            }
        }
        ctx.push_stmt(LuaStmt::If(stmt));
        Ok(())
    }

    /// Lower an expression in a scratch block, returning its hoisted
    /// prelude alongside the value.
    fn hoisted_expr(ctx: &mut Transformer, e: &Expr) -> EmitResult<(Vec<LuaStmt>, LuaExpr)> {
        let mut value = None;
        let block = ctx.with_block(|ctx| {
            value = Some(ExprLowering::lower(ctx, e)?);
            Ok(())
        })?;
        Ok((block.statements, value.expect("lowered above")))
    }

    /// Lower a loop body, appending the continue epilogue and the step
    /// statements so `continue` still runs the step.
    fn lower_loop_body(
        ctx: &mut Transformer,
        body: &BlockStmt,
        step: Vec<LuaStmt>,
    ) -> EmitResult<LuaBlock> {
        ctx.breakables.push(Breakable::Loop { continues: 0 });
        let lowered = ctx.with_block(|ctx| Self::lower_block_into(ctx, body));
        let frame = ctx.breakables.pop();
        let mut inner = lowered?;
        let continues = match frame {
            Some(Breakable::Loop { continues }) => continues,
            _ => 0,
        };

        if continues == 0 {
            inner.statements.extend(step);
            return Ok(inner);
        }
        if !ctx.options.classic {
            inner.push(LuaStmt::Label(runtime::CONTINUE_LABEL.to_string()));
            inner.statements.extend(step);
            return Ok(inner);
        }

        // Classic dialect: run the body in a one-shot repeat; a completed
        // pass raises the flag, the epilogue turns a missing flag into the
        // loop's own break.
        inner.push(LuaStmt::Assign {
            targets: vec![LuaExpr::name(runtime::CONTINUE_VAR)],
            values: vec![LuaExpr::bool(true)],
        });
        let mut outer = LuaBlock::default();
        outer.push(LuaStmt::Local {
            names: vec![runtime::CONTINUE_VAR.to_string()],
            values: Vec::new(),
        });
        outer.push(LuaStmt::Repeat {
            body: inner,
            until: LuaExpr::bool(true),
        });
        let break_block = LuaBlock::new(vec![LuaStmt::Break]);
        outer.push(LuaStmt::If(IfStmt::new(
            LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::name(runtime::CONTINUE_VAR)),
            break_block,
        )));
        outer.statements.extend(step);
        Ok(outer)
    }

    fn lower_while(ctx: &mut Transformer, s: &WhileStmt) -> EmitResult<()> {
        let (pre, condition) = Self::hoisted_expr(ctx, &s.condition)?;
        let body = Self::lower_loop_body(ctx, &s.body, Vec::new())?;
        if pre.is_empty() {
            ctx.push_stmt(LuaStmt::While { condition, body });
            return Ok(());
        }
        // The condition needs statements of its own; re-test inside a
        // `while true` head.
        let mut head = pre;
        head.push(LuaStmt::If(IfStmt::new(
            LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::paren(condition)),
            LuaBlock::new(vec![LuaStmt::Break]),
        )));
        head.extend(body.statements);
        ctx.push_stmt(LuaStmt::While {
            condition: LuaExpr::bool(true),
            body: LuaBlock::new(head),
        });
        Ok(())
    }

    fn lower_do_while(ctx: &mut Transformer, s: &DoWhileStmt) -> EmitResult<()> {
        let mut body = Self::lower_loop_body(ctx, &s.body, Vec::new())?;
        let (pre, condition) = Self::hoisted_expr(ctx, &s.condition)?;
        body.statements.extend(pre);
        ctx.push_stmt(LuaStmt::Repeat {
            body,
            until: LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::paren(condition)),
        });
        Ok(())
    }

    fn lower_for(ctx: &mut Transformer, s: &ForStmt) -> EmitResult<()> {
        let block = ctx.with_block(|ctx| {
            if let Some(init) = &s.init {
                Self::lower_local_decl(ctx, init)?;
            }
            let step = ctx
                .with_block(|ctx| {
                    for e in &s.step {
                        Self::lower_expr_statement(ctx, e)?;
                    }
                    Ok(())
                })?
                .statements;
            let (pre, condition) = match &s.condition {
                Some(c) => Self::hoisted_expr(ctx, c)?,
                None => (Vec::new(), LuaExpr::bool(true)),
            };
            let body = Self::lower_loop_body(ctx, &s.body, step)?;
            if pre.is_empty() {
                ctx.push_stmt(LuaStmt::While { condition, body });
            } else {
                let mut head = pre;
                head.push(LuaStmt::If(IfStmt::new(
                    LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::paren(condition)),
                    LuaBlock::new(vec![LuaStmt::Break]),
                )));
                head.extend(body.statements);
                ctx.push_stmt(LuaStmt::While {
                    condition: LuaExpr::bool(true),
                    body: LuaBlock::new(head),
                });
            }
            Ok(())
        })?;
        ctx.push_stmt(LuaStmt::Do(block));
        Ok(())
    }

    fn lower_foreach(ctx: &mut Transformer, s: &ForEachStmt) -> EmitResult<()> {
        let var = ctx.names.lua_name(ctx.arena, s.symbol)?;
        if let Some(range) = &s.numeric {
            let start = ExprLowering::lower(ctx, &range.start)?;
            let limit = ExprLowering::lower(ctx, &range.limit)?;
            let step = range
                .step
                .as_ref()
                .map(|e| ExprLowering::lower(ctx, e))
                .transpose()?;
            let body = Self::lower_loop_body(ctx, &s.body, Vec::new())?;
            ctx.push_stmt(LuaStmt::NumericFor {
                var,
                start,
                limit,
                step,
                body,
            });
            return Ok(());
        }
        let collection = ExprLowering::lower(ctx, &s.collection)?;
        let body = Self::lower_loop_body(ctx, &s.body, Vec::new())?;
        ctx.push_stmt(LuaStmt::GenericFor {
            vars: vec!["_".to_string(), var],
            exprs: vec![LuaExpr::rt_call(runtime::EACH, vec![collection])],
            body,
        });
        Ok(())
    }

    fn lower_break(ctx: &mut Transformer, span: TextRange) -> EmitResult<()> {
        if ctx.breakables.is_empty() {
            return Err(ctx.contract("break outside a loop or switch", span));
        }
        let classic = ctx.options.classic;
        let goto_label = match ctx.breakables.last_mut().expect("checked above") {
            Breakable::Loop { .. } => None,
            Breakable::Switch {
                end_label,
                end_label_used,
                ..
            } => {
                if classic {
                    // The classic switch runs in a one-shot repeat; break
                    // exits it directly.
                    None
                } else {
                    *end_label_used = true;
                    Some(end_label.clone())
                }
            }
        };
        match goto_label {
            Some(label) => ctx.push_stmt(LuaStmt::Goto(label)),
            None => ctx.push_stmt(LuaStmt::Break),
        }
        Ok(())
    }

    fn lower_continue(ctx: &mut Transformer, span: TextRange) -> EmitResult<()> {
        let classic = ctx.options.classic;
        let in_loop = ctx
            .breakables
            .iter()
            .any(|b| matches!(b, Breakable::Loop { .. }));
        if !in_loop {
            return Err(ctx.contract("continue outside a loop", span));
        }
        if let Some(Breakable::Loop { continues }) = ctx.innermost_loop_mut() {
            *continues += 1;
        }
        let kind = if classic {
            ContinueKind::Flag(runtime::CONTINUE_VAR.to_string())
        } else {
            ContinueKind::Goto(runtime::CONTINUE_LABEL.to_string())
        };
        ctx.push_stmt(LuaStmt::ContinueAdapter(kind));
        Ok(())
    }

    fn lower_return(ctx: &mut Transformer, value: Option<&Expr>) -> EmitResult<()> {
        ctx.mark_return();
        let protected = ctx.in_protected();
        let ref_out: Vec<String> = ctx
            .method()
            .map(|m| m.ref_out.clone())
            .unwrap_or_default();
        let mut values = Vec::new();
        if protected {
            values.push(LuaExpr::bool(true));
        }
        if let Some(v) = value {
            values.push(ExprLowering::lower(ctx, v)?);
        }
        values.extend(ref_out.into_iter().map(LuaExpr::name));
        ctx.push_stmt(LuaStmt::Return(values));
        Ok(())
    }

    fn lower_throw(
        ctx: &mut Transformer,
        value: Option<&Expr>,
        span: TextRange,
    ) -> EmitResult<()> {
        let arg = match value {
            Some(v) => ExprLowering::lower(ctx, v)?,
            None => match ctx.catch_vars.last() {
                Some(e) => LuaExpr::name(e.clone()),
                None => return Err(ctx.contract("bare throw outside a catch clause", span)),
            },
        };
        ctx.push_stmt(LuaStmt::Expr(LuaExpr::rt_call(runtime::THROW, vec![arg])));
        Ok(())
    }

    // Protected regions

    fn lower_try(ctx: &mut Transformer, s: &TryStmt) -> EmitResult<()> {
        let scope = ctx.method().and_then(|m| m.symbol);

        let (try_body, try_returned) =
            ctx.with_function(scope, true, |ctx| Self::lower_block_into(ctx, &s.block))?;
        let try_fn = LuaExpr::Function(FunctionExpr::new(Vec::new(), try_body));

        let mut catch_returned = false;
        let catch_fn = if s.catches.is_empty() {
            None
        } else {
            let catches = s.catches.clone();
            ctx.catch_vars.push("e".to_string());
            let built = ctx.with_function(scope, true, |ctx| {
                Self::lower_catch_chain(ctx, &catches)
            });
            ctx.catch_vars.pop();
            let (body, returned) = built?;
            catch_returned = returned;
            Some(LuaExpr::Function(FunctionExpr::new(
                vec!["e".to_string()],
                body,
            )))
        };

        let finally_fn = match &s.finally {
            Some(block) => {
                let (body, _) =
                    ctx.with_function(scope, false, |ctx| Self::lower_block_into(ctx, block))?;
                Some(LuaExpr::Function(FunctionExpr::new(Vec::new(), body)))
            }
            None => None,
        };

        let mut args = vec![try_fn];
        match (catch_fn, finally_fn) {
            (Some(c), Some(f)) => {
                args.push(c);
                args.push(f);
            }
            (Some(c), None) => args.push(c),
            (None, Some(f)) => {
                args.push(LuaExpr::nil());
                args.push(f);
            }
            (None, None) => {}
        }
        let call = LuaExpr::rt_call(runtime::TRY, args);
        let wrap = Self::return_wrap(ctx, try_returned || catch_returned);
        ctx.push_stmt(LuaStmt::TryAdapter(TryAdapter { call, wrap }));
        Ok(())
    }

    /// The compiled disjunction of the catch clauses, inside the catch
    /// closure's body.
    fn lower_catch_chain(ctx: &mut Transformer, catches: &[CatchClause]) -> EmitResult<()> {
        // Bindings are in scope for their clause's filter, so they are
        // declared up front.
        for clause in catches {
            if let Some(binding) = clause.binding {
                let name = ctx.names.lua_name(ctx.arena, binding)?;
                ctx.push_stmt(LuaStmt::Local {
                    names: vec![name],
                    values: vec![LuaExpr::name("e")],
                });
            }
        }

        let mut chain: Option<IfStmt> = None;
        let mut unconditional = false;
        for clause in catches {
            let body = ctx.with_block(|ctx| Self::lower_block_into(ctx, &clause.body))?;
            match &clause.ty {
                None => {
                    // Bare catch: the unconditional final arm.
                    match &mut chain {
                        None => {
                            for stmt in body.statements {
                                ctx.push_stmt(stmt);
                            }
                        }
                        Some(c) => c.else_block = Some(body),
                    }
                    unconditional = true;
                    break;
                }
                Some(ty) => {
                    let ty_expr = ctx.type_expr(ty)?;
                    let mut cond =
                        LuaExpr::rt_call(runtime::IS, vec![LuaExpr::name("e"), ty_expr]);
                    if let Some(filter) = &clause.filter {
                        let filter = ExprLowering::lower(ctx, filter)?;
                        cond = LuaExpr::binary(LuaBinaryOp::And, cond, filter);
                    }
                    match &mut chain {
                        None => chain = Some(IfStmt::new(cond, body)),
                        Some(c) => c.elseifs.push((cond, body)),
                    }
                }
            }
        }
        if let Some(mut chain) = chain {
            if !unconditional && chain.else_block.is_none() {
                // No unconditional catch: the implicit rethrow arm.
                chain.else_block = Some(LuaBlock::new(vec![LuaStmt::Return(vec![
                    LuaExpr::bool(true),
                    LuaExpr::name("e"),
                ])]));
            }
            ctx.push_stmt(LuaStmt::If(chain));
        }
        Ok(())
    }

    fn return_wrap(ctx: &mut Transformer, saw_return: bool) -> ReturnWrap {
        if !saw_return {
            return ReturnWrap::None;
        }
        let ok = ctx.alloc_named("ok");
        let value = match ctx.method().map(|m| m.returns_void) {
            Some(false) => Some(ctx.alloc_named("v")),
            _ => None,
        };
        ReturnWrap::Check {
            ok,
            value,
            protected: ctx.in_protected(),
        }
    }

    fn lower_using(ctx: &mut Transformer, s: &UsingStmt) -> EmitResult<()> {
        let scope = ctx.method().and_then(|m| m.symbol);
        let mut params = Vec::new();
        let mut inits = Vec::new();
        for r in &s.resources {
            let name = match r.symbol {
                Some(symbol) => ctx.names.lua_name(ctx.arena, symbol)?,
                None => "_".to_string(),
            };
            params.push(name);
            inits.push(ExprLowering::lower(ctx, &r.init)?);
        }

        let (body, saw_return) =
            ctx.with_function(scope, true, |ctx| Self::lower_block_into(ctx, &s.body))?;
        let closure = LuaExpr::Function(FunctionExpr::new(params, body));

        let call = if inits.len() == 1 {
            let init = inits.pop().expect("length checked");
            LuaExpr::rt_call(runtime::USING, vec![init, closure])
        } else {
            let mut args = vec![closure];
            args.extend(inits);
            LuaExpr::rt_call(runtime::USING_X, args)
        };
        let wrap = Self::return_wrap(ctx, saw_return);
        ctx.push_stmt(LuaStmt::UsingAdapter(UsingAdapter { call, wrap }));
        Ok(())
    }

    // Switch

    fn lower_switch(ctx: &mut Transformer, s: &SwitchStmt) -> EmitResult<()> {
        let (pre, selector) = Self::hoisted_expr(ctx, &s.selector)?;
        for stmt in pre {
            ctx.push_stmt(stmt);
        }
        let selector = Self::ensure_name(ctx, selector)?;

        let targets = Self::goto_case_targets(&s.sections);
        let has_goto_case = !targets.is_empty();
        if has_goto_case && ctx.options.classic {
            return Err(ctx.unsupported("goto case in the classic dialect", s.span));
        }

        let dispatch = if has_goto_case {
            let label = ctx.fresh_label("switch");
            let redirect = ctx.alloc_named("redirect");
            let mut flags = Vec::new();
            for (i, target) in targets.iter().enumerate() {
                let base = match target {
                    SwitchLabel::Default => "default".to_string(),
                    SwitchLabel::Case(_) => format!("case{}", i + 1),
                };
                flags.push((target.clone(), ctx.alloc_named(&base)));
            }
            let mut names: Vec<String> = flags.iter().map(|(_, f)| f.clone()).collect();
            names.push(redirect.clone());
            ctx.push_stmt(LuaStmt::Local {
                names,
                values: Vec::new(),
            });
            ctx.push_stmt(LuaStmt::Label(label.clone()));
            Some(GotoCaseInfo {
                label,
                redirect,
                flags,
            })
        } else {
            None
        };

        let end_label = ctx.fresh_label("switch_end");
        let continues_before = ctx.loop_continues();
        ctx.breakables.push(Breakable::Switch {
            end_label,
            end_label_used: false,
            dispatch,
        });
        let chain = Self::lower_switch_sections(ctx, s, &selector);
        let frame = ctx.breakables.pop();
        let chain = chain?;
        let Some(Breakable::Switch {
            end_label,
            end_label_used,
            ..
        }) = frame
        else {
            unreachable!("switch frame pushed above");
        };

        if ctx.options.classic {
            let mut body = LuaBlock::default();
            if let Some(chain) = chain {
                body.push(LuaStmt::If(chain));
            }
            ctx.push_stmt(LuaStmt::Repeat {
                body,
                until: LuaExpr::bool(true),
            });
            // A continue lowered inside the switch broke out of the
            // one-shot repeat only; propagate it to the loop body.
            if ctx.loop_continues() > continues_before {
                ctx.push_stmt(LuaStmt::If(IfStmt::new(
                    LuaExpr::name(runtime::CONTINUE_VAR),
                    LuaBlock::new(vec![LuaStmt::Break]),
                )));
            }
        } else {
            if let Some(chain) = chain {
                ctx.push_stmt(LuaStmt::If(chain));
            }
            if end_label_used {
                ctx.push_stmt(LuaStmt::Label(end_label));
            }
        }
        Ok(())
    }

    fn lower_switch_sections(
        ctx: &mut Transformer,
        s: &SwitchStmt,
        selector: &LuaExpr,
    ) -> EmitResult<Option<IfStmt>> {
        // Default runs only when no case matches, wherever it is written;
        // emit it last. Case label tests are constants, so reordering is
        // observationally safe.
        let mut cases = Vec::new();
        let mut default = None;
        for section in &s.sections {
            if section.labels.iter().any(|l| *l == SwitchLabel::Default) {
                default = Some(section);
            } else {
                cases.push(section);
            }
        }

        let mut chain: Option<IfStmt> = None;
        for section in cases {
            let cond = Self::section_condition(ctx, section, selector)?;
            let body = Self::lower_section_body(ctx, section)?;
            match &mut chain {
                None => chain = Some(IfStmt::new(cond, body)),
                Some(c) => c.elseifs.push((cond, body)),
            }
        }
        if let Some(section) = default {
            let body = Self::lower_section_body(ctx, section)?;
            let dispatch_cond = Self::dispatch_guard(ctx, &SwitchLabel::Default);
            match (&mut chain, dispatch_cond) {
                (Some(c), None) => c.else_block = Some(body),
                (Some(c), Some(cond)) => c.elseifs.push((cond, body)),
                (None, _) => {
                    // A switch with only a default section is its body.
                    return Ok(Some(IfStmt::new(LuaExpr::bool(true), body)));
                }
            }
        }
        Ok(chain)
    }

    /// Condition guarding a case section, including re-dispatch flags.
    fn section_condition(
        ctx: &mut Transformer,
        section: &SwitchSection,
        selector: &LuaExpr,
    ) -> EmitResult<LuaExpr> {
        let mut test: Option<LuaExpr> = None;
        for label in &section.labels {
            let SwitchLabel::Case(value) = label else {
                continue;
            };
            let eq = LuaExpr::binary(
                LuaBinaryOp::Eq,
                selector.clone(),
                ctx.const_expr(value),
            );
            test = Some(match test {
                None => eq,
                Some(prev) => LuaExpr::binary(LuaBinaryOp::Or, prev, eq),
            });
        }
        let test = test.expect("case section without case labels");

        let info = ctx.breakables.iter().rev().find_map(|b| match b {
            Breakable::Switch {
                dispatch: Some(info),
                ..
            } => Some(info),
            _ => None,
        });
        let Some(info) = info else {
            return Ok(test);
        };
        let redirect = info.redirect.clone();
        let flag = section.labels.iter().find_map(|l| {
            info.flags
                .iter()
                .find(|(target, _)| target == l)
                .map(|(_, f)| f.clone())
        });
        // `not redirect` keeps re-entry from re-matching by selector.
        let mut cond = LuaExpr::binary(
            LuaBinaryOp::And,
            LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::name(redirect)),
            LuaExpr::paren(test),
        );
        if let Some(flag) = flag {
            cond = LuaExpr::binary(LuaBinaryOp::Or, LuaExpr::name(flag), cond);
        }
        Ok(cond)
    }

    /// The default section's guard when the switch re-dispatches.
    fn dispatch_guard(ctx: &Transformer, label: &SwitchLabel) -> Option<LuaExpr> {
        let info = ctx.breakables.iter().rev().find_map(|b| match b {
            Breakable::Switch {
                dispatch: Some(info),
                ..
            } => Some(info),
            _ => None,
        })?;
        let base = LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::name(info.redirect.clone()));
        let flag = info
            .flags
            .iter()
            .find(|(target, _)| target == label)
            .map(|(_, f)| f.clone());
        Some(match flag {
            Some(flag) => LuaExpr::binary(LuaBinaryOp::Or, LuaExpr::name(flag), base),
            None => base,
        })
    }

    fn lower_section_body(ctx: &mut Transformer, section: &SwitchSection) -> EmitResult<LuaBlock> {
        ctx.with_block(|ctx| {
            let mut stmts = section.body.as_slice();
            // The terminal break only ends the section.
            if matches!(stmts.last(), Some(Stmt::Break(_))) {
                stmts = &stmts[..stmts.len() - 1];
            }
            for stmt in stmts {
                Self::lower(ctx, stmt)?;
            }
            Ok(())
        })
    }

    /// Labels targeted by a `goto case`/`goto default` anywhere in the
    /// sections, excluding nested switches (their gotos bind inward).
    fn goto_case_targets(sections: &[SwitchSection]) -> Vec<SwitchLabel> {
        let mut targets = Vec::new();
        fn walk(stmts: &[Stmt], targets: &mut Vec<SwitchLabel>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Goto(g) => {
                        let label = match &g.target {
                            GotoTarget::Case(v) => SwitchLabel::Case(v.clone()),
                            GotoTarget::Default => SwitchLabel::Default,
                            GotoTarget::Label(_) => continue,
                        };
                        if !targets.contains(&label) {
                            targets.push(label);
                        }
                    }
                    Stmt::Block(b) => walk(&b.statements, targets),
                    Stmt::If(i) => {
                        walk(&i.then_branch.statements, targets);
                        if let Some(e) = &i.else_branch {
                            walk(std::slice::from_ref(e), targets);
                        }
                    }
                    Stmt::While(w) => walk(&w.body.statements, targets),
                    Stmt::DoWhile(w) => walk(&w.body.statements, targets),
                    Stmt::For(f) => walk(&f.body.statements, targets),
                    Stmt::ForEach(f) => walk(&f.body.statements, targets),
                    Stmt::Try(t) => {
                        walk(&t.block.statements, targets);
                        for c in &t.catches {
                            walk(&c.body.statements, targets);
                        }
                        if let Some(f) = &t.finally {
                            walk(&f.statements, targets);
                        }
                    }
                    Stmt::Using(u) => walk(&u.body.statements, targets),
                    Stmt::Lock(l) => walk(&l.body.statements, targets),
                    Stmt::Unsafe(u) => walk(&u.body.statements, targets),
                    Stmt::Labeled(l) => walk(std::slice::from_ref(&*l.stmt), targets),
                    // A nested switch swallows its own goto-case targets.
                    Stmt::Switch(_) => {}
                    _ => {}
                }
            }
        }
        for section in sections {
            walk(&section.body, &mut targets);
        }
        targets
    }

    fn lower_goto(
        ctx: &mut Transformer,
        target: &GotoTarget,
        span: TextRange,
    ) -> EmitResult<()> {
        match target {
            GotoTarget::Label(name) => {
                if ctx.options.classic {
                    return Err(ctx.unsupported("goto in the classic dialect", span));
                }
                ctx.push_stmt(LuaStmt::Goto(escape_identifier(name)));
                Ok(())
            }
            GotoTarget::Case(_) | GotoTarget::Default => {
                let wanted = match target {
                    GotoTarget::Case(v) => SwitchLabel::Case(v.clone()),
                    _ => SwitchLabel::Default,
                };
                let info = ctx.breakables.iter().rev().find_map(|b| match b {
                    Breakable::Switch {
                        dispatch: Some(info),
                        ..
                    } => Some(info),
                    _ => None,
                });
                let Some(info) = info else {
                    return Err(ctx.contract("goto case outside a switch", span));
                };
                let flag = info
                    .flags
                    .iter()
                    .find(|(target, _)| *target == wanted)
                    .map(|(_, f)| f.clone())
                    .ok_or_else(|| ctx.contract("goto case with no matching label", span))?;
                let adapter = GotoCaseAdapter {
                    flags: vec![flag, info.redirect.clone()],
                    label: info.label.clone(),
                };
                ctx.push_stmt(LuaStmt::GotoCaseAdapter(adapter));
                Ok(())
            }
        }
    }
}
