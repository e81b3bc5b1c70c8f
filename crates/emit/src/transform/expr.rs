//! Expression lowering.

use crate::error::EmitResult;
use crate::lua::stmt::IfStmt;
use crate::lua::{FunctionExpr, LuaBinaryOp, LuaExpr, LuaStmt, LuaUnaryOp, PropertyAdapter, TableItem};
use crate::runtime;
use crate::template;
use crate::transform::context::Transformer;
use crate::transform::stmt::StmtLowering;
use sharplua_semantic::expr::{
    AccessLink, AnonymousObjectExpr, ArrayCreationExpr, AssignmentExpr, BinaryExpr, BinaryOp,
    CastExpr, CastKind, ConditionalAccessExpr, ConditionalExpr, Expr, InitializerEntry,
    InterpolatedExpr, InterpolationPart, InvocationExpr, IsExpr, LambdaBody, LambdaExpr, LinkKind,
    MemberExpr, ObjectCreationExpr, TupleExpr, UnaryOp,
};
use sharplua_semantic::symbol::{ParamInfo, ParamMode, SymbolKind, TypeKind};
use sharplua_semantic::types::SpecialType;
use sharplua_semantic::{ConstValue, SymbolId, TypeRef};
use smallvec::SmallVec;
use text_size::TextRange;

pub struct ExprLowering;

impl ExprLowering {
    pub fn lower(ctx: &mut Transformer, expr: &Expr) -> EmitResult<LuaExpr> {
        match expr {
            Expr::Literal(e) => Ok(ctx.const_expr(&e.value)),
            Expr::Identifier(e) => Self::lower_symbol_read(ctx, None, e.symbol, e.span),
            Expr::This(_) => Ok(LuaExpr::name("this")),
            Expr::Base(e) => Err(ctx.contract("`base` outside a member access", e.span)),
            Expr::Member(e) => Self::lower_member(ctx, e),
            Expr::Index(e) => Self::lower_index_read(ctx, e),
            Expr::Invocation(e) => Self::lower_invocation(ctx, e),
            Expr::ObjectCreation(e) => Self::lower_object_creation(ctx, e),
            Expr::ArrayCreation(e) => Self::lower_array_creation(ctx, e),
            Expr::AnonymousObject(e) => Self::lower_anonymous(ctx, e),
            Expr::DelegateCreation(e) => Self::lower(ctx, &e.inner),
            Expr::Lambda(e) => Self::lower_lambda(ctx, e),
            Expr::Binary(e) => Self::lower_binary(ctx, e),
            Expr::Unary(e) => Self::lower_unary(ctx, e),
            Expr::Assignment(e) => Self::lower_assignment_value(ctx, e),
            Expr::Conditional(e) => Self::lower_conditional(ctx, e),
            Expr::ConditionalAccess(e) => Self::lower_conditional_access(ctx, e, false),
            Expr::Interpolated(e) => Self::lower_interpolated(ctx, e),
            Expr::Tuple(e) => Self::lower_tuple_value(ctx, e),
            Expr::TypeOf(e) => {
                ctx.mark_enum_export(&e.target);
                let ty = ctx.type_expr(&e.target)?;
                Ok(LuaExpr::rt_call(runtime::TYPEOF, vec![ty]))
            }
            Expr::SizeOf(e) => {
                if let Some(v) = e.value {
                    return Ok(LuaExpr::int(v as i64));
                }
                match e.target.special().and_then(SpecialType::size_of) {
                    Some(v) => Ok(LuaExpr::int(v as i64)),
                    None => Err(ctx.unsupported("sizeof on a non-primitive type", e.span)),
                }
            }
            Expr::Default(e) => Self::lower_default(ctx, &e.target, e.value.as_ref()),
            Expr::NameOf(e) => Ok(LuaExpr::string(e.name.clone())),
            Expr::Is(e) => Self::lower_is(ctx, e),
            Expr::As(e) => {
                let operand = Self::lower(ctx, &e.operand)?;
                let ty = ctx.type_expr(&e.target)?;
                Ok(LuaExpr::rt_call(runtime::AS, vec![operand, ty]))
            }
            Expr::Cast(e) => Self::lower_cast(ctx, e),
            Expr::StackAlloc(e) => {
                let ty = ctx.type_expr(&e.element)?;
                let size = Self::lower(ctx, &e.size)?;
                Ok(LuaExpr::rt_call(runtime::STACKALLOC, vec![ty, size]))
            }
            Expr::Paren(e) => {
                let inner = Self::lower(ctx, &e.inner)?;
                Ok(LuaExpr::paren(inner))
            }
        }
    }

    /// Read access through a symbol, with or without an explicit receiver.
    fn lower_symbol_read(
        ctx: &mut Transformer,
        target: Option<&Expr>,
        symbol: SymbolId,
        span: TextRange,
    ) -> EmitResult<LuaExpr> {
        let data = ctx.arena.get(symbol).clone();
        match &data.kind {
            SymbolKind::Local(_) | SymbolKind::Parameter(_) => {
                let name = ctx.names.lua_name(ctx.arena, symbol)?;
                Ok(LuaExpr::name(name))
            }
            SymbolKind::Namespace => {
                Ok(LuaExpr::name(sharplua_semantic::qualified_name(
                    ctx.arena, symbol,
                )))
            }
            SymbolKind::Type(_) => {
                let path = ctx.names.type_path(ctx.arena, symbol)?;
                Ok(LuaExpr::name(path))
            }
            SymbolKind::Field(info) => {
                // Constants fold at the use site.
                if let Some(value) = &info.const_value {
                    return Ok(ctx.const_expr(value));
                }
                let name = ctx.names.lua_name(ctx.arena, symbol)?;
                let receiver = Self::receiver(ctx, target, data.is_static, data.containing)?;
                Ok(LuaExpr::member(receiver, name))
            }
            SymbolKind::Property(_) => {
                let name = ctx.names.lua_name(ctx.arena, symbol)?;
                let field_like = Self::property_is_field_like(ctx, symbol);
                if Self::is_base_target(target) && !field_like {
                    // Base accessors are called function-style with an
                    // explicit receiver.
                    let base = Self::base_type_path(ctx, data.containing, span)?;
                    let accessor = format!("{}{}", runtime::GET_PREFIX, name);
                    return Ok(LuaExpr::call(
                        LuaExpr::member(LuaExpr::name(base), accessor),
                        vec![LuaExpr::name("this")],
                    ));
                }
                let receiver = Self::receiver(ctx, target, data.is_static, data.containing)?;
                Ok(LuaExpr::Property(PropertyAdapter {
                    target: Some(Box::new(receiver)),
                    name,
                    field_like,
                    colon: !data.is_static,
                }))
            }
            SymbolKind::Event(_) => {
                let name = ctx.names.lua_name(ctx.arena, symbol)?;
                let receiver = Self::receiver(ctx, target, data.is_static, data.containing)?;
                Ok(LuaExpr::member(receiver, name))
            }
            SymbolKind::Method(_) => Self::method_group(ctx, target, symbol),
        }
    }

    fn is_base_target(target: Option<&Expr>) -> bool {
        matches!(target, Some(Expr::Base(_)))
    }

    /// Receiver expression for an instance or static member.
    fn receiver(
        ctx: &mut Transformer,
        target: Option<&Expr>,
        is_static: bool,
        containing: Option<SymbolId>,
    ) -> EmitResult<LuaExpr> {
        if is_static {
            let ty = containing.expect("static member without containing type");
            let path = ctx.names.type_path(ctx.arena, ty)?;
            return Ok(LuaExpr::name(path));
        }
        match target {
            None | Some(Expr::This(_)) | Some(Expr::Base(_)) => Ok(LuaExpr::name("this")),
            Some(t) => Self::lower(ctx, t),
        }
    }

    fn base_type_path(
        ctx: &mut Transformer,
        containing: Option<SymbolId>,
        span: TextRange,
    ) -> EmitResult<String> {
        let ty = containing.ok_or_else(|| ctx.contract("base member without a type", span))?;
        ctx.names.type_path(ctx.arena, ty)
    }

    pub fn property_is_field_like(ctx: &Transformer, symbol: SymbolId) -> bool {
        let data = ctx.arena.get(symbol);
        let SymbolKind::Property(info) = &data.kind else {
            return false;
        };
        info.is_auto
            && !info.is_interface_impl
            && !info.is_overridable
            && !info.is_indexer
            && !ctx.no_field_tagged.contains(&symbol)
            && !ctx.metadata.wants_no_field(ctx.arena, symbol)
    }

    fn lower_member(ctx: &mut Transformer, e: &MemberExpr) -> EmitResult<LuaExpr> {
        Self::lower_symbol_read(ctx, e.target.as_deref(), e.member, e.span)
    }

    /// A method used as a value. Static and extension methods are plain
    /// function values; instance method groups close over their receiver.
    fn is_local_function(ctx: &Transformer, method: SymbolId) -> bool {
        match ctx.arena.get(method).containing {
            Some(c) => matches!(ctx.arena.get(c).kind, SymbolKind::Method(_)),
            None => false,
        }
    }

    fn method_group(
        ctx: &mut Transformer,
        target: Option<&Expr>,
        symbol: SymbolId,
    ) -> EmitResult<LuaExpr> {
        let data = ctx.arena.get(symbol).clone();
        let name = ctx.names.lua_name(ctx.arena, symbol)?;
        if Self::is_local_function(ctx, symbol) {
            return Ok(LuaExpr::name(name));
        }
        let ty = data.containing.expect("method without containing type");
        let path = ctx.names.type_path(ctx.arena, ty)?;
        let is_extension = data
            .as_method()
            .map(|m| m.is_extension)
            .unwrap_or(false);
        if data.is_static || is_extension {
            return Ok(LuaExpr::member(LuaExpr::name(path), name));
        }
        let receiver = Self::receiver(ctx, target, false, data.containing)?;
        let receiver = Self::ensure_simple(ctx, receiver)?;
        let mut func = FunctionExpr::new(Vec::new(), Default::default());
        func.is_vararg = true;
        func.body.push(LuaStmt::Return(vec![LuaExpr::call(
            LuaExpr::method(receiver, name),
            vec![LuaExpr::name("...")],
        )]));
        Ok(LuaExpr::Function(func))
    }

    /// Hoist a non-trivial expression into a temporary so it is evaluated
    /// exactly once.
    fn ensure_simple(ctx: &mut Transformer, expr: LuaExpr) -> EmitResult<LuaExpr> {
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

    fn lower_index_read(
        ctx: &mut Transformer,
        e: &sharplua_semantic::expr::IndexExpr,
    ) -> EmitResult<LuaExpr> {
        let target = Self::lower(ctx, &e.target)?;
        let mut args = Self::lower_all(ctx, &e.args)?;
        match e.indexer {
            // Indexer property: `obj:get(i)`.
            Some(_) => Ok(LuaExpr::call(LuaExpr::method(target, "get"), args)),
            // Array element: `arr:get(i)`.
            None => {
                if args.len() == 1 {
                    let index = args.pop().expect("length checked");
                    Ok(LuaExpr::call(LuaExpr::method(target, "get"), vec![index]))
                } else {
                    Ok(LuaExpr::call(LuaExpr::method(target, "get"), args))
                }
            }
        }
    }

    fn lower_all(ctx: &mut Transformer, exprs: &[Expr]) -> EmitResult<Vec<LuaExpr>> {
        exprs.iter().map(|e| Self::lower(ctx, e)).collect()
    }

    // Invocations

    fn lower_invocation(ctx: &mut Transformer, e: &InvocationExpr) -> EmitResult<LuaExpr> {
        let Some(method) = e.method else {
            // Delegate value invocation.
            let callee = Self::lower(ctx, &e.callee)?;
            let args = Self::lower_all(ctx, &e.args)?;
            return Ok(LuaExpr::call(callee, args));
        };

        if let Some(template) = ctx.metadata.code_template(ctx.arena, method) {
            let template = template.to_string();
            return Self::expand_template(ctx, e, &template);
        }

        let info = ctx
            .arena
            .get(method)
            .as_method()
            .ok_or_else(|| ctx.contract("invocation target is not a method", e.span))?
            .clone();

        if info.params.iter().any(|p| p.mode != ParamMode::Value) {
            return Self::lower_ref_out_call_value(ctx, e, method, &info.params);
        }

        let call = Self::build_call(ctx, e, method, &info.params)?;
        Ok(call)
    }

    /// Build the plain call expression for an invocation, choosing the
    /// callee shape from the resolved method.
    pub fn build_call(
        ctx: &mut Transformer,
        e: &InvocationExpr,
        method: SymbolId,
        params: &[ParamInfo],
    ) -> EmitResult<LuaExpr> {
        let data = ctx.arena.get(method).clone();
        let name = ctx.names.lua_name(ctx.arena, method)?;
        let elided = Self::elide_trailing_defaults(ctx, &e.args, params);
        let mut args = Self::pack_params(ctx, elided, params)?;

        // A local function lives in its block, not on a type.
        if Self::is_local_function(ctx, method) {
            return Ok(LuaExpr::call(LuaExpr::name(name), args));
        }

        let is_extension = data.as_method().map(|m| m.is_extension).unwrap_or(false);
        let member_target = match &*e.callee {
            Expr::Member(m) => m.target.as_deref(),
            _ => None,
        };

        if is_extension {
            let ty = data.containing.expect("extension method without type");
            let path = ctx.names.type_path(ctx.arena, ty)?;
            let receiver = Self::receiver(ctx, member_target, false, data.containing)?;
            let mut full = vec![receiver];
            full.append(&mut args);
            return Ok(LuaExpr::call(
                LuaExpr::member(LuaExpr::name(path), name),
                full,
            ));
        }
        if Self::is_base_target(member_target) {
            let base = Self::base_type_path(ctx, data.containing, e.span)?;
            let mut full = vec![LuaExpr::name("this")];
            full.append(&mut args);
            return Ok(LuaExpr::call(
                LuaExpr::member(LuaExpr::name(base), name),
                full,
            ));
        }
        if data.is_static {
            let ty = data.containing.expect("static method without type");
            let path = ctx.names.type_path(ctx.arena, ty)?;
            return Ok(LuaExpr::call(
                LuaExpr::member(LuaExpr::name(path), name),
                args,
            ));
        }
        let receiver = Self::receiver(ctx, member_target, false, data.containing)?;
        Ok(LuaExpr::call(LuaExpr::method(receiver, name), args))
    }

    /// Drop trailing arguments equal to their parameter's default,
    /// including the structural nil default of nil-able parameter types.
    /// The overload is already resolved, so elision cannot change dispatch.
    fn elide_trailing_defaults<'e>(
        ctx: &Transformer,
        args: &'e [Expr],
        params: &[ParamInfo],
    ) -> &'e [Expr] {
        let mut keep = args.len();
        while keep > 0 {
            let arg = &args[keep - 1];
            let Some(param) = params.get(keep - 1) else {
                break;
            };
            let matches_default = match &param.default {
                Some(d) => matches!(arg, Expr::Literal(l) if &l.value == d),
                None => arg.is_null_literal() && param.ty.is_nil_defaulted(ctx.arena),
            };
            if matches_default {
                keep -= 1;
            } else {
                break;
            }
        }
        &args[..keep]
    }

    /// Lower arguments, packing the `params` tail into a runtime array.
    fn pack_params(
        ctx: &mut Transformer,
        args: &[Expr],
        params: &[ParamInfo],
    ) -> EmitResult<Vec<LuaExpr>> {
        let packs = params.last().map(|p| p.is_params).unwrap_or(false);
        if !packs {
            return Self::lower_all(ctx, args);
        }
        let fixed = params.len() - 1;
        // A single argument already of the array type passes through.
        if args.len() == params.len() {
            if let Some(last) = args.last() {
                if matches!(last.ty(), TypeRef::Array(_)) {
                    return Self::lower_all(ctx, args);
                }
            }
        }
        let mut lowered = Self::lower_all(ctx, &args[..fixed.min(args.len())])?;
        if args.len() >= fixed {
            let rest = Self::lower_all(ctx, &args[fixed..])?;
            let element = match &params[fixed].ty {
                TypeRef::Array(a) => ctx.type_expr(&a.element)?,
                other => ctx.type_expr(other)?,
            };
            let items = rest.into_iter().map(TableItem::Value).collect();
            lowered.push(LuaExpr::call(
                LuaExpr::rt_call(runtime::ARRAY, vec![element]),
                vec![LuaExpr::Table(items)],
            ));
        }
        Ok(lowered)
    }

    /// A call with `ref`/`out` arguments in value position: hoist the
    /// multi-assignment, yield the primary return.
    fn lower_ref_out_call_value(
        ctx: &mut Transformer,
        e: &InvocationExpr,
        method: SymbolId,
        params: &[ParamInfo],
    ) -> EmitResult<LuaExpr> {
        if !ctx.in_function() {
            return Err(ctx.unsupported("ref/out call outside a function body", e.span));
        }
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
        let targets = Self::ref_out_targets(ctx, e, params, ret.clone())?;
        let call = Self::build_ref_out_call(ctx, e, method, params)?;
        if let Some(ret) = &ret {
            ctx.push_stmt(LuaStmt::Local {
                names: vec![ret.clone()],
                values: Vec::new(),
            });
        }
        ctx.push_stmt(LuaStmt::Assign {
            targets,
            values: vec![call],
        });
        Ok(match ret {
            Some(ret) => LuaExpr::name(ret),
            None => LuaExpr::nil(),
        })
    }

    /// The assignment targets receiving a ref/out call's returns: the
    /// primary value first, then each ref/out argument in order.
    pub fn ref_out_targets(
        ctx: &mut Transformer,
        e: &InvocationExpr,
        params: &[ParamInfo],
        ret: Option<String>,
    ) -> EmitResult<Vec<LuaExpr>> {
        let mut targets = Vec::new();
        if let Some(ret) = ret {
            targets.push(LuaExpr::name(ret));
        }
        for (arg, param) in e.args.iter().zip(params) {
            if param.mode == ParamMode::Value {
                continue;
            }
            let lowered = Self::lower(ctx, arg)?;
            let assignable = matches!(
                lowered,
                LuaExpr::Name(_) | LuaExpr::Member(_) | LuaExpr::Property(_)
            );
            if !assignable {
                return Err(ctx.unsupported("non-assignable ref/out argument", arg.span()));
            }
            targets.push(lowered);
        }
        Ok(targets)
    }

    /// Build the callee side of a ref/out call; `out` arguments pass nil
    /// placeholders to keep positions stable.
    pub fn build_ref_out_call(
        ctx: &mut Transformer,
        e: &InvocationExpr,
        method: SymbolId,
        params: &[ParamInfo],
    ) -> EmitResult<LuaExpr> {
        let mut adjusted = e.clone();
        for (arg, param) in adjusted.args.iter_mut().zip(params) {
            if param.mode == ParamMode::Out {
                *arg = sharplua_semantic::build::null(param.ty.clone());
            }
        }
        Self::build_call(ctx, &adjusted, method, params)
    }

    // Object creation

    fn lower_object_creation(ctx: &mut Transformer, e: &ObjectCreationExpr) -> EmitResult<LuaExpr> {
        if let Some(ctor) = e.ctor {
            if let Some(template) = ctx.metadata.code_template(ctx.arena, ctor) {
                let template = template.to_string();
                let args = Self::lower_all(ctx, &e.args)?;
                let location = ctx.location(e.span);
                let rendered = Self::render_args(ctx, &args);
                return template::expand(&template, None, &rendered, &[], location)
                    .map(LuaExpr::verbatim);
            }
        }

        if let TypeRef::Nullable(_) = &e.ty {
            // Nullable wrapping is the identity.
            return match e.args.first() {
                Some(inner) => Self::lower(ctx, inner),
                None => Ok(LuaExpr::nil()),
            };
        }
        if let TypeRef::Tuple(_) = &e.ty {
            let items = Self::lower_all(ctx, &e.args)?
                .into_iter()
                .map(TableItem::Value)
                .collect();
            return Ok(LuaExpr::call(
                LuaExpr::name(runtime::VALUE_TUPLE_CREATE),
                vec![LuaExpr::Table(items)],
            ));
        }
        if let TypeRef::Named(n) = &e.ty {
            if matches!(
                ctx.arena.get(n.symbol).as_type(),
                Some(info) if info.kind == TypeKind::Delegate
            ) {
                return match e.args.first() {
                    Some(inner) => Self::lower(ctx, inner),
                    None => Err(ctx.contract("delegate creation without an argument", e.span)),
                };
            }
        }

        let type_expr = ctx.type_expr(&e.ty)?;
        let args = {
            let params: SmallVec<[ParamInfo; 4]> = e
                .ctor
                .and_then(|c| ctx.arena.get(c).as_method().map(|m| m.params.clone()))
                .unwrap_or_default();
            let elided = Self::elide_trailing_defaults(ctx, &e.args, &params);
            Self::lower_all(ctx, elided)?
        };
        let ctor_index = e
            .ctor
            .and_then(|c| ctx.arena.get(c).as_method().map(|m| m.ctor_index))
            .unwrap_or(0);

        // First (or only) constructor: call the type table. Later
        // overloads: allocate through the runtime with the frozen index.
        let creation = if ctor_index <= 1 {
            LuaExpr::call(type_expr, args)
        } else {
            let mut full = vec![type_expr, LuaExpr::int(ctor_index as i64)];
            full.extend(args);
            LuaExpr::rt_call(runtime::NEW, full)
        };

        match &e.initializer {
            None => Ok(creation),
            Some(init) => {
                let closure = Self::initializer_closure(ctx, &init.entries)?;
                Ok(LuaExpr::rt_call(runtime::CREATE, vec![creation, closure]))
            }
        }
    }

    /// The initializer closure: one temporary `t`, a statement per entry,
    /// no return; the runtime threads `t` back.
    fn initializer_closure(
        ctx: &mut Transformer,
        entries: &[InitializerEntry],
    ) -> EmitResult<LuaExpr> {
        let (body, _) = ctx.with_function(None, false, |ctx| {
            for entry in entries {
                match entry {
                    InitializerEntry::Member { member, value } => {
                        let value = Self::lower(ctx, value)?;
                        let name = ctx.names.lua_name(ctx.arena, *member)?;
                        let field_like = match &ctx.arena.get(*member).kind {
                            SymbolKind::Property(_) => Self::property_is_field_like(ctx, *member),
                            _ => true,
                        };
                        ctx.push_stmt(LuaStmt::Assign {
                            targets: vec![LuaExpr::Property(PropertyAdapter {
                                target: Some(Box::new(LuaExpr::name("t"))),
                                name,
                                field_like,
                                colon: true,
                            })],
                            values: vec![value],
                        });
                    }
                    InitializerEntry::Index { args, value } => {
                        let mut call_args = Self::lower_all(ctx, args)?;
                        call_args.push(Self::lower(ctx, value)?);
                        ctx.push_stmt(LuaStmt::Expr(LuaExpr::call(
                            LuaExpr::method(LuaExpr::name("t"), "set"),
                            call_args,
                        )));
                    }
                    InitializerEntry::Add { args } => {
                        let call_args = Self::lower_all(ctx, args)?;
                        ctx.push_stmt(LuaStmt::Expr(LuaExpr::call(
                            LuaExpr::method(LuaExpr::name("t"), "Add"),
                            call_args,
                        )));
                    }
                }
            }
            Ok(())
        })?;
        Ok(LuaExpr::Function(FunctionExpr::new(
            vec!["t".to_string()],
            body,
        )))
    }

    fn lower_array_creation(ctx: &mut Transformer, e: &ArrayCreationExpr) -> EmitResult<LuaExpr> {
        let element = ctx.type_expr(&e.element)?;
        let array_type = if e.rank <= 1 {
            LuaExpr::rt_call(runtime::ARRAY, vec![element])
        } else {
            LuaExpr::rt_call(
                runtime::MULTI_ARRAY,
                vec![element, LuaExpr::int(e.rank as i64)],
            )
        };
        match &e.initializer {
            Some(items) => {
                let mut table = Vec::new();
                if e.rank > 1 {
                    for size in &e.sizes {
                        table.push(TableItem::Value(Self::lower(ctx, size)?));
                    }
                }
                for item in items {
                    table.push(TableItem::Value(Self::lower(ctx, item)?));
                }
                Ok(LuaExpr::call(array_type, vec![LuaExpr::Table(table)]))
            }
            None => {
                let sizes = Self::lower_all(ctx, &e.sizes)?;
                Ok(LuaExpr::call(LuaExpr::method(array_type, "new"), sizes))
            }
        }
    }

    fn lower_anonymous(ctx: &mut Transformer, e: &AnonymousObjectExpr) -> EmitResult<LuaExpr> {
        let mut items = Vec::new();
        for field in &e.fields {
            let value = Self::lower(ctx, &field.value)?;
            items.push(TableItem::StrKey {
                name: field.name.clone(),
                value,
            });
        }
        Ok(LuaExpr::call(
            LuaExpr::name(runtime::ANONYMOUS_TYPE_CREATE),
            vec![LuaExpr::Table(items)],
        ))
    }

    fn lower_lambda(ctx: &mut Transformer, e: &LambdaExpr) -> EmitResult<LuaExpr> {
        let mut params = Vec::new();
        let mut ref_out = Vec::new();
        for p in &e.params {
            let name = ctx.names.lua_name(ctx.arena, p.symbol)?;
            if p.mode != ParamMode::Value {
                ref_out.push(name.clone());
            }
            params.push(name);
        }
        let returns_void = match &e.body {
            LambdaBody::Expr(inner) => inner.ty().is_void(),
            LambdaBody::Block(_) => true,
        };
        let frame = crate::transform::context::MethodFrame {
            symbol: None,
            returns_void,
            ref_out,
        };
        let body = e.body.clone();
        let (block, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(None, false, |ctx| match &body {
                LambdaBody::Expr(inner) => {
                    let value = Self::lower(ctx, inner)?;
                    if inner.ty().is_void() {
                        ctx.push_stmt(LuaStmt::Expr(value));
                    } else {
                        ctx.push_stmt(LuaStmt::Return(vec![value]));
                    }
                    Ok(())
                }
                LambdaBody::Block(block) => StmtLowering::lower_block_into(ctx, block),
            })
        })?;
        Ok(LuaExpr::Function(FunctionExpr::new(params, block)))
    }

    // Operators

    fn lower_binary(ctx: &mut Transformer, e: &BinaryExpr) -> EmitResult<LuaExpr> {
        if let Some(method) = e.operator_method {
            let left = Self::lower(ctx, &e.left)?;
            let right = Self::lower(ctx, &e.right)?;
            return Self::operator_call(ctx, method, vec![left, right]);
        }
        if e.op == BinaryOp::Coalesce {
            return Self::lower_coalesce(ctx, e);
        }

        let left_ty = e.left.ty();
        let right_ty = e.right.ty();
        let left = Self::lower(ctx, &e.left)?;
        let right = Self::lower(ctx, &e.right)?;

        let both_integral = left_ty.special().map(SpecialType::is_integral).unwrap_or(false)
            && right_ty.special().map(SpecialType::is_integral).unwrap_or(false);

        let op = match e.op {
            BinaryOp::Add => {
                if left_ty.is_string() || right_ty.is_string() {
                    let left = Self::concat_operand(left, &left_ty);
                    let right = Self::concat_operand(right, &right_ty);
                    return Ok(LuaExpr::binary(LuaBinaryOp::Concat, left, right));
                }
                LuaBinaryOp::Add
            }
            BinaryOp::Sub => LuaBinaryOp::Sub,
            BinaryOp::Mul => LuaBinaryOp::Mul,
            BinaryOp::Div => {
                if both_integral {
                    LuaBinaryOp::IDiv
                } else {
                    LuaBinaryOp::Div
                }
            }
            BinaryOp::Mod => {
                // Source remainder truncates toward zero; Lua `%` floors.
                let helper = if both_integral {
                    runtime::MOD
                } else {
                    runtime::FMOD
                };
                return Ok(LuaExpr::rt_call(helper, vec![left, right]));
            }
            BinaryOp::And => LuaBinaryOp::And,
            BinaryOp::Or => LuaBinaryOp::Or,
            BinaryOp::BitAnd => LuaBinaryOp::BAnd,
            BinaryOp::BitOr => LuaBinaryOp::BOr,
            BinaryOp::BitXor => LuaBinaryOp::BXor,
            BinaryOp::Shl => LuaBinaryOp::Shl,
            BinaryOp::Shr => LuaBinaryOp::Shr,
            BinaryOp::Eq => LuaBinaryOp::Eq,
            BinaryOp::Ne => LuaBinaryOp::Ne,
            BinaryOp::Lt => LuaBinaryOp::Lt,
            BinaryOp::Le => LuaBinaryOp::Le,
            BinaryOp::Gt => LuaBinaryOp::Gt,
            BinaryOp::Ge => LuaBinaryOp::Ge,
            BinaryOp::Coalesce => unreachable!("handled above"),
        };
        Ok(LuaExpr::binary(op, left, right))
    }

    fn concat_operand(expr: LuaExpr, ty: &TypeRef) -> LuaExpr {
        let simple = ty.is_string()
            || ty.special().map(SpecialType::is_numeric).unwrap_or(false);
        if simple {
            expr
        } else {
            LuaExpr::rt_call(runtime::TO_STRING, vec![expr])
        }
    }

    /// `a ?? b`: `a or b` when `a` can never be `false`, otherwise an
    /// explicit nil test through a temporary.
    fn lower_coalesce(ctx: &mut Transformer, e: &BinaryExpr) -> EmitResult<LuaExpr> {
        if !e.left.ty().can_be_false() {
            let left = Self::lower(ctx, &e.left)?;
            let right = Self::lower(ctx, &e.right)?;
            return Ok(LuaExpr::binary(LuaBinaryOp::Or, left, right));
        }
        if !ctx.in_function() {
            return Self::iife(ctx, |ctx| {
                let value = Self::lower_coalesce_hoisted(ctx, e)?;
                ctx.push_stmt(LuaStmt::Return(vec![value]));
                Ok(())
            });
        }
        Self::lower_coalesce_hoisted(ctx, e)
    }

    fn lower_coalesce_hoisted(ctx: &mut Transformer, e: &BinaryExpr) -> EmitResult<LuaExpr> {
        let left = Self::lower(ctx, &e.left)?;
        let temp = ctx.alloc_temp();
        ctx.push_stmt(LuaStmt::Local {
            names: vec![temp.clone()],
            values: vec![left],
        });
        let fallback = ctx.with_block(|ctx| {
            let right = Self::lower(ctx, &e.right)?;
            ctx.push_stmt(LuaStmt::Assign {
                targets: vec![LuaExpr::name(temp.clone())],
                values: vec![right],
            });
            Ok(())
        })?;
        ctx.push_stmt(LuaStmt::If(IfStmt::new(
            LuaExpr::eq_nil(LuaExpr::name(temp.clone())),
            fallback,
        )));
        Ok(LuaExpr::name(temp))
    }

    fn operator_call(
        ctx: &mut Transformer,
        method: SymbolId,
        args: Vec<LuaExpr>,
    ) -> EmitResult<LuaExpr> {
        let data = ctx.arena.get(method).clone();
        let ty = data.containing.expect("operator without containing type");
        let path = ctx.names.type_path(ctx.arena, ty)?;
        let name = data
            .as_method()
            .and_then(|m| m.operator)
            .map(|op| op.method_name().to_string())
            .unwrap_or(data.name.clone());
        Ok(LuaExpr::call(
            LuaExpr::member(LuaExpr::name(path), name),
            args,
        ))
    }

    fn lower_unary(ctx: &mut Transformer, e: &sharplua_semantic::expr::UnaryExpr) -> EmitResult<LuaExpr> {
        if let Some(method) = e.operator_method {
            let operand = Self::lower(ctx, &e.operand)?;
            return Self::operator_call(ctx, method, vec![operand]);
        }
        let operand = Self::lower(ctx, &e.operand)?;
        let op = match e.op {
            UnaryOp::Neg => LuaUnaryOp::Neg,
            UnaryOp::Not => LuaUnaryOp::Not,
            UnaryOp::BitNot => LuaUnaryOp::BNot,
        };
        Ok(LuaExpr::unary(op, operand))
    }

    /// Assignment in value position: emit the assignment, read the target
    /// back.
    fn lower_assignment_value(ctx: &mut Transformer, e: &AssignmentExpr) -> EmitResult<LuaExpr> {
        StmtLowering::lower_assign(ctx, &e.target, e.op, &e.value)?;
        Self::lower(ctx, &e.target)
    }

    fn lower_conditional(ctx: &mut Transformer, e: &ConditionalExpr) -> EmitResult<LuaExpr> {
        // `cond and a or b` is only sound when `a` can be neither false
        // nor nil.
        let safe = !e.when_true.ty().can_be_false()
            && !e.when_true.ty().is_nil_defaulted(ctx.arena);
        if safe {
            let cond = Self::lower(ctx, &e.condition)?;
            let when_true = Self::lower(ctx, &e.when_true)?;
            let when_false = Self::lower(ctx, &e.when_false)?;
            return Ok(LuaExpr::binary(
                LuaBinaryOp::Or,
                LuaExpr::binary(LuaBinaryOp::And, cond, when_true),
                when_false,
            ));
        }
        if !ctx.in_function() {
            return Self::iife(ctx, |ctx| {
                let value = Self::lower_conditional_hoisted(ctx, e)?;
                ctx.push_stmt(LuaStmt::Return(vec![value]));
                Ok(())
            });
        }
        Self::lower_conditional_hoisted(ctx, e)
    }

    fn lower_conditional_hoisted(
        ctx: &mut Transformer,
        e: &ConditionalExpr,
    ) -> EmitResult<LuaExpr> {
        let temp = ctx.alloc_temp();
        ctx.push_stmt(LuaStmt::Local {
            names: vec![temp.clone()],
            values: Vec::new(),
        });
        let cond = Self::lower(ctx, &e.condition)?;
        let then_block = ctx.with_block(|ctx| {
            let v = Self::lower(ctx, &e.when_true)?;
            ctx.push_stmt(LuaStmt::Assign {
                targets: vec![LuaExpr::name(temp.clone())],
                values: vec![v],
            });
            Ok(())
        })?;
        let else_block = ctx.with_block(|ctx| {
            let v = Self::lower(ctx, &e.when_false)?;
            ctx.push_stmt(LuaStmt::Assign {
                targets: vec![LuaExpr::name(temp.clone())],
                values: vec![v],
            });
            Ok(())
        })?;
        let mut stmt = IfStmt::new(cond, then_block);
        stmt.else_block = Some(else_block);
        ctx.push_stmt(LuaStmt::If(stmt));
        Ok(LuaExpr::name(temp))
    }

    /// Wrap a statement-building closure into an immediately-invoked
    /// function, for value contexts with no surrounding function.
    fn iife<F>(ctx: &mut Transformer, f: F) -> EmitResult<LuaExpr>
    where
        F: FnOnce(&mut Transformer) -> EmitResult<()>,
    {
        let (body, _) = ctx.with_function(None, false, f)?;
        Ok(LuaExpr::call(
            LuaExpr::paren(LuaExpr::Function(FunctionExpr::new(Vec::new(), body))),
            Vec::new(),
        ))
    }

    // Conditional access

    /// Lower a `?.` chain. With `as_statement` the final link's value is
    /// discarded and no trailing assignment is emitted.
    pub fn lower_conditional_access(
        ctx: &mut Transformer,
        e: &ConditionalAccessExpr,
        as_statement: bool,
    ) -> EmitResult<LuaExpr> {
        if !ctx.in_function() && !as_statement {
            return Self::iife(ctx, |ctx| {
                let value = Self::lower_chain(ctx, e, false)?;
                ctx.push_stmt(LuaStmt::Return(vec![value]));
                Ok(())
            });
        }
        Self::lower_chain(ctx, e, as_statement)
    }

    fn lower_chain(
        ctx: &mut Transformer,
        e: &ConditionalAccessExpr,
        as_statement: bool,
    ) -> EmitResult<LuaExpr> {
        let root = Self::lower(ctx, &e.root)?;
        let temp = ctx.alloc_temp();
        ctx.push_stmt(LuaStmt::Local {
            names: vec![temp.clone()],
            values: vec![root],
        });
        ctx.push_cond_temp(temp.clone());

        // Group links into guarded runs: each conditional link opens a
        // fresh nil test; following unconditional links ride along.
        let mut runs: Vec<&[AccessLink]> = Vec::new();
        let mut start = 0usize;
        for (i, link) in e.links.iter().enumerate() {
            if link.conditional && i != start {
                runs.push(&e.links[start..i]);
                start = i;
            }
        }
        if start < e.links.len() {
            runs.push(&e.links[start..]);
        }

        let total = runs.len();
        let mut result = Ok(LuaExpr::name(temp.clone()));
        for (i, run) in runs.into_iter().enumerate() {
            let last = i + 1 == total;
            let temp_name = temp.clone();
            let guarded = ctx.with_block(|ctx| {
                let mut value = LuaExpr::name(temp_name.clone());
                for link in run {
                    value = Self::apply_link(ctx, value, link)?;
                }
                if last && as_statement {
                    ctx.push_stmt(LuaStmt::Expr(value));
                } else {
                    ctx.push_stmt(LuaStmt::Assign {
                        targets: vec![LuaExpr::name(temp_name.clone())],
                        values: vec![value],
                    });
                }
                Ok(())
            });
            match guarded {
                Ok(block) => {
                    ctx.push_stmt(LuaStmt::If(IfStmt::new(
                        LuaExpr::ne_nil(LuaExpr::name(temp.clone())),
                        block,
                    )));
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        ctx.pop_cond_temp();
        result?;
        Ok(LuaExpr::name(temp))
    }

    fn apply_link(
        ctx: &mut Transformer,
        value: LuaExpr,
        link: &AccessLink,
    ) -> EmitResult<LuaExpr> {
        match &link.kind {
            LinkKind::Member { member } => {
                let data = ctx.arena.get(*member).clone();
                let name = ctx.names.lua_name(ctx.arena, *member)?;
                match &data.kind {
                    SymbolKind::Property(_) if !Self::property_is_field_like(ctx, *member) => Ok(
                        LuaExpr::call(
                            LuaExpr::method(value, format!("{}{}", runtime::GET_PREFIX, name)),
                            Vec::new(),
                        ),
                    ),
                    SymbolKind::Field(info) => {
                        if let Some(c) = &info.const_value {
                            return Ok(ctx.const_expr(c));
                        }
                        Ok(LuaExpr::member(value, name))
                    }
                    _ => Ok(LuaExpr::member(value, name)),
                }
            }
            LinkKind::Index { args } => {
                let args = Self::lower_all(ctx, args)?;
                Ok(LuaExpr::call(LuaExpr::method(value, "get"), args))
            }
            LinkKind::Invoke { args, method } => {
                let args_lua = Self::lower_all(ctx, args)?;
                match method {
                    Some(m) => {
                        let name = ctx.names.lua_name(ctx.arena, *m)?;
                        let data = ctx.arena.get(*m);
                        if data.is_static || data.as_method().map(|i| i.is_extension).unwrap_or(false)
                        {
                            let ty = data.containing.expect("method without type");
                            let path = ctx.names.type_path(ctx.arena, ty)?;
                            let mut full = vec![value];
                            full.extend(args_lua);
                            Ok(LuaExpr::call(
                                LuaExpr::member(LuaExpr::name(path), name),
                                full,
                            ))
                        } else {
                            Ok(LuaExpr::call(LuaExpr::method(value, name), args_lua))
                        }
                    }
                    None => Ok(LuaExpr::call(value, args_lua)),
                }
            }
        }
    }

    // Remaining scalar forms

    fn lower_interpolated(ctx: &mut Transformer, e: &InterpolatedExpr) -> EmitResult<LuaExpr> {
        let mut format = String::new();
        let mut args = Vec::new();
        for part in &e.parts {
            match part {
                InterpolationPart::Text(t) => format.push_str(t),
                InterpolationPart::Expr(inner) => {
                    format.push('{');
                    format.push_str(&args.len().to_string());
                    format.push('}');
                    args.push(Self::lower(ctx, inner)?);
                }
            }
        }
        Ok(LuaExpr::call(
            LuaExpr::method(LuaExpr::string(format), "format"),
            args,
        ))
    }

    fn lower_tuple_value(ctx: &mut Transformer, e: &TupleExpr) -> EmitResult<LuaExpr> {
        let items = Self::lower_all(ctx, &e.elements)?
            .into_iter()
            .map(TableItem::Value)
            .collect();
        Ok(LuaExpr::call(
            LuaExpr::name(runtime::VALUE_TUPLE_CREATE),
            vec![LuaExpr::Table(items)],
        ))
    }

    fn lower_default(
        ctx: &mut Transformer,
        target: &TypeRef,
        value: Option<&ConstValue>,
    ) -> EmitResult<LuaExpr> {
        if let Some(v) = value {
            return Ok(ctx.const_expr(v));
        }
        match target {
            TypeRef::Special(s) if *s != SpecialType::Object && *s != SpecialType::String => {
                Ok(ctx.const_expr(&ConstValue::zero_of(target, ctx.arena)))
            }
            TypeRef::Named(n) => {
                let info = ctx.arena.get(n.symbol).as_type();
                match info.map(|i| i.kind) {
                    Some(TypeKind::Enum) => Ok(LuaExpr::int(0)),
                    Some(TypeKind::Struct) => {
                        let ty = ctx.type_expr(target)?;
                        Ok(LuaExpr::rt_call(runtime::DEFAULT, vec![ty]))
                    }
                    _ => Ok(LuaExpr::nil()),
                }
            }
            TypeRef::TypeParam(_) => {
                let ty = ctx.type_expr(target)?;
                Ok(LuaExpr::rt_call(runtime::DEFAULT, vec![ty]))
            }
            _ => Ok(LuaExpr::nil()),
        }
    }

    fn lower_is(ctx: &mut Transformer, e: &IsExpr) -> EmitResult<LuaExpr> {
        if e.binding.is_some() && !ctx.in_function() {
            return Err(ctx.contract("pattern binding outside a function body", e.span));
        }
        let operand = Self::lower(ctx, &e.operand)?;
        let operand = match e.binding {
            Some(binding) => {
                let name = ctx.names.lua_name(ctx.arena, binding)?;
                ctx.push_stmt(LuaStmt::Local {
                    names: vec![name.clone()],
                    values: vec![operand],
                });
                LuaExpr::name(name)
            }
            None => operand,
        };
        // Statically-provable tests fold to `true`.
        if e.operand.ty().is_subtype_of(&e.target, ctx.arena) {
            return Ok(LuaExpr::bool(true));
        }
        let ty = ctx.type_expr(&e.target)?;
        Ok(LuaExpr::rt_call(runtime::IS, vec![operand, ty]))
    }

    fn lower_cast(ctx: &mut Transformer, e: &CastExpr) -> EmitResult<LuaExpr> {
        if let Some(method) = e.operator_method {
            let operand = Self::lower(ctx, &e.operand)?;
            return Self::operator_call(ctx, method, vec![operand]);
        }
        let operand = Self::lower(ctx, &e.operand)?;
        match e.kind {
            CastKind::Enum => Ok(operand),
            CastKind::Numeric => match e.target.special().and_then(numeric_cast_helper) {
                Some(helper) => Ok(LuaExpr::rt_call(helper, vec![operand])),
                None => Ok(operand),
            },
            CastKind::Reference => {
                let ty = ctx.type_expr(&e.target)?;
                Ok(LuaExpr::rt_call(runtime::CAST, vec![ty, operand]))
            }
        }
    }

    // Template support

    fn expand_template(
        ctx: &mut Transformer,
        e: &InvocationExpr,
        template: &str,
    ) -> EmitResult<LuaExpr> {
        let this = match &*e.callee {
            Expr::Member(m) => match &m.target {
                Some(t) => Some(Self::lower(ctx, t)?),
                None => {
                    let data = ctx.arena.get(m.member);
                    if data.is_static {
                        None
                    } else {
                        Some(LuaExpr::name("this"))
                    }
                }
            },
            _ => None,
        };
        let args = Self::lower_all(ctx, &e.args)?;
        let type_args = e
            .type_args
            .iter()
            .map(|t| ctx.type_expr(t))
            .collect::<EmitResult<Vec<_>>>()?;

        let location = ctx.location(e.span);
        let this_rendered = this.map(|t| Self::render_one(ctx, &t));
        let args_rendered = Self::render_args(ctx, &args);
        let type_args_rendered = Self::render_args(ctx, &type_args);
        template::expand(
            template,
            this_rendered.as_deref(),
            &args_rendered,
            &type_args_rendered,
            location,
        )
        .map(LuaExpr::verbatim)
    }

    fn render_one(ctx: &Transformer, expr: &LuaExpr) -> String {
        let config = crate::render::RenderConfig {
            classic: ctx.options.classic,
            ..Default::default()
        };
        crate::render::render_expr(expr, config)
    }

    fn render_args(ctx: &Transformer, exprs: &[LuaExpr]) -> Vec<String> {
        exprs.iter().map(|e| Self::render_one(ctx, e)).collect()
    }
}

/// Runtime conversion helper for a numeric cast target, when one is needed.
fn numeric_cast_helper(target: SpecialType) -> Option<&'static str> {
    match target {
        SpecialType::SByte => Some("System.toSByte"),
        SpecialType::Byte => Some("System.toByte"),
        SpecialType::Int16 => Some("System.toInt16"),
        SpecialType::UInt16 => Some("System.toUInt16"),
        SpecialType::Int32 => Some("System.toInt32"),
        SpecialType::UInt32 => Some("System.toUInt32"),
        SpecialType::Int64 => Some("System.toInt64"),
        SpecialType::UInt64 => Some("System.toUInt64"),
        _ => None,
    }
}

