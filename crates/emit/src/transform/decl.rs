//! Declaration lowering into the runtime's `System.namespace` /
//! `namespace.class` shape.

use crate::error::EmitResult;
use crate::lua::{
    CtorAdapter, FunctionExpr, LuaBlock, LuaChunk, LuaExpr, LuaMember, LuaStmt, LuaTypeDecl,
    TableItem, TypeDeclKind,
};
use crate::runtime;
use crate::transform::context::{MethodFrame, Transformer};
use crate::transform::expr::ExprLowering;
use crate::transform::stmt::StmtLowering;
use sharplua_semantic::decl::{
    AccessorDecl, CompilationUnit, CtorDecl, CtorInitKind, EventDecl, FieldDecl, MemberDecl,
    MethodDecl, NamespaceDecl, PropertyDecl, TypeDecl, TypeMember, TAG_IGNORE, TAG_NO_FIELD,
};
use sharplua_semantic::expr::Expr;
use sharplua_semantic::symbol::{MethodInfo, SymbolKind, TypeKind};
use sharplua_semantic::types::{ConstValue, SpecialType, TypeRef};
use sharplua_semantic::SymbolId;

pub struct DeclLowering;

impl DeclLowering {
    /// Lower one compilation unit to its output chunk.
    pub fn lower_unit(ctx: &mut Transformer, unit: &CompilationUnit) -> EmitResult<LuaChunk> {
        Self::collect_no_field_tags(ctx, &unit.members);
        let mut chunk = LuaChunk::default();
        chunk.statements.push(LuaStmt::Local {
            names: vec![runtime::SYSTEM.to_string()],
            values: vec![LuaExpr::name(runtime::SYSTEM)],
        });
        chunk.statements.push(LuaStmt::BlankLines(1));

        let mut loose_types = Vec::new();
        for member in &unit.members {
            match member {
                MemberDecl::Namespace(ns) => {
                    let stmt = Self::lower_namespace(ctx, ns, true)?;
                    chunk.statements.push(stmt);
                }
                MemberDecl::Type(decl) => {
                    if let Some(lowered) = Self::lower_type(ctx, decl, None)? {
                        loose_types.push(LuaStmt::TypeDecl(lowered));
                    }
                }
            }
        }
        if !loose_types.is_empty() {
            // Namespace-less types land in the root namespace.
            let closure = FunctionExpr::new(
                vec![runtime::NAMESPACE_PARAM.to_string()],
                LuaBlock::new(loose_types),
            );
            chunk.statements.push(LuaStmt::Expr(LuaExpr::rt_call(
                runtime::NAMESPACE,
                vec![LuaExpr::string(""), LuaExpr::Function(closure)],
            )));
        }

        let exports: Vec<String> = ctx.exported_enums.iter().cloned().collect();
        if !exports.is_empty() {
            chunk.statements.push(LuaStmt::BlankLines(1));
            for name in exports {
                chunk.statements.push(LuaStmt::Expr(LuaExpr::rt_call(
                    runtime::EXPORT_ENUM,
                    vec![LuaExpr::string(name)],
                )));
            }
        }
        Ok(chunk)
    }

    /// Pre-pass recording the no-field doc tag so property read sites in
    /// this unit agree with the declaration's accessor shape.
    fn collect_no_field_tags(ctx: &mut Transformer, members: &[MemberDecl]) {
        fn walk_type(ctx: &mut Transformer, decl: &TypeDecl) {
            for member in &decl.members {
                match member {
                    TypeMember::Property(p) => {
                        let tagged = p
                            .doc
                            .as_ref()
                            .map(|d| d.has_tag(TAG_NO_FIELD))
                            .unwrap_or(false);
                        if tagged {
                            ctx.no_field_tagged.insert(p.symbol);
                        }
                    }
                    TypeMember::Nested(nested) => walk_type(ctx, nested),
                    _ => {}
                }
            }
        }
        for member in members {
            match member {
                MemberDecl::Namespace(ns) => Self::collect_no_field_tags(ctx, &ns.members),
                MemberDecl::Type(decl) => walk_type(ctx, decl),
            }
        }
    }

    fn lower_namespace(
        ctx: &mut Transformer,
        ns: &NamespaceDecl,
        top_level: bool,
    ) -> EmitResult<LuaStmt> {
        let mut body = Vec::new();
        for member in &ns.members {
            match member {
                MemberDecl::Namespace(inner) => {
                    body.push(Self::lower_namespace(ctx, inner, false)?);
                }
                MemberDecl::Type(decl) => {
                    if let Some(lowered) = Self::lower_type(ctx, decl, None)? {
                        body.push(LuaStmt::TypeDecl(lowered));
                    }
                }
            }
        }
        let name = ctx.arena.get(ns.symbol).name.clone();
        let closure = FunctionExpr::new(
            vec![runtime::NAMESPACE_PARAM.to_string()],
            LuaBlock::new(body),
        );
        let callee = if top_level {
            LuaExpr::name(runtime::NAMESPACE)
        } else {
            LuaExpr::member(
                LuaExpr::name(runtime::NAMESPACE_PARAM),
                runtime::NAMESPACE_PARAM,
            )
        };
        Ok(LuaStmt::Expr(LuaExpr::call(
            callee,
            vec![LuaExpr::string(name), LuaExpr::Function(closure)],
        )))
    }

    fn is_ignored(ctx: &Transformer, symbol: SymbolId, doc: Option<&sharplua_semantic::DocComment>) -> bool {
        doc.map(|d| d.has_tag(TAG_IGNORE)).unwrap_or(false)
            || ctx.metadata.is_ignored(ctx.arena, symbol)
    }

    fn lower_type(
        ctx: &mut Transformer,
        decl: &TypeDecl,
        name_override: Option<String>,
    ) -> EmitResult<Option<LuaTypeDecl>> {
        if Self::is_ignored(ctx, decl.symbol, decl.doc.as_ref()) {
            return Ok(None);
        }
        let info = ctx
            .arena
            .get(decl.symbol)
            .as_type()
            .ok_or_else(|| ctx.contract("type declaration on a non-type symbol", decl.span))?
            .clone();
        let kind = match info.kind {
            TypeKind::Class => TypeDeclKind::Class,
            TypeKind::Struct => TypeDeclKind::Struct,
            TypeKind::Interface => TypeDeclKind::Interface,
            TypeKind::Enum => TypeDeclKind::Enum,
            // Delegates are plain functions; their declarations vanish.
            TypeKind::Delegate => return Ok(None),
        };

        let own_name = ctx.names.lua_name(ctx.arena, decl.symbol)?;
        let name = name_override.unwrap_or(own_name.clone());
        let mut lua = LuaTypeDecl::new(name.clone(), kind);
        lua.type_params = info.type_params.clone();
        if let Some(doc) = &decl.doc {
            lua.doc = doc.display_lines().map(str::to_string).collect();
        }

        if let Some(base) = &info.base {
            if !matches!(
                base,
                TypeRef::Special(SpecialType::Object) | TypeRef::Special(SpecialType::ValueType)
            ) {
                let base_expr = ctx.type_expr(base)?;
                lua.inherits.push(base_expr);
            }
        }
        for interface in &info.interfaces {
            let expr = ctx.type_expr(interface)?;
            lua.inherits.push(expr);
        }

        if ctx.options.export_attributes && !decl.attributes.is_empty() {
            let items = decl
                .attributes
                .iter()
                .map(|a| TableItem::Value(LuaExpr::string(a.clone())))
                .collect();
            lua.members.push(LuaMember::new(
                runtime::ATTRIBUTES,
                LuaExpr::Table(items),
            ));
        }

        // Non-constant initializers move into constructors; collect them
        // while walking the members.
        let mut instance_inits: Vec<(String, Expr)> = Vec::new();
        let mut static_inits: Vec<(String, Expr)> = Vec::new();
        let mut ctors: Vec<&CtorDecl> = Vec::new();
        let mut static_ctor_body = None;

        for member in &decl.members {
            match member {
                TypeMember::Field(f) => {
                    Self::lower_field(ctx, f, &mut lua, &mut instance_inits, &mut static_inits)?;
                }
                TypeMember::Property(p) => {
                    Self::lower_property(ctx, p, &mut lua, &mut instance_inits, &mut static_inits)?;
                }
                TypeMember::Event(e) => Self::lower_event(ctx, e, &mut lua)?,
                TypeMember::Method(m) => {
                    if let Some(member) = Self::lower_method(ctx, m)? {
                        lua.members.push(member);
                    }
                }
                TypeMember::Ctor(c) => ctors.push(c),
                TypeMember::StaticCtor(s) => static_ctor_body = Some(&s.body),
                TypeMember::Nested(nested) => {
                    let dotted = format!(
                        "{}.{}",
                        name,
                        ctx.names.lua_name(ctx.arena, nested.symbol)?
                    );
                    if let Some(lowered) = Self::lower_type(ctx, nested, Some(dotted))? {
                        lua.nested.push(lowered);
                    }
                }
            }
        }

        for ctor in ctors.iter().copied() {
            let func = Self::lower_ctor(ctx, ctor, &info.base, &instance_inits)?;
            lua.ctors.push(CtorAdapter { func });
        }
        if ctors.is_empty() && !instance_inits.is_empty() {
            let func = Self::synthesized_ctor(ctx, decl.symbol, &info.base, &instance_inits)?;
            lua.ctors.push(CtorAdapter { func });
        }

        if static_ctor_body.is_some() || !static_inits.is_empty() {
            let frame = MethodFrame {
                symbol: Some(decl.symbol),
                returns_void: true,
                ref_out: Vec::new(),
            };
            let (body, _) = ctx.with_method(frame, |ctx| {
                ctx.with_function(Some(decl.symbol), false, |ctx| {
                    for (field, init) in &static_inits {
                        let value = ExprLowering::lower(ctx, init)?;
                        ctx.push_stmt(LuaStmt::Assign {
                            targets: vec![LuaExpr::member(LuaExpr::name("this"), field.clone())],
                            values: vec![value],
                        });
                    }
                    if let Some(block) = static_ctor_body {
                        StmtLowering::lower_block_into(ctx, block)?;
                    }
                    Ok(())
                })
            })?;
            lua.static_ctor = Some(FunctionExpr::new(vec!["this".to_string()], body));
        }

        Ok(Some(lua))
    }

    /// Whether an initializer can live in the member table directly.
    fn constant_init(expr: &Expr) -> Option<&ConstValue> {
        match expr {
            Expr::Literal(l) => Some(&l.value),
            _ => None,
        }
    }

    /// Table-default for a field of `ty`: numbers and booleans carry their
    /// zero, reference-like members stay out of the table (nil).
    fn table_zero(ctx: &Transformer, ty: &TypeRef) -> Option<LuaExpr> {
        match ConstValue::zero_of(ty, ctx.arena) {
            ConstValue::Nil => None,
            zero => Some(ctx.const_expr(&zero)),
        }
    }

    fn lower_field(
        ctx: &mut Transformer,
        f: &FieldDecl,
        lua: &mut LuaTypeDecl,
        instance_inits: &mut Vec<(String, Expr)>,
        static_inits: &mut Vec<(String, Expr)>,
    ) -> EmitResult<()> {
        if Self::is_ignored(ctx, f.symbol, f.doc.as_ref()) {
            return Ok(());
        }
        let data = ctx.arena.get(f.symbol).clone();
        let SymbolKind::Field(info) = &data.kind else {
            return Err(ctx.contract("field declaration on a non-field symbol", f.span));
        };
        let name = ctx.names.lua_name(ctx.arena, f.symbol)?;
        let doc_lines: Vec<String> = f
            .doc
            .as_ref()
            .map(|d| d.display_lines().map(str::to_string).collect())
            .unwrap_or_default();

        // Enum members and constants inline their values; other fields get
        // a table default when their zero is representable, and non-constant
        // initializers move into the constructors.
        let table_value = if let Some(value) = &info.const_value {
            Some(ctx.const_expr(value))
        } else if let Some(value) = f.init.as_ref().and_then(Self::constant_init) {
            Some(ctx.const_expr(value))
        } else {
            Self::table_zero(ctx, &info.ty)
        };
        if let Some(value) = table_value {
            let mut m = LuaMember::new(name.clone(), value);
            m.doc = doc_lines;
            lua.members.push(m);
        }

        if info.const_value.is_none() {
            if let Some(init) = &f.init {
                if Self::constant_init(init).is_none() {
                    if data.is_static {
                        static_inits.push((name, init.clone()));
                    } else {
                        instance_inits.push((name, init.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn lower_property(
        ctx: &mut Transformer,
        p: &PropertyDecl,
        lua: &mut LuaTypeDecl,
        instance_inits: &mut Vec<(String, Expr)>,
        static_inits: &mut Vec<(String, Expr)>,
    ) -> EmitResult<()> {
        if Self::is_ignored(ctx, p.symbol, p.doc.as_ref()) {
            return Ok(());
        }
        let data = ctx.arena.get(p.symbol).clone();
        let SymbolKind::Property(info) = &data.kind else {
            return Err(ctx.contract("property declaration on a non-property symbol", p.span));
        };
        let info = info.clone();
        let name = ctx.names.lua_name(ctx.arena, p.symbol)?;
        let field_like = ExprLowering::property_is_field_like(ctx, p.symbol);

        if field_like {
            match &p.init {
                Some(init) => match Self::constant_init(init) {
                    Some(value) => {
                        let value = ctx.const_expr(value);
                        let mut m = LuaMember::new(name, value);
                        if let Some(doc) = &p.doc {
                            m.doc = doc.display_lines().map(str::to_string).collect();
                        }
                        lua.members.push(m);
                    }
                    None => {
                        if let Some(zero) = Self::table_zero(ctx, &info.ty) {
                            lua.members.push(LuaMember::new(name.clone(), zero));
                        }
                        if data.is_static {
                            static_inits.push((name, init.clone()));
                        } else {
                            instance_inits.push((name, init.clone()));
                        }
                    }
                },
                None => {
                    if let Some(zero) = Self::table_zero(ctx, &info.ty) {
                        lua.members.push(LuaMember::new(name, zero));
                    }
                }
            }
            return Ok(());
        }

        // Accessor-backed: a get/set method pair. Indexers use the plain
        // `get`/`set` names the element-access lowering calls.
        let (get_name, set_name) = if info.is_indexer {
            ("get".to_string(), "set".to_string())
        } else {
            (
                format!("{}{}", runtime::GET_PREFIX, name),
                format!("{}{}", runtime::SET_PREFIX, name),
            )
        };
        if let Some(getter) = &p.getter {
            let func = Self::lower_accessor(
                ctx,
                p.symbol,
                getter,
                AccessorKind::Get {
                    backing: name.clone(),
                },
            )?;
            lua.members
                .push(LuaMember::new(get_name, LuaExpr::Function(func)));
        }
        if let Some(setter) = &p.setter {
            let func = Self::lower_accessor(
                ctx,
                p.symbol,
                setter,
                AccessorKind::Set {
                    backing: name.clone(),
                },
            )?;
            lua.members
                .push(LuaMember::new(set_name, LuaExpr::Function(func)));
        }
        Ok(())
    }

    fn lower_accessor(
        ctx: &mut Transformer,
        property: SymbolId,
        accessor: &AccessorDecl,
        kind: AccessorKind,
    ) -> EmitResult<FunctionExpr> {
        // Instance accessors receive the object, static ones the class
        // table; either way the first parameter is `this`.
        let mut params = vec!["this".to_string()];
        let value_name = match accessor.value_param {
            Some(symbol) => Some(ctx.names.lua_name(ctx.arena, symbol)?),
            None => matches!(kind, AccessorKind::Set { .. }).then(|| "value".to_string()),
        };
        if let (AccessorKind::Set { .. }, Some(v)) = (&kind, &value_name) {
            params.push(v.clone());
        }

        let frame = MethodFrame {
            symbol: Some(property),
            returns_void: matches!(kind, AccessorKind::Set { .. }),
            ref_out: Vec::new(),
        };
        let (body, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(Some(property), false, |ctx| {
                match &accessor.body {
                    Some(block) => StmtLowering::lower_block_into(ctx, block),
                    None => {
                        // Auto accessor forced into method shape: read and
                        // write the backing slot directly.
                        match &kind {
                            AccessorKind::Get { backing } => {
                                ctx.push_stmt(LuaStmt::Return(vec![LuaExpr::member(
                                    LuaExpr::name("this"),
                                    backing.clone(),
                                )]));
                            }
                            AccessorKind::Set { backing } => {
                                let v = value_name.clone().expect("setter value param");
                                ctx.push_stmt(LuaStmt::Assign {
                                    targets: vec![LuaExpr::member(
                                        LuaExpr::name("this"),
                                        backing.clone(),
                                    )],
                                    values: vec![LuaExpr::name(v)],
                                });
                            }
                        }
                        Ok(())
                    }
                }
            })
        })?;
        Ok(FunctionExpr::new(params, body))
    }

    fn lower_event(ctx: &mut Transformer, e: &EventDecl, lua: &mut LuaTypeDecl) -> EmitResult<()> {
        if Self::is_ignored(ctx, e.symbol, e.doc.as_ref()) {
            return Ok(());
        }
        let data = ctx.arena.get(e.symbol).clone();
        let SymbolKind::Event(info) = &data.kind else {
            return Err(ctx.contract("event declaration on a non-event symbol", e.span));
        };
        let field_like = !info.has_accessors && !info.is_interface_impl && !info.is_overridable;
        if field_like {
            // Field-like events start nil; no table entry needed.
            return Ok(());
        }
        let name = ctx.names.lua_name(ctx.arena, e.symbol)?;
        for (accessor, prefix) in [
            (&e.add, runtime::ADD_PREFIX),
            (&e.remove, runtime::REMOVE_PREFIX),
        ] {
            let Some(accessor) = accessor else { continue };
            let func = Self::lower_accessor(
                ctx,
                e.symbol,
                accessor,
                AccessorKind::Set {
                    backing: name.clone(),
                },
            )?;
            lua.members.push(LuaMember::new(
                format!("{}{}", prefix, name),
                LuaExpr::Function(func),
            ));
        }
        Ok(())
    }

    fn lower_method(ctx: &mut Transformer, m: &MethodDecl) -> EmitResult<Option<LuaMember>> {
        if Self::is_ignored(ctx, m.symbol, m.doc.as_ref()) {
            return Ok(None);
        }
        let Some(body) = &m.body else {
            // Abstract and interface members have no emission.
            return Ok(None);
        };
        let data = ctx.arena.get(m.symbol).clone();
        let info = data
            .as_method()
            .ok_or_else(|| ctx.contract("method declaration on a non-method symbol", m.span))?
            .clone();

        let member_name = match info.operator {
            Some(op) => op.method_name().to_string(),
            None => ctx.names.lua_name(ctx.arena, m.symbol)?,
        };
        let func = Self::lower_method_body(ctx, m.symbol, &info, &data.is_static, body)?;
        let mut member = LuaMember::new(member_name, LuaExpr::Function(func));
        if let Some(doc) = &m.doc {
            member.doc = doc.display_lines().map(str::to_string).collect();
        }
        Ok(Some(member))
    }

    fn lower_method_body(
        ctx: &mut Transformer,
        symbol: SymbolId,
        info: &MethodInfo,
        is_static: &bool,
        body: &sharplua_semantic::BlockStmt,
    ) -> EmitResult<FunctionExpr> {
        let frame = ctx.method_frame(symbol)?;
        let ref_out = frame.ref_out.clone();
        let mut params = Vec::new();
        if !*is_static {
            params.push("this".to_string());
        }
        for p in &info.params {
            params.push(ctx.names.lua_name(ctx.arena, p.symbol)?);
        }

        let (mut block, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(Some(symbol), false, |ctx| {
                StmtLowering::lower_block_into(ctx, body)
            })
        })?;

        // A ref/out method that falls off its end still reports the
        // final parameter values.
        if !ref_out.is_empty() && !matches!(block.statements.last(), Some(LuaStmt::Return(_))) {
            block.push(LuaStmt::Return(
                ref_out.into_iter().map(LuaExpr::name).collect(),
            ));
        }

        if info.is_iterator {
            let inner = FunctionExpr::new(Vec::new(), block);
            let wrapper = LuaBlock::new(vec![LuaStmt::Return(vec![LuaExpr::rt_call(
                runtime::YIELD_ITERATOR,
                vec![LuaExpr::Function(inner)],
            )])]);
            return Ok(FunctionExpr::new(params, wrapper));
        }
        Ok(FunctionExpr::new(params, block))
    }

    fn lower_ctor(
        ctx: &mut Transformer,
        ctor: &CtorDecl,
        base: &Option<TypeRef>,
        instance_inits: &[(String, Expr)],
    ) -> EmitResult<FunctionExpr> {
        let data = ctx.arena.get(ctor.symbol).clone();
        let info = data
            .as_method()
            .ok_or_else(|| ctx.contract("constructor on a non-method symbol", ctor.span))?
            .clone();
        let frame = ctx.method_frame(ctor.symbol)?;
        let mut params = vec!["this".to_string()];
        for p in &info.params {
            params.push(ctx.names.lua_name(ctx.arena, p.symbol)?);
        }

        let chains_to_this = matches!(
            ctor.initializer.as_ref().map(|i| i.kind),
            Some(CtorInitKind::This)
        );
        let (body, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(Some(ctor.symbol), false, |ctx| {
                match &ctor.initializer {
                    Some(init) => {
                        let target_data = ctx.arena.get(init.ctor).clone();
                        let target_info = target_data
                            .as_method()
                            .ok_or_else(|| {
                                ctx.contract("constructor initializer on a non-method", init.span)
                            })?
                            .clone();
                        let target_type = target_data
                            .containing
                            .expect("constructor without containing type");
                        let path = ctx.names.type_path(ctx.arena, target_type)?;
                        let count = ctx
                            .arena
                            .get(target_type)
                            .as_type()
                            .map(|t| t.ctors)
                            .unwrap_or(1);
                        let callee = ctx.ctor_ref(&path, target_info.ctor_index, count);
                        let mut args = vec![LuaExpr::name("this")];
                        for a in &init.args {
                            args.push(ExprLowering::lower(ctx, a)?);
                        }
                        ctx.push_stmt(LuaStmt::Expr(LuaExpr::call(callee, args)));
                    }
                    None => Self::implicit_base_call(ctx, base)?,
                }
                // Field initializers run in every constructor that does
                // not delegate sideways.
                if !chains_to_this {
                    for (field, init) in instance_inits {
                        let value = ExprLowering::lower(ctx, init)?;
                        ctx.push_stmt(LuaStmt::Assign {
                            targets: vec![LuaExpr::member(LuaExpr::name("this"), field.clone())],
                            values: vec![value],
                        });
                    }
                }
                StmtLowering::lower_block_into(ctx, &ctor.body)
            })
        })?;
        Ok(FunctionExpr::new(params, body))
    }

    fn synthesized_ctor(
        ctx: &mut Transformer,
        type_symbol: SymbolId,
        base: &Option<TypeRef>,
        instance_inits: &[(String, Expr)],
    ) -> EmitResult<FunctionExpr> {
        let frame = MethodFrame {
            symbol: Some(type_symbol),
            returns_void: true,
            ref_out: Vec::new(),
        };
        let (body, _) = ctx.with_method(frame, |ctx| {
            ctx.with_function(Some(type_symbol), false, |ctx| {
                Self::implicit_base_call(ctx, base)?;
                for (field, init) in instance_inits {
                    let value = ExprLowering::lower(ctx, init)?;
                    ctx.push_stmt(LuaStmt::Assign {
                        targets: vec![LuaExpr::member(LuaExpr::name("this"), field.clone())],
                        values: vec![value],
                    });
                }
                Ok(())
            })
        })?;
        Ok(FunctionExpr::new(vec!["this".to_string()], body))
    }

    /// The implicit first statement of a constructor: call the direct
    /// base's first constructor when the base declares any.
    fn implicit_base_call(ctx: &mut Transformer, base: &Option<TypeRef>) -> EmitResult<()> {
        let Some(TypeRef::Named(n)) = base else {
            return Ok(());
        };
        let count = ctx
            .arena
            .get(n.symbol)
            .as_type()
            .map(|t| t.ctors)
            .unwrap_or(0);
        if count == 0 {
            return Ok(());
        }
        let path = ctx.names.type_path(ctx.arena, n.symbol)?;
        let callee = ctx.ctor_ref(&path, 1, count);
        ctx.push_stmt(LuaStmt::Expr(LuaExpr::call(
            callee,
            vec![LuaExpr::name("this")],
        )));
        Ok(())
    }
}

enum AccessorKind {
    Get { backing: String },
    Set { backing: String },
}
