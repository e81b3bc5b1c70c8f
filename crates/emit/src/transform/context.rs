//! Transformer state.
//!
//! The transformer is a stack machine. Four stacks track the traversal:
//! the function stack (which body synthesised statements land in), the
//! block stack (where locals and guards are inserted), the conditional-temp
//! stack (the running value of an in-flight `?.` chain), and the
//! method-info stack (return shape and `ref`/`out` list of the method being
//! emitted). Every push is paired with a pop on all exit paths; the
//! `with_*` helpers own that pairing.

use crate::error::{EmitError, EmitResult};
use crate::lua::{LuaBlock, LuaExpr, LuaStmt};
use crate::names::NameService;
use crate::runtime;
use sharplua_semantic::symbol::{ParamMode, TypeKind};
use sharplua_semantic::types::SpecialType;
use sharplua_semantic::{
    qualified_name, ConstValue, LineIndex, MetadataProvider, SourceLocation, SymbolArena,
    SymbolId, TypeRef,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use text_size::TextRange;

/// Transformer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    /// Classic dialect: no `goto`; control-flow rewrites fall back to
    /// flag-and-break schemes.
    pub classic: bool,
    /// Emit `__attributes__` tables on type declarations.
    pub export_attributes: bool,
}

/// One in-flight function body.
#[derive(Debug)]
pub struct FunctionFrame {
    /// True for the body closures of `try`/`using`; returns inside them
    /// carry the handled marker.
    pub is_protected: bool,
    /// Set when a `return` statement was emitted into this body.
    pub saw_return: bool,
    /// Naming scope for temporaries synthesised in this body.
    pub scope: Option<SymbolId>,
    temps: u32,
}

/// One in-flight method or lambda: its return shape and `ref`/`out` list.
#[derive(Debug)]
pub struct MethodFrame {
    pub symbol: Option<SymbolId>,
    pub returns_void: bool,
    /// Lua names of `ref`/`out` parameters, appended to every return.
    pub ref_out: Vec<String>,
}

/// Enclosing construct a `break` can bind to.
#[derive(Debug)]
pub enum Breakable {
    Loop {
        /// Number of `continue` statements lowered in this loop so far.
        continues: u32,
    },
    Switch {
        /// Label jumped to by non-terminal section breaks (modern dialect).
        end_label: String,
        end_label_used: bool,
        /// Re-dispatch info, present when the switch contains `goto case`.
        dispatch: Option<GotoCaseInfo>,
    },
}

/// Flags and label of a switch that is re-entered by `goto case`.
#[derive(Debug)]
pub struct GotoCaseInfo {
    pub label: String,
    /// Guard set on re-entry so plain selector matches cannot re-fire.
    pub redirect: String,
    /// Flag variable per targeted section label.
    pub flags: Vec<(sharplua_semantic::stmt::SwitchLabel, String)>,
}

pub struct Transformer<'a> {
    pub arena: &'a SymbolArena,
    pub metadata: &'a dyn MetadataProvider,
    pub options: TransformOptions,
    pub names: NameService,
    pub file: String,
    line_index: &'a LineIndex,
    functions: Vec<FunctionFrame>,
    blocks: Vec<Vec<LuaStmt>>,
    cond_temps: Vec<String>,
    methods: Vec<MethodFrame>,
    pub breakables: Vec<Breakable>,
    /// Lua names of catch parameters, innermost last, for bare rethrow.
    pub catch_vars: Vec<String>,
    /// Enums referenced by `typeof`, exported at the end of the unit.
    pub exported_enums: BTreeSet<String>,
    /// Properties whose declarations carry the no-field doc tag; read and
    /// write sites must agree with the declaration's accessor shape.
    pub no_field_tagged: HashSet<SymbolId>,
    label_counters: HashMap<&'static str, u32>,
}

impl<'a> Transformer<'a> {
    pub fn new(
        arena: &'a SymbolArena,
        metadata: &'a dyn MetadataProvider,
        options: TransformOptions,
        file: String,
        line_index: &'a LineIndex,
    ) -> Self {
        Transformer {
            arena,
            metadata,
            options,
            names: NameService::new(),
            file,
            line_index,
            functions: Vec::new(),
            blocks: Vec::new(),
            cond_temps: Vec::new(),
            methods: Vec::new(),
            breakables: Vec::new(),
            catch_vars: Vec::new(),
            exported_enums: BTreeSet::new(),
            no_field_tagged: HashSet::new(),
            label_counters: HashMap::new(),
        }
    }

    pub fn location(&self, span: TextRange) -> SourceLocation {
        SourceLocation::resolve(&self.file, self.line_index, span)
    }

    // Block stack

    pub fn push_stmt(&mut self, stmt: LuaStmt) {
        self.blocks
            .last_mut()
            .expect("statement emitted outside any block")
            .push(stmt);
    }

    /// Run `f` against a fresh block frame and return the block it built.
    pub fn with_block<F>(&mut self, f: F) -> EmitResult<LuaBlock>
    where
        F: FnOnce(&mut Self) -> EmitResult<()>,
    {
        self.blocks.push(Vec::new());
        let result = f(self);
        let statements = self.blocks.pop().expect("block frame pushed above");
        result?;
        Ok(LuaBlock::new(statements))
    }

    // Function stack

    /// Run `f` inside a new function frame; returns the body block and
    /// whether the body emitted a `return`.
    pub fn with_function<F>(
        &mut self,
        scope: Option<SymbolId>,
        is_protected: bool,
        f: F,
    ) -> EmitResult<(LuaBlock, bool)>
    where
        F: FnOnce(&mut Self) -> EmitResult<()>,
    {
        self.functions.push(FunctionFrame {
            is_protected,
            saw_return: false,
            scope,
            temps: 0,
        });
        let body = self.with_block(f);
        let frame = self.functions.pop().expect("function frame pushed above");
        Ok((body?, frame.saw_return))
    }

    pub fn in_function(&self) -> bool {
        !self.functions.is_empty()
    }

    pub fn in_protected(&self) -> bool {
        self.functions.last().map(|f| f.is_protected).unwrap_or(false)
    }

    pub fn mark_return(&mut self) {
        if let Some(frame) = self.functions.last_mut() {
            frame.saw_return = true;
        }
    }

    /// Allocate a fresh temporary name in the current function, reserving
    /// it against user symbols of the same scope.
    pub fn alloc_temp(&mut self) -> String {
        let frame = self
            .functions
            .last_mut()
            .expect("temporary requested outside any function");
        let scope = frame.scope;
        loop {
            let candidate = format!("t{}", frame.temps);
            frame.temps += 1;
            if !self.names.is_taken(scope, &candidate) {
                self.names.reserve(scope, &candidate);
                return candidate;
            }
        }
    }

    pub fn fresh_label(&mut self, base: &'static str) -> String {
        let n = self.label_counters.entry(base).or_insert(0);
        let current = *n;
        *n += 1;
        if current == 0 {
            base.to_string()
        } else {
            format!("{}{}", base, current)
        }
    }

    /// Allocate a temporary with a meaningful base name (`ok`, `v`, flag
    /// names), falling back to numbered forms on collision.
    pub fn alloc_named(&mut self, base: &str) -> String {
        let scope = self
            .functions
            .last()
            .expect("temporary requested outside any function")
            .scope;
        if !self.names.is_taken(scope, base) {
            self.names.reserve(scope, base);
            return base.to_string();
        }
        let mut i = 1u32;
        loop {
            let candidate = format!("{}{}", base, i);
            if !self.names.is_taken(scope, &candidate) {
                self.names.reserve(scope, &candidate);
                return candidate;
            }
            i += 1;
        }
    }

    // Method-info stack

    pub fn with_method<F, T>(&mut self, frame: MethodFrame, f: F) -> EmitResult<T>
    where
        F: FnOnce(&mut Self) -> EmitResult<T>,
    {
        self.methods.push(frame);
        let result = f(self);
        self.methods.pop();
        result
    }

    pub fn method(&self) -> Option<&MethodFrame> {
        self.methods.last()
    }

    /// Build the method frame for a method symbol, assigning parameter
    /// names as a side effect.
    pub fn method_frame(&mut self, symbol: SymbolId) -> EmitResult<MethodFrame> {
        let info = self
            .arena
            .get(symbol)
            .as_method()
            .expect("method frame for non-method symbol")
            .clone();
        let mut ref_out = Vec::new();
        for p in &info.params {
            let name = self.names.lua_name(self.arena, p.symbol)?;
            if p.mode != ParamMode::Value {
                ref_out.push(name);
            }
        }
        Ok(MethodFrame {
            symbol: Some(symbol),
            returns_void: info.returns_void(),
            ref_out,
        })
    }

    // Conditional-temp stack

    pub fn push_cond_temp(&mut self, name: String) {
        self.cond_temps.push(name);
    }

    pub fn pop_cond_temp(&mut self) -> Option<String> {
        self.cond_temps.pop()
    }

    // Loop / switch stack

    pub fn innermost_loop_mut(&mut self) -> Option<&mut Breakable> {
        self.breakables
            .iter_mut()
            .rev()
            .find(|b| matches!(b, Breakable::Loop { .. }))
    }

    /// Total `continue` count of the innermost loop, zero when none.
    pub fn loop_continues(&self) -> u32 {
        self.breakables
            .iter()
            .rev()
            .find_map(|b| match b {
                Breakable::Loop { continues } => Some(*continues),
                _ => None,
            })
            .unwrap_or(0)
    }

    // Shared lowering helpers

    /// A type reference as a Lua expression.
    pub fn type_expr(&mut self, ty: &TypeRef) -> EmitResult<LuaExpr> {
        match ty {
            TypeRef::Special(s) => Ok(LuaExpr::name(special_type_name(*s))),
            TypeRef::Named(n) => {
                let path = self.names.type_path(self.arena, n.symbol)?;
                if n.type_args.is_empty() {
                    Ok(LuaExpr::name(path))
                } else {
                    let args = n
                        .type_args
                        .iter()
                        .map(|a| self.type_expr(a))
                        .collect::<EmitResult<Vec<_>>>()?;
                    Ok(LuaExpr::call(LuaExpr::name(path), args))
                }
            }
            TypeRef::Array(a) => {
                let element = self.type_expr(&a.element)?;
                Ok(LuaExpr::ArrayType(crate::lua::ArrayTypeAdapter {
                    element: Box::new(element),
                    rank: a.rank,
                }))
            }
            TypeRef::Nullable(inner) => {
                let inner = self.type_expr(inner)?;
                Ok(LuaExpr::call(LuaExpr::name("System.Nullable"), vec![inner]))
            }
            TypeRef::Tuple(_) => Ok(LuaExpr::name("System.ValueTuple")),
            TypeRef::TypeParam(p) => Ok(LuaExpr::name(p.name.clone())),
        }
    }

    /// A constant value as a Lua expression.
    pub fn const_expr(&self, value: &ConstValue) -> LuaExpr {
        match value {
            ConstValue::Nil => LuaExpr::nil(),
            ConstValue::Bool(b) => LuaExpr::bool(*b),
            ConstValue::Char(c) => LuaExpr::Literal(crate::lua::LuaLiteral::Char(*c)),
            ConstValue::Int(i) => LuaExpr::int(*i),
            ConstValue::Float(f) => LuaExpr::float(*f),
            ConstValue::Str(s) => LuaExpr::string(s.clone()),
        }
    }

    /// Record an enum for end-of-unit export and return its runtime name.
    pub fn mark_enum_export(&mut self, ty: &TypeRef) {
        if let TypeRef::Named(n) = ty {
            if matches!(
                self.arena.get(n.symbol).as_type(),
                Some(info) if info.kind == TypeKind::Enum
            ) {
                self.exported_enums
                    .insert(qualified_name(self.arena, n.symbol));
            }
        }
    }

    /// Contract-violation error at a span.
    pub fn contract(&self, message: impl Into<String>, span: TextRange) -> EmitError {
        EmitError::contract(message, self.location(span))
    }

    /// Unsupported-construct error at a span.
    pub fn unsupported(&self, construct: impl Into<String>, span: TextRange) -> EmitError {
        EmitError::unsupported(construct, self.location(span))
    }

    /// The `__ctor__` call expression for a constructor of `type_path`,
    /// using the indexed form only when the type declares several.
    pub fn ctor_ref(&mut self, type_path: &str, ctor_index: u32, ctor_count: u32) -> LuaExpr {
        let member = LuaExpr::member(LuaExpr::name(type_path), runtime::CTOR);
        if ctor_count > 1 {
            LuaExpr::index(member, LuaExpr::int(ctor_index as i64))
        } else {
            member
        }
    }
}

/// Runtime name of a well-known type.
pub fn special_type_name(s: SpecialType) -> &'static str {
    match s {
        SpecialType::Void => "System.Void",
        SpecialType::Bool => "System.Boolean",
        SpecialType::Char => "System.Char",
        SpecialType::SByte => "System.SByte",
        SpecialType::Byte => "System.Byte",
        SpecialType::Int16 => "System.Int16",
        SpecialType::UInt16 => "System.UInt16",
        SpecialType::Int32 => "System.Int32",
        SpecialType::UInt32 => "System.UInt32",
        SpecialType::Int64 => "System.Int64",
        SpecialType::UInt64 => "System.UInt64",
        SpecialType::Single => "System.Single",
        SpecialType::Double => "System.Double",
        SpecialType::String => "System.String",
        SpecialType::Object => "System.Object",
        SpecialType::ValueType => "System.ValueType",
    }
}
