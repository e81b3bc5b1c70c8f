//! Construction helpers for resolved trees.
//!
//! The front-end bridge and the test suites build trees through this module
//! rather than spelling out every annotation by hand.

use crate::arena::{SymbolArena, SymbolId};
use crate::expr::{Expr, IdentifierExpr, LiteralExpr};
use crate::stmt::{BlockStmt, ExprStmt, ReturnStmt, Stmt};
use crate::symbol::{
    FieldInfo, LocalInfo, MethodInfo, ParamData, ParamInfo, ParamMode, PropertyInfo, SymbolData,
    SymbolKind, TypeInfo, TypeKind,
};
use crate::types::{ConstValue, SpecialType, TypeRef};
use text_size::TextRange;

/// Builder over a symbol arena.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    pub arena: SymbolArena,
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            arena: SymbolArena::new(),
        }
    }

    pub fn namespace(&mut self, name: &str, containing: Option<SymbolId>) -> SymbolId {
        let mut data = SymbolData::new(name, SymbolKind::Namespace);
        data.containing = containing;
        self.arena.alloc(data)
    }

    pub fn class(&mut self, name: &str, containing: Option<SymbolId>) -> SymbolId {
        self.type_with(name, containing, TypeInfo::default())
    }

    pub fn type_with(
        &mut self,
        name: &str,
        containing: Option<SymbolId>,
        info: TypeInfo,
    ) -> SymbolId {
        let mut data = SymbolData::new(name, SymbolKind::Type(info));
        data.containing = containing;
        self.arena.alloc(data)
    }

    pub fn enum_type(&mut self, name: &str, containing: Option<SymbolId>) -> SymbolId {
        self.type_with(
            name,
            containing,
            TypeInfo {
                kind: TypeKind::Enum,
                ..TypeInfo::default()
            },
        )
    }

    pub fn method(&mut self, name: &str, containing: SymbolId, info: MethodInfo) -> SymbolId {
        let data = SymbolData::new(name, SymbolKind::Method(info)).with_containing(containing);
        self.arena.alloc(data)
    }

    pub fn static_method(
        &mut self,
        name: &str,
        containing: SymbolId,
        info: MethodInfo,
    ) -> SymbolId {
        let data = SymbolData::new(name, SymbolKind::Method(info))
            .with_containing(containing)
            .statics();
        self.arena.alloc(data)
    }

    /// Allocate a parameter symbol scoped to `method` and append it to the
    /// method's signature.
    pub fn param(&mut self, method: SymbolId, name: &str, ty: TypeRef) -> SymbolId {
        self.param_with(method, name, ty, ParamMode::Value, None)
    }

    pub fn param_with(
        &mut self,
        method: SymbolId,
        name: &str,
        ty: TypeRef,
        mode: ParamMode,
        default: Option<ConstValue>,
    ) -> SymbolId {
        let symbol = self.arena.alloc(
            SymbolData::new(
                name,
                SymbolKind::Parameter(ParamData {
                    ty: ty.clone(),
                    mode,
                }),
            )
            .with_containing(method),
        );
        let info = ParamInfo {
            symbol,
            name: name.to_string(),
            ty,
            mode,
            is_params: false,
            default,
        };
        if let SymbolKind::Method(m) = &mut self.arena.get_mut(method).kind {
            m.params.push(info);
        }
        symbol
    }

    /// Allocate a local symbol scoped to its containing method.
    pub fn local(&mut self, method: SymbolId, name: &str, ty: TypeRef) -> SymbolId {
        self.arena.alloc(
            SymbolData::new(name, SymbolKind::Local(LocalInfo { ty })).with_containing(method),
        )
    }

    /// A parameter for a lambda, scoped to the enclosing method.
    pub fn lambda_param(&mut self, scope: SymbolId, name: &str, ty: TypeRef) -> ParamInfo {
        let symbol = self.arena.alloc(
            SymbolData::new(
                name,
                SymbolKind::Parameter(ParamData {
                    ty: ty.clone(),
                    mode: ParamMode::Value,
                }),
            )
            .with_containing(scope),
        );
        ParamInfo {
            symbol,
            name: name.to_string(),
            ty,
            mode: ParamMode::Value,
            is_params: false,
            default: None,
        }
    }

    pub fn field(&mut self, name: &str, containing: SymbolId, ty: TypeRef) -> SymbolId {
        let data = SymbolData::new(name, SymbolKind::Field(FieldInfo::plain(ty)))
            .with_containing(containing);
        self.arena.alloc(data)
    }

    pub fn const_field(
        &mut self,
        name: &str,
        containing: SymbolId,
        ty: TypeRef,
        value: ConstValue,
    ) -> SymbolId {
        let data = SymbolData::new(
            name,
            SymbolKind::Field(FieldInfo {
                ty,
                is_const: true,
                const_value: Some(value),
            }),
        )
        .with_containing(containing)
        .statics();
        self.arena.alloc(data)
    }

    pub fn property(&mut self, name: &str, containing: SymbolId, info: PropertyInfo) -> SymbolId {
        let data = SymbolData::new(name, SymbolKind::Property(info)).with_containing(containing);
        self.arena.alloc(data)
    }

    pub fn finish(self) -> SymbolArena {
        self.arena
    }
}

// Expression and statement shorthands used pervasively by tests.

pub fn int(value: i64) -> Expr {
    Expr::Literal(LiteralExpr {
        value: ConstValue::Int(value),
        ty: TypeRef::Special(SpecialType::Int32),
        span: TextRange::default(),
    })
}

pub fn string(value: &str) -> Expr {
    Expr::Literal(LiteralExpr {
        value: ConstValue::Str(value.to_string()),
        ty: TypeRef::Special(SpecialType::String),
        span: TextRange::default(),
    })
}

pub fn boolean(value: bool) -> Expr {
    Expr::Literal(LiteralExpr {
        value: ConstValue::Bool(value),
        ty: TypeRef::Special(SpecialType::Bool),
        span: TextRange::default(),
    })
}

pub fn null(ty: TypeRef) -> Expr {
    Expr::Literal(LiteralExpr {
        value: ConstValue::Nil,
        ty,
        span: TextRange::default(),
    })
}

pub fn ident(symbol: SymbolId, ty: TypeRef) -> Expr {
    Expr::Identifier(IdentifierExpr {
        symbol,
        ty,
        span: TextRange::default(),
    })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt {
        expr,
        span: TextRange::default(),
    })
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt {
        value,
        span: TextRange::default(),
    })
}

pub fn block(statements: Vec<Stmt>) -> BlockStmt {
    BlockStmt::new(statements)
}
