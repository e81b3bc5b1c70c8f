//! Lua statement and declaration nodes.

use super::expr::{CtorAdapter, FunctionExpr, LuaExpr};

/// A rendered file: the statement list of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct LuaChunk {
    pub statements: Vec<LuaStmt>,
}

/// A statement block. Blocks own the statements; nesting is by value.
#[derive(Debug, Clone, Default)]
pub struct LuaBlock {
    pub statements: Vec<LuaStmt>,
}

impl LuaBlock {
    pub fn new(statements: Vec<LuaStmt>) -> Self {
        LuaBlock { statements }
    }

    pub fn push(&mut self, stmt: LuaStmt) {
        self.statements.push(stmt);
    }
}

/// Statement kinds.
#[derive(Debug, Clone)]
pub enum LuaStmt {
    Expr(LuaExpr),
    /// `targets = values`; a multi-assignment when either side lists more
    /// than one expression. Property-adapter targets render as setter calls.
    Assign {
        targets: Vec<LuaExpr>,
        values: Vec<LuaExpr>,
    },
    /// `local names = values`; `values` may be empty for a bare declaration
    /// or shorter than `names` for a multi-value initializer.
    Local {
        names: Vec<String>,
        values: Vec<LuaExpr>,
    },
    LocalFunction {
        name: String,
        func: FunctionExpr,
    },
    If(IfStmt),
    While {
        condition: LuaExpr,
        body: LuaBlock,
    },
    Repeat {
        body: LuaBlock,
        until: LuaExpr,
    },
    NumericFor {
        var: String,
        start: LuaExpr,
        limit: LuaExpr,
        step: Option<LuaExpr>,
        body: LuaBlock,
    },
    GenericFor {
        vars: Vec<String>,
        exprs: Vec<LuaExpr>,
        body: LuaBlock,
    },
    Do(LuaBlock),
    Break,
    Goto(String),
    Label(String),
    /// `return e1, e2, …`; empty for a bare return.
    Return(Vec<LuaExpr>),
    /// Exactly `n` blank lines; adjacent blank-line statements coalesce.
    BlankLines(u32),
    /// `-- text`
    Comment(String),
    /// `--[[ text ]]`
    LongComment(String),
    /// `--- line` documentation block.
    Doc(DocStmt),
    TypeDecl(LuaTypeDecl),
    TryAdapter(TryAdapter),
    UsingAdapter(UsingAdapter),
    ContinueAdapter(ContinueKind),
    GotoCaseAdapter(GotoCaseAdapter),
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: LuaExpr,
    pub then_block: LuaBlock,
    pub elseifs: Vec<(LuaExpr, LuaBlock)>,
    pub else_block: Option<LuaBlock>,
}

impl IfStmt {
    pub fn new(condition: LuaExpr, then_block: LuaBlock) -> Self {
        IfStmt {
            condition,
            then_block,
            elseifs: Vec::new(),
            else_block: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocStmt {
    pub lines: Vec<String>,
}

/// How a protected call propagates an inner `return` to the enclosing
/// function. Built by the statement transformer, expanded by the renderer.
#[derive(Debug, Clone)]
pub enum ReturnWrap {
    /// The protected block contains no reachable `return`; the call is a
    /// plain expression statement.
    None,
    /// `local ok, v = <call>; if ok then return v end`. `value` is absent
    /// for void methods. When the call site is itself inside a protected
    /// closure, the re-return carries the handled marker: `return true, v`.
    Check {
        ok: String,
        value: Option<String>,
        protected: bool,
    },
}

/// `System.try(tryFn, catchFn, finallyFn)` plus its return propagation.
#[derive(Debug, Clone)]
pub struct TryAdapter {
    pub call: LuaExpr,
    pub wrap: ReturnWrap,
}

/// `System.using(…)` / `System.usingX(…)` plus its return propagation.
#[derive(Debug, Clone)]
pub struct UsingAdapter {
    pub call: LuaExpr,
    pub wrap: ReturnWrap,
}

/// A lowered `continue`.
#[derive(Debug, Clone)]
pub enum ContinueKind {
    /// `goto continue` where the dialect has labels.
    Goto(String),
    /// `__continue__ = true` + `break`, checked at the loop epilogue.
    Flag(String),
}

/// A lowered `goto case X`: raise the target's flag (and the redirect
/// guard) and re-enter dispatch.
#[derive(Debug, Clone)]
pub struct GotoCaseAdapter {
    /// Flags set before the jump, in one multi-assignment.
    pub flags: Vec<String>,
    pub label: String,
}

/// Kind tag passed to the runtime declaration helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl TypeDeclKind {
    pub fn helper_name(self) -> &'static str {
        match self {
            TypeDeclKind::Class => crate::runtime::DECL_CLASS,
            TypeDeclKind::Struct => crate::runtime::DECL_STRUCT,
            TypeDeclKind::Interface => crate::runtime::DECL_INTERFACE,
            TypeDeclKind::Enum => crate::runtime::DECL_ENUM,
        }
    }
}

/// A named member of a type table.
#[derive(Debug, Clone)]
pub struct LuaMember {
    pub name: String,
    pub value: LuaExpr,
    /// Documentation lines rendered above the member.
    pub doc: Vec<String>,
}

impl LuaMember {
    pub fn new(name: impl Into<String>, value: LuaExpr) -> Self {
        LuaMember {
            name: name.into(),
            value,
            doc: Vec::new(),
        }
    }
}

/// A type declaration collected for the runtime's `class`/`struct`/
/// `interface`/`enum` helpers.
#[derive(Debug, Clone)]
pub struct LuaTypeDecl {
    /// Short assigned name, arity-suffixed for generics.
    pub name: String,
    pub kind: TypeDeclKind,
    pub type_params: Vec<String>,
    /// Base class and interfaces, in declaration order.
    pub inherits: Vec<LuaExpr>,
    /// Constructors in source order; rendered under `__ctor__`.
    pub ctors: Vec<CtorAdapter>,
    pub static_ctor: Option<FunctionExpr>,
    /// Fields with initial values, then methods and accessors.
    pub members: Vec<LuaMember>,
    pub nested: Vec<LuaTypeDecl>,
    pub doc: Vec<String>,
}

impl LuaTypeDecl {
    pub fn new(name: impl Into<String>, kind: TypeDeclKind) -> Self {
        LuaTypeDecl {
            name: name.into(),
            kind,
            type_params: Vec::new(),
            inherits: Vec::new(),
            ctors: Vec::new(),
            static_ctor: None,
            members: Vec::new(),
            nested: Vec::new(),
            doc: Vec::new(),
        }
    }
}
