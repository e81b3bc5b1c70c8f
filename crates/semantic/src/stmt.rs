//! Statement nodes of the resolved tree.

use crate::arena::SymbolId;
use crate::expr::Expr;
use crate::types::ConstValue;
use serde::{Deserialize, Serialize};
use text_size::TextRange;

/// Statement kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Block(BlockStmt),
    Expr(ExprStmt),
    LocalDecl(LocalDeclStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    ForEach(ForEachStmt),
    Switch(SwitchStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Try(TryStmt),
    Using(UsingStmt),
    Lock(LockStmt),
    Unsafe(UnsafeStmt),
    Fixed(FixedStmt),
    Goto(GotoStmt),
    Labeled(LabeledStmt),
    YieldReturn(YieldReturnStmt),
    YieldBreak(YieldBreakStmt),
    LocalFunction(LocalFunctionStmt),
    Empty(EmptyStmt),
}

impl Stmt {
    pub fn span(&self) -> TextRange {
        match self {
            Stmt::Block(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::LocalDecl(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::ForEach(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Break(s) => s.span,
            Stmt::Continue(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Using(s) => s.span,
            Stmt::Lock(s) => s.span,
            Stmt::Unsafe(s) => s.span,
            Stmt::Fixed(s) => s.span,
            Stmt::Goto(s) => s.span,
            Stmt::Labeled(s) => s.span,
            Stmt::YieldReturn(s) => s.span,
            Stmt::YieldBreak(s) => s.span,
            Stmt::LocalFunction(s) => s.span,
            Stmt::Empty(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
    pub span: TextRange,
}

impl BlockStmt {
    pub fn new(statements: Vec<Stmt>) -> Self {
        BlockStmt {
            statements,
            span: TextRange::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDeclStmt {
    pub declarators: Vec<LocalDeclarator>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDeclarator {
    pub symbol: SymbolId,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: BlockStmt,
    /// `Block` for `else { … }`, `If` for `else if`.
    pub else_branch: Option<Box<Stmt>>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoWhileStmt {
    pub body: BlockStmt,
    pub condition: Expr,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    /// Loop-variable declarations, run once before the first test.
    pub init: Option<LocalDeclStmt>,
    pub condition: Option<Expr>,
    /// Step expressions, run at the end of every iteration.
    pub step: Vec<Expr>,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForEachStmt {
    pub symbol: SymbolId,
    pub collection: Expr,
    pub body: BlockStmt,
    /// Present when the semantic layer proved the source is an integer
    /// range, enabling a numeric loop.
    pub numeric: Option<NumericRange>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericRange {
    pub start: Box<Expr>,
    pub limit: Box<Expr>,
    pub step: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub selector: Expr,
    pub sections: Vec<SwitchSection>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSection {
    pub labels: Vec<SwitchLabel>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchLabel {
    Case(ConstValue),
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakStmt {
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueStmt {
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: TextRange,
}

/// `throw e`, or a bare rethrow inside a catch when `value` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowStmt {
    pub value: Option<Expr>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryStmt {
    pub block: BlockStmt,
    pub catches: Vec<CatchClause>,
    pub finally: Option<BlockStmt>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    /// Caught exception type; `None` for a bare `catch`.
    pub ty: Option<crate::types::TypeRef>,
    /// Declared catch variable, when any.
    pub binding: Option<SymbolId>,
    /// `when (…)` filter.
    pub filter: Option<Expr>,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsingStmt {
    pub resources: Vec<UsingResource>,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsingResource {
    /// Declared resource local; `None` for a bare using expression.
    pub symbol: Option<SymbolId>,
    pub init: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStmt {
    pub target: Expr,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsafeStmt {
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedStmt {
    pub declarations: LocalDeclStmt,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GotoStmt {
    pub target: GotoTarget,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GotoTarget {
    Label(String),
    Case(ConstValue),
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledStmt {
    pub label: String,
    pub stmt: Box<Stmt>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldReturnStmt {
    pub value: Expr,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldBreakStmt {
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFunctionStmt {
    pub symbol: SymbolId,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyStmt {
    pub span: TextRange,
}
