//! Expression nodes of the resolved tree.
//!
//! Every expression carries its span and, where the emitter needs it, the
//! resolved type and symbol the front-end attached.

use crate::arena::SymbolId;
use crate::stmt::BlockStmt;
use crate::symbol::ParamInfo;
use crate::types::{ConstValue, SpecialType, TypeRef};
use serde::{Deserialize, Serialize};
use text_size::TextRange;

/// Expression kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Literal(LiteralExpr),
    Identifier(IdentifierExpr),
    This(ThisExpr),
    Base(BaseExpr),
    Member(MemberExpr),
    Index(IndexExpr),
    Invocation(InvocationExpr),
    ObjectCreation(ObjectCreationExpr),
    ArrayCreation(ArrayCreationExpr),
    AnonymousObject(AnonymousObjectExpr),
    DelegateCreation(DelegateCreationExpr),
    Lambda(LambdaExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Assignment(AssignmentExpr),
    Conditional(ConditionalExpr),
    ConditionalAccess(ConditionalAccessExpr),
    Interpolated(InterpolatedExpr),
    Tuple(TupleExpr),
    TypeOf(TypeOfExpr),
    SizeOf(SizeOfExpr),
    Default(DefaultExpr),
    NameOf(NameOfExpr),
    Is(IsExpr),
    As(AsExpr),
    Cast(CastExpr),
    StackAlloc(StackAllocExpr),
    Paren(ParenExpr),
}

impl Expr {
    pub fn span(&self) -> TextRange {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Identifier(e) => e.span,
            Expr::This(e) => e.span,
            Expr::Base(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Invocation(e) => e.span,
            Expr::ObjectCreation(e) => e.span,
            Expr::ArrayCreation(e) => e.span,
            Expr::AnonymousObject(e) => e.span,
            Expr::DelegateCreation(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Assignment(e) => e.span,
            Expr::Conditional(e) => e.span,
            Expr::ConditionalAccess(e) => e.span,
            Expr::Interpolated(e) => e.span,
            Expr::Tuple(e) => e.span,
            Expr::TypeOf(e) => e.span,
            Expr::SizeOf(e) => e.span,
            Expr::Default(e) => e.span,
            Expr::NameOf(e) => e.span,
            Expr::Is(e) => e.span,
            Expr::As(e) => e.span,
            Expr::Cast(e) => e.span,
            Expr::StackAlloc(e) => e.span,
            Expr::Paren(e) => e.span,
        }
    }

    /// The static type the front-end attached to this expression.
    pub fn ty(&self) -> TypeRef {
        match self {
            Expr::Literal(e) => e.ty.clone(),
            Expr::Identifier(e) => e.ty.clone(),
            Expr::This(e) => e.ty.clone(),
            Expr::Base(e) => e.ty.clone(),
            Expr::Member(e) => e.ty.clone(),
            Expr::Index(e) => e.ty.clone(),
            Expr::Invocation(e) => e.ty.clone(),
            Expr::ObjectCreation(e) => e.ty.clone(),
            Expr::ArrayCreation(e) => {
                TypeRef::multi_array(e.element.clone(), e.rank)
            }
            Expr::AnonymousObject(e) => e.ty.clone(),
            Expr::DelegateCreation(e) => e.ty.clone(),
            Expr::Lambda(e) => e.ty.clone(),
            Expr::Binary(e) => e.ty.clone(),
            Expr::Unary(e) => e.ty.clone(),
            Expr::Assignment(e) => e.ty.clone(),
            Expr::Conditional(e) => e.ty.clone(),
            Expr::ConditionalAccess(e) => e.ty.clone(),
            Expr::Interpolated(_) => TypeRef::Special(SpecialType::String),
            Expr::Tuple(e) => TypeRef::Tuple(e.elements.iter().map(Expr::ty).collect()),
            Expr::TypeOf(_) => TypeRef::Special(SpecialType::Object),
            Expr::SizeOf(_) => TypeRef::Special(SpecialType::Int32),
            Expr::Default(e) => e.target.clone(),
            Expr::NameOf(_) => TypeRef::Special(SpecialType::String),
            Expr::Is(_) => TypeRef::Special(SpecialType::Bool),
            Expr::As(e) => e.target.clone(),
            Expr::Cast(e) => e.target.clone(),
            Expr::StackAlloc(e) => TypeRef::array(e.element.clone()),
            Expr::Paren(e) => e.inner.ty(),
        }
    }

    /// True for literal `null`.
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal(l) if l.value == ConstValue::Nil)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub value: ConstValue,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierExpr {
    pub symbol: SymbolId,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThisExpr {
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseExpr {
    pub ty: TypeRef,
    pub span: TextRange,
}

/// `target.member` access. `target` is `None` for implicit-`this` and
/// static accesses from within the declaring type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberExpr {
    pub target: Option<Box<Expr>>,
    pub member: SymbolId,
    pub ty: TypeRef,
    pub span: TextRange,
}

/// Indexer or array element access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexExpr {
    pub target: Box<Expr>,
    pub args: Vec<Expr>,
    /// The indexer property, when the target is not an array.
    pub indexer: Option<SymbolId>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    /// Resolved target method; `None` when invoking a delegate value.
    pub method: Option<SymbolId>,
    pub type_args: Vec<TypeRef>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectCreationExpr {
    pub ty: TypeRef,
    /// Resolved constructor; `None` for default struct construction.
    pub ctor: Option<SymbolId>,
    pub args: Vec<Expr>,
    pub initializer: Option<ObjectInitializer>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInitializer {
    pub entries: Vec<InitializerEntry>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InitializerEntry {
    /// `{ X = v }`
    Member { member: SymbolId, value: Expr },
    /// `{ [i] = v }` through an indexer.
    Index { args: Vec<Expr>, value: Expr },
    /// Collection-initializer element routed to `Add`.
    Add { args: Vec<Expr> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayCreationExpr {
    pub element: TypeRef,
    pub rank: u32,
    /// Explicit dimension sizes, empty when inferred from the initializer.
    pub sizes: Vec<Expr>,
    pub initializer: Option<Vec<Expr>>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousObjectExpr {
    pub fields: Vec<AnonymousField>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousField {
    pub name: String,
    pub value: Expr,
}

/// `new D(expr)`; delegate construction is the identity on `expr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateCreationExpr {
    pub inner: Box<Expr>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<ParamInfo>,
    pub body: LambdaBody,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(BlockStmt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Coalesce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    /// User-defined operator method, when overload resolution picked one.
    pub operator_method: Option<SymbolId>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub operator_method: Option<SymbolId>,
    pub ty: TypeRef,
    pub span: TextRange,
}

/// Simple or compound assignment. Deconstructing assignments carry a tuple
/// expression as the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentExpr {
    pub target: Box<Expr>,
    /// The underlying operator for compound assignment (`+=` etc.).
    pub op: Option<BinaryOp>,
    pub value: Box<Expr>,
    pub ty: TypeRef,
    pub span: TextRange,
}

/// Ternary `cond ? a : b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    pub when_true: Box<Expr>,
    pub when_false: Box<Expr>,
    pub ty: TypeRef,
    pub span: TextRange,
}

/// A `?.` chain rooted at `root`. Links apply left to right; each link
/// marked conditional re-tests the running value against nil.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalAccessExpr {
    pub root: Box<Expr>,
    pub links: Vec<AccessLink>,
    pub ty: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLink {
    /// True when this link was written with `?.` / `?[`.
    pub conditional: bool,
    pub kind: LinkKind,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkKind {
    Member { member: SymbolId },
    Index { args: Vec<Expr> },
    Invoke { args: Vec<Expr>, method: Option<SymbolId> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolatedExpr {
    pub parts: Vec<InterpolationPart>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InterpolationPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleExpr {
    pub elements: Vec<Expr>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeOfExpr {
    pub target: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeOfExpr {
    pub target: TypeRef,
    /// Oracle-evaluated size, when the front-end computed one.
    pub value: Option<u32>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultExpr {
    pub target: TypeRef,
    /// Oracle-evaluated constant, when available.
    pub value: Option<ConstValue>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameOfExpr {
    pub name: String,
    pub span: TextRange,
}

/// `operand is T` with an optional declaration pattern binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsExpr {
    pub operand: Box<Expr>,
    pub target: TypeRef,
    pub binding: Option<SymbolId>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsExpr {
    pub operand: Box<Expr>,
    pub target: TypeRef,
    pub span: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Numeric,
    Reference,
    Enum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub operand: Box<Expr>,
    pub target: TypeRef,
    pub kind: CastKind,
    /// User-defined conversion operator, when one applies.
    pub operator_method: Option<SymbolId>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackAllocExpr {
    pub element: TypeRef,
    pub size: Box<Expr>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParenExpr {
    pub inner: Box<Expr>,
    pub span: TextRange,
}
