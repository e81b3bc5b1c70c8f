//! Resolved semantic tree model for the sharplua emitter.
//!
//! The front-end (lexing, parsing, binding, type checking) lives outside
//! this repository. What it hands over, and what this crate defines, is a
//! fully-resolved tree: every expression, declaration, type reference and
//! member reference carries the symbol the front-end attached to it. The
//! emitter consumes these trees read-only.
//!
//! The whole model derives `serde` so trees can cross the front-end process
//! boundary as JSON documents.

pub mod arena;
pub mod build;
pub mod decl;
pub mod expr;
pub mod oracle;
pub mod source;
pub mod stmt;
pub mod symbol;
pub mod types;

pub use arena::{SymbolArena, SymbolId};
pub use decl::{CompilationUnit, DocComment, MemberDecl, TypeDecl, TypeMember};
pub use expr::Expr;
pub use oracle::{qualified_name, MetadataIndex, MetadataProvider};
pub use source::{LineIndex, SourceLocation};
pub use stmt::{BlockStmt, Stmt};
pub use symbol::{
    Accessibility, MethodInfo, OperatorKind, ParamInfo, ParamMode, SymbolData, SymbolKind,
    TypeInfo, TypeKind,
};
pub use types::{ConstValue, SpecialType, TypeRef};
