//! The Lua syntax tree the transformer produces.
//!
//! A closed set of nodes: everything the emitter can say, and nothing more.
//! Adapter nodes model source-language concepts Lua has no primitive for;
//! each one expands to a fixed statement sequence in the renderer.

pub mod expr;
pub mod stmt;

pub use expr::{
    ArrayTypeAdapter, CtorAdapter, FunctionExpr, LuaBinaryOp, LuaExpr, LuaLiteral, LuaUnaryOp,
    MemberAccess, PropertyAdapter, TableItem,
};
pub use stmt::{
    ContinueKind, DocStmt, GotoCaseAdapter, LuaBlock, LuaChunk, LuaMember, LuaStmt, LuaTypeDecl,
    ReturnWrap, TryAdapter, TypeDeclKind, UsingAdapter,
};
