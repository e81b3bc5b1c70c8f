//! # sharplua emitter
//!
//! This crate turns resolved semantic trees (`sharplua-semantic`) into Lua
//! source linked against the hand-written runtime library.
//!
//! ## Architecture
//!
//! The pipeline inside this crate:
//! 1. **Input**: a resolved `CompilationUnit` plus the metadata oracle
//! 2. **Transform**: one depth-first pass lowering expressions, statements
//!    and declarations into the Lua tree (`transform`)
//! 3. **Render**: deterministic textual emission (`render`)
//!
//! The transformer is fail-fast: unsupported constructs and contract
//! violations abort the unit with a located [`EmitError`]. The renderer is
//! pure; given the same tree and [`RenderConfig`] it produces byte-identical
//! output.

pub mod error;
pub mod lua;
pub mod names;
pub mod render;
pub mod runtime;
pub mod template;
pub mod transform;

pub use error::{EmitError, EmitResult};
pub use lua::{LuaChunk, LuaExpr, LuaStmt};
pub use render::{render, render_expr, RenderConfig};
pub use transform::{transform_unit, TransformOptions};

use sharplua_semantic::{CompilationUnit, MetadataProvider, SymbolArena};

/// Compile one resolved unit to Lua text.
pub fn compile_unit(
    unit: &CompilationUnit,
    arena: &SymbolArena,
    metadata: &dyn MetadataProvider,
    options: TransformOptions,
    config: RenderConfig,
) -> EmitResult<String> {
    let chunk = transform_unit(unit, arena, metadata, options)?;
    Ok(render(&chunk, config))
}
