//! The semantic-tree transformer.
//!
//! One depth-first pass over a resolved compilation unit, producing the
//! Lua tree the renderer prints.

pub mod context;
pub mod decl;
pub mod expr;
pub mod stmt;

pub use context::{TransformOptions, Transformer};

use crate::error::EmitResult;
use crate::lua::LuaChunk;
use sharplua_semantic::{CompilationUnit, MetadataProvider, SymbolArena};

/// Transform one compilation unit into its Lua chunk.
pub fn transform_unit(
    unit: &CompilationUnit,
    arena: &SymbolArena,
    metadata: &dyn MetadataProvider,
    options: TransformOptions,
) -> EmitResult<LuaChunk> {
    let mut ctx = Transformer::new(
        arena,
        metadata,
        options,
        unit.file.clone(),
        &unit.line_index,
    );
    let chunk = decl::DeclLowering::lower_unit(&mut ctx, unit)?;
    log::debug!(
        "transformed {}: {} top-level statement(s)",
        unit.file,
        chunk.statements.len()
    );
    Ok(chunk)
}
