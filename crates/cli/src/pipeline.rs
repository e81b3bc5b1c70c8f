//! Pipeline for compiling a tree of resolved units.
//!
//! The front-end runs outside this process: it resolves the sources and
//! writes one `*.cs.json` tree file per compilation unit into the source
//! directory. This pipeline walks that directory, compiles every unit and
//! writes the mirrored `*.lua` tree, failing fast on the first error.

use crate::cli::Cli;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sharplua_emit::{compile_unit, EmitError, RenderConfig, TransformOptions};
use sharplua_semantic::{CompilationUnit, MetadataIndex, SymbolArena};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of the front-end's resolved tree files.
const TREE_EXT: &str = ".cs.json";

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline error type.
#[derive(Debug)]
pub enum PipelineError {
    /// File I/O error
    Io(std::io::Error),
    /// Malformed tree or metadata file
    Decode { path: PathBuf, error: serde_json::Error },
    /// Compilation error from the emitter
    Emit(EmitError),
    /// Source directory had no tree files
    NoInput(PathBuf),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Decode { path, error } => {
                write!(f, "{}: malformed input: {}", path.display(), error)
            }
            PipelineError::Emit(e) => write!(f, "{}", e),
            PipelineError::NoInput(path) => {
                write!(f, "no resolved tree files under {}", path.display())
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::Io(error)
    }
}

impl From<EmitError> for PipelineError {
    fn from(error: EmitError) -> Self {
        PipelineError::Emit(error)
    }
}

/// One resolved unit as the front-end serialises it.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnitPayload {
    pub arena: SymbolArena,
    pub unit: CompilationUnit,
}

/// Digested form of one XML metadata file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetaFile {
    templates: IndexMap<String, String>,
    ignored: Vec<String>,
    no_field: Vec<String>,
}

/// Load and merge the `-m` metadata files.
pub fn load_metadata(paths: &[PathBuf]) -> PipelineResult<MetadataIndex> {
    let mut index = MetadataIndex::new();
    for path in paths {
        let text = fs::read_to_string(path)?;
        let file: MetaFile =
            serde_json::from_str(&text).map_err(|error| PipelineError::Decode {
                path: path.clone(),
                error,
            })?;
        debug!(
            "metadata {}: {} templates",
            path.display(),
            file.templates.len()
        );
        let mut loaded = MetadataIndex::new();
        for (k, v) in file.templates {
            loaded.add_template(k, v);
        }
        for k in file.ignored {
            loaded.mark_ignored(k);
        }
        for k in file.no_field {
            loaded.mark_no_field(k);
        }
        index.merge(loaded);
    }
    Ok(index)
}

/// Compile everything under the source directory.
pub fn run(cli: &Cli) -> PipelineResult<()> {
    if !cli.libs.is_empty() {
        debug!("libs forwarded to the front-end: {:?}", cli.libs);
    }
    if let Some(csc) = &cli.csc {
        debug!("csc flags forwarded to the front-end: {}", csc);
    }
    let metadata = load_metadata(&cli.meta)?;
    let options = TransformOptions {
        classic: cli.classic,
        export_attributes: cli.export_attributes,
    };
    let config = RenderConfig {
        indent: cli.indent,
        classic: cli.classic,
        semicolons: cli.semicolons,
    };

    let mut compiled = 0usize;
    for entry in WalkDir::new(&cli.source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PipelineError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(TREE_EXT) {
            continue;
        }
        compile_one(entry.path(), &cli.source, &cli.dest, &metadata, options, config)?;
        compiled += 1;
    }
    if compiled == 0 {
        return Err(PipelineError::NoInput(cli.source.clone()));
    }
    info!("compiled {} unit(s)", compiled);
    Ok(())
}

fn compile_one(
    path: &Path,
    source_root: &Path,
    dest_root: &Path,
    metadata: &MetadataIndex,
    options: TransformOptions,
    config: RenderConfig,
) -> PipelineResult<()> {
    debug!("compiling {}", path.display());
    let text = fs::read_to_string(path)?;
    let payload: UnitPayload =
        serde_json::from_str(&text).map_err(|error| PipelineError::Decode {
            path: path.to_path_buf(),
            error,
        })?;

    let lua = compile_unit(&payload.unit, &payload.arena, metadata, options, config)?;

    let relative = path.strip_prefix(source_root).unwrap_or(path);
    let out_path = dest_root.join(output_name(relative));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, lua)?;
    info!("wrote {}", out_path.display());
    Ok(())
}

/// `Foo/Bar.cs.json` becomes `Foo/Bar.lua`.
fn output_name(relative: &Path) -> PathBuf {
    let name = relative.to_string_lossy();
    let stem = name.strip_suffix(TREE_EXT).unwrap_or(&name);
    PathBuf::from(format!("{}.lua", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_mirror_the_tree() {
        assert_eq!(
            output_name(Path::new("Foo/Bar.cs.json")),
            PathBuf::from("Foo/Bar.lua")
        );
        assert_eq!(output_name(Path::new("A.cs.json")), PathBuf::from("A.lua"));
    }
}
