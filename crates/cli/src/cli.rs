//! Command-line interface for sharplua.

use clap::Parser;
use std::path::PathBuf;

/// sharplua - compile resolved C#-family semantic trees to Lua
#[derive(Debug, Parser)]
#[command(name = "sharplua")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the front-end's resolved tree files
    #[arg(short = 's', long = "source")]
    pub source: PathBuf,

    /// Output directory; mirrors the source tree
    #[arg(short = 'd', long = "dest")]
    pub dest: PathBuf,

    /// Referenced libraries, forwarded to the front-end
    #[arg(short = 'l', long = "libs", value_delimiter = ';')]
    pub libs: Vec<PathBuf>,

    /// Digested metadata files with per-method code templates
    #[arg(short = 'm', long = "meta", value_delimiter = ';')]
    pub meta: Vec<PathBuf>,

    /// Extra compiler flags, forwarded to the front-end
    #[arg(long = "csc")]
    pub csc: Option<String>,

    /// Classic dialect: no goto, no bitwise operators, no `//`
    #[arg(short = 'c', long = "classic")]
    pub classic: bool,

    /// Indent width of the emitted Lua
    #[arg(short = 'i', long = "indent", default_value_t = 2)]
    pub indent: usize,

    /// Terminate simple statements with semicolons
    #[arg(long = "semicolons", alias = "sem")]
    pub semicolons: bool,

    /// Emit `__attributes__` tables on type declarations
    #[arg(short = 'a', long = "export-attributes")]
    pub export_attributes: bool,
}
