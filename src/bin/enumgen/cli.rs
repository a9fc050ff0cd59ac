//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use enumgen::codegen::FormatterKind;

/// enumgen - generate Go constants from the enums of a C header
#[derive(Parser)]
#[command(name = "enumgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// C header to read
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Go file to generate
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Go package name of the generated file
    #[arg(long, value_name = "NAME")]
    pub pkg: String,

    /// Symbol prefix stripped from enumerator names [default: WGPU]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Exclude a type from the output (repeatable) [default: SType, NativeSType]
    #[arg(long = "skip-type", value_name = "NAME")]
    pub skip_types: Vec<String>,

    /// Formatter applied to the generated code [default: builtin]
    #[arg(long, value_enum)]
    pub formatter: Option<FormatterKind>,

    /// Go language version, e.g. 1.21 (skips `go list`)
    #[arg(long, value_name = "VERSION")]
    pub lang_version: Option<String>,

    /// C compiler used to preprocess the header
    #[arg(long, value_name = "PATH")]
    pub cc: Option<PathBuf>,

    /// Additional include directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH", env = "ENUMGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Exit with an error if the output file is not up to date; never writes
    #[arg(long)]
    pub check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
