//! Implementation of the generator pipeline.
//!
//! Header → enum table → groups → Go source → formatted file. Every stage
//! either succeeds completely or aborts the run before the output file is
//! touched.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;

use crate::codegen::format::is_identifier;
use crate::codegen::{formatter_for, query_lang_version, FormatOptions, FormatterKind, Renderer};
use crate::enums::Collector;
use crate::header::{EnumTable, HeaderParser};
use crate::util::config::EnumsConfig;
use crate::util::fs;

/// Options for a generator run.
#[derive(Debug, Clone)]
pub struct GenOptions {
    /// C header to read
    pub input: PathBuf,

    /// Go file to write
    pub output: PathBuf,

    /// Go package name of the output file
    pub package: String,

    /// Prefix, denylist and sentinel settings
    pub enums: EnumsConfig,

    /// C compiler used for preprocessing (default: discovered)
    pub compiler: Option<PathBuf>,

    /// Extra include directories for the preprocessor
    pub include_dirs: Vec<PathBuf>,

    pub formatter: FormatterKind,

    /// Go language version; queried with `go list` when unset
    pub lang_version: Option<Version>,

    /// Compare with the existing output instead of writing it
    pub check: bool,
}

impl GenOptions {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        package: impl Into<String>,
    ) -> Self {
        GenOptions {
            input: input.into(),
            output: output.into(),
            package: package.into(),
            enums: EnumsConfig::default(),
            compiler: None,
            include_dirs: Vec::new(),
            formatter: FormatterKind::default(),
            lang_version: None,
            check: false,
        }
    }

    /// Directory holding the output file.
    fn output_dir(&self) -> &Path {
        match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

/// Result of a generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenOutcome {
    /// The output file was written
    Written { types: usize, constants: usize },
    /// Check mode: the output file matches
    UpToDate,
    /// Check mode: the output file is missing or differs
    Stale,
}

/// Run the full pipeline for `opts`.
pub fn gen_enums(opts: &GenOptions) -> Result<GenOutcome> {
    if !is_identifier(&opts.package) {
        bail!("invalid Go package name `{}`", opts.package);
    }

    tracing::info!("Reading {}", opts.input.display());
    let header = HeaderParser::new()
        .with_compiler(opts.compiler.clone())
        .with_include_dirs(opts.include_dirs.iter().cloned())
        .parse_file(&opts.input)?;

    let generated = generate_source(&header.enums, opts)?;

    if opts.check {
        let existing = fs::read_to_string_opt(&opts.output)?;
        return Ok(match existing {
            Some(current) if current == generated.source => {
                tracing::info!("{} is up to date", opts.output.display());
                GenOutcome::UpToDate
            }
            Some(_) => {
                tracing::warn!("{} is out of date", opts.output.display());
                GenOutcome::Stale
            }
            None => {
                tracing::warn!("{} does not exist", opts.output.display());
                GenOutcome::Stale
            }
        });
    }

    fs::ensure_dir(opts.output_dir())?;
    fs::write_atomic(&opts.output, &generated.source)?;
    tracing::info!(
        "Wrote {} constants in {} types to {}",
        generated.constants,
        generated.types,
        opts.output.display()
    );

    Ok(GenOutcome::Written {
        types: generated.types,
        constants: generated.constants,
    })
}

/// Formatted Go source plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub source: String,
    pub types: usize,
    pub constants: usize,
}

/// Collect, sort, render and format the enumerators of `table`.
pub fn generate_source(table: &EnumTable, opts: &GenOptions) -> Result<Generated> {
    let mut enums = Collector::new(&opts.enums).collect(table)?;
    enums.sort();

    let rendered = Renderer::new(opts.package.as_str()).render(&enums)?;

    let lang_version = match &opts.lang_version {
        Some(v) => Some(v.clone()),
        None => query_lang_version(opts.output_dir()),
    };
    let formatter = formatter_for(opts.formatter);
    let source = formatter
        .format(&rendered, &FormatOptions { lang_version })
        .with_context(|| format!("failed to format generated code with {}", formatter.name()))?;

    Ok(Generated {
        source,
        types: enums.len(),
        constants: enums.member_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{EnumConstant, Location};
    use tempfile::TempDir;

    fn table(entries: &[(&str, i64)]) -> EnumTable {
        let mut table = EnumTable::new();
        for (name, value) in entries {
            table
                .insert(EnumConstant {
                    name: name.to_string(),
                    scope: None,
                    value: *value,
                    location: Location::new("webgpu.h", 1, 1),
                })
                .unwrap();
        }
        table
    }

    fn opts() -> GenOptions {
        let mut opts = GenOptions::new("webgpu.h", "out/enums.go", "wgpu");
        opts.lang_version = Some(Version::new(1, 21, 0));
        opts
    }

    #[test]
    fn test_generate_source() {
        let generated = generate_source(
            &table(&[
                ("WGPUFoo_B", 1),
                ("WGPUFoo_A", 0),
                ("WGPUFoo_Force32", 0x7fff_ffff),
                ("WGPUBar_X", -1),
                ("WGPUSType_Invalid", 0),
            ]),
            &opts(),
        )
        .unwrap();

        assert_eq!(generated.types, 2);
        assert_eq!(generated.constants, 3);
        assert_eq!(
            generated.source,
            "// Code generated by enumgen. DO NOT EDIT.\n\
             \n\
             package wgpu\n\
             \n\
             type Bar uint32\n\
             \n\
             const Bar_X Bar = 4294967295\n\
             \n\
             type Foo uint32\n\
             \n\
             const Foo_A Foo = 0\n\
             const Foo_B Foo = 1\n"
        );
    }

    #[test]
    fn test_generate_source_ignores_declaration_order() {
        let first =
            generate_source(&table(&[("WGPUBar_Y", 3), ("WGPUBar_Z", 3)]), &opts()).unwrap();
        let second =
            generate_source(&table(&[("WGPUBar_Z", 3), ("WGPUBar_Y", 3)]), &opts()).unwrap();
        assert_eq!(first, second);
        assert!(first.source.ends_with("const Bar_Y Bar = 3\nconst Bar_Z Bar = 3\n"));
    }

    #[test]
    fn test_generate_source_rejects_empty_type_name() {
        let err = generate_source(&table(&[("__FE_DENORM", 2)]), &opts()).unwrap_err();
        assert!(err.to_string().contains("empty type name"));
    }

    #[test]
    fn test_generate_source_rejects_wide_values() {
        let err = generate_source(&table(&[("WGPUBig_X", 1 << 33)]), &opts()).unwrap_err();
        assert!(err.to_string().contains("does not fit in uint32"));
    }

    #[test]
    fn test_invalid_package_name() {
        let mut opts = opts();
        opts.package = "func".to_string();
        let err = gen_enums(&opts).unwrap_err();
        assert!(err.to_string().contains("invalid Go package name"));
    }

    #[test]
    fn test_missing_input_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut opts = opts();
        opts.input = dir.path().join("missing.h");
        opts.output = dir.path().join("gen").join("enums.go");

        assert!(gen_enums(&opts).is_err());
        assert!(!dir.path().join("gen").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_then_check() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("webgpu.h");
        std::fs::write(
            &input,
            "typedef enum WGPUFoo { WGPUFoo_A = 0, WGPUFoo_B = 1, WGPUFoo_Force32 = 0x7FFFFFFF } WGPUFoo;\n",
        )
        .unwrap();

        let mut opts = opts();
        opts.input = input;
        opts.output = dir.path().join("enums.go");

        let outcome = gen_enums(&opts).unwrap();
        assert_eq!(outcome, GenOutcome::Written { types: 1, constants: 2 });
        let written = std::fs::read_to_string(&opts.output).unwrap();
        assert!(written.contains("const Foo_B Foo = 1\n"));
        assert!(!written.contains("Force32"));

        opts.check = true;
        assert_eq!(gen_enums(&opts).unwrap(), GenOutcome::UpToDate);

        std::fs::write(&opts.output, "package wgpu\n").unwrap();
        assert_eq!(gen_enums(&opts).unwrap(), GenOutcome::Stale);
        assert_eq!(std::fs::read_to_string(&opts.output).unwrap(), "package wgpu\n");
    }

    #[test]
    fn test_output_dir_defaults_to_cwd() {
        let opts = GenOptions::new("a.h", "enums.go", "x");
        assert_eq!(opts.output_dir(), Path::new("."));
    }
}
