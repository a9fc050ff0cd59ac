//! C header front end.
//!
//! A header is preprocessed by the host C compiler, tokenized, scanned for
//! enum and typedef declarations, and type checked into an [`EnumTable`]
//! holding the value of every enumerator.

pub mod eval;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

pub use eval::{typecheck, EnumConstant, EnumTable};
pub use host::{Abi, HostToolchain};
pub use preprocess::Preprocessor;
pub use types::{Location, TranslationUnit};

/// Failure anywhere between reading a header and evaluating its enums.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("failed to read header `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no C compiler found")]
    CompilerNotFound,

    #[error("unsupported host ABI `{os}/{arch}`")]
    UnsupportedAbi { os: String, arch: String },

    #[error("failed to query `{}`: {message}", compiler.display())]
    HostConfig { compiler: PathBuf, message: String },

    #[error("failed to preprocess `{}`", header.display())]
    Preprocess { header: PathBuf, stderr: String },

    #[error("{location}: {message}")]
    Parse { location: Location, message: String },

    #[error("{location}: {message}")]
    Typecheck {
        location: Location,
        message: String,
        note: Option<String>,
    },
}

impl HeaderError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            HeaderError::Io { path, source } => Diagnostic::error(format!(
                "failed to read header `{}`",
                path.display()
            ))
            .with_context(source.to_string()),

            HeaderError::CompilerNotFound => {
                Diagnostic::error("no C compiler found to preprocess the header")
                    .with_context("searched $CC, then cc, gcc and clang on PATH")
                    .with_suggestion(suggestions::NO_COMPILER)
            }

            HeaderError::UnsupportedAbi { os, arch } => {
                Diagnostic::error(format!("unsupported host ABI `{}/{}`", os, arch))
                    .with_suggestion(suggestions::UNSUPPORTED_ABI)
            }

            HeaderError::HostConfig { compiler, message } => Diagnostic::error(format!(
                "failed to query include paths from `{}`",
                compiler.display()
            ))
            .with_context(message.clone())
            .with_suggestion(suggestions::NO_COMPILER),

            HeaderError::Preprocess { header, stderr } => {
                let mut diag =
                    Diagnostic::error(format!("failed to preprocess `{}`", header.display()));
                for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                    diag = diag.with_context(line.to_string());
                }
                diag.with_suggestion(suggestions::PREPROCESS_FAILED)
            }

            HeaderError::Parse { location, message } => Diagnostic::error(message.clone())
                .with_location(location.to_string())
                .with_suggestion(suggestions::PARSE_FAILED),

            HeaderError::Typecheck {
                location,
                message,
                note,
            } => {
                let mut diag = Diagnostic::error(message.clone()).with_location(location.to_string());
                if let Some(note) = note {
                    diag = diag.with_context(note.clone());
                }
                diag.with_suggestion(suggestions::PARSE_FAILED)
            }
        }
    }
}

/// A parsed and evaluated header.
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    /// Path the header was read from
    pub source: PathBuf,
    pub unit: TranslationUnit,
    pub enums: EnumTable,
    pub abi: Abi,
}

/// Entry point of the front end.
///
/// Enum values come from our own evaluator; the host compiler then checks
/// the whole header.
#[derive(Debug, Clone, Default)]
pub struct HeaderParser {
    compiler: Option<PathBuf>,
    include_dirs: Vec<PathBuf>,
    abi: Option<Abi>,
}

impl HeaderParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this compiler instead of searching for one.
    pub fn with_compiler(mut self, compiler: Option<PathBuf>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Extra `-I` directories.
    pub fn with_include_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_dirs.extend(dirs);
        self
    }

    /// Evaluate under `abi` instead of the host ABI.
    pub fn with_abi(mut self, abi: Abi) -> Self {
        self.abi = Some(abi);
        self
    }

    fn abi(&self) -> Result<Abi, HeaderError> {
        match &self.abi {
            Some(abi) => Ok(abi.clone()),
            None => Abi::host(),
        }
    }

    /// Read, preprocess and evaluate the header at `path`.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedHeader, HeaderError> {
        let contents = std::fs::read_to_string(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let abi = self.abi()?;

        let toolchain = HostToolchain::detect(self.compiler.as_deref())?;
        let preprocessor =
            Preprocessor::new(&toolchain).include_dirs(self.include_dirs.iter().cloned());
        let preprocessed = preprocessor.run(path, &contents)?;

        let mut parsed = self.parse_preprocessed_with(&preprocessed, path, abi)?;
        // Our scanner only checks declaration shape; the compiler checks the rest.
        preprocessor.check_syntax(path, &preprocessed)?;
        parsed.source = path.to_path_buf();
        Ok(parsed)
    }

    /// Evaluate already-preprocessed text attributed to `path`.
    pub fn parse_preprocessed(&self, text: &str, path: &Path) -> Result<ParsedHeader, HeaderError> {
        let abi = self.abi()?;
        self.parse_preprocessed_with(text, path, abi)
    }

    fn parse_preprocessed_with(
        &self,
        text: &str,
        path: &Path,
        abi: Abi,
    ) -> Result<ParsedHeader, HeaderError> {
        let tokens = lexer::tokenize(text, &path.to_string_lossy())?;
        let unit = parser::parse(&tokens)?;
        tracing::debug!(
            "Parsed {} enums with {} enumerators from {}",
            unit.enums.len(),
            unit.enumerator_count(),
            path.display()
        );

        let enums = typecheck(&unit, &abi)?;

        Ok(ParsedHeader {
            source: path.to_path_buf(),
            unit,
            enums,
            abi,
        })
    }
}
