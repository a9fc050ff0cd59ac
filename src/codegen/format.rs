//! Go source formatting.
//!
//! The builtin formatter understands exactly the subset of Go the renderer
//! produces: line comments, a package clause, and single-line `type` and
//! `const` declarations. It validates every line and prints it in canonical
//! form, so the output matches what `gofumpt` produces for the same input.
//! The external formatters pipe the source through the Go tools instead.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::process::{find_executable, ProcessBuilder};

/// Selects the formatter applied to generated code.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    /// In-process formatter, no Go toolchain needed
    #[default]
    Builtin,
    /// `gofmt` from the Go distribution
    Gofmt,
    /// `gofumpt -extra`
    Gofumpt,
}

impl fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterKind::Builtin => write!(f, "builtin"),
            FormatterKind::Gofmt => write!(f, "gofmt"),
            FormatterKind::Gofumpt => write!(f, "gofumpt"),
        }
    }
}

/// Settings shared by all formatters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Go language version of the target module; gates version-specific rules
    pub lang_version: Option<semver::Version>,
}

impl FormatOptions {
    fn at_least(&self, major: u64, minor: u64) -> bool {
        self.lang_version
            .as_ref()
            .is_some_and(|v| (v.major, v.minor) >= (major, minor))
    }
}

#[derive(Debug, Error, miette::Diagnostic)]
pub enum FormatError {
    #[error("line {line}: {message}")]
    #[diagnostic(code(enumgen::format::invalid_line))]
    InvalidLine { line: usize, message: String },

    #[error("line {line}: `{ident}` is not a valid Go identifier")]
    #[diagnostic(code(enumgen::format::invalid_identifier))]
    InvalidIdentifier { line: usize, ident: String },

    #[error("line {line}: `{literal}` is not a valid Go integer literal")]
    #[diagnostic(code(enumgen::format::invalid_literal))]
    InvalidLiteral { line: usize, literal: String },

    #[error("`{program}` failed: {stderr}")]
    #[diagnostic(code(enumgen::format::formatter))]
    Formatter { program: String, stderr: String },

    #[error("`{program}` not found on PATH")]
    #[diagnostic(
        code(enumgen::format::not_found),
        help("install the Go toolchain or use --formatter builtin")
    )]
    NotFound { program: String },

    #[error("failed to run `{program}`: {message}")]
    #[diagnostic(code(enumgen::format::io))]
    Io { program: String, message: String },
}

/// Turns rendered source into its final form.
pub trait Formatter {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn format(&self, source: &str, options: &FormatOptions) -> Result<String, FormatError>;
}

/// Construct the formatter selected by `kind`.
pub fn formatter_for(kind: FormatterKind) -> Box<dyn Formatter> {
    match kind {
        FormatterKind::Builtin => Box::new(BuiltinFormatter),
        FormatterKind::Gofmt => Box::new(CommandFormatter::gofmt()),
        FormatterKind::Gofumpt => Box::new(CommandFormatter::gofumpt()),
    }
}

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

static IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{Nd}_]*$").unwrap());

static INT_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^-?(?:0[xX](?:_?[0-9a-fA-F])+|0[bB](?:_?[01])+|0[oO](?:_?[0-7])+|0(?:_?[0-7])*|[1-9](?:_?[0-9])*)$",
    )
    .unwrap()
});

static CONST_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^const\s+(\S+)(?:\s+([^\s=]+))?\s*=\s*(\S+)$").unwrap());

/// Comments that tools interpret; they must not gain a space after `//`.
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^//(?:line |extern |export |sys(?:nb)?\b|nolint\b|[a-z0-9]+:[a-z0-9])").unwrap()
});

/// Whether `name` can be declared in Go.
pub fn is_identifier(name: &str) -> bool {
    IDENT.is_match(name) && !GO_KEYWORDS.contains(&name)
}

/// One canonical output line.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Blank,
    Comment(String),
    Package(String),
    Type { name: String, underlying: String },
    Const { name: String, ty: Option<String>, value: String },
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Blank => Ok(()),
            Line::Comment(text) => write!(f, "{}", text),
            Line::Package(name) => write!(f, "package {}", name),
            Line::Type { name, underlying } => write!(f, "type {} {}", name, underlying),
            Line::Const {
                name,
                ty: Some(ty),
                value,
            } => write!(f, "const {} {} = {}", name, ty, value),
            Line::Const {
                name,
                ty: None,
                value,
            } => write!(f, "const {} = {}", name, value),
        }
    }
}

/// In-process formatter for declaration-only files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatter;

impl BuiltinFormatter {
    fn ident(line: usize, text: &str) -> Result<String, FormatError> {
        if is_identifier(text) {
            Ok(text.to_string())
        } else {
            Err(FormatError::InvalidIdentifier {
                line,
                ident: text.to_string(),
            })
        }
    }

    fn literal(line: usize, text: &str, options: &FormatOptions) -> Result<String, FormatError> {
        if !INT_LITERAL.is_match(text) {
            return Err(FormatError::InvalidLiteral {
                line,
                literal: text.to_string(),
            });
        }

        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text),
        };

        let normalized = match digits.get(..2) {
            Some("0X") | Some("0B") | Some("0O") => {
                format!("{}{}", digits[..2].to_ascii_lowercase(), &digits[2..])
            }
            Some(p) if p.starts_with('0') && p != "0x" && p != "0b" && p != "0o" => {
                // Legacy octal such as 0755.
                if options.at_least(1, 13) {
                    format!("0o{}", &digits[1..])
                } else {
                    digits.to_string()
                }
            }
            _ => digits.to_string(),
        };

        Ok(format!("{}{}", sign, normalized))
    }

    fn comment(text: &str) -> String {
        let body = &text[2..];
        if body.is_empty() || body.starts_with([' ', '\t']) || DIRECTIVE.is_match(text) {
            text.to_string()
        } else {
            format!("// {}", body)
        }
    }

    fn parse_line(line: usize, raw: &str, options: &FormatOptions) -> Result<Line, FormatError> {
        let text = raw.trim();
        if text.is_empty() {
            return Ok(Line::Blank);
        }
        if text.starts_with("//") {
            return Ok(Line::Comment(Self::comment(text)));
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        match words.first().copied() {
            Some("package") => match words.as_slice() {
                [_, name] => Ok(Line::Package(Self::ident(line, name)?)),
                _ => Err(FormatError::InvalidLine {
                    line,
                    message: "expected `package <name>`".to_string(),
                }),
            },
            Some("type") => match words.as_slice() {
                [_, name, underlying] => Ok(Line::Type {
                    name: Self::ident(line, name)?,
                    underlying: Self::ident(line, underlying)?,
                }),
                _ => Err(FormatError::InvalidLine {
                    line,
                    message: "expected `type <name> <type>`".to_string(),
                }),
            },
            Some("const") => {
                let caps = CONST_DECL.captures(text).ok_or_else(|| FormatError::InvalidLine {
                    line,
                    message: "expected `const <name> [<type>] = <value>`".to_string(),
                })?;
                let ty = match caps.get(2) {
                    Some(m) => Some(Self::ident(line, m.as_str())?),
                    None => None,
                };
                Ok(Line::Const {
                    name: Self::ident(line, &caps[1])?,
                    ty,
                    value: Self::literal(line, &caps[3], options)?,
                })
            }
            _ => Err(FormatError::InvalidLine {
                line,
                message: format!("unsupported declaration `{}`", text),
            }),
        }
    }
}

impl Formatter for BuiltinFormatter {
    fn name(&self) -> &str {
        "builtin"
    }

    fn format(&self, source: &str, options: &FormatOptions) -> Result<String, FormatError> {
        let mut lines = Vec::new();
        let mut seen_package = false;

        for (i, raw) in source.lines().enumerate() {
            let line = Self::parse_line(i + 1, raw, options)?;
            match &line {
                Line::Package(_) if seen_package => {
                    return Err(FormatError::InvalidLine {
                        line: i + 1,
                        message: "duplicate package clause".to_string(),
                    })
                }
                Line::Package(_) => seen_package = true,
                Line::Type { .. } | Line::Const { .. } if !seen_package => {
                    return Err(FormatError::InvalidLine {
                        line: i + 1,
                        message: "declaration before package clause".to_string(),
                    })
                }
                Line::Blank if matches!(lines.last(), None | Some(Line::Blank)) => continue,
                _ => {}
            }
            lines.push(line);
        }

        if !seen_package {
            return Err(FormatError::InvalidLine {
                line: 1,
                message: "missing package clause".to_string(),
            });
        }
        while lines.last() == Some(&Line::Blank) {
            lines.pop();
        }

        let mut output = String::with_capacity(source.len());
        for line in &lines {
            output.push_str(&line.to_string());
            output.push('\n');
        }
        Ok(output)
    }
}

/// Runs a Go formatting tool with the source on stdin.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    path: Option<PathBuf>,
    extra: bool,
    lang_flag: bool,
}

impl CommandFormatter {
    pub fn gofmt() -> Self {
        CommandFormatter {
            program: "gofmt".to_string(),
            path: None,
            extra: false,
            lang_flag: false,
        }
    }

    pub fn gofumpt() -> Self {
        CommandFormatter {
            program: "gofumpt".to_string(),
            path: None,
            extra: true,
            lang_flag: true,
        }
    }

    /// Run this executable instead of searching PATH.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The command that formats `source`.
    pub fn command(&self, source: &str, options: &FormatOptions) -> Result<ProcessBuilder, FormatError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => find_executable(&self.program).ok_or_else(|| FormatError::NotFound {
                program: self.program.clone(),
            })?,
        };

        let mut pb = ProcessBuilder::new(path);
        if self.extra {
            pb = pb.arg("-extra");
        }
        if self.lang_flag {
            if let Some(v) = &options.lang_version {
                pb = pb.arg("-lang").arg(format!("go{}.{}", v.major, v.minor));
            }
        }
        Ok(pb.stdin(source))
    }
}

impl Formatter for CommandFormatter {
    fn name(&self) -> &str {
        &self.program
    }

    fn format(&self, source: &str, options: &FormatOptions) -> Result<String, FormatError> {
        let pb = self.command(source, options)?;
        tracing::debug!("Formatting with {}", pb.display_command());

        let output = pb.exec().map_err(|e| FormatError::Io {
            program: self.program.clone(),
            message: format!("{:#}", e),
        })?;
        if !output.status.success() {
            return Err(FormatError::Formatter {
                program: self.program.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| FormatError::Formatter {
            program: self.program.clone(),
            stderr: "output is not valid UTF-8".to_string(),
        })
    }
}
