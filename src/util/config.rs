//! Configuration file support for enumgen.
//!
//! A generator run can be described by a TOML file passed with `--config`:
//!
//! ```toml
//! [enums]
//! prefix = "WGPU"
//! skip_types = ["SType", "NativeSType"]
//! sentinel_suffix = "_Force32"
//!
//! [host]
//! cc = "/usr/bin/clang"
//! include_dirs = ["third_party/webgpu-headers"]
//!
//! [format]
//! formatter = "gofumpt"
//! lang_version = "1.21"
//! ```
//!
//! Every field is optional. Command-line flags take precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::codegen::FormatterKind;

/// Symbol prefix stripped from every enumerator of the upstream header.
pub const DEFAULT_PREFIX: &str = "WGPU";

/// Suffix of the placeholder enumerators that only force a 32-bit width.
pub const DEFAULT_SENTINEL_SUFFIX: &str = "_Force32";

/// Groups holding native-only structure type tags.
pub const DEFAULT_SKIP_TYPES: &[&str] = &["SType", "NativeSType"];

/// enumgen configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Enum collection settings
    pub enums: EnumsConfig,

    /// Host C toolchain settings
    pub host: HostConfig,

    /// Output formatting settings
    pub format: FormatConfig,
}

/// How enumerators are turned into groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumsConfig {
    /// Prefix stripped from enumerator names
    pub prefix: String,

    /// Group names excluded from the output
    pub skip_types: Vec<String>,

    /// Enumerators ending with this suffix are dropped
    pub sentinel_suffix: String,
}

impl Default for EnumsConfig {
    fn default() -> Self {
        EnumsConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            skip_types: DEFAULT_SKIP_TYPES.iter().map(|s| s.to_string()).collect(),
            sentinel_suffix: DEFAULT_SENTINEL_SUFFIX.to_string(),
        }
    }
}

/// Host C toolchain used to preprocess the header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Path to the C compiler (defaults to $CC, then cc/gcc/clang on PATH)
    pub cc: Option<PathBuf>,

    /// Additional include directories searched before the system paths
    pub include_dirs: Vec<PathBuf>,
}

/// Output formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Formatter applied to the generated source
    pub formatter: FormatterKind,

    /// Go language version; skips the `go list` query when set
    pub lang_version: Option<String>,
}

impl GenConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve relative paths against `base`, the config file's directory.
    pub fn rebase_paths(&mut self, base: &Path) {
        for dir in &mut self.host.include_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        if let Some(cc) = &self.host.cc {
            // Bare program names are looked up on PATH, leave them alone.
            if cc.is_relative() && cc.components().count() > 1 {
                self.host.cc = Some(base.join(cc));
            }
        }
    }
}
