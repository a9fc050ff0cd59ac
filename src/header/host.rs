//! Host toolchain and ABI discovery.
//!
//! The front end leans on the host C compiler for preprocessing, so it needs
//! to know which compiler to run and which system include directories that
//! compiler searches. Type sizes for `sizeof` and casts come from [`Abi`].

use std::path::{Path, PathBuf};

use crate::util::process::{find_c_compiler, ProcessBuilder};

use super::HeaderError;

/// Integer type properties of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abi {
    pub os: String,
    pub arch: String,
    /// Whether plain `char` is signed
    pub char_signed: bool,
    /// Width of `long` in bits
    pub long_bits: u32,
    /// Width of pointers in bits
    pub pointer_bits: u32,
}

impl Abi {
    /// Describe the ABI of `os`/`arch` (Rust target naming).
    pub fn new(os: &str, arch: &str) -> Result<Self, HeaderError> {
        let pointer_bits = match arch {
            "x86_64" | "aarch64" | "riscv64" | "powerpc64" | "s390x" | "loongarch64"
            | "mips64" | "sparc64" => 64,
            "x86" | "arm" | "riscv32" | "powerpc" | "mips" | "wasm32" => 32,
            _ => {
                return Err(HeaderError::UnsupportedAbi {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };

        // LLP64 on Windows, LP64/ILP32 everywhere else.
        let long_bits = if os == "windows" { 32 } else { pointer_bits };

        let apple = matches!(os, "macos" | "ios" | "tvos" | "watchos" | "visionos");
        let char_signed = match arch {
            "aarch64" | "arm" => apple || os == "windows",
            "powerpc" | "powerpc64" | "s390x" | "riscv32" | "riscv64" => false,
            _ => true,
        };

        Ok(Abi {
            os: os.to_string(),
            arch: arch.to_string(),
            char_signed,
            long_bits,
            pointer_bits,
        })
    }

    /// The ABI this binary was built for.
    pub fn host() -> Result<Self, HeaderError> {
        Abi::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Width of `size_t` in bits.
    pub fn size_bits(&self) -> u32 {
        self.pointer_bits
    }
}

/// The C compiler used as preprocessor, plus its include search lists.
#[derive(Debug, Clone)]
pub struct HostToolchain {
    pub compiler: PathBuf,
    /// Directories searched for `#include "..."` only
    pub quote_include_paths: Vec<PathBuf>,
    /// Directories searched for `#include <...>`
    pub system_include_paths: Vec<PathBuf>,
}

impl HostToolchain {
    /// Locate a compiler and ask it for its include search paths.
    ///
    /// `compiler` overrides discovery through `$CC` and `PATH`.
    pub fn detect(compiler: Option<&Path>) -> Result<Self, HeaderError> {
        let compiler = match compiler {
            Some(path) => which::which(path).unwrap_or_else(|_| path.to_path_buf()),
            None => find_c_compiler().ok_or(HeaderError::CompilerNotFound)?,
        };

        let (quote_include_paths, system_include_paths) = query_include_paths(&compiler)?;
        tracing::debug!(
            "Using {} with {} system include directories",
            compiler.display(),
            system_include_paths.len()
        );

        Ok(HostToolchain {
            compiler,
            quote_include_paths,
            system_include_paths,
        })
    }
}

/// Run `cc -x c -E -v -` on an empty input and read the search lists.
fn query_include_paths(compiler: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), HeaderError> {
    let pb = ProcessBuilder::new(compiler)
        .args(["-x", "c", "-E", "-v", "-"])
        .env("LC_ALL", "C");

    let output = pb.exec().map_err(|e| HeaderError::HostConfig {
        compiler: compiler.to_path_buf(),
        message: format!("{:#}", e),
    })?;
    if !output.status.success() {
        return Err(HeaderError::HostConfig {
            compiler: compiler.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(parse_search_list(&String::from_utf8_lossy(&output.stderr)))
}

/// Extract the quote and angle-bracket include directories from `cc -v` output.
pub fn parse_search_list(stderr: &str) -> (Vec<PathBuf>, Vec<PathBuf>) {
    #[derive(PartialEq)]
    enum Section {
        None,
        Quote,
        System,
    }

    let mut quote = Vec::new();
    let mut system = Vec::new();
    let mut section = Section::None;

    for line in stderr.lines() {
        if line.starts_with("#include \"...\" search starts here") {
            section = Section::Quote;
            continue;
        }
        if line.starts_with("#include <...> search starts here") {
            section = Section::System;
            continue;
        }
        if line.starts_with("End of search list") {
            break;
        }
        if section == Section::None || !line.starts_with(' ') {
            continue;
        }

        let dir = line
            .trim()
            .trim_end_matches(" (framework directory)")
            .trim_end_matches(" (headermap)");
        match section {
            Section::Quote => quote.push(PathBuf::from(dir)),
            Section::System => system.push(PathBuf::from(dir)),
            Section::None => {}
        }
    }

    (quote, system)
}
