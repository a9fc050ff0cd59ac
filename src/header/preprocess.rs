//! Preprocessing through the host C compiler.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::util::process::ProcessBuilder;

use super::host::HostToolchain;
use super::types::Location;
use super::HeaderError;

/// `file:line:col: error: message` as printed by GCC and Clang.
static COMPILER_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(.+?):(\d+):(\d+): (?:fatal )?error: (.+)$").unwrap()
});

/// Pseudo file name the preamble is attributed to.
pub const PREAMBLE_FILE: &str = "<enumgen-preamble>";

/// Definitions prepended to every header.
pub const PREAMBLE: &str = "#define __STDC_HOSTED__ 1\n";

/// Build the text fed to the preprocessor: the preamble, then the header
/// body with line numbering restarted at the header's own name.
pub fn translation_unit(file_name: &str, contents: &str) -> String {
    let mut unit = String::with_capacity(contents.len() + 128);
    unit.push_str(&format!("#line 1 \"{}\"\n", PREAMBLE_FILE));
    unit.push_str(PREAMBLE);
    unit.push_str(&format!("#line 1 \"{}\"\n", escape(file_name)));
    unit.push_str(contents);
    if !contents.ends_with('\n') {
        unit.push('\n');
    }
    unit
}

fn escape(file_name: &str) -> String {
    file_name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Runs `cc -E` with the header's include search list.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    compiler: PathBuf,
    include_dirs: Vec<PathBuf>,
    quote_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
}

impl Preprocessor {
    pub fn new(toolchain: &HostToolchain) -> Self {
        Preprocessor {
            compiler: toolchain.compiler.clone(),
            include_dirs: Vec::new(),
            quote_dirs: toolchain.quote_include_paths.clone(),
            system_dirs: toolchain.system_include_paths.clone(),
        }
    }

    /// Directories searched before the compiler's own lists.
    pub fn include_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_dirs.extend(dirs);
        self
    }

    /// The command that preprocesses `header`, reading its body from stdin.
    pub fn command(&self, header: &Path, source: String) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.compiler).args(["-E", "-x", "c"]);

        if let Some(dir) = header.parent().filter(|d| !d.as_os_str().is_empty()) {
            pb = pb.arg("-I").arg(dir);
        }
        for dir in &self.include_dirs {
            pb = pb.arg("-I").arg(dir);
        }
        for dir in &self.quote_dirs {
            pb = pb.arg("-iquote").arg(dir);
        }
        for dir in &self.system_dirs {
            pb = pb.arg("-isystem").arg(dir);
        }

        pb.arg("-").env("LC_ALL", "C").stdin(source)
    }

    /// Preprocess `contents`, the body of `header`.
    pub fn run(&self, header: &Path, contents: &str) -> Result<String, HeaderError> {
        let file_name = header.to_string_lossy();
        let source = translation_unit(&file_name, contents);
        let pb = self.command(header, source);
        tracing::debug!("Preprocessing: {}", pb.display_command());

        let output = pb.exec().map_err(|e| HeaderError::Preprocess {
            header: header.to_path_buf(),
            stderr: format!("{:#}", e),
        })?;
        if !output.status.success() {
            return Err(HeaderError::Preprocess {
                header: header.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| HeaderError::Preprocess {
            header: header.to_path_buf(),
            stderr: "preprocessor output is not valid UTF-8".to_string(),
        })
    }

    /// The command that compiles preprocessed text without generating code.
    pub fn syntax_command(&self, preprocessed: &str) -> ProcessBuilder {
        ProcessBuilder::new(&self.compiler)
            .args(["-fsyntax-only", "-x", "c", "-"])
            .env("LC_ALL", "C")
            .stdin(preprocessed)
    }

    /// Have the compiler reject `preprocessed` if it is not valid C.
    pub fn check_syntax(&self, header: &Path, preprocessed: &str) -> Result<(), HeaderError> {
        let pb = self.syntax_command(preprocessed);
        tracing::debug!("Checking syntax: {}", pb.display_command());

        let output = pb.exec().map_err(|e| HeaderError::HostConfig {
            compiler: self.compiler.clone(),
            message: format!("{:#}", e),
        })?;
        if output.status.success() {
            return Ok(());
        }
        Err(syntax_error(header, &String::from_utf8_lossy(&output.stderr)))
    }
}

/// First error of a failed syntax check, located where the compiler says.
fn syntax_error(header: &Path, stderr: &str) -> HeaderError {
    if let Some(caps) = COMPILER_ERROR.captures(stderr) {
        if let (Ok(line), Ok(column)) = (caps[2].parse::<u32>(), caps[3].parse::<u32>()) {
            return HeaderError::Parse {
                location: Location::new(&caps[1], line, column),
                message: caps[4].trim().to_string(),
            };
        }
    }
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("header is not valid C")
        .to_string();
    HeaderError::Parse {
        location: Location::new(header.to_string_lossy().as_ref(), 1, 1),
        message,
    }
}
