//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    ///
    /// Stdin is always connected: either to the configured data or to an
    /// empty pipe, so tools reading `-` see end of file instead of blocking
    /// on the terminal.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        // Feed stdin from a separate thread so a child that fills its stdout
        // pipe before draining stdin cannot deadlock us.
        let writer = child.stdin.take().map(|mut stdin| {
            let data = self.stdin.clone().unwrap_or_default();
            std::thread::spawn(move || {
                use std::io::Write;
                stdin.write_all(&data)
            })
        });

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        // A child may exit without draining stdin; report its status instead.
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::trace!("`{}` closed stdin early", self.program.display());
                }
                Ok(Err(e)) if output.status.success() => {
                    return Err(e).with_context(|| {
                        format!("failed to write stdin of `{}`", self.program.display())
                    });
                }
                Ok(_) => {}
                Err(_) => bail!("stdin writer for `{}` panicked", self.program.display()),
            }
        }

        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a C compiler.
pub fn find_c_compiler() -> Option<PathBuf> {
    // Check CC environment variable first
    if let Ok(cc) = std::env::var("CC") {
        if let Some(path) = find_executable(&cc) {
            return Some(path);
        }
    }

    for compiler in &["cc", "gcc", "clang"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}

/// Find the Go toolchain driver.
pub fn find_go() -> Option<PathBuf> {
    find_executable("go")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder_feeds_stdin() {
        let output = ProcessBuilder::new("cat").stdin("hello").exec().unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_child_ignoring_stdin_reports_status() {
        // Large enough to overflow the pipe buffer once the child is gone.
        let input = "x".repeat(1 << 20);
        for _ in 0..8 {
            let output = ProcessBuilder::new("sh")
                .args(["-c", "echo nope >&2; exit 3"])
                .stdin(input.clone())
                .exec()
                .unwrap();

            assert_eq!(output.status.code(), Some(3));
            assert_eq!(String::from_utf8_lossy(&output.stderr), "nope\n");
        }
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cc").args(["-E", "-x", "c", "-"]);

        assert_eq!(pb.display_command(), "cc -E -x c -");
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let err = ProcessBuilder::new("enumgen-definitely-not-a-program")
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
