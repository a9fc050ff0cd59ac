//! Go language version discovery.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::util::process::{find_go, ProcessBuilder};

static GO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:go)?(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

/// Parse `1.21`, `go1.21.3` or `1.22rc1` into a version.
pub fn parse_lang_version(text: &str) -> Option<Version> {
    let caps = GO_VERSION.captures(text.trim())?;
    let major = caps[1].parse().ok()?;
    let minor = caps[2].parse().ok()?;
    let patch = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    Some(Version::new(major, minor, patch))
}

/// Ask `go list` for the language version of the module containing `dir`.
///
/// Every failure is logged and yields `None`.
pub fn query_lang_version(dir: &Path) -> Option<Version> {
    let Some(go) = find_go() else {
        tracing::debug!("go not found on PATH, using default formatting rules");
        return None;
    };

    let pb = ProcessBuilder::new(go)
        .args(["list", "-m", "-f", "{{.GoVersion}}"])
        .cwd(dir);
    let output = match pb.exec() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("`{}` failed: {:#}", pb.display_command(), e);
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(
            "`{}` exited with {}: {}",
            pb.display_command(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        tracing::debug!("module in {} declares no go version", dir.display());
        return None;
    }

    let version = parse_lang_version(first);
    match &version {
        Some(v) => tracing::debug!("Go language version {}.{}", v.major, v.minor),
        None => tracing::warn!("ignoring unrecognized Go version `{}`", first),
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_lang_version() {
        assert_eq!(parse_lang_version("1.21"), Some(Version::new(1, 21, 0)));
        assert_eq!(parse_lang_version("go1.22.3"), Some(Version::new(1, 22, 3)));
        assert_eq!(parse_lang_version(" 1.23rc1\n"), Some(Version::new(1, 23, 0)));
        assert_eq!(parse_lang_version(""), None);
        assert_eq!(parse_lang_version("devel"), None);
        assert_eq!(parse_lang_version("1"), None);
    }

    #[test]
    fn test_query_outside_module_is_none() {
        // Either go is missing or the empty directory is not a module.
        let dir = TempDir::new().unwrap();
        assert_eq!(query_lang_version(dir.path()), None);
    }
}
