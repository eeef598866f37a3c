//! Prettier as the output formatter.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use oats_core::{FormatError, Formatter};
use tracing::{debug, trace};

/// Configuration files Prettier picks up, in lookup order within one directory.
pub const CONFIG_FILES: &[&str] = &[
    ".prettierrc",
    ".prettierrc.json",
    ".prettierrc.yaml",
    ".prettierrc.yml",
    ".prettierrc.json5",
    ".prettierrc.toml",
    ".prettierrc.js",
    ".prettierrc.cjs",
    "prettier.config.js",
    "prettier.config.cjs",
];

/// Path Prettier uses to pick the TypeScript parser for stdin input.
const STDIN_FILEPATH: &str = "schema.d.ts";

/// Runs the `prettier` executable found on `PATH`.
#[derive(Debug, Clone)]
pub struct Prettier {
    binary: PathBuf,
    search_from: PathBuf,
}

impl Prettier {
    /// Locate `prettier` on `PATH`; configuration discovery starts at `search_from`.
    pub fn locate(search_from: &Path) -> Option<Self> {
        let binary = which::which("prettier").ok()?;
        debug!(binary = %binary.display(), "Found prettier.");
        Some(Self {
            binary,
            search_from: search_from.to_path_buf(),
        })
    }
}

/// Find the nearest Prettier configuration, walking up from `start`.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

impl Formatter for Prettier {
    fn format(&self, source: &str, style_config: Option<&Path>) -> Result<String, FormatError> {
        let config = match style_config {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config(&self.search_from),
        };
        trace!(config = ?config, "Running prettier.");

        let mut command = Command::new(&self.binary);
        command
            .arg("--stdin-filepath")
            .arg(STDIN_FILEPATH)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(config) = &config {
            command.arg("--config").arg(config);
        }

        let mut child = command.spawn().map_err(|err| {
            FormatError::Unavailable(format!("failed to start {}: {err}", self.binary.display()))
        })?;

        // Feed stdin from a separate thread so a full stdout pipe cannot block us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.to_string();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let output = child.wait_with_output()?;
        let written = match writer {
            Some(writer) => writer
                .join()
                .map_err(|_| FormatError::Unavailable("prettier input thread panicked".into()))?,
            None => Ok(()),
        };

        // A rejected input can close stdin early; the exit status is the better error.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FormatError::Syntax(stderr.trim().to_string()));
        }
        written?;
        String::from_utf8(output.stdout)
            .map_err(|err| FormatError::Syntax(format!("prettier produced invalid UTF-8: {err}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_config_walks_up() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("packages/api/src");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_config(&nested), None);

        fs::write(root.path().join(".prettierrc.json"), "{}").unwrap();
        assert_eq!(discover_config(&nested), Some(root.path().join(".prettierrc.json")));

        fs::write(root.path().join("packages/.prettierrc"), "semi: false").unwrap();
        assert_eq!(discover_config(&nested), Some(root.path().join("packages/.prettierrc")));
    }

    #[test]
    fn test_discover_config_prefers_rc_file_order() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("prettier.config.js"), "module.exports = {}").unwrap();
        fs::write(root.path().join(".prettierrc.yaml"), "semi: false").unwrap();
        assert_eq!(discover_config(root.path()), Some(root.path().join(".prettierrc.yaml")));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let prettier = Prettier {
            binary: PathBuf::from("/nonexistent/oats-test/prettier"),
            search_from: PathBuf::from("/"),
        };
        let err = prettier.format("export type A = string;\n", None).unwrap_err();
        assert!(matches!(err, FormatError::Unavailable(_)));
    }
}
