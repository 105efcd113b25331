//! Step outputs for GitHub Actions.
//!
//! Values are appended to the file named by `GITHUB_OUTPUT` as `key=value`
//! lines. Outside Actions there is no such file and writes are skipped.

use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from writing step outputs.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The output file could not be opened or appended to.
    #[error("failed to append outputs to {path}: {source}")]
    Append {
        /// The `GITHUB_OUTPUT` file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result alias for output writes.
pub type OutputResult<T> = Result<T, OutputError>;

/// Flatten a value to a single line: newlines become spaces, ends trimmed.
pub fn sanitize(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Appends `key=value` lines to the Actions output file.
#[derive(Debug, Clone, Default)]
pub struct ActionOutput {
    path: Option<Utf8PathBuf>,
}

impl ActionOutput {
    /// Write to `path`, or nowhere when `None` or empty.
    pub fn new(path: Option<&Utf8Path>) -> Self {
        Self {
            path: path.filter(|p| !p.as_str().is_empty()).map(Utf8Path::to_path_buf),
        }
    }

    /// The output file, if one is configured.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Append every pair in order.
    pub fn write_all<K, V>(&self, pairs: &[(K, V)]) -> OutputResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let Some(path) = &self.path else {
            debug!(count = pairs.len(), "GITHUB_OUTPUT not set, outputs not written");
            return Ok(());
        };

        let mut buf = String::new();
        for (key, value) in pairs {
            buf.push_str(key.as_ref());
            buf.push('=');
            buf.push_str(&sanitize(value.as_ref()));
            buf.push('\n');
        }

        let write_err = |source| OutputError::Append {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(buf.as_bytes()).map_err(write_err)?;
        debug!(%path, count = pairs.len(), "wrote step outputs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_newlines() {
        assert_eq!(sanitize("  fix\r\nthing\nnow \r"), "fix thing now");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn appends_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("out")).unwrap();
        std::fs::write(&path, "existing=1\n").unwrap();

        let out = ActionOutput::new(Some(&path));
        out.write_all(&[("version_bumped", "true"), ("commit_subject", "a\nb")])
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing=1\nversion_bumped=true\ncommit_subject=a b\n"
        );
    }

    #[test]
    fn unset_path_is_a_noop() {
        let out = ActionOutput::new(Some(Utf8Path::new("")));
        assert!(out.path().is_none());
        out.write_all(&[("k", "v")]).unwrap();
    }
}
