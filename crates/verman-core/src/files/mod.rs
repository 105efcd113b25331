//! Version-bearing file formats.
//!
//! Each submodule pairs pure text transforms (`fn(&str, &Version) -> String`)
//! with thin wrappers that read and write the file. The transforms carry
//! all the format knowledge and are what the tests lean on.

pub mod gradle;
pub mod node;
pub mod plain;

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::trace;

/// Errors from reading or writing version files.
#[derive(Error, Debug)]
pub enum FileError {
    /// Failed to read a file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that could not be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A required file does not exist.
    #[error("{0} not found")]
    Missing(Utf8PathBuf),

    /// A JSON file could not be parsed or re-serialized.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// The offending file.
        path: Utf8PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },
}

/// Result alias for file operations.
pub type FileResult<T> = Result<T, FileError>;

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Utf8Path) -> FileResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FileError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a file that must exist.
pub fn read_required(path: &Utf8Path) -> FileResult<String> {
    read_optional(path)?.ok_or_else(|| FileError::Missing(path.to_path_buf()))
}

/// Replace a file's contents atomically, creating parent directories.
///
/// Writes to a temp file in the same directory and renames over the target,
/// so a crash never leaves a half-written manifest behind.
pub fn write_atomic(path: &Utf8Path, contents: &str) -> FileResult<()> {
    let write_err = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    trace!(%path, bytes = contents.len(), "wrote file");
    Ok(())
}
