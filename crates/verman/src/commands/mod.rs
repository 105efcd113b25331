//! Command implementations

pub mod bump;

pub mod changelog;

pub mod info;

pub mod sync;

pub mod tag;

use anyhow::Context;
use verman_core::config::Config;
use verman_core::project::ProjectTypeHint;

/// Resolve a `--project-type` value against the configured default.
///
/// Absent or blank falls back to the config; anything other than `auto`,
/// `next`, `spring` or `plain` is an error.
pub fn project_type_hint(raw: Option<&str>, config: &Config) -> anyhow::Result<ProjectTypeHint> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(config.project_type),
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid PROJECT_TYPE `{value}`")),
    }
}

/// A value that may arrive as a blank env var.
pub fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}
