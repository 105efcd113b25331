//! Node manifests and the Next.js version constant.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::{Captures, Regex};
use semver::Version;
use serde_json::Value;
use tracing::{debug, warn};

use super::{FileError, FileResult, read_optional, read_required, write_atomic};
use crate::version::parse_triple;

static CONSTANT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(export\s+const\s+APP_VERSION(?:\s*:\s*string)?\s*=\s*['"])\d+\.\d+\.\d+(?:-[^'"]+)?(['"])"#,
    )
    .expect("hardcoded regex must compile")
});

/// Serialize JSON the way npm writes it: two-space indent, trailing newline.
fn to_npm_json(value: &Value) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Set `"version"` in `package.json` text, keeping key order.
pub fn set_manifest_version(content: &str, version: &Version) -> serde_json::Result<String> {
    let mut manifest: Value = serde_json::from_str(content)?;
    if let Some(obj) = manifest.as_object_mut() {
        obj.insert("version".into(), Value::String(version.to_string()));
    }
    to_npm_json(&manifest)
}

/// The manifest's `version`, when it is a plain `x.y.z`.
pub fn manifest_version(content: &str) -> Option<Version> {
    let manifest: Value = serde_json::from_str(content).ok()?;
    parse_triple(manifest.get("version")?.as_str()?).ok()
}

/// Update the version fields a lockfile already has.
///
/// Only the top-level `version` and `packages[""].version` are touched, and
/// only when present. Returns `None` when the text is not JSON.
pub fn set_lockfile_version(content: &str, version: &Version) -> Option<String> {
    let mut lock: Value = serde_json::from_str(content).ok()?;
    let v = Value::String(version.to_string());

    if let Some(slot) = lock.get_mut("version") {
        *slot = v.clone();
    }
    if let Some(slot) = lock.pointer_mut("/packages//version") {
        *slot = v;
    }
    to_npm_json(&lock).ok()
}

/// Point `APP_VERSION` at `version`.
///
/// An existing `export const APP_VERSION[: string] = '…'` keeps everything
/// but the literal; anything else is replaced wholesale.
#[must_use]
pub fn replace_constant(existing: Option<&str>, version: &Version) -> String {
    if let Some(text) = existing
        && CONSTANT_PATTERN.is_match(text)
    {
        return CONSTANT_PATTERN
            .replace(text, |caps: &Captures<'_>| {
                format!("{}{version}{}", &caps[1], &caps[2])
            })
            .into_owned();
    }
    format!("export const APP_VERSION: string = '{version}';\n")
}

/// Rewrite `package.json` on disk. Missing or invalid JSON is an error.
pub fn update_manifest(path: &Utf8Path, version: &Version) -> FileResult<()> {
    let current = read_required(path)?;
    let updated = set_manifest_version(&current, version).map_err(|source| FileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &updated)
}

/// Best-effort lockfile update. Returns whether the file was rewritten.
pub fn update_lockfile(path: &Utf8Path, version: &Version) -> bool {
    let current = match read_optional(path) {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!(%path, "no lockfile");
            return false;
        }
        Err(e) => {
            warn!(error = %e, "skipping lockfile");
            return false;
        }
    };
    let Some(updated) = set_lockfile_version(&current, version) else {
        warn!(%path, "lockfile is not valid JSON, leaving it alone");
        return false;
    };
    match write_atomic(path, &updated) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "skipping lockfile");
            false
        }
    }
}

/// Write the version constants module, creating parent directories.
pub fn update_constants(path: &Utf8Path, version: &Version) -> FileResult<()> {
    let existing = read_optional(path)?;
    write_atomic(path, &replace_constant(existing.as_deref(), version))
}
