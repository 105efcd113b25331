//! Single-line `VERSION` files.

use camino::Utf8Path;
use semver::Version;
use tracing::debug;

use super::{FileResult, read_optional, write_atomic};
use crate::version::find_triple;

/// Read the first `x.y.z` in a version file, if the file exists.
pub fn read_version(path: &Utf8Path) -> FileResult<Option<Version>> {
    Ok(read_optional(path)?.as_deref().and_then(find_triple))
}

/// Write `version` followed by a newline.
///
/// Returns whether the trimmed previous content differed. An absent file
/// counts as changed.
pub fn update_version_file(path: &Utf8Path, version: &Version) -> FileResult<bool> {
    let previous = read_optional(path)?.unwrap_or_default();
    let target = version.to_string();
    let changed = previous.trim() != target;
    write_atomic(path, &format!("{target}\n"))?;
    debug!(%path, changed, "wrote version file");
    Ok(changed)
}
