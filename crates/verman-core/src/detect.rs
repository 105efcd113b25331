//! Project detection: figure out which files carry the version.
//!
//! Probes a directory for marker files to pick a
//! [`ProjectType`](crate::project::ProjectType). Detection never fails:
//! a directory with no markers is a `plain` project.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use verman_core::detect;
//! use verman_core::project::ProjectTypeHint;
//!
//! let project_type = detect::resolve_project_type(Utf8Path::new("."), ProjectTypeHint::Auto);
//! println!("Detected: {project_type}");
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::project::{GRADLE_GROOVY, GRADLE_KOTLIN, ProjectType, ProjectTypeHint};

/// Resolve the project type: an explicit hint wins, otherwise probe `dir`.
#[instrument(fields(dir = %dir))]
pub fn resolve_project_type(dir: &Utf8Path, hint: ProjectTypeHint) -> ProjectType {
    if let Some(pinned) = hint.pinned() {
        debug!(%pinned, "project type pinned by configuration");
        return pinned;
    }
    detect_project_type(dir)
}

/// Identify the project type by scanning for marker files.
///
/// Priority follows [`ProjectType::DETECTABLE`]; falls back to
/// [`ProjectType::Plain`].
pub fn detect_project_type(dir: &Utf8Path) -> ProjectType {
    for project_type in ProjectType::DETECTABLE {
        let found = project_type
            .marker_files()
            .iter()
            .any(|marker| dir.join(marker).is_file());
        if found {
            debug!(%project_type, "detected project type");
            return *project_type;
        }
    }
    info!("no package.json or build.gradle(.kts) found, treating as plain project");
    ProjectType::Plain
}

/// Gradle build script flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradleDialect {
    /// `build.gradle.kts`
    Kotlin,
    /// `build.gradle`
    Groovy,
}

impl GradleDialect {
    /// Quote character for string literals in this dialect.
    pub const fn quote(self) -> char {
        match self {
            Self::Kotlin => '"',
            Self::Groovy => '\'',
        }
    }

    /// Infer the dialect from a build-script file name.
    pub fn from_path(path: &Utf8Path) -> Self {
        if path.extension() == Some("kts") {
            Self::Kotlin
        } else {
            Self::Groovy
        }
    }
}

/// Locate the Gradle build script in `dir`. Kotlin DSL wins over Groovy.
pub fn gradle_file(dir: &Utf8Path) -> Option<(Utf8PathBuf, GradleDialect)> {
    [
        (GRADLE_KOTLIN, GradleDialect::Kotlin),
        (GRADLE_GROOVY, GradleDialect::Groovy),
    ]
    .into_iter()
    .map(|(name, dialect)| (dir.join(name), dialect))
    .find(|(path, _)| path.is_file())
    .inspect(|(path, dialect)| debug!(%path, ?dialect, "found gradle build script"))
}

/// Check whether a binary is available on `PATH`.
pub fn has_binary(name: &str) -> bool {
    which::which(name).is_ok()
}
