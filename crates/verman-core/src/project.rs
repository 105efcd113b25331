//! Project types and their version-bearing files.
//!
//! Pure types and data. Probing the filesystem lives in [`crate::detect`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A host project category that decides which files carry the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Node-based project (Next.js and friends), detected via `package.json`.
    Next,
    /// Gradle-based project (Spring Boot), detected via `build.gradle[.kts]`.
    Spring,
    /// Anything else: the version lives in a bare text file.
    Plain,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProjectType {
    /// Lowercase name used in CI outputs and config.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Spring => "spring",
            Self::Plain => "plain",
        }
    }

    /// Marker files that identify this project type, in lookup order.
    ///
    /// `Plain` is the fallback and has no markers.
    pub const fn marker_files(self) -> &'static [&'static str] {
        match self {
            Self::Next => &[NODE_MANIFEST],
            Self::Spring => &[GRADLE_KOTLIN, GRADLE_GROOVY],
            Self::Plain => &[],
        }
    }

    /// Project types with marker files, in detection priority order.
    pub const DETECTABLE: &[Self] = &[Self::Next, Self::Spring];
}

/// Node package manifest.
pub const NODE_MANIFEST: &str = "package.json";
/// Node lockfile, updated best-effort next to the manifest.
pub const NODE_LOCKFILE: &str = "package-lock.json";
/// Gradle Kotlin-DSL build script. Preferred over the Groovy one.
pub const GRADLE_KOTLIN: &str = "build.gradle.kts";
/// Gradle Groovy build script.
pub const GRADLE_GROOVY: &str = "build.gradle";
/// Spring application config that can optionally carry the version.
pub const SPRING_APP_YAML: &str = "src/main/resources/application.yml";

/// Error for a project type string that names nothing we know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown project type `{0}` (expected next, spring, plain or auto)")]
pub struct UnknownProjectType(pub String);

impl FromStr for ProjectType {
    type Err = UnknownProjectType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" => Ok(Self::Next),
            "spring" => Ok(Self::Spring),
            "plain" => Ok(Self::Plain),
            _ => Err(UnknownProjectType(s.to_string())),
        }
    }
}

/// Project type as configured: either pinned or left to detection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectTypeHint {
    /// Probe the working directory for marker files.
    #[default]
    // Actions pass unset inputs as empty strings.
    #[serde(alias = "")]
    Auto,
    /// Pin to [`ProjectType::Next`].
    Next,
    /// Pin to [`ProjectType::Spring`].
    Spring,
    /// Pin to [`ProjectType::Plain`].
    Plain,
}

impl ProjectTypeHint {
    /// The pinned project type, or `None` for [`ProjectTypeHint::Auto`].
    pub const fn pinned(self) -> Option<ProjectType> {
        match self {
            Self::Auto => None,
            Self::Next => Some(ProjectType::Next),
            Self::Spring => Some(ProjectType::Spring),
            Self::Plain => Some(ProjectType::Plain),
        }
    }
}

impl fmt::Display for ProjectTypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pinned() {
            Some(t) => t.fmt(f),
            None => f.write_str("auto"),
        }
    }
}

impl FromStr for ProjectTypeHint {
    type Err = UnknownProjectType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        Ok(match trimmed.parse::<ProjectType>()? {
            ProjectType::Next => Self::Next,
            ProjectType::Spring => Self::Spring,
            ProjectType::Plain => Self::Plain,
        })
    }
}
