//! Semantic-version parsing and bump arithmetic.
//!
//! Versions here are always plain `major.minor.patch` triples. Pre-release
//! and build metadata are never produced; sources that carry a `-suffix`
//! (Gradle scripts) strip it before calling [`parse_triple`].
//!
//! Bump requests come from the last commit subject, written as
//! `version(<level>): <description>`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The string is not an `x.y.z` triple of non-negative integers.
    #[error("`{0}` is not a plain x.y.z version")]
    NotATriple(String),

    /// The bump level string names nothing we know.
    #[error("unknown bump level `{0}` (expected major, minor or patch)")]
    UnknownLevel(String),

    /// The component to increment is already at its maximum.
    #[error("cannot apply a {level} bump to {version}: component overflows")]
    Overflow {
        /// The version that cannot be bumped.
        version: Version,
        /// The requested level.
        level: BumpLevel,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl BumpLevel {
    /// Lowercase name used in outputs and changelog entries.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// Emoji shown next to changelog entries of this level.
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Major => "🚀",
            Self::Minor => "✨",
            Self::Patch => "🐛",
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(VersionError::UnknownLevel(s.to_string())),
        }
    }
}

/// Output value for "no bump requested".
pub const NO_BUMP: &str = "none";

/// Render an optional level the way CI outputs expect it.
pub fn level_or_none(level: Option<BumpLevel>) -> &'static str {
    level.map_or(NO_BUMP, BumpLevel::as_str)
}

/// Compute the next version by applying a bump level.
///
/// Fails only when the incremented component is already `u64::MAX`.
pub fn next_version(current: &Version, level: BumpLevel) -> VersionResult<Version> {
    let bumped = match level {
        BumpLevel::Patch => current
            .patch
            .checked_add(1)
            .map(|patch| Version::new(current.major, current.minor, patch)),
        BumpLevel::Minor => current
            .minor
            .checked_add(1)
            .map(|minor| Version::new(current.major, minor, 0)),
        BumpLevel::Major => current
            .major
            .checked_add(1)
            .map(|major| Version::new(major, 0, 0)),
    };
    bumped.ok_or_else(|| VersionError::Overflow {
        version: current.clone(),
        level,
    })
}

static TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("hardcoded regex must compile"));

static FIRST_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+\.\d+)").expect("hardcoded regex must compile"));

/// Parse an exact `x.y.z` string.
///
/// Anything else (prefixes, suffixes, whitespace, missing parts) is rejected.
pub fn parse_triple(s: &str) -> VersionResult<Version> {
    let caps = TRIPLE
        .captures(s)
        .ok_or_else(|| VersionError::NotATriple(s.to_string()))?;
    let part = |i: usize| {
        caps[i]
            .parse::<u64>()
            .map_err(|_| VersionError::NotATriple(s.to_string()))
    };
    Ok(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Find the first `x.y.z` run anywhere in `text`.
pub fn find_triple(text: &str) -> Option<Version> {
    FIRST_TRIPLE
        .captures(text)
        .and_then(|caps| parse_triple(&caps[1]).ok())
}

/// Format a version as its CI tag.
pub fn tag_for(prefix: &str, version: &Version) -> String {
    format!("{prefix}{version}")
}

/// Parse a tag back into a version by stripping `prefix`.
///
/// Returns `None` for tags that do not start with the prefix or whose
/// remainder is not a plain triple.
pub fn version_from_tag(prefix: &str, tag: &str) -> Option<Version> {
    tag.strip_prefix(prefix)
        .and_then(|raw| parse_triple(raw).ok())
}

// ──────────────────────────────────────────────
// Commit-subject bump requests
// ──────────────────────────────────────────────

static BUMP_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*version\s*\(\s*(major|minor|patch)\s*\)\s*:\s*(.+)\s*$")
        .expect("hardcoded regex must compile")
});

static BUMP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*version\s*\(\s*(major|minor|patch)\s*\)\s*:\s*")
        .expect("hardcoded regex must compile")
});

/// A bump requested by a commit subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BumpRequest {
    /// Which component to increment.
    pub level: BumpLevel,
    /// Subject text after the `version(<level>):` marker, trimmed.
    pub description: String,
}

/// Extract a bump request from a commit subject.
///
/// Returns `None` for any subject that does not follow
/// `version(major|minor|patch): <text>`; such commits never trigger a bump.
pub fn parse_bump_request(subject: &str) -> Option<BumpRequest> {
    let caps = BUMP_REQUEST.captures(subject)?;
    let level = caps[1].parse().ok()?;
    Some(BumpRequest {
        level,
        description: caps[2].trim().to_string(),
    })
}

/// Strip a leading `version(<level>):` marker from a subject.
///
/// Subjects without the marker are returned trimmed but otherwise intact.
pub fn strip_bump_marker(subject: &str) -> String {
    BUMP_MARKER.replace(subject, "").trim().to_string()
}
