//! Changelog maintenance.
//!
//! Every write puts the configured H1 heading on top with the new
//! `## [x.y.z] - YYYY-MM-DD` section right below it. The previous document
//! follows verbatim, banner and all, minus its own changelog heading line.
//! The attribution banner is only written when the file is created.
//!
//! [`render`] is pure. [`update_changelog`] wraps it with file IO.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::ChangelogConfig;
use crate::files::{self, FileError};
use crate::version::{BumpLevel, VersionError, parse_triple, strip_bump_marker};

/// First line of the attribution banner.
pub const BANNER_START: &str = "<!-- vm-banner-start -->";
/// Last line of the attribution banner.
pub const BANNER_END: &str = "<!-- vm-banner:end -->";

static CHANGELOG_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#\s+.*changelog\s*$").expect("hardcoded regex must compile")
});

/// Errors from changelog updates.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// No version was supplied.
    #[error("NEW_VERSION is required")]
    MissingVersion,

    /// No bump level was supplied.
    #[error("BUMP_LEVEL is required (major, minor or patch)")]
    MissingLevel,

    /// The version or level could not be parsed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The changelog could not be read or written.
    #[error(transparent)]
    File(#[from] FileError),
}

/// Result alias for changelog operations.
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// One release section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    /// Released version.
    pub version: Version,
    /// Bump level that produced it.
    pub level: BumpLevel,
    /// Commit subject without the bump marker.
    pub description: String,
    /// Short hash of the requesting commit; may be empty.
    pub commit_sha: String,
    /// Release date.
    pub date: NaiveDate,
}

impl ChangelogEntry {
    /// Build an entry from raw stage inputs.
    ///
    /// `version` and `level` are mandatory. Blank strings count as missing.
    pub fn from_inputs(
        version: Option<&str>,
        level: Option<&str>,
        commit_subject: &str,
        commit_sha: &str,
        date: NaiveDate,
    ) -> ChangelogResult<Self> {
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ChangelogError::MissingVersion)?;
        let level = level
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(ChangelogError::MissingLevel)?;

        Ok(Self {
            version: parse_triple(version)?,
            level: level.parse()?,
            description: strip_bump_marker(commit_subject),
            commit_sha: commit_sha.trim().to_string(),
            date,
        })
    }

    /// Markdown for this section, ending in a newline.
    pub fn render(&self) -> String {
        let mut out = format!(
            "## [{}] - {}\n\n- {} **{}**: {}\n",
            self.version,
            self.date.format("%Y-%m-%d"),
            self.level.emoji(),
            self.level,
            self.description
        );
        if !self.commit_sha.is_empty() {
            out.push_str(&format!("- commit: `{}`\n", self.commit_sha));
        }
        out
    }
}

/// Attribution banner written when the changelog is first created.
pub fn banner(config: &ChangelogConfig) -> String {
    let mut lines = vec![
        BANNER_START.to_string(),
        "🔧 **Automated version changelog**".to_string(),
        String::new(),
        "This file is created and maintained by the release workflow.".to_string(),
    ];
    match (&config.author, &config.author_url) {
        (Some(name), Some(url)) => lines.push(format!("Maintainer: **{name}** · {url}")),
        (Some(name), None) => lines.push(format!("Maintainer: **{name}**")),
        (None, Some(url)) => lines.push(format!("Maintainer: {url}")),
        (None, None) => {}
    }
    if let Some(url) = &config.workflow_url {
        lines.push(format!("Workflow: {url}"));
    }
    lines.push(String::new());
    lines.push("New sections are added automatically; older ones are never rewritten.".to_string());
    lines.push(BANNER_END.to_string());
    lines.join("\n")
}

/// Result of [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The full new document.
    pub text: String,
    /// `false` when an existing document had no recognizable changelog
    /// heading, so its first lines were kept as they were.
    pub header_recognized: bool,
}

/// Produce the new changelog text.
///
/// - No existing document: banner, blank line, `header`, blank line, entry.
/// - Existing document: `header`, blank line, entry, blank line, then the
///   old document. An H1 ending in "Changelog" at its top (after an
///   optional banner) is dropped so the heading is not repeated.
pub fn render(existing: Option<&str>, entry: &str, banner: &str, header: &str) -> Rendered {
    let top = format!("{header}\n\n{entry}");
    let Some(existing) = existing else {
        return Rendered {
            text: format!("{banner}\n\n{top}"),
            header_recognized: true,
        };
    };

    if existing.trim().is_empty() {
        return Rendered {
            text: top,
            header_recognized: true,
        };
    }

    let (previous, header_recognized) = match heading_span(existing) {
        Some((start, end)) => {
            let rest = existing[end..].trim_start_matches(['\r', '\n']);
            let kept = format!("{}{rest}", &existing[..start]);
            (kept.trim_start_matches(['\r', '\n']).to_string(), true)
        }
        None => (existing.to_string(), false),
    };

    let mut text = String::with_capacity(top.len() + previous.len() + 1);
    text.push_str(&top);
    if !previous.is_empty() {
        text.push('\n');
        text.push_str(&previous);
    }
    Rendered {
        text,
        header_recognized,
    }
}

/// Byte range of the changelog heading line, if the document starts (after
/// an optional banner and blank lines) with one.
fn heading_span(doc: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    let mut in_banner = false;
    let mut banner_allowed = true;

    for line in doc.split_inclusive('\n') {
        let start = offset;
        let trimmed = line.trim();
        offset += line.len();

        if in_banner {
            in_banner = trimmed != BANNER_END;
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if banner_allowed && trimmed == BANNER_START {
            in_banner = true;
            banner_allowed = false;
            continue;
        }
        return CHANGELOG_HEADING
            .is_match(trimmed)
            .then_some((start, offset));
    }
    None
}

/// What [`update_changelog`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogOutcome {
    /// The changelog file.
    pub path: Utf8PathBuf,
    /// Whether the file was created by this run.
    pub created: bool,
    /// See [`Rendered::header_recognized`].
    pub header_recognized: bool,
    /// The section that was added.
    pub entry: ChangelogEntry,
}

/// Add `entry` to the changelog at `root` / `config.path`.
#[instrument(skip(config, entry), fields(version = %entry.version, %root))]
pub fn update_changelog(
    config: &ChangelogConfig,
    entry: ChangelogEntry,
    root: &Utf8Path,
) -> ChangelogResult<ChangelogOutcome> {
    let path = root.join(&config.path);
    let existing = files::read_optional(&path)?;
    let created = existing.is_none();

    let rendered = render(
        existing.as_deref(),
        &entry.render(),
        &banner(config),
        &config.header,
    );
    if !rendered.header_recognized {
        warn!(
            %path,
            "no changelog heading found; keeping the existing content below the new section"
        );
    }

    files::write_atomic(&path, &rendered.text)?;
    info!(%path, created, "changelog updated");

    Ok(ChangelogOutcome {
        path,
        created,
        header_recognized: rendered.header_recognized,
        entry,
    })
}
