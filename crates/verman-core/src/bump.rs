//! Bump calculation: decide whether the last commit asks for a release and
//! what the next version is.
//!
//! All orchestration logic lives here. The CLI only renders the
//! [`BumpDecision`] and writes its [`outputs`](BumpDecision::outputs).
//!
//! Nothing in this stage is fatal. Unreadable commits, tags or files
//! degrade to the next fallback, ending at `default_version`.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::detect::{gradle_file, resolve_project_type};
use crate::files::{self, gradle, node, plain};
use crate::git::{CommitDescriptor, Vcs, version_tag_glob};
use crate::project::{NODE_MANIFEST, ProjectType};
use crate::version::{self, BumpLevel, NO_BUMP, next_version, tag_for, version_from_tag};

/// Where the current version was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "from", rename_all = "lowercase")]
pub enum VersionSource {
    /// The latest matching tag.
    Tag(String),
    /// A project file.
    File(Utf8PathBuf),
    /// The configured `default_version`.
    Default,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "tag {tag}"),
            Self::File(path) => write!(f, "{path}"),
            Self::Default => f.write_str("default_version"),
        }
    }
}

/// Why no bump happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The workflow runs on some other branch.
    NotDefaultBranch {
        /// The branch being built.
        ref_name: String,
    },
    /// The last commit subject carries no `version(<level>):` marker.
    NoBumpRequest,
    /// The current version cannot take the requested bump.
    VersionOverflow {
        /// The version that was found.
        previous: Version,
        /// Where it came from.
        source: VersionSource,
    },
}

/// A run that leaves the version alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBump {
    /// Why.
    #[serde(flatten)]
    pub reason: SkipReason,
    /// The inspected commit; absent when the branch check short-circuits.
    pub commit: Option<CommitDescriptor>,
}

/// A requested bump with everything later stages need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputedBump {
    /// Requested level.
    pub level: BumpLevel,
    /// Commit subject text after the marker.
    pub description: String,
    /// Resolved project type.
    pub project_type: ProjectType,
    /// Version before the bump.
    pub previous: Version,
    /// Where `previous` came from.
    pub source: VersionSource,
    /// Version after the bump.
    pub next: Version,
    /// Tag for `next`.
    pub tag: String,
    /// The commit that requested the bump.
    pub commit: CommitDescriptor,
}

/// Outcome of [`compute_bump`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum BumpDecision {
    /// Nothing to release.
    Skip(SkippedBump),
    /// Release `next`.
    Bump(ComputedBump),
}

impl BumpDecision {
    /// Whether a bump was computed.
    pub const fn is_bump(&self) -> bool {
        matches!(self, Self::Bump(_))
    }

    /// Step outputs in the order they are written.
    pub fn outputs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Skip(SkippedBump { commit: None, .. }) => vec![
                ("version_bumped", "false".into()),
                ("bump_level", NO_BUMP.into()),
            ],
            Self::Skip(SkippedBump {
                commit: Some(commit),
                ..
            }) => vec![
                ("commit_subject", commit.subject.clone()),
                ("commit_sha", commit.short_sha.clone()),
                ("version_bumped", "false".into()),
                ("bump_level", NO_BUMP.into()),
            ],
            Self::Bump(bump) => vec![
                ("commit_subject", bump.commit.subject.clone()),
                ("commit_sha", bump.commit.short_sha.clone()),
                ("bump_level", bump.level.to_string()),
                ("project_type", bump.project_type.to_string()),
                ("version_bumped", "true".into()),
                ("new_version", bump.next.to_string()),
                ("new_tag", bump.tag.clone()),
            ],
        }
    }
}

/// Decide whether `HEAD` requests a bump and compute the next version.
///
/// `root` is the repository root; project files are read from
/// [`Config::project_dir`].
#[instrument(skip(config, vcs), fields(%root))]
pub fn compute_bump(config: &Config, vcs: &dyn Vcs, root: &Utf8Path) -> BumpDecision {
    if config.off_default_branch() {
        let ref_name = config.push_branch().to_string();
        info!(%ref_name, default_branch = %config.default_branch, "not on default branch, skipping");
        return BumpDecision::Skip(SkippedBump {
            reason: SkipReason::NotDefaultBranch { ref_name },
            commit: None,
        });
    }

    let commit = vcs.last_commit().unwrap_or_else(|e| {
        warn!(error = %e, "could not read last commit");
        CommitDescriptor::default()
    });

    let Some(request) = version::parse_bump_request(&commit.subject) else {
        info!(subject = %commit.subject, "no version bump requested");
        return BumpDecision::Skip(SkippedBump {
            reason: SkipReason::NoBumpRequest,
            commit: Some(commit),
        });
    };

    let project_dir = config.project_dir(root);
    let project_type = resolve_project_type(&project_dir, config.project_type);
    let (previous, source) = current_version(config, vcs, project_type, &project_dir);
    let next = match next_version(&previous, request.level) {
        Ok(next) => next,
        Err(e) => {
            warn!(error = %e, %source, "current version cannot be bumped, skipping");
            return BumpDecision::Skip(SkippedBump {
                reason: SkipReason::VersionOverflow { previous, source },
                commit: Some(commit),
            });
        }
    };
    let tag = tag_for(&config.tag_prefix, &next);

    info!(
        level = %request.level,
        %previous,
        %source,
        %next,
        %tag,
        "computed version bump"
    );

    BumpDecision::Bump(ComputedBump {
        level: request.level,
        description: request.description,
        project_type,
        previous,
        source,
        next,
        tag,
        commit,
    })
}

/// Resolve the current version: tag, then project file, then default.
pub fn current_version(
    config: &Config,
    vcs: &dyn Vcs,
    project_type: ProjectType,
    project_dir: &Utf8Path,
) -> (Version, VersionSource) {
    if let Some((version, tag)) = version_from_latest_tag(vcs, &config.tag_prefix) {
        return (version, VersionSource::Tag(tag));
    }

    match version_from_file(config, project_type, project_dir) {
        Ok(Some((version, path))) => return (version, VersionSource::File(path)),
        Ok(None) => debug!(%project_type, "no version in project files"),
        Err(e) => warn!(error = %e, "could not read project version"),
    }

    (config.fallback_version(), VersionSource::Default)
}

fn version_from_latest_tag(vcs: &dyn Vcs, prefix: &str) -> Option<(Version, String)> {
    let tag = match vcs.describe_latest_tag(&version_tag_glob(prefix)) {
        Ok(tag) => tag?,
        Err(e) => {
            warn!(error = %e, "could not describe tags");
            return None;
        }
    };
    let version = version_from_tag(prefix, &tag);
    if version.is_none() {
        debug!(%tag, "latest tag is not a plain version");
    }
    version.map(|v| (v, tag))
}

fn version_from_file(
    config: &Config,
    project_type: ProjectType,
    project_dir: &Utf8Path,
) -> files::FileResult<Option<(Version, Utf8PathBuf)>> {
    let found = match project_type {
        ProjectType::Next => {
            let path = project_dir.join(NODE_MANIFEST);
            files::read_optional(&path)?
                .as_deref()
                .and_then(node::manifest_version)
                .map(|v| (v, path))
        }
        ProjectType::Spring => match gradle_file(project_dir) {
            Some((path, _)) => files::read_optional(&path)?
                .as_deref()
                .and_then(gradle::read_version)
                .map(|v| (v, path)),
            None => None,
        },
        ProjectType::Plain => {
            let path = project_dir.join(&config.plain_version_file);
            plain::read_version(&path)?.map(|v| (v, path))
        }
    };
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MemoryRepo;
    use crate::project::ProjectTypeHint;
    use std::fs;
    use tempfile::TempDir;

    fn root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
    }

    fn expect_bump(decision: BumpDecision) -> ComputedBump {
        match decision {
            BumpDecision::Bump(b) => b,
            BumpDecision::Skip(s) => panic!("expected bump, got skip: {s:?}"),
        }
    }

    #[test]
    fn minor_bump_from_tag() {
        let tmp = TempDir::new().unwrap();
        let repo = MemoryRepo::new()
            .with_commit("init")
            .with_tag("v2.3.1")
            .with_commit("version(minor): add retry support");

        let bump = expect_bump(compute_bump(&Config::default(), &repo, &root(&tmp)));

        assert_eq!(bump.level, BumpLevel::Minor);
        assert_eq!(bump.description, "add retry support");
        assert_eq!(bump.previous, Version::new(2, 3, 1));
        assert_eq!(bump.source, VersionSource::Tag("v2.3.1".into()));
        assert_eq!(bump.next, Version::new(2, 4, 0));
        assert_eq!(bump.tag, "v2.4.0");
        assert_eq!(bump.project_type, ProjectType::Plain);
    }

    #[test]
    fn overflowing_tag_skips_instead_of_panicking() {
        let tmp = TempDir::new().unwrap();
        let repo = MemoryRepo::new()
            .with_commit("init")
            .with_tag("v18446744073709551615.0.0")
            .with_commit("version(major): too far");

        let decision = compute_bump(&Config::default(), &repo, &root(&tmp));
        let BumpDecision::Skip(skip) = &decision else {
            panic!("expected skip, got {decision:?}");
        };
        assert_eq!(
            skip.reason,
            SkipReason::VersionOverflow {
                previous: Version::new(u64::MAX, 0, 0),
                source: VersionSource::Tag("v18446744073709551615.0.0".into()),
            }
        );
        let outputs = decision.outputs();
        assert!(outputs.contains(&("version_bumped", "false".to_string())));
        assert!(outputs.contains(&("bump_level", NO_BUMP.to_string())));
    }

    #[test]
    fn tag_wins_over_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"version":"9.9.9"}"#).unwrap();
        let repo = MemoryRepo::new()
            .with_commit("a")
            .with_tag("v1.0.0")
            .with_commit("version(patch): fix");

        let bump = expect_bump(compute_bump(&Config::default(), &repo, &root(&tmp)));
        assert_eq!(bump.project_type, ProjectType::Next);
        assert_eq!(bump.next, Version::new(1, 0, 1));
    }

    #[test]
    fn package_json_used_without_tags() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"version":"0.4.2"}"#).unwrap();
        let repo = MemoryRepo::new().with_commit("version(major): new api");

        let bump = expect_bump(compute_bump(&Config::default(), &repo, &root(&tmp)));
        assert_eq!(bump.previous, Version::new(0, 4, 2));
        assert!(matches!(bump.source, VersionSource::File(_)));
        assert_eq!(bump.next, Version::new(1, 0, 0));
    }

    #[test]
    fn gradle_suffix_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("build.gradle"),
            "group = 'x'\nversion = '1.2.3-SNAPSHOT'\n",
        )
        .unwrap();
        let repo = MemoryRepo::new().with_commit("version(patch): fix npe");

        let bump = expect_bump(compute_bump(&Config::default(), &repo, &root(&tmp)));
        assert_eq!(bump.project_type, ProjectType::Spring);
        assert_eq!(bump.next, Version::new(1, 2, 4));
    }

    #[test]
    fn plain_file_inside_workdir() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("svc")).unwrap();
        fs::write(tmp.path().join("svc/VERSION"), "3.1.4\n").unwrap();
        let config = Config {
            workdir: Some("svc".into()),
            ..Config::default()
        };
        let repo = MemoryRepo::new().with_commit("Version(Minor): thing");

        let bump = expect_bump(compute_bump(&config, &repo, &root(&tmp)));
        assert_eq!(bump.next, Version::new(3, 2, 0));
    }

    #[test]
    fn default_version_is_last_resort() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            default_version: "1.0.0".into(),
            ..Config::default()
        };
        let repo = MemoryRepo::new()
            .with_commit("a")
            .with_tag("v-nightly")
            .with_commit("version(patch): x");

        let bump = expect_bump(compute_bump(&config, &repo, &root(&tmp)));
        assert_eq!(bump.source, VersionSource::Default);
        assert_eq!(bump.next, Version::new(1, 0, 1));
    }

    #[test]
    fn pinned_type_skips_detection() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"version":"5.0.0"}"#).unwrap();
        let config = Config {
            project_type: ProjectTypeHint::Plain,
            ..Config::default()
        };
        let repo = MemoryRepo::new().with_commit("version(patch): x");

        let bump = expect_bump(compute_bump(&config, &repo, &root(&tmp)));
        assert_eq!(bump.project_type, ProjectType::Plain);
        assert_eq!(bump.next, Version::new(0, 0, 1));
    }

    #[test]
    fn non_matching_subject_skips() {
        let tmp = TempDir::new().unwrap();
        let repo = MemoryRepo::new().with_commit("feat: add thing");

        let decision = compute_bump(&Config::default(), &repo, &root(&tmp));
        assert!(!decision.is_bump());
        let outputs = decision.outputs();
        assert_eq!(outputs[0], ("commit_subject", "feat: add thing".to_string()));
        assert_eq!(outputs[2], ("version_bumped", "false".to_string()));
        assert_eq!(outputs[3], ("bump_level", "none".to_string()));
    }

    #[test]
    fn other_branch_skips_before_reading_commits() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            ref_name: Some("feature/x".into()),
            ..Config::default()
        };
        // no commits at all: reading would fail
        let decision = compute_bump(&config, &MemoryRepo::new(), &root(&tmp));

        match &decision {
            BumpDecision::Skip(s) => {
                assert_eq!(
                    s.reason,
                    SkipReason::NotDefaultBranch {
                        ref_name: "feature/x".into()
                    }
                );
                assert!(s.commit.is_none());
            }
            BumpDecision::Bump(_) => panic!("expected skip"),
        }
        assert_eq!(
            decision.outputs(),
            vec![
                ("version_bumped", "false".to_string()),
                ("bump_level", "none".to_string())
            ]
        );
    }

    #[test]
    fn unreadable_commit_degrades_to_skip() {
        let tmp = TempDir::new().unwrap();
        let decision = compute_bump(&Config::default(), &MemoryRepo::new(), &root(&tmp));
        let outputs = decision.outputs();
        assert_eq!(outputs[0], ("commit_subject", String::new()));
        assert_eq!(outputs[1], ("commit_sha", String::new()));
    }

    #[test]
    fn bump_outputs_are_ordered() {
        let tmp = TempDir::new().unwrap();
        let repo = MemoryRepo::new().with_commit("version(major): v2");
        let decision = compute_bump(&Config::default(), &repo, &root(&tmp));
        let keys: Vec<_> = decision.outputs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "commit_subject",
                "commit_sha",
                "bump_level",
                "project_type",
                "version_bumped",
                "new_version",
                "new_tag"
            ]
        );
    }
}
