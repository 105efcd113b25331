//! Finalize a release: fold the changelog into the release commit, tag it
//! and push both.
//!
//! Safe to re-run. An existing tag is never recreated and an existing
//! release commit is normalized rather than duplicated. Only push failures
//! (and failing to create a missing tag) are fatal; every other git hiccup
//! is logged and the run moves on.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::git::{GitError, Vcs};
use crate::version::{VersionError, parse_bump_request, parse_triple};

static RELEASE_COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"chore\(release\): v\d+\.\d+\.\d+").expect("hardcoded regex must compile")
});

/// Errors from release finalization.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// No tag was supplied.
    #[error("TAG is required")]
    MissingTag,

    /// No version was supplied.
    #[error("NEW_VERSION is required")]
    MissingVersion,

    /// The version is not `x.y.z`.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The tag did not exist and could not be created.
    #[error("failed to create tag {tag}: {source}")]
    Tag {
        /// Tag name.
        tag: String,
        /// Underlying git failure.
        source: GitError,
    },

    /// The remote rejected a push.
    #[error("failed to push {refspec} to {remote}: {source}")]
    Push {
        /// Remote name.
        remote: String,
        /// What was pushed.
        refspec: String,
        /// Underlying git failure.
        source: GitError,
    },
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// The release to finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    /// Tag to create, e.g. `v1.4.0`.
    pub tag: String,
    /// Version being released.
    pub version: Version,
    /// Text appended to the release commit subject; may be empty.
    pub description: String,
}

impl ReleaseRequest {
    /// Build a request from raw stage inputs.
    ///
    /// `tag` and `version` are mandatory. The description is
    /// `release_description` when non-blank, otherwise whatever follows the
    /// bump marker in `commit_subject`.
    pub fn from_inputs(
        tag: Option<&str>,
        version: Option<&str>,
        release_description: Option<&str>,
        commit_subject: Option<&str>,
    ) -> ReleaseResult<Self> {
        let tag = non_blank(tag).ok_or(ReleaseError::MissingTag)?;
        let version = non_blank(version).ok_or(ReleaseError::MissingVersion)?;

        let description = non_blank(release_description)
            .map(str::to_string)
            .or_else(|| {
                commit_subject
                    .and_then(parse_bump_request)
                    .map(|req| req.description)
            })
            .unwrap_or_default();

        Ok(Self {
            tag: tag.to_string(),
            version: parse_triple(version)?,
            description,
        })
    }

    /// `chore(release): v<version>[ <description>] <skip_token>`.
    pub fn commit_message(&self, skip_token: &str) -> String {
        let mut msg = format!("chore(release): v{}", self.version);
        for part in [self.description.trim(), skip_token.trim()] {
            if !part.is_empty() {
                msg.push(' ');
                msg.push_str(part);
            }
        }
        msg
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Whether a commit message looks like a release commit.
pub fn is_release_commit(message: &str) -> bool {
    RELEASE_COMMIT.is_match(message)
}

/// One step [`finalize_release`] took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReleaseAction {
    /// The tag already existed; changelog edits went into their own commit.
    ChangelogCommitted {
        /// Commit message used.
        message: String,
    },
    /// A new release commit was created.
    ReleaseCommitted {
        /// Commit message used.
        message: String,
    },
    /// The existing release commit got the standard message.
    ReleaseAmended {
        /// Commit message used.
        message: String,
    },
    /// The changelog was folded into the existing release commit.
    ChangelogFolded,
    /// A commit was attempted but git had nothing to record.
    NothingToCommit,
    /// The annotated tag was created.
    TagCreated {
        /// Tag name.
        tag: String,
    },
    /// The tag existed already and was left alone.
    TagExists {
        /// Tag name.
        tag: String,
    },
    /// A push succeeded.
    Pushed {
        /// Remote name.
        remote: String,
        /// What was pushed.
        refspec: String,
    },
}

/// Everything [`finalize_release`] did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseOutcome {
    /// Actions in the order they happened.
    pub actions: Vec<ReleaseAction>,
}

impl ReleaseOutcome {
    /// Whether the tag was created by this run.
    pub fn created_tag(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, ReleaseAction::TagCreated { .. }))
    }
}

/// Commit, tag and push a release.
///
/// Uses `config.skip_token`, `config.changelog.path`, `config.git` and the
/// branch from [`Config::push_branch`].
#[instrument(skip(config, vcs), fields(tag = %request.tag, version = %request.version))]
pub fn finalize_release(
    request: &ReleaseRequest,
    config: &Config,
    vcs: &dyn Vcs,
) -> ReleaseResult<ReleaseOutcome> {
    let mut outcome = ReleaseOutcome::default();
    let tag = request.tag.as_str();
    let skip = config.skip_token.as_str();
    let changelog: &Utf8Path = &config.changelog.path;

    if let Err(e) = vcs.set_identity(&config.git.user_name, &config.git.user_email) {
        warn!(error = %e, "could not configure commit identity");
    }

    let last_message = vcs.last_commit_message().unwrap_or_else(|e| {
        warn!(error = %e, "could not read last commit message");
        String::new()
    });
    let already_tagged = tag_exists(vcs, tag);
    let is_release = is_release_commit(&last_message);
    let changelog_touched = vcs.has_changes(&[changelog]).unwrap_or_else(|e| {
        warn!(error = %e, "could not check changelog status");
        false
    });
    debug!(already_tagged, is_release, changelog_touched, "release state");

    if already_tagged {
        if changelog_touched {
            let message = format!("docs(changelog): update for {tag} {skip}")
                .trim_end()
                .to_string();
            stage(vcs, changelog);
            outcome.actions.push(match vcs.commit(&message) {
                Ok(()) => ReleaseAction::ChangelogCommitted { message },
                Err(e) => nothing_to_commit(&e),
            });
        }
    } else {
        if changelog_touched {
            stage(vcs, changelog);
        }
        let message = request.commit_message(skip);

        if !is_release {
            outcome.actions.push(match vcs.commit(&message) {
                Ok(()) => ReleaseAction::ReleaseCommitted { message },
                Err(e) => nothing_to_commit(&e),
            });
        } else if skip.is_empty() || !last_message.contains(skip) {
            match vcs.amend(Some(&message)) {
                Ok(()) => outcome.actions.push(ReleaseAction::ReleaseAmended { message }),
                Err(e) => warn!(error = %e, "could not amend release commit"),
            }
        } else if changelog_touched {
            match vcs.amend(None) {
                Ok(()) => outcome.actions.push(ReleaseAction::ChangelogFolded),
                Err(e) => warn!(error = %e, "could not fold changelog into release commit"),
            }
        }
    }

    if tag_exists(vcs, tag) {
        info!(%tag, "tag already exists");
        outcome.actions.push(ReleaseAction::TagExists {
            tag: tag.to_string(),
        });
    } else {
        vcs.create_annotated_tag(tag, tag)
            .map_err(|source| ReleaseError::Tag {
                tag: tag.to_string(),
                source,
            })?;
        info!(%tag, "created tag");
        outcome.actions.push(ReleaseAction::TagCreated {
            tag: tag.to_string(),
        });
    }

    let remote = config.git.remote.as_str();
    for refspec in [tag.to_string(), format!("HEAD:{}", config.push_branch())] {
        vcs.push(remote, &refspec)
            .map_err(|source| ReleaseError::Push {
                remote: remote.to_string(),
                refspec: refspec.clone(),
                source,
            })?;
        info!(%remote, %refspec, "pushed");
        outcome.actions.push(ReleaseAction::Pushed {
            remote: remote.to_string(),
            refspec,
        });
    }

    Ok(outcome)
}

fn tag_exists(vcs: &dyn Vcs, tag: &str) -> bool {
    vcs.tag_exists(tag).unwrap_or_else(|e| {
        warn!(error = %e, %tag, "could not list tags");
        false
    })
}

fn stage(vcs: &dyn Vcs, path: &Utf8Path) {
    if let Err(e) = vcs.stage(&[path]) {
        warn!(error = %e, %path, "could not stage changelog");
    }
}

fn nothing_to_commit(err: &GitError) -> ReleaseAction {
    info!(error = %err, "nothing to commit");
    ReleaseAction::NothingToCommit
}
