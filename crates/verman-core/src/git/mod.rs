//! Git access for release workflows.
//!
//! Everything the stages need from version control goes through the narrow
//! [`Vcs`] trait. [`GitCli`] shells out to `git`, so we inherit the runner's
//! credentials, signing and hooks; [`memory::MemoryRepo`] is an in-memory
//! stand-in for tests.

pub mod memory;

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

pub use memory::MemoryRepo;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "push").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Subject line and abbreviated hash of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitDescriptor {
    /// First line of the commit message.
    pub subject: String,
    /// Abbreviated commit hash.
    pub short_sha: String,
}

/// The version-control operations the release stages rely on.
///
/// Paths are relative to the repository root the implementation was opened
/// on. Implementations never retry; callers decide whether a failure is
/// fatal or ignorable.
pub trait Vcs {
    /// Subject and short hash of `HEAD`.
    fn last_commit(&self) -> GitResult<CommitDescriptor>;

    /// Full message (subject and body) of `HEAD`.
    fn last_commit_message(&self) -> GitResult<String>;

    /// Nearest tag reachable from `HEAD` matching the glob `pattern`.
    ///
    /// Returns `Ok(None)` when no tag matches.
    fn describe_latest_tag(&self, pattern: &str) -> GitResult<Option<String>>;

    /// Whether a tag with exactly this name exists.
    fn tag_exists(&self, tag: &str) -> GitResult<bool>;

    /// Create an annotated tag on `HEAD`.
    fn create_annotated_tag(&self, tag: &str, message: &str) -> GitResult<()>;

    /// Stage the given paths.
    fn stage(&self, paths: &[&Utf8Path]) -> GitResult<()>;

    /// Commit whatever is staged.
    fn commit(&self, message: &str) -> GitResult<()>;

    /// Amend `HEAD`, replacing its message or keeping it when `None`.
    fn amend(&self, message: Option<&str>) -> GitResult<()>;

    /// Push `refspec` to `remote`.
    fn push(&self, remote: &str, refspec: &str) -> GitResult<()>;

    /// Whether any of `paths` has staged or unstaged changes.
    fn has_changes(&self, paths: &[&Utf8Path]) -> GitResult<bool>;

    /// Set the committer identity for this repository.
    fn set_identity(&self, name: &str, email: &str) -> GitResult<()>;
}

/// [`Vcs`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: Utf8PathBuf,
}

impl GitCli {
    /// Operate on the repository containing `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory git commands run in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Check if `root` is inside a git work tree.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn is_inside_repo(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run a git command and return its stdout.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root.as_std_path())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepo);
            }

            Err(GitError::Command {
                command: args.first().unwrap_or(&"").to_string(),
                stderr,
            })
        }
    }

    /// Run a git command with trailing `-- <paths>`.
    fn git_with_paths(&self, args: &[&str], paths: &[&Utf8Path]) -> GitResult<String> {
        let mut full: Vec<&str> = args.to_vec();
        full.push("--");
        full.extend(paths.iter().map(|p| p.as_str()));
        self.git(&full)
    }
}

impl Vcs for GitCli {
    #[instrument(skip(self))]
    fn last_commit(&self) -> GitResult<CommitDescriptor> {
        let subject = self.git(&["log", "-1", "--format=%s"])?.trim().to_string();
        let short_sha = self.git(&["rev-parse", "--short", "HEAD"])?.trim().to_string();
        debug!(%subject, %short_sha, "last commit");
        Ok(CommitDescriptor { subject, short_sha })
    }

    fn last_commit_message(&self) -> GitResult<String> {
        Ok(self.git(&["log", "-1", "--pretty=%B"])?.trim().to_string())
    }

    #[instrument(skip(self))]
    fn describe_latest_tag(&self, pattern: &str) -> GitResult<Option<String>> {
        match self.git(&["describe", "--tags", "--abbrev=0", "--match", pattern]) {
            Ok(out) => {
                let tag = out.trim();
                debug!(%tag, "latest matching tag");
                Ok((!tag.is_empty()).then(|| tag.to_string()))
            }
            // describe exits non-zero when nothing matches (or there are no commits)
            Err(GitError::Command { stderr, .. }) => {
                debug!(%stderr, "no matching tag");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn tag_exists(&self, tag: &str) -> GitResult<bool> {
        let out = self.git(&["tag", "--list", tag])?;
        Ok(out.lines().any(|line| line.trim() == tag))
    }

    #[instrument(skip(self, message))]
    fn create_annotated_tag(&self, tag: &str, message: &str) -> GitResult<()> {
        self.git(&["tag", "-a", tag, "-m", message])?;
        Ok(())
    }

    fn stage(&self, paths: &[&Utf8Path]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.git_with_paths(&["add"], paths)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn commit(&self, message: &str) -> GitResult<()> {
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn amend(&self, message: Option<&str>) -> GitResult<()> {
        match message {
            Some(msg) => self.git(&["commit", "--amend", "-m", msg])?,
            None => self.git(&["commit", "--amend", "--no-edit"])?,
        };
        Ok(())
    }

    #[instrument(skip(self))]
    fn push(&self, remote: &str, refspec: &str) -> GitResult<()> {
        self.git(&["push", remote, refspec])?;
        Ok(())
    }

    fn has_changes(&self, paths: &[&Utf8Path]) -> GitResult<bool> {
        let out = self.git_with_paths(&["status", "--porcelain"], paths)?;
        Ok(!out.trim().is_empty())
    }

    fn set_identity(&self, name: &str, email: &str) -> GitResult<()> {
        self.git(&["config", "user.name", name])?;
        self.git(&["config", "user.email", email])?;
        Ok(())
    }
}

/// Glob handed to `git describe --match` for `<prefix>x.y.z` tags.
pub fn version_tag_glob(prefix: &str) -> String {
    format!("{prefix}[0-9]*.[0-9]*.[0-9]*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd_repo() -> GitCli {
        GitCli::new(Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")))
    }

    // These work both inside and outside a git checkout; outside one they
    // only check that nothing panics.

    #[test]
    fn is_inside_repo_returns_bool() {
        assert!(cwd_repo().is_inside_repo().is_ok());
    }

    #[test]
    fn describe_in_repo_never_errors_on_missing_tags() {
        let repo = cwd_repo();
        if repo.is_inside_repo().unwrap_or(false) {
            let result = repo.describe_latest_tag("no-such-prefix-[0-9]*");
            assert!(matches!(result, Ok(None)));
        }
    }

    #[test]
    fn git_error_on_bad_command() {
        assert!(cwd_repo().git(&["not-a-real-subcommand"]).is_err());
    }

    #[test]
    fn non_repo_dir_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let repo = GitCli::new(Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap());
        if which::which("git").is_ok() {
            assert!(!repo.is_inside_repo().unwrap());
        }
    }

    #[test]
    fn tag_glob_uses_prefix() {
        assert_eq!(version_tag_glob("v"), "v[0-9]*.[0-9]*.[0-9]*");
        assert_eq!(version_tag_glob("release-"), "release-[0-9]*.[0-9]*.[0-9]*");
    }
}
