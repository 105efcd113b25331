//! In-memory [`Vcs`] for tests.
//!
//! Models just enough of a repository to drive the release stages: a linear
//! commit list, annotated tags (all pointing at history, newest last), a set
//! of dirty paths, a staging area and a log of pushes.

use std::cell::RefCell;

use camino::{Utf8Path, Utf8PathBuf};

use super::{CommitDescriptor, GitError, GitResult, Vcs};

#[derive(Debug, Default)]
struct State {
    commits: Vec<String>,
    tags: Vec<(String, String)>,
    dirty: Vec<Utf8PathBuf>,
    staged: Vec<Utf8PathBuf>,
    pushes: Vec<(String, String)>,
    identity: Option<(String, String)>,
    reject_pushes: bool,
}

/// A fake repository. Interior mutability keeps the [`Vcs`] methods `&self`.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    state: RefCell<State>,
}

impl MemoryRepo {
    /// An empty repository with no commits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit with the given message.
    pub fn with_commit(self, message: &str) -> Self {
        self.state.borrow_mut().commits.push(message.to_string());
        self
    }

    /// Add a tag (reachable from `HEAD`).
    pub fn with_tag(self, tag: &str) -> Self {
        self.state
            .borrow_mut()
            .tags
            .push((tag.to_string(), tag.to_string()));
        self
    }

    /// Make every push fail, as if the remote rejected it.
    pub fn rejecting_pushes(self) -> Self {
        self.state.borrow_mut().reject_pushes = true;
        self
    }

    /// Mark a path as modified in the working tree.
    pub fn touch(&self, path: impl AsRef<Utf8Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.borrow_mut();
        if !state.dirty.contains(&path) {
            state.dirty.push(path);
        }
    }

    /// Commit messages, oldest first.
    pub fn commits(&self) -> Vec<String> {
        self.state.borrow().commits.clone()
    }

    /// Tag names, oldest first.
    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Message of an annotated tag.
    pub fn tag_message(&self, tag: &str) -> Option<String> {
        self.state
            .borrow()
            .tags
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, m)| m.clone())
    }

    /// `(remote, refspec)` pairs pushed so far.
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.borrow().pushes.clone()
    }

    /// Paths currently staged.
    pub fn staged(&self) -> Vec<Utf8PathBuf> {
        self.state.borrow().staged.clone()
    }

    /// Committer identity, if one was set.
    pub fn identity(&self) -> Option<(String, String)> {
        self.state.borrow().identity.clone()
    }
}

fn command_error(command: &str, stderr: &str) -> GitError {
    GitError::Command {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}

impl Vcs for MemoryRepo {
    fn last_commit(&self) -> GitResult<CommitDescriptor> {
        let state = self.state.borrow();
        let message = state
            .commits
            .last()
            .ok_or_else(|| command_error("log", "does not have any commits yet"))?;
        Ok(CommitDescriptor {
            subject: message.lines().next().unwrap_or_default().to_string(),
            short_sha: format!("{:07x}", state.commits.len()),
        })
    }

    fn last_commit_message(&self) -> GitResult<String> {
        self.state
            .borrow()
            .commits
            .last()
            .cloned()
            .ok_or_else(|| command_error("log", "does not have any commits yet"))
    }

    fn describe_latest_tag(&self, pattern: &str) -> GitResult<Option<String>> {
        Ok(self
            .state
            .borrow()
            .tags
            .iter()
            .rev()
            .map(|(t, _)| t)
            .find(|t| glob_match(pattern, t))
            .cloned())
    }

    fn tag_exists(&self, tag: &str) -> GitResult<bool> {
        Ok(self.state.borrow().tags.iter().any(|(t, _)| t == tag))
    }

    fn create_annotated_tag(&self, tag: &str, message: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.tags.iter().any(|(t, _)| t == tag) {
            return Err(command_error("tag", &format!("tag '{tag}' already exists")));
        }
        state.tags.push((tag.to_string(), message.to_string()));
        Ok(())
    }

    fn stage(&self, paths: &[&Utf8Path]) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        for path in paths {
            let path = path.to_path_buf();
            if let Some(pos) = state.dirty.iter().position(|p| *p == path) {
                state.dirty.remove(pos);
                state.staged.push(path);
            }
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.staged.is_empty() {
            return Err(command_error("commit", "nothing to commit, working tree clean"));
        }
        state.staged.clear();
        state.commits.push(message.to_string());
        Ok(())
    }

    fn amend(&self, message: Option<&str>) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        state.staged.clear();
        let last = state
            .commits
            .last_mut()
            .ok_or_else(|| command_error("commit", "nothing to amend"))?;
        if let Some(msg) = message {
            *last = msg.to_string();
        }
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.reject_pushes {
            return Err(command_error("push", "remote rejected"));
        }
        state.pushes.push((remote.to_string(), refspec.to_string()));
        Ok(())
    }

    fn has_changes(&self, paths: &[&Utf8Path]) -> GitResult<bool> {
        let state = self.state.borrow();
        Ok(paths.iter().any(|p| {
            state.dirty.iter().any(|d| d == p) || state.staged.iter().any(|s| s == p)
        }))
    }

    fn set_identity(&self, name: &str, email: &str) -> GitResult<()> {
        self.state.borrow_mut().identity = Some((name.to_string(), email.to_string()));
        Ok(())
    }
}

/// `git describe --match` semantics for the fake's tag lookup.
fn glob_match(pattern: &str, text: &str) -> bool {
    glob::Pattern::new(pattern).is_ok_and(|p| p.matches(text))
}
