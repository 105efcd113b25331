//! Write a new version into the project's version-bearing files and commit
//! the result. Nothing is pushed here; [`crate::release`] does that.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::detect::gradle_file;
use crate::files::{FileError, gradle, node, plain};
use crate::git::Vcs;
use crate::project::{NODE_LOCKFILE, NODE_MANIFEST, ProjectType, SPRING_APP_YAML};

/// Errors from file synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A Spring project without `build.gradle.kts` or `build.gradle`.
    #[error("no build.gradle.kts or build.gradle in {0}")]
    GradleFileMissing(Utf8PathBuf),

    /// A version file could not be read, parsed or written.
    #[error(transparent)]
    File(#[from] FileError),
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// What [`sync_files`] changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Project type the files were chosen for.
    pub project_type: ProjectType,
    /// Version written.
    pub version: Version,
    /// Files rewritten, relative to the repository root.
    pub touched: Vec<Utf8PathBuf>,
    /// Commits created.
    pub commits: usize,
}

/// The commit message for synced version files.
pub fn release_commit_message(version: &Version) -> String {
    format!("chore(release): v{version}")
}

/// Update and commit the version files for `project_type`.
#[instrument(skip(config, vcs), fields(%project_type, %version, %root))]
pub fn sync_files(
    project_type: ProjectType,
    version: &Version,
    config: &Config,
    vcs: &dyn Vcs,
    root: &Utf8Path,
) -> SyncResult<SyncOutcome> {
    let mut syncer = Syncer {
        config,
        vcs,
        root,
        message: release_commit_message(version),
        outcome: SyncOutcome {
            project_type,
            version: version.clone(),
            touched: Vec::new(),
            commits: 0,
        },
    };

    match project_type {
        ProjectType::Spring => syncer.spring(version)?,
        ProjectType::Next => syncer.next(version)?,
        ProjectType::Plain => syncer.plain(version)?,
    }

    info!(
        touched = syncer.outcome.touched.len(),
        commits = syncer.outcome.commits,
        "version files synced"
    );
    Ok(syncer.outcome)
}

struct Syncer<'a> {
    config: &'a Config,
    vcs: &'a dyn Vcs,
    root: &'a Utf8Path,
    message: String,
    outcome: SyncOutcome,
}

impl Syncer<'_> {
    /// Root-relative path of a file in the project directory.
    fn rel(&self, name: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.config.project_rel(name)
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.root.join(rel)
    }

    fn spring(&mut self, version: &Version) -> SyncResult<()> {
        let project_dir = self.config.project_dir(self.root);
        let (script, _) = gradle_file(&project_dir)
            .ok_or_else(|| SyncError::GradleFileMissing(project_dir.clone()))?;
        let script_rel = script
            .strip_prefix(self.root)
            .map_or_else(|_| script.clone(), Utf8Path::to_path_buf);

        if gradle::update_build_script(&script, version)? {
            self.commit(&[script_rel]);
        }

        if self.config.sync_app_yaml {
            let yaml_rel = self.rel(SPRING_APP_YAML);
            if gradle::update_application_yaml(&self.abs(&yaml_rel), version)? {
                self.commit(&[yaml_rel]);
            }
        }
        Ok(())
    }

    fn next(&mut self, version: &Version) -> SyncResult<()> {
        let mut changed = Vec::new();

        let manifest = self.rel(NODE_MANIFEST);
        node::update_manifest(&self.abs(&manifest), version)?;
        changed.push(manifest);

        let lockfile = self.rel(NODE_LOCKFILE);
        if node::update_lockfile(&self.abs(&lockfile), version) {
            changed.push(lockfile);
        }

        let constants = self.rel(&self.config.next_constants_path);
        node::update_constants(&self.abs(&constants), version)?;
        changed.push(constants);

        self.commit(&changed);
        Ok(())
    }

    fn plain(&mut self, version: &Version) -> SyncResult<()> {
        let file = self.rel(&self.config.plain_version_file);
        if plain::update_version_file(&self.abs(&file), version)? {
            self.commit(&[file]);
        } else {
            debug!(%file, "version file already current");
        }
        Ok(())
    }

    /// Stage and commit `paths`. Failures are logged, never fatal.
    fn commit(&mut self, paths: &[Utf8PathBuf]) {
        self.outcome.touched.extend(paths.iter().cloned());

        let refs: Vec<&Utf8Path> = paths.iter().map(Utf8PathBuf::as_path).collect();
        if let Err(e) = self.vcs.stage(&refs) {
            warn!(error = %e, "could not stage version files");
            return;
        }
        match self.vcs.commit(&self.message) {
            Ok(()) => {
                self.outcome.commits += 1;
                debug!(message = %self.message, files = paths.len(), "committed version files");
            }
            Err(e) => warn!(error = %e, "could not commit version files"),
        }
    }
}
