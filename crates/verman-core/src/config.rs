//! Configuration loading and discovery.
//!
//! Sources are layered with `figment`, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. User config: `~/.config/verman/config.<ext>`
//! 3. Project config: `.verman.<ext>` or `verman.<ext>` in the current
//!    directory or any parent, stopping at the repository root
//! 4. Explicit files added with [`ConfigLoader::with_file`]
//! 5. GitHub Actions context: `GITHUB_REF_NAME`, `GITHUB_ACTOR`, `GITHUB_OUTPUT`
//! 6. Action inputs: `INPUT_<KEY>`, with `__` separating nested keys
//!    (`INPUT_CHANGELOG__PATH`)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use verman_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("releasing from {}", config.default_branch);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::project::ProjectTypeHint;
use crate::version::parse_triple;

/// The configuration for verman.
///
/// Every field has a default, so an empty config file (or none at all) is
/// valid. CI context fields are normally filled from the environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,

    /// Project type, or `auto` to detect from marker files.
    pub project_type: ProjectTypeHint,
    /// Branch that releases are cut from.
    pub default_branch: String,
    /// Prefix joining tag names to versions (`v` in `v1.2.3`).
    pub tag_prefix: String,
    /// Version assumed when neither a tag nor a project file has one.
    pub default_version: String,
    /// Project directory relative to the repository root.
    pub workdir: Option<Utf8PathBuf>,
    /// Version file for plain projects, relative to the project directory.
    pub plain_version_file: Utf8PathBuf,
    /// TypeScript module exporting `APP_VERSION` for Next.js projects.
    pub next_constants_path: Utf8PathBuf,
    /// Also sync `src/main/resources/application.yml` in Spring projects.
    #[serde(deserialize_with = "figment::util::bool_from_str_or_int")]
    pub sync_app_yaml: bool,
    /// Token appended to release commits so CI does not re-trigger.
    pub skip_token: String,

    /// Branch or tag the workflow runs on (`GITHUB_REF_NAME`).
    pub ref_name: Option<String>,
    /// User that triggered the workflow (`GITHUB_ACTOR`).
    pub actor: Option<String>,
    /// Step output file (`GITHUB_OUTPUT`).
    pub github_output: Option<Utf8PathBuf>,

    /// Changelog settings.
    pub changelog: ChangelogConfig,
    /// Git identity and remote.
    pub git: GitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            project_type: ProjectTypeHint::Auto,
            default_branch: "main".into(),
            tag_prefix: "v".into(),
            default_version: "0.0.0".into(),
            workdir: None,
            plain_version_file: "VERSION".into(),
            next_constants_path: "src/constants/version.ts".into(),
            sync_app_yaml: false,
            skip_token: "[skip version]".into(),
            ref_name: None,
            actor: None,
            github_output: None,
            changelog: ChangelogConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl Config {
    /// `default_version` as a version, or `0.0.0` when it is not `x.y.z`.
    pub fn fallback_version(&self) -> Version {
        parse_triple(self.default_version.trim()).unwrap_or_else(|_| {
            warn!(default_version = %self.default_version, "default_version is not x.y.z, using 0.0.0");
            Version::new(0, 0, 0)
        })
    }

    /// The project directory: `root` joined with `workdir`, if set.
    pub fn project_dir(&self, root: &Utf8Path) -> Utf8PathBuf {
        match self.workdir.as_deref() {
            Some(dir) if !dir.as_str().is_empty() && dir != "." => root.join(dir),
            _ => root.to_path_buf(),
        }
    }

    /// `workdir` relative to the repository root, for git pathspecs.
    pub fn project_rel(&self, rel: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.project_dir(Utf8Path::new("")).join(rel)
    }

    /// Non-empty `ref_name`, if the workflow supplied one.
    pub fn current_ref(&self) -> Option<&str> {
        self.ref_name.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// The branch release commits are pushed to.
    pub fn push_branch(&self) -> &str {
        self.current_ref().unwrap_or(&self.default_branch)
    }

    /// True when running on a ref other than the default branch.
    ///
    /// An unknown ref (local runs) counts as the default branch.
    pub fn off_default_branch(&self) -> bool {
        self.current_ref().is_some_and(|r| r != self.default_branch)
    }
}

/// Changelog file settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Changelog location relative to the repository root.
    pub path: Utf8PathBuf,
    /// H1 heading written when the changelog is created.
    pub header: String,
    /// Name credited in the banner.
    pub author: Option<String>,
    /// Link for the credited name.
    pub author_url: Option<String>,
    /// Link to the workflow that maintains the file.
    pub workflow_url: Option<String>,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            path: "CHANGELOG.md".into(),
            header: "# Version Changelog".into(),
            author: None,
            author_url: None,
            workflow_url: None,
        }
    }
}

/// Git settings for release commits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Remote that tags and release commits are pushed to.
    pub remote: String,
    /// Committer name.
    pub user_name: String,
    /// Committer email.
    pub user_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            user_name: "github-actions[bot]".into(),
            user_email: "41898282+github-actions[bot]@users.noreply.github.com".into(),
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "verman";

/// Prefix GitHub Actions gives action inputs.
const INPUT_PREFIX: &str = "INPUT_";

/// Workflow context variables and the config keys they fill.
const CI_CONTEXT: &[(&str, &str)] = &[
    ("GITHUB_REF_NAME", "ref_name"),
    ("GITHUB_ACTOR", "actor"),
    ("GITHUB_OUTPUT", "github_output"),
];

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Whether to read CI context and action inputs from the environment.
    include_env: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load.
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            include_env: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/verman/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set whether environment variables participate.
    pub const fn with_env(mut self, include: bool) -> Self {
        self.include_env = include;
        self
    }

    /// Set a boundary marker to stop directory traversal. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = find_user_config()
        {
            figment = merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            tracing::debug!(path = %project_config, "using project config");
            figment = merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = merge_file(figment, file);
        }

        if self.include_env {
            for provider in ci_context_env().into_iter().chain(action_inputs()) {
                figment = figment.merge(provider);
            }
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            project_type = %config.project_type,
            ref_name = config.ref_name.as_deref().unwrap_or_default(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            if let Some(found) = config_in_dir(dir) {
                return Some(found);
            }
            // The repository root is the last directory searched.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }
        }
        None
    }
}

/// The first config file present in `dir`, dotfile before plain name.
fn config_in_dir(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_EXTENSIONS.iter().find_map(|ext| {
        [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

/// Workflow context variables renamed to their config keys.
///
/// Values stay strings: a branch named `2024` is not a number.
fn ci_context_env() -> Vec<Serialized<String>> {
    CI_CONTEXT
        .iter()
        .filter_map(|(var, field)| {
            let value = std::env::var(var).ok().filter(|v| !v.is_empty())?;
            Some(Serialized::default(field, value))
        })
        .collect()
}

/// `INPUT_*` variables as string-valued config keys, `__` nesting.
///
/// Empty inputs are skipped; Actions sets every declared input, blank or not.
fn action_inputs() -> Vec<Serialized<String>> {
    let mut inputs: Vec<(String, String)> = std::env::vars()
        .filter_map(|(var, value)| {
            let key = var.strip_prefix(INPUT_PREFIX)?;
            if key.is_empty() || value.is_empty() {
                return None;
            }
            let key = key.to_ascii_lowercase().replace('-', "_").replace("__", ".");
            Some((key, value))
        })
        .collect();
    inputs.sort();
    inputs
        .into_iter()
        .map(|(key, value)| Serialized::default(&key, value))
        .collect()
}

/// Find user config in XDG config directory.
fn find_user_config() -> Option<Utf8PathBuf> {
    let config_dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| config_dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Merge a config file into the figment, detecting format from extension.
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// Find the project config file path without loading it.
///
/// Searches up to the enclosing `.git` directory.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/verman/` on Linux, `~/Library/Application Support/verman/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}
