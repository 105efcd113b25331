//! Core library for verman.
//!
//! Commit-driven release automation for CI: a commit subject like
//! `version(minor): add retry support` on the default branch becomes a
//! version bump, synced version files, a changelog section and a pushed tag.
//!
//! # Modules
//!
//! - [`bump`] - Decide whether to bump and compute the next version
//! - [`sync`] - Write the version into project files and commit them
//! - [`changelog`] - Prepend release sections to the changelog
//! - [`release`] - Release commit, annotated tag and push
//! - [`config`] - Configuration loading and management
//! - [`detect`] - Project type detection
//! - [`error`] - Configuration error types
//! - [`files`] - Version-bearing file formats
//! - [`git`] - Version control access
//! - [`output`] - GitHub Actions step outputs
//! - [`project`] - Project types and their marker files
//! - [`version`] - Version parsing and bump arithmetic
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use verman_core::git::GitCli;
//! use verman_core::{ConfigLoader, bump};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let root = Utf8Path::new(".");
//! let decision = bump::compute_bump(&config, &GitCli::new(root), root);
//! for (key, value) in decision.outputs() {
//!     println!("{key}={value}");
//! }
//! ```
#![deny(unsafe_code)]

pub mod bump;

pub mod changelog;

pub mod config;

pub mod detect;

pub mod error;

pub mod files;

pub mod git;

pub mod output;

pub mod project;

pub mod release;

pub mod sync;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
