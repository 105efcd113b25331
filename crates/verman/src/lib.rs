//! Library interface for the `verman` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                Log filter (e.g., debug, verman_core=trace)
    VERMAN_LOG_PATH         Explicit log file path
    VERMAN_LOG_DIR          Log directory
    GITHUB_REF_NAME         Branch being built (skips bumps off the default branch)
    GITHUB_OUTPUT           Step output file written by compute-bump
    INPUT_<KEY>             Config override, e.g. INPUT_TAG_PREFIX, INPUT_CHANGELOG__PATH
";

/// Command-line interface definition for verman.
#[derive(Parser)]
#[command(name = "verman")]
#[command(
    about = "Commit-driven semantic version bumps, file sync, changelog and tagging for CI",
    long_about = None
)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Decide from the last commit whether to bump, and to what
    ComputeBump(commands::bump::ComputeBumpArgs),

    /// Write the new version into the project's files and commit them
    SyncFiles(commands::sync::SyncFilesArgs),

    /// Add a release section to the changelog
    UpdateChangelog(commands::changelog::UpdateChangelogArgs),

    /// Finalize the release commit, create the tag and push
    CreateTag(commands::tag::CreateTagArgs),

    /// Show configuration and the detected project
    Info(commands::info::InfoArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
