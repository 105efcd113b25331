//! Sync-files command: write the new version into the project's files.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use verman_core::config::Config;
use verman_core::detect;
use verman_core::git::GitCli;
use verman_core::sync;
use verman_core::version::parse_triple;

/// Arguments for the `sync-files` subcommand.
#[derive(Args, Debug, Default)]
pub struct SyncFilesArgs {
    /// Version to write, e.g. 1.4.0
    #[arg(long, env = "NEW_VERSION", value_name = "VERSION")]
    pub new_version: Option<String>,

    /// Project type: auto, next, spring or plain (default: from config)
    #[arg(long, env = "PROJECT_TYPE", value_name = "TYPE")]
    pub project_type: Option<String>,
}

/// Execute the sync-files command.
#[instrument(name = "cmd_sync_files", skip_all, fields(json_output))]
pub fn cmd_sync_files(
    args: SyncFilesArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing sync-files command");

    let raw = super::present(args.new_version.as_ref())
        .context("NEW_VERSION is required (pass --new-version or set NEW_VERSION)")?;
    let version = parse_triple(raw).with_context(|| format!("invalid NEW_VERSION `{raw}`"))?;

    let hint = super::project_type_hint(args.project_type.as_deref(), config)?;
    let project_type = detect::resolve_project_type(&config.project_dir(cwd), hint);

    let outcome = sync::sync_files(project_type, &version, config, &GitCli::new(cwd), cwd)
        .with_context(|| format!("failed to sync {project_type} version files"))?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Synced".bold(),
        outcome.version.to_string().green().bold(),
        outcome.project_type.to_string().cyan()
    );
    if outcome.touched.is_empty() {
        println!(
            "  {} {}",
            "○".yellow(),
            "All files already carried this version".yellow()
        );
    }
    for path in &outcome.touched {
        println!("  {} {}", "✓".green(), path);
    }
    if outcome.commits > 0 {
        println!(
            "{}: {}",
            "Committed".dimmed(),
            sync::release_commit_message(&outcome.version)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_version_is_fatal() {
        let err = cmd_sync_files(
            SyncFilesArgs::default(),
            false,
            &Config::default(),
            camino::Utf8Path::new("/nonexistent"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("NEW_VERSION"));
    }

    #[test]
    fn malformed_version_is_fatal() {
        let args = SyncFilesArgs {
            new_version: Some("1.4".into()),
            project_type: Some("plain".into()),
        };
        let err = cmd_sync_files(
            args,
            false,
            &Config::default(),
            camino::Utf8Path::new("/nonexistent"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid NEW_VERSION"));
    }
}
