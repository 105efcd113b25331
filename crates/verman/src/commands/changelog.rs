//! Update-changelog command.

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use verman_core::changelog::{self, ChangelogEntry};
use verman_core::config::Config;

/// Arguments for the `update-changelog` subcommand.
#[derive(Args, Debug, Default)]
pub struct UpdateChangelogArgs {
    /// Released version, e.g. 1.4.0
    #[arg(long, env = "NEW_VERSION", value_name = "VERSION")]
    pub new_version: Option<String>,

    /// Bump level: major, minor or patch
    #[arg(long, env = "BUMP_LEVEL", value_name = "LEVEL")]
    pub bump_level: Option<String>,

    /// Subject of the commit that requested the bump
    #[arg(long, env = "COMMIT_SUBJECT", value_name = "SUBJECT")]
    pub commit_subject: Option<String>,

    /// Short hash of that commit
    #[arg(long, env = "COMMIT_SHA", value_name = "SHA")]
    pub commit_sha: Option<String>,
}

/// Execute the update-changelog command.
#[instrument(name = "cmd_update_changelog", skip_all, fields(json_output))]
pub fn cmd_update_changelog(
    args: UpdateChangelogArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing update-changelog command");

    let entry = ChangelogEntry::from_inputs(
        args.new_version.as_deref(),
        args.bump_level.as_deref(),
        args.commit_subject.as_deref().unwrap_or_default(),
        args.commit_sha.as_deref().unwrap_or_default(),
        Utc::now().date_naive(),
    )?;

    let outcome = changelog::update_changelog(&config.changelog, entry, cwd)
        .with_context(|| format!("failed to update {}", config.changelog.path))?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let verb = if outcome.created { "Created" } else { "Updated" };
    println!(
        "{} {} with {}",
        verb.bold(),
        outcome.path.to_string().cyan(),
        format!("[{}]", outcome.entry.version).green()
    );
    if !outcome.header_recognized {
        println!(
            "  {} {}",
            "⚠".yellow(),
            "Changelog heading not recognized; added a new one above the old content".yellow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_changelog_at_repo_root() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = camino::Utf8Path::from_path(dir.path()).unwrap();
        let args = UpdateChangelogArgs {
            new_version: Some("1.4.0".into()),
            bump_level: Some("minor".into()),
            commit_subject: Some("version(minor): add retry support".into()),
            commit_sha: Some("abc1234".into()),
        };

        cmd_update_changelog(args, true, &Config::default(), cwd).unwrap();

        let text = std::fs::read_to_string(cwd.join("CHANGELOG.md")).unwrap();
        assert!(text.contains("## [1.4.0] - "));
        assert!(text.contains("- ✨ **minor**: add retry support"));
        assert!(text.contains("- commit: `abc1234`"));
    }

    #[test]
    fn missing_level_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = camino::Utf8Path::from_path(dir.path()).unwrap();
        let args = UpdateChangelogArgs {
            new_version: Some("1.4.0".into()),
            ..Default::default()
        };

        let err = cmd_update_changelog(args, false, &Config::default(), cwd).unwrap_err();
        assert!(err.to_string().contains("BUMP_LEVEL"));
        assert!(!cwd.join("CHANGELOG.md").exists());
    }
}
