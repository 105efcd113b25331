//! Create-tag command: release commit, annotated tag and push.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use verman_core::config::Config;
use verman_core::git::GitCli;
use verman_core::release::{self, ReleaseAction, ReleaseRequest};

/// Arguments for the `create-tag` subcommand.
#[derive(Args, Debug, Default)]
pub struct CreateTagArgs {
    /// Tag to create, e.g. v1.4.0
    #[arg(long, env = "TAG")]
    pub tag: Option<String>,

    /// Version being released, e.g. 1.4.0
    #[arg(long, env = "NEW_VERSION", value_name = "VERSION")]
    pub new_version: Option<String>,

    /// Marker appended to release commits (default: from config)
    #[arg(long, env = "SKIP_TOKEN", value_name = "TOKEN")]
    pub skip_token: Option<String>,

    /// Text for the release commit subject
    #[arg(long, env = "RELEASE_DESCRIPTION", value_name = "TEXT")]
    pub release_description: Option<String>,

    /// Subject of the commit that requested the bump
    #[arg(long, env = "COMMIT_SUBJECT", value_name = "SUBJECT")]
    pub commit_subject: Option<String>,
}

/// Execute the create-tag command.
#[instrument(name = "cmd_create_tag", skip_all, fields(json_output))]
pub fn cmd_create_tag(
    args: CreateTagArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing create-tag command");

    let request = ReleaseRequest::from_inputs(
        args.tag.as_deref(),
        args.new_version.as_deref(),
        args.release_description.as_deref(),
        args.commit_subject.as_deref(),
    )?;

    let mut config = config.clone();
    if let Some(token) = args.skip_token {
        config.skip_token = token;
    }

    let outcome = release::finalize_release(&request, &config, &GitCli::new(cwd))
        .with_context(|| format!("failed to release {}", request.tag))?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    for action in &outcome.actions {
        println!("  {} {}", "✓".green(), describe(action));
    }
    println!("{} {}", "Released".bold(), request.tag.green().bold());

    Ok(())
}

fn describe(action: &ReleaseAction) -> String {
    match action {
        ReleaseAction::ChangelogCommitted { message } => {
            format!("Committed changelog: {}", message.dimmed())
        }
        ReleaseAction::ReleaseCommitted { message } => {
            format!("Committed release: {}", message.dimmed())
        }
        ReleaseAction::ReleaseAmended { message } => {
            format!("Amended release commit: {}", message.dimmed())
        }
        ReleaseAction::ChangelogFolded => "Folded changelog into release commit".to_string(),
        ReleaseAction::NothingToCommit => "Nothing to commit".to_string(),
        ReleaseAction::TagCreated { tag } => format!("Created tag {}", tag.cyan()),
        ReleaseAction::TagExists { tag } => format!("Tag {} already exists", tag.cyan()),
        ReleaseAction::Pushed { remote, refspec } => {
            format!("Pushed {} to {}", refspec.cyan(), remote)
        }
    }
}
