//! Compute-bump command: thin CLI layer over `verman_core::bump`.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use verman_core::bump::{self, BumpDecision, SkipReason};
use verman_core::config::Config;
use verman_core::git::GitCli;
use verman_core::output::ActionOutput;

/// Arguments for the `compute-bump` subcommand.
#[derive(Args, Debug, Default)]
pub struct ComputeBumpArgs {
    /// Project type: auto, next, spring or plain (default: from config)
    #[arg(long, env = "PROJECT_TYPE", value_name = "TYPE")]
    pub project_type: Option<String>,
}

/// Execute the compute-bump command.
#[instrument(name = "cmd_compute_bump", skip_all, fields(json_output))]
pub fn cmd_compute_bump(
    args: ComputeBumpArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing compute-bump command");

    let mut config = config.clone();
    config.project_type = super::project_type_hint(args.project_type.as_deref(), &config)?;

    let decision = bump::compute_bump(&config, &GitCli::new(cwd), cwd);

    ActionOutput::new(config.github_output.as_deref())
        .write_all(&decision.outputs())
        .context("failed to write step outputs")?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    match decision {
        BumpDecision::Skip(skip) => {
            let why = match skip.reason {
                SkipReason::NotDefaultBranch { ref_name } => format!(
                    "running on {} (releases come from {})",
                    ref_name.cyan(),
                    config.default_branch.cyan()
                ),
                SkipReason::NoBumpRequest => {
                    let subject = skip.commit.map(|c| c.subject).unwrap_or_default();
                    format!("no version(<level>) marker in \"{}\"", subject.dimmed())
                }
                SkipReason::VersionOverflow { previous, source } => format!(
                    "{} from {} cannot be bumped further",
                    previous.to_string().red(),
                    source
                ),
            };
            println!("  {} {} {}", "○".yellow(), "No version bump:".yellow(), why);
        }
        BumpDecision::Bump(b) => {
            println!(
                "{}: {} → {} ({})",
                "Version".bold(),
                b.previous.to_string().dimmed(),
                b.next.to_string().green().bold(),
                b.level
            );
            println!("{}: {}", "Tag".dimmed(), b.tag.cyan());
            println!("{}: {}", "Current from".dimmed(), b.source);
            println!("{}: {}", "Project type".dimmed(), b.project_type);
            if !b.description.is_empty() {
                println!("{}: {}", "Description".dimmed(), b.description);
            }
        }
    }

    Ok(())
}
