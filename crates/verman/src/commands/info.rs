//! Info command: show package, config and detected project information.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use verman_core::config::{self, Config};
use verman_core::detect::{self, GradleDialect};
use verman_core::project::{ProjectType, ProjectTypeHint};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    default_branch: String,
    tag_prefix: String,
    skip_token: String,
    changelog: String,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            default_branch: config.default_branch.clone(),
            tag_prefix: config.tag_prefix.clone(),
            skip_token: config.skip_token.clone(),
            changelog: config.changelog.path.to_string(),
        }
    }
}

#[derive(Serialize)]
struct DetectionInfo {
    project_dir: String,
    project_type: ProjectType,
    pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradle_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradle_dialect: Option<GradleDialect>,
    git_available: bool,
}

impl DetectionInfo {
    fn probe(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let dir = config.project_dir(cwd);
        let project_type = detect::resolve_project_type(&dir, config.project_type);
        let gradle = detect::gradle_file(&dir);
        Self {
            project_dir: dir.to_string(),
            project_type,
            pinned: config.project_type != ProjectTypeHint::Auto,
            gradle_file: gradle.as_ref().map(|(p, _)| p.to_string()),
            gradle_dialect: gradle.map(|(_, d)| d),
            git_available: detect::has_binary("git"),
        }
    }
}

#[derive(Serialize)]
struct CiInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    github_output: Option<String>,
    releases_enabled: bool,
}

impl CiInfo {
    fn from_config(config: &Config) -> Self {
        Self {
            ref_name: config.current_ref().map(str::to_string),
            actor: config.actor.clone(),
            github_output: config.github_output.as_ref().map(|p| p.to_string()),
            releases_enabled: !config.off_default_branch(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    detection: DetectionInfo,
    ci: CiInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery and detection
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        detection: DetectionInfo::probe(config, cwd),
        ci: CiInfo::from_config(config),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        full_info.package.name.bold(),
        full_info.package.version.green()
    );
    if !full_info.package.description.is_empty() {
        println!("{}", full_info.package.description);
    }
    if !full_info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), full_info.package.license);
    }

    // Configuration section
    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = cfg.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Default branch".dimmed(), cfg.default_branch.cyan());
    println!("{}: {}", "Tag prefix".dimmed(), cfg.tag_prefix.cyan());
    println!("{}: {}", "Skip token".dimmed(), cfg.skip_token.cyan());
    println!("{}: {}", "Changelog".dimmed(), cfg.changelog.cyan());

    // Detection section
    let det = &full_info.detection;
    println!();
    println!("{}", "Project Detection".bold().underline());
    println!("{}: {}", "Project dir".dimmed(), det.project_dir);
    let how = if det.pinned { "configured" } else { "detected" };
    println!(
        "{}: {} ({})",
        "Project type".dimmed(),
        det.project_type.to_string().cyan(),
        how
    );
    if let Some(ref file) = det.gradle_file {
        println!("{}: {}", "Gradle script".dimmed(), file.cyan());
    }
    if det.git_available {
        println!("{}: {}", "git".dimmed(), "found".green());
    } else {
        println!("{}: {}", "git".dimmed(), "not on PATH".red());
    }

    // CI section
    let ci = &full_info.ci;
    println!();
    println!("{}", "CI Context".bold().underline());
    match ci.ref_name {
        Some(ref r) => println!("{}: {}", "Ref".dimmed(), r.cyan()),
        None => println!("{}: {}", "Ref".dimmed(), "unknown (local run)".yellow()),
    }
    if let Some(ref actor) = ci.actor {
        println!("{}: {}", "Actor".dimmed(), actor);
    }
    if let Some(ref path) = ci.github_output {
        println!("{}: {}", "Step outputs".dimmed(), path);
    }
    if !ci.releases_enabled {
        println!(
            "  {} {}",
            "○".yellow(),
            "Not on the default branch; bumps will be skipped".yellow()
        );
    }

    Ok(())
}
