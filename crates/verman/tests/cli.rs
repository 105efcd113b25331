//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CI_VARS: &[&str] = &[
    "GITHUB_REF_NAME",
    "GITHUB_ACTOR",
    "GITHUB_OUTPUT",
    "PROJECT_TYPE",
    "NEW_VERSION",
    "BUMP_LEVEL",
    "COMMIT_SUBJECT",
    "COMMIT_SHA",
    "TAG",
    "SKIP_TOKEN",
    "RELEASE_DESCRIPTION",
    "VERMAN_LOG_PATH",
];

/// Returns a Command configured to run our binary with a clean CI context.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    for var in CI_VARS {
        cmd.env_remove(var);
    }
    cmd.env("VERMAN_LOG_DIR", std::env::temp_dir().join("verman-cli-tests"));
    cmd
}

fn cmd_in(dir: &Path) -> Command {
    let mut cmd = cmd();
    cmd.args(["-C", dir.to_str().unwrap()]);
    cmd
}

fn git_available() -> bool {
    StdCommand::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// A repo on `main` with `v2.3.1` tagged and `subject` as the last commit.
fn repo_with_request(subject: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    fs::write(dir.join("VERSION"), "2.3.1\n").unwrap();
    git(dir, &["add", "VERSION"]);
    git(dir, &["commit", "-q", "-m", "chore: initial import"]);
    git(dir, &["tag", "-a", "v2.3.1", "-m", "v2.3.1"]);
    git(dir, &["commit", "-q", "--allow-empty", "-m", subject]);
    tmp
}

fn with_identity(cmd: &mut Command) -> &mut Command {
    cmd.env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("--json should output valid JSON")
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("compute-bump"))
        .stdout(predicate::str::contains("sync-files"))
        .stdout(predicate::str::contains("update-changelog"))
        .stdout(predicate::str::contains("create-tag"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GITHUB_OUTPUT"))
        .stdout(predicate::str::contains("INPUT_<KEY>"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn subcommand_help_shows_env_fallbacks() {
    cmd()
        .args(["create-tag", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("SKIP_TOKEN"));
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_reports_detected_project() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("package.json"), r#"{"version":"1.0.0"}"#).unwrap();

    let output = cmd_in(tmp.path()).args(["info", "--json"]).assert().success();
    let json = stdout_json(output.get_output());

    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["detection"]["project_type"], "next");
    assert_eq!(json["detection"]["pinned"], false);
    assert_eq!(json["config"]["tag_prefix"], "v");
}

#[test]
fn info_json_reports_ci_context() {
    let tmp = TempDir::new().unwrap();
    let output = cmd_in(tmp.path())
        .env("GITHUB_REF_NAME", "feature/x")
        .args(["info", "--json"])
        .assert()
        .success();
    let json = stdout_json(output.get_output());

    assert_eq!(json["ci"]["ref_name"], "feature/x");
    assert_eq!(json["ci"]["releases_enabled"], false);
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_and_verbose_flags_accepted() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path()).args(["-q", "info"]).assert().success();
    cmd_in(tmp.path()).args(["-vv", "info"]).assert().success();
}

#[test]
fn color_never_accepted() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .args(["--color", "never", "info"])
        .assert()
        .success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn sync_without_version_exits_1() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .arg("sync-files")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NEW_VERSION"));
}

#[test]
fn invalid_project_type_exits_1() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .env("PROJECT_TYPE", "rails")
        .args(["sync-files", "--new-version", "1.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("rails"));
}

#[test]
fn changelog_without_level_exits_1() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .args(["update-changelog", "--new-version", "1.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("BUMP_LEVEL"));
    assert!(!tmp.path().join("CHANGELOG.md").exists());
}

#[test]
fn create_tag_without_tag_exits_1() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .args(["create-tag", "--new-version", "1.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TAG"));
}

// =============================================================================
// Stages
// =============================================================================

#[test]
fn update_changelog_reads_env_inputs() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .env("NEW_VERSION", "1.0.0")
        .env("BUMP_LEVEL", "major")
        .env("COMMIT_SUBJECT", "version(major): first stable release")
        .arg("update-changelog")
        .assert()
        .success();

    let text = fs::read_to_string(tmp.path().join("CHANGELOG.md")).unwrap();
    assert!(text.starts_with("<!-- vm-banner-start -->"));
    assert!(text.contains("# Version Changelog"));
    assert!(text.contains("- 🚀 **major**: first stable release"));
    assert!(!text.contains("- commit:"));
}

#[test]
fn compute_bump_skips_off_default_branch() {
    let tmp = TempDir::new().unwrap();
    let outputs = tmp.path().join("outputs");

    let output = cmd_in(tmp.path())
        .env("GITHUB_REF_NAME", "feature/x")
        .env("GITHUB_OUTPUT", &outputs)
        .args(["compute-bump", "--json"])
        .assert()
        .success();
    let json = stdout_json(output.get_output());

    assert_eq!(json["decision"], "skip");
    assert_eq!(json["reason"], "not_default_branch");
    let written = fs::read_to_string(&outputs).unwrap();
    assert!(written.contains("version_bumped=false\n"));
    assert!(written.contains("bump_level=none\n"));
}

#[test]
fn compute_bump_numeric_branch_name_skips() {
    let tmp = TempDir::new().unwrap();
    let outputs = tmp.path().join("outputs");

    let output = cmd_in(tmp.path())
        .env("GITHUB_REF_NAME", "2024")
        .env("GITHUB_ACTOR", "1234")
        .env("GITHUB_OUTPUT", &outputs)
        .args(["compute-bump", "--json"])
        .assert()
        .success();
    let json = stdout_json(output.get_output());

    assert_eq!(json["reason"], "not_default_branch");
    assert_eq!(json["ref_name"], "2024");
    let written = fs::read_to_string(&outputs).unwrap();
    assert!(written.contains("version_bumped=false\n"));
}

#[test]
fn compute_bump_from_tag() {
    if !git_available() {
        eprintln!("skipping: git not on PATH");
        return;
    }
    let repo = repo_with_request("version(minor): add retry support");
    let outputs = repo.path().join("outputs");

    let output = cmd_in(repo.path())
        .env("GITHUB_REF_NAME", "main")
        .env("GITHUB_OUTPUT", &outputs)
        .args(["compute-bump", "--json"])
        .assert()
        .success();
    let json = stdout_json(output.get_output());

    assert_eq!(json["decision"], "bump");
    assert_eq!(json["previous"], "2.3.1");
    assert_eq!(json["next"], "2.4.0");
    assert_eq!(json["tag"], "v2.4.0");
    assert_eq!(json["project_type"], "plain");

    let written = fs::read_to_string(&outputs).unwrap();
    assert!(written.contains("version_bumped=true\n"));
    assert!(written.contains("new_version=2.4.0\n"));
    assert!(written.contains("new_tag=v2.4.0\n"));
    assert!(written.contains("commit_subject=version(minor): add retry support\n"));
}

#[test]
fn compute_bump_without_marker_is_a_skip() {
    if !git_available() {
        eprintln!("skipping: git not on PATH");
        return;
    }
    let repo = repo_with_request("fix: typo");

    cmd_in(repo.path())
        .args(["compute-bump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No version bump"));
}

#[test]
fn full_release_pipeline() {
    if !git_available() {
        eprintln!("skipping: git not on PATH");
        return;
    }
    let repo = repo_with_request("version(minor): add retry support");
    let dir = repo.path();
    let remote = TempDir::new().unwrap();
    git(remote.path(), &["init", "-q", "--bare"]);
    git(dir, &["remote", "add", "origin", remote.path().to_str().unwrap()]);

    with_identity(&mut cmd_in(dir))
        .args(["sync-files", "--new-version", "2.4.0"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.join("VERSION")).unwrap(), "2.4.0\n");
    assert_eq!(git(dir, &["log", "-1", "--format=%s"]), "chore(release): v2.4.0");

    cmd_in(dir)
        .args([
            "update-changelog",
            "--new-version",
            "2.4.0",
            "--bump-level",
            "minor",
            "--commit-subject",
            "version(minor): add retry support",
        ])
        .assert()
        .success();

    let tag_args = [
        "create-tag",
        "--tag",
        "v2.4.0",
        "--new-version",
        "2.4.0",
        "--commit-subject",
        "version(minor): add retry support",
    ];
    with_identity(&mut cmd_in(dir))
        .env("GITHUB_REF_NAME", "main")
        .args(tag_args)
        .assert()
        .success();

    assert_eq!(
        git(dir, &["log", "-1", "--format=%s"]),
        "chore(release): v2.4.0 add retry support [skip version]"
    );
    assert_eq!(git(dir, &["status", "--porcelain", "--", "CHANGELOG.md"]), "");
    assert_eq!(git(remote.path(), &["tag", "--list", "v2.4.0"]), "v2.4.0");
    let commits = git(dir, &["rev-list", "--count", "HEAD"]);

    // A rerun changes nothing and still succeeds.
    with_identity(&mut cmd_in(dir))
        .env("GITHUB_REF_NAME", "main")
        .args(tag_args)
        .assert()
        .success();
    assert_eq!(git(dir, &["rev-list", "--count", "HEAD"]), commits);
    assert_eq!(git(dir, &["tag", "--list", "v2.4.*"]), "v2.4.0");
}

#[test]
fn create_tag_push_failure_exits_1() {
    if !git_available() {
        eprintln!("skipping: git not on PATH");
        return;
    }
    let repo = repo_with_request("version(patch): fix retry");
    let dir = repo.path();
    git(dir, &["remote", "add", "origin", "/nonexistent/remote.git"]);

    with_identity(&mut cmd_in(dir))
        .env("GITHUB_REF_NAME", "main")
        .args(["create-tag", "--tag", "v2.3.2", "--new-version", "2.3.2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("push"));
    assert_eq!(git(dir, &["tag", "--list", "v2.3.2"]), "v2.3.2");
}
