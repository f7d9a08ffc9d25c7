#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn has_git() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! require_git {
    () => {
        if !has_git() {
            eprintln!("git not found on PATH, skipping");
            return;
        }
    };
}

fn specflow(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("specflow").unwrap();
    cmd.current_dir(root)
        .env("SPECFLOW_ROOT", root)
        .env_remove("SPECFLOW_FEATURE")
        .env_remove("RUST_LOG");
    cmd
}

fn git(root: &Path, args: &[&str]) -> String {
    let out = std::process::Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(root)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// A repository at `<tmp>/app` with one commit on `main`.
fn git_repo(tmp: &TempDir) -> PathBuf {
    let root = tmp.path().canonicalize().unwrap().join("app");
    std::fs::create_dir_all(&root).unwrap();
    git(&root, &["init", "--quiet"]);
    git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&root, &["commit", "--quiet", "--allow-empty", "-m", "init"]);
    root
}

fn create_json(root: &Path, args: &[&str]) -> serde_json::Value {
    let out = specflow(root)
        .args(["--json", "create"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "create failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn write_config(root: &Path, yaml: &str) {
    let path = root.join(".specify/config.yaml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, yaml).unwrap();
}

// ---------------------------------------------------------------------------
// specflow init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_templates() {
    let dir = TempDir::new().unwrap();
    specflow(dir.path()).arg("init").assert().success();

    assert!(dir.path().join(".specify/config.yaml").is_file());
    assert!(dir.path().join(".specify/templates/spec-template.md").is_file());
    assert!(dir.path().join(".specify/templates/plan-template.md").is_file());
    assert!(dir.path().join(".specify/templates/tasks-template.md").is_file());
}

#[test]
fn init_never_overwrites() {
    let dir = TempDir::new().unwrap();
    specflow(dir.path()).arg("init").assert().success();
    let tpl = dir.path().join(".specify/templates/spec-template.md");
    std::fs::write(&tpl, "# team template\n").unwrap();

    specflow(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .specify/templates/spec-template.md"));
    assert_eq!(std::fs::read_to_string(&tpl).unwrap(), "# team template\n");
}

// ---------------------------------------------------------------------------
// specflow create
// ---------------------------------------------------------------------------

#[test]
fn create_in_empty_repository() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);

    let out = create_json(&root, &["add", "login"]);
    assert_eq!(out["schema_version"], 1);
    assert_eq!(out["sequence_number"], 1);
    assert_eq!(out["feature_num"], "001");
    assert_eq!(out["branch_name"], "001-add-login");
    assert_eq!(out["mode"], "branch");
    assert_eq!(out["root_path"], root.to_str().unwrap());
    assert!(root.join("specs/001-add-login/spec.md").is_file());
    assert_eq!(git(&root, &["branch", "--show-current"]), "001-add-login");
}

#[test]
fn create_continues_after_existing_branches() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    git(&root, &["branch", "001-x"]);
    git(&root, &["branch", "002-y"]);

    let out = create_json(&root, &["next", "thing"]);
    assert_eq!(out["feature_num"], "003");
    assert_eq!(out["branch_name"], "003-next-thing");
}

#[test]
fn create_prints_legacy_lines() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    specflow(&root)
        .args(["create", "add login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BRANCH_NAME: 001-add-login"))
        .stdout(predicate::str::contains("FEATURE_NUM: 001"));
}

#[test]
fn create_without_git_repository_is_partial() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let out = create_json(&root, &["offline", "work"]);
    assert_eq!(out["status"], "partial");
    assert_eq!(out["vcs"], false);
    assert!(out["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["code"] == "vcs_unavailable"));
    assert!(root.join("specs/001-offline-work/spec.md").is_file());
}

#[test]
fn sibling_worktree() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    specflow(&root)
        .args(["config", "set-mode", "worktree", "--placement", "sibling"])
        .assert()
        .success();

    let out = create_json(&root, &["add", "login"]);
    let expected = root.parent().unwrap().join("app-001-add-login");
    assert_eq!(out["mode"], "worktree");
    assert_eq!(out["root_path"], expected.to_str().unwrap());
    assert!(expected.join("specs/001-add-login/spec.md").is_file());
    assert_eq!(git(&root, &["branch", "--show-current"]), "main");
}

#[test]
fn rerunning_a_worktree_feature_reuses_the_worktree() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    write_config(&root, "workspace:\n  workflow_mode: worktree\n");
    let first = create_json(&root, &["add", "login"]);
    assert_eq!(first["mode"], "worktree");

    let second = create_json(&root, &["--number", "1", "add", "login"]);
    assert_eq!(second["mode"], "worktree");
    assert_eq!(second["root_path"], first["root_path"]);
    assert_eq!(second["created"].as_array().unwrap().len(), 0);
    assert!(!root.join("specs").exists());
    assert_eq!(git(&root, &["branch", "--show-current"]), "main");
}

#[test]
fn occupied_worktree_path_falls_back_to_branch() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    write_config(&root, "workspace:\n  workflow_mode: worktree\n");
    let occupied = root.parent().unwrap().join("app-001-add-login");
    std::fs::create_dir_all(&occupied).unwrap();
    std::fs::write(occupied.join("keep.txt"), "mine").unwrap();

    let out = create_json(&root, &["add", "login"]);
    assert_eq!(out["mode"], "branch");
    assert_eq!(out["status"], "partial");
    assert_eq!(out["root_path"], root.to_str().unwrap());
    assert!(out["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["code"] == "worktree_fallback"));
    assert_eq!(std::fs::read_to_string(occupied.join("keep.txt")).unwrap(), "mine");
    assert_eq!(git(&root, &["branch", "--show-current"]), "001-add-login");
}

#[test]
fn custom_placement_without_path_exits_with_configuration_error() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    write_config(
        &root,
        "workspace:\n  workflow_mode: worktree\n  placement_strategy: custom\n",
    );

    let out = specflow(&root)
        .args(["--json", "create", "add login"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["status"], "configuration_error");
    assert!(value["error"]["hint"]
        .as_str()
        .unwrap()
        .contains("custom path"));
    assert!(!root.join("specs").exists());
    assert_eq!(git(&root, &["branch", "--list"]), "* main");
}

#[test]
fn no_git_conflicts_with_worktree_mode() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    write_config(&root, "workspace:\n  workflow_mode: worktree\n");
    specflow(&root)
        .args(["create", "--no-git", "add login"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--no-git"));
    assert!(!root.join("specs").exists());
}

#[test]
fn malformed_config_exits_with_configuration_error() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "workspace:\n  workflow_mode: trunk\n");
    specflow(dir.path())
        .args(["create", "x"])
        .assert()
        .code(2);
    specflow(dir.path())
        .args(["config", "validate"])
        .assert()
        .code(2);
}

#[test]
fn empty_intent_is_an_input_error() {
    let dir = TempDir::new().unwrap();
    specflow(dir.path())
        .args(["create", "--no-git", "!!!"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be empty"));
}

// ---------------------------------------------------------------------------
// specflow paths / plan / check
// ---------------------------------------------------------------------------

#[test]
fn plan_and_check_on_feature_override() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    specflow(&root)
        .args(["create", "--no-git", "search"])
        .assert()
        .success();

    specflow(&root)
        .env("SPECFLOW_FEATURE", "001-search")
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("plan.md"));

    specflow(&root)
        .env("SPECFLOW_FEATURE", "001-search")
        .arg("plan")
        .assert()
        .success();
    assert!(root.join("specs/001-search/plan.md").is_file());

    specflow(&root)
        .env("SPECFLOW_FEATURE", "001-search")
        .args(["--json", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"AVAILABLE_DOCS\": []"));

    specflow(&root)
        .env("SPECFLOW_FEATURE", "001-search")
        .arg("paths")
        .assert()
        .success()
        .stdout(predicate::str::contains("BRANCH: 001-search"));
}

#[test]
fn paths_on_main_is_rejected() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    specflow(&root)
        .arg("paths")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not on a feature branch"));
}

// ---------------------------------------------------------------------------
// specflow ticket
// ---------------------------------------------------------------------------

#[test]
fn ticket_rerun_keeps_review_logs() {
    let dir = TempDir::new().unwrap();
    specflow(dir.path())
        .args(["ticket", "PROJ-42", "--title", "Slow login", "--steps", "2"])
        .assert()
        .success();
    let base = dir.path().join("tickets/PROJ-42");
    assert!(base.join("intake.md").is_file());
    assert!(base.join("metadata.yaml").is_file());
    assert!(base.join("plan/step-02.md").is_file());
    let log = base.join("reviews/security-review.md");
    std::fs::write(&log, "- no secrets in logs\n").unwrap();

    let out = specflow(dir.path())
        .args(["--json", "ticket", "PROJ-42", "--raw", "Users report 30s logins"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["created"].as_array().unwrap().len(), 0);
    assert_eq!(value["appended"].as_array().unwrap().len(), 1);
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "- no secrets in logs\n");
    let intake = std::fs::read_to_string(base.join("intake.md")).unwrap();
    assert!(intake.contains("Users report 30s logins"));
}

#[test]
fn ticket_id_with_separator_is_rejected() {
    let dir = TempDir::new().unwrap();
    specflow(dir.path())
        .args(["ticket", "../escape"])
        .assert()
        .code(1);
    assert!(!dir.path().join("tickets").exists());
}

// ---------------------------------------------------------------------------
// specflow doctor / worktree list
// ---------------------------------------------------------------------------

#[test]
fn doctor_reports_git_capability() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    let out = specflow(&root).args(["--json", "doctor"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["git_available"], true);
    assert_eq!(value["min_worktree_version"], "2.15.0");
    assert!(value["strategy_error"].is_null());
}

#[test]
fn worktree_list_includes_main_checkout() {
    require_git!();
    let tmp = TempDir::new().unwrap();
    let root = git_repo(&tmp);
    let out = specflow(&root)
        .args(["--json", "worktree", "list"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["branch"], "main");
}
