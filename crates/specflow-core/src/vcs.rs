//! Version-control adapter.
//!
//! The resolver needs four operations from the host tool (list local branches,
//! list remote branches, create+checkout a branch, add a worktree bound to a
//! branch) plus a capability probe and a plain checkout for the worktree
//! fallback. They sit behind the [`Vcs`] trait so the
//! resolver core never shells out directly; [`GitCli`] is the production
//! implementation.

use crate::error::{Result, SpecflowError};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

// ---------------------------------------------------------------------------
// VcsVersion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct VcsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Oldest git whose `worktree add -b` and `worktree list --porcelain` we rely on.
pub const MIN_WORKTREE_VERSION: VcsVersion = VcsVersion {
    major: 2,
    minor: 15,
    patch: 0,
};

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").unwrap())
}

impl VcsVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `git --version` output such as `git version 2.39.3 (Apple Git-146)`
    /// or `git version 2.41.0.windows.1`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = version_re().captures(text)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for VcsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ---------------------------------------------------------------------------
// Vcs trait
// ---------------------------------------------------------------------------

pub trait Vcs {
    /// Detected tool version, or `None` when the tool is not installed.
    fn probe(&self) -> Option<VcsVersion>;

    /// Top-level directory of the repository containing the working directory.
    /// `Ok(None)` when the working directory is not inside a repository.
    fn repo_root(&self) -> Result<Option<PathBuf>>;

    /// Name of the checked-out branch, `None` on detached HEAD.
    fn current_branch(&self) -> Result<Option<String>>;

    fn local_branches(&self) -> Result<Vec<String>>;

    /// Refresh remote-tracking refs, giving up after `timeout`.
    fn fetch_remotes(&self, timeout: Duration) -> Result<()>;

    /// Remote-tracking branch names as `remote/branch`.
    fn remote_branches(&self) -> Result<Vec<String>>;

    /// Create `name` at the current commit and check it out in place.
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Check out an existing branch in place.
    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Add a worktree at `path` bound to `branch`, creating the branch when
    /// `new_branch` is set.
    fn add_worktree(&self, path: &Path, branch: &str, new_branch: bool) -> Result<()>;

    /// Every worktree attached to the repository, the main checkout included.
    fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// `git` subprocess adapter rooted at a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn run_capture(&self, step: &str, args: &[&str]) -> Result<String> {
        let output = self.run_checked(step, args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, step: &str, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpecflowError::VcsCommand {
                step: step.to_string(),
                detail: format!("git {}: {}", args.join(" "), stderr.trim()),
            });
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = %args.join(" "), "git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()?)
    }
}

fn lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl Vcs for GitCli {
    fn probe(&self) -> Option<VcsVersion> {
        if which::which("git").is_err() {
            debug!("git not found on PATH");
            return None;
        }
        let output = self.run(&["--version"]).ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let version = VcsVersion::parse(&text);
        if version.is_none() {
            warn!(output = %text.trim(), "unrecognized git --version output");
        }
        version
    }

    fn repo_root(&self) -> Result<Option<PathBuf>> {
        let output = self.run(&["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(root)))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        // symbolic-ref also answers on an unborn branch, unlike rev-parse.
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }

    #[instrument(skip_all)]
    fn local_branches(&self) -> Result<Vec<String>> {
        let out = self.run_capture(
            "list local branches",
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )?;
        Ok(lines(&out))
    }

    #[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
    fn fetch_remotes(&self, timeout: Duration) -> Result<()> {
        let mut child = Command::new("git")
            .args(["fetch", "--all", "--prune", "--quiet"])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        match child.wait_timeout(timeout)? {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(SpecflowError::VcsCommand {
                step: "fetch remotes".to_string(),
                detail: format!("git fetch exited with {status}"),
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(SpecflowError::VcsCommand {
                    step: "fetch remotes".to_string(),
                    detail: format!("git fetch timed out after {}s", timeout.as_secs()),
                })
            }
        }
    }

    #[instrument(skip_all)]
    fn remote_branches(&self) -> Result<Vec<String>> {
        let out = self.run_capture(
            "list remote branches",
            &["for-each-ref", "--format=%(refname:short)", "refs/remotes"],
        )?;
        Ok(lines(&out))
    }

    #[instrument(skip_all, fields(branch = name))]
    fn create_branch(&self, name: &str) -> Result<()> {
        debug!(branch = name, "creating and checking out new branch");
        self.run_checked("create branch", &["checkout", "-b", name])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch = name))]
    fn checkout_branch(&self, name: &str) -> Result<()> {
        self.run_checked("checkout branch", &["checkout", "--quiet", name])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch = branch, path = %path.display()))]
    fn add_worktree(&self, path: &Path, branch: &str, new_branch: bool) -> Result<()> {
        let path_str = path.to_string_lossy();
        if new_branch {
            self.run_checked(
                "create worktree",
                &["worktree", "add", "-b", branch, &path_str],
            )?;
        } else {
            self.run_checked("create worktree", &["worktree", "add", &path_str, branch])?;
        }
        Ok(())
    }

    fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>> {
        let out = self.run_capture("list worktrees", &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&out))
    }
}

// ---------------------------------------------------------------------------
// Worktree listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorktreeEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

pub fn parse_worktree_porcelain(out: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;
    for line in out.lines() {
        if line.trim().is_empty() {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            continue;
        }
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(WorktreeEntry {
                path: path.to_string(),
                ..Default::default()
            });
            continue;
        }
        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some(head) = line.strip_prefix("HEAD ") {
            entry.head = Some(head.to_string());
        } else if let Some(branch) = line.strip_prefix("branch ") {
            let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
            entry.branch = Some(short.to_string());
        } else if line == "bare" {
            entry.bare = true;
        } else if line == "detached" {
            entry.detached = true;
        }
    }
    if let Some(entry) = current {
        entries.push(entry);
    }
    entries
}

// ---------------------------------------------------------------------------
// In-memory fake for tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::cell::RefCell;

    /// Scriptable [`Vcs`] that records every mutating call.
    #[derive(Debug, Default)]
    pub struct FakeVcs {
        pub version: Option<VcsVersion>,
        pub root: Option<PathBuf>,
        pub current: Option<String>,
        pub local: Vec<String>,
        pub remote: Vec<String>,
        pub fetch_fails: bool,
        pub remote_list_fails: bool,
        pub branch_fails: bool,
        pub worktree_fails: bool,
        pub worktrees: RefCell<Vec<WorktreeEntry>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeVcs {
        pub fn git(root: &Path) -> Self {
            Self {
                version: Some(VcsVersion::new(2, 43, 0)),
                root: Some(root.to_path_buf()),
                current: Some("main".to_string()),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn mutations(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| {
                    c.starts_with("create_branch")
                        || c.starts_with("checkout_branch")
                        || c.starts_with("add_worktree")
                })
                .collect()
        }
    }

    fn failed(step: &str) -> SpecflowError {
        SpecflowError::VcsCommand {
            step: step.to_string(),
            detail: "scripted failure".to_string(),
        }
    }

    impl Vcs for FakeVcs {
        fn probe(&self) -> Option<VcsVersion> {
            self.version
        }

        fn repo_root(&self) -> Result<Option<PathBuf>> {
            Ok(self.root.clone())
        }

        fn current_branch(&self) -> Result<Option<String>> {
            Ok(self.current.clone())
        }

        fn local_branches(&self) -> Result<Vec<String>> {
            self.calls.borrow_mut().push("local_branches".to_string());
            Ok(self.local.clone())
        }

        fn fetch_remotes(&self, _timeout: Duration) -> Result<()> {
            self.calls.borrow_mut().push("fetch_remotes".to_string());
            if self.fetch_fails {
                return Err(failed("fetch remotes"));
            }
            Ok(())
        }

        fn remote_branches(&self) -> Result<Vec<String>> {
            self.calls.borrow_mut().push("remote_branches".to_string());
            if self.remote_list_fails {
                return Err(failed("list remote branches"));
            }
            Ok(self.remote.clone())
        }

        fn create_branch(&self, name: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("create_branch {name}"));
            if self.branch_fails {
                return Err(failed("create branch"));
            }
            Ok(())
        }

        fn checkout_branch(&self, name: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("checkout_branch {name}"));
            if self.branch_fails {
                return Err(failed("checkout branch"));
            }
            Ok(())
        }

        fn add_worktree(&self, path: &Path, branch: &str, new_branch: bool) -> Result<()> {
            self.calls.borrow_mut().push(format!(
                "add_worktree {} {branch} {new_branch}",
                path.display()
            ));
            if self.worktree_fails || path.exists() {
                return Err(failed("create worktree"));
            }
            std::fs::create_dir_all(path)?;
            self.worktrees.borrow_mut().push(WorktreeEntry {
                path: path.display().to_string(),
                branch: Some(branch.to_string()),
                ..Default::default()
            });
            Ok(())
        }

        fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>> {
            self.calls.borrow_mut().push("list_worktrees".to_string());
            Ok(self.worktrees.borrow().clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
