//! Strategy selection: configuration plus host capability in, execution plan
//! out. Pure; every check here runs before any branch, worktree or file is
//! touched.

use crate::config::{PlacementStrategy, WorkflowMode, WorkspaceConfig};
use crate::error::{Result, SpecflowError};
use crate::paths;
use crate::vcs::{VcsVersion, MIN_WORKTREE_VERSION};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What the host offers, as probed through the VCS adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCapability {
    /// Detected tool version, `None` when the tool is not installed.
    pub version: Option<VcsVersion>,
    /// Whether the working directory is inside a repository.
    pub in_repo: bool,
}

impl HostCapability {
    pub fn vcs_usable(&self) -> bool {
        self.version.is_some() && self.in_repo
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    Branch,
    Worktree {
        placement: PlacementStrategy,
        #[serde(skip_serializing_if = "Option::is_none")]
        custom_path: Option<PathBuf>,
    },
}

impl Strategy {
    pub fn mode(&self) -> WorkflowMode {
        match self {
            Strategy::Branch => WorkflowMode::Branch,
            Strategy::Worktree { .. } => WorkflowMode::Worktree,
        }
    }

    pub fn placement(&self) -> Option<PlacementStrategy> {
        match self {
            Strategy::Branch => None,
            Strategy::Worktree { placement, .. } => Some(*placement),
        }
    }

    /// Directory the feature's files will live in. Branch mode works in place.
    pub fn target_path(&self, repo_root: &Path, branch_name: &str) -> PathBuf {
        let repo = paths::repo_name(repo_root);
        match self {
            Strategy::Branch => repo_root.to_path_buf(),
            Strategy::Worktree {
                placement: PlacementStrategy::Sibling,
                ..
            } => repo_root
                .parent()
                .unwrap_or(repo_root)
                .join(format!("{repo}-{branch_name}")),
            Strategy::Worktree {
                placement: PlacementStrategy::Nested,
                ..
            } => paths::nested_worktrees_dir(repo_root).join(branch_name),
            Strategy::Worktree {
                placement: PlacementStrategy::Custom,
                custom_path,
            } => custom_path
                .as_deref()
                .unwrap_or(repo_root)
                .join(format!("{repo}-{branch_name}")),
        }
    }
}

/// Map configuration and capability to a plan. Checks run in a fixed order
/// and the first failure wins.
pub fn select(ws: &WorkspaceConfig, host: HostCapability, no_vcs: bool) -> Result<Strategy> {
    if ws.workflow_mode == WorkflowMode::Branch {
        return Ok(Strategy::Branch);
    }

    let Some(version) = host.version else {
        return Err(SpecflowError::configuration(
            "workflow_mode=worktree requires git",
            "git not found",
            "install git or run 'specflow config set-mode branch'",
        ));
    };

    if version < MIN_WORKTREE_VERSION {
        return Err(SpecflowError::capability(
            "git version supports worktrees",
            version.to_string(),
            MIN_WORKTREE_VERSION.to_string(),
            format!("upgrade git to {MIN_WORKTREE_VERSION} or newer, or use branch mode"),
        ));
    }

    if ws.placement_strategy == PlacementStrategy::Custom {
        let custom = ws.custom_path.clone().unwrap_or_default();
        if custom.as_os_str().is_empty() || !custom.is_absolute() {
            return Err(SpecflowError::configuration(
                "placement_strategy=custom requires an absolute custom_path",
                custom.display().to_string(),
                "set a custom path or choose a different placement strategy",
            ));
        }
    }

    if no_vcs {
        return Err(SpecflowError::configuration(
            "--no-git conflicts with workflow_mode=worktree",
            "no_vcs=true",
            "drop --no-git or run 'specflow config set-mode branch'",
        ));
    }

    if !host.in_repo {
        return Err(SpecflowError::configuration(
            "workflow_mode=worktree requires a git repository",
            "not a git repository",
            "run 'git init' first or use branch mode",
        ));
    }

    let custom_path = match ws.placement_strategy {
        PlacementStrategy::Custom => ws.custom_path.clone(),
        _ => None,
    };
    Ok(Strategy::Worktree {
        placement: ws.placement_strategy,
        custom_path,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
