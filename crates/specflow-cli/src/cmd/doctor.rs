use crate::output::print_json;
use serde::Serialize;
use specflow_core::config::{ConfigWarning, PlacementStrategy, WorkflowMode};
use specflow_core::strategy::{self, HostCapability};
use specflow_core::vcs::{GitCli, Vcs, MIN_WORKTREE_VERSION};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct DoctorReport {
    git_available: bool,
    git_version: Option<String>,
    min_worktree_version: String,
    worktree_supported: bool,
    repo_root: Option<PathBuf>,
    workflow_mode: WorkflowMode,
    placement_strategy: PlacementStrategy,
    config_warnings: Vec<ConfigWarning>,
    /// `None` when the selector accepts the configuration.
    strategy_error: Option<String>,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let git = GitCli::new(root);

    let version = git.probe();
    let repo_root = match version {
        Some(_) => git.repo_root().ok().flatten(),
        None => None,
    };
    let host = HostCapability {
        version,
        in_repo: repo_root.is_some(),
    };
    let selected = strategy::select(&config.workspace, host, false);

    let report = DoctorReport {
        git_available: version.is_some(),
        git_version: version.map(|v| v.to_string()),
        min_worktree_version: MIN_WORKTREE_VERSION.to_string(),
        worktree_supported: version.is_some_and(|v| v >= MIN_WORKTREE_VERSION),
        repo_root,
        workflow_mode: config.workspace.workflow_mode,
        placement_strategy: config.workspace.placement_strategy,
        config_warnings: config.validate(),
        strategy_error: selected.as_ref().err().map(|e| e.to_string()),
    };

    if json {
        print_json(&report)?;
    } else {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let version = report.git_version.as_deref().unwrap_or("not found");
        let supported = yes_no(report.worktree_supported);
        println!("git:                {version}");
        println!("worktree support:   {supported} (requires {})", report.min_worktree_version);
        match &report.repo_root {
            Some(r) => println!("repository:         {}", r.display()),
            None => println!("repository:         none"),
        }
        println!("workflow mode:      {}", report.workflow_mode);
        if report.workflow_mode == WorkflowMode::Worktree {
            println!("placement:          {}", report.placement_strategy);
        }
        for w in &report.config_warnings {
            println!("config:             {}", w.message);
        }
        match &report.strategy_error {
            None => println!("status:             ok"),
            Some(e) => println!("status:             {e}"),
        }
    }

    // Non-zero exit with the selector's own error kind when the setup is unusable.
    selected.map(|_| ()).map_err(Into::into)
}
