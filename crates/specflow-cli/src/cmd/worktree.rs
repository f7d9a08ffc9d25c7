use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::vcs::{GitCli, Vcs};
use std::path::Path;

#[derive(Subcommand)]
pub enum WorktreeSubcommand {
    /// List the repository's worktrees
    List,
}

pub fn run(root: &Path, subcmd: WorktreeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        WorktreeSubcommand::List => list(root, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let entries = GitCli::new(root)
        .list_worktrees()
        .context("failed to list worktrees")?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No worktrees.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            let branch = match (&e.branch, e.bare, e.detached) {
                (_, true, _) => "(bare)".to_string(),
                (_, _, true) => "(detached)".to_string(),
                (Some(b), _, _) => b.clone(),
                (None, _, _) => "-".to_string(),
            };
            let head = e
                .head
                .as_deref()
                .map(|h| h.chars().take(8).collect::<String>())
                .unwrap_or_default();
            vec![e.path.clone(), branch, head]
        })
        .collect();
    print_table(&["PATH", "BRANCH", "HEAD"], rows);
    Ok(())
}
