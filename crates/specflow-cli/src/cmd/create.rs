use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use specflow_core::resolver::{self, ResolveRequest};
use specflow_core::vcs::GitCli;
use std::path::Path;

#[derive(Args)]
pub struct CreateArgs {
    /// Short description of the feature, e.g. "add login"
    #[arg(required = true, num_args = 1..)]
    pub intent: Vec<String>,

    /// Use this slug instead of deriving one from the description
    #[arg(long)]
    pub short_name: Option<String>,

    /// Use this sequence number instead of allocating one
    #[arg(long)]
    pub number: Option<u32>,

    /// Tracking token for the {component} part of the branch template
    #[arg(long)]
    pub component: Option<String>,

    /// Do not touch version control; create directories only
    #[arg(long = "no-git")]
    pub no_git: bool,

    /// Also write the result to .specify/snapshots/<branch>.json
    #[arg(long)]
    pub snapshot: bool,
}

pub fn run(root: &Path, args: CreateArgs, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let vcs = GitCli::new(root);
    let req = ResolveRequest {
        intent: args.intent.join(" "),
        short_name: args.short_name,
        number: args.number,
        component: args.component,
        no_vcs: args.no_git,
        snapshot: args.snapshot,
    };

    let out = resolver::resolve(root, &config, &vcs, &req).context("failed to create feature")?;

    if json {
        print_json(&out)?;
    } else {
        print!("{}", out.to_lines());
    }
    Ok(())
}
