use crate::output::{print_json, print_path_status};
use anyhow::Context;
use clap::Args;
use specflow_core::ticket::{self, TicketRequest};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct TicketArgs {
    /// External ticket id, used verbatim as the directory name (e.g. PROJ-123)
    pub ticket_id: String,

    /// Ticket title, recorded in metadata.yaml
    #[arg(long)]
    pub title: Option<String>,

    /// Ticket URL, recorded in metadata.yaml
    #[arg(long)]
    pub url: Option<String>,

    /// Raw ticket text to keep in intake.md
    #[arg(long, conflicts_with = "raw_file")]
    pub raw: Option<String>,

    /// Read the raw ticket text from a file
    #[arg(long)]
    pub raw_file: Option<PathBuf>,

    /// Number of plan/step-NN.md documents to create
    #[arg(long, default_value_t = 0)]
    pub steps: u32,
}

pub fn run(root: &Path, args: TicketArgs, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let raw = match (&args.raw, &args.raw_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };
    let req = TicketRequest {
        ticket_id: args.ticket_id,
        raw,
        title: args.title,
        url: args.url,
        steps: args.steps,
    };

    let out = ticket::scaffold(root, &config, &req).context("failed to scaffold ticket")?;

    if json {
        return print_json(&out);
    }

    println!("Ticket {} ({}): {}", out.ticket_id, out.status, out.ticket_dir.display());
    for p in &out.created {
        print_path_status(&out.ticket_dir, p, true);
    }
    for p in &out.existing {
        print_path_status(&out.ticket_dir, p, false);
    }
    for p in &out.appended {
        println!("  appended: {}", p.strip_prefix(&out.ticket_dir).unwrap_or(p).display());
    }
    for f in &out.failed {
        println!("  failed:  {} ({})", f.path.display(), f.error);
    }
    for w in &out.warnings {
        println!("WARNING: [{}] {}", w.code, w.message);
    }
    Ok(())
}
