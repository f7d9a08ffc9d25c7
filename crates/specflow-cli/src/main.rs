mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, worktree::WorktreeSubcommand};
use specflow_core::contract::FailureOutput;
use specflow_core::SpecflowError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specflow",
    about = "Spec-driven feature workspaces: numbered branches, worktrees and spec skeletons",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .specify/ or .git/)
    #[arg(long, global = true, env = "SPECFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .specify/ with a default config and templates
    Init,

    /// Create a new feature: allocate a number, branch or worktree, spec skeleton
    Create(cmd::create::CreateArgs),

    /// Print the paths of the current feature
    Paths {
        /// Feature branch name (default: the checked-out branch)
        #[arg(long, env = "SPECFLOW_FEATURE")]
        feature: Option<String>,
    },

    /// Set up plan.md for the current feature
    Plan {
        /// Feature branch name (default: the checked-out branch)
        #[arg(long, env = "SPECFLOW_FEATURE")]
        feature: Option<String>,
    },

    /// Check that the current feature has a plan and list its design documents
    Check {
        /// Feature branch name (default: the checked-out branch)
        #[arg(long, env = "SPECFLOW_FEATURE")]
        feature: Option<String>,
    },

    /// Scaffold a ticket workspace keyed by an external ticket id
    Ticket(cmd::ticket::TicketArgs),

    /// Show, change or validate the workspace configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Report git capability and whether the configuration is usable
    Doctor,

    /// Inspect git worktrees
    Worktree {
        #[command(subcommand)]
        subcommand: WorktreeSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    // stdout carries only the output contract.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let json = cli.json;

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, json),
        Commands::Create(args) => cmd::create::run(&root, args, json),
        Commands::Paths { feature } => cmd::feature::paths(&root, feature.as_deref(), json),
        Commands::Plan { feature } => cmd::feature::plan(&root, feature.as_deref(), json),
        Commands::Check { feature } => cmd::feature::check(&root, feature.as_deref(), json),
        Commands::Ticket(args) => cmd::ticket::run(&root, args, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
        Commands::Doctor => cmd::doctor::run(&root, json),
        Commands::Worktree { subcommand } => cmd::worktree::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        let core = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<SpecflowError>());
        if json {
            if let Some(core) = core {
                if let Ok(text) = serde_json::to_string_pretty(&FailureOutput::from(core)) {
                    println!("{text}");
                }
            }
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        if let Some(hint) = core.and_then(|c| c.hint()) {
            eprintln!("hint: {hint}");
        }
        std::process::exit(core.map_or(1, |c| c.kind().exit_code()));
    }
}
