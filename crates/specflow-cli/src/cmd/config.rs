use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use specflow_core::config::{PlacementStrategy, WarnLevel, WorkflowMode};
use specflow_core::{paths, SpecflowError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (defaults filled in)
    Show,

    /// Switch between branch and worktree workflows
    SetMode {
        /// branch or worktree
        mode: String,
        /// Worktree placement: sibling, nested or custom
        #[arg(long)]
        placement: Option<String>,
        /// Absolute base directory for custom placement
        #[arg(long)]
        custom_path: Option<PathBuf>,
    },

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::SetMode {
            mode,
            placement,
            custom_path,
        } => set_mode(root, &mode, placement.as_deref(), custom_path, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    if json {
        return print_json(&config);
    }
    let source = if paths::config_path(root).exists() {
        paths::CONFIG_FILE
    } else {
        "defaults (no config file)"
    };
    println!("# source: {source}");
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// set-mode
// ---------------------------------------------------------------------------

fn set_mode(
    root: &Path,
    mode: &str,
    placement: Option<&str>,
    custom_path: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = super::load_config(root)?;
    config.workspace.workflow_mode = mode.parse::<WorkflowMode>()?;
    if let Some(p) = placement {
        config.workspace.placement_strategy = p.parse::<PlacementStrategy>()?;
    }
    if let Some(p) = custom_path {
        config.workspace.custom_path = Some(p);
    }

    let ws = &config.workspace;
    if ws.workflow_mode == WorkflowMode::Worktree
        && ws.placement_strategy == PlacementStrategy::Custom
        && !ws.custom_path.as_deref().is_some_and(Path::is_absolute)
    {
        let value = ws
            .custom_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        return Err(SpecflowError::configuration(
            "placement_strategy=custom requires an absolute custom_path",
            value,
            "pass --custom-path /absolute/dir or choose a different placement strategy",
        )
        .into());
    }

    config.save(root).context("failed to write config.yaml")?;

    if json {
        return print_json(&config.workspace);
    }
    match config.workspace.workflow_mode {
        WorkflowMode::Branch => println!("Workflow mode: branch"),
        WorkflowMode::Worktree => println!(
            "Workflow mode: worktree ({})",
            config.workspace.placement_strategy
        ),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();
    if errors > 0 {
        return Err(SpecflowError::configuration(
            "config validate",
            format!("{errors} error(s)"),
            format!("fix {} and rerun", paths::CONFIG_FILE),
        )
        .into());
    }

    Ok(())
}
