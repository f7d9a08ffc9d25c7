use crate::error::{Result, SpecflowError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECIFY_DIR: &str = ".specify";
pub const TEMPLATES_DIR: &str = ".specify/templates";
pub const SNAPSHOTS_DIR: &str = ".specify/snapshots";
pub const CONFIG_FILE: &str = ".specify/config.yaml";
pub const SEQUENCE_FILE: &str = ".specify/sequence.yaml";

pub const SPECS_DIR: &str = "specs";
pub const NESTED_WORKTREES_DIR: &str = ".worktrees";

pub const SPEC_FILE: &str = "spec.md";
pub const PLAN_FILE: &str = "plan.md";
pub const TASKS_FILE: &str = "tasks.md";
pub const RESEARCH_FILE: &str = "research.md";
pub const DATA_MODEL_FILE: &str = "data-model.md";
pub const QUICKSTART_FILE: &str = "quickstart.md";
pub const CONTRACTS_DIR: &str = "contracts";

pub const SPEC_TEMPLATE: &str = "spec-template.md";
pub const PLAN_TEMPLATE: &str = "plan-template.md";
pub const TASKS_TEMPLATE: &str = "tasks-template.md";
pub const TICKET_INTAKE_TEMPLATE: &str = "ticket-intake-template.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn specs_dir(root: &Path) -> PathBuf {
    root.join(SPECS_DIR)
}

pub fn spec_dir(root: &Path, branch_name: &str) -> PathBuf {
    specs_dir(root).join(branch_name)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn sequence_path(root: &Path) -> PathBuf {
    root.join(SEQUENCE_FILE)
}

pub fn templates_dir(root: &Path) -> PathBuf {
    root.join(TEMPLATES_DIR)
}

pub fn template_path(root: &Path, name: &str) -> PathBuf {
    templates_dir(root).join(name)
}

pub fn snapshot_path(root: &Path, branch_name: &str) -> PathBuf {
    root.join(SNAPSHOTS_DIR).join(format!("{branch_name}.json"))
}

pub fn nested_worktrees_dir(root: &Path) -> PathBuf {
    root.join(NESTED_WORKTREES_DIR)
}

pub fn ticket_dir(root: &Path, tickets_dir: &str, ticket_id: &str) -> PathBuf {
    root.join(tickets_dir).join(ticket_id)
}

/// Directory name of the repository root, used in worktree placement names.
pub fn repo_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(SpecflowError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Ticket ids are used verbatim as a directory name, so they must not escape it.
pub fn validate_ticket_id(ticket_id: &str) -> Result<()> {
    if ticket_id.trim().is_empty()
        || ticket_id.contains('/')
        || ticket_id.contains('\\')
        || ticket_id.contains("..")
        || ticket_id.contains('\0')
        || ticket_id == "."
    {
        return Err(SpecflowError::InvalidTicketId(ticket_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
