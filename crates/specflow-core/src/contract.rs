//! Structured output of every resolver and ticket invocation.
//!
//! Downstream command templates, CI steps and humans all parse these shapes.
//! Fields may be added; existing names and types stay fixed within a
//! `SCHEMA_VERSION`.

use crate::config::{PlacementStrategy, WorkflowMode};
use crate::error::SpecflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Warning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// Remote fetch or listing failed; allocation used local sources.
    RemoteUnreachable,
    /// A local identifier source could not be read.
    SourceUnavailable,
    /// Version control missing or not a repository; no branch was created.
    VcsUnavailable,
    /// Worktree creation failed and branch mode was used instead.
    WorktreeFallback,
    /// The project template was missing and the built-in body was used.
    TemplateMissing,
    /// An explicit number is not above the highest observed number.
    NumberReused,
    /// The branch already existed and was not recreated.
    BranchExists,
    /// A non-primary artifact could not be written.
    ArtifactFailed,
    /// The optional snapshot could not be persisted.
    SnapshotFailed,
}

impl WarningCode {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningCode::RemoteUnreachable => "remote_unreachable",
            WarningCode::SourceUnavailable => "source_unavailable",
            WarningCode::VcsUnavailable => "vcs_unavailable",
            WarningCode::WorktreeFallback => "worktree_fallback",
            WarningCode::TemplateMissing => "template_missing",
            WarningCode::NumberReused => "number_reused",
            WarningCode::BranchExists => "branch_exists",
            WarningCode::ArtifactFailed => "artifact_failed",
            WarningCode::SnapshotFailed => "snapshot_failed",
        }
    }

    /// Whether the warning downgrades the result to partial success.
    pub fn is_partial_failure(self) -> bool {
        matches!(
            self,
            WarningCode::RemoteUnreachable
                | WarningCode::SourceUnavailable
                | WarningCode::VcsUnavailable
                | WarningCode::WorktreeFallback
                | WarningCode::ArtifactFailed
                | WarningCode::SnapshotFailed
        )
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(code = code.as_str(), "{message}");
        Self { code, message }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Partial,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Partial => "partial",
        }
    }

    pub fn from_warnings(warnings: &[Warning]) -> Self {
        if warnings.iter().any(|w| w.code.is_partial_failure()) {
            Status::Partial
        } else {
            Status::Success
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResolveOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutput {
    pub schema_version: u32,
    pub status: Status,
    pub sequence_number: u32,
    pub feature_num: String,
    pub branch_name: String,
    pub spec_dir: PathBuf,
    pub spec_file: PathBuf,
    pub root_path: PathBuf,
    pub repo_root: PathBuf,
    pub mode: WorkflowMode,
    pub placement: Option<PlacementStrategy>,
    pub vcs: bool,
    pub created: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl ResolveOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Legacy `KEY: value` lines for humans and older templates.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("BRANCH_NAME: {}\n", self.branch_name));
        out.push_str(&format!("SPEC_FILE: {}\n", self.spec_file.display()));
        out.push_str(&format!("FEATURE_NUM: {}\n", self.feature_num));
        out.push_str(&format!("SPEC_DIR: {}\n", self.spec_dir.display()));
        out.push_str(&format!("ROOT_PATH: {}\n", self.root_path.display()));
        out.push_str(&format!("MODE: {}\n", self.mode));
        for w in &self.warnings {
            out.push_str(&format!("WARNING: [{}] {}\n", w.code, w.message));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// TicketOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedArtifact {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketOutput {
    pub schema_version: u32,
    pub status: Status,
    pub ticket_id: String,
    pub ticket_dir: PathBuf,
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
    pub appended: Vec<PathBuf>,
    pub failed: Vec<FailedArtifact>,
    pub warnings: Vec<Warning>,
}

// ---------------------------------------------------------------------------
// FailureOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub message: String,
}

/// Emitted instead of a result object when an invocation aborts.
#[derive(Debug, Clone, Serialize)]
pub struct FailureOutput {
    pub schema_version: u32,
    pub status: crate::error::ErrorKind,
    pub error: FailureDetail,
}

impl From<&SpecflowError> for FailureOutput {
    fn from(e: &SpecflowError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            status: e.kind(),
            error: FailureDetail {
                check: e.check(),
                value: e.value(),
                hint: e.hint(),
                message: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
