//! Ticket-mode scaffolding keyed by an external ticket id.
//!
//! Layout under `<repo_root>/<tickets.dir>/<ticket_id>/`:
//!
//! ```text
//! intake.md            primary; raw ticket text between the raw markers
//! metadata.yaml        only with a title or url
//! plan/overview.md
//! plan/checklist.md
//! plan/step-NN.md      one per requested step
//! reviews/code-review.md
//! reviews/security-review.md
//! reviews/test-review.md
//! reviews/decision-log.md
//! ```
//!
//! Only `intake.md` is fatal. Any other artifact that cannot be written is
//! listed in `failed` and the result is partial.

use crate::config::Config;
use crate::contract::{FailedArtifact, Status, TicketOutput, Warning, WarningCode, SCHEMA_VERSION};
use crate::error::Result;
use crate::io;
use crate::materialize::into_fatal;
use crate::paths;
use crate::templates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INTAKE_FILE: &str = "intake.md";
pub const METADATA_FILE: &str = "metadata.yaml";
pub const PLAN_DIR: &str = "plan";
pub const REVIEWS_DIR: &str = "reviews";

pub const RAW_START: &str = "<!-- ticket:raw:start -->";
pub const RAW_END: &str = "<!-- ticket:raw:end -->";

/// Review logs, created empty and only ever appended to by people.
pub const REVIEW_LOGS: [&str; 4] = [
    "code-review.md",
    "security-review.md",
    "test-review.md",
    "decision-log.md",
];

#[derive(Debug, Clone, Default)]
pub struct TicketRequest {
    pub ticket_id: String,
    /// Raw ticket text pasted from the tracker.
    pub raw: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Number of `plan/step-NN.md` documents.
    pub steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMetadata {
    pub ticket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn raw_section(raw: &str) -> String {
    format!("## Raw Ticket\n\n{RAW_START}\n{}\n{RAW_END}\n", raw.trim_end())
}

/// Ensure every artifact of the ticket exists. Never modifies a present
/// artifact except for appending the raw section to an intake that lacks it.
pub fn scaffold(repo_root: &Path, config: &Config, req: &TicketRequest) -> Result<TicketOutput> {
    paths::validate_ticket_id(&req.ticket_id)?;
    let ticket_dir = paths::ticket_dir(repo_root, &config.tickets.dir, &req.ticket_id);

    let mut run = Run::new(&req.ticket_id, ticket_dir.clone());

    if io::ensure_dir(&ticket_dir)
        .map_err(|e| into_fatal("create ticket directory", &ticket_dir, e))?
    {
        debug!(path = %ticket_dir.display(), "created ticket directory");
    }

    run.intake(repo_root, req)?;

    if req.title.is_some() || req.url.is_some() {
        let meta = TicketMetadata {
            ticket_id: req.ticket_id.clone(),
            title: req.title.clone(),
            url: req.url.clone(),
            created_at: Utc::now(),
        };
        let path = ticket_dir.join(METADATA_FILE);
        match serde_yaml::to_string(&meta) {
            Ok(body) => run.artifact(path, body.as_bytes()),
            Err(e) => run.fail(path, e.to_string()),
        }
    }

    let plan_dir = ticket_dir.join(PLAN_DIR);
    run.artifact(plan_dir.join("overview.md"), templates::TICKET_OVERVIEW.as_bytes());
    run.artifact(plan_dir.join("checklist.md"), templates::TICKET_CHECKLIST.as_bytes());
    for step in 1..=req.steps {
        let body = templates::ticket_step(step);
        run.artifact(plan_dir.join(format!("step-{step:02}.md")), body.as_bytes());
    }

    let reviews_dir = ticket_dir.join(REVIEWS_DIR);
    for log in REVIEW_LOGS {
        run.artifact(reviews_dir.join(log), b"");
    }

    Ok(run.finish())
}

struct Run {
    out: TicketOutput,
}

impl Run {
    fn new(ticket_id: &str, ticket_dir: PathBuf) -> Self {
        Self {
            out: TicketOutput {
                schema_version: SCHEMA_VERSION,
                status: Status::Success,
                ticket_id: ticket_id.to_string(),
                ticket_dir,
                created: Vec::new(),
                existing: Vec::new(),
                appended: Vec::new(),
                failed: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    fn intake(&mut self, repo_root: &Path, req: &TicketRequest) -> Result<()> {
        let path = self.out.ticket_dir.join(INTAKE_FILE);

        if path.exists() {
            self.out.existing.push(path.clone());
            if let Some(raw) = &req.raw {
                let appended = io::append_section_if_absent(&path, RAW_START, &raw_section(raw))
                    .map_err(|e| into_fatal("append raw ticket text", &path, e))?;
                if appended {
                    info!(path = %path.display(), "appended raw ticket text");
                    self.out.appended.push(path);
                }
            }
            return Ok(());
        }

        let (template, warning) = templates::load(repo_root, paths::TICKET_INTAKE_TEMPLATE)?;
        self.out.warnings.extend(warning);
        let heading = match &req.title {
            Some(title) => format!("# {}: {title}\n\n", req.ticket_id),
            None => format!("# {}\n\n", req.ticket_id),
        };
        let mut body = heading.into_bytes();
        body.extend_from_slice(&template);
        if let Some(raw) = &req.raw {
            if body.last() != Some(&b'\n') {
                body.push(b'\n');
            }
            body.push(b'\n');
            body.extend_from_slice(raw_section(raw).as_bytes());
        }
        if io::write_if_missing(&path, &body)
            .map_err(|e| into_fatal("write ticket intake", &path, e))?
        {
            info!(path = %path.display(), "created ticket intake");
            self.out.created.push(path);
        } else {
            self.out.existing.push(path);
        }
        Ok(())
    }

    fn artifact(&mut self, path: PathBuf, body: &[u8]) {
        match io::write_if_missing(&path, body) {
            Ok(true) => {
                debug!(path = %path.display(), "created");
                self.out.created.push(path);
            }
            Ok(false) => self.out.existing.push(path),
            Err(e) => self.fail(path, e.to_string()),
        }
    }

    fn fail(&mut self, path: PathBuf, error: String) {
        self.out.warnings.push(Warning::new(
            WarningCode::ArtifactFailed,
            format!("{} could not be written: {error}", path.display()),
        ));
        self.out.failed.push(FailedArtifact { path, error });
    }

    fn finish(mut self) -> TicketOutput {
        self.out.status = Status::from_warnings(&self.out.warnings);
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, SpecflowError};
    use std::fs;
    use tempfile::TempDir;

    fn request(id: &str) -> TicketRequest {
        TicketRequest {
            ticket_id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn creates_full_artifact_set() {
        let dir = TempDir::new().unwrap();
        let req = TicketRequest {
            steps: 2,
            ..request("PROJ-123")
        };
        let out = scaffold(dir.path(), &Config::default(), &req).unwrap();
        let base = dir.path().join("tickets/PROJ-123");
        assert_eq!(out.ticket_dir, base);
        for rel in [
            "intake.md",
            "plan/overview.md",
            "plan/checklist.md",
            "plan/step-01.md",
            "plan/step-02.md",
            "reviews/code-review.md",
            "reviews/security-review.md",
            "reviews/test-review.md",
            "reviews/decision-log.md",
        ] {
            assert!(base.join(rel).is_file(), "missing {rel}");
        }
        assert!(!base.join("metadata.yaml").exists());
        assert_eq!(fs::read_to_string(base.join("reviews/decision-log.md")).unwrap(), "");
        assert_eq!(out.created.len(), 9);
        assert!(out.failed.is_empty());
        assert_eq!(out.status, Status::Success);
    }

    #[test]
    fn metadata_written_with_title() {
        let dir = TempDir::new().unwrap();
        let req = TicketRequest {
            title: Some("Login times out".to_string()),
            url: Some("https://tracker.example/PROJ-9".to_string()),
            ..request("PROJ-9")
        };
        scaffold(dir.path(), &Config::default(), &req).unwrap();
        let base = dir.path().join("tickets/PROJ-9");
        let meta: TicketMetadata =
            serde_yaml::from_str(&fs::read_to_string(base.join("metadata.yaml")).unwrap()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Login times out"));
        let intake = fs::read_to_string(base.join("intake.md")).unwrap();
        assert!(intake.starts_with("# PROJ-9: Login times out"));
    }

    #[test]
    fn rerun_leaves_review_logs_untouched() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::default();
        scaffold(dir.path(), &cfg, &request("PROJ-1")).unwrap();
        let log = dir.path().join("tickets/PROJ-1/reviews/code-review.md");
        fs::write(&log, "- reviewer: looks fine\n").unwrap();
        let overview = dir.path().join("tickets/PROJ-1/plan/overview.md");
        fs::write(&overview, "custom plan").unwrap();

        let out = scaffold(dir.path(), &cfg, &request("PROJ-1")).unwrap();
        assert!(out.created.is_empty());
        assert_eq!(out.existing.len(), 7);
        assert_eq!(fs::read_to_string(&log).unwrap(), "- reviewer: looks fine\n");
        assert_eq!(fs::read_to_string(&overview).unwrap(), "custom plan");
    }

    #[test]
    fn raw_section_appended_once() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::default();
        scaffold(dir.path(), &cfg, &request("PROJ-2")).unwrap();
        let intake = dir.path().join("tickets/PROJ-2/intake.md");
        let before = fs::read_to_string(&intake).unwrap();

        let req = TicketRequest {
            raw: Some("As a user I want to log in".to_string()),
            ..request("PROJ-2")
        };
        let out = scaffold(dir.path(), &cfg, &req).unwrap();
        assert_eq!(out.appended, vec![intake.clone()]);
        let after = fs::read_to_string(&intake).unwrap();
        assert!(after.starts_with(&before));
        assert!(after.contains(RAW_START));
        assert!(after.contains("As a user I want to log in"));

        let again = scaffold(dir.path(), &cfg, &req).unwrap();
        assert!(again.appended.is_empty());
        assert_eq!(fs::read_to_string(&intake).unwrap(), after);
    }

    #[test]
    fn blocked_artifact_is_partial_not_fatal() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("tickets/PROJ-3");
        fs::create_dir_all(&base).unwrap();
        // A file where the plan directory should be.
        fs::write(base.join("plan"), "").unwrap();

        let out = scaffold(dir.path(), &Config::default(), &request("PROJ-3")).unwrap();
        assert_eq!(out.status, Status::Partial);
        assert_eq!(out.failed.len(), 2);
        assert!(out
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::ArtifactFailed));
        assert!(base.join("intake.md").is_file());
        assert!(base.join("reviews/test-review.md").is_file());
    }

    #[test]
    fn invalid_ticket_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        for id in ["", "../escape", "a/b"] {
            let err = scaffold(dir.path(), &Config::default(), &request(id)).unwrap_err();
            assert!(matches!(err, SpecflowError::InvalidTicketId(_)));
            assert_eq!(err.kind(), ErrorKind::InputError);
        }
        assert!(!dir.path().join("tickets").exists());
    }

    #[test]
    fn custom_tickets_dir() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.tickets.dir = "work".to_string();
        let out = scaffold(dir.path(), &cfg, &request("GH-7")).unwrap();
        assert_eq!(out.ticket_dir, dir.path().join("work/GH-7"));
    }
}
