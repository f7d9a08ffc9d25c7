//! Feature creation end to end: validate, allocate, materialize, emit.
//!
//! Configuration and capability problems are reported before anything is
//! written. After that, non-fatal failures collect as warnings and the caller
//! always gets a usable `spec_dir` or a fatal error, never a half result.

use crate::config::{Config, WarnLevel};
use crate::contract::{ResolveOutput, Status, Warning, WarningCode, SCHEMA_VERSION};
use crate::error::{Result, SpecflowError};
use crate::identifier::{self, Allocator, FeatureIdentifier, SequenceMark};
use crate::materialize::Materializer;
use crate::paths;
use crate::strategy::{self, HostCapability};
use crate::vcs::Vcs;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Free-form description, e.g. "add login".
    pub intent: String,
    /// Explicit slug instead of one derived from `intent`.
    pub short_name: Option<String>,
    /// Explicit sequence number instead of allocation.
    pub number: Option<u32>,
    /// Organizational tracking token for `{component}`.
    pub component: Option<String>,
    /// Skip version control entirely.
    pub no_vcs: bool,
    /// Also persist the output under `.specify/snapshots/`.
    pub snapshot: bool,
}

static COMPONENT_RE: OnceLock<Regex> = OnceLock::new();

fn component_re() -> &'static Regex {
    COMPONENT_RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap())
}

fn validate_component(config: &Config, component: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = component else {
        return Ok(None);
    };
    let upper = raw.trim().to_uppercase();
    if !component_re().is_match(&upper) {
        return Err(SpecflowError::configuration(
            "component token format",
            raw,
            "use letters, digits and underscores, starting with a letter",
        ));
    }
    if !config.branch.accepts_component(&upper) {
        return Err(SpecflowError::configuration(
            "component is listed in branch.components",
            raw,
            format!("use one of: {}", config.branch.components.join(", ")),
        ));
    }
    Ok(Some(upper))
}

fn derive_slug(config: &Config, req: &ResolveRequest) -> Result<String> {
    match &req.short_name {
        Some(name) => {
            paths::validate_slug(name)?;
            Ok(name.clone())
        }
        None => identifier::slugify(&req.intent, config.branch.max_slug_words),
    }
}

/// Error-level findings from [`Config::validate`] make the configuration unusable.
fn check_config(config: &Config) -> Result<()> {
    match config
        .validate()
        .into_iter()
        .find(|w| w.level == WarnLevel::Error)
    {
        Some(finding) => Err(SpecflowError::configuration(
            "configuration is consistent",
            finding.message,
            "fix .specify/config.yaml; 'specflow config validate' lists every problem",
        )),
        None => Ok(()),
    }
}

/// Create (or re-resolve) a feature workspace under `root`.
#[instrument(skip_all, fields(intent = %req.intent))]
pub fn resolve(
    root: &Path,
    config: &Config,
    vcs: &dyn Vcs,
    req: &ResolveRequest,
) -> Result<ResolveOutput> {
    // Validation phase: nothing below touches the filesystem or the repository.
    check_config(config)?;
    let slug = derive_slug(config, req)?;
    let component = validate_component(config, req.component.as_deref())?;
    if req.number == Some(0) {
        return Err(SpecflowError::InvalidNumber(0));
    }

    let version = vcs.probe();
    let vcs_root = match version {
        Some(_) => vcs.repo_root()?,
        None => None,
    };
    let host = HostCapability {
        version,
        in_repo: vcs_root.is_some(),
    };
    let strategy = strategy::select(&config.workspace, host, req.no_vcs)?;
    debug!(?strategy, ?host, "selected strategy");

    let mut warnings: Vec<Warning> = Vec::new();
    let use_vcs = !req.no_vcs && host.vcs_usable();
    if !req.no_vcs && !use_vcs {
        let reason = if version.is_none() {
            "git not found"
        } else {
            "not inside a git repository"
        };
        warnings.push(Warning::new(
            WarningCode::VcsUnavailable,
            format!("{reason}; created spec directories without a branch"),
        ));
    }
    let repo_root: PathBuf = vcs_root
        .filter(|_| use_vcs)
        .unwrap_or_else(|| root.to_path_buf());
    let active_vcs = use_vcs.then_some(vcs);

    // Allocation.
    let (number, observed) = Allocator::new(active_vcs, &repo_root, config).allocate(req.number)?;
    warnings.extend(observed.warnings.iter().cloned());
    let id = FeatureIdentifier::new(&config.branch, number, slug, component.as_deref());
    let branch_exists = observed.has_local_branch(&id.branch_name);
    info!(branch = %id.branch_name, number, "allocated feature identifier");

    // Materialization.
    let location =
        Materializer::new(active_vcs, &repo_root).materialize(&strategy, &id, branch_exists)?;
    warnings.extend(location.warnings);

    if let Err(e) = SequenceMark::record(&repo_root, number) {
        warnings.push(Warning::new(
            WarningCode::SourceUnavailable,
            format!("{} could not be updated: {e}", paths::SEQUENCE_FILE),
        ));
    }

    let mut output = ResolveOutput {
        schema_version: SCHEMA_VERSION,
        status: Status::from_warnings(&warnings),
        sequence_number: id.sequence_number,
        feature_num: id.feature_num,
        branch_name: id.branch_name,
        spec_dir: location.spec_dir,
        spec_file: location.spec_file,
        root_path: location.root_path,
        repo_root,
        mode: location.mode,
        placement: location.placement,
        vcs: use_vcs,
        created: location.created,
        warnings,
    };

    if req.snapshot {
        write_snapshot(&mut output);
    }
    Ok(output)
}

/// Persist the output next to the feature. A failure only downgrades the result.
fn write_snapshot(output: &mut ResolveOutput) {
    let path = paths::snapshot_path(&output.root_path, &output.branch_name);
    let written = output
        .to_json()
        .map_err(SpecflowError::from)
        .and_then(|json| crate::io::atomic_write(&path, json.as_bytes()));
    match written {
        Ok(()) => {
            debug!(path = %path.display(), "wrote snapshot");
        }
        Err(e) => {
            output.warnings.push(Warning::new(
                WarningCode::SnapshotFailed,
                format!("snapshot {} could not be written: {e}", path.display()),
            ));
            output.status = Status::from_warnings(&output.warnings);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
