//! Identifier allocation: slug derivation, branch naming and the next
//! collision-free sequence number.
//!
//! The next number is re-derived on every invocation as the maximum number
//! seen across remote branches, local branches, existing spec directories and
//! the local high-water mark, plus one. There is no lock: two machines can
//! compute the same number before either pushes, and the duplicate branch or
//! directory name is caught by git at push/merge time.

use crate::config::{BranchConfig, Config};
use crate::contract::{Warning, WarningCode};
use crate::error::{Result, SpecflowError};
use crate::paths;
use crate::vcs::Vcs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// FeatureIdentifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureIdentifier {
    pub sequence_number: u32,
    pub feature_num: String,
    pub slug: String,
    pub branch_name: String,
}

impl FeatureIdentifier {
    pub fn new(
        cfg: &BranchConfig,
        sequence_number: u32,
        slug: impl Into<String>,
        component: Option<&str>,
    ) -> Self {
        let slug = slug.into();
        let branch_name = branch_name(cfg, sequence_number, &slug, component);
        Self {
            sequence_number,
            feature_num: format_number(sequence_number, cfg.padding),
            slug,
            branch_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Slug and branch name
// ---------------------------------------------------------------------------

static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();
static HYPHENS_RE: OnceLock<Regex> = OnceLock::new();

fn non_alnum_re() -> &'static Regex {
    NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

fn hyphens_re() -> &'static Regex {
    HYPHENS_RE.get_or_init(|| Regex::new(r"-{2,}").unwrap())
}

/// Derive a short slug from a free-form intent: lowercase, hyphen-separated,
/// at most `max_words` words (0 keeps all of them).
pub fn slugify(intent: &str, max_words: usize) -> Result<String> {
    let lowered = intent.to_lowercase();
    let hyphenated = non_alnum_re().replace_all(&lowered, "-");
    let words: Vec<&str> = hyphenated.split('-').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Err(SpecflowError::EmptyIntent);
    }
    let keep = if max_words == 0 {
        words.len()
    } else {
        max_words.min(words.len())
    };
    let mut slug = words[..keep].join("-");
    if slug.len() > 64 {
        slug.truncate(64);
        slug = slug.trim_end_matches('-').to_string();
    }
    Ok(slug)
}

pub fn format_number(number: u32, padding: usize) -> String {
    format!("{number:0padding$}")
}

/// Render `cfg.template`. Absent optional tokens disappear together with their
/// trailing hyphen.
pub fn branch_name(cfg: &BranchConfig, number: u32, slug: &str, component: Option<&str>) -> String {
    let mut name = cfg
        .template
        .replace("{NNN}", &format_number(number, cfg.padding))
        .replace("{slug}", slug);
    name = match cfg.project.as_deref() {
        Some(project) => name.replace("{project}", project),
        None => name.replace("{project}-", "").replace("{project}", ""),
    };
    name = match component {
        Some(component) => name.replace("{component}", &component.to_uppercase()),
        None => name.replace("{component}-", "").replace("{component}", ""),
    };
    hyphens_re()
        .replace_all(&name, "-")
        .trim_matches('-')
        .to_string()
}

/// Regex that captures the sequence number of a feature branch or spec
/// directory named from `cfg.template`.
pub fn number_pattern(cfg: &BranchConfig) -> Regex {
    const TOKEN: &str = "(?:[A-Z][A-Z0-9_]*-)?";
    let prefix = cfg.template.split("{NNN}").next().unwrap_or_default();
    let mut pattern = String::from("^");
    let mut rest = prefix;
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix("{project}-") {
            match cfg.project.as_deref() {
                Some(p) => pattern.push_str(&format!("{}-", regex::escape(p))),
                None => pattern.push_str(TOKEN),
            }
            rest = r;
        } else if let Some(r) = rest.strip_prefix("{component}-") {
            pattern.push_str(TOKEN);
            rest = r;
        } else if let Some(r) = rest.strip_prefix("{slug}") {
            pattern.push_str("[a-z0-9-]+?");
            rest = r;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                pattern.push_str(&regex::escape(&c.to_string()));
            }
            rest = chars.as_str();
        }
    }
    let width = cfg.padding.max(1);
    pattern.push_str(&format!(r"(\d{{{width},}})(?:-|$)"));
    // The pattern is built from escaped literals and fixed fragments.
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new(r"^(\d+)-").unwrap())
}

pub fn extract_number(pattern: &Regex, name: &str) -> Option<u32> {
    pattern
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn strip_remote(name: &str) -> Option<&str> {
    name.split_once('/').map(|(_, branch)| branch)
}

// ---------------------------------------------------------------------------
// High-water mark
// ---------------------------------------------------------------------------

/// Highest number ever allocated from this checkout, so a number is not handed
/// out again after its branch and directory are deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceMark {
    pub last_allocated: u32,
}

impl SequenceMark {
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::sequence_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    /// Raise the mark to `number`; never lowers it. Returns true if written.
    pub fn record(root: &Path, number: u32) -> Result<bool> {
        let current = Self::load(root)?.map(|m| m.last_allocated).unwrap_or(0);
        if number <= current {
            return Ok(false);
        }
        let mark = SequenceMark {
            last_allocated: number,
        };
        let data = serde_yaml::to_string(&mark)?;
        crate::io::atomic_write(&paths::sequence_path(root), data.as_bytes())?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Observed sources
// ---------------------------------------------------------------------------

/// Numbers found in each identifier source.
#[derive(Debug, Clone, Default)]
pub struct Observed {
    pub remote: Vec<u32>,
    pub local: Vec<u32>,
    pub directories: Vec<u32>,
    pub high_water: Option<u32>,
    /// Raw local branch names, used to detect an already existing branch.
    pub local_branch_names: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl Observed {
    pub fn max(&self) -> Option<u32> {
        self.remote
            .iter()
            .chain(&self.local)
            .chain(&self.directories)
            .chain(self.high_water.iter())
            .copied()
            .max()
    }

    pub fn next(&self) -> u32 {
        self.max().map_or(1, |n| n.saturating_add(1))
    }

    pub fn has_local_branch(&self, name: &str) -> bool {
        self.local_branch_names.iter().any(|b| b == name)
    }
}

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

pub struct Allocator<'a> {
    vcs: Option<&'a dyn Vcs>,
    repo_root: &'a Path,
    config: &'a Config,
}

impl<'a> Allocator<'a> {
    /// `vcs` is `None` when version control is disabled or unavailable; only
    /// on-disk sources are scanned then.
    pub fn new(vcs: Option<&'a dyn Vcs>, repo_root: &'a Path, config: &'a Config) -> Self {
        Self {
            vcs,
            repo_root,
            config,
        }
    }

    /// Scan every configured source. Individual sources may be empty or
    /// unreachable; failures become warnings, never errors.
    pub fn observe(&self) -> Observed {
        let pattern = number_pattern(&self.config.branch);
        let sources = self.config.numbering.sources;
        let mut observed = Observed::default();

        if let (Some(vcs), true) = (self.vcs, sources.scans_branches()) {
            self.observe_remote(vcs, &pattern, &mut observed);

            match vcs.local_branches() {
                Ok(names) => {
                    observed.local = names
                        .iter()
                        .filter_map(|n| extract_number(&pattern, n))
                        .collect();
                    observed.local_branch_names = names;
                }
                Err(e) => observed.warnings.push(Warning::new(
                    WarningCode::SourceUnavailable,
                    format!("local branches could not be listed: {e}"),
                )),
            }
        } else if let Some(vcs) = self.vcs {
            // Branch numbers are not scanned, but existence checks still need names.
            if let Ok(names) = vcs.local_branches() {
                observed.local_branch_names = names;
            }
        }

        if sources.scans_directories() {
            match scan_spec_dirs(self.repo_root, &pattern) {
                Ok(numbers) => observed.directories = numbers,
                Err(e) => observed.warnings.push(Warning::new(
                    WarningCode::SourceUnavailable,
                    format!("spec directories could not be read: {e}"),
                )),
            }
        }

        match SequenceMark::load(self.repo_root) {
            Ok(mark) => observed.high_water = mark.map(|m| m.last_allocated),
            Err(e) => observed.warnings.push(Warning::new(
                WarningCode::SourceUnavailable,
                format!("{} could not be read: {e}", paths::SEQUENCE_FILE),
            )),
        }

        debug!(
            remote = ?observed.remote,
            local = ?observed.local,
            directories = ?observed.directories,
            high_water = ?observed.high_water,
            "observed identifier sources"
        );
        observed
    }

    fn observe_remote(&self, vcs: &dyn Vcs, pattern: &Regex, observed: &mut Observed) {
        let numbering = &self.config.numbering;
        if numbering.fetch_remote && numbering.remote_timeout_secs > 0 {
            let timeout = Duration::from_secs(numbering.remote_timeout_secs);
            if let Err(e) = vcs.fetch_remotes(timeout) {
                observed.warnings.push(Warning::new(
                    WarningCode::RemoteUnreachable,
                    format!("remote branches may be stale, fetch failed: {e}"),
                ));
            }
        }
        match vcs.remote_branches() {
            Ok(names) => {
                observed.remote = names
                    .iter()
                    .filter_map(|n| strip_remote(n))
                    .filter_map(|n| extract_number(pattern, n))
                    .collect();
            }
            Err(e) => observed.warnings.push(Warning::new(
                WarningCode::RemoteUnreachable,
                format!("remote branches could not be listed, using local sources only: {e}"),
            )),
        }
    }

    /// Return the number to use: `explicit` if given (validated), otherwise
    /// the observed maximum plus one.
    pub fn allocate(&self, explicit: Option<u32>) -> Result<(u32, Observed)> {
        let mut observed = self.observe();
        let number = match explicit {
            Some(0) => return Err(SpecflowError::InvalidNumber(0)),
            Some(n) => {
                if let Some(max) = observed.max() {
                    if n <= max {
                        observed.warnings.push(Warning::new(
                            WarningCode::NumberReused,
                            format!(
                                "explicit number {n} is not above the highest observed number {max}"
                            ),
                        ));
                    }
                }
                n
            }
            None => observed.next(),
        };
        Ok((number, observed))
    }
}

fn scan_spec_dirs(root: &Path, pattern: &Regex) -> Result<Vec<u32>> {
    let specs = paths::specs_dir(root);
    if !specs.is_dir() {
        return Ok(Vec::new());
    }
    let mut numbers = Vec::new();
    for entry in std::fs::read_dir(&specs)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(n) = extract_number(pattern, &name) {
            numbers.push(n);
        }
    }
    Ok(numbers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
