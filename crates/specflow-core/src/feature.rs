use crate::config::Config;
use crate::contract::Warning;
use crate::error::{Result, SpecflowError};
use crate::identifier;
use crate::io;
use crate::materialize::into_fatal;
use crate::paths;
use crate::templates;
use crate::vcs::Vcs;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// FeaturePaths
// ---------------------------------------------------------------------------

/// Every well-known path of one feature. Computing it never creates anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FeaturePaths {
    pub repo_root: PathBuf,
    pub branch: String,
    pub feature_dir: PathBuf,
    pub feature_spec: PathBuf,
    pub impl_plan: PathBuf,
    pub tasks: PathBuf,
    pub research: PathBuf,
    pub data_model: PathBuf,
    pub quickstart: PathBuf,
    pub contracts_dir: PathBuf,
}

impl FeaturePaths {
    pub fn new(repo_root: &Path, branch: &str) -> Self {
        let feature_dir = paths::spec_dir(repo_root, branch);
        Self {
            repo_root: repo_root.to_path_buf(),
            branch: branch.to_string(),
            feature_spec: feature_dir.join(paths::SPEC_FILE),
            impl_plan: feature_dir.join(paths::PLAN_FILE),
            tasks: feature_dir.join(paths::TASKS_FILE),
            research: feature_dir.join(paths::RESEARCH_FILE),
            data_model: feature_dir.join(paths::DATA_MODEL_FILE),
            quickstart: feature_dir.join(paths::QUICKSTART_FILE),
            contracts_dir: feature_dir.join(paths::CONTRACTS_DIR),
            feature_dir,
        }
    }

    /// `KEY: value` lines in a fixed order.
    pub fn to_lines(&self) -> String {
        let rows: [(&str, String); 10] = [
            ("REPO_ROOT", self.repo_root.display().to_string()),
            ("BRANCH", self.branch.clone()),
            ("FEATURE_DIR", self.feature_dir.display().to_string()),
            ("FEATURE_SPEC", self.feature_spec.display().to_string()),
            ("IMPL_PLAN", self.impl_plan.display().to_string()),
            ("TASKS", self.tasks.display().to_string()),
            ("RESEARCH", self.research.display().to_string()),
            ("DATA_MODEL", self.data_model.display().to_string()),
            ("QUICKSTART", self.quickstart.display().to_string()),
            ("CONTRACTS_DIR", self.contracts_dir.display().to_string()),
        ];
        rows.iter().map(|(k, v)| format!("{k}: {v}\n")).collect()
    }
}

/// Resolve the current feature from `override_name` (the `SPECFLOW_FEATURE`
/// variable) or the checked-out branch. The name must look like a feature
/// branch.
pub fn locate(
    root: &Path,
    config: &Config,
    vcs: &dyn Vcs,
    override_name: Option<&str>,
) -> Result<FeaturePaths> {
    let override_name = override_name.map(str::trim).filter(|n| !n.is_empty());
    let (repo_root, branch) = match override_name {
        Some(name) => (root.to_path_buf(), name.to_string()),
        None => {
            if vcs.probe().is_none() {
                return Err(SpecflowError::NotOnFeatureBranch(String::new()));
            }
            let repo_root = vcs.repo_root()?.unwrap_or_else(|| root.to_path_buf());
            let branch = vcs.current_branch()?.unwrap_or_default();
            (repo_root, branch)
        }
    };

    let pattern = identifier::number_pattern(&config.branch);
    if identifier::extract_number(&pattern, &branch).is_none() {
        return Err(SpecflowError::NotOnFeatureBranch(branch));
    }
    Ok(FeaturePaths::new(&repo_root, &branch))
}

// ---------------------------------------------------------------------------
// Plan setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlanSetup {
    #[serde(flatten)]
    pub paths: FeaturePaths,
    pub created: bool,
    pub warnings: Vec<Warning>,
}

/// Ensure the feature directory and `plan.md`, seeded from the plan template.
pub fn setup_plan(fp: FeaturePaths) -> Result<PlanSetup> {
    io::ensure_dir(&fp.feature_dir)
        .map_err(|e| into_fatal("create feature directory", &fp.feature_dir, e))?;

    let mut warnings = Vec::new();
    let mut created = false;
    if !fp.impl_plan.exists() {
        let (body, warning) = templates::load(&fp.repo_root, paths::PLAN_TEMPLATE)?;
        warnings.extend(warning);
        created = io::write_if_missing(&fp.impl_plan, &body)
            .map_err(|e| into_fatal("write plan", &fp.impl_plan, e))?;
    }
    Ok(PlanSetup {
        paths: fp,
        created,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Prerequisites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Prerequisites {
    #[serde(rename = "FEATURE_DIR")]
    pub feature_dir: PathBuf,
    #[serde(rename = "AVAILABLE_DOCS")]
    pub available_docs: Vec<String>,
}

/// Require the feature directory and `plan.md`, then list which optional
/// design documents exist.
pub fn check_prerequisites(fp: &FeaturePaths) -> Result<Prerequisites> {
    if !fp.feature_dir.is_dir() {
        return Err(SpecflowError::FeatureDirMissing(fp.feature_dir.clone()));
    }
    if !fp.impl_plan.is_file() {
        return Err(SpecflowError::MissingPrerequisite {
            name: paths::PLAN_FILE.to_string(),
            dir: fp.feature_dir.clone(),
            hint: "run 'specflow plan' first".to_string(),
        });
    }

    let mut docs = Vec::new();
    if fp.research.is_file() {
        docs.push(paths::RESEARCH_FILE.to_string());
    }
    if fp.data_model.is_file() {
        docs.push(paths::DATA_MODEL_FILE.to_string());
    }
    let contracts_nonempty = std::fs::read_dir(&fp.contracts_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if contracts_nonempty {
        docs.push(format!("{}/", paths::CONTRACTS_DIR));
    }
    if fp.quickstart.is_file() {
        docs.push(paths::QUICKSTART_FILE.to_string());
    }

    Ok(Prerequisites {
        feature_dir: fp.feature_dir.clone(),
        available_docs: docs,
    })
}
