use crate::error::{Result, SpecflowError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// WorkflowMode / PlacementStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    #[default]
    Branch,
    Worktree,
}

impl WorkflowMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowMode::Branch => "branch",
            WorkflowMode::Worktree => "worktree",
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowMode {
    type Err = SpecflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "branch" => Ok(WorkflowMode::Branch),
            "worktree" => Ok(WorkflowMode::Worktree),
            _ => Err(SpecflowError::configuration(
                "workflow_mode",
                s,
                "use 'branch' or 'worktree'",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    #[default]
    Sibling,
    Nested,
    Custom,
}

impl PlacementStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementStrategy::Sibling => "sibling",
            PlacementStrategy::Nested => "nested",
            PlacementStrategy::Custom => "custom",
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlacementStrategy {
    type Err = SpecflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sibling" => Ok(PlacementStrategy::Sibling),
            "nested" => Ok(PlacementStrategy::Nested),
            "custom" => Ok(PlacementStrategy::Custom),
            _ => Err(SpecflowError::configuration(
                "placement_strategy",
                s,
                "use 'sibling', 'nested' or 'custom'",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkspaceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub workflow_mode: WorkflowMode,
    #[serde(default)]
    pub placement_strategy: PlacementStrategy,
    #[serde(default)]
    pub custom_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// BranchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_padding")]
    pub padding: usize,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default = "default_max_slug_words")]
    pub max_slug_words: usize,
}

fn default_template() -> String {
    "{NNN}-{slug}".to_string()
}

fn default_padding() -> usize {
    3
}

fn default_max_slug_words() -> usize {
    3
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            padding: default_padding(),
            project: None,
            components: Vec::new(),
            max_slug_words: default_max_slug_words(),
        }
    }
}

impl BranchConfig {
    pub fn accepts_component(&self, component: &str) -> bool {
        self.components.is_empty()
            || self
                .components
                .iter()
                .any(|c| c.eq_ignore_ascii_case(component))
    }
}

// ---------------------------------------------------------------------------
// NumberingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingSources {
    #[default]
    All,
    Branches,
    Directories,
}

impl NumberingSources {
    pub fn scans_branches(self) -> bool {
        matches!(self, NumberingSources::All | NumberingSources::Branches)
    }

    pub fn scans_directories(self) -> bool {
        matches!(self, NumberingSources::All | NumberingSources::Directories)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberingConfig {
    #[serde(default)]
    pub sources: NumberingSources,
    #[serde(default = "default_fetch_remote")]
    pub fetch_remote: bool,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

fn default_fetch_remote() -> bool {
    true
}

fn default_remote_timeout() -> u64 {
    15
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            sources: NumberingSources::default(),
            fetch_remote: default_fetch_remote(),
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketConfig {
    #[serde(default = "default_tickets_dir")]
    pub dir: String,
}

fn default_tickets_dir() -> String {
    "tickets".to_string()
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            dir: default_tickets_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub branch: BranchConfig,
    #[serde(default)]
    pub numbering: NumberingConfig,
    #[serde(default)]
    pub tickets: TicketConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace: WorkspaceConfig::default(),
            branch: BranchConfig::default(),
            numbering: NumberingConfig::default(),
            tickets: TicketConfig::default(),
        }
    }
}

impl Config {
    /// Load `.specify/config.yaml`. A missing file means system defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn exists(root: &Path) -> bool {
        paths::config_path(root).exists()
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Non-fatal findings. Fatal combinations are the strategy selector's job.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.branch.template.contains("{NNN}") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "branch.template '{}' has no {{NNN}} token; numbering cannot work",
                    self.branch.template
                ),
            });
        }
        if !self.branch.template.contains("{slug}") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "branch.template '{}' has no {{slug}} token; branch names will not be descriptive",
                    self.branch.template
                ),
            });
        }

        if self.branch.padding == 0 || self.branch.padding > 9 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "branch.padding={} is outside 1..=9",
                    self.branch.padding
                ),
            });
        }

        if self.branch.max_slug_words == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "branch.max_slug_words=0 keeps every word of the intent".to_string(),
            });
        }

        if self.branch.template.contains("{project}") && self.branch.project.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "branch.template uses {project} but branch.project is not set"
                    .to_string(),
            });
        }

        if self.workspace.custom_path.is_some()
            && self.workspace.placement_strategy != PlacementStrategy::Custom
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "workspace.custom_path is set but placement_strategy is '{}'; it is ignored",
                    self.workspace.placement_strategy
                ),
            });
        }

        if self.workspace.workflow_mode == WorkflowMode::Branch
            && self.workspace.placement_strategy != PlacementStrategy::Sibling
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "placement_strategy '{}' only applies to worktree mode",
                    self.workspace.placement_strategy
                ),
            });
        }

        if self.numbering.fetch_remote && self.numbering.remote_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "numbering.remote_timeout_secs=0 skips every remote fetch".to_string(),
            });
        }

        if paths::validate_ticket_id(&self.tickets.dir).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "tickets.dir '{}' must be a single directory name",
                    self.tickets.dir
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
