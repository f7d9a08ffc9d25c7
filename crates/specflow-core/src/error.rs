use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification surfaced in the structured output and exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationError,
    CapabilityError,
    FatalIoError,
    InputError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::CapabilityError => "capability_error",
            ErrorKind::FatalIoError => "fatal_io_error",
            ErrorKind::InputError => "input_error",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::ConfigurationError => 2,
            ErrorKind::CapabilityError => 3,
            ErrorKind::FatalIoError => 4,
            ErrorKind::InputError => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SpecflowError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SpecflowError {
    #[error("configuration error: {check} (value: '{value}'); {hint}")]
    Configuration {
        check: String,
        value: String,
        hint: String,
    },

    #[error("capability error: {check} (detected: {detected}, required: {required}); {hint}")]
    Capability {
        check: String,
        detected: String,
        required: String,
        hint: String,
    },

    #[error("{step} failed for {}: {source}", path.display())]
    FatalIo {
        step: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed: {detail}")]
    VcsCommand { step: String, detail: String },

    #[error("feature description cannot be empty")]
    EmptyIntent,

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid ticket id '{0}': must be a single non-empty path component")]
    InvalidTicketId(String),

    #[error("invalid feature number {0}: must be at least 1")]
    InvalidNumber(u32),

    #[error("not on a feature branch (current: '{0}'); feature branches look like 001-feature-name")]
    NotOnFeatureBranch(String),

    #[error("feature directory not found: {}; run 'specflow create' first", .0.display())]
    FeatureDirMissing(PathBuf),

    #[error("{name} not found in {}; {hint}", dir.display())]
    MissingPrerequisite {
        name: String,
        dir: PathBuf,
        hint: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SpecflowError {
    pub fn configuration(
        check: impl Into<String>,
        value: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        SpecflowError::Configuration {
            check: check.into(),
            value: value.into(),
            hint: hint.into(),
        }
    }

    pub fn capability(
        check: impl Into<String>,
        detected: impl Into<String>,
        required: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        SpecflowError::Capability {
            check: check.into(),
            detected: detected.into(),
            required: required.into(),
            hint: hint.into(),
        }
    }

    pub fn fatal_io(
        step: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        SpecflowError::FatalIo {
            step: step.into(),
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SpecflowError::Configuration { .. } | SpecflowError::Yaml(_) => {
                ErrorKind::ConfigurationError
            }
            SpecflowError::Capability { .. } => ErrorKind::CapabilityError,
            SpecflowError::FatalIo { .. }
            | SpecflowError::VcsCommand { .. }
            | SpecflowError::Io(_)
            | SpecflowError::Json(_) => ErrorKind::FatalIoError,
            SpecflowError::EmptyIntent
            | SpecflowError::InvalidSlug(_)
            | SpecflowError::InvalidTicketId(_)
            | SpecflowError::InvalidNumber(_)
            | SpecflowError::NotOnFeatureBranch(_)
            | SpecflowError::FeatureDirMissing(_)
            | SpecflowError::MissingPrerequisite { .. } => ErrorKind::InputError,
        }
    }

    /// Which check failed, for the structured failure object.
    pub fn check(&self) -> String {
        match self {
            SpecflowError::Configuration { check, .. }
            | SpecflowError::Capability { check, .. } => check.clone(),
            SpecflowError::FatalIo { step, .. } | SpecflowError::VcsCommand { step, .. } => {
                step.clone()
            }
            SpecflowError::EmptyIntent => "intent".to_string(),
            SpecflowError::InvalidSlug(_) => "slug".to_string(),
            SpecflowError::InvalidTicketId(_) => "ticket_id".to_string(),
            SpecflowError::InvalidNumber(_) => "number".to_string(),
            SpecflowError::NotOnFeatureBranch(_) => "feature_branch".to_string(),
            SpecflowError::FeatureDirMissing(_) => "feature_dir".to_string(),
            SpecflowError::MissingPrerequisite { name, .. } => name.clone(),
            SpecflowError::Io(_) => "io".to_string(),
            SpecflowError::Yaml(_) => "config_parse".to_string(),
            SpecflowError::Json(_) => "json".to_string(),
        }
    }

    /// The offending value, when there is one.
    pub fn value(&self) -> Option<String> {
        match self {
            SpecflowError::Configuration { value, .. } => Some(value.clone()),
            SpecflowError::Capability { detected, .. } => Some(detected.clone()),
            SpecflowError::FatalIo { path, .. } => Some(path.display().to_string()),
            SpecflowError::InvalidSlug(v)
            | SpecflowError::InvalidTicketId(v)
            | SpecflowError::NotOnFeatureBranch(v) => Some(v.clone()),
            SpecflowError::InvalidNumber(n) => Some(n.to_string()),
            SpecflowError::FeatureDirMissing(p) => Some(p.display().to_string()),
            SpecflowError::MissingPrerequisite { dir, .. } => Some(dir.display().to_string()),
            _ => None,
        }
    }

    /// One actionable remediation hint.
    pub fn hint(&self) -> Option<String> {
        match self {
            SpecflowError::Configuration { hint, .. }
            | SpecflowError::Capability { hint, .. }
            | SpecflowError::MissingPrerequisite { hint, .. } => Some(hint.clone()),
            SpecflowError::FatalIo { .. } | SpecflowError::VcsCommand { .. } => {
                Some("check permissions and repository state, then rerun".to_string())
            }
            SpecflowError::EmptyIntent => {
                Some("pass a short description such as \"add login\"".to_string())
            }
            SpecflowError::InvalidTicketId(_) => {
                Some("use the ticket key as-is, e.g. PROJ-123".to_string())
            }
            SpecflowError::NotOnFeatureBranch(_) => Some(
                "switch to a feature branch or set SPECFLOW_FEATURE".to_string(),
            ),
            SpecflowError::FeatureDirMissing(_) => {
                Some("run 'specflow create' first".to_string())
            }
            SpecflowError::Yaml(_) => Some("fix the syntax of .specify/config.yaml".to_string()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpecflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_exit_codes() {
        let cfg = SpecflowError::configuration("custom_path", "", "set a path");
        let cap = SpecflowError::capability("git_version", "2.4.0", "2.15.0", "upgrade git");
        let io = SpecflowError::fatal_io(
            "write spec.md",
            "/tmp/x",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(cfg.kind(), ErrorKind::ConfigurationError);
        assert_eq!(cap.kind(), ErrorKind::CapabilityError);
        assert_eq!(io.kind(), ErrorKind::FatalIoError);
        assert_ne!(cfg.kind().exit_code(), cap.kind().exit_code());
        assert_ne!(cap.kind().exit_code(), io.kind().exit_code());
    }

    #[test]
    fn capability_message_names_both_versions() {
        let e = SpecflowError::capability("git_version", "2.4.0", "2.15.0", "upgrade git");
        let msg = e.to_string();
        assert!(msg.contains("2.4.0"));
        assert!(msg.contains("2.15.0"));
        assert_eq!(e.value().as_deref(), Some("2.4.0"));
        assert_eq!(e.hint().as_deref(), Some("upgrade git"));
    }
}
