pub mod config;
pub mod create;
pub mod doctor;
pub mod feature;
pub mod init;
pub mod ticket;
pub mod worktree;

use anyhow::Context;
use specflow_core::config::Config;
use std::path::Path;

/// Load `.specify/config.yaml`, keeping the typed error for the exit code.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).with_context(|| {
        format!(
            "failed to load {}",
            specflow_core::paths::config_path(root).display()
        )
    })
}
