//! Path resolution for the config file and list files.

use std::path::{Path, PathBuf};

use ideavault_core::document::list_file_name;

use crate::config::{default_config_path, read_config, IdeaVaultConfig};
use crate::constants::CONFIG_ENV;

/// Resolve the config file path, checking IDEAVAULT_CONFIG env var first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Load the config file, falling back to defaults when none exists.
pub fn load_config() -> anyhow::Result<IdeaVaultConfig> {
    let config_path = resolve_config_path()?;
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return IdeaVaultConfig::defaults();
    }
    read_config(&config_path)
}

/// Path of the encrypted file for the list called `name`.
pub fn list_path(list_dir: &Path, name: &str) -> PathBuf {
    list_dir.join(list_file_name(name))
}

/// Error message when a list file is missing.
pub fn missing_list_message(name: &str, path: &Path) -> String {
    format!("No list named \"{}\" at {}", name, path.display())
}
