use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ideavault_core::keystore::DEFAULT_HANDLE_NAME;

use crate::constants::APP_DIR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaVaultConfig {
    pub keys: KeysSection,
    pub lists: ListsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeysSection {
    /// Where new key files are saved
    pub dir: String,
    /// JSON file remembering key file handles
    pub handle_store: String,
    /// Logical name of the active key's handle
    #[serde(default = "default_handle_name")]
    pub handle_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListsSection {
    pub dir: String,
}

fn default_handle_name() -> String {
    DEFAULT_HANDLE_NAME.to_string()
}

impl IdeaVaultConfig {
    pub fn new(key_dir: PathBuf, handle_store: PathBuf, list_dir: PathBuf) -> Self {
        Self {
            keys: KeysSection {
                dir: key_dir.to_string_lossy().to_string(),
                handle_store: handle_store.to_string_lossy().to_string(),
                handle_name: default_handle_name(),
            },
            lists: ListsSection {
                dir: list_dir.to_string_lossy().to_string(),
            },
        }
    }

    /// Configuration used when no config file exists.
    pub fn defaults() -> anyhow::Result<Self> {
        Ok(Self::new(
            default_key_dir()?,
            default_handle_store_path()?,
            default_list_dir()?,
        ))
    }

    pub fn key_dir(&self) -> PathBuf {
        PathBuf::from(&self.keys.dir)
    }

    pub fn handle_store_path(&self) -> PathBuf {
        PathBuf::from(&self.keys.handle_store)
    }

    pub fn list_dir(&self) -> PathBuf {
        PathBuf::from(&self.lists.dir)
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_key_dir() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("keys"))
}

pub fn default_handle_store_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("handles.json"))
}

pub fn default_list_dir() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("lists"))
}

pub fn read_config(path: &Path) -> anyhow::Result<IdeaVaultConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &IdeaVaultConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".config").join(APP_DIR))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join(APP_DIR))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
