//! Application context for the IdeaVault CLI.
//!
//! Bundles CLI arguments with the lazily-loaded configuration and builds
//! the key store pieces commands need.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use once_cell::unsync::OnceCell;

use ideavault_core::keystore::{
    load_key_material, FsKeyFileHandle, JsonHandleRepository, KeyFileHandle, KeyStoreResolver,
    LoadedKey,
};
use ideavault_core::KeyMaterial;

use crate::cli::Cli;
use crate::config::IdeaVaultConfig;
use crate::errors::CliError;
use crate::ui::UiContext;

use super::access::TerminalAccess;
use super::resolver::{list_path, load_config};

pub type TerminalResolver = KeyStoreResolver<JsonHandleRepository, TerminalAccess>;

/// Application context that bundles CLI args with configuration.
pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<IdeaVaultConfig>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    /// Context with an already-known configuration.
    pub fn with_config(cli: &'a Cli, config: IdeaVaultConfig) -> Self {
        Self {
            cli,
            config: OnceCell::with_value(config),
        }
    }

    pub fn cli(&self) -> &'a Cli {
        self.cli
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Whether prompts may be shown.
    pub fn interactive(&self) -> bool {
        !self.cli.no_input && std::io::stdin().is_terminal()
    }

    pub fn ui_context(&self, json: bool) -> UiContext {
        UiContext::from_env(json, self.quiet())
    }

    /// Get the configuration, loading it lazily if needed.
    pub fn config(&self) -> anyhow::Result<&IdeaVaultConfig> {
        self.config.get_or_try_init(load_config)
    }

    /// Key file path given with `--key-file`, if any.
    pub fn key_file_override(&self) -> Option<PathBuf> {
        self.cli
            .key_file
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn handle_repository(&self) -> anyhow::Result<JsonHandleRepository> {
        Ok(JsonHandleRepository::new(
            self.config()?.handle_store_path(),
        ))
    }

    pub fn terminal_access(&self) -> anyhow::Result<TerminalAccess> {
        Ok(TerminalAccess::new(
            self.config()?.key_dir(),
            self.interactive(),
        ))
    }

    /// Key store resolver for the configured handle name.
    pub fn resolver(&self) -> anyhow::Result<TerminalResolver> {
        let config = self.config()?;
        Ok(
            KeyStoreResolver::new(self.handle_repository()?, self.terminal_access()?)
                .with_name(config.keys.handle_name.clone()),
        )
    }

    /// Load the active key: `--key-file` if given, otherwise the remembered
    /// key file (prompting when allowed).
    pub fn load_key(&self) -> anyhow::Result<LoadedKey<FsKeyFileHandle>> {
        if let Some(path) = self.key_file_override() {
            if !path.exists() {
                return Err(CliError::not_found(
                    format!("Key file {} not found", path.display()),
                    "Check the --key-file path or IDEAVAULT_KEY_FILE.",
                )
                .into());
            }
            let handle = FsKeyFileHandle::new(&path);
            let bytes = zeroize::Zeroizing::new(handle.read()?);
            let material = KeyMaterial::from_json_bytes(&bytes)
                .with_context(|| format!("Invalid key file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "using key file from --key-file");
            return Ok(LoadedKey {
                material,
                freshly_created: false,
                handle: FsKeyFileHandle::approved(&path, &bytes),
            });
        }

        let mut resolver = self.resolver()?;
        Ok(load_key_material(&mut resolver)?)
    }

    /// Path of the encrypted file for the list called `name`.
    pub fn list_path(&self, name: &str) -> anyhow::Result<PathBuf> {
        Ok(list_path(&self.config()?.list_dir(), name))
    }
}
