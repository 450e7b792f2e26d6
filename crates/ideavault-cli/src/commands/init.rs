use std::path::PathBuf;

use ideavault_core::keystore::KeyFileHandle;

use crate::app::{resolve_config_path, AppContext};
use crate::cli::InitArgs;
use crate::config::{
    default_handle_store_path, default_key_dir, default_list_dir, write_config, IdeaVaultConfig,
};
use crate::errors::CliError;
use crate::ui::{badge, hint, print, receipt, Badge};

use super::key::create_key;

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let config_path = resolve_config_path()?;
    if config_path.exists() && !args.force {
        return Err(CliError::invalid_input_with_hint(
            format!("Config already exists at {}", config_path.display()),
            "Use `ideavault key new` to create another key, or `init --force` to start over.",
        )
        .into());
    }

    let key_dir = match &args.key_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_key_dir()?,
    };
    let list_dir = match &args.list_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_list_dir()?,
    };
    let config = IdeaVaultConfig::new(key_dir, default_handle_store_path()?, list_dir);

    // Create the key first: a cancelled save leaves no config behind.
    let ctx = AppContext::with_config(ctx.cli(), config);
    let (material, handle) = create_key(&ctx, args.force)?;

    let config = ctx.config()?;
    write_config(&config_path, config)?;
    tracing::info!(path = %config_path.display(), "wrote config");

    std::fs::create_dir_all(config.list_dir()).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create list directory {}: {}",
            config.list_dir().display(),
            e
        )
    })?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let config_display = config_path.display().to_string();
        let key_display = handle.describe();
        let fingerprint = material.fingerprint();
        print(
            &ui_ctx,
            &receipt(
                &ui_ctx,
                "Initialized IdeaVault",
                &[
                    ("Config", config_display.as_str()),
                    ("Key file", key_display.as_str()),
                    ("Fingerprint", fingerprint.as_str()),
                ],
            ),
        );
        if ui_ctx.mode.is_pretty() {
            print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Warn,
                    "Back up your key file. Lists cannot be opened without it.",
                ),
            );
            print(&ui_ctx, &hint(&ui_ctx, "ideavault list new \"My ideas\""));
        }
    }
    Ok(())
}
