use std::path::Path;

use ideavault_core::fs::write_atomic;
use ideavault_core::keystore::{
    export_key_material, FsKeyFileHandle, HandleRepository, KeyFileHandle,
};
use ideavault_core::KeyMaterial;

use crate::app::AppContext;
use crate::cli::KeyCommands;
use crate::errors::CliError;
use crate::ui::{badge, print, receipt, Badge};

pub fn handle_key(ctx: &AppContext, command: &KeyCommands) -> anyhow::Result<()> {
    match command {
        KeyCommands::New { force } => handle_new(ctx, *force),
        KeyCommands::Show => handle_show(ctx),
        KeyCommands::Fingerprint => handle_fingerprint(ctx),
        KeyCommands::Forget => handle_forget(ctx),
    }
}

fn handle_new(ctx: &AppContext, force: bool) -> anyhow::Result<()> {
    let (material, handle) = create_key(ctx, force)?;
    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let path = handle.describe();
        let fingerprint = material.fingerprint();
        print(
            &ui_ctx,
            &receipt(
                &ui_ctx,
                "Created key file",
                &[("Key file", path.as_str()), ("Fingerprint", fingerprint.as_str())],
            ),
        );
        if ui_ctx.mode.is_pretty() {
            print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Warn,
                    "Back this file up. Lists written with it cannot be opened without it.",
                ),
            );
        }
    }
    Ok(())
}

/// Generate a key, save it, and remember it as the active key.
///
/// With `--key-file` the key is written to that path; otherwise the user
/// picks a location (or it lands in the key directory without a terminal).
pub fn create_key(ctx: &AppContext, force: bool) -> anyhow::Result<(KeyMaterial, FsKeyFileHandle)> {
    let material = KeyMaterial::generate()?;

    let handle = match ctx.key_file_override() {
        Some(path) => write_key_file(&path, &material, force)?,
        None => {
            let mut access = ctx.terminal_access()?;
            export_key_material(&mut access, &material)?
        }
    };

    let mut repository = ctx.handle_repository()?;
    repository.store(&ctx.config()?.keys.handle_name, &handle)?;
    tracing::info!(file = %handle.describe(), fingerprint = %material.fingerprint(), "created key");
    Ok((material, handle))
}

fn write_key_file(path: &Path, material: &KeyMaterial, force: bool) -> anyhow::Result<FsKeyFileHandle> {
    if path.exists() && !force {
        return Err(CliError::invalid_input_with_hint(
            format!("Key file already exists: {}", path.display()),
            "Use --force to overwrite it. Lists written with the old key will no longer open.",
        )
        .into());
    }
    let contents = zeroize::Zeroizing::new(material.to_json_bytes()?);
    write_atomic(path, &contents, true)?;
    Ok(FsKeyFileHandle::approved(path, &contents))
}

fn handle_show(ctx: &AppContext) -> anyhow::Result<()> {
    let loaded = ctx.load_key()?;
    let ui_ctx = ctx.ui_context(false);
    let path = loaded.handle.describe();
    let fingerprint = loaded.material.fingerprint();
    let version = loaded.material.version().to_string();
    let source = if ctx.key_file_override().is_some() {
        "--key-file"
    } else if loaded.freshly_created {
        "picked"
    } else {
        "remembered"
    };

    let items = [
        ("Key file", path.as_str()),
        ("Fingerprint", fingerprint.as_str()),
        ("Version", version.as_str()),
        ("Source", source),
    ];
    if ctx.quiet() {
        println!("{}", path);
    } else {
        print(&ui_ctx, &receipt(&ui_ctx, "Active key", &items));
    }
    Ok(())
}

fn handle_fingerprint(ctx: &AppContext) -> anyhow::Result<()> {
    let loaded = ctx.load_key()?;
    println!("{}", loaded.material.fingerprint());
    Ok(())
}

fn handle_forget(ctx: &AppContext) -> anyhow::Result<()> {
    let mut resolver = ctx.resolver()?;
    let existed = resolver.forget()?;
    let name = resolver.name().to_string();

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        if existed {
            print(
                &ui_ctx,
                &receipt(&ui_ctx, "Forgot key file", &[("Handle", name.as_str())]),
            );
        } else {
            print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Info, "No key file was remembered"),
            );
        }
    }
    Ok(())
}
