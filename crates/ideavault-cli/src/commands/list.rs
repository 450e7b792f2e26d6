use std::path::{Path, PathBuf};

use anyhow::Context;

use ideavault_core::document::{read_list_file, write_list_file};
use ideavault_core::{KeyMaterial, ListDocument, VaultError};

use crate::app::{missing_list_message, AppContext};
use crate::cli::{
    ListAddArgs, ListCommands, ListNameArgs, ListRemoveArgs, ListRenameArgs, ListShowArgs,
};
use crate::errors::CliError;
use crate::ui::{hint, print, receipt, simple_table, Column, OutputMode};

pub fn handle_list(ctx: &AppContext, command: &ListCommands) -> anyhow::Result<()> {
    match command {
        ListCommands::New(args) => handle_new(ctx, args),
        ListCommands::Show(args) => handle_show(ctx, args),
        ListCommands::Add(args) => handle_add(ctx, args),
        ListCommands::Remove(args) => handle_remove(ctx, args),
        ListCommands::Rename(args) => handle_rename(ctx, args),
    }
}

fn handle_new(ctx: &AppContext, args: &ListNameArgs) -> anyhow::Result<()> {
    let name = validate_name(&args.name)?;
    let path = ctx.list_path(name)?;
    if path.exists() {
        return Err(CliError::invalid_input_with_hint(
            format!("A list named \"{}\" already exists", name),
            &format!("ideavault list show \"{}\"", name),
        )
        .into());
    }

    let key = ctx.load_key()?;
    let doc = ListDocument::new(name);
    write_list_file(&path, &key.material, &doc)?;
    tracing::info!(list = name, path = %path.display(), "created list");

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let path_display = path.display().to_string();
        print(
            &ui_ctx,
            &receipt(
                &ui_ctx,
                "Created list",
                &[("Name", name), ("Path", path_display.as_str())],
            ),
        );
        if ui_ctx.mode.is_pretty() {
            print(&ui_ctx, &hint(&ui_ctx, &format!("ideavault list add \"{}\" <IDEA>", name)));
        }
    }
    Ok(())
}

fn handle_show(ctx: &AppContext, args: &ListShowArgs) -> anyhow::Result<()> {
    let key = ctx.load_key()?;
    let (doc, _) = open_list(ctx, &key.material, &args.name)?;
    let ui_ctx = ctx.ui_context(args.json);

    match ui_ctx.mode {
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputMode::Pretty | OutputMode::Plain => {
            if ui_ctx.mode.is_pretty() && !ctx.quiet() {
                println!("{} ({} ideas)", doc.name, doc.len());
            }
            let rows: Vec<Vec<String>> = doc
                .ideas
                .iter()
                .enumerate()
                .map(|(index, idea)| vec![(index + 1).to_string(), idea.to_string()])
                .collect();
            if !rows.is_empty() {
                println!(
                    "{}",
                    simple_table(&ui_ctx, &[Column::new("#"), Column::new("IDEA")], &rows)
                );
            }
        }
    }
    Ok(())
}

fn handle_add(ctx: &AppContext, args: &ListAddArgs) -> anyhow::Result<()> {
    let key = ctx.load_key()?;
    let (mut doc, path) = open_list(ctx, &key.material, &args.name)?;

    for idea in &args.ideas {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(CliError::invalid_input("Ideas cannot be empty").into());
        }
        doc.push(idea);
    }
    write_list_file(&path, &key.material, &doc)?;
    tracing::debug!(list = %doc.name, added = args.ideas.len(), "added ideas");

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let added = args.ideas.len().to_string();
        let total = doc.len().to_string();
        print(
            &ui_ctx,
            &receipt(
                &ui_ctx,
                "Added ideas",
                &[
                    ("Name", doc.name.as_str()),
                    ("Added", added.as_str()),
                    ("Total", total.as_str()),
                ],
            ),
        );
    }
    Ok(())
}

fn handle_remove(ctx: &AppContext, args: &ListRemoveArgs) -> anyhow::Result<()> {
    let key = ctx.load_key()?;
    let (mut doc, path) = open_list(ctx, &key.material, &args.name)?;

    let removed = args
        .position
        .checked_sub(1)
        .and_then(|index| doc.remove(index))
        .ok_or_else(|| {
            CliError::invalid_input_with_hint(
                format!(
                    "Position {} is out of range (list has {} ideas)",
                    args.position,
                    doc.len()
                ),
                "Positions start at 1, as shown by `ideavault list show`.",
            )
        })?;
    write_list_file(&path, &key.material, &doc)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        print(
            &ui_ctx,
            &receipt(
                &ui_ctx,
                "Removed idea",
                &[("Name", doc.name.as_str()), ("Idea", removed.text())],
            ),
        );
    }
    Ok(())
}

fn handle_rename(ctx: &AppContext, args: &ListRenameArgs) -> anyhow::Result<()> {
    let new_name = validate_name(&args.new_name)?;
    let key = ctx.load_key()?;
    let (mut doc, old_path) = open_list(ctx, &key.material, &args.name)?;
    let new_path = ctx.list_path(new_name)?;

    if new_path != old_path && new_path.exists() {
        return Err(CliError::invalid_input(format!(
            "A list named \"{}\" already exists",
            new_name
        ))
        .into());
    }

    let old_name = std::mem::take(&mut doc.name);
    doc.rename(new_name);
    write_list_file(&new_path, &key.material, &doc)?;
    if new_path != old_path {
        std::fs::remove_file(&old_path)
            .with_context(|| format!("Failed to remove {}", old_path.display()))?;
    }
    tracing::info!(from = %old_name, to = new_name, "renamed list");

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                print(
                    &ui_ctx,
                    &receipt(
                        &ui_ctx,
                        &format!("Renamed list '{}' to '{}'", old_name, new_name),
                        &[],
                    ),
                );
            }
            OutputMode::Plain | OutputMode::Json => {
                println!("status=ok");
                println!("old_name={}", old_name);
                println!("new_name={}", new_name);
            }
        }
    }
    Ok(())
}

/// Read and decrypt a list by name, returning it with its path.
fn open_list(
    ctx: &AppContext,
    material: &KeyMaterial,
    name: &str,
) -> anyhow::Result<(ListDocument, PathBuf)> {
    let path = ctx.list_path(name)?;
    let doc = read_list(&path, material, name)?;
    Ok((doc, path))
}

fn read_list(path: &Path, material: &KeyMaterial, name: &str) -> anyhow::Result<ListDocument> {
    match read_list_file(path, material) {
        Ok(doc) => Ok(doc),
        Err(VaultError::NotFound(_)) => Err(CliError::not_found(
            missing_list_message(name, path),
            &format!("ideavault list new \"{}\"", name),
        )
        .into()),
        Err(err) => {
            Err(anyhow::Error::new(err).context(format!("Failed to open list \"{}\"", name)))
        }
    }
}

fn validate_name(name: &str) -> anyhow::Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CliError::invalid_input("List name cannot be empty").into());
    }
    Ok(trimmed)
}
