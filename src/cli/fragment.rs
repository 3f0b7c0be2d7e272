//! Item lifecycle commands (new, update, rename, clone, archive, delete, edit)

use std::io::Read;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use super::library::{drain, open};
use super::output::Output;
use crate::domain::FragmentKind;

/// Resolves a `--body` value; `-` reads stdin
fn read_body(body: Option<String>) -> Result<Option<String>> {
    match body.as_deref() {
        Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read body from stdin")?;
            Ok(Some(text))
        }
        _ => Ok(body),
    }
}

pub fn create(
    output: &Output,
    root: Option<&Path>,
    kind: FragmentKind,
    name: &str,
    tags: Vec<String>,
    body: Option<String>,
) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let body = read_body(body)?.unwrap_or_default();

    let path = service.create_fragment(kind, name, &body, tags)?;
    output.verbose_ctx("new", &format!("Wrote {}", path));

    if output.is_json() {
        output.data(&serde_json::json!({
            "path": path,
            "kind": kind,
            "name": name.trim(),
        }));
    } else {
        output.success(&format!("Created {}: {}", kind, path));
    }

    Ok(())
}

pub fn update(
    output: &Output,
    root: Option<&Path>,
    path: &str,
    body: Option<String>,
    tags: Option<Vec<String>>,
    name: Option<String>,
) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let body = read_body(body)?;

    if body.is_none() && tags.is_none() && name.is_none() {
        anyhow::bail!("Nothing to update. Pass --body, --tag, --clear-tags or --name.");
    }

    service.update_fragment(path, body, tags, name)?;
    drain(output, &mut service);

    let fragment = service.fragment(path)?;
    if output.is_json() {
        output.data(&fragment);
    } else {
        output.success(&format!("Updated {}", fragment.location()));
    }

    Ok(())
}

pub fn rename(output: &Output, root: Option<&Path>, path: &str, name: &str) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let from = service.resolve_item(path)?.location();

    let to = service.rename(path, name)?;
    report_move(output, "Renamed", &from, &to);
    Ok(())
}

pub fn clone(
    output: &Output,
    root: Option<&Path>,
    path: &str,
    name: &str,
    to_archive: bool,
) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let from = service.resolve_item(path)?.location();

    let to = service.clone_item(path, name, to_archive)?;
    report_move(output, "Cloned", &from, &to);
    Ok(())
}

pub fn archive(output: &Output, root: Option<&Path>, path: &str) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let from = service.resolve_item(path)?.location();

    let to = service.archive(path)?;
    drain(output, &mut service);
    report_move(output, "Archived", &from, &to);
    Ok(())
}

pub fn unarchive(output: &Output, root: Option<&Path>, path: &str) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let from = service.resolve_item(path)?.location();

    let to = service.unarchive(path)?;
    report_move(output, "Restored", &from, &to);
    Ok(())
}

pub fn delete(output: &Output, root: Option<&Path>, path: &str) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let found = service.resolve_item(path)?;

    // Report users before the fragment disappears from the usage index
    let users = if found.item.is_pipeline() {
        Vec::new()
    } else {
        service.pipelines_using(path)?
    };

    let deleted = service.delete(path)?;
    drain(output, &mut service);

    if output.is_json() {
        output.data(&serde_json::json!({
            "deleted": deleted,
            "dangling_in": users,
        }));
        return Ok(());
    }

    output.success(&format!("Deleted {}", deleted));
    for user in &users {
        output.warn(&format!("{} still references {}", user.path, deleted));
    }
    Ok(())
}

fn report_move(output: &Output, verb: &str, from: &str, to: &str) {
    if output.is_json() {
        output.data(&serde_json::json!({ "from": from, "to": to }));
    } else {
        output.success(&format!("{} {} -> {}", verb, from, to));
    }
}

/// Opens an item in the external editor, then re-reads it so that broken
/// frontmatter or YAML is reported right away
pub fn edit(output: &Output, root: Option<&Path>, path: &str) -> Result<()> {
    let (project, service) = open(output, root)?;
    let found = service.resolve_item(path)?;

    let editor = project.config().editor_command()?;
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("Editor command is empty"))?;

    output.verbose_ctx("edit", &format!("Running {} {}", editor, found.file.display()));
    let status = Command::new(program)
        .args(parts)
        .arg(&found.file)
        .status()
        .with_context(|| format!("Failed to start editor '{}'", editor))?;

    if !status.success() {
        anyhow::bail!("Editor exited with {}", status);
    }

    let location = found.location();
    if found.item.is_pipeline() {
        service
            .pipeline(&location)
            .with_context(|| format!("{} is no longer valid", location))?;
    } else {
        let store = service.store();
        store
            .read_fragment(&found.item)
            .with_context(|| format!("{} is no longer valid", location))?;
    }

    output.success(&format!("Saved {}", location));
    Ok(())
}
