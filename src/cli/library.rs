//! Read-only library commands (list, show, search, tags, usage, settings)

use std::path::Path;

use anyhow::{Context, Result};

use super::output::{tokens, Output};
use crate::domain::{estimate_tokens, Filter, Fragment, Pipeline, TokenBucket};
use crate::index::SearchResults;
use crate::service::{LibraryEvent, LibraryService, TaskCompletion};
use crate::storage::Project;

/// Opens the project and its library service
pub(super) fn open(output: &Output, root: Option<&Path>) -> Result<(Project, LibraryService)> {
    let project = Project::discover(root)?;
    output.verbose_ctx(
        "library",
        &format!("Opened project at: {}", project.root().display()),
    );

    let service = LibraryService::open(&project).context("Failed to open library")?;
    Ok((project, service))
}

/// Opens the library and reports anything the load skipped (verbose only)
pub(super) fn open_loaded(output: &Output, root: Option<&Path>) -> Result<LibraryService> {
    let (_, mut service) = open(output, root)?;
    let report = service.load()?;

    for issue in &report.skipped {
        output.verbose_ctx("load", &format!("Skipped {}: {}", issue.location, issue.message));
    }
    for dangling in &report.unresolved {
        output.verbose_ctx(
            "load",
            &format!("{} references missing {}", dangling.pipeline, dangling.reference),
        );
    }

    Ok(service)
}

pub fn list(output: &Output, root: Option<&Path>, query: &str) -> Result<()> {
    let mut service = open_loaded(output, root)?;
    let filter = Filter::parse(query);
    output.verbose_ctx("list", &format!("Filter: {:?}", filter));

    let results = service.list_library(&filter)?;
    print_results(output, &results, query)
}

pub fn search(output: &Output, root: Option<&Path>, query: &str) -> Result<()> {
    let mut service = open_loaded(output, root)?;
    let results = service.list_library(&Filter::parse(query))?;
    output.verbose_ctx("search", &format!("Found {} results", results.len()));

    print_results(output, &results, query)
}

fn print_results(output: &Output, results: &SearchResults, query: &str) -> Result<()> {
    if output.is_json() {
        output.data(results);
        return Ok(());
    }

    if results.is_empty() {
        if query.trim().is_empty() {
            println!("Library is empty.");
        } else {
            println!("No results found for '{}'", query);
        }
        return Ok(());
    }

    if !results.pipelines.is_empty() {
        println!("Pipelines ({}):", results.pipelines.len());
        println!("{:<40} {:<6} NAME", "PATH", "ITEMS");
        println!("{}", "-".repeat(70));
        for pipeline in &results.pipelines {
            println!(
                "{:<40} {:<6} {}{}",
                pipeline.location(),
                pipeline.components.len(),
                pipeline.name,
                tag_suffix(&pipeline.tags)
            );
        }
    }

    if !results.fragments.is_empty() {
        if !results.pipelines.is_empty() {
            println!();
        }
        println!("Components ({}):", results.fragments.len());
        println!("{:<8} {:<40} {:<16} {:<5} NAME", "TYPE", "PATH", "TOKENS", "USED");
        println!("{}", "-".repeat(90));
        for fragment in &results.fragments {
            println!(
                "{:<8} {:<40} {:<16} {:<5} {}{}",
                fragment.kind,
                fragment.location(),
                tokens(fragment.token_count),
                fragment.usage_count,
                fragment.display_name,
                tag_suffix(&fragment.tags)
            );
        }
    }

    Ok(())
}

fn tag_suffix(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", tags.join(", "))
    }
}

pub fn show(output: &Output, root: Option<&Path>, path: &str) -> Result<()> {
    let mut service = open_loaded(output, root)?;
    let found = service.resolve_item(path)?;

    if found.item.is_pipeline() {
        let pipeline = service.pipeline(path)?;
        show_pipeline(output, &mut service, &pipeline)
    } else {
        let fragment = service.fragment(path)?;
        show_fragment(output, &mut service, &fragment)
    }
}

fn show_fragment(output: &Output, service: &mut LibraryService, fragment: &Fragment) -> Result<()> {
    let used_by = service.pipelines_using(&fragment.location())?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "fragment": fragment,
            "token_bucket": TokenBucket::for_count(fragment.token_count),
            "used_by": used_by,
        }));
        return Ok(());
    }

    println!("{} ({})", fragment.display_name, fragment.kind);
    println!("Path:   {}", fragment.location());
    if !fragment.tags.is_empty() {
        println!("Tags:   {}", fragment.tags.join(", "));
    }
    println!("Tokens: {}", tokens(fragment.token_count));
    if let Some(modified) = fragment.last_modified {
        println!("Modified: {}", modified.format("%Y-%m-%d %H:%M"));
    }
    if used_by.is_empty() {
        println!("Used by: (no pipelines)");
    } else {
        println!("Used by:");
        for summary in &used_by {
            let marker = if summary.is_archived { " (archived)" } else { "" };
            println!("  - {}{}", summary.name, marker);
        }
    }

    println!();
    println!("{}", fragment.body.trim_end());
    Ok(())
}

fn show_pipeline(output: &Output, service: &mut LibraryService, pipeline: &Pipeline) -> Result<()> {
    let dangling: Vec<String> = service
        .load()?
        .unresolved_in(&pipeline.path)
        .map(|d| d.reference.clone())
        .collect();
    let composed = service.compose(&pipeline.location()).ok();
    let token_count = composed.as_deref().map(estimate_tokens);

    if output.is_json() {
        output.data(&serde_json::json!({
            "pipeline": pipeline,
            "tokens": token_count,
            "unresolved": dangling,
        }));
        return Ok(());
    }

    println!("{}", pipeline.name);
    println!("Path: {}", pipeline.location());
    if !pipeline.tags.is_empty() {
        println!("Tags: {}", pipeline.tags.join(", "));
    }
    if let Some(out) = &pipeline.output_path {
        println!("Output: {}", out);
    }
    match token_count {
        Some(count) => println!("Tokens: {}", tokens(count)),
        None => println!("Tokens: (cannot compose)"),
    }

    println!();
    if pipeline.components.is_empty() {
        println!("No components.");
    } else {
        println!("{:<4} {:<8} PATH", "#", "TYPE");
        for component in &pipeline.components {
            let marker = if dangling.contains(&component.path) {
                "  (missing)"
            } else {
                ""
            };
            println!(
                "{:<4} {:<8} {}{}",
                component.order, component.kind, component.path, marker
            );
        }
    }

    Ok(())
}

pub fn tags(output: &Output, root: Option<&Path>) -> Result<()> {
    let mut service = open_loaded(output, root)?;
    let counts = service.tag_counts()?;

    if output.is_json() {
        let items: Vec<_> = counts
            .iter()
            .map(|(tag, count)| serde_json::json!({ "tag": tag, "count": count }))
            .collect();
        output.data(&items);
    } else if counts.is_empty() {
        println!("No tags in use.");
    } else {
        println!("{:<30} ITEMS", "TAG");
        println!("{}", "-".repeat(40));
        for (tag, count) in counts {
            println!("{:<30} {}", tag, count);
        }
    }

    Ok(())
}

pub fn usage(output: &Output, root: Option<&Path>, fragment: &str) -> Result<()> {
    let mut service = open_loaded(output, root)?;
    let fragment = service.fragment(fragment)?;
    let used_by = service.pipelines_using(&fragment.location())?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "fragment": fragment.location(),
            "count": used_by.len(),
            "pipelines": used_by,
        }));
    } else if used_by.is_empty() {
        println!("{} is not used by any pipeline.", fragment.location());
    } else {
        println!("{} is used by {} pipeline(s):", fragment.location(), used_by.len());
        for summary in &used_by {
            let marker = if summary.is_archived { " (archived)" } else { "" };
            println!("  {:<40} {}{}", summary.path, summary.name, marker);
        }
    }

    Ok(())
}

pub fn settings(output: &Output, root: Option<&Path>) -> Result<()> {
    let (project, service) = open(output, root)?;
    let settings = service.settings();

    if output.is_json() {
        output.data(settings);
        return Ok(());
    }

    println!("Settings ({})", project.library_dir().join("settings.yaml").display());
    println!("  default_filename: {}", settings.default_filename);
    println!("  export_path:      {}", settings.export_path);
    println!("  output_path:      {}", settings.output_path);
    println!("  show_headings:    {}", settings.formatting.show_headings);
    println!("  sections:");
    for section in settings.effective_sections() {
        println!("    {:<8} {}", section.kind, section.heading);
    }

    Ok(())
}

/// Runs queued follow-up tasks and reports their outcome
pub(super) fn drain(output: &Output, service: &mut LibraryService) {
    let queued = service.pending_tasks();
    if queued > 0 {
        output.verbose_ctx("tasks", &format!("Running {} queued tasks", queued));
    }
    for completion in service.run_pending() {
        match completion {
            TaskCompletion::Done(LibraryEvent::TagsCleaned(removed)) if !removed.is_empty() => {
                output.verbose_ctx("tags", &format!("Removed unused tags: {}", removed.join(", ")));
            }
            TaskCompletion::Done(LibraryEvent::TagsCleaned(_)) => {}
            TaskCompletion::Done(LibraryEvent::Composed {
                pipeline,
                output: path,
                tokens: count,
            }) => {
                output.verbose_ctx(
                    "compose",
                    &format!("Composed {} to {} ({} tokens)", pipeline, path.display(), count),
                );
            }
            TaskCompletion::Failed(e) => output.warn(&format!("Background task failed: {}", e)),
        }
    }
}
