//! Pipeline editing commands

use std::path::Path;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};

use super::library::open;
use super::output::Output;
use crate::domain::{PipelineEditor, Toggle};
use crate::service::LibraryService;

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create a pipeline from fragments
    ///
    /// Examples:
    ///   pluqqy pipeline new "Code Review" team review-steps style
    ///   pluqqy pipeline new Daily --tag ops --output out/daily.md
    New {
        /// Pipeline name
        name: String,

        /// Fragments to include, grouped by kind automatically
        components: Vec<String>,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Where `set` writes this pipeline
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Add a fragment, or remove it if already present
    Toggle {
        /// Pipeline path or name
        pipeline: String,

        /// Fragment path or name
        fragment: String,
    },

    /// Remove the component at a position (1-based)
    Remove {
        /// Pipeline path or name
        pipeline: String,

        /// Component position as shown by `show`
        index: usize,
    },

    /// Move a component within its kind group
    Move {
        /// Pipeline path or name
        pipeline: String,

        /// Component position as shown by `show`
        index: usize,

        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

pub fn run(cmd: PipelineCommands, output: &Output, root: Option<&Path>) -> Result<()> {
    let (_, mut service) = open(output, root)?;

    match cmd {
        PipelineCommands::New {
            name,
            components,
            tags,
            output: output_path,
        } => new_pipeline(output, &mut service, &name, &components, tags, output_path),
        PipelineCommands::Toggle { pipeline, fragment } => {
            toggle(output, &mut service, &pipeline, &fragment)
        }
        PipelineCommands::Remove { pipeline, index } => {
            remove(output, &mut service, &pipeline, index)
        }
        PipelineCommands::Move {
            pipeline,
            index,
            direction,
        } => move_component(output, &mut service, &pipeline, index, direction),
    }
}

fn new_pipeline(
    output: &Output,
    service: &mut LibraryService,
    name: &str,
    components: &[String],
    tags: Vec<String>,
    output_path: Option<String>,
) -> Result<()> {
    let mut editor = PipelineEditor::new(name.trim(), service.settings());

    for component in components {
        let fragment = service.fragment(component)?;
        if editor.add(&fragment) == Toggle::Removed {
            anyhow::bail!("{} is listed more than once", fragment.location());
        }
    }
    editor.set_tags(tags);
    editor.set_output_path(output_path);

    let path = service.save_pipeline(&mut editor)?;
    report_saved(output, &editor, &path, "Created");
    Ok(())
}

fn toggle(output: &Output, service: &mut LibraryService, pipeline: &str, fragment: &str) -> Result<()> {
    let mut editor = service.edit_pipeline(pipeline)?;
    let fragment = service.fragment(fragment)?;
    let key = fragment.item_path().key();

    let outcome = editor.add(&fragment);
    output.verbose_ctx(
        "toggle",
        &format!(
            "Usage of {}: {} -> {}",
            fragment.location(),
            fragment.usage_count,
            editor.provisional_count(&key, fragment.usage_count)
        ),
    );

    let path = service.save_pipeline(&mut editor)?;
    let verb = match outcome {
        Toggle::Added => "Added",
        Toggle::Removed => "Removed",
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "pipeline": path,
            "fragment": fragment.location(),
            "action": verb.to_lowercase(),
            "components": editor.components(),
        }));
    } else {
        output.success(&format!("{} {} in {}", verb, fragment.location(), path));
    }
    Ok(())
}

fn remove(output: &Output, service: &mut LibraryService, pipeline: &str, index: usize) -> Result<()> {
    let (mut editor, position) = locate(service, pipeline, index)?;
    let removed = editor.components()[position].path.clone();

    let cursor = editor.remove(position);
    let path = service.save_pipeline(&mut editor)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "pipeline": path,
            "removed": removed,
            "cursor": cursor.map(|c| c + 1),
        }));
    } else {
        output.success(&format!("Removed {} from {}", removed, path));
    }
    Ok(())
}

fn move_component(
    output: &Output,
    service: &mut LibraryService,
    pipeline: &str,
    index: usize,
    direction: Direction,
) -> Result<()> {
    let (mut editor, position) = locate(service, pipeline, index)?;

    let moved = match direction {
        Direction::Up => editor.move_up(position),
        Direction::Down => editor.move_down(position),
    };

    if !moved && !editor.is_dirty() {
        output.success(&format!(
            "Component {} cannot move {:?} within its kind group; unchanged",
            index, direction
        ));
        return Ok(());
    }

    let path = service.save_pipeline(&mut editor)?;
    report_saved(output, &editor, &path, "Updated");
    Ok(())
}

/// Opens an editor and maps a 1-based position in the stored order (as
/// printed by `show`) to the editor's position of the same component.
///
/// The editor regroups by section on load, so the two orders differ for
/// pipelines written out of section order.
fn locate(service: &LibraryService, pipeline: &str, index: usize) -> Result<(PipelineEditor, usize)> {
    let stored = service.pipeline(pipeline)?;
    let len = stored.components.len();
    if index == 0 || index > len {
        anyhow::bail!("Position {} is out of range (pipeline has {} components)", index, len);
    }
    let target = &stored.components[index - 1].path;

    let editor = service.edit_pipeline(pipeline)?;
    let position = editor
        .components()
        .iter()
        .position(|c| &c.path == target)
        .ok_or_else(|| anyhow::anyhow!("{} is not editable in {}", target, stored.location()))?;
    Ok((editor, position))
}

fn report_saved(output: &Output, editor: &PipelineEditor, path: &str, verb: &str) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "pipeline": path,
            "name": editor.draft().name,
            "components": editor.components(),
        }));
    } else {
        output.success(&format!("{} {}", verb, path));
        for component in editor.components() {
            println!("  {:<3} {:<8} {}", component.order, component.kind, component.path);
        }
    }
}
