//! Composition commands (compose, set)

use std::path::Path;

use anyhow::Result;

use super::library::open;
use super::output::{tokens, Output};
use crate::domain::estimate_tokens;
use crate::service::{LibraryEvent, TaskCompletion};

/// Composes a pipeline to stdout, or to a file with `--out`
pub fn compose(output: &Output, root: Option<&Path>, pipeline: &str, out: Option<&str>) -> Result<()> {
    let (_, service) = open(output, root)?;
    let artifact = service.compose(pipeline)?;
    let count = estimate_tokens(&artifact);
    output.verbose_ctx("compose", &format!("Composed {} tokens", count));

    let Some(out) = out else {
        if output.is_json() {
            output.data(&serde_json::json!({
                "pipeline": pipeline,
                "tokens": count,
                "content": artifact,
            }));
        } else {
            print!("{}", artifact);
        }
        return Ok(());
    };

    let target = if out.trim().is_empty() {
        let slug = service.resolve_item(pipeline)?.item.slug().to_string();
        format!(
            "{}/{}.md",
            service.settings().output_path.trim_end_matches('/'),
            slug
        )
    } else {
        out.to_string()
    };

    let written = service.write_composed(&artifact, &target)?;
    if output.is_json() {
        output.data(&serde_json::json!({
            "pipeline": pipeline,
            "tokens": count,
            "output": written,
        }));
    } else {
        output.success(&format!("Wrote {} ({})", written.display(), tokens(count)));
    }

    Ok(())
}

/// Composes a pipeline and writes it to its output path (or the default
/// artifact location)
pub fn set(output: &Output, root: Option<&Path>, pipeline: &str) -> Result<()> {
    let (_, mut service) = open(output, root)?;
    let handle = service.schedule_compose(pipeline)?;
    output.verbose_ctx("set", &format!("Queued compose task {}", handle.id()));

    for completion in service.run_pending() {
        match completion {
            TaskCompletion::Done(LibraryEvent::Composed {
                pipeline: name,
                output: path,
                tokens: count,
            }) => {
                if output.is_json() {
                    output.data(&serde_json::json!({
                        "pipeline": name,
                        "output": path,
                        "tokens": count,
                    }));
                } else {
                    output.success(&format!(
                        "Set {} -> {} ({})",
                        name,
                        path.display(),
                        tokens(count)
                    ));
                }
            }
            TaskCompletion::Done(LibraryEvent::TagsCleaned(_)) => {}
            TaskCompletion::Failed(e) => return Err(e.into()),
        }
    }

    Ok(())
}
