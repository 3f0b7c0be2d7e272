//! Pipeline composition
//!
//! Expands a pipeline into its markdown artifact. Sections follow the
//! settings order; within a section, components keep their stored order.
//! Composition is all-or-nothing: one unresolved reference fails it.

use std::collections::HashMap;

use super::fragment::Fragment;
use super::kind::FragmentKind;
use super::pipeline::{ComponentRef, Pipeline};
use super::settings::Settings;
use crate::error::{LibraryError, Result};

/// Anything that can resolve a component reference to its fragment
pub trait FragmentSource {
    /// Returns the referenced fragment, whether active or archived.
    /// `Ok(None)` means the reference dangles.
    fn resolve(&self, component: &ComponentRef) -> Result<Option<Fragment>>;
}

/// Composes `pipeline` under `settings`, resolving fragments from `source`
pub fn compose<S: FragmentSource + ?Sized>(
    pipeline: &Pipeline,
    settings: &Settings,
    source: &S,
) -> Result<String> {
    let mut grouped: HashMap<FragmentKind, Vec<&ComponentRef>> = HashMap::new();
    for component in &pipeline.components {
        grouped.entry(component.kind).or_default().push(component);
    }

    let mut out = String::new();

    for section in settings.effective_sections() {
        let Some(components) = grouped.get(&section.kind) else {
            continue;
        };
        if components.is_empty() {
            continue;
        }

        if settings.formatting.show_headings && !section.heading.trim().is_empty() {
            out.push_str(section.heading.trim_end());
            out.push_str("\n\n");
        }

        for component in components {
            let fragment = source
                .resolve(component)?
                .ok_or_else(|| LibraryError::UnresolvedRef {
                    pipeline: pipeline.name.clone(),
                    reference: component.path.clone(),
                })?;

            out.push_str(fragment.body.trim_start_matches(['\r', '\n']).trim_end());
            out.push_str("\n\n");
        }
    }

    Ok(finish(&out))
}

/// Normalizes line endings and leaves exactly one trailing newline
fn finish(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = normalized.trim_end().to_string();
    out.push('\n');
    out
}
