//! Fragment usage across pipelines
//!
//! Built in one pass over every pipeline, active and archived. A pipeline
//! counts once per fragment it references; references to fragments that
//! do not exist are not counted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::Pipeline;

/// Pipeline identity shown next to a usage count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub path: String,
    pub name: String,
    pub is_archived: bool,
}

impl From<&Pipeline> for PipelineSummary {
    fn from(pipeline: &Pipeline) -> Self {
        Self {
            path: pipeline.path.clone(),
            name: pipeline.name.clone(),
            is_archived: pipeline.is_archived,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    /// Fragment key -> pipelines referencing it, sorted by name
    users: HashMap<String, Vec<PipelineSummary>>,
}

impl UsageIndex {
    /// Builds the index. `fragments` holds the keys of fragments that exist.
    pub fn build<'a>(
        pipelines: impl IntoIterator<Item = &'a Pipeline>,
        fragments: &HashSet<String>,
    ) -> Self {
        let mut users: HashMap<String, Vec<PipelineSummary>> = HashMap::new();

        for pipeline in pipelines {
            let mut seen = HashSet::new();
            for component in &pipeline.components {
                let key = component.key();
                if fragments.contains(&key) && seen.insert(key.clone()) {
                    users.entry(key).or_default().push(pipeline.into());
                }
            }
        }

        for list in users.values_mut() {
            list.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.path.cmp(&b.path))
            });
        }

        Self { users }
    }

    /// Number of pipelines referencing the fragment with this key
    pub fn count(&self, key: &str) -> usize {
        self.users.get(key).map_or(0, Vec::len)
    }

    pub fn pipelines_using(&self, key: &str) -> &[PipelineSummary] {
        self.users.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
