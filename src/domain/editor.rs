//! In-memory pipeline editing
//!
//! [`PipelineEditor`] holds a draft pipeline next to the component list it
//! was loaded or last saved with. Every mutation keeps the draft grouped by
//! kind in section order and renumbers `order` densely.

use std::collections::{BTreeSet, HashMap};

use super::fragment::Fragment;
use super::kind::FragmentKind;
use super::path::ItemPath;
use super::pipeline::{ComponentRef, Pipeline};
use super::settings::Settings;
use super::slug::sanitize_slug;

/// Outcome of [`PipelineEditor::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Debug, Clone)]
pub struct PipelineEditor {
    draft: Pipeline,

    /// (key, order) pairs of the committed components
    committed: Vec<(String, u32)>,

    /// Pipeline being edited; `None` until first saved
    original: Option<ItemPath>,

    /// Name as loaded or last saved
    committed_name: String,

    kind_order: Vec<FragmentKind>,
}

impl PipelineEditor {
    /// Starts a draft for a new pipeline
    pub fn new(name: impl Into<String>, settings: &Settings) -> Self {
        let name = name.into();
        Self {
            draft: Pipeline::new(sanitize_slug(&name), name.clone()),
            committed: Vec::new(),
            original: None,
            committed_name: name,
            kind_order: settings.kind_order(),
        }
    }

    /// Starts editing an existing pipeline
    pub fn load(pipeline: Pipeline, settings: &Settings) -> Self {
        let committed = snapshot(&pipeline.components);
        let original = Some(pipeline.item_path());
        let committed_name = pipeline.name.clone();
        let mut editor = Self {
            draft: pipeline,
            committed,
            original,
            committed_name,
            kind_order: settings.kind_order(),
        };
        editor.reorganize();
        editor
    }

    pub fn draft(&self) -> &Pipeline {
        &self.draft
    }

    pub fn components(&self) -> &[ComponentRef] {
        &self.draft.components
    }

    /// The stored pipeline this draft replaces, if any
    pub fn original(&self) -> Option<&ItemPath> {
        self.original.as_ref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    /// True when the name differs from the loaded or last saved one
    pub fn is_renamed(&self) -> bool {
        self.draft.name != self.committed_name
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.draft.set_tags(tags);
    }

    pub fn set_output_path(&mut self, output_path: Option<String>) {
        self.draft.output_path = output_path.filter(|p| !p.trim().is_empty());
    }

    /// Index of the component referencing `item`
    pub fn position(&self, item: &ItemPath) -> Option<usize> {
        let key = item.key();
        self.draft.components.iter().position(|c| c.key() == key)
    }

    /// Adds `fragment` to the end of its kind group, or removes it when it
    /// is already part of the draft.
    pub fn add(&mut self, fragment: &Fragment) -> Toggle {
        let item = fragment.item_path();
        if let Some(index) = self.position(&item) {
            self.draft.components.remove(index);
            self.reorganize();
            return Toggle::Removed;
        }

        self.draft.components.extend(ComponentRef::new(&item));
        self.reorganize();
        Toggle::Added
    }

    /// Removes the component at `index` and returns where the cursor
    /// should land: the same index, clamped to the new end, or `None` once
    /// the draft is empty. Out-of-range indices change nothing.
    pub fn remove(&mut self, index: usize) -> Option<usize> {
        if index < self.draft.components.len() {
            self.draft.components.remove(index);
            self.reorganize();
        }

        let len = self.draft.components.len();
        if len == 0 {
            None
        } else {
            Some(index.min(len - 1))
        }
    }

    /// Swaps with the previous component when both share a kind
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.draft.components.len() {
            return false;
        }
        self.swap_within_kind(index - 1, index)
    }

    /// Swaps with the next component when both share a kind
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.draft.components.len() {
            return false;
        }
        self.swap_within_kind(index, index + 1)
    }

    fn swap_within_kind(&mut self, a: usize, b: usize) -> bool {
        let components = &mut self.draft.components;
        if components[a].kind != components[b].kind {
            return false;
        }
        components.swap(a, b);
        self.draft.renumber();
        true
    }

    /// Regroups components by section order, keeping the user's order
    /// within each kind, and renumbers.
    pub fn reorganize(&mut self) {
        let order = &self.kind_order;
        self.draft.components.sort_by_key(|c| {
            order
                .iter()
                .position(|k| *k == c.kind)
                .unwrap_or(usize::MAX)
        });
        self.draft.renumber();
    }

    /// True when the components differ from the committed list in path or
    /// order.
    pub fn is_dirty(&self) -> bool {
        snapshot(&self.draft.components) != self.committed
    }

    /// Records that the draft was written to `path`
    pub fn mark_saved(&mut self, path: ItemPath) {
        self.draft.slug = path.slug().to_string();
        self.draft.path = path.logical();
        self.committed = snapshot(&self.draft.components);
        self.committed_name = self.draft.name.clone();
        self.original = Some(path);
    }

    /// Per-fragment change in usage if the draft were saved now
    pub fn usage_delta(&self) -> HashMap<String, i64> {
        let before: BTreeSet<&str> = self.committed.iter().map(|(k, _)| k.as_str()).collect();
        let after_keys: Vec<String> = self.draft.components.iter().map(|c| c.key()).collect();
        let after: BTreeSet<&str> = after_keys.iter().map(String::as_str).collect();

        let mut delta = HashMap::new();
        for key in after.difference(&before) {
            delta.insert((*key).to_string(), 1);
        }
        for key in before.difference(&after) {
            delta.insert((*key).to_string(), -1);
        }
        delta
    }

    /// Usage count to display for `key` while this draft is open
    pub fn provisional_count(&self, key: &str, committed: usize) -> usize {
        let delta = self.usage_delta().get(key).copied().unwrap_or(0);
        (committed as i64 + delta).max(0) as usize
    }
}

fn snapshot(components: &[ComponentRef]) -> Vec<(String, u32)> {
    components.iter().map(|c| (c.key(), c.order)).collect()
}
