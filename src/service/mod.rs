//! # Library Service
//!
//! Façade over the store and the derived indices. Every operation runs to
//! completion before the next starts; follow-up work (tag cleanup, compose
//! and write) is queued on a [`Scheduler`] and delivered as
//! [`LibraryEvent`]s by [`LibraryService::run_pending`].
//!
//! The library snapshot is built lazily on the first read and dropped by
//! every mutation.

mod artifact;
mod tasks;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{
    canonical_key, compose, estimate_tokens, validate_name, Filter, Fragment, FragmentKind, ItemPath, Pipeline,
    PipelineEditor, Settings,
};
use crate::error::{LibraryError, Result};
use crate::index::{
    cleanup_orphans, register_tags, PipelineSummary, SearchIndex, SearchResults, TagIndex,
    UsageIndex,
};
use crate::storage::{LoadIssue, Located, Project, Store};

pub use artifact::{compose_to_file, destination, write_artifact};
pub use tasks::{LibraryEvent, Scheduler, TaskCompletion, TaskHandle};

/// A pipeline reference that points at no fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    pub pipeline: String,
    pub reference: String,
}

/// What the last library load skipped or could not resolve
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub skipped: Vec<LoadIssue>,
    pub unresolved: Vec<DanglingRef>,
}

impl LoadReport {
    /// Dangling references of one pipeline
    pub fn unresolved_in<'a>(&'a self, pipeline: &'a str) -> impl Iterator<Item = &'a DanglingRef> {
        self.unresolved.iter().filter(move |d| d.pipeline == pipeline)
    }
}

struct Snapshot {
    fragments: Vec<Fragment>,
    pipelines: Vec<Pipeline>,
    usage: UsageIndex,
    tags: TagIndex,
    search: SearchIndex,
    report: LoadReport,
}

impl Snapshot {
    fn build(store: &Store, settings: &Settings) -> Result<Self> {
        let scan = store.scan()?;

        let keys: HashSet<String> = scan
            .fragments
            .iter()
            .map(|f| f.item_path().key())
            .collect();

        let usage = UsageIndex::build(&scan.pipelines, &keys);

        let mut fragments = scan.fragments;
        for fragment in &mut fragments {
            fragment.usage_count = usage.count(&fragment.item_path().key());
        }

        let mut unresolved = Vec::new();
        for pipeline in &scan.pipelines {
            for component in &pipeline.components {
                if !keys.contains(&component.key()) {
                    warn!(
                        pipeline = %pipeline.path,
                        reference = %component.path,
                        "pipeline references a missing fragment"
                    );
                    unresolved.push(DanglingRef {
                        pipeline: pipeline.path.clone(),
                        reference: component.path.clone(),
                    });
                }
            }
        }

        let tags = TagIndex::build(&fragments, &scan.pipelines);
        let search = SearchIndex::build(&fragments, &scan.pipelines, settings);

        debug!(
            fragments = fragments.len(),
            pipelines = scan.pipelines.len(),
            unresolved = unresolved.len(),
            "rebuilt library snapshot"
        );

        Ok(Self {
            fragments,
            pipelines: scan.pipelines,
            usage,
            tags,
            search,
            report: LoadReport {
                skipped: scan.issues,
                unresolved,
            },
        })
    }
}

pub struct LibraryService {
    store: Store,
    project_root: PathBuf,
    settings: Settings,
    snapshot: Option<Snapshot>,
    scheduler: Scheduler<LibraryEvent>,
}

impl LibraryService {
    /// Opens the library of `project`, creating default settings if needed
    pub fn open(project: &Project) -> Result<Self> {
        Self::new(project.store(), project.root())
    }

    pub fn new(store: Store, project_root: impl Into<PathBuf>) -> Result<Self> {
        let settings = store.read_settings()?;
        Ok(Self {
            store,
            project_root: project_root.into(),
            settings,
            snapshot: None,
            scheduler: Scheduler::new(),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Drops derived indices; the next read rebuilds them
    pub fn invalidate(&mut self) {
        if self.snapshot.take().is_some() {
            debug!("invalidated library snapshot");
        }
    }

    fn snapshot(&mut self) -> Result<&Snapshot> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => Snapshot::build(&self.store, &self.settings)?,
        };
        Ok(self.snapshot.insert(snapshot))
    }

    /// Loads the library, returning what was skipped
    pub fn load(&mut self) -> Result<&LoadReport> {
        Ok(&self.snapshot()?.report)
    }

    // --- Reads ---

    pub fn list_library(&mut self, filter: &Filter) -> Result<SearchResults> {
        Ok(self.snapshot()?.search.query(filter))
    }

    /// Every readable fragment, active and archived
    pub fn fragments(&mut self) -> Result<&[Fragment]> {
        Ok(&self.snapshot()?.fragments)
    }

    /// Every readable pipeline, active and archived
    pub fn pipelines(&mut self) -> Result<&[Pipeline]> {
        Ok(&self.snapshot()?.pipelines)
    }

    /// Finds an item from any accepted path spelling or a bare slug.
    ///
    /// A bare slug must match exactly one item across all kinds.
    pub fn resolve_item(&self, input: &str) -> Result<Located> {
        if let Some(parsed) = ItemPath::parse(input) {
            return if parsed.archived {
                self.store.require_in(&parsed.item, true)
            } else {
                self.store.require(&parsed.item)
            };
        }

        let slug = input.trim();
        if slug.is_empty() || slug.contains('/') {
            return Err(LibraryError::NotFound(input.to_string()));
        }

        let mut candidates: Vec<ItemPath> = FragmentKind::all()
            .iter()
            .map(|k| ItemPath::fragment(*k, slug))
            .collect();
        candidates.push(ItemPath::pipeline(slug));

        let mut found = Vec::new();
        for item in &candidates {
            if let Some(located) = self.store.locate(item)? {
                found.push(located);
            }
        }

        match found.len() {
            0 => Err(LibraryError::NotFound(slug.to_string())),
            1 => Ok(found.remove(0)),
            _ => {
                let matches: Vec<String> = found.iter().map(Located::location).collect();
                Err(LibraryError::Invalid(format!(
                    "'{}' is ambiguous: {}",
                    slug,
                    matches.join(", ")
                )))
            }
        }
    }

    /// Reads a fragment with its usage count filled in
    pub fn fragment(&mut self, input: &str) -> Result<Fragment> {
        let found = self.resolve_item(input)?;
        if found.item.is_pipeline() {
            return Err(LibraryError::Invalid(format!("{} is not a fragment", found.location())));
        }

        let mut fragment = self.store.read_fragment_in(&found.item, found.archived)?;
        fragment.usage_count = self.snapshot()?.usage.count(&found.item.key());
        Ok(fragment)
    }

    pub fn pipeline(&self, input: &str) -> Result<Pipeline> {
        let found = self.resolve_item(input)?;
        if !found.item.is_pipeline() {
            return Err(LibraryError::Invalid(format!("{} is not a pipeline", found.location())));
        }
        self.store.read_pipeline_in(&found.item, found.archived)
    }

    /// Usage key of `input`. Paths are keyed without reading the store, so
    /// a deleted fragment still answers with zero users.
    fn usage_key(&self, input: &str) -> Result<String> {
        match canonical_key(input) {
            Some(key) => Ok(key),
            None => Ok(self.resolve_item(input)?.item.key()),
        }
    }

    pub fn usage_count(&mut self, input: &str) -> Result<usize> {
        let key = self.usage_key(input)?;
        Ok(self.snapshot()?.usage.count(&key))
    }

    pub fn pipelines_using(&mut self, input: &str) -> Result<Vec<PipelineSummary>> {
        let key = self.usage_key(input)?;
        Ok(self.snapshot()?.usage.pipelines_using(&key).to_vec())
    }

    /// Tags of every active item, sorted
    pub fn all_tags(&mut self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.tags.all_tags())
    }

    /// Tags with the number of active items carrying each
    pub fn tag_counts(&mut self) -> Result<Vec<(String, usize)>> {
        Ok(self
            .snapshot()?
            .tags
            .counts()
            .map(|(t, n)| (t.to_string(), n))
            .collect())
    }

    // --- Fragment mutations ---

    /// Creates a fragment named `name`. Returns its path.
    pub fn create_fragment(
        &mut self,
        kind: FragmentKind,
        name: &str,
        body: &str,
        tags: Vec<String>,
    ) -> Result<String> {
        let slug = validate_name(name)?;
        let item = ItemPath::fragment(kind, slug.clone());
        self.store.ensure_available(&item)?;

        let fragment = Fragment::new(kind, slug, Some(name.to_string()), tags, body);
        self.store.write_fragment(&fragment)?;
        register_tags(&self.store, &fragment.tags)?;
        self.invalidate();

        Ok(fragment.path)
    }

    /// Replaces the body, tags or display name of a fragment. `None` keeps
    /// the current value.
    pub fn update_fragment(
        &mut self,
        input: &str,
        body: Option<String>,
        tags: Option<Vec<String>>,
        name: Option<String>,
    ) -> Result<()> {
        let found = self.resolve_item(input)?;
        if found.item.is_pipeline() {
            return Err(LibraryError::Invalid(format!("{} is not a fragment", found.location())));
        }

        let mut fragment = self.store.read_fragment_in(&found.item, found.archived)?;
        let previous_tags = fragment.tags.clone();

        if let Some(body) = body {
            fragment.set_body(body);
        }
        if let Some(tags) = tags {
            fragment.set_tags(tags);
        }
        if let Some(name) = name {
            let name = name.trim();
            fragment.display_name = if name.is_empty() {
                fragment.slug.clone()
            } else {
                name.to_string()
            };
        }

        self.store.write_fragment(&fragment)?;
        if !fragment.is_archived {
            register_tags(&self.store, &fragment.tags)?;
        }
        self.invalidate();

        let dropped: Vec<String> = previous_tags
            .into_iter()
            .filter(|t| !fragment.tags.contains(t))
            .collect();
        self.schedule_tag_cleanup(dropped);
        Ok(())
    }

    /// Renames an item. Fragment renames rewrite every pipeline reference;
    /// pipeline renames also set the display name. Returns the new path.
    pub fn rename(&mut self, input: &str, new_name: &str) -> Result<String> {
        let found = self.resolve_item(input)?;
        let target = found.item.with_slug(validate_name(new_name)?);

        if target.key() != found.item.key() {
            self.store.ensure_available(&target)?;
        }

        let renamed = self.store.rename_item(&found, &target)?;

        if target.is_pipeline() {
            let mut pipeline = self.store.read_pipeline_in(&target, renamed.archived)?;
            pipeline.name = new_name.trim().to_string();
            self.store.write_pipeline(&pipeline)?;
        } else {
            let mut fragment = self.store.read_fragment_in(&target, renamed.archived)?;
            fragment.display_name = new_name.trim().to_string();
            self.store.write_fragment(&fragment)?;
            self.rewrite_references(&found.item, &target)?;
        }

        self.invalidate();
        Ok(renamed.location())
    }

    /// Points every reference to `from` at `to`, in active and archived
    /// pipelines
    fn rewrite_references(&mut self, from: &ItemPath, to: &ItemPath) -> Result<()> {
        let key = from.key();
        let affected: Vec<Pipeline> = self
            .snapshot()?
            .pipelines
            .iter()
            .filter(|p| p.references(&key))
            .cloned()
            .collect();

        for mut pipeline in affected {
            for component in &mut pipeline.components {
                if component.key() == key {
                    component.path = to.reference();
                }
            }
            self.store.write_pipeline(&pipeline)?;
            debug!(pipeline = %pipeline.path, from = %from, to = %to, "rewrote reference");
        }
        Ok(())
    }

    /// Copies an item under a new name, optionally straight into the
    /// archive. Returns the new location.
    pub fn clone_item(&mut self, input: &str, new_name: &str, to_archive: bool) -> Result<String> {
        let found = self.resolve_item(input)?;
        let target = found.item.with_slug(validate_name(new_name)?);
        self.store.ensure_available(&target)?;

        let name = new_name.trim().to_string();
        let (location, tags) = if found.item.is_pipeline() {
            let mut pipeline = self.store.read_pipeline_in(&found.item, found.archived)?;
            pipeline.slug = target.slug().to_string();
            pipeline.path = target.logical();
            pipeline.name = name;
            pipeline.is_archived = to_archive;
            self.store.write_pipeline(&pipeline)?;
            (pipeline.location(), pipeline.tags)
        } else {
            let source = self.store.read_fragment_in(&found.item, found.archived)?;
            let mut fragment = Fragment::new(
                source.kind,
                target.slug(),
                Some(name),
                source.tags,
                source.body,
            );
            fragment.is_archived = to_archive;
            self.store.write_fragment(&fragment)?;
            (fragment.location(), fragment.tags)
        };

        if !to_archive {
            register_tags(&self.store, &tags)?;
        }
        self.invalidate();
        Ok(location)
    }

    /// Deletes an item and queues cleanup of the tags it carried. Pipelines
    /// that referenced a deleted fragment keep the now dangling reference.
    pub fn delete(&mut self, input: &str) -> Result<String> {
        let found = self.resolve_item(input)?;
        let tags = self.tags_of(&found);

        self.store.delete_item(&found.item)?;
        self.invalidate();
        self.schedule_tag_cleanup(tags);

        Ok(found.location())
    }

    /// Moves an item into the archive. Returns the new location.
    pub fn archive(&mut self, input: &str) -> Result<String> {
        let found = self.resolve_item(input)?;
        let tags = self.tags_of(&found);

        let location = self.store.archive_item(&found.item)?;
        self.invalidate();
        self.schedule_tag_cleanup(tags);

        Ok(location)
    }

    /// Moves an archived item back. Returns the new location.
    pub fn unarchive(&mut self, input: &str) -> Result<String> {
        let found = self.resolve_item(input)?;
        let tags = self.tags_of(&found);

        let location = self.store.unarchive_item(&found.item)?;
        register_tags(&self.store, &tags)?;
        self.invalidate();

        Ok(location)
    }

    /// Tags of a stored item; unreadable files carry none
    fn tags_of(&self, found: &Located) -> Vec<String> {
        let tags = if found.item.is_pipeline() {
            self.store
                .read_pipeline_in(&found.item, found.archived)
                .map(|p| p.tags)
        } else {
            self.store
                .read_fragment_in(&found.item, found.archived)
                .map(|f| f.tags)
        };

        tags.unwrap_or_else(|e| {
            warn!(location = %found.location(), error = %e, "could not read tags");
            Vec::new()
        })
    }

    // --- Pipelines ---

    /// Starts editing a stored pipeline
    pub fn edit_pipeline(&self, input: &str) -> Result<PipelineEditor> {
        Ok(PipelineEditor::load(self.pipeline(input)?, &self.settings))
    }

    /// Saves the editor's draft. New or renamed drafts are stored under
    /// their sanitized name; otherwise the existing file is kept.
    ///
    /// Refuses when another pipeline already uses that name. When the name
    /// changed since the last save, the old file is removed.
    pub fn save_pipeline(&mut self, editor: &mut PipelineEditor) -> Result<String> {
        let original = editor.original().cloned();
        let target = match &original {
            Some(o) if !editor.is_renamed() => o.clone(),
            _ => ItemPath::pipeline(validate_name(&editor.draft().name)?),
        };

        let same_pipeline = original
            .as_ref()
            .is_some_and(|o| o.key() == target.key());
        if !same_pipeline {
            self.store.ensure_available(&target)?;
        }

        let mut pipeline = editor.draft().clone();
        pipeline.slug = target.slug().to_string();
        pipeline.path = target.logical();
        if let Some(found) = original.as_ref().map(|o| self.store.locate(o)).transpose()?.flatten() {
            pipeline.is_archived = found.archived;
        }
        pipeline.renumber();
        self.store.write_pipeline(&pipeline)?;

        if let Some(original) = original.filter(|_| !same_pipeline) {
            if self.store.exists(&original)? {
                self.store.delete_item(&original)?;
            }
        }

        if !pipeline.is_archived {
            register_tags(&self.store, &pipeline.tags)?;
        }
        editor.mark_saved(target);
        self.invalidate();

        Ok(pipeline.location())
    }

    // --- Composition ---

    /// Composes a pipeline into its artifact text
    pub fn compose(&self, input: &str) -> Result<String> {
        let pipeline = self.pipeline(input)?;
        compose(&pipeline, &self.settings, &self.store)
    }

    /// Writes an artifact. An empty `path` uses the default destination.
    pub fn write_composed(&self, artifact: &str, path: &str) -> Result<PathBuf> {
        write_artifact(&self.project_root, &self.settings, artifact, path)
    }

    /// Composes a pipeline and writes it to its output path
    pub fn compose_and_write(&self, input: &str) -> Result<PathBuf> {
        let pipeline = self.pipeline(input)?;
        compose_to_file(&self.store, &self.project_root, &self.settings, &pipeline).map(|(p, _)| p)
    }

    /// Queues [`compose_and_write`](Self::compose_and_write). The pipeline is
    /// resolved now; composing happens on the next
    /// [`run_pending`](Self::run_pending).
    pub fn schedule_compose(&mut self, input: &str) -> Result<TaskHandle> {
        let pipeline = self.pipeline(input)?;
        let store = self.store.clone();
        let settings = self.settings.clone();
        let root = self.project_root.clone();

        Ok(self.scheduler.spawn("compose", move || {
            let (output, artifact) = compose_to_file(&store, &root, &settings, &pipeline)?;
            Ok(LibraryEvent::Composed {
                pipeline: pipeline.name,
                output,
                tokens: estimate_tokens(&artifact),
            })
        }))
    }

    /// Queues removal of `candidates` from the tag registry once no active
    /// item carries them
    pub fn schedule_tag_cleanup(&mut self, candidates: Vec<String>) -> Option<TaskHandle> {
        if candidates.is_empty() {
            return None;
        }

        let store = self.store.clone();
        Some(self.scheduler.spawn("tag-cleanup", move || {
            let scan = store.scan()?;
            let index = TagIndex::build(&scan.fragments, &scan.pipelines);
            let removed = cleanup_orphans(&store, &candidates, &index)?;
            Ok(LibraryEvent::TagsCleaned(removed))
        }))
    }

    /// Runs queued tasks and returns their completions
    pub fn run_pending(&mut self) -> Vec<TaskCompletion<LibraryEvent>> {
        self.scheduler.run_pending()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn service() -> (TempDir, LibraryService) {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let service = LibraryService::open(&project).unwrap();
        (dir, service)
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn new_pipeline(service: &mut LibraryService, name: &str, parts: &[&str]) -> String {
        let mut editor = PipelineEditor::new(name, service.settings());
        for part in parts {
            let fragment = service.fragment(part).unwrap();
            editor.add(&fragment);
        }
        service.save_pipeline(&mut editor).unwrap()
    }

    #[test]
    fn create_and_read_fragment() {
        let (_dir, mut service) = service();
        let path = service
            .create_fragment(FragmentKind::Prompt, "Code Review", "Review it", tags(&["Dev"]))
            .unwrap();
        assert_eq!(path, "components/prompts/code-review.md");

        let fragment = service.fragment("code-review").unwrap();
        assert_eq!(fragment.display_name, "Code Review");
        assert_eq!(fragment.tags, vec!["dev"]);
        assert_eq!(service.all_tags().unwrap(), vec!["dev"]);
    }

    #[test]
    fn create_rejects_duplicates_and_bad_names() {
        let (_dir, mut service) = service();
        service
            .create_fragment(FragmentKind::Rules, "Style", "", vec![])
            .unwrap();

        let err = service
            .create_fragment(FragmentKind::Rules, "STYLE", "", vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = service
            .create_fragment(FragmentKind::Rules, "style.md", "", vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn bare_slug_must_be_unambiguous() {
        let (_dir, mut service) = service();
        service.create_fragment(FragmentKind::Prompt, "shared", "", vec![]).unwrap();
        service.create_fragment(FragmentKind::Rules, "shared", "", vec![]).unwrap();

        let err = service.resolve_item("shared").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let found = service.resolve_item("components/rules/shared.md").unwrap();
        assert_eq!(found.item.kind(), Some(FragmentKind::Rules));
        assert_eq!(service.resolve_item("nope").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn usage_counts_follow_saves() {
        let (_dir, mut service) = service();
        service.create_fragment(FragmentKind::Context, "team", "T", vec![]).unwrap();
        service.create_fragment(FragmentKind::Prompt, "ask", "A", vec![]).unwrap();

        new_pipeline(&mut service, "One", &["team", "ask"]);
        new_pipeline(&mut service, "Two", &["team"]);

        assert_eq!(service.usage_count("team").unwrap(), 2);
        assert_eq!(service.usage_count("ask").unwrap(), 1);
        let users: Vec<String> = service
            .pipelines_using("team")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(users, vec!["One", "Two"]);
    }

    #[test]
    fn save_refuses_name_clash_unless_same_pipeline() {
        let (_dir, mut service) = service();
        new_pipeline(&mut service, "Daily", &[]);

        let mut other = PipelineEditor::new("daily", service.settings());
        let err = service.save_pipeline(&mut other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let mut editor = service.edit_pipeline("daily").unwrap();
        editor.set_name("DAILY");
        assert_eq!(service.save_pipeline(&mut editor).unwrap(), "pipelines/daily.yaml");
    }

    #[test]
    fn saving_under_new_name_moves_pipeline() {
        let (_dir, mut service) = service();
        new_pipeline(&mut service, "Old Name", &[]);

        let mut editor = service.edit_pipeline("old-name").unwrap();
        editor.set_name("New Name");
        assert_eq!(service.save_pipeline(&mut editor).unwrap(), "pipelines/new-name.yaml");

        assert!(!service.store().exists(&ItemPath::pipeline("old-name")).unwrap());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn rename_fragment_rewrites_references() {
        let (_dir, mut service) = service();
        service.create_fragment(FragmentKind::Rules, "old", "R", vec![]).unwrap();
        new_pipeline(&mut service, "P", &["old"]);

        let path = service.rename("components/rules/old.md", "New Rules").unwrap();
        assert_eq!(path, "components/rules/new-rules.md");

        let pipeline = service.pipeline("p").unwrap();
        assert_eq!(pipeline.components[0].path, "../components/rules/new-rules.md");
        assert_eq!(service.usage_count("new-rules").unwrap(), 1);
        assert_eq!(service.fragment("new-rules").unwrap().display_name, "New Rules");
    }

    #[test]
    fn rename_to_existing_name_fails() {
        let (_dir, mut service) = service();
        service.create_fragment(FragmentKind::Prompt, "a", "", vec![]).unwrap();
        service.create_fragment(FragmentKind::Prompt, "b", "", vec![]).unwrap();

        let err = service.rename("components/prompts/a.md", "B").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn clone_into_archive() {
        let (_dir, mut service) = service();
        service
            .create_fragment(FragmentKind::Context, "base", "Body", tags(&["x"]))
            .unwrap();

        let location = service.clone_item("base", "Copy", true).unwrap();
        assert_eq!(location, "archive/components/contexts/copy.md");

        let copy = service.fragment("copy").unwrap();
        assert!(copy.is_archived);
        assert_eq!(copy.body, "Body");
        assert_eq!(copy.tags, vec!["x"]);
    }

    #[test]
    fn archive_hides_from_default_listing_and_cleans_tags() {
        let (_dir, mut service) = service();
        service
            .create_fragment(FragmentKind::Prompt, "p", "", tags(&["solo"]))
            .unwrap();

        assert_eq!(
            service.archive("p").unwrap(),
            "archive/components/prompts/p.md"
        );
        assert!(service.list_library(&Filter::parse("")).unwrap().is_empty());
        assert_eq!(
            service.list_library(&Filter::parse("status:archived")).unwrap().fragments.len(),
            1
        );

        assert_eq!(service.pending_tasks(), 1);
        let completions = service.run_pending();
        assert!(matches!(
            completions.as_slice(),
            [TaskCompletion::Done(LibraryEvent::TagsCleaned(removed))] if removed == &vec!["solo".to_string()]
        ));
        assert!(service.store().read_tag_registry().unwrap().is_empty());

        service.unarchive("archive/components/prompts/p.md").unwrap();
        assert_eq!(service.store().read_tag_registry().unwrap().len(), 1);
    }

    #[test]
    fn cancelled_task_yields_no_completion() {
        let (_dir, mut service) = service();
        service
            .create_fragment(FragmentKind::Prompt, "p", "", tags(&["stale"]))
            .unwrap();
        service.delete("p").unwrap();

        let handle = service.schedule_tag_cleanup(tags(&["stale"])).unwrap();
        handle.cancel();
        // The cleanup queued by delete still runs
        assert_eq!(service.run_pending().len(), 1);
        assert!(service.store().read_tag_registry().unwrap().is_empty());
    }

    #[test]
    fn delete_leaves_dangling_reference_reported() {
        let (_dir, mut service) = service();
        service.create_fragment(FragmentKind::Context, "c", "C", vec![]).unwrap();
        new_pipeline(&mut service, "P", &["c"]);

        assert_eq!(service.usage_count("components/contexts/c.md").unwrap(), 1);
        service.delete("components/contexts/c.md").unwrap();
        assert_eq!(service.fragments().unwrap().len(), 0);
        assert_eq!(service.usage_count("components/contexts/c.md").unwrap(), 0);
        assert!(service.pipelines_using("../components/contexts/c.md").unwrap().is_empty());

        let listed = service.list_library(&Filter::default()).unwrap();
        assert!(listed
            .fragments
            .iter()
            .all(|f| f.location() != "components/contexts/c.md"));
        assert_eq!(listed.pipelines.len(), 1);

        let report = service.load().unwrap();
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].reference, "../components/contexts/c.md");

        let err = service.compose("p").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedRef);
    }

    #[test]
    fn load_reports_malformed_files() {
        let (dir, mut service) = service();
        let bad = dir.path().join(".pluqqy/pipelines/bad.yaml");
        fs::write(&bad, "components: [").unwrap();

        let report = service.load().unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].location, "pipelines/bad.yaml");
    }

    #[test]
    fn compose_and_write_to_default_destination() {
        let (dir, mut service) = service();
        service.create_fragment(FragmentKind::Prompt, "hello", "Hi", vec![]).unwrap();
        new_pipeline(&mut service, "Greet", &["hello"]);

        let output = service.compose_and_write("greet").unwrap();
        assert_eq!(output, dir.path().join("./PLUQQY.md"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "## PROMPTS\n\nHi\n");
    }

    #[test]
    fn scheduled_compose_reports_output() {
        let (dir, mut service) = service();
        service.create_fragment(FragmentKind::Prompt, "hello", "Hi", vec![]).unwrap();
        new_pipeline(&mut service, "Greet", &["hello"]);

        service.schedule_compose("pipelines/greet.yaml").unwrap();
        assert!(!dir.path().join("PLUQQY.md").exists());

        match service.run_pending().as_slice() {
            [TaskCompletion::Done(LibraryEvent::Composed { pipeline, output, tokens })] => {
                assert_eq!(pipeline, "Greet");
                assert!(output.is_file());
                assert_eq!(*tokens, 4);
            }
            other => panic!("unexpected completions: {:?}", other),
        }
    }
}
