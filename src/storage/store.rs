//! Library store
//!
//! Owns the on-disk layout of a library root (`.pluqqy/`):
//!
//! ```text
//! components/{contexts,prompts,rules}/<slug>.md
//! pipelines/<slug>.yaml
//! archive/components/<kind>/<slug>.md
//! archive/pipelines/<slug>.yaml
//! settings.yaml
//! tags.yaml
//! ```
//!
//! Item names are unique case-insensitively across the active and archive
//! roots combined. Fragment and pipeline specific reads and writes live in
//! `markdown.rs` and `pipelines.rs`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{Fragment, FragmentKind, ItemPath, Pipeline, ARCHIVE_DIR};
use crate::error::{IoContext, LibraryError, Result};

/// Where an item was found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// The item, with the slug spelled as on disk
    pub item: ItemPath,
    pub archived: bool,
    pub file: PathBuf,
}

impl Located {
    /// Location relative to the library root
    pub fn location(&self) -> String {
        self.item.location(self.archived)
    }
}

/// A file skipped while scanning the library
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadIssue {
    pub location: String,
    pub message: String,
}

/// Everything readable in the library
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub fragments: Vec<Fragment>,
    pub pipelines: Vec<Pipeline>,
    pub issues: Vec<LoadIssue>,
}

/// Store for a library root directory
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the library root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a root-relative location
    pub fn path_of(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }

    fn dir_for(&self, item: &ItemPath, archived: bool) -> PathBuf {
        let dir = item.parent_dir();
        if archived {
            self.root.join(ARCHIVE_DIR).join(dir)
        } else {
            self.root.join(dir)
        }
    }

    /// Finds `item` in one root, matching the file name case-insensitively
    fn locate_in(&self, item: &ItemPath, archived: bool) -> Result<Option<Located>> {
        let dir = self.dir_for(item, archived);
        let exact = dir.join(item.file_name());
        if exact.is_file() {
            return Ok(Some(Located {
                item: item.clone(),
                archived,
                file: exact,
            }));
        }

        if !dir.is_dir() {
            return Ok(None);
        }

        let extensions = extensions_for(item);
        for entry in fs::read_dir(&dir)
            .io_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry.io_context(|| "Failed to read directory entry")?;
            let path = entry.path();
            let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
                continue;
            };
            let stem = stem.to_string_lossy().into_owned();
            let ext_ok = extensions.iter().any(|x| ext.eq_ignore_ascii_case(x));
            if ext_ok && stem.eq_ignore_ascii_case(item.slug()) && path.is_file() {
                return Ok(Some(Located {
                    item: item.with_slug(stem),
                    archived,
                    file: path,
                }));
            }
        }

        Ok(None)
    }

    /// Finds `item` in the active root, then the archive root
    pub fn locate(&self, item: &ItemPath) -> Result<Option<Located>> {
        match self.locate_in(item, false)? {
            Some(found) => Ok(Some(found)),
            None => self.locate_in(item, true),
        }
    }

    /// Like [`locate`](Self::locate) but `NotFound` when missing
    pub fn require(&self, item: &ItemPath) -> Result<Located> {
        self.locate(item)?
            .ok_or_else(|| LibraryError::NotFound(item.logical()))
    }

    /// Finds `item` in a specific root
    pub fn require_in(&self, item: &ItemPath, archived: bool) -> Result<Located> {
        self.locate_in(item, archived)?
            .ok_or_else(|| LibraryError::NotFound(item.location(archived)))
    }

    pub fn exists(&self, item: &ItemPath) -> Result<bool> {
        Ok(self.locate(item)?.is_some())
    }

    /// Fails with `AlreadyExists` when any spelling of `item` is present in
    /// either root
    pub fn ensure_available(&self, item: &ItemPath) -> Result<()> {
        match self.locate(item)? {
            Some(found) => Err(LibraryError::AlreadyExists(found.location())),
            None => Ok(()),
        }
    }

    /// Lists item paths under `dir` (relative to a root) with extension `ext`
    fn list_dir(&self, dir: &Path, ext: &[&str]) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut stems = Vec::new();
        for entry in fs::read_dir(dir)
            .io_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry.io_context(|| "Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let matches_ext = path
                .extension()
                .map(|e| ext.iter().any(|x| e.eq_ignore_ascii_case(x)))
                .unwrap_or(false);
            if let (true, Some(stem)) = (matches_ext, path.file_stem()) {
                stems.push(stem.to_string_lossy().into_owned());
            }
        }

        stems.sort();
        Ok(stems)
    }

    /// Fragments of `kind` in the active or archive root
    pub fn list_fragments(&self, kind: FragmentKind, archived: bool) -> Result<Vec<ItemPath>> {
        let template = ItemPath::fragment(kind, "");
        let dir = self.dir_for(&template, archived);
        Ok(self
            .list_dir(&dir, extensions_for(&template))?
            .into_iter()
            .map(|slug| ItemPath::fragment(kind, slug))
            .collect())
    }

    /// Pipelines in the active or archive root
    pub fn list_pipelines(&self, archived: bool) -> Result<Vec<ItemPath>> {
        let template = ItemPath::pipeline("");
        let dir = self.dir_for(&template, archived);
        Ok(self
            .list_dir(&dir, extensions_for(&template))?
            .into_iter()
            .map(ItemPath::pipeline)
            .collect())
    }

    /// Moves an item between the active and archive roots without touching
    /// its content. Returns the new location.
    fn move_item(&self, item: &ItemPath, to_archive: bool) -> Result<String> {
        let found = self.require_in(item, !to_archive)?;

        if let Some(clash) = self.locate_in(&found.item, to_archive)? {
            return Err(LibraryError::AlreadyExists(clash.location()));
        }

        let dest_dir = self.dir_for(&found.item, to_archive);
        fs::create_dir_all(&dest_dir)
            .io_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

        let file_name = found
            .file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| found.item.file_name().into());
        let dest = dest_dir.join(file_name);

        fs::rename(&found.file, &dest).io_context(|| {
            format!(
                "Failed to move {} to {}",
                found.file.display(),
                dest.display()
            )
        })?;

        let location = found.item.location(to_archive);
        debug!(from = %found.location(), to = %location, "moved item");
        Ok(location)
    }

    /// Moves an active item under `archive/`
    pub fn archive_item(&self, item: &ItemPath) -> Result<String> {
        self.move_item(item, true)
    }

    /// Moves an archived item back to the active root
    pub fn unarchive_item(&self, item: &ItemPath) -> Result<String> {
        self.move_item(item, false)
    }

    /// Moves an item to a new slug within the root that holds it
    pub fn rename_item(&self, found: &Located, to: &ItemPath) -> Result<Located> {
        let dest = self.dir_for(to, found.archived).join(to.file_name());

        fs::rename(&found.file, &dest).io_context(|| {
            format!("Failed to rename {} to {}", found.file.display(), dest.display())
        })?;

        let renamed = Located {
            item: to.clone(),
            archived: found.archived,
            file: dest,
        };
        debug!(from = %found.location(), to = %renamed.location(), "renamed item");
        Ok(renamed)
    }

    /// Deletes an item from whichever root holds it
    pub fn delete_item(&self, item: &ItemPath) -> Result<Located> {
        let found = self.require(item)?;
        fs::remove_file(&found.file)
            .io_context(|| format!("Failed to delete {}", found.file.display()))?;
        debug!(location = %found.location(), "deleted item");
        Ok(found)
    }

    /// Reads every fragment and pipeline, skipping (and reporting) files
    /// that fail to parse
    pub fn scan(&self) -> Result<Scan> {
        let mut scan = Scan::default();

        for archived in [false, true] {
            for kind in FragmentKind::all() {
                for item in self.list_fragments(*kind, archived)? {
                    match self.read_fragment_in(&item, archived) {
                        Ok(fragment) => scan.fragments.push(fragment),
                        Err(e) => scan.skip(item.location(archived), e)?,
                    }
                }
            }

            for item in self.list_pipelines(archived)? {
                match self.read_pipeline_in(&item, archived) {
                    Ok(pipeline) => scan.pipelines.push(pipeline),
                    Err(e) => scan.skip(item.location(archived), e)?,
                }
            }
        }

        debug!(
            fragments = scan.fragments.len(),
            pipelines = scan.pipelines.len(),
            skipped = scan.issues.len(),
            "scanned library"
        );
        Ok(scan)
    }
}

impl Scan {
    /// Records a malformed file; other errors abort the scan
    fn skip(&mut self, location: String, error: LibraryError) -> Result<()> {
        match error {
            LibraryError::Malformed { .. } | LibraryError::NotFound(_) => {
                warn!(%location, error = %error, "skipping unreadable library file");
                self.issues.push(LoadIssue {
                    location,
                    message: error.to_string(),
                });
                Ok(())
            }
            other => Err(other),
        }
    }
}

/// File extensions accepted for an item type
fn extensions_for(item: &ItemPath) -> &'static [&'static str] {
    if item.is_pipeline() {
        &["yaml", "yml"]
    } else {
        &["md"]
    }
}

/// Modification time of a file, if the platform reports one
pub(crate) fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn store_with(files: &[(&str, &str)]) -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".pluqqy"));
        for (location, content) in files {
            let path = store.path_of(location);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn list_empty_library() {
        let (_dir, store) = store_with(&[]);
        assert!(store.list_fragments(FragmentKind::Prompt, false).unwrap().is_empty());
        assert!(store.list_pipelines(true).unwrap().is_empty());
    }

    #[test]
    fn list_filters_extensions_and_temp_files() {
        let (_dir, store) = store_with(&[
            ("components/prompts/b.md", "B"),
            ("components/prompts/a.md", "A"),
            ("components/prompts/notes.txt", "x"),
            ("components/prompts/.c.md.tmp", "x"),
            ("pipelines/one.yaml", "name: One\n"),
            ("pipelines/two.yml", "name: Two\n"),
        ]);

        let prompts = store.list_fragments(FragmentKind::Prompt, false).unwrap();
        assert_eq!(
            prompts,
            vec![
                ItemPath::fragment(FragmentKind::Prompt, "a"),
                ItemPath::fragment(FragmentKind::Prompt, "b")
            ]
        );
        assert_eq!(store.list_pipelines(false).unwrap().len(), 2);
    }

    #[test]
    fn locate_is_case_insensitive_across_roots() {
        let (_dir, store) = store_with(&[("archive/components/rules/Style.md", "x")]);

        let found = store
            .locate(&ItemPath::fragment(FragmentKind::Rules, "style"))
            .unwrap()
            .unwrap();
        assert!(found.archived);
        assert_eq!(found.item.slug(), "Style");

        let err = store
            .ensure_available(&ItemPath::fragment(FragmentKind::Rules, "STYLE"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn archive_and_unarchive_move_bytes_untouched() {
        let content = "---\nname: P\ntags:\n- a\n---\n\nbody\r\n";
        let (_dir, store) = store_with(&[("components/prompts/p.md", content)]);
        let item = ItemPath::fragment(FragmentKind::Prompt, "p");

        assert_eq!(store.archive_item(&item).unwrap(), "archive/components/prompts/p.md");
        assert!(!store.path_of("components/prompts/p.md").exists());
        assert_eq!(
            fs::read_to_string(store.path_of("archive/components/prompts/p.md")).unwrap(),
            content
        );

        assert_eq!(store.unarchive_item(&item).unwrap(), "components/prompts/p.md");
        assert_eq!(
            fs::read_to_string(store.path_of("components/prompts/p.md")).unwrap(),
            content
        );
    }

    #[test]
    fn archive_fails_when_destination_exists() {
        let (_dir, store) = store_with(&[
            ("pipelines/daily.yaml", "name: a\n"),
            ("archive/pipelines/Daily.yaml", "name: b\n"),
        ]);

        let err = store.archive_item(&ItemPath::pipeline("daily")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(store.path_of("pipelines/daily.yaml").exists());
    }

    #[test]
    fn unarchive_missing_is_not_found() {
        let (_dir, store) = store_with(&[("pipelines/daily.yaml", "name: a\n")]);
        let err = store.unarchive_item(&ItemPath::pipeline("daily")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rename_stays_in_root() {
        let (_dir, store) = store_with(&[("archive/pipelines/old.yml", "name: Old\n")]);

        let found = store.require(&ItemPath::pipeline("old")).unwrap();
        let renamed = store.rename_item(&found, &ItemPath::pipeline("new")).unwrap();

        assert_eq!(renamed.location(), "archive/pipelines/new.yaml");
        assert!(store.path_of("archive/pipelines/new.yaml").is_file());
        assert!(!store.path_of("archive/pipelines/old.yml").exists());
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, store) = store_with(&[("components/contexts/c.md", "x")]);
        let item = ItemPath::fragment(FragmentKind::Context, "c");

        store.delete_item(&item).unwrap();
        assert!(!store.exists(&item).unwrap());
        assert_eq!(store.delete_item(&item).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn scan_skips_malformed_files() {
        let (_dir, store) = store_with(&[
            ("components/prompts/good.md", "---\nname: Good\n---\n\nok"),
            ("components/prompts/bad.md", "---\nname: [unclosed\n---\nbody"),
            ("pipelines/broken.yaml", "components: {{{"),
            ("archive/pipelines/old.yaml", "name: Old\ncomponents: []\n"),
        ]);

        let scan = store.scan().unwrap();
        assert_eq!(scan.fragments.len(), 1);
        assert_eq!(scan.pipelines.len(), 1);
        assert!(scan.pipelines[0].is_archived);
        assert_eq!(scan.issues.len(), 2);
        assert!(scan.issues.iter().any(|i| i.location == "components/prompts/bad.md"));
    }
}
