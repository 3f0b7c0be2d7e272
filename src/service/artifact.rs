//! Composed artifacts
//!
//! Resolves fragments for composition straight from the store and writes the
//! result to its destination.

use std::path::{Path, PathBuf};

use crate::domain::{compose, ComponentRef, Fragment, FragmentSource, Pipeline, Settings};
use crate::error::{LibraryError, Result};
use crate::storage::{write_atomic, Store};

impl FragmentSource for Store {
    fn resolve(&self, component: &ComponentRef) -> Result<Option<Fragment>> {
        let Some(item) = component.target() else {
            return Ok(None);
        };

        match self.read_fragment(&item) {
            Ok(fragment) => Ok(Some(fragment)),
            Err(LibraryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Where an artifact for `path` lands.
///
/// An empty path means `<export_path>/<default_filename>`; a path naming a
/// directory gets `default_filename` appended. Relative paths resolve
/// against the project root.
pub fn destination(project_root: &Path, settings: &Settings, path: &str) -> PathBuf {
    let path = path.trim();
    if path.is_empty() {
        return project_root
            .join(&settings.export_path)
            .join(&settings.default_filename);
    }

    let resolved = project_root.join(path);
    if path.ends_with('/') || path.ends_with('\\') || resolved.is_dir() {
        resolved.join(&settings.default_filename)
    } else {
        resolved
    }
}

/// Writes an artifact, creating parent directories. Returns the file path.
pub fn write_artifact(
    project_root: &Path,
    settings: &Settings,
    artifact: &str,
    path: &str,
) -> Result<PathBuf> {
    let dest = destination(project_root, settings, path);
    write_atomic(&dest, artifact.as_bytes())?;
    Ok(dest)
}

/// Composes `pipeline` and writes it to its configured output, falling back
/// to the default destination
pub fn compose_to_file(
    store: &Store,
    project_root: &Path,
    settings: &Settings,
    pipeline: &Pipeline,
) -> Result<(PathBuf, String)> {
    let artifact = compose(pipeline, settings, store)?;
    let target = pipeline.output_path.as_deref().unwrap_or("");
    let dest = write_artifact(project_root, settings, &artifact, target)?;
    Ok((dest, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FragmentKind, ItemPath};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_destination() {
        let root = Path::new("/work");
        let dest = destination(root, &Settings::default(), "");
        assert_eq!(dest, Path::new("/work/./PLUQQY.md"));
    }

    #[test]
    fn directory_destination_gets_default_filename() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();

        assert_eq!(
            destination(dir.path(), &settings, "out/"),
            dir.path().join("out/").join("PLUQQY.md")
        );
        assert_eq!(
            destination(dir.path(), &settings, "out/prompt.md"),
            dir.path().join("out/prompt.md")
        );
    }

    #[test]
    fn store_resolves_archived_fragments() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());

        let mut fragment = Fragment::new(FragmentKind::Rules, "r", None, vec![], "rule");
        fragment.is_archived = true;
        store.write_fragment(&fragment).unwrap();

        let found = ComponentRef::new(&ItemPath::fragment(FragmentKind::Rules, "r")).unwrap();
        assert_eq!(store.resolve(&found).unwrap().unwrap().body, "rule");

        let missing = ComponentRef::new(&ItemPath::fragment(FragmentKind::Rules, "gone")).unwrap();
        assert!(store.resolve(&missing).unwrap().is_none());
    }

    #[test]
    fn compose_to_file_uses_pipeline_output_path() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join(".pluqqy"));
        store
            .write_fragment(&Fragment::new(FragmentKind::Prompt, "p", None, vec![], "Hello"))
            .unwrap();

        let mut pipeline = Pipeline::new("x", "X");
        pipeline.output_path = Some("build/x.md".into());
        pipeline.components =
            vec![ComponentRef::new(&ItemPath::fragment(FragmentKind::Prompt, "p")).unwrap()];
        pipeline.renumber();

        let (dest, artifact) =
            compose_to_file(&store, dir.path(), &Settings::default(), &pipeline).unwrap();
        assert_eq!(dest, dir.path().join("build/x.md"));
        assert_eq!(artifact, "## PROMPTS\n\nHello\n");
        assert_eq!(fs::read_to_string(dest).unwrap(), artifact);
    }
}
