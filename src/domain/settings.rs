//! Library settings
//!
//! Mirrors `.pluqqy/settings.yaml`. Missing keys take their defaults so a
//! partial file is always usable.

use serde::{Deserialize, Serialize};

use super::kind::FragmentKind;
use crate::error::{LibraryError, Result};

/// One section of the composed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: FragmentKind,

    #[serde(default)]
    pub heading: String,
}

impl Section {
    pub fn new(kind: FragmentKind, heading: impl Into<String>) -> Self {
        Self {
            kind,
            heading: heading.into(),
        }
    }
}

/// Formatting of the composed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatting {
    pub show_headings: bool,
    pub sections: Vec<Section>,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            show_headings: true,
            sections: FragmentKind::all()
                .iter()
                .map(|k| Section::new(*k, k.default_heading()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// File name of the composed artifact
    pub default_filename: String,

    /// Directory the active artifact is written to
    pub export_path: String,

    /// Directory for per-pipeline artifacts
    pub output_path: String,

    pub formatting: Formatting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_filename: "PLUQQY.md".to_string(),
            export_path: "./".to_string(),
            output_path: "tmp/".to_string(),
            formatting: Formatting::default(),
        }
    }
}

impl Settings {
    /// Sections with duplicates collapsed to their first occurrence and any
    /// missing kind appended with its default heading.
    pub fn effective_sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::with_capacity(FragmentKind::all().len());
        for section in &self.formatting.sections {
            if !sections.iter().any(|s| s.kind == section.kind) {
                sections.push(section.clone());
            }
        }
        for kind in FragmentKind::all() {
            if !sections.iter().any(|s| s.kind == *kind) {
                sections.push(Section::new(*kind, kind.default_heading()));
            }
        }
        sections
    }

    /// Kinds in section order
    pub fn kind_order(&self) -> Vec<FragmentKind> {
        self.effective_sections().iter().map(|s| s.kind).collect()
    }

    /// Position of `kind` in section order
    pub fn rank(&self, kind: FragmentKind) -> usize {
        self.kind_order()
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(usize::MAX)
    }

    /// Kinds absent from the configured sections
    pub fn missing_kinds(&self) -> Vec<FragmentKind> {
        FragmentKind::all()
            .iter()
            .copied()
            .filter(|k| !self.formatting.sections.iter().any(|s| s.kind == *k))
            .collect()
    }

    /// Checks the settings are fit to be written
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_kinds();
        if !missing.is_empty() {
            let names: Vec<_> = missing.iter().map(|k| k.type_name()).collect();
            return Err(LibraryError::Invalid(format!(
                "settings sections must include every kind (missing: {})",
                names.join(", ")
            )));
        }
        if self.default_filename.trim().is_empty() {
            return Err(LibraryError::Invalid(
                "default_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run_file() {
        let s = Settings::default();
        assert_eq!(s.default_filename, "PLUQQY.md");
        assert_eq!(s.export_path, "./");
        assert_eq!(s.output_path, "tmp/");
        assert!(s.formatting.show_headings);
        assert_eq!(
            s.kind_order(),
            vec![FragmentKind::Context, FragmentKind::Prompt, FragmentKind::Rules]
        );
        assert_eq!(s.formatting.sections[1].heading, "## PROMPTS");
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let s: Settings = serde_yaml::from_str("default_filename: OUT.md\n").unwrap();
        assert_eq!(s.default_filename, "OUT.md");
        assert_eq!(s.formatting.sections.len(), 3);
    }

    #[test]
    fn duplicate_sections_collapse_to_first() {
        let mut s = Settings::default();
        s.formatting.sections = vec![
            Section::new(FragmentKind::Rules, "## R1"),
            Section::new(FragmentKind::Prompt, "## P"),
            Section::new(FragmentKind::Rules, "## R2"),
            Section::new(FragmentKind::Context, "## C"),
        ];

        let sections = s.effective_sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, "## R1");
        assert_eq!(s.rank(FragmentKind::Context), 2);
    }

    #[test]
    fn missing_kind_is_appended_but_invalid_to_write() {
        let mut s = Settings::default();
        s.formatting.sections = vec![Section::new(FragmentKind::Prompt, "## P")];

        assert_eq!(s.effective_sections().len(), 3);
        assert_eq!(s.missing_kinds(), vec![FragmentKind::Context, FragmentKind::Rules]);
        assert!(s.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn section_type_accepts_plural() {
        let yaml = "formatting:\n  sections:\n    - type: contexts\n      heading: '# C'\n";
        let s: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.formatting.sections[0].kind, FragmentKind::Context);
    }
}
