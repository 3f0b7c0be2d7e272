//! Fragment kinds
//!
//! A fragment's kind is determined solely by the directory it lives in
//! (`components/<kind-dir>/`). Everything that varies by kind is looked up
//! here rather than spread over separate types.

use serde::{Deserialize, Serialize};

/// The three kinds of library fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    #[serde(alias = "contexts")]
    Context,
    #[serde(alias = "prompts")]
    Prompt,
    #[serde(alias = "rule")]
    Rules,
}

impl FragmentKind {
    /// All kinds, in default section order
    pub fn all() -> &'static [FragmentKind] {
        &[FragmentKind::Context, FragmentKind::Prompt, FragmentKind::Rules]
    }

    /// Directory segment under `components/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            FragmentKind::Context => "contexts",
            FragmentKind::Prompt => "prompts",
            FragmentKind::Rules => "rules",
        }
    }

    /// Value used in the `type:` field of pipeline components
    pub fn type_name(&self) -> &'static str {
        match self {
            FragmentKind::Context => "context",
            FragmentKind::Prompt => "prompt",
            FragmentKind::Rules => "rules",
        }
    }

    /// Heading used for this kind's section in default settings
    pub fn default_heading(&self) -> &'static str {
        match self {
            FragmentKind::Context => "## CONTEXTS",
            FragmentKind::Prompt => "## PROMPTS",
            FragmentKind::Rules => "## RULES",
        }
    }

    /// Looks up a kind from its directory segment
    pub fn from_dir_name(dir: &str) -> Option<FragmentKind> {
        FragmentKind::all()
            .iter()
            .copied()
            .find(|k| k.dir_name().eq_ignore_ascii_case(dir))
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.type_name())
    }
}

impl std::str::FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "context" | "contexts" => Ok(FragmentKind::Context),
            "prompt" | "prompts" => Ok(FragmentKind::Prompt),
            "rules" | "rule" => Ok(FragmentKind::Rules),
            _ => Err(format!("Unknown fragment kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_singular_and_plural() {
        assert_eq!("context".parse::<FragmentKind>().unwrap(), FragmentKind::Context);
        assert_eq!("Prompts".parse::<FragmentKind>().unwrap(), FragmentKind::Prompt);
        assert_eq!("rule".parse::<FragmentKind>().unwrap(), FragmentKind::Rules);
        assert!("pipeline".parse::<FragmentKind>().is_err());
    }

    #[test]
    fn dir_names_round_trip() {
        for kind in FragmentKind::all() {
            assert_eq!(FragmentKind::from_dir_name(kind.dir_name()), Some(*kind));
        }
        assert_eq!(FragmentKind::from_dir_name("pipelines"), None);
    }

    #[test]
    fn serde_accepts_aliases() {
        let kind: FragmentKind = serde_yaml::from_str("contexts").unwrap();
        assert_eq!(kind, FragmentKind::Context);

        let out = serde_yaml::to_string(&FragmentKind::Prompt).unwrap();
        assert_eq!(out.trim(), "prompt");
    }
}
