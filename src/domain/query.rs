//! Search query language
//!
//! Queries are whitespace-separated tokens in any order:
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `type:pipelines\|prompts\|contexts\|rules` | Restrict item types (repeatable) |
//! | `status:archived\|active` | Archived only / explicitly active only |
//! | `tag:<name>` | Item must carry the tag (repeatable) |
//! | anything else | Case-insensitive substring term |
//!
//! Parsing is total: malformed filters degrade to plain terms. Consumers
//! work with the parsed [`Filter`]; the string helpers at the bottom exist
//! for single-key UI affordances.

use std::collections::BTreeSet;

use serde::Serialize;

use super::kind::FragmentKind;

/// Item type selectable with `type:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Pipelines,
    Prompts,
    Contexts,
    Rules,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Pipelines => "pipelines",
            ItemType::Prompts => "prompts",
            ItemType::Contexts => "contexts",
            ItemType::Rules => "rules",
        }
    }

    pub fn parse(value: &str) -> Option<ItemType> {
        match value.to_lowercase().as_str() {
            "pipelines" => Some(ItemType::Pipelines),
            "prompts" => Some(ItemType::Prompts),
            "contexts" => Some(ItemType::Contexts),
            "rules" => Some(ItemType::Rules),
            _ => None,
        }
    }

    /// The fragment kind this type selects, `None` for pipelines
    pub fn fragment_kind(&self) -> Option<FragmentKind> {
        match self {
            ItemType::Pipelines => None,
            ItemType::Prompts => Some(FragmentKind::Prompt),
            ItemType::Contexts => Some(FragmentKind::Context),
            ItemType::Rules => Some(FragmentKind::Rules),
        }
    }
}

/// Archive visibility requested by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// No `status:` token; archived items hidden
    #[default]
    Default,
    Archived,
    Active,
}

/// Parsed query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Filter {
    pub types: BTreeSet<ItemType>,
    pub status: StatusFilter,
    pub tags: BTreeSet<String>,
    /// Lowercased free-text terms
    pub terms: Vec<String>,
}

impl Filter {
    /// Parses a query string. Never fails.
    pub fn parse(query: &str) -> Filter {
        let mut filter = Filter::default();

        for token in query.split_whitespace() {
            match classify(token) {
                Token::Type(t) => {
                    filter.types.insert(t);
                }
                Token::Status(s) => filter.status = s,
                Token::Tag(tag) => {
                    filter.tags.insert(tag);
                }
                Token::Term => filter.terms.push(token.to_lowercase()),
            }
        }

        filter
    }

    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }

    pub fn includes_pipelines(&self) -> bool {
        self.types.is_empty() || self.types.contains(&ItemType::Pipelines)
    }

    pub fn includes_kind(&self, kind: FragmentKind) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t.fragment_kind() == Some(kind))
    }
}

enum Token {
    Type(ItemType),
    Status(StatusFilter),
    Tag(String),
    Term,
}

fn classify(token: &str) -> Token {
    let Some((key, value)) = token.split_once(':') else {
        return Token::Term;
    };

    match key.to_lowercase().as_str() {
        "type" => ItemType::parse(value).map_or(Token::Term, Token::Type),
        "status" => match value.to_lowercase().as_str() {
            "archived" => Token::Status(StatusFilter::Archived),
            "active" => Token::Status(StatusFilter::Active),
            _ => Token::Term,
        },
        "tag" if !value.is_empty() => Token::Tag(value.to_lowercase()),
        _ => Token::Term,
    }
}

const ARCHIVED_TOKEN: &str = "status:archived";

/// Adds `status:archived` when absent, removes every occurrence when present.
/// Whitespace is collapsed to single spaces.
pub fn toggle_archived(query: &str) -> String {
    let mut tokens: Vec<&str> = query.split_whitespace().collect();
    let before = tokens.len();
    tokens.retain(|t| !t.eq_ignore_ascii_case(ARCHIVED_TOKEN));

    if tokens.len() == before {
        tokens.push(ARCHIVED_TOKEN);
    }

    tokens.join(" ")
}

/// Which item types `cycle_type` steps through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleDomain {
    /// none → pipelines → prompts → contexts → rules → none
    #[default]
    All,
    /// none → prompts → contexts → rules → none
    Components,
}

impl CycleDomain {
    fn steps(&self) -> &'static [ItemType] {
        match self {
            CycleDomain::All => &[
                ItemType::Pipelines,
                ItemType::Prompts,
                ItemType::Contexts,
                ItemType::Rules,
            ],
            CycleDomain::Components => &[ItemType::Prompts, ItemType::Contexts, ItemType::Rules],
        }
    }

    fn next(&self, current: Option<ItemType>) -> Option<ItemType> {
        let steps = self.steps();
        match current.and_then(|c| steps.iter().position(|s| *s == c)) {
            None => steps.first().copied(),
            Some(i) => steps.get(i + 1).copied(),
        }
    }
}

/// Advances the `type:` filter one step through `domain`'s cycle.
///
/// The first recognised `type:` token determines the current position and
/// is replaced in place; any further `type:` filters are dropped. A type
/// outside the domain counts as no filter.
pub fn cycle_type(query: &str, domain: CycleDomain) -> String {
    let tokens: Vec<&str> = query.split_whitespace().collect();

    let mut slot = None;
    let mut current = None;
    let mut kept: Vec<String> = Vec::with_capacity(tokens.len() + 1);

    for token in tokens {
        if let Token::Type(t) = classify(token) {
            if slot.is_none() {
                slot = Some(kept.len());
                current = Some(t);
            }
            continue;
        }
        kept.push(token.to_string());
    }

    if let Some(next) = domain.next(current) {
        let rendered = format!("type:{}", next.as_str());
        match slot {
            Some(i) => kept.insert(i, rendered),
            None => kept.push(rendered),
        }
    }

    kept.join(" ")
}
