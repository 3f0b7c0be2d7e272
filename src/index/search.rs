//! Filtered views over a library snapshot
//!
//! Lowercased haystacks are computed once per snapshot. Results come back in
//! display order: fragments by section order then name, pipelines by name.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Filter, Fragment, Pipeline, Settings, StatusFilter};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub pipelines: Vec<Pipeline>,
    pub fragments: Vec<Fragment>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty() && self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len() + self.fragments.len()
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    haystack: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    fragments: Vec<Entry<Fragment>>,
    pipelines: Vec<Entry<Pipeline>>,
}

impl SearchIndex {
    pub fn build(fragments: &[Fragment], pipelines: &[Pipeline], settings: &Settings) -> Self {
        let names: HashMap<String, &str> = fragments
            .iter()
            .map(|f| (f.item_path().key(), f.display_name.as_str()))
            .collect();

        let mut fragment_entries: Vec<Entry<Fragment>> = fragments
            .iter()
            .map(|f| Entry {
                haystack: vec![
                    f.display_name.to_lowercase(),
                    f.slug.to_lowercase(),
                    f.tags.join(" "),
                    f.body.to_lowercase(),
                ],
                item: f.clone(),
            })
            .collect();
        fragment_entries.sort_by(|a, b| {
            settings
                .rank(a.item.kind)
                .cmp(&settings.rank(b.item.kind))
                .then_with(|| {
                    a.item
                        .display_name
                        .to_lowercase()
                        .cmp(&b.item.display_name.to_lowercase())
                })
                .then_with(|| a.item.path.cmp(&b.item.path))
        });

        let mut pipeline_entries: Vec<Entry<Pipeline>> = pipelines
            .iter()
            .map(|p| {
                let mut haystack = vec![p.name.to_lowercase(), p.slug.to_lowercase(), p.tags.join(" ")];
                haystack.extend(
                    p.components
                        .iter()
                        .filter_map(|c| names.get(&c.key()))
                        .map(|n| n.to_lowercase()),
                );
                Entry {
                    haystack,
                    item: p.clone(),
                }
            })
            .collect();
        pipeline_entries.sort_by(|a, b| {
            a.item
                .name
                .to_lowercase()
                .cmp(&b.item.name.to_lowercase())
                .then_with(|| a.item.path.cmp(&b.item.path))
        });

        Self {
            fragments: fragment_entries,
            pipelines: pipeline_entries,
        }
    }

    pub fn query(&self, filter: &Filter) -> SearchResults {
        let pipelines = if filter.includes_pipelines() {
            self.pipelines
                .iter()
                .filter(|e| status_matches(filter.status, e.item.is_archived))
                .filter(|e| filter.tags.iter().all(|t| e.item.has_tag(t)))
                .filter(|e| terms_match(&filter.terms, &e.haystack))
                .map(|e| e.item.clone())
                .collect()
        } else {
            Vec::new()
        };

        let fragments = self
            .fragments
            .iter()
            .filter(|e| filter.includes_kind(e.item.kind))
            .filter(|e| status_matches(filter.status, e.item.is_archived))
            .filter(|e| filter.tags.iter().all(|t| e.item.has_tag(t)))
            .filter(|e| terms_match(&filter.terms, &e.haystack))
            .map(|e| e.item.clone())
            .collect();

        SearchResults {
            pipelines,
            fragments,
        }
    }
}

fn status_matches(status: StatusFilter, archived: bool) -> bool {
    match status {
        StatusFilter::Archived => archived,
        StatusFilter::Default | StatusFilter::Active => !archived,
    }
}

fn terms_match(terms: &[String], haystack: &[String]) -> bool {
    terms
        .iter()
        .all(|term| haystack.iter().any(|field| field.contains(term.as_str())))
}
