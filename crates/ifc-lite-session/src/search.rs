// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Search index over categories and a sample of their elements

use crate::categories::CategoryIndex;
use crate::config::SearchConfig;
use ifc_lite_engine::{ElementId, ElementSelection, EngineAdapter, ModelHandle};
use std::cmp::Ordering;

/// What a search entry points at
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum SearchKind {
    Category,
    Element,
}

/// One searchable entry
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SearchEntry {
    /// Normalized lookup string
    pub key: String,
    pub kind: SearchKind,
    pub display_name: String,
    /// Canonical category
    pub category: String,
    pub element_id: Option<ElementId>,
    pub model_identifier: Option<String>,
}

impl SearchEntry {
    fn matches(&self, needle: &str) -> bool {
        self.key.contains(needle) || self.display_name.to_lowercase().contains(needle)
    }

    fn rank(&self, other: &SearchEntry) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| {
                self.display_name
                    .to_lowercase()
                    .cmp(&other.display_name.to_lowercase())
            })
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Queryable index built from the category index
#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
    max_results: usize,
}

impl SearchIndex {
    pub fn empty(config: &SearchConfig) -> Self {
        Self {
            entries: Vec::new(),
            max_results: config.max_results,
        }
    }

    /// Build from the categories of `model`
    ///
    /// Element names come from the engine when it has them; missing names
    /// are synthesized as `<CATEGORY>-<id>`.
    pub async fn build(
        engine: &dyn EngineAdapter,
        model: &ModelHandle,
        categories: &CategoryIndex,
        config: &SearchConfig,
    ) -> Self {
        let mut entries = Vec::new();

        for category in categories.entries() {
            let bare = categories.bare_name(&category.name);
            entries.push(SearchEntry {
                key: category.name.to_lowercase(),
                kind: SearchKind::Category,
                display_name: format!("{} ({})", bare, category.count()),
                category: category.name.clone(),
                element_id: None,
                model_identifier: None,
            });

            let sample: Vec<(String, ElementId)> = category
                .elements
                .iter()
                .flat_map(|(model_id, ids)| ids.iter().map(move |id| (model_id.to_string(), *id)))
                .take(config.max_elements_per_category)
                .collect();
            let ids: Vec<ElementId> = sample.iter().map(|(_, id)| *id).collect();

            let names = match engine.models().element_names(model, &ids).await {
                Ok(names) => names,
                Err(e) => {
                    log::debug!("[Search] No element names for {}: {}", category.name, e);
                    Default::default()
                }
            };

            for (model_identifier, id) in sample {
                let display_name = names
                    .get(&id)
                    .filter(|name| !name.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("{}-{}", bare, id.0));
                entries.push(SearchEntry {
                    key: format!("{}:{}:{}", category.name, display_name, id.0).to_lowercase(),
                    kind: SearchKind::Element,
                    display_name,
                    category: category.name.clone(),
                    element_id: Some(id),
                    model_identifier: Some(model_identifier),
                });
            }
        }

        log::info!("[Search] Indexed {} entries", entries.len());
        Self {
            entries,
            max_results: config.max_results,
        }
    }

    /// Entries matching `query`, categories first, then by name
    pub fn query(&self, query: &str) -> Vec<SearchEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<&SearchEntry> =
            self.entries.iter().filter(|e| e.matches(&needle)).collect();
        results.sort_by(|a, b| a.rank(b));
        results
            .into_iter()
            .take(self.max_results)
            .cloned()
            .collect()
    }

    /// Elements an entry stands for
    pub fn selection_for(
        &self,
        entry: &SearchEntry,
        categories: &CategoryIndex,
    ) -> Option<ElementSelection> {
        let selection = match entry.kind {
            SearchKind::Category => categories
                .get(&entry.category)
                .map(|category| category.elements.clone()),
            SearchKind::Element => {
                let id = entry.element_id?;
                let model = entry.model_identifier.clone().unwrap_or_default();
                Some(ElementSelection::for_model(model, [id]))
            }
        };
        selection.filter(|selection| !selection.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
