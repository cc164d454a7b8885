// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Category indexer
//!
//! Native type names (`IFCWALLSTANDARDCASE`, `IFCSLAB`, ...) are classified
//! into a fixed, ordered list of canonical categories. A native name goes to
//! the first canonical category whose bare name is a case-insensitive
//! substring of it, so list order decides ties: with the default order
//! `IFCSTAIRFLIGHT` is a STAIR and `IFCWALLSTANDARDCASE` a WALL.

use crate::config::CategoryConfig;
use ifc_lite_engine::{CategoryPattern, ElementId, ElementSelection, EngineAdapter, ModelHandle};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical name without the domain prefix (`IFCWALL` -> `WALL`)
pub fn bare_name<'a>(category: &'a str, prefix: &str) -> &'a str {
    if category.len() >= prefix.len()
        && category.is_char_boundary(prefix.len())
        && category[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        &category[prefix.len()..]
    } else {
        category
    }
}

/// Assign native names to canonical categories, first match wins
///
/// Returns the native aliases per canonical category, only for categories
/// with at least one alias. Names matching nothing are dropped.
pub fn classify<S: AsRef<str>>(
    canonical: &[String],
    prefix: &str,
    native_names: &[S],
) -> BTreeMap<String, BTreeSet<String>> {
    let bare: Vec<(String, String)> = canonical
        .iter()
        .map(|c| (c.clone(), bare_name(c, prefix).to_ascii_uppercase()))
        .collect();

    let mut aliases: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for native in native_names {
        let native = native.as_ref();
        let upper = native.to_ascii_uppercase();
        if let Some((category, _)) = bare
            .iter()
            .find(|(_, bare)| !bare.is_empty() && upper.contains(bare.as_str()))
        {
            aliases
                .entry(category.clone())
                .or_default()
                .insert(native.to_string());
        }
    }
    aliases
}

/// One indexed canonical category
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryEntry {
    /// Canonical name, e.g. `IFCWALL`
    pub name: String,
    /// Native type names classified into this category
    pub aliases: BTreeSet<String>,
    /// Elements of the current model
    pub elements: ElementSelection,
}

impl CategoryEntry {
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    /// Element ids in ascending order
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }
}

/// Canonical categories of the current model and their elements
#[derive(Clone, Debug, Default)]
pub struct CategoryIndex {
    prefix: String,
    entries: BTreeMap<String, CategoryEntry>,
}

impl CategoryIndex {
    pub fn empty(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build the index for `model` from scratch
    ///
    /// `identifier` keys the element selections (empty for degraded models).
    pub async fn build(
        engine: &dyn EngineAdapter,
        model: &ModelHandle,
        identifier: &str,
        config: &CategoryConfig,
    ) -> ifc_lite_engine::Result<Self> {
        let models = engine.models();
        let native = models.native_categories(model)?;
        let classified = classify(&config.canonical, &config.prefix, &native);

        let mut entries = BTreeMap::new();
        for (category, aliases) in classified {
            let patterns: Vec<CategoryPattern> =
                aliases.iter().map(CategoryPattern::exact).collect();
            let found = models
                .elements_by_category_patterns(model, &patterns)
                .await?;

            let selection = ElementSelection::for_model(
                identifier,
                found.into_values().flatten(),
            );
            if selection.is_empty() {
                log::debug!("[Categories] {} has no elements, skipped", category);
                continue;
            }
            log::debug!(
                "[Categories] {} -> {} elements from {:?}",
                category,
                selection.len(),
                aliases
            );
            entries.insert(
                category.clone(),
                CategoryEntry {
                    name: category,
                    aliases,
                    elements: selection,
                },
            );
        }

        log::info!(
            "[Categories] Indexed {} categories for '{}'",
            entries.len(),
            model.name
        );
        Ok(Self {
            prefix: config.prefix.clone(),
            entries,
        })
    }

    /// Canonical names with elements, sorted
    pub fn available(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Look up a category by canonical or bare name, ignoring case
    pub fn get(&self, name: &str) -> Option<&CategoryEntry> {
        let upper = name.to_ascii_uppercase();
        self.entries.get(&upper).or_else(|| {
            self.entries
                .values()
                .find(|entry| bare_name(&entry.name, &self.prefix) == upper)
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.values()
    }

    /// Element count per category
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.entries
            .values()
            .map(|entry| (entry.name.clone(), entry.count()))
            .collect()
    }

    /// Display name of a category (`IFCWALL` -> `WALL`)
    pub fn bare_name<'a>(&self, name: &'a str) -> &'a str {
        bare_name(name, &self.prefix)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
