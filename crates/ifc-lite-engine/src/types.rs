// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core value types shared between engines and the orchestration layer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Engine-assigned key of a loaded model
///
/// Available as soon as the engine reports the model, unlike the model
/// identifier which may lag behind (see [`crate::ModelStore::identifier`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ModelKey(pub u64);

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model-{}", self.0)
    }
}

/// Opaque per-model element identifier (the engine's local id)
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for ElementId {
    fn from(id: u32) -> Self {
        ElementId(id)
    }
}

impl From<ElementId> for u32 {
    fn from(id: ElementId) -> Self {
        id.0
    }
}

/// Engine-assigned key of a render material
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material-{}", self.0)
    }
}

/// Opaque handle to an engine-loaded model
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ModelHandle {
    /// Engine-assigned key
    pub key: ModelKey,
    /// Display name (usually the file name without extension)
    pub name: String,
}

impl ModelHandle {
    pub fn new(key: ModelKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }
}

/// Input format understood by the engine
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum ModelFormat {
    /// IFC / STEP physical file
    #[default]
    Ifc,
    /// Pre-converted engine-native fragments
    Fragments,
}

impl ModelFormat {
    /// Guess the format from a file name
    pub fn from_file_name(file_name: &str) -> Self {
        if file_name.to_ascii_lowercase().ends_with(".frag") {
            ModelFormat::Fragments
        } else {
            ModelFormat::Ifc
        }
    }

    /// File extension including the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Ifc => ".ifc",
            ModelFormat::Fragments => ".frag",
        }
    }

    /// Strip this format's extension from a file name (case-insensitive)
    pub fn model_name(&self, file_name: &str) -> String {
        let ext = self.extension();
        if file_name.len() >= ext.len()
            && file_name.is_char_boundary(file_name.len() - ext.len())
            && file_name[file_name.len() - ext.len()..].eq_ignore_ascii_case(ext)
        {
            file_name[..file_name.len() - ext.len()].to_string()
        } else {
            file_name.to_string()
        }
    }
}

/// Case-insensitive exact matcher for a native type name
///
/// Engines receive a list of these when asked for the elements of a category.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CategoryPattern {
    name: String,
}

impl CategoryPattern {
    /// Match exactly `name`, ignoring ASCII case
    pub fn exact(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, native_name: &str) -> bool {
        native_name.eq_ignore_ascii_case(&self.name)
    }
}

/// Element ids grouped by model identifier
///
/// This is the selection currency of the engine: highlight, visibility and
/// camera primitives all take one.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ElementSelection {
    items: BTreeMap<String, BTreeSet<ElementId>>,
}

impl ElementSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection covering `ids` of a single model
    pub fn for_model(
        model_identifier: impl Into<String>,
        ids: impl IntoIterator<Item = ElementId>,
    ) -> Self {
        let mut selection = Self::new();
        selection.extend(model_identifier, ids);
        selection
    }

    /// Add ids for a model
    pub fn extend(
        &mut self,
        model_identifier: impl Into<String>,
        ids: impl IntoIterator<Item = ElementId>,
    ) {
        let entry = self.items.entry(model_identifier.into()).or_default();
        entry.extend(ids);
        self.items.retain(|_, ids| !ids.is_empty());
    }

    /// Add a single id
    pub fn insert(&mut self, model_identifier: impl Into<String>, id: ElementId) {
        self.items
            .entry(model_identifier.into())
            .or_default()
            .insert(id);
    }

    /// Merge another selection into this one
    pub fn merge(&mut self, other: &ElementSelection) {
        for (model, ids) in &other.items {
            self.items
                .entry(model.clone())
                .or_default()
                .extend(ids.iter().copied());
        }
    }

    /// Remove every id of `other` from this selection
    pub fn subtract(&mut self, other: &ElementSelection) {
        for (model, ids) in &other.items {
            if let Some(own) = self.items.get_mut(model) {
                own.retain(|id| !ids.contains(id));
            }
        }
        self.items.retain(|_, ids| !ids.is_empty());
    }

    pub fn contains(&self, model_identifier: &str, id: ElementId) -> bool {
        self.items
            .get(model_identifier)
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn ids(&self, model_identifier: &str) -> Option<&BTreeSet<ElementId>> {
        self.items.get(model_identifier)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<ElementId>)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(BTreeSet::is_empty)
    }

    /// Total number of element ids across all models
    pub fn len(&self) -> usize {
        self.items.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_strips_extension() {
        assert_eq!(ModelFormat::Ifc.model_name("House.IFC"), "House");
        assert_eq!(ModelFormat::Ifc.model_name("house.ifc"), "house");
        assert_eq!(ModelFormat::Fragments.model_name("tower.frag"), "tower");
        assert_eq!(ModelFormat::Ifc.model_name("notes.txt"), "notes.txt");
        assert_eq!(ModelFormat::from_file_name("a.FRAG"), ModelFormat::Fragments);
    }

    #[test]
    fn test_category_pattern_is_exact() {
        let pattern = CategoryPattern::exact("IFCWALL");
        assert!(pattern.matches("IfcWall"));
        assert!(!pattern.matches("IFCWALLSTANDARDCASE"));
    }

    #[test]
    fn test_selection_ignores_empty_models() {
        let mut selection = ElementSelection::for_model("abc", Vec::new());
        assert!(selection.is_empty());
        assert_eq!(selection.models().count(), 0);

        selection.insert("abc", ElementId(3));
        selection.merge(&ElementSelection::for_model("abc", [ElementId(3), ElementId(4)]));
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("abc", ElementId(4)));

        selection.subtract(&ElementSelection::for_model("abc", [ElementId(3), ElementId(4)]));
        assert!(selection.is_empty());
    }
}
