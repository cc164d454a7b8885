// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model registry - loaded models and the current one

use crate::lifecycle::ModelState;
use ifc_lite_engine::{BoundingBox, ModelHandle, ModelKey};

/// A model known to the session
#[derive(Clone, Debug, PartialEq)]
pub struct ModelEntry {
    pub handle: ModelHandle,
    /// Empty until the model is ready, and for degraded models
    pub identifier: String,
    pub state: ModelState,
    /// World-space bounds after positioning
    pub bounds: Option<BoundingBox>,
}

impl ModelEntry {
    pub fn key(&self) -> ModelKey {
        self.handle.key
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }
}

/// Tracks loaded models and publishes the current one
#[derive(Debug, Default)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    current: Option<ModelKey>,
    /// Name of the file being decoded
    loading: Option<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A load started; readiness drops until it finishes
    pub fn begin_load(&mut self, name: impl Into<String>) {
        self.loading = Some(name.into());
    }

    pub fn end_load(&mut self) {
        self.loading = None;
    }

    /// Name of the file being decoded, if any
    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    /// Track a model the engine just added
    pub fn register(&mut self, handle: ModelHandle) {
        if self.get(handle.key).is_some() {
            return;
        }
        self.entries.push(ModelEntry {
            handle,
            identifier: String::new(),
            state: ModelState::GeometryProcessing,
            bounds: None,
        });
    }

    pub fn set_state(&mut self, key: ModelKey, state: ModelState) {
        if let Some(entry) = self.get_mut(key) {
            entry.state = state;
        }
    }

    pub fn set_bounds(&mut self, key: ModelKey, bounds: Option<BoundingBox>) {
        if let Some(entry) = self.get_mut(key) {
            entry.bounds = bounds;
        }
    }

    /// Mark a model ready and make it the current one
    pub fn publish_ready(&mut self, key: ModelKey, identifier: String, degraded: bool) {
        let Some(entry) = self.get_mut(key) else {
            log::warn!("[Session] Cannot publish unknown model {}", key);
            return;
        };
        entry.identifier = identifier;
        entry.state = ModelState::Ready { degraded };
        self.current = Some(key);
    }

    /// Drop a model; the first remaining model becomes current
    ///
    /// Returns whether the current model changed.
    pub fn remove(&mut self, key: ModelKey) -> bool {
        let before = self.current;
        self.entries.retain(|entry| entry.key() != key);
        if self.current == Some(key) {
            self.current = self.entries.first().map(ModelEntry::key);
        }
        before != self.current
    }

    /// State of the model called `name`
    ///
    /// A model has no key while the engine decodes it, so `Loading` is only
    /// visible by name.
    pub fn state_of(&self, name: &str) -> ModelState {
        if let Some(entry) = self.entries.iter().rev().find(|e| e.name() == name) {
            return entry.state;
        }
        if self.loading.as_deref() == Some(name) {
            return ModelState::Loading;
        }
        ModelState::NotLoaded
    }

    pub fn get(&self, key: ModelKey) -> Option<&ModelEntry> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    fn get_mut(&mut self, key: ModelKey) -> Option<&mut ModelEntry> {
        self.entries.iter_mut().find(|entry| entry.key() == key)
    }

    pub fn current_model(&self) -> Option<&ModelEntry> {
        self.current.and_then(|key| self.get(key))
    }

    /// Current model is ready and no load is in flight
    pub fn model_ready(&self) -> bool {
        self.loading.is_none() && self.current_model().is_some_and(ModelEntry::is_ready)
    }

    /// Identifier of the current model, empty if there is none
    pub fn identifier(&self) -> &str {
        self.current_model()
            .map_or("", |entry| entry.identifier.as_str())
    }

    /// Models whose name contains `filter`, ignoring case
    pub fn models(&self, filter: &str) -> Vec<&ModelEntry> {
        let needle = filter.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|entry| needle.is_empty() || entry.name().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
