// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selection highlight manager
//!
//! Styles live in the engine's registry. Ad hoc colors reuse any registered
//! style of the same color instead of registering a second one; ghost styles
//! and the transient pick style are never shared.

use ifc_lite_engine::{ElementSelection, EngineAdapter, HighlightStyle, Result, Rgb};

/// Style used for search results
pub const SEARCH_STYLE: &str = "search-highlight";

/// Prefix of per-category ghost styles
pub const GHOST_PREFIX: &str = "ghost-";

/// Name of the ghost style of a category
pub fn ghost_style_name(category: &str) -> String {
    format!("{GHOST_PREFIX}{category}")
}

/// Applies and clears highlight styles through the engine
#[derive(Clone, Debug)]
pub struct HighlightManager {
    /// Name of the transient pick style
    selection_style: String,
}

impl HighlightManager {
    pub fn new(selection_style: impl Into<String>) -> Self {
        Self {
            selection_style: selection_style.into(),
        }
    }

    pub fn selection_style(&self) -> &str {
        &self.selection_style
    }

    fn is_reserved(&self, name: &str) -> bool {
        name == self.selection_style || name.starts_with(GHOST_PREFIX)
    }

    /// Name of a registered, shareable style with `color`
    pub fn find_by_color(&self, engine: &dyn EngineAdapter, color: Rgb) -> Option<String> {
        let highlighter = engine.highlighter();
        highlighter.style_names().into_iter().find(|name| {
            !self.is_reserved(name)
                && highlighter
                    .style(name)
                    .is_some_and(|style| style.color == color)
        })
    }

    /// Style name for `color`, registering a solid style if none matches
    ///
    /// New styles are named `purpose`, or after the color when there is none.
    pub fn style_for_color(
        &self,
        engine: &dyn EngineAdapter,
        color: Rgb,
        purpose: Option<&str>,
    ) -> String {
        if let Some(existing) = self.find_by_color(engine, color) {
            log::debug!("[Highlight] Reusing style '{}' for {}", existing, color);
            return existing;
        }
        let name = purpose.map_or_else(|| color.to_hex(), str::to_string);
        engine
            .highlighter()
            .set_style(&name, HighlightStyle::solid(color));
        log::debug!("[Highlight] Registered style '{}' for {}", name, color);
        name
    }

    /// Register `style` under `name` unless it is already registered
    pub fn ensure_named(&self, engine: &dyn EngineAdapter, name: &str, style: HighlightStyle) {
        let highlighter = engine.highlighter();
        if highlighter.style(name).is_none() {
            highlighter.set_style(name, style);
        }
    }

    /// Highlight `selection` with `color`, then drop the transient pick
    ///
    /// Returns the name of the style used.
    pub async fn apply(
        &self,
        engine: &dyn EngineAdapter,
        color: Rgb,
        purpose: Option<&str>,
        selection: &ElementSelection,
        additive: bool,
        exclusive: bool,
    ) -> Result<String> {
        let name = self.style_for_color(engine, color, purpose);
        engine
            .highlighter()
            .highlight_by_id(&name, selection, additive, exclusive)
            .await?;
        self.clear_transient(engine).await?;
        Ok(name)
    }

    /// Highlight with a style registered under a fixed name
    pub async fn apply_named(
        &self,
        engine: &dyn EngineAdapter,
        name: &str,
        style: HighlightStyle,
        selection: &ElementSelection,
    ) -> Result<()> {
        self.ensure_named(engine, name, style);
        engine
            .highlighter()
            .highlight_by_id(name, selection, false, false)
            .await?;
        self.clear_transient(engine).await
    }

    /// Clear one style's applications; its definition stays cached
    pub async fn clear_style(&self, engine: &dyn EngineAdapter, name: &str) -> Result<()> {
        engine.highlighter().clear(Some(name)).await
    }

    pub async fn clear_all(&self, engine: &dyn EngineAdapter) -> Result<()> {
        engine.highlighter().clear(None).await
    }

    /// Clear the transient pick selection
    pub async fn clear_transient(&self, engine: &dyn EngineAdapter) -> Result<()> {
        engine
            .highlighter()
            .clear(Some(&self.selection_style))
            .await
    }

    /// Current pick selection
    pub fn picked(&self, engine: &dyn EngineAdapter) -> ElementSelection {
        engine.highlighter().selection(&self.selection_style)
    }
}
