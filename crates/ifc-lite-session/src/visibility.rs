// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Visibility state machine
//!
//! Each category is in exactly one of four states. Isolation is exclusive:
//! the only way to get an `Isolated` entry is [`VisibilityState::isolating`],
//! which drops every other entry, and hide/ghost refuse to run while a
//! category is isolated.

use crate::categories::CategoryEntry;
use crate::config::StyleConfig;
use crate::highlight::{ghost_style_name, HighlightManager};
use ifc_lite_engine::{EngineAdapter, HighlightStyle, Result, Sphere};
use std::collections::BTreeMap;

/// Visibility of one category
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CategoryVisibility {
    #[default]
    Normal,
    /// Everything else is hidden
    Isolated,
    Hidden,
    /// Rendered translucent in place
    Ghosted,
}

/// Per-category visibility; categories without an entry are `Normal`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityState {
    states: BTreeMap<String, CategoryVisibility>,
}

impl VisibilityState {
    pub fn get(&self, category: &str) -> CategoryVisibility {
        self.states.get(category).copied().unwrap_or_default()
    }

    /// The isolated category, if any
    pub fn isolated(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|(_, state)| **state == CategoryVisibility::Isolated)
            .map(|(name, _)| name.as_str())
    }

    pub fn hidden(&self) -> Vec<&str> {
        self.with_state(CategoryVisibility::Hidden)
    }

    pub fn ghosted(&self) -> Vec<&str> {
        self.with_state(CategoryVisibility::Ghosted)
    }

    /// Nothing isolated, hidden or ghosted
    pub fn is_baseline(&self) -> bool {
        self.states.is_empty()
    }

    fn with_state(&self, wanted: CategoryVisibility) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, state)| **state == wanted)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// State with only `category` isolated
    fn isolating(category: &str) -> Self {
        let mut states = BTreeMap::new();
        states.insert(category.to_string(), CategoryVisibility::Isolated);
        Self { states }
    }

    /// Copy with `category` set to `state`
    ///
    /// Only hide and ghost transitions go through here.
    fn with(&self, category: &str, state: CategoryVisibility) -> Self {
        debug_assert!(state != CategoryVisibility::Isolated);
        let mut next = self.clone();
        if state == CategoryVisibility::Normal {
            next.states.remove(category);
        } else {
            next.states.insert(category.to_string(), state);
        }
        next
    }
}

/// Drives visibility primitives and tracks per-category state
///
/// Engine calls run first; the new state is committed only when all of them
/// succeeded.
#[derive(Clone, Debug)]
pub struct VisibilityController {
    state: VisibilityState,
    styles: StyleConfig,
    space_category: String,
}

impl VisibilityController {
    pub fn new(styles: StyleConfig, space_category: impl Into<String>) -> Self {
        Self {
            state: VisibilityState::default(),
            styles,
            space_category: space_category.into(),
        }
    }

    pub fn state(&self) -> &VisibilityState {
        &self.state
    }

    /// Undo every category effect in the engine and forget the state
    ///
    /// Runs when the current model changes. The state is dropped even if an
    /// engine call fails.
    pub async fn discard(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
    ) -> Result<()> {
        if self.state.is_baseline() {
            return Ok(());
        }
        let previous = std::mem::take(&mut self.state);
        if previous.isolated().is_some() || !previous.hidden().is_empty() {
            engine.hider().set_visible(true, None).await?;
        }
        for ghosted in previous.ghosted() {
            highlights
                .clear_style(engine, &ghost_style_name(ghosted))
                .await?;
        }
        log::debug!("[Visibility] Category state discarded");
        Ok(())
    }

    /// Ghost style of a category; the space category gets its own tint
    pub fn ghost_style(&self, category: &str) -> HighlightStyle {
        if category.eq_ignore_ascii_case(&self.space_category) {
            self.styles.space_ghost.style()
        } else {
            self.styles.ghost.style()
        }
    }

    /// Show everything, clear highlights and clipping, refit the camera
    ///
    /// `fit` is the bounding sphere of all loaded models.
    pub async fn show_all(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
        fit: Option<Sphere>,
        animate: bool,
    ) -> Result<()> {
        engine.hider().set_visible(true, None).await?;
        highlights.clear_all(engine).await?;
        engine.clear_clipping_planes().await?;
        self.state = VisibilityState::default();
        log::info!("[Visibility] Show all");

        let camera = engine.camera();
        if let Some(sphere) = fit.filter(|s| !s.is_empty()) {
            if camera.kind().can_fit() {
                if let Err(e) = camera.fit_to_sphere(&sphere, animate).await {
                    log::warn!("[Visibility] Camera fit failed: {}", e);
                }
            }
        }
        engine.update(true).await
    }

    /// Isolate a category, or restore everything if it already is isolated
    pub async fn toggle_isolate(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
        category: &CategoryEntry,
    ) -> Result<CategoryVisibility> {
        if category.elements.is_empty() {
            return Ok(self.state.get(&category.name));
        }

        if self.state.isolated() == Some(category.name.as_str()) {
            engine.hider().set_visible(true, None).await?;
            self.state = VisibilityState::default();
            log::debug!("[Visibility] {} no longer isolated", category.name);
            return Ok(CategoryVisibility::Normal);
        }

        engine.hider().isolate(&category.elements).await?;
        for ghosted in self.state.ghosted() {
            highlights
                .clear_style(engine, &ghost_style_name(ghosted))
                .await?;
        }
        self.state = VisibilityState::isolating(&category.name);
        log::debug!("[Visibility] {} isolated", category.name);
        Ok(CategoryVisibility::Isolated)
    }

    /// Hide or unhide a category
    ///
    /// Ignored while a category is isolated.
    pub async fn toggle_hide(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
        category: &CategoryEntry,
    ) -> Result<CategoryVisibility> {
        let current = self.state.get(&category.name);
        if category.elements.is_empty() {
            return Ok(current);
        }
        if let Some(isolated) = self.state.isolated() {
            log::debug!(
                "[Visibility] Hide {} ignored, {} is isolated",
                category.name,
                isolated
            );
            return Ok(current);
        }

        let next = match current {
            CategoryVisibility::Hidden => {
                engine
                    .hider()
                    .set_visible(true, Some(&category.elements))
                    .await?;
                CategoryVisibility::Normal
            }
            CategoryVisibility::Ghosted => {
                highlights
                    .clear_style(engine, &ghost_style_name(&category.name))
                    .await?;
                engine
                    .hider()
                    .set_visible(false, Some(&category.elements))
                    .await?;
                CategoryVisibility::Hidden
            }
            _ => {
                engine
                    .hider()
                    .set_visible(false, Some(&category.elements))
                    .await?;
                CategoryVisibility::Hidden
            }
        };
        self.state = self.state.with(&category.name, next);
        Ok(next)
    }

    /// Ghost or unghost a category
    ///
    /// Ignored while a category is isolated or when the category is hidden.
    pub async fn toggle_ghost(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
        category: &CategoryEntry,
    ) -> Result<CategoryVisibility> {
        let current = self.state.get(&category.name);
        if category.elements.is_empty()
            || self.state.isolated().is_some()
            || current == CategoryVisibility::Hidden
        {
            log::debug!("[Visibility] Ghost {} ignored", category.name);
            return Ok(current);
        }

        let style_name = ghost_style_name(&category.name);
        let next = if current == CategoryVisibility::Ghosted {
            highlights.clear_style(engine, &style_name).await?;
            CategoryVisibility::Normal
        } else {
            let style = self.ghost_style(&category.name);
            highlights
                .apply_named(engine, &style_name, style, &category.elements)
                .await?;
            CategoryVisibility::Ghosted
        };
        self.state = self.state.with(&category.name, next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_lite_engine::{
        CameraKind, ElementId, ElementSelection, EngineSetup, Highlighter, Point3, RenderedFaces,
        Rgb,
    };
    use ifc_lite_headless::{EngineCall, HeadlessEngine, HeadlessOptions};
    use std::collections::BTreeSet;

    const MODEL: &str = r#"ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1=IFCPROJECT('proj',$,'P',$,$,$,$,$,$);
#10=IFCWALL('w1',$,'Wall 1',$,$,$,$,$);
#11=IFCWALL('w2',$,'Wall 2',$,$,$,$,$);
#20=IFCDOOR('d1',$,'Door 1',$,$,$,$,$);
#30=IFCSPACE('s1',$,'Kitchen',$,$,$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    fn entry(name: &str, ids: &[u32]) -> CategoryEntry {
        CategoryEntry {
            name: name.to_string(),
            aliases: BTreeSet::from([name.to_string()]),
            elements: ElementSelection::for_model("proj", ids.iter().map(|id| ElementId(*id))),
        }
    }

    struct Fixture {
        engine: HeadlessEngine,
        highlights: HighlightManager,
        visibility: VisibilityController,
        wall: CategoryEntry,
        door: CategoryEntry,
        space: CategoryEntry,
    }

    async fn fixture(options: HeadlessOptions) -> Fixture {
        let engine = HeadlessEngine::with_options(options);
        engine.initialize(&EngineSetup::default()).await.unwrap();
        engine
            .load_model(MODEL.as_bytes(), "m", ifc_lite_engine::ModelFormat::Ifc)
            .await
            .unwrap();
        Fixture {
            engine,
            highlights: HighlightManager::new("select"),
            visibility: VisibilityController::new(StyleConfig::default(), "IFCSPACE"),
            wall: entry("IFCWALL", &[10, 11]),
            door: entry("IFCDOOR", &[20]),
            space: entry("IFCSPACE", &[30]),
        }
    }

    #[tokio::test]
    async fn test_isolate_round_trip() {
        let mut f = fixture(HeadlessOptions::default()).await;

        let state = f
            .visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        assert_eq!(state, CategoryVisibility::Isolated);
        assert_eq!(f.visibility.state().isolated(), Some("IFCWALL"));
        assert!(!f.engine.is_visible("proj", ElementId(20)));

        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        assert!(f.visibility.state().is_baseline());
        assert_eq!(f.engine.hidden_count(), 0);
    }

    #[tokio::test]
    async fn test_isolate_switches_category() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.space)
            .await
            .unwrap();

        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();

        let mut from_baseline = VisibilityController::new(StyleConfig::default(), "IFCSPACE");
        from_baseline
            .toggle_isolate(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();

        assert_eq!(f.visibility.state(), from_baseline.state());
        assert_eq!(f.visibility.state().isolated(), Some("IFCDOOR"));
        assert!(f.visibility.state().hidden().is_empty());
        assert!(f.visibility.state().ghosted().is_empty());
        assert!(f.engine.selection("ghost-IFCSPACE").is_empty());
    }

    #[tokio::test]
    async fn test_hide_and_ghost_ignored_while_isolated() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        f.engine.clear_journal();

        let hide = f
            .visibility
            .toggle_hide(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        let ghost = f
            .visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();

        assert_eq!(hide, CategoryVisibility::Normal);
        assert_eq!(ghost, CategoryVisibility::Normal);
        assert!(f.engine.journal().is_empty());
        assert_eq!(f.visibility.state().isolated(), Some("IFCWALL"));
    }

    #[tokio::test]
    async fn test_hide_toggles() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        assert_eq!(f.visibility.state().hidden(), vec!["IFCWALL"]);
        assert!(!f.engine.is_visible("proj", ElementId(10)));
        assert!(f.engine.is_visible("proj", ElementId(20)));

        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        assert!(f.visibility.state().is_baseline());
        assert!(f.engine.is_visible("proj", ElementId(10)));
    }

    #[tokio::test]
    async fn test_ghost_styles() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.space)
            .await
            .unwrap();

        let wall = f.engine.style("ghost-IFCWALL").unwrap();
        let space = f.engine.style("ghost-IFCSPACE").unwrap();
        assert_eq!(wall.color, Rgb::from_u32(0xaaaaaa));
        assert_eq!(space.color, Rgb::from_u32(0x00ff00));
        assert!(space.opacity > wall.opacity);
        assert!(wall.transparent);
        assert_eq!(wall.rendered_faces, RenderedFaces::All);

        // Toggling off clears the application, not the definition
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        assert!(f.engine.selection("ghost-IFCWALL").is_empty());
        assert!(f.engine.style("ghost-IFCWALL").is_some());
        assert_eq!(f.visibility.state().ghosted(), vec!["IFCSPACE"]);
    }

    #[tokio::test]
    async fn test_ghost_ignored_when_hidden() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        let state = f
            .visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        assert_eq!(state, CategoryVisibility::Hidden);
        assert!(f.engine.style("ghost-IFCDOOR").is_none());
    }

    #[tokio::test]
    async fn test_empty_category_is_noop() {
        let mut f = fixture(HeadlessOptions::default()).await;
        let empty = entry("IFCROOF", &[]);
        f.engine.clear_journal();

        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &empty)
            .await
            .unwrap();
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &empty)
            .await
            .unwrap();
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &empty)
            .await
            .unwrap();
        assert!(f.engine.journal().is_empty());
        assert!(f.visibility.state().is_baseline());
    }

    #[tokio::test]
    async fn test_failed_toggle_keeps_state() {
        let mut f = fixture(HeadlessOptions::default()).await;
        // Uninitialized engine rejects every visibility call
        let broken = HeadlessEngine::new();

        let result = f
            .visibility
            .toggle_hide(&broken, &f.highlights, &f.wall)
            .await;
        assert!(result.is_err());
        assert!(f.visibility.state().is_baseline());

        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();
        let result = f
            .visibility
            .toggle_isolate(&broken, &f.highlights, &f.door)
            .await;
        assert!(result.is_err());
        assert_eq!(f.visibility.state().isolated(), Some("IFCWALL"));
    }

    #[tokio::test]
    async fn test_show_all_resets_everything() {
        let mut f = fixture(HeadlessOptions::new().with_camera(CameraKind::Simple)).await;
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();

        let sphere = Sphere::new(Point3::new(0.0, 1.0, 0.0), 4.0);
        f.visibility
            .show_all(&f.engine, &f.highlights, Some(sphere), true)
            .await
            .unwrap();

        assert!(f.visibility.state().is_baseline());
        assert_eq!(f.engine.hidden_count(), 0);
        assert!(f.engine.selection("ghost-IFCWALL").is_empty());
        let journal = f.engine.journal();
        assert!(journal.contains(&EngineCall::ClearClippingPlanes));
        assert!(journal.contains(&EngineCall::FitToSphere {
            sphere,
            animate: true
        }));
        assert_eq!(journal.last(), Some(&EngineCall::Update { force: true }));
    }

    #[tokio::test]
    async fn test_show_all_skips_fit_on_other_cameras() {
        let mut f = fixture(HeadlessOptions::new().with_camera(CameraKind::Other)).await;
        let sphere = Sphere::new(Point3::origin(), 1.0);
        f.visibility
            .show_all(&f.engine, &f.highlights, Some(sphere), true)
            .await
            .unwrap();
        assert!(f.engine.calls(EngineCall::is_camera_fit).is_empty());
    }

    #[tokio::test]
    async fn test_discard_undoes_engine_effects() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_hide(&f.engine, &f.highlights, &f.door)
            .await
            .unwrap();
        f.visibility
            .toggle_ghost(&f.engine, &f.highlights, &f.wall)
            .await
            .unwrap();

        f.visibility.discard(&f.engine, &f.highlights).await.unwrap();
        assert!(f.visibility.state().is_baseline());
        assert_eq!(f.engine.hidden_count(), 0);
        assert!(f.engine.selection("ghost-IFCWALL").is_empty());

        // Nothing left to undo
        f.engine.clear_journal();
        f.visibility.discard(&f.engine, &f.highlights).await.unwrap();
        assert!(f.engine.journal().is_empty());
    }

    #[tokio::test]
    async fn test_discard_ends_isolation() {
        let mut f = fixture(HeadlessOptions::default()).await;
        f.visibility
            .toggle_isolate(&f.engine, &f.highlights, &f.space)
            .await
            .unwrap();
        assert!(!f.engine.is_visible("proj", ElementId(10)));

        f.visibility.discard(&f.engine, &f.highlights).await.unwrap();
        assert!(f.engine.is_visible("proj", ElementId(10)));
        assert_eq!(f.visibility.state().isolated(), None);
    }
}
