// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ViewerSession - owns every controller and the engine handle

use crate::categories::CategoryIndex;
use crate::config::SessionConfig;
use crate::ghost_mode::ModelGhostMode;
use crate::highlight::{HighlightManager, SEARCH_STYLE};
use crate::lifecycle::{EngineState, LifecycleController, ModelState};
use crate::registry::{ModelEntry, ModelRegistry};
use crate::search::{SearchEntry, SearchIndex};
use crate::tools::{measurement_sphere, ToolController};
use crate::visibility::{CategoryVisibility, VisibilityController};
use crate::{Result, SessionError};

use ifc_lite_engine::{
    BoundingBox, ElementSelection, EngineAdapter, EngineEvent, EngineSetup, EventReceiver,
    HighlightStyle, Measurement, ModelFormat, ModelHandle, ModelKey, Projection, Rgb, Tool,
};
use std::rc::Rc;
use tokio::time::{timeout_at, Instant};

/// One viewer session over one engine
///
/// All mutation goes through `&mut self`, so a model's lifecycle and the
/// index rebuild that follows always finish before the next call starts.
pub struct ViewerSession {
    engine: Rc<dyn EngineAdapter>,
    events: Option<EventReceiver>,
    config: SessionConfig,
    lifecycle: LifecycleController,
    registry: ModelRegistry,
    categories: CategoryIndex,
    search: SearchIndex,
    visibility: VisibilityController,
    highlights: HighlightManager,
    tools: ToolController,
    model_ghost: ModelGhostMode,
    /// Names of loads that gave up waiting; their models are dropped on arrival
    abandoned: Vec<String>,
}

impl ViewerSession {
    pub fn new(engine: Rc<dyn EngineAdapter>, config: SessionConfig) -> Self {
        let setup = EngineSetup {
            selection_style: HighlightStyle::solid(config.styles.selection),
            ..EngineSetup::default()
        };
        let highlights = HighlightManager::new(setup.selection_style_name.clone());
        let lifecycle = LifecycleController::new(config.lifecycle.clone(), setup);
        let visibility = VisibilityController::new(
            config.styles.clone(),
            config.categories.space_category.clone(),
        );

        Self {
            engine,
            events: None,
            categories: CategoryIndex::empty(config.categories.prefix.clone()),
            search: SearchIndex::empty(&config.search),
            lifecycle,
            registry: ModelRegistry::new(),
            visibility,
            highlights,
            tools: ToolController::new(),
            model_ghost: ModelGhostMode::new(),
            abandoned: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn EngineAdapter {
        self.engine.as_ref()
    }

    /// Set up the engine; repeated calls are no-ops
    pub async fn initialize(&mut self) -> Result<()> {
        let engine = Rc::clone(&self.engine);
        if self.lifecycle.initialize(engine.as_ref()).await? {
            self.events = engine.take_events();
            if self.events.is_none() {
                log::warn!("[Session] Engine event stream already taken");
            }
        }
        Ok(())
    }

    pub fn engine_state(&self) -> EngineState {
        self.lifecycle.engine_state()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.lifecycle.engine_state() != EngineState::Ready {
            return Err(SessionError::NotInitialized);
        }
        Ok(())
    }

    fn ensure_model(&self) -> Result<()> {
        self.ensure_ready()?;
        if self.registry.current_model().is_none() {
            return Err(SessionError::NoActiveModel);
        }
        Ok(())
    }

    /// Decode a file and run the resulting model through its lifecycle
    ///
    /// The model name is the file name without its extension. Returns the
    /// key of the new model once it is ready and indexed. The engine may
    /// announce the model after its load call returned; the session waits
    /// for that up to `load_event_timeout_ms`.
    pub async fn load_model(
        &mut self,
        bytes: &[u8],
        file_name: &str,
        format: ModelFormat,
    ) -> Result<ModelKey> {
        self.ensure_ready()?;
        let name = format.model_name(file_name);
        let engine = Rc::clone(&self.engine);

        self.registry.begin_load(name.clone());
        log::info!("[Session] Loading '{}' ({:?})", name, format);

        if let Err(e) = engine.load_model(bytes, &name, format).await {
            self.registry.end_load();
            let err = SessionError::load(&name, e.to_string());
            log::error!("[Session] {}", err);
            return Err(err);
        }

        let added = self.await_model(&name).await;
        self.registry.end_load();
        if let Err(e) = &added {
            log::error!("[Session] {}", e);
        }
        added
    }

    /// Handle engine events until the model called `name` is added
    async fn await_model(&mut self, name: &str) -> Result<ModelKey> {
        let deadline = Instant::now() + self.config.lifecycle.load_event_timeout();
        loop {
            let Some(events) = self.events.as_mut() else {
                return Err(SessionError::load(name, "engine event stream unavailable"));
            };
            let next = timeout_at(deadline, events.recv()).await;
            match next {
                Ok(Some(event)) => {
                    if let Some(handle) = self.handle_event(event).await {
                        if handle.name == name {
                            return Ok(handle.key);
                        }
                    }
                }
                Ok(None) => return Err(SessionError::load(name, "engine event stream closed")),
                Err(_) => {
                    self.abandoned.push(name.to_string());
                    return Err(SessionError::load(name, "engine reported no model in time"));
                }
            }
        }
    }

    /// Process queued engine events in order
    ///
    /// Returns the keys of models added by these events.
    pub async fn pump_events(&mut self) -> Result<Vec<ModelKey>> {
        self.ensure_ready()?;
        let mut added = Vec::new();
        loop {
            let event = match self.events.as_mut() {
                Some(events) => match events.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
                None => break,
            };
            if let Some(handle) = self.handle_event(event).await {
                added.push(handle.key);
            }
        }
        Ok(added)
    }

    /// Returns the handle of a model the event registered
    async fn handle_event(&mut self, event: EngineEvent) -> Option<ModelHandle> {
        match event {
            EngineEvent::ModelAdded(handle) => {
                if let Some(index) = self.abandoned.iter().position(|n| *n == handle.name) {
                    self.abandoned.remove(index);
                    self.drop_abandoned(&handle).await;
                    return None;
                }
                self.model_added(handle.clone()).await;
                Some(handle)
            }
            EngineEvent::ModelRemoved(key) => {
                self.model_removed(key).await;
                None
            }
            EngineEvent::MeasurementAdded(measurement) => {
                self.measurement_added(&measurement).await;
                None
            }
        }
    }

    /// A model whose load already failed showed up late
    async fn drop_abandoned(&self, handle: &ModelHandle) {
        log::warn!(
            "[Session] '{}' arrived after its load gave up, removing it",
            handle.name
        );
        if let Err(e) = self.engine.models().remove(handle.key).await {
            log::warn!("[Session] Removing {} failed: {}", handle.key, e);
        }
    }

    async fn measurement_added(&self, measurement: &Measurement) {
        let Some(sphere) = measurement_sphere(measurement) else {
            return;
        };
        let camera = self.engine.camera();
        if !camera.kind().can_fit() {
            return;
        }
        if let Err(e) = camera
            .fit_to_sphere(&sphere, self.config.lifecycle.animate_camera)
            .await
        {
            log::warn!("[Tools] Framing measurement failed: {}", e);
        }
    }

    async fn model_added(&mut self, handle: ModelHandle) {
        let engine = Rc::clone(&self.engine);
        let prepared = self
            .lifecycle
            .prepare(engine.as_ref(), &mut self.registry, &handle)
            .await;
        self.registry
            .publish_ready(handle.key, prepared.identifier, prepared.degraded);
        log::info!(
            "[Session] Model '{}' ready{}",
            handle.name,
            if prepared.degraded { " (degraded)" } else { "" }
        );
        self.rebuild_indexes().await;
    }

    async fn model_removed(&mut self, key: ModelKey) {
        log::info!("[Session] Model {} removed", key);
        if self.registry.remove(key) {
            self.rebuild_indexes().await;
        }
    }

    /// Discard and rebuild category, search and visibility data for the
    /// current model
    async fn rebuild_indexes(&mut self) {
        let engine = Rc::clone(&self.engine);
        if let Err(e) = self
            .visibility
            .discard(engine.as_ref(), &self.highlights)
            .await
        {
            log::warn!("[Visibility] Undoing category state failed: {}", e);
        }

        let Some(current) = self.registry.current_model() else {
            self.categories = CategoryIndex::empty(self.config.categories.prefix.clone());
            self.search = SearchIndex::empty(&self.config.search);
            return;
        };
        let handle = current.handle.clone();
        let identifier = current.identifier.clone();

        self.categories = match CategoryIndex::build(
            engine.as_ref(),
            &handle,
            &identifier,
            &self.config.categories,
        )
        .await
        {
            Ok(index) => index,
            Err(e) => {
                log::warn!("[Categories] Indexing '{}' failed: {}", handle.name, e);
                CategoryIndex::empty(self.config.categories.prefix.clone())
            }
        };
        self.search =
            SearchIndex::build(engine.as_ref(), &handle, &self.categories, &self.config.search)
                .await;
    }

    /// Re-run the category indexer for the current model
    pub async fn refresh_categories(&mut self) -> Result<()> {
        self.ensure_model()?;
        self.rebuild_indexes().await;
        Ok(())
    }

    pub fn current_model(&self) -> Option<&ModelEntry> {
        self.registry.current_model()
    }

    pub fn model_ready(&self) -> bool {
        self.registry.model_ready()
    }

    /// Identifier of the current model, empty if there is none
    pub fn identifier(&self) -> &str {
        self.registry.identifier()
    }

    pub fn model_state(&self, key: ModelKey) -> ModelState {
        self.registry
            .get(key)
            .map_or(ModelState::NotLoaded, |entry| entry.state)
    }

    /// State of a model by name, including a load still in the engine
    pub fn model_state_by_name(&self, name: &str) -> ModelState {
        self.registry.state_of(name)
    }

    /// Loaded models whose name contains `filter`
    pub fn models(&self, filter: &str) -> Vec<&ModelEntry> {
        self.registry.models(filter)
    }

    /// Delete a model through the engine
    pub async fn remove_model(&mut self, key: ModelKey) -> Result<()> {
        self.ensure_ready()?;
        self.engine.models().remove(key).await?;
        self.pump_events().await?;
        Ok(())
    }

    /// Canonical categories of the current model, sorted
    pub fn available_categories(&self) -> Vec<String> {
        self.categories.available()
    }

    /// Element count per available category
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        self.categories.counts()
    }

    pub fn category_index(&self) -> &CategoryIndex {
        &self.categories
    }

    pub fn category_state(&self, category: &str) -> CategoryVisibility {
        match self.categories.get(category) {
            Some(entry) => self.visibility.state().get(&entry.name),
            None => CategoryVisibility::Normal,
        }
    }

    pub fn is_isolated(&self, category: &str) -> bool {
        self.category_state(category) == CategoryVisibility::Isolated
    }

    pub fn is_hidden(&self, category: &str) -> bool {
        self.category_state(category) == CategoryVisibility::Hidden
    }

    pub fn is_ghosted(&self, category: &str) -> bool {
        self.category_state(category) == CategoryVisibility::Ghosted
    }

    pub fn search(&self, query: &str) -> Vec<SearchEntry> {
        self.search.query(query)
    }

    /// Highlight a whole category in the search color and frame it
    pub async fn select_category(&mut self, category: &str) -> Result<()> {
        self.ensure_model()?;
        let Some(entry) = self.categories.get(category) else {
            log::debug!("[Search] Unknown category '{}'", category);
            return Ok(());
        };
        let selection = entry.elements.clone();
        self.highlight_and_frame(&selection).await
    }

    /// Highlight what a search result stands for and frame it
    pub async fn select_search_result(&mut self, entry: &SearchEntry) -> Result<()> {
        self.ensure_model()?;
        let Some(selection) = self.search.selection_for(entry, &self.categories) else {
            log::debug!("[Search] Nothing to select for '{}'", entry.display_name);
            return Ok(());
        };
        self.highlight_and_frame(&selection).await
    }

    async fn highlight_and_frame(&self, selection: &ElementSelection) -> Result<()> {
        let engine = self.engine.as_ref();
        self.highlights
            .apply(
                engine,
                self.config.styles.search,
                Some(SEARCH_STYLE),
                selection,
                true,
                true,
            )
            .await?;

        let camera = engine.camera();
        if camera.kind().can_fit() {
            if let Err(e) = camera.fit_to_items(Some(selection)).await {
                log::warn!("[Search] Camera fit failed: {}", e);
            }
        }
        Ok(())
    }

    pub async fn toggle_isolate(&mut self, category: &str) -> Result<CategoryVisibility> {
        self.ensure_model()?;
        let Some(entry) = self.categories.get(category) else {
            return Ok(CategoryVisibility::Normal);
        };
        Ok(self
            .visibility
            .toggle_isolate(self.engine.as_ref(), &self.highlights, entry)
            .await?)
    }

    pub async fn toggle_hide(&mut self, category: &str) -> Result<CategoryVisibility> {
        self.ensure_model()?;
        let Some(entry) = self.categories.get(category) else {
            return Ok(CategoryVisibility::Normal);
        };
        Ok(self
            .visibility
            .toggle_hide(self.engine.as_ref(), &self.highlights, entry)
            .await?)
    }

    pub async fn toggle_ghost(&mut self, category: &str) -> Result<CategoryVisibility> {
        self.ensure_model()?;
        let Some(entry) = self.categories.get(category) else {
            return Ok(CategoryVisibility::Normal);
        };
        Ok(self
            .visibility
            .toggle_ghost(self.engine.as_ref(), &self.highlights, entry)
            .await?)
    }

    /// Show everything and frame all loaded models
    pub async fn show_all(&mut self) -> Result<()> {
        self.ensure_model()?;
        let engine = self.engine.as_ref();
        let models = engine.models();
        let bounds = models
            .list()
            .iter()
            .filter_map(|handle| models.bounding_box(handle))
            .fold(BoundingBox::empty(), |acc, bbox| acc.union(&bbox));
        let fit = (!bounds.is_empty()).then(|| bounds.bounding_sphere());

        Ok(self
            .visibility
            .show_all(
                engine,
                &self.highlights,
                fit,
                self.config.lifecycle.animate_camera,
            )
            .await?)
    }

    /// Flip the ground grid; returns whether it is now visible
    pub fn toggle_grid(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        let visible = !self.engine.grid_visible();
        self.engine.set_grid_visible(visible);
        Ok(visible)
    }

    /// Frame the picked elements, or everything when nothing is picked
    ///
    /// Does nothing on cameras that cannot fit.
    pub async fn focus_selection(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let engine = self.engine.as_ref();
        let camera = engine.camera();
        if !camera.kind().can_fit() {
            return Ok(());
        }
        let picked = self.highlights.picked(engine);
        let target = (!picked.is_empty()).then_some(&picked);
        if let Err(e) = camera.fit_to_items(target).await {
            log::warn!("[Session] Focus failed: {}", e);
        }
        Ok(())
    }

    pub async fn hide_selection(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let engine = self.engine.as_ref();
        let picked = self.highlights.picked(engine);
        if picked.is_empty() {
            return Ok(());
        }
        Ok(engine.hider().set_visible(false, Some(&picked)).await?)
    }

    pub async fn isolate_selection(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let engine = self.engine.as_ref();
        let picked = self.highlights.picked(engine);
        if picked.is_empty() {
            return Ok(());
        }
        Ok(engine.hider().isolate(&picked).await?)
    }

    /// Paint the picked elements with `color` and drop the pick
    pub async fn colorize_selection(&mut self, color: Rgb) -> Result<()> {
        self.ensure_ready()?;
        let engine = self.engine.as_ref();
        let picked = self.highlights.picked(engine);
        if picked.is_empty() {
            return Ok(());
        }
        self.highlights
            .apply(engine, color, None, &picked, false, false)
            .await?;
        Ok(())
    }

    /// Switch a measurement or section tool; returns whether it is now on
    ///
    /// Tools are exclusive, and picking is off while one is on.
    pub async fn toggle_tool(&mut self, tool: Tool) -> Result<bool> {
        self.ensure_ready()?;
        Ok(self
            .tools
            .toggle(self.engine.as_ref(), &self.highlights, tool)
            .await?)
    }

    pub fn active_tool(&self) -> Option<Tool> {
        self.tools.active()
    }

    /// Delete the section plane and length measurement under the pointer
    pub async fn delete_tool_items(&mut self) -> Result<()> {
        self.ensure_ready()?;
        Ok(self.tools.delete_at_pointer(self.engine.as_ref()).await?)
    }

    /// Close the area being measured and frame it
    pub async fn finish_area(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.tools.finish_area(self.engine.as_ref()).await?;
        self.pump_events().await?;
        Ok(())
    }

    /// Add a section plane at the pointer; returns `false` unless the
    /// section tool is on
    pub async fn create_section(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        Ok(self.tools.create_section(self.engine.as_ref()).await?)
    }

    /// Turn every model material translucent, or restore them
    pub fn toggle_model_ghost(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        Ok(self
            .model_ghost
            .toggle(self.engine.as_ref(), &self.config.styles.model_ghost)?)
    }

    pub fn is_model_ghosted(&self) -> bool {
        self.model_ghost.is_active()
    }

    pub fn projection(&self) -> Projection {
        self.engine.camera().projection()
    }

    pub fn set_projection(&mut self, projection: Projection) -> Result<()> {
        self.ensure_ready()?;
        self.engine.camera().set_projection(projection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_lite_engine::{CameraKind, ElementId, Highlighter, ModelStore, Point3, Sphere};
    use ifc_lite_headless::{EngineCall, HeadlessEngine, HeadlessOptions, IdentifierPolicy};
    use std::time::Duration;
    use tokio::time::Instant;

    const HOUSE: &str = r#"ISO-10303-21;
HEADER;
FILE_NAME('house.ifc','2024-01-01T00:00:00',(''),(''),'','','');
ENDSEC;
DATA;
#1=IFCPROJECT('house-guid',$,'House',$,$,$,$,$,$);
#10=IFCWALL('w1',$,'North wall',$,$,$,$,$);
#11=IFCWALL('w2',$,'South wall',$,$,$,$,$);
#12=IFCWALLSTANDARDCASE('w3',$,'East wall',$,$,$,$,$);
#20=IFCDOOR('d1',$,'Front door',$,$,$,$,$);
#30=IFCSPACE('s1',$,'Kitchen',$,$,$,$,$,$,$,$);
#31=IFCSPACE('s2',$,'Hall',$,$,$,$,$,$,$,$);
#40=IFCFURNISHINGELEMENT('f1',$,'Table',$,$,$,$,$);
#50=IFCCARTESIANPOINT((0.0,0.0,-1.0));
#51=IFCCARTESIANPOINT((8.0,6.0,3.0));
ENDSEC;
END-ISO-10303-21;
"#;

    const SHED: &str = r#"ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1=IFCPROJECT('shed-guid',$,'Shed',$,$,$,$,$,$);
#10=IFCROOF('r1',$,'Roof',$,$,$,$,$,$);
#11=IFCSLAB('s1',$,'Floor',$,$,$,$,$,$);
#50=IFCCARTESIANPOINT((20.0,0.0,0.0));
#51=IFCCARTESIANPOINT((24.0,3.0,2.5));
ENDSEC;
END-ISO-10303-21;
"#;

    async fn session_with(options: HeadlessOptions) -> (Rc<HeadlessEngine>, ViewerSession) {
        session_with_config(options, SessionConfig::default()).await
    }

    async fn session_with_config(
        options: HeadlessOptions,
        config: SessionConfig,
    ) -> (Rc<HeadlessEngine>, ViewerSession) {
        let engine = Rc::new(HeadlessEngine::with_options(options));
        let mut session = ViewerSession::new(engine.clone(), config);
        session.initialize().await.unwrap();
        (engine, session)
    }

    async fn with_house(options: HeadlessOptions) -> (Rc<HeadlessEngine>, ViewerSession) {
        let (engine, mut session) = session_with(options).await;
        session
            .load_model(HOUSE.as_bytes(), "House.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        (engine, session)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_initialize_twice() {
        let (engine, mut session) = session_with(HeadlessOptions::default()).await;
        session.initialize().await.unwrap();

        assert_eq!(session.engine_state(), EngineState::Ready);
        let inits = engine.calls(|c| matches!(c, EngineCall::Initialize { .. }));
        assert_eq!(inits.len(), 1);
        let select = engine.style("select").unwrap();
        assert_eq!(select.color, Rgb::from_u32(0xbcf124));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_load_requires_initialize() {
        let engine = Rc::new(HeadlessEngine::new());
        let mut session = ViewerSession::new(engine, SessionConfig::default());
        let result = session
            .load_model(HOUSE.as_bytes(), "House.ifc", ModelFormat::Ifc)
            .await;
        assert!(matches!(result, Err(SessionError::NotInitialized)));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_load_publishes_ready_model() {
        let (engine, session) = with_house(HeadlessOptions::default()).await;

        let current = session.current_model().unwrap();
        assert_eq!(current.name(), "House");
        assert_eq!(current.state, ModelState::Ready { degraded: false });
        assert!(session.model_ready());
        assert_eq!(session.identifier(), "house-guid");
        assert!(engine.is_attached(current.key()));

        assert_eq!(
            session.available_categories(),
            vec!["IFCDOOR", "IFCSPACE", "IFCWALL"]
        );
        assert_eq!(
            session.category_index().get("IFCWALL").unwrap().count(),
            3
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_load_failure_registers_nothing() {
        let (_engine, mut session) = session_with(HeadlessOptions::default()).await;
        let err = session
            .load_model(b"PK\x03\x04 zip archive", "broken.ifc", ModelFormat::Ifc)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Load { ref name, .. } if name == "broken"));
        assert!(err.user_message().is_some());
        assert!(session.models("").is_empty());
        assert!(session.current_model().is_none());
        assert!(!session.model_ready());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_fragments_name_and_rejection() {
        let (engine, mut session) = session_with(HeadlessOptions::default()).await;
        let err = session
            .load_model(b"\x00\x01", "tower.frag", ModelFormat::Fragments)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Load { ref name, .. } if name == "tower"));
        assert!(engine.journal().contains(&EngineCall::LoadModel {
            name: "tower".to_string(),
            format: ModelFormat::Fragments,
        }));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_degraded_model_still_works() {
        let options = HeadlessOptions::new().with_identifier(IdentifierPolicy::Never);
        let start = Instant::now();
        let (engine, mut session) = with_house(options).await;

        let current = session.current_model().unwrap();
        assert!(current.state.is_degraded());
        assert!(session.model_ready());
        assert_eq!(session.identifier(), "");
        assert!(start.elapsed() < Duration::from_secs(6));

        // Selections are keyed by the empty identifier, which matches no
        // engine model, so the door stays on screen
        engine.clear_journal();
        session.toggle_hide("IFCDOOR").await.unwrap();
        assert!(session.is_hidden("IFCDOOR"));
        assert!(engine.journal().contains(&EngineCall::SetVisible {
            visible: false,
            selection: Some(ElementSelection::for_model("", [ElementId(20)])),
        }));
        assert!(engine.is_visible("house-guid", ElementId(20)));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_late_identifier_is_not_lost() {
        let options = HeadlessOptions::new().with_identifier(IdentifierPolicy::OnCheck(12));
        let (_engine, session) = with_house(options).await;
        assert_eq!(session.identifier(), "house-guid");
        assert!(!session.current_model().unwrap().state.is_degraded());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_indexing_failure_degrades_to_empty() {
        let (_engine, session) =
            with_house(HeadlessOptions::new().with_failing_queries(true)).await;
        assert!(session.model_ready());
        assert!(session.available_categories().is_empty());
        assert!(session.search("wall").is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_toggles_without_model() {
        let (_engine, mut session) = session_with(HeadlessOptions::default()).await;
        assert!(matches!(
            session.toggle_isolate("IFCWALL").await,
            Err(SessionError::NoActiveModel)
        ));
        assert!(matches!(
            session.show_all().await,
            Err(SessionError::NoActiveModel)
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_visibility_through_session() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;

        session.toggle_ghost("space").await.unwrap();
        assert!(session.is_ghosted("IFCSPACE"));
        let style = engine.style("ghost-IFCSPACE").unwrap();
        assert_eq!(style.color, Rgb::from_u32(0x00ff00));

        session.toggle_isolate("IFCWALL").await.unwrap();
        assert!(session.is_isolated("WALL"));
        assert!(!session.is_ghosted("IFCSPACE"));

        session.toggle_isolate("IFCDOOR").await.unwrap();
        assert!(session.is_isolated("IFCDOOR"));
        assert!(!session.is_isolated("IFCWALL"));

        // Unknown categories are ignored
        let state = session.toggle_hide("IFCROOF").await.unwrap();
        assert_eq!(state, CategoryVisibility::Normal);

        session.show_all().await.unwrap();
        for category in session.available_categories() {
            assert_eq!(session.category_state(&category), CategoryVisibility::Normal);
        }
        assert_eq!(engine.hidden_count(), 0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_show_all_frames_every_model() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        session
            .load_model(SHED.as_bytes(), "shed.IFC", ModelFormat::Ifc)
            .await
            .unwrap();
        engine.clear_journal();

        session.show_all().await.unwrap();

        let house = engine.bounding_box(&engine.list()[0]).unwrap();
        let shed = engine.bounding_box(&engine.list()[1]).unwrap();
        let sphere = house.union(&shed).bounding_sphere();
        assert!(engine.journal().contains(&EngineCall::FitToSphere {
            sphere,
            animate: true
        }));
        assert!(engine.journal().contains(&EngineCall::ClearClippingPlanes));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_new_model_rebuilds_indexes() {
        let (_engine, mut session) = with_house(HeadlessOptions::default()).await;
        session.toggle_hide("IFCWALL").await.unwrap();

        let key = session
            .load_model(SHED.as_bytes(), "shed.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        assert_eq!(session.current_model().unwrap().key(), key);
        assert_eq!(session.identifier(), "shed-guid");
        assert_eq!(session.available_categories(), vec!["IFCROOF", "IFCSLAB"]);
        assert!(!session.is_hidden("IFCWALL"));
        assert!(session.search("wall").is_empty());
        assert_eq!(session.models("").len(), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_remove_model_falls_back() {
        let (_engine, mut session) = with_house(HeadlessOptions::default()).await;
        let house = session.current_model().unwrap().key();
        let shed = session
            .load_model(SHED.as_bytes(), "shed.ifc", ModelFormat::Ifc)
            .await
            .unwrap();

        session.remove_model(shed).await.unwrap();
        assert_eq!(session.current_model().unwrap().key(), house);
        assert_eq!(session.model_state(shed), ModelState::NotLoaded);
        assert!(session.available_categories().contains(&"IFCWALL".to_string()));

        session.remove_model(house).await.unwrap();
        assert!(session.current_model().is_none());
        assert!(session.available_categories().is_empty());
        assert!(!session.model_ready());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_search_and_select() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        assert!(session.search("").is_empty());

        let results = session.search("wall");
        assert_eq!(results[0].display_name, "WALL (3)");

        let south = results
            .iter()
            .find(|r| r.display_name == "South wall")
            .unwrap()
            .clone();
        session.select_search_result(&south).await.unwrap();
        let highlighted = engine.selection(SEARCH_STYLE);
        assert_eq!(highlighted, ElementSelection::for_model("house-guid", [ElementId(11)]));
        assert_eq!(engine.style(SEARCH_STYLE).unwrap().color, Rgb::from_u32(0xff0000));
        assert_eq!(
            engine.calls(EngineCall::is_camera_fit).last(),
            Some(&EngineCall::FitToItems {
                selection: Some(highlighted)
            })
        );

        // Additive: selecting the category keeps the element
        session.select_category("IFCDOOR").await.unwrap();
        assert_eq!(engine.selection(SEARCH_STYLE).len(), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_select_skips_fit_on_other_cameras() {
        let (engine, mut session) =
            with_house(HeadlessOptions::new().with_camera(CameraKind::Other)).await;
        engine.clear_journal();
        session.select_category("IFCWALL").await.unwrap();
        assert!(engine.calls(EngineCall::is_camera_fit).is_empty());
        assert_eq!(engine.selection(SEARCH_STYLE).len(), 3);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_selection_workflows() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        let picked = ElementSelection::for_model("house-guid", [ElementId(10), ElementId(20)]);

        // Nothing picked: no-ops
        engine.clear_journal();
        session.hide_selection().await.unwrap();
        session.isolate_selection().await.unwrap();
        session.colorize_selection(Rgb::from_u32(0x3366ff)).await.unwrap();
        assert!(engine.journal().is_empty());

        engine.pick(picked.clone());
        session.focus_selection().await.unwrap();
        assert!(engine.journal().contains(&EngineCall::FitToItems {
            selection: Some(picked.clone())
        }));

        session.hide_selection().await.unwrap();
        assert!(!engine.is_visible("house-guid", ElementId(10)));

        session.colorize_selection(Rgb::from_u32(0x3366ff)).await.unwrap();
        assert_eq!(engine.selection("#3366ff"), picked);
        assert!(engine.selection("select").is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_focus_without_pick_frames_everything() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        session.focus_selection().await.unwrap();
        assert_eq!(
            engine.calls(EngineCall::is_camera_fit).last(),
            Some(&EngineCall::FitToItems { selection: None })
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_grid_and_projection() {
        let (engine, mut session) = session_with(HeadlessOptions::default()).await;
        assert!(engine.grid_visible());
        assert!(!session.toggle_grid().unwrap());
        assert!(session.toggle_grid().unwrap());

        session.set_projection(Projection::Orthographic).unwrap();
        assert_eq!(session.projection(), Projection::Orthographic);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_models_filter() {
        let (_engine, mut session) = with_house(HeadlessOptions::default()).await;
        session
            .load_model(SHED.as_bytes(), "Garden-Shed.ifc", ModelFormat::Ifc)
            .await
            .unwrap();

        let names: Vec<&str> = session.models("shed").iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Garden-Shed"]);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_load_waits_for_late_model_event() {
        let options = HeadlessOptions::new().with_event_delay(Duration::from_millis(50));
        let (_engine, mut session) = session_with(options).await;

        let key = session
            .load_model(HOUSE.as_bytes(), "House.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        assert_eq!(session.current_model().unwrap().key(), key);
        assert!(session.model_ready());
        assert_eq!(session.identifier(), "house-guid");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_model_arriving_after_timeout_is_dropped() {
        let mut config = SessionConfig::default();
        config.lifecycle.load_event_timeout_ms = 100;
        let options = HeadlessOptions::new().with_event_delay(Duration::from_millis(500));
        let (engine, mut session) = session_with_config(options, config).await;

        let err = session
            .load_model(HOUSE.as_bytes(), "House.ifc", ModelFormat::Ifc)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Load { ref name, .. } if name == "House"));
        assert_eq!(session.model_state_by_name("House"), ModelState::NotLoaded);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(session.pump_events().await.unwrap().is_empty());
        session.pump_events().await.unwrap();

        assert!(session.models("").is_empty());
        assert!(session.current_model().is_none());
        assert!(engine.list().is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_state_by_name_follows_load() {
        let (_engine, mut session) = session_with(HeadlessOptions::default()).await;
        assert_eq!(session.model_state_by_name("House"), ModelState::NotLoaded);
        session
            .load_model(HOUSE.as_bytes(), "House.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        assert_eq!(
            session.model_state_by_name("House"),
            ModelState::Ready { degraded: false }
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_removing_model_ends_its_isolation() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        let shed = session
            .load_model(SHED.as_bytes(), "shed.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        session.toggle_isolate("IFCROOF").await.unwrap();
        assert!(!engine.is_visible("house-guid", ElementId(10)));

        session.remove_model(shed).await.unwrap();
        assert_eq!(session.identifier(), "house-guid");
        assert!(engine.is_visible("house-guid", ElementId(10)));
        assert_eq!(engine.hidden_count(), 0);
        for category in session.available_categories() {
            assert_eq!(session.category_state(&category), CategoryVisibility::Normal);
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_new_model_clears_category_ghosts() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        session.toggle_ghost("IFCWALL").await.unwrap();
        session.toggle_hide("IFCDOOR").await.unwrap();
        assert!(!engine.selection("ghost-IFCWALL").is_empty());

        session
            .load_model(SHED.as_bytes(), "shed.ifc", ModelFormat::Ifc)
            .await
            .unwrap();
        assert!(engine.selection("ghost-IFCWALL").is_empty());
        assert!(engine.is_visible("house-guid", ElementId(20)));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_measurements_frame_the_camera() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;

        assert!(session.toggle_tool(Tool::Length).await.unwrap());
        assert_eq!(session.active_tool(), Some(Tool::Length));
        assert!(engine.measure_length(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 9.0)));
        session.pump_events().await.unwrap();
        assert_eq!(
            engine.calls(EngineCall::is_camera_fit).last(),
            Some(&EngineCall::FitToSphere {
                sphere: Sphere::new(Point3::new(0.0, 0.0, 4.5), 3.0),
                animate: true
            })
        );

        // Switching tools turns length off
        assert!(session.toggle_tool(Tool::Area).await.unwrap());
        assert!(!engine.measure_length(Point3::origin(), Point3::new(1.0, 0.0, 0.0)));
        let outline = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 2.0),
        ];
        for point in outline {
            assert!(engine.add_area_point(point));
        }
        session.finish_area().await.unwrap();
        let bounds = BoundingBox::from_points(&outline);
        assert_eq!(
            engine.calls(EngineCall::is_camera_fit).last(),
            Some(&EngineCall::FitToSphere {
                sphere: bounds.bounding_sphere(),
                animate: true
            })
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_section_tool() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        assert!(!session.create_section().await.unwrap());

        session.toggle_tool(Tool::Clipper).await.unwrap();
        assert!(!Highlighter::is_enabled(&*engine));
        assert!(session.create_section().await.unwrap());
        assert_eq!(engine.clipping_plane_count(), 1);

        session.delete_tool_items().await.unwrap();
        assert_eq!(engine.clipping_plane_count(), 0);

        assert!(!session.toggle_tool(Tool::Clipper).await.unwrap());
        assert_eq!(session.active_tool(), None);
        assert!(Highlighter::is_enabled(&*engine));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_model_ghost_mode() {
        let (engine, mut session) = with_house(HeadlessOptions::default()).await;
        let before = engine.materials();

        assert!(session.toggle_model_ghost().unwrap());
        assert!(session.is_model_ghosted());
        for material in engine.materials().into_iter().filter(|m| !m.custom) {
            assert!(material.state.transparent);
            assert_eq!(material.state.opacity, 0.05);
        }

        assert!(!session.toggle_model_ghost().unwrap());
        assert_eq!(engine.materials(), before);
    }
}
