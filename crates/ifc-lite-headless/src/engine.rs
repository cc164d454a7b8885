// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HeadlessEngine - in-memory implementation of the engine traits

use crate::journal::EngineCall;
use crate::options::{HeadlessOptions, IdentifierPolicy};
use crate::scanner::{validate, EntityScanner};

use async_trait::async_trait;
use ifc_lite_engine::{
    event_channel, BoundingBox, CameraControls, CameraKind, CategoryPattern, ElementId,
    ElementSelection, EngineAdapter, EngineError, EngineEvent, EngineSetup, EventReceiver,
    EventSender, Hider, HighlightStyle, Highlighter, IdentifierSignal, Material, MaterialId,
    MaterialState, Measurement, ModelFormat, ModelHandle, ModelKey, ModelStore, Point3,
    Projection, Result, Rgb, Sphere, Tool, ToolControls, Vector3,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Contents of a decoded IFC file
struct DecodedModel {
    /// GlobalId of the IFCPROJECT, if present
    project_guid: Option<String>,
    /// Element ids per native type name
    elements: BTreeMap<String, Vec<ElementId>>,
    /// Name attribute per element
    names: FxHashMap<ElementId, String>,
    /// Box around all cartesian points, in scene (Y-up) coordinates
    geometry: BoundingBox,
    /// Distinct surface colours, in file order
    colours: Vec<Rgb>,
}

impl DecodedModel {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| EngineError::load(format!("file is not valid text: {e}")))?;
        validate(content).map_err(EngineError::load)?;

        let mut project_guid = None;
        let mut elements: BTreeMap<String, Vec<ElementId>> = BTreeMap::new();
        let mut names = FxHashMap::default();
        let mut geometry = BoundingBox::empty();
        let mut colours = Vec::new();

        for entity in EntityScanner::new(content) {
            if let Some([x, y, z]) = entity.cartesian_point() {
                // IFC is Z-up, the scene is Y-up
                geometry.expand(&Point3::new(x, z, -y));
                continue;
            }
            if let Some([r, g, b]) = entity.colour_rgb() {
                let colour = Rgb::new(channel(r), channel(g), channel(b));
                if !colours.contains(&colour) {
                    colours.push(colour);
                }
                continue;
            }

            let type_name = entity.type_name.to_ascii_uppercase();
            if type_name == "IFCPROJECT" && project_guid.is_none() {
                project_guid = entity.string_attribute(0);
            }
            if !is_product(&type_name) || !entity.is_rooted() {
                continue;
            }

            let id = ElementId(entity.id);
            if let Some(name) = entity.string_attribute(2) {
                names.insert(id, name);
            }
            elements.entry(type_name).or_default().push(id);
        }

        Ok(Self {
            project_guid,
            elements,
            names,
            geometry,
            colours,
        })
    }

    fn all_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.values().flatten().copied()
    }
}

/// Material colour of models without surface styles
const DEFAULT_MATERIAL: Rgb = Rgb::from_u32(0xd0d0d0);

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Rooted entities that stand for elements rather than relationships,
/// property definitions or type objects
fn is_product(type_name: &str) -> bool {
    !(type_name.starts_with("IFCREL")
        || type_name.starts_with("IFCPROPERTY")
        || type_name.starts_with("IFCELEMENTQUANTITY")
        || type_name == "IFCPROJECT"
        || type_name.ends_with("TYPE"))
}

struct LoadedModel {
    handle: ModelHandle,
    identifier: String,
    data: DecodedModel,
    attached: bool,
    position: Vector3<f64>,
    engine_bounds: Option<BoundingBox>,
    stored_bounds: Option<BoundingBox>,
    identifier_checks: u32,
    loaded_at: Instant,
}

impl LoadedModel {
    fn identifier_ready_at(&self, policy: IdentifierPolicy) -> Option<Instant> {
        match policy {
            IdentifierPolicy::Signalled(delay) => Some(self.loaded_at + delay),
            _ => None,
        }
    }
}

struct EngineState {
    setup: Option<EngineSetup>,
    next_key: u64,
    models: Vec<LoadedModel>,
    events_tx: EventSender,
    events_rx: Option<EventReceiver>,
    /// Hidden element ids per model identifier
    hidden: FxHashMap<String, BTreeSet<ElementId>>,
    styles: BTreeMap<String, HighlightStyle>,
    /// Current applications per style
    applied: BTreeMap<String, ElementSelection>,
    grid_visible: bool,
    projection: Projection,
    /// Render materials; `owner` is `None` for style materials
    materials: BTreeMap<MaterialId, MaterialEntry>,
    next_material: u32,
    picking: bool,
    tools: BTreeSet<Tool>,
    clipping_planes: usize,
    lengths: usize,
    areas: usize,
    /// Outline of the area being drawn
    area_outline: Vec<Point3<f64>>,
    journal: Vec<EngineCall>,
}

struct MaterialEntry {
    state: MaterialState,
    owner: Option<ModelKey>,
}

impl EngineState {
    fn model(&self, key: ModelKey) -> Result<&LoadedModel> {
        self.models
            .iter()
            .find(|m| m.handle.key == key)
            .ok_or(EngineError::ModelNotFound(key))
    }

    fn model_mut(&mut self, key: ModelKey) -> Result<&mut LoadedModel> {
        self.models
            .iter_mut()
            .find(|m| m.handle.key == key)
            .ok_or(EngineError::ModelNotFound(key))
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.setup.is_none() {
            return Err(EngineError::NotInitialized);
        }
        Ok(())
    }

    fn add_material(&mut self, state: MaterialState, owner: Option<ModelKey>) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(id, MaterialEntry { state, owner });
        id
    }

    /// Register a style; new styles get an engine-owned material
    fn register_style(&mut self, name: &str, style: HighlightStyle) {
        if self.styles.insert(name.to_string(), style).is_none() {
            let state = MaterialState {
                color: style.color,
                transparent: style.transparent,
                opacity: style.opacity,
            };
            self.add_material(state, None);
        }
    }

    fn selection_of_all(&self) -> ElementSelection {
        let mut all = ElementSelection::new();
        for model in &self.models {
            all.extend(model.identifier.clone(), model.data.all_elements());
        }
        all
    }
}

/// Renderer-less engine holding decoded models in memory
///
/// Every visibility, highlight and camera call is appended to a journal that
/// tests can inspect with [`HeadlessEngine::journal`].
pub struct HeadlessEngine {
    options: HeadlessOptions,
    state: RefCell<EngineState>,
}

impl HeadlessEngine {
    /// Create a new engine with default options
    pub fn new() -> Self {
        Self::with_options(HeadlessOptions::default())
    }

    pub fn with_options(options: HeadlessOptions) -> Self {
        let (events_tx, events_rx) = event_channel();
        Self {
            options,
            state: RefCell::new(EngineState {
                setup: None,
                next_key: 1,
                models: Vec::new(),
                events_tx,
                events_rx: Some(events_rx),
                hidden: FxHashMap::default(),
                styles: BTreeMap::new(),
                applied: BTreeMap::new(),
                grid_visible: false,
                projection: Projection::default(),
                materials: BTreeMap::new(),
                next_material: 1,
                picking: true,
                tools: BTreeSet::new(),
                clipping_planes: 0,
                lengths: 0,
                areas: 0,
                area_outline: Vec::new(),
                journal: Vec::new(),
            }),
        }
    }

    pub fn options(&self) -> &HeadlessOptions {
        &self.options
    }

    fn record(&self, call: EngineCall) {
        self.state.borrow_mut().journal.push(call);
    }

    /// All calls made so far
    pub fn journal(&self) -> Vec<EngineCall> {
        self.state.borrow().journal.clone()
    }

    /// Calls matching `filter`
    pub fn calls(&self, filter: impl Fn(&EngineCall) -> bool) -> Vec<EngineCall> {
        self.state
            .borrow()
            .journal
            .iter()
            .filter(|call| filter(call))
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    /// Number of times the identifier of `key` was read
    pub fn identifier_checks(&self, key: ModelKey) -> u32 {
        self.state
            .borrow()
            .model(key)
            .map(|m| m.identifier_checks)
            .unwrap_or(0)
    }

    /// Whether the model was bound to the world
    pub fn is_attached(&self, key: ModelKey) -> bool {
        self.state
            .borrow()
            .model(key)
            .map(|m| m.attached)
            .unwrap_or(false)
    }

    /// Identifier the model will report once it is available
    pub fn pending_identifier(&self, key: ModelKey) -> Option<String> {
        self.state
            .borrow()
            .model(key)
            .ok()
            .map(|m| m.identifier.clone())
    }

    /// Simulate a user pick: replace what the selection style highlights
    pub fn pick(&self, selection: ElementSelection) {
        let mut state = self.state.borrow_mut();
        let name = state
            .setup
            .as_ref()
            .map(|s| s.selection_style_name.clone())
            .unwrap_or_else(|| "select".to_string());
        state.applied.insert(name, selection);
    }

    pub fn is_visible(&self, model_identifier: &str, id: ElementId) -> bool {
        self.state
            .borrow()
            .hidden
            .get(model_identifier)
            .map_or(true, |hidden| !hidden.contains(&id))
    }

    /// Number of hidden elements across all models
    pub fn hidden_count(&self) -> usize {
        self.state.borrow().hidden.values().map(BTreeSet::len).sum()
    }

    /// Number of registered styles
    pub fn style_count(&self) -> usize {
        self.state.borrow().styles.len()
    }

    /// Current appearance of a material
    pub fn material(&self, id: MaterialId) -> Option<MaterialState> {
        self.state.borrow().materials.get(&id).map(|m| m.state)
    }

    pub fn clipping_plane_count(&self) -> usize {
        self.state.borrow().clipping_planes
    }

    pub fn length_count(&self) -> usize {
        self.state.borrow().lengths
    }

    pub fn area_count(&self) -> usize {
        self.state.borrow().areas
    }

    /// Simulate the user measuring from `start` to `end`
    ///
    /// Returns `false` when the length tool is off.
    pub fn measure_length(&self, start: Point3<f64>, end: Point3<f64>) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.tools.contains(&Tool::Length) {
            return false;
        }
        state.lengths += 1;
        let _ = state
            .events_tx
            .send(EngineEvent::MeasurementAdded(Measurement::Length { start, end }));
        true
    }

    /// Simulate the user adding a point to the area outline
    ///
    /// Returns `false` when the area tool is off.
    pub fn add_area_point(&self, point: Point3<f64>) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.tools.contains(&Tool::Area) {
            return false;
        }
        state.area_outline.push(point);
        true
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl EngineAdapter for HeadlessEngine {
    async fn initialize(&self, setup: &EngineSetup) -> Result<()> {
        self.record(EngineCall::Initialize {
            world: setup.world_name.clone(),
        });
        let mut state = self.state.borrow_mut();
        if state.setup.is_some() {
            log::warn!("[Headless] Engine already initialized");
            return Ok(());
        }
        state.register_style(&setup.selection_style_name, setup.selection_style);
        state.grid_visible = setup.show_grid;
        state.setup = Some(setup.clone());
        log::info!("[Headless] World '{}' created", setup.world_name);
        Ok(())
    }

    fn take_events(&self) -> Option<EventReceiver> {
        self.state.borrow_mut().events_rx.take()
    }

    async fn load_model(&self, bytes: &[u8], name: &str, format: ModelFormat) -> Result<()> {
        self.record(EngineCall::LoadModel {
            name: name.to_string(),
            format,
        });
        self.state.borrow().ensure_initialized()?;

        if format == ModelFormat::Fragments {
            return Err(EngineError::load(
                "fragments are not supported by the headless engine",
            ));
        }
        let data = DecodedModel::decode(bytes)?;

        let mut state = self.state.borrow_mut();
        let key = ModelKey(state.next_key);
        state.next_key += 1;

        let handle = ModelHandle::new(key, name);
        let identifier = data
            .project_guid
            .clone()
            .unwrap_or_else(|| format!("{name}-{key}"));

        log::info!(
            "[Headless] Decoded '{}' as {}: {} element types",
            name,
            key,
            data.elements.len()
        );

        if data.colours.is_empty() {
            state.add_material(MaterialState::opaque(DEFAULT_MATERIAL), Some(key));
        }
        for colour in &data.colours {
            state.add_material(MaterialState::opaque(*colour), Some(key));
        }

        state.models.push(LoadedModel {
            handle: handle.clone(),
            identifier,
            data,
            attached: false,
            position: Vector3::zeros(),
            engine_bounds: None,
            stored_bounds: None,
            identifier_checks: 0,
            loaded_at: Instant::now(),
        });
        let event = EngineEvent::ModelAdded(handle);
        match self.options.event_delay {
            Some(delay) => {
                let events_tx = state.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events_tx.send(event);
                });
            }
            // Receiver may be gone; the model is loaded either way
            None => {
                let _ = state.events_tx.send(event);
            }
        }
        Ok(())
    }

    async fn update(&self, force: bool) -> Result<()> {
        self.record(EngineCall::Update { force });
        let mut state = self.state.borrow_mut();
        state.ensure_initialized()?;

        if force && self.options.supply_bounds {
            for model in state.models.iter_mut() {
                if model.engine_bounds.is_none() && !model.data.geometry.is_empty() {
                    model.engine_bounds = Some(model.data.geometry.translated(&model.position));
                }
            }
        }
        Ok(())
    }

    fn models(&self) -> &dyn ModelStore {
        self
    }

    fn hider(&self) -> &dyn Hider {
        self
    }

    fn highlighter(&self) -> &dyn Highlighter {
        self
    }

    fn camera(&self) -> &dyn CameraControls {
        self
    }

    fn tools(&self) -> &dyn ToolControls {
        self
    }

    fn set_grid_visible(&self, visible: bool) {
        self.record(EngineCall::SetGrid(visible));
        self.state.borrow_mut().grid_visible = visible;
    }

    fn grid_visible(&self) -> bool {
        self.state.borrow().grid_visible
    }

    async fn clear_clipping_planes(&self) -> Result<()> {
        self.record(EngineCall::ClearClippingPlanes);
        self.state.borrow_mut().clipping_planes = 0;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ModelStore for HeadlessEngine {
    fn list(&self) -> Vec<ModelHandle> {
        self.state
            .borrow()
            .models
            .iter()
            .map(|m| m.handle.clone())
            .collect()
    }

    fn attach(&self, model: &ModelHandle) -> Result<()> {
        self.record(EngineCall::Attach { model: model.key });
        self.state.borrow_mut().model_mut(model.key)?.attached = true;
        Ok(())
    }

    fn identifier(&self, model: &ModelHandle) -> Option<String> {
        let policy = self.options.identifier;
        let mut state = self.state.borrow_mut();
        let loaded = state.model_mut(model.key).ok()?;
        loaded.identifier_checks += 1;

        let available = match policy {
            IdentifierPolicy::OnCheck(n) => loaded.identifier_checks >= n,
            IdentifierPolicy::Never => false,
            IdentifierPolicy::Signalled(_) => loaded
                .identifier_ready_at(policy)
                .is_some_and(|at| Instant::now() >= at),
        };
        available.then(|| loaded.identifier.clone())
    }

    fn identifier_signal(&self, model: &ModelHandle) -> Option<IdentifierSignal> {
        let policy = self.options.identifier;
        let state = self.state.borrow();
        let loaded = state.model(model.key).ok()?;
        let ready_at = loaded.identifier_ready_at(policy)?;
        let identifier = loaded.identifier.clone();

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep_until(ready_at).await;
            let _ = tx.send(identifier);
        });
        Some(rx)
    }

    fn bounding_box(&self, model: &ModelHandle) -> Option<BoundingBox> {
        let state = self.state.borrow();
        let loaded = state.model(model.key).ok()?;
        loaded.stored_bounds.or(loaded.engine_bounds)
    }

    fn compute_bounding_box(&self, model: &ModelHandle) -> Option<BoundingBox> {
        let state = self.state.borrow();
        let loaded = state.model(model.key).ok()?;
        if loaded.data.geometry.is_empty() {
            return None;
        }
        Some(loaded.data.geometry.translated(&loaded.position))
    }

    fn set_bounding_box(&self, model: &ModelHandle, bbox: BoundingBox) {
        if let Ok(loaded) = self.state.borrow_mut().model_mut(model.key) {
            loaded.stored_bounds = Some(bbox);
        }
    }

    fn position(&self, model: &ModelHandle) -> Vector3<f64> {
        self.state
            .borrow()
            .model(model.key)
            .map(|m| m.position)
            .unwrap_or_else(|_| Vector3::zeros())
    }

    fn translate(&self, model: &ModelHandle, offset: Vector3<f64>) -> Result<()> {
        self.record(EngineCall::Translate {
            model: model.key,
            offset,
        });
        let mut state = self.state.borrow_mut();
        let loaded = state.model_mut(model.key)?;
        loaded.position += offset;
        Ok(())
    }

    fn native_categories(&self, model: &ModelHandle) -> Result<Vec<String>> {
        if self.options.fail_element_queries {
            return Err(EngineError::other("category listing unavailable"));
        }
        let state = self.state.borrow();
        Ok(state.model(model.key)?.data.elements.keys().cloned().collect())
    }

    async fn elements_by_category_patterns(
        &self,
        model: &ModelHandle,
        patterns: &[CategoryPattern],
    ) -> Result<BTreeMap<String, Vec<ElementId>>> {
        self.record(EngineCall::QueryElements {
            model: model.key,
            patterns: patterns.iter().map(|p| p.name().to_string()).collect(),
        });
        if self.options.fail_element_queries {
            return Err(EngineError::other("element query failed"));
        }

        let state = self.state.borrow();
        let loaded = state.model(model.key)?;
        Ok(loaded
            .data
            .elements
            .iter()
            .filter(|(name, _)| patterns.iter().any(|p| p.matches(name)))
            .map(|(name, ids)| (name.clone(), ids.clone()))
            .collect())
    }

    async fn element_names(
        &self,
        model: &ModelHandle,
        ids: &[ElementId],
    ) -> Result<BTreeMap<ElementId, String>> {
        let state = self.state.borrow();
        let loaded = state.model(model.key)?;
        Ok(ids
            .iter()
            .filter_map(|id| loaded.data.names.get(id).map(|name| (*id, name.clone())))
            .collect())
    }

    fn materials(&self) -> Vec<Material> {
        self.state
            .borrow()
            .materials
            .iter()
            .map(|(id, entry)| Material {
                id: *id,
                state: entry.state,
                custom: entry.owner.is_none(),
            })
            .collect()
    }

    fn set_material(&self, id: MaterialId, state: &MaterialState) -> Result<()> {
        self.record(EngineCall::SetMaterial { id, state: *state });
        let mut engine = self.state.borrow_mut();
        let entry = engine
            .materials
            .get_mut(&id)
            .ok_or_else(|| EngineError::other(format!("{id} not found")))?;
        entry.state = *state;
        Ok(())
    }

    async fn remove(&self, key: ModelKey) -> Result<()> {
        self.record(EngineCall::RemoveModel { model: key });
        let mut state = self.state.borrow_mut();
        let index = state
            .models
            .iter()
            .position(|m| m.handle.key == key)
            .ok_or(EngineError::ModelNotFound(key))?;
        let removed = state.models.remove(index);
        state.materials.retain(|_, m| m.owner != Some(key));

        state.hidden.remove(&removed.identifier);
        let gone = ElementSelection::for_model(removed.identifier.clone(), removed.data.all_elements());
        for applied in state.applied.values_mut() {
            applied.subtract(&gone);
        }

        log::info!("[Headless] Removed {}", key);
        let _ = state.events_tx.send(EngineEvent::ModelRemoved(key));
        Ok(())
    }
}

#[async_trait(?Send)]
impl Hider for HeadlessEngine {
    async fn set_visible(
        &self,
        visible: bool,
        selection: Option<&ElementSelection>,
    ) -> Result<()> {
        self.record(EngineCall::SetVisible {
            visible,
            selection: selection.cloned(),
        });
        let mut state = self.state.borrow_mut();
        state.ensure_initialized()?;

        let target = match selection {
            Some(selection) => selection.clone(),
            None => state.selection_of_all(),
        };
        for (model, ids) in target.iter() {
            let hidden = state.hidden.entry(model.to_string()).or_default();
            if visible {
                hidden.retain(|id| !ids.contains(id));
            } else {
                hidden.extend(ids.iter().copied());
            }
        }
        state.hidden.retain(|_, ids| !ids.is_empty());
        Ok(())
    }

    async fn isolate(&self, selection: &ElementSelection) -> Result<()> {
        self.record(EngineCall::Isolate {
            selection: selection.clone(),
        });
        let mut state = self.state.borrow_mut();
        state.ensure_initialized()?;

        let mut hidden = FxHashMap::default();
        for model in &state.models {
            let ids: BTreeSet<ElementId> = model
                .data
                .all_elements()
                .filter(|id| !selection.contains(&model.identifier, *id))
                .collect();
            if !ids.is_empty() {
                hidden.insert(model.identifier.clone(), ids);
            }
        }
        state.hidden = hidden;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Highlighter for HeadlessEngine {
    fn style(&self, name: &str) -> Option<HighlightStyle> {
        self.state.borrow().styles.get(name).copied()
    }

    fn set_style(&self, name: &str, style: HighlightStyle) {
        self.record(EngineCall::SetStyle {
            name: name.to_string(),
            style,
        });
        self.state.borrow_mut().register_style(name, style);
    }

    fn style_names(&self) -> Vec<String> {
        self.state.borrow().styles.keys().cloned().collect()
    }

    async fn highlight_by_id(
        &self,
        style: &str,
        selection: &ElementSelection,
        additive: bool,
        exclusive: bool,
    ) -> Result<()> {
        self.record(EngineCall::Highlight {
            style: style.to_string(),
            selection: selection.clone(),
            additive,
            exclusive,
        });
        let mut state = self.state.borrow_mut();
        if !state.styles.contains_key(style) {
            return Err(EngineError::StyleNotFound(style.to_string()));
        }

        if exclusive {
            for (name, applied) in state.applied.iter_mut() {
                if name != style {
                    applied.subtract(selection);
                }
            }
        }
        let applied = state.applied.entry(style.to_string()).or_default();
        if additive {
            applied.merge(selection);
        } else {
            *applied = selection.clone();
        }
        Ok(())
    }

    async fn clear(&self, style: Option<&str>) -> Result<()> {
        self.record(EngineCall::ClearHighlight {
            style: style.map(str::to_string),
        });
        let mut state = self.state.borrow_mut();
        match style {
            Some(name) => {
                state.applied.remove(name);
            }
            None => state.applied.clear(),
        }
        Ok(())
    }

    fn selection(&self, style: &str) -> ElementSelection {
        self.state
            .borrow()
            .applied
            .get(style)
            .cloned()
            .unwrap_or_default()
    }

    fn set_enabled(&self, enabled: bool) {
        self.record(EngineCall::SetPicking(enabled));
        self.state.borrow_mut().picking = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.state.borrow().picking
    }
}

#[async_trait(?Send)]
impl ToolControls for HeadlessEngine {
    fn set_tool_enabled(&self, tool: Tool, enabled: bool) {
        self.record(EngineCall::SetTool { tool, enabled });
        let mut state = self.state.borrow_mut();
        if enabled {
            state.tools.insert(tool);
        } else {
            state.tools.remove(&tool);
            if tool == Tool::Area {
                state.area_outline.clear();
            }
        }
    }

    fn tool_enabled(&self, tool: Tool) -> bool {
        self.state.borrow().tools.contains(&tool)
    }

    async fn create_clipping_plane(&self) -> Result<()> {
        self.record(EngineCall::CreateClippingPlane);
        let mut state = self.state.borrow_mut();
        state.ensure_initialized()?;
        if !state.tools.contains(&Tool::Clipper) {
            return Err(EngineError::other("clipper is disabled"));
        }
        state.clipping_planes += 1;
        Ok(())
    }

    async fn delete(&self, tool: Tool) -> Result<()> {
        self.record(EngineCall::DeleteToolItem(tool));
        let mut state = self.state.borrow_mut();
        let count = match tool {
            Tool::Length => &mut state.lengths,
            Tool::Area => &mut state.areas,
            Tool::Clipper => &mut state.clipping_planes,
        };
        *count = count.saturating_sub(1);
        Ok(())
    }

    async fn end_area(&self) -> Result<()> {
        self.record(EngineCall::EndArea);
        let mut state = self.state.borrow_mut();
        if state.area_outline.is_empty() {
            return Ok(());
        }
        let outline = std::mem::take(&mut state.area_outline);
        // Fewer than three points enclose nothing
        let bounds = (outline.len() >= 3).then(|| BoundingBox::from_points(&outline));
        state.areas += 1;
        let _ = state
            .events_tx
            .send(EngineEvent::MeasurementAdded(Measurement::Area { bounds }));
        Ok(())
    }
}

#[async_trait(?Send)]
impl CameraControls for HeadlessEngine {
    fn kind(&self) -> CameraKind {
        self.options.camera_kind
    }

    async fn fit_to_sphere(&self, sphere: &Sphere, animate: bool) -> Result<()> {
        self.record(EngineCall::FitToSphere {
            sphere: *sphere,
            animate,
        });
        if self.options.fail_camera_fit {
            return Err(EngineError::camera("controls rejected the fit"));
        }
        if sphere.is_empty() {
            return Err(EngineError::camera("cannot fit to an empty sphere"));
        }
        Ok(())
    }

    async fn fit_to_items(&self, selection: Option<&ElementSelection>) -> Result<()> {
        self.record(EngineCall::FitToItems {
            selection: selection.cloned(),
        });
        if self.options.fail_camera_fit {
            return Err(EngineError::camera("controls rejected the fit"));
        }
        if !self.options.camera_kind.can_fit() {
            return Err(EngineError::camera("camera cannot fit to items"));
        }
        Ok(())
    }

    fn projection(&self) -> Projection {
        self.state.borrow().projection
    }

    fn set_projection(&self, projection: Projection) {
        self.record(EngineCall::SetProjection(projection));
        self.state.borrow_mut().projection = projection;
    }
}
