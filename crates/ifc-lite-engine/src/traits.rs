// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine adapter traits
//!
//! These traits define what the orchestration layer needs from a viewer engine.
//! All methods take `&self`; engines keep their mutable state behind interior
//! mutability since everything runs on one event-loop thread.

use crate::{
    BoundingBox, CategoryPattern, ElementId, ElementSelection, EventReceiver, HighlightStyle,
    IdentifierSignal, Material, MaterialId, MaterialState, ModelFormat, ModelHandle, ModelKey,
    Result, Rgb, Sphere,
};
use async_trait::async_trait;
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// One-time world setup passed to [`EngineAdapter::initialize`]
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSetup {
    /// World name
    pub world_name: String,
    /// Scene background color
    pub background: Rgb,
    /// Name of the transient pick-selection style
    pub selection_style_name: String,
    /// Style used for raw pick selection
    pub selection_style: HighlightStyle,
    /// Whether the ground grid starts visible
    pub show_grid: bool,
}

impl Default for EngineSetup {
    fn default() -> Self {
        Self {
            world_name: "Main".to_string(),
            background: Rgb::from_u32(0x1a1d23),
            selection_style_name: "select".to_string(),
            selection_style: HighlightStyle::solid(Rgb::from_u32(0xbcf124)),
            show_grid: true,
        }
    }
}

/// Camera kind
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CameraKind {
    /// Orbit camera that can switch between perspective and orthographic
    #[default]
    OrthoPerspective,
    /// Plain camera with fit support
    Simple,
    /// Any other camera (no fit-to-items support)
    Other,
}

impl CameraKind {
    /// Whether the camera supports fitting to a selection
    pub fn can_fit(&self) -> bool {
        matches!(self, CameraKind::OrthoPerspective | CameraKind::Simple)
    }
}

/// Camera projection mode
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Interactive tools of the main world
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Tool {
    /// Point-to-point length measurement
    Length,
    /// Polygon area measurement
    Area,
    /// Section (clipping plane) tool
    Clipper,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Length, Tool::Area, Tool::Clipper];
}

/// Main engine interface - entry point for the orchestration layer
#[async_trait(?Send)]
pub trait EngineAdapter {
    /// Create the world (scene, renderer, camera, grid) and register the
    /// selection style. Called at most once by the orchestration layer.
    async fn initialize(&self, setup: &EngineSetup) -> Result<()>;

    /// Take the model event stream
    ///
    /// Returns `None` if the stream was already taken.
    fn take_events(&self) -> Option<EventReceiver>;

    /// Decode a model file
    ///
    /// On success the engine emits [`crate::EngineEvent::ModelAdded`]. The
    /// event may arrive after the returned future resolved, so callers wait
    /// on the event stream rather than polling it once. A malformed or
    /// unsupported file is reported as [`crate::EngineError::LoadRejected`]
    /// and no event is emitted.
    async fn load_model(&self, bytes: &[u8], name: &str, format: ModelFormat) -> Result<()>;

    /// Run an engine update pass
    ///
    /// With `force` the engine materializes pending geometry and bounds.
    async fn update(&self, force: bool) -> Result<()>;

    /// Loaded models
    fn models(&self) -> &dyn ModelStore;

    /// Visibility primitives
    fn hider(&self) -> &dyn Hider;

    /// Style registry and highlight primitives
    fn highlighter(&self) -> &dyn Highlighter;

    /// Camera of the main world
    fn camera(&self) -> &dyn CameraControls;

    /// Measurement and section tools
    fn tools(&self) -> &dyn ToolControls;

    /// Show or hide the ground grid
    fn set_grid_visible(&self, visible: bool);

    fn grid_visible(&self) -> bool;

    /// Delete all clipping planes of the main world
    async fn clear_clipping_planes(&self) -> Result<()>;
}

/// Access to loaded models
#[async_trait(?Send)]
pub trait ModelStore {
    /// All loaded models in load order
    fn list(&self) -> Vec<ModelHandle>;

    /// Bind the model to the world camera and clipping planes and add its
    /// scene node to the scene
    fn attach(&self, model: &ModelHandle) -> Result<()>;

    /// Model identifier
    ///
    /// May be `None` for a while after the model was added.
    fn identifier(&self, model: &ModelHandle) -> Option<String>;

    /// One-shot signal fulfilled when the identifier becomes available
    ///
    /// Engines that cannot signal return `None` and are polled instead.
    fn identifier_signal(&self, _model: &ModelHandle) -> Option<IdentifierSignal> {
        None
    }

    /// Bounding box supplied by the engine, if it computed one
    fn bounding_box(&self, model: &ModelHandle) -> Option<BoundingBox>;

    /// Compute the bounding box by traversing the model's scene node
    fn compute_bounding_box(&self, model: &ModelHandle) -> Option<BoundingBox>;

    /// Store a bounding box on the model (replaces the engine-supplied one)
    fn set_bounding_box(&self, model: &ModelHandle, bbox: BoundingBox);

    /// Current translation of the model's scene node
    fn position(&self, model: &ModelHandle) -> Vector3<f64>;

    /// Move the model's scene node by `offset`
    fn translate(&self, model: &ModelHandle, offset: Vector3<f64>) -> Result<()>;

    /// Native type names present in the model (e.g. `IFCWALLSTANDARDCASE`)
    fn native_categories(&self, model: &ModelHandle) -> Result<Vec<String>>;

    /// Element ids of the model grouped by native type name, for every
    /// native name matching one of `patterns`
    async fn elements_by_category_patterns(
        &self,
        model: &ModelHandle,
        patterns: &[CategoryPattern],
    ) -> Result<BTreeMap<String, Vec<ElementId>>>;

    /// Best-effort display names (e.g. the `Name` attribute) for elements
    ///
    /// Elements without a name are simply absent from the result.
    async fn element_names(
        &self,
        model: &ModelHandle,
        ids: &[ElementId],
    ) -> Result<BTreeMap<ElementId, String>>;

    /// Render materials of all loaded models plus engine-owned materials
    fn materials(&self) -> Vec<Material>;

    /// Change a material's appearance
    fn set_material(&self, id: MaterialId, state: &MaterialState) -> Result<()>;

    /// Delete a model; the engine emits [`crate::EngineEvent::ModelRemoved`]
    async fn remove(&self, key: ModelKey) -> Result<()>;
}

/// Visibility primitives
#[async_trait(?Send)]
pub trait Hider {
    /// Set visibility of `selection`, or of everything when `None`
    async fn set_visible(&self, visible: bool, selection: Option<&ElementSelection>)
        -> Result<()>;

    /// Hide everything except `selection`
    async fn isolate(&self, selection: &ElementSelection) -> Result<()>;
}

/// Style registry and highlight primitives
#[async_trait(?Send)]
pub trait Highlighter {
    /// Look up a registered style
    fn style(&self, name: &str) -> Option<HighlightStyle>;

    /// Register or replace a style
    fn set_style(&self, name: &str, style: HighlightStyle);

    /// Names of all registered styles
    fn style_names(&self) -> Vec<String>;

    /// Apply a registered style to `selection`
    ///
    /// * `additive` - keep what the style already highlights
    /// * `exclusive` - remove the selection from every other style
    async fn highlight_by_id(
        &self,
        style: &str,
        selection: &ElementSelection,
        additive: bool,
        exclusive: bool,
    ) -> Result<()>;

    /// Clear applications of one style, or of all styles when `None`
    ///
    /// Style definitions stay registered.
    async fn clear(&self, style: Option<&str>) -> Result<()>;

    /// Elements currently highlighted with `style`
    fn selection(&self, style: &str) -> ElementSelection;

    /// Turn pointer picking on or off
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;
}

/// Camera controls of the main world
#[async_trait(?Send)]
pub trait CameraControls {
    fn kind(&self) -> CameraKind;

    /// Frame a bounding sphere
    async fn fit_to_sphere(&self, sphere: &Sphere, animate: bool) -> Result<()>;

    /// Frame a selection, or all loaded models when `None`
    async fn fit_to_items(&self, selection: Option<&ElementSelection>) -> Result<()>;

    fn projection(&self) -> Projection;

    fn set_projection(&self, projection: Projection);
}

/// Measurement and section tools
///
/// At most one tool is meant to be enabled at a time; the orchestration
/// layer enforces that.
#[async_trait(?Send)]
pub trait ToolControls {
    fn set_tool_enabled(&self, tool: Tool, enabled: bool);

    fn tool_enabled(&self, tool: Tool) -> bool;

    /// Create a clipping plane at the pointer
    async fn create_clipping_plane(&self) -> Result<()>;

    /// Delete the item of `tool` under the pointer
    async fn delete(&self, tool: Tool) -> Result<()>;

    /// Close the area outline being drawn
    async fn end_area(&self) -> Result<()>;
}
