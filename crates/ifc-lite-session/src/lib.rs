// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Session - Viewer orchestration over an engine adapter
//!
//! Sits between a viewer UI and any engine implementing the
//! `ifc-lite-engine` traits. The session drives each loaded model through
//! its lifecycle, indexes its elements by category, and keeps the
//! per-category visibility state machine and search index in sync with the
//! current model.
//!
//! # Components
//!
//! - [`LifecycleController`] - Engine readiness and model preparation
//! - [`ModelRegistry`] - Loaded models and the current one
//! - [`CategoryIndex`] - Native types grouped into canonical categories
//! - [`VisibilityController`] - Isolate / hide / ghost per category
//! - [`SearchIndex`] - Category and element lookup
//! - [`HighlightManager`] - Highlight style reuse and transient selection
//! - [`ToolController`] - Measurement and section tools
//! - [`ModelGhostMode`] - Whole-model translucency
//!
//! [`ViewerSession`] owns all of them.
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_session::{SessionConfig, ViewerSession};
//!
//! let mut session = ViewerSession::new(engine, SessionConfig::default());
//! session.initialize().await?;
//! session.load_model(&bytes, "house.ifc", ModelFormat::Ifc).await?;
//!
//! session.toggle_isolate("IFCWALL").await?;
//! for hit in session.search("door") {
//!     println!("{}", hit.display_name);
//! }
//! ```

pub mod categories;
pub mod config;
pub mod error;
pub mod ghost_mode;
pub mod highlight;
pub mod lifecycle;
pub mod registry;
pub mod search;
pub mod session;
pub mod tools;
pub mod visibility;

pub use categories::{CategoryEntry, CategoryIndex};
pub use config::{
    CategoryConfig, GhostTint, LifecycleConfig, SearchConfig, SessionConfig, StyleConfig,
};
pub use error::{Result, SessionError};
pub use ghost_mode::ModelGhostMode;
pub use highlight::HighlightManager;
pub use lifecycle::{
    EngineState, IdentifierResolution, IdentifierSource, LifecycleController, ModelState,
    PreparedModel,
};
pub use registry::{ModelEntry, ModelRegistry};
pub use search::{SearchEntry, SearchIndex, SearchKind};
pub use session::ViewerSession;
pub use tools::{measurement_sphere, ToolController};
pub use visibility::{CategoryVisibility, VisibilityController, VisibilityState};
