// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Engine - Adapter traits and shared types for BIM viewer engines
//!
//! This crate describes the contract between the viewer orchestration layer and
//! the engine that actually decodes, renders and picks building models. Engines
//! implement the traits; the orchestration layer only ever talks to them through
//! trait objects, so a renderer, a headless test double or a remote engine can be
//! swapped without touching the session logic.
//!
//! # Architecture
//!
//! The contract is split by concern, mirroring the components a viewer engine
//! typically exposes:
//!
//! - [`EngineAdapter`] - Entry point: initialization, loading, event stream
//! - [`ModelStore`] - Loaded models, identifiers, bounds and category queries
//! - [`Hider`] - Visibility and isolation primitives
//! - [`Highlighter`] - Style registry and highlight primitives
//! - [`CameraControls`] - Camera fitting and projection
//!
//! The design is single-threaded and cooperative. Every asynchronous call is a
//! suspension point, and none of the futures are required to be `Send`.
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_engine::{EngineAdapter, ModelFormat};
//!
//! let engine: Rc<dyn EngineAdapter> = make_engine();
//! engine.load_model(&bytes, "house", ModelFormat::Ifc).await?;
//! for model in engine.models().list() {
//!     println!("{} -> {:?}", model.name, engine.models().identifier(&model));
//! }
//! ```

pub mod bounds;
pub mod error;
pub mod events;
pub mod style;
pub mod traits;
pub mod types;

pub use bounds::*;
pub use error::*;
pub use events::*;
pub use style::*;
pub use traits::*;
pub use types::*;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
