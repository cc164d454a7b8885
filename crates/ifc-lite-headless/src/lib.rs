// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Headless - Renderer-less viewer engine
//!
//! An in-memory implementation of the `ifc-lite-engine` traits. IFC (STEP)
//! files are scanned with a `memchr`-accelerated entity scanner into
//! per-model element tables; visibility, highlight and camera primitives are
//! applied to plain sets and recorded in a call journal.
//!
//! The engine can reproduce the timing quirks a real viewer engine has: an
//! identifier that shows up late (or never), missing engine-supplied bounds
//! and failing camera fits. See [`HeadlessOptions`].
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_headless::{HeadlessEngine, HeadlessOptions, IdentifierPolicy};
//!
//! let engine = HeadlessEngine::with_options(
//!     HeadlessOptions::new().with_identifier(IdentifierPolicy::OnCheck(3)),
//! );
//! engine.initialize(&EngineSetup::default()).await?;
//! engine.load_model(ifc_bytes, "house", ModelFormat::Ifc).await?;
//! ```

mod engine;
mod journal;
mod options;
mod scanner;

pub use engine::HeadlessEngine;
pub use journal::EngineCall;
pub use options::{HeadlessOptions, IdentifierPolicy};
pub use scanner::{EntityScanner, ScannedEntity};
