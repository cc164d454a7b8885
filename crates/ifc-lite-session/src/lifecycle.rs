// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer lifecycle controller
//!
//! Engine setup happens once. Every model the engine adds then runs through
//! geometry processing, positioning and identifier resolution before it is
//! published as ready:
//!
//! ```text
//! NotLoaded -> Loading -> GeometryProcessing -> Positioning
//!           -> AwaitingIdentifier -> Ready { degraded }
//! ```
//!
//! Engine failures past the load itself only degrade the result; a model
//! always reaches `Ready`.

use crate::config::LifecycleConfig;
use crate::registry::ModelRegistry;
use ifc_lite_engine::{BoundingBox, EngineAdapter, EngineSetup, ModelHandle, Result, Vector3};
use tokio::time::{sleep, timeout};

/// Engine-level state
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
}

/// Per-model state
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModelState {
    #[default]
    NotLoaded,
    /// Engine is decoding the file; the model has no key yet, see
    /// [`crate::ModelRegistry::state_of`]
    Loading,
    /// Forced update passes
    GeometryProcessing,
    Positioning,
    AwaitingIdentifier,
    /// `degraded` when the identifier never showed up
    Ready { degraded: bool },
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ModelState::Ready { degraded: true })
    }
}

/// How the identifier was obtained
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdentifierSource {
    /// Present at the first check
    Immediate,
    /// Found by polling
    Polled,
    /// Delivered by the engine's one-shot signal
    Signalled,
    /// Gave up
    TimedOut,
}

/// Outcome of identifier resolution
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IdentifierResolution {
    pub identifier: Option<String>,
    /// Number of identifier checks made
    pub attempts: u32,
    pub source: IdentifierSource,
}

impl IdentifierResolution {
    fn found(identifier: String, attempts: u32, source: IdentifierSource) -> Self {
        Self {
            identifier: Some(identifier),
            attempts,
            source,
        }
    }

    fn timed_out(attempts: u32) -> Self {
        Self {
            identifier: None,
            attempts,
            source: IdentifierSource::TimedOut,
        }
    }
}

/// A model that finished its lifecycle
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedModel {
    pub handle: ModelHandle,
    /// Empty for degraded models
    pub identifier: String,
    pub degraded: bool,
    /// Bounds after positioning
    pub bounds: Option<BoundingBox>,
    /// Translation applied to put the model on the ground plane
    pub offset: Vector3<f64>,
}

/// Owns engine setup and the per-model readiness sequence
#[derive(Clone, Debug)]
pub struct LifecycleController {
    config: LifecycleConfig,
    setup: EngineSetup,
    state: EngineState,
}

impl LifecycleController {
    pub fn new(config: LifecycleConfig, setup: EngineSetup) -> Self {
        Self {
            config,
            setup,
            state: EngineState::Uninitialized,
        }
    }

    pub fn engine_state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Set up the engine once
    ///
    /// Returns `false` without touching the engine when setup already ran
    /// or is running.
    pub async fn initialize(&mut self, engine: &dyn EngineAdapter) -> Result<bool> {
        if self.state != EngineState::Uninitialized {
            log::debug!("[Lifecycle] Initialize ignored in state {:?}", self.state);
            return Ok(false);
        }

        self.state = EngineState::Initializing;
        match engine.initialize(&self.setup).await {
            Ok(()) => {
                self.state = EngineState::Ready;
                log::info!("[Lifecycle] Engine ready (world '{}')", self.setup.world_name);
                Ok(true)
            }
            Err(e) => {
                self.state = EngineState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Run a freshly added model through to `Ready`
    ///
    /// State changes are written to `registry` as they happen; the final
    /// `Ready` is left to the caller so it can publish and index together.
    pub async fn prepare(
        &self,
        engine: &dyn EngineAdapter,
        registry: &mut ModelRegistry,
        handle: &ModelHandle,
    ) -> PreparedModel {
        let models = engine.models();
        log::info!("[Lifecycle] Model added: '{}' ({})", handle.name, handle.key);

        registry.register(handle.clone());
        registry.set_state(handle.key, ModelState::GeometryProcessing);
        if let Err(e) = models.attach(handle) {
            log::warn!("[Lifecycle] Could not attach '{}': {}", handle.name, e);
        }
        self.process_geometry(engine).await;

        registry.set_state(handle.key, ModelState::Positioning);
        let (bounds, offset) = self.position(engine, handle).await;
        registry.set_bounds(handle.key, bounds);

        if let Err(e) = engine.hider().set_visible(true, None).await {
            log::warn!("[Lifecycle] Show all after load failed: {}", e);
        }

        registry.set_state(handle.key, ModelState::AwaitingIdentifier);
        let resolution = self.resolve_identifier(engine, handle).await;
        let degraded = resolution.identifier.is_none();
        if degraded {
            log::warn!(
                "[Lifecycle] No identifier for '{}' after {} checks, continuing degraded",
                handle.name,
                resolution.attempts
            );
        } else {
            log::debug!(
                "[Lifecycle] Identifier for '{}' after {} checks ({:?})",
                handle.name,
                resolution.attempts,
                resolution.source
            );
        }

        PreparedModel {
            handle: handle.clone(),
            identifier: resolution.identifier.unwrap_or_default(),
            degraded,
            bounds,
            offset,
        }
    }

    /// Forced update passes with a fixed delay in between
    async fn process_geometry(&self, engine: &dyn EngineAdapter) {
        for pass in 0..self.config.update_passes {
            if pass > 0 {
                sleep(self.config.update_delay()).await;
            }
            if let Err(e) = engine.update(true).await {
                log::warn!("[Lifecycle] Update pass {} failed: {}", pass + 1, e);
            }
        }
    }

    /// Put the model on the ground plane and frame it
    ///
    /// Returns the final bounds and the applied translation.
    async fn position(
        &self,
        engine: &dyn EngineAdapter,
        handle: &ModelHandle,
    ) -> (Option<BoundingBox>, Vector3<f64>) {
        let models = engine.models();
        let offset_none = Vector3::zeros();

        let bbox = match models.bounding_box(handle) {
            Some(bbox) if !bbox.is_empty() => Some(bbox),
            _ => {
                log::warn!(
                    "[Lifecycle] No bounding box from engine for '{}', computing from scene",
                    handle.name
                );
                models.compute_bounding_box(handle).filter(|b| !b.is_empty())
            }
        };
        let Some(bbox) = bbox else {
            log::warn!("[Lifecycle] '{}' has no bounds, skipping positioning", handle.name);
            return (None, offset_none);
        };

        let offset = Vector3::new(0.0, -bbox.min.y, 0.0);
        let positioned = match models.translate(handle, offset) {
            Ok(()) => models
                .compute_bounding_box(handle)
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| bbox.translated(&offset)),
            Err(e) => {
                log::warn!("[Lifecycle] Could not move '{}': {}", handle.name, e);
                return (Some(bbox), offset_none);
            }
        };
        models.set_bounding_box(handle, positioned);

        self.fit_camera(engine, &positioned).await;
        (Some(positioned), offset)
    }

    async fn fit_camera(&self, engine: &dyn EngineAdapter, bounds: &BoundingBox) {
        let camera = engine.camera();
        if !camera.kind().can_fit() {
            log::debug!("[Lifecycle] Camera cannot fit, skipping");
            return;
        }

        // The box was recomputed after the move, so its sphere already sits
        // at the translated center
        let sphere = bounds.bounding_sphere();
        match camera.fit_to_sphere(&sphere, self.config.animate_camera).await {
            Ok(()) => {
                sleep(self.config.settle_delay()).await;
                if let Err(e) = engine.update(true).await {
                    log::warn!("[Lifecycle] Update after camera fit failed: {}", e);
                }
            }
            Err(e) => log::warn!("[Lifecycle] Camera fit failed: {}", e),
        }
    }

    /// Wait for the model identifier
    ///
    /// Checks once; then waits on the engine's signal if it has one,
    /// otherwise polls. Either way gives up after
    /// `identifier_max_attempts` intervals.
    pub async fn resolve_identifier(
        &self,
        engine: &dyn EngineAdapter,
        handle: &ModelHandle,
    ) -> IdentifierResolution {
        let models = engine.models();
        if let Some(identifier) = models.identifier(handle) {
            return IdentifierResolution::found(identifier, 1, IdentifierSource::Immediate);
        }

        if let Some(signal) = models.identifier_signal(handle) {
            match timeout(self.config.identifier_timeout(), signal).await {
                Ok(Ok(identifier)) => {
                    return IdentifierResolution::found(identifier, 1, IdentifierSource::Signalled)
                }
                Ok(Err(_)) => log::debug!("[Lifecycle] Identifier signal dropped"),
                Err(_) => log::debug!("[Lifecycle] Identifier signal timed out"),
            }
            return match models.identifier(handle) {
                Some(identifier) => {
                    IdentifierResolution::found(identifier, 2, IdentifierSource::Polled)
                }
                None => IdentifierResolution::timed_out(2),
            };
        }

        let max = self.config.identifier_max_attempts.max(1);
        for attempt in 2..=max {
            sleep(self.config.poll_interval()).await;
            if let Some(identifier) = models.identifier(handle) {
                return IdentifierResolution::found(identifier, attempt, IdentifierSource::Polled);
            }
            log::debug!("[Lifecycle] Identifier check {} of {} empty", attempt, max);
        }
        IdentifierResolution::timed_out(max)
    }
}
