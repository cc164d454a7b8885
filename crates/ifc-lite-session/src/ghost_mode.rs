// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-model ghost mode
//!
//! Unlike category ghosting this works on render materials: every model
//! material turns into the ghost tint and gets its saved appearance back
//! when the mode is switched off. Engine-owned (custom) materials, such as
//! highlight styles, are left alone so highlights stay readable.

use crate::config::GhostTint;
use ifc_lite_engine::{EngineAdapter, MaterialId, MaterialState, Result};

/// Saves and restores model materials around ghost mode
#[derive(Clone, Debug, Default)]
pub struct ModelGhostMode {
    active: bool,
    saved: Vec<(MaterialId, MaterialState)>,
}

impl ModelGhostMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch ghost mode; returns whether it is now on
    ///
    /// Only materials present when the mode turns on are ghosted.
    pub fn toggle(&mut self, engine: &dyn EngineAdapter, tint: &GhostTint) -> Result<bool> {
        if self.active {
            self.restore(engine);
        } else {
            self.ghost(engine, tint)?;
        }
        self.active = !self.active;
        log::info!(
            "[Ghost] Model ghost mode {}",
            if self.active { "on" } else { "off" }
        );
        Ok(self.active)
    }

    fn ghost(&mut self, engine: &dyn EngineAdapter, tint: &GhostTint) -> Result<()> {
        let models = engine.models();
        let ghost = tint.material();
        for material in models.materials().into_iter().filter(|m| !m.custom) {
            if let Err(e) = models.set_material(material.id, &ghost) {
                self.restore(engine);
                return Err(e);
            }
            self.saved.push((material.id, material.state));
        }
        Ok(())
    }

    fn restore(&mut self, engine: &dyn EngineAdapter) {
        let models = engine.models();
        for (id, state) in self.saved.drain(..) {
            // The owning model may be gone by now
            if let Err(e) = models.set_material(id, &state) {
                log::warn!("[Ghost] Restoring {} failed: {}", id, e);
            }
        }
    }
}
