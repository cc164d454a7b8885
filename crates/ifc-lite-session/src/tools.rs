// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Measurement and section tools
//!
//! At most one tool is active. While a tool is active, element picking is
//! off so clicks go to the tool.

use crate::highlight::HighlightManager;
use ifc_lite_engine::{EngineAdapter, Measurement, Point3, Result, Sphere, Tool};

/// Tracks which tool is active and drives the engine's tool switches
#[derive(Clone, Debug, Default)]
pub struct ToolController {
    active: Option<Tool>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<Tool> {
        self.active
    }

    /// Turn `tool` on, or off if it is already active
    ///
    /// Clears the pick selection and switches every other tool off first.
    /// Returns whether `tool` is now enabled.
    pub async fn toggle(
        &mut self,
        engine: &dyn EngineAdapter,
        highlights: &HighlightManager,
        tool: Tool,
    ) -> Result<bool> {
        highlights.clear_transient(engine).await?;

        let tools = engine.tools();
        let enable = !tools.tool_enabled(tool);
        for other in Tool::ALL.into_iter().filter(|t| *t != tool) {
            tools.set_tool_enabled(other, false);
        }
        tools.set_tool_enabled(tool, enable);
        engine.highlighter().set_enabled(!enable);

        self.active = enable.then_some(tool);
        log::debug!(
            "[Tools] {:?} {}",
            tool,
            if enable { "enabled" } else { "disabled" }
        );
        Ok(enable)
    }

    /// Switch every tool off and give picking back
    pub fn deactivate(&mut self, engine: &dyn EngineAdapter) {
        let tools = engine.tools();
        for tool in Tool::ALL {
            tools.set_tool_enabled(tool, false);
        }
        engine.highlighter().set_enabled(true);
        self.active = None;
    }

    /// Delete the clipping plane and length measurement under the pointer
    pub async fn delete_at_pointer(&self, engine: &dyn EngineAdapter) -> Result<()> {
        let tools = engine.tools();
        tools.delete(Tool::Clipper).await?;
        tools.delete(Tool::Length).await
    }

    /// Close the area being drawn
    pub async fn finish_area(&self, engine: &dyn EngineAdapter) -> Result<()> {
        engine.tools().end_area().await
    }

    /// Add a clipping plane at the pointer if the section tool is on
    pub async fn create_section(&self, engine: &dyn EngineAdapter) -> Result<bool> {
        let tools = engine.tools();
        if !tools.tool_enabled(Tool::Clipper) {
            return Ok(false);
        }
        tools.create_clipping_plane().await?;
        Ok(true)
    }
}

/// Where the camera goes after a measurement
///
/// A length is framed around its midpoint with a third of its distance as
/// radius. An area is framed by the sphere around its bounds; areas without
/// bounds are not framed.
pub fn measurement_sphere(measurement: &Measurement) -> Option<Sphere> {
    match measurement {
        Measurement::Length { start, end } => {
            let center = Point3::from((start.coords + end.coords) / 2.0);
            let radius = (end - start).norm() / 3.0;
            Some(Sphere::new(center, radius))
        }
        Measurement::Area { bounds } => bounds
            .as_ref()
            .filter(|b| !b.is_empty())
            .map(|b| b.bounding_sphere()),
    }
}
