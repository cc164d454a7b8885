// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record of engine calls

use ifc_lite_engine::{
    ElementSelection, HighlightStyle, MaterialId, MaterialState, ModelFormat, ModelKey,
    Projection, Sphere, Tool, Vector3,
};

/// One call made against the headless engine
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    Initialize {
        world: String,
    },
    LoadModel {
        name: String,
        format: ModelFormat,
    },
    Update {
        force: bool,
    },
    Attach {
        model: ModelKey,
    },
    Translate {
        model: ModelKey,
        offset: Vector3<f64>,
    },
    QueryElements {
        model: ModelKey,
        patterns: Vec<String>,
    },
    RemoveModel {
        model: ModelKey,
    },
    SetVisible {
        visible: bool,
        selection: Option<ElementSelection>,
    },
    Isolate {
        selection: ElementSelection,
    },
    SetStyle {
        name: String,
        style: HighlightStyle,
    },
    Highlight {
        style: String,
        selection: ElementSelection,
        additive: bool,
        exclusive: bool,
    },
    ClearHighlight {
        style: Option<String>,
    },
    FitToSphere {
        sphere: Sphere,
        animate: bool,
    },
    FitToItems {
        selection: Option<ElementSelection>,
    },
    SetProjection(Projection),
    SetGrid(bool),
    ClearClippingPlanes,
    SetMaterial {
        id: MaterialId,
        state: MaterialState,
    },
    SetPicking(bool),
    SetTool {
        tool: Tool,
        enabled: bool,
    },
    CreateClippingPlane,
    DeleteToolItem(Tool),
    EndArea,
}

impl EngineCall {
    /// Whether the call moves the camera
    pub fn is_camera_fit(&self) -> bool {
        matches!(
            self,
            EngineCall::FitToSphere { .. } | EngineCall::FitToItems { .. }
        )
    }

    /// Whether the call changes visibility
    pub fn is_visibility(&self) -> bool {
        matches!(
            self,
            EngineCall::SetVisible { .. } | EngineCall::Isolate { .. }
        )
    }

    /// Whether the call drives a measurement or section tool
    pub fn is_tool(&self) -> bool {
        matches!(
            self,
            EngineCall::SetTool { .. }
                | EngineCall::CreateClippingPlane
                | EngineCall::DeleteToolItem(_)
                | EngineCall::EndArea
        )
    }

    /// Whether the call changes highlights or the style registry
    pub fn is_highlight(&self) -> bool {
        matches!(
            self,
            EngineCall::SetStyle { .. }
                | EngineCall::Highlight { .. }
                | EngineCall::ClearHighlight { .. }
        )
    }
}
