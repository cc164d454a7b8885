// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Behaviour knobs of the headless engine

use ifc_lite_engine::CameraKind;
use std::time::Duration;

/// When a model's identifier becomes readable after the model was added
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdentifierPolicy {
    /// Identifier is returned on the n-th check (1-based); earlier checks see `None`
    OnCheck(u32),
    /// Identifier never becomes available
    Never,
    /// Identifier becomes available `Duration` after the load and the engine
    /// offers a one-shot signal for it
    Signalled(Duration),
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        IdentifierPolicy::OnCheck(1)
    }
}

/// Headless engine configuration
#[derive(Clone, Debug)]
pub struct HeadlessOptions {
    /// Identifier availability
    pub identifier: IdentifierPolicy,
    /// Whether forced updates materialize an engine-supplied bounding box
    pub supply_bounds: bool,
    /// Make every camera fit fail
    pub fail_camera_fit: bool,
    /// Make element queries fail
    pub fail_element_queries: bool,
    /// Kind of the world camera
    pub camera_kind: CameraKind,
    /// Delay between a finished load and its `ModelAdded` event
    pub event_delay: Option<Duration>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            identifier: IdentifierPolicy::default(),
            supply_bounds: true,
            fail_camera_fit: false,
            fail_element_queries: false,
            camera_kind: CameraKind::default(),
            event_delay: None,
        }
    }
}

impl HeadlessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier policy
    pub fn with_identifier(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier = policy;
        self
    }

    /// Set whether the engine supplies bounding boxes
    pub fn with_bounds(mut self, supply: bool) -> Self {
        self.supply_bounds = supply;
        self
    }

    /// Set whether camera fits fail
    pub fn with_failing_camera(mut self, fail: bool) -> Self {
        self.fail_camera_fit = fail;
        self
    }

    /// Set whether element queries fail
    pub fn with_failing_queries(mut self, fail: bool) -> Self {
        self.fail_element_queries = fail;
        self
    }

    pub fn with_camera(mut self, kind: CameraKind) -> Self {
        self.camera_kind = kind;
        self
    }

    /// Emit `ModelAdded` only `delay` after `load_model` returned
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }
}
