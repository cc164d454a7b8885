// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine event stream

use crate::{BoundingBox, ModelHandle, ModelKey};
use nalgebra::Point3;
use tokio::sync::{mpsc, oneshot};

/// A finished measurement
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Measurement {
    /// Distance between two picked points
    Length { start: Point3<f64>, end: Point3<f64> },
    /// Closed area; `bounds` is `None` for degenerate outlines
    Area { bounds: Option<BoundingBox> },
}

/// Events emitted by the engine
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// A model finished decoding and was added to the model list
    ModelAdded(ModelHandle),
    /// A model was removed from the model list
    ModelRemoved(ModelKey),
    /// A measurement tool completed a measurement
    MeasurementAdded(Measurement),
}

/// Receiving end of the engine event stream
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Sending end of the engine event stream (held by engines)
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Fulfilled exactly once with the model identifier
pub type IdentifierSignal = oneshot::Receiver<String>;

/// Create a new event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
