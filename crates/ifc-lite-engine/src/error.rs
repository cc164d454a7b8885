// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for engine operations

use crate::ModelKey;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can be reported by an engine implementation
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine has not been initialized yet
    #[error("Engine not initialized")]
    NotInitialized,

    /// The model file was rejected (malformed or unsupported input)
    #[error("Model rejected: {0}")]
    LoadRejected(String),

    /// Model handle does not refer to a loaded model
    #[error("Model {0} not found")]
    ModelNotFound(ModelKey),

    /// Highlight style is not registered
    #[error("Style '{0}' is not registered")]
    StyleNotFound(String),

    /// Camera operation failed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Color string could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create a new load rejection error
    pub fn load(msg: impl Into<String>) -> Self {
        EngineError::LoadRejected(msg.into())
    }

    /// Create a new camera error
    pub fn camera(msg: impl Into<String>) -> Self {
        EngineError::Camera(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        EngineError::Other(msg.into())
    }
}
