// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for session operations

use ifc_lite_engine::EngineError;
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`crate::ViewerSession`]
///
/// Only [`SessionError::Load`] is meant for the end user; indexing, camera
/// and identifier problems are recovered inside the session and logged.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The model file was rejected; no model was registered
    #[error("Failed to load '{name}': {reason}")]
    Load { name: String, reason: String },

    /// The engine has not been initialized
    #[error("Viewer is not initialized")]
    NotInitialized,

    /// The operation needs a current model
    #[error("No model loaded")]
    NoActiveModel,

    /// Engine call failed
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SessionError {
    /// Create a new load error
    pub fn load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::Load {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// User-facing message for load failures
    pub fn user_message(&self) -> Option<String> {
        match self {
            SessionError::Load { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}
