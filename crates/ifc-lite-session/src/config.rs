// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration
//!
//! Every field has a default, so a JSON document only needs the keys it
//! wants to change:
//!
//! ```ignore
//! let config = SessionConfig::from_json(r#"{ "search": { "max_results": 50 } }"#)?;
//! ```

use crate::Result;
use ifc_lite_engine::{HighlightStyle, MaterialState, Rgb};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete session configuration
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lifecycle: LifecycleConfig,
    pub categories: CategoryConfig,
    pub search: SearchConfig,
    pub styles: StyleConfig,
}

impl SessionConfig {
    /// Parse a (partial) JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Model lifecycle timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between identifier checks
    pub identifier_poll_interval_ms: u64,
    /// Identifier checks before the model is marked degraded
    pub identifier_max_attempts: u32,
    /// Forced engine updates during geometry processing
    pub update_passes: u32,
    /// Delay between forced updates
    pub update_delay_ms: u64,
    /// Delay after a camera fit before the final update
    pub settle_delay_ms: u64,
    pub animate_camera: bool,
    /// How long a load waits for the engine to announce the model
    pub load_event_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            identifier_poll_interval_ms: 100,
            identifier_max_attempts: 50,
            update_passes: 2,
            update_delay_ms: 100,
            settle_delay_ms: 50,
            animate_camera: true,
            load_event_timeout_ms: 10_000,
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.identifier_poll_interval_ms)
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn load_event_timeout(&self) -> Duration {
        Duration::from_millis(self.load_event_timeout_ms)
    }

    /// Upper bound on identifier resolution
    pub fn identifier_timeout(&self) -> Duration {
        self.poll_interval() * self.identifier_max_attempts
    }
}

/// Canonical categories
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Canonical categories in classification order
    pub canonical: Vec<String>,
    /// Domain prefix stripped to get a category's bare name
    pub prefix: String,
    /// Category ghosted with the space tint
    pub space_category: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            canonical: [
                "IFCWALL",
                "IFCSLAB",
                "IFCBEAM",
                "IFCCOLUMN",
                "IFCDOOR",
                "IFCWINDOW",
                "IFCSPACE",
                "IFCSTAIR",
                "IFCROOF",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            prefix: "IFC".to_string(),
            space_category: "IFCSPACE".to_string(),
        }
    }
}

/// Search index limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Element entries indexed per category
    pub max_elements_per_category: usize,
    /// Results returned per query
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_elements_per_category: 100,
            max_results: 20,
        }
    }
}

/// Translucent tint used for ghosting
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostTint {
    pub color: Rgb,
    pub opacity: f32,
}

impl GhostTint {
    pub fn style(&self) -> HighlightStyle {
        HighlightStyle::translucent(self.color, self.opacity)
    }

    pub fn material(&self) -> MaterialState {
        MaterialState::translucent(self.color, self.opacity)
    }
}

/// Highlight colors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Pick selection color
    pub selection: Rgb,
    /// Search result color
    pub search: Rgb,
    pub ghost: GhostTint,
    /// Ghost tint of the space category
    pub space_ghost: GhostTint,
    /// Tint every model material takes in whole-model ghost mode
    pub model_ghost: GhostTint,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            selection: Rgb::from_u32(0xbcf124),
            search: Rgb::from_u32(0xff0000),
            ghost: GhostTint {
                color: Rgb::from_u32(0xaaaaaa),
                opacity: 0.15,
            },
            space_ghost: GhostTint {
                color: Rgb::from_u32(0x00ff00),
                opacity: 0.25,
            },
            model_ghost: GhostTint {
                color: Rgb::from_u32(0xffffff),
                opacity: 0.05,
            },
        }
    }
}
