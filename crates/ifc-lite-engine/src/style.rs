// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Highlight styles, render materials and colors

use crate::{EngineError, MaterialId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 8-bit RGB color
///
/// Serialized as a `#rrggbb` hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value
    pub const fn from_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Lowercase `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components as 0.0-1.0 floats
    pub fn to_linear_f32(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl FromStr for Rgb {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            // #abc shorthand
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(EngineError::InvalidColor(s.to_string())),
        };
        let value =
            u32::from_str_radix(&expanded, 16).map_err(|_| EngineError::InvalidColor(s.to_string()))?;
        Ok(Rgb::from_u32(value))
    }
}

impl TryFrom<String> for Rgb {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Which faces a highlight material renders
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum RenderedFaces {
    #[default]
    One,
    Two,
    All,
}

/// Named visual highlight definition held in the engine's style registry
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub color: Rgb,
    pub opacity: f32,
    pub transparent: bool,
    pub rendered_faces: RenderedFaces,
}

impl HighlightStyle {
    /// Fully opaque style rendering one face
    pub fn solid(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
            rendered_faces: RenderedFaces::One,
        }
    }

    /// Translucent style rendering all faces
    pub fn translucent(color: Rgb, opacity: f32) -> Self {
        Self {
            color,
            opacity: opacity.clamp(0.0, 1.0),
            transparent: true,
            rendered_faces: RenderedFaces::All,
        }
    }
}

/// Appearance of a render material
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MaterialState {
    pub color: Rgb,
    pub transparent: bool,
    pub opacity: f32,
}

impl MaterialState {
    pub fn opaque(color: Rgb) -> Self {
        Self {
            color,
            transparent: false,
            opacity: 1.0,
        }
    }

    pub fn translucent(color: Rgb, opacity: f32) -> Self {
        Self {
            color,
            transparent: true,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

/// A render material of the loaded models
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Material {
    pub id: MaterialId,
    pub state: MaterialState,
    /// Engine-owned material (highlight styles and the like), not part of
    /// any model's own appearance
    pub custom: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#bcf124".parse::<Rgb>().unwrap(), Rgb::new(0xbc, 0xf1, 0x24));
        assert_eq!("FF0000".parse::<Rgb>().unwrap(), Rgb::from_u32(0xff0000));
        assert_eq!("#0f0".parse::<Rgb>().unwrap(), Rgb::new(0, 0xff, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gggggg".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_hex_output_is_lowercase() {
        assert_eq!(Rgb::from_u32(0xAAAAAA).to_hex(), "#aaaaaa");
        assert_eq!(Rgb::new(0xBC, 0xF1, 0x24).to_string(), "#bcf124");
    }

    #[test]
    fn test_translucent_clamps_opacity() {
        let style = HighlightStyle::translucent(Rgb::from_u32(0x00ff00), 1.5);
        assert_eq!(style.opacity, 1.0);
        assert!(style.transparent);
        assert_eq!(style.rendered_faces, RenderedFaces::All);
    }

    #[test]
    fn test_material_states() {
        let ghost = MaterialState::translucent(Rgb::from_u32(0xffffff), -0.5);
        assert_eq!(ghost.opacity, 0.0);
        assert!(ghost.transparent);
        assert!(!MaterialState::opaque(Rgb::from_u32(0x808080)).transparent);
    }
}
