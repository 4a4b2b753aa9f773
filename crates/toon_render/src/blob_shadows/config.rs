//! Blob Shadow Settings
//!
//! Per-camera settings with serde support so they can live in the pipeline
//! config file.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Blob shadow map resolution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlobShadowMapSize {
    #[serde(rename = "128")]
    Size128,
    #[default]
    #[serde(rename = "256")]
    Size256,
    #[serde(rename = "512")]
    Size512,
    #[serde(rename = "1024")]
    Size1024,
    #[serde(rename = "2048")]
    Size2048,
    #[serde(rename = "4096")]
    Size4096,
}

impl BlobShadowMapSize {
    /// Edge length in pixels
    pub fn pixels(&self) -> u32 {
        match self {
            Self::Size128 => 128,
            Self::Size256 => 256,
            Self::Size512 => 512,
            Self::Size1024 => 1024,
            Self::Size2048 => 2048,
            Self::Size4096 => 4096,
        }
    }
}

/// Blend strategy used when blob shadows overlap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlobShadowsMode {
    /// Overlapping blobs darken each other
    #[default]
    Default,
    /// Overlapping blobs merge into one smooth shape
    Metaballs,
}

impl BlobShadowsMode {
    /// Shader pipeline implementing this mode
    pub fn pipeline_name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Metaballs => "Metaballs",
        }
    }
}

/// Blob shadow settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobShadowSettings {
    /// Shadow map resolution
    pub map_size: BlobShadowMapSize,

    /// Blend strategy
    pub mode: BlobShadowsMode,

    /// Global shadow saturation (0-1)
    pub saturation: f32,

    /// Height of the receiving ground plane
    pub receiver_plane_y: f32,

    /// World-space offset applied to every shadow (x, z)
    pub shadow_offset: Vec2,

    /// Maximum distance from the camera at which shadows are drawn
    pub max_distance: f32,
}

impl Default for BlobShadowSettings {
    fn default() -> Self {
        Self {
            map_size: BlobShadowMapSize::default(),
            mode: BlobShadowsMode::default(),
            saturation: 1.0,
            receiver_plane_y: 0.0,
            shadow_offset: Vec2::ZERO,
            max_distance: 100.0,
        }
    }
}

impl BlobShadowSettings {
    /// Clamp values to the ranges the editor exposes
    pub fn validate(&mut self) {
        self.saturation = if self.saturation.is_finite() {
            self.saturation.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if !self.receiver_plane_y.is_finite() {
            self.receiver_plane_y = 0.0;
        }
        if !self.shadow_offset.is_finite() {
            self.shadow_offset = Vec2::ZERO;
        }
        self.max_distance = if self.max_distance.is_finite() {
            self.max_distance.max(0.01)
        } else {
            100.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_size_pixels() {
        assert_eq!(BlobShadowMapSize::default().pixels(), 256);
        assert_eq!(BlobShadowMapSize::Size4096.pixels(), 4096);
        assert!(BlobShadowMapSize::Size512.pixels().is_power_of_two());
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = BlobShadowSettings {
            saturation: 3.0,
            max_distance: -5.0,
            receiver_plane_y: f32::NAN,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.saturation, 1.0);
        assert_eq!(settings.max_distance, 0.01);
        assert_eq!(settings.receiver_plane_y, 0.0);
    }

    #[test]
    fn test_settings_serde() {
        let settings = BlobShadowSettings {
            map_size: BlobShadowMapSize::Size1024,
            mode: BlobShadowsMode::Metaballs,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"1024\""));
        let back: BlobShadowSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
