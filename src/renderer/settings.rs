//! Renderer Settings
//!
//! Everything the frame pipeline reads but never changes mid-frame: clear
//! colors, outline look, the post-processing effect and a few resource
//! limits. Settings are plain data and can be loaded from JSON.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use halo::renderer::{PostProcessEffect, RendererSettings};
//!
//! // Default: black scene clear, white present clear, yellow 1.1× outline
//! let settings = RendererSettings::default();
//!
//! // Grayscale output with a thicker red outline
//! let settings = RendererSettings {
//!     post_process: PostProcessEffect::Grayscale,
//!     outline: OutlineSettings { scale: 1.2, color: [1.0, 0.0, 0.0] },
//!     ..Default::default()
//! };
//!
//! // Or from a file
//! let settings = RendererSettings::load("renderer.json")?;
//! ```

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// PostProcessEffect
// ---------------------------------------------------------------------------

/// Screen-space effect applied when the offscreen image is composited onto
/// the default framebuffer.
///
/// Kernel effects sample the 3×3 neighbourhood of each texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessEffect {
    /// Plain copy.
    #[default]
    Passthrough,
    /// `1 - rgb`.
    Inversion,
    /// Luminance-weighted gray.
    Grayscale,
    Sharpen,
    Blur,
    EdgeDetect,
}

impl PostProcessEffect {
    pub const ALL: [Self; 6] = [
        Self::Passthrough,
        Self::Inversion,
        Self::Grayscale,
        Self::Sharpen,
        Self::Blur,
        Self::EdgeDetect,
    ];

    /// Value of the `effect` uniform understood by the screen program.
    #[inline]
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of [`PostProcessEffect::code`]. Unknown codes fall back to
    /// passthrough.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .get(usize::try_from(code).unwrap_or(usize::MAX))
            .copied()
            .unwrap_or_default()
    }

    /// 3×3 convolution weights, row-major, for kernel effects.
    #[must_use]
    pub fn kernel(self) -> Option<[f32; 9]> {
        match self {
            Self::Sharpen => Some([-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0]),
            Self::Blur => Some([
                1.0 / 16.0,
                2.0 / 16.0,
                1.0 / 16.0,
                2.0 / 16.0,
                4.0 / 16.0,
                2.0 / 16.0,
                1.0 / 16.0,
                2.0 / 16.0,
                1.0 / 16.0,
            ]),
            Self::EdgeDetect => Some([1.0, 1.0, 1.0, 1.0, -8.0, 1.0, 1.0, 1.0, 1.0]),
            Self::Passthrough | Self::Inversion | Self::Grayscale => None,
        }
    }
}

// ---------------------------------------------------------------------------
// OutlineSettings
// ---------------------------------------------------------------------------

/// Look of the highlight drawn around outlined instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    /// Uniform scale of the silhouette relative to the instance.
    pub scale: f32,
    /// Flat RGB color of the silhouette.
    pub color: [f32; 3],
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            scale: 1.1,
            color: [1.0, 1.0, 0.0],
        }
    }
}

impl OutlineSettings {
    #[must_use]
    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for the frame pipeline.
///
/// # Fields
///
/// | Field                      | Description                                  | Default          |
/// |----------------------------|----------------------------------------------|------------------|
/// | `clear_color`              | Offscreen target clear color                 | Black (0,0,0,1)  |
/// | `present_clear_color`      | Default framebuffer clear color              | White (1,1,1,1)  |
/// | `outline`                  | Silhouette scale and color                   | 1.1×, yellow     |
/// | `post_process`             | Screen-space effect                          | `Passthrough`    |
/// | `environment_texture_unit` | Texture unit for the environment cubemap    | `0`              |
/// | `max_point_lights`         | Point lights uploaded to the lit program     | `4`              |
/// | `light_markers`            | Draw a small flat cube at each point light   | `true`           |
/// | `light_marker_scale`       | Size of those cubes                          | `0.2`            |
/// | `vsync`                    | Present with vertical sync (GPU backend)     | `true`           |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    // === Clearing ===
    pub clear_color: [f32; 4],
    pub present_clear_color: [f32; 4],

    // === Passes ===
    pub outline: OutlineSettings,
    pub post_process: PostProcessEffect,
    pub environment_texture_unit: u32,
    pub max_point_lights: usize,
    pub light_markers: bool,
    pub light_marker_scale: f32,

    // === Presentation ===
    pub vsync: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            present_clear_color: [1.0, 1.0, 1.0, 1.0],
            outline: OutlineSettings::default(),
            post_process: PostProcessEffect::default(),
            environment_texture_unit: 0,
            max_point_lights: 4,
            light_markers: true,
            light_marker_scale: 0.2,
            vsync: true,
        }
    }
}

impl RendererSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[inline]
    #[must_use]
    pub fn clear_color(&self) -> Vec4 {
        Vec4::from_array(self.clear_color)
    }

    #[inline]
    #[must_use]
    pub fn present_clear_color(&self) -> Vec4 {
        Vec4::from_array(self.present_clear_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let s = RendererSettings::default();
        assert_eq!(s.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.present_clear_color, [1.0, 1.0, 1.0, 1.0]);
        assert!((s.outline.scale - 1.1).abs() < f32::EPSILON);
        assert_eq!(s.outline.color(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(s.post_process, PostProcessEffect::Passthrough);
        assert_eq!(s.max_point_lights, 4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s = RendererSettings::from_json_str(
            r#"{ "post_process": "edge_detect", "outline": { "scale": 1.25 } }"#,
        )
        .unwrap();
        assert_eq!(s.post_process, PostProcessEffect::EdgeDetect);
        assert!((s.outline.scale - 1.25).abs() < f32::EPSILON);
        assert_eq!(s.outline.color, [1.0, 1.0, 0.0]);
        assert!(s.light_markers);
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let err = RendererSettings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::errors::HaloError::Settings(_)));
    }

    #[test]
    fn effect_codes_round_trip() {
        for effect in PostProcessEffect::ALL {
            assert_eq!(PostProcessEffect::from_code(effect.code()), effect);
        }
        assert_eq!(PostProcessEffect::from_code(-1), PostProcessEffect::Passthrough);
        assert_eq!(PostProcessEffect::from_code(99), PostProcessEffect::Passthrough);
    }

    #[test]
    fn kernels_preserve_flat_regions_except_edge_detect() {
        let sum = |k: [f32; 9]| k.iter().sum::<f32>();
        assert!((sum(PostProcessEffect::Sharpen.kernel().unwrap()) - 1.0).abs() < 1e-6);
        assert!((sum(PostProcessEffect::Blur.kernel().unwrap()) - 1.0).abs() < 1e-6);
        assert!(sum(PostProcessEffect::EdgeDetect.kernel().unwrap()).abs() < 1e-6);
        assert!(PostProcessEffect::Grayscale.kernel().is_none());
    }
}
