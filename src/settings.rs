//! Post-Processing and Shadow Configuration
//!
//! Plain-data settings for the bloom chain, tone mapping and point-light
//! shadows. All structs derive `serde` with `#[serde(default)]`, so a JSON
//! file only needs to name the values it overrides.
//!
//! Two validation modes are provided:
//!
//! - [`PostFxSettings::sanitized`] clamps degenerate values back into range
//!   and logs a warning for each correction.
//! - [`PostFxSettings::validate`] rejects them with
//!   [`PostFxError::InvalidSetting`].
//!
//! # Example
//!
//! ```rust,ignore
//! let settings = PostFxSettings::from_json_str(r#"{ "bloom": { "strength": 0.5 } }"#)?;
//! assert_eq!(settings.bloom.mip_chain_length(), 12);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{PostFxError, Result};

/// Upper bound for the number of bloom mips.
pub const MAX_MIP_CHAIN_LENGTH: u32 = 16;

/// Upper bound for the number of point-light shadow slots.
pub const MAX_SHADOW_LIGHTS: u32 = 64;

// ============================================================================
// Bloom
// ============================================================================

/// Storage format of the bloom mip chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomFormat {
    /// Packed 11/11/10-bit unsigned float, no alpha.
    #[default]
    PackedFloat,
    /// 16-bit float RGBA.
    Rgba16Float,
}

impl BloomFormat {
    #[must_use]
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::PackedFloat => wgpu::TextureFormat::Rg11b10Ufloat,
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Bloom mip-chain configuration.
///
/// | Field | Default | Meaning |
/// |---|---|---|
/// | `enabled` | `true` | Run the bloom chain at all |
/// | `mip_chain_length` | `12` | Number of mips, clamped to `1..=16` |
/// | `filter_radius` | `0.005` | Tent offset in source UV units |
/// | `strength` | `1.0` | Bloom contribution in the composite |
/// | `karis_average` | `true` | Firefly suppression on the first downsample |
/// | `format` | `packed_float` | Mip storage format |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Whether bloom is enabled.
    pub enabled: bool,
    mip_chain_length: u32,
    filter_radius: f32,
    strength: f32,
    /// Whether to apply the Karis average on the first downsample.
    pub karis_average: bool,
    /// Storage format of every mip.
    pub format: BloomFormat,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mip_chain_length: 12,
            filter_radius: 0.005,
            strength: 1.0,
            karis_average: true,
            format: BloomFormat::PackedFloat,
        }
    }
}

impl BloomSettings {
    #[inline]
    #[must_use]
    pub fn mip_chain_length(&self) -> u32 {
        self.mip_chain_length
    }

    #[inline]
    #[must_use]
    pub fn filter_radius(&self) -> f32 {
        self.filter_radius
    }

    #[inline]
    #[must_use]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Sets the number of mips. Clamped to `1..=MAX_MIP_CHAIN_LENGTH`.
    pub fn set_mip_chain_length(&mut self, levels: u32) {
        self.mip_chain_length = levels.clamp(1, MAX_MIP_CHAIN_LENGTH);
    }

    /// Sets the upsample filter radius. Negative and non-finite values become `0.0`.
    pub fn set_filter_radius(&mut self, radius: f32) {
        self.filter_radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    }

    /// Sets the bloom strength. Negative and non-finite values become `0.0`.
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = if strength.is_finite() { strength.max(0.0) } else { 0.0 };
    }
}

// ============================================================================
// Tone mapping
// ============================================================================

/// Tone mapping operator applied by the final composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMappingMode {
    /// Clamp to `[0, 1]` after exposure.
    Linear,
    /// `x / (1 + x)`.
    Reinhard,
    /// `1 - exp(-x)`, the exposure curve.
    #[default]
    Exponential,
}

impl ToneMappingMode {
    /// Value passed to the composite shader.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Linear => 0,
            Self::Reinhard => 1,
            Self::Exponential => 2,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Reinhard => "Reinhard",
            Self::Exponential => "Exponential",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Linear, Self::Reinhard, Self::Exponential]
    }
}

/// Tone mapping configuration.
///
/// | Field | Default | Meaning |
/// |---|---|---|
/// | `exposure` | `1.0` | Linear brightness multiplier, never negative |
/// | `mode` | `exponential` | Operator |
/// | `gamma` | `2.2` | Encoding gamma for non-sRGB surfaces |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMappingSettings {
    pub exposure: f32,
    pub mode: ToneMappingMode,
    pub gamma: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            mode: ToneMappingMode::Exponential,
            gamma: 2.2,
        }
    }
}

// ============================================================================
// Shadows
// ============================================================================

/// Point-light cubemap shadow configuration.
///
/// | Field | Default | Meaning |
/// |---|---|---|
/// | `enabled` | `true` | Render shadow cubemaps |
/// | `max_lights` | `16` | Cubemap slots allocated up front |
/// | `resolution` | `512` | Pixels per cube face |
/// | `near_plane` | `1.0` | Face projection near plane |
/// | `far_plane` | `1000.0` | Distance normalization and far plane |
/// | `bias` | `0.05` | Depth comparison bias, world units |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub max_lights: u32,
    pub resolution: u32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_lights: 16,
            resolution: 512,
            near_plane: 1.0,
            far_plane: 1000.0,
            bias: 0.05,
        }
    }
}

// ============================================================================
// PostFxSettings
// ============================================================================

/// Top-level configuration for everything this crate renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFxSettings {
    pub bloom: BloomSettings,
    pub tone_mapping: ToneMappingSettings,
    pub shadow: ShadowSettings,
    /// Sample count of the HDR scene target. `1` or `4`.
    pub msaa_samples: u32,
}

impl Default for PostFxSettings {
    fn default() -> Self {
        Self {
            bloom: BloomSettings::default(),
            tone_mapping: ToneMappingSettings::default(),
            shadow: ShadowSettings::default(),
            msaa_samples: 4,
        }
    }
}

impl PostFxSettings {
    /// Parses settings from JSON and clamps degenerate values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Reads and parses a JSON settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::info!("Loaded post-processing settings from {}", path.display());
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns a copy with every degenerate value replaced by its default.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        let bloom = &mut self.bloom;
        if bloom.mip_chain_length == 0 || bloom.mip_chain_length > MAX_MIP_CHAIN_LENGTH {
            log::warn!(
                "bloom.mip_chain_length {} out of range, clamping",
                bloom.mip_chain_length
            );
            bloom.set_mip_chain_length(bloom.mip_chain_length);
        }
        if !bloom.filter_radius.is_finite() {
            log::warn!("bloom.filter_radius is not finite, using default");
            bloom.filter_radius = defaults.bloom.filter_radius;
        } else if bloom.filter_radius < 0.0 {
            log::warn!("bloom.filter_radius {} is negative, clamping to 0", bloom.filter_radius);
            bloom.filter_radius = 0.0;
        }
        if !bloom.strength.is_finite() || bloom.strength < 0.0 {
            log::warn!("bloom.strength {} is invalid, using default", bloom.strength);
            bloom.strength = defaults.bloom.strength;
        }

        let tone = &mut self.tone_mapping;
        if !tone.exposure.is_finite() {
            log::warn!("tone_mapping.exposure is not finite, using default");
            tone.exposure = defaults.tone_mapping.exposure;
        } else if tone.exposure < 0.0 {
            log::warn!("tone_mapping.exposure {} is negative, clamping to 0", tone.exposure);
            tone.exposure = 0.0;
        }
        if !tone.gamma.is_finite() || tone.gamma <= 0.0 {
            log::warn!("tone_mapping.gamma {} is invalid, using default", tone.gamma);
            tone.gamma = defaults.tone_mapping.gamma;
        }

        let shadow = &mut self.shadow;
        if shadow.max_lights == 0 || shadow.max_lights > MAX_SHADOW_LIGHTS {
            log::warn!("shadow.max_lights {} out of range, clamping", shadow.max_lights);
            shadow.max_lights = shadow.max_lights.clamp(1, MAX_SHADOW_LIGHTS);
        }
        if shadow.resolution == 0 {
            log::warn!("shadow.resolution is 0, using default");
            shadow.resolution = defaults.shadow.resolution;
        }
        if !(shadow.near_plane.is_finite() && shadow.far_plane.is_finite())
            || shadow.near_plane <= 0.0
            || shadow.far_plane <= shadow.near_plane
        {
            log::warn!(
                "shadow planes ({}, {}) are invalid, using defaults",
                shadow.near_plane,
                shadow.far_plane
            );
            shadow.near_plane = defaults.shadow.near_plane;
            shadow.far_plane = defaults.shadow.far_plane;
        }
        if !shadow.bias.is_finite() || shadow.bias < 0.0 {
            log::warn!("shadow.bias {} is invalid, using default", shadow.bias);
            shadow.bias = defaults.shadow.bias;
        }

        if !matches!(self.msaa_samples, 1 | 4) {
            log::warn!("msaa_samples {} unsupported, using 4", self.msaa_samples);
            self.msaa_samples = 4;
        }

        self
    }

    /// Strict check: returns the first degenerate value as an error.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, reason: String| {
            Err(PostFxError::InvalidSetting { name, reason })
        };

        let bloom = &self.bloom;
        if bloom.mip_chain_length == 0 || bloom.mip_chain_length > MAX_MIP_CHAIN_LENGTH {
            return invalid(
                "bloom.mip_chain_length",
                format!("{} is outside 1..={MAX_MIP_CHAIN_LENGTH}", bloom.mip_chain_length),
            );
        }
        if !bloom.filter_radius.is_finite() || bloom.filter_radius < 0.0 {
            return invalid(
                "bloom.filter_radius",
                format!("{} must be finite and >= 0", bloom.filter_radius),
            );
        }
        if !bloom.strength.is_finite() || bloom.strength < 0.0 {
            return invalid(
                "bloom.strength",
                format!("{} must be finite and >= 0", bloom.strength),
            );
        }
        if !self.tone_mapping.exposure.is_finite() || self.tone_mapping.exposure < 0.0 {
            return invalid(
                "tone_mapping.exposure",
                format!("{} must be finite and >= 0", self.tone_mapping.exposure),
            );
        }
        if !self.tone_mapping.gamma.is_finite() || self.tone_mapping.gamma <= 0.0 {
            return invalid(
                "tone_mapping.gamma",
                format!("{} must be finite and > 0", self.tone_mapping.gamma),
            );
        }

        let shadow = &self.shadow;
        if shadow.max_lights == 0 || shadow.max_lights > MAX_SHADOW_LIGHTS {
            return invalid(
                "shadow.max_lights",
                format!("{} is outside 1..={MAX_SHADOW_LIGHTS}", shadow.max_lights),
            );
        }
        if shadow.resolution == 0 {
            return invalid("shadow.resolution", "must be at least 1".to_string());
        }
        if !(shadow.near_plane > 0.0 && shadow.far_plane > shadow.near_plane)
            || !shadow.far_plane.is_finite()
        {
            return invalid(
                "shadow.far_plane",
                format!(
                    "planes ({}, {}) must satisfy 0 < near < far",
                    shadow.near_plane, shadow.far_plane
                ),
            );
        }
        if !shadow.bias.is_finite() || shadow.bias < 0.0 {
            return invalid("shadow.bias", format!("{} must be finite and >= 0", shadow.bias));
        }
        if !matches!(self.msaa_samples, 1 | 4) {
            return invalid("msaa_samples", format!("{} must be 1 or 4", self.msaa_samples));
        }
        Ok(())
    }
}
