//! Tone mapping math.
//!
//! CPU mirror of `composite.wgsl`, plus the uniform block it reads.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::bloom::reference::HdrImage;
use crate::settings::ToneMappingMode;

/// Inputs of the composite besides the two images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub exposure: f32,
    pub bloom_strength: f32,
    pub mode: ToneMappingMode,
    pub gamma: f32,
    /// `false` when the output surface already encodes sRGB.
    pub apply_gamma: bool,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            bloom_strength: 1.0,
            mode: ToneMappingMode::Exponential,
            gamma: 2.2,
            apply_gamma: true,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub(crate) struct CompositeUniforms {
    exposure: f32,
    bloom_strength: f32,
    gamma: f32,
    tone_mapping_mode: u32,
    apply_gamma: u32,
    _pad: [u32; 3],
}

impl From<&CompositeParams> for CompositeUniforms {
    fn from(params: &CompositeParams) -> Self {
        Self {
            exposure: params.exposure.max(0.0),
            bloom_strength: params.bloom_strength,
            gamma: params.gamma,
            tone_mapping_mode: params.mode.as_u32(),
            apply_gamma: u32::from(params.apply_gamma),
            _pad: [0; 3],
        }
    }
}

/// Applies a tone mapping operator to an exposed HDR color.
#[must_use]
pub fn tone_map(color: Vec3, mode: ToneMappingMode) -> Vec3 {
    match mode {
        ToneMappingMode::Linear => color.clamp(Vec3::ZERO, Vec3::ONE),
        ToneMappingMode::Reinhard => color / (Vec3::ONE + color),
        ToneMappingMode::Exponential => Vec3::ONE - (-color).exp(),
    }
}

#[must_use]
pub fn gamma_encode(color: Vec3, gamma: f32) -> Vec3 {
    color.powf(1.0 / gamma)
}

/// One output pixel from a scene sample and a bloom sample.
#[must_use]
pub fn composite_pixel(scene: Vec3, bloom: Vec3, params: &CompositeParams) -> Vec3 {
    let hdr = (scene + bloom * params.bloom_strength).max(Vec3::ZERO);
    let mapped = tone_map(hdr * params.exposure.max(0.0), params.mode);
    if params.apply_gamma {
        gamma_encode(mapped, params.gamma)
    } else {
        mapped
    }
}

/// Composites whole images; `bloom` is sampled at the scene's texel centers.
#[must_use]
pub fn composite_image(scene: &HdrImage, bloom: &HdrImage, params: &CompositeParams) -> HdrImage {
    let size = scene.size().as_vec2();
    HdrImage::from_fn(scene.width(), scene.height(), |x, y| {
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
        composite_pixel(scene.get(x, y), bloom.sample_bilinear(uv), params)
    })
}
