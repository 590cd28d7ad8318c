//! Render Target Completeness
//!
//! Every target this crate allocates is validated up front against the
//! device's features and limits. A target that fails is reported as
//! [`PostFxError::InitializationFailure`] before any texture is created.

use crate::errors::{PostFxError, Result};

/// Snapshot of the device properties that decide whether a target is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCapabilities {
    pub features: wgpu::Features,
    pub max_texture_dimension_2d: u32,
    pub max_texture_array_layers: u32,
}

impl TargetCapabilities {
    #[must_use]
    pub fn new(features: wgpu::Features, limits: &wgpu::Limits) -> Self {
        Self {
            features,
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_texture_array_layers: limits.max_texture_array_layers,
        }
    }

    #[must_use]
    pub fn from_device(device: &wgpu::Device) -> Self {
        Self::new(device.features(), &device.limits())
    }

    /// Checks a sampled color target: renderable, filterable and within limits.
    ///
    /// `blended` additionally requires the format to support blending.
    pub fn check_color_target(
        &self,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        blended: bool,
    ) -> Result<()> {
        self.check_extent(label, width, height)?;
        if format.is_depth_stencil_format() {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} is not a color format"),
            ));
        }

        let features = format.guaranteed_format_features(self.features);
        let required = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !features.allowed_usages.contains(required) {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} is not color-renderable with the enabled features"),
            ));
        }
        if !features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
        {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} cannot be sampled with linear filtering"),
            ));
        }
        if blended
            && !features
                .flags
                .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE)
        {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} does not support blending"),
            ));
        }
        Ok(())
    }

    /// Checks a multisampled attachment for the given sample count.
    pub fn check_multisampled(
        &self,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<()> {
        self.check_extent(label, width, height)?;
        let features = format.guaranteed_format_features(self.features);
        if !features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} is not renderable"),
            ));
        }
        if samples > 1 && !features.flags.sample_count_supported(samples) {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} does not support {samples}x multisampling"),
            ));
        }
        Ok(())
    }

    /// Checks a depth cubemap: six square layers of a sampleable depth format.
    pub fn check_depth_cube(
        &self,
        label: &str,
        format: wgpu::TextureFormat,
        resolution: u32,
    ) -> Result<()> {
        self.check_extent(label, resolution, resolution)?;
        if !format.is_depth_stencil_format() {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} is not a depth format"),
            ));
        }
        if self.max_texture_array_layers < 6 {
            return Err(PostFxError::incomplete(
                label,
                format!(
                    "device allows {} array layers, a cubemap needs 6",
                    self.max_texture_array_layers
                ),
            ));
        }
        let features = format.guaranteed_format_features(self.features);
        let required = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !features.allowed_usages.contains(required) {
            return Err(PostFxError::incomplete(
                label,
                format!("{format:?} cannot be both rendered and sampled"),
            ));
        }
        Ok(())
    }

    fn check_extent(&self, label: &str, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(PostFxError::incomplete(
                label,
                format!("zero-sized extent {width}x{height}"),
            ));
        }
        let max = self.max_texture_dimension_2d;
        if width > max || height > max {
            return Err(PostFxError::incomplete(
                label,
                format!("extent {width}x{height} exceeds device limit {max}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(features: wgpu::Features) -> TargetCapabilities {
        TargetCapabilities::new(features, &wgpu::Limits::downlevel_defaults())
    }

    #[test]
    fn rgba16_float_is_a_complete_bloom_target() {
        let caps = caps(wgpu::Features::empty());
        assert!(
            caps.check_color_target("mip", wgpu::TextureFormat::Rgba16Float, 64, 64, true)
                .is_ok()
        );
    }

    #[test]
    fn packed_float_needs_renderable_feature() {
        let without = caps(wgpu::Features::empty());
        let err = without
            .check_color_target("mip", wgpu::TextureFormat::Rg11b10Ufloat, 64, 64, true)
            .unwrap_err();
        assert!(matches!(err, PostFxError::InitializationFailure { .. }));

        let with = caps(wgpu::Features::RG11B10UFLOAT_RENDERABLE);
        assert!(
            with.check_color_target("mip", wgpu::TextureFormat::Rg11b10Ufloat, 64, 64, true)
                .is_ok()
        );
    }

    #[test]
    fn oversized_and_empty_extents_are_rejected() {
        let caps = caps(wgpu::Features::empty());
        let max = caps.max_texture_dimension_2d;
        assert!(
            caps.check_color_target("mip", wgpu::TextureFormat::Rgba16Float, max + 1, 4, false)
                .is_err()
        );
        assert!(
            caps.check_color_target("mip", wgpu::TextureFormat::Rgba16Float, 0, 4, false)
                .is_err()
        );
    }

    #[test]
    fn depth_cube_requires_depth_format() {
        let caps = caps(wgpu::Features::empty());
        assert!(
            caps.check_depth_cube("cube", wgpu::TextureFormat::Depth32Float, 512)
                .is_ok()
        );
        assert!(
            caps.check_depth_cube("cube", wgpu::TextureFormat::Rgba8Unorm, 512)
                .is_err()
        );
    }
}
