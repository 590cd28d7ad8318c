//! Point-light depth cubemaps.

use crate::errors::Result;
use crate::gpu::TargetCapabilities;
use crate::resources::{AllocationCounter, ScopedTarget, Tracked};

use super::faces::CubeFace;

/// Depth format of every shadow cubemap. Holds light distance / far plane.
pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One light slot's cubemap: six renderable face views plus a sampleable cube view.
pub struct ShadowCubemap {
    target: ScopedTarget,
    face_views: [wgpu::TextureView; 6],
    cube_view: Tracked<wgpu::TextureView>,
    resolution: u32,
}

impl ShadowCubemap {
    /// Validates and allocates the cubemap for `slot`.
    pub fn new(
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        counter: &AllocationCounter,
        slot: usize,
        resolution: u32,
    ) -> Result<Self> {
        let label = format!("Point Shadow Cubemap {slot}");
        caps.check_depth_cube(&label, SHADOW_DEPTH_FORMAT, resolution)?;

        let target = ScopedTarget::new(
            device,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: resolution,
                    height: resolution,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SHADOW_DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            counter,
        );

        let face_views = CubeFace::ALL.map(|face| {
            target.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{label} {face:?}")),
                format: Some(SHADOW_DEPTH_FORMAT),
                dimension: Some(wgpu::TextureViewDimension::D2),
                aspect: wgpu::TextureAspect::DepthOnly,
                base_mip_level: 0,
                mip_level_count: Some(1),
                base_array_layer: face.layer(),
                array_layer_count: Some(1),
                usage: Some(wgpu::TextureUsages::RENDER_ATTACHMENT),
            })
        });

        let cube_view = Tracked::new(target.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} Cube View")),
            format: Some(SHADOW_DEPTH_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            aspect: wgpu::TextureAspect::DepthOnly,
            base_mip_level: 0,
            mip_level_count: Some(1),
            base_array_layer: 0,
            array_layer_count: Some(6),
            usage: Some(wgpu::TextureUsages::TEXTURE_BINDING),
        }));

        Ok(Self {
            target,
            face_views,
            cube_view,
            resolution,
        })
    }

    /// Six-layer depth texture, layer order as [`CubeFace::layer`].
    #[inline]
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        self.target.texture()
    }

    #[inline]
    #[must_use]
    pub fn face_view(&self, face: CubeFace) -> &wgpu::TextureView {
        &self.face_views[face as usize]
    }

    #[inline]
    #[must_use]
    pub fn face_views(&self) -> &[wgpu::TextureView; 6] {
        &self.face_views
    }

    #[inline]
    #[must_use]
    pub fn cube_view(&self) -> &Tracked<wgpu::TextureView> {
        &self.cube_view
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

/// A light slot's cubemap, or the reason it could not be built.
pub enum ShadowSlot {
    Ready(ShadowCubemap),
    Incomplete { reason: String },
}

impl ShadowSlot {
    /// Builds the slot, recording a failed completeness check instead of failing.
    pub fn allocate(
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        counter: &AllocationCounter,
        slot: usize,
        resolution: u32,
    ) -> Self {
        match ShadowCubemap::new(device, caps, counter, slot, resolution) {
            Ok(cubemap) => Self::Ready(cubemap),
            Err(err) => {
                log::warn!("Shadow slot {slot} unavailable: {err}");
                Self::Incomplete {
                    reason: err.to_string(),
                }
            }
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Sampler for reading shadow cubemaps from lighting shaders.
///
/// Depth textures are not filterable, so lookups use nearest sampling.
#[must_use]
pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Point Shadow Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
