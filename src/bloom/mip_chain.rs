//! Bloom Mip Chain
//!
//! A fixed-length sequence of progressively half-sized color targets. Level 0
//! matches the viewport; each following level is `max(1, floor(size / 2))`
//! per component. The length never changes after construction; resizing
//! reallocates the same number of levels.

use glam::{UVec2, Vec2};

use crate::errors::{PostFxError, Result};
use crate::gpu::TargetCapabilities;
use crate::resources::{AllocationCounter, ScopedTarget, Tracked};

/// Dimensions of one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MipExtent {
    pub size: Vec2,
    pub int_size: UVec2,
}

/// Extents of a chain of `mip_count` levels starting at `width` x `height`.
#[must_use]
pub fn mip_chain_extents(width: u32, height: u32, mip_count: u32) -> Vec<MipExtent> {
    let mut int_size = UVec2::new(width, height).max(UVec2::ONE);
    let mut size = int_size.as_vec2();
    let mut extents = Vec::with_capacity(mip_count as usize);
    for _ in 0..mip_count {
        extents.push(MipExtent { size, int_size });
        size = (size * 0.5).max(Vec2::ONE);
        int_size = (int_size / 2).max(UVec2::ONE);
    }
    extents
}

/// One allocated level.
pub struct MipLevel {
    pub size: Vec2,
    pub int_size: UVec2,
    view: Tracked<wgpu::TextureView>,
    target: ScopedTarget,
}

impl MipLevel {
    #[inline]
    #[must_use]
    pub fn view(&self) -> &Tracked<wgpu::TextureView> {
        &self.view
    }

    /// Backing texture. Levels allow `COPY_SRC` for debug readback.
    #[inline]
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        self.target.texture()
    }
}

pub struct MipChainStore {
    format: wgpu::TextureFormat,
    mip_count: u32,
    counter: AllocationCounter,
    levels: Vec<MipLevel>,
}

impl MipChainStore {
    /// Creates an empty store for `mip_count` levels of `format`.
    #[must_use]
    pub fn new(format: wgpu::TextureFormat, mip_count: u32, counter: AllocationCounter) -> Self {
        Self {
            format,
            mip_count,
            counter,
            levels: Vec::new(),
        }
    }

    /// Validates and allocates every level. A no-op when already initialized.
    ///
    /// All levels are checked before the first texture is created, so a
    /// failure leaves the store empty.
    pub fn initialize(
        &mut self,
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        if self.mip_count == 0 {
            return Err(PostFxError::InvalidSetting {
                name: "bloom.mip_chain_length",
                reason: "a mip chain needs at least one level".to_string(),
            });
        }

        let extents = mip_chain_extents(width, height, self.mip_count);
        for (i, extent) in extents.iter().enumerate() {
            caps.check_color_target(
                &format!("Bloom Mip {i}"),
                self.format,
                extent.int_size.x,
                extent.int_size.y,
                true,
            )?;
        }

        self.levels = extents
            .iter()
            .enumerate()
            .map(|(i, extent)| self.allocate_level(device, i, *extent))
            .collect();

        log::debug!(
            "Bloom mip chain: {} levels of {:?} from {}x{}",
            self.levels.len(),
            self.format,
            extents[0].int_size.x,
            extents[0].int_size.y
        );
        Ok(())
    }

    fn allocate_level(&self, device: &wgpu::Device, index: usize, extent: MipExtent) -> MipLevel {
        let label = format!("Bloom Mip {index}");
        let target = ScopedTarget::new(
            device,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: extent.int_size.x,
                    height: extent.int_size.y,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            &self.counter,
        );
        let view = Tracked::new(target.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&label),
            ..Default::default()
        }));
        MipLevel {
            size: extent.size,
            int_size: extent.int_size,
            view,
            target,
        }
    }

    /// Releases every level. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if !self.levels.is_empty() {
            log::debug!("Bloom mip chain released ({} levels)", self.levels.len());
        }
        self.levels.clear();
    }

    /// Reallocates the chain for a new viewport with the same level count.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.teardown();
        self.initialize(device, caps, width, height)
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.levels.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, index: usize) -> Option<&MipLevel> {
        self.levels.get(index)
    }

    /// Level at `index`, clamped into the chain. `None` only when empty.
    #[must_use]
    pub fn clamped(&self, index: isize) -> Option<&MipLevel> {
        let last = self.levels.len().checked_sub(1)?;
        let index = index.clamp(0, last as isize) as usize;
        self.levels.get(index)
    }

    #[must_use]
    pub fn extents(&self) -> Vec<MipExtent> {
        self.levels
            .iter()
            .map(|level| MipExtent {
                size: level.size,
                int_size: level.int_size,
            })
            .collect()
    }

    #[must_use]
    pub fn counter(&self) -> &AllocationCounter {
        &self.counter
    }
}
