//! Per-Frame Context
//!
//! Everything a pass needs to record work is handed to it explicitly through
//! [`FrameContext`]: the device, the queue, the command encoder and the frame's
//! scalar parameters. Render-destination and viewport bookkeeping lives in
//! [`RenderState`], which is plain data so the CPU reference executors can
//! drive it exactly like the GPU passes do.

use glam::UVec2;

use crate::settings::PostFxSettings;
use crate::shadow::CubeFace;

/// Pixel rectangle that rasterization is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn from_size(size: UVec2) -> Self {
        Self::new(size.x, size.y)
    }

    #[must_use]
    pub const fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Applies this rectangle to a render pass.
    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
            0.0,
            1.0,
        );
    }
}

/// The render destination currently bound for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetBinding {
    /// Nothing bound. The state every pass leaves behind.
    #[default]
    Unbound,
    /// The multisampled HDR scene target.
    SceneHdr,
    /// One level of the bloom mip chain.
    BloomMip(usize),
    /// One face of a point-light shadow cubemap.
    ShadowFace { slot: usize, face: CubeFace },
    /// The presentation surface.
    Surface,
}

/// Destination binding plus viewport.
///
/// Passes rebind explicitly before writing and never assume what the previous
/// pass left bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub binding: TargetBinding,
    pub viewport: Viewport,
}

impl RenderState {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            binding: TargetBinding::Unbound,
            viewport,
        }
    }

    /// Makes `binding` the active destination and restricts drawing to `viewport`.
    pub fn bind_target(&mut self, binding: TargetBinding, viewport: Viewport) {
        self.binding = binding;
        self.viewport = viewport;
    }

    pub fn unbind(&mut self) {
        self.binding = TargetBinding::Unbound;
    }
}

/// Scalars read once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Caller's output viewport.
    pub viewport: Viewport,
    /// Linear brightness multiplier. Never negative.
    pub exposure: f32,
    /// Bloom tent offset in source UV units. Never negative.
    pub filter_radius: f32,
    pub bloom_strength: f32,
    pub shadows_enabled: bool,
}

impl FrameParams {
    #[must_use]
    pub fn from_settings(settings: &PostFxSettings, viewport: Viewport) -> Self {
        Self {
            viewport,
            exposure: settings.tone_mapping.exposure.max(0.0),
            filter_radius: settings.bloom.filter_radius(),
            bloom_strength: settings.bloom.strength(),
            shadows_enabled: settings.shadow.enabled,
        }
    }

    /// Nudges exposure by `delta`, clamping at zero. Non-finite deltas are ignored.
    pub fn adjust_exposure(&mut self, delta: f32) {
        if !delta.is_finite() {
            log::warn!("Ignoring non-finite exposure delta");
            return;
        }
        self.exposure = (self.exposure + delta).max(0.0);
    }

    /// Sets the bloom filter radius. Negative and non-finite values become `0.0`.
    pub fn set_filter_radius(&mut self, radius: f32) {
        self.filter_radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    }

    pub fn toggle_shadows(&mut self) {
        self.shadows_enabled = !self.shadows_enabled;
    }
}

/// Explicit per-frame handle passed to every render-loop entry point.
pub struct FrameContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub params: FrameParams,
    pub state: RenderState,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        params: FrameParams,
    ) -> Self {
        Self {
            device,
            queue,
            encoder,
            params,
            state: RenderState::new(params.viewport),
        }
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    pub fn bind_target(&mut self, binding: TargetBinding, viewport: Viewport) {
        self.state.bind_target(binding, viewport);
    }
}
