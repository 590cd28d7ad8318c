//! Bloom Pipeline
//!
//! Owns the mip chain and both filters, and runs a [`BloomPlan`] against
//! them. The result is mip 0: every level's contribution, normalized so a
//! flat source comes back at its own brightness.

use crate::context::FrameContext;
use crate::errors::Result;
use crate::gpu::fullscreen::linear_clamp_sampler;
use crate::gpu::{FullscreenPipelines, TargetCapabilities};
use crate::resources::{AllocationCounter, Tracked};
use crate::settings::BloomSettings;

use super::downsample::Downsampler;
use super::mip_chain::MipChainStore;
use super::plan::{BloomPlan, StepKind};
use super::upsample::Upsampler;

pub struct BloomPipeline {
    caps: TargetCapabilities,
    karis_average: bool,
    sampler: Tracked<wgpu::Sampler>,
    chain: MipChainStore,
    downsampler: Downsampler,
    upsampler: Upsampler,
    plan: BloomPlan,
}

impl BloomPipeline {
    /// Validates and allocates the mip chain for a `width` x `height` viewport.
    ///
    /// Fails with [`crate::errors::PostFxError::InitializationFailure`] when
    /// any level is not a complete render target; nothing is returned in
    /// that case.
    pub fn new(
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        width: u32,
        height: u32,
        settings: &BloomSettings,
        counter: AllocationCounter,
    ) -> Result<Self> {
        let format = settings.format.texture_format();
        let mut chain = MipChainStore::new(format, settings.mip_chain_length(), counter);
        chain.initialize(device, caps, width, height)?;

        let fullscreen = FullscreenPipelines::new(device);
        let sampler = Tracked::new(linear_clamp_sampler(device, "Bloom Linear Sampler"));
        let mut downsampler = Downsampler::new(device, &fullscreen, format);
        let mut upsampler = Upsampler::new(device, &fullscreen, format);
        downsampler.rebuild(device, &chain, &sampler);
        upsampler.rebuild(device, &chain, &sampler);

        let plan = BloomPlan::from_extents(&chain.extents(), settings.karis_average);
        Ok(Self {
            caps: *caps,
            karis_average: settings.karis_average,
            sampler,
            chain,
            downsampler,
            upsampler,
            plan,
        })
    }

    /// Reallocates the chain for a new viewport. The level count is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<()> {
        let result = self.chain.resize(device, &self.caps, width, height);
        self.downsampler.rebuild(device, &self.chain, &self.sampler);
        self.upsampler.rebuild(device, &self.chain, &self.sampler);
        self.plan = BloomPlan::from_extents(&self.chain.extents(), self.karis_average);
        result
    }

    /// Releases the mip chain. Rendering becomes a no-op until [`Self::resize`].
    pub fn teardown(&mut self) {
        self.chain.teardown();
        self.downsampler.release_bind_groups();
        self.upsampler.release_bind_groups();
        self.plan = BloomPlan::default();
    }

    /// Downsamples `source` through the chain and upsamples back into mip 0.
    ///
    /// The caller's viewport is restored and the destination unbound before
    /// returning. Returns the number of steps recorded.
    pub fn render_bloom(
        &mut self,
        ctx: &mut FrameContext<'_>,
        source: &Tracked<wgpu::TextureView>,
        filter_radius: f32,
    ) -> usize {
        if !self.chain.is_initialized() {
            log::warn!("Bloom requested with no allocated mip chain, skipping");
            return 0;
        }

        let radius = if filter_radius.is_finite() {
            filter_radius.max(0.0)
        } else {
            0.0
        };
        self.upsampler.set_filter_radius(ctx.device, ctx.encoder, radius);

        let Self {
            sampler,
            chain,
            downsampler,
            upsampler,
            plan,
            ..
        } = self;
        let device: &wgpu::Device = ctx.device;
        let encoder: &mut wgpu::CommandEncoder = &mut *ctx.encoder;
        let state = &mut ctx.state;

        plan.execute(state, |step| match step.kind {
            StepKind::Downsample { .. } => {
                downsampler.record(device, encoder, step, chain, source, sampler);
            }
            StepKind::Upsample => upsampler.record(encoder, step, chain),
        });
        plan.steps().len()
    }

    /// Final bloom image (mip 0). `None` after teardown.
    #[must_use]
    pub fn bloom_texture(&self) -> Option<&Tracked<wgpu::TextureView>> {
        self.chain.level(0).map(|level| level.view())
    }

    /// Any level of the chain, with `index` clamped into `[0, N-1]`.
    #[must_use]
    pub fn bloom_mip(&self, index: isize) -> Option<&Tracked<wgpu::TextureView>> {
        self.chain.clamped(index).map(|level| level.view())
    }

    #[must_use]
    pub fn mip_count(&self) -> u32 {
        self.chain.mip_count()
    }

    #[must_use]
    pub fn mip_chain(&self) -> &MipChainStore {
        &self.chain
    }

    #[must_use]
    pub fn plan(&self) -> &BloomPlan {
        &self.plan
    }
}
