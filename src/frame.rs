//! Frame Orchestration
//!
//! [`FrameRenderer`] owns every pass and records one frame in the only valid
//! order:
//!
//! 1. point-light shadow cubemaps, one sub-pass per active light;
//! 2. the caller's main scene pass into the multisampled HDR target;
//! 3. resolve to single-sample (attachment resolve);
//! 4. bloom over the resolved bright-color attachment;
//! 5. the tone-mapped composite onto the output surface.

use crate::bloom::BloomPipeline;
use crate::composite::{CompositeTarget, FinalCompositor};
use crate::context::{FrameContext, TargetBinding, Viewport};
use crate::errors::Result;
use crate::gpu::TargetCapabilities;
use crate::resources::{AllocationCounter, ScopedTarget, Tracked};
use crate::scene::{SceneDescription, collect_depth_draws};
use crate::settings::PostFxSettings;
use crate::shadow::{OmniShadowPass, ShadowOutcome};

/// Color format of both HDR attachments.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth format of the main scene pass.
pub const HDR_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Number of color attachments of the main pass: scene color and bright color.
pub const HDR_ATTACHMENTS: usize = 2;

struct Attachment {
    view: Tracked<wgpu::TextureView>,
    _target: ScopedTarget,
}

impl Attachment {
    fn new(
        device: &wgpu::Device,
        counter: &AllocationCounter,
        label: &str,
        format: wgpu::TextureFormat,
        size: wgpu::Extent3d,
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let target = ScopedTarget::new(
            device,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            },
            counter,
        );
        let view = Tracked::new(target.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            ..Default::default()
        }));
        Self {
            view,
            _target: target,
        }
    }
}

/// Multisampled HDR scene target with single-sample resolve attachments.
///
/// Attachment 0 is scene color, attachment 1 the bloom source.
pub struct HdrTargets {
    width: u32,
    height: u32,
    sample_count: u32,
    multisampled: Vec<Attachment>,
    resolved: Vec<Attachment>,
    depth: Attachment,
}

impl HdrTargets {
    pub fn new(
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        counter: &AllocationCounter,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Result<Self> {
        let sample_count = sample_count.max(1);
        caps.check_color_target("HDR Resolve", HDR_FORMAT, width, height, false)?;
        caps.check_multisampled("HDR Color", HDR_FORMAT, width, height, sample_count)?;
        caps.check_multisampled("HDR Depth", HDR_DEPTH_FORMAT, width, height, sample_count)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let resolved = (0..HDR_ATTACHMENTS)
            .map(|i| {
                Attachment::new(
                    device,
                    counter,
                    &format!("HDR Resolved {i}"),
                    HDR_FORMAT,
                    size,
                    1,
                    wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                )
            })
            .collect();
        let multisampled = if sample_count > 1 {
            (0..HDR_ATTACHMENTS)
                .map(|i| {
                    Attachment::new(
                        device,
                        counter,
                        &format!("HDR Multisampled {i}"),
                        HDR_FORMAT,
                        size,
                        sample_count,
                        wgpu::TextureUsages::RENDER_ATTACHMENT,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        let depth = Attachment::new(
            device,
            counter,
            "HDR Depth",
            HDR_DEPTH_FORMAT,
            size,
            sample_count,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        log::debug!("HDR targets {width}x{height}, {sample_count}x MSAA");
        Ok(Self {
            width,
            height,
            sample_count,
            multisampled,
            resolved,
            depth,
        })
    }

    /// Color attachments of the main pass, resolving into the single-sample views.
    #[must_use]
    pub fn color_attachments(&self) -> Vec<Option<wgpu::RenderPassColorAttachment<'_>>> {
        let clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        };
        self.resolved
            .iter()
            .enumerate()
            .map(|(i, resolved)| {
                let attachment = match self.multisampled.get(i) {
                    Some(msaa) => wgpu::RenderPassColorAttachment {
                        view: &msaa.view,
                        resolve_target: Some(&resolved.view),
                        ops: wgpu::Operations {
                            load: clear.load,
                            store: wgpu::StoreOp::Discard,
                        },
                        depth_slice: None,
                    },
                    None => wgpu::RenderPassColorAttachment {
                        view: &resolved.view,
                        resolve_target: None,
                        ops: clear,
                        depth_slice: None,
                    },
                };
                Some(attachment)
            })
            .collect()
    }

    #[must_use]
    pub fn depth_attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops: None,
        }
    }

    /// Resolved scene color, read by the compositor.
    #[must_use]
    pub fn scene_color(&self) -> &Tracked<wgpu::TextureView> {
        &self.resolved[0].view
    }

    /// Resolved bright color, the bloom source.
    #[must_use]
    pub fn bright_color(&self) -> &Tracked<wgpu::TextureView> {
        &self.resolved[1].view
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

/// What happened during the last [`FrameRenderer::render_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub lights_shadowed: usize,
    pub lights_skipped: usize,
    pub shadow_draws: usize,
    pub bloom_steps: usize,
}

/// Owns the shadow, bloom and composite passes and runs them in frame order.
pub struct FrameRenderer {
    settings: PostFxSettings,
    caps: TargetCapabilities,
    counter: AllocationCounter,
    hdr: HdrTargets,
    shadows: OmniShadowPass,
    bloom: Option<BloomPipeline>,
    compositor: FinalCompositor,
    stats: FrameStats,
}

impl FrameRenderer {
    /// Builds every pass for a `width` x `height` output.
    ///
    /// Degenerate settings are clamped first. Fails when the HDR targets or
    /// the bloom chain are not complete render targets on this device.
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        settings: PostFxSettings,
    ) -> Result<Self> {
        let settings = settings.sanitized();
        let caps = TargetCapabilities::from_device(device);
        let counter = AllocationCounter::new();

        let hdr = HdrTargets::new(device, &caps, &counter, width, height, settings.msaa_samples)?;
        let shadows = OmniShadowPass::new(device, &caps, &settings.shadow, &counter);
        let bloom = if settings.bloom.enabled {
            Some(BloomPipeline::new(
                device,
                &caps,
                width,
                height,
                &settings.bloom,
                counter.clone(),
            )?)
        } else {
            None
        };
        let compositor = FinalCompositor::new(device, output_format, &settings.tone_mapping);

        log::info!(
            "Frame renderer ready: {width}x{height}, bloom {}, {} shadow slots",
            if bloom.is_some() { "on" } else { "off" },
            shadows.slot_count()
        );
        Ok(Self {
            settings,
            caps,
            counter,
            hdr,
            shadows,
            bloom,
            compositor,
            stats: FrameStats::default(),
        })
    }

    /// Reallocates every viewport-sized target.
    ///
    /// Cached composite bind groups are dropped first, so a failed
    /// reallocation does not keep the old targets alive through them.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<()> {
        self.compositor.invalidate();
        self.hdr = HdrTargets::new(
            device,
            &self.caps,
            &self.counter,
            width,
            height,
            self.settings.msaa_samples,
        )?;
        if let Some(bloom) = &mut self.bloom {
            bloom.resize(device, width, height)?;
        }
        Ok(())
    }

    /// Records one frame.
    ///
    /// `main_pass` draws the scene into the already-begun HDR pass. It
    /// receives one entry per light: the light's shadow cubemap, or `None`
    /// when the light is unshadowed this frame.
    pub fn render_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        scene: &SceneDescription,
        target: CompositeTarget<'_>,
        main_pass: impl FnOnce(&mut wgpu::RenderPass<'_>, &[Option<&Tracked<wgpu::TextureView>>]),
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        self.shadows.begin_frame();
        for (index, light) in scene.lights.iter().enumerate() {
            let outcome = self.shadows.render_light(ctx, index, light.position, |list| {
                collect_depth_draws(scene, list);
            });
            match outcome {
                ShadowOutcome::Rendered { draws } => {
                    stats.lights_shadowed += 1;
                    stats.shadow_draws += draws;
                }
                ShadowOutcome::Skipped(_) => stats.lights_skipped += 1,
            }
        }

        let shadow_views: Vec<_> = (0..scene.lights.len())
            .map(|index| self.shadows.shadow_view(index))
            .collect();
        let hdr_viewport = self.hdr.viewport();
        ctx.bind_target(TargetBinding::SceneHdr, hdr_viewport);
        {
            let color_attachments = self.hdr.color_attachments();
            let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HDR Scene Pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: Some(self.hdr.depth_attachment()),
                ..Default::default()
            });
            hdr_viewport.apply(&mut pass);
            main_pass(&mut pass, &shadow_views);
        }
        ctx.state.unbind();

        if let Some(bloom) = &mut self.bloom {
            let radius = ctx.params.filter_radius;
            stats.bloom_steps = bloom.render_bloom(ctx, self.hdr.bright_color(), radius);
        }

        let bloom_view = self.bloom.as_ref().and_then(BloomPipeline::bloom_texture);
        let exposure = ctx.params.exposure;
        self.compositor
            .composite(ctx, self.hdr.scene_color(), bloom_view, exposure, target);

        log::debug!(
            "Frame: {} lights shadowed, {} skipped, {} bloom steps",
            stats.lights_shadowed,
            stats.lights_skipped,
            stats.bloom_steps
        );
        self.stats = stats;
        stats
    }

    #[must_use]
    pub fn settings(&self) -> &PostFxSettings {
        &self.settings
    }

    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    #[must_use]
    pub fn hdr_targets(&self) -> &HdrTargets {
        &self.hdr
    }

    #[must_use]
    pub fn shadows(&self) -> &OmniShadowPass {
        &self.shadows
    }

    #[must_use]
    pub fn compositor(&self) -> &FinalCompositor {
        &self.compositor
    }

    #[must_use]
    pub fn bloom(&self) -> Option<&BloomPipeline> {
        self.bloom.as_ref()
    }

    #[must_use]
    pub fn allocation_counter(&self) -> &AllocationCounter {
        &self.counter
    }
}
