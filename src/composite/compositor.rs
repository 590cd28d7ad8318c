//! Final Compositor
//!
//! One full-screen pass: scene color plus bloom, exposure, tone mapping, then
//! gamma unless the output is already sRGB. No blending; the output is a pure
//! function of the inputs.

use rustc_hash::FxHashMap;

use crate::context::{FrameContext, TargetBinding};
use crate::gpu::FullscreenPipelines;
use crate::gpu::fullscreen::{
    draw_fullscreen, filterable_texture_entry, filtering_sampler_entry, linear_clamp_sampler,
    record_uniform_write, uniform_entry,
};
use crate::resources::{BindGroupCache, BindGroupKey, Tracked};
use crate::settings::ToneMappingSettings;
use crate::shaders;

use super::tone_mapping::{CompositeParams, CompositeUniforms};

/// Destination of the composite.
#[derive(Clone, Copy)]
pub struct CompositeTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

pub struct FinalCompositor {
    fullscreen: FullscreenPipelines,
    module: wgpu::ShaderModule,
    layout: Tracked<wgpu::BindGroupLayout>,
    sampler: Tracked<wgpu::Sampler>,
    uniforms: Tracked<wgpu::Buffer>,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    bind_groups: BindGroupCache,
    /// 1x1 black stand-in when bloom is disabled.
    no_bloom: Tracked<wgpu::TextureView>,
    settings: ToneMappingSettings,
}

impl FinalCompositor {
    /// Builds the composite pipeline for `output_format`.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        settings: &ToneMappingSettings,
    ) -> Self {
        let fullscreen = FullscreenPipelines::new(device);
        let module =
            FullscreenPipelines::fragment_module(device, "Composite Shader", shaders::COMPOSITE_WGSL);
        let layout = Tracked::new(device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Layout"),
                entries: &[
                    filterable_texture_entry(0),
                    filterable_texture_entry(1),
                    filtering_sampler_entry(2),
                    uniform_entry(3, wgpu::ShaderStages::FRAGMENT, false),
                ],
            },
        ));
        let uniforms = Tracked::new(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        let no_bloom = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Composite No-Bloom Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let no_bloom = Tracked::new(no_bloom.create_view(&wgpu::TextureViewDescriptor::default()));

        let mut compositor = Self {
            fullscreen,
            module,
            layout,
            sampler: Tracked::new(linear_clamp_sampler(device, "Composite Sampler")),
            uniforms,
            pipelines: FxHashMap::default(),
            bind_groups: BindGroupCache::new(),
            no_bloom,
            settings: settings.clone(),
        };
        compositor.add_output_format(device, output_format);
        compositor
    }

    /// Builds the pipeline for another output format.
    pub fn add_output_format(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }
        let pipeline = self.fullscreen.create_pipeline(
            device,
            &format!("Composite Pipeline {format:?}"),
            &self.module,
            &self.layout,
            wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            },
        );
        self.pipelines.insert(format, pipeline);
    }

    #[must_use]
    pub fn settings(&self) -> &ToneMappingSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: &ToneMappingSettings) {
        self.settings = settings.clone();
    }

    /// Drops cached bind groups; call after the inputs were reallocated.
    pub fn invalidate(&mut self) {
        self.bind_groups.clear();
    }

    #[must_use]
    pub fn cached_bind_groups(&self) -> usize {
        self.bind_groups.len()
    }

    /// Parameters the pass will use for this frame.
    #[must_use]
    pub fn params(
        &self,
        ctx: &FrameContext<'_>,
        bloom: Option<&Tracked<wgpu::TextureView>>,
        exposure: f32,
        format: wgpu::TextureFormat,
    ) -> CompositeParams {
        CompositeParams {
            exposure: if exposure.is_finite() { exposure.max(0.0) } else { 0.0 },
            bloom_strength: if bloom.is_some() {
                ctx.params.bloom_strength
            } else {
                0.0
            },
            mode: self.settings.mode,
            gamma: self.settings.gamma,
            apply_gamma: !format.is_srgb(),
        }
    }

    /// Writes the tone-mapped composite of `scene` and `bloom` into `target`.
    pub fn composite(
        &mut self,
        ctx: &mut FrameContext<'_>,
        scene: &Tracked<wgpu::TextureView>,
        bloom: Option<&Tracked<wgpu::TextureView>>,
        exposure: f32,
        target: CompositeTarget<'_>,
    ) {
        let Some(pipeline) = self.pipelines.get(&target.format) else {
            log::error!(
                "Composite pipeline for {:?} was never built, skipping",
                target.format
            );
            return;
        };

        let params = self.params(ctx, bloom, exposure, target.format);
        record_uniform_write(
            ctx.device,
            ctx.encoder,
            &self.uniforms,
            bytemuck::bytes_of(&CompositeUniforms::from(&params)),
        );

        let bloom_view = bloom.unwrap_or(&self.no_bloom);
        let key = BindGroupKey::new(self.layout.id())
            .with_resource(scene.id())
            .with_resource(bloom_view.id())
            .with_resource(self.sampler.id())
            .with_resource(self.uniforms.id());
        let (layout, sampler, uniforms) = (&self.layout, &self.sampler, &self.uniforms);
        let device = ctx.device;
        let bind_group = self.bind_groups.get_or_create(key, || {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Composite BG"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(scene),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(bloom_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
        });

        let viewport = ctx.params.viewport;
        ctx.bind_target(TargetBinding::Surface, viewport);
        {
            let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Final Composite"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });
            viewport.apply(&mut pass);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            draw_fullscreen(&mut pass);
        }
        ctx.state.unbind();
    }
}
