//! 3x3 tent upsample with additive accumulation.
//!
//! Intermediate levels blend `src One + dst One`. The step into mip 0 uses
//! `src Constant + dst Constant` with the blend constant set to `1 / N`, which
//! adds the last contribution and normalizes the whole sum in one draw.

use bytemuck::{Pod, Zeroable};

use crate::gpu::FullscreenPipelines;
use crate::gpu::fullscreen::{
    draw_fullscreen, filterable_texture_entry, filtering_sampler_entry, record_uniform_write,
    uniform_entry,
};
use crate::resources::Tracked;
use crate::shaders;

use super::downsample::create_bind_group;
use super::mip_chain::MipChainStore;
use super::plan::{BlendMode, BloomStep, StepSource};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct UpsampleUniforms {
    filter_radius: f32,
    _pad: [f32; 3],
}

/// Renders each upsample step of a [`super::BloomPlan`].
///
/// Every step adds its filtered result onto the next larger mip without
/// clearing it.
pub struct Upsampler {
    layout: wgpu::BindGroupLayout,
    additive: wgpu::RenderPipeline,
    normalize: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    /// Indexed by source mip; entry 0 is never read.
    bind_groups: Vec<Option<wgpu::BindGroup>>,
}

impl Upsampler {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        fullscreen: &FullscreenPipelines,
        format: wgpu::TextureFormat,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Upsample Layout"),
            entries: &[
                filterable_texture_entry(0),
                filtering_sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT, false),
            ],
        });

        let module = FullscreenPipelines::fragment_module(
            device,
            "Bloom Upsample Shader",
            shaders::BLOOM_UPSAMPLE_WGSL,
        );
        let blended = |label: &str, factor: wgpu::BlendFactor| {
            let component = wgpu::BlendComponent {
                src_factor: factor,
                dst_factor: factor,
                operation: wgpu::BlendOperation::Add,
            };
            fullscreen.create_pipeline(
                device,
                label,
                &module,
                &layout,
                wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState {
                        color: component,
                        alpha: component,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                },
            )
        };
        let additive = blended("Bloom Upsample Pipeline", wgpu::BlendFactor::One);
        let normalize = blended("Bloom Upsample Normalize Pipeline", wgpu::BlendFactor::Constant);

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Bloom Upsample Uniforms"),
            size: std::mem::size_of::<UpsampleUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            layout,
            additive,
            normalize,
            uniforms,
            bind_groups: Vec::new(),
        }
    }

    /// Records the tent radius ahead of the upsample steps that follow it.
    pub fn set_filter_radius(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        radius: f32,
    ) {
        let data = UpsampleUniforms {
            filter_radius: radius,
            ..Default::default()
        };
        record_uniform_write(device, encoder, &self.uniforms, bytemuck::bytes_of(&data));
    }

    /// Rebuilds the per-mip bind groups after the chain was (re)allocated.
    pub fn rebuild(
        &mut self,
        device: &wgpu::Device,
        chain: &MipChainStore,
        sampler: &Tracked<wgpu::Sampler>,
    ) {
        self.bind_groups = chain
            .levels()
            .iter()
            .enumerate()
            .map(|(i, level)| {
                (i > 0).then(|| {
                    create_bind_group(
                        device,
                        &self.layout,
                        &format!("Bloom Upsample BG {i}"),
                        level.view(),
                        sampler,
                        &self.uniforms,
                    )
                })
            })
            .collect();
    }

    pub fn release_bind_groups(&mut self) {
        self.bind_groups.clear();
    }

    /// Records one upsample step, blending onto its destination mip.
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, step: &BloomStep, chain: &MipChainStore) {
        let StepSource::Mip(source) = step.source else {
            log::warn!("Bloom upsample step must read a mip");
            return;
        };
        let (Some(level), Some(Some(bind_group))) =
            (chain.level(step.target), self.bind_groups.get(source))
        else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Bloom Upsample"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: level.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        step.viewport.apply(&mut pass);
        match step.blend {
            BlendMode::Normalize { weight } => {
                let w = f64::from(weight);
                pass.set_pipeline(&self.normalize);
                pass.set_blend_constant(wgpu::Color {
                    r: w,
                    g: w,
                    b: w,
                    a: w,
                });
            }
            BlendMode::Additive | BlendMode::Replace => pass.set_pipeline(&self.additive),
        }
        pass.set_bind_group(0, bind_group, &[]);
        draw_fullscreen(&mut pass);
    }
}
