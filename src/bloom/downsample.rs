//! 13-tap bloom downsample.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::gpu::FullscreenPipelines;
use crate::gpu::fullscreen::{
    draw_fullscreen, filterable_texture_entry, filtering_sampler_entry, uniform_entry,
};
use crate::resources::{BindGroupCache, BindGroupKey, Tracked};
use crate::shaders;

use super::mip_chain::MipChainStore;
use super::plan::{BloomStep, StepSource};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct DownsampleUniforms {
    use_karis_average: u32,
    _pad: [u32; 3],
}

/// Renders each downsample step of a [`super::BloomPlan`].
///
/// The Karis flag lives in two static uniform buffers; a step picks one by
/// its own `karis` flag. Mip-to-mip bind groups are built once per chain
/// allocation, the source bind group is cached by the source view's id.
pub struct Downsampler {
    layout: Tracked<wgpu::BindGroupLayout>,
    pipeline: wgpu::RenderPipeline,
    karis_on: Tracked<wgpu::Buffer>,
    karis_off: Tracked<wgpu::Buffer>,
    /// Indexed by destination mip; entry 0 reads the external source instead.
    chain_bind_groups: Vec<Option<wgpu::BindGroup>>,
    source_bind_groups: BindGroupCache,
}

impl Downsampler {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        fullscreen: &FullscreenPipelines,
        format: wgpu::TextureFormat,
    ) -> Self {
        let layout = Tracked::new(device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Downsample Layout"),
                entries: &[
                    filterable_texture_entry(0),
                    filtering_sampler_entry(1),
                    uniform_entry(2, wgpu::ShaderStages::FRAGMENT, false),
                ],
            },
        ));

        let module = FullscreenPipelines::fragment_module(
            device,
            "Bloom Downsample Shader",
            shaders::BLOOM_DOWNSAMPLE_WGSL,
        );
        let pipeline = fullscreen.create_pipeline(
            device,
            "Bloom Downsample Pipeline",
            &module,
            &layout,
            wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            },
        );

        let make_flag = |label: &str, enabled: bool| {
            Tracked::new(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&DownsampleUniforms {
                    use_karis_average: u32::from(enabled),
                    ..Default::default()
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            }))
        };

        Self {
            layout,
            pipeline,
            karis_on: make_flag("Bloom Downsample Karis On", true),
            karis_off: make_flag("Bloom Downsample Karis Off", false),
            chain_bind_groups: Vec::new(),
            source_bind_groups: BindGroupCache::new(),
        }
    }

    /// Rebuilds the mip-to-mip bind groups after the chain was (re)allocated.
    pub fn rebuild(
        &mut self,
        device: &wgpu::Device,
        chain: &MipChainStore,
        sampler: &Tracked<wgpu::Sampler>,
    ) {
        self.source_bind_groups.clear();
        self.chain_bind_groups = (0..chain.levels().len())
            .map(|target| {
                let source = target.checked_sub(1).and_then(|i| chain.level(i))?;
                Some(create_bind_group(
                    device,
                    &self.layout,
                    &format!("Bloom Downsample BG {target}"),
                    source.view(),
                    sampler,
                    &self.karis_off,
                ))
            })
            .collect();
    }

    pub fn release_bind_groups(&mut self) {
        self.chain_bind_groups.clear();
        self.source_bind_groups.clear();
    }

    /// Records one downsample step into its destination mip.
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        step: &BloomStep,
        chain: &MipChainStore,
        source: &Tracked<wgpu::TextureView>,
        sampler: &Tracked<wgpu::Sampler>,
    ) {
        let Some(level) = chain.level(step.target) else {
            return;
        };

        let bind_group = match step.source {
            StepSource::External => {
                let flag = if step.karis() {
                    &self.karis_on
                } else {
                    &self.karis_off
                };
                let key = BindGroupKey::new(self.layout.id())
                    .with_resource(source.id())
                    .with_resource(sampler.id())
                    .with_resource(flag.id());
                let layout = &self.layout;
                self.source_bind_groups.get_or_create(key, || {
                    create_bind_group(device, layout, "Bloom Downsample Source BG", source, sampler, flag)
                })
            }
            StepSource::Mip(_) => {
                let Some(bind_group) = self
                    .chain_bind_groups
                    .get(step.target)
                    .and_then(Option::as_ref)
                else {
                    log::warn!("Bloom downsample into mip {} has no bind group", step.target);
                    return;
                };
                bind_group.clone()
            }
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Bloom Downsample"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: level.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        step.viewport.apply(&mut pass);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        draw_fullscreen(&mut pass);
    }
}

/// Texture + sampler + uniform bind group shared by both bloom filters.
pub(crate) fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniforms.as_entire_binding(),
            },
        ],
    })
}
