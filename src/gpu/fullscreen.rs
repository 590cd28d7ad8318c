// ============================================================================
// Full-Screen Pass Helper
// ============================================================================

use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::shaders;

/// Shared vertex stage for every full-screen pass.
///
/// A single oversized triangle covers the viewport; no vertex buffers are
/// bound. Each pipeline object owns one of these and builds its pipelines
/// once at construction.
pub struct FullscreenPipelines {
    vertex: wgpu::ShaderModule,
}

impl FullscreenPipelines {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fullscreen Triangle Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shaders::FULLSCREEN_WGSL)),
        });
        Self { vertex }
    }

    /// Creates a fragment module from WGSL source.
    #[must_use]
    pub fn fragment_module(
        device: &wgpu::Device,
        label: &str,
        source: &'static str,
    ) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        })
    }

    /// Builds a full-screen pipeline with one color target and one bind group.
    #[must_use]
    pub fn create_pipeline(
        &self,
        device: &wgpu::Device,
        label: &str,
        fragment: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
        target: wgpu::ColorTargetState,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Layout")),
            bind_group_layouts: &[Some(layout)],
            immediate_size: 0,
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.vertex,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(target)],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Records the full-screen triangle.
#[inline]
pub fn draw_fullscreen(pass: &mut wgpu::RenderPass<'_>) {
    pass.draw(0..3, 0..1);
}

// ============================================================================
// Layout entries
// ============================================================================

#[must_use]
pub fn filterable_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

#[must_use]
pub fn filtering_sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

#[must_use]
pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Linear, clamp-to-edge sampler used by every post-processing read.
#[must_use]
pub fn linear_clamp_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        ..Default::default()
    })
}

/// Records a write of `bytes` to the start of `buffer` at the encoder's
/// current position.
///
/// `Queue::write_buffer` lands before the whole submit, so two passes recorded
/// into one encoder would both read the last value written. Copying from a
/// staging buffer keeps each write ordered with the passes around it.
pub fn record_uniform_write(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    buffer: &wgpu::Buffer,
    bytes: &[u8],
) {
    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Uniform Staging"),
        contents: bytes,
        usage: wgpu::BufferUsages::COPY_SRC,
    });
    encoder.copy_buffer_to_buffer(&staging, 0, buffer, 0, bytes.len() as u64);
}
