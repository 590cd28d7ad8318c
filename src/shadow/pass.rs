//! Omnidirectional Shadow Pass
//!
//! Renders one depth cubemap per point light. Each light moves through
//! `Idle → Begun → Face(+X) … Face(-Z) → Complete` within a frame, or ends
//! in `Skipped` when it has no usable slot.
//!
//! The scene is traversed once per light: its callback fills a
//! [`DepthDrawList`], which is replayed into all six faces. The face matrix
//! and light data come from a dynamic-offset uniform, one entry per
//! `(slot, face)`; model matrices come from a second dynamic-offset buffer
//! that grows on demand and is rewound every frame.
//!
//! Each light is rendered at most once per frame. Rendering a light that
//! already left `Idle` starts a new frame, the same as [`OmniShadowPass::begin_frame`],
//! so callers that only drive `render_light` still rewind the model buffer
//! and never read a previous frame's `Complete`.

use std::borrow::Cow;
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::context::{FrameContext, TargetBinding, Viewport};
use crate::gpu::TargetCapabilities;
use crate::gpu::fullscreen::uniform_entry;
use crate::resources::{AllocationCounter, Tracked};
use crate::settings::ShadowSettings;
use crate::shaders;

use super::cubemap::{SHADOW_DEPTH_FORMAT, ShadowSlot};
use super::draw_list::DepthDrawList;
use super::faces::{CubeFace, face_view_projections};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FaceUniforms {
    view_projection: Mat4,
    light_position: [f32; 3],
    far_plane: f32,
}

const FACE_UNIFORM_SIZE: u64 = size_of::<FaceUniforms>() as u64;
const MODEL_UNIFORM_SIZE: u64 = size_of::<Mat4>() as u64;

/// Where a light is in its per-frame cubemap render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightPhase {
    #[default]
    Idle,
    Begun,
    Face(CubeFace),
    Complete,
    Skipped,
}

/// Why a light was rendered without a shadow this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Shadows are switched off in the frame parameters.
    Disabled,
    /// The light index is beyond the allocated slots.
    NoSlot,
    /// The slot's cubemap failed its completeness check.
    IncompleteTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowOutcome {
    Rendered { draws: usize },
    Skipped(SkipReason),
}

pub struct OmniShadowPass {
    settings: ShadowSettings,
    slots: Vec<ShadowSlot>,
    phases: Vec<LightPhase>,

    face_buffer: wgpu::Buffer,
    face_bind_group: wgpu::BindGroup,
    face_stride: u32,

    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_stride: u32,
    model_capacity: u32,
    model_cursor: u32,

    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<u64, wgpu::RenderPipeline>,
    draw_list: DepthDrawList,
}

impl OmniShadowPass {
    /// Allocates `settings.max_lights` cubemap slots.
    ///
    /// A slot whose cubemap fails validation is kept as
    /// [`ShadowSlot::Incomplete`]; its light renders unshadowed.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        caps: &TargetCapabilities,
        settings: &ShadowSettings,
        counter: &AllocationCounter,
    ) -> Self {
        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let face_stride = align_to(FACE_UNIFORM_SIZE as u32, min_alignment);
        let model_stride = align_to(MODEL_UNIFORM_SIZE as u32, min_alignment);

        let slots: Vec<ShadowSlot> = (0..settings.max_lights as usize)
            .map(|slot| ShadowSlot::allocate(device, caps, counter, slot, settings.resolution))
            .collect();
        let ready = slots.iter().filter(|s| s.is_ready()).count();
        log::debug!(
            "Allocated {ready}/{} point shadow cubemaps at {}x{}",
            slots.len(),
            settings.resolution,
            settings.resolution
        );

        let face_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Shadow Face Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(FACE_UNIFORM_SIZE),
                },
                count: None,
            }],
        });
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Shadow Model Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, true)],
        });

        let face_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Shadow Face Uniforms"),
            size: u64::from(face_stride) * 6 * slots.len().max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let face_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Shadow Face BindGroup"),
            layout: &face_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &face_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(FACE_UNIFORM_SIZE),
                }),
            }],
        });

        let (model_buffer, model_bind_group) =
            create_model_buffer(device, &model_layout, model_stride, 1);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shadow Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shaders::POINT_SHADOW_DEPTH_WGSL)),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Shadow Pipeline Layout"),
            bind_group_layouts: &[Some(&face_layout), Some(&model_layout)],
            immediate_size: 0,
        });

        let phases = vec![LightPhase::Idle; slots.len()];
        Self {
            settings: settings.clone(),
            slots,
            phases,
            face_buffer,
            face_bind_group,
            face_stride,
            model_layout,
            model_buffer,
            model_bind_group,
            model_stride,
            model_capacity: 1,
            model_cursor: 0,
            shader,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            draw_list: DepthDrawList::new(),
        }
    }

    /// Resets every light to `Idle` and rewinds the model-matrix buffer.
    pub fn begin_frame(&mut self) {
        self.phases.fill(LightPhase::Idle);
        self.model_cursor = 0;
    }

    /// Renders the cubemap of `light_index`.
    ///
    /// `scene_depth` is called exactly once and records the light's shadow
    /// casters; the recorded draws are issued into all six faces. A light
    /// already rendered since the last frame start begins a new frame.
    pub fn render_light(
        &mut self,
        ctx: &mut FrameContext<'_>,
        light_index: usize,
        light_position: Vec3,
        scene_depth: impl FnOnce(&mut DepthDrawList),
    ) -> ShadowOutcome {
        if self.phase(light_index) != LightPhase::Idle {
            log::trace!("Light {light_index} rendered again, starting a new shadow frame");
            self.begin_frame();
        }

        if !ctx.params.shadows_enabled {
            if let Some(phase) = self.phases.get_mut(light_index) {
                *phase = LightPhase::Skipped;
            }
            return ShadowOutcome::Skipped(SkipReason::Disabled);
        }

        let Some(slot) = self.slots.get(light_index) else {
            log::warn!(
                "Light {light_index} exceeds the {} shadow slots, rendering unshadowed",
                self.slots.len()
            );
            return ShadowOutcome::Skipped(SkipReason::NoSlot);
        };
        let (face_views, resolution) = match slot {
            ShadowSlot::Ready(cubemap) => (cubemap.face_views().clone(), cubemap.resolution()),
            ShadowSlot::Incomplete { reason } => {
                log::warn!("Light {light_index} skipped, shadow cubemap incomplete: {reason}");
                self.phases[light_index] = LightPhase::Skipped;
                return ShadowOutcome::Skipped(SkipReason::IncompleteTarget);
            }
        };

        self.phases[light_index] = LightPhase::Begun;
        self.draw_list.clear();
        scene_depth(&mut self.draw_list);

        self.upload_faces(ctx.queue, light_index, light_position);
        let model_base = self.upload_models(ctx.device, ctx.queue);
        for draw in self.draw_list.iter() {
            Self::ensure_pipeline(
                ctx.device,
                &mut self.pipelines,
                &self.pipeline_layout,
                &self.shader,
                draw.geometry.vertex_stride,
            );
        }

        let saved_viewport = ctx.state.viewport;
        let viewport = Viewport::square(resolution);

        for (face, view) in CubeFace::ALL.into_iter().zip(face_views.iter()) {
            self.phases[light_index] = LightPhase::Face(face);
            ctx.bind_target(
                TargetBinding::ShadowFace {
                    slot: light_index,
                    face,
                },
                viewport,
            );

            let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Shadow Face Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            viewport.apply(&mut pass);

            let face_offset = (light_index as u32 * 6 + face.layer()) * self.face_stride;
            pass.set_bind_group(0, &self.face_bind_group, &[face_offset]);

            for (i, draw) in self.draw_list.iter().enumerate() {
                let Some(pipeline) = self.pipelines.get(&draw.geometry.vertex_stride) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                let model_offset = (model_base + i as u32) * self.model_stride;
                pass.set_bind_group(1, &self.model_bind_group, &[model_offset]);
                pass.set_vertex_buffer(0, draw.geometry.vertex_buffer.slice(..));
                match &draw.geometry.index {
                    Some(index) => {
                        pass.set_index_buffer(index.buffer.slice(..), index.format);
                        pass.draw_indexed(0..index.count, 0, 0..1);
                    }
                    None => pass.draw(0..draw.geometry.vertex_count, 0..1),
                }
            }
        }

        self.phases[light_index] = LightPhase::Complete;
        ctx.state.unbind();
        ctx.state.viewport = saved_viewport;

        ShadowOutcome::Rendered {
            draws: self.draw_list.len(),
        }
    }

    /// Sampleable cube view of a light whose cubemap finished this frame.
    #[must_use]
    pub fn shadow_view(&self, light_index: usize) -> Option<&Tracked<wgpu::TextureView>> {
        if self.phase(light_index) != LightPhase::Complete {
            return None;
        }
        match self.slots.get(light_index)? {
            ShadowSlot::Ready(cubemap) => Some(cubemap.cube_view()),
            ShadowSlot::Incomplete { .. } => None,
        }
    }

    #[must_use]
    pub fn phase(&self, light_index: usize) -> LightPhase {
        self.phases.get(light_index).copied().unwrap_or_default()
    }

    /// Model matrices the per-draw uniform buffer can hold.
    #[must_use]
    pub fn model_capacity(&self) -> u32 {
        self.model_capacity
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slot(&self, light_index: usize) -> Option<&ShadowSlot> {
        self.slots.get(light_index)
    }

    #[must_use]
    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    fn upload_faces(&self, queue: &wgpu::Queue, light_index: usize, light_position: Vec3) {
        let far = self.settings.far_plane;
        let matrices = face_view_projections(light_position, self.settings.near_plane, far);
        let stride = self.face_stride as usize;

        let mut bytes = vec![0u8; stride * 6];
        for (i, view_projection) in matrices.into_iter().enumerate() {
            let uniforms = FaceUniforms {
                view_projection,
                light_position: light_position.to_array(),
                far_plane: far,
            };
            let offset = i * stride;
            bytes[offset..offset + FACE_UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }

        let base = (light_index * 6 * stride) as u64;
        queue.write_buffer(&self.face_buffer, base, &bytes);
    }

    /// Writes this light's model matrices and returns the index of the first.
    fn upload_models(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> u32 {
        let base = self.model_cursor;
        let count = self.draw_list.len() as u32;
        if count == 0 {
            return base;
        }
        self.ensure_model_capacity(device, base + count);

        let stride = self.model_stride as usize;
        let mut bytes = vec![0u8; stride * count as usize];
        for (i, draw) in self.draw_list.iter().enumerate() {
            let offset = i * stride;
            bytes[offset..offset + MODEL_UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&draw.model));
        }
        queue.write_buffer(
            &self.model_buffer,
            u64::from(base) * u64::from(self.model_stride),
            &bytes,
        );
        self.model_cursor = base + count;
        base
    }

    fn ensure_model_capacity(&mut self, device: &wgpu::Device, required: u32) {
        if required <= self.model_capacity {
            return;
        }

        let mut capacity = self.model_capacity.max(1);
        while capacity < required {
            capacity = capacity.saturating_mul(2);
        }

        let (buffer, bind_group) =
            create_model_buffer(device, &self.model_layout, self.model_stride, capacity);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_capacity = capacity;
    }

    fn ensure_pipeline(
        device: &wgpu::Device,
        pipelines: &mut FxHashMap<u64, wgpu::RenderPipeline>,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        stride: u64,
    ) {
        if pipelines.contains_key(&stride) {
            return;
        }
        if stride < 12 || stride % 4 != 0 {
            log::warn!("Skipping shadow caster with unsupported vertex stride {stride}");
            return;
        }

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("Point Shadow Pipeline (stride {stride})")),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // The face projection mirrors Y, which flips winding; draw both sides.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_DEPTH_FORMAT,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::Less),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        pipelines.insert(stride, pipeline);
    }
}

fn create_model_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u32,
    capacity: u32,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Point Shadow Model Uniforms"),
        size: u64::from(stride) * u64::from(capacity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Point Shadow Model BindGroup"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(MODEL_UNIFORM_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_uniforms_match_wgsl_layout() {
        assert_eq!(FACE_UNIFORM_SIZE, 80);
        assert_eq!(MODEL_UNIFORM_SIZE, 64);
    }

    #[test]
    fn align_rounds_up_to_multiple() {
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
