//! GPU Pass Tests
//!
//! Run against a fallback adapter when one is available and are skipped
//! otherwise. They record and submit real passes and check the state around
//! them, reading pixels back where the result is numeric:
//! - Bloom chain allocation, resize and teardown accounting
//! - Flat-color bloom read back from mip 0
//! - Shadow light phases, slot handling and per-frame buffer reuse
//! - Cubemap depth read back for a light above an occluder
//! - Two composites in one submit, each with its own parameters
//! - A full frame through `FrameRenderer`

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use glowcast::bloom::BloomPipeline;
use glowcast::composite::{CompositeTarget, FinalCompositor, composite_pixel};
use glowcast::context::{FrameContext, FrameParams, TargetBinding, Viewport};
use glowcast::frame::FrameRenderer;
use glowcast::gpu::{TargetCapabilities, request_headless_device_blocking};
use glowcast::resources::{AllocationCounter, Tracked};
use glowcast::scene::{PointLight, RenderCaps, Renderable, SceneDescription};
use glowcast::settings::{
    BloomFormat, BloomSettings, PostFxSettings, ShadowSettings, ToneMappingMode, ToneMappingSettings,
};
use glowcast::shadow::{
    CubeFace, DepthDrawList, DepthGeometry, LightPhase, OmniShadowPass, ShadowOutcome, ShadowSlot,
    SkipReason,
};

fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let _ = env_logger::builder().is_test(true).try_init();
    match request_headless_device_blocking(true) {
        Ok(pair) => Some(pair),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn bloom_settings(levels: u32) -> BloomSettings {
    let mut settings = BloomSettings::default();
    settings.format = BloomFormat::Rgba16Float;
    settings.set_mip_chain_length(levels);
    settings
}

fn hdr_source(device: &wgpu::Device, width: u32, height: u32) -> Tracked<wgpu::TextureView> {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test HDR Source"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Tracked::new(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

fn triangle(device: &wgpu::Device) -> DepthGeometry {
    let positions: [[f32; 3]; 3] = [[-1.0, 0.0, -1.0], [1.0, 0.0, -1.0], [0.0, 0.0, 1.0]];
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Test Triangle"),
        contents: bytemuck::cast_slice(&positions),
        usage: wgpu::BufferUsages::VERTEX,
    });
    DepthGeometry {
        vertex_buffer,
        vertex_stride: 12,
        vertex_count: 3,
        index: None,
    }
}

fn unit_cube(device: &wgpu::Device) -> DepthGeometry {
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(36);
    for axis in 0..3 {
        for side in [-0.5f32, 0.5] {
            let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
            let corner = |a: f32, b: f32| {
                let mut p = [0.0f32; 3];
                p[axis] = side;
                p[u] = a;
                p[v] = b;
                p
            };
            let quad = [
                corner(-0.5, -0.5),
                corner(0.5, -0.5),
                corner(0.5, 0.5),
                corner(-0.5, 0.5),
            ];
            positions.extend([quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
        }
    }
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Test Cube"),
        contents: bytemuck::cast_slice(&positions),
        usage: wgpu::BufferUsages::VERTEX,
    });
    DepthGeometry {
        vertex_buffer,
        vertex_stride: 12,
        vertex_count: positions.len() as u32,
        index: None,
    }
}

/// Copies one array layer of `texture` to the host, rows tightly packed.
fn read_layer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layer: u32,
    aspect: wgpu::TextureAspect,
    bytes_per_texel: u32,
) -> anyhow::Result<Vec<u8>> {
    let size = texture.size();
    let row = size.width * bytes_per_texel;
    let padded_row = row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Test Readback"),
        size: u64::from(padded_row * size.height),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(size.height),
            },
        },
        wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = sender.send(res);
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    receiver.recv()??;

    let data = slice.get_mapped_range();
    let bytes = data
        .chunks(padded_row as usize)
        .flat_map(|r| &r[..row as usize])
        .copied()
        .collect();
    drop(data);
    buffer.unmap();
    Ok(bytes)
}

// ============================================================================
// Bloom
// ============================================================================

#[test]
fn bloom_resize_keeps_allocation_count() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let caps = TargetCapabilities::from_device(&device);
    let counter = AllocationCounter::new();

    let mut bloom = BloomPipeline::new(&device, &caps, 128, 64, &bloom_settings(5), counter.clone())?;
    assert_eq!(counter.live(), 5);
    assert_eq!(bloom.mip_count(), 5);
    assert_eq!(bloom.plan().steps().len(), 9);

    bloom.resize(&device, 96, 48)?;
    assert_eq!(counter.live(), 5, "resize must release the old chain");
    assert_eq!(counter.total_created(), 10);

    let source = hdr_source(&device, 96, 48);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let settings = PostFxSettings::default();
    let caller = Viewport::new(96, 48);
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&settings, caller),
    );
    let steps = bloom.render_bloom(&mut ctx, &source, 0.005);
    assert_eq!(steps, 9);
    assert_eq!(ctx.state.binding, TargetBinding::Unbound);
    assert_eq!(ctx.viewport(), caller);
    queue.submit(Some(encoder.finish()));

    assert!(bloom.bloom_texture().is_some());
    assert!(bloom.bloom_mip(-3).is_some());
    assert!(bloom.bloom_mip(99).is_some());
    Ok(())
}

#[test]
fn flat_source_blooms_to_itself_on_the_gpu() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let caps = TargetCapabilities::from_device(&device);
    let (width, height) = (32, 32);
    let mut bloom = BloomPipeline::new(
        &device,
        &caps,
        width,
        height,
        &bloom_settings(4),
        AllocationCounter::new(),
    )?;

    let color = Vec3::new(0.5, 0.25, 2.0);
    let source = hdr_source(&device, width, height);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Test Flat Source"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &source,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(color.x),
                    g: f64::from(color.y),
                    b: f64::from(color.z),
                    a: 1.0,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        ..Default::default()
    });
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(width, height)),
    );
    assert_eq!(bloom.render_bloom(&mut ctx, &source, 0.005), 7);
    queue.submit(Some(encoder.finish()));

    let mip0 = bloom.mip_chain().level(0).expect("mip 0 is allocated");
    let bytes = read_layer(&device, &queue, mip0.texture(), 0, wgpu::TextureAspect::All, 8)?;
    assert_eq!(bytes.len(), (width * height * 8) as usize);
    for (i, texel) in bytes.chunks_exact(8).enumerate() {
        let channel = |c: usize| half::f16::from_le_bytes([texel[c * 2], texel[c * 2 + 1]]).to_f32();
        let rgb = Vec3::new(channel(0), channel(1), channel(2));
        assert!(
            (rgb - color).abs().max_element() < 0.02,
            "texel {i} bloomed to {rgb}, expected {color}"
        );
    }
    Ok(())
}

#[test]
fn bloom_teardown_releases_every_level() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let caps = TargetCapabilities::from_device(&device);
    let counter = AllocationCounter::new();
    let mut bloom = BloomPipeline::new(&device, &caps, 64, 64, &bloom_settings(4), counter.clone())?;

    bloom.teardown();
    assert_eq!(counter.live(), 0);
    assert!(bloom.bloom_texture().is_none());

    let source = hdr_source(&device, 64, 64);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(64, 64)),
    );
    assert_eq!(bloom.render_bloom(&mut ctx, &source, 0.005), 0);
    queue.submit(Some(encoder.finish()));
    Ok(())
}

#[test]
fn oversized_bloom_chain_fails_before_allocating() {
    let Some((device, _queue)) = device() else {
        return;
    };
    let caps = TargetCapabilities::from_device(&device);
    let counter = AllocationCounter::new();
    let too_wide = caps.max_texture_dimension_2d + 1;
    let result = BloomPipeline::new(&device, &caps, too_wide, 16, &bloom_settings(3), counter.clone());
    assert!(result.is_err());
    assert_eq!(counter.total_created(), 0);
}

// ============================================================================
// Shadows
// ============================================================================

fn shadow_settings(max_lights: u32) -> ShadowSettings {
    ShadowSettings {
        max_lights,
        resolution: 16,
        near_plane: 0.1,
        far_plane: 50.0,
        ..Default::default()
    }
}

#[test]
fn shadow_lights_complete_or_skip() {
    let Some((device, queue)) = device() else {
        return;
    };
    let caps = TargetCapabilities::from_device(&device);
    let counter = AllocationCounter::new();
    let mut pass = OmniShadowPass::new(&device, &caps, &shadow_settings(2), &counter);
    assert_eq!(pass.slot_count(), 2);
    assert_eq!(counter.live(), 2);

    let geometry = triangle(&device);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(320, 240)),
    );

    pass.begin_frame();
    let rendered = pass.render_light(&mut ctx, 0, Vec3::new(0.0, 5.0, 0.0), |list: &mut DepthDrawList| {
        list.push(geometry.clone(), Mat4::IDENTITY);
        list.push(geometry.clone(), Mat4::from_translation(Vec3::X * 2.0));
    });
    assert_eq!(rendered, ShadowOutcome::Rendered { draws: 2 });
    assert_eq!(pass.phase(0), LightPhase::Complete);
    assert!(pass.shadow_view(0).is_some());
    assert_eq!(ctx.viewport(), Viewport::new(320, 240));
    assert_eq!(ctx.state.binding, TargetBinding::Unbound);

    let empty = pass.render_light(&mut ctx, 1, Vec3::ZERO, |_| {});
    assert_eq!(empty, ShadowOutcome::Rendered { draws: 0 });

    let beyond = pass.render_light(&mut ctx, 2, Vec3::ZERO, |_| {});
    assert_eq!(beyond, ShadowOutcome::Skipped(SkipReason::NoSlot));
    assert!(pass.shadow_view(2).is_none());

    ctx.params.toggle_shadows();
    let disabled = pass.render_light(&mut ctx, 0, Vec3::ZERO, |_| panic!("disabled light traversed the scene"));
    assert_eq!(disabled, ShadowOutcome::Skipped(SkipReason::Disabled));
    // Light 0 again means a new frame: light 1's cubemap is no longer current.
    assert_eq!(pass.phase(0), LightPhase::Skipped);
    assert_eq!(pass.phase(1), LightPhase::Idle);
    assert!(pass.shadow_view(1).is_none());

    queue.submit(Some(encoder.finish()));

    pass.begin_frame();
    assert_eq!(pass.phase(0), LightPhase::Idle);
    assert!(pass.shadow_view(0).is_none(), "views are only exposed once a frame completes them");
}

#[test]
fn repeated_frames_reuse_the_model_buffer() {
    let Some((device, queue)) = device() else {
        return;
    };
    let caps = TargetCapabilities::from_device(&device);
    let mut pass = OmniShadowPass::new(&device, &caps, &shadow_settings(2), &AllocationCounter::new());
    let geometry = triangle(&device);
    let caster_row = |count: u32| {
        let geometry = geometry.clone();
        move |list: &mut DepthDrawList| {
            for i in 0..count {
                list.push(geometry.clone(), Mat4::from_translation(Vec3::X * i as f32));
            }
        }
    };

    let mut first_capacity = None;
    for frame in 0..8 {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let mut ctx = FrameContext::new(
            &device,
            &queue,
            &mut encoder,
            FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(64, 64)),
        );

        // No begin_frame: rendering light 0 again has to start the frame.
        let outcome = pass.render_light(&mut ctx, 0, Vec3::new(0.0, 5.0, 0.0), caster_row(3));
        assert_eq!(outcome, ShadowOutcome::Rendered { draws: 3 });
        if frame % 2 == 0 {
            let outcome = pass.render_light(&mut ctx, 1, Vec3::new(2.0, 5.0, 0.0), caster_row(2));
            assert_eq!(outcome, ShadowOutcome::Rendered { draws: 2 });
        } else {
            assert_eq!(pass.phase(1), LightPhase::Idle, "frame {frame} kept light 1's phase");
            assert!(pass.shadow_view(1).is_none());
        }
        queue.submit(Some(encoder.finish()));

        let capacity = pass.model_capacity();
        let first = *first_capacity.get_or_insert(capacity);
        assert_eq!(capacity, first, "model buffer grew in frame {frame}");
    }
    assert!(first_capacity.is_some_and(|c| c <= 8));
}

#[test]
fn cubemap_stores_distance_to_occluder_below_light() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let caps = TargetCapabilities::from_device(&device);
    let settings = ShadowSettings {
        resolution: 64,
        ..shadow_settings(1)
    };
    let far = settings.far_plane;
    let mut pass = OmniShadowPass::new(&device, &caps, &settings, &AllocationCounter::new());
    let cube = unit_cube(&device);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(64, 64)),
    );
    pass.begin_frame();
    let outcome = pass.render_light(&mut ctx, 0, Vec3::new(0.0, 10.0, 0.0), |list| {
        list.push(cube.clone(), Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    });
    assert_eq!(outcome, ShadowOutcome::Rendered { draws: 1 });
    queue.submit(Some(encoder.finish()));

    let Some(ShadowSlot::Ready(cubemap)) = pass.slot(0) else {
        panic!("slot 0 should hold a complete cubemap");
    };
    let depth_at_center = |face: CubeFace| -> anyhow::Result<f32> {
        let bytes = read_layer(
            &device,
            &queue,
            cubemap.texture(),
            face.layer(),
            wgpu::TextureAspect::DepthOnly,
            4,
        )?;
        let center = ((32 * 64 + 32) * 4) as usize;
        Ok(f32::from_le_bytes([
            bytes[center],
            bytes[center + 1],
            bytes[center + 2],
            bytes[center + 3],
        ]))
    };

    // Straight down from the light to the cube's top face at y = 5.5.
    let below = depth_at_center(CubeFace::NegativeY)? * far;
    assert!((below - 4.5).abs() < 0.05, "stored distance {below}, expected 4.5");

    // Nothing above or beside the light: the clear value survives.
    let above = depth_at_center(CubeFace::PositiveY)?;
    assert!((above - 1.0).abs() < 1e-6, "empty face stored {above}");
    let beside = depth_at_center(CubeFace::PositiveX)?;
    assert!((beside - 1.0).abs() < 1e-6, "empty face stored {beside}");
    Ok(())
}

// ============================================================================
// Composite
// ============================================================================

#[test]
fn composites_in_one_submit_keep_their_own_exposure() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let (width, height) = (64, 4);
    let format = wgpu::TextureFormat::Rgba8Unorm;
    let settings = ToneMappingSettings {
        mode: ToneMappingMode::Linear,
        ..Default::default()
    };
    let mut compositor = FinalCompositor::new(&device, format, &settings);

    let scene_value = 0.2;
    let scene = hdr_source(&device, width, height);
    let outputs = [0.5f32, 2.0].map(|exposure| {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Composite Output"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        (exposure, texture)
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Test Scene Clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &scene,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: scene_value,
                    g: scene_value,
                    b: scene_value,
                    a: 1.0,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        ..Default::default()
    });
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&PostFxSettings::default(), Viewport::new(width, height)),
    );
    let mut expected = Vec::new();
    for (exposure, texture) in &outputs {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let params = compositor.params(&ctx, None, *exposure, format);
        expected.push(composite_pixel(Vec3::splat(scene_value as f32), Vec3::ZERO, &params));
        compositor.composite(&mut ctx, &scene, None, *exposure, CompositeTarget { view: &view, format });
    }
    queue.submit(Some(encoder.finish()));

    assert!(
        (expected[0] - expected[1]).abs().max_element() > 0.1,
        "exposures should give visibly different outputs"
    );
    for ((exposure, texture), expected) in outputs.iter().zip(&expected) {
        let bytes = read_layer(&device, &queue, texture, 0, wgpu::TextureAspect::All, 4)?;
        for texel in bytes.chunks_exact(4) {
            let rgb = Vec3::new(f32::from(texel[0]), f32::from(texel[1]), f32::from(texel[2])) / 255.0;
            assert!(
                (rgb - *expected).abs().max_element() < 2.0 / 255.0,
                "exposure {exposure}: read {rgb}, expected {expected}"
            );
        }
    }
    Ok(())
}

// ============================================================================
// Full Frame
// ============================================================================

#[test]
fn full_frame_runs_every_pass() -> anyhow::Result<()> {
    let Some((device, queue)) = device() else {
        return Ok(());
    };
    let (width, height) = (64, 48);

    let mut settings = PostFxSettings::default();
    settings.bloom.format = BloomFormat::Rgba16Float;
    settings.bloom.set_mip_chain_length(4);
    settings.shadow = shadow_settings(2);

    let output_format = wgpu::TextureFormat::Rgba8Unorm;
    let mut renderer = FrameRenderer::new(&device, output_format, width, height, settings.clone())?;
    let live_before = renderer.allocation_counter().live();

    let mut scene = SceneDescription::new();
    scene.lights.push(PointLight::new(Vec3::new(0.0, 4.0, 0.0), Vec3::ONE));
    scene.lights.push(PointLight::new(Vec3::new(3.0, 4.0, 0.0), Vec3::ONE));
    scene.lights.push(PointLight::new(Vec3::new(-3.0, 4.0, 0.0), Vec3::ONE));
    scene.renderables.push(
        Renderable::new("ground", Mat4::IDENTITY, RenderCaps::CASTS_SHADOW).with_geometry(triangle(&device)),
    );

    let output = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Output"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: output_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let mut ctx = FrameContext::new(
        &device,
        &queue,
        &mut encoder,
        FrameParams::from_settings(&settings, Viewport::new(width, height)),
    );
    let mut shadow_inputs = Vec::new();
    let stats = renderer.render_frame(
        &mut ctx,
        &scene,
        CompositeTarget {
            view: &output_view,
            format: output_format,
        },
        |_pass, shadows| {
            shadow_inputs = shadows.iter().map(Option::is_some).collect();
        },
    );
    assert_eq!(ctx.state.binding, TargetBinding::Unbound);
    queue.submit(Some(encoder.finish()));

    assert_eq!(stats.lights_shadowed, 2);
    assert_eq!(stats.lights_skipped, 1);
    assert_eq!(stats.shadow_draws, 2);
    assert_eq!(stats.bloom_steps, 7);
    assert_eq!(shadow_inputs, vec![true, true, false]);

    assert_eq!(renderer.compositor().cached_bind_groups(), 1);
    let caps = TargetCapabilities::from_device(&device);
    let too_wide = caps.max_texture_dimension_2d + 1;
    assert!(renderer.resize(&device, too_wide, 24).is_err());
    assert_eq!(
        renderer.compositor().cached_bind_groups(),
        0,
        "a failed resize must not keep old targets cached"
    );
    assert_eq!(renderer.allocation_counter().live(), live_before);

    renderer.resize(&device, 32, 24)?;
    assert_eq!(renderer.allocation_counter().live(), live_before);
    Ok(())
}
