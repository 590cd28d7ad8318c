//! Device acquisition and target validation.

pub mod capabilities;
pub mod fullscreen;

pub use capabilities::TargetCapabilities;
pub use fullscreen::FullscreenPipelines;

use crate::errors::{PostFxError, Result};

/// Requests an adapter and device without a surface.
///
/// Optional features this crate benefits from (`RG11B10UFLOAT_RENDERABLE`)
/// are enabled when the adapter offers them.
pub async fn request_headless_device(
    force_fallback_adapter: bool,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter,
        })
        .await
        .map_err(|e| PostFxError::AdapterRequestFailed(e.to_string()))?;

    let info = adapter.get_info();
    log::info!("Using adapter {} ({:?})", info.name, info.backend);

    let required_features = adapter.features() & wgpu::Features::RG11B10UFLOAT_RENDERABLE;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Glowcast Device"),
            required_features,
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}

/// Blocking wrapper around [`request_headless_device`].
pub fn request_headless_device_blocking(
    force_fallback_adapter: bool,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(request_headless_device(force_fallback_adapter))
}
