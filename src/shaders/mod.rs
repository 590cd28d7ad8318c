//! WGSL sources.
//!
//! Every full-screen fragment shader pairs with [`FULLSCREEN_WGSL`] for its
//! vertex stage.

/// Full-screen triangle vertex stage (`vs_main`).
pub const FULLSCREEN_WGSL: &str = include_str!("fullscreen.wgsl");

/// 13-tap bloom downsample with optional Karis average.
pub const BLOOM_DOWNSAMPLE_WGSL: &str = include_str!("bloom_downsample.wgsl");

/// 3x3 tent bloom upsample.
pub const BLOOM_UPSAMPLE_WGSL: &str = include_str!("bloom_upsample.wgsl");

/// Scene + bloom tone-mapped composite.
pub const COMPOSITE_WGSL: &str = include_str!("composite.wgsl");

/// Point-light cubemap depth pass.
pub const POINT_SHADOW_DEPTH_WGSL: &str = include_str!("point_shadow_depth.wgsl");

/// `point_shadow(...)` helper for lighting shaders that sample the cubemaps.
/// Returns `1.0` when the fragment is in shadow.
pub const POINT_SHADOW_WGSL: &str = include_str!("point_shadow.wgsl");
