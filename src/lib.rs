#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Glowcast
//!
//! HDR post-processing and point-light shadows for wgpu renderers.
//!
//! A frame is recorded by [`FrameRenderer::render_frame`]:
//!
//! 1. [`shadow::OmniShadowPass`] renders a depth cubemap per point light.
//! 2. The caller draws the scene into the multisampled HDR target.
//! 3. [`bloom::BloomPipeline`] filters the bright-color attachment through a mip chain.
//! 4. [`composite::FinalCompositor`] tone-maps scene plus bloom onto the output.
//!
//! Every pass can also be driven on its own through a [`FrameContext`].

pub mod bloom;
pub mod composite;
pub mod context;
pub mod errors;
pub mod frame;
pub mod gpu;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod shaders;
pub mod shadow;

pub use bloom::{BloomPipeline, BloomPlan};
pub use composite::{CompositeTarget, FinalCompositor};
pub use context::{FrameContext, FrameParams, RenderState, TargetBinding, Viewport};
pub use errors::{PostFxError, Result};
pub use frame::{FrameRenderer, FrameStats, HdrTargets};
pub use gpu::{TargetCapabilities, request_headless_device, request_headless_device_blocking};
pub use resources::{AllocationCounter, Tracked};
pub use scene::{Aabb, PointLight, RenderCaps, Renderable, SceneDescription};
pub use settings::{
    BloomFormat, BloomSettings, PostFxSettings, ShadowSettings, ToneMappingMode,
    ToneMappingSettings,
};
pub use shadow::{CubeFace, OmniShadowPass, ShadowOutcome};
