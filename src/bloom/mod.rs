//! Physically Based Bloom
//!
//! A progressive downsample/upsample mip chain:
//!
//! - [`mip_chain`]: level extents and the owned render targets
//! - [`plan`]: the ordered step list shared by the GPU and CPU executors
//! - [`downsample`] / [`upsample`]: the two fullscreen filters
//! - [`pipeline`]: [`BloomPipeline`], which ties them together
//! - [`reference`]: a CPU executor of the same plan

pub mod downsample;
pub mod mip_chain;
pub mod pipeline;
pub mod plan;
pub mod reference;
pub mod upsample;

pub use downsample::Downsampler;
pub use mip_chain::{MipChainStore, MipExtent, MipLevel, mip_chain_extents};
pub use pipeline::BloomPipeline;
pub use plan::{BlendMode, BloomPlan, BloomStep, StepKind, StepSource, accumulation_weight};
pub use reference::{HdrImage, ReferenceBloom, downsample_13tap, luminance, upsample_tent};
pub use upsample::Upsampler;
