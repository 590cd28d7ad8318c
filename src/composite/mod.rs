//! Final tone-mapped composite of scene color and bloom.

pub mod compositor;
pub mod tone_mapping;

pub use compositor::{CompositeTarget, FinalCompositor};
pub use tone_mapping::{
    CompositeParams, composite_image, composite_pixel, gamma_encode, tone_map,
};
