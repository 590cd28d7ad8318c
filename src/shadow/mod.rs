//! Point-Light Shadows
//!
//! Omnidirectional shadow maps: one depth cubemap per light slot, rendered
//! every frame from a [`DepthDrawList`] and sampled by lighting shaders
//! through [`crate::shaders::POINT_SHADOW_WGSL`].

pub mod cubemap;
pub mod draw_list;
pub mod faces;
pub mod pass;
pub mod reference;

pub use cubemap::{SHADOW_DEPTH_FORMAT, ShadowCubemap, ShadowSlot, create_shadow_sampler};
pub use draw_list::{DepthDraw, DepthDrawList, DepthGeometry, IndexedGeometry};
pub use faces::{
    CubeFace, decode_distance, encode_distance, face_projection, face_view,
    face_view_projections, is_shadowed, project_to_face, select_face,
};
pub use pass::{LightPhase, OmniShadowPass, ShadowOutcome, SkipReason};
