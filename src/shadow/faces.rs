//! Cube face orientation.
//!
//! Each face is rendered with a 90° square frustum looking down one axis.
//! The projection flips Y so that face texel rows run in the same direction
//! cube sampling reads them: a direction projected through its major-axis
//! face lands on the exact `(s, t)` that [`select_face`] returns.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// Faces in cube layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face in the cubemap texture.
    #[inline]
    #[must_use]
    pub const fn layer(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn direction(self) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::X,
            CubeFace::NegativeX => Vec3::NEG_X,
            CubeFace::PositiveY => Vec3::Y,
            CubeFace::NegativeY => Vec3::NEG_Y,
            CubeFace::PositiveZ => Vec3::Z,
            CubeFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    #[must_use]
    pub const fn up(self) -> Vec3 {
        match self {
            CubeFace::PositiveY => Vec3::Z,
            CubeFace::NegativeY => Vec3::NEG_Z,
            _ => Vec3::NEG_Y,
        }
    }
}

/// 90° projection shared by all six faces, Y flipped into texel order.
#[must_use]
pub fn face_projection(near: f32, far: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)) * Mat4::perspective_rh(FRAC_PI_2, 1.0, near, far)
}

#[must_use]
pub fn face_view(light_position: Vec3, face: CubeFace) -> Mat4 {
    Mat4::look_at_rh(light_position, light_position + face.direction(), face.up())
}

/// View-projection matrices for all six faces, in layer order.
#[must_use]
pub fn face_view_projections(light_position: Vec3, near: f32, far: f32) -> [Mat4; 6] {
    let projection = face_projection(near, far);
    CubeFace::ALL.map(|face| projection * face_view(light_position, face))
}

/// Picks the face cube sampling reads for `direction` and the `(s, t)`
/// coordinate within it, both in `[0, 1]`, `t` growing downwards.
///
/// Ties between axes resolve in X, Y, Z order.
#[must_use]
pub fn select_face(direction: Vec3) -> (CubeFace, Vec2) {
    let abs = direction.abs();
    let (face, sc, tc, ma) = if abs.x >= abs.y && abs.x >= abs.z {
        if direction.x >= 0.0 {
            (CubeFace::PositiveX, -direction.z, -direction.y, abs.x)
        } else {
            (CubeFace::NegativeX, direction.z, -direction.y, abs.x)
        }
    } else if abs.y >= abs.z {
        if direction.y >= 0.0 {
            (CubeFace::PositiveY, direction.x, direction.z, abs.y)
        } else {
            (CubeFace::NegativeY, direction.x, -direction.z, abs.y)
        }
    } else if direction.z >= 0.0 {
        (CubeFace::PositiveZ, direction.x, -direction.y, abs.z)
    } else {
        (CubeFace::NegativeZ, -direction.x, -direction.y, abs.z)
    };

    if ma <= 0.0 {
        return (CubeFace::PositiveX, Vec2::splat(0.5));
    }
    let st = (Vec2::new(sc, tc) / ma + Vec2::ONE) * 0.5;
    (face, st)
}

/// Projects a world point through a face matrix into `(s, t)` face coordinates.
///
/// Returns `None` for points behind the face's eye.
#[must_use]
pub fn project_to_face(view_projection: Mat4, world: Vec3) -> Option<Vec2> {
    let clip = view_projection * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.xy() / clip.w;
    Some(Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5))
}

/// Value stored in the cubemap for a fragment at `world`.
#[inline]
#[must_use]
pub fn encode_distance(world: Vec3, light_position: Vec3, far: f32) -> f32 {
    ((world - light_position).length() / far).clamp(0.0, 1.0)
}

/// World-space distance represented by a stored cubemap value.
#[inline]
#[must_use]
pub fn decode_distance(stored: f32, far: f32) -> f32 {
    stored * far
}

/// Shadow test in world units, as performed by the lighting snippet.
#[inline]
#[must_use]
pub fn is_shadowed(stored: f32, far: f32, world: Vec3, light_position: Vec3, bias: f32) -> bool {
    let current = (world - light_position).length();
    current - bias > decode_distance(stored, far)
}
