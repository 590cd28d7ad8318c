//! CPU Reference Cubemap
//!
//! Builds the same cubemap the depth pass produces by casting a ray through
//! every face texel center against axis-aligned casters. Texel directions are
//! derived by unprojecting through [`face_view_projections`], so the reference
//! exercises the same matrices as the GPU path.

use glam::{Vec2, Vec3, Vec4Swizzles};

use crate::scene::Aabb;

use super::faces::{CubeFace, decode_distance, face_view_projections, is_shadowed, select_face};

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCubemap {
    light_position: Vec3,
    resolution: u32,
    far: f32,
    /// Stored values per face in layer order, row-major, top row first.
    faces: [Vec<f32>; 6],
}

impl ReferenceCubemap {
    /// Renders the cubemap seen from `light_position`.
    ///
    /// Casters nearer than `near` along a texel ray are ignored, like geometry
    /// clipped by the face frustum.
    #[must_use]
    pub fn render(
        light_position: Vec3,
        casters: &[Aabb],
        resolution: u32,
        near: f32,
        far: f32,
    ) -> Self {
        let resolution = resolution.max(1);
        let matrices = face_view_projections(light_position, near, far);

        let faces = CubeFace::ALL.map(|face| {
            let inverse = matrices[face as usize].inverse();
            let mut texels = Vec::with_capacity((resolution * resolution) as usize);
            for y in 0..resolution {
                for x in 0..resolution {
                    let s = (x as f32 + 0.5) / resolution as f32;
                    let t = (y as f32 + 0.5) / resolution as f32;
                    let ndc = Vec2::new(2.0 * s - 1.0, 1.0 - 2.0 * t);
                    let far_point = inverse * ndc.extend(1.0).extend(1.0);
                    let direction = (far_point.xyz() / far_point.w - light_position).normalize();

                    let closest = casters
                        .iter()
                        .filter_map(|aabb| aabb.ray_hit(light_position, direction))
                        .filter(|&t| t >= near)
                        .fold(far, f32::min);
                    texels.push((closest / far).clamp(0.0, 1.0));
                }
            }
            texels
        });

        Self {
            light_position,
            resolution,
            far,
            faces,
        }
    }

    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Raw stored value of one texel.
    #[must_use]
    pub fn texel(&self, face: CubeFace, x: u32, y: u32) -> f32 {
        let x = x.min(self.resolution - 1);
        let y = y.min(self.resolution - 1);
        self.faces[face as usize][(y * self.resolution + x) as usize]
    }

    /// Nearest-texel cube lookup along `direction`, as the lighting shader samples it.
    #[must_use]
    pub fn sample(&self, direction: Vec3) -> f32 {
        let (face, st) = select_face(direction);
        let texel = (st * self.resolution as f32).floor();
        self.texel(face, texel.x.max(0.0) as u32, texel.y.max(0.0) as u32)
    }

    /// Distance to the closest caster along `direction`, in world units.
    #[must_use]
    pub fn closest_distance(&self, direction: Vec3) -> f32 {
        decode_distance(self.sample(direction), self.far)
    }

    /// Shadow classification of a world-space point.
    #[must_use]
    pub fn is_shadowed(&self, world: Vec3, bias: f32) -> bool {
        let stored = self.sample(world - self.light_position);
        is_shadowed(stored, self.far, world, self.light_position, bias)
    }
}
