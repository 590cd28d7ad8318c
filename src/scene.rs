//! Scene Records
//!
//! The scene is handed over as data: an ordered list of [`Renderable`]
//! records tagged with [`RenderCaps`], plus the active [`PointLight`]s.
//! Free functions select what each pass needs from it.

use bitflags::bitflags;
use glam::{Mat4, Vec3};

use crate::shadow::{DepthDrawList, DepthGeometry};

bitflags! {
    /// What a renderable takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderCaps: u32 {
        /// Rendered into point-light shadow cubemaps.
        const CASTS_SHADOW = 1 << 0;
        /// Transform changes every frame.
        const ANIMATED     = 1 << 1;
        /// Writes into the bloom source attachment.
        const EMISSIVE     = 1 << 2;
    }
}

/// A point light: world-space position and linear HDR color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl PointLight {
    #[must_use]
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The `[-0.5, 0.5]³` unit cube.
    pub const UNIT_CUBE: Aabb = Aabb {
        min: Vec3::splat(-0.5),
        max: Vec3::splat(0.5),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Bounds of this box after `transform`.
    #[must_use]
    pub fn transformed(&self, transform: Mat4) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = transform.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Distance along `direction` (unit length) to the first surface of the box.
    ///
    /// An origin inside the box hits the exit face.
    #[must_use]
    pub fn ray_hit(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let inv = direction.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let t_enter = t0.min(t1).max_element();
        let t_exit = t0.max(t1).min_element();
        if t_exit < 0.0 || t_enter > t_exit || t_enter.is_nan() || t_exit.is_nan() {
            return None;
        }
        Some(if t_enter >= 0.0 { t_enter } else { t_exit })
    }
}

/// One drawable object.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub name: String,
    pub transform: Mat4,
    pub caps: RenderCaps,
    /// Object-space bounds.
    pub local_bounds: Aabb,
    /// GPU geometry for the depth pass. `None` for CPU-only scenes.
    pub geometry: Option<DepthGeometry>,
}

impl Renderable {
    #[must_use]
    pub fn new(name: impl Into<String>, transform: Mat4, caps: RenderCaps) -> Self {
        Self {
            name: name.into(),
            transform,
            caps,
            local_bounds: Aabb::UNIT_CUBE,
            geometry: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: DepthGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.local_bounds = bounds;
        self
    }

    #[must_use]
    pub fn world_bounds(&self) -> Aabb {
        self.local_bounds.transformed(self.transform)
    }
}

/// Ordered renderables and active lights for one frame.
#[derive(Debug, Clone, Default)]
pub struct SceneDescription {
    pub lights: Vec<PointLight>,
    pub renderables: Vec<Renderable>,
}

impl SceneDescription {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Renderables flagged [`RenderCaps::CASTS_SHADOW`], in scene order.
pub fn shadow_casters(scene: &SceneDescription) -> impl Iterator<Item = &Renderable> {
    scene
        .renderables
        .iter()
        .filter(|r| r.caps.contains(RenderCaps::CASTS_SHADOW))
}

/// Records every shadow caster that has GPU geometry into `list`.
///
/// Returns the number of casters without geometry, which are not drawn.
pub fn collect_depth_draws(scene: &SceneDescription, list: &mut DepthDrawList) -> usize {
    let mut missing = 0;
    for caster in shadow_casters(scene) {
        match &caster.geometry {
            Some(geometry) => list.push(geometry.clone(), caster.transform),
            None => missing += 1,
        }
    }
    missing
}

/// World-space bounds of every shadow caster.
#[must_use]
pub fn caster_bounds(scene: &SceneDescription) -> Vec<Aabb> {
    shadow_casters(scene).map(Renderable::world_bounds).collect()
}
