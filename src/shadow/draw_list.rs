//! Depth-only draw submissions.
//!
//! The scene records its shadow casters once per light; the shadow pass
//! replays the list into every cube face.

use glam::Mat4;

/// Index data of a [`DepthGeometry`].
#[derive(Debug, Clone)]
pub struct IndexedGeometry {
    pub buffer: wgpu::Buffer,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// Vertex data readable by the depth pipeline.
///
/// Positions must be `Float32x3` at byte offset 0 of each vertex.
#[derive(Debug, Clone)]
pub struct DepthGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_stride: u64,
    pub vertex_count: u32,
    pub index: Option<IndexedGeometry>,
}

#[derive(Debug, Clone)]
pub struct DepthDraw {
    pub geometry: DepthGeometry,
    pub model: Mat4,
}

/// Ordered depth draws for one light.
#[derive(Debug, Default)]
pub struct DepthDrawList {
    draws: Vec<DepthDraw>,
}

impl DepthDrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, geometry: DepthGeometry, model: Mat4) {
        self.draws.push(DepthDraw { geometry, model });
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DepthDraw> {
        self.draws.iter()
    }
}
