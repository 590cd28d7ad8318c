//! Scoped GPU Targets
//!
//! [`ScopedTarget`] owns one texture and keeps an [`AllocationCounter`] in
//! sync with its lifetime. Teardown is drop: releasing the owning collection
//! releases the textures and decrements the live count.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared count of live render targets.
///
/// Cloning yields another handle onto the same counters.
#[derive(Debug, Clone, Default)]
pub struct AllocationCounter {
    live: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl AllocationCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Targets created since this counter was made.
    #[must_use]
    pub fn total_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    fn acquire(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A texture whose lifetime is mirrored in an [`AllocationCounter`].
#[derive(Debug)]
pub struct ScopedTarget {
    texture: wgpu::Texture,
    counter: AllocationCounter,
}

impl ScopedTarget {
    pub fn new(
        device: &wgpu::Device,
        desc: &wgpu::TextureDescriptor<'_>,
        counter: &AllocationCounter,
    ) -> Self {
        let texture = device.create_texture(desc);
        counter.acquire();
        Self {
            texture,
            counter: counter.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[must_use]
    pub fn create_view(&self, desc: &wgpu::TextureViewDescriptor<'_>) -> wgpu::TextureView {
        self.texture.create_view(desc)
    }
}

impl Drop for ScopedTarget {
    fn drop(&mut self) {
        self.counter.release();
    }
}
