//! Bind groups cached by the identity of what they bind.
//!
//! Bloom mips, HDR targets and shadow cubemaps are recreated on every resize,
//! and a recreated view must never be served a bind group built for its
//! predecessor. Each handle that can appear in a bind group is wrapped in
//! [`Tracked`], which stamps it with a [`ResourceId`] at creation; keys are
//! built from those ids rather than from wgpu handles.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Creation stamp of a [`Tracked`] handle. Clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A view, sampler, buffer or layout plus its [`ResourceId`].
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    inner: T,
    id: ResourceId,
}

impl<T> Tracked<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            id: ResourceId::next(),
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.inner
    }
}

/// A layout plus the ids of every bound resource, in binding order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindGroupKey {
    layout: ResourceId,
    resources: SmallVec<[ResourceId; 4]>,
}

impl BindGroupKey {
    #[must_use]
    pub fn new(layout: ResourceId) -> Self {
        Self {
            layout,
            resources: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_resource(mut self, id: ResourceId) -> Self {
        self.resources.push(id);
        self
    }
}

/// Bind groups keyed by [`BindGroupKey`].
///
/// Owners clear the cache whenever the targets it refers to are rebuilt.
#[derive(Default)]
pub struct BindGroupCache {
    entries: FxHashMap<BindGroupKey, wgpu::BindGroup>,
}

impl BindGroupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached bind group for `key`, building it with `create` on a miss.
    pub fn get_or_create(
        &mut self,
        key: BindGroupKey,
        create: impl FnOnce() -> wgpu::BindGroup,
    ) -> wgpu::BindGroup {
        self.entries.entry(key).or_insert_with(create).clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
