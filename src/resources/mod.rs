//! GPU resource helpers shared by every pass.

pub mod bind_group_cache;
pub mod target;

pub use bind_group_cache::{BindGroupCache, BindGroupKey, ResourceId, Tracked};
pub use target::{AllocationCounter, ScopedTarget};
