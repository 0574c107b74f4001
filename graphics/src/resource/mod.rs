//! Lazily initialized GPU-backed resources.
//!
//! Resources are declared up front into a [`ResourceRegistryBuilder`], which
//! is frozen into a read-only [`ResourceRegistry`]. Each entry is a
//! [`ResourceRecord`]: a description, a [`ResourceKind`] tag, a lock, and a
//! [`ResourceInit`] payload that creates the actual GPU objects. The
//! [`ConcurrentLoader`](crate::loader::ConcurrentLoader) later walks the
//! registry from many threads and initializes every record exactly once.
//!
//! ```ignore
//! let mut builder = ResourceRegistry::builder();
//! let bloom = builder.register(
//!     "shaders/Bloom.hlsl",
//!     ShaderResource::new("shaders/Bloom.vs", "shaders/Bloom.ps"),
//! );
//! let registry = Arc::new(builder.build());
//! // ... load ...
//! let program = bloom.program();
//! ```

mod kinds;
mod record;
mod registry;

pub use kinds::{
    MaterialResource, MaterialSlot, MeshBuffers, MeshLayout, ModelResource, RenderTargetResource,
    ShaderResource, TextureResource,
};
pub use record::{
    InitOutcome, RecordGuard, RecordState, ResourceId, ResourceInit, ResourceKind, ResourceRecord,
};
pub use registry::{LoadProgress, ResourceRegistry, ResourceRegistryBuilder};
