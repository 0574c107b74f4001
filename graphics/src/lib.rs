//! # GITech Graphics
//!
//! Renderer core for the GITech virtual museum: a tree of render passes
//! layered over an abstract GPU backend, and a concurrent loader that brings
//! every declared GPU resource up before the first frame.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`backend`] - [`ResourceManager`] and [`RenderBackend`] traits, render
//!   state scopes, and a headless [`DummyBackend`] for tests
//! - [`resource`] - lazily initialized resource records and their registry
//! - [`loader`] - the multi-threaded [`ConcurrentLoader`]
//! - [`pass`] - [`PassNode`] / [`PassGraph`], the per-frame pass tree
//! - [`target`] - dynamic and ping-pong render-target helpers
//!
//! ## Example
//!
//! ```ignore
//! use gitech_graphics::{ConcurrentLoader, FrameContext, LoaderConfig, PassGraph};
//!
//! let registry = Arc::new(declare_resources().build());
//! let graph = Arc::new(Mutex::new(PassGraph::new(build_render_scheme())));
//! let finalize = Arc::clone(&graph);
//! let loader = Arc::new(
//!     ConcurrentLoader::new(registry, rm, LoaderConfig::default())
//!         .with_finalizer(move |rm| finalize.lock().allocate_resources(rm)),
//! );
//! loader.run(4)?;
//!
//! loop {
//!     let report = graph.lock().draw(FrameContext::new(&mut backend, dt, frame));
//! }
//! ```

pub mod backend;
pub mod error;
pub mod loader;
pub mod pass;
pub mod resource;
pub mod target;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::{DummyBackend, DummyResourceManager};
pub use backend::{Extent2d, RenderBackend, RenderState, ResourceManager, StateScope, TargetSize};
pub use error::{LoadError, ResourceError, ResourceResult};
pub use loader::{ConcurrentLoader, LoadReport, LoadStrategy, LoaderConfig, LoaderWorkers};
pub use pass::{
    FrameContext, FrameReport, PassGraph, PassNode, PassResult, PassStatus, RenderPass,
    SkipReason,
};
pub use resource::{LoadProgress, ResourceId, ResourceKind, ResourceRegistry};
pub use target::{DynamicRenderTarget, PingPong};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("GITech Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_empty_pass_tree() {
        let graph = PassGraph::new(PassNode::group("Frame"));
        assert_eq!(graph.root().node_count(), 1);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new(Extent2d::new(1280, 720));
        assert!(backend.name() == "Dummy");
    }
}
