//! The render pass tree.
//!
//! A frame is a tree of [`PassNode`]s drawn depth-first in insertion order.
//! Each node wraps a [`RenderPass`]; for every child the parent's
//! [`PassChildren::draw`] pushes a debug marker named after the child,
//! calls the child's `update` then `draw`, and pops the marker.
//!
//! ```text
//! Frame
//! ├── G-Buffer
//! │   ├── Terrain
//! │   └── Scene Geometry
//! ├── Lighting
//! └── Post-Processing
//!     ├── Bloom
//!     └── HDR Tone Mapping
//! ```
//!
//! A pass that cannot run (no backend, no resource manager, inputs not
//! created yet) returns early with a [`SkipReason`]. Nothing is raised; the
//! skip is recorded in the [`FrameReport`] and the next frame tries again.

mod context;
mod graph;
mod node;

pub use context::{
    FrameContext, FrameReport, PassAbort, PassRecord, PassResult, PassStatus, SkipReason,
};
pub use graph::{GraphState, PassGraph};
pub use node::{GroupPass, PassChildren, PassNode, RenderPass};
