use gitech_core::profiling::profile_scope;

use crate::backend::ResourceManager;
use crate::error::ResourceResult;

use super::context::{FrameContext, FrameReport};
use super::node::PassNode;

/// Allocation state of a [`PassGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Unallocated,
    Allocated,
    Released,
}

/// Owns the root of the pass tree and drives it.
///
/// Frame execution is single-threaded: [`draw`](Self::draw) takes
/// `&mut self`.
pub struct PassGraph {
    root: PassNode,
    state: GraphState,
    frames_drawn: u64,
    last_skipped: usize,
}

impl PassGraph {
    pub fn new(root: PassNode) -> Self {
        Self {
            root,
            state: GraphState::Unallocated,
            frames_drawn: 0,
            last_skipped: 0,
        }
    }

    pub fn root(&self) -> &PassNode {
        &self.root
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Draw one frame.
    ///
    /// The root's `draw` runs exactly once, inside a marker named after the
    /// root; the root's `update` is not called. Returns every visited pass's
    /// status in visit order.
    pub fn draw(&mut self, mut ctx: FrameContext<'_>) -> FrameReport {
        profile_scope!("PassGraph::draw");
        debug_assert_eq!(
            self.state,
            GraphState::Allocated,
            "pass graph drawn while not allocated"
        );

        let entry = ctx.begin_pass(self.root.name());
        let status = self.root.draw_pass(&mut ctx);
        ctx.end_pass(entry, status);

        let report = ctx.finish();
        debug_assert_eq!(report.open_markers(), 0, "unbalanced debug markers");
        self.frames_drawn += 1;

        let skipped = report.skipped().count();
        if skipped != self.last_skipped {
            if skipped > 0 {
                let reasons: Vec<String> = report
                    .skipped()
                    .map(|(name, reason)| format!("{name} ({reason})"))
                    .collect();
                log::warn!(
                    "Frame {}: {skipped} pass(es) skipped: {}",
                    report.frame_index(),
                    reasons.join(", ")
                );
            } else {
                log::info!("Frame {}: all passes drawing again", report.frame_index());
            }
            self.last_skipped = skipped;
        }
        report
    }

    /// Create pass-local GPU objects for the whole tree.
    ///
    /// A second call is a logged no-op. On error whatever was created is
    /// released again and the graph stays unallocated.
    pub fn allocate_resources(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        if self.state == GraphState::Allocated {
            log::warn!("Pass graph resources already allocated; ignoring");
            return Ok(());
        }
        if let Err(err) = self.root.allocate_resources(resource_manager) {
            log::error!("Pass graph allocation failed: {err}");
            self.root.release_resources(resource_manager);
            return Err(err);
        }
        self.state = GraphState::Allocated;
        log::info!(
            "Allocated resources for {} pass(es)",
            self.root.node_count()
        );
        Ok(())
    }

    /// Destroy pass-local GPU objects. Without a prior allocation this is a
    /// logged no-op.
    pub fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        if self.state != GraphState::Allocated {
            log::warn!(
                "Pass graph resources not allocated ({:?}); nothing to release",
                self.state
            );
            return;
        }
        self.root.release_resources(resource_manager);
        self.state = GraphState::Released;
        log::info!("Released pass graph resources");
    }
}

impl std::fmt::Debug for PassGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassGraph")
            .field("root", &self.root.name())
            .field("nodes", &self.root.node_count())
            .field("state", &self.state)
            .field("frames_drawn", &self.frames_drawn)
            .finish()
    }
}
