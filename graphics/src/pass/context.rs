use std::sync::Arc;

use crate::backend::{RenderBackend, ResourceManager};
use crate::error::ResourceError;

/// Why a pass did no work this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The frame has no backend (headless frame, device lost).
    BackendUnavailable,
    /// The backend exists but has no resource manager.
    ResourceManagerUnavailable,
    /// A resource the pass reads or writes has not been created.
    ResourcesNotReady,
    /// The pass is switched off.
    Disabled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::BackendUnavailable => "backend unavailable",
            Self::ResourceManagerUnavailable => "resource manager unavailable",
            Self::ResourcesNotReady => "resources not ready",
            Self::Disabled => "disabled",
        })
    }
}

/// Why a pass stopped early. Returned through `?` from
/// [`RenderPass::draw`](super::RenderPass::draw).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassAbort {
    Skipped(SkipReason),
    Failed(ResourceError),
}

impl From<SkipReason> for PassAbort {
    fn from(reason: SkipReason) -> Self {
        Self::Skipped(reason)
    }
}

impl From<ResourceError> for PassAbort {
    fn from(err: ResourceError) -> Self {
        Self::Failed(err)
    }
}

/// Result of drawing one pass.
pub type PassResult = Result<(), PassAbort>;

/// Outcome of one pass in one frame, as recorded in the [`FrameReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStatus {
    Completed,
    Skipped(SkipReason),
    /// A backend call failed. The error stays with this pass; siblings and
    /// parents still draw.
    Failed(ResourceError),
}

impl PassStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl From<PassResult> for PassStatus {
    fn from(result: PassResult) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(PassAbort::Skipped(reason)) => Self::Skipped(reason),
            Err(PassAbort::Failed(err)) => Self::Failed(err),
        }
    }
}

/// One visited pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    /// Pass name.
    pub name: String,
    /// Nesting depth; the root is 0.
    pub depth: usize,
    /// What the pass did.
    pub status: PassStatus,
}

/// Per-frame state handed down the pass tree.
///
/// Wraps the (optional) backend, the frame's delta time and the report that
/// collects each pass's [`PassStatus`] in visit order.
pub struct FrameContext<'a> {
    backend: Option<&'a mut dyn RenderBackend>,
    delta_time: f32,
    frame_index: u64,
    records: Vec<PassRecord>,
    depth: usize,
    open_markers: usize,
}

impl<'a> FrameContext<'a> {
    /// Context for a frame drawn through `backend`.
    pub fn new(backend: &'a mut dyn RenderBackend, delta_time: f32, frame_index: u64) -> Self {
        Self::with_backend(Some(backend), delta_time, frame_index)
    }

    /// Context for a frame with no backend. Every pass that needs the GPU
    /// reports [`SkipReason::BackendUnavailable`].
    pub fn headless(delta_time: f32, frame_index: u64) -> Self {
        Self::with_backend(None, delta_time, frame_index)
    }

    fn with_backend(
        backend: Option<&'a mut dyn RenderBackend>,
        delta_time: f32,
        frame_index: u64,
    ) -> Self {
        Self {
            backend,
            delta_time,
            frame_index,
            records: Vec::new(),
            depth: 0,
            open_markers: 0,
        }
    }

    /// Seconds since the previous frame.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Monotonic frame counter.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The backend, or the reason the pass must skip.
    pub fn backend(&mut self) -> Result<&mut (dyn RenderBackend + 'a), SkipReason> {
        self.backend
            .as_deref_mut()
            .ok_or(SkipReason::BackendUnavailable)
    }

    /// The backend's resource manager, or the reason the pass must skip.
    pub fn resources(&self) -> Result<Arc<dyn ResourceManager>, SkipReason> {
        self.backend
            .as_deref()
            .ok_or(SkipReason::BackendUnavailable)?
            .resource_manager()
            .ok_or(SkipReason::ResourceManagerUnavailable)
    }

    /// Open a pass: push its debug marker and reserve its report entry.
    pub(crate) fn begin_pass(&mut self, name: &str) -> usize {
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.push_marker(name);
            self.open_markers += 1;
        }
        self.records.push(PassRecord {
            name: name.to_owned(),
            depth: self.depth,
            status: PassStatus::Completed,
        });
        self.depth += 1;
        self.records.len() - 1
    }

    /// Close the pass opened by the matching [`begin_pass`](Self::begin_pass).
    pub(crate) fn end_pass(&mut self, entry: usize, status: PassStatus) {
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.pop_marker();
            self.open_markers = self.open_markers.saturating_sub(1);
        }
        self.depth = self.depth.saturating_sub(1);
        if let Some(record) = self.records.get_mut(entry) {
            record.status = status;
        }
    }

    /// Close the frame.
    pub fn finish(self) -> FrameReport {
        debug_assert_eq!(self.depth, 0, "pass opened without being closed");
        FrameReport {
            frame_index: self.frame_index,
            records: self.records,
            open_markers: self.open_markers,
        }
    }
}

/// Every pass visited during one frame, in visit order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameReport {
    frame_index: u64,
    records: Vec<PassRecord>,
    open_markers: usize,
}

impl FrameReport {
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Visited passes in visit order (pre-order, insertion order).
    pub fn records(&self) -> &[PassRecord] {
        &self.records
    }

    /// Names in visit order.
    pub fn visited(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Status of the first visited pass called `name`.
    pub fn status_of(&self, name: &str) -> Option<&PassStatus> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.status)
    }

    /// Skipped passes with their reasons.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, SkipReason)> {
        self.records.iter().filter_map(|r| match r.status {
            PassStatus::Skipped(reason) => Some((r.name.as_str(), reason)),
            _ => None,
        })
    }

    /// Failed passes with their errors.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &ResourceError)> {
        self.records.iter().filter_map(|r| match &r.status {
            PassStatus::Failed(err) => Some((r.name.as_str(), err)),
            _ => None,
        })
    }

    /// Whether every visited pass completed.
    pub fn is_complete(&self) -> bool {
        self.records.iter().all(|r| r.status.is_completed())
    }

    /// Debug markers pushed by the tree but not popped. Zero for a well
    /// formed frame.
    pub fn open_markers(&self) -> usize {
        self.open_markers
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, Extent2d};

    #[test]
    fn test_headless_skips() {
        let mut ctx = FrameContext::headless(0.016, 3);
        assert_eq!(ctx.backend().err(), Some(SkipReason::BackendUnavailable));
        assert_eq!(ctx.resources().err(), Some(SkipReason::BackendUnavailable));
        assert_eq!(ctx.frame_index(), 3);
    }

    #[test]
    fn test_missing_resource_manager() {
        let mut backend = DummyBackend::without_resource_manager(Extent2d::new(8, 8));
        let mut ctx = FrameContext::new(&mut backend, 0.0, 0);
        assert!(ctx.backend().is_ok());
        assert_eq!(
            ctx.resources().err(),
            Some(SkipReason::ResourceManagerUnavailable)
        );
    }

    #[test]
    fn test_begin_end_records_depth_and_markers() {
        let mut backend = DummyBackend::new(Extent2d::new(8, 8));
        let mut ctx = FrameContext::new(&mut backend, 0.0, 0);
        let outer = ctx.begin_pass("outer");
        let inner = ctx.begin_pass("inner");
        ctx.end_pass(inner, PassStatus::Skipped(SkipReason::Disabled));
        ctx.end_pass(outer, PassStatus::Completed);
        let report = ctx.finish();

        assert_eq!(report.visited(), vec!["outer", "inner"]);
        assert_eq!(report.records()[1].depth, 1);
        assert_eq!(report.open_markers(), 0);
        assert_eq!(
            report.skipped().collect::<Vec<_>>(),
            vec![("inner", SkipReason::Disabled)]
        );
        assert!(!report.is_complete());
        assert_eq!(backend.max_marker_depth(), 2);
    }

    #[test]
    fn test_status_from_result() {
        assert_eq!(PassStatus::from(Ok(())), PassStatus::Completed);
        assert_eq!(
            PassStatus::from(Err(SkipReason::ResourcesNotReady.into())),
            PassStatus::Skipped(SkipReason::ResourcesNotReady)
        );
        assert_eq!(
            PassStatus::from(Err(ResourceError::OutOfMemory.into())),
            PassStatus::Failed(ResourceError::OutOfMemory)
        );
    }
}
