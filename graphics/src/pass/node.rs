use gitech_core::profiling::profile_scope_dynamic;

use crate::backend::ResourceManager;
use crate::error::ResourceResult;

use super::context::{FrameContext, PassResult, PassStatus};

/// Behavior of one node in the pass tree.
///
/// Every hook has a default, so a pure grouping node implements nothing.
pub trait RenderPass: Send {
    /// Recompute per-frame parameters and swap temporal targets.
    ///
    /// Called right before [`draw`](Self::draw), once per frame. Must not
    /// submit GPU work, which is why it gets no backend.
    fn update(&mut self, _delta_time: f32) {}

    /// Record this pass's GPU work.
    ///
    /// The default draws the children. A pass overriding this must call
    /// `children.draw(ctx)` itself if its sub-passes should run.
    fn draw(&mut self, ctx: &mut FrameContext<'_>, children: &mut PassChildren) -> PassResult {
        children.draw(ctx);
        Ok(())
    }

    /// Create pass-local GPU objects (buffers, kernels, private targets).
    fn allocate_resources(&mut self, _resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        Ok(())
    }

    /// Destroy what [`allocate_resources`](Self::allocate_resources) created.
    /// Must tolerate being called without a prior allocation.
    fn release_resources(&mut self, _resource_manager: &dyn ResourceManager) {}
}

/// A node that only groups its children.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupPass;

impl RenderPass for GroupPass {}

/// Ordered children of a [`PassNode`]. Insertion order is draw order.
///
/// Slots emptied by [`PassNode::detach_child`] stay in place and are skipped.
#[derive(Default)]
pub struct PassChildren {
    slots: Vec<Option<PassNode>>,
}

impl PassChildren {
    /// Visit every present child in order: marker, `update`, `draw`, marker.
    pub fn draw(&mut self, ctx: &mut FrameContext<'_>) {
        for child in self.slots.iter_mut().flatten() {
            child.visit(ctx);
        }
    }

    /// Number of slots, empty ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Present children in order.
    pub fn iter(&self) -> impl Iterator<Item = &PassNode> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PassNode> {
        self.slots.iter_mut().flatten()
    }

    /// Child at `index`, if that slot is present.
    pub fn get(&self, index: usize) -> Option<&PassNode> {
        self.slots.get(index).and_then(Option::as_ref)
    }
}

/// A node of the pass tree.
///
/// Children are owned by value, so a node has exactly one parent and the
/// tree cannot contain cycles.
pub struct PassNode {
    name: String,
    pass: Box<dyn RenderPass>,
    children: PassChildren,
}

impl PassNode {
    /// Wrap a pass.
    pub fn new(name: impl Into<String>, pass: impl RenderPass + 'static) -> Self {
        Self {
            name: name.into(),
            pass: Box::new(pass),
            children: PassChildren::default(),
        }
    }

    /// A node that only draws its children.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, GroupPass)
    }

    /// Pass name, used for markers and the frame report.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a child. Returns its slot index.
    pub fn add_child(&mut self, child: PassNode) -> usize {
        self.children.slots.push(Some(child));
        self.children.slots.len() - 1
    }

    /// Builder form of [`add_child`](Self::add_child).
    pub fn with_child(mut self, child: PassNode) -> Self {
        self.add_child(child);
        self
    }

    /// Take a child out, leaving its slot empty so later indices stay put.
    pub fn detach_child(&mut self, index: usize) -> Option<PassNode> {
        self.children.slots.get_mut(index).and_then(Option::take)
    }

    pub fn children(&self) -> &PassChildren {
        &self.children
    }

    /// Depth-first search by name, this node included.
    pub fn find(&self, name: &str) -> Option<&PassNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PassNode::node_count).sum::<usize>()
    }

    /// Draw this node as a child: marker, `update`, `draw`, marker.
    pub(crate) fn visit(&mut self, ctx: &mut FrameContext<'_>) {
        profile_scope_dynamic!(self.name.as_str());
        let entry = ctx.begin_pass(&self.name);
        self.pass.update(ctx.delta_time());
        let status = self.draw_pass(ctx);
        ctx.end_pass(entry, status);
    }

    /// Run this node's `draw` hook without `update`. Used for the root.
    pub(crate) fn draw_pass(&mut self, ctx: &mut FrameContext<'_>) -> PassStatus {
        let status = PassStatus::from(self.pass.draw(ctx, &mut self.children));
        if let PassStatus::Failed(err) = &status {
            log::error!("Pass \"{}\" failed: {err}", self.name);
        }
        status
    }

    /// Own hook first, then children in order. Stops at the first error.
    pub fn allocate_resources(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<()> {
        self.pass.allocate_resources(resource_manager)?;
        for child in self.children.iter_mut() {
            child.allocate_resources(resource_manager)?;
        }
        Ok(())
    }

    /// Own hook first, then children in order.
    pub fn release_resources(&mut self, resource_manager: &dyn ResourceManager) {
        self.pass.release_resources(resource_manager);
        for child in self.children.iter_mut() {
            child.release_resources(resource_manager);
        }
    }
}

impl std::fmt::Debug for PassNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassNode")
            .field("name", &self.name)
            .field("children", &self.children.iter().map(PassNode::name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_keeps_indices() {
        let mut root = PassNode::group("root")
            .with_child(PassNode::group("a"))
            .with_child(PassNode::group("b"));
        let c = root.add_child(PassNode::group("c"));
        assert_eq!(c, 2);

        let detached = root.detach_child(1);
        assert_eq!(detached.map(|n| n.name().to_owned()), Some("b".to_owned()));
        assert!(root.detach_child(1).is_none());
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.children().get(2).map(PassNode::name), Some("c"));
        assert_eq!(
            root.children().iter().map(PassNode::name).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn test_find_and_count() {
        let root = PassNode::group("Frame").with_child(
            PassNode::group("Post-Processing").with_child(PassNode::group("Bloom")),
        );
        assert_eq!(root.node_count(), 3);
        assert!(root.find("Bloom").is_some());
        assert!(root.find("SSAO").is_none());
    }
}
