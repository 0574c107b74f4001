use crate::backend::{
    Extent2d, PixelFormat, RenderTargetDescriptor, RenderTargetHandle, ResourceManager, TargetSize,
};
use crate::error::ResourceResult;

/// What [`DynamicRenderTarget::ensure`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetUpdate {
    /// The cached size matched; nothing was touched.
    Unchanged,
    /// No surface existed yet; one was created.
    Created,
    /// The old surface was released and a new one created at the new size.
    Recreated,
}

/// A render target a pass keeps outside the declared resource table.
///
/// Declared targets are resized by the resource manager itself. Scratch
/// copies that a pass owns privately (a mip-chain duplicate, a copy of the
/// light accumulation buffer) go through this type instead: the pass calls
/// [`ensure`](Self::ensure) every frame and the surface is rebuilt only when
/// the resolved size differs from the size it was last built at.
#[derive(Debug)]
pub struct DynamicRenderTarget {
    label: String,
    size: TargetSize,
    color_formats: Vec<PixelFormat>,
    depth_format: Option<PixelFormat>,
    handle: Option<RenderTargetHandle>,
    realized: Option<Extent2d>,
}

impl DynamicRenderTarget {
    /// A single-color-surface target.
    pub fn new(label: impl Into<String>, size: TargetSize, format: PixelFormat) -> Self {
        Self {
            label: label.into(),
            size,
            color_formats: vec![format],
            depth_format: None,
            handle: None,
            realized: None,
        }
    }

    /// Add a depth surface.
    pub fn with_depth(mut self, format: PixelFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    /// The size policy.
    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// Change the size policy. Takes effect on the next `ensure`.
    pub fn set_size(&mut self, size: TargetSize) {
        self.size = size;
    }

    /// The live surface, if any.
    pub fn handle(&self) -> Option<RenderTargetHandle> {
        self.handle
    }

    /// Size the live surface was built at.
    pub fn realized_size(&self) -> Option<Extent2d> {
        self.realized
    }

    /// Make sure a surface exists at the size resolved against `back_buffer`.
    pub fn ensure(
        &mut self,
        resource_manager: &dyn ResourceManager,
        back_buffer: Extent2d,
    ) -> ResourceResult<TargetUpdate> {
        let desired = self.size.resolve(back_buffer);
        self.ensure_size(resource_manager, desired)
    }

    /// Make sure a surface exists at exactly `desired`, e.g. to mirror
    /// another target's current size.
    pub fn ensure_size(
        &mut self,
        resource_manager: &dyn ResourceManager,
        desired: Extent2d,
    ) -> ResourceResult<TargetUpdate> {
        if self.handle.is_some() && self.realized == Some(desired) {
            return Ok(TargetUpdate::Unchanged);
        }

        let update = match self.handle.take() {
            Some(old) => {
                resource_manager.release_render_target(old);
                TargetUpdate::Recreated
            }
            None => TargetUpdate::Created,
        };
        self.realized = None;

        let descriptor = RenderTargetDescriptor {
            label: self.label.clone(),
            size: TargetSize::Fixed(desired),
            color_formats: self.color_formats.clone(),
            depth_format: self.depth_format,
        };
        let handle = resource_manager.create_render_target(&descriptor)?;
        log::debug!("{}: {update:?} at {desired}", self.label);

        self.handle = Some(handle);
        self.realized = Some(desired);
        Ok(update)
    }

    /// Release the surface. Returns whether one was live.
    pub fn release(&mut self, resource_manager: &dyn ResourceManager) -> bool {
        self.realized = None;
        match self.handle.take() {
            Some(handle) => resource_manager.release_render_target(handle),
            None => false,
        }
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::DummyResourceManager;

    fn scratch() -> DynamicRenderTarget {
        DynamicRenderTarget::new(
            "scratch",
            TargetSize::relative(0.5, 0.5),
            PixelFormat::Rgba16Float,
        )
    }

    #[test]
    fn test_ensure_is_idempotent_for_unchanged_size() {
        let rm = DummyResourceManager::default();
        let mut target = scratch();
        let back_buffer = Extent2d::new(1280, 720);

        assert_eq!(target.ensure(&rm, back_buffer), Ok(TargetUpdate::Created));
        let handle = target.handle();
        assert_eq!(target.ensure(&rm, back_buffer), Ok(TargetUpdate::Unchanged));
        assert_eq!(target.ensure(&rm, back_buffer), Ok(TargetUpdate::Unchanged));
        assert_eq!(target.handle(), handle);
        assert_eq!(rm.live_objects().render_targets, 1);
    }

    #[test]
    fn test_ensure_recreates_on_resize() {
        let rm = DummyResourceManager::default();
        let mut target = scratch();
        target.ensure(&rm, Extent2d::new(1280, 720)).unwrap();
        let old = target.handle().unwrap();

        assert_eq!(
            target.ensure(&rm, Extent2d::new(1920, 1080)),
            Ok(TargetUpdate::Recreated)
        );
        assert_eq!(target.realized_size(), Some(Extent2d::new(960, 540)));
        assert_ne!(target.handle(), Some(old));
        assert_eq!(rm.render_target_size(old), None);
        assert_eq!(rm.live_objects().render_targets, 1);
    }

    #[test]
    fn test_ensure_size_mirrors_source() {
        let rm = DummyResourceManager::default();
        let mut target = scratch();
        assert_eq!(
            target.ensure_size(&rm, Extent2d::new(300, 200)),
            Ok(TargetUpdate::Created)
        );
        assert_eq!(
            target.ensure_size(&rm, Extent2d::new(300, 200)),
            Ok(TargetUpdate::Unchanged)
        );
    }

    #[test]
    fn test_release_then_ensure_creates() {
        let rm = DummyResourceManager::default();
        let mut target = scratch();
        target.ensure(&rm, Extent2d::new(64, 64)).unwrap();
        assert!(target.release(&rm));
        assert!(!target.release(&rm));
        assert_eq!(rm.live_objects().total(), 0);
        assert_eq!(
            target.ensure(&rm, Extent2d::new(64, 64)),
            Ok(TargetUpdate::Created)
        );
    }
}
