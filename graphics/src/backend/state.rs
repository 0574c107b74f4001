use std::ops::{Deref, DerefMut};

use super::{RenderBackend, RenderState};

/// Saves the backend's [`RenderState`] on creation and restores it on drop.
///
/// Passes that tweak blending, depth or sRGB writes wrap their draws in a
/// scope so the next pass always sees the state it would have seen had this
/// pass not run. The scope dereferences to the backend.
///
/// ```ignore
/// let mut scope = StateScope::new(backend);
/// scope.modify(|s| {
///     s.blend_enabled = true;
///     s.depth_write = false;
/// });
/// scope.draw_vertex_buffer(triangle, None)?;
/// // state restored here
/// ```
pub struct StateScope<'s, 'b> {
    backend: &'s mut (dyn RenderBackend + 'b),
    saved: RenderState,
}

impl<'s, 'b> StateScope<'s, 'b> {
    /// Open a scope, remembering the current state.
    pub fn new(backend: &'s mut (dyn RenderBackend + 'b)) -> Self {
        let saved = backend.render_state();
        Self { backend, saved }
    }

    /// The state that will be restored.
    pub fn saved(&self) -> RenderState {
        self.saved
    }

    /// Apply `f` to the current state and push the result to the backend.
    pub fn modify(&mut self, f: impl FnOnce(&mut RenderState)) {
        let mut state = self.backend.render_state();
        f(&mut state);
        self.backend.set_render_state(state);
    }
}

impl<'b> Deref for StateScope<'_, 'b> {
    type Target = dyn RenderBackend + 'b;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl<'b> DerefMut for StateScope<'_, 'b> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for StateScope<'_, '_> {
    fn drop(&mut self) {
        if self.backend.render_state() != self.saved {
            self.backend.set_render_state(self.saved);
        }
    }
}
