/// Indices used by one step of an iterative ping-pong chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPongStep {
    /// Slot sampled by this step.
    pub read: usize,
    /// Slot written by this step.
    pub write: usize,
}

/// `N` equally sized surfaces with alternating read and write roles.
///
/// Two usage patterns:
///
/// - **Iterative** (blur kernels): [`seed`](Self::seed) is written first, then
///   step `i` reads what step `i - 1` wrote via [`step`](Self::step), and the
///   final result lives in [`result_after`](Self::result_after).
/// - **Temporal** (adapted luminance, autofocus): the pass calls
///   [`flip`](Self::flip) once per frame in `update`, then reads last frame's
///   value from [`read`](Self::read) and writes this frame's into
///   [`write`](Self::write).
///
/// For every `N >= 2` the read slot never equals the write slot, so one draw
/// cannot sample the surface it renders into.
#[derive(Debug, Clone)]
pub struct PingPong<T, const N: usize = 2> {
    items: [T; N],
    write: usize,
}

impl<T, const N: usize> PingPong<T, N> {
    /// Wrap `N` surfaces. Slot 0 starts in the write role.
    pub fn new(items: [T; N]) -> Self {
        const { assert!(N >= 2, "ping-pong needs at least two surfaces") };
        Self { items, write: 0 }
    }

    /// Number of surfaces.
    pub const fn len(&self) -> usize {
        N
    }

    /// Always false; a ping-pong set holds at least two surfaces.
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn read_index(&self) -> usize {
        (self.write + N - 1) % N
    }

    /// Surface holding the previous result.
    pub fn read(&self) -> &T {
        &self.items[self.read_index()]
    }

    /// Surface to render the next result into.
    pub fn write(&self) -> &T {
        &self.items[self.write]
    }

    /// Mutable access to the write surface.
    pub fn write_mut(&mut self) -> &mut T {
        &mut self.items[self.write]
    }

    /// `(read, write)` for the current role assignment.
    pub fn pair(&self) -> (&T, &T) {
        (self.read(), self.write())
    }

    /// Advance the roles by one: the surface just written becomes the read
    /// surface.
    pub fn flip(&mut self) {
        self.write = (self.write + 1) % N;
    }

    /// Slot indices for iteration `i` of an iterative chain.
    ///
    /// Iteration `i` writes slot `i % N` and reads slot `(i + N - 1) % N`,
    /// which is what iteration `i - 1` wrote.
    pub const fn step(i: usize) -> PingPongStep {
        PingPongStep {
            read: (i + N - 1) % N,
            write: i % N,
        }
    }

    /// `(read, write)` surfaces for iteration `i`.
    pub fn iteration(&self, i: usize) -> (&T, &T) {
        let step = Self::step(i);
        debug_assert_ne!(step.read, step.write);
        (&self.items[step.read], &self.items[step.write])
    }

    /// Surface the chain's input must be written to before iteration 0.
    pub fn seed(&self) -> &T {
        &self.items[N - 1]
    }

    /// Surface holding the result after `steps` iterations.
    pub fn result_after(&self, steps: usize) -> &T {
        &self.items[(steps + N - 1) % N]
    }

    /// All surfaces in slot order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Consume the set and return the surfaces in slot order.
    pub fn into_inner(self) -> [T; N] {
        self.items
    }

    /// Map every surface, keeping the current role assignment.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PingPong<U, N> {
        PingPong {
            items: self.items.map(f),
            write: self.write,
        }
    }
}
