//! Tracy instrumentation for the renderer.
//!
//! Every macro here compiles to nothing unless the `profiling` feature is
//! enabled, so call sites can stay in hot paths (per-pass draw, per-record
//! init) unconditionally.
//!
//! ```bash
//! cargo run -p gitech-app --features profiling
//! ```
//!
//! Then attach the Tracy GUI (<https://github.com/wolfpld/tracy/releases>)
//! to the running process.
//!
//! # Usage
//!
//! ```ignore
//! use gitech_core::profiling::{frame_mark, profile_scope, profile_scope_dynamic};
//!
//! fn draw_frame(pass_names: &[&str]) {
//!     profile_scope!("draw_frame");
//!     for name in pass_names {
//!         profile_scope_dynamic!(name);
//!         // ... record pass ...
//!     }
//!     frame_mark!();
//! }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{
    self, Client, Span, frame_mark as tracy_frame_mark, plot as tracy_plot, span,
};

/// Mark the end of a rendered frame.
///
/// Call once per iteration of the frame loop, after the pass graph has drawn.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Mark the end of a frame (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Open a span with a static name that closes at the end of the scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Open a span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Open a span named after the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Open a function span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Open a span whose name is only known at runtime.
///
/// Render passes are named by their builders, so the pass tree uses this for
/// the per-child scope pushed around `update` + `draw`. The name is copied
/// into a Tracy-owned allocation; prefer [`profile_scope!`] for literals.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _profile_span = $crate::profiling::Client::running()
            .map(|c| c.span_alloc(Some($name), "", file!(), line!(), 0));
    };
}

/// Open a dynamically named span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _ = $name;
    };
}

/// Plot a numeric value over time, e.g. the loader's ready count.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

/// Name the current thread in the profiler timeline.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! set_thread_name {
    ($name:expr) => {
        $crate::profiling::tracy_client::set_thread_name!($name)
    };
}

/// Name the current thread (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! set_thread_name {
    ($name:expr) => {};
}

/// Send a message to the profiler's message log.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_message {
    ($msg:expr) => {
        if let Some(client) = $crate::profiling::Client::running() {
            client.message($msg, 0);
        }
    };
}

/// Send a message (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_message {
    ($msg:expr) => {
        let _ = $msg;
    };
}

pub use frame_mark;
pub use profile_function;
pub use profile_message;
pub use profile_plot;
pub use profile_scope;
pub use profile_scope_dynamic;
pub use set_thread_name;

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        frame_mark!();
        profile_scope!("test_scope");
        let name = String::from("dynamic_scope");
        profile_scope_dynamic!(name.as_str());
        profile_function!();
        profile_plot!("test_value", 42.0);
        set_thread_name!("test_thread");
        profile_message!("test message");
    }
}
