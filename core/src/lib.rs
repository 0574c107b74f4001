//! # GITech Core
//!
//! Dependency-light building blocks shared by the renderer and the
//! application shell:
//!
//! - [`profiling`] - Tracy macros, compiled out unless the `profiling` feature is on
//! - [`sync`] - Cancellation, countdown and single-use latch primitives
//! - [`slots`] - Index-addressed object table used by resource managers

pub mod profiling;
pub mod slots;
pub mod sync;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("GITech Core v{} initialized", VERSION);
}
