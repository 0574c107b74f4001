//! # GITech App
//!
//! The VirtualMuseum application shell: declares the museum's GPU resources,
//! wires the render-pass tree, loads everything on worker threads and runs
//! the frame loop on the headless backend.
//!
//! ## Overview
//!
//! - [`App`] - lifecycle: load, frame, display changes, shutdown
//! - [`AppArgs`] - command-line configuration
//! - [`scene`] - the declared resource table
//! - [`scheme`] - the render-pass tree built from that table
//! - [`AudioDevice`] - ambient sound hooks
//!
//! ## Example
//!
//! ```ignore
//! use gitech_app::{App, AppArgs, DefaultAppArgs};
//!
//! fn main() {
//!     let args = DefaultAppArgs::parse();
//!     App::run(args).unwrap();
//! }
//! ```

mod app;
mod args;
mod audio;
mod display;
mod error;
pub mod scene;
pub mod scheme;

pub use app::App;
pub use args::{AppArgs, CliLoadStrategy, DefaultAppArgs};
pub use audio::{
    AudioDevice, NullAudioDevice, NullSoundSource, SoundSource, SoundSourceId, SoundStatus,
};
pub use display::{DisplayChanges, DisplaySettings};
pub use error::{AppError, AppResult};
pub use scheme::{RenderOptions, build_render_scheme};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
///
/// This should be called before using any app functionality.
pub fn init() {
    log::info!("GITech App v{} initialized", VERSION);
}
