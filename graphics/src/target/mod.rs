//! Render-target conventions shared by passes.
//!
//! - [`DynamicRenderTarget`] - a pass-owned surface sized in pixels or relative
//!   to the back buffer, recreated only when its resolved size changes
//! - [`PingPong`] - two or three same-format surfaces with explicit read and
//!   write roles, for iterative blurs and frame-to-frame accumulation

mod dynamic;
mod ping_pong;

pub use dynamic::{DynamicRenderTarget, TargetUpdate};
pub use ping_pong::{PingPong, PingPongStep};
