//! Application error type.

use gitech_graphics::{LoadError, ResourceError};
use thiserror::Error;

/// Errors that end the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource loading did not complete.
    #[error("resource loading failed: {0}")]
    Load(#[from] LoadError),
    /// A GPU object could not be created outside the loader.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Rejected command line or display settings.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Convenience alias for application results.
pub type AppResult<T> = Result<T, AppError>;
