//! Frame sources
//!
//! The camera is an external collaborator behind [`FrameSource`]. Opening a
//! source is the one place where failure is fatal (startup aborts); a failed
//! [`FrameSource::grab`] only skips the current tick.

mod directory;
mod synthetic;

pub use directory::DirectorySource;
pub use synthetic::SyntheticSource;

use image::RgbImage;
use thiserror::Error;

/// Frame acquisition errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Device (or replay folder) could not be opened
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame could not be read or decoded
    #[error("Frame unavailable: {0}")]
    Frame(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of raw camera frames
pub trait FrameSource: Send {
    /// Acquire the next frame
    fn grab(&mut self) -> Result<RgbImage, CaptureError>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}
