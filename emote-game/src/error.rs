//! Error types for emote-game
//!
//! Only startup problems are errors here. Per-tick capture and inference
//! failures are recovered inside the pipeline and never reach the caller.

use thiserror::Error;

use crate::capture::CaptureError;

/// Main error type for emote-game
#[derive(Error, Debug)]
pub enum Error {
    /// Frame source could not be opened
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Errors from emote-common (configuration, leaderboard I/O)
    #[error(transparent)]
    Common(#[from] emote_common::Error),

    /// Blocking inference worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Convenience Result type using emote-game Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DirectorySource;
    use emote_common::config::TomlConfig;

    fn open_frames(dir: &std::path::Path) -> Result<usize> {
        Ok(DirectorySource::open(dir)?.len())
    }

    fn parse_config(text: &str) -> Result<TomlConfig> {
        Ok(TomlConfig::from_toml_str(text)?)
    }

    #[test]
    fn test_missing_frame_folder_is_capture_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = open_frames(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Capture(CaptureError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_bad_config_is_common_error() {
        let err = parse_config("[pipeline]\ntick_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Common(emote_common::Error::Config(_))));
    }
}
