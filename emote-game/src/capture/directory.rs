//! Replays image files from a folder as a camera feed
//!
//! Files are played in name order and the sequence loops. Useful for running
//! the game against recorded frames, and for tests.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{CaptureError, FrameSource};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct DirectorySource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    /// Scan `dir` for image files
    ///
    /// Fails when the folder is missing or holds no images.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("{}: {}", dir.display(), e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no image files in {}",
                dir.display()
            )));
        }

        info!("Replaying {} frames from {}", files.len(), dir.display());
        Ok(Self { dir, files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectorySource {
    fn grab(&mut self) -> Result<RgbImage, CaptureError> {
        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        match image::open(path) {
            Ok(img) => Ok(img.to_rgb8()),
            Err(e) => {
                warn!("Could not decode frame {}: {}", path.display(), e);
                Err(CaptureError::Frame(format!("{}: {}", path.display(), e)))
            }
        }
    }

    fn describe(&self) -> String {
        format!("folder {}", self.dir.display())
    }
}
