//! Solid-colour frames for running without a camera

use image::{Rgb, RgbImage};

use super::{CaptureError, FrameSource};

pub struct SyntheticSource {
    width: u32,
    height: u32,
    color: Rgb<u8>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::DeviceUnavailable(format!(
                "invalid synthetic frame size {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            color: Rgb([64, 64, 64]),
        })
    }
}

impl FrameSource for SyntheticSource {
    fn grab(&mut self) -> Result<RgbImage, CaptureError> {
        Ok(RgbImage::from_pixel(self.width, self.height, self.color))
    }

    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_have_requested_size() {
        let mut source = SyntheticSource::new(640, 480).unwrap();
        let frame = source.grab().unwrap();
        assert_eq!(frame.dimensions(), (640, 480));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(SyntheticSource::new(0, 480).is_err());
    }
}
