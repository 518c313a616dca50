//! Frame annotation and canvas fitting
//!
//! Pure image operations: no state, no I/O.

use emote_common::FaceRect;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Colour of the classifier's face box
pub const FACE_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Colour of secondary detector boxes
pub const DETECTOR_BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Outline thickness in pixels
pub const BOX_THICKNESS: u32 = 2;

/// Aspect ratio that decides whether width or height limits the fit
pub const REFERENCE_ASPECT_RATIO: f64 = 16.0 / 9.0;

/// Draw a hollow rectangle onto `frame`
///
/// The rectangle is assumed to be clamped to the frame already; pixels
/// outside the frame are skipped regardless.
pub fn draw_box(frame: &mut RgbImage, rect: &FaceRect, color: Rgb<u8>, thickness: u32) {
    let (width, height) = frame.dimensions();
    let right = rect.right().min(width);
    let bottom = rect.bottom().min(height);

    for y in rect.y..bottom {
        for x in rect.x..right {
            let on_edge = x < rect.x + thickness
                || y < rect.y + thickness
                || x + thickness >= right
                || y + thickness >= bottom;
            if on_edge {
                frame.put_pixel(x, y, color);
            }
        }
    }
}

/// Target size for showing a `frame_width` x `frame_height` frame on a canvas
///
/// Frames wider than 16:9 are sized to the canvas width, everything else to
/// the canvas height. When that overshoots the other bound (a 16:9 frame on a
/// 4:3 canvas) the size is scaled down again, so the result always lies
/// within the canvas. Never returns a zero dimension.
pub fn fit_dimensions(
    frame_width: u32,
    frame_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if frame_width == 0 || frame_height == 0 {
        return (max_width.max(1), max_height.max(1));
    }

    let aspect = f64::from(frame_width) / f64::from(frame_height);
    let (mut w, mut h) = if aspect > REFERENCE_ASPECT_RATIO {
        (f64::from(max_width), f64::from(max_width) / aspect)
    } else {
        (f64::from(max_height) * aspect, f64::from(max_height))
    };

    if w > f64::from(max_width) {
        w = f64::from(max_width);
        h = w / aspect;
    }
    if h > f64::from(max_height) {
        h = f64::from(max_height);
        w = h * aspect;
    }

    ((w as u32).max(1), (h as u32).max(1))
}

/// Resize `frame` to fit the canvas, preserving aspect ratio
pub fn fit_to_canvas(frame: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (w, h) = fit_dimensions(frame.width(), frame.height(), max_width, max_height);
    if (w, h) == frame.dimensions() {
        return frame.clone();
    }
    imageops::resize(frame, w, h, FilterType::Triangle)
}
