//! Frame pipeline: capture, analyse, annotate
//!
//! [`FramePipeline::process`] performs the blocking half of a tick (grab a
//! frame, run inference, draw and resize) and returns a [`TickOutcome`]. It
//! touches no game state. The owning task then feeds the outcome's snapshot to
//! the round state machine (see `controller`), which keeps all mutation on one
//! thread even when `process` runs on a worker.

pub mod annotate;
pub mod readout;

use emote_common::config::DisplayConfig;
use emote_common::{ConfidenceSnapshot, Emotion, FaceRect};
use image::RgbImage;
use tracing::{debug, trace};

use crate::capture::FrameSource;
use crate::inference::{Analysis, FaceDetector, InferenceAdapter};

use annotate::{draw_box, fit_to_canvas, BOX_THICKNESS, DETECTOR_BOX_COLOR, FACE_BOX_COLOR};

/// Rendering options for the display feed
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub draw_face_box: bool,
}

impl From<&DisplayConfig> for PipelineOptions {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            canvas_width: display.canvas_width,
            canvas_height: display.canvas_height,
            draw_face_box: display.draw_face_box,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

/// Everything the presentation shell shows for one tick
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    /// Annotated frame, resized to the canvas
    pub image: RgbImage,
    /// Uppercased dominant category
    pub dominant_label: String,
    /// Categories by confidence, highest first
    pub ranked: Vec<(Emotion, f64)>,
    /// Formatted ranked lines (`Happy\t55.30%`)
    pub readout: Vec<String>,
    /// Face box in source-frame coordinates
    pub face_box: Option<FaceRect>,
    pub fallback: bool,
}

impl DisplayFrame {
    /// Readout panel text including its heading
    pub fn readout_text(&self) -> String {
        readout::panel_text(&self.readout)
    }
}

/// Result of the blocking half of one tick
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// No frame this tick; nothing to observe
    Skipped { reason: String },
    /// Frame analysed
    Analyzed {
        confidences: ConfidenceSnapshot,
        display: DisplayFrame,
    },
}

/// Counters over the pipeline's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub ticks: u64,
    pub skipped: u64,
    pub fallbacks: u64,
}

/// Build the display data for an analysed frame
///
/// Draws the face box (and any secondary boxes), ranks the confidences and
/// fits the result to the canvas.
pub fn render(
    mut frame: RgbImage,
    analysis: &Analysis,
    secondary: &[FaceRect],
    options: &PipelineOptions,
) -> DisplayFrame {
    if options.draw_face_box {
        if let Some(rect) = &analysis.face_box {
            draw_box(&mut frame, rect, FACE_BOX_COLOR, BOX_THICKNESS);
        }
    }
    for rect in secondary {
        draw_box(&mut frame, rect, DETECTOR_BOX_COLOR, BOX_THICKNESS);
    }

    let ranked = analysis.confidences.ranked();
    let readout = readout::format_ranked(&ranked);

    DisplayFrame {
        image: fit_to_canvas(&frame, options.canvas_width, options.canvas_height),
        dominant_label: analysis.dominant_label(),
        ranked,
        readout,
        face_box: analysis.face_box,
        fallback: analysis.fallback,
    }
}

/// Owns the frame source, the inference adapter and the optional detector
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    adapter: InferenceAdapter,
    detector: Option<Box<dyn FaceDetector>>,
    options: PipelineOptions,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        adapter: InferenceAdapter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            adapter,
            detector: None,
            options,
            stats: PipelineStats::default(),
        }
    }

    /// Draw boxes from a secondary detector as well
    pub fn with_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Run the blocking half of one tick
    pub fn process(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        let frame = match self.source.grab() {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.skipped += 1;
                debug!("Skipping tick {}: {}", self.stats.ticks, e);
                return TickOutcome::Skipped { reason: e.to_string() };
            }
        };

        let analysis = self.adapter.analyze(&frame);
        if analysis.fallback {
            self.stats.fallbacks += 1;
        }

        let (width, height) = frame.dimensions();
        let secondary: Vec<FaceRect> = match self.detector.as_mut() {
            Some(detector) => detector
                .detect(&frame)
                .into_iter()
                .filter_map(|r| FaceRect::clamped(r.x, r.y, r.w, r.h, width, height))
                .collect(),
            None => Vec::new(),
        };

        trace!(
            "Tick {}: dominant {} ({} categories, box {:?})",
            self.stats.ticks,
            analysis.dominant,
            analysis.confidences.len(),
            analysis.face_box
        );

        let display = render(frame, &analysis, &secondary, &self.options);
        TickOutcome::Analyzed {
            confidences: analysis.confidences,
            display,
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn source_name(&self) -> String {
        self.source.describe()
    }
}
