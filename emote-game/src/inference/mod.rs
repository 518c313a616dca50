//! Inference adapter around the external emotion classifier
//!
//! The classifier is an opaque collaborator behind [`EmotionClassifier`]. Its
//! raw output follows the DeepFace result shape:
//!
//! ```json
//! [{"emotion": {"happy": 91.2, "sad": 0.4},
//!   "dominant_emotion": "happy",
//!   "region": {"x": 120, "y": 80, "w": 200, "h": 210}}]
//! ```
//!
//! [`InferenceAdapter::analyze`] turns that into an [`Analysis`]. It never
//! fails: a classifier error or an empty result yields [`Analysis::fallback`]
//! so one bad frame cannot stall the pipeline. There is no retry and no
//! timeout; the next tick is the retry.

mod demo;
mod process;

pub use demo::DemoClassifier;
pub use process::ProcessClassifier;

use emote_common::{ConfidenceSnapshot, Emotion, FaceRect};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Classifier failure for a single frame
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Model reported an error
    #[error("Model error: {0}")]
    Model(String),

    /// No face in the frame
    #[error("No face detected")]
    NoFace,

    /// Classifier process could not be run
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Classifier output was not valid JSON of the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Frame could not be encoded for the classifier
    #[error("Encode error: {0}")]
    Encode(String),
}

/// Face region as reported by the classifier (may exceed the frame)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Raw per-face classifier output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysis {
    /// Confidence per label, in percent
    #[serde(default)]
    pub emotion: BTreeMap<String, f64>,
    #[serde(default)]
    pub dominant_emotion: Option<String>,
    #[serde(default)]
    pub region: Option<Region>,
}

/// External emotion model seam
pub trait EmotionClassifier: Send {
    /// Classify one frame; one entry per face found
    fn classify(&mut self, frame: &RgbImage) -> Result<Vec<FaceAnalysis>, InferenceError>;
}

/// Secondary face detector whose boxes are drawn next to the classifier's
pub trait FaceDetector: Send {
    /// Raw boxes as `(x, y, w, h)`; clamped by the caller
    fn detect(&mut self, frame: &RgbImage) -> Vec<Region>;
}

/// Normalized result for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub dominant: Emotion,
    pub confidences: ConfidenceSnapshot,
    /// Face box clamped to frame bounds
    pub face_box: Option<FaceRect>,
    /// True when the classifier failed and this is the fallback value
    pub fallback: bool,
}

impl Analysis {
    /// Value used when the classifier fails or finds no face
    pub fn fallback() -> Self {
        Self {
            dominant: Emotion::Neutral,
            confidences: ConfidenceSnapshot::new(),
            face_box: None,
            fallback: true,
        }
    }

    /// Dominant category in upper case, for the main label
    pub fn dominant_label(&self) -> String {
        self.dominant.label()
    }
}

/// Normalize one face of raw classifier output
///
/// Unknown labels are ignored and values are clamped to `[0, 100]`. The
/// dominant category is recomputed from the snapshot; the classifier's own
/// label is only used when no known category was reported. A region that
/// spans the whole frame means the classifier did not localise a face, so no
/// box is reported for it.
pub fn normalize(face: &FaceAnalysis, frame_width: u32, frame_height: u32) -> Analysis {
    let mut confidences = ConfidenceSnapshot::new();
    for (label, value) in &face.emotion {
        match label.parse::<Emotion>() {
            Ok(emotion) => {
                confidences.insert(emotion, *value);
            }
            Err(_) => trace!("Ignoring unknown classifier label {:?}", label),
        }
    }

    let dominant = confidences
        .dominant()
        .or_else(|| face.dominant_emotion.as_deref().and_then(|s| s.parse().ok()))
        .unwrap_or(Emotion::Neutral);

    let face_box = face
        .region
        .and_then(|r| FaceRect::clamped(r.x, r.y, r.w, r.h, frame_width, frame_height))
        .filter(|rect| !rect.covers_frame(frame_width, frame_height));

    Analysis {
        dominant,
        confidences,
        face_box,
        fallback: false,
    }
}

/// Wraps a classifier and applies the fallback-on-failure policy
pub struct InferenceAdapter {
    classifier: Box<dyn EmotionClassifier>,
    analyzed: u64,
    fallbacks: u64,
}

impl InferenceAdapter {
    pub fn new(classifier: Box<dyn EmotionClassifier>) -> Self {
        Self {
            classifier,
            analyzed: 0,
            fallbacks: 0,
        }
    }

    /// Analyse one frame; never fails
    pub fn analyze(&mut self, frame: &RgbImage) -> Analysis {
        self.analyzed += 1;

        let result = self
            .classifier
            .classify(frame)
            .and_then(|faces| faces.into_iter().next().ok_or(InferenceError::NoFace));

        match result {
            Ok(face) => normalize(&face, frame.width(), frame.height()),
            Err(e) => {
                self.fallbacks += 1;
                debug!("Inference fell back to neutral: {}", e);
                Analysis::fallback()
            }
        }
    }

    /// Frames analysed so far
    pub fn analyzed(&self) -> u64 {
        self.analyzed
    }

    /// Frames that used the fallback
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Classifier returning queued results in order
    pub(crate) struct ScriptedClassifier {
        pub results: VecDeque<Result<Vec<FaceAnalysis>, InferenceError>>,
    }

    impl ScriptedClassifier {
        pub fn new(results: Vec<Result<Vec<FaceAnalysis>, InferenceError>>) -> Self {
            Self { results: results.into() }
        }
    }

    impl EmotionClassifier for ScriptedClassifier {
        fn classify(&mut self, _frame: &RgbImage) -> Result<Vec<FaceAnalysis>, InferenceError> {
            self.results.pop_front().unwrap_or(Err(InferenceError::NoFace))
        }
    }

    pub(crate) fn face(emotions: &[(&str, f64)], region: Option<Region>) -> FaceAnalysis {
        FaceAnalysis {
            emotion: emotions.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            dominant_emotion: None,
            region,
        }
    }

    #[test]
    fn test_deepface_json_shape_parses() {
        let json = r#"[{"emotion": {"angry": 0.5, "happy": 91.25, "sad": 2.0},
                        "dominant_emotion": "happy",
                        "region": {"x": 10, "y": 12, "w": 30, "h": 40, "left_eye": null},
                        "face_confidence": 0.93}]"#;
        let faces: Vec<FaceAnalysis> = serde_json::from_str(json).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].region, Some(Region { x: 10, y: 12, w: 30, h: 40 }));

        let analysis = normalize(&faces[0], 64, 64);
        assert_eq!(analysis.dominant, Emotion::Happy);
        assert_eq!(analysis.confidences.get(Emotion::Happy), Some(91.25));
        assert_eq!(analysis.face_box, Some(FaceRect { x: 10, y: 12, width: 30, height: 40 }));
        assert!(!analysis.fallback);
    }

    #[test]
    fn test_normalize_clamps_values_and_box() {
        let raw = face(
            &[("happy", 130.0), ("fear", -2.0), ("contempt", 50.0)],
            Some(Region { x: -5, y: 50, w: 40, h: 40 }),
        );
        let analysis = normalize(&raw, 64, 64);

        assert_eq!(analysis.confidences.get(Emotion::Happy), Some(100.0));
        assert_eq!(analysis.confidences.get(Emotion::Fear), Some(0.0));
        assert_eq!(analysis.confidences.len(), 2);
        for (_, value) in analysis.confidences.iter() {
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(analysis.face_box, Some(FaceRect { x: 0, y: 50, width: 35, height: 14 }));
    }

    #[test]
    fn test_whole_frame_region_has_no_box() {
        let raw = face(&[("sad", 60.0)], Some(Region { x: 0, y: 0, w: 64, h: 48 }));
        let analysis = normalize(&raw, 64, 48);
        assert!(analysis.face_box.is_none());
        assert_eq!(analysis.dominant, Emotion::Sad);
    }

    #[test]
    fn test_reported_label_used_when_no_known_categories() {
        let mut raw = face(&[("contempt", 80.0)], None);
        raw.dominant_emotion = Some("Surprise".to_string());
        assert_eq!(normalize(&raw, 10, 10).dominant, Emotion::Surprise);

        raw.dominant_emotion = None;
        assert_eq!(normalize(&raw, 10, 10).dominant, Emotion::Neutral);
    }

    #[test]
    fn test_adapter_falls_back_on_error_and_no_face() {
        let classifier = ScriptedClassifier::new(vec![
            Err(InferenceError::Model("boom".to_string())),
            Ok(vec![]),
            Ok(vec![face(&[("angry", 70.0)], None)]),
        ]);
        let mut adapter = InferenceAdapter::new(Box::new(classifier));
        let frame = RgbImage::new(8, 8);

        let first = adapter.analyze(&frame);
        assert_eq!(first, Analysis::fallback());
        assert_eq!(first.dominant_label(), "NEUTRAL");
        assert!(first.confidences.is_empty());

        assert!(adapter.analyze(&frame).fallback);

        let third = adapter.analyze(&frame);
        assert!(!third.fallback);
        assert_eq!(third.dominant, Emotion::Angry);

        assert_eq!(adapter.analyzed(), 3);
        assert_eq!(adapter.fallbacks(), 2);
    }
}
