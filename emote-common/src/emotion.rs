//! Emotion categories, per-frame confidence snapshots and face rectangles
//!
//! The category order declared on [`Emotion`] is the stable order used for
//! tie-breaking everywhere: dominant category selection, ranked readouts and
//! snapshot iteration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Emotion category reported by the classifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Every category, in stable order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Targets offered by the original four-emotion game
    pub const CLASSIC_TARGETS: [Emotion; 4] =
        [Emotion::Angry, Emotion::Happy, Emotion::Sad, Emotion::Surprise];

    /// Targets offered by the extended game (adds disgust and fear)
    pub const EXTENDED_TARGETS: [Emotion; 6] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Name with a leading capital, as shown in the readout
    pub fn capitalized(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Name in upper case, as shown in the dominant label
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "angry" => Ok(Emotion::Angry),
            "disgust" => Ok(Emotion::Disgust),
            "fear" => Ok(Emotion::Fear),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "surprise" => Ok(Emotion::Surprise),
            "neutral" => Ok(Emotion::Neutral),
            other => Err(Error::InvalidInput(format!("Unknown emotion: {}", other))),
        }
    }
}

/// Lower bound of a confidence value (percent)
pub const MIN_CONFIDENCE: f64 = 0.0;

/// Upper bound of a confidence value (percent)
pub const MAX_CONFIDENCE: f64 = 100.0;

/// One tick's confidence mapping over emotion categories
///
/// Values are percentages in `[0, 100]`. Categories may be missing when the
/// classifier does not report them (or when the tick fell back).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSnapshot {
    values: BTreeMap<Emotion, f64>,
}

impl ConfidenceSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence for a category
    ///
    /// Values are clamped into `[0, 100]`; non-finite values are ignored.
    /// Returns the stored value, if any.
    pub fn insert(&mut self, emotion: Emotion, confidence: f64) -> Option<f64> {
        if !confidence.is_finite() {
            return None;
        }
        let clamped = confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
        self.values.insert(emotion, clamped);
        Some(clamped)
    }

    /// Confidence for a category, if present
    pub fn get(&self, emotion: Emotion) -> Option<f64> {
        self.values.get(&emotion).copied()
    }

    pub fn contains(&self, emotion: Emotion) -> bool {
        self.values.contains_key(&emotion)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in stable category order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.values.iter().map(|(emotion, value)| (*emotion, *value))
    }

    /// Category with the highest confidence
    ///
    /// Ties go to the category that comes first in stable order.
    pub fn dominant(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, f64)> = None;
        for (emotion, value) in self.iter() {
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((emotion, value)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }

    /// Categories sorted by confidence, highest first
    ///
    /// Equal confidences keep stable category order (the sort is stable and
    /// the input is already in that order).
    pub fn ranked(&self) -> Vec<(Emotion, f64)> {
        let mut ranked: Vec<(Emotion, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl FromIterator<(Emotion, f64)> for ConfidenceSnapshot {
    fn from_iter<I: IntoIterator<Item = (Emotion, f64)>>(iter: I) -> Self {
        let mut snapshot = ConfidenceSnapshot::new();
        for (emotion, confidence) in iter {
            snapshot.insert(emotion, confidence);
        }
        snapshot
    }
}

/// Face bounding box in pixel coordinates of the analysed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    /// Clamp a raw (possibly negative or oversized) region to frame bounds
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clamped(
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<FaceRect> {
        let frame_w = i64::from(frame_width);
        let frame_h = i64::from(frame_height);

        let left = x.clamp(0, frame_w);
        let top = y.clamp(0, frame_h);
        let right = x.saturating_add(width.max(0)).clamp(0, frame_w);
        let bottom = y.saturating_add(height.max(0)).clamp(0, frame_h);

        if right <= left || bottom <= top {
            return None;
        }

        Some(FaceRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// True when the box spans the whole frame
    pub fn covers_frame(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width >= frame_width && self.height >= frame_height
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}
