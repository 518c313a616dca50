//! Stand-in classifier for running without a model
//!
//! Produces plausible readings: percentages over all seven categories that sum
//! to 100, with one "mood" category dominating and drifting over time, and a
//! face box near the centre of the frame. A small share of frames report no
//! face so the fallback path is exercised.

use emote_common::Emotion;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{EmotionClassifier, FaceAnalysis, InferenceError, Region};

/// Probability that a frame reports no face
const NO_FACE_PROBABILITY: f64 = 0.05;

/// Probability that the dominant mood changes on a frame
const MOOD_CHANGE_PROBABILITY: f64 = 0.02;

pub struct DemoClassifier {
    rng: StdRng,
    mood: Emotion,
}

impl DemoClassifier {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            mood: Emotion::Neutral,
        }
    }
}

impl Default for DemoClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionClassifier for DemoClassifier {
    fn classify(&mut self, frame: &RgbImage) -> Result<Vec<FaceAnalysis>, InferenceError> {
        if self.rng.gen_bool(NO_FACE_PROBABILITY) {
            return Err(InferenceError::NoFace);
        }
        if self.rng.gen_bool(MOOD_CHANGE_PROBABILITY) {
            self.mood = Emotion::ALL[self.rng.gen_range(0..Emotion::ALL.len())];
        }

        let weights: Vec<(Emotion, f64)> = Emotion::ALL
            .iter()
            .map(|&emotion| {
                let base = self.rng.gen_range(0.0..1.0);
                let boost = if emotion == self.mood { self.rng.gen_range(2.0..8.0) } else { 0.0 };
                (emotion, base + boost)
            })
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();

        let width = i64::from(frame.width());
        let height = i64::from(frame.height());
        let jitter = self.rng.gen_range(-4..=4);

        Ok(vec![FaceAnalysis {
            emotion: weights
                .into_iter()
                .map(|(emotion, w)| (emotion.as_str().to_string(), w / total * 100.0))
                .collect(),
            dominant_emotion: Some(self.mood.as_str().to_string()),
            region: Some(Region {
                x: width / 3 + jitter,
                y: height / 4 + jitter,
                w: width / 3,
                h: height / 2,
            }),
        }])
    }
}
