//! # Emote Common Library
//!
//! Shared code for the emote game crates including:
//! - Emotion categories, confidence snapshots and face rectangles
//! - Leaderboard entries and the file-backed leaderboard store
//! - Event types (GameEvent enum) and the EventBus
//! - Configuration loading
//! - Error types

pub mod config;
pub mod emotion;
pub mod error;
pub mod events;
pub mod leaderboard;

pub use emotion::{ConfidenceSnapshot, Emotion, FaceRect};
pub use error::{Error, Result};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardStore};
