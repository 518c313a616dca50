//! Event types for the emote event system
//!
//! The game controller publishes everything a presentation shell needs to
//! render through [`EventBus`]: per-tick readouts, round transitions and
//! leaderboard updates. Events serialize with a `type` tag so a shell can
//! forward them as JSON.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::emotion::{Emotion, FaceRect};
use crate::leaderboard::LeaderboardEntry;

/// Emote event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// One pipeline tick finished analysing a frame
    ///
    /// Triggers:
    /// - Shell: update dominant label and ranked readout
    FrameAnalyzed {
        /// Uppercased dominant category
        dominant_label: String,
        /// Categories ranked by confidence, highest first
        ranked: Vec<(Emotion, f64)>,
        /// Face box in frame coordinates, if one was found
        face_box: Option<FaceRect>,
        /// True when the classifier failed and the fallback was used
        fallback: bool,
    },

    /// A tick was skipped because no frame could be captured
    FrameSkipped {
        reason: String,
    },

    /// Round started
    ///
    /// Triggers:
    /// - Shell: show "Do the <emotion> face", disable start, enable stop
    RoundStarted {
        round_id: Uuid,
        player_name: String,
        target_emotion: Emotion,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Best score of the active round went up
    ScoreImproved {
        round_id: Uuid,
        target_emotion: Emotion,
        best_score: f64,
    },

    /// Round stopped and its result recorded
    ///
    /// Triggers:
    /// - Shell: restore name prompt, enable start, disable stop
    RoundFinished {
        round_id: Uuid,
        entry: LeaderboardEntry,
        /// Duration of the round in milliseconds
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Leaderboard view changed
    LeaderboardUpdated {
        /// Top entries, already formatted as `rank. name - emotion - score%`
        lines: Vec<String>,
    },

    /// Leaderboard could not be written to disk (in-memory copy kept)
    LeaderboardSaveFailed {
        error: String,
    },
}

/// Broadcast bus for [`GameEvent`]s
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GameEvent) -> Result<usize, broadcast::error::SendError<GameEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
