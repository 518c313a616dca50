//! Game controller
//!
//! Single owner of the round state machine and the leaderboard store. Shell
//! actions (start, stop, show leaderboard) and pipeline tick outcomes all come
//! through here, on one task, and every visible change is published on the
//! [`EventBus`].

use chrono::Utc;
use emote_common::events::{EventBus, GameEvent};
use emote_common::{LeaderboardEntry, LeaderboardStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pipeline::{DisplayFrame, FramePipeline, TickOutcome};
use crate::round::{ActiveRound, Controls, Observation, RoundMachine, RoundState, ValidationError};

/// Rejected shell action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Viewer-only configuration has no scoring game
    #[error("The scoring game is disabled in this configuration.")]
    GameDisabled,
}

/// Outcome of stopping a round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub entry: LeaderboardEntry,
    /// False when the leaderboard could not be written (entry kept in memory)
    pub saved: bool,
    pub duration_ms: u64,
}

pub struct GameController {
    round: RoundMachine,
    leaderboard: LeaderboardStore,
    events: Arc<EventBus>,
    game_enabled: bool,
    view_size: usize,
    last_display: Option<DisplayFrame>,
}

impl GameController {
    pub fn new(
        round: RoundMachine,
        leaderboard: LeaderboardStore,
        events: Arc<EventBus>,
        game_enabled: bool,
        view_size: usize,
    ) -> Self {
        Self {
            round,
            leaderboard,
            events,
            game_enabled,
            view_size,
            last_display: None,
        }
    }

    /// Run one full tick synchronously on the calling thread
    pub fn tick(&mut self, pipeline: &mut FramePipeline) -> Option<&DisplayFrame> {
        let outcome = pipeline.process();
        self.apply_tick(outcome)
    }

    /// Apply the result of a pipeline tick
    ///
    /// The snapshot is handed to the round state machine whether or not a
    /// round is active; skipped ticks change nothing. Returns the display data
    /// for the tick, if a frame was analysed.
    pub fn apply_tick(&mut self, outcome: TickOutcome) -> Option<&DisplayFrame> {
        match outcome {
            TickOutcome::Skipped { reason } => {
                self.events.emit_lossy(GameEvent::FrameSkipped { reason });
                None
            }
            TickOutcome::Analyzed { confidences, display } => {
                if let Observation::Improved(best_score) = self.round.observe(&confidences) {
                    if let Some(round) = self.round.active() {
                        debug!(
                            "{} improved {} score to {:.2}",
                            round.player_name, round.target_emotion, best_score
                        );
                        self.events.emit_lossy(GameEvent::ScoreImproved {
                            round_id: round.round_id,
                            target_emotion: round.target_emotion,
                            best_score,
                        });
                    }
                }

                self.events.emit_lossy(GameEvent::FrameAnalyzed {
                    dominant_label: display.dominant_label.clone(),
                    ranked: display.ranked.clone(),
                    face_box: display.face_box,
                    fallback: display.fallback,
                });

                self.last_display = Some(display);
                self.last_display.as_ref()
            }
        }
    }

    /// Start a round for `player_name`
    pub fn start_round(&mut self, player_name: &str) -> Result<ActiveRound, ControlError> {
        if !self.game_enabled {
            return Err(ControlError::GameDisabled);
        }

        let round = self.round.start(player_name)?.clone();
        info!("{}: do the {} face", round.player_name, round.target_emotion);
        self.events.emit_lossy(GameEvent::RoundStarted {
            round_id: round.round_id,
            player_name: round.player_name.clone(),
            target_emotion: round.target_emotion,
            timestamp: round.started_at,
        });
        Ok(round)
    }

    /// Stop the active round and record it on the leaderboard
    ///
    /// A failed save is reported (warning + event) but does not fail the stop.
    pub fn stop_round(&mut self) -> Result<RoundSummary, ControlError> {
        if !self.game_enabled {
            return Err(ControlError::GameDisabled);
        }

        let (round_id, started_at) = match self.round.active() {
            Some(round) => (round.round_id, round.started_at),
            None => return Err(ValidationError::NoActiveRound.into()),
        };
        let entry = self.round.stop()?;
        let now = Utc::now();
        let duration_ms = (now - started_at).num_milliseconds().max(0) as u64;

        let saved = match self.leaderboard.record(entry.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Could not save leaderboard to {}: {} (keeping it in memory)",
                    self.leaderboard.path().display(),
                    e
                );
                self.events.emit_lossy(GameEvent::LeaderboardSaveFailed { error: e.to_string() });
                false
            }
        };

        info!(
            "Round over: {} scored {:.2}% on {}",
            entry.player_name, entry.score, entry.emotion
        );
        self.events.emit_lossy(GameEvent::RoundFinished {
            round_id,
            entry: entry.clone(),
            duration_ms,
            timestamp: now,
        });
        self.events.emit_lossy(GameEvent::LeaderboardUpdated {
            lines: self.leaderboard_view(),
        });

        Ok(RoundSummary {
            entry,
            saved,
            duration_ms,
        })
    }

    /// Formatted top entries for the leaderboard view
    pub fn leaderboard_view(&self) -> Vec<String> {
        self.leaderboard.format_top_n(self.view_size)
    }

    pub fn leaderboard(&self) -> &LeaderboardStore {
        &self.leaderboard
    }

    pub fn controls(&self) -> Controls {
        if self.game_enabled {
            self.round.controls()
        } else {
            Controls {
                start_enabled: false,
                stop_enabled: false,
            }
        }
    }

    pub fn round_state(&self) -> &RoundState {
        self.round.state()
    }

    /// Display data of the most recent analysed frame (for redraws)
    pub fn last_display(&self) -> Option<&DisplayFrame> {
        self.last_display.as_ref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::inference::tests::{face, ScriptedClassifier};
    use crate::inference::InferenceAdapter;
    use crate::pipeline::tests::ScriptedSource;
    use crate::pipeline::PipelineOptions;
    use emote_common::config::TargetSet;
    use image::RgbImage;
    use tempfile::TempDir;

    fn controller(dir: &TempDir, game_enabled: bool) -> GameController {
        GameController::new(
            RoundMachine::with_seed(TargetSet::Extended, 17),
            LeaderboardStore::load(dir.path().join("leaderboard.json")),
            Arc::new(EventBus::new(64)),
            game_enabled,
            10,
        )
    }

    fn pipeline(readings: Vec<f64>, target: &str) -> FramePipeline {
        let frames = readings.iter().map(|_| Ok(RgbImage::new(16, 16))).collect();
        let results = readings
            .iter()
            .map(|v| Ok(vec![face(&[(target, *v), ("neutral", 100.0 - *v)], None)]))
            .collect();
        FramePipeline::new(
            Box::new(ScriptedSource { frames }),
            InferenceAdapter::new(Box::new(ScriptedClassifier::new(results))),
            PipelineOptions {
                canvas_width: 16,
                canvas_height: 16,
                draw_face_box: true,
            },
        )
    }

    #[test]
    fn test_round_scores_best_reading() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, true);
        let mut events = controller.events().subscribe();

        let round = controller.start_round("Bob").unwrap();
        let mut pipeline = pipeline(vec![10.0, 55.3, 40.0], round.target_emotion.as_str());
        for _ in 0..3 {
            assert!(controller.tick(&mut pipeline).is_some());
        }

        let summary = controller.stop_round().unwrap();
        assert_eq!(summary.entry, LeaderboardEntry::new("Bob", round.target_emotion, 55.3));
        assert!(summary.saved);
        assert_eq!(controller.leaderboard_view().len(), 1);

        let mut improvements = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let GameEvent::ScoreImproved { best_score, .. } = event {
                improvements.push(best_score);
            }
        }
        assert_eq!(improvements, vec![10.0, 55.3]);
    }

    #[test]
    fn test_idle_ticks_do_not_score() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, true);
        let mut pipeline = pipeline(vec![90.0], "happy");

        assert!(controller.tick(&mut pipeline).is_some());
        assert_eq!(controller.round_state(), &RoundState::Idle);
        assert!(controller.leaderboard().leaderboard().is_empty());
    }

    #[test]
    fn test_skipped_tick_returns_nothing() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, true);
        let outcome = TickOutcome::Skipped {
            reason: CaptureError::Frame("no frame".to_string()).to_string(),
        };
        assert!(controller.apply_tick(outcome).is_none());
        assert!(controller.last_display().is_none());
    }

    #[test]
    fn test_stop_without_round_leaves_leaderboard() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, true);

        assert_eq!(
            controller.stop_round().unwrap_err(),
            ControlError::Validation(ValidationError::NoActiveRound)
        );
        assert!(controller.leaderboard_view().is_empty());
        assert!(!dir.path().join("leaderboard.json").exists());
    }

    #[test]
    fn test_validation_errors_surface() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, true);

        assert_eq!(
            controller.start_round("  ").unwrap_err(),
            ControlError::Validation(ValidationError::EmptyName)
        );
        controller.start_round("Ann").unwrap();
        assert_eq!(
            controller.start_round("Ann").unwrap_err(),
            ControlError::Validation(ValidationError::AlreadyActive)
        );
        assert!(controller.controls().stop_enabled);
        assert!(!controller.controls().start_enabled);
    }

    #[test]
    fn test_viewer_only_rejects_rounds() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, false);

        assert_eq!(controller.start_round("Ann").unwrap_err(), ControlError::GameDisabled);
        assert_eq!(controller.stop_round().unwrap_err(), ControlError::GameDisabled);
        assert_eq!(
            controller.controls(),
            Controls { start_enabled: false, stop_enabled: false }
        );
    }

    #[test]
    fn test_save_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let mut controller = GameController::new(
            RoundMachine::with_seed(TargetSet::Classic, 2),
            LeaderboardStore::load(blocker.join("leaderboard.json")),
            Arc::new(EventBus::new(64)),
            true,
            10,
        );
        let mut events = controller.events().subscribe();

        controller.start_round("Ann").unwrap();
        let summary = controller.stop_round().unwrap();

        assert!(!summary.saved);
        assert_eq!(controller.leaderboard_view(), vec![format!(
            "1. Ann - {} - 0.00%",
            summary.entry.emotion
        )]);

        let mut save_failed = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, GameEvent::LeaderboardSaveFailed { .. }) {
                save_failed = true;
            }
        }
        assert!(save_failed);
    }
}
