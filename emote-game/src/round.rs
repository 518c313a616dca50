//! Round state machine
//!
//! Two states, `Idle` and `Active`, and exactly three operations:
//!
//! ```text
//!          start(name)                 stop()
//!   Idle ──────────────▶ Active ──────────────▶ Idle  (+ LeaderboardEntry)
//!                         │  ▲
//!                         └──┘ observe(snapshot): best = max(best, snapshot[target])
//! ```
//!
//! Any other call is rejected with a [`ValidationError`] and leaves the state
//! untouched.

use chrono::{DateTime, Utc};
use emote_common::config::TargetSet;
use emote_common::{ConfidenceSnapshot, Emotion, LeaderboardEntry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use uuid::Uuid;

/// Rejected round operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your name.")]
    EmptyName,

    #[error("A round is already in progress.")]
    AlreadyActive,

    #[error("No round is in progress.")]
    NoActiveRound,
}

/// Round in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRound {
    pub round_id: Uuid,
    pub player_name: String,
    pub target_emotion: Emotion,
    /// Best confidence seen for the target since the round started
    pub best_score: f64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RoundState {
    #[default]
    Idle,
    Active(ActiveRound),
}

/// Which controls the shell should enable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl Controls {
    /// Start also needs a name in the input field
    pub fn can_start(&self, name: &str) -> bool {
        self.start_enabled && !name.trim().is_empty()
    }
}

/// Effect of one observation on the active round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Idle: snapshot discarded
    Ignored,
    /// Target missing from the snapshot, or not above the best score
    Unchanged,
    /// New best score
    Improved(f64),
}

pub struct RoundMachine {
    state: RoundState,
    targets: &'static [Emotion],
    rng: StdRng,
}

impl RoundMachine {
    pub fn new(target_set: TargetSet) -> Self {
        Self::with_rng(target_set, StdRng::from_entropy())
    }

    /// Deterministic target selection for a given seed
    pub fn with_seed(target_set: TargetSet, seed: u64) -> Self {
        Self::with_rng(target_set, StdRng::seed_from_u64(seed))
    }

    fn with_rng(target_set: TargetSet, rng: StdRng) -> Self {
        Self {
            state: RoundState::Idle,
            targets: target_set.emotions(),
            rng,
        }
    }

    /// Begin a round for `player_name` with a random target
    pub fn start(&mut self, player_name: &str) -> Result<&ActiveRound, ValidationError> {
        let name = player_name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.is_active() {
            return Err(ValidationError::AlreadyActive);
        }

        let target_emotion = self.targets[self.rng.gen_range(0..self.targets.len())];
        self.state = RoundState::Active(ActiveRound {
            round_id: Uuid::new_v4(),
            player_name: name.to_string(),
            target_emotion,
            best_score: 0.0,
            started_at: Utc::now(),
        });

        match &self.state {
            RoundState::Active(round) => Ok(round),
            RoundState::Idle => unreachable!("state was just set to Active"),
        }
    }

    /// Fold one snapshot into the active round's best score
    pub fn observe(&mut self, snapshot: &ConfidenceSnapshot) -> Observation {
        let RoundState::Active(round) = &mut self.state else {
            return Observation::Ignored;
        };

        match snapshot.get(round.target_emotion) {
            Some(value) if value > round.best_score => {
                round.best_score = value;
                Observation::Improved(value)
            }
            _ => Observation::Unchanged,
        }
    }

    /// End the active round and produce its leaderboard entry
    pub fn stop(&mut self) -> Result<LeaderboardEntry, ValidationError> {
        match std::mem::take(&mut self.state) {
            RoundState::Active(round) => Ok(LeaderboardEntry::new(
                round.player_name,
                round.target_emotion,
                round.best_score,
            )),
            RoundState::Idle => Err(ValidationError::NoActiveRound),
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveRound> {
        match &self.state {
            RoundState::Active(round) => Some(round),
            RoundState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RoundState::Active(_))
    }

    pub fn controls(&self) -> Controls {
        Controls {
            start_enabled: !self.is_active(),
            stop_enabled: self.is_active(),
        }
    }
}
