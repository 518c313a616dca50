//! # Emote Game Library (emote-game)
//!
//! Live emotion readout and "act out an emotion" scoring game.
//!
//! **Purpose:** Pull camera frames on a fixed cadence, run them through an
//! external emotion classifier, publish the annotated frame and ranked
//! confidences, and score rounds against a persisted leaderboard.
//!
//! **Architecture:** one owning task drives [`scheduler::run`]; each tick's
//! capture and inference run on a blocking worker, at most one at a time, and
//! all round and leaderboard mutation happens back on the owning task inside
//! [`controller::GameController`].

pub mod capture;
pub mod console;
pub mod controller;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod round;
pub mod scheduler;

pub use error::{Error, Result};
