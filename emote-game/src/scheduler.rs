//! Cooperative tick scheduler
//!
//! One task owns the [`GameController`] and the [`FramePipeline`]. On every
//! interval tick the pipeline is moved onto a blocking worker for capture and
//! inference, awaited, and moved back; the outcome is then applied on this
//! task. Because the pipeline value itself travels to the worker, a second
//! inference cannot start before the first returns.
//!
//! Shell commands arrive on an mpsc channel and are applied between ticks.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::GameController;
use crate::pipeline::{FramePipeline, PipelineStats};
use crate::round::RoundState;
use crate::{Error, Result};

/// Action requested by the presentation shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Stop,
    ShowLeaderboard,
    Status,
    Quit,
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    QuitCommand,
    CommandsClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub stats: PipelineStats,
}

/// Apply one shell command; returns false for `Quit`
///
/// Rejections are notices for the user, not errors.
pub fn handle_command(controller: &mut GameController, command: Command) -> bool {
    match command {
        Command::Start(name) => match controller.start_round(&name) {
            Ok(round) => info!("Do the {} face, {}!", round.target_emotion, round.player_name),
            Err(e) => warn!("Cannot start: {}", e),
        },
        Command::Stop => match controller.stop_round() {
            Ok(summary) => {
                info!(
                    "{} scored {:.2}% on {}",
                    summary.entry.player_name, summary.entry.score, summary.entry.emotion
                );
                show_leaderboard(controller);
            }
            Err(e) => warn!("Cannot stop: {}", e),
        },
        Command::ShowLeaderboard => show_leaderboard(controller),
        Command::Status => {
            let controls = controller.controls();
            match controller.round_state() {
                RoundState::Idle => info!("Idle (start enabled: {})", controls.start_enabled),
                RoundState::Active(round) => info!(
                    "{} is doing {} (best {:.2}%)",
                    round.player_name, round.target_emotion, round.best_score
                ),
            }
            if let Some(shown) = controller.last_display() {
                info!("Current: {}", shown.dominant_label);
            }
        }
        Command::Quit => return false,
    }
    true
}

fn show_leaderboard(controller: &GameController) {
    let lines = controller.leaderboard_view();
    if lines.is_empty() {
        info!("Leaderboard is empty");
        return;
    }
    info!("Leaderboard");
    for line in lines {
        info!("  {}", line);
    }
}

/// Drive the pipeline until shutdown, `Quit`, or the command channel closes
pub async fn run<F>(
    controller: &mut GameController,
    mut pipeline: FramePipeline,
    tick_interval: Duration,
    mut commands: mpsc::Receiver<Command>,
    shutdown: F,
) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut timer = interval(tick_interval);
    // Inference is usually slower than the interval; never burst to catch up
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Pipeline running on {} every {:?}",
        pipeline.source_name(),
        tick_interval
    );

    let reason = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break StopReason::Shutdown,

            command = commands.recv() => match command {
                Some(command) => {
                    debug!("Command: {:?}", command);
                    if !handle_command(controller, command) {
                        break StopReason::QuitCommand;
                    }
                }
                None => break StopReason::CommandsClosed,
            },

            _ = timer.tick() => {
                let (returned, outcome) = tokio::task::spawn_blocking(move || {
                    let outcome = pipeline.process();
                    (pipeline, outcome)
                })
                .await
                .map_err(|e| Error::Worker(e.to_string()))?;
                pipeline = returned;

                if let Some(shown) = controller.apply_tick(outcome) {
                    debug!("{} | {}", shown.dominant_label, shown.readout.join(" | "));
                }
            }
        }
    };

    let stats = pipeline.stats();
    info!(
        "Pipeline stopped ({:?}): {} ticks, {} skipped, {} fallbacks",
        reason, stats.ticks, stats.skipped, stats.fallbacks
    );
    Ok(RunSummary { reason, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::tests::{face, ScriptedClassifier};
    use crate::inference::InferenceAdapter;
    use crate::pipeline::tests::ScriptedSource;
    use crate::pipeline::PipelineOptions;
    use crate::round::RoundMachine;
    use emote_common::config::TargetSet;
    use emote_common::events::EventBus;
    use emote_common::LeaderboardStore;
    use image::RgbImage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pipeline(ticks: usize) -> FramePipeline {
        let frames = (0..ticks).map(|_| Ok(RgbImage::new(8, 8))).collect();
        let results = (0..ticks).map(|_| Ok(vec![face(&[("happy", 75.0)], None)])).collect();
        FramePipeline::new(
            Box::new(ScriptedSource { frames }),
            InferenceAdapter::new(Box::new(ScriptedClassifier::new(results))),
            PipelineOptions {
                canvas_width: 8,
                canvas_height: 8,
                draw_face_box: true,
            },
        )
    }

    fn controller(dir: &TempDir) -> GameController {
        GameController::new(
            RoundMachine::with_seed(TargetSet::Classic, 4),
            LeaderboardStore::load(dir.path().join("leaderboard.json")),
            Arc::new(EventBus::new(1024)),
            true,
            10,
        )
    }

    #[test]
    fn test_handle_command_quit() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        assert!(handle_command(&mut controller, Command::Status));
        assert!(handle_command(&mut controller, Command::Stop));
        assert!(!handle_command(&mut controller, Command::Quit));
    }

    #[test]
    fn test_status_after_analyzed_tick() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let mut pipeline = pipeline(1);

        assert!(handle_command(&mut controller, Command::Start("Ann".to_string())));
        let shown = controller.tick(&mut pipeline).unwrap();
        assert_eq!(shown.dominant_label, "HAPPY");

        assert!(handle_command(&mut controller, Command::Status));
        assert_eq!(controller.last_display().unwrap().dominant_label, "HAPPY");
    }

    #[tokio::test]
    async fn test_quit_command_stops_loop() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let (tx, rx) = mpsc::channel(8);

        tx.send(Command::Start("Ann".to_string())).await.unwrap();
        tx.send(Command::Quit).await.unwrap();

        let summary = run(
            &mut controller,
            pipeline(4),
            Duration::from_millis(1),
            rx,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary.reason, StopReason::QuitCommand);
        assert!(controller.round_state() != &RoundState::Idle);
    }

    #[tokio::test]
    async fn test_ticks_run_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let (_tx, rx) = mpsc::channel(8);

        let summary = run(
            &mut controller,
            pipeline(3),
            Duration::from_millis(1),
            rx,
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await
        .unwrap();

        assert_eq!(summary.reason, StopReason::Shutdown);
        // Three scripted frames, then every tick is skipped
        assert!(summary.stats.ticks >= 3);
        assert_eq!(summary.stats.ticks - summary.stats.skipped, 3);
        assert!(controller.last_display().is_some());
    }

    #[tokio::test]
    async fn test_closed_channel_stops_loop() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir);
        let (tx, rx) = mpsc::channel::<Command>(1);
        drop(tx);

        let summary = run(
            &mut controller,
            pipeline(0),
            Duration::from_millis(5),
            rx,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(summary.reason, StopReason::CommandsClosed);
    }
}
