//! Control loop
//!
//! One cooperative polling loop drives the whole jukebox: each tick drains
//! pending reader events into the swipe decoder, resolves completed codes
//! through the playback controller, then advances the sequence queue if the
//! player has gone quiet. Enrollment mode reuses the same decode path as a
//! one-shot capture.

use crate::decoder::{SwipeDecoder, SwipeProgress};
use crate::input::InputSource;
use crate::playback::{PlaybackController, SkipReason, TriggerOutcome};
use crate::player::Player;
use crate::store::MappingStore;
use anyhow::{bail, Context, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Polling cadence of the control loop
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// The perpetual swipe-and-play loop
pub struct Jukebox<I, P> {
    input: I,
    decoder: SwipeDecoder,
    controller: PlaybackController<P>,
}

impl<I: InputSource, P: Player> Jukebox<I, P> {
    pub fn new(input: I, controller: PlaybackController<P>) -> Self {
        Self {
            input,
            decoder: SwipeDecoder::new(),
            controller,
        }
    }

    /// Run until the shutdown future resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await?;
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping jukebox loop");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One pass: drain input, resolve completed swipes, advance the queue.
    async fn tick(&mut self) -> Result<()> {
        for event in self.input.poll_events()? {
            let SwipeProgress::Completed(code) = self.decoder.feed(&event) else {
                continue;
            };

            match self.controller.on_code_resolved(&code, Instant::now()).await {
                Ok(outcome) => log_outcome(&code, &outcome),
                Err(e) => {
                    // One bad trigger must not take down the loop; drop any
                    // half-captured state so the next swipe starts clean.
                    error!("Failed trigger action for card {}: {:#}", code, e);
                    self.decoder.reset();
                }
            }
        }

        if !self.controller.player_active() && self.controller.has_pending_tracks() {
            match self.controller.advance(Instant::now()).await {
                Ok(TriggerOutcome::Started(path)) => info!("▶️  Playing next in queue: {}", path),
                Ok(TriggerOutcome::Skipped(_)) => {}
                Err(e) => error!("Failed to advance playback queue: {:#}", e),
            }
        }

        Ok(())
    }
}

fn log_outcome(code: &str, outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Started(path) => info!("▶️  Card {} -> playing {}", code, path),
        TriggerOutcome::Skipped(SkipReason::Unmapped(_)) => {
            warn!("Card {} has no mapping, ignoring swipe", code);
        }
        TriggerOutcome::Skipped(SkipReason::Debounced) => {
            warn!("Card {} swiped too quickly after the last trigger, ignoring", code);
        }
        TriggerOutcome::Skipped(SkipReason::QueueEmpty) => {}
    }
}

/// One-shot enrollment: bind the next swiped card to `track_path`.
///
/// Polls on the same cadence as the run loop, but the first completed swipe
/// is written to the store and ends the capture. An upsert failure aborts
/// enrollment with an error; ctrl-c before any swipe also errors out.
pub async fn enroll<I: InputSource>(
    mut input: I,
    store: &MappingStore,
    track_path: &str,
    shutdown: impl Future<Output = ()>,
) -> Result<String> {
    let mut decoder = SwipeDecoder::new();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    tokio::pin!(shutdown);

    info!("Swipe a card to bind it to {}", track_path);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in input.poll_events()? {
                    let SwipeProgress::Completed(code) = decoder.feed(&event) else {
                        continue;
                    };

                    store
                        .upsert(&code, track_path)
                        .await
                        .context("failed to add new track to the jukebox store")?;

                    info!(
                        "{} added to jukebox store {} under card {}",
                        track_path,
                        store.path().display(),
                        code
                    );
                    return Ok(code);
                }
            }
            _ = &mut shutdown => {
                bail!("enrollment interrupted before a card was swiped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{END_KEY, START_KEY};
    use crate::input::{KeyPhase, RawKeyEvent};
    use crate::playback::tests::{seeded_store, FakePlayer};
    use crate::store::PlaybackTarget;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Replays pre-scripted event batches, one batch per poll.
    struct ScriptedInput {
        batches: VecDeque<Vec<RawKeyEvent>>,
    }

    impl ScriptedInput {
        fn new(batches: Vec<Vec<RawKeyEvent>>) -> Self {
            Self {
                batches: batches.into(),
            }
        }
    }

    impl InputSource for ScriptedInput {
        fn poll_events(&mut self) -> Result<Vec<RawKeyEvent>> {
            Ok(self.batches.pop_front().unwrap_or_default())
        }
    }

    fn swipe_batch(digits: &[&str]) -> Vec<RawKeyEvent> {
        let mut events = vec![RawKeyEvent::new(START_KEY, KeyPhase::Down)];
        for d in digits {
            events.push(RawKeyEvent::new(*d, KeyPhase::Down));
        }
        events.push(RawKeyEvent::new(END_KEY, KeyPhase::Up));
        events
    }

    #[tokio::test]
    async fn swipe_then_queue_advance_across_ticks() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, r#"{"12": ["/a.mp3", "/b.mp3", "/c.mp3"]}"#);
        let player = FakePlayer::default();
        let controller = PlaybackController::new(store, player.clone());

        let input = ScriptedInput::new(vec![swipe_batch(&["KEY_1", "KEY_2"])]);
        let mut jukebox = Jukebox::new(input, controller);

        // Tick 1: swipe resolves, first track starts
        jukebox.tick().await.unwrap();
        assert_eq!(player.inner.lock().unwrap().played, vec!["/a.mp3"]);

        // Player still busy: nothing advances
        jukebox.tick().await.unwrap();
        assert_eq!(player.inner.lock().unwrap().played, vec!["/a.mp3"]);

        // Track ends -> next tick starts the next one, twice over
        for expected in [vec!["/a.mp3", "/b.mp3"], vec!["/a.mp3", "/b.mp3", "/c.mp3"]] {
            player.inner.lock().unwrap().playing = false;
            jukebox.tick().await.unwrap();
            assert_eq!(player.inner.lock().unwrap().played, expected);
        }

        // Queue drained: a further quiet tick changes nothing
        player.inner.lock().unwrap().playing = false;
        jukebox.tick().await.unwrap();
        assert_eq!(
            player.inner.lock().unwrap().played,
            vec!["/a.mp3", "/b.mp3", "/c.mp3"]
        );
    }

    #[tokio::test]
    async fn unmapped_swipe_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, r#"{"12": "/a.mp3"}"#);
        let player = FakePlayer::default();
        let controller = PlaybackController::new(store, player.clone());

        let input = ScriptedInput::new(vec![swipe_batch(&["KEY_9", "KEY_9"])]);
        let mut jukebox = Jukebox::new(input, controller);

        jukebox.tick().await.unwrap();
        assert!(player.inner.lock().unwrap().played.is_empty());
        assert!(jukebox.controller.state().last_trigger.is_none());
    }

    #[tokio::test]
    async fn failed_trigger_resets_decoder_and_loop_survives() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, r#"{"1": "/a.mp3"}"#);
        let player = FakePlayer::default();
        let controller = PlaybackController::new(store, player.clone());

        player.inner.lock().unwrap().fail_next_play = true;

        let input = ScriptedInput::new(vec![
            swipe_batch(&["KEY_1"]),
            swipe_batch(&["KEY_1"]),
        ]);
        let mut jukebox = Jukebox::new(input, controller);

        // First swipe fails inside the trigger action, tick still returns Ok
        jukebox.tick().await.unwrap();
        assert!(player.inner.lock().unwrap().played.is_empty());

        // Next swipe processes cleanly
        jukebox.tick().await.unwrap();
        assert_eq!(player.inner.lock().unwrap().played, vec!["/a.mp3"]);
    }

    #[tokio::test]
    async fn enroll_binds_first_swipe_and_returns() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, "{}");

        let input = ScriptedInput::new(vec![Vec::new(), swipe_batch(&["KEY_4", "KEY_2"])]);

        let code = enroll(input, &store, "/music/new.mp3", std::future::pending())
            .await
            .unwrap();

        assert_eq!(code, "42");
        assert_eq!(
            store.lookup("42").await,
            Some(PlaybackTarget::Single("/music/new.mp3".to_string()))
        );
    }

    #[tokio::test]
    async fn enroll_interrupted_by_shutdown_errors_out() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, "{}");

        let input = ScriptedInput::new(Vec::new());

        let result = enroll(input, &store, "/music/new.mp3", std::future::ready(())).await;
        assert!(result.is_err());
    }
}
