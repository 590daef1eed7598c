//! Playback controller
//!
//! Owns the process-wide playback state: the active target, the remaining
//! tracks of an in-progress sequence, and the last accepted trigger time.
//! Resolution and queue advancement report explicit outcomes instead of
//! raising, so the control loop decides what to log and keeps running.

use crate::debounce::{trigger_allowed, MIN_TIME_BETWEEN_SWIPES};
use crate::player::Player;
use crate::store::{MappingStore, PlaybackTarget};
use anyhow::Result;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Mutable playback state, single instance, mutated only from the control loop
#[derive(Debug, Default)]
pub struct PlaybackState {
    /// Target of the most recent accepted swipe
    pub active_target: Option<PlaybackTarget>,
    /// Not-yet-started tracks of the active sequence
    pub remaining_queue: VecDeque<String>,
    /// Time of the last accepted playback start
    pub last_trigger: Option<Instant>,
}

/// Outcome of a trigger or queue-advance attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Playback of this track was started
    Started(String),
    /// Nothing was started, and why
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No mapping stored for this card code
    Unmapped(String),
    /// A track is playing and the swipe came too soon after the last trigger
    Debounced,
    /// The sequence has no tracks left
    QueueEmpty,
}

/// Resolves card codes to playback and walks multi-track sequences
pub struct PlaybackController<P> {
    store: MappingStore,
    player: P,
    state: PlaybackState,
    min_interval: Duration,
}

impl<P: Player> PlaybackController<P> {
    pub fn new(store: MappingStore, player: P) -> Self {
        Self::with_min_interval(store, player, MIN_TIME_BETWEEN_SWIPES)
    }

    pub fn with_min_interval(store: MappingStore, player: P, min_interval: Duration) -> Self {
        Self {
            store,
            player,
            state: PlaybackState::default(),
            min_interval,
        }
    }

    /// Handle a completed swipe: look the code up and start playback.
    ///
    /// Debounce applies only while the player is active - a swipe into
    /// silence always plays, no matter how recent the previous trigger. A
    /// resting jukebox must always respond; the debounce exists to stop a
    /// lingering card from restarting a track that is already playing.
    pub async fn on_code_resolved(
        &mut self,
        code: &str,
        now: Instant,
    ) -> Result<TriggerOutcome> {
        let Some(target) = self.store.lookup(code).await else {
            return Ok(TriggerOutcome::Skipped(SkipReason::Unmapped(
                code.to_string(),
            )));
        };

        debug!("Card {} resolved to {:?}", code, target);

        if self.player.is_playing()
            && !trigger_allowed(now, self.state.last_trigger, self.min_interval)
        {
            return Ok(TriggerOutcome::Skipped(SkipReason::Debounced));
        }

        match target {
            PlaybackTarget::Single(path) => {
                self.state.active_target = Some(PlaybackTarget::Single(path.clone()));
                self.state.remaining_queue.clear();
                self.start_track(&path, now).await?;
                Ok(TriggerOutcome::Started(path))
            }
            PlaybackTarget::Sequence(paths) => {
                self.state.active_target = Some(PlaybackTarget::Sequence(paths.clone()));
                self.state.remaining_queue = paths.into();
                self.advance(now).await
            }
        }
    }

    /// Start the next queued track, if any.
    ///
    /// An empty queue leaves all state untouched: the sequence is finished
    /// and does not repeat.
    pub async fn advance(&mut self, now: Instant) -> Result<TriggerOutcome> {
        match self.state.remaining_queue.pop_front() {
            Some(path) => {
                self.start_track(&path, now).await?;
                Ok(TriggerOutcome::Started(path))
            }
            None => Ok(TriggerOutcome::Skipped(SkipReason::QueueEmpty)),
        }
    }

    /// Whether the player is mid-track right now.
    pub fn player_active(&mut self) -> bool {
        self.player.is_playing()
    }

    /// Whether the active sequence still has tracks waiting to start.
    pub fn has_pending_tracks(&self) -> bool {
        !self.state.remaining_queue.is_empty()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    // Exactly one play command per accepted trigger; superseded tracks are
    // never explicitly stopped.
    async fn start_track(&mut self, path: &str, now: Instant) -> Result<()> {
        self.player.set_target(path);
        self.player.play().await?;
        self.state.last_trigger = Some(now);
        Ok(())
    }
}
