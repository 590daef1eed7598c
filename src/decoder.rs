//! Swipe decoder
//!
//! Reconstructs a card code from the reader's keystroke burst. Each swipe is
//! bounded by two sentinel keystrokes: a KEY_0 press opens the capture and a
//! KEY_ENTER release closes it. Everything in between is accumulated and
//! concatenated (with the "KEY_" prefix stripped) into the card code, so an
//! arbitrary-length code is recovered without knowing its length in advance.

use crate::input::{KeyPhase, RawKeyEvent};

/// Key whose Down press opens a swipe capture
pub const START_KEY: &str = "KEY_0";

/// Key whose Up release closes a swipe capture
pub const END_KEY: &str = "KEY_ENTER";

/// Result of feeding one event to the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwipeProgress {
    /// No swipe in progress; the event was ignored
    Idle,
    /// A swipe capture is open and still accumulating
    InProgress,
    /// The end sentinel arrived; the finished card code
    Completed(String),
}

enum DecoderState {
    Idle,
    Swiping(Vec<String>),
}

/// Per-reader swipe state machine
///
/// Events outside an active capture are silently discarded - spurious key
/// noise between swipes is expected. A start sentinel arriving mid-capture
/// resets to a fresh capture (the burst it interrupted was incomplete and
/// can never terminate on its own).
pub struct SwipeDecoder {
    state: DecoderState,
}

impl SwipeDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
        }
    }

    /// Advance the state machine by one raw key event.
    pub fn feed(&mut self, event: &RawKeyEvent) -> SwipeProgress {
        match &mut self.state {
            DecoderState::Idle => {
                if event.key_name == START_KEY && event.phase == KeyPhase::Down {
                    self.state = DecoderState::Swiping(Vec::new());
                    SwipeProgress::InProgress
                } else {
                    SwipeProgress::Idle
                }
            }
            DecoderState::Swiping(acc) => {
                if event.key_name == END_KEY && event.phase == KeyPhase::Up {
                    let code = acc.iter().map(|name| key_suffix(name)).collect();
                    self.state = DecoderState::Idle;
                    SwipeProgress::Completed(code)
                } else if event.key_name == START_KEY && event.phase == KeyPhase::Down {
                    acc.clear();
                    SwipeProgress::InProgress
                } else if event.key_name == START_KEY || event.key_name == END_KEY {
                    // Sentinel key names never contribute to the code
                    SwipeProgress::InProgress
                } else {
                    acc.push(event.key_name.clone());
                    SwipeProgress::InProgress
                }
            }
        }
    }

    /// Discard any half-captured swipe and return to idle.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
    }
}

impl Default for SwipeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn key_suffix(name: &str) -> &str {
    name.strip_prefix("KEY_").unwrap_or(name)
}
