//! Swipe debouncing
//!
//! A card left resting in the reader's field re-registers every second or so,
//! and users double-swipe by accident. The debouncer gates how soon a new
//! trigger may follow the previous accepted one. It only guards *starting new
//! audio* - mapping lookups are never throttled.

use std::time::{Duration, Instant};

/// Minimum interval between accepted triggers while the player is active
pub const MIN_TIME_BETWEEN_SWIPES: Duration = Duration::from_secs(10);

/// Whether a trigger at `now` is far enough past the last accepted trigger.
///
/// The boundary is strict: an interval exactly equal to `min_interval` is
/// still rejected. With no prior trigger the answer is always yes.
pub fn trigger_allowed(now: Instant, last: Option<Instant>, min_interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now.duration_since(last) > min_interval,
    }
}
