//! Audio player backend
//!
//! The controller only needs a set-target/play/is-playing surface; the
//! default backend spawns VLC's command-line frontend per track and watches
//! the child process to know when the track ends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Environment variable overriding the player binary (default `cvlc`)
pub const PLAYER_ENV: &str = "JUKEBOX_PLAYER";

const DEFAULT_PLAYER_BIN: &str = "cvlc";

/// External audio player, driven from the control loop's single thread
#[async_trait]
pub trait Player: Send {
    /// Select the track to play on the next [`Player::play`] call.
    fn set_target(&mut self, path: &str);

    /// Start playback of the current target.
    async fn play(&mut self) -> Result<()>;

    /// Whether a track is currently playing.
    fn is_playing(&mut self) -> bool;
}

/// VLC subprocess player
///
/// Each play spawns `cvlc --play-and-exit <track>`; a new spawn supersedes
/// the previous track. The binary is overridable via `JUKEBOX_PLAYER` for
/// setups where VLC installs under another name.
pub struct VlcPlayer {
    binary: String,
    target: Option<String>,
    child: Option<Child>,
}

impl VlcPlayer {
    pub fn new() -> Self {
        let binary =
            std::env::var(PLAYER_ENV).unwrap_or_else(|_| DEFAULT_PLAYER_BIN.to_string());
        Self {
            binary,
            target: None,
            child: None,
        }
    }
}

impl Default for VlcPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Player for VlcPlayer {
    fn set_target(&mut self, path: &str) {
        self.target = Some(path.to_string());
    }

    async fn play(&mut self) -> Result<()> {
        let target = self
            .target
            .clone()
            .context("no playback target set before play")?;

        // kill_on_drop tears down the superseded track
        drop(self.child.take());

        debug!("Spawning {} for {}", self.binary, target);
        let child = Command::new(&self.binary)
            .arg("--play-and-exit")
            .arg("--quiet")
            .arg(&target)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start player '{}' for {}", self.binary, target))?;

        self.child = Some(child);
        Ok(())
    }

    fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}
