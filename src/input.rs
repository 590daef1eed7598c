//! Card reader input source
//!
//! The RFID reader registers as a keyboard-like evdev device and emits one
//! burst of key events per swipe. Reads happen on a background task so the
//! control loop can drain pending events without ever blocking.

use anyhow::{bail, Context, Result};
use evdev::{Device, InputEventKind};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info};

/// Key transition reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// A single raw key event from the swipe reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// evdev-style key name, e.g. "KEY_1" or "KEY_ENTER"
    pub key_name: String,
    pub phase: KeyPhase,
}

impl RawKeyEvent {
    pub fn new(key_name: impl Into<String>, phase: KeyPhase) -> Self {
        Self {
            key_name: key_name.into(),
            phase,
        }
    }
}

/// Source of raw key events, polled once per control-loop tick
///
/// An empty result is normal ("nothing this tick"), never an error.
pub trait InputSource {
    /// Return all events that arrived since the previous poll, in order.
    fn poll_events(&mut self) -> Result<Vec<RawKeyEvent>>;
}

/// evdev-backed input source
///
/// A background task reads the device's event stream and forwards key
/// events over a channel; [`InputSource::poll_events`] drains that channel.
/// Key repeats (evdev value 2) are dropped here, the decoder only ever
/// sees Down/Up transitions.
pub struct EvdevInput {
    rx: mpsc::UnboundedReceiver<RawKeyEvent>,
    _reader: tokio::task::JoinHandle<()>,
}

impl EvdevInput {
    /// Open the reader device and start the background reader task.
    ///
    /// Fails if the device node cannot be opened (missing device, missing
    /// permissions on /dev/input) - callers treat this as fatal at startup.
    pub fn open(path: &Path) -> Result<Self> {
        let device = Device::open(path)
            .with_context(|| format!("failed to open input device {}", path.display()))?;

        info!(
            "Reading swipes from {} ({})",
            path.display(),
            device.name().unwrap_or("unknown device")
        );

        let mut stream = device
            .into_event_stream()
            .with_context(|| format!("failed to create event stream for {}", path.display()))?;

        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(async move {
            loop {
                match stream.next_event().await {
                    Ok(event) => {
                        let InputEventKind::Key(key) = event.kind() else {
                            continue;
                        };
                        let phase = match event.value() {
                            1 => KeyPhase::Down,
                            0 => KeyPhase::Up,
                            _ => continue, // key repeat
                        };
                        let raw = RawKeyEvent::new(format!("{key:?}"), phase);
                        debug!("Reader event: {:?}", raw);
                        if tx.send(raw).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Card reader read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            rx,
            _reader: reader,
        })
    }
}

impl InputSource for EvdevInput {
    fn poll_events(&mut self) -> Result<Vec<RawKeyEvent>> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return Ok(events),
                Err(TryRecvError::Disconnected) => {
                    // Buffered events drain before try_recv reports the
                    // reader task gone, so nothing is lost here.
                    if events.is_empty() {
                        bail!("card reader disconnected");
                    }
                    return Ok(events);
                }
            }
        }
    }
}
