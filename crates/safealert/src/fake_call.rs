//! The fake incoming call.
//!
//! One button, two states. Pressing it while idle starts the ring tone on a
//! loop; pressing it again stops it. There is no timeout.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::audio::{AudioPlayer, Clip};

/// Label shown while idle.
pub const START_LABEL: &str = "Fake Call";

/// Label shown while ringing.
pub const STOP_LABEL: &str = "Stop Call";

/// Fake-call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    /// Not ringing.
    #[default]
    Idle,
    /// Ring tone playing.
    Ringing,
}

/// Toggles the ring tone.
pub struct FakeCall {
    audio: Arc<dyn AudioPlayer>,
    state: Mutex<CallState>,
}

impl std::fmt::Debug for FakeCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCall")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl FakeCall {
    /// Create an idle fake call that plays through `audio`.
    #[must_use]
    pub fn new(audio: Arc<dyn AudioPlayer>) -> Self {
        Self {
            audio,
            state: Mutex::new(CallState::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CallState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    /// Button label for the current state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.state() {
            CallState::Idle => START_LABEL,
            CallState::Ringing => STOP_LABEL,
        }
    }

    /// Flip between idle and ringing, returning the new state.
    ///
    /// The state flips even if the ring tone cannot be played; the failure is
    /// logged.
    pub fn press(&self) -> CallState {
        let Ok(mut state) = self.state.lock() else {
            warn!("Fake call state lock poisoned");
            return CallState::Idle;
        };
        *state = match *state {
            CallState::Idle => {
                if let Err(e) = self.audio.play(Clip::Ringtone, true) {
                    warn!("Ring tone unavailable: {e}");
                }
                info!("Fake call ringing");
                CallState::Ringing
            }
            CallState::Ringing => {
                self.audio.stop(Clip::Ringtone);
                info!("Fake call stopped");
                CallState::Idle
            }
        };
        *state
    }
}
