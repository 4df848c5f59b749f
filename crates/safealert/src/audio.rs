//! Audible alerts.
//!
//! Two independent clips, the siren and the fake-call ring tone, can play at
//! the same time. [`SystemAudioPlayer`] runs the platform's command-line
//! player once per repetition and kills it on stop.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform;

/// A sound the app can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    /// The emergency siren.
    Siren,
    /// The incoming-call ring tone.
    Ringtone,
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Siren => write!(f, "siren"),
            Self::Ringtone => write!(f, "ringtone"),
        }
    }
}

/// Plays and stops clips.
pub trait AudioPlayer: Send + Sync {
    /// Start `clip`, restarting it if it is already playing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if playback cannot start.
    fn play(&self, clip: Clip, looping: bool) -> Result<()>;

    /// Stop `clip`. Stopping a clip that is not playing does nothing.
    fn stop(&self, clip: Clip);

    /// Whether `clip` is currently playing.
    fn is_playing(&self, clip: Clip) -> bool;
}

/// Plays clips through the platform's audio command.
#[derive(Debug)]
pub struct SystemAudioPlayer {
    clips: HashMap<Clip, PathBuf>,
    playing: Mutex<HashMap<Clip, JoinHandle<()>>>,
}

impl SystemAudioPlayer {
    /// Create a player with explicit clip files.
    #[must_use]
    pub fn new(siren: PathBuf, ringtone: PathBuf) -> Self {
        Self {
            clips: HashMap::from([(Clip::Siren, siren), (Clip::Ringtone, ringtone)]),
            playing: Mutex::new(HashMap::new()),
        }
    }

    /// Create a player using the configured clip files.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.siren_clip(), config.ringtone_clip())
    }
}

impl AudioPlayer for SystemAudioPlayer {
    fn play(&self, clip: Clip, looping: bool) -> Result<()> {
        let path = self
            .clips
            .get(&clip)
            .cloned()
            .ok_or_else(|| Error::audio(format!("no file configured for {clip}")))?;
        if !path.exists() {
            return Err(Error::audio(format!(
                "{clip} clip not found at {}",
                path.display()
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::audio(format!("cannot play {clip} outside a runtime: {e}")))?;

        self.stop(clip);

        let task = runtime.spawn(async move {
            loop {
                let mut command = tokio::process::Command::from(platform::player_command(&path));
                let mut child = match command.kill_on_drop(true).spawn() {
                    Ok(child) => child,
                    Err(e) => {
                        warn!("Could not start audio player for {clip}: {e}");
                        return;
                    }
                };
                match child.wait().await {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        warn!("Audio player for {clip} exited with {status}");
                        return;
                    }
                    Err(e) => {
                        warn!("Audio player for {clip} failed: {e}");
                        return;
                    }
                }
                if !looping {
                    return;
                }
            }
        });

        info!("Playing {clip}{}", if looping { " (looping)" } else { "" });
        if let Ok(mut playing) = self.playing.lock() {
            playing.insert(clip, task);
        }
        Ok(())
    }

    fn stop(&self, clip: Clip) {
        let handle = self
            .playing
            .lock()
            .ok()
            .and_then(|mut playing| playing.remove(&clip));
        if let Some(handle) = handle {
            // Dropping the task drops the child, which kills the player
            handle.abort();
            debug!("Stopped {clip}");
        }
    }

    fn is_playing(&self, clip: Clip) -> bool {
        self.playing
            .lock()
            .map(|playing| playing.get(&clip).is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

/// Tracks play/stop without making a sound.
#[derive(Debug, Default)]
pub struct SilentAudioPlayer {
    playing: Mutex<HashSet<Clip>>,
}

impl SilentAudioPlayer {
    /// Create a silent player.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioPlayer for SilentAudioPlayer {
    fn play(&self, clip: Clip, _looping: bool) -> Result<()> {
        debug!("Sound disabled, not playing {clip}");
        self.playing
            .lock()
            .map_err(|_| Error::internal("audio state lock poisoned"))?
            .insert(clip);
        Ok(())
    }

    fn stop(&self, clip: Clip) {
        if let Ok(mut playing) = self.playing.lock() {
            playing.remove(&clip);
        }
    }

    fn is_playing(&self, clip: Clip) -> bool {
        self.playing
            .lock()
            .map(|playing| playing.contains(&clip))
            .unwrap_or(false)
    }
}
