//! Linux-specific implementation for safealert
//!
//! Share URIs are handed to the desktop's registered handler via `xdg-open`,
//! and alert clips are played through the PulseAudio/PipeWire `paplay` client.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::debug;

/// Program that dispatches a URI to its registered handler.
pub const OPENER: &str = "xdg-open";

/// Program used to play audio clips.
pub const PLAYER: &str = "paplay";

/// Errors raised by the Linux hand-off layer.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// A helper program could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), PlatformError> {
    debug!("Linux hand-off uses {OPENER} and {PLAYER}");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Instructions for re-enabling location access after a denial.
#[must_use]
pub fn location_help() -> &'static str {
    r"To allow location access:

1. Make sure the location service (e.g. GeoClue) is running
2. Allow location access for your terminal in your desktop's privacy settings
3. Or set fixed coordinates under [location] in the safealert config"
}

/// Build the command that opens `uri` with the desktop's handler.
#[must_use]
pub fn open_command(uri: &str) -> Command {
    let mut cmd = Command::new(OPENER);
    cmd.arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Open `uri` with the desktop's handler without waiting for it.
///
/// # Errors
///
/// Returns an error if `xdg-open` cannot be spawned.
pub fn open_uri(uri: &str) -> Result<(), PlatformError> {
    debug!("Handing off {} to {OPENER}", uri.split(':').next().unwrap_or(""));
    spawn_reaped(open_command(uri), OPENER).map(|_| ())
}

/// Spawn `cmd` and wait on it from a background thread so the exited child
/// is reaped instead of lingering as a zombie.
fn spawn_reaped(
    mut cmd: Command,
    program: &'static str,
) -> Result<thread::JoinHandle<()>, PlatformError> {
    let mut child = cmd
        .spawn()
        .map_err(|source| PlatformError::Spawn { program, source })?;
    Ok(thread::spawn(move || {
        if let Err(e) = child.wait() {
            debug!("Waiting on {program} failed: {e}");
        }
    }))
}

/// Build the command that plays `clip` once.
#[must_use]
pub fn player_command(clip: &Path) -> Command {
    let mut cmd = Command::new(PLAYER);
    cmd.arg(clip)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "Linux");
    }

    #[test]
    fn test_location_help() {
        assert!(location_help().contains("location"));
    }

    #[test]
    fn test_open_command() {
        let cmd = open_command("mailto:?subject=hi");
        assert_eq!(cmd.get_program(), OPENER);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["mailto:?subject=hi"]);
    }

    #[test]
    fn test_spawned_child_is_reaped() {
        let reaper = spawn_reaped(Command::new("/bin/true"), "true").unwrap();
        assert!(reaper.join().is_ok());
    }

    #[test]
    fn test_spawn_reaped_missing_program() {
        let err = spawn_reaped(Command::new("/nonexistent/opener"), OPENER).unwrap_err();
        assert!(matches!(err, PlatformError::Spawn { program: OPENER, .. }));
    }

    #[test]
    fn test_player_command() {
        let cmd = player_command(Path::new("/tmp/siren.wav"));
        assert_eq!(cmd.get_program(), PLAYER);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["/tmp/siren.wav"]);
    }

    #[test]
    fn test_spawn_error_display() {
        let err = PlatformError::Spawn {
            program: OPENER,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("xdg-open"));
    }
}
