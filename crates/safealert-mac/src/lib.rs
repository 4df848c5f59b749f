//! macOS-specific implementation for safealert.
//!
//! This crate hands share URIs to Launch Services through `open` and plays
//! alert clips with the bundled `afplay` tool.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, info};

/// Program that dispatches a URI to its registered handler.
pub const OPENER: &str = "open";

/// Program used to play audio clips.
pub const PLAYER: &str = "afplay";

/// Errors raised by the macOS hand-off layer.
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

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), PlatformError> {
    info!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Instructions for re-enabling location access after a denial.
#[must_use]
pub fn location_help() -> &'static str {
    r"To allow location access:

1. Open System Settings
2. Go to Privacy & Security > Location Services
3. Turn Location Services on and enable it for your terminal or location helper"
}

/// Build the command that opens `uri` with its registered handler.
#[must_use]
pub fn open_command(uri: &str) -> Command {
    let mut cmd = Command::new(OPENER);
    cmd.arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Open `uri` with its registered handler without waiting for it.
///
/// # Errors
///
/// Returns an error if `open` cannot be spawned.
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
