//! The per-OS hand-off crate for the current target.
//!
//! Linux and macOS get their own crates; anything else gets stubs that
//! report the capability as missing.

#[cfg(target_os = "linux")]
pub use safealert_linux::{
    init, location_help, open_uri, platform_name, player_command, PlatformError,
};

#[cfg(target_os = "macos")]
pub use safealert_mac::{
    init, location_help, open_uri, platform_name, player_command, PlatformError,
};

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub use unsupported::*;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod unsupported {
    use std::path::Path;
    use std::process::Command;

    /// Errors raised by the hand-off layer.
    #[derive(Debug, thiserror::Error)]
    pub enum PlatformError {
        /// Nothing on this platform can open URIs or play audio.
        #[error("not supported on this platform")]
        Unsupported,
    }

    /// Nothing to initialize.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn init() -> Result<(), PlatformError> {
        Ok(())
    }

    /// Get the platform name.
    #[must_use]
    pub fn platform_name() -> &'static str {
        "unsupported"
    }

    /// No platform-specific help.
    #[must_use]
    pub fn location_help() -> &'static str {
        "Set fixed coordinates under [location] in the safealert config."
    }

    /// Always fails.
    ///
    /// # Errors
    ///
    /// Always returns [`PlatformError::Unsupported`].
    pub fn open_uri(_uri: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// A command that cannot be spawned.
    #[must_use]
    pub fn player_command(clip: &Path) -> Command {
        let mut cmd = Command::new("safealert-no-audio-player");
        cmd.arg(clip);
        cmd
    }
}
