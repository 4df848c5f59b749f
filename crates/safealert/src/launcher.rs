//! Handing share URIs to whatever app is registered for them.
//!
//! Launching is fire-and-forget: success means the handler was started, not
//! that a message went anywhere.

use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::platform;
use crate::share::{OpenIn, ShareUri};

/// Opens share URIs.
pub trait UriLauncher: Send + Sync {
    /// Hand `share` to its handler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the handler could not be started.
    fn open(&self, share: &ShareUri) -> Result<()>;
}

/// Uses the desktop's URI handler (`xdg-open` / `open`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl UriLauncher for SystemLauncher {
    fn open(&self, share: &ShareUri) -> Result<()> {
        let context = match share.open_in {
            OpenIn::NewContext => "new window",
            OpenIn::CurrentContext => "default handler",
        };
        info!("Opening {} share in {context}", share.provider);
        platform::open_uri(&share.uri).map_err(|e| Error::launch(e.to_string()))
    }
}

/// Prints the URI instead of opening it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintLauncher;

impl UriLauncher for PrintLauncher {
    fn open(&self, share: &ShareUri) -> Result<()> {
        debug!("Dry run, not opening {} share", share.provider);
        println!("{}", share.uri);
        Ok(())
    }
}

/// Keeps every URI it is asked to open. Useful in tests and previews.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<ShareUri>>,
}

impl RecordingLauncher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything opened so far, oldest first.
    #[must_use]
    pub fn opened(&self) -> Vec<ShareUri> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl UriLauncher for RecordingLauncher {
    fn open(&self, share: &ShareUri) -> Result<()> {
        self.opened
            .lock()
            .map_err(|_| Error::internal("launcher record lock poisoned"))?
            .push(share.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{compose_share_target, Provider};

    #[test]
    fn test_recording_launcher_keeps_order() {
        let launcher = RecordingLauncher::new();
        let sms = compose_share_target(Provider::Sms, "a", "", None);
        let mail = compose_share_target(Provider::Email, "b", "s", None);

        launcher.open(&sms).unwrap();
        launcher.open(&mail).unwrap();

        assert_eq!(launcher.opened(), vec![sms, mail]);
    }

    #[test]
    fn test_print_launcher_succeeds() {
        let share = compose_share_target(Provider::WhatsApp, "a", "", None);
        assert!(PrintLauncher.open(&share).is_ok());
    }
}
