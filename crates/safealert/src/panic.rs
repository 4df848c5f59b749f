//! The panic sequence.
//!
//! One press runs straight through: status, location, message, share URI,
//! hand-off, siren, status. Location is the only step that waits. Every press
//! takes a ticket from a generation counter, and a sequence whose ticket is no
//! longer the newest when its location resolves gives up quietly so that only
//! the latest press shares anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{AudioPlayer, Clip};
use crate::config::Config;
use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::launcher::UriLauncher;
use crate::location::{get_location, Coordinate, LocationOptions, LocationProvider};
use crate::message::compose_message;
use crate::share::{Provider, ShareRegistry, ShareUri};
use crate::status::StatusLine;
use crate::storage::{ContactStore, StorageBackend};

/// Status shown while waiting for a position.
pub const LOCATING: &str = "Getting your location...";

/// What to share and with whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicRequest {
    /// Share channel.
    pub provider: Provider,
    /// Index into the contact list, or `None` to let the user pick.
    pub contact_index: Option<usize>,
}

impl PanicRequest {
    /// Share through `provider` without a preselected recipient.
    #[must_use]
    pub fn broadcast(provider: Provider) -> Self {
        Self {
            provider,
            contact_index: None,
        }
    }

    /// Share through `provider` to the contact at `index`.
    #[must_use]
    pub fn to_contact(provider: Provider, index: usize) -> Self {
        Self {
            provider,
            contact_index: Some(index),
        }
    }
}

/// Result of a completed sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PanicOutcome {
    /// Position the message was built from.
    pub coordinate: Coordinate,
    /// Full message text.
    pub message: String,
    /// Contact the share was addressed to, if any.
    pub contact: Option<Contact>,
    /// URI handed to the launcher.
    pub share: ShareUri,
}

/// Message and timing settings for the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PanicSettings {
    /// Added as "From: ..." when not blank.
    pub sender_label: String,
    /// Email subject.
    pub subject: String,
    /// Position request options.
    pub location: LocationOptions,
    /// How long the siren plays after a share.
    pub siren_window: Duration,
}

impl PanicSettings {
    /// Settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            sender_label: config.share.sender_label.clone(),
            subject: config.share.subject.clone(),
            location: config.location_options(),
            siren_window: config.siren_window(),
        }
    }
}

impl Default for PanicSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs panic sequences against shared collaborators.
pub struct PanicSequence<B> {
    contacts: Arc<ContactStore<B>>,
    location: Option<Arc<dyn LocationProvider>>,
    registry: ShareRegistry,
    launcher: Arc<dyn UriLauncher>,
    audio: Arc<dyn AudioPlayer>,
    status: StatusLine,
    settings: PanicSettings,
    generation: AtomicU64,
    siren_timer: Mutex<Option<JoinHandle<()>>>,
    /// Ticket of the run whose siren window is open, if any.
    siren_window: Arc<watch::Sender<Option<u64>>>,
}

impl<B> std::fmt::Debug for PanicSequence<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicSequence")
            .field("location", &self.location.as_ref().map(|p| p.name()))
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<B: StorageBackend> PanicSequence<B> {
    /// Create a sequence with the stock share strategies.
    #[must_use]
    pub fn new(
        contacts: Arc<ContactStore<B>>,
        location: Option<Arc<dyn LocationProvider>>,
        launcher: Arc<dyn UriLauncher>,
        audio: Arc<dyn AudioPlayer>,
        status: StatusLine,
        settings: PanicSettings,
    ) -> Self {
        Self {
            contacts,
            location,
            registry: ShareRegistry::default(),
            launcher,
            audio,
            status,
            settings,
            generation: AtomicU64::new(0),
            siren_timer: Mutex::new(None),
            siren_window: Arc::new(watch::channel(None).0),
        }
    }

    /// Replace the share strategies.
    #[must_use]
    pub fn with_registry(mut self, registry: ShareRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run one panic sequence.
    ///
    /// # Errors
    ///
    /// - [`Error::Superseded`] if a newer sequence started while this one
    ///   waited for a position. Nothing is shared and the siren is left alone.
    /// - Any location, contact, share or launch error. The status line shows
    ///   the error and the siren is stopped.
    pub async fn run(&self, request: PanicRequest) -> Result<PanicOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(ticket, provider = %request.provider, "Panic sequence started");
        self.status.info(LOCATING);

        let located = get_location(self.location.as_deref(), &self.settings.location).await;

        if !self.is_current(ticket) {
            info!(ticket, "Panic sequence superseded by a newer press");
            return Err(Error::Superseded);
        }

        match located.and_then(|coordinate| self.share(coordinate, request)) {
            Ok(outcome) => {
                self.sound_siren(ticket);
                self.status.success(format!(
                    "Emergency message ready via {}.",
                    request.provider
                ));
                info!(ticket, "Panic share handed off: {}", outcome.share.uri);
                Ok(outcome)
            }
            Err(e) => {
                self.silence_siren();
                self.status.error(e.user_message());
                warn!(ticket, "Panic sequence failed: {e}");
                Err(e)
            }
        }
    }

    /// Wait until no siren window is open.
    ///
    /// Safe to cancel: dropping the wait leaves the window and its timer
    /// untouched.
    pub async fn siren_finished(&self) {
        let mut window = self.siren_window.subscribe();
        let _ = window.wait_for(Option::is_none).await;
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    fn share(&self, coordinate: Coordinate, request: PanicRequest) -> Result<PanicOutcome> {
        let message = compose_message(coordinate, &self.settings.sender_label, &Local::now());

        let contact = match request.contact_index {
            Some(index) => Some(
                self.contacts
                    .get(index)
                    .ok_or(Error::UnknownContact(index))?,
            ),
            None => None,
        };

        let share = self.registry.compose(
            request.provider,
            &message,
            &self.settings.subject,
            contact.as_ref(),
        )?;
        self.launcher.open(&share)?;

        Ok(PanicOutcome {
            coordinate,
            message,
            contact,
            share,
        })
    }

    fn sound_siren(&self, ticket: u64) {
        if let Err(e) = self.audio.play(Clip::Siren, true) {
            warn!("Siren unavailable: {e}");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        self.siren_window.send_replace(Some(ticket));

        let audio = Arc::clone(&self.audio);
        let siren_window = Arc::clone(&self.siren_window);
        let window = self.settings.siren_window;
        let timer = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            // Only the run that opened the window may close it
            let closed = siren_window.send_if_modified(|open| {
                if *open == Some(ticket) {
                    *open = None;
                    true
                } else {
                    false
                }
            });
            if closed {
                audio.stop(Clip::Siren);
                debug!(ticket, "Siren window of {window:?} ended");
            }
        });
        if let Ok(mut slot) = self.siren_timer.lock() {
            if let Some(previous) = slot.replace(timer) {
                previous.abort();
            }
        }
    }

    fn silence_siren(&self) {
        if let Some(timer) = self.siren_timer.lock().ok().and_then(|mut t| t.take()) {
            timer.abort();
        }
        self.siren_window.send_replace(None);
        self.audio.stop(Clip::Siren);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::audio::SilentAudioPlayer;
    use crate::launcher::RecordingLauncher;
    use crate::location::{FixedLocationProvider, PositionError};
    use crate::share::OpenIn;
    use crate::status::StatusKind;
    use crate::storage::MemoryBackend;

    /// Answers after a fixed delay.
    struct SlowProvider {
        delay: Duration,
        coordinate: Coordinate,
    }

    #[async_trait]
    impl LocationProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn current_position(
            &self,
            _options: &LocationOptions,
        ) -> std::result::Result<Coordinate, PositionError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.coordinate)
        }
    }

    /// Never answers.
    struct SilentProvider;

    #[async_trait]
    impl LocationProvider for SilentProvider {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn current_position(
            &self,
            _options: &LocationOptions,
        ) -> std::result::Result<Coordinate, PositionError> {
            std::future::pending().await
        }
    }

    struct Harness {
        sequence: PanicSequence<MemoryBackend>,
        contacts: Arc<ContactStore<MemoryBackend>>,
        launcher: Arc<RecordingLauncher>,
        audio: Arc<SilentAudioPlayer>,
        status: StatusLine,
    }

    fn harness(location: Option<Arc<dyn LocationProvider>>) -> Harness {
        let contacts = Arc::new(ContactStore::new(MemoryBackend::new(), "trustedContacts"));
        let launcher = Arc::new(RecordingLauncher::new());
        let audio = Arc::new(SilentAudioPlayer::new());
        let status = StatusLine::new(Duration::from_millis(3_500));
        let sequence = PanicSequence::new(
            Arc::clone(&contacts),
            location,
            launcher.clone(),
            audio.clone(),
            status.clone(),
            PanicSettings::default(),
        );
        Harness {
            sequence,
            contacts,
            launcher,
            audio,
            status,
        }
    }

    fn fixed(lat: f64, lon: f64) -> Option<Arc<dyn LocationProvider>> {
        Some(Arc::new(FixedLocationProvider::new(
            Coordinate::new(lat, lon).unwrap(),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_sms() {
        let h = harness(fixed(37.0, -122.0));

        let outcome = h
            .sequence
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap();

        assert!(outcome.share.uri.starts_with("sms:?"));
        assert!(outcome.message.contains("query=37,-122"));
        assert_eq!(h.launcher.opened(), vec![outcome.share]);
        assert!(h.audio.is_playing(Clip::Siren));
        assert_eq!(h.status.current().unwrap().kind, StatusKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_siren_stops_after_window() {
        let h = harness(fixed(1.0, 2.0));
        h.sequence
            .run(PanicRequest::broadcast(Provider::Email))
            .await
            .unwrap();
        assert!(h.audio.is_playing(Clip::Siren));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(h.audio.is_playing(Clip::Siren));

        h.sequence.siren_finished().await;
        assert!(!h.audio.is_playing(Clip::Siren));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wait_does_not_cut_later_siren() {
        let h = harness(fixed(1.0, 2.0));
        h.sequence
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap();

        // Give up waiting on the first window early
        let waited =
            tokio::time::timeout(Duration::from_secs(1), h.sequence.siren_finished()).await;
        assert!(waited.is_err());

        tokio::time::sleep(Duration::from_secs(4)).await;
        h.sequence
            .run(PanicRequest::broadcast(Provider::Email))
            .await
            .unwrap();

        // First window would have ended at t=10s; the second runs to t=15s
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(h.audio.is_playing(Clip::Siren));

        h.sequence.siren_finished().await;
        assert!(!h.audio.is_playing(Clip::Siren));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_hand_off_stops_earlier_siren() {
        struct BrokenLauncher;

        impl UriLauncher for BrokenLauncher {
            fn open(&self, _share: &ShareUri) -> Result<()> {
                Err(Error::launch("no handler for sms:"))
            }
        }

        let h = harness(fixed(1.0, 2.0));
        h.sequence
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap();
        assert!(h.audio.is_playing(Clip::Siren));

        let broken = PanicSequence::new(
            Arc::clone(&h.contacts),
            fixed(1.0, 2.0),
            Arc::new(BrokenLauncher),
            h.audio.clone(),
            h.status.clone(),
            PanicSettings::default(),
        );
        let err = broken
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Launch(_)));
        assert!(!h.audio.is_playing(Clip::Siren));
        assert_eq!(
            h.status.current().unwrap().text,
            "Could not open the share app."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_email_to_contact() {
        let h = harness(fixed(1.0, 2.0));
        h.contacts
            .add(Contact::new("Jo", Some("555-1212"), Some("jo@example.com")).unwrap())
            .unwrap();

        let outcome = h
            .sequence
            .run(PanicRequest::to_contact(Provider::Email, 0))
            .await
            .unwrap();

        assert!(outcome.share.uri.starts_with("mailto:jo@example.com?subject="));
        assert_eq!(outcome.contact.unwrap().name, "Jo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_whatsapp_ignores_contact() {
        let h = harness(fixed(1.0, 2.0));
        h.contacts
            .add(Contact::new("Jo", Some("555-1212"), None).unwrap())
            .unwrap();

        let outcome = h
            .sequence
            .run(PanicRequest::to_contact(Provider::WhatsApp, 0))
            .await
            .unwrap();

        assert!(outcome
            .share
            .uri
            .starts_with("https://api.whatsapp.com/send?text="));
        assert!(!outcome.share.uri.contains("555"));
        assert_eq!(outcome.share.open_in, OpenIn::NewContext);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_siren() {
        let h = harness(Some(Arc::new(SilentProvider)));
        // Left over from an earlier alert
        h.audio.play(Clip::Siren, true).unwrap();

        let err = h
            .sequence
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::LocationUnavailable { ref reason } if reason == "timeout"));
        assert!(!h.audio.is_playing(Clip::Siren));
        assert!(h.launcher.opened().is_empty());
        assert_eq!(
            h.status.current().unwrap().text,
            "Unable to access your location. Please enable location services."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_capability() {
        let h = harness(None);

        let err = h
            .sequence
            .run(PanicRequest::broadcast(Provider::Sms))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityUnavailable));
        assert!(h.launcher.opened().is_empty());
        assert_eq!(h.status.current().unwrap().kind, StatusKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_contact_index() {
        let h = harness(fixed(1.0, 2.0));

        let err = h
            .sequence
            .run(PanicRequest::to_contact(Provider::Sms, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownContact(3)));
        assert!(h.launcher.opened().is_empty());
        assert!(!h.audio.is_playing(Clip::Siren));
        assert_eq!(
            h.status.current().unwrap().text,
            "No contact at position 3."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_strategy() {
        let h = harness(fixed(1.0, 2.0));
        let sequence = h.sequence.with_registry(ShareRegistry::empty());

        let err = sequence
            .run(PanicRequest::broadcast(Provider::Email))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoStrategy(_)));
        assert!(h.launcher.opened().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_press_supersedes_older() {
        let h = harness(Some(Arc::new(SlowProvider {
            delay: Duration::from_secs(2),
            coordinate: Coordinate::new(5.0, 6.0).unwrap(),
        })));

        let first = h.sequence.run(PanicRequest::broadcast(Provider::Sms));
        let second = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.sequence
                .run(PanicRequest::broadcast(Provider::Email))
                .await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(first, Err(Error::Superseded)));
        let second = second.unwrap();
        assert_eq!(second.share.provider, Provider::Email);

        // Only the newest press was handed off
        assert_eq!(h.launcher.opened(), vec![second.share]);
        assert!(h.audio.is_playing(Clip::Siren));
    }
}
