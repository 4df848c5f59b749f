//! The four feature buttons.
//!
//! Each feature is a one-shot reaction with no state of its own: play a
//! sound, report a position, or show a canned notice.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::{AudioPlayer, Clip};
use crate::error::{Error, Result};
use crate::location::{get_location, LocationOptions, LocationProvider};
use crate::status::StatusLine;

/// Shown after the emergency button.
pub const EMERGENCY_SENT: &str = "Emergency Alert Sent! Your trusted contacts have been notified.";

/// Shown for the fake-call feature card.
pub const FAKE_CALL_NOTICE: &str =
    "Simulating a fake call... (This feature can be enhanced to ring your phone).";

/// Shown for the safe-zones feature card.
pub const SAFE_ZONES_NOTICE: &str =
    "Locating nearby safe zones... (This feature can be integrated with Google Maps).";

/// A feature card, identified by its heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Sound the siren and report the alert as sent.
    EmergencyAlert,
    /// Report the current position.
    LiveLocation,
    /// Announce the fake call.
    FakeCall,
    /// Announce the safe-zone search.
    SafeZones,
}

impl Feature {
    /// Every feature, in page order.
    pub const ALL: [Feature; 4] = [
        Feature::EmergencyAlert,
        Feature::LiveLocation,
        Feature::FakeCall,
        Feature::SafeZones,
    ];

    /// Heading text of the feature card.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::EmergencyAlert => "Emergency Alert Button",
            Self::LiveLocation => "Live Location Sharing",
            Self::FakeCall => "Fake Call Feature",
            Self::SafeZones => "Nearby Safe Zones",
        }
    }

    /// Look a feature up by its exact heading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFeature`] for any other text.
    pub fn from_label(label: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.label() == label)
            .ok_or_else(|| Error::UnknownFeature(label.to_string()))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
    }
}

/// Runs feature actions and reports them on the status line.
pub struct AlertDispatcher {
    audio: Arc<dyn AudioPlayer>,
    location: Option<Arc<dyn LocationProvider>>,
    options: LocationOptions,
    status: StatusLine,
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("location", &self.location.as_ref().map(|p| p.name()))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AlertDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        audio: Arc<dyn AudioPlayer>,
        location: Option<Arc<dyn LocationProvider>>,
        options: LocationOptions,
        status: StatusLine,
    ) -> Self {
        Self {
            audio,
            location,
            options,
            status,
        }
    }

    /// Run `feature` and return the message it shows.
    ///
    /// # Errors
    ///
    /// Only [`Feature::LiveLocation`] can fail, with
    /// [`Error::CapabilityUnavailable`] or [`Error::LocationUnavailable`]. The
    /// matching message is put on the status line before returning.
    pub async fn dispatch(&self, feature: Feature) -> Result<String> {
        debug!("Dispatching {feature}");
        let text = match feature {
            Feature::EmergencyAlert => {
                if let Err(e) = self.audio.play(Clip::Siren, false) {
                    warn!("Siren unavailable: {e}");
                }
                EMERGENCY_SENT.to_string()
            }
            Feature::LiveLocation => {
                match get_location(self.location.as_deref(), &self.options).await {
                    Ok(c) => format!(
                        "Live Location Shared! Latitude: {}, Longitude: {}",
                        c.lat, c.lon
                    ),
                    Err(e) => {
                        self.status.error(e.user_message());
                        return Err(e);
                    }
                }
            }
            Feature::FakeCall => FAKE_CALL_NOTICE.to_string(),
            Feature::SafeZones => SAFE_ZONES_NOTICE.to_string(),
        };
        self.status.success(text.clone());
        Ok(text)
    }

    /// Run the feature whose card heading is `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFeature`] for an unrecognised heading, otherwise
    /// as [`AlertDispatcher::dispatch`].
    pub async fn dispatch_label(&self, label: &str) -> Result<String> {
        let feature = Feature::from_label(label)?;
        self.dispatch(feature).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::SilentAudioPlayer;
    use crate::location::{Coordinate, FixedLocationProvider, PositionError};
    use crate::status::StatusKind;

    struct DeniedProvider;

    #[async_trait::async_trait]
    impl LocationProvider for DeniedProvider {
        fn name(&self) -> &'static str {
            "denied"
        }

        async fn current_position(
            &self,
            _options: &LocationOptions,
        ) -> std::result::Result<Coordinate, PositionError> {
            Err(PositionError::PermissionDenied)
        }
    }

    fn dispatcher(
        location: Option<Arc<dyn LocationProvider>>,
    ) -> (AlertDispatcher, Arc<SilentAudioPlayer>, StatusLine) {
        let audio = Arc::new(SilentAudioPlayer::new());
        let status = StatusLine::new(Duration::from_millis(3_500));
        let dispatcher = AlertDispatcher::new(
            audio.clone(),
            location,
            LocationOptions::default(),
            status.clone(),
        );
        (dispatcher, audio, status)
    }

    #[test]
    fn test_from_label() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_label(feature.label()).unwrap(), feature);
        }
        assert_eq!(
            "Nearby Safe Zones".parse::<Feature>().unwrap(),
            Feature::SafeZones
        );
    }

    #[test]
    fn test_unknown_label() {
        let err = Feature::from_label("Teleport").unwrap_err();
        assert!(matches!(err, Error::UnknownFeature(ref l) if l == "Teleport"));

        // Headings match exactly
        assert!(Feature::from_label("nearby safe zones").is_err());
    }

    #[tokio::test]
    async fn test_emergency_plays_siren() {
        let (dispatcher, audio, status) = dispatcher(None);

        let text = dispatcher.dispatch(Feature::EmergencyAlert).await.unwrap();

        assert_eq!(text, EMERGENCY_SENT);
        assert!(audio.is_playing(Clip::Siren));
        assert_eq!(status.current().unwrap().kind, StatusKind::Success);
    }

    #[tokio::test]
    async fn test_live_location_reports_coordinates() {
        let provider: Arc<dyn LocationProvider> =
            Arc::new(FixedLocationProvider::new(Coordinate::new(12.5, -3.0).unwrap()));
        let (dispatcher, _, _) = dispatcher(Some(provider));

        let text = dispatcher.dispatch(Feature::LiveLocation).await.unwrap();
        assert_eq!(text, "Live Location Shared! Latitude: 12.5, Longitude: -3");
    }

    #[tokio::test]
    async fn test_live_location_without_capability() {
        let (dispatcher, _, status) = dispatcher(None);

        let err = dispatcher.dispatch(Feature::LiveLocation).await.unwrap_err();

        assert!(matches!(err, Error::CapabilityUnavailable));
        assert_eq!(
            status.current().unwrap().text,
            "Geolocation is not supported on this device."
        );
    }

    #[tokio::test]
    async fn test_live_location_denied() {
        let (dispatcher, _, status) = dispatcher(Some(Arc::new(DeniedProvider)));

        let err = dispatcher.dispatch(Feature::LiveLocation).await.unwrap_err();

        assert!(matches!(err, Error::LocationUnavailable { .. }));
        let current = status.current().unwrap();
        assert_eq!(current.kind, StatusKind::Error);
        assert_eq!(
            current.text,
            "Unable to access your location. Please enable location services."
        );
    }

    #[tokio::test]
    async fn test_canned_notices() {
        let (dispatcher, audio, _) = dispatcher(None);

        assert_eq!(
            dispatcher.dispatch_label("Fake Call Feature").await.unwrap(),
            FAKE_CALL_NOTICE
        );
        assert_eq!(
            dispatcher.dispatch_label("Nearby Safe Zones").await.unwrap(),
            SAFE_ZONES_NOTICE
        );
        assert!(!audio.is_playing(Clip::Siren));
        assert!(!audio.is_playing(Clip::Ringtone));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_label() {
        let (dispatcher, _, status) = dispatcher(None);
        assert!(dispatcher.dispatch_label("Panic Room").await.is_err());
        assert!(status.current().is_none());
    }
}
