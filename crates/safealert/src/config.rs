//! Configuration management for safealert.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::{Coordinate, LocationOptions};
use crate::share::Provider;
use crate::shortcut::PanicShortcut;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "safealert";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "storage.db";

/// Storage key the contact list lives under.
pub const DEFAULT_CONTACTS_KEY: &str = "trustedContacts";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SAFEALERT_`, sections split on `__`)
/// 2. TOML config file at `~/.config/safealert/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Location acquisition configuration.
    pub location: LocationConfig,
    /// Audible alert configuration.
    pub alert: AlertConfig,
    /// Share message configuration.
    pub share: ShareConfig,
    /// Status line and keyboard configuration.
    pub ui: UiConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/safealert/storage.db`
    pub database_path: Option<PathBuf>,
    /// Key the contact list is stored under.
    pub contacts_key: String,
}

/// Location-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Ask the provider for its most accurate fix.
    pub high_accuracy: bool,
    /// How long to wait for a position, in milliseconds.
    pub timeout_ms: u64,
    /// Oldest cached position accepted, in milliseconds. 0 forces a fresh fix.
    pub maximum_age_ms: u64,
    /// Fixed latitude, used when no location command is configured.
    pub latitude: Option<f64>,
    /// Fixed longitude, used when no location command is configured.
    pub longitude: Option<f64>,
    /// External command that prints `lat,lon` on stdout.
    pub command: Option<String>,
}

/// Audible alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Play sounds at all. When off, alerts are silent.
    pub sound_enabled: bool,
    /// How long the siren plays after a successful panic share, in seconds.
    pub siren_seconds: u64,
    /// Siren clip. Defaults to `~/.local/share/safealert/sirenaudio.mp3`
    pub siren_clip: Option<PathBuf>,
    /// Ring tone clip. Defaults to `~/.local/share/safealert/call.mp3`
    pub ringtone_clip: Option<PathBuf>,
}

/// Share message configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Name added to the message as "From: ...". Empty to omit.
    pub sender_label: String,
    /// Email subject line.
    pub subject: String,
    /// Provider used when none is given on the command line.
    pub default_provider: Provider,
}

/// Status line and keyboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long a status message stays up if nothing replaces it, in milliseconds.
    pub status_clear_ms: u64,
    /// Key that triggers the panic action in the console.
    pub panic_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            contacts_key: DEFAULT_CONTACTS_KEY.to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 0,
            latitude: None,
            longitude: None,
            command: None,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            siren_seconds: 10,
            siren_clip: None,
            ringtone_clip: None,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            sender_label: String::new(),
            subject: "EMERGENCY - I need help".to_string(),
            default_provider: Provider::Sms,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_clear_ms: 3_500,
            panic_key: "p".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SAFEALERT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.contacts_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "contacts_key must not be empty".to_string(),
            });
        }

        if self.location.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if Coordinate::new(lat, lon).is_none() {
                    return Err(Error::ConfigValidation {
                        message: format!("fixed location ({lat}, {lon}) is out of range"),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::ConfigValidation {
                    message: "latitude and longitude must be set together".to_string(),
                });
            }
        }

        if self.alert.siren_seconds == 0 {
            return Err(Error::ConfigValidation {
                message: "siren_seconds must be greater than 0".to_string(),
            });
        }

        if self.ui.status_clear_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "status_clear_ms must be greater than 0".to_string(),
            });
        }

        if PanicShortcut::parse(&self.ui.panic_key).is_none() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "panic_key must be a single printable character, got '{}'",
                    self.ui.panic_key
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the siren clip path, resolving defaults if not set.
    #[must_use]
    pub fn siren_clip(&self) -> PathBuf {
        self.alert
            .siren_clip
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("sirenaudio.mp3"))
    }

    /// Get the ring tone clip path, resolving defaults if not set.
    #[must_use]
    pub fn ringtone_clip(&self) -> PathBuf {
        self.alert
            .ringtone_clip
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("call.mp3"))
    }

    /// Options handed to the location provider.
    #[must_use]
    pub fn location_options(&self) -> LocationOptions {
        LocationOptions {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.timeout_ms),
            maximum_age: Duration::from_millis(self.location.maximum_age_ms),
        }
    }

    /// The configured fixed position, if both halves are set and in range.
    #[must_use]
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => None,
        }
    }

    /// Get the siren window as a Duration.
    #[must_use]
    pub fn siren_window(&self) -> Duration {
        Duration::from_secs(self.alert.siren_seconds)
    }

    /// Get the status auto-clear delay as a Duration.
    #[must_use]
    pub fn status_clear_after(&self) -> Duration {
        Duration::from_millis(self.ui.status_clear_ms)
    }

    /// The panic shortcut, falling back to the default key.
    #[must_use]
    pub fn panic_shortcut(&self) -> PanicShortcut {
        PanicShortcut::parse(&self.ui.panic_key).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.contacts_key, "trustedContacts");
        assert!(config.location.high_accuracy);
        assert!(config.alert.sound_enabled);
        assert_eq!(config.share.default_provider, Provider::Sms);
    }

    #[test]
    fn test_default_location_config() {
        let location = LocationConfig::default();

        assert_eq!(location.timeout_ms, 10_000);
        assert_eq!(location.maximum_age_ms, 0);
        assert!(location.latitude.is_none());
        assert!(location.command.is_none());
    }

    #[test]
    fn test_default_ui_config() {
        let ui = UiConfig::default();
        assert_eq!(ui.status_clear_ms, 3_500);
        assert_eq!(ui.panic_key, "p");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_contacts_key() {
        let mut config = Config::default();
        config.storage.contacts_key = "   ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("contacts_key"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.location.timeout_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_ms"));
    }

    #[test]
    fn test_validate_half_fixed_location() {
        let mut config = Config::default();
        config.location.latitude = Some(10.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("together"));
    }

    #[test]
    fn test_validate_out_of_range_location() {
        let mut config = Config::default();
        config.location.latitude = Some(91.0);
        config.location.longitude = Some(0.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_validate_zero_siren_window() {
        let mut config = Config::default();
        config.alert.siren_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_panic_key() {
        let mut config = Config::default();
        config.ui.panic_key = "pp".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("panic_key"));
    }

    #[test]
    fn test_location_options() {
        let config = Config::default();
        let options = config.location_options();

        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.maximum_age, Duration::ZERO);
    }

    #[test]
    fn test_fixed_coordinate() {
        let mut config = Config::default();
        assert!(config.fixed_coordinate().is_none());

        config.location.latitude = Some(37.0);
        config.location.longitude = Some(-122.0);
        let coord = config.fixed_coordinate().unwrap();
        assert_eq!(coord.lat, 37.0);
        assert_eq!(coord.lon, -122.0);
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.siren_window(), Duration::from_secs(10));
        assert_eq!(config.status_clear_after(), Duration::from_millis(3_500));
    }

    #[test]
    fn test_clip_paths_default() {
        let config = Config::default();
        assert!(config.siren_clip().to_string_lossy().contains("sirenaudio.mp3"));
        assert!(config.ringtone_clip().to_string_lossy().contains("call.mp3"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("safealert"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[share]
sender_label = "Jo"
default_provider = "whatsapp"

[location]
latitude = 51.5
longitude = -0.12
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.share.sender_label, "Jo");
        assert_eq!(config.share.default_provider, Provider::WhatsApp);
        assert!(config.fixed_coordinate().is_some());
    }

    #[test]
    fn test_share_config_deserialize() {
        let json = r#"{"subject": "Help", "default_provider": "email"}"#;
        let share: ShareConfig = serde_json::from_str(json).unwrap();
        assert_eq!(share.subject, "Help");
        assert_eq!(share.default_provider, Provider::Email);
        assert!(share.sender_label.is_empty());
    }
}
