//! Location acquisition.
//!
//! A [`LocationProvider`] stands in for the device's location service. The
//! caller asks once through [`get_location`], which bounds the request by the
//! configured timeout and folds every failure into the two user-facing kinds:
//! no capability at all, or a capability that could not produce a position.

use std::fmt;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// How a position should be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    /// Ask for the most accurate fix the provider can give.
    pub high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
    /// Accept a cached fix no older than this. Zero demands a fresh one.
    pub maximum_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Why a provider could not produce a position.
#[derive(Debug, Error)]
pub enum PositionError {
    /// The user refused location access.
    #[error("permission denied")]
    PermissionDenied,

    /// The provider is present but has no fix.
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    /// The provider gave up on its own.
    #[error("timeout")]
    Timeout,
}

/// A source of the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Resolve the current position.
    ///
    /// # Errors
    ///
    /// Returns a [`PositionError`] describing why no position is available.
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> std::result::Result<Coordinate, PositionError>;
}

/// Acquire the current position once.
///
/// # Errors
///
/// - [`Error::CapabilityUnavailable`] when there is no provider.
/// - [`Error::LocationUnavailable`] when the provider fails or does not
///   answer within `options.timeout`.
pub async fn get_location(
    provider: Option<&dyn LocationProvider>,
    options: &LocationOptions,
) -> Result<Coordinate> {
    let Some(provider) = provider else {
        warn!("No location provider configured");
        return Err(Error::CapabilityUnavailable);
    };

    debug!(
        provider = provider.name(),
        high_accuracy = options.high_accuracy,
        timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
        "Requesting current position"
    );

    match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(Ok(coordinate)) => {
            debug!("Position resolved to {coordinate}");
            Ok(coordinate)
        }
        Ok(Err(e)) => {
            warn!("{} could not resolve position: {e}", provider.name());
            Err(Error::location_unavailable(e.to_string()))
        }
        Err(_) => {
            warn!(
                "{} did not answer within {:?}",
                provider.name(),
                options.timeout
            );
            Err(Error::location_unavailable(PositionError::Timeout.to_string()))
        }
    }
}

/// Pick the provider described by the configuration.
///
/// A location command wins over fixed coordinates. Returns `None` when
/// neither is configured, which reads as "no location capability".
#[must_use]
pub fn provider_from_config(config: &Config) -> Option<Box<dyn LocationProvider>> {
    if let Some(command) = config.location.command.as_deref() {
        if let Some(provider) = CommandLocationProvider::parse(command) {
            return Some(Box::new(provider));
        }
        warn!("Ignoring empty location command");
    }
    config
        .fixed_coordinate()
        .map(|c| Box::new(FixedLocationProvider::new(c)) as Box<dyn LocationProvider>)
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinate: Coordinate,
}

impl FixedLocationProvider {
    /// Create a provider that always answers `coordinate`.
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn current_position(
        &self,
        _options: &LocationOptions,
    ) -> std::result::Result<Coordinate, PositionError> {
        Ok(self.coordinate)
    }
}

/// Runs an external helper that prints `lat,lon` (or `lat lon`) on stdout.
///
/// The helper is killed if the request times out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLocationProvider {
    program: String,
    args: Vec<String>,
}

impl CommandLocationProvider {
    /// Split a command line on whitespace. `None` if it is blank.
    #[must_use]
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl LocationProvider for CommandLocationProvider {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> std::result::Result<Coordinate, PositionError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .env(
                "SAFEALERT_HIGH_ACCURACY",
                if options.high_accuracy { "1" } else { "0" },
            )
            .env(
                "SAFEALERT_MAXIMUM_AGE_MS",
                options.maximum_age.as_millis().to_string(),
            )
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PositionError::PositionUnavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_ascii_lowercase().contains("denied") {
                return Err(PositionError::PermissionDenied);
            }
            return Err(PositionError::PositionUnavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        parse_coordinate(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            PositionError::PositionUnavailable(format!(
                "{} printed no usable coordinate",
                self.program
            ))
        })
    }
}

fn coordinate_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*(?:,|\s)\s*(-?\d+(?:\.\d+)?)\s*$").ok()
        })
        .as_ref()
}

/// Parse the first non-empty line of helper output as a coordinate.
fn parse_coordinate(output: &str) -> Option<Coordinate> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let caps = coordinate_pattern()?.captures(line)?;
    let lat = caps[1].parse().ok()?;
    let lon = caps[2].parse().ok()?;
    Coordinate::new(lat, lon)
}
