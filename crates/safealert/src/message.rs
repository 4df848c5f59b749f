//! Emergency message text.
//!
//! Both functions are pure: the same inputs always give the same string.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::location::Coordinate;

/// Map search endpoint the location link points at.
pub const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// First line of every emergency message.
pub const PREAMBLE: &str = "EMERGENCY! I need help.";

/// Timestamp layout used in messages.
const TIMESTAMP_FORMAT: &str = "%a %d %b %Y %H:%M:%S %Z";

/// Map search link for a position.
///
/// Coordinates use the shortest decimal form that round-trips, so `37.0`
/// becomes `37`.
#[must_use]
pub fn build_map_link(lat: f64, lon: f64) -> String {
    format!("{MAP_SEARCH_URL}{lat},{lon}")
}

/// Fill the emergency template.
///
/// The "From" line is left out when `sender_label` is blank.
#[must_use]
pub fn compose_message<Tz>(
    coordinate: Coordinate,
    sender_label: &str,
    timestamp: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![PREAMBLE.to_string()];
    let sender_label = sender_label.trim();
    if !sender_label.is_empty() {
        lines.push(format!("From: {sender_label}"));
    }
    lines.push(format!("Time: {}", timestamp.format(TIMESTAMP_FORMAT)));
    lines.push(format!(
        "My location: {}",
        build_map_link(coordinate.lat, coordinate.lon)
    ));
    lines.push(format!("Coordinates: {}, {}", coordinate.lat, coordinate.lon));
    lines.join("\n")
}
