//! Reverse geocoding.
//!
//! The [`GeoResolver`] trait abstracts the lookup service that turns a
//! coordinate pair into a human-readable place name. The production
//! implementation is [`NominatimResolver`]; tests substitute a mock. A failed
//! lookup is never fatal — callers fall back to [`format_position`].

mod nominatim;

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

pub use nominatim::{NominatimResolver, DEFAULT_NOMINATIM_URL};

/// Errors from a reverse geocoding lookup.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// The service answered with a non-success status code.
    #[error("lookup service returned HTTP {0}")]
    BadStatus(u16),

    /// JSON deserialization failed.
    #[error("failed to parse lookup response: {0}")]
    JsonError(String),
}

/// Trait for resolving a coordinate pair to a display location.
pub trait GeoResolver: Send + Sync {
    /// Look up the place at the given coordinates.
    fn reverse_lookup(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<Location, GeoError>> + Send;
}

/// Reverse geocoding result.
///
/// Decoupled from the wire format beyond the fields we render; the service
/// reports its own coordinates as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// Address breakdown within a [`Location`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
}

impl Location {
    /// Render the location for a status line.
    ///
    /// Prefers city over town over village, followed by the upper-cased
    /// country code (or the country name when no code is present). Falls back
    /// to the service's `display_name` when no settlement field is set, and
    /// to plain coordinates when the response carries no address at all.
    pub fn render(&self) -> String {
        let Some(address) = &self.address else {
            let latitude = parse_coordinate(self.lat.as_deref());
            let longitude = parse_coordinate(self.lon.as_deref());
            return format_position(latitude, longitude);
        };

        let place = if !address.city.is_empty() {
            &address.city
        } else if !address.town.is_empty() {
            &address.town
        } else if !address.village.is_empty() {
            &address.village
        } else {
            return self.display_name.clone();
        };

        let country = if !address.country_code.is_empty() {
            address.country_code.to_uppercase()
        } else {
            address.country.clone()
        };

        if country.is_empty() {
            place.clone()
        } else {
            format!("{} {}", place, country)
        }
    }
}

fn parse_coordinate(value: Option<&str>) -> f64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

/// Render a coordinate pair the way it appears in status lines:
/// absolute degrees to five decimals with hemisphere suffixes,
/// e.g. `46.94702N 7.44720E`.
pub fn format_position(latitude: f64, longitude: f64) -> String {
    let ns = if latitude < 0.0 { 'S' } else { 'N' };
    let ew = if longitude < 0.0 { 'W' } else { 'E' };
    format!("{:.5}{} {:.5}{}", latitude.abs(), ns, longitude.abs(), ew)
}
