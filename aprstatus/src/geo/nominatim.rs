//! Nominatim reverse geocoding client.

use std::time::Duration;

use super::{GeoError, GeoResolver, Location};

/// Public OpenStreetMap Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// HTTP timeout for a single lookup.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse geocoding via a Nominatim server.
///
/// Uses a reusable `reqwest::Client` with connection pooling and timeouts.
/// The public instance requires an identifying user agent.
pub struct NominatimResolver {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimResolver {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("aprstatus/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
        }
    }

    /// Point the resolver at a different Nominatim server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for NominatimResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoResolver for NominatimResolver {
    async fn reverse_lookup(&self, latitude: f64, longitude: f64) -> Result<Location, GeoError> {
        let url = format!("{}/reverse.php", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeoError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::BadStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeoError::HttpError(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| GeoError::JsonError(e.to_string()))
    }
}
