//! Reverse geocoding for current-location questions.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::http_client::build_http_client;

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = "aiga-llm-server-geocoder";
/// Nominatim usage policy: at most one request per second.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Turns coordinates into a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` means the service had no address for the point.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>>;
}

/// Nominatim-backed geocoder with request spacing.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_base_url(NOMINATIM_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(10),
            base_url: base_url.into(),
            last_request: Mutex::new(None),
        }
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        self.throttle().await;

        let url = format!(
            "{}/reverse?format=jsonv2&lat={latitude}&lon={longitude}",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            warn!(latitude, longitude, error = %error, "Reverse geocoding returned an error");
            return Ok(None);
        }
        match body.get("display_name").and_then(Value::as_str) {
            Some(address) => {
                info!(latitude, longitude, address = %address, "Reverse geocoded coordinates");
                Ok(Some(address.to_string()))
            }
            None => Ok(None),
        }
    }
}

/// Reorder a Nominatim address for Korean reading: drop the country name and
/// flip the component order to largest-region-first.
pub fn format_korean_address(address: &str) -> String {
    let mut parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "대한민국")
        .collect();
    parts.reverse();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn korean_address_reads_largest_region_first() {
        let address = "역삼동, 강남구, 서울특별시, 06236, 대한민국";
        assert_eq!(
            format_korean_address(address),
            "06236, 서울특별시, 강남구, 역삼동"
        );
    }

    #[tokio::test]
    async fn reverse_returns_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "jsonv2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "역삼동, 강남구, 서울특별시, 대한민국"
            })))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::with_base_url(server.uri());
        let address = geocoder.reverse(37.5006, 127.0364).await.unwrap();
        assert_eq!(
            address.as_deref(),
            Some("역삼동, 강남구, 서울특별시, 대한민국")
        );
    }

    #[tokio::test]
    async fn unresolvable_point_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Unable to geocode"
            })))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::with_base_url(server.uri());
        let address = geocoder.reverse(0.0, 0.0).await.unwrap();
        assert!(address.is_none());
    }
}
