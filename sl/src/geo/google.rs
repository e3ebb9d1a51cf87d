//! Google Geocoding API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sessionstore::GeoPoint;
use std::time::Duration;
use tracing::debug;

use super::{CandidateAddress, GeoError, Geocoder};
use crate::config::GeocoderConfig;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Geocoder backed by the Google Geocoding JSON API
pub struct GoogleGeocoder {
    base_url: String,
    api_key: String,
    region: Option<String>,
    http: Client,
}

impl GoogleGeocoder {
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeoError> {
        debug!(base_url = %config.base_url, "GoogleGeocoder::from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GeoError::MissingCredentials(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(GeoError::Network)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key,
            region: config.region.clone(),
            http,
        })
    }

    /// Map the API's status field onto candidates or an error
    fn parse_response(response: GeocodeResponse) -> Result<Vec<CandidateAddress>, GeoError> {
        debug!(status = %response.status, result_count = response.results.len(), "parse_response: called");
        match response.status.as_str() {
            "OK" => Ok(response
                .results
                .into_iter()
                .map(|r| CandidateAddress {
                    formatted: r.formatted_address,
                    location: GeoPoint::from_lon_lat(r.geometry.location.lng, r.geometry.location.lat),
                    place_id: r.place_id,
                })
                .collect()),
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(GeoError::Lookup {
                status: other.to_string(),
                message: response.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn lookup(&self, text: &str) -> Result<Vec<CandidateAddress>, GeoError> {
        debug!(%text, "GoogleGeocoder::lookup: called");
        let mut query = vec![("address", text), ("key", self.api_key.as_str())];
        if let Some(region) = &self.region {
            query.push(("region", region.as_str()));
        }

        let response = self.http.get(&self.base_url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            debug!(%status, "GoogleGeocoder::lookup: HTTP error");
            let message = response.text().await.unwrap_or_default();
            return Err(GeoError::Api { status, message });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeoError::InvalidResponse(e.to_string()))?;
        Self::parse_response(body)
    }
}
