//! Survivor location tracking in a Mapbox dataset

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sessionstore::{GeoPoint, PhoneNumber};
use std::time::Duration;
use tracing::{debug, info};

use super::{GeoError, LocationTracker};
use crate::config::TrackerConfig;

/// Feature ids must be URL-safe; keep only ASCII alphanumerics
fn feature_id(phone: &PhoneNumber) -> String {
    phone.as_str().chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// GeoJSON point feature for one survivor
fn feature(phone: &PhoneNumber, location: GeoPoint) -> Value {
    serde_json::json!({
        "id": feature_id(phone),
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [location.longitude, location.latitude],
        },
        "properties": {
            "phone": phone.as_str(),
        },
    })
}

/// Upserts survivor features into a Mapbox dataset
pub struct MapboxTracker {
    base_url: String,
    username: String,
    dataset: String,
    token: String,
    http: Client,
}

impl MapboxTracker {
    pub fn from_config(config: &TrackerConfig) -> Result<Self, GeoError> {
        debug!(username = %config.username, dataset = %config.dataset, "MapboxTracker::from_config: called");
        let token =
            std::env::var(&config.token_env).map_err(|_| GeoError::MissingCredentials(config.token_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(GeoError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            dataset: config.dataset.clone(),
            token,
            http,
        })
    }

    fn feature_url(&self, phone: &PhoneNumber) -> String {
        format!(
            "{}/datasets/v1/{}/{}/features/{}",
            self.base_url,
            self.username,
            self.dataset,
            feature_id(phone)
        )
    }
}

#[async_trait]
impl LocationTracker for MapboxTracker {
    async fn track(&self, phone: &PhoneNumber, location: GeoPoint) -> Result<(), GeoError> {
        debug!(%phone, %location, "MapboxTracker::track: called");
        let response = self
            .http
            .put(self.feature_url(phone))
            .query(&[("access_token", self.token.as_str())])
            .json(&feature(phone, location))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GeoError::Api { status, message });
        }

        info!(%phone, %location, "Survivor location tracked");
        Ok(())
    }
}

/// Tracker used when no tracking service is configured
pub struct NoopTracker;

#[async_trait]
impl LocationTracker for NoopTracker {
    async fn track(&self, phone: &PhoneNumber, location: GeoPoint) -> Result<(), GeoError> {
        debug!(%phone, %location, "NoopTracker::track: tracking disabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_id_is_url_safe() {
        let phone = PhoneNumber::parse("+1 (555) 123-4567").unwrap();
        assert_eq!(feature_id(&phone), "15551234567");
    }

    #[test]
    fn test_feature_coordinates_are_lon_lat() {
        let phone = PhoneNumber::parse("+15551234567").unwrap();
        let value = feature(&phone, GeoPoint::from_lon_lat(-89.6501, 39.7817));
        assert_eq!(value["geometry"]["coordinates"][0], -89.6501);
        assert_eq!(value["geometry"]["coordinates"][1], 39.7817);
        assert_eq!(value["properties"]["phone"], "+15551234567");
    }

    #[tokio::test]
    async fn test_noop_tracker_succeeds() {
        let phone = PhoneNumber::parse("+15551234567").unwrap();
        assert!(NoopTracker.track(&phone, GeoPoint::from_lon_lat(0.0, 0.0)).await.is_ok());
    }
}
