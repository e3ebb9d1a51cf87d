//! Static map preview links

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::{GeoError, MediaPreview};
use crate::config::PreviewConfig;

/// Builds Google Static Maps image URLs centered on an address
#[derive(Debug, Clone)]
pub struct StaticMapPreview {
    base_url: String,
    zoom: u8,
    width: u32,
    height: u32,
    api_key: Option<String>,
}

impl StaticMapPreview {
    /// The key is optional; without it the link is built unsigned
    pub fn from_config(config: &PreviewConfig) -> Self {
        debug!(base_url = %config.base_url, "StaticMapPreview::from_config: called");
        Self {
            base_url: config.base_url.clone(),
            zoom: config.zoom,
            width: config.width,
            height: config.height,
            api_key: std::env::var(&config.api_key_env).ok(),
        }
    }

    /// Build the image URL for an address
    pub fn url_for(&self, formatted_address: &str) -> Result<String, GeoError> {
        debug!(%formatted_address, "url_for: called");
        let size = format!("{}x{}", self.width, self.height);
        let zoom = self.zoom.to_string();
        let markers = format!("color:red|{}", formatted_address);

        let mut params = vec![
            ("center", formatted_address),
            ("zoom", zoom.as_str()),
            ("size", size.as_str()),
            ("markers", markers.as_str()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }

        let url = Url::parse_with_params(&self.base_url, &params).map_err(|e| GeoError::Url(e.to_string()))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl MediaPreview for StaticMapPreview {
    async fn preview_for(&self, formatted_address: &str) -> Result<String, GeoError> {
        self.url_for(formatted_address)
    }
}
