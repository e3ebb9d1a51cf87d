//! SOSLine configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conversation::ConversationPosition;

/// Main SOSLine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP transport
    pub server: ServerConfig,

    /// Session database
    pub storage: StorageConfig,

    /// Dialogue engine (Watson Assistant)
    pub dialogue: DialogueConfig,

    /// Address geocoding
    pub geocoder: GeocoderConfig,

    /// Map preview links
    pub preview: PreviewConfig,

    /// External location tracking
    pub tracker: TrackerConfig,

    /// Disaster zone containment
    pub geofence: GeofenceConfig,
}

impl Config {
    /// Validate configuration needed to run conversations
    ///
    /// Checks that required environment variables and identifiers are set.
    /// Zone and session administration does not need this.
    pub fn validate(&self) -> Result<()> {
        if self.dialogue.workspace_id.trim().is_empty() {
            return Err(eyre::eyre!("dialogue.workspace-id is not set"));
        }
        if std::env::var(&self.dialogue.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Dialogue API key not found. Set the {} environment variable.",
                self.dialogue.api_key_env
            ));
        }
        if std::env::var(&self.geocoder.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Geocoder API key not found. Set the {} environment variable.",
                self.geocoder.api_key_env
            ));
        }
        if self.tracker.provider == "mapbox" && std::env::var(&self.tracker.token_env).is_err() {
            return Err(eyre::eyre!(
                "Mapbox token not found. Set the {} environment variable.",
                self.tracker.token_env
            ));
        }
        if !(self.geofence.radius_km.is_finite() && self.geofence.radius_km > 0.0) {
            return Err(eyre::eyre!("geofence.radius-km must be a positive number"));
        }
        Ok(())
    }

    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable file among
    /// `.sosline.yml` and `<config dir>/sosline/sosline.yml` wins, and a
    /// deployment with neither runs on defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path).context(format!("Failed to load config from {}", path.display())),
            None => Ok(Self::load_first(&Self::search_paths())),
        }
    }

    /// Implicit config locations, highest precedence first
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".sosline.yml")];
        paths.extend(dirs::config_dir().map(|dir| dir.join("sosline").join("sosline.yml")));
        paths
    }

    /// First candidate that exists and parses; unreadable ones are skipped
    fn load_first(candidates: &[PathBuf]) -> Self {
        let found = candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from_file(path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "load: skipping config file");
                    None
                }
            });
        found.unwrap_or_else(|| {
            tracing::info!(searched = candidates.len(), "load: no usable config file, running on defaults");
            Self::default()
        })
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!(path = %path.display(), "load: using config file");
        Ok(config)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the webhook listener binds to
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding sessions and disaster zones
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/sosline on Linux)
        let db_path = dirs::data_dir()
            .map(|d| d.join("sosline"))
            .unwrap_or_else(|| PathBuf::from(".sosline"))
            .join("sosline.db");

        Self { db_path }
    }
}

/// Dialogue engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Service base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Assistant workspace (skill) identifier
    #[serde(rename = "workspace-id")]
    pub workspace_id: String,

    /// API version date
    pub version: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Dialogue node ids mapped to conversation positions, added to the built-in table
    pub nodes: BTreeMap<String, ConversationPosition>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.us-south.assistant.watson.cloud.ibm.com".to_string(),
            workspace_id: String::new(),
            version: "2018-09-20".to_string(),
            api_key_env: "ASSISTANT_APIKEY".to_string(),
            timeout_ms: 30_000,
            nodes: BTreeMap::new(),
        }
    }
}

/// Geocoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Geocoding endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Region bias (ccTLD, e.g. "us")
    pub region: Option<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            region: None,
            timeout_ms: 10_000,
        }
    }
}

/// Map preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Static map endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Map zoom level
    pub zoom: u8,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Environment variable containing the API key (optional at runtime)
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
            zoom: 16,
            width: 600,
            height: 400,
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
        }
    }
}

/// Location tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// "none" or "mapbox"
    pub provider: String,

    /// Mapbox API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Mapbox account owning the dataset
    pub username: String,

    /// Dataset receiving survivor locations
    pub dataset: String,

    /// Environment variable containing the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            base_url: "https://api.mapbox.com".to_string(),
            username: String::new(),
            dataset: String::new(),
            token_env: "MAPBOX_ACCESS_TOKEN".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Geofence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Containment radius for zones without their own
    #[serde(rename = "radius-km")]
    pub radius_km: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self { radius_km: 10.0 }
    }
}
