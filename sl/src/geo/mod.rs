//! Geo collaborators: geocoding, location tracking, map previews

use async_trait::async_trait;
use sessionstore::{GeoPoint, PhoneNumber, ResolvedAddress};

mod error;
mod google;
mod mapbox;
mod preview;

pub use error::GeoError;
pub use google::GoogleGeocoder;
pub use mapbox::{MapboxTracker, NoopTracker};
pub use preview::StaticMapPreview;

/// One geocoder match for free-text input
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAddress {
    pub formatted: String,
    pub location: GeoPoint,
    pub place_id: Option<String>,
}

impl From<CandidateAddress> for ResolvedAddress {
    fn from(candidate: CandidateAddress) -> Self {
        ResolvedAddress {
            formatted: candidate.formatted.trim().to_string(),
            location: candidate.location,
            place_id: candidate.place_id,
        }
    }
}

/// Turns free text into zero or more candidate addresses
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, text: &str) -> Result<Vec<CandidateAddress>, GeoError>;
}

/// External map of tracked survivors
#[async_trait]
pub trait LocationTracker: Send + Sync {
    async fn track(&self, phone: &PhoneNumber, location: GeoPoint) -> Result<(), GeoError>;
}

/// Produces a media link previewing an address on a map
#[async_trait]
pub trait MediaPreview: Send + Sync {
    async fn preview_for(&self, formatted_address: &str) -> Result<String, GeoError>;
}
