//! Record types persisted by the session store

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

/// Identity of a conversation: the sender's phone number, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number, rejecting blank input
    ///
    /// Surrounding whitespace is trimmed; the rest is opaque.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        debug!(%raw, "PhoneNumber::parse: called");
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            debug!("PhoneNumber::parse: blank input");
            return Err(StoreError::InvalidPhoneNumber(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A longitude/latitude pair in decimal degrees
///
/// Fields are named and the only constructor takes longitude first, so the
/// two axes cannot be silently swapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Both coordinates are finite and inside their WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.longitude, self.latitude)
    }
}

/// A geocoded street address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    /// Address as formatted by the geocoder
    pub formatted: String,

    /// Geocoded location
    pub location: GeoPoint,

    /// Geocoder's stable identifier for the place, when it provides one
    #[serde(default)]
    pub place_id: Option<String>,
}

impl ResolvedAddress {
    /// The location used for geofence checks
    pub fn point(&self) -> GeoPoint {
        GeoPoint::from_lon_lat(self.location.longitude, self.location.latitude)
    }
}

/// A disaster-affected area: a center point and a containment radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterZone {
    pub name: String,
    pub center: GeoPoint,

    /// Zone-specific radius in kilometres; `None` uses the shared radius
    #[serde(default)]
    pub radius_km: Option<f64>,
}

impl DisasterZone {
    pub fn new(name: impl Into<String>, center: GeoPoint, radius_km: Option<f64>) -> Self {
        Self {
            name: name.into(),
            center,
            radius_km,
        }
    }

    /// Reject zones that could never be evaluated sensibly
    pub fn validate(&self) -> Result<(), StoreError> {
        debug!(name = %self.name, center = %self.center, ?self.radius_km, "DisasterZone::validate: called");
        let invalid = |reason: &str| StoreError::InvalidZone {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self.center.is_valid() {
            return Err(invalid("center coordinates out of range"));
        }
        match self.radius_km {
            Some(radius) if !(radius.is_finite() && radius > 0.0) => {
                return Err(invalid("radius must be a positive number of kilometres"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Opaque dialogue-engine context, stored and returned verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueContext(Value);

impl DialogueContext {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// The yes/no questions asked during intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyQuestion {
    /// "Is this your address?"
    AddressConfirmed,
    /// "Are you injured?"
    Injured,
    /// "Do you have a vehicle?"
    HasVehicle,
    /// "Is there space in your vehicle?"
    HasSpaceInVehicle,
}

impl SurveyQuestion {
    pub const ALL: [SurveyQuestion; 4] = [
        SurveyQuestion::AddressConfirmed,
        SurveyQuestion::Injured,
        SurveyQuestion::HasVehicle,
        SurveyQuestion::HasSpaceInVehicle,
    ];
}

impl std::fmt::Display for SurveyQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressConfirmed => write!(f, "address_confirmed"),
            Self::Injured => write!(f, "injured"),
            Self::HasVehicle => write!(f, "has_vehicle"),
            Self::HasSpaceInVehicle => write!(f, "has_space_in_vehicle"),
        }
    }
}

/// Persisted answer to a yes/no question
///
/// A slot only carries a boolean once the question was asked and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSlot {
    /// Question never asked
    #[default]
    Unasked,
    /// Question asked, no answer yet
    Pending,
    /// Question answered
    Answered(bool),
}

impl ConfirmationSlot {
    pub fn answer(&self) -> Option<bool> {
        match self {
            Self::Answered(value) => Some(*value),
            Self::Unasked | Self::Pending => None,
        }
    }

    pub fn was_asked(&self) -> bool {
        !matches!(self, Self::Unasked)
    }
}

impl std::fmt::Display for ConfirmationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.answer() {
            Some(true) => "yes",
            Some(false) => "no",
            None if self.was_asked() => "pending",
            None => "unasked",
        };
        f.write_str(label)
    }
}

/// Everything persisted for one phone number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Dialogue-engine context from the previous turn
    #[serde(default)]
    pub dialogue_context: Option<DialogueContext>,

    /// Address resolved from the survivor's input
    #[serde(default)]
    pub address: Option<ResolvedAddress>,

    #[serde(default)]
    pub address_confirmed: ConfirmationSlot,

    #[serde(default)]
    pub injured: ConfirmationSlot,

    #[serde(default)]
    pub has_vehicle: ConfirmationSlot,

    #[serde(default)]
    pub has_space_in_vehicle: ConfirmationSlot,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl SessionRecord {
    pub fn new(now: i64) -> Self {
        Self {
            dialogue_context: None,
            address: None,
            address_confirmed: ConfirmationSlot::Unasked,
            injured: ConfirmationSlot::Unasked,
            has_vehicle: ConfirmationSlot::Unasked,
            has_space_in_vehicle: ConfirmationSlot::Unasked,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot(&self, question: SurveyQuestion) -> ConfirmationSlot {
        match question {
            SurveyQuestion::AddressConfirmed => self.address_confirmed,
            SurveyQuestion::Injured => self.injured,
            SurveyQuestion::HasVehicle => self.has_vehicle,
            SurveyQuestion::HasSpaceInVehicle => self.has_space_in_vehicle,
        }
    }

    fn slot_mut(&mut self, question: SurveyQuestion) -> &mut ConfirmationSlot {
        match question {
            SurveyQuestion::AddressConfirmed => &mut self.address_confirmed,
            SurveyQuestion::Injured => &mut self.injured,
            SurveyQuestion::HasVehicle => &mut self.has_vehicle,
            SurveyQuestion::HasSpaceInVehicle => &mut self.has_space_in_vehicle,
        }
    }

    /// Merge a partial update into this record
    pub fn apply(&mut self, update: SessionUpdate, now: i64) {
        debug!(?update, "SessionRecord::apply: called");
        if let Some(context) = update.dialogue_context {
            self.dialogue_context = Some(context);
        }
        if let Some(address) = update.address {
            self.address = Some(address);
        }
        for (question, slot) in update.slots {
            *self.slot_mut(question) = slot;
        }
        self.updated_at = now;
    }

    /// One-line survey summary for logs and the CLI
    pub fn summary(&self) -> String {
        let address = self.address.as_ref().map(|a| a.formatted.as_str()).unwrap_or("-");
        let answers = SurveyQuestion::ALL
            .iter()
            .map(|q| format!("{}={}", q, self.slot(*q)))
            .collect::<Vec<_>>()
            .join(" ");
        let answered = SurveyQuestion::ALL
            .iter()
            .filter(|q| self.slot(**q).answer().is_some())
            .count();
        format!(
            "address='{}' answered={}/{} {}",
            address,
            answered,
            SurveyQuestion::ALL.len(),
            answers
        )
    }
}

/// Partial session record; `None` fields leave stored values untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub dialogue_context: Option<DialogueContext>,
    pub address: Option<ResolvedAddress>,
    pub slots: Vec<(SurveyQuestion, ConfirmationSlot)>,
}

impl SessionUpdate {
    pub fn with_context(mut self, context: DialogueContext) -> Self {
        self.dialogue_context = Some(context);
        self
    }

    pub fn with_address(mut self, address: ResolvedAddress) -> Self {
        self.address = Some(address);
        self
    }

    /// Record that a question was just asked
    pub fn ask(mut self, question: SurveyQuestion) -> Self {
        self.slots.push((question, ConfirmationSlot::Pending));
        self
    }

    /// Record an answer
    pub fn answer(mut self, question: SurveyQuestion, value: bool) -> Self {
        self.slots.push((question, ConfirmationSlot::Answered(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dialogue_context.is_none() && self.address.is_none() && self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn springfield() -> ResolvedAddress {
        ResolvedAddress {
            formatted: "123 Main St, Springfield, IL 62701, USA".to_string(),
            location: GeoPoint::from_lon_lat(-89.6501, 39.7817),
            place_id: None,
        }
    }

    #[test]
    fn test_phone_number_rejects_blank() {
        assert!(PhoneNumber::parse("   ").is_err());
        assert!(PhoneNumber::parse("").is_err());
        assert_eq!(PhoneNumber::parse(" +15551234567 ").unwrap().as_str(), "+15551234567");
    }

    #[test]
    fn test_address_point_keeps_lon_lat_pairing() {
        let point = springfield().point();
        assert_eq!(point.longitude, -89.6501);
        assert_eq!(point.latitude, 39.7817);
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::from_lon_lat(-89.65, 39.78).is_valid());
        assert!(!GeoPoint::from_lon_lat(39.78, -189.65).is_valid());
        assert!(!GeoPoint::from_lon_lat(0.0, 91.0).is_valid());
        assert!(!GeoPoint::from_lon_lat(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_zone_validation() {
        let center = GeoPoint::from_lon_lat(-89.65, 39.78);
        assert!(DisasterZone::new("flood", center, None).validate().is_ok());
        assert!(DisasterZone::new("flood", center, Some(2.5)).validate().is_ok());
        assert!(DisasterZone::new(" ", center, None).validate().is_err());
        assert!(DisasterZone::new("flood", center, Some(0.0)).validate().is_err());
        assert!(
            DisasterZone::new("flood", GeoPoint::from_lon_lat(200.0, 0.0), None)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_slot_answer_only_when_answered() {
        assert_eq!(ConfirmationSlot::Unasked.answer(), None);
        assert_eq!(ConfirmationSlot::Pending.answer(), None);
        assert_eq!(ConfirmationSlot::Answered(false).answer(), Some(false));
        assert!(!ConfirmationSlot::Unasked.was_asked());
        assert!(ConfirmationSlot::Pending.was_asked());
        assert_eq!(ConfirmationSlot::Answered(true).to_string(), "yes");
        assert_eq!(ConfirmationSlot::Pending.to_string(), "pending");
    }

    #[test]
    fn test_slot_serde_shape() {
        assert_eq!(serde_json::to_string(&ConfirmationSlot::Pending).unwrap(), "\"pending\"");
        assert_eq!(
            serde_json::to_string(&ConfirmationSlot::Answered(true)).unwrap(),
            "{\"answered\":true}"
        );
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut record = SessionRecord::new(1);
        record.apply(
            SessionUpdate::default()
                .with_address(springfield())
                .ask(SurveyQuestion::AddressConfirmed),
            2,
        );
        record.apply(SessionUpdate::default().answer(SurveyQuestion::Injured, true), 3);

        assert_eq!(record.address, Some(springfield()));
        assert_eq!(record.address_confirmed, ConfirmationSlot::Pending);
        assert_eq!(record.injured, ConfirmationSlot::Answered(true));
        assert_eq!(record.has_vehicle, ConfirmationSlot::Unasked);
        assert_eq!(record.created_at, 1);
        assert_eq!(record.updated_at, 3);
    }

    #[test]
    fn test_record_deserializes_without_slots() {
        let json = r#"{"created_at": 5, "updated_at": 6}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.injured, ConfirmationSlot::Unasked);
        assert!(record.dialogue_context.is_none());
    }

    #[test]
    fn test_summary_lists_every_question() {
        let mut record = SessionRecord::new(0);
        record.apply(
            SessionUpdate::default()
                .answer(SurveyQuestion::HasVehicle, false)
                .ask(SurveyQuestion::Injured),
            1,
        );
        let summary = record.summary();
        assert!(summary.contains("address='-'"));
        assert!(summary.contains("answered=1/4"));
        assert!(summary.contains("has_vehicle=no"));
        assert!(summary.contains("injured=pending"));
        assert!(summary.contains("address_confirmed=unasked"));
    }
}
