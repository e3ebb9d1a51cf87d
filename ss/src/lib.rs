//! SessionStore - per-phone-number conversation state for SOSLine
//!
//! One SQLite database holds two tables:
//!
//! ```text
//! sessions        phone (PK) | record (JSON) | created_at | updated_at
//! disaster_zones  name (PK)  | longitude | latitude | radius_km
//! ```
//!
//! Session records are written field by field (see [`SessionUpdate`]) and
//! deleted as a whole. Disaster zones are maintained by operators and read
//! fresh on every query.
//!
//! # Example
//!
//! ```ignore
//! use sessionstore::{PhoneNumber, SessionStore, SessionUpdate, SurveyQuestion};
//!
//! let mut store = SessionStore::open("sosline.db")?;
//! let phone = PhoneNumber::parse("+15551234567")?;
//! store.put(&phone, SessionUpdate::default().answer(SurveyQuestion::Injured, false))?;
//! let record = store.get(&phone)?;
//! ```

mod error;
mod store;
mod types;

pub use error::StoreError;
pub use store::SessionStore;
pub use types::{
    ConfirmationSlot, DialogueContext, DisasterZone, GeoPoint, PhoneNumber, ResolvedAddress, SessionRecord,
    SessionUpdate, SurveyQuestion,
};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
