//! Session state with actor pattern
//!
//! SessionManager owns the SessionStore and processes messages via channels,
//! giving the conversation core async access to per-phone-number records and
//! the disaster zone set.

use async_trait::async_trait;
use sessionstore::{DisasterZone, PhoneNumber, SessionRecord, SessionUpdate};

mod manager;
mod messages;

pub use manager::SessionManager;
pub use messages::{SessionCommand, SessionError, SessionResponse};

/// Per-phone-number record access used by the orchestrator
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get(&self, phone: &PhoneNumber) -> SessionResponse<Option<SessionRecord>>;

    /// Field-level upsert; creates the record on first write
    async fn put(&self, phone: &PhoneNumber, update: SessionUpdate) -> SessionResponse<SessionRecord>;

    /// Remove the whole record; returns whether one existed
    async fn delete(&self, phone: &PhoneNumber) -> SessionResponse<bool>;
}

/// Read access to the current disaster zones
#[async_trait]
pub trait ZoneSource: Send + Sync {
    /// Always reflects the zones stored right now
    async fn zones(&self) -> SessionResponse<Vec<DisasterZone>>;
}
