//! Session manager messages
//!
//! Commands and responses for the actor pattern.

use sessionstore::{DisasterZone, PhoneNumber, SessionRecord, SessionUpdate, StoreError};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session manager channel closed")]
    ChannelClosed,
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to the SessionManager actor
#[derive(Debug)]
pub enum SessionCommand {
    // Session records
    Get {
        phone: PhoneNumber,
        reply: oneshot::Sender<SessionResponse<Option<SessionRecord>>>,
    },
    Put {
        phone: PhoneNumber,
        update: SessionUpdate,
        reply: oneshot::Sender<SessionResponse<SessionRecord>>,
    },
    Delete {
        phone: PhoneNumber,
        reply: oneshot::Sender<SessionResponse<bool>>,
    },
    ListSessions {
        reply: oneshot::Sender<SessionResponse<Vec<(PhoneNumber, SessionRecord)>>>,
    },

    // Disaster zones
    ListZones {
        reply: oneshot::Sender<SessionResponse<Vec<DisasterZone>>>,
    },
    UpsertZone {
        zone: DisasterZone,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    RemoveZone {
        name: String,
        reply: oneshot::Sender<SessionResponse<bool>>,
    },

    // Shutdown
    Shutdown,
}
