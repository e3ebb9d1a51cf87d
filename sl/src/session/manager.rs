//! SessionManager - actor that owns the SessionStore
//!
//! Processes commands via channels for thread-safe access to persistent state.
//! Commands are applied one at a time; two overlapping turns for the same
//! phone number still race at the read-modify-write level (last writer wins).

use async_trait::async_trait;
use sessionstore::{DisasterZone, PhoneNumber, SessionRecord, SessionStore, SessionUpdate};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{SessionCommand, SessionError, SessionResponse};
use super::{SessionRepository, ZoneSource};

/// Handle to send commands to the SessionManager
#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionManager {
    /// Spawn a new SessionManager actor owning the given store
    pub fn spawn(store: SessionStore) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(actor_loop(store, rx));

        info!("SessionManager spawned");
        Self { tx }
    }

    /// Open the store at a path and spawn an actor for it
    pub fn open(path: impl AsRef<std::path::Path>) -> eyre::Result<Self> {
        let store = SessionStore::open(path)?;
        Ok(Self::spawn(store))
    }

    /// List every session record, most recently updated first
    pub async fn list_sessions(&self) -> SessionResponse<Vec<(PhoneNumber, SessionRecord)>> {
        debug!("list_sessions: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::ListSessions { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Add a disaster zone or replace the one with the same name
    pub async fn upsert_zone(&self, zone: DisasterZone) -> SessionResponse<()> {
        debug!(name = %zone.name, "upsert_zone: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::UpsertZone { zone, reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Remove a disaster zone by name
    pub async fn remove_zone(&self, name: &str) -> SessionResponse<bool> {
        debug!(%name, "remove_zone: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::RemoveZone {
                name: name.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Stop the actor; pending commands already queued are processed first
    pub async fn shutdown(&self) -> SessionResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

#[async_trait]
impl SessionRepository for SessionManager {
    async fn get(&self, phone: &PhoneNumber) -> SessionResponse<Option<SessionRecord>> {
        debug!(%phone, "get: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Get {
                phone: phone.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    async fn put(&self, phone: &PhoneNumber, update: SessionUpdate) -> SessionResponse<SessionRecord> {
        debug!(%phone, "put: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Put {
                phone: phone.clone(),
                update,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    async fn delete(&self, phone: &PhoneNumber) -> SessionResponse<bool> {
        debug!(%phone, "delete: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Delete {
                phone: phone.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }
}

#[async_trait]
impl ZoneSource for SessionManager {
    async fn zones(&self) -> SessionResponse<Vec<DisasterZone>> {
        debug!("zones: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::ListZones { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: SessionStore, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::Get { phone, reply } => {
                debug!(%phone, "actor_loop: Get command");
                let _ = reply.send(store.get(&phone).map_err(SessionError::from));
            }

            SessionCommand::Put { phone, update, reply } => {
                debug!(%phone, "actor_loop: Put command");
                let _ = reply.send(store.put(&phone, update).map_err(SessionError::from));
            }

            SessionCommand::Delete { phone, reply } => {
                debug!(%phone, "actor_loop: Delete command");
                let result = store.delete(&phone).map_err(SessionError::from);
                if let Ok(true) = result {
                    info!(%phone, "Session record deleted");
                }
                let _ = reply.send(result);
            }

            SessionCommand::ListSessions { reply } => {
                debug!("actor_loop: ListSessions command");
                let _ = reply.send(store.list_sessions().map_err(SessionError::from));
            }

            SessionCommand::ListZones { reply } => {
                debug!("actor_loop: ListZones command");
                let _ = reply.send(store.list_zones().map_err(SessionError::from));
            }

            SessionCommand::UpsertZone { zone, reply } => {
                debug!(name = %zone.name, "actor_loop: UpsertZone command");
                let _ = reply.send(store.upsert_zone(&zone).map_err(SessionError::from));
            }

            SessionCommand::RemoveZone { name, reply } => {
                debug!(%name, "actor_loop: RemoveZone command");
                let _ = reply.send(store.remove_zone(&name).map_err(SessionError::from));
            }

            SessionCommand::Shutdown => {
                info!("SessionManager shutting down");
                break;
            }
        }
    }

    debug!("actor_loop: exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionstore::{ConfirmationSlot, GeoPoint, SurveyQuestion};

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+15551234567").unwrap()
    }

    #[tokio::test]
    async fn test_put_get_delete_roundtrip() {
        let manager = SessionManager::spawn(SessionStore::open_in_memory().unwrap());

        assert!(manager.get(&phone()).await.unwrap().is_none());

        manager
            .put(&phone(), SessionUpdate::default().answer(SurveyQuestion::HasVehicle, true))
            .await
            .unwrap();
        let record = manager.get(&phone()).await.unwrap().unwrap();
        assert_eq!(record.has_vehicle, ConfirmationSlot::Answered(true));

        assert!(manager.delete(&phone()).await.unwrap());
        assert!(manager.get(&phone()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zones_are_read_fresh() {
        let manager = SessionManager::spawn(SessionStore::open_in_memory().unwrap());
        assert!(manager.zones().await.unwrap().is_empty());

        let zone = DisasterZone::new("flood", GeoPoint::from_lon_lat(-89.65, 39.78), None);
        manager.upsert_zone(zone.clone()).await.unwrap();
        assert_eq!(manager.zones().await.unwrap(), vec![zone]);

        assert!(manager.remove_zone("flood").await.unwrap());
        assert!(manager.zones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let manager = SessionManager::spawn(SessionStore::open_in_memory().unwrap());
        let bad = DisasterZone::new("", GeoPoint::from_lon_lat(0.0, 0.0), None);
        assert!(matches!(manager.upsert_zone(bad).await, Err(SessionError::Store(_))));
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let manager = SessionManager::spawn(SessionStore::open_in_memory().unwrap());
        manager.shutdown().await.unwrap();

        // Give the actor a moment to exit
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(matches!(manager.get(&phone()).await, Err(SessionError::ChannelClosed)));
    }
}
