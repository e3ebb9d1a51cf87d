//! SQLite-backed session store

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::now_ms;
use crate::types::{DisasterZone, GeoPoint, PhoneNumber, SessionRecord, SessionUpdate};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    phone       TEXT PRIMARY KEY,
    record      TEXT NOT NULL,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS disaster_zones (
    name        TEXT PRIMARY KEY,
    longitude   REAL NOT NULL,
    latitude    REAL NOT NULL,
    radius_km   REAL
);
";

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Session records keyed by phone number, plus the disaster zone set
///
/// Not `Sync`: one owner at a time. The service wraps it in an actor.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open (or create) a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "SessionStore::open: called");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "Session store opened");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("SessionStore::open_in_memory: called");
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // === Session records ===

    /// Fetch the record for a phone number
    pub fn get(&self, phone: &PhoneNumber) -> Result<Option<SessionRecord>, StoreError> {
        debug!(%phone, "get: called");
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM sessions WHERE phone = ?1",
                params![phone.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => {
                debug!(%phone, "get: record found");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!(%phone, "get: no record");
                Ok(None)
            }
        }
    }

    /// Merge a partial update into the record, creating it on first write
    pub fn put(&mut self, phone: &PhoneNumber, update: SessionUpdate) -> Result<SessionRecord, StoreError> {
        debug!(%phone, ?update, "put: called");
        let now = now_ms();
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT record FROM sessions WHERE phone = ?1",
                params![phone.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let mut record = match existing {
            Some(json) => serde_json::from_str(&json)?,
            None => {
                debug!(%phone, "put: creating record");
                SessionRecord::new(now)
            }
        };
        record.apply(update, now);

        tx.execute(
            "INSERT INTO sessions (phone, record, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(phone) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at",
            params![
                phone.as_str(),
                serde_json::to_string(&record)?,
                record.created_at,
                record.updated_at
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }

    /// Delete the whole record; returns whether one existed
    pub fn delete(&mut self, phone: &PhoneNumber) -> Result<bool, StoreError> {
        debug!(%phone, "delete: called");
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE phone = ?1", params![phone.as_str()])?;
        Ok(removed > 0)
    }

    /// All records, most recently updated first
    pub fn list_sessions(&self) -> Result<Vec<(PhoneNumber, SessionRecord)>, StoreError> {
        debug!("list_sessions: called");
        let mut stmt = self
            .conn
            .prepare("SELECT phone, record FROM sessions ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut sessions = Vec::new();
        for row in rows {
            let (phone, json) = row?;
            sessions.push((PhoneNumber::parse(&phone)?, serde_json::from_str(&json)?));
        }
        debug!(count = sessions.len(), "list_sessions: loaded");
        Ok(sessions)
    }

    // === Disaster zones ===

    /// Current disaster zones, ordered by name
    pub fn list_zones(&self) -> Result<Vec<DisasterZone>, StoreError> {
        debug!("list_zones: called");
        let mut stmt = self
            .conn
            .prepare("SELECT name, longitude, latitude, radius_km FROM disaster_zones ORDER BY name")?;
        let zones = stmt
            .query_map([], |row| {
                Ok(DisasterZone {
                    name: row.get(0)?,
                    center: GeoPoint::from_lon_lat(row.get(1)?, row.get(2)?),
                    radius_km: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = zones.len(), "list_zones: loaded");
        Ok(zones)
    }

    /// Insert a zone or replace the one with the same name
    pub fn upsert_zone(&mut self, zone: &DisasterZone) -> Result<(), StoreError> {
        debug!(name = %zone.name, "upsert_zone: called");
        zone.validate()?;
        self.conn.execute(
            "INSERT INTO disaster_zones (name, longitude, latitude, radius_km) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET longitude = excluded.longitude, latitude = excluded.latitude,
                 radius_km = excluded.radius_km",
            params![
                zone.name.trim(),
                zone.center.longitude,
                zone.center.latitude,
                zone.radius_km
            ],
        )?;
        info!(name = %zone.name, center = %zone.center, "Disaster zone saved");
        Ok(())
    }

    /// Remove a zone by name; returns whether one existed
    pub fn remove_zone(&mut self, name: &str) -> Result<bool, StoreError> {
        debug!(%name, "remove_zone: called");
        let removed = self
            .conn
            .execute("DELETE FROM disaster_zones WHERE name = ?1", params![name.trim()])?;
        Ok(removed > 0)
    }
}
