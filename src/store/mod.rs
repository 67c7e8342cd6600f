//! Session-scoped entity store: named collections, one per entity kind.
//!
//! The store is the single shared mutable resource in the data layer. Each
//! collection is persisted as a JSON array under one key, plus a boolean
//! seeded marker, so a persistent backing survives reloads of the same
//! session. Writes to a collection are serialized behind a per-collection
//! mutex; readers always observe a fully committed collection.

pub mod backend;

pub use backend::{MemoryBackend, SledBackend, StoreBackend};

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    /// An upsert attempted to change a field the store guards (identifier
    /// or truck reference).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// The six persisted entity collections (telemetry and health are
/// historical, the rest are mutable registries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Trucks,
    Telemetry,
    Alerts,
    MlEvents,
    HealthStatus,
    OtaUpdates,
    RemoteCommands,
}

impl EntityKind {
    /// Storage key for this collection.
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Trucks => "trucks",
            EntityKind::Telemetry => "telemetry",
            EntityKind::Alerts => "alerts",
            EntityKind::MlEvents => "mlEvents",
            EntityKind::HealthStatus => "healthStatus",
            EntityKind::OtaUpdates => "otaUpdates",
            EntityKind::RemoteCommands => "remoteCommands",
        }
    }

    pub const ALL: [EntityKind; 7] = [
        EntityKind::Trucks,
        EntityKind::Telemetry,
        EntityKind::Alerts,
        EntityKind::MlEvents,
        EntityKind::HealthStatus,
        EntityKind::OtaUpdates,
        EntityKind::RemoteCommands,
    ];

    fn index(self) -> usize {
        match self {
            EntityKind::Trucks => 0,
            EntityKind::Telemetry => 1,
            EntityKind::Alerts => 2,
            EntityKind::MlEvents => 3,
            EntityKind::HealthStatus => 4,
            EntityKind::OtaUpdates => 5,
            EntityKind::RemoteCommands => 6,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A record the store can hold: serializable, owned, and aware of its own
/// collection, identifier, and (when not fleet-wide) truck reference.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// The truck this record belongs to, `None` for trucks themselves and
    /// for fleet-wide OTA updates / remote commands.
    fn truck_ref(&self) -> Option<&str>;
}

/// Marker key recording that the session has already been seeded.
const SEEDED_KEY: &str = "fleetDataInitialized";

/// The session store: typed collection operations over a pluggable
/// key/value backing.
pub struct SessionStore {
    backend: Box<dyn StoreBackend>,
    /// One write lock per collection, indexed by `EntityKind::index`.
    collection_locks: [Mutex<()>; 7],
    marker_lock: Mutex<()>,
}

impl SessionStore {
    /// Create a store over the given backing.
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        debug!(backend = backend.name(), "Session store opened");
        Self {
            backend,
            collection_locks: Default::default(),
            marker_lock: Mutex::new(()),
        }
    }

    /// Convenience constructor for an in-memory session.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Read a whole collection. An absent key reads as an empty collection.
    pub fn list<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
        match self.backend.read(T::KIND.key())? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Find one record by identifier.
    pub fn get_by_id<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.list::<T>()?.into_iter().find(|r| r.id() == id))
    }

    /// Replace a whole collection.
    pub fn replace<T: Entity>(&self, items: &[T]) -> Result<(), StoreError> {
        let _guard = self.lock_collection(T::KIND)?;
        self.write_collection(T::KIND, items)
    }

    /// Merge one record into its collection by identifier, appending when
    /// absent. The identifier and truck reference of an existing record are
    /// guarded: a patch that disagrees is rejected without mutating
    /// anything.
    pub fn upsert<T: Entity>(&self, record: T) -> Result<T, StoreError> {
        let _guard = self.lock_collection(T::KIND)?;
        let mut items = self.list::<T>()?;

        match items.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => {
                if existing.truck_ref() != record.truck_ref() {
                    return Err(StoreError::InvariantViolation(format!(
                        "upsert of {} {} would change its truck reference",
                        T::KIND,
                        record.id(),
                    )));
                }
                *existing = record.clone();
            }
            None => items.push(record.clone()),
        }

        self.write_collection(T::KIND, &items)?;
        Ok(record)
    }

    /// Remove one record by identifier. Returns whether it existed.
    pub fn remove<T: Entity>(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock_collection(T::KIND)?;
        let mut items = self.list::<T>()?;
        let before = items.len();
        items.retain(|r| r.id() != id);
        let removed = items.len() != before;
        if removed {
            self.write_collection(T::KIND, &items)?;
        }
        Ok(removed)
    }

    /// Remove every record in a collection that references the given truck.
    /// Returns the number removed.
    pub fn remove_by_truck<T: Entity>(&self, truck_id: &str) -> Result<usize, StoreError> {
        let _guard = self.lock_collection(T::KIND)?;
        let mut items = self.list::<T>()?;
        let before = items.len();
        items.retain(|r| r.truck_ref() != Some(truck_id));
        let removed = before - items.len();
        if removed > 0 {
            self.write_collection(T::KIND, &items)?;
        }
        Ok(removed)
    }

    /// Whether this session has already been seeded.
    pub fn seeded(&self) -> Result<bool, StoreError> {
        Ok(self.backend.read(SEEDED_KEY)?.as_deref() == Some("true"))
    }

    /// Set the seeded marker.
    pub fn set_seeded(&self) -> Result<(), StoreError> {
        let _guard = self
            .marker_lock
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.backend.write(SEEDED_KEY, "true")
    }

    /// Clear every collection and the seeded marker. The next seed call
    /// regenerates the session from scratch.
    pub fn reset(&self) -> Result<(), StoreError> {
        for kind in EntityKind::ALL {
            let _guard = self.lock_collection(kind)?;
            self.backend.delete(kind.key())?;
        }
        let _guard = self
            .marker_lock
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.backend.delete(SEEDED_KEY)?;
        debug!("Session store reset");
        Ok(())
    }

    fn lock_collection(
        &self,
        kind: EntityKind,
    ) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.collection_locks[kind.index()]
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn write_collection<T: Entity>(&self, kind: EntityKind, items: &[T]) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(items).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.backend.write(kind.key(), &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Truck, TruckStatus};
    use chrono::Utc;

    fn make_truck(id: &str, status: TruckStatus) -> Truck {
        Truck {
            id: id.to_string(),
            truck_id: format!("TRK-{id}"),
            make: "Volvo".into(),
            model: "FH16".into(),
            year: "2022".into(),
            license_plate: "TRK001A".into(),
            vin: format!("VIN-{id}"),
            fleet_id: None,
            driver_id: None,
            status,
            last_seen: Utc::now(),
            location: (-122.4194, 37.7749),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn list_of_absent_collection_is_empty() {
        let store = SessionStore::in_memory();
        assert!(store.list::<Truck>().unwrap().is_empty());
    }

    #[test]
    fn upsert_creates_then_merges() {
        let store = SessionStore::in_memory();

        store.upsert(make_truck("t-1", TruckStatus::Offline)).unwrap();
        assert_eq!(store.list::<Truck>().unwrap().len(), 1);

        store.upsert(make_truck("t-1", TruckStatus::Online)).unwrap();
        let trucks = store.list::<Truck>().unwrap();
        assert_eq!(trucks.len(), 1);
        assert_eq!(trucks[0].status, TruckStatus::Online);
    }

    #[test]
    fn upsert_preserves_insertion_order() {
        let store = SessionStore::in_memory();
        for id in ["t-1", "t-2", "t-3"] {
            store.upsert(make_truck(id, TruckStatus::Offline)).unwrap();
        }
        store.upsert(make_truck("t-2", TruckStatus::Online)).unwrap();

        let ids: Vec<String> = store
            .list::<Truck>()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t-1", "t-2", "t-3"]);
    }

    #[test]
    fn upsert_guards_truck_reference() {
        use crate::types::{Alert, AlertSeverity, AlertStatus, AlertType};

        let store = SessionStore::in_memory();
        let now = Utc::now();
        let alert = Alert {
            id: "a-1".into(),
            alert_id: "ALERT-1".into(),
            truck_id: "t-1".into(),
            alert_type: AlertType::HarshBraking,
            severity: AlertSeverity::Warning,
            message: "Harsh braking detected".into(),
            triggered_at: now,
            acknowledged_at: None,
            resolved_at: None,
            source: "test".into(),
            context: serde_json::json!({}),
            actions: Vec::new(),
            status: AlertStatus::Triggered,
            created_at: now,
            updated_at: now,
        };
        store.upsert(alert.clone()).unwrap();

        let mut moved = alert;
        moved.truck_id = "t-9".into();
        let err = store.upsert(moved).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));

        // Original record untouched
        let stored: Alert = store.get_by_id("a-1").unwrap().unwrap();
        assert_eq!(stored.truck_id, "t-1");
    }

    #[test]
    fn reset_clears_collections_and_marker() {
        let store = SessionStore::in_memory();
        store.upsert(make_truck("t-1", TruckStatus::Online)).unwrap();
        store.set_seeded().unwrap();
        assert!(store.seeded().unwrap());

        store.reset().unwrap();
        assert!(!store.seeded().unwrap());
        assert!(store.list::<Truck>().unwrap().is_empty());
    }
}
