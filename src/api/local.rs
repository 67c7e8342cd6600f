//! Reference backend: the session store plus the query engine, standing in
//! for a server.
//!
//! This backend never rejects a well-formed mutation, which is why
//! controller-side optimistic rollback degenerates to a no-op against it.
//! Status transitions are still validated here so the forward-only graphs
//! hold no matter which backend is wired.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::config::SeedConfig;
use crate::error::ApiError;
use crate::generator::FleetGenerator;
use crate::query::{query, FilterSpec, PageRequest, SortSpec};
use crate::store::{SessionStore, StoreError};
use crate::transport::envelope::Paginated;
use crate::types::{
    Alert, AlertStatus, CommandStatus, CreateOtaUpdateRequest, CreateRemoteCommandRequest,
    CreateTruckRequest, HealthStatus, LoginResponse, MlEvent, OtaStatus, OtaUpdate, RemoteCommand,
    TelemetryRecord, Truck, TruckStatus, UpdateTruckRequest, User,
};

use super::FleetApi;

/// Store-backed reference implementation of [`FleetApi`].
pub struct LocalApi {
    store: Arc<SessionStore>,
    generator: Mutex<FleetGenerator>,
}

impl LocalApi {
    /// Wrap an existing (possibly already seeded) store.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            generator: Mutex::new(FleetGenerator::new()),
        }
    }

    /// Wrap a store, seeding it first when this session has not been
    /// seeded yet.
    pub fn seeded(store: Arc<SessionStore>, config: &SeedConfig) -> Result<Self, ApiError> {
        let mut generator = FleetGenerator::from_config(config);
        generator
            .seed_session(&store, config.truck_count)
            .map_err(store_error)?;
        Ok(Self {
            store,
            generator: Mutex::new(generator),
        })
    }

    /// The backing store, shared with the event-merge path.
    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    fn list_page<T>(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<T>, ApiError>
    where
        T: crate::store::Entity + crate::query::Queryable,
    {
        let items = self.store.list::<T>().map_err(store_error)?;
        query(&items, filter, sort, page)
    }

    fn require<T: crate::store::Entity>(&self, id: &str, what: &str) -> Result<T, ApiError> {
        self.store
            .get_by_id::<T>(id)
            .map_err(store_error)?
            .ok_or_else(|| ApiError::NotFound(format!("{what} {id} not found")))
    }
}

fn store_error(error: StoreError) -> ApiError {
    ApiError::Unknown(error.to_string())
}

fn transition_error(what: &str, from: &str, to: &str) -> ApiError {
    ApiError::Validation(format!("{what} cannot move from {from} to {to}"))
}

#[async_trait]
impl FleetApi for LocalApi {
    // The reference backend accepts any credentials; token issuance is a
    // real deployment's concern.
    async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            name: username.to_string(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        };
        Ok(LoginResponse {
            token: format!("local-token-{}", Uuid::new_v4()),
            user,
        })
    }

    async fn validate_token(&self) -> Result<User, ApiError> {
        Ok(User {
            id: Uuid::new_v4().to_string(),
            username: "operator".to_string(),
            name: "operator".to_string(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        })
    }

    async fn list_trucks(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Truck>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn get_truck(&self, id: &str) -> Result<Truck, ApiError> {
        self.require(id, "truck")
    }

    async fn create_truck(&self, request: CreateTruckRequest) -> Result<Truck, ApiError> {
        let existing = self.store.list::<Truck>().map_err(store_error)?;
        let now = Utc::now();
        let truck = Truck {
            id: Uuid::new_v4().to_string(),
            truck_id: format!("TRK-{:04}", existing.len() + 1),
            make: request.make,
            model: request.model,
            year: request.year,
            license_plate: request.license_plate,
            vin: request.vin,
            fleet_id: request.fleet_id,
            driver_id: None,
            status: request.status.unwrap_or(TruckStatus::Offline),
            last_seen: now,
            location: request.location.unwrap_or((-122.4194, 37.7749)),
            created_at: now,
            updated_at: now,
        };
        let truck = self.store.upsert(truck).map_err(store_error)?;

        // A new truck immediately has a telemetry trail, like the rest of
        // the fleet.
        let samples = {
            let mut generator = self
                .generator
                .lock()
                .map_err(|e| ApiError::Unknown(e.to_string()))?;
            generator.telemetry_for_truck(&truck)
        };
        let mut telemetry = self.store.list::<TelemetryRecord>().map_err(store_error)?;
        telemetry.extend(samples);
        self.store.replace(&telemetry).map_err(store_error)?;

        debug!(truck_id = %truck.truck_id, "Truck created");
        Ok(truck)
    }

    async fn update_truck(
        &self,
        id: &str,
        request: UpdateTruckRequest,
    ) -> Result<Truck, ApiError> {
        let mut truck: Truck = self.require(id, "truck")?;
        truck.apply_update(&request);
        self.store.upsert(truck).map_err(store_error)
    }

    async fn delete_truck(&self, id: &str) -> Result<(), ApiError> {
        if !self.store.remove::<Truck>(id).map_err(store_error)? {
            return Err(ApiError::NotFound(format!("truck {id} not found")));
        }
        // Cascade: historical records for a deleted truck go with it, so
        // every remaining truck reference still resolves.
        self.store
            .remove_by_truck::<TelemetryRecord>(id)
            .map_err(store_error)?;
        self.store.remove_by_truck::<Alert>(id).map_err(store_error)?;
        self.store.remove_by_truck::<MlEvent>(id).map_err(store_error)?;
        self.store
            .remove_by_truck::<HealthStatus>(id)
            .map_err(store_error)?;
        debug!(truck = id, "Truck deleted with dependent records");
        Ok(())
    }

    async fn truck_telemetry(
        &self,
        truck_id: &str,
        filter: &FilterSpec,
        page: PageRequest,
    ) -> Result<Paginated<TelemetryRecord>, ApiError> {
        let scoped = filter.clone().equals("truck_id", truck_id);
        self.list_page(&scoped, None, page)
    }

    async fn list_alerts(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Alert>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, ApiError> {
        self.require(id, "alert")
    }

    async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<Alert, ApiError> {
        let mut alert: Alert = self.require(id, "alert")?;
        if !alert.advance(status, Utc::now()) {
            return Err(transition_error(
                "alert",
                alert.status.as_str(),
                status.as_str(),
            ));
        }
        self.store.upsert(alert).map_err(store_error)
    }

    async fn list_ml_events(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<MlEvent>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn get_ml_event(&self, id: &str) -> Result<MlEvent, ApiError> {
        self.require(id, "ml event")
    }

    async fn list_health(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<HealthStatus>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn get_health(&self, id: &str) -> Result<HealthStatus, ApiError> {
        self.require(id, "health snapshot")
    }

    async fn list_ota_updates(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<OtaUpdate>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn create_ota_update(
        &self,
        request: CreateOtaUpdateRequest,
    ) -> Result<OtaUpdate, ApiError> {
        if let Some(truck_id) = &request.truck_id {
            self.require::<Truck>(truck_id, "truck")?;
        }
        let now = Utc::now();
        let update = OtaUpdate {
            id: Uuid::new_v4().to_string(),
            update_id: format!("UPDATE-{}", &Uuid::new_v4().simple().to_string()[..8]),
            truck_id: request.truck_id,
            fleet_id: request.fleet_id,
            version: request.version,
            target: request.target,
            url: request.url,
            checksum: request.checksum,
            signature: request.signature,
            size_bytes: request.size_bytes,
            priority: request.priority,
            requires_reboot: request.requires_reboot,
            deadline: request.deadline,
            status: OtaStatus::Pending,
            progress_percent: 0.0,
            started_at: None,
            completed_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(update).map_err(store_error)
    }

    async fn set_ota_status(&self, id: &str, status: OtaStatus) -> Result<OtaUpdate, ApiError> {
        let mut update: OtaUpdate = self.require(id, "OTA update")?;
        if !update.advance(status, Utc::now()) {
            return Err(transition_error(
                "OTA update",
                update.status.as_str(),
                status.as_str(),
            ));
        }
        self.store.upsert(update).map_err(store_error)
    }

    async fn list_remote_commands(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<RemoteCommand>, ApiError> {
        self.list_page(filter, sort, page)
    }

    async fn create_remote_command(
        &self,
        request: CreateRemoteCommandRequest,
    ) -> Result<RemoteCommand, ApiError> {
        if let Some(truck_id) = &request.truck_id {
            self.require::<Truck>(truck_id, "truck")?;
        }
        let now = Utc::now();
        let command = RemoteCommand {
            id: Uuid::new_v4().to_string(),
            command_id: format!("CMD-{}", &Uuid::new_v4().simple().to_string()[..8]),
            truck_id: request.truck_id,
            fleet_id: request.fleet_id,
            command_type: request.command_type,
            parameters: request.parameters,
            issued_at: now,
            deadline: request.deadline,
            requires_ack: request.requires_ack,
            status: CommandStatus::Pending,
            result: None,
            error: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(command).map_err(store_error)
    }

    async fn set_command_status(
        &self,
        id: &str,
        status: CommandStatus,
    ) -> Result<RemoteCommand, ApiError> {
        let mut command: RemoteCommand = self.require(id, "remote command")?;
        if !command.advance(status, Utc::now()) {
            return Err(transition_error(
                "remote command",
                command.status.as_str(),
                status.as_str(),
            ));
        }
        self.store.upsert(command).map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDir;

    fn seeded_api() -> LocalApi {
        let store = Arc::new(SessionStore::in_memory());
        LocalApi::seeded(
            store,
            &SeedConfig {
                truck_count: 10,
                rng_seed: Some(11),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_trucks_paginates() {
        let api = seeded_api();
        let page = api
            .list_trucks(&FilterSpec::new(), None, PageRequest::new(1, 4))
            .await
            .unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.data.len(), 4);

        let last = api
            .list_trucks(&FilterSpec::new(), None, PageRequest::new(3, 4))
            .await
            .unwrap();
        assert_eq!(last.data.len(), 2);
    }

    #[tokio::test]
    async fn get_truck_not_found_maps_to_taxonomy() {
        let api = seeded_api();
        let err = api.get_truck("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_truck_appends_and_generates_telemetry() {
        let api = seeded_api();
        let before = api
            .truck_telemetry("none", &FilterSpec::new(), PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(before.total, 0);

        let truck = api
            .create_truck(CreateTruckRequest {
                make: "Scania".into(),
                model: "R-series".into(),
                year: "2023".into(),
                license_plate: "NEW001".into(),
                vin: "VINNEW".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(truck.truck_id, "TRK-0011");
        assert_eq!(truck.status, TruckStatus::Offline);

        let telemetry = api
            .truck_telemetry(&truck.id, &FilterSpec::new(), PageRequest::new(1, 100))
            .await
            .unwrap();
        assert!(telemetry.total > 0);
    }

    #[tokio::test]
    async fn delete_truck_cascades_dependents() {
        let api = seeded_api();
        let truck = api
            .list_trucks(&FilterSpec::new(), None, PageRequest::new(1, 1))
            .await
            .unwrap()
            .data
            .remove(0);

        api.delete_truck(&truck.id).await.unwrap();

        let alerts = api
            .list_alerts(
                &FilterSpec::new().equals("truck_id", truck.id.clone()),
                None,
                PageRequest::new(1, 100),
            )
            .await
            .unwrap();
        assert_eq!(alerts.total, 0);

        let err = api.get_truck(&truck.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_alert_transition_is_validation() {
        let api = seeded_api();
        // Find a resolved alert from the seed.
        let resolved = api
            .list_alerts(
                &FilterSpec::new().equals("status", "Resolved"),
                None,
                PageRequest::new(1, 1),
            )
            .await
            .unwrap()
            .data
            .remove(0);

        let err = api
            .set_alert_status(&resolved.id, AlertStatus::Acknowledged)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn sort_threads_through_to_the_engine() {
        let api = seeded_api();
        let sorted = api
            .list_trucks(
                &FilterSpec::new(),
                Some(&SortSpec {
                    field: "truck_id".into(),
                    dir: SortDir::Desc,
                }),
                PageRequest::new(1, 10),
            )
            .await
            .unwrap();
        assert_eq!(sorted.data.first().unwrap().truck_id, "TRK-0010");
    }

    #[tokio::test]
    async fn create_command_starts_pending_and_advances_forward_only() {
        let api = seeded_api();
        let command = api
            .create_remote_command(CreateRemoteCommandRequest {
                truck_id: None,
                fleet_id: Some("fleet-1".into()),
                command_type: crate::types::CommandType::Reboot,
                parameters: serde_json::json!({"delay_seconds": 30}),
                deadline: None,
                requires_ack: false,
            })
            .await
            .unwrap();
        assert_eq!(command.status, CommandStatus::Pending);

        let executing = api
            .set_command_status(&command.id, CommandStatus::Executing)
            .await
            .unwrap();
        assert_eq!(executing.status, CommandStatus::Executing);

        let err = api
            .set_command_status(&command.id, CommandStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
