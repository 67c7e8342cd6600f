//! Controller lifecycle integration: optimistic mutations, last-write-wins
//! sequencing, error handling that keeps data, and event-bus merges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetdeck::api::{FleetApi, LocalApi};
use fleetdeck::bus::{EventBus, EventKind, ScriptedSource};
use fleetdeck::config::SeedConfig;
use fleetdeck::controllers::{AlertController, OtaController, TruckController};
use fleetdeck::error::ApiError;
use fleetdeck::query::{FilterSpec, PageRequest, SortSpec};
use fleetdeck::store::SessionStore;
use fleetdeck::transport::envelope::Paginated;
use fleetdeck::types::{
    Alert, AlertStatus, CommandStatus, CreateOtaUpdateRequest, CreateRemoteCommandRequest,
    CreateTruckRequest, HealthStatus, LoginResponse, MlEvent, OtaStatus, OtaUpdate, RemoteCommand,
    TelemetryRecord, Truck, UpdateTruckRequest, User,
};

fn seeded_api(trucks: usize, seed: u64) -> Arc<LocalApi> {
    let store = Arc::new(SessionStore::in_memory());
    Arc::new(
        LocalApi::seeded(
            store,
            &SeedConfig {
                truck_count: trucks,
                rng_seed: Some(seed),
            },
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn optimistic_acknowledge_lands_immediately() {
    let api = seeded_api(10, 31);
    let controller = AlertController::new(api);

    controller
        .fetch_list(
            &FilterSpec::new().equals("status", "Triggered"),
            None,
            PageRequest::new(1, 50),
        )
        .await;
    let triggered = controller.list().items;
    assert!(!triggered.is_empty(), "seed always yields triggered alerts");
    let target = &triggered[0];

    let confirmed = controller.acknowledge(&target.id).await.unwrap();
    assert_eq!(confirmed.status, AlertStatus::Acknowledged);

    // Immediately after the call returns, the controller's own record
    // carries the new status and a consistent timestamp.
    let in_memory = controller
        .list()
        .items
        .into_iter()
        .find(|a| a.id == target.id)
        .unwrap();
    assert_eq!(in_memory.status, AlertStatus::Acknowledged);
    let acked_at = in_memory.acknowledged_at.unwrap();
    assert!(acked_at >= in_memory.triggered_at);
    assert!(controller.list().error.is_none());
}

#[tokio::test]
async fn resolved_alert_cannot_be_reacknowledged() {
    let api = seeded_api(10, 32);
    let controller = AlertController::new(api);

    controller
        .fetch_list(
            &FilterSpec::new().equals("status", "Resolved"),
            None,
            PageRequest::new(1, 50),
        )
        .await;
    let resolved = controller.list().items;
    assert!(!resolved.is_empty());
    let target = resolved[0].clone();

    let outcome = controller.acknowledge(&target.id).await;
    assert!(outcome.is_none());

    // Status unchanged, validation surfaced, data intact.
    let unchanged = controller
        .list()
        .items
        .into_iter()
        .find(|a| a.id == target.id)
        .unwrap();
    assert_eq!(unchanged.status, AlertStatus::Resolved);
    assert!(controller.list().error.is_some());
    assert_eq!(controller.list().items.len(), resolved.len());
}

#[tokio::test]
async fn failed_refresh_keeps_last_known_good_data() {
    let api = seeded_api(5, 33);
    let controller = AlertController::new(api);

    controller
        .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 20))
        .await;
    let loaded = controller.list();
    assert!(!loaded.items.is_empty());

    // page_size 0 is rejected by the engine; the list must not empty out.
    controller
        .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 0))
        .await;

    let after = controller.list();
    assert_eq!(after.items.len(), loaded.items.len());
    assert!(!after.loading);
    assert!(after.error.is_some());
}

#[tokio::test]
async fn torn_down_controller_discards_results() {
    let api = seeded_api(5, 34);
    let controller = AlertController::new(api);

    controller.shutdown();
    controller
        .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 20))
        .await;

    let state = controller.list();
    assert!(state.items.is_empty());
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn truck_create_and_delete_flow_through_list_state() {
    let api = seeded_api(4, 35);
    let controller = TruckController::new(api);

    controller
        .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 50))
        .await;
    assert_eq!(controller.list().total, 4);

    let created = controller
        .create(CreateTruckRequest {
            make: "DAF".into(),
            model: "XF".into(),
            year: "2023".into(),
            license_plate: "NEW001".into(),
            vin: "VINNEW01".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let list = controller.list();
    assert_eq!(list.total, 5);
    assert_eq!(list.items.first().unwrap().id, created.id);

    assert!(controller.delete(&created.id).await);
    let list = controller.list();
    assert_eq!(list.total, 4);
    assert!(!controller.contains(&created.id));
}

#[tokio::test]
async fn ota_update_and_command_lifecycle_is_forward_only() {
    let api = seeded_api(3, 36);
    let controller = OtaController::new(api);

    let update = controller
        .create_update(CreateOtaUpdateRequest {
            truck_id: None,
            fleet_id: Some("fleet-7".into()),
            version: "2.4.1".into(),
            target: fleetdeck::types::UpdateTarget::Model,
            url: "https://updates.example.com/model.bin".into(),
            checksum: "sha256:feedc0de".into(),
            signature: "sig:x".into(),
            size_bytes: 4 * 1024 * 1024,
            priority: fleetdeck::types::UpdatePriority::High,
            requires_reboot: false,
            deadline: None,
        })
        .await
        .unwrap();
    assert_eq!(update.status, OtaStatus::Pending);

    let downloading = controller
        .advance_update(&update.id, OtaStatus::Downloading)
        .await
        .unwrap();
    assert_eq!(downloading.status, OtaStatus::Downloading);
    assert!(downloading.started_at.is_some());

    let done = controller
        .advance_update(&update.id, OtaStatus::Success)
        .await
        .unwrap();
    assert_eq!(done.progress_percent, 100.0);

    // Terminal means terminal.
    assert!(controller
        .advance_update(&update.id, OtaStatus::Pending)
        .await
        .is_none());

    let command = controller
        .create_command(CreateRemoteCommandRequest {
            truck_id: None,
            fleet_id: Some("fleet-7".into()),
            command_type: fleetdeck::types::CommandType::RunHealthCheck,
            parameters: serde_json::json!({"check_type": "full"}),
            deadline: None,
            requires_ack: true,
        })
        .await
        .unwrap();

    let cancelled = controller.cancel_command(&command.id).await.unwrap();
    assert_eq!(cancelled.status, CommandStatus::Cancelled);
    assert!(controller
        .advance_command(&command.id, CommandStatus::Executing)
        .await
        .is_none());
}

#[tokio::test]
async fn pushed_alert_merges_into_resolved_list_without_refetch() {
    let api = seeded_api(6, 37);
    let controller = Arc::new(AlertController::new(Arc::clone(&api) as Arc<dyn FleetApi>));
    let bus = EventBus::new(Arc::new(ScriptedSource::new(Vec::new())));
    let _subscription = controller.bind_to_bus(&bus);

    controller
        .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 10))
        .await;
    let before = controller.list();

    // A brand-new alert pushed from the server lands first in the list.
    let mut pushed = before.items[0].clone();
    pushed.id = "pushed-alert-1".to_string();
    pushed.alert_id = "ALERT-PUSHED01".to_string();
    bus.publish_local(EventKind::Alert, serde_json::to_value(&pushed).unwrap());

    let after = controller.list();
    assert_eq!(after.total, before.total + 1);
    assert_eq!(after.items.first().unwrap().id, "pushed-alert-1");

    // A push for an alert already on screen replaces it in place.
    let mut updated = before.items[1].clone();
    updated.message = "updated by push".to_string();
    bus.publish_local(EventKind::Alert, serde_json::to_value(&updated).unwrap());

    let merged = controller.list();
    assert_eq!(merged.total, before.total + 1);
    assert_eq!(
        merged
            .items
            .iter()
            .find(|a| a.id == updated.id)
            .unwrap()
            .message,
        "updated by push"
    );
}

// ============================================================================
// Last-write-wins under racing fetches
// ============================================================================

/// Test double: delays alert list calls by a per-call scripted duration so
/// an older call can resolve after a newer one.
struct RacingApi {
    inner: Arc<LocalApi>,
    delays: std::sync::Mutex<std::collections::VecDeque<Duration>>,
}

impl RacingApi {
    fn new(inner: Arc<LocalApi>, delays: Vec<Duration>) -> Self {
        Self {
            inner,
            delays: std::sync::Mutex::new(delays.into()),
        }
    }

    fn next_delay(&self) -> Duration {
        self.delays
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
impl FleetApi for RacingApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.inner.login(username, password).await
    }
    async fn validate_token(&self) -> Result<User, ApiError> {
        self.inner.validate_token().await
    }
    async fn list_trucks(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Truck>, ApiError> {
        self.inner.list_trucks(filter, sort, page).await
    }
    async fn get_truck(&self, id: &str) -> Result<Truck, ApiError> {
        self.inner.get_truck(id).await
    }
    async fn create_truck(&self, request: CreateTruckRequest) -> Result<Truck, ApiError> {
        self.inner.create_truck(request).await
    }
    async fn update_truck(
        &self,
        id: &str,
        request: UpdateTruckRequest,
    ) -> Result<Truck, ApiError> {
        self.inner.update_truck(id, request).await
    }
    async fn delete_truck(&self, id: &str) -> Result<(), ApiError> {
        self.inner.delete_truck(id).await
    }
    async fn truck_telemetry(
        &self,
        truck_id: &str,
        filter: &FilterSpec,
        page: PageRequest,
    ) -> Result<Paginated<TelemetryRecord>, ApiError> {
        self.inner.truck_telemetry(truck_id, filter, page).await
    }
    async fn list_alerts(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Alert>, ApiError> {
        tokio::time::sleep(self.next_delay()).await;
        self.inner.list_alerts(filter, sort, page).await
    }
    async fn get_alert(&self, id: &str) -> Result<Alert, ApiError> {
        self.inner.get_alert(id).await
    }
    async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<Alert, ApiError> {
        self.inner.set_alert_status(id, status).await
    }
    async fn list_ml_events(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<MlEvent>, ApiError> {
        self.inner.list_ml_events(filter, sort, page).await
    }
    async fn get_ml_event(&self, id: &str) -> Result<MlEvent, ApiError> {
        self.inner.get_ml_event(id).await
    }
    async fn list_health(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<HealthStatus>, ApiError> {
        self.inner.list_health(filter, sort, page).await
    }
    async fn get_health(&self, id: &str) -> Result<HealthStatus, ApiError> {
        self.inner.get_health(id).await
    }
    async fn list_ota_updates(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<OtaUpdate>, ApiError> {
        self.inner.list_ota_updates(filter, sort, page).await
    }
    async fn create_ota_update(
        &self,
        request: CreateOtaUpdateRequest,
    ) -> Result<OtaUpdate, ApiError> {
        self.inner.create_ota_update(request).await
    }
    async fn set_ota_status(&self, id: &str, status: OtaStatus) -> Result<OtaUpdate, ApiError> {
        self.inner.set_ota_status(id, status).await
    }
    async fn list_remote_commands(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<RemoteCommand>, ApiError> {
        self.inner.list_remote_commands(filter, sort, page).await
    }
    async fn create_remote_command(
        &self,
        request: CreateRemoteCommandRequest,
    ) -> Result<RemoteCommand, ApiError> {
        self.inner.create_remote_command(request).await
    }
    async fn set_command_status(
        &self,
        id: &str,
        status: CommandStatus,
    ) -> Result<RemoteCommand, ApiError> {
        self.inner.set_command_status(id, status).await
    }
}

#[tokio::test(start_paused = true)]
async fn latest_fetch_wins_even_when_an_older_call_resolves_later() {
    let local = seeded_api(10, 38);
    let racing = Arc::new(RacingApi::new(
        local,
        vec![Duration::from_millis(500), Duration::from_millis(10)],
    ));
    let controller = Arc::new(AlertController::new(
        Arc::clone(&racing) as Arc<dyn FleetApi>
    ));

    // First call is slow and asks for Critical alerts; second is fast and
    // asks for everything. The second is the latest call, so its result
    // must stick even though the first resolves afterwards.
    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .fetch_list(
                    &FilterSpec::new().equals("severity", "Critical"),
                    None,
                    PageRequest::new(1, 100),
                )
                .await;
        })
    };
    // Let the slow call register its ticket first.
    tokio::time::sleep(Duration::from_millis(1)).await;
    let fast = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .fetch_list(&FilterSpec::new(), None, PageRequest::new(1, 100))
                .await;
        })
    };

    fast.await.unwrap();
    slow.await.unwrap();

    let state = controller.list();
    assert!(!state.loading);
    // The unfiltered (latest) result won: severities beyond Critical are
    // present.
    assert!(state
        .items
        .iter()
        .any(|a| a.severity != fleetdeck::types::AlertSeverity::Critical));
}
