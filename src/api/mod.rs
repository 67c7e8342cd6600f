//! The abstract REST surface consumed by entity controllers.
//!
//! [`FleetApi`] is the seam between controllers and whatever actually
//! answers requests:
//! - [`LocalApi`]: session store + query engine (the reference backend
//!   that stands in for a server)
//! - [`RestApi`]: transport gateway round trips against a real deployment
//!
//! Controllers hold an `Arc<dyn FleetApi>` and never know which one they
//! are talking to.

pub mod local;
pub mod rest;

pub use local::LocalApi;
pub use rest::RestApi;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::transport::envelope::Paginated;
use crate::types::{
    Alert, AlertStatus, CommandStatus, CreateOtaUpdateRequest, CreateRemoteCommandRequest,
    CreateTruckRequest, HealthStatus, LoginResponse, MlEvent, OtaStatus, OtaUpdate, RemoteCommand,
    TelemetryRecord, Truck, UpdateTruckRequest, User,
};

/// Everything the dashboard can ask of the backend.
#[async_trait]
pub trait FleetApi: Send + Sync {
    // ------------------------------------------------------------------
    // Session bootstrap (consumed as a capability; issuance out of scope)
    // ------------------------------------------------------------------
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn validate_token(&self) -> Result<User, ApiError>;

    // ------------------------------------------------------------------
    // Trucks
    // ------------------------------------------------------------------
    async fn list_trucks(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Truck>, ApiError>;
    async fn get_truck(&self, id: &str) -> Result<Truck, ApiError>;
    async fn create_truck(&self, request: CreateTruckRequest) -> Result<Truck, ApiError>;
    async fn update_truck(
        &self,
        id: &str,
        request: UpdateTruckRequest,
    ) -> Result<Truck, ApiError>;
    async fn delete_truck(&self, id: &str) -> Result<(), ApiError>;

    // ------------------------------------------------------------------
    // Telemetry (always scoped to one truck)
    // ------------------------------------------------------------------
    async fn truck_telemetry(
        &self,
        truck_id: &str,
        filter: &FilterSpec,
        page: PageRequest,
    ) -> Result<Paginated<TelemetryRecord>, ApiError>;

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------
    async fn list_alerts(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Alert>, ApiError>;
    async fn get_alert(&self, id: &str) -> Result<Alert, ApiError>;
    async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<Alert, ApiError>;

    // ------------------------------------------------------------------
    // ML events
    // ------------------------------------------------------------------
    async fn list_ml_events(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<MlEvent>, ApiError>;
    async fn get_ml_event(&self, id: &str) -> Result<MlEvent, ApiError>;

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------
    async fn list_health(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<HealthStatus>, ApiError>;
    async fn get_health(&self, id: &str) -> Result<HealthStatus, ApiError>;

    // ------------------------------------------------------------------
    // OTA updates
    // ------------------------------------------------------------------
    async fn list_ota_updates(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<OtaUpdate>, ApiError>;
    async fn create_ota_update(
        &self,
        request: CreateOtaUpdateRequest,
    ) -> Result<OtaUpdate, ApiError>;
    async fn set_ota_status(&self, id: &str, status: OtaStatus) -> Result<OtaUpdate, ApiError>;

    // ------------------------------------------------------------------
    // Remote commands
    // ------------------------------------------------------------------
    async fn list_remote_commands(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<RemoteCommand>, ApiError>;
    async fn create_remote_command(
        &self,
        request: CreateRemoteCommandRequest,
    ) -> Result<RemoteCommand, ApiError>;
    async fn set_command_status(
        &self,
        id: &str,
        status: CommandStatus,
    ) -> Result<RemoteCommand, ApiError>;
}
