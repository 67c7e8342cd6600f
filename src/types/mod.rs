//! Shared data structures for the fleet data layer.
//!
//! One module per entity kind:
//! - [`truck`]: trucks and their create/update payloads
//! - [`telemetry`]: sensor samples (GPS/OBD/IMU/TPMS) and camera refs
//! - [`alert`]: alerts with the Triggered/Acknowledged/Resolved lifecycle
//! - [`ml`]: edge-model inference events
//! - [`health`]: device health snapshots and remediation actions
//! - [`ota`]: OTA updates and remote commands
//!
//! Plus the session/auth records consumed from the auth endpoints.

pub mod alert;
pub mod health;
pub mod ml;
pub mod ota;
pub mod telemetry;
pub mod truck;

pub use alert::{Alert, AlertAction, AlertSeverity, AlertStatus, AlertType};
pub use health::{
    HealthAlert, HealthState, HealthStatus, RemediationAction, ResourceUsage, TaskHealth,
};
pub use ml::{HardwareKind, MlEvent, MlResult, WeatherKind};
pub use ota::{
    CommandStatus, CommandType, CreateOtaUpdateRequest, CreateRemoteCommandRequest, OtaStatus,
    OtaUpdate, RemoteCommand, UpdatePriority, UpdateTarget,
};
pub use telemetry::{
    CameraBundle, CameraFrameRef, GpsReading, ImuReading, ObdReading, SensorBundle, TelemetryRecord,
    TireSensor, TpmsReading,
};
pub use truck::{CreateTruckRequest, Truck, TruckStatus, UpdateTruckRequest};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth (consumed as a capability; issuance is out of scope)
// ============================================================================

/// An authenticated dashboard user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Successful login: the bearer token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
