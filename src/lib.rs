//! Fleetdeck: client-side data layer for fleet telemetry dashboards
//!
//! Everything between the UI widgets and the wire lives here:
//!
//! - **Entity Generator**: seeds an internally consistent synthetic fleet
//!   (trucks, telemetry, alerts, ML events, health, OTA, commands)
//! - **Session Store**: named collections over a pluggable key/value
//!   backing (in-memory or sled)
//! - **Query Engine**: one filter → sort → paginate pipeline for every
//!   entity list
//! - **Event Bus**: reconnecting publish/subscribe channel for server
//!   pushes, with bounded exponential backoff
//! - **Transport Gateway**: authenticated outbound calls with centralized
//!   401 handling
//! - **Entity Controllers**: `{data, loading, error}` state machines with
//!   optimistic mutations and last-write-wins call sequencing

pub mod api;
pub mod bus;
pub mod config;
pub mod controllers;
pub mod error;
pub mod generator;
pub mod query;
pub mod store;
pub mod transport;
pub mod types;

// Re-export the one-stop surface an embedding dashboard needs.
pub use api::{FleetApi, LocalApi, RestApi};
pub use bus::{BusState, EventBus, EventKind, EventMessage, Subscription};
pub use config::FleetConfig;
pub use controllers::{
    AlertController, DetailState, HealthController, ListState, MlEventController, OtaController,
    TelemetryController, TruckController,
};
pub use error::ApiError;
pub use generator::{FleetGenerator, SeedSummary};
pub use query::{FilterSpec, PageRequest, Predicate, SortDir, SortSpec};
pub use store::{MemoryBackend, SessionStore, SledBackend, StoreBackend};
pub use transport::envelope::{ApiEnvelope, Paginated};
pub use transport::Gateway;

/// Install a default tracing subscriber for embedders that have not set
/// one up themselves. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
