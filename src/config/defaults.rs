//! System-wide default constants.
//!
//! Centralises magic numbers used across the data layer.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Transport Gateway
// ============================================================================

/// Fixed timeout for outbound requests (seconds). Expiry maps to
/// `ApiError::Timeout`, distinct from network and authorization failures.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default page size for entity list queries.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default page size for telemetry queries (denser data, bigger pages).
pub const TELEMETRY_PAGE_SIZE: usize = 50;

// ============================================================================
// Event Bus
// ============================================================================

/// Base reconnect delay (milliseconds). Doubles per consecutive failure.
pub const BUS_RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Exponent cap for the reconnect backoff shift.
pub const BUS_MAX_BACKOFF_EXPONENT: u32 = 5;

/// Hard ceiling on a single reconnect delay (milliseconds).
pub const BUS_RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Consecutive failed connection attempts before the bus gives up and
/// stays Disconnected until an explicit reconnect.
pub const BUS_MAX_RECONNECT_ATTEMPTS: u32 = 5;

// ============================================================================
// Entity Generator
// ============================================================================

/// Trucks created by a default session seed.
pub const SEED_TRUCK_COUNT: usize = 10;

/// Telemetry points per truck, covering the trailing 24 h window.
pub const TELEMETRY_POINTS_PER_TRUCK: usize = 50;

/// Minutes between consecutive telemetry points.
pub const TELEMETRY_CADENCE_MINS: i64 = 30;

/// Alerts per truck: `MIN + rand(0..=SPREAD)` yields 5–15.
pub const ALERTS_PER_TRUCK_MIN: usize = 5;
pub const ALERTS_PER_TRUCK_SPREAD: usize = 10;

/// ML events per truck: 10–30.
pub const ML_EVENTS_PER_TRUCK_MIN: usize = 10;
pub const ML_EVENTS_PER_TRUCK_SPREAD: usize = 20;

/// Health records per truck: 5–15.
pub const HEALTH_PER_TRUCK_MIN: usize = 5;
pub const HEALTH_PER_TRUCK_SPREAD: usize = 10;

/// Fleet-wide OTA updates: 5–15.
pub const OTA_UPDATES_MIN: usize = 5;
pub const OTA_UPDATES_SPREAD: usize = 10;

/// Fleet-wide remote commands: 10–20.
pub const REMOTE_COMMANDS_MIN: usize = 10;
pub const REMOTE_COMMANDS_SPREAD: usize = 10;

/// Probability that an OTA update or remote command targets the whole
/// fleet rather than a small truck subset.
pub const FLEET_WIDE_TARGET_PROBABILITY: f64 = 0.3;

// ============================================================================
// Health Status Buckets
// ============================================================================
//
// A generated record's status bucket is derived from the same draw that
// produced its resource percentages, so displayed status always agrees
// with the numbers on the record.

/// Critical thresholds: any one exceeded puts the record in Critical.
pub const HEALTH_CPU_CRITICAL: f64 = 85.0;
pub const HEALTH_MEMORY_CRITICAL: f64 = 85.0;
pub const HEALTH_DISK_CRITICAL: f64 = 90.0;
pub const HEALTH_TEMP_CRITICAL: f64 = 75.0;

/// Warning thresholds.
pub const HEALTH_CPU_WARNING: f64 = 75.0;
pub const HEALTH_MEMORY_WARNING: f64 = 75.0;
pub const HEALTH_DISK_WARNING: f64 = 80.0;
pub const HEALTH_TEMP_WARNING: f64 = 65.0;

/// Degraded thresholds (temperature does not degrade on its own).
pub const HEALTH_CPU_DEGRADED: f64 = 65.0;
pub const HEALTH_MEMORY_DEGRADED: f64 = 65.0;
pub const HEALTH_DISK_DEGRADED: f64 = 70.0;

/// Thermal throttling reported above this board temperature (celsius).
pub const HEALTH_THROTTLE_TEMP: f64 = 80.0;
