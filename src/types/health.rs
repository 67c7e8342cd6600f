//! Device health snapshots reported by on-truck agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

/// Overall health bucket for a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HealthState {
    Ok,
    Warning,
    Critical,
    Degraded,
    ShutdownPending,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Ok => "Ok",
            HealthState::Warning => "Warning",
            HealthState::Critical => "Critical",
            HealthState::Degraded => "Degraded",
            HealthState::ShutdownPending => "ShutdownPending",
        }
    }

    /// Derive the bucket from resource readings, using the shared
    /// thresholds. The generator calls this on the same draw that produced
    /// the readings, so a record's status always agrees with its numbers.
    pub fn from_resources(resources: &ResourceUsage) -> Self {
        let ResourceUsage {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: disk,
            temperature_c: temp,
            ..
        } = *resources;

        if cpu > defaults::HEALTH_CPU_CRITICAL
            || memory > defaults::HEALTH_MEMORY_CRITICAL
            || disk > defaults::HEALTH_DISK_CRITICAL
            || temp > defaults::HEALTH_TEMP_CRITICAL
        {
            HealthState::Critical
        } else if cpu > defaults::HEALTH_CPU_WARNING
            || memory > defaults::HEALTH_MEMORY_WARNING
            || disk > defaults::HEALTH_DISK_WARNING
            || temp > defaults::HEALTH_TEMP_WARNING
        {
            HealthState::Warning
        } else if cpu > defaults::HEALTH_CPU_DEGRADED
            || memory > defaults::HEALTH_MEMORY_DEGRADED
            || disk > defaults::HEALTH_DISK_DEGRADED
        {
            HealthState::Degraded
        } else {
            HealthState::Ok
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource snapshot backing a health record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub cpu_cores: u32,
    pub memory_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub swap_percent: f64,
    pub disk_percent: f64,
    pub disk_used_gb: u64,
    pub disk_total_gb: u64,
    pub disk_available_gb: u64,
    pub temperature_c: f64,
    pub thermal_throttling: bool,
    pub uptime_sec: u64,
    pub load_average: [f64; 3],
}

/// Per-engine liveness inside a health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHealth {
    pub name: String,
    pub is_alive: bool,
    pub last_seen_ms: u64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: u64,
    pub restarts: u32,
    pub last_restart: Option<DateTime<Utc>>,
}

/// A health-monitor alert embedded in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthAlert {
    pub alert_id: String,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub source: String,
    pub recommended_action: String,
}

/// A remediation the agent already applied (throttle FPS, disable a model,
/// schedule a reboot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemediationAction {
    pub action_id: String,
    pub action_type: String,
    pub target_module: String,
    pub parameters: serde_json::Value,
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
}

/// One health snapshot from a truck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub id: String,
    pub truck_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: HealthState,
    pub resources: ResourceUsage,
    pub tasks: Vec<TaskHealth>,
    pub alerts: Vec<HealthAlert>,
    pub actions_taken: Vec<RemediationAction>,
    pub created_at: DateTime<Utc>,
}

impl Entity for HealthStatus {
    const KIND: EntityKind = EntityKind::HealthStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        Some(&self.truck_id)
    }
}

impl Queryable for HealthStatus {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => Some(FieldValue::Str(&self.truck_id)),
            "status" => Some(FieldValue::Str(self.status.as_str())),
            "timestamp" => Some(FieldValue::Time(self.timestamp)),
            "cpu_percent" => Some(FieldValue::F64(self.resources.cpu_percent)),
            "memory_percent" => Some(FieldValue::F64(self.resources.memory_percent)),
            "disk_percent" => Some(FieldValue::F64(self.resources.disk_percent)),
            "temperature_c" => Some(FieldValue::F64(self.resources.temperature_c)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources(cpu: f64, memory: f64, disk: f64, temp: f64) -> ResourceUsage {
        ResourceUsage {
            cpu_percent: cpu,
            cpu_cores: 4,
            memory_percent: memory,
            memory_used_mb: 2048,
            memory_total_mb: 4096,
            memory_available_mb: 2048,
            swap_percent: 10.0,
            disk_percent: disk,
            disk_used_gb: 100,
            disk_total_gb: 200,
            disk_available_gb: 100,
            temperature_c: temp,
            thermal_throttling: false,
            uptime_sec: 3600,
            load_average: [1.0, 0.8, 0.6],
        }
    }

    #[test]
    fn bucket_is_critical_when_any_critical_threshold_exceeded() {
        assert_eq!(
            HealthState::from_resources(&resources(90.0, 40.0, 50.0, 40.0)),
            HealthState::Critical
        );
        assert_eq!(
            HealthState::from_resources(&resources(40.0, 40.0, 95.0, 40.0)),
            HealthState::Critical
        );
    }

    #[test]
    fn bucket_degrades_before_warning_thresholds() {
        assert_eq!(
            HealthState::from_resources(&resources(70.0, 40.0, 50.0, 40.0)),
            HealthState::Degraded
        );
        assert_eq!(
            HealthState::from_resources(&resources(78.0, 40.0, 50.0, 40.0)),
            HealthState::Warning
        );
        assert_eq!(
            HealthState::from_resources(&resources(40.0, 40.0, 50.0, 40.0)),
            HealthState::Ok
        );
    }
}
