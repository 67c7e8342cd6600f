//! Alerts raised by on-truck agents, with a forward-only status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

/// What fired the alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AlertType {
    DrowsyDriver,
    LaneDeparture,
    CargoTamper,
    HarshBraking,
    RapidAcceleration,
    OverSpeeding,
    HighTemperature,
    LowDiskSpace,
    HighCpuUsage,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::DrowsyDriver => "DrowsyDriver",
            AlertType::LaneDeparture => "LaneDeparture",
            AlertType::CargoTamper => "CargoTamper",
            AlertType::HarshBraking => "HarshBraking",
            AlertType::RapidAcceleration => "RapidAcceleration",
            AlertType::OverSpeeding => "OverSpeeding",
            AlertType::HighTemperature => "HighTemperature",
            AlertType::LowDiskSpace => "LowDiskSpace",
            AlertType::HighCpuUsage => "HighCpuUsage",
        }
    }

    pub const ALL: [AlertType; 9] = [
        AlertType::DrowsyDriver,
        AlertType::LaneDeparture,
        AlertType::CargoTamper,
        AlertType::HarshBraking,
        AlertType::RapidAcceleration,
        AlertType::OverSpeeding,
        AlertType::HighTemperature,
        AlertType::LowDiskSpace,
        AlertType::HighCpuUsage,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "Info",
            AlertSeverity::Warning => "Warning",
            AlertSeverity::Critical => "Critical",
            AlertSeverity::Emergency => "Emergency",
        }
    }

    pub const ALL: [AlertSeverity; 4] = [
        AlertSeverity::Info,
        AlertSeverity::Warning,
        AlertSeverity::Critical,
        AlertSeverity::Emergency,
    ];
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert lifecycle: `Triggered → Acknowledged → Resolved`, with
/// `Triggered → Suppressed` as the only branch. No status ever regresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AlertStatus {
    Triggered,
    Acknowledged,
    Resolved,
    Suppressed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Triggered => "Triggered",
            AlertStatus::Acknowledged => "Acknowledged",
            AlertStatus::Resolved => "Resolved",
            AlertStatus::Suppressed => "Suppressed",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Suppressed)
    }

    /// Forward-only transition check. Skipping ahead along the main chain
    /// (Triggered straight to Resolved) is a forward move and allowed;
    /// any regression is not.
    pub fn can_advance_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Triggered, AlertStatus::Acknowledged)
                | (AlertStatus::Triggered, AlertStatus::Resolved)
                | (AlertStatus::Triggered, AlertStatus::Suppressed)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alert raised for a truck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    /// Human-facing label, e.g. `ALERT-3fa9c1d2`.
    pub alert_id: String,
    pub truck_id: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub source: String,
    /// Alert-specific context (speeds, g-forces, resource readings).
    pub context: serde_json::Value,
    pub actions: Vec<AlertAction>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An actuator response attached to an alert (buzzer, LED, display).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertAction {
    pub action_id: String,
    pub action_type: String,
    pub target: String,
    pub parameters: serde_json::Value,
    pub executed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error: Option<String>,
}

impl Alert {
    /// Advance the alert along its lifecycle, stamping the timestamp that
    /// belongs to the entered status. Timestamps never precede
    /// `triggered_at`.
    ///
    /// Returns `false` (and leaves the record untouched) when the move is
    /// not a forward transition.
    pub fn advance(&mut self, next: AlertStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        let at = at.max(self.triggered_at);
        match next {
            AlertStatus::Acknowledged => self.acknowledged_at = Some(at),
            AlertStatus::Resolved => self.resolved_at = Some(at),
            AlertStatus::Triggered | AlertStatus::Suppressed => {}
        }
        self.status = next;
        self.updated_at = at;
        true
    }
}

impl Entity for Alert {
    const KIND: EntityKind = EntityKind::Alerts;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        Some(&self.truck_id)
    }
}

impl Queryable for Alert {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => Some(FieldValue::Str(&self.truck_id)),
            "alert_type" => Some(FieldValue::Str(self.alert_type.as_str())),
            "severity" => Some(FieldValue::Str(self.severity.as_str())),
            "status" => Some(FieldValue::Str(self.status.as_str())),
            "triggered_at" => Some(FieldValue::Time(self.triggered_at)),
            "created_at" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert(status: AlertStatus) -> Alert {
        let triggered = Utc::now() - chrono::Duration::hours(1);
        Alert {
            id: "a-1".into(),
            alert_id: "ALERT-00000001".into(),
            truck_id: "t-1".into(),
            alert_type: AlertType::OverSpeeding,
            severity: AlertSeverity::Warning,
            message: "Speed limit significantly exceeded".into(),
            triggered_at: triggered,
            acknowledged_at: None,
            resolved_at: None,
            source: "test".into(),
            context: serde_json::json!({}),
            actions: Vec::new(),
            status,
            created_at: triggered,
            updated_at: triggered,
        }
    }

    #[test]
    fn advance_stamps_acknowledged_at() {
        let mut alert = sample_alert(AlertStatus::Triggered);
        assert!(alert.advance(AlertStatus::Acknowledged, Utc::now()));
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        let acked = alert.acknowledged_at.unwrap();
        assert!(acked >= alert.triggered_at);
        assert!(alert.resolved_at.is_none());
    }

    #[test]
    fn resolved_never_regresses() {
        let mut alert = sample_alert(AlertStatus::Resolved);
        assert!(!alert.advance(AlertStatus::Triggered, Utc::now()));
        assert!(!alert.advance(AlertStatus::Acknowledged, Utc::now()));
        assert_eq!(alert.status, AlertStatus::Resolved);
    }

    #[test]
    fn suppressed_only_from_triggered() {
        let mut acked = sample_alert(AlertStatus::Acknowledged);
        assert!(!acked.advance(AlertStatus::Suppressed, Utc::now()));

        let mut triggered = sample_alert(AlertStatus::Triggered);
        assert!(triggered.advance(AlertStatus::Suppressed, Utc::now()));
        assert!(triggered.status.is_terminal());
    }

    #[test]
    fn timestamps_never_precede_trigger() {
        let mut alert = sample_alert(AlertStatus::Triggered);
        let before_trigger = alert.triggered_at - chrono::Duration::hours(2);
        assert!(alert.advance(AlertStatus::Acknowledged, before_trigger));
        assert!(alert.acknowledged_at.unwrap() >= alert.triggered_at);
    }
}
