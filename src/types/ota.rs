//! OTA updates and remote commands, both with forward-only status graphs
//! and truck-or-fleet targeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

// ============================================================================
// OTA Updates
// ============================================================================

/// What the update payload replaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    Agent,
    Model,
    Config,
    Firmware,
}

impl UpdateTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateTarget::Agent => "Agent",
            UpdateTarget::Model => "Model",
            UpdateTarget::Config => "Config",
            UpdateTarget::Firmware => "Firmware",
        }
    }

    pub const ALL: [UpdateTarget; 4] = [
        UpdateTarget::Agent,
        UpdateTarget::Model,
        UpdateTarget::Config,
        UpdateTarget::Firmware,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UpdatePriority {
    Critical,
    High,
    Medium,
    Low,
}

impl UpdatePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatePriority::Critical => "Critical",
            UpdatePriority::High => "High",
            UpdatePriority::Medium => "Medium",
            UpdatePriority::Low => "Low",
        }
    }

    pub const ALL: [UpdatePriority; 4] = [
        UpdatePriority::Critical,
        UpdatePriority::High,
        UpdatePriority::Medium,
        UpdatePriority::Low,
    ];
}

/// OTA lifecycle:
/// `Pending → Downloading → Verifying → Applying → {Success, Failed, Rollback}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OtaStatus {
    Pending,
    Downloading,
    Verifying,
    Applying,
    Success,
    Failed,
    Rollback,
}

impl OtaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtaStatus::Pending => "Pending",
            OtaStatus::Downloading => "Downloading",
            OtaStatus::Verifying => "Verifying",
            OtaStatus::Applying => "Applying",
            OtaStatus::Success => "Success",
            OtaStatus::Failed => "Failed",
            OtaStatus::Rollback => "Rollback",
        }
    }

    /// Position along the pipeline; terminal statuses share the final rank.
    fn rank(&self) -> u8 {
        match self {
            OtaStatus::Pending => 0,
            OtaStatus::Downloading => 1,
            OtaStatus::Verifying => 2,
            OtaStatus::Applying => 3,
            OtaStatus::Success | OtaStatus::Failed | OtaStatus::Rollback => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }

    /// Forward-only transition check; skipping pipeline stages is allowed,
    /// regressing or leaving a terminal status is not.
    pub fn can_advance_to(&self, next: OtaStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for OtaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An over-the-air update, targeting one truck or a whole fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtaUpdate {
    pub id: String,
    /// Human-facing label, e.g. `UPDATE-3fa9c1d2`.
    pub update_id: String,
    /// Set when the update targets a single truck.
    pub truck_id: Option<String>,
    /// Set when the update targets a fleet broadcast.
    pub fleet_id: Option<String>,
    pub version: String,
    pub target: UpdateTarget,
    pub url: String,
    pub checksum: String,
    pub signature: String,
    pub size_bytes: u64,
    pub priority: UpdatePriority,
    pub requires_reboot: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub status: OtaStatus,
    /// Clamped to `[0, 100]` at generation and merge.
    pub progress_percent: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OtaUpdate {
    /// Advance the update, stamping `started_at`/`completed_at` and pinning
    /// progress to 100 on terminal entry. Returns `false` on a non-forward
    /// move, leaving the record untouched.
    pub fn advance(&mut self, next: OtaStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        if self.started_at.is_none() && next != OtaStatus::Pending {
            self.started_at = Some(at);
        }
        if next.is_terminal() {
            self.completed_at = Some(at);
            self.progress_percent = 100.0;
        }
        self.status = next;
        self.updated_at = at;
        true
    }

    pub fn clamp_progress(&mut self) {
        self.progress_percent = self.progress_percent.clamp(0.0, 100.0);
    }
}

/// Payload for scheduling a new OTA update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOtaUpdateRequest {
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub fleet_id: Option<String>,
    pub version: String,
    pub target: UpdateTarget,
    pub url: String,
    pub checksum: String,
    pub signature: String,
    pub size_bytes: u64,
    pub priority: UpdatePriority,
    #[serde(default)]
    pub requires_reboot: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl Entity for OtaUpdate {
    const KIND: EntityKind = EntityKind::OtaUpdates;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        self.truck_id.as_deref()
    }
}

impl Queryable for OtaUpdate {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => self.truck_id.as_deref().map(FieldValue::Str),
            "version" => Some(FieldValue::Str(&self.version)),
            "target" => Some(FieldValue::Str(self.target.as_str())),
            "priority" => Some(FieldValue::Str(self.priority.as_str())),
            "status" => Some(FieldValue::Str(self.status.as_str())),
            "progress_percent" => Some(FieldValue::F64(self.progress_percent)),
            "created_at" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}

// ============================================================================
// Remote Commands
// ============================================================================

/// Operator-issued command kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandType {
    Reboot,
    Shutdown,
    RestartService,
    GetDiagnostics,
    UpdateConfig,
    RunHealthCheck,
    CaptureSnapshot,
    #[serde(rename = "FlushWAL")]
    FlushWal,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Reboot => "Reboot",
            CommandType::Shutdown => "Shutdown",
            CommandType::RestartService => "RestartService",
            CommandType::GetDiagnostics => "GetDiagnostics",
            CommandType::UpdateConfig => "UpdateConfig",
            CommandType::RunHealthCheck => "RunHealthCheck",
            CommandType::CaptureSnapshot => "CaptureSnapshot",
            CommandType::FlushWal => "FlushWAL",
        }
    }

    pub const ALL: [CommandType; 8] = [
        CommandType::Reboot,
        CommandType::Shutdown,
        CommandType::RestartService,
        CommandType::GetDiagnostics,
        CommandType::UpdateConfig,
        CommandType::RunHealthCheck,
        CommandType::CaptureSnapshot,
        CommandType::FlushWal,
    ];
}

/// Command lifecycle:
/// `Pending → Executing → {Success, Failed, Timeout, Cancelled}`.
/// Cancelled may also be entered straight from Pending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    Pending,
    Executing,
    Success,
    Failed,
    Timeout,
    Cancelled,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "Pending",
            CommandStatus::Executing => "Executing",
            CommandStatus::Success => "Success",
            CommandStatus::Failed => "Failed",
            CommandStatus::Timeout => "Timeout",
            CommandStatus::Cancelled => "Cancelled",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CommandStatus::Pending => 0,
            CommandStatus::Executing => 1,
            CommandStatus::Success
            | CommandStatus::Failed
            | CommandStatus::Timeout
            | CommandStatus::Cancelled => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    pub fn can_advance_to(&self, next: CommandStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// A remote command issued to one truck or a fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteCommand {
    pub id: String,
    /// Human-facing label, e.g. `CMD-3fa9c1d2`.
    pub command_id: String,
    pub truck_id: Option<String>,
    pub fleet_id: Option<String>,
    pub command_type: CommandType,
    pub parameters: serde_json::Value,
    pub issued_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub requires_ack: bool,
    pub status: CommandStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteCommand {
    /// Advance the command, stamping `completed_at` on terminal entry.
    /// Returns `false` on a non-forward move, leaving the record untouched.
    pub fn advance(&mut self, next: CommandStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        if next.is_terminal() {
            self.completed_at = Some(at);
        }
        self.status = next;
        self.updated_at = at;
        true
    }
}

/// Payload for issuing a new remote command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRemoteCommandRequest {
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub fleet_id: Option<String>,
    pub command_type: CommandType,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requires_ack: bool,
}

impl Entity for RemoteCommand {
    const KIND: EntityKind = EntityKind::RemoteCommands;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        self.truck_id.as_deref()
    }
}

impl Queryable for RemoteCommand {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => self.truck_id.as_deref().map(FieldValue::Str),
            "command_type" => Some(FieldValue::Str(self.command_type.as_str())),
            "status" => Some(FieldValue::Str(self.status.as_str())),
            "issued_at" => Some(FieldValue::Time(self.issued_at)),
            "created_at" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update(status: OtaStatus) -> OtaUpdate {
        let now = Utc::now();
        OtaUpdate {
            id: "u-1".into(),
            update_id: "UPDATE-00000001".into(),
            truck_id: Some("t-1".into()),
            fleet_id: None,
            version: "2.1.0".into(),
            target: UpdateTarget::Agent,
            url: "https://updates.example.com/agent.bin".into(),
            checksum: "sha256:deadbeef".into(),
            signature: "sig:test".into(),
            size_bytes: 1024,
            priority: UpdatePriority::High,
            requires_reboot: false,
            deadline: None,
            status,
            progress_percent: 0.0,
            started_at: None,
            completed_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ota_terminal_entry_pins_progress() {
        let mut update = sample_update(OtaStatus::Applying);
        update.progress_percent = 80.0;
        assert!(update.advance(OtaStatus::Success, Utc::now()));
        assert_eq!(update.progress_percent, 100.0);
        assert!(update.completed_at.is_some());
    }

    #[test]
    fn ota_never_leaves_terminal() {
        let mut update = sample_update(OtaStatus::Failed);
        assert!(!update.advance(OtaStatus::Pending, Utc::now()));
        assert!(!update.advance(OtaStatus::Success, Utc::now()));
        assert_eq!(update.status, OtaStatus::Failed);
    }

    #[test]
    fn ota_skipping_forward_is_allowed() {
        let mut update = sample_update(OtaStatus::Pending);
        assert!(update.advance(OtaStatus::Verifying, Utc::now()));
        assert!(update.started_at.is_some());
        assert!(update.completed_at.is_none());
    }

    #[test]
    fn command_cancel_from_pending_is_forward() {
        assert!(CommandStatus::Pending.can_advance_to(CommandStatus::Cancelled));
        assert!(CommandStatus::Executing.can_advance_to(CommandStatus::Timeout));
        assert!(!CommandStatus::Success.can_advance_to(CommandStatus::Executing));
        assert!(!CommandStatus::Cancelled.can_advance_to(CommandStatus::Pending));
    }

    #[test]
    fn flush_wal_serializes_with_original_casing() {
        let json = serde_json::to_string(&CommandType::FlushWal).unwrap();
        assert_eq!(json, "\"FlushWAL\"");
    }
}
