//! Telemetry records: per-truck sensor bundles sampled on a fixed cadence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

/// One telemetry sample from a truck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryRecord {
    pub id: String,
    pub truck_id: String,
    pub timestamp: DateTime<Utc>,
    /// `(longitude, latitude)`.
    pub location: (f64, f64),
    pub speed_kmh: f64,
    pub heading: f64,
    pub sensors: SensorBundle,
    pub cameras: Option<CameraBundle>,
    /// Driving scenario tag emitted by the on-truck agent.
    pub scenario: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The four on-truck sensor groups reported with every sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorBundle {
    pub gps: GpsReading,
    pub obd: ObdReading,
    pub imu: ImuReading,
    pub tpms: TpmsReading,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsReading {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed_kmh: f64,
    pub heading: f64,
    pub satellites: u32,
    pub fix_quality: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObdReading {
    pub rpm: u32,
    pub speed_kmh: u32,
    pub coolant_temp: i32,
    pub fuel_level: u32,
    pub engine_load: u32,
    pub throttle_pos: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImuReading {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
}

/// Tire pressure monitoring, one sensor per wheel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TpmsReading {
    pub front_left: TireSensor,
    pub front_right: TireSensor,
    pub rear_left: TireSensor,
    pub rear_right: TireSensor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TireSensor {
    pub pressure_psi: f64,
    pub temperature_c: f64,
    pub battery_percent: u32,
    pub alert: bool,
}

/// References to the camera frames captured alongside a sample, when any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraBundle {
    pub front_camera: Option<CameraFrameRef>,
    pub driver_camera: Option<CameraFrameRef>,
    pub cargo_camera: Option<CameraFrameRef>,
}

/// A single captured frame. The bytes live behind `url`; only metadata is
/// carried through the data layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraFrameRef {
    pub frame_id: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
    pub is_keyframe: bool,
}

impl Entity for TelemetryRecord {
    const KIND: EntityKind = EntityKind::Telemetry;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        Some(&self.truck_id)
    }
}

impl Queryable for TelemetryRecord {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => Some(FieldValue::Str(&self.truck_id)),
            "timestamp" => Some(FieldValue::Time(self.timestamp)),
            "speed_kmh" => Some(FieldValue::F64(self.speed_kmh)),
            "heading" => Some(FieldValue::F64(self.heading)),
            _ => None,
        }
    }
}
