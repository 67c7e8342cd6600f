//! ML inference events reported by the edge models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

/// Inference hardware the model ran on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HardwareKind {
    Cpu,
    Cuda,
    OpenVino,
    Fallback,
}

impl HardwareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareKind::Cpu => "Cpu",
            HardwareKind::Cuda => "Cuda",
            HardwareKind::OpenVino => "OpenVino",
            HardwareKind::Fallback => "Fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WeatherKind {
    Clear,
    Rain,
    Fog,
    Snow,
    Night,
}

/// Model-specific inference payload, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MlResult {
    Drowsiness {
        is_drowsy: bool,
        eye_closure_ratio: f64,
    },
    LaneDeparture {
        is_departing: bool,
        deviation_pixels: u32,
    },
    CargoTamper {
        is_tampered: bool,
        motion_score: f64,
    },
    LicensePlate {
        plate_text: String,
        bounding_box: [f64; 4],
    },
    Weather {
        weather_type: WeatherKind,
        visibility_m: f64,
    },
    Unknown,
}

impl MlResult {
    /// Model name that produces this result kind.
    pub fn model_name(&self) -> &'static str {
        match self {
            MlResult::Drowsiness { .. } => "drowsiness",
            MlResult::LaneDeparture { .. } => "lane_departure",
            MlResult::CargoTamper { .. } => "cargo_tamper",
            MlResult::LicensePlate { .. } => "license_plate",
            MlResult::Weather { .. } => "weather",
            MlResult::Unknown => "unknown",
        }
    }
}

/// One inference event from an edge model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MlEvent {
    pub id: String,
    /// Human-facing label, e.g. `ML-3fa9c1d2`.
    pub event_id: String,
    pub truck_id: String,
    pub model_name: String,
    pub model_version: String,
    pub timestamp: DateTime<Utc>,
    pub result: MlResult,
    /// Raw model confidence, clamped to `[0, 1]` at generation and merge.
    pub confidence: f64,
    pub calibrated_confidence: f64,
    pub latency_ms: f64,
    pub hardware_used: HardwareKind,
    pub created_at: DateTime<Utc>,
}

impl MlEvent {
    /// Clamp both confidence fields into `[0, 1]`.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.calibrated_confidence = self.calibrated_confidence.clamp(0.0, 1.0);
    }
}

impl Entity for MlEvent {
    const KIND: EntityKind = EntityKind::MlEvents;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        Some(&self.truck_id)
    }
}

impl Queryable for MlEvent {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => Some(FieldValue::Str(&self.truck_id)),
            "model_name" => Some(FieldValue::Str(&self.model_name)),
            "hardware_used" => Some(FieldValue::Str(self.hardware_used.as_str())),
            "timestamp" => Some(FieldValue::Time(self.timestamp)),
            "confidence" => Some(FieldValue::F64(self.confidence)),
            "latency_ms" => Some(FieldValue::F64(self.latency_ms)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_round_trips_with_type_tag() {
        let result = MlResult::Weather {
            weather_type: WeatherKind::Fog,
            visibility_m: 240.0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "Weather");
        let back: MlResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn clamp_confidence_bounds_both_fields() {
        let mut event = MlEvent {
            id: "m-1".into(),
            event_id: "ML-00000001".into(),
            truck_id: "t-1".into(),
            model_name: "drowsiness".into(),
            model_version: "1.0.0".into(),
            timestamp: Utc::now(),
            result: MlResult::Unknown,
            confidence: 1.4,
            calibrated_confidence: -0.2,
            latency_ms: 42.0,
            hardware_used: HardwareKind::Cpu,
            created_at: Utc::now(),
        };
        event.clamp_confidence();
        assert_eq!(event.confidence, 1.0);
        assert_eq!(event.calibrated_confidence, 0.0);
    }
}
