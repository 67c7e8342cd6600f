//! Truck records and their create/update payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldValue, Queryable};
use crate::store::{Entity, EntityKind};

/// Operational state of a truck.
///
/// One-way drift between states is allowed in any direction here; unlike
/// alert and command statuses, a truck can come back Online after
/// Maintenance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum TruckStatus {
    Online,
    #[default]
    Offline,
    Maintenance,
    Inactive,
}

impl TruckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Online => "Online",
            TruckStatus::Offline => "Offline",
            TruckStatus::Maintenance => "Maintenance",
            TruckStatus::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for TruckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered truck.
///
/// `location` is `(longitude, latitude)`, matching the GeoJSON axis order
/// used by the map layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Truck {
    pub id: String,
    /// Human-facing label, e.g. `TRK-0001`.
    pub truck_id: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub license_plate: String,
    pub vin: String,
    pub fleet_id: Option<String>,
    pub driver_id: Option<String>,
    pub status: TruckStatus,
    pub last_seen: DateTime<Utc>,
    pub location: (f64, f64),
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a truck.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateTruckRequest {
    pub make: String,
    pub model: String,
    pub year: String,
    pub license_plate: String,
    pub vin: String,
    #[serde(default)]
    pub fleet_id: Option<String>,
    #[serde(default)]
    pub status: Option<TruckStatus>,
    #[serde(default)]
    pub location: Option<(f64, f64)>,
}

/// Partial update for a truck. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTruckRequest {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub fleet_id: Option<String>,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub status: Option<TruckStatus>,
    #[serde(default)]
    pub location: Option<(f64, f64)>,
}

impl Truck {
    /// Apply a partial update in place, bumping `updated_at`.
    pub fn apply_update(&mut self, update: &UpdateTruckRequest) {
        if let Some(make) = &update.make {
            self.make = make.clone();
        }
        if let Some(model) = &update.model {
            self.model = model.clone();
        }
        if let Some(year) = &update.year {
            self.year = year.clone();
        }
        if let Some(plate) = &update.license_plate {
            self.license_plate = plate.clone();
        }
        if let Some(vin) = &update.vin {
            self.vin = vin.clone();
        }
        if let Some(fleet_id) = &update.fleet_id {
            self.fleet_id = Some(fleet_id.clone());
        }
        if let Some(driver_id) = &update.driver_id {
            self.driver_id = Some(driver_id.clone());
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for Truck {
    const KIND: EntityKind = EntityKind::Trucks;

    fn id(&self) -> &str {
        &self.id
    }

    fn truck_ref(&self) -> Option<&str> {
        None
    }
}

impl Queryable for Truck {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "truck_id" => Some(FieldValue::Str(&self.truck_id)),
            "make" => Some(FieldValue::Str(&self.make)),
            "model" => Some(FieldValue::Str(&self.model)),
            "year" => Some(FieldValue::Str(&self.year)),
            "license_plate" => Some(FieldValue::Str(&self.license_plate)),
            "status" => Some(FieldValue::Str(self.status.as_str())),
            "last_seen" => Some(FieldValue::Time(self.last_seen)),
            "created_at" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_truck() -> Truck {
        Truck {
            id: "t-1".into(),
            truck_id: "TRK-0001".into(),
            make: "Volvo".into(),
            model: "FH16".into(),
            year: "2022".into(),
            license_plate: "TRK001A".into(),
            vin: "VIN0001".into(),
            fleet_id: None,
            driver_id: None,
            status: TruckStatus::Online,
            last_seen: Utc::now(),
            location: (-122.4194, 37.7749),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn apply_update_only_touches_present_fields() {
        let mut truck = sample_truck();
        truck.apply_update(&UpdateTruckRequest {
            status: Some(TruckStatus::Maintenance),
            ..Default::default()
        });

        assert_eq!(truck.status, TruckStatus::Maintenance);
        assert_eq!(truck.make, "Volvo");
        assert_eq!(truck.license_plate, "TRK001A");
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&TruckStatus::Maintenance).unwrap();
        assert_eq!(json, "\"Maintenance\"");
    }
}
