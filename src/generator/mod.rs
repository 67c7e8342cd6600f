//! Synthetic fleet generator: seeds an internally consistent session on
//! first run.
//!
//! Shapes are deterministic (counts, cadences, referential structure);
//! values are drawn from an `StdRng` that can be fixed-seeded for
//! reproducible fleets. Every derived field (health bucket, alert
//! lifecycle timestamps, OTA/command completion) is computed from the same
//! draw that produced its primary metric, so a record's displayed status
//! always agrees with its own numbers.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::defaults;
use crate::config::SeedConfig;
use crate::store::{SessionStore, StoreError};
use crate::types::{
    Alert, AlertAction, AlertSeverity, AlertStatus, AlertType, CameraBundle, CameraFrameRef,
    CommandStatus, CommandType, GpsReading, HardwareKind, HealthAlert, HealthState, HealthStatus,
    ImuReading, MlEvent, MlResult, ObdReading, OtaStatus, OtaUpdate, RemediationAction,
    RemoteCommand, ResourceUsage, SensorBundle, TaskHealth, TelemetryRecord, TireSensor,
    TpmsReading, Truck, TruckStatus, UpdatePriority, UpdateTarget, WeatherKind,
};

/// Collection counts produced by a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub trucks: usize,
    pub telemetry: usize,
    pub alerts: usize,
    pub ml_events: usize,
    pub health: usize,
    pub ota_updates: usize,
    pub remote_commands: usize,
}

/// Synthesizes the six entity collections for a session.
pub struct FleetGenerator {
    rng: StdRng,
}

impl FleetGenerator {
    /// Generator seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed seed for reproducible fleets.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &SeedConfig) -> Self {
        match config.rng_seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }

    /// Seed the session store with a full fleet.
    ///
    /// Idempotent at the session level: when the store's seeded marker is
    /// already set this is a no-op returning `Ok(None)`. Otherwise all six
    /// collections are generated up front and committed together with the
    /// marker; a storage failure mid-commit rolls the store back to
    /// unseeded so generation is never partially applied.
    pub fn seed_session(
        &mut self,
        store: &SessionStore,
        truck_count: usize,
    ) -> Result<Option<SeedSummary>, StoreError> {
        if store.seeded()? {
            return Ok(None);
        }

        let trucks = self.generate_trucks(truck_count);

        let mut telemetry = Vec::new();
        let mut alerts = Vec::new();
        let mut ml_events = Vec::new();
        let mut health = Vec::new();
        for truck in &trucks {
            telemetry.extend(self.telemetry_for_truck(truck));
            alerts.extend(self.alerts_for_truck(truck));
            ml_events.extend(self.ml_events_for_truck(truck));
            health.extend(self.health_for_truck(truck));
        }
        let ota_updates = self.ota_updates(&trucks);
        let remote_commands = self.remote_commands(&trucks);

        let summary = SeedSummary {
            trucks: trucks.len(),
            telemetry: telemetry.len(),
            alerts: alerts.len(),
            ml_events: ml_events.len(),
            health: health.len(),
            ota_updates: ota_updates.len(),
            remote_commands: remote_commands.len(),
        };

        let commit = (|| -> Result<(), StoreError> {
            store.replace(&trucks)?;
            store.replace(&telemetry)?;
            store.replace(&alerts)?;
            store.replace(&ml_events)?;
            store.replace(&health)?;
            store.replace(&ota_updates)?;
            store.replace(&remote_commands)?;
            store.set_seeded()
        })();

        if let Err(e) = commit {
            warn!(error = %e, "Seed commit failed, rolling back to unseeded");
            store.reset()?;
            return Err(e);
        }

        info!(
            trucks = summary.trucks,
            telemetry = summary.telemetry,
            alerts = summary.alerts,
            ml_events = summary.ml_events,
            health = summary.health,
            ota_updates = summary.ota_updates,
            remote_commands = summary.remote_commands,
            "Session seeded"
        );
        Ok(Some(summary))
    }

    // ========================================================================
    // Trucks
    // ========================================================================

    /// Generate `count` trucks clustered around the depot.
    pub fn generate_trucks(&mut self, count: usize) -> Vec<Truck> {
        const MAKES: [&str; 5] = ["Volvo", "Scania", "Mercedes", "MAN", "DAF"];
        const MODELS: [&str; 5] = ["FH16", "R-series", "Actros", "TGX", "XF"];
        const YEARS: [&str; 4] = ["2020", "2021", "2022", "2023"];
        const STATUSES: [TruckStatus; 3] =
            [TruckStatus::Online, TruckStatus::Offline, TruckStatus::Maintenance];

        // Depot coordinates; trucks scatter within ~5 km.
        const BASE_LON: f64 = -122.4194;
        const BASE_LAT: f64 = 37.7749;

        let now = Utc::now();
        (1..=count)
            .map(|i| {
                let lon = BASE_LON + (self.rng.gen::<f64>() - 0.5) * 0.1;
                let lat = BASE_LAT + (self.rng.gen::<f64>() - 0.5) * 0.1;
                Truck {
                    id: Uuid::new_v4().to_string(),
                    truck_id: format!("TRK-{i:04}"),
                    make: self.pick(&MAKES).to_string(),
                    model: self.pick(&MODELS).to_string(),
                    year: self.pick(&YEARS).to_string(),
                    license_plate: format!("TRK{i:03}A"),
                    vin: format!("VIN{}", &Uuid::new_v4().simple().to_string()[..17]),
                    fleet_id: (i % 3 == 0).then(|| Uuid::new_v4().to_string()),
                    driver_id: (i % 2 == 0).then(|| Uuid::new_v4().to_string()),
                    status: *self.pick(&STATUSES),
                    last_seen: now - Duration::seconds(self.rng.gen_range(0..3_600)),
                    location: (lon, lat),
                    created_at: now - Duration::seconds(self.rng.gen_range(0..30 * 24 * 3_600)),
                    updated_at: now,
                }
            })
            .collect()
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    /// Fixed-cadence telemetry over the trailing 24 h window: one sample
    /// every 30 minutes, oldest first.
    pub fn telemetry_for_truck(&mut self, truck: &Truck) -> Vec<TelemetryRecord> {
        const SCENARIOS: [&str; 4] = [
            "normal_driving",
            "emergency_braking",
            "rapid_acceleration",
            "sharp_turn",
        ];

        let now = Utc::now();
        let points = defaults::TELEMETRY_POINTS_PER_TRUCK;
        (0..points)
            .map(|i| {
                let timestamp = now
                    - Duration::minutes((points - 1 - i) as i64 * defaults::TELEMETRY_CADENCE_MINS);
                let speed_kmh = self.rng.gen_range(0.0..100.0);
                let heading = self.rng.gen_range(0.0..360.0);
                let lon = truck.location.0 + (self.rng.gen::<f64>() - 0.5) * 0.001;
                let lat = truck.location.1 + (self.rng.gen::<f64>() - 0.5) * 0.001;

                TelemetryRecord {
                    id: Uuid::new_v4().to_string(),
                    truck_id: truck.id.clone(),
                    timestamp,
                    location: (lon, lat),
                    speed_kmh,
                    heading,
                    sensors: SensorBundle {
                        gps: GpsReading {
                            latitude: lat,
                            longitude: lon,
                            altitude: 100.0 + self.rng.gen_range(0.0..50.0),
                            speed_kmh,
                            heading,
                            satellites: self.rng.gen_range(8..12),
                            fix_quality: 1,
                        },
                        obd: ObdReading {
                            rpm: self.rng.gen_range(1_000..4_000),
                            speed_kmh: speed_kmh as u32,
                            coolant_temp: self.rng.gen_range(70..100),
                            fuel_level: self.rng.gen_range(50..100),
                            engine_load: self.rng.gen_range(30..100),
                            throttle_pos: self.rng.gen_range(20..100),
                        },
                        imu: ImuReading {
                            accel_x: (self.rng.gen::<f64>() - 0.5) * 2.0,
                            accel_y: (self.rng.gen::<f64>() - 0.5) * 2.0,
                            accel_z: 0.98 + (self.rng.gen::<f64>() - 0.5) * 0.1,
                            gyro_x: (self.rng.gen::<f64>() - 0.5) * 10.0,
                            gyro_y: (self.rng.gen::<f64>() - 0.5) * 10.0,
                            gyro_z: (self.rng.gen::<f64>() - 0.5) * 10.0,
                        },
                        tpms: TpmsReading {
                            front_left: self.tire_sensor(),
                            front_right: self.tire_sensor(),
                            rear_left: self.tire_sensor(),
                            rear_right: self.tire_sensor(),
                        },
                    },
                    cameras: self.camera_bundle(i, timestamp),
                    scenario: Some(self.pick(&SCENARIOS).to_string()),
                    created_at: timestamp,
                }
            })
            .collect()
    }

    fn tire_sensor(&mut self) -> TireSensor {
        TireSensor {
            pressure_psi: 32.0 + (self.rng.gen::<f64>() - 0.5) * 4.0,
            temperature_c: 25.0 + self.rng.gen_range(0.0..20.0),
            battery_percent: self.rng.gen_range(80..100),
            alert: self.rng.gen_bool(0.05),
        }
    }

    /// Camera frames arrive on a sparser cadence than sensor samples.
    fn camera_bundle(&mut self, index: usize, timestamp: DateTime<Utc>) -> Option<CameraBundle> {
        let front = (index % 10 == 0).then(|| self.camera_frame(timestamp, 1280, 720));
        let driver = (index % 5 == 0).then(|| self.camera_frame(timestamp, 640, 480));
        let cargo = (index % 7 == 0).then(|| self.camera_frame(timestamp, 800, 600));
        if front.is_none() && driver.is_none() && cargo.is_none() {
            return None;
        }
        Some(CameraBundle {
            front_camera: front,
            driver_camera: driver,
            cargo_camera: cargo,
        })
    }

    fn camera_frame(&mut self, timestamp: DateTime<Utc>, width: u32, height: u32) -> CameraFrameRef {
        let frame_id = Uuid::new_v4().to_string();
        CameraFrameRef {
            url: format!("https://frames.example.com/{frame_id}.jpg"),
            thumbnail_url: Some(format!("https://frames.example.com/{frame_id}_thumb.jpg")),
            frame_id,
            timestamp,
            width,
            height,
            format: "jpeg".to_string(),
            size_bytes: self.rng.gen_range(256..1_536) * 1_024,
            is_keyframe: true,
        }
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    /// 5–15 alerts per truck over the trailing 7 days. Lifecycle timestamps
    /// come from the same draw as the status, so Acknowledged records
    /// always carry `acknowledged_at >= triggered_at`.
    pub fn alerts_for_truck(&mut self, truck: &Truck) -> Vec<Alert> {
        let count = defaults::ALERTS_PER_TRUCK_MIN
            + self.rng.gen_range(0..=defaults::ALERTS_PER_TRUCK_SPREAD);
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let alert_type = *self.pick(&AlertType::ALL);
                let severity = *self.pick(&AlertSeverity::ALL);
                let status = *self.pick(&[
                    AlertStatus::Triggered,
                    AlertStatus::Acknowledged,
                    AlertStatus::Resolved,
                ]);

                let triggered_at = now - Duration::seconds(self.rng.gen_range(0..7 * 24 * 3_600));
                let acknowledged_at = matches!(
                    status,
                    AlertStatus::Acknowledged | AlertStatus::Resolved
                )
                .then(|| triggered_at + Duration::seconds(self.rng.gen_range(0..3_600)));
                let resolved_at = (status == AlertStatus::Resolved).then(|| {
                    acknowledged_at.unwrap_or(triggered_at)
                        + Duration::seconds(self.rng.gen_range(0..3_600))
                });

                Alert {
                    id: Uuid::new_v4().to_string(),
                    alert_id: format!("ALERT-{}", self.short_id()),
                    truck_id: truck.id.clone(),
                    alert_type,
                    severity,
                    message: alert_message(alert_type, severity),
                    triggered_at,
                    acknowledged_at,
                    resolved_at,
                    source: "fleet_seed".to_string(),
                    context: self.alert_context(alert_type, truck),
                    actions: self.alert_actions(severity),
                    status,
                    created_at: triggered_at,
                    updated_at: resolved_at.or(acknowledged_at).unwrap_or(triggered_at),
                }
            })
            .collect()
    }

    fn alert_context(&mut self, alert_type: AlertType, truck: &Truck) -> serde_json::Value {
        let base = serde_json::json!({
            "truck_id": truck.id,
            "truck_license_plate": truck.license_plate,
            "location": [truck.location.0, truck.location.1],
        });
        let mut context = base;
        let extra = match alert_type {
            AlertType::DrowsyDriver => serde_json::json!({
                "eye_closure_ratio": 0.3 + self.rng.gen::<f64>() * 0.7,
            }),
            AlertType::LaneDeparture => serde_json::json!({
                "deviation_pixels": self.rng.gen_range(20..120),
                "lane_confidence": 0.7 + self.rng.gen::<f64>() * 0.3,
            }),
            AlertType::CargoTamper => serde_json::json!({
                "motion_score": 0.5 + self.rng.gen::<f64>() * 0.5,
            }),
            AlertType::HarshBraking | AlertType::RapidAcceleration => serde_json::json!({
                "g_force": 0.4 + self.rng.gen::<f64>() * 0.6,
                "speed_kmh": self.rng.gen_range(30.0..110.0),
            }),
            AlertType::OverSpeeding => serde_json::json!({
                "speed_kmh": self.rng.gen_range(90.0..140.0),
                "speed_limit": 80,
            }),
            AlertType::HighTemperature => serde_json::json!({
                "temperature_c": self.rng.gen_range(70.0..100.0),
            }),
            AlertType::LowDiskSpace => serde_json::json!({
                "disk_percent": self.rng.gen_range(85.0..100.0),
            }),
            AlertType::HighCpuUsage => serde_json::json!({
                "cpu_percent": self.rng.gen_range(85.0..100.0),
            }),
        };
        if let (Some(obj), Some(extra)) = (context.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        context
    }

    /// Critical and Emergency alerts carry actuator actions.
    fn alert_actions(&mut self, severity: AlertSeverity) -> Vec<AlertAction> {
        if !matches!(severity, AlertSeverity::Critical | AlertSeverity::Emergency) {
            return Vec::new();
        }
        vec![
            AlertAction {
                action_id: format!("ACTION-{}", self.short_id()),
                action_type: "TriggerBuzzer".to_string(),
                target: "buzzer_1".to_string(),
                parameters: serde_json::json!({
                    "duration_ms": 1000, "pattern": "pulse", "pulse_count": 5,
                }),
                executed_at: None,
                success: false,
                error: None,
            },
            AlertAction {
                action_id: format!("ACTION-{}", self.short_id()),
                action_type: "FlashLed".to_string(),
                target: "led_red".to_string(),
                parameters: serde_json::json!({
                    "duration_ms": 5000, "pattern": "blink", "blink_count": 10,
                }),
                executed_at: None,
                success: false,
                error: None,
            },
        ]
    }

    // ========================================================================
    // ML Events
    // ========================================================================

    /// 10–30 inference events per truck over the trailing 7 days.
    pub fn ml_events_for_truck(&mut self, truck: &Truck) -> Vec<MlEvent> {
        let count = defaults::ML_EVENTS_PER_TRUCK_MIN
            + self.rng.gen_range(0..=defaults::ML_EVENTS_PER_TRUCK_SPREAD);
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let result = self.ml_result();
                let timestamp = now - Duration::seconds(self.rng.gen_range(0..7 * 24 * 3_600));
                let confidence = self.rng.gen_range(0.6..1.0);

                let mut event = MlEvent {
                    id: Uuid::new_v4().to_string(),
                    event_id: format!("ML-{}", self.short_id()),
                    truck_id: truck.id.clone(),
                    model_name: result.model_name().to_string(),
                    model_version: "1.0.0".to_string(),
                    timestamp,
                    result,
                    confidence,
                    calibrated_confidence: confidence * self.rng.gen_range(0.9..1.1),
                    latency_ms: self.rng.gen_range(30.0..100.0),
                    hardware_used: *self.pick(&[HardwareKind::Cpu, HardwareKind::Cuda]),
                    created_at: timestamp,
                };
                event.clamp_confidence();
                event
            })
            .collect()
    }

    fn ml_result(&mut self) -> MlResult {
        match self.rng.gen_range(0..5) {
            0 => MlResult::Drowsiness {
                is_drowsy: self.rng.gen_bool(0.5),
                eye_closure_ratio: 0.2 + self.rng.gen::<f64>() * 0.8,
            },
            1 => MlResult::LaneDeparture {
                is_departing: self.rng.gen_bool(0.5),
                deviation_pixels: self.rng.gen_range(10..110),
            },
            2 => MlResult::CargoTamper {
                is_tampered: self.rng.gen_bool(0.5),
                motion_score: 0.3 + self.rng.gen::<f64>() * 0.7,
            },
            3 => MlResult::LicensePlate {
                plate_text: format!("TRK{}", self.rng.gen_range(0..10_000)),
                bounding_box: [
                    0.1 + self.rng.gen::<f64>() * 0.3,
                    0.1 + self.rng.gen::<f64>() * 0.3,
                    0.2 + self.rng.gen::<f64>() * 0.2,
                    0.1 + self.rng.gen::<f64>() * 0.1,
                ],
            },
            _ => MlResult::Weather {
                weather_type: *self.pick(&[
                    WeatherKind::Clear,
                    WeatherKind::Rain,
                    WeatherKind::Fog,
                    WeatherKind::Snow,
                    WeatherKind::Night,
                ]),
                visibility_m: self.rng.gen_range(100.0..1_000.0),
            },
        }
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// 5–15 health snapshots per truck. The status bucket is derived from
    /// the same resource draw stored on the record.
    pub fn health_for_truck(&mut self, truck: &Truck) -> Vec<HealthStatus> {
        let count = defaults::HEALTH_PER_TRUCK_MIN
            + self.rng.gen_range(0..=defaults::HEALTH_PER_TRUCK_SPREAD);
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let timestamp = now - Duration::seconds(self.rng.gen_range(0..7 * 24 * 3_600));
                let resources = self.resource_usage();
                let status = HealthState::from_resources(&resources);

                HealthStatus {
                    id: Uuid::new_v4().to_string(),
                    truck_id: truck.id.clone(),
                    timestamp,
                    status,
                    tasks: self.task_health(),
                    alerts: self.health_alerts(status, timestamp),
                    actions_taken: self.health_actions(status, timestamp),
                    resources,
                    created_at: timestamp,
                }
            })
            .collect()
    }

    fn resource_usage(&mut self) -> ResourceUsage {
        let temperature_c = self.rng.gen_range(40.0..80.0);
        ResourceUsage {
            cpu_percent: self.rng.gen_range(30.0..90.0),
            cpu_cores: 4,
            memory_percent: self.rng.gen_range(40.0..90.0),
            memory_used_mb: self.rng.gen_range(2_048..4_096),
            memory_total_mb: 4_096,
            memory_available_mb: self.rng.gen_range(1_024..4_096),
            swap_percent: self.rng.gen_range(10.0..50.0),
            disk_percent: self.rng.gen_range(50.0..90.0),
            disk_used_gb: self.rng.gen_range(50..150),
            disk_total_gb: 200,
            disk_available_gb: self.rng.gen_range(50..150),
            temperature_c,
            thermal_throttling: temperature_c > defaults::HEALTH_THROTTLE_TEMP,
            uptime_sec: self.rng.gen_range(3_600..90_000),
            load_average: [
                1.0 + self.rng.gen::<f64>() * 3.0,
                0.8 + self.rng.gen::<f64>() * 2.5,
                0.6 + self.rng.gen::<f64>() * 2.0,
            ],
        }
    }

    fn task_health(&mut self) -> Vec<TaskHealth> {
        const ENGINES: [&str; 5] = [
            "sensor_engine",
            "camera_engine",
            "ml_engine",
            "health_engine",
            "ota_engine",
        ];

        ENGINES
            .iter()
            .map(|name| {
                let is_alive = self.rng.gen_bool(0.8);
                TaskHealth {
                    name: (*name).to_string(),
                    is_alive,
                    last_seen_ms: self.rng.gen_range(0..60_000),
                    cpu_usage_percent: self.rng.gen_range(10.0..50.0),
                    memory_usage_mb: self.rng.gen_range(100..500),
                    restarts: self.rng.gen_range(0..5),
                    last_restart: (!is_alive)
                        .then(|| Utc::now() - Duration::seconds(self.rng.gen_range(0..3_600))),
                }
            })
            .collect()
    }

    fn health_alerts(&mut self, status: HealthState, at: DateTime<Utc>) -> Vec<HealthAlert> {
        if !matches!(status, HealthState::Warning | HealthState::Critical) {
            return Vec::new();
        }
        let severity = if status == HealthState::Critical {
            "Critical"
        } else {
            "Warning"
        };
        let candidates = [
            ("high_cpu_usage", "CPU usage high", "Reduce load or restart service"),
            ("high_memory_usage", "Memory usage high", "Clear cache or restart service"),
            ("high_temperature", "System temperature high", "Reduce load or check cooling"),
        ];
        let mut alerts = Vec::new();
        for (alert_type, message, action) in candidates {
            if !self.rng.gen_bool(0.5) {
                continue;
            }
            alerts.push(HealthAlert {
                alert_id: format!("HEALTH-{}", self.short_id()),
                alert_type: alert_type.to_string(),
                severity: severity.to_string(),
                message: message.to_string(),
                triggered_at: at,
                source: "health_monitor".to_string(),
                recommended_action: action.to_string(),
            });
        }
        alerts
    }

    fn health_actions(&mut self, status: HealthState, at: DateTime<Utc>) -> Vec<RemediationAction> {
        if !matches!(status, HealthState::Warning | HealthState::Critical) {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.rng.gen_bool(0.5) {
            actions.push(RemediationAction {
                action_id: format!("ACTION-{}", self.short_id()),
                action_type: "ThrottleCameraFps".to_string(),
                target_module: "camera".to_string(),
                parameters: serde_json::json!({"reduction_percent": 50}),
                executed_at: at,
                success: true,
                message: "Reduced camera FPS to reduce load".to_string(),
            });
        }
        if status == HealthState::Critical && self.rng.gen_bool(0.5) {
            actions.push(RemediationAction {
                action_id: format!("ACTION-{}", self.short_id()),
                action_type: "RebootSystem".to_string(),
                target_module: "system".to_string(),
                parameters: serde_json::json!({"reason": "critical_health"}),
                executed_at: at,
                success: false,
                message: "Scheduled system reboot due to critical health".to_string(),
            });
        }
        actions
    }

    // ========================================================================
    // OTA Updates & Remote Commands
    // ========================================================================

    /// 5–15 fleet-level OTA updates. Completion timestamps and progress are
    /// derived from the same status draw.
    pub fn ota_updates(&mut self, trucks: &[Truck]) -> Vec<OtaUpdate> {
        const STATUSES: [OtaStatus; 7] = [
            OtaStatus::Pending,
            OtaStatus::Downloading,
            OtaStatus::Verifying,
            OtaStatus::Applying,
            OtaStatus::Success,
            OtaStatus::Failed,
            OtaStatus::Rollback,
        ];

        let count = defaults::OTA_UPDATES_MIN + self.rng.gen_range(0..=defaults::OTA_UPDATES_SPREAD);
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let target = *self.pick(&UpdateTarget::ALL);
                let status = *self.pick(&STATUSES);
                let created_at = now - Duration::seconds(self.rng.gen_range(0..30 * 24 * 3_600));
                let started_at = (status != OtaStatus::Pending)
                    .then(|| created_at + Duration::seconds(self.rng.gen_range(0..3_600)));
                let completed_at = status.is_terminal().then(|| {
                    started_at.unwrap_or(created_at)
                        + Duration::seconds(self.rng.gen_range(0..7_200))
                });
                let (truck_id, fleet_id) = self.pick_target_refs(trucks);

                let mut update = OtaUpdate {
                    id: Uuid::new_v4().to_string(),
                    update_id: format!("UPDATE-{}", self.short_id()),
                    truck_id,
                    fleet_id,
                    version: format!(
                        "2.{}.{}",
                        self.rng.gen_range(0..10),
                        self.rng.gen_range(0..10)
                    ),
                    target,
                    url: format!(
                        "https://updates.example.com/{}-{}.bin",
                        target.as_str().to_lowercase(),
                        self.short_id()
                    ),
                    checksum: format!("sha256:{}", self.short_id()),
                    signature: format!("sig:{}", Uuid::new_v4()),
                    size_bytes: self.rng.gen_range(1..100) * 1_024 * 1_024,
                    priority: *self.pick(&UpdatePriority::ALL),
                    requires_reboot: target == UpdateTarget::Firmware || self.rng.gen_bool(0.5),
                    deadline: self
                        .rng
                        .gen_bool(0.5)
                        .then(|| now + Duration::days(7)),
                    status,
                    progress_percent: if status.is_terminal() {
                        100.0
                    } else {
                        self.rng.gen_range(0.0..100.0)
                    },
                    started_at,
                    completed_at,
                    last_error: (status == OtaStatus::Failed)
                        .then(|| "Download failed: network error".to_string()),
                    created_at,
                    updated_at: completed_at.or(started_at).unwrap_or(created_at),
                };
                update.clamp_progress();
                update
            })
            .collect()
    }

    /// 10–20 remote commands mirroring operator activity.
    pub fn remote_commands(&mut self, trucks: &[Truck]) -> Vec<RemoteCommand> {
        const STATUSES: [CommandStatus; 6] = [
            CommandStatus::Pending,
            CommandStatus::Executing,
            CommandStatus::Success,
            CommandStatus::Failed,
            CommandStatus::Timeout,
            CommandStatus::Cancelled,
        ];

        let count = defaults::REMOTE_COMMANDS_MIN
            + self.rng.gen_range(0..=defaults::REMOTE_COMMANDS_SPREAD);
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let command_type = *self.pick(&CommandType::ALL);
                let status = *self.pick(&STATUSES);
                let issued_at = now - Duration::seconds(self.rng.gen_range(0..7 * 24 * 3_600));
                let completed_at = status
                    .is_terminal()
                    .then(|| issued_at + Duration::seconds(self.rng.gen_range(0..3_600)));
                let (truck_id, fleet_id) = self.pick_target_refs(trucks);

                RemoteCommand {
                    id: Uuid::new_v4().to_string(),
                    command_id: format!("CMD-{}", self.short_id()),
                    truck_id,
                    fleet_id,
                    command_type,
                    parameters: command_parameters(command_type),
                    issued_at,
                    deadline: self.rng.gen_bool(0.5).then(|| now + Duration::days(1)),
                    requires_ack: self.rng.gen_bool(0.5),
                    status,
                    result: (status == CommandStatus::Success)
                        .then(|| command_result(command_type)),
                    error: (status == CommandStatus::Failed)
                        .then(|| "Command execution failed: timeout".to_string()),
                    completed_at,
                    created_at: issued_at,
                    updated_at: completed_at.unwrap_or(issued_at),
                }
            })
            .collect()
    }

    /// Draw the truck-reference set for a fleet-level record: either the
    /// whole fleet (broadcast, fleet_id set) or a 1–3 truck subset
    /// (single truck keeps truck_id, larger subsets become a fleet ref).
    fn pick_target_refs(&mut self, trucks: &[Truck]) -> (Option<String>, Option<String>) {
        if trucks.is_empty() {
            return (None, Some(Uuid::new_v4().to_string()));
        }
        if self.rng.gen_bool(defaults::FLEET_WIDE_TARGET_PROBABILITY) {
            return (None, Some(Uuid::new_v4().to_string()));
        }
        let subset = self.rng.gen_range(1..=3usize.min(trucks.len()));
        if subset == 1 {
            let truck = &trucks[self.rng.gen_range(0..trucks.len())];
            (Some(truck.id.clone()), None)
        } else {
            (None, Some(Uuid::new_v4().to_string()))
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn pick<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }

    fn short_id(&mut self) -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

impl Default for FleetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable alert message for a type/severity pair.
fn alert_message(alert_type: AlertType, severity: AlertSeverity) -> String {
    let (info, warning, critical, emergency) = match alert_type {
        AlertType::DrowsyDriver => (
            "Driver showing signs of drowsiness",
            "Driver drowsiness detected - monitor closely",
            "Driver drowsiness detected - immediate attention required",
            "Driver asleep at wheel - emergency stop required",
        ),
        AlertType::LaneDeparture => (
            "Minor lane departure detected",
            "Lane departure detected - correct steering",
            "Severe lane departure detected - immediate correction required",
            "Vehicle leaving roadway - emergency intervention required",
        ),
        AlertType::CargoTamper => (
            "Possible cargo movement detected",
            "Cargo tampering detected - inspect cargo area",
            "Cargo tampering confirmed - secure cargo immediately",
            "Cargo theft in progress - notify authorities immediately",
        ),
        AlertType::HarshBraking => (
            "Moderate braking detected",
            "Harsh braking detected - review driving behavior",
            "Emergency braking detected - check for accidents",
            "Collision detected - emergency response required",
        ),
        AlertType::RapidAcceleration => (
            "Aggressive acceleration detected",
            "Rapid acceleration detected - review driving behavior",
            "Dangerous acceleration detected - immediate intervention required",
            "Loss of control detected - emergency stop required",
        ),
        AlertType::OverSpeeding => (
            "Speed limit slightly exceeded",
            "Speed limit significantly exceeded - slow down",
            "Dangerous speeding detected - immediate intervention required",
            "Extreme speeding detected - emergency stop required",
        ),
        AlertType::HighTemperature => (
            "System temperature slightly elevated",
            "System temperature high - monitor closely",
            "System temperature critical - reduce load immediately",
            "System overheating - emergency shutdown required",
        ),
        AlertType::LowDiskSpace => (
            "Disk space running low",
            "Disk space critically low - clean up space",
            "Disk space almost full - immediate cleanup required",
            "Disk full - system may become unstable",
        ),
        AlertType::HighCpuUsage => (
            "CPU usage elevated",
            "CPU usage high - monitor system performance",
            "CPU usage critical - reduce load immediately",
            "System unresponsive - emergency restart required",
        ),
    };
    match severity {
        AlertSeverity::Info => info,
        AlertSeverity::Warning => warning,
        AlertSeverity::Critical => critical,
        AlertSeverity::Emergency => emergency,
    }
    .to_string()
}

/// Canonical parameter payload for a command kind.
fn command_parameters(command_type: CommandType) -> serde_json::Value {
    match command_type {
        CommandType::Reboot => serde_json::json!({
            "reason": "scheduled_maintenance", "delay_seconds": 30,
        }),
        CommandType::Shutdown => serde_json::json!({
            "reason": "system_update", "delay_seconds": 60,
        }),
        CommandType::RestartService => serde_json::json!({
            "service": "ml_engine", "timeout_seconds": 30,
        }),
        CommandType::GetDiagnostics => serde_json::json!({
            "detail_level": "full", "include_logs": true,
        }),
        CommandType::UpdateConfig => serde_json::json!({
            "config": {"ml_edge": {"enable_drowsiness": true, "camera": {"fps": 15}}},
        }),
        CommandType::RunHealthCheck => serde_json::json!({
            "check_type": "full", "timeout_seconds": 60,
        }),
        CommandType::CaptureSnapshot => serde_json::json!({
            "include_logs": true, "include_config": true,
        }),
        CommandType::FlushWal => serde_json::json!({"force": true}),
    }
}

/// Result payload attached to a successfully executed command.
fn command_result(command_type: CommandType) -> serde_json::Value {
    match command_type {
        CommandType::Reboot => serde_json::json!({
            "success": true, "message": "System will reboot in 30 seconds",
        }),
        CommandType::Shutdown => serde_json::json!({
            "success": true, "message": "System will shutdown in 60 seconds",
        }),
        CommandType::RestartService => serde_json::json!({
            "success": true, "message": "Service restarted successfully", "service": "ml_engine",
        }),
        CommandType::GetDiagnostics => serde_json::json!({
            "success": true, "message": "Diagnostics collected successfully",
        }),
        CommandType::UpdateConfig => serde_json::json!({
            "success": true, "message": "Configuration updated successfully",
        }),
        CommandType::RunHealthCheck => serde_json::json!({
            "success": true, "message": "Health check completed successfully",
        }),
        CommandType::CaptureSnapshot => serde_json::json!({
            "success": true, "message": "Snapshot captured successfully",
        }),
        CommandType::FlushWal => serde_json::json!({
            "success": true, "message": "WAL flushed successfully",
        }),
    }
}
