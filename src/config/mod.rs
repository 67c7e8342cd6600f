//! Fleet data-layer configuration loaded from TOML files.
//!
//! Every tunable is a field with a serde default matching the constants in
//! [`defaults`], so behavior is unchanged when no config file is present.
//!
//! Load order for [`FleetConfig::load`]:
//! 1. `$FLEETDECK_CONFIG` env var
//! 2. `./fleetdeck.toml`
//! 3. Built-in defaults

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one dashboard client session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetConfig {
    /// REST and WebSocket endpoints plus request timeout.
    #[serde(default)]
    pub api: ApiConfig,

    /// Session-seed parameters for the entity generator.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Local store backing selection.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Transport endpoints and timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST surface.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket endpoint for the event bus.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Fixed outbound request timeout (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Entity generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Trucks created on first run.
    #[serde(default = "default_truck_count")]
    pub truck_count: usize,

    /// Optional fixed RNG seed. `None` draws from entropy; set for
    /// reproducible fleets in demos and tests.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            truck_count: default_truck_count(),
            rng_seed: None,
        }
    }
}

/// Local store backing selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `"memory"` or `"sled"`.
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database path for the sled backing.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8081/events".to_string()
}

fn default_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}

fn default_truck_count() -> usize {
    defaults::SEED_TRUCK_COUNT
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_store_path() -> String {
    "./fleetdeck-session".to_string()
}

impl FleetConfig {
    /// Load configuration, searching the standard locations.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FLEETDECK_CONFIG") {
            match Self::from_file(&path) {
                Ok(config) => {
                    info!(path = %path, "Loaded config from FLEETDECK_CONFIG");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Could not load FLEETDECK_CONFIG, falling back");
                }
            }
        }

        let local = Path::new("fleetdeck.toml");
        if local.exists() {
            match Self::from_file(local) {
                Ok(config) => {
                    info!("Loaded config from ./fleetdeck.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Could not parse ./fleetdeck.toml, using defaults");
                }
            }
        }

        Self::default()
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Config loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(String),
    #[error("could not parse config file: {0}")]
    Parse(String),
}
