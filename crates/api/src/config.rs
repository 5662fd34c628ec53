//! Service configuration
//!
//! Layered with the `config` crate:
//! 1. `config/default.toml`
//! 2. the file named by `FREIGHTWATCH_CONFIG`, if set
//! 3. `FREIGHTWATCH__SECTION__KEY` environment variables

use crate::rate_limit::RateLimitConfig;
use action_dispatch::MqttConfig;
use geofence::{Geofence, GeofenceError, GeofenceIndex};
use route_context::{Hotspot, HotspotMap, TrafficLevel};
use serde::{Deserialize, Serialize};
use trip_monitor::EngineConfig;
use trip_runtime::RuntimeConfig;

pub const CONFIG_PATH_ENV: &str = "FREIGHTWATCH_CONFIG";
pub const ENV_PREFIX: &str = "FREIGHTWATCH";

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, or error
    pub level: String,
    /// One JSON object per line
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub engine: EngineConfig,
    pub runtime: RuntimeConfig,
    pub mqtt: MqttConfig,
    pub rate_limit: RateLimitConfig,
    /// Authorized zones along the corridor
    pub geofences: Vec<Geofence>,
    /// Known theft hotspots; empty disables route context
    pub hotspots: Vec<Hotspot>,
    pub traffic: TrafficLevel,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn geofence_index(&self) -> Result<GeofenceIndex, GeofenceError> {
        GeofenceIndex::new(self.geofences.clone())
    }

    pub fn hotspot_map(&self) -> Option<HotspotMap> {
        if self.hotspots.is_empty() {
            return None;
        }
        Some(HotspotMap::new(self.hotspots.clone()).with_traffic(self.traffic))
    }
}
