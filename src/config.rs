use crate::common::{DomainError, DomainResult};
use crate::domains::waypoint::{WaypointEntry, WaypointList};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `WP_MANAGER__PATROL__START_INDEX=3`.
pub const ENV_PREFIX: &str = "WP_MANAGER";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub patrol: PatrolConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub action_name: String,
    pub frame_id: String,
    pub server_poll_interval_ms: u64,
    pub tick_period_ms: u64,
    /// Unset means an accepted goal is awaited forever.
    pub stall_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    pub start_index: usize,
    pub waypoints: Vec<WaypointEntry>,
    /// JSON file that replaces `waypoints` when set.
    pub waypoint_file: Option<PathBuf>,
    /// Arm immediately instead of waiting for the operator's start signal.
    pub auto_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub speed_mps: f64,
    pub unavailable_polls: u32,
    pub reject_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<String>,
    /// Queue log lines and write them from a background task.
    pub buffer_capacity: Option<usize>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            action_name: "/navigate_to_pose".to_string(),
            frame_id: "map".to_string(),
            server_poll_interval_ms: 1000,
            tick_period_ms: 1000,
            stall_timeout_secs: None,
        }
    }
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            start_index: 0,
            waypoints: default_patrol(),
            waypoint_file: None,
            auto_start: false,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed_mps: 5.0,
            unavailable_polls: 2,
            reject_probability: 0.0,
        }
    }
}

/// Reference patrol route in the "map" frame.
pub fn default_patrol() -> Vec<WaypointEntry> {
    [
        (20.5, 47.12, 0.977),
        (28.9, 56.52, 0.25),
        (57.89, 41.75, -0.57),
        (93.22, 17.30, -0.57),
        (106.24, 8.04, -0.57),
        (93.22, 17.30, 2.55),
        (57.89, 41.75, 2.55),
        (33.51, 61.13, 1.69),
        (38.32, 73.28, 0.94),
        (28.92, 64.73, -2.17),
        (20.5, 47.12, -2.17),
        (10.97, 51.26, 2.47),
    ]
    .into_iter()
    .map(|(x, y, yaw)| WaypointEntry { x, y, yaw })
    .collect()
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reads `path` (TOML) and applies `WP_MANAGER__*` environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Rejects an empty patrol table, a start index outside it and
    /// simulator settings that cannot drive a goal.
    pub fn validate(&self) -> DomainResult<()> {
        if self.navigation.tick_period_ms == 0 {
            return Err(invalid("tick_period_ms must be greater than zero"));
        }
        let speed = self.simulation.speed_mps;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(invalid(&format!("speed_mps must be a positive number, got {}", speed)));
        }
        let reject = self.simulation.reject_probability;
        if !(0.0..=1.0).contains(&reject) {
            return Err(invalid(&format!(
                "reject_probability must lie in [0, 1], got {}",
                reject
            )));
        }
        if self.logging.buffer_capacity == Some(0) {
            return Err(invalid("buffer_capacity must be greater than zero"));
        }
        // A waypoint file is checked once it has been loaded.
        if self.patrol.waypoint_file.is_none() {
            let list = WaypointList::from_entries(&self.patrol.waypoints)?;
            list.validate_index(self.patrol.start_index)?;
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> DomainError {
    DomainError::Configuration {
        reason: reason.to_string(),
    }
}
