use crate::common::{DomainError, DomainResult};
use crate::config::PatrolConfig;
use crate::domains::navigation::ports::WaypointSource;
use crate::domains::waypoint::WaypointEntry;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable naming a waypoint file, used when the config names none.
pub const WAYPOINT_FILE_ENV: &str = "WAYPOINT_FILE";

/// Reads a JSON array of `{ "x": .., "y": .., "yaw": .. }` objects.
pub struct FilesystemWaypointSource {
    path: PathBuf,
}

impl FilesystemWaypointSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file named by `WAYPOINT_FILE`, if set and non-empty.
    pub fn from_env() -> Option<Self> {
        env::var_os(WAYPOINT_FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl WaypointSource for FilesystemWaypointSource {
    fn load_waypoints(&self) -> DomainResult<Vec<WaypointEntry>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DomainError::InfrastructureError(format!("{}: {}", self.path.display(), e))
        })?;
        let entries: Vec<WaypointEntry> = serde_json::from_str(&content)?;
        Ok(entries)
    }
}

/// Serves the table embedded in the patrol configuration.
pub struct ConfigWaypointSource {
    entries: Vec<WaypointEntry>,
}

impl ConfigWaypointSource {
    pub fn new(config: &PatrolConfig) -> Self {
        Self { entries: config.waypoints.clone() }
    }
}

impl WaypointSource for ConfigWaypointSource {
    fn load_waypoints(&self) -> DomainResult<Vec<WaypointEntry>> {
        Ok(self.entries.clone())
    }
}

/// Picks `patrol.waypoint_file`, then `WAYPOINT_FILE`, then the inline table.
pub fn source_for(config: &PatrolConfig) -> Box<dyn WaypointSource> {
    if let Some(path) = &config.waypoint_file {
        return Box::new(FilesystemWaypointSource::new(path.clone()));
    }
    match FilesystemWaypointSource::from_env() {
        Some(source) => Box::new(source),
        None => Box::new(ConfigWaypointSource::new(config)),
    }
}
