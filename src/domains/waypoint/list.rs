use super::types::{Waypoint, WaypointEntry};
use crate::common::{DomainError, DomainResult};

/// Ordered patrol table. Never empty once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointList {
    waypoints: Vec<Waypoint>,
}

impl WaypointList {
    pub fn new(waypoints: Vec<Waypoint>) -> DomainResult<Self> {
        if waypoints.is_empty() {
            return Err(DomainError::Configuration {
                reason: "waypoint list is empty".to_string(),
            });
        }
        Ok(Self { waypoints })
    }

    pub fn from_entries(entries: &[WaypointEntry]) -> DomainResult<Self> {
        Self::new(entries.iter().copied().map(Waypoint::from).collect())
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Never true for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Checks that `index` is a valid starting cursor for this list.
    pub fn validate_index(&self, index: usize) -> DomainResult<usize> {
        if index >= self.waypoints.len() {
            return Err(DomainError::Configuration {
                reason: format!(
                    "start index {} out of range for {} waypoints",
                    index,
                    self.waypoints.len()
                ),
            });
        }
        Ok(index)
    }
}
