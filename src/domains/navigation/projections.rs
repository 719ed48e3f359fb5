use super::events::NavigationEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running patrol statistics folded from navigation events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatrolProjection {
    pub armed_at: Option<DateTime<Utc>>,
    pub dispatches: u64,
    pub server_waits: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub send_failures: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub laps_completed: u64,
    pub last_reached_index: Option<usize>,
}

impl PatrolProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_event(&mut self, event: &NavigationEvent) {
        match event {
            NavigationEvent::Armed { timestamp, .. } => {
                self.armed_at.get_or_insert(*timestamp);
            }
            NavigationEvent::DispatchStarted { .. } => self.dispatches += 1,
            NavigationEvent::AwaitingServer { .. } => self.server_waits += 1,
            NavigationEvent::ServerReady { .. } => {}
            NavigationEvent::GoalAccepted { .. } => self.accepted += 1,
            NavigationEvent::GoalRejected { .. } => self.rejected += 1,
            NavigationEvent::SendFailed { .. } => self.send_failures += 1,
            NavigationEvent::GoalSucceeded { waypoint_index, lap_completed, .. } => {
                self.succeeded += 1;
                self.last_reached_index = Some(*waypoint_index);
                if *lap_completed {
                    self.laps_completed += 1;
                }
            }
            NavigationEvent::GoalFailed { .. } => self.failed += 1,
        }
    }
}
