use crate::common::{DomainResult, FailureReason, NavigationError};
use crate::domains::waypoint::{NavigationGoal, Waypoint, WaypointEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Terminal status of an accepted goal as reported by the navigation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Succeeded,
    Aborted,
    Canceled,
}

/// Acknowledgement of a sent goal.
#[derive(Debug)]
pub enum GoalResponse {
    /// The service will eventually report a terminal status on `result`.
    Accepted { result: oneshot::Receiver<GoalStatus> },
    Rejected,
}

/// Port to the remote motion-planning service ("accept goal / report result").
#[async_trait]
pub trait NavigationServer: Send + Sync {
    /// Waits up to `timeout` for the service to become reachable.
    async fn wait_for_server(&self, timeout: Duration) -> bool;

    /// Transmits a goal and resolves once the service has accepted or rejected it.
    async fn send_goal(&self, goal: NavigationGoal) -> Result<GoalResponse, NavigationError>;
}

/// Receives the outcome of one dispatch attempt, identified by `goal_id`.
#[async_trait]
pub trait GoalOutcomeSink: Send + Sync {
    async fn goal_accepted(&self, goal_id: Uuid);
    async fn goal_succeeded(&self, goal_id: Uuid);
    async fn goal_failed(&self, goal_id: Uuid, reason: FailureReason);
}

/// A request handed from the sequencer to the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub goal_id: Uuid,
    pub waypoint_index: usize,
    pub waypoint: Waypoint,
}

/// Seam between the sequencer and whatever sends goals on its behalf.
///
/// Implementations must report exactly one terminal outcome (`goal_succeeded`
/// or `goal_failed`) to `sink` per request.
#[async_trait]
pub trait GoalDispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest, sink: Arc<dyn GoalOutcomeSink>);
}

/// Source of the patrol table.
pub trait WaypointSource: Send + Sync {
    fn load_waypoints(&self) -> DomainResult<Vec<WaypointEntry>>;
}
