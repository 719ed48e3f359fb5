use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NavigationEvent {
    Armed {
        cursor: usize,
        timestamp: DateTime<Utc>,
    },
    DispatchStarted {
        goal_id: Uuid,
        waypoint_index: usize,
        distance_to_goal: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    AwaitingServer {
        goal_id: Uuid,
        attempt: u64,
        timestamp: DateTime<Utc>,
    },
    ServerReady {
        goal_id: Uuid,
        attempts: u64,
        timestamp: DateTime<Utc>,
    },
    GoalAccepted {
        goal_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    GoalRejected {
        goal_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    SendFailed {
        goal_id: Uuid,
        detail: String,
        timestamp: DateTime<Utc>,
    },
    GoalSucceeded {
        goal_id: Uuid,
        waypoint_index: usize,
        next_index: usize,
        lap_completed: bool,
        timestamp: DateTime<Utc>,
    },
    GoalFailed {
        goal_id: Uuid,
        waypoint_index: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for NavigationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NavigationEvent::Armed { .. } => "Armed",
            NavigationEvent::DispatchStarted { .. } => "DispatchStarted",
            NavigationEvent::AwaitingServer { .. } => "AwaitingServer",
            NavigationEvent::ServerReady { .. } => "ServerReady",
            NavigationEvent::GoalAccepted { .. } => "GoalAccepted",
            NavigationEvent::GoalRejected { .. } => "GoalRejected",
            NavigationEvent::SendFailed { .. } => "SendFailed",
            NavigationEvent::GoalSucceeded { .. } => "GoalSucceeded",
            NavigationEvent::GoalFailed { .. } => "GoalFailed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NavigationEvent::Armed { timestamp, .. } => *timestamp,
            NavigationEvent::DispatchStarted { timestamp, .. } => *timestamp,
            NavigationEvent::AwaitingServer { timestamp, .. } => *timestamp,
            NavigationEvent::ServerReady { timestamp, .. } => *timestamp,
            NavigationEvent::GoalAccepted { timestamp, .. } => *timestamp,
            NavigationEvent::GoalRejected { timestamp, .. } => *timestamp,
            NavigationEvent::SendFailed { timestamp, .. } => *timestamp,
            NavigationEvent::GoalSucceeded { timestamp, .. } => *timestamp,
            NavigationEvent::GoalFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// Best-effort event output. A full or closed channel drops the event.
#[derive(Clone, Default)]
pub struct EventPublisher {
    sender: Option<mpsc::Sender<NavigationEvent>>,
}

impl EventPublisher {
    pub fn new(sender: mpsc::Sender<NavigationEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn publish(&self, event: NavigationEvent) {
        if let Some(sender) = &self.sender {
            if let Err(e) = sender.try_send(event) {
                tracing::debug!("Dropped navigation event: {}", e);
            }
        }
    }
}
