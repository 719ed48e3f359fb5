use super::events::{EventPublisher, NavigationEvent};
use super::ports::{DispatchRequest, GoalDispatcher, GoalOutcomeSink};
use crate::common::{DomainResult, FailureReason};
use crate::domains::logger::DynLogger;
use crate::domains::waypoint::{distance, Position2D, Waypoint, WaypointList};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalPhase {
    Pending,
    Accepted,
}

/// The single outstanding dispatch, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightGoal {
    pub goal_id: Uuid,
    pub waypoint_index: usize,
    pub waypoint: Waypoint,
    pub dispatched_at: DateTime<Utc>,
    pub phase: GoalPhase,
}

/// Mutable patrol state. Only ever touched under the sequencer's mutex.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerContext {
    pub armed: bool,
    pub cursor: usize,
    pub in_flight: Option<InFlightGoal>,
    pub laps_completed: u64,
}

struct SequencerCore {
    waypoints: WaypointList,
    context: Mutex<SequencerContext>,
    logger: DynLogger,
    events: EventPublisher,
}

/// Owns the patrol table and the cyclic cursor, and decides when the next
/// goal goes out.
///
/// Cheap to clone; clones share the same context.
#[derive(Clone)]
pub struct WaypointSequencer {
    core: Arc<SequencerCore>,
    dispatcher: Arc<dyn GoalDispatcher>,
    pose_feed: Option<watch::Receiver<Position2D>>,
}

impl WaypointSequencer {
    pub fn new(
        waypoints: WaypointList,
        start_index: usize,
        dispatcher: Arc<dyn GoalDispatcher>,
        logger: DynLogger,
        events: EventPublisher,
    ) -> DomainResult<Self> {
        let cursor = waypoints.validate_index(start_index)?;
        Ok(Self {
            core: Arc::new(SequencerCore {
                waypoints,
                context: Mutex::new(SequencerContext {
                    armed: false,
                    cursor,
                    in_flight: None,
                    laps_completed: 0,
                }),
                logger,
                events,
            }),
            dispatcher,
            pose_feed: None,
        })
    }

    /// Current robot position, used only for the distance-to-goal telemetry.
    pub fn with_pose_feed(mut self, pose_feed: watch::Receiver<Position2D>) -> Self {
        self.pose_feed = Some(pose_feed);
        self
    }

    pub fn waypoints(&self) -> &WaypointList {
        &self.core.waypoints
    }

    pub async fn arm(&self) {
        let mut ctx = self.core.context.lock().await;
        if ctx.armed {
            return;
        }
        ctx.armed = true;
        self.core
            .logger
            .info(&format!("Start signal received, patrol armed at waypoint {}", ctx.cursor));
        self.core.events.publish(NavigationEvent::Armed {
            cursor: ctx.cursor,
            timestamp: Utc::now(),
        });
    }

    /// Starts a dispatch of the waypoint under the cursor when armed and idle.
    ///
    /// Suspends for as long as the dispatcher waits for the navigation server
    /// and for the goal acknowledgement; the terminal result arrives later
    /// through the outcome callbacks.
    pub async fn tick(&self) {
        let request = {
            let mut ctx = self.core.context.lock().await;
            if !ctx.armed || ctx.in_flight.is_some() {
                return;
            }
            let index = ctx.cursor;
            let waypoint = match self.core.waypoints.get(index) {
                Some(wp) => *wp,
                None => {
                    self.core
                        .logger
                        .error(&format!("Cursor {} is outside the waypoint table", index));
                    return;
                }
            };
            let goal_id = Uuid::new_v4();
            ctx.in_flight = Some(InFlightGoal {
                goal_id,
                waypoint_index: index,
                waypoint,
                dispatched_at: Utc::now(),
                phase: GoalPhase::Pending,
            });
            DispatchRequest { goal_id, waypoint_index: index, waypoint }
        };

        let distance_to_goal = self
            .pose_feed
            .as_ref()
            .map(|feed| distance(&feed.borrow(), request.waypoint.position()));
        match distance_to_goal {
            Some(d) => self.core.logger.info(&format!(
                "Dispatching waypoint {} ({:.2}, {:.2}), {:.2} m away",
                request.waypoint_index,
                request.waypoint.position().x,
                request.waypoint.position().y,
                d
            )),
            None => self.core.logger.info(&format!(
                "Dispatching waypoint {} ({:.2}, {:.2})",
                request.waypoint_index,
                request.waypoint.position().x,
                request.waypoint.position().y
            )),
        }
        self.core.events.publish(NavigationEvent::DispatchStarted {
            goal_id: request.goal_id,
            waypoint_index: request.waypoint_index,
            distance_to_goal,
            timestamp: Utc::now(),
        });

        let sink: Arc<dyn GoalOutcomeSink> = self.core.clone();
        self.dispatcher.dispatch(request, sink).await;
    }

    pub async fn on_goal_accepted(&self, goal_id: Uuid) {
        self.core.goal_accepted(goal_id).await;
    }

    pub async fn on_goal_succeeded(&self, goal_id: Uuid) {
        self.core.goal_succeeded(goal_id).await;
    }

    pub async fn on_goal_failed(&self, goal_id: Uuid, reason: FailureReason) {
        self.core.goal_failed(goal_id, reason).await;
    }

    pub async fn snapshot(&self) -> SequencerContext {
        self.core.context.lock().await.clone()
    }

    pub async fn cursor(&self) -> usize {
        self.core.context.lock().await.cursor
    }

    pub async fn in_flight(&self) -> Option<InFlightGoal> {
        self.core.context.lock().await.in_flight.clone()
    }
}

impl SequencerCore {
    /// Takes the in-flight goal if it belongs to `goal_id`.
    fn take_matching(&self, ctx: &mut SequencerContext, goal_id: Uuid) -> Option<InFlightGoal> {
        match &ctx.in_flight {
            Some(goal) if goal.goal_id == goal_id => ctx.in_flight.take(),
            _ => {
                self.logger
                    .warn(&format!("Ignoring outcome for goal {} which is not in flight", goal_id));
                None
            }
        }
    }
}

#[async_trait]
impl GoalOutcomeSink for SequencerCore {
    async fn goal_accepted(&self, goal_id: Uuid) {
        let mut ctx = self.context.lock().await;
        if let Some(goal) = ctx.in_flight.as_mut().filter(|g| g.goal_id == goal_id) {
            goal.phase = GoalPhase::Accepted;
        }
    }

    async fn goal_succeeded(&self, goal_id: Uuid) {
        let mut ctx = self.context.lock().await;
        let Some(goal) = self.take_matching(&mut ctx, goal_id) else {
            return;
        };
        ctx.cursor = (ctx.cursor + 1) % self.waypoints.len();
        let lap_completed = ctx.cursor == 0;
        if lap_completed {
            ctx.laps_completed += 1;
        }
        self.logger.info(&format!(
            "Navigation completed at waypoint {}, next waypoint {}",
            goal.waypoint_index, ctx.cursor
        ));
        self.events.publish(NavigationEvent::GoalSucceeded {
            goal_id,
            waypoint_index: goal.waypoint_index,
            next_index: ctx.cursor,
            lap_completed,
            timestamp: Utc::now(),
        });
    }

    async fn goal_failed(&self, goal_id: Uuid, reason: FailureReason) {
        let mut ctx = self.context.lock().await;
        let Some(goal) = self.take_matching(&mut ctx, goal_id) else {
            return;
        };
        self.logger.warn(&format!(
            "Goal for waypoint {} failed: {}; retrying on next tick",
            goal.waypoint_index, reason
        ));
        self.events.publish(NavigationEvent::GoalFailed {
            goal_id,
            waypoint_index: goal.waypoint_index,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }
}
