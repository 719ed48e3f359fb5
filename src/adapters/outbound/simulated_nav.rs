use crate::common::NavigationError;
use crate::config::SimulationConfig;
use crate::domains::navigation::ports::{GoalResponse, GoalStatus, NavigationServer};
use crate::domains::waypoint::{distance, NavigationGoal, Position2D};
use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::time::sleep;

/// Forced behaviour for the next goal sent to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedResponse {
    Succeed,
    Reject,
    SendFailure,
    Abort,
    /// Accept and never report a result.
    Stall,
}

/// Goals and stalled result channels retained by the simulator.
pub const GOAL_HISTORY: usize = 64;

/// In-process stand-in for the motion-planning service.
///
/// Drives straight to each goal at `speed_mps`, reports success and publishes
/// the new robot position on its pose feed. Goals sent before the server has
/// answered an availability poll are refused with `ServiceUnavailable`.
pub struct SimulatedNavigationServer {
    settings: SimulationConfig,
    polls: AtomicU32,
    script: Mutex<VecDeque<ScriptedResponse>>,
    received: Mutex<VecDeque<NavigationGoal>>,
    stalled: Mutex<VecDeque<oneshot::Sender<GoalStatus>>>,
    pose: Arc<watch::Sender<Position2D>>,
}

impl SimulatedNavigationServer {
    pub fn new(settings: SimulationConfig, start: Position2D) -> Self {
        let (pose, _) = watch::channel(start);
        Self {
            settings,
            polls: AtomicU32::new(0),
            script: Mutex::new(VecDeque::new()),
            received: Mutex::new(VecDeque::new()),
            stalled: Mutex::new(VecDeque::new()),
            pose: Arc::new(pose),
        }
    }

    /// Queues responses consumed one per `send_goal`, ahead of the default behaviour.
    pub async fn script(&self, responses: impl IntoIterator<Item = ScriptedResponse>) {
        self.script.lock().await.extend(responses);
    }

    pub fn pose_feed(&self) -> watch::Receiver<Position2D> {
        self.pose.subscribe()
    }

    pub fn availability_polls(&self) -> u32 {
        self.polls.load(Ordering::Acquire)
    }

    /// The most recent goals, oldest first, at most `GOAL_HISTORY` of them.
    pub async fn received_goals(&self) -> Vec<NavigationGoal> {
        self.received.lock().await.iter().cloned().collect()
    }

    fn is_available(&self) -> bool {
        self.polls.load(Ordering::Acquire) > self.settings.unavailable_polls
    }

    fn travel_time(&self, target: &Position2D) -> Duration {
        let meters = distance(&self.pose.borrow(), target);
        let speed = self.settings.speed_mps;
        if speed > 0.0 && meters.is_finite() {
            // Too far to represent: the goal never arrives.
            Duration::try_from_secs_f64(meters / speed).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    async fn next_response(&self) -> ScriptedResponse {
        if let Some(scripted) = self.script.lock().await.pop_front() {
            return scripted;
        }
        let p = self.settings.reject_probability;
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        if rand::thread_rng().gen_bool(p) {
            ScriptedResponse::Reject
        } else {
            ScriptedResponse::Succeed
        }
    }
}

#[async_trait]
impl NavigationServer for SimulatedNavigationServer {
    async fn wait_for_server(&self, timeout: Duration) -> bool {
        let poll = self.polls.fetch_add(1, Ordering::AcqRel) + 1;
        if poll <= self.settings.unavailable_polls {
            sleep(timeout).await;
            return false;
        }
        true
    }

    async fn send_goal(&self, goal: NavigationGoal) -> Result<GoalResponse, NavigationError> {
        if !self.is_available() {
            return Err(NavigationError::ServiceUnavailable);
        }
        push_bounded(&mut *self.received.lock().await, goal.clone());
        let target = goal.pose.position;

        match self.next_response().await {
            ScriptedResponse::SendFailure => {
                Err(NavigationError::TransportFailure("simulated send failure".to_string()))
            }
            ScriptedResponse::Reject => Ok(GoalResponse::Rejected),
            ScriptedResponse::Stall => {
                let (tx, rx) = oneshot::channel();
                push_bounded(&mut *self.stalled.lock().await, tx);
                Ok(GoalResponse::Accepted { result: rx })
            }
            ScriptedResponse::Abort => {
                let (tx, rx) = oneshot::channel();
                let halfway = self.travel_time(&target) / 2;
                tokio::spawn(async move {
                    sleep(halfway).await;
                    let _ = tx.send(GoalStatus::Aborted);
                });
                Ok(GoalResponse::Accepted { result: rx })
            }
            ScriptedResponse::Succeed => {
                let (tx, rx) = oneshot::channel();
                let travel = self.travel_time(&target);
                let pose = self.pose.clone();
                tokio::spawn(async move {
                    sleep(travel).await;
                    pose.send_replace(target);
                    let _ = tx.send(GoalStatus::Succeeded);
                });
                Ok(GoalResponse::Accepted { result: rx })
            }
        }
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, item: T) {
    if history.len() == GOAL_HISTORY {
        history.pop_front();
    }
    history.push_back(item);
}
