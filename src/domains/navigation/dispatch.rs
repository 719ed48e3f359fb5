use super::events::{EventPublisher, NavigationEvent};
use super::ports::{
    DispatchRequest, GoalDispatcher, GoalOutcomeSink, GoalResponse, GoalStatus, NavigationServer,
};
use crate::common::FailureReason;
use crate::config::NavigationConfig;
use crate::domains::logger::DynLogger;
use crate::domains::waypoint::NavigationGoal;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    AwaitingServer,
    Sending,
    Accepted,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub frame_id: String,
    pub server_poll_interval: Duration,
    pub stall_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            frame_id: "map".to_string(),
            server_poll_interval: Duration::from_secs(1),
            stall_timeout: None,
        }
    }
}

impl From<&NavigationConfig> for DispatchSettings {
    fn from(config: &NavigationConfig) -> Self {
        Self {
            frame_id: config.frame_id.clone(),
            server_poll_interval: Duration::from_millis(config.server_poll_interval_ms),
            stall_timeout: config.stall_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Sends one goal at a time to the navigation server and reports its outcome.
pub struct GoalDispatchClient {
    server: Arc<dyn NavigationServer>,
    settings: DispatchSettings,
    server_ready: AtomicBool,
    state: Arc<watch::Sender<DispatchState>>,
    logger: DynLogger,
    events: EventPublisher,
}

impl GoalDispatchClient {
    pub fn new(
        server: Arc<dyn NavigationServer>,
        settings: DispatchSettings,
        logger: DynLogger,
        events: EventPublisher,
    ) -> Self {
        let (state, _) = watch::channel(DispatchState::Idle);
        Self {
            server,
            settings,
            server_ready: AtomicBool::new(false),
            state: Arc::new(state),
            logger,
            events,
        }
    }

    pub fn state(&self) -> DispatchState {
        *self.state.borrow()
    }

    pub fn is_server_confirmed(&self) -> bool {
        self.server_ready.load(Ordering::Acquire)
    }

    /// Polls availability at a fixed interval with no attempt limit.
    ///
    /// This is the one point where a tick is allowed to suspend; dropping the
    /// returned future abandons the wait.
    async fn wait_for_server(&self, goal_id: Uuid) {
        let interval = self.settings.server_poll_interval;
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.logger
                .warn(&format!("Waiting for navigation server (poll {})", attempt));
            self.events.publish(NavigationEvent::AwaitingServer {
                goal_id,
                attempt,
                timestamp: Utc::now(),
            });

            let started = Instant::now();
            if self.server.wait_for_server(interval).await {
                break;
            }
            let elapsed = started.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        self.server_ready.store(true, Ordering::Release);
        self.logger
            .info(&format!("Navigation server available after {} poll(s)", attempt));
        self.events.publish(NavigationEvent::ServerReady {
            goal_id,
            attempts: attempt,
            timestamp: Utc::now(),
        });
    }

    async fn report_failure(
        &self,
        goal_id: Uuid,
        reason: FailureReason,
        sink: &Arc<dyn GoalOutcomeSink>,
    ) {
        self.state.send_replace(DispatchState::Terminal);
        self.state.send_replace(DispatchState::Idle);
        sink.goal_failed(goal_id, reason).await;
    }
}

async fn await_result(
    result: oneshot::Receiver<GoalStatus>,
    stall_timeout: Option<Duration>,
) -> Result<(), FailureReason> {
    let status = match stall_timeout {
        Some(limit) => match tokio::time::timeout(limit, result).await {
            Ok(status) => status,
            Err(_) => return Err(FailureReason::Stalled { after: limit }),
        },
        None => result.await,
    };
    match status {
        Ok(GoalStatus::Succeeded) => Ok(()),
        Ok(GoalStatus::Aborted) => Err(FailureReason::Aborted),
        Ok(GoalStatus::Canceled) => Err(FailureReason::Canceled),
        Err(_) => Err(FailureReason::ResultLost),
    }
}

#[async_trait]
impl GoalDispatcher for GoalDispatchClient {
    async fn dispatch(&self, request: DispatchRequest, sink: Arc<dyn GoalOutcomeSink>) {
        let goal_id = request.goal_id;
        let goal = NavigationGoal {
            goal_id,
            frame_id: self.settings.frame_id.clone(),
            waypoint_index: request.waypoint_index,
            pose: *request.waypoint.pose(),
        };

        if !self.is_server_confirmed() {
            self.state.send_replace(DispatchState::AwaitingServer);
            self.wait_for_server(goal_id).await;
        }

        self.logger
            .info(&format!("Starting navigation to waypoint {}", request.waypoint_index));
        self.state.send_replace(DispatchState::Sending);

        let response = match self.server.send_goal(goal).await {
            Ok(response) => response,
            Err(e) => {
                self.server_ready.store(false, Ordering::Release);
                self.logger.error(&format!("Send goal call failed: {}", e));
                self.events.publish(NavigationEvent::SendFailed {
                    goal_id,
                    detail: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.report_failure(goal_id, FailureReason::SendFailed(e.to_string()), &sink)
                    .await;
                return;
            }
        };

        let result = match response {
            GoalResponse::Rejected => {
                self.logger.error("Goal was rejected by server");
                self.events.publish(NavigationEvent::GoalRejected {
                    goal_id,
                    timestamp: Utc::now(),
                });
                self.report_failure(goal_id, FailureReason::Rejected, &sink).await;
                return;
            }
            GoalResponse::Accepted { result } => result,
        };

        self.state.send_replace(DispatchState::Accepted);
        self.logger
            .info(&format!("Goal for waypoint {} accepted", request.waypoint_index));
        self.events.publish(NavigationEvent::GoalAccepted {
            goal_id,
            timestamp: Utc::now(),
        });
        sink.goal_accepted(goal_id).await;

        let state = self.state.clone();
        let logger = self.logger.clone();
        let stall_timeout = self.settings.stall_timeout;
        tokio::spawn(async move {
            let outcome = await_result(result, stall_timeout).await;
            state.send_replace(DispatchState::Terminal);
            state.send_replace(DispatchState::Idle);
            match outcome {
                Ok(()) => sink.goal_succeeded(goal_id).await,
                Err(reason) => {
                    logger.error(&format!("Navigation goal {} ended: {}", goal_id, reason));
                    sink.goal_failed(goal_id, reason).await;
                }
            }
        });
    }
}
