// Patrol Service - composes the sequencer, the dispatch client and the tick loop
use crate::adapters::inbound::waypoint_source::source_for;
use crate::common::ApplicationResult;
use crate::config::Config;
use crate::domains::logger::DynLogger;
use crate::domains::navigation::{
    DispatchSettings, EventPublisher, GoalDispatchClient, NavigationServer, WaypointSequencer,
};
use crate::domains::waypoint::{Position2D, WaypointList};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

pub struct PatrolService {
    sequencer: WaypointSequencer,
    tick_period: Duration,
    logger: DynLogger,
}

impl PatrolService {
    pub fn new(sequencer: WaypointSequencer, tick_period: Duration, logger: DynLogger) -> Self {
        Self { sequencer, tick_period, logger }
    }

    /// Wires a patrol against `server` from configuration.
    ///
    /// Fails with a configuration error when the waypoint table is empty or
    /// the start index falls outside it.
    pub fn from_config(
        config: &Config,
        server: Arc<dyn NavigationServer>,
        pose_feed: Option<watch::Receiver<Position2D>>,
        logger: DynLogger,
        events: EventPublisher,
    ) -> ApplicationResult<Self> {
        config.validate()?;
        let entries = source_for(&config.patrol).load_waypoints()?;
        let waypoints = WaypointList::from_entries(&entries)?;
        logger.info(&format!(
            "Loaded {} waypoints, starting at index {}",
            waypoints.len(),
            config.patrol.start_index
        ));

        let client = GoalDispatchClient::new(
            server,
            DispatchSettings::from(&config.navigation),
            logger.clone(),
            events.clone(),
        );
        let mut sequencer = WaypointSequencer::new(
            waypoints,
            config.patrol.start_index,
            Arc::new(client),
            logger.clone(),
            events,
        )?;
        if let Some(feed) = pose_feed {
            sequencer = sequencer.with_pose_feed(feed);
        }

        Ok(Self::new(
            sequencer,
            Duration::from_millis(config.navigation.tick_period_ms),
            logger,
        ))
    }

    pub fn sequencer(&self) -> &WaypointSequencer {
        &self.sequencer
    }

    /// Ticks until `shutdown` resolves. Every delivery on `trigger` arms the
    /// sequencer; after the first one this is a no-op.
    ///
    /// Shutdown is abrupt: an in-flight goal or a pending server wait is
    /// simply dropped.
    pub async fn run<F>(&self, mut trigger: mpsc::Receiver<()>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut trigger_open = true;

        self.logger.info("Waypoint manager running, waiting for start signal");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                signal = trigger.recv(), if trigger_open => match signal {
                    Some(()) => self.sequencer.arm().await,
                    None => trigger_open = false,
                },
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = self.sequencer.tick() => {}
                    }
                }
            }
        }
        self.logger.info("Shutting down waypoint manager");
    }
}
