use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use waypoint_manager::adapters::inbound::{spawn_stdin_trigger, start_trigger};
use waypoint_manager::adapters::outbound::{init_patrol_logger, SimulatedNavigationServer};
use waypoint_manager::application::PatrolService;
use waypoint_manager::domains::navigation::{EventPublisher, PatrolProjection};
use waypoint_manager::domains::waypoint::Position2D;
use waypoint_manager::Config;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting waypoint manager");

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load(&path)?;
    info!("Configuration loaded from {} (missing file falls back to defaults)", path);
    info!(
        "Navigation action: {} in frame '{}'",
        config.navigation.action_name, config.navigation.frame_id
    );

    let logger = init_patrol_logger(&config.logging);

    // Fold transition events into running patrol statistics.
    let (event_sender, mut event_receiver) = mpsc::channel(256);
    tokio::spawn(async move {
        let mut projection = PatrolProjection::new();
        while let Some(event) = event_receiver.recv().await {
            projection.apply_event(&event);
            tracing::debug!(
                "patrol: dispatches={} succeeded={} failed={} laps={}",
                projection.dispatches,
                projection.succeeded,
                projection.failed,
                projection.laps_completed
            );
        }
    });

    // The real motion-planning service is an external collaborator; the
    // binary drives the in-process simulator.
    let server = Arc::new(SimulatedNavigationServer::new(
        config.simulation.clone(),
        Position2D::default(),
    ));
    let pose_feed = server.pose_feed();

    let service = match PatrolService::from_config(
        &config,
        server,
        Some(pose_feed),
        logger.clone(),
        EventPublisher::new(event_sender),
    ) {
        Ok(service) => service,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let (trigger, trigger_receiver) = start_trigger();
    if config.patrol.auto_start {
        trigger.fire();
    } else {
        spawn_stdin_trigger(trigger, logger.clone());
    }

    service
        .run(trigger_receiver, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
