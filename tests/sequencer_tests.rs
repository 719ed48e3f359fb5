use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use waypoint_manager::adapters::outbound::init_noop_logger;
use waypoint_manager::common::{DomainError, FailureReason};
use waypoint_manager::domains::navigation::*;
use waypoint_manager::domains::waypoint::{Position2D, Waypoint, WaypointList};

/// Records every request and leaves completion to the test.
#[derive(Default)]
struct RecordingDispatcher {
    requests: Mutex<Vec<DispatchRequest>>,
}

impl RecordingDispatcher {
    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> DispatchRequest {
        self.requests.lock().unwrap().last().cloned().expect("no dispatch recorded")
    }
}

#[async_trait]
impl GoalDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: DispatchRequest, _sink: Arc<dyn GoalOutcomeSink>) {
        self.requests.lock().unwrap().push(request);
    }
}

fn patrol(n: usize) -> WaypointList {
    WaypointList::new((0..n).map(|i| Waypoint::new(i as f64, i as f64 * 2.0, 0.1 * i as f64)).collect())
        .unwrap()
}

fn sequencer(n: usize, start: usize) -> (WaypointSequencer, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let seq = WaypointSequencer::new(
        patrol(n),
        start,
        dispatcher.clone(),
        init_noop_logger(),
        EventPublisher::disabled(),
    )
    .unwrap();
    (seq, dispatcher)
}

#[tokio::test]
async fn test_cursor_advances_modulo_list_length() {
    for n in 1..=7 {
        for start in 0..n {
            let (seq, dispatcher) = sequencer(n, start);
            seq.arm().await;
            for k in 0..(2 * n + 1) {
                assert_eq!(seq.cursor().await, (start + k) % n);
                seq.tick().await;
                let request = dispatcher.last();
                assert_eq!(request.waypoint_index, (start + k) % n);
                seq.on_goal_succeeded(request.goal_id).await;
            }
            assert_eq!(seq.cursor().await, (start + 2 * n + 1) % n);
        }
    }
}

#[tokio::test]
async fn test_lap_counter_counts_wraparounds() {
    let (seq, dispatcher) = sequencer(3, 1);
    seq.arm().await;
    for _ in 0..5 {
        seq.tick().await;
        seq.on_goal_succeeded(dispatcher.last().goal_id).await;
    }
    // 1 -> 2 -> 0 (lap) -> 1 -> 2 -> 0 (lap)
    let snapshot = seq.snapshot().await;
    assert_eq!(snapshot.cursor, 0);
    assert_eq!(snapshot.laps_completed, 2);
}

#[tokio::test]
async fn test_failure_never_moves_cursor() {
    let (seq, dispatcher) = sequencer(4, 2);
    seq.arm().await;
    let reasons = [
        FailureReason::Rejected,
        FailureReason::SendFailed("boom".to_string()),
        FailureReason::Aborted,
        FailureReason::Canceled,
        FailureReason::ResultLost,
        FailureReason::Stalled { after: Duration::from_secs(1) },
    ];
    for reason in reasons.iter().cycle().take(20) {
        seq.tick().await;
        let request = dispatcher.last();
        assert_eq!(request.waypoint_index, 2);
        seq.on_goal_failed(request.goal_id, reason.clone()).await;
        assert_eq!(seq.cursor().await, 2);
        assert!(seq.in_flight().await.is_none());
    }
    assert_eq!(dispatcher.count(), 20);
}

#[tokio::test]
async fn test_tick_before_arm_never_dispatches() {
    let (seq, dispatcher) = sequencer(12, 0);
    for _ in 0..1000 {
        seq.tick().await;
    }
    assert_eq!(dispatcher.count(), 0);
    assert!(!seq.snapshot().await.armed);
}

#[tokio::test]
async fn test_tick_with_goal_in_flight_is_noop() {
    let (seq, dispatcher) = sequencer(3, 0);
    seq.arm().await;
    seq.tick().await;
    for _ in 0..10 {
        seq.tick().await;
    }
    assert_eq!(dispatcher.count(), 1);

    let in_flight = seq.in_flight().await.expect("goal should be in flight");
    assert_eq!(in_flight.phase, GoalPhase::Pending);

    seq.on_goal_accepted(in_flight.goal_id).await;
    assert_eq!(seq.in_flight().await.unwrap().phase, GoalPhase::Accepted);
    seq.tick().await;
    assert_eq!(dispatcher.count(), 1);
}

#[tokio::test]
async fn test_arm_is_idempotent() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let seq = WaypointSequencer::new(
        patrol(2),
        0,
        dispatcher.clone(),
        init_noop_logger(),
        EventPublisher::new(tx),
    )
    .unwrap();

    seq.arm().await;
    seq.arm().await;
    seq.arm().await;
    assert!(seq.snapshot().await.armed);

    let mut armed_events = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, NavigationEvent::Armed { .. }) {
            armed_events += 1;
        }
    }
    assert_eq!(armed_events, 1);

    seq.tick().await;
    assert_eq!(dispatcher.count(), 1);
}

#[tokio::test]
async fn test_rejections_hold_then_success_advances() {
    let (seq, dispatcher) = sequencer(12, 0);
    seq.arm().await;
    let mut observed = Vec::new();

    seq.tick().await;
    seq.on_goal_succeeded(dispatcher.last().goal_id).await;
    observed.push(seq.cursor().await);

    for _ in 0..2 {
        seq.tick().await;
        seq.on_goal_failed(dispatcher.last().goal_id, FailureReason::Rejected).await;
        observed.push(seq.cursor().await);
    }

    seq.tick().await;
    assert_eq!(dispatcher.last().waypoint_index, 1);
    seq.on_goal_succeeded(dispatcher.last().goal_id).await;
    observed.push(seq.cursor().await);

    assert_eq!(observed, vec![1, 1, 1, 2]);
}

#[tokio::test]
async fn test_stale_and_duplicate_outcomes_are_ignored() {
    let (seq, dispatcher) = sequencer(5, 0);
    seq.arm().await;
    seq.tick().await;
    let request = dispatcher.last();

    seq.on_goal_succeeded(Uuid::new_v4()).await;
    seq.on_goal_failed(Uuid::new_v4(), FailureReason::Rejected).await;
    assert_eq!(seq.cursor().await, 0);
    assert!(seq.in_flight().await.is_some());

    seq.on_goal_succeeded(request.goal_id).await;
    seq.on_goal_succeeded(request.goal_id).await;
    seq.on_goal_failed(request.goal_id, FailureReason::Aborted).await;
    assert_eq!(seq.cursor().await, 1);
}

#[tokio::test]
async fn test_dispatched_waypoint_matches_table() {
    let (seq, dispatcher) = sequencer(4, 3);
    seq.arm().await;
    seq.tick().await;
    let request = dispatcher.last();
    assert_eq!(request.waypoint_index, 3);
    assert_eq!(&request.waypoint, seq.waypoints().get(3).unwrap());
}

#[test]
fn test_start_index_out_of_range_is_configuration_error() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let result = WaypointSequencer::new(
        patrol(3),
        3,
        dispatcher,
        init_noop_logger(),
        EventPublisher::disabled(),
    );
    match result {
        Err(DomainError::Configuration { reason }) => assert!(reason.contains("out of range")),
        _ => panic!("Expected Configuration error"),
    }
}

#[test]
fn test_empty_waypoint_list_is_configuration_error() {
    match WaypointList::new(Vec::new()) {
        Err(DomainError::Configuration { reason }) => assert!(reason.contains("empty")),
        _ => panic!("Expected Configuration error"),
    }
}

/// Completes every goal from a background task after a short delay,
/// failing every third one, and tracks how many are outstanding.
#[derive(Default)]
struct ConcurrentDispatcher {
    outstanding: Arc<AtomicUsize>,
    max_outstanding: Arc<AtomicUsize>,
    dispatched: AtomicUsize,
    succeeded: Arc<AtomicUsize>,
}

#[async_trait]
impl GoalDispatcher for ConcurrentDispatcher {
    async fn dispatch(&self, request: DispatchRequest, sink: Arc<dyn GoalOutcomeSink>) {
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(now, Ordering::SeqCst);
        let nth = self.dispatched.fetch_add(1, Ordering::SeqCst);

        let outstanding = self.outstanding.clone();
        let succeeded = self.succeeded.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_micros(200 + (nth as u64 % 5) * 100)).await;
            outstanding.fetch_sub(1, Ordering::SeqCst);
            if nth % 3 == 0 {
                sink.goal_failed(request.goal_id, FailureReason::Rejected).await;
            } else {
                succeeded.fetch_add(1, Ordering::SeqCst);
                sink.goal_succeeded(request.goal_id).await;
            }
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_goal_in_flight_under_concurrent_ticks() {
    let dispatcher = Arc::new(ConcurrentDispatcher::default());
    let seq = WaypointSequencer::new(
        patrol(7),
        0,
        dispatcher.clone(),
        init_noop_logger(),
        EventPublisher::disabled(),
    )
    .unwrap();
    seq.arm().await;

    let mut tickers = Vec::new();
    for _ in 0..8 {
        let seq = seq.clone();
        tickers.push(tokio::spawn(async move {
            for _ in 0..300 {
                seq.tick().await;
                tokio::task::yield_now().await;
            }
        }));
    }
    for ticker in tickers {
        ticker.await.unwrap();
    }

    // Let the last completion land.
    for _ in 0..100 {
        if seq.in_flight().await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(dispatcher.max_outstanding.load(Ordering::SeqCst), 1);
    assert!(dispatcher.dispatched.load(Ordering::SeqCst) > 0);
    let succeeded = dispatcher.succeeded.load(Ordering::SeqCst);
    assert_eq!(seq.cursor().await, succeeded % 7);
}

fn dispatch_distance(rx: &mut tokio::sync::mpsc::Receiver<NavigationEvent>) -> Option<Option<f64>> {
    while let Ok(event) = rx.try_recv() {
        if let NavigationEvent::DispatchStarted { distance_to_goal, .. } = event {
            return Some(distance_to_goal);
        }
    }
    None
}

#[tokio::test]
async fn test_dispatch_reports_distance_from_pose_feed() {
    let table = || WaypointList::new(vec![Waypoint::new(3.0, 4.0, 0.0), Waypoint::new(6.0, 8.0, 0.0)]).unwrap();
    let (pose, feed) = tokio::sync::watch::channel(Position2D { x: 0.0, y: 0.0 });
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let seq = WaypointSequencer::new(table(), 0, dispatcher.clone(), init_noop_logger(), EventPublisher::new(tx))
        .unwrap()
        .with_pose_feed(feed);

    seq.arm().await;
    seq.tick().await;
    let first = dispatch_distance(&mut rx).expect("no dispatch event").expect("no distance");
    assert!((first - 5.0).abs() < 1e-9);

    pose.send_replace(Position2D { x: 3.0, y: 4.0 });
    seq.on_goal_succeeded(dispatcher.last().goal_id).await;
    seq.tick().await;
    let second = dispatch_distance(&mut rx).expect("no dispatch event").expect("no distance");
    assert!((second - 5.0).abs() < 1e-9);

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let blind = WaypointSequencer::new(table(), 0, dispatcher.clone(), init_noop_logger(), EventPublisher::new(tx))
        .unwrap();
    blind.arm().await;
    blind.tick().await;
    assert_eq!(dispatch_distance(&mut rx), Some(None));
}
