//! Integration tests for the intersection controller
//!
//! These drive the public facade end to end on paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use intersect::aggregator::{Aggregator, AggregatorConfig};
use intersect::config::Config;
use intersect::domain::{LogFilter, LogLevel, PedestrianPhase, Phase, SignalId};
use intersect::events::{IntersectionEvent, TransitionCause, create_event_bus};
use intersect::export;
use intersect::harness::{LoadTestConfig, RequestKind};
use intersect::{ControlError, FixedChance, Intersection};
use tempfile::TempDir;
use tokio::sync::broadcast;

fn calm() -> Intersection {
    Intersection::start_with(&Config::default(), Arc::new(FixedChance::calm()), false)
}

type Change = (SignalId, Phase, PedestrianPhase, TransitionCause);

/// Every phase change seen so far, asserting both safety invariants on each
fn phase_changes(rx: &mut broadcast::Receiver<IntersectionEvent>) -> Vec<Change> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let IntersectionEvent::PhaseChanged {
            transition,
            cause,
            snapshot,
            ..
        } = event
        {
            assert!(snapshot.green_count() <= 1, "two greens: {snapshot:?}");
            for id in SignalId::ALL {
                let walk = snapshot.pedestrian_phase(id) == PedestrianPhase::Walk;
                assert_eq!(walk, snapshot.phase(id) == Phase::Red, "crossing {id} out of step");
            }
            out.push((transition.signal, transition.to, transition.pedestrian, cause));
        }
    }
    out
}

// =============================================================================
// Signal sequencing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_regular_t1_sequence() {
    let ix = calm();
    let mut rx = ix.subscribe();

    ix.request_signal(SignalId::T1, false).await.unwrap();

    let checkpoints = [
        (Duration::from_millis(1900), Phase::Yellow),
        (Duration::from_millis(200), Phase::Green),
        (Duration::from_millis(4800), Phase::Green),
        (Duration::from_millis(200), Phase::Yellow),
        (Duration::from_millis(1800), Phase::Yellow),
        (Duration::from_millis(200), Phase::Red),
    ];
    for (wait, expected) in checkpoints {
        tokio::time::sleep(wait).await;
        let snap = ix.snapshot().await.unwrap();
        assert_eq!(snap.registry.phase(SignalId::T1), expected);
    }

    let changes = phase_changes(&mut rx);
    assert_eq!(
        changes.iter().map(|c| (c.1, c.2)).collect::<Vec<_>>(),
        vec![
            (Phase::Yellow, PedestrianPhase::DontWalk),
            (Phase::Green, PedestrianPhase::DontWalk),
            (Phase::Yellow, PedestrianPhase::DontWalk),
            (Phase::Red, PedestrianPhase::Walk),
        ]
    );
    assert!(ix.state().await.unwrap().is_idle());
    ix.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_vip_t3_preempts_t2_at_green() {
    let ix = calm();
    let mut rx = ix.subscribe();

    ix.request_signal(SignalId::T2, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(ix.snapshot().await.unwrap().registry.phase(SignalId::T2), Phase::Green);

    let admission = ix.request_signal(SignalId::T3, true).await.unwrap();
    assert_eq!(admission.preempted, Some(SignalId::T2));

    // 2s rise + 3s VIP green + 2s clear
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(ix.snapshot().await.unwrap().registry.phase(SignalId::T3), Phase::Green);
    tokio::time::sleep(Duration::from_millis(2800)).await;
    assert_eq!(ix.snapshot().await.unwrap().registry.phase(SignalId::T3), Phase::Green);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(ix.snapshot().await.unwrap().registry.phase(SignalId::T3), Phase::Yellow);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let changes = phase_changes(&mut rx);
    let t2_red = changes
        .iter()
        .position(|c| c.0 == SignalId::T2 && c.1 == Phase::Red)
        .unwrap();
    let t3_first = changes.iter().position(|c| c.0 == SignalId::T3).unwrap();
    assert!(t2_red < t3_first, "T3 started before T2 cleared");
    assert_eq!(
        changes[t2_red - 1],
        (SignalId::T2, Phase::Yellow, PedestrianPhase::DontWalk, TransitionCause::Preemption)
    );
    assert_eq!(changes.iter().filter(|c| c.0 == SignalId::T2).count(), 4);

    let snap = ix.snapshot().await.unwrap();
    assert!(snap.registry.signals.iter().all(|s| s.phase == Phase::Red));
    ix.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_busy_request_is_idempotent() {
    let ix = calm();
    ix.request_signal(SignalId::T4, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let before = ix.snapshot().await.unwrap();
    for signal in [SignalId::T1, SignalId::T4] {
        assert!(matches!(
            ix.request_signal(signal, false).await,
            Err(ControlError::Busy { .. })
        ));
    }
    let after = ix.snapshot().await.unwrap();
    assert_eq!(after.registry, before.registry);
    assert_eq!(after.state, before.state);

    let warnings = ix
        .logs(LogFilter {
            level: Some(LogLevel::Warning),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(warnings.len(), 2);
    ix.shutdown().await.unwrap();
}

// =============================================================================
// Load testing and exports
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_load_test_of_fifteen() {
    let ix = Intersection::start_with(&Config::default(), Arc::new(intersect::SeededChance::new(7)), false);
    let report = ix
        .run_load_test(LoadTestConfig::new(15, 5000, RequestKind::Mixed))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 15);
    let s = &report.stats;
    assert!((s.success_rate + s.failure_rate + s.timeout_rate - 100.0).abs() < 1e-9);
    assert_eq!(s.success_count + s.failure_count + s.timeout_count, 15);
    if s.server_distribution.len() == 1 {
        assert_eq!(s.load_balancing_effectiveness, 0.0);
    } else {
        assert!(s.load_balancing_effectiveness > 0.0);
    }

    let stats = ix.stats().await.unwrap();
    assert_eq!(stats.total_requests, 15);
    assert_eq!(stats.failed_requests, s.failure_count as u64);
    ix.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_exports_round_trip_to_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ix = calm();

    let report = ix.run_load_test(LoadTestConfig::default()).await.unwrap();
    let report_path = temp_dir.path().join("report.json");
    export::write_report_json(&report, &report_path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    for key in ["testConfig", "testStats", "results", "timestamp"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["results"].as_array().unwrap().len(), 15);

    let logs = ix
        .logs(LogFilter {
            component: Some("Load Testing".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let log_path = temp_dir.path().join("logs").join("system.txt");
    export::write_logs(&logs, &log_path).unwrap();
    let text = std::fs::read_to_string(&log_path).unwrap();
    assert!(text.lines().all(|l| l.contains("[INFO] [Load Testing]")));
    assert!(text.contains("Load test completed: 15/15 successful requests"));
    ix.shutdown().await.unwrap();
}

// =============================================================================
// Clocks and log ring
// =============================================================================

#[tokio::test]
async fn test_client_time_validation() {
    let ix = calm();
    assert!(matches!(
        ix.register_client_time("pedestrian-controller", "25:00:00").await,
        Err(ControlError::InvalidTimeFormat(_))
    ));
    assert!(ix.register_client_time("pedestrian-controller", "13:45:30").await.is_ok());
    assert_eq!(ix.clock_sync().client_times().len(), 1);
    ix.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_log_ring_evicts_oldest() {
    let bus = create_event_bus(16);
    let aggregator = Aggregator::new(AggregatorConfig::default(), bus);
    let handle = aggregator.handle();
    let task = tokio::spawn(aggregator.run());

    for i in 1..=1001 {
        handle.info("System", format!("entry {i}")).await;
    }
    let logs = handle.logs(LogFilter::default()).await.unwrap();
    assert_eq!(logs.len(), 1000);
    assert_eq!(logs[0].message, "entry 2");
    assert_eq!(logs[999].message, "entry 1001");

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}
