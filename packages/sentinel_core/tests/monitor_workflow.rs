//! End-to-end monitor workflow: registration, ingestion, alerts, queries.
//!
//! Run with:
//!   cargo test -p heart_rate_sentinel --test monitor_workflow

use std::sync::Arc;
use std::time::Duration;

use heart_rate_sentinel::{
    HeartStatus, ManualClock, Monitor, MonitorError, RecordingSink, SentinelConfig, Timestamp,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_monitor() -> (Arc<Monitor>, Arc<RecordingSink>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Timestamp::parse("2018-03-09 11:00:00").unwrap(),
    ));
    let sink = Arc::new(RecordingSink::new());
    let (monitor, _notifier) = Monitor::start(&SentinelConfig::default(), clock.clone(), sink.clone());
    (Arc::new(monitor), sink, clock)
}

async fn wait_for_messages(sink: &RecordingSink, expected: usize) {
    for _ in 0..100 {
        if sink.messages().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} alerts, saw {}",
        expected,
        sink.messages().len()
    );
}

async fn register_smith(monitor: &Monitor) {
    monitor
        .register_physician(&json!({
            "attending_username": "Smith.J",
            "attending_email": "dr_user_id@ourdomain.com",
            "attending_phone": "919-867-5309",
        }))
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tachycardic_reading_alerts_assigned_physician() {
    let (monitor, sink, _clock) = start_monitor();
    register_smith(&monitor).await;
    monitor
        .admit_patient(&json!({"patient_id": "1", "attending_username": "Smith.J", "patient_age": "50"}))
        .await
        .unwrap();

    monitor
        .ingest_reading(&json!({"patient_id": 1, "heart_rate": "130"}))
        .await
        .unwrap();

    wait_for_messages(&sink, 1).await;
    let alert = &sink.messages()[0];
    assert_eq!(alert.to_email, "dr_user_id@ourdomain.com");
    assert_eq!(alert.content, "Patient 1 has a tachycardic heart rate!");

    let status = monitor.latest_status(1).await.unwrap();
    assert_eq!(status.status, HeartStatus::Tachycardic);
}

#[tokio::test]
async fn unregistered_physician_does_not_block_ingestion() {
    let (monitor, sink, _clock) = start_monitor();
    monitor
        .admit_patient(&json!({"patient_id": 2, "attending_username": "Ann.A", "patient_age": 40}))
        .await
        .unwrap();

    let reading = monitor.ingest(2, 140).await.unwrap();
    assert_eq!(reading.heart_rate, 140);
    assert_eq!(monitor.heart_rate_history(2).await.unwrap(), vec![140]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.messages().is_empty());
    assert!(matches!(
        monitor.physician_contact(2).await,
        Err(MonitorError::Notify(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingestion_loses_no_readings() {
    let (monitor, _sink, _clock) = start_monitor();
    monitor
        .admit_patient(&json!({"patient_id": 1, "attending_username": "Smith.J", "patient_age": 50}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for hr in 60..110 {
        let monitor = monitor.clone();
        handles.push(tokio::spawn(async move { monitor.ingest(1, hr).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut history = monitor.heart_rate_history(1).await.unwrap();
    assert_eq!(history.len(), 50);
    history.sort_unstable();
    assert_eq!(history, (60..110).collect::<Vec<i64>>());
}

#[tokio::test]
async fn interval_average_tracks_the_clock() {
    let (monitor, _sink, clock) = start_monitor();
    monitor
        .admit_patient(&json!({"patient_id": 1, "attending_username": "Smith.J", "patient_age": 50}))
        .await
        .unwrap();

    monitor.ingest(1, 100).await.unwrap();
    clock.advance(chrono::Duration::hours(1));
    monitor.ingest(1, 130).await.unwrap();

    let (request, average) = monitor
        .interval_average(&json!({
            "patient_id": "1",
            "heart_rate_average_since": "2018-03-09 11:30:00",
        }))
        .await
        .unwrap();
    assert_eq!(request.patient_id, 1);
    assert_eq!(average, 130.0);

    let (_, everything) = monitor
        .interval_average(&json!({
            "patient_id": 1,
            "heart_rate_average_since": "2018-03-09 10:00:00",
        }))
        .await
        .unwrap();
    assert_eq!(everything, monitor.average(1).await.unwrap());
    assert_eq!(everything, 115.0);
}
