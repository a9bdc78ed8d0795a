//! The monitoring service
//!
//! A [`Monitor`] owns the patient store and the physician directory for the
//! lifetime of the service and exposes every operation the HTTP layer needs.
//! Each collection sits behind its own async lock. When both are needed the
//! store is always locked first.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::SentinelConfig;
use crate::directory::{DirectoryError, PhysicianDirectory, PhysicianRecord};
use crate::metrics::{self, HeartStatus, MetricsError};
use crate::notify::{self, NotificationSink, Notifier, NotifyError, TachycardiaEvent};
use crate::store::{Located, PatientRecord, PatientStore, Reading, StoreError};
use crate::timestamp::{Clock, Timestamp};
use crate::validation::{
    HeartRateSubmission, IntervalAverageRequest, NewPatient, NewPhysician, PhysicianQuery,
    ValidationError,
};

/// Placeholder reported for patients without readings.
pub const NO_ENTRIES: &str = "No entries";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("Patient ID {0} not found in database")]
    PatientNotFound(i64),

    #[error("No timestamp or heart rate data available for patient id {0}")]
    NoHistoryYet(i64),

    #[error("Attending physician {0} not found")]
    PhysicianNotFound(String),
}

/// Latest reading of one patient.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusReport {
    pub heart_rate: i64,
    pub timestamp: Timestamp,
    pub status: HeartStatus,
}

impl From<Reading> for StatusReport {
    fn from(reading: Reading) -> Self {
        Self {
            heart_rate: reading.heart_rate,
            timestamp: reading.recorded_at,
            status: HeartStatus::classify(reading.heart_rate),
        }
    }
}

/// One row of a physician's patient list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientSummary {
    pub patient_id: i64,
    pub latest: Option<Reading>,
}

impl PatientSummary {
    pub fn status(&self) -> Option<HeartStatus> {
        self.latest
            .map(|reading| HeartStatus::classify(reading.heart_rate))
    }
}

impl From<&PatientRecord> for PatientSummary {
    fn from(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id,
            latest: record.latest_reading().copied(),
        }
    }
}

impl Serialize for PatientSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PatientSummary", 4)?;
        state.serialize_field("patient_id", &self.patient_id)?;
        match (&self.latest, self.status()) {
            (Some(reading), Some(status)) => {
                state.serialize_field("last_heart_rate", &reading.heart_rate)?;
                state.serialize_field("last_time", &reading.recorded_at)?;
                state.serialize_field("status", &status)?;
            }
            _ => {
                state.serialize_field("last_heart_rate", NO_ENTRIES)?;
                state.serialize_field("last_time", NO_ENTRIES)?;
                state.serialize_field("status", NO_ENTRIES)?;
            }
        }
        state.end()
    }
}

pub struct Monitor {
    store: Arc<RwLock<PatientStore>>,
    directory: Arc<RwLock<PhysicianDirectory>>,
    clock: Arc<dyn Clock>,
    events: mpsc::Sender<TachycardiaEvent>,
}

impl Monitor {
    /// Create an empty monitor. Tachycardia events arrive on the returned
    /// receiver; hand it to a [`Notifier`].
    pub fn new(clock: Arc<dyn Clock>, event_buffer: usize) -> (Self, mpsc::Receiver<TachycardiaEvent>) {
        let (events, receiver) = mpsc::channel(event_buffer.max(1));
        let monitor = Self {
            store: Arc::new(RwLock::new(PatientStore::new())),
            directory: Arc::new(RwLock::new(PhysicianDirectory::new())),
            clock,
            events,
        };
        (monitor, receiver)
    }

    /// Create a monitor and spawn its notifier on the current runtime.
    pub fn start(
        config: &SentinelConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> (Self, JoinHandle<()>) {
        let (monitor, events) = Self::new(clock, config.event_buffer);
        let notifier = monitor.notifier(sink, config.sender_email.clone());
        let handle = tokio::spawn(notifier.run(events));
        (monitor, handle)
    }

    /// A notifier sharing this monitor's state.
    pub fn notifier(&self, sink: Arc<dyn NotificationSink>, sender: impl Into<String>) -> Notifier {
        Notifier::new(self.store.clone(), self.directory.clone(), sink, sender)
    }

    pub async fn register_physician(&self, input: &Value) -> Result<PhysicianRecord, MonitorError> {
        let request = NewPhysician::from_value(input)?;
        let mut directory = self.directory.write().await;
        let added = directory.register(request.into())?.clone();
        log::info!(
            "Added new attending physician username: {} | email: {}",
            added.username,
            added.email
        );
        Ok(added)
    }

    pub async fn admit_patient(&self, input: &Value) -> Result<PatientRecord, MonitorError> {
        let request = NewPatient::from_value(input)?;
        let mut store = self.store.write().await;
        let added = store
            .create(
                request.patient_id,
                &request.attending_username,
                request.patient_age,
            )?
            .clone();
        log::info!("Added patient id: {}", added.id);
        Ok(added)
    }

    pub async fn ingest_reading(&self, input: &Value) -> Result<(HeartRateSubmission, Reading), MonitorError> {
        let submission = HeartRateSubmission::from_value(input)?;
        let reading = self.ingest(submission.patient_id, submission.heart_rate).await?;
        Ok((submission, reading))
    }

    /// Append a reading stamped with the current time.
    ///
    /// Timestamps never go backwards within one history: if the clock reads
    /// earlier than the last reading, the last reading's time is reused.
    /// A tachycardic reading emits an event after the store lock is
    /// released. The reading is kept even if the event is dropped.
    pub async fn ingest(&self, patient_id: i64, heart_rate: i64) -> Result<Reading, MonitorError> {
        let reading = {
            let mut store = self.store.write().await;
            let record = store
                .get_mut(patient_id)
                .ok_or(MonitorError::PatientNotFound(patient_id))?;
            let now = self.clock.now();
            let recorded_at = match record.latest_reading() {
                Some(last) if last.recorded_at > now => {
                    log::warn!(
                        "Clock went back to {} for patient {}, keeping {}",
                        now,
                        patient_id,
                        last.recorded_at
                    );
                    last.recorded_at
                }
                Some(_) => now,
                None => {
                    log::debug!("First reading for patient {}", patient_id);
                    now
                }
            };
            let reading = Reading::new(heart_rate, recorded_at);
            record.record(reading);
            reading
        };

        if HeartStatus::classify(heart_rate).is_tachycardic() {
            self.emit(TachycardiaEvent {
                patient_id,
                heart_rate,
                recorded_at: reading.recorded_at,
            });
        }
        Ok(reading)
    }

    fn emit(&self, event: TachycardiaEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => log::warn!(
                "Alert queue full, dropping tachycardia alert for patient {}",
                event.patient_id
            ),
            Err(TrySendError::Closed(event)) => log::warn!(
                "No notifier running, dropping tachycardia alert for patient {}",
                event.patient_id
            ),
        }
    }

    pub async fn latest_status(&self, patient_id: i64) -> Result<StatusReport, MonitorError> {
        let store = self.store.read().await;
        let history = active_history(&store, patient_id)?;
        history
            .latest()
            .map(|reading| StatusReport::from(*reading))
            .ok_or(MonitorError::NoHistoryYet(patient_id))
    }

    pub async fn heart_rate_history(&self, patient_id: i64) -> Result<Vec<i64>, MonitorError> {
        let store = self.store.read().await;
        Ok(active_history(&store, patient_id)?.heart_rates())
    }

    pub async fn average(&self, patient_id: i64) -> Result<f64, MonitorError> {
        let store = self.store.read().await;
        let history = active_history(&store, patient_id)?;
        metrics::mean(&history.heart_rates()).ok_or(MonitorError::NoHistoryYet(patient_id))
    }

    pub async fn interval_average(&self, input: &Value) -> Result<(IntervalAverageRequest, f64), MonitorError> {
        let request = IntervalAverageRequest::from_value(input)?;
        let average = self
            .windowed_average(request.patient_id, request.heart_rate_average_since)
            .await?;
        Ok((request, average))
    }

    pub async fn windowed_average(&self, patient_id: i64, cutoff: Timestamp) -> Result<f64, MonitorError> {
        let store = self.store.read().await;
        let history = active_history(&store, patient_id)?;
        Ok(metrics::windowed_average(history, cutoff)?)
    }

    /// Patients assigned to `username`, in admission order.
    pub async fn physician_patients(&self, username: &str) -> Result<Vec<PatientSummary>, MonitorError> {
        let registered = self.directory.read().await.contains(username);
        if !registered {
            return Err(MonitorError::PhysicianNotFound(username.to_string()));
        }
        let store = self.store.read().await;
        Ok(store.patients_of(username).map(PatientSummary::from).collect())
    }

    pub async fn physician_patients_query(&self, input: &Value) -> Result<Vec<PatientSummary>, MonitorError> {
        let query = PhysicianQuery::from_value(input)?;
        self.physician_patients(&query.attending_username).await
    }

    /// Contact details of the physician who would be alerted for `patient_id`.
    pub async fn physician_contact(&self, patient_id: i64) -> Result<PhysicianRecord, MonitorError> {
        let store = self.store.read().await;
        let directory = self.directory.read().await;
        Ok(notify::resolve_physician(&store, &directory, patient_id)?)
    }

    pub async fn patient(&self, patient_id: i64) -> Option<PatientRecord> {
        self.store.read().await.get(patient_id).cloned()
    }
}

fn active_history(store: &PatientStore, patient_id: i64) -> Result<&crate::store::ReadingHistory, MonitorError> {
    match store.locate(patient_id) {
        Located::NotFound => Err(MonitorError::PatientNotFound(patient_id)),
        Located::Fresh(_) => Err(MonitorError::NoHistoryYet(patient_id)),
        Located::Active(record) => record
            .history()
            .ok_or(MonitorError::NoHistoryYet(patient_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::ManualClock;
    use chrono::Duration;
    use serde_json::json;

    fn monitor_at(start: &str) -> (Monitor, Arc<ManualClock>, mpsc::Receiver<TachycardiaEvent>) {
        let clock = Arc::new(ManualClock::new(Timestamp::parse(start).unwrap()));
        let (monitor, events) = Monitor::new(clock.clone(), 16);
        (monitor, clock, events)
    }

    async fn admit(monitor: &Monitor, id: i64, physician: &str) {
        monitor
            .admit_patient(&json!({
                "patient_id": id,
                "attending_username": physician,
                "patient_age": 50,
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_then_second_reading() {
        let (monitor, clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;
        assert!(monitor.patient(1).await.unwrap().is_fresh());

        monitor
            .ingest_reading(&json!({"patient_id": "1", "heart_rate": "80"}))
            .await
            .unwrap();
        let record = monitor.patient(1).await.unwrap();
        assert_eq!(record.history().unwrap().len(), 1);

        clock.advance(Duration::minutes(5));
        monitor.ingest(1, 90).await.unwrap();
        let history = monitor.patient(1).await.unwrap().history().unwrap().clone();
        assert_eq!(history.heart_rates(), vec![80, 90]);
        assert_eq!(history.timestamps()[0].to_string(), "2018-03-09 11:00:00");
        assert_eq!(history.timestamps()[1].to_string(), "2018-03-09 11:05:00");
    }

    #[tokio::test]
    async fn test_clock_going_back_keeps_history_ordered() {
        let (monitor, clock, _events) = monitor_at("2018-11-04 01:30:00");
        admit(&monitor, 1, "Smith.J").await;

        monitor.ingest(1, 80).await.unwrap();
        clock.set(Timestamp::parse("2018-11-04 01:10:00").unwrap());
        let second = monitor.ingest(1, 85).await.unwrap();
        assert_eq!(second.recorded_at.to_string(), "2018-11-04 01:30:00");

        clock.set(Timestamp::parse("2018-11-04 01:45:00").unwrap());
        monitor.ingest(1, 90).await.unwrap();

        let history = monitor.patient(1).await.unwrap().history().unwrap().clone();
        let stamps = history.timestamps();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(stamps[2].to_string(), "2018-11-04 01:45:00");
    }

    #[tokio::test]
    async fn test_average_of_huge_readings() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;
        let half = i64::MAX / 2 + 1;
        monitor.ingest(1, half).await.unwrap();
        monitor.ingest(1, half).await.unwrap();

        assert_eq!(monitor.average(1).await, Ok(half as f64));
        let cutoff = Timestamp::parse("2018-03-09 10:00:00").unwrap();
        assert_eq!(monitor.windowed_average(1, cutoff).await, Ok(half as f64));
    }

    #[tokio::test]
    async fn test_unknown_patient_rejected() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        assert_eq!(
            monitor.ingest(7, 80).await,
            Err(MonitorError::PatientNotFound(7))
        );
    }

    #[tokio::test]
    async fn test_only_tachycardic_readings_emit_events() {
        let (monitor, _clock, mut events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;

        monitor.ingest(1, 99).await.unwrap();
        monitor.ingest(1, 100).await.unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.heart_rate, 100);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ingest_succeeds_without_notifier() {
        let (monitor, _clock, events) = monitor_at("2018-03-09 11:00:00");
        drop(events);
        admit(&monitor, 1, "Smith.J").await;
        assert!(monitor.ingest(1, 150).await.is_ok());
    }

    #[tokio::test]
    async fn test_fresh_patient_has_no_history() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;

        assert_eq!(
            monitor.latest_status(1).await,
            Err(MonitorError::NoHistoryYet(1))
        );
        assert_eq!(
            monitor.heart_rate_history(1).await,
            Err(MonitorError::NoHistoryYet(1))
        );
        assert_eq!(monitor.average(1).await, Err(MonitorError::NoHistoryYet(1)));
        assert_eq!(
            monitor.latest_status(2).await,
            Err(MonitorError::PatientNotFound(2))
        );
    }

    #[tokio::test]
    async fn test_status_reports_latest_reading() {
        let (monitor, clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;
        monitor.ingest(1, 120).await.unwrap();
        clock.advance(Duration::seconds(30));
        monitor.ingest(1, 95).await.unwrap();

        let report = monitor.latest_status(1).await.unwrap();
        assert_eq!(report.heart_rate, 95);
        assert_eq!(report.status, HeartStatus::NotTachycardic);
        assert_eq!(report.timestamp.to_string(), "2018-03-09 11:00:30");
        assert_eq!(monitor.average(1).await.unwrap(), 107.5);
    }

    #[tokio::test]
    async fn test_windowed_average_over_hourly_readings() {
        let (monitor, clock, _events) = monitor_at("2000-03-09 01:00:00");
        admit(&monitor, 1, "Smith.J").await;
        for (hr, hour) in [(100, 1), (100, 2), (100, 3), (110, 4), (120, 12)] {
            clock.set(Timestamp::parse(&format!("2000-03-09 {:02}:00:00", hour)).unwrap());
            monitor.ingest(1, hr).await.unwrap();
        }

        let (_, average) = monitor
            .interval_average(&json!({
                "patient_id": 1,
                "heart_rate_average_since": "2000-03-09 05:00:00",
            }))
            .await
            .unwrap();
        assert_eq!(average, 120.0);

        let cutoff = Timestamp::parse("2000-03-10 00:00:00").unwrap();
        assert_eq!(
            monitor.windowed_average(1, cutoff).await,
            Err(MonitorError::Metrics(MetricsError::NoDataAfterCutoff(cutoff)))
        );
    }

    #[tokio::test]
    async fn test_duplicate_patient_rejected() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Smith.J").await;
        let err = monitor
            .admit_patient(&json!({"patient_id": 1, "attending_username": "Ann.A", "patient_age": 40}))
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::Store(StoreError::AlreadyExists(1)));
    }

    #[tokio::test]
    async fn test_physician_listing_uses_sentinels() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        monitor
            .register_physician(&json!({
                "attending_username": "Smith.J",
                "attending_email": "dr_user_id@ourdomain.com",
                "attending_phone": "919-867-5309",
            }))
            .await
            .unwrap();
        admit(&monitor, 1, "Smith.J").await;
        admit(&monitor, 2, "Smith.J").await;
        admit(&monitor, 3, "Ann.A").await;
        monitor.ingest(2, 101).await.unwrap();

        let listing = monitor.physician_patients("Smith.J").await.unwrap();
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(
            json,
            json!([
                {
                    "patient_id": 1,
                    "last_heart_rate": "No entries",
                    "last_time": "No entries",
                    "status": "No entries",
                },
                {
                    "patient_id": 2,
                    "last_heart_rate": 101,
                    "last_time": "2018-03-09 11:00:00",
                    "status": "tachycardic",
                },
            ])
        );

        assert_eq!(
            monitor.physician_patients("Ann.A").await,
            Err(MonitorError::PhysicianNotFound("Ann.A".into()))
        );
        assert_eq!(
            monitor
                .physician_patients_query(&json!({"attending_username": 5}))
                .await,
            Err(MonitorError::Validation(ValidationError::NotAString))
        );
    }

    #[tokio::test]
    async fn test_physician_contact_requires_registration() {
        let (monitor, _clock, _events) = monitor_at("2018-03-09 11:00:00");
        admit(&monitor, 1, "Ghost.G").await;
        assert_eq!(
            monitor.physician_contact(1).await,
            Err(MonitorError::Notify(NotifyError::NoPhysicianEmail(1)))
        );
    }
}
