//! Physician alerts for tachycardic readings
//!
//! Ingestion never talks to the mail transport. It emits a
//! [`TachycardiaEvent`] on a channel; a [`Notifier`] task drains the channel,
//! looks up the assigned physician and hands an [`EmailMessage`] to a
//! [`NotificationSink`]. A slow or failing sink only delays other alerts.

pub mod sink;

pub use sink::{DeliveryAck, HttpEmailSink, LogSink, NotificationSink, RecordingSink};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::directory::{PhysicianDirectory, PhysicianRecord};
use crate::store::PatientStore;
use crate::timestamp::Timestamp;

pub const ALERT_SUBJECT: &str = "Tachycardic!";
pub const DEFAULT_SENDER: &str = "server@domain.com";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("No such doctor's email for patient id {0}")]
    NoPhysicianEmail(i64),

    #[error("E-mail delivery failed: {0}")]
    Delivery(String),
}

/// Payload accepted by the email relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub content: String,
}

/// Emitted once per ingested tachycardic reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TachycardiaEvent {
    pub patient_id: i64,
    pub heart_rate: i64,
    pub recorded_at: Timestamp,
}

/// Find the physician assigned to `patient_id`.
///
/// Fails if the patient is unknown or their physician was never registered.
pub fn resolve_physician(
    store: &PatientStore,
    directory: &PhysicianDirectory,
    patient_id: i64,
) -> Result<PhysicianRecord, NotifyError> {
    store
        .get(patient_id)
        .and_then(|patient| directory.lookup(&patient.attending_username))
        .cloned()
        .ok_or(NotifyError::NoPhysicianEmail(patient_id))
}

pub fn compose_alert(sender: &str, physician: &PhysicianRecord, patient_id: i64) -> EmailMessage {
    EmailMessage {
        from_email: sender.to_string(),
        to_email: physician.email.clone(),
        subject: ALERT_SUBJECT.to_string(),
        content: format!("Patient {} has a tachycardic heart rate!", patient_id),
    }
}

pub struct Notifier {
    store: Arc<RwLock<PatientStore>>,
    directory: Arc<RwLock<PhysicianDirectory>>,
    sink: Arc<dyn NotificationSink>,
    sender: String,
}

impl Notifier {
    pub fn new(
        store: Arc<RwLock<PatientStore>>,
        directory: Arc<RwLock<PhysicianDirectory>>,
        sink: Arc<dyn NotificationSink>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            sink,
            sender: sender.into(),
        }
    }

    /// Alert the physician of `patient_id` about `heart_rate`.
    ///
    /// Locks are released before the sink is awaited.
    pub async fn notify(&self, patient_id: i64, heart_rate: i64) -> Result<DeliveryAck, NotifyError> {
        let physician = {
            let store = self.store.read().await;
            let directory = self.directory.read().await;
            resolve_physician(&store, &directory, patient_id)
        };

        let physician = match physician {
            Ok(physician) => physician,
            Err(e) => {
                log::warn!("No such doctor's email for this patient id: {}", patient_id);
                return Err(e);
            }
        };

        let message = compose_alert(&self.sender, &physician, patient_id);
        log::info!(
            "Patient id: {}, heart rate: {}, is tachycardic, the physician email is {}",
            patient_id,
            heart_rate,
            physician.email
        );
        self.sink.deliver(&message).await
    }

    /// Drain `events` until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<TachycardiaEvent>) {
        while let Some(event) = events.recv().await {
            match self.notify(event.patient_id, event.heart_rate).await {
                Ok(ack) => log::debug!(
                    "Alert for patient {} acknowledged ({}): {}",
                    event.patient_id,
                    ack.status,
                    ack.body
                ),
                Err(e) => log::warn!(
                    "Alert for patient {} at {} not delivered: {}",
                    event.patient_id,
                    event.recorded_at,
                    e
                ),
            }
        }
        log::debug!("Notifier stopped: event channel closed");
    }
}
