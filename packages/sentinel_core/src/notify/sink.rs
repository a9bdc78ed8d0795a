//! Outbound delivery of physician alerts
//!
//! Sinks are fire-and-forget: one attempt, no retries. Whatever the
//! transport reports back is handed to the caller as a [`DeliveryAck`].

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmailMessage, NotifyError};

/// Best-effort acknowledgment from a sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryAck, NotifyError>;
}

/// POSTs the message as JSON to an email relay.
pub struct HttpEmailSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmailSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for HttpEmailSink {
    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryAck, NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(DeliveryAck { status, body })
    }
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryAck, NotifyError> {
        log::info!(
            "E-mail to {} from {} [{}]: {}",
            message.to_email,
            message.from_email,
            message.subject,
            message.content
        );
        Ok(DeliveryAck {
            status: 200,
            body: format!(
                "E-mail logged for {} from {}",
                message.to_email, message.from_email
            ),
        })
    }
}

/// Keeps every delivered message in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<EmailMessage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryAck, NotifyError> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(DeliveryAck {
            status: 200,
            body: format!("E-mail sent to {}", message.to_email),
        })
    }
}
