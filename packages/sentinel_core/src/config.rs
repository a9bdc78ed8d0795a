//! Service configuration
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notify::DEFAULT_SENDER;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Email relay accepting `EmailMessage` JSON. Alerts are only logged
    /// when unset.
    pub email_endpoint: Option<String>,
    pub sender_email: String,
    pub notify_timeout_secs: u64,
    /// Capacity of the tachycardia event channel.
    pub event_buffer: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            email_endpoint: None,
            sender_email: DEFAULT_SENDER.to_string(),
            notify_timeout_secs: 10,
            event_buffer: 256,
        }
    }
}

impl SentinelConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: SentinelConfig = serde_json::from_slice(&data)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be at least 1".into()));
        }
        if self.notify_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "notify_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_gives_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();

        let config = SentinelConfig::load(file.path()).unwrap();
        assert_eq!(config, SentinelConfig::default());
        assert_eq!(config.sender_email, "server@domain.com");
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind_addr": "0.0.0.0:8080", "email_endpoint": "http://relay/send_email"}}"#
        )
        .unwrap();

        let config = SentinelConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.email_endpoint.as_deref(), Some("http://relay/send_email"));
        assert_eq!(config.notify_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"event_buffer": 0}}"#).unwrap();
        assert!(matches!(
            SentinelConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentinelConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
