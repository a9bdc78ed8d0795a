// Heart Rate Sentinel - remote patient heart-rate monitoring

pub mod config;
pub mod directory;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod store;
pub mod timestamp;
pub mod validation;

pub use config::{ConfigError, SentinelConfig};
pub use directory::{DirectoryError, PhysicianDirectory, PhysicianRecord};
pub use metrics::{HeartStatus, MetricsError, TACHYCARDIA_THRESHOLD};
pub use monitor::{Monitor, MonitorError, PatientSummary, StatusReport, NO_ENTRIES};
pub use notify::{
    DeliveryAck, EmailMessage, HttpEmailSink, LogSink, NotificationSink, Notifier, NotifyError,
    RecordingSink, TachycardiaEvent,
};
pub use store::{Located, PatientRecord, PatientStore, Reading, ReadingHistory, StoreError};
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};
pub use validation::ValidationError;
