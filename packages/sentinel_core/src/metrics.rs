//! Derived heart-rate metrics: tachycardia status and averages

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::ReadingHistory;
use crate::timestamp::Timestamp;

/// Beats per minute at or above which a reading is tachycardic.
pub const TACHYCARDIA_THRESHOLD: i64 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("{0} is a future date, no data found")]
    NoDataAfterCutoff(Timestamp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartStatus {
    #[serde(rename = "tachycardic")]
    Tachycardic,
    #[serde(rename = "not tachycardic")]
    NotTachycardic,
}

impl HeartStatus {
    pub fn classify(heart_rate: i64) -> Self {
        if heart_rate >= TACHYCARDIA_THRESHOLD {
            HeartStatus::Tachycardic
        } else {
            HeartStatus::NotTachycardic
        }
    }

    pub fn is_tachycardic(&self) -> bool {
        matches!(self, HeartStatus::Tachycardic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeartStatus::Tachycardic => "tachycardic",
            HeartStatus::NotTachycardic => "not tachycardic",
        }
    }
}

impl fmt::Display for HeartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic mean, or `None` for an empty slice.
///
/// Summed in `i128` so any run of `i64` readings fits.
pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: i128 = values.iter().map(|&v| i128::from(v)).sum();
    Some(total as f64 / values.len() as f64)
}

/// Heart rates recorded strictly after `cutoff`, in arrival order.
pub fn readings_after(history: &ReadingHistory, cutoff: Timestamp) -> Vec<i64> {
    history
        .readings()
        .iter()
        .filter(|reading| reading.recorded_at > cutoff)
        .map(|reading| reading.heart_rate)
        .collect()
}

/// Mean of the readings strictly after `cutoff`.
pub fn windowed_average(history: &ReadingHistory, cutoff: Timestamp) -> Result<f64, MetricsError> {
    mean(&readings_after(history, cutoff)).ok_or(MetricsError::NoDataAfterCutoff(cutoff))
}
