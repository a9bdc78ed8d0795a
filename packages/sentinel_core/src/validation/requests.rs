//! Typed request bodies built from validated records

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    require_text, validate, ValidationError, HEART_RATE, INTERVAL_AVERAGE, NEW_ATTENDING,
    NEW_PATIENT, PHYSICIAN_QUERY,
};
use crate::timestamp::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub patient_id: i64,
    pub attending_username: String,
    pub patient_age: i64,
}

impl NewPatient {
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let record = validate(input, NEW_PATIENT)?;
        Ok(Self {
            patient_id: record.integer("patient_id")?,
            attending_username: record.text("attending_username")?.to_string(),
            patient_age: record.integer("patient_age")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhysician {
    pub attending_username: String,
    pub attending_email: String,
    pub attending_phone: String,
}

impl NewPhysician {
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let record = validate(input, NEW_ATTENDING)?;
        Ok(Self {
            attending_username: record.text("attending_username")?.to_string(),
            attending_email: record.text("attending_email")?.to_string(),
            attending_phone: record.text("attending_phone")?.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSubmission {
    pub patient_id: i64,
    pub heart_rate: i64,
}

impl HeartRateSubmission {
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let record = validate(input, HEART_RATE)?;
        Ok(Self {
            patient_id: record.integer("patient_id")?,
            heart_rate: record.integer("heart_rate")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalAverageRequest {
    pub patient_id: i64,
    pub heart_rate_average_since: Timestamp,
}

impl IntervalAverageRequest {
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let record = validate(input, INTERVAL_AVERAGE)?;
        let since = record.text("heart_rate_average_since")?;
        let heart_rate_average_since = Timestamp::parse(since).map_err(|_| {
            ValidationError::MalformedTimestamp("heart_rate_average_since".to_string())
        })?;
        Ok(Self {
            patient_id: record.integer("patient_id")?,
            heart_rate_average_since,
        })
    }
}

/// Physician listing asked for by JSON body instead of by path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicianQuery {
    pub attending_username: String,
}

impl PhysicianQuery {
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let record = validate(input, PHYSICIAN_QUERY)
            .map_err(|e| match e {
                ValidationError::WrongType(_) => ValidationError::NotAString,
                other => other,
            })?;
        let username = require_text(&record.as_map()["attending_username"])?;
        Ok(Self {
            attending_username: username.to_string(),
        })
    }
}
