//! Shape checking for inbound JSON records
//!
//! Every request body is checked against a schema: a list of required keys
//! and the scalar kind each one must hold. Integer keys also accept strings
//! holding an integer (`"5"` becomes `5`). Validation never touches the
//! input; the returned [`Record`] carries the coerced values and is the data
//! of record from then on.

pub mod requests;

pub use requests::{
    HeartRateSubmission, IntervalAverageRequest, NewPatient, NewPhysician, PhysicianQuery,
};

use serde_json::{Map, Value};
use thiserror::Error;

/// Expected scalar kind of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
}

/// Required keys and their kinds, checked in declaration order.
pub type Schema = [(&'static str, FieldKind)];

pub const NEW_PATIENT: &Schema = &[
    ("patient_id", FieldKind::Integer),
    ("attending_username", FieldKind::Text),
    ("patient_age", FieldKind::Integer),
];

pub const NEW_ATTENDING: &Schema = &[
    ("attending_username", FieldKind::Text),
    ("attending_email", FieldKind::Text),
    ("attending_phone", FieldKind::Text),
];

pub const HEART_RATE: &Schema = &[
    ("patient_id", FieldKind::Integer),
    ("heart_rate", FieldKind::Integer),
];

pub const INTERVAL_AVERAGE: &Schema = &[
    ("patient_id", FieldKind::Integer),
    ("heart_rate_average_since", FieldKind::Text),
];

pub const PHYSICIAN_QUERY: &Schema = &[("attending_username", FieldKind::Text)];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The input was not a dictionary")]
    NotAMapping,

    #[error("The key {0} is missing from input")]
    MissingKey(String),

    #[error("The key {0} has the wrong data type")]
    WrongType(String),

    #[error("The input was not a string")]
    NotAString,

    #[error("The key {0} is not a YYYY-MM-DD HH:MM:SS timestamp")]
    MalformedTimestamp(String),
}

/// A JSON object that passed validation, with integer fields coerced.
#[derive(Clone, Debug, PartialEq)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn integer(&self, key: &str) -> Result<i64, ValidationError> {
        match self.0.get(key) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ValidationError::WrongType(key.to_string())),
            None => Err(ValidationError::MissingKey(key.to_string())),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, ValidationError> {
        match self.0.get(key) {
            Some(value) => value
                .as_str()
                .ok_or_else(|| ValidationError::WrongType(key.to_string())),
            None => Err(ValidationError::MissingKey(key.to_string())),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Check `input` against `schema`.
///
/// Keys are checked one at a time in schema order; the first key that is
/// missing or holds the wrong kind decides the error. Keys outside the
/// schema are carried through untouched.
pub fn validate(input: &Value, schema: &Schema) -> Result<Record, ValidationError> {
    let object = input.as_object().ok_or(ValidationError::NotAMapping)?;
    let mut record = object.clone();

    for (key, kind) in schema {
        let value = object
            .get(*key)
            .ok_or_else(|| ValidationError::MissingKey(key.to_string()))?;
        let checked = match kind {
            FieldKind::Integer => coerce_integer(value),
            FieldKind::Text => value.is_string().then(|| value.clone()),
        }
        .ok_or_else(|| ValidationError::WrongType(key.to_string()))?;
        record.insert(key.to_string(), checked);
    }

    Ok(Record(record))
}

/// Check that a bare value is a string.
pub fn require_text(value: &Value) -> Result<&str, ValidationError> {
    value.as_str().ok_or(ValidationError::NotAString)
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_i64().map(Value::from),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}
