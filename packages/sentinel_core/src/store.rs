//! In-memory patient record store
//!
//! Records are keyed by patient id and kept for the life of the process.
//! A record starts *fresh* (no reading history at all) and becomes *active*
//! the first time a reading is ingested; from then on readings are only ever
//! appended.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use thiserror::Error;

use crate::timestamp::Timestamp;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Patient ID {0} already exists")]
    AlreadyExists(i64),

    #[error("Patient ID {0} not found in database")]
    NotFound(i64),
}

/// One heart-rate measurement and the moment it arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct Reading {
    pub heart_rate: i64,
    pub recorded_at: Timestamp,
}

impl Reading {
    pub fn new(heart_rate: i64, recorded_at: Timestamp) -> Self {
        Self {
            heart_rate,
            recorded_at,
        }
    }
}

/// Append-only readings in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadingHistory {
    readings: Vec<Reading>,
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn heart_rates(&self) -> Vec<i64> {
        self.readings.iter().map(|r| r.heart_rate).collect()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.readings.iter().map(|r| r.recorded_at).collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub id: i64,
    pub attending_username: String,
    pub age: i64,
    history: Option<ReadingHistory>,
}

impl PatientRecord {
    pub fn new(id: i64, attending_username: impl Into<String>, age: i64) -> Self {
        Self {
            id,
            attending_username: attending_username.into(),
            age,
            history: None,
        }
    }

    /// `None` while the record is fresh.
    pub fn history(&self) -> Option<&ReadingHistory> {
        self.history.as_ref()
    }

    pub fn is_fresh(&self) -> bool {
        self.history.is_none()
    }

    /// Materialize an empty history if there is none yet. Irreversible.
    pub fn activate(&mut self) -> &mut ReadingHistory {
        self.history.get_or_insert_with(ReadingHistory::new)
    }

    pub fn record(&mut self, reading: Reading) {
        self.activate().push(reading);
    }

    pub fn latest_reading(&self) -> Option<&Reading> {
        self.history.as_ref().and_then(ReadingHistory::latest)
    }
}

/// Wire view: the history is exposed as two index-aligned arrays, and only
/// once the record is active.
impl Serialize for PatientRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.history.is_some() { 5 } else { 3 };
        let mut state = serializer.serialize_struct("PatientRecord", fields)?;
        state.serialize_field("patient_id", &self.id)?;
        state.serialize_field("attending_username", &self.attending_username)?;
        state.serialize_field("patient_age", &self.age)?;
        if let Some(history) = &self.history {
            state.serialize_field("heart_rate", &history.heart_rates())?;
            state.serialize_field("timestamp", &history.timestamps())?;
        }
        state.end()
    }
}

/// Outcome of looking a patient up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located<'a> {
    NotFound,
    /// Present, never reported a reading.
    Fresh(&'a PatientRecord),
    /// Present with a reading history (possibly empty).
    Active(&'a PatientRecord),
}

impl<'a> Located<'a> {
    pub fn record(&self) -> Option<&'a PatientRecord> {
        match *self {
            Located::NotFound => None,
            Located::Fresh(record) | Located::Active(record) => Some(record),
        }
    }
}

/// Patient records keyed by id, remembering creation order.
#[derive(Debug, Default)]
pub struct PatientStore {
    patients: HashMap<i64, PatientRecord>,
    order: Vec<i64>,
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record. Ids are unique; a duplicate leaves the
    /// existing record untouched.
    pub fn create(
        &mut self,
        id: i64,
        attending_username: &str,
        age: i64,
    ) -> Result<&PatientRecord, StoreError> {
        if self.patients.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.order.push(id);
        Ok(self
            .patients
            .entry(id)
            .or_insert_with(|| PatientRecord::new(id, attending_username, age)))
    }

    pub fn locate(&self, id: i64) -> Located<'_> {
        match self.patients.get(&id) {
            None => Located::NotFound,
            Some(record) if record.is_fresh() => Located::Fresh(record),
            Some(record) => Located::Active(record),
        }
    }

    /// Overwrite the stored record with the same id.
    pub fn replace(&mut self, record: PatientRecord) -> Result<(), StoreError> {
        let slot = self
            .patients
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        *slot = record;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Option<&PatientRecord> {
        self.patients.get(&id)
    }

    /// In-place access for appending readings.
    pub fn get_mut(&mut self, id: i64) -> Option<&mut PatientRecord> {
        self.patients.get_mut(&id)
    }

    /// All records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &PatientRecord> {
        self.order.iter().filter_map(|id| self.patients.get(id))
    }

    /// Records assigned to `username`, in creation order.
    pub fn patients_of<'a>(
        &'a self,
        username: &'a str,
    ) -> impl Iterator<Item = &'a PatientRecord> + 'a {
        self.iter()
            .filter(move |record| record.attending_username == username)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}
