//! Attending physician directory
//!
//! Physicians are registered once and never edited. Patients refer to them
//! by username only; nothing checks that reference until someone needs the
//! physician's contact details.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::NewPhysician;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Attending physician {0} already exists")]
    AlreadyExists(String),
}

/// Contact details for one attending physician.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicianRecord {
    #[serde(rename = "attending_username")]
    pub username: String,
    #[serde(rename = "attending_email")]
    pub email: String,
    #[serde(rename = "attending_phone")]
    pub phone: String,
}

impl From<NewPhysician> for PhysicianRecord {
    fn from(request: NewPhysician) -> Self {
        Self {
            username: request.attending_username,
            email: request.attending_email,
            phone: request.attending_phone,
        }
    }
}

#[derive(Debug, Default)]
pub struct PhysicianDirectory {
    physicians: HashMap<String, PhysicianRecord>,
}

impl PhysicianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a physician. Usernames are unique; an existing entry is
    /// never overwritten.
    pub fn register(&mut self, record: PhysicianRecord) -> Result<&PhysicianRecord, DirectoryError> {
        if self.physicians.contains_key(&record.username) {
            return Err(DirectoryError::AlreadyExists(record.username));
        }
        let username = record.username.clone();
        Ok(self.physicians.entry(username).or_insert(record))
    }

    pub fn lookup(&self, username: &str) -> Option<&PhysicianRecord> {
        self.physicians.get(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.physicians.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.physicians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physicians.is_empty()
    }
}
