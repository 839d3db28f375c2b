//! Reading — a timestamped, typed snapshot emitted by a trigger.
//!
//! Fields are kept in insertion order so presentation and exports stay
//! stable. New trigger kinds add new keys without touching the condition
//! interface.

use serde::{Deserialize, Serialize};

use crate::error::ConditionError;
use crate::time::Timestamp;

/// Well-known field names shared by triggers and conditions.
pub mod fields {
    pub const DOWNLOAD_BPS: &str = "download_bps";
    pub const UPLOAD_BPS: &str = "upload_bps";
    pub const INTERFACE: &str = "interface";
    pub const WATCHED_COUNT: &str = "watched_count";
    pub const ACTIVE_COUNT: &str = "active_count";
    pub const ACTIVITY_BPS: &str = "activity_bps";
}

/// A single typed reading value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Bool(bool),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl From<u64> for ReadingValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for ReadingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ReadingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One measurement snapshot: a small ordered key → value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub taken_at: Timestamp,
    fields: Vec<(String, ReadingValue)>,
}

impl Reading {
    /// Create an empty reading stamped at `taken_at`.
    #[must_use]
    pub fn new(taken_at: Timestamp) -> Self {
        Self {
            taken_at,
            fields: Vec::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ReadingValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ReadingValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Look up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ReadingValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Read an unsigned integer field.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::MissingField`] when the key is absent and
    /// [`ConditionError::WrongType`] when it is not an unsigned integer.
    pub fn require_u64(&self, key: &str) -> Result<u64, ConditionError> {
        match self.get(key) {
            Some(ReadingValue::UInt(v)) => Ok(*v),
            Some(_) => Err(ConditionError::WrongType {
                key: key.to_string(),
                expected: "an unsigned integer",
            }),
            None => Err(ConditionError::MissingField(key.to_string())),
        }
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReadingValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
