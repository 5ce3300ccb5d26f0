//! Normalized rows and stored records

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Field, FieldValue};

/// A row after header mapping and coercion: field name -> typed value
///
/// A field is present only if coercion produced a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRow {
    pub fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Supplied business key, if the row carries a non-empty one
    pub fn business_key(&self) -> Option<&str> {
        self.fields
            .get(Field::InternalCarNumber.name())
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Fields other than the business key, as set-changes for a store write
    pub fn into_changes(mut self) -> FieldChanges {
        self.fields.remove(Field::InternalCarNumber.name());
        self.fields
            .into_iter()
            .map(|(name, value)| (name, Some(value)))
            .collect()
    }
}

/// Partial update: `Some` sets a field, `None` clears it; unnamed fields are untouched
pub type FieldChanges = BTreeMap<String, Option<FieldValue>>;

/// A stored corrective-action record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(rename = "internalCarNumber")]
    pub business_key: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// New record with a fresh storage id, stamped `now`
    pub fn new(business_key: impl Into<String>, fields: FieldChanges, now: DateTime<Utc>) -> Self {
        let fields = fields
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();
        Record {
            id: uuid::Uuid::new_v4().to_string(),
            business_key: business_key.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        if name == Field::InternalCarNumber.name() {
            return None;
        }
        self.fields.get(name)
    }

    /// Merge changes and advance `updated_at`
    pub fn apply_changes(&mut self, changes: &FieldChanges, now: DateTime<Utc>) {
        for (name, change) in changes {
            if name == Field::InternalCarNumber.name() {
                continue;
            }
            match change {
                Some(value) => {
                    self.fields.insert(name.clone(), value.clone());
                }
                None => {
                    self.fields.remove(name);
                }
            }
        }
        self.updated_at = next_timestamp(self.updated_at, now);
    }
}

/// Timestamp strictly after `previous`, normally `now`
///
/// Stored timestamps have microsecond resolution, so two writes within the
/// same microsecond still advance.
pub fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = truncate_micros(now);
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Drop sub-microsecond precision so timestamps survive a store round trip
pub fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}
