//! Pending field edits, collected before an explicit save

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FieldChanges, FieldValue, Record};

/// Pending edits for one record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    /// `updated_at` of the record when it was first edited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<Utc>>,
    pub changes: FieldChanges,
}

/// A patch addressed to a stored record, as consumed by a bulk save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<Utc>>,
    pub changes: FieldChanges,
}

/// Set of unsaved edits: record id -> field -> pending value
///
/// Passed explicitly between edit, save and discard; a save consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet {
    patches: BTreeMap<String, RecordPatch>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a field edit against `record`; `None` clears the field on save
    ///
    /// The record's `updated_at` is captured on the first edit only, so later
    /// edits to the same row keep checking against what the user first saw.
    pub fn stage(&mut self, record: &Record, field: impl Into<String>, value: Option<FieldValue>) {
        let patch = self
            .patches
            .entry(record.id.clone())
            .or_insert_with(|| RecordPatch {
                expected_updated_at: Some(record.updated_at),
                changes: FieldChanges::new(),
            });
        patch.changes.insert(field.into(), value);
    }

    /// Value to display for `field`: the pending edit if any, else the stored value
    pub fn current_value<'a>(&'a self, record: &'a Record, field: &str) -> Option<&'a FieldValue> {
        match self
            .patches
            .get(&record.id)
            .and_then(|p| p.changes.get(field))
        {
            Some(pending) => pending.as_ref(),
            None => record.get(field),
        }
    }

    pub fn is_dirty(&self, id: &str, field: &str) -> bool {
        self.patches
            .get(id)
            .is_some_and(|p| p.changes.contains_key(field))
    }

    pub fn get(&self, id: &str) -> Option<&RecordPatch> {
        self.patches.get(id)
    }

    /// Number of records with pending edits
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Drop every pending edit
    pub fn discard(&mut self) {
        self.patches.clear();
    }

    /// Convert into addressed patches, ordered by record id
    pub fn into_patches(self) -> Vec<BulkPatch> {
        self.patches
            .into_iter()
            .map(|(id, patch)| BulkPatch {
                id,
                expected_updated_at: patch.expected_updated_at,
                changes: patch.changes,
            })
            .collect()
    }
}
