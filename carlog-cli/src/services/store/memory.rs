//! In-memory record store for tests and dry-run imports

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::records::{BusinessKey, FieldChanges, KeyYear, Record, max_sequence, truncate_micros};

use super::{RecordStore, StoreError};

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, Record>,
    /// business key -> record id
    keys: HashMap<String, String>,
    /// Insertion order of record ids
    order: Vec<String>,
    counters: HashMap<KeyYear, u64>,
}

impl State {
    fn insert(&mut self, record: Record) -> Result<Record, StoreError> {
        if self.keys.contains_key(&record.business_key) {
            return Err(StoreError::DuplicateKey(record.business_key));
        }
        self.keys.insert(record.business_key.clone(), record.id.clone());
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn max_sequence(&self, year: &KeyYear) -> u64 {
        let stored = max_sequence(self.keys.keys().map(String::as_str), year);
        let counter = self.counters.get(year).copied().unwrap_or(0);
        stored.max(counter)
    }
}

/// Record store held in a mutex; every operation is atomic
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<State>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with existing records (e.g. a copy of the database)
    pub fn with_records(records: Vec<Record>) -> Result<Self, StoreError> {
        let mut state = State::default();
        for record in records {
            state.insert(record)?;
        }
        Ok(MemoryRecordStore {
            state: Mutex::new(state),
        })
    }

    fn now() -> DateTime<Utc> {
        truncate_micros(Utc::now())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.state.lock().await.records.get(id).cloned())
    }

    async fn find_by_key(&self, business_key: &str) -> Result<Option<Record>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .keys
            .get(business_key)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect())
    }

    async fn insert(&self, business_key: &str, fields: FieldChanges) -> Result<Record, StoreError> {
        let record = Record::new(business_key, fields, Self::now());
        self.state.lock().await.insert(record)
    }

    async fn update_fields(
        &self,
        id: &str,
        changes: &FieldChanges,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Record, StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if expected_updated_at.is_some_and(|expected| record.updated_at > expected) {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                current_updated_at: record.updated_at,
            });
        }

        record.apply_changes(changes, Self::now());
        Ok(record.clone())
    }

    async fn create_with_generated_key(
        &self,
        year: &KeyYear,
        fields: FieldChanges,
    ) -> Result<Record, StoreError> {
        let mut state = self.state.lock().await;
        let sequence = state.max_sequence(year) + 1;
        let key = BusinessKey::new(year.clone(), sequence);

        let record = state.insert(Record::new(key.to_string(), fields, Self::now()))?;
        state.counters.insert(year.clone(), sequence);
        Ok(record)
    }

    async fn max_sequence(&self, year: &KeyYear) -> Result<u64, StoreError> {
        Ok(self.state.lock().await.max_sequence(year))
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        contract::insert_and_lookup(&MemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        contract::duplicate_key_rejected(&MemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_partial_update_merges() {
        contract::partial_update_merges(&MemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        contract::stale_update_conflicts(&MemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        contract::update_missing_record(&MemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_generated_keys_continue_from_existing() {
        contract::generated_keys_continue_from_existing(&MemoryRecordStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_are_distinct() {
        contract::concurrent_allocations_are_distinct(std::sync::Arc::new(MemoryRecordStore::new()))
            .await;
    }

    #[tokio::test]
    async fn test_with_records_rejects_duplicates() {
        let now = Utc::now();
        let records = vec![
            Record::new("25-001", FieldChanges::new(), now),
            Record::new("25-001", FieldChanges::new(), now),
        ];
        assert!(matches!(
            MemoryRecordStore::with_records(records),
            Err(StoreError::DuplicateKey(_))
        ));
    }
}
