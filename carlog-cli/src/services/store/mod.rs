//! Record store abstraction
//!
//! The reconciliation engine, bulk save and manual entry talk to storage only
//! through [`RecordStore`]. Business-key uniqueness, per-year key allocation
//! and the optimistic-concurrency check are the store's job so they hold no
//! matter how many writers run at once.

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::records::{FieldChanges, KeyYear, Record};

/// Failure of a single store operation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No record with this storage id
    NotFound(String),
    /// Another record already holds this business key
    DuplicateKey(String),
    /// The record changed after the caller's expected timestamp
    Conflict {
        id: String,
        current_updated_at: DateTime<Utc>,
    },
    /// The backing store failed
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Record not found: {}", id),
            StoreError::DuplicateKey(key) => write!(f, "Duplicate Internal CAR #: {}", key),
            StoreError::Conflict { id, current_updated_at } => write!(
                f,
                "Record {} was modified at {}",
                id,
                current_updated_at.to_rfc3339()
            ),
            StoreError::Backend(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub(crate) fn backend(err: anyhow::Error) -> Self {
        StoreError::Backend(format!("{:#}", err))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError>;

    async fn find_by_key(&self, business_key: &str) -> Result<Option<Record>, StoreError>;

    async fn list(&self) -> Result<Vec<Record>, StoreError>;

    /// Create a record under a caller-supplied business key
    async fn insert(&self, business_key: &str, fields: FieldChanges) -> Result<Record, StoreError>;

    /// Merge `changes` into a record and advance its `updated_at`
    ///
    /// With `expected_updated_at`, fails with [`StoreError::Conflict`] and
    /// leaves the record untouched if it was modified after that instant.
    async fn update_fields(
        &self,
        id: &str,
        changes: &FieldChanges,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Record, StoreError>;

    /// Allocate the next `YY-NNN` key for `year` and create the record under
    /// it, atomically
    async fn create_with_generated_key(
        &self,
        year: &KeyYear,
        fields: FieldChanges,
    ) -> Result<Record, StoreError>;

    /// Highest sequence allocated or stored for `year`
    async fn max_sequence(&self, year: &KeyYear) -> Result<u64, StoreError>;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every store implementation must show

    use std::sync::Arc;

    use super::*;
    use crate::records::FieldValue;

    pub fn text(s: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(s.to_string()))
    }

    pub fn changes(pairs: &[(&str, Option<FieldValue>)]) -> FieldChanges {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect()
    }

    pub async fn insert_and_lookup(store: &dyn RecordStore) {
        let created = store
            .insert("25-001", changes(&[("status", text("Open"))]))
            .await
            .unwrap();

        assert_eq!(created.business_key, "25-001");
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.get(&created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_key("25-001").await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_key("25-002").await.unwrap(), None);
        assert_eq!(store.list().await.unwrap(), vec![created]);
    }

    pub async fn duplicate_key_rejected(store: &dyn RecordStore) {
        store.insert("25-001", FieldChanges::new()).await.unwrap();
        let err = store.insert("25-001", FieldChanges::new()).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey("25-001".into()));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    pub async fn partial_update_merges(store: &dyn RecordStore) {
        let created = store
            .insert(
                "25-001",
                changes(&[("status", text("Open")), ("location", text("Plant 2"))]),
            )
            .await
            .unwrap();

        let updated = store
            .update_fields(
                &created.id,
                &changes(&[("status", text("Closed")), ("champion", None)]),
                None,
            )
            .await
            .unwrap();

        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.get("status"), text("Closed").as_ref());
        assert_eq!(updated.get("location"), text("Plant 2").as_ref());
        assert_eq!(store.get(&created.id).await.unwrap(), Some(updated));
    }

    pub async fn stale_update_conflicts(store: &dyn RecordStore) {
        let created = store
            .insert("25-001", changes(&[("status", text("Open"))]))
            .await
            .unwrap();
        let seen = created.updated_at;

        // Someone else saves first
        let theirs = store
            .update_fields(&created.id, &changes(&[("status", text("Closed"))]), Some(seen))
            .await
            .unwrap();

        let err = store
            .update_fields(&created.id, &changes(&[("status", text("Void"))]), Some(seen))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                id: created.id.clone(),
                current_updated_at: theirs.updated_at,
            }
        );
        assert_eq!(store.get(&created.id).await.unwrap(), Some(theirs));
    }

    pub async fn update_missing_record(store: &dyn RecordStore) {
        let err = store
            .update_fields("nope", &changes(&[("status", text("Open"))]), None)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("nope".into()));
    }

    pub async fn generated_keys_continue_from_existing(store: &dyn RecordStore) {
        let year = KeyYear::from_year(2025);
        store.insert("25-007", FieldChanges::new()).await.unwrap();
        store.insert("24-050", FieldChanges::new()).await.unwrap();
        store.insert("legacy-1", FieldChanges::new()).await.unwrap();
        assert_eq!(store.max_sequence(&year).await.unwrap(), 7);

        let first = store
            .create_with_generated_key(&year, changes(&[("status", text("Open"))]))
            .await
            .unwrap();
        let second = store
            .create_with_generated_key(&year, FieldChanges::new())
            .await
            .unwrap();

        assert_eq!(first.business_key, "25-008");
        assert_eq!(second.business_key, "25-009");
        assert_eq!(store.max_sequence(&year).await.unwrap(), 9);

        let other = store
            .create_with_generated_key(&KeyYear::from_year(2026), FieldChanges::new())
            .await
            .unwrap();
        assert_eq!(other.business_key, "26-001");
    }

    pub async fn concurrent_allocations_are_distinct(store: Arc<dyn RecordStore>) {
        const ALLOCATIONS: u64 = 20;
        let year = KeyYear::from_year(2025);

        let handles: Vec<_> = (0..ALLOCATIONS)
            .map(|_| {
                let store = Arc::clone(&store);
                let year = year.clone();
                tokio::spawn(async move {
                    store
                        .create_with_generated_key(&year, FieldChanges::new())
                        .await
                })
            })
            .collect();

        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap().unwrap().business_key);
        }
        keys.sort();

        let expected: Vec<String> = (1..=ALLOCATIONS).map(|n| format!("25-{:03}", n)).collect();
        assert_eq!(keys, expected);
        assert_eq!(store.max_sequence(&year).await.unwrap(), ALLOCATIONS);
        assert_eq!(store.list().await.unwrap().len() as u64, ALLOCATIONS);
    }
}
