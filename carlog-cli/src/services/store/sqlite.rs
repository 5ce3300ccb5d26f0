//! SQLite-backed record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqlitePool;

use crate::config::repository::{counters, records};
use crate::records::{BusinessKey, FieldChanges, KeyYear, Record, truncate_micros};

use super::{RecordStore, StoreError};

/// Attempts at a compare-and-swap update before giving up
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Record store persisted through the repository layer
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteRecordStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn now() -> DateTime<Utc> {
        truncate_micros(Utc::now())
    }

    fn insert_error(err: anyhow::Error, business_key: &str) -> StoreError {
        if records::is_unique_violation(&err) {
            StoreError::DuplicateKey(business_key.to_string())
        } else {
            StoreError::backend(err)
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        records::get_record(&self.pool, id)
            .await
            .map_err(StoreError::backend)
    }

    async fn find_by_key(&self, business_key: &str) -> Result<Option<Record>, StoreError> {
        records::find_record_by_key(&self.pool, business_key)
            .await
            .map_err(StoreError::backend)
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        records::list_records(&self.pool)
            .await
            .map_err(StoreError::backend)
    }

    async fn insert(&self, business_key: &str, fields: FieldChanges) -> Result<Record, StoreError> {
        let record = Record::new(business_key, fields, Self::now());
        records::insert_record(&self.pool, &record)
            .await
            .map_err(|e| Self::insert_error(e, business_key))?;
        Ok(record)
    }

    async fn update_fields(
        &self,
        id: &str,
        changes: &FieldChanges,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Record, StoreError> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let current = records::get_record(&self.pool, id)
                .await
                .map_err(StoreError::backend)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            if expected_updated_at.is_some_and(|expected| current.updated_at > expected) {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    current_updated_at: current.updated_at,
                });
            }

            let previous = current.updated_at;
            let mut updated = current;
            updated.apply_changes(changes, Self::now());

            let written = records::update_record_if_unchanged(&self.pool, &updated, previous)
                .await
                .map_err(StoreError::backend)?;
            if written {
                return Ok(updated);
            }
            debug!(
                "Record {} changed during update, retrying (attempt {}/{})",
                id, attempt, MAX_UPDATE_ATTEMPTS
            );
        }

        Err(StoreError::Backend(format!(
            "Record {} kept changing during update",
            id
        )))
    }

    async fn create_with_generated_key(
        &self,
        year: &KeyYear,
        fields: FieldChanges,
    ) -> Result<Record, StoreError> {
        // Take the write lock up front so concurrent allocators queue on
        // busy_timeout instead of failing the read-to-write upgrade
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        let stored_max = records::max_key_sequence(&mut *tx, year)
            .await
            .map_err(StoreError::backend)?;
        let sequence = counters::allocate(&mut *tx, year, stored_max)
            .await
            .map_err(StoreError::backend)?;

        let key = BusinessKey::new(year.clone(), sequence).to_string();
        let record = Record::new(key.clone(), fields, Self::now());
        records::insert_record(&mut *tx, &record)
            .await
            .map_err(|e| Self::insert_error(e, &key))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to commit transaction: {}", e)))?;

        debug!("Allocated business key {}", key);
        Ok(record)
    }

    async fn max_sequence(&self, year: &KeyYear) -> Result<u64, StoreError> {
        let stored = records::max_key_sequence(&self.pool, year)
            .await
            .map_err(StoreError::backend)?;
        let counter = counters::get_counter(&self.pool, year)
            .await
            .map_err(StoreError::backend)?;
        Ok(stored.max(counter))
    }
}
