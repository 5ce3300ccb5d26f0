//! Bulk save of pending field edits with optimistic concurrency

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;

use crate::records::BulkPatch;

use super::concurrency::ConcurrencyLimiter;
use super::store::{RecordStore, StoreError};

pub const NOT_FOUND_ERROR: &str = "Record not found";
pub const CONFLICT_ERROR: &str = "Record was modified by another user";

/// Result of saving one patch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSaveResult {
    pub success: bool,
    pub id: String,
    /// The record changed since it was loaded; reload and retry rather than fix
    pub conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// New `updated_at` on success, the current one on conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BulkSaveResult {
    fn from_store(id: String, result: Result<DateTime<Utc>, StoreError>) -> Self {
        match result {
            Ok(updated_at) => BulkSaveResult {
                success: true,
                id,
                conflict: false,
                error: None,
                updated_at: Some(updated_at),
            },
            Err(StoreError::Conflict {
                current_updated_at, ..
            }) => BulkSaveResult {
                success: false,
                id,
                conflict: true,
                error: Some(CONFLICT_ERROR.to_string()),
                updated_at: Some(current_updated_at),
            },
            Err(StoreError::NotFound(_)) => BulkSaveResult {
                success: false,
                id,
                conflict: false,
                error: Some(NOT_FOUND_ERROR.to_string()),
                updated_at: None,
            },
            Err(err) => BulkSaveResult {
                success: false,
                id,
                conflict: false,
                error: Some(err.to_string()),
                updated_at: None,
            },
        }
    }
}

/// Per-patch results of a bulk save, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkSaveSummary {
    pub results: Vec<BulkSaveResult>,
}

impl BulkSaveSummary {
    pub fn saved(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Patches rejected because the record changed underneath them
    pub fn conflicts(&self) -> Vec<&BulkSaveResult> {
        self.results.iter().filter(|r| r.conflict).collect()
    }

    /// Failures other than conflicts
    pub fn errors(&self) -> Vec<&BulkSaveResult> {
        self.results
            .iter()
            .filter(|r| !r.success && !r.conflict)
            .collect()
    }
}

/// Apply every patch independently; one patch failing never blocks another
pub async fn save_patches(
    store: &dyn RecordStore,
    patches: Vec<BulkPatch>,
    max_concurrent: usize,
) -> BulkSaveSummary {
    let limiter = ConcurrencyLimiter::new(max_concurrent);
    let total = patches.len();

    let results = join_all(patches.into_iter().map(|patch| {
        let limiter = &limiter;
        async move {
            let result = match limiter.acquire().await {
                Ok(_permit) => store
                    .update_fields(&patch.id, &patch.changes, patch.expected_updated_at)
                    .await
                    .map(|record| record.updated_at),
                Err(err) => Err(StoreError::Backend(err.to_string())),
            };
            if let Err(err) = &result {
                warn!("Save of {} failed: {}", patch.id, err);
            }
            BulkSaveResult::from_store(patch.id, result)
        }
    }))
    .await;

    let summary = BulkSaveSummary { results };
    info!(
        "Saved {}/{} patches ({} conflicts)",
        summary.saved(),
        total,
        summary.conflicts().len()
    );
    summary
}
