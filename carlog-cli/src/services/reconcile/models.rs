use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::records::KeyYear;

/// What happened to one imported row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Created,
    Updated,
    Failed,
}

/// Outcome of reconciling one row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    pub success: bool,
    /// Position of the row in the imported sequence
    pub row_index: usize,
    #[serde(rename = "internalCarNumber", skip_serializing_if = "Option::is_none")]
    pub business_key: Option<String>,
    pub action: ImportAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RowOutcome {
    pub fn created(row_index: usize, business_key: impl Into<String>) -> Self {
        RowOutcome {
            success: true,
            row_index,
            business_key: Some(business_key.into()),
            action: ImportAction::Created,
            error: None,
        }
    }

    pub fn updated(row_index: usize, business_key: impl Into<String>) -> Self {
        RowOutcome {
            success: true,
            row_index,
            business_key: Some(business_key.into()),
            action: ImportAction::Updated,
            error: None,
        }
    }

    pub fn failed(row_index: usize, business_key: Option<String>, error: impl Into<String>) -> Self {
        RowOutcome {
            success: false,
            row_index,
            business_key,
            action: ImportAction::Failed,
            error: Some(error.into()),
        }
    }
}

/// Aggregate result of an import; returned even when rows fail
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// One entry per input row, ordered by row index
    pub outcomes: Vec<RowOutcome>,
}

impl ImportSummary {
    pub fn from_outcomes(mut outcomes: Vec<RowOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.row_index);
        let count = |action: ImportAction| outcomes.iter().filter(|o| o.action == action).count();

        ImportSummary {
            total: outcomes.len(),
            created: count(ImportAction::Created),
            updated: count(ImportAction::Updated),
            failed: count(ImportAction::Failed),
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// Shared flag that stops an import from issuing further writes
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Import settings
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Year prefix for generated business keys
    pub year: KeyYear,
    /// Rows planned and dispatched per chunk
    pub batch_size: usize,
    /// Store operations in flight at once
    pub max_concurrent: usize,
    pub cancel: CancelFlag,
}

impl ReconcileOptions {
    pub const DEFAULT_BATCH_SIZE: usize = 200;
    pub const DEFAULT_MAX_CONCURRENT: usize = 16;

    pub fn new(year: KeyYear) -> Self {
        ReconcileOptions {
            year,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            cancel: CancelFlag::new(),
        }
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::new(KeyYear::current())
    }
}
