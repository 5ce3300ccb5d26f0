// Reconciliation of imported rows against stored records
//
// Matches rows by business key, rejects keys repeated within one import,
// allocates keys for rows that lack one and reports a per-row outcome.

pub mod engine;
pub mod models;

pub use engine::{CANCELLED_ERROR, duplicate_key_error, reconcile_rows};
pub use models::{CancelFlag, ImportAction, ImportSummary, ReconcileOptions, RowOutcome};
