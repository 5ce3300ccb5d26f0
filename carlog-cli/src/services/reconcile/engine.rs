//! Import-time upsert of normalized rows into the record store

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::future::join_all;
use log::{debug, info, warn};

use crate::records::{FieldChanges, NormalizedRow};
use crate::services::concurrency::ConcurrencyLimiter;
use crate::services::store::{RecordStore, StoreError};

use super::models::{CancelFlag, ImportSummary, ReconcileOptions, RowOutcome};

pub const CANCELLED_ERROR: &str = "import cancelled";

pub fn duplicate_key_error(business_key: &str) -> String {
    format!("Duplicate Internal CAR #: {}", business_key)
}

/// A store write planned for one row
enum Write {
    Update {
        row_index: usize,
        id: String,
        changes: FieldChanges,
    },
    Create {
        row_index: usize,
        changes: FieldChanges,
    },
}

impl Write {
    fn row_index(&self) -> usize {
        match self {
            Write::Update { row_index, .. } | Write::Create { row_index, .. } => *row_index,
        }
    }
}

/// Lookup results carried across chunks
#[derive(Default)]
struct Plan {
    /// business key -> id of the record that held it before the import
    existing: HashMap<String, Option<String>>,
    /// Keys a row in this import is creating
    claimed: HashSet<String>,
    /// Rows without a key, in row order
    generated: Vec<(usize, FieldChanges)>,
}

/// Reconcile `rows` against the store, producing exactly one outcome per row
///
/// Keyed rows are planned sequentially per chunk, then their writes run
/// concurrently with rows sharing a key applied in row order. Rows without a
/// key get generated keys afterwards, one at a time, in row order.
pub async fn reconcile_rows(
    store: &dyn RecordStore,
    rows: Vec<NormalizedRow>,
    options: &ReconcileOptions,
) -> ImportSummary {
    let total = rows.len();
    let limiter = ConcurrencyLimiter::new(options.max_concurrent);
    let batch_size = options.batch_size.max(1);

    info!(
        "Reconciling {} rows (batch size {}, {} concurrent)",
        total,
        batch_size,
        limiter.max_concurrent()
    );

    let mut outcomes = Vec::with_capacity(total);
    let mut plan = Plan::default();
    let mut pending = rows.into_iter().enumerate();

    loop {
        let chunk: Vec<(usize, NormalizedRow)> = pending.by_ref().take(batch_size).collect();
        let Some((first_index, _)) = chunk.first() else {
            break;
        };

        if options.cancel.is_cancelled() {
            warn!("Import cancelled before row {}", first_index + 1);
            outcomes.extend(chunk.iter().map(|(idx, row)| cancelled(*idx, row)));
            outcomes.extend(pending.by_ref().map(|(idx, row)| cancelled(idx, &row)));
            break;
        }

        debug!("Planning rows {}..{}", first_index, first_index + chunk.len());
        let lookup_errors = prefetch_existing(store, &limiter, &chunk, &mut plan).await;
        let groups = plan_chunk(chunk, &mut plan, &lookup_errors, &mut outcomes);

        let results = join_all(
            groups
                .into_iter()
                .map(|(key, writes)| run_group(store, &limiter, &options.cancel, key, writes)),
        )
        .await;
        outcomes.extend(results.into_iter().flatten());
    }

    let generated = std::mem::take(&mut plan.generated);
    if !generated.is_empty() {
        debug!("Creating {} rows with generated keys", generated.len());
    }
    for (row_index, changes) in generated {
        if options.cancel.is_cancelled() {
            outcomes.push(RowOutcome::failed(row_index, None, CANCELLED_ERROR));
            continue;
        }
        match store.create_with_generated_key(&options.year, changes).await {
            Ok(record) => outcomes.push(RowOutcome::created(row_index, record.business_key)),
            Err(err) => {
                warn!("Row {}: {}", row_index + 1, err);
                outcomes.push(RowOutcome::failed(row_index, None, err.to_string()));
            }
        }
    }

    let summary = ImportSummary::from_outcomes(outcomes);
    debug_assert_eq!(summary.total, total);

    let stats = limiter.stats();
    info!(
        "Import finished: {} created, {} updated, {} failed ({} store operations, {} waited)",
        summary.created, summary.updated, summary.failed, stats.rows_acquired, stats.rows_waited
    );
    summary
}

fn cancelled(row_index: usize, row: &NormalizedRow) -> RowOutcome {
    RowOutcome::failed(
        row_index,
        row.business_key().map(str::to_string),
        CANCELLED_ERROR,
    )
}

/// Look up every key in `chunk` not seen in an earlier chunk
///
/// Returns the keys whose lookup failed, with the error text.
async fn prefetch_existing(
    store: &dyn RecordStore,
    limiter: &ConcurrencyLimiter,
    chunk: &[(usize, NormalizedRow)],
    plan: &mut Plan,
) -> HashMap<String, String> {
    let mut keys: Vec<String> = chunk
        .iter()
        .filter_map(|(_, row)| row.business_key())
        .filter(|key| !plan.existing.contains_key(*key) && !plan.claimed.contains(*key))
        .map(str::to_string)
        .collect();
    keys.sort();
    keys.dedup();

    let lookups = join_all(keys.into_iter().map(|key| async move {
        let result = match limiter.acquire().await {
            Ok(_permit) => store.find_by_key(&key).await,
            Err(err) => Err(StoreError::Backend(err.to_string())),
        };
        (key, result)
    }))
    .await;

    let mut errors = HashMap::new();
    for (key, result) in lookups {
        match result {
            Ok(found) => {
                plan.existing.insert(key, found.map(|r| r.id));
            }
            Err(err) => {
                warn!("Lookup of '{}' failed: {}", key, err);
                errors.insert(key, err.to_string());
            }
        }
    }
    errors
}

/// Decide each row's action in row order; failures go straight to `outcomes`
fn plan_chunk(
    chunk: Vec<(usize, NormalizedRow)>,
    plan: &mut Plan,
    lookup_errors: &HashMap<String, String>,
    outcomes: &mut Vec<RowOutcome>,
) -> BTreeMap<String, Vec<Write>> {
    let mut groups: BTreeMap<String, Vec<Write>> = BTreeMap::new();

    for (row_index, row) in chunk {
        let Some(key) = row.business_key().map(str::to_string) else {
            plan.generated.push((row_index, row.into_changes()));
            continue;
        };

        if let Some(err) = lookup_errors.get(&key) {
            outcomes.push(RowOutcome::failed(row_index, Some(key), err.clone()));
            continue;
        }

        let changes = row.into_changes();
        match plan.existing.get(&key).cloned().flatten() {
            Some(id) => groups.entry(key).or_default().push(Write::Update {
                row_index,
                id,
                changes,
            }),
            None if plan.claimed.contains(&key) => {
                debug!("Row {}: key '{}' already used in this import", row_index + 1, key);
                let error = duplicate_key_error(&key);
                outcomes.push(RowOutcome::failed(row_index, Some(key), error));
            }
            None => {
                plan.claimed.insert(key.clone());
                groups
                    .entry(key)
                    .or_default()
                    .push(Write::Create { row_index, changes });
            }
        }
    }

    groups
}

/// Apply the writes for one business key in row order
async fn run_group(
    store: &dyn RecordStore,
    limiter: &ConcurrencyLimiter,
    cancel: &CancelFlag,
    key: String,
    writes: Vec<Write>,
) -> Vec<RowOutcome> {
    let mut outcomes = Vec::with_capacity(writes.len());

    for write in writes {
        let row_index = write.row_index();
        if cancel.is_cancelled() {
            outcomes.push(RowOutcome::failed(row_index, Some(key.clone()), CANCELLED_ERROR));
            continue;
        }

        let _permit = match limiter.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                outcomes.push(RowOutcome::failed(row_index, Some(key.clone()), err.to_string()));
                continue;
            }
        };

        let result = match write {
            Write::Update { id, changes, .. } => store
                .update_fields(&id, &changes, None)
                .await
                .map(|_| RowOutcome::updated(row_index, key.as_str())),
            Write::Create { changes, .. } => store
                .insert(&key, changes)
                .await
                .map(|_| RowOutcome::created(row_index, key.as_str())),
        };

        outcomes.push(result.unwrap_or_else(|err| {
            warn!("Row {}: {}", row_index + 1, err);
            RowOutcome::failed(row_index, Some(key.clone()), err.to_string())
        }));
    }

    outcomes
}
