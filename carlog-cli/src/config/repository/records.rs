//! Corrective-action records repository

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::records::{BusinessKey, FieldValue, KeyYear, Record};

const SELECT_COLUMNS: &str =
    "SELECT id, business_key, fields_json, created_at_us, updated_at_us FROM corrective_actions";

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .with_context(|| format!("Timestamp out of range: {}", micros))
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let fields_json: String = row.try_get("fields_json")?;
    let fields: BTreeMap<String, FieldValue> =
        serde_json::from_str(&fields_json).context("Failed to decode record fields")?;

    Ok(Record {
        id: row.try_get("id")?,
        business_key: row.try_get("business_key")?,
        fields,
        created_at: from_micros(row.try_get("created_at_us")?)?,
        updated_at: from_micros(row.try_get("updated_at_us")?)?,
    })
}

/// Get a record by storage id
pub async fn get_record(pool: &SqlitePool, id: &str) -> Result<Option<Record>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get record")?;

    row.as_ref().map(record_from_row).transpose()
}

/// Get a record by business key
pub async fn find_record_by_key(pool: &SqlitePool, business_key: &str) -> Result<Option<Record>> {
    let row = sqlx::query(&format!("{} WHERE business_key = ?", SELECT_COLUMNS))
        .bind(business_key)
        .fetch_optional(pool)
        .await
        .context("Failed to find record by business key")?;

    row.as_ref().map(record_from_row).transpose()
}

/// List all records in insertion order
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<Record>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at_us, rowid", SELECT_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list records")?;

    rows.iter().map(record_from_row).collect()
}

/// Insert a new record; fails on a duplicate business key
pub async fn insert_record<'e, E>(executor: E, record: &Record) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let parsed = BusinessKey::parse(&record.business_key);
    let fields_json =
        serde_json::to_string(&record.fields).context("Failed to encode record fields")?;

    sqlx::query(
        "INSERT INTO corrective_actions
             (id, business_key, key_year, key_seq, fields_json, created_at_us, updated_at_us)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.business_key)
    .bind(parsed.as_ref().map(|k| k.year.as_str().to_string()))
    .bind(parsed.as_ref().map(|k| k.sequence as i64))
    .bind(fields_json)
    .bind(record.created_at.timestamp_micros())
    .bind(record.updated_at.timestamp_micros())
    .execute(executor)
    .await
    .with_context(|| format!("Failed to insert record '{}'", record.business_key))?;

    Ok(())
}

/// Write `record`'s fields and `updated_at` only if the stored `updated_at`
/// still equals `previous_updated_at`
///
/// Returns false when another writer got there first.
pub async fn update_record_if_unchanged(
    pool: &SqlitePool,
    record: &Record,
    previous_updated_at: DateTime<Utc>,
) -> Result<bool> {
    let fields_json =
        serde_json::to_string(&record.fields).context("Failed to encode record fields")?;

    let result = sqlx::query(
        "UPDATE corrective_actions
         SET fields_json = ?, updated_at_us = ?
         WHERE id = ? AND updated_at_us = ?",
    )
    .bind(fields_json)
    .bind(record.updated_at.timestamp_micros())
    .bind(&record.id)
    .bind(previous_updated_at.timestamp_micros())
    .execute(pool)
    .await
    .context("Failed to update record")?;

    Ok(result.rows_affected() > 0)
}

/// Highest sequence among stored `YY-NNN` keys for `year`, 0 if none
pub async fn max_key_sequence<'e, E>(executor: E, year: &KeyYear) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(key_seq) FROM corrective_actions WHERE key_year = ?")
            .bind(year.as_str())
            .fetch_one(executor)
            .await
            .context("Failed to read highest key sequence")?;

    Ok(max.unwrap_or(0).max(0) as u64)
}

/// True when an error chain bottoms out in a UNIQUE constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
