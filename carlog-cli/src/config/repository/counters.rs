//! Per-year business-key counters

use anyhow::{Context, Result};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::records::KeyYear;

/// Current high-water mark for `year`, 0 if never allocated
pub async fn get_counter(pool: &SqlitePool, year: &KeyYear) -> Result<u64> {
    let count: Option<i64> = sqlx::query_scalar("SELECT count FROM year_counters WHERE year = ?")
        .bind(year.as_str())
        .fetch_optional(pool)
        .await
        .context("Failed to read year counter")?;

    Ok(count.unwrap_or(0).max(0) as u64)
}

/// Raise the counter for `year` to at least `floor`, then increment it and
/// return the new value
///
/// Run inside the transaction that inserts the record using the value.
pub async fn allocate<'e, E>(executor: E, year: &KeyYear, floor: u64) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let next: i64 = sqlx::query_scalar(
        "INSERT INTO year_counters (year, count) VALUES (?, ? + 1)
         ON CONFLICT(year) DO UPDATE SET count = MAX(count, excluded.count - 1) + 1
         RETURNING count",
    )
    .bind(year.as_str())
    .bind(floor as i64)
    .fetch_one(executor)
    .await
    .with_context(|| format!("Failed to allocate sequence for year {}", year))?;

    Ok(next.max(0) as u64)
}
