//! Apply a header mapping and value coercion to raw rows

use log::debug;

use crate::records::{NormalizedRow, kind_of};

use super::headers::HeaderMapping;
use super::locator::RawRow;
use super::values::coerce;

/// Normalize one row; unmapped, blank and uncoercible cells are left out
pub fn normalize_row(row: &RawRow, mapping: &HeaderMapping) -> NormalizedRow {
    let mut normalized = NormalizedRow::new();
    for (header, cell) in &row.cells {
        let Some(target) = mapping.target(header) else {
            continue;
        };
        if cell.is_blank() {
            continue;
        }
        if let Some(value) = coerce(cell, kind_of(target)) {
            normalized.insert(target, value);
        }
    }
    normalized
}

/// Rows that survived normalization plus their spreadsheet row indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRows {
    pub rows: Vec<NormalizedRow>,
    pub source_rows: Vec<usize>,
    /// Rows that produced no fields at all
    pub dropped: usize,
}

/// Normalize rows in order, dropping those with no usable fields
pub fn normalize_rows(rows: &[RawRow], mapping: &HeaderMapping) -> NormalizedRows {
    let mut out = NormalizedRows::default();
    for row in rows {
        let normalized = normalize_row(row, mapping);
        if normalized.is_empty() {
            debug!("Row {} has no mapped values, dropping", row.source_row + 1);
            out.dropped += 1;
            continue;
        }
        out.rows.push(normalized);
        out.source_rows.push(row.source_row);
    }
    out
}
