//! Target sheet selection and header-row detection
//!
//! Source spreadsheets often carry a title or banner row above the real
//! header row, or a merged/blank header row whose labels sit one row lower.
//! Detection is a best-effort probe over the first few rows and reports how
//! confident it is rather than guaranteeing the right row.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use super::headers::lookup_alias;
use super::{ParseError, RawCell, Sheet, Workbook};

/// Last row index probed as a header row
pub const MAX_HEADER_ROW: usize = 3;

/// Header tokens containing one of these look like a real header row
const HEADER_KEYWORDS: &[&str] = &["car", "status", "location", "date"];

/// Token given to a blank header cell
const PLACEHOLDER: &str = "__EMPTY";

/// How the header row was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderConfidence {
    /// Headers contained a recognizable keyword
    Recognized,
    /// Nothing looked like headers; the last probed row was used anyway
    Fallback,
}

/// One data row keyed by raw header token
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Zero-based spreadsheet row index
    pub source_row: usize,
    pub cells: HashMap<String, RawCell>,
}

impl RawRow {
    pub fn get(&self, header: &str) -> Option<&RawCell> {
        self.cells.get(header)
    }
}

/// Headers and data rows extracted from the chosen sheet
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedSheet {
    pub sheet_name: String,
    /// Zero-based index of the row the headers were read from
    pub header_row: usize,
    /// Raw header tokens in column order
    pub headers: Vec<String>,
    /// Data rows in spreadsheet order
    pub rows: Vec<RawRow>,
    pub confidence: HeaderConfidence,
    /// Headers were recovered from the row below a blank/merged header row
    pub repaired: bool,
}

/// True for tokens generated for blank header cells
pub fn is_placeholder(token: &str) -> bool {
    token.starts_with(PLACEHOLDER)
}

/// First sheet whose name contains `phrase` (case-insensitive), else the first sheet
pub fn select_sheet<'a>(workbook: &'a Workbook, phrase: &str) -> Result<&'a Sheet, ParseError> {
    let phrase = phrase.to_lowercase();
    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    debug!("Available sheets: {:?}", names);

    if let Some(sheet) = workbook
        .sheets
        .iter()
        .find(|s| !phrase.is_empty() && s.name.to_lowercase().contains(&phrase))
    {
        info!("Using sheet '{}'", sheet.name);
        return Ok(sheet);
    }

    let sheet = workbook.sheets.first().ok_or(ParseError::NoWorksheet)?;
    info!("No sheet matches '{}', using first sheet '{}'", phrase, sheet.name);
    Ok(sheet)
}

/// Select the target sheet and extract its headers and data rows
pub fn locate(workbook: &Workbook, phrase: &str) -> Result<LocatedSheet, ParseError> {
    let sheet = select_sheet(workbook, phrase)?;
    locate_in_sheet(sheet)
}

/// Probe rows 0..=MAX_HEADER_ROW for the header row of `sheet`
pub fn locate_in_sheet(sheet: &Sheet) -> Result<LocatedSheet, ParseError> {
    let mut chosen = None;

    for header_row in 0..=MAX_HEADER_ROW {
        let extraction = extract_at(sheet, header_row);
        if extraction.rows.is_empty() {
            debug!("Header row {}: no data rows", header_row + 1);
            continue;
        }

        debug!(
            "Header row {}: {} data rows, headers {:?}",
            header_row + 1,
            extraction.rows.len(),
            extraction.headers.iter().take(10).collect::<Vec<_>>()
        );

        if looks_like_headers(&extraction.headers) {
            chosen = Some((header_row, extraction, HeaderConfidence::Recognized));
            break;
        }
        if header_row == MAX_HEADER_ROW {
            warn!(
                "No recognizable headers in rows 1-{}, falling back to row {}",
                MAX_HEADER_ROW + 1,
                header_row + 1
            );
            chosen = Some((header_row, extraction, HeaderConfidence::Fallback));
        }
    }

    let (header_row, extraction, confidence) = chosen.ok_or_else(|| ParseError::NoData {
        sheet: sheet.name.clone(),
    })?;

    let mut located = LocatedSheet {
        sheet_name: sheet.name.clone(),
        header_row,
        headers: extraction.headers,
        rows: extraction.rows,
        confidence,
        repaired: false,
    };

    if needs_repair(&located.headers) {
        repair_headers(&mut located);
        if located.rows.is_empty() {
            return Err(ParseError::NoData {
                sheet: sheet.name.clone(),
            });
        }
    }

    info!(
        "Sheet '{}': headers on row {}, {} data rows",
        located.sheet_name,
        located.header_row + 1,
        located.rows.len()
    );
    Ok(located)
}

struct Extraction {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

/// Treat `header_row` as the header row and every later non-blank row as data
fn extract_at(sheet: &Sheet, header_row: usize) -> Extraction {
    let empty = Extraction {
        headers: Vec::new(),
        rows: Vec::new(),
    };

    let Some(header_cells) = sheet.rows.get(header_row) else {
        return empty;
    };
    if header_cells.iter().all(RawCell::is_blank) {
        return empty;
    }

    let width = sheet.width();
    let labels: Vec<String> = (0..width)
        .map(|col| {
            header_cells
                .get(col)
                .map(|c| c.display_text().trim().to_string())
                .unwrap_or_default()
        })
        .collect();
    let headers = header_tokens(&labels);

    let rows = sheet
        .rows
        .iter()
        .enumerate()
        .skip(header_row + 1)
        .filter(|(_, cells)| !cells.iter().all(RawCell::is_blank))
        .map(|(idx, cells)| RawRow {
            source_row: idx,
            cells: headers
                .iter()
                .enumerate()
                .map(|(col, h)| (h.clone(), cells.get(col).cloned().unwrap_or(RawCell::Empty)))
                .collect(),
        })
        .collect();

    Extraction { headers, rows }
}

/// Unique tokens for header labels: blanks become `__EMPTY`, `__EMPTY_1`, ...
/// and repeated labels get `_1`, `_2` suffixes, skipping any suffixed name
/// already taken by another column
fn header_tokens(labels: &[String]) -> Vec<String> {
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    labels
        .iter()
        .map(|label| {
            let base = if label.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                label.clone()
            };
            let mut token = base.clone();
            while taken.contains(&token) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                token = format!("{}_{}", base, suffix);
                *suffix += 1;
            }
            taken.insert(token.clone());
            token
        })
        .collect()
}

fn looks_like_headers(headers: &[String]) -> bool {
    headers
        .iter()
        .filter(|h| !is_placeholder(h))
        .map(|h| h.to_lowercase())
        .any(|h| HEADER_KEYWORDS.iter().any(|k| h.contains(k)))
}

/// A blank/merged first header cell with no recognizable field labels means
/// the labels are on the next row
fn needs_repair(headers: &[String]) -> bool {
    let first_is_placeholder = headers.first().is_some_and(|h| is_placeholder(h));
    first_is_placeholder
        && !headers
            .iter()
            .any(|h| !is_placeholder(h) && lookup_alias(h).is_some())
}

/// Promote the first data row to headers and re-key the remaining rows
fn repair_headers(located: &mut LocatedSheet) {
    if located.rows.is_empty() {
        return;
    }
    let label_row = located.rows.remove(0);
    let old_tokens = std::mem::take(&mut located.headers);

    let labels: Vec<String> = old_tokens
        .iter()
        .map(|t| {
            label_row
                .get(t)
                .map(|c| c.display_text().trim().to_string())
                .unwrap_or_default()
        })
        .collect();
    let new_tokens = header_tokens(&labels);

    info!(
        "Header row {} is blank or merged, using row {} values as headers",
        located.header_row + 1,
        label_row.source_row + 1
    );

    // Position i of the old header maps to recovered label i; blank labels are dropped
    let pairs: Vec<(&String, &String)> = old_tokens
        .iter()
        .zip(new_tokens.iter())
        .zip(labels.iter())
        .filter(|(_, label)| !label.is_empty())
        .map(|(pair, _)| pair)
        .collect();

    for row in &mut located.rows {
        let mut cells = HashMap::with_capacity(pairs.len());
        for (old, new) in &pairs {
            if let Some(cell) = row.cells.remove(*old) {
                cells.insert((*new).clone(), cell);
            }
        }
        row.cells = cells;
    }

    located.headers = pairs.into_iter().map(|(_, new)| new.clone()).collect();
    located.header_row = label_row.source_row;
    located.repaired = true;
}
