//! Read spreadsheet bytes into an in-memory grid of raw cells

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::debug;

use super::ParseError;
use super::values::{date_from_serial, format_date};

/// An untyped cell as read from a spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// Present but blank
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date-formatted cell as its serial value
    Date(f64),
}

impl RawCell {
    /// Blank, or text that is empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text of the cell, untrimmed; whole numbers render without ".0"
    pub fn display_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Number(f) => number_text(*f),
            RawCell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            RawCell::Date(serial) => date_from_serial(*serial)
                .map(format_date)
                .unwrap_or_else(|| number_text(*serial)),
        }
    }
}

fn number_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl From<&Data> for RawCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => RawCell::Empty,
            Data::String(s) => RawCell::Text(s.clone()),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Float(f) => RawCell::Number(*f),
            Data::Bool(b) => RawCell::Bool(*b),
            Data::DateTime(dt) => RawCell::Date(dt.as_f64()),
            Data::DateTimeIso(s) => RawCell::Text(s.clone()),
            Data::DurationIso(s) => RawCell::Text(s.clone()),
            Data::Error(_) => RawCell::Empty,
        }
    }
}

/// One worksheet, rows anchored at spreadsheet row/column 0
///
/// Cells past the end of a row are absent, as opposed to present-but-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<RawCell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&RawCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Width of the widest row
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

/// Ordered worksheets of a workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// Accept the spreadsheet extensions the import understands
pub fn validate_file_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Parse workbook bytes (xlsx, xls, xlsb or ods) into raw grids
pub fn read_workbook(bytes: &[u8]) -> Result<Workbook, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ParseError::Unreadable(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ParseError::Unreadable(format!("sheet '{}': {}", name, e)))?;

        // calamine trims leading blank rows/columns; pad them back so row
        // indices match the spreadsheet
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<RawCell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![RawCell::Empty; col_offset];
            cells.extend(row.iter().map(RawCell::from));
            rows.push(cells);
        }

        debug!("Read sheet '{}': {} rows", name, rows.len());
        sheets.push(Sheet::new(name, rows));
    }

    Ok(Workbook { sheets })
}
