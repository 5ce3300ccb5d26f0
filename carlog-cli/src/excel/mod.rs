//! Spreadsheet ingestion and export for the CAR log
//!
//! Import runs bytes -> [`workbook`] -> [`locator`] -> [`headers`] -> [`rows`];
//! [`pipeline`] strings the stages together and turns failures into
//! diagnostics. [`writer`] produces the export workbook.

pub mod headers;
pub mod locator;
pub mod pipeline;
pub mod rows;
pub mod values;
pub mod workbook;
pub mod writer;

pub use pipeline::{Diagnostic, ParseReport, parse_workbook_bytes};
pub use workbook::{RawCell, Sheet, Workbook, read_workbook, validate_file_name};

/// No extractable data in a workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The workbook has no sheets
    NoWorksheet,
    /// No header-row attempt produced any data rows
    NoData { sheet: String },
    /// The bytes are not a readable workbook
    Unreadable(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoWorksheet => write!(f, "Workbook contains no worksheets"),
            ParseError::NoData { sheet } => write!(f, "No data found in sheet '{}'", sheet),
            ParseError::Unreadable(msg) => write!(f, "Unable to read workbook: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}
