//! Bytes-to-rows import pipeline
//!
//! Never fails: a workbook with nothing extractable yields zero rows and a
//! diagnostic explaining why.

use log::{info, warn};

use crate::records::NormalizedRow;

use super::headers::{HeaderMapping, build_header_map};
use super::locator::{HeaderConfidence, is_placeholder, locate};
use super::rows::normalize_rows;
use super::{ParseError, read_workbook};

/// Something the user should review before trusting an import
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Nothing could be extracted
    Parse(ParseError),
    /// Headers with no alias; their columns are not imported
    UnmatchedHeaders(Vec<String>),
    /// No header matched, so columns were imported under raw-derived keys
    DegradedMapping,
    /// No header row was recognized; row `row` (0-based) was assumed
    FallbackHeaderRow { row: usize },
    /// Header labels were recovered from row `row` (0-based)
    HeaderRowRepaired { row: usize },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Parse(err) => write!(f, "{}", err),
            Diagnostic::UnmatchedHeaders(headers) => {
                write!(f, "{} unrecognized column(s): {}", headers.len(), headers.join(", "))
            }
            Diagnostic::DegradedMapping => write!(
                f,
                "No column headers were recognized; columns imported under raw names"
            ),
            Diagnostic::FallbackHeaderRow { row } => write!(
                f,
                "No recognizable header row found; assumed row {}",
                row + 1
            ),
            Diagnostic::HeaderRowRepaired { row } => write!(
                f,
                "Header row was blank or merged; used row {} as headers",
                row + 1
            ),
        }
    }
}

/// Everything the pipeline learned about a workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub sheet_name: Option<String>,
    /// Zero-based header row, when one was located
    pub header_row: Option<usize>,
    pub confidence: Option<HeaderConfidence>,
    /// Raw header strings in column order
    pub headers: Vec<String>,
    pub mapping: HeaderMapping,
    pub rows: Vec<NormalizedRow>,
    /// Spreadsheet row index of each entry in `rows`
    pub source_rows: Vec<usize>,
    /// Raw data rows under the header, before normalization
    pub total_rows: usize,
    /// Raw rows that normalized to zero fields
    pub dropped_rows: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    fn failed(err: ParseError) -> Self {
        warn!("{}", err);
        ParseReport {
            diagnostics: vec![Diagnostic::Parse(err)],
            ..Default::default()
        }
    }

    /// The mapping fell back or the header row was guessed
    pub fn is_low_confidence(&self) -> bool {
        self.mapping.degraded || self.confidence == Some(HeaderConfidence::Fallback)
    }
}

/// Parse workbook bytes into normalized rows from the target sheet
pub fn parse_workbook_bytes(bytes: &[u8], target_sheet: &str) -> ParseReport {
    let workbook = match read_workbook(bytes) {
        Ok(workbook) => workbook,
        Err(err) => return ParseReport::failed(err),
    };

    let located = match locate(&workbook, target_sheet) {
        Ok(located) => located,
        Err(err) => return ParseReport::failed(err),
    };

    let mut diagnostics = Vec::new();
    if located.confidence == HeaderConfidence::Fallback {
        diagnostics.push(Diagnostic::FallbackHeaderRow {
            row: located.header_row,
        });
    }
    if located.repaired {
        diagnostics.push(Diagnostic::HeaderRowRepaired {
            row: located.header_row,
        });
    }

    // Placeholder tokens stand for blank header cells and never map to a field
    let headers: Vec<String> = located
        .headers
        .iter()
        .filter(|h| !is_placeholder(h))
        .cloned()
        .collect();
    let mapping = build_header_map(&headers);

    if mapping.degraded {
        diagnostics.push(Diagnostic::DegradedMapping);
    }
    if !mapping.unmatched.is_empty() {
        diagnostics.push(Diagnostic::UnmatchedHeaders(mapping.unmatched.clone()));
    }

    let normalized = normalize_rows(&located.rows, &mapping);

    info!(
        "Parsed {} rows from '{}' ({} matched columns, {} dropped rows)",
        normalized.rows.len(),
        located.sheet_name,
        mapping.matched_count(),
        normalized.dropped
    );

    ParseReport {
        sheet_name: Some(located.sheet_name),
        header_row: Some(located.header_row),
        confidence: Some(located.confidence),
        headers,
        mapping,
        total_rows: located.rows.len(),
        dropped_rows: normalized.dropped,
        rows: normalized.rows,
        source_rows: normalized.source_rows,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FieldValue;
    use chrono::NaiveDate;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;

    fn car_log_bytes() -> Vec<u8> {
        let mut book = XlsxWorkbook::new();

        let summary = book.add_worksheet();
        summary.set_name("Summary").unwrap();
        summary.write_string(0, 0, "Totals").unwrap();

        let ws = book.add_worksheet();
        ws.set_name("CAR LOG 2025").unwrap();
        ws.write_string(0, 0, "Corrective Action Log").unwrap();
        for (col, h) in [
            "Internal CAR #",
            "Status",
            "Received Date (MM/DD)",
            "Containment Complete?",
            "Proposed Cost",
            "Shoe size",
        ]
        .iter()
        .enumerate()
        {
            ws.write_string(1, col as u16, *h).unwrap();
        }
        ws.write_string(2, 0, "25-001").unwrap();
        ws.write_string(2, 1, "Open").unwrap();
        ws.write_number(2, 2, 45292.0).unwrap();
        ws.write_string(2, 3, "y").unwrap();
        ws.write_string(2, 4, "$1,250.00").unwrap();
        // Only an unmapped column: dropped
        ws.write_string(3, 5, "11").unwrap();
        ws.write_string(4, 1, "Closed").unwrap();
        ws.write_string(4, 2, "2024-03-15").unwrap();

        book.save_to_buffer().unwrap()
    }

    #[test]
    fn test_parse_car_log() {
        let report = parse_workbook_bytes(&car_log_bytes(), "car log");

        assert_eq!(report.sheet_name.as_deref(), Some("CAR LOG 2025"));
        assert_eq!(report.header_row, Some(1));
        assert_eq!(report.confidence, Some(HeaderConfidence::Recognized));
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.source_rows, vec![2, 4]);
        assert!(!report.is_low_confidence());

        let first = &report.rows[0];
        assert_eq!(first.business_key(), Some("25-001"));
        assert_eq!(
            first.get("receivedDate"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
        assert_eq!(first.get("containmentComplete"), Some(&FieldValue::Bool(true)));
        assert_eq!(first.get("proposedCost"), Some(&FieldValue::Number(1250.0)));

        let second = &report.rows[1];
        assert_eq!(second.business_key(), None);
        assert_eq!(
            second.get("receivedDate"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()))
        );

        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnmatchedHeaders(vec!["Shoe size".into()])]
        );
    }

    #[test]
    fn test_parse_is_repeatable() {
        let bytes = car_log_bytes();
        assert_eq!(
            parse_workbook_bytes(&bytes, "car log"),
            parse_workbook_bytes(&bytes, "car log")
        );
    }

    #[test]
    fn test_unreadable_bytes_become_diagnostic() {
        let report = parse_workbook_bytes(b"PK\x03\x04 truncated", "car log");
        assert!(report.rows.is_empty());
        assert!(matches!(
            report.diagnostics.as_slice(),
            [Diagnostic::Parse(ParseError::Unreadable(_))]
        ));
    }

    #[test]
    fn test_empty_sheet_becomes_diagnostic() {
        let mut book = XlsxWorkbook::new();
        let ws = book.add_worksheet();
        ws.set_name("CAR LOG").unwrap();
        ws.write_string(0, 0, "Internal CAR #").unwrap();
        let bytes = book.save_to_buffer().unwrap();

        let report = parse_workbook_bytes(&bytes, "car log");
        assert!(report.rows.is_empty());
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::Parse(ParseError::NoData {
                sheet: "CAR LOG".into()
            })]
        );
    }

    #[test]
    fn test_unrecognized_layout_is_flagged() {
        let mut book = XlsxWorkbook::new();
        let ws = book.add_worksheet();
        ws.set_name("Sheet1").unwrap();
        for row in 0..6u32 {
            ws.write_string(row, 0, format!("widget {}", row)).unwrap();
            ws.write_string(row, 1, format!("colour {}", row)).unwrap();
        }
        let bytes = book.save_to_buffer().unwrap();

        let report = parse_workbook_bytes(&bytes, "car log");
        assert!(report.is_low_confidence());
        assert!(report.mapping.degraded);
        assert!(report
            .diagnostics
            .contains(&Diagnostic::FallbackHeaderRow { row: 3 }));
        assert!(report.diagnostics.contains(&Diagnostic::DegradedMapping));
        // Rows below the guessed header, keyed by raw-derived names
        assert_eq!(report.rows.len(), 2);
        assert_eq!(
            report.rows[0].get("widget3"),
            Some(&FieldValue::Text("widget 4".into()))
        );
    }
}
