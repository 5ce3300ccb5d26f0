//! Write records to the CAR LOG export workbook

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::records::{Field, FieldKind, FieldValue, Record, sort_key};

use super::values::{format_bool, format_date};

pub const EXPORT_SHEET_NAME: &str = "CAR LOG";

const CURRENCY_FORMAT: &str = "$#,##0.00";
const HEADER_BACKGROUND: u32 = 0xE0E0E0;

/// Default export file name for `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("CAR LOG - Export - {}.xlsx", format_date(date))
}

/// Records ordered by business key: (year, sequence), non-canonical keys last
pub fn sorted_for_export(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_cached_key(|r| sort_key(&r.business_key));
    sorted
}

/// Render records as xlsx bytes, one row per record in business-key order
pub fn write_records_xlsx(records: &[Record]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    write_header(worksheet)?;

    let currency = Format::new().set_num_format(CURRENCY_FORMAT);
    for (idx, record) in sorted_for_export(records).into_iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, field) in Field::ALL.iter().enumerate() {
            let col = col as u16;
            if *field == Field::InternalCarNumber {
                worksheet.write_string(row, col, &record.business_key)?;
                continue;
            }
            if let Some(value) = record.get(field.name()) {
                write_value(worksheet, row, col, value, field.kind(), &currency)?;
            }
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to render export workbook")
}

/// Render records and save them to `path`
pub fn write_records_file(records: &[Record], path: &Path) -> Result<()> {
    let bytes = write_records_xlsx(records)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;
    Ok(())
}

fn write_header(ws: &mut Worksheet) -> Result<()> {
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_BACKGROUND));

    for (col, field) in Field::ALL.iter().enumerate() {
        let col = col as u16;
        ws.write_string_with_format(0, col, field.label(), &header)?;
        ws.set_column_width(col, field.width())?;
    }
    Ok(())
}

fn write_value(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &FieldValue,
    kind: FieldKind,
    currency: &Format,
) -> Result<()> {
    match value {
        FieldValue::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        FieldValue::Date(d) => {
            ws.write_string(row, col, format_date(*d))?;
        }
        FieldValue::Bool(b) => {
            ws.write_string(row, col, format_bool(Some(*b)))?;
        }
        FieldValue::Number(n) if kind == FieldKind::Currency => {
            ws.write_number_with_format(row, col, *n, currency)?;
        }
        FieldValue::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{RawCell, read_workbook};
    use crate::records::FieldChanges;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_micros(1_700_000_000_000_000).unwrap()
    }

    fn record(key: &str, fields: &[(&str, FieldValue)]) -> Record {
        let changes: FieldChanges = fields
            .iter()
            .map(|(n, v)| (n.to_string(), Some(v.clone())))
            .collect();
        Record::new(key, changes, now())
    }

    fn column(field: Field) -> usize {
        Field::ALL.iter().position(|f| *f == field).unwrap()
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
        assert_eq!(export_file_name(date), "CAR LOG - Export - 2025-02-07.xlsx");
    }

    #[test]
    fn test_export_layout_and_formatting() {
        let records = vec![
            record(
                "25-010",
                &[
                    ("status", FieldValue::Text("Closed".into())),
                    ("costApproved", FieldValue::Bool(false)),
                ],
            ),
            record(
                "25-002",
                &[
                    ("status", FieldValue::Text("Open".into())),
                    (
                        "receivedDate",
                        FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()),
                    ),
                    ("containmentComplete", FieldValue::Bool(true)),
                    ("proposedCost", FieldValue::Number(1250.5)),
                    ("quantity", FieldValue::Number(4.0)),
                ],
            ),
        ];

        let bytes = write_records_xlsx(&records).unwrap();
        let workbook = read_workbook(&bytes).unwrap();
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, EXPORT_SHEET_NAME);

        let text = |s: &str| RawCell::Text(s.to_string());
        assert_eq!(sheet.cell(0, 0), Some(&text("Internal CAR #")));
        assert_eq!(
            sheet.cell(0, column(Field::DaysToClose)),
            Some(&text("# Days to Close"))
        );

        // Sorted by key
        assert_eq!(sheet.cell(1, 0), Some(&text("25-002")));
        assert_eq!(sheet.cell(2, 0), Some(&text("25-010")));

        assert_eq!(sheet.cell(1, column(Field::ReceivedDate)), Some(&text("2025-01-03")));
        assert_eq!(sheet.cell(1, column(Field::ContainmentComplete)), Some(&text("Y")));
        assert_eq!(sheet.cell(2, column(Field::CostApproved)), Some(&text("N")));
        assert_eq!(
            sheet.cell(1, column(Field::ProposedCost)),
            Some(&RawCell::Number(1250.5))
        );
        assert_eq!(sheet.cell(1, column(Field::Quantity)), Some(&RawCell::Number(4.0)));
        // Absent boolean exports blank
        assert!(sheet
            .cell(2, column(Field::ContainmentComplete))
            .is_none_or(RawCell::is_blank));
    }

    #[test]
    fn test_sorted_for_export() {
        let records = vec![
            record("legacy", &[]),
            record("25-1000", &[]),
            record("24-999", &[]),
            record("25-009", &[]),
        ];
        let keys: Vec<&str> = sorted_for_export(&records)
            .into_iter()
            .map(|r| r.business_key.as_str())
            .collect();
        assert_eq!(keys, vec!["24-999", "25-009", "25-1000", "legacy"]);
    }
}
