//! Manual record entry

use anyhow::{Result, bail};
use log::info;

use crate::excel::RawCell;
use crate::excel::values::coerce;
use crate::records::{Field, FieldChanges, KeyYear, Record};

use super::store::RecordStore;

/// Parse `field=value` assignments into typed changes
///
/// Field names are canonical (`receivedDate`) or an export label
/// (`Received Date`). Values are coerced like spreadsheet text; an empty
/// value clears nothing and is skipped.
pub fn parse_assignments(assignments: &[String]) -> Result<FieldChanges> {
    let mut changes = FieldChanges::new();

    for assignment in assignments {
        let Some((name, value)) = assignment.split_once('=') else {
            bail!("Expected field=value, got '{}'", assignment);
        };

        let field = resolve_field(name.trim())?;
        if field == Field::InternalCarNumber {
            bail!("Internal CAR # is assigned automatically");
        }

        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match coerce(&RawCell::Text(value.to_string()), field.kind()) {
            Some(typed) => {
                changes.insert(field.name().to_string(), Some(typed));
            }
            None => bail!("'{}' is not a valid value for {}", value, field.label()),
        }
    }

    Ok(changes)
}

fn resolve_field(name: &str) -> Result<Field> {
    Field::from_name(name)
        .or_else(|| {
            Field::ALL
                .iter()
                .copied()
                .find(|f| f.label().eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| anyhow::anyhow!("Unknown field '{}'", name))
}

/// Create a record with the next business key for `year`
pub async fn add_record(store: &dyn RecordStore, year: &KeyYear, fields: FieldChanges) -> Result<Record> {
    let record = store.create_with_generated_key(year, fields).await?;
    info!("Created record {}", record.business_key);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FieldValue;
    use crate::services::store::MemoryRecordStore;
    use chrono::NaiveDate;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_assignments() {
        let changes = parse_assignments(&args(&[
            "status=Open",
            "Received Date=2025-01-03",
            "costApproved=yes",
            "proposedCost=$1,200",
            "champion=",
        ]))
        .unwrap();

        assert_eq!(changes.len(), 4);
        assert_eq!(changes["status"], Some(FieldValue::Text("Open".into())));
        assert_eq!(
            changes["receivedDate"],
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()))
        );
        assert_eq!(changes["costApproved"], Some(FieldValue::Bool(true)));
        assert_eq!(changes["proposedCost"], Some(FieldValue::Number(1200.0)));
    }

    #[test]
    fn test_parse_assignments_rejects_bad_input() {
        assert!(parse_assignments(&args(&["status"])).is_err());
        assert!(parse_assignments(&args(&["shoeSize=11"])).is_err());
        assert!(parse_assignments(&args(&["receivedDate=someday"])).is_err());
        assert!(parse_assignments(&args(&["internalCarNumber=25-001"])).is_err());
    }

    #[tokio::test]
    async fn test_add_record_allocates_key() {
        let store = MemoryRecordStore::new();
        store.insert("25-041", FieldChanges::new()).await.unwrap();

        let fields = parse_assignments(&args(&["status=Open"])).unwrap();
        let record = add_record(&store, &KeyYear::from_year(2025), fields)
            .await
            .unwrap();
        assert_eq!(record.business_key, "25-042");
        assert_eq!(record.get("status"), Some(&FieldValue::Text("Open".into())));
    }
}
