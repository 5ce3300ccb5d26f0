//! Typed field values for corrective-action records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A coerced, non-absent field value
///
/// Absence is modelled by the field being missing from its row, never by a
/// sentinel variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Calendar date without time of day
    Date(NaiveDate),
    /// Yes/no flag
    Bool(bool),
    /// Quantity, cost or day count
    Number(f64),
}

impl FieldValue {
    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Bool(b) => write!(f, "{}", if *b { "Y" } else { "N" }),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_shape_is_tagged() {
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"type":"Date","value":"2025-03-07"}"#);

        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Bool(true).to_string(), "Y");
        assert_eq!(FieldValue::Bool(false).to_string(), "N");
        assert_eq!(FieldValue::Number(12.5).to_string(), "12.5");
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()).to_string(),
            "2024-01-02"
        );
    }
}
