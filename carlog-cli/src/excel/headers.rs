//! Header normalization and alias mapping to canonical fields

use std::collections::HashMap;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::records::Field;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)").expect("parenthesized pattern is valid"));

/// Normalized header text -> canonical field
///
/// Several spellings found in circulating spreadsheets map to one field.
const HEADER_ALIASES: &[(&str, Field)] = &[
    ("internal car #", Field::InternalCarNumber),
    ("internal car#", Field::InternalCarNumber),
    ("internal car", Field::InternalCarNumber),
    ("location", Field::Location),
    ("location as applicable", Field::Location),
    ("status", Field::Status),
    ("incidence type", Field::IncidenceType),
    ("type", Field::Type),
    ("category", Field::Category),
    ("received date", Field::ReceivedDate),
    ("part number", Field::PartNumber),
    ("part description", Field::PartDescription),
    ("part family", Field::PartFamily),
    ("cust. car #", Field::CustomerCarNumber),
    ("cust car #", Field::CustomerCarNumber),
    ("customer car #", Field::CustomerCarNumber),
    ("reference #'s", Field::CustomerCarNumber),
    ("reference #s", Field::CustomerCarNumber),
    ("stop tag #", Field::StopTagNumber),
    ("audit nc #", Field::AuditNcNumber),
    ("customer", Field::Customer),
    ("komatsu tracking", Field::KomatsuTracking),
    ("work order #", Field::WorkOrderNumber),
    ("manufacture date", Field::ManufactureDate),
    ("quantity", Field::Quantity),
    ("problem description", Field::ProblemDescription),
    ("department responsible", Field::DepartmentResponsible),
    ("defect category", Field::DefectCategory),
    ("champion", Field::Champion),
    ("containment complete?", Field::ContainmentComplete),
    ("containment complete", Field::ContainmentComplete),
    ("corrective action prevention", Field::CorrectiveActionPrevention),
    ("corrective action detection", Field::CorrectiveActionDetection),
    ("proposed cost", Field::ProposedCost),
    ("cost approved?", Field::CostApproved),
    ("cost approved", Field::CostApproved),
    ("initial resp.", Field::InitialResp),
    ("initial resp", Field::InitialResp),
    ("final resp. due date", Field::FinalRespDueDate),
    ("final resp due date", Field::FinalRespDueDate),
    ("completed resp. actual", Field::CompletedRespActual),
    ("completed resp actual", Field::CompletedRespActual),
    ("# days to close", Field::DaysToClose),
    ("days to close", Field::DaysToClose),
    ("closed date", Field::ClosedDate),
    ("employee id", Field::EmployeeId),
    ("rma #", Field::RmaNumber),
    ("rma number", Field::RmaNumber),
    ("contact", Field::FollowUpContact),
    ("follow up items", Field::FollowUpContact),
    ("debit cost", Field::FollowUpDebitCost),
    ("comments", Field::FollowUpComments),
    ("follow up", Field::FollowUpComments),
];

static ALIAS_LOOKUP: Lazy<HashMap<&'static str, Field>> =
    Lazy::new(|| HEADER_ALIASES.iter().copied().collect());

/// Normalize header text for alias lookup
///
/// `"Received Date (MM/DD)\n"` becomes `"received date"`.
pub fn normalize_header(header: &str) -> String {
    let collapsed = WHITESPACE.replace_all(header.trim(), " ");
    let stripped = PARENTHESIZED.replace_all(&collapsed, "");
    WHITESPACE
        .replace_all(stripped.trim(), " ")
        .to_lowercase()
}

/// Canonical field for a raw header, if any alias matches
pub fn lookup_alias(raw_header: &str) -> Option<Field> {
    ALIAS_LOOKUP.get(normalize_header(raw_header).as_str()).copied()
}

/// Best-effort key for an unrecognized header: lowercase alphanumerics only
pub fn fallback_key(raw_header: &str) -> String {
    raw_header
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Result of mapping raw headers onto the schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMapping {
    /// Original raw header -> target field name
    pub fields: HashMap<String, String>,
    /// Headers with no alias, in sheet order
    pub unmatched: Vec<String>,
    /// No header matched; every non-empty header was mapped to its fallback key
    pub degraded: bool,
}

impl HeaderMapping {
    pub fn target(&self, raw_header: &str) -> Option<&str> {
        self.fields.get(raw_header).map(String::as_str)
    }

    pub fn matched_count(&self) -> usize {
        if self.degraded { 0 } else { self.fields.len() }
    }
}

/// Map raw headers to canonical field names
///
/// With zero matches the mapping degrades to fallback keys instead of
/// refusing the import; callers surface `degraded` as a diagnostic.
pub fn build_header_map(raw_headers: &[String]) -> HeaderMapping {
    let mut mapping = HeaderMapping::default();

    for header in raw_headers {
        match lookup_alias(header) {
            Some(field) => {
                debug!("Matched header '{}' -> '{}'", header, field.name());
                mapping.fields.insert(header.clone(), field.name().to_string());
            }
            None => mapping.unmatched.push(header.clone()),
        }
    }

    if !mapping.unmatched.is_empty() {
        debug!(
            "Unmatched headers: {:?}",
            mapping.unmatched.iter().take(10).collect::<Vec<_>>()
        );
    }

    if mapping.fields.is_empty() {
        warn!("No headers matched the schema, importing with raw header keys");
        mapping.degraded = true;
        for header in raw_headers {
            if header.trim().is_empty() {
                continue;
            }
            let key = fallback_key(header);
            if !key.is_empty() {
                mapping.fields.insert(header.clone(), key);
            }
        }
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Received Date  \n"), "received date");
        assert_eq!(normalize_header("received date"), "received date");
        assert_eq!(normalize_header("Received Date (MM/DD)"), "received date");
        assert_eq!(normalize_header("  Final Resp.\r\nDue   Date "), "final resp. due date");
        assert_eq!(normalize_header("Foo (bar) Baz"), "foo baz");
    }

    #[test]
    fn test_received_date_variants_map_to_same_field() {
        for raw in ["Received Date  \n", "received date", "Received Date (MM/DD)"] {
            assert_eq!(lookup_alias(raw), Some(Field::ReceivedDate), "{raw:?}");
        }
    }

    #[test]
    fn test_many_to_one_aliases() {
        for raw in ["Internal CAR #", "Internal CAR#", "internal car"] {
            assert_eq!(lookup_alias(raw), Some(Field::InternalCarNumber));
        }
        assert_eq!(lookup_alias("Follow Up"), Some(Field::FollowUpComments));
        assert_eq!(lookup_alias("Containment Complete?"), Some(Field::ContainmentComplete));
    }

    #[test]
    fn test_build_header_map_keeps_raw_keys_and_unmatched() {
        let raw = headers(&["Internal CAR #", "Status (Open/Closed)", "Shoe size"]);
        let mapping = build_header_map(&raw);

        assert!(!mapping.degraded);
        assert_eq!(mapping.target("Internal CAR #"), Some("internalCarNumber"));
        assert_eq!(mapping.target("Status (Open/Closed)"), Some("status"));
        assert_eq!(mapping.unmatched, vec!["Shoe size".to_string()]);
        assert_eq!(mapping.matched_count(), 2);
    }

    #[test]
    fn test_build_header_map_degrades_when_nothing_matches() {
        let raw = headers(&["Widget ID", "Colour!", "  "]);
        let mapping = build_header_map(&raw);

        assert!(mapping.degraded);
        assert_eq!(mapping.matched_count(), 0);
        assert_eq!(mapping.target("Widget ID"), Some("widgetid"));
        assert_eq!(mapping.target("Colour!"), Some("colour"));
        assert_eq!(mapping.target("  "), None);
        assert_eq!(mapping.unmatched.len(), 3);
    }
}
