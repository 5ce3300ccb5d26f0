//! Business key (`internalCarNumber`) parsing and allocation helpers

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Record;

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})-(\d{3,})$").expect("business key pattern is valid")
});

/// Two-digit year prefix of a business key, e.g. "25"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyYear(String);

impl KeyYear {
    /// Build from a full or two-digit year (2025 and 25 both give "25")
    pub fn from_year(year: i32) -> Self {
        KeyYear(format!("{:02}", year.rem_euclid(100)))
    }

    /// Year prefix for today in local time
    pub fn current() -> Self {
        Self::from_year(chrono::Local::now().year())
    }

    /// Parse a year prefix given on the command line ("25" or "2025")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        s.parse::<i32>().ok().map(Self::from_year)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A business key in canonical `YY-NNN` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessKey {
    pub year: KeyYear,
    pub sequence: u64,
}

impl BusinessKey {
    pub fn new(year: KeyYear, sequence: u64) -> Self {
        BusinessKey { year, sequence }
    }

    /// Parse a key of the form `YY-NNN`; returns None for anything else
    pub fn parse(s: &str) -> Option<Self> {
        let caps = KEY_PATTERN.captures(s.trim())?;
        let year = KeyYear(caps.get(1)?.as_str().to_string());
        let sequence = caps.get(2)?.as_str().parse().ok()?;
        Some(BusinessKey { year, sequence })
    }
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:03}", self.year, self.sequence)
    }
}

/// Highest sequence number used by `records` for `year`, 0 if none
pub fn max_sequence<'a>(keys: impl IntoIterator<Item = &'a str>, year: &KeyYear) -> u64 {
    keys.into_iter()
        .filter_map(BusinessKey::parse)
        .filter(|k| &k.year == year)
        .map(|k| k.sequence)
        .max()
        .unwrap_or(0)
}

/// Preview the key a new record would receive, given the current records
pub fn next_business_key(records: &[Record], year: &KeyYear) -> BusinessKey {
    let max = max_sequence(records.iter().map(|r| r.business_key.as_str()), year);
    BusinessKey::new(year.clone(), max + 1)
}

/// Sort key placing canonical keys first by (year, sequence), others after by text
pub fn sort_key(key: &str) -> (u8, String, u64, String) {
    match BusinessKey::parse(key) {
        Some(k) => (0, k.year.0, k.sequence, String::new()),
        None => (1, String::new(), 0, key.to_string()),
    }
}
