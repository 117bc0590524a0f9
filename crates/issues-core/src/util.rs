//! Timestamp allocation, user id hashing and small helpers.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{IssuesError, Result};

// ============================================================================
// Timestamps
// ============================================================================

/// Strictly increasing UTC timestamp source.
///
/// Two mutations in the same tracker never share a timestamp, so
/// `updated_at` orders mutations even when the wall clock does not advance
/// between them.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next timestamp.
    pub fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last = Some(now);
        now
    }

    /// Make sure future timestamps sort after `seen` (used after loading data).
    pub fn observe(&mut self, seen: DateTime<Utc>) {
        if self.last.is_none_or(|last| seen > last) {
            self.last = Some(seen);
        }
    }
}

/// Render a timestamp the way the GitHub API does (`2011-04-22T13:33:48Z`).
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO 8601 timestamp supplied by a client.
///
/// Accepts full RFC3339 values and bare `YYYY-MM-DD` dates (midnight UTC).
///
/// # Errors
///
/// Returns `Validation` naming `field` if the value is not a timestamp.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            IssuesError::validation(field, format!("'{value}' is not an ISO 8601 timestamp"))
        })
}

// ============================================================================
// Users
// ============================================================================

/// Stable numeric id for a login.
///
/// SHA256 of the login, first 8 bytes big-endian, reduced to seven digits.
#[must_use]
pub fn user_id(login: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(login.as_bytes());
    let result = hasher.finalize();

    let mut num = 0u64;
    for &byte in result.iter().take(8) {
        num = (num << 8) | u64::from(byte);
    }
    num % 10_000_000
}

// ============================================================================
// Name sets
// ============================================================================

/// Normalize a list of names into an ordered set.
///
/// Names are trimmed, blanks dropped, and later duplicates removed while the
/// first occurrence keeps its position. Comparison is case-sensitive.
#[must_use]
pub fn ordered_set<I, T>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() || out.iter().any(|n| n == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}

/// Entries of `new` missing from `old`, and entries of `old` missing from `new`.
#[must_use]
pub fn set_diff<'a>(old: &'a [String], new: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let added = new
        .iter()
        .filter(|n| !old.contains(n))
        .map(String::as_str)
        .collect();
    let removed = old
        .iter()
        .filter(|o| !new.contains(o))
        .map(String::as_str)
        .collect();
    (added, removed)
}
