// src/dates.rs
//! Permissive published-date parsing. Metadata in the wild carries RFC 3339,
//! RFC 2822, bare ISO dates and a handful of textual formats; resolvers are
//! tried in order and the first hit wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d.%m.%Y",
];

/// Best-effort calendar date from a raw metadata string. `None` when nothing
/// matches; callers treat that as "no published date".
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc2822) {
        return NaiveDate::from_ymd_opt(t.year(), t.month() as u32, t.day() as u32);
    }
    // chrono tolerates the obsolete zone names (GMT, UT) time rejects.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    for pat in DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pat) {
            return Some(dt.date());
        }
    }
    for pat in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(s, pat) {
            return Some(d);
        }
    }
    None
}
