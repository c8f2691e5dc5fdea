// src/input.rs
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use serde_json::Value;

use crate::tags;

/// Delimiters the sniffer considers, in preference order on ties.
const DELIMITER_CANDIDATES: &[u8] = b",;\t|:";

/// Optional per-row metadata carried next to the URL. Used verbatim when the
/// page itself yields nothing (fallback notes) and merged into the tag set
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub url: String,
    /// Explicit tags from the `tags` column, already normalized.
    pub tags: Vec<String>,
    pub inline: InlineMeta,
}

pub fn read_records(path: &Path) -> Result<Vec<SourceRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_records(raw: &str) -> Result<Vec<SourceRecord>> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let delimiter = sniff_delimiter(raw);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader.headers().context("reading the CSV header")?.clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let url_col = col("url").ok_or_else(|| anyhow!("the CSV has no 'url' column"))?;
    let tags_col = col("tags");
    let title_col = col("title");
    let description_col = col("description");

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.context("reading a CSV row")?;
        let url = row.get(url_col).map(str::trim).unwrap_or_default();
        if url.is_empty() {
            // +2: rows are 1-based and the header is line 1
            tracing::warn!(line = idx + 2, "skipping a row with no URL");
            continue;
        }
        let raw_tags = tags_col
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or_default();
        let parsed_tags = parse_tag_cell(raw_tags);
        records.push(SourceRecord {
            url: url.to_string(),
            tags: tags::normalize(&parsed_tags),
            inline: InlineMeta {
                title: non_empty(title_col.and_then(|i| row.get(i))),
                description: non_empty(description_col.and_then(|i| row.get(i))),
                tags: parsed_tags,
            },
        });
    }
    Ok(records)
}

/// Picks the candidate with the most occurrences in the header line; comma
/// when nothing scores.
fn sniff_delimiter(raw: &str) -> u8 {
    let header = raw
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let mut best = (b',', 0usize);
    for &candidate in DELIMITER_CANDIDATES {
        let count = header.matches(candidate as char).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// A tag cell is either a JSON array literal or a delimiter-separated list.
fn parse_tag_cell(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Vec::new();
    }
    if cell.starts_with('[') && cell.ends_with(']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(cell) {
            return items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
    cell.split([',', ';', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
