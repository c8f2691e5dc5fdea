// src/tags.rs
use std::collections::HashSet;

/// Trim entries, drop empties, dedupe by case-folded key.
/// First-seen order (and first-seen spelling) wins.
pub fn normalize(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in tags {
        let tag = raw.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Union of page-extracted, explicit per-record and inline-metadata tags,
/// concatenated in that order. The stored set is lowercase.
pub fn merge(extracted: &[String], explicit: &[String], inline: &[String]) -> Vec<String> {
    let lowered: Vec<String> = extracted
        .iter()
        .chain(explicit)
        .chain(inline)
        .map(|t| t.trim().to_lowercase())
        .collect();
    normalize(&lowered)
}
