// src/outpath.rs
//! Output path resolution: `<out_root>/<year>/<month>/<slug>.md` with
//! collision suffixes. Callers write the note right after resolving, which
//! keeps the existence check race-free in the sequential pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_SLUG_CHARS: usize = 200;
const GENERIC_BASENAME: &str = "note";

/// Lowercase, non-alphanumeric runs collapsed to single hyphens, no leading
/// or trailing hyphen.
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Partition directory plus collision-free file name for a note. The
/// partition date is the published date when known, today (UTC) otherwise.
pub fn resolve(out_root: &Path, title: &str, published: Option<NaiveDate>) -> Result<PathBuf> {
    let date = published.unwrap_or_else(|| Utc::now().date_naive());
    let dir = out_root
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()));
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let trimmed: String = title.chars().take(MAX_TITLE_CHARS).collect();
    let slug: String = slugify(&trimmed).chars().take(MAX_SLUG_CHARS).collect();
    let base = slug.trim_end_matches('-');
    let base = if base.is_empty() { GENERIC_BASENAME } else { base };

    let mut path = dir.join(format!("{base}.md"));
    let mut suffix = 2u32;
    while path.exists() {
        path = dir.join(format!("{base}-{suffix}.md"));
        suffix += 1;
    }
    Ok(path)
}

/// Directory that run reports and bundles land in: the output root's parent,
/// falling back to the current directory for bare relative roots.
pub fn report_root(out_root: &Path) -> &Path {
    match out_root.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
