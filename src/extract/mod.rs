// src/extract/mod.rs
pub mod content;
pub mod meta;

use chrono::NaiveDate;
use scraper::Html;

use crate::note;

/// Everything the page itself yields: resolved metadata plus the readable
/// body as Markdown. Word statistics are derived from the Markdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub title: String,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub source_url: String,
    pub tags: Vec<String>,
    pub content_markdown: String,
    pub word_count: usize,
    pub reading_time_min: u32,
}

/// Pure: same HTML and URL in, same `Extraction` out. Never fails; every
/// field degrades on its own (a missing title falls back to the URL, an
/// unconvertible body to plain text).
pub fn extract(html: &str, url: &str) -> Extraction {
    let doc = Html::parse_document(html);
    let fields = meta::resolve_fields(&doc);
    let content_markdown = content::extract_markdown(&doc, html);
    let word_count = content::word_count(&content_markdown);

    Extraction {
        title: fields.title.unwrap_or_else(|| url.to_string()),
        author: fields.author,
        published_date: fields.published_date,
        summary: fields.summary,
        source_url: fields.canonical_url.unwrap_or_else(|| url.to_string()),
        tags: Vec::new(),
        content_markdown,
        word_count,
        reading_time_min: note::reading_time_min(word_count),
    }
}
