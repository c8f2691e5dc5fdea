// src/note.rs
use chrono::NaiveDate;
use serde::Serialize;

use crate::extract::Extraction;
use crate::input::InlineMeta;
use crate::tags;

/// Assumed reading speed for the reading-time estimate.
pub const WORDS_PER_MINUTE: f64 = 225.0;

/// Which acquisition tier produced the note. Decided exactly once per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Success,
    Archived,
    Fallback,
}

impl NoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteStatus::Success => "success",
            NoteStatus::Archived => "archived",
            NoteStatus::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteMeta {
    /// Never empty; falls back to the source URL.
    pub title: String,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
    /// Canonical URL when one was discovered, the request URL otherwise.
    pub source_url: String,
    pub word_count: usize,
    pub reading_time_min: u32,
    /// Unique, lowercase, first-seen order.
    pub tags: Vec<String>,
    pub status: NoteStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub meta: NoteMeta,
    pub content_markdown: String,
}

/// `max(1, round(word_count / 225))` for non-empty content, zero otherwise.
pub fn reading_time_min(word_count: usize) -> u32 {
    if word_count == 0 {
        return 0;
    }
    (word_count as f64 / WORDS_PER_MINUTE).round().max(1.0) as u32
}

impl Note {
    pub fn from_extraction(ex: Extraction, status: NoteStatus) -> Self {
        Note {
            meta: NoteMeta {
                title: ex.title,
                author: ex.author,
                published_date: ex.published_date,
                summary: ex.summary,
                source_url: ex.source_url,
                word_count: ex.word_count,
                reading_time_min: ex.reading_time_min,
                tags: ex.tags,
                status,
            },
            content_markdown: ex.content_markdown,
        }
    }

    /// Placeholder note for a URL neither the live site nor the archive could
    /// serve. Metadata comes from the inline CSV columns; the body points the
    /// reader at the original page. Never errors.
    pub fn fallback(url: &str, inline: &InlineMeta) -> Self {
        let title = inline
            .title
            .clone()
            .unwrap_or_else(|| url.to_string());
        let content_markdown = format!(
            "**CONTENT NOT AVAILABLE**\n\n\
             The original page could not be retrieved automatically.\n\n\
             Visit it manually: [{url}]({url})\n"
        );
        Note {
            meta: NoteMeta {
                title,
                author: None,
                published_date: None,
                summary: inline.description.clone(),
                source_url: url.to_string(),
                word_count: 0,
                reading_time_min: 0,
                tags: tags::normalize(&inline.tags),
                status: NoteStatus::Fallback,
            },
            content_markdown,
        }
    }
}
