// src/render.rs
//! # Note Rendering
//! Notes are rendered through a Jinja-style template: the built-in layout
//! below by default, a user-supplied file via `--template`. The context
//! always carries every field (absent optionals as empty strings), so no
//! template can fail on a missing value.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use minijinja::Environment;
use serde::Serialize;

use crate::note::Note;

pub const DEFAULT_TEMPLATE: &str = r#"---
title: "{{ meta.title }}"
source: "{{ meta.source_url }}"
author: {{ meta.author_wikilinks | tojson }}
published: {{ meta.published | tojson }}
created: {{ meta.created | tojson }}
description: {{ meta.description | tojson }}
{%- if meta.tags %}
tags: [{% for tag in meta.tags %}"{{ tag }}"{% if not loop.last %}, {% endif %}{% endfor %}]
{%- endif %}
---

# {{ meta.title }}

> TL;DR
> {{ meta.summary }}

## Notes

{{ content_md }}

## Links

- {{ meta.source_url }}
"#;

#[derive(Debug, Serialize)]
struct MetaContext {
    title: String,
    source_url: String,
    author: String,
    author_wikilinks: String,
    published: String,
    created: String,
    description: String,
    summary: String,
    tags: Vec<String>,
    word_count: usize,
    reading_time_min: u32,
    status: String,
}

#[derive(Debug, Serialize)]
struct NoteContext {
    meta: MetaContext,
    content_md: String,
}

/// `"A; B"` → `"[[A]], [[B]]"`. Splits on commas and semicolons.
pub fn author_wikilinks(author: &str) -> String {
    author
        .split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| format!("[[{part}]]"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a note with the default or a user template. `created` is the run
/// date; it is injected by the caller so rendering stays deterministic.
pub fn render_note(note: &Note, template: Option<&str>, created: NaiveDate) -> Result<String> {
    let meta = &note.meta;
    let ctx = NoteContext {
        meta: MetaContext {
            title: meta.title.clone(),
            source_url: meta.source_url.clone(),
            author: meta.author.clone().unwrap_or_default(),
            author_wikilinks: meta
                .author
                .as_deref()
                .map(author_wikilinks)
                .unwrap_or_default(),
            published: meta
                .published_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            created: created.to_string(),
            description: meta.summary.clone().unwrap_or_default(),
            summary: meta.summary.clone().unwrap_or_default(),
            tags: meta.tags.clone(),
            word_count: meta.word_count,
            reading_time_min: meta.reading_time_min,
            status: meta.status.as_str().to_string(),
        },
        content_md: note.content_markdown.clone(),
    };
    Environment::new()
        .render_str(template.unwrap_or(DEFAULT_TEMPLATE), &ctx)
        .context("rendering the note template")
}
