// src/extract/content.rs
//! # Article Extraction
//! Readability-style scoring: text blocks feed points to their parents,
//! candidates start from tag and class/id biases, and the winner is the
//! top score scaled down by link density. The winning fragment is then
//! converted to Markdown.

use std::collections::HashMap;

use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Blocks shorter than this contribute nothing.
const MIN_BLOCK_CHARS: usize = 25;
/// Cap on the per-block length bonus (one point per 100 chars).
const MAX_LENGTH_BONUS: usize = 3;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

static SEL_BLOCKS: Lazy<Selector> = Lazy::new(|| sel("p, td, pre, blockquote"));
static SEL_ANY: Lazy<Selector> = Lazy::new(|| sel("*"));
static SEL_BODY: Lazy<Selector> = Lazy::new(|| sel("body"));
static SEL_ANCHOR: Lazy<Selector> = Lazy::new(|| sel("a"));

static RE_POSITIVE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|text|blog|story")
        .expect("positive hint pattern")
});
static RE_NEGATIVE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)combx|comment|contact|foot|masthead|media|meta|nav|menu|outbrain|promo|related|scroll|share|shoutbox|sidebar|sponsor|shopping|tags|tool|widget|banner|breadcrumb",
    )
    .expect("negative hint pattern")
});
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern"));

/// Markdown for the readable part of the document. Falls back to the whole
/// `<body>` when nothing scores, and to plain text when conversion fails.
pub fn extract_markdown(doc: &Html, raw_html: &str) -> String {
    let fragment = article_fragment(doc)
        .or_else(|| doc.select(&SEL_BODY).next().map(|body| body.inner_html()))
        .unwrap_or_else(|| raw_html.to_string());
    match to_markdown(&fragment) {
        Some(markdown) => markdown,
        None => {
            let parsed = Html::parse_fragment(&fragment);
            let text: Vec<_> = parsed.root_element().text().collect();
            text.join(" ").trim().to_string()
        }
    }
}

pub fn word_count(markdown: &str) -> usize {
    RE_WORD.find_iter(markdown).count()
}

/// Outer HTML of the best-scoring candidate, if any block scored at all.
fn article_fragment(doc: &Html) -> Option<String> {
    let mut scores = HashMap::new();

    for block in doc.select(&SEL_BLOCKS) {
        let joined: String = block.text().collect();
        let text = joined.trim();
        if text.chars().count() < MIN_BLOCK_CHARS {
            continue;
        }
        let commas = text.matches(',').count();
        let length_bonus = (text.chars().count() / 100).min(MAX_LENGTH_BONUS);
        let points = 1.0 + commas as f32 + length_bonus as f32;

        if let Some(parent) = block.parent().and_then(ElementRef::wrap) {
            *scores
                .entry(parent.id())
                .or_insert_with(|| base_score(&parent)) += points;
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                *scores
                    .entry(grandparent.id())
                    .or_insert_with(|| base_score(&grandparent)) += points / 2.0;
            }
        }
    }

    if scores.is_empty() {
        return None;
    }

    // Walk in document order so equal scores resolve deterministically.
    let mut best_score = f32::MIN;
    let mut best_html = None;
    for el in doc.select(&SEL_ANY) {
        let Some(&raw) = scores.get(&el.id()) else {
            continue;
        };
        let adjusted = raw * (1.0 - link_density(&el));
        if adjusted > best_score {
            best_score = adjusted;
            best_html = Some(el.html());
        }
    }
    best_html
}

fn base_score(el: &ElementRef) -> f32 {
    tag_score(el.value().name()) + hint_weight(el)
}

fn tag_score(tag: &str) -> f32 {
    match tag {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

fn hint_weight(el: &ElementRef) -> f32 {
    let hints = format!(
        "{} {}",
        el.value().attr("class").unwrap_or_default(),
        el.value().attr("id").unwrap_or_default()
    );
    let mut weight = 0.0;
    if RE_NEGATIVE_HINT.is_match(&hints) {
        weight -= 25.0;
    }
    if RE_POSITIVE_HINT.is_match(&hints) {
        weight += 25.0;
    }
    weight
}

/// Share of the element's text living inside anchors, 0.0 to 1.0.
fn link_density(el: &ElementRef) -> f32 {
    let total: usize = el.text().map(str::len).sum();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = el
        .select(&SEL_ANCHOR)
        .map(|a| a.text().map(str::len).sum::<usize>())
        .sum();
    (linked as f32 / total as f32).min(1.0)
}

fn to_markdown(fragment: &str) -> Option<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "img", "iframe"])
        .build();
    converter
        .convert(fragment)
        .ok()
        .map(|markdown| markdown.trim().to_string())
}
