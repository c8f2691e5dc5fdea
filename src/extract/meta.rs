// src/extract/meta.rs
//! Layered metadata resolvers. Each field walks its sources in a fixed
//! order and short-circuits on the first hit; absence is `None`, never an
//! error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::dates;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

static SEL_LINK: Lazy<Selector> = Lazy::new(|| sel("link[rel]"));
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| sel("title"));
static SEL_LD_JSON: Lazy<Selector> = Lazy::new(|| sel(r#"script[type="application/ld+json"]"#));
static SEL_OG_URL: Lazy<Selector> = Lazy::new(|| sel(r#"meta[property="og:url"]"#));
static SEL_OG_TITLE: Lazy<Selector> = Lazy::new(|| sel(r#"meta[property="og:title"]"#));
static SEL_META_AUTHOR: Lazy<Selector> = Lazy::new(|| sel(r#"meta[name="author"]"#));
static SEL_ARTICLE_AUTHOR: Lazy<Selector> = Lazy::new(|| sel(r#"meta[property="article:author"]"#));
static SEL_PUBLISHED_TIME: Lazy<Selector> =
    Lazy::new(|| sel(r#"meta[property="article:published_time"]"#));
static SEL_META_DATE: Lazy<Selector> = Lazy::new(|| sel(r#"meta[name="date"]"#));
static SEL_DESCRIPTION: Lazy<Selector> = Lazy::new(|| sel(r#"meta[name="description"]"#));
static SEL_OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| sel(r#"meta[property="og:description"]"#));

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFields {
    pub canonical_url: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
}

pub fn resolve_fields(doc: &Html) -> MetaFields {
    let (ld_author, ld_published) = ld_json_fields(doc);

    let author = ld_author
        .or_else(|| meta_content(doc, &SEL_META_AUTHOR))
        .or_else(|| meta_content(doc, &SEL_ARTICLE_AUTHOR))
        .map(|a| RE_WS.replace_all(a.trim(), " ").into_owned())
        .filter(|a| !a.is_empty());

    let published_raw = ld_published
        .or_else(|| meta_content(doc, &SEL_PUBLISHED_TIME))
        .or_else(|| meta_content(doc, &SEL_META_DATE));

    MetaFields {
        canonical_url: canonical_url(doc),
        title: title(doc),
        author,
        published_date: published_raw.as_deref().and_then(dates::parse_flexible),
        summary: meta_content(doc, &SEL_DESCRIPTION)
            .or_else(|| meta_content(doc, &SEL_OG_DESCRIPTION)),
    }
}

/// `og:url` overrides the `rel=canonical` link when both are present.
fn canonical_url(doc: &Html) -> Option<String> {
    let link = doc
        .select(&SEL_LINK)
        .find(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|rel| rel.to_ascii_lowercase().contains("canonical"))
        })
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string);
    meta_content(doc, &SEL_OG_URL).or(link)
}

fn title(doc: &Html) -> Option<String> {
    meta_content(doc, &SEL_OG_TITLE).or_else(|| {
        doc.select(&SEL_TITLE)
            .next()
            .map(|el| el.text().collect::<String>())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// One pass over every JSON-LD block: first usable `author` and first
/// non-empty `datePublished` win. Malformed blocks are skipped.
fn ld_json_fields(doc: &Html) -> (Option<String>, Option<String>) {
    let mut author = None;
    let mut published = None;
    for script in doc.select(&SEL_LD_JSON) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let nodes = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        for node in nodes {
            let Some(obj) = node.as_object() else { continue };
            if author.is_none() {
                author = ld_author_name(obj.get("author"));
            }
            if published.is_none() {
                published = obj
                    .get("datePublished")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            if author.is_some() && published.is_some() {
                return (author, published);
            }
        }
    }
    (author, published)
}

/// Accepts an object with `name`, or the first element of an array of such
/// objects. Anything else (plain strings included) resolves nothing.
fn ld_author_name(value: Option<&Value>) -> Option<String> {
    let name = match value? {
        Value::Object(map) => map.get("name")?.as_str()?,
        Value::Array(items) => items.first()?.as_object()?.get("name")?.as_str()?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
