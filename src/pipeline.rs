// src/pipeline.rs
//! # Run Pipeline
//! Drives each source record through the acquisition tiers and writes the
//! resulting note. One record's failure never stops the run; it is tallied
//! and the loop moves on.
//!
//! Tiers: live fetch → archive snapshot (on 403) → placeholder note. The
//! tier decides the note's status exactly once.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::archive;
use crate::config::RunConfig;
use crate::extract;
use crate::fetch::{PageClient, Transport};
use crate::input::SourceRecord;
use crate::note::{Note, NoteStatus};
use crate::outpath;
use crate::render;
use crate::report::RunTally;
use crate::tags;

/// Title budget for the one retry after a filesystem refusal (usually a
/// too-long file name).
pub const RETRY_TITLE_CHARS: usize = 50;

pub struct Pipeline {
    client: PageClient,
    transport: Arc<dyn Transport>,
    cfg: RunConfig,
    template: Option<String>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, cfg: RunConfig, template: Option<String>) -> Self {
        let client = PageClient::new(Arc::clone(&transport), cfg.timeout);
        Self {
            client,
            transport,
            cfg,
            template,
        }
    }

    /// Optional builder for tests/tools.
    pub fn with_page_client(mut self, client: PageClient) -> Self {
        self.client = client;
        self
    }

    pub async fn run(&self, records: &[SourceRecord]) -> RunTally {
        let mut tally = RunTally::default();
        let total = records.len();
        for (idx, record) in records.iter().enumerate() {
            info!(url = %record.url, "processing {}/{}", idx + 1, total);
            match self.process_record(record).await {
                Ok((path, status)) => {
                    info!(path = %path.display(), status = status.as_str(), "note written");
                    tally.record_note(status, path, &record.url);
                }
                Err(e) => {
                    warn!(url = %record.url, error = ?e, "record failed");
                    tally.record_failure(&record.url, format!("{e:#}"));
                }
            }
            if idx + 1 < total && !self.cfg.sleep.is_zero() {
                tokio::time::sleep(self.cfg.sleep).await;
            }
        }
        tally
    }

    async fn process_record(&self, record: &SourceRecord) -> Result<(PathBuf, NoteStatus)> {
        // 1) acquire through the tiers
        let mut note = self.acquire(record).await;
        // 2) merge tag sources (page, explicit column, inline metadata)
        note.meta.tags = tags::merge(&note.meta.tags, &record.tags, &record.inline.tags);
        // 3) render and write
        let rendered = render::render_note(&note, self.template.as_deref(), Utc::now().date_naive())?;
        let path = self.write_note(&note, &rendered)?;
        Ok((path, note.meta.status))
    }

    async fn acquire(&self, record: &SourceRecord) -> Note {
        match self.client.fetch(&record.url).await {
            Ok(page) => {
                // metadata fallbacks resolve against where redirects landed
                let extraction = extract::extract(&page.body, &page.final_url);
                Note::from_extraction(extraction, NoteStatus::Success)
            }
            Err(e) if e.is_access_denied() => {
                info!(url = %record.url, "access denied, trying the archive");
                match archive::snapshot(self.transport.as_ref(), &record.url).await {
                    Some(snap) => {
                        // extraction runs on the snapshot body, but the note
                        // keeps pointing at the original URL
                        let mut extraction = extract::extract(&snap.body, &record.url);
                        extraction.source_url = record.url.clone();
                        Note::from_extraction(extraction, NoteStatus::Archived)
                    }
                    None => {
                        warn!(url = %record.url, "no archived snapshot, writing a fallback note");
                        Note::fallback(&record.url, &record.inline)
                    }
                }
            }
            Err(e) => {
                warn!(url = %record.url, error = %e, "fetch failed, writing a fallback note");
                Note::fallback(&record.url, &record.inline)
            }
        }
    }

    /// Writes the rendered note, retrying once with a shortened title when
    /// the filesystem refuses the name.
    fn write_note(&self, note: &Note, rendered: &str) -> Result<PathBuf> {
        let meta = &note.meta;
        let path = outpath::resolve(&self.cfg.out_root, &meta.title, meta.published_date)?;
        match fs::write(&path, rendered) {
            Ok(()) => Ok(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "write failed, retrying with a shorter name");
                let short: String = meta.title.chars().take(RETRY_TITLE_CHARS).collect();
                let retry = outpath::resolve(&self.cfg.out_root, &short, meta.published_date)?;
                fs::write(&retry, rendered)
                    .with_context(|| format!("writing the note to {}", retry.display()))?;
                Ok(retry)
            }
        }
    }
}
