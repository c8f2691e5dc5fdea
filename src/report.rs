// src/report.rs
//! report.rs — jednoduché účtování výsledků běhu a zápis souhrnných reportů.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::note::NoteStatus;

#[derive(Debug)]
pub struct FallbackEntry {
    pub path: PathBuf,
    pub source_url: String,
}

#[derive(Debug)]
pub struct FailedEntry {
    pub url: String,
    pub reason: String,
}

/// Every record lands in exactly one bucket; the bucket sizes always sum to
/// the number of processed records.
#[derive(Debug, Default)]
pub struct RunTally {
    pub success: Vec<PathBuf>,
    pub archived: Vec<PathBuf>,
    pub fallback: Vec<FallbackEntry>,
    pub failed: Vec<FailedEntry>,
}

impl RunTally {
    pub fn record_note(&mut self, status: NoteStatus, path: PathBuf, source_url: &str) {
        match status {
            NoteStatus::Success => self.success.push(path),
            NoteStatus::Archived => self.archived.push(path),
            NoteStatus::Fallback => self.fallback.push(FallbackEntry {
                path,
                source_url: source_url.to_string(),
            }),
        }
    }

    pub fn record_failure(&mut self, url: &str, reason: String) {
        self.failed.push(FailedEntry {
            url: url.to_string(),
            reason,
        });
    }

    pub fn total(&self) -> usize {
        self.success.len() + self.archived.len() + self.fallback.len() + self.failed.len()
    }

    pub fn notes_written(&self) -> usize {
        self.success.len() + self.archived.len() + self.fallback.len()
    }

    pub fn summary_text(&self) -> String {
        let total = self.total();
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / total as f64
            }
        };
        let mut out = String::new();
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(out, "Run summary");
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(out, "URLs processed:        {total}");
        let _ = writeln!(
            out,
            "Notes written:         {} ({:.1}%)",
            self.notes_written(),
            pct(self.notes_written())
        );
        let _ = writeln!(out, "  - live fetches:      {}", self.success.len());
        let _ = writeln!(out, "  - archive snapshots: {}", self.archived.len());
        let _ = writeln!(out, "  - fallback notes:    {}", self.fallback.len());
        let _ = writeln!(
            out,
            "Failed records:        {} ({:.1}%)",
            self.failed.len(),
            pct(self.failed.len())
        );
        if !self.fallback.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{} note(s) need a manual visit, see the manual-review report.",
                self.fallback.len()
            );
        }
        out
    }

    /// Writes the summary plus, when non-empty, the manual-review and failed
    /// lists. Returns the paths written.
    pub fn write_reports(&self, report_root: &Path) -> Result<Vec<PathBuf>> {
        let ts = Utc::now().format("%Y%m%d_%H%M%S");
        let mut written = Vec::new();

        let summary = report_root.join(format!("_00_summary_{ts}.txt"));
        fs::write(&summary, self.summary_text())
            .with_context(|| format!("writing {}", summary.display()))?;
        written.push(summary);

        if !self.fallback.is_empty() {
            let path = report_root.join(format!("_01_manual_review_{ts}.txt"));
            let mut body = String::from("URLs that ended as fallback notes; visit manually:\n\n");
            for entry in &self.fallback {
                let _ = writeln!(body, "- {}", entry.source_url);
            }
            fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }

        if !self.failed.is_empty() {
            let path = report_root.join(format!("_02_failed_{ts}.txt"));
            let mut body = String::from("Records that failed outright:\n\n");
            for entry in &self.failed {
                let _ = writeln!(body, "- {}: {}", entry.url, entry.reason);
            }
            fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }

        Ok(written)
    }
}
