// src/bundle.rs
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::outpath;

#[derive(Debug)]
pub struct BundleReport {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// Packs the whole output tree into `notes_<ts>.zip` next to it. Entry names
/// are relative to the output root's parent, so the archive unpacks into a
/// single folder.
pub fn pack_output(out_root: &Path) -> Result<BundleReport> {
    let base = outpath::report_root(out_root);
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    let zip_path = base.join(format!("notes_{ts}.zip"));

    let file = File::create(&zip_path)
        .with_context(|| format!("creating {}", zip_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(out_root).sort_by_file_name() {
        let entry = entry.context("walking the output tree")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(base)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        writer
            .start_file(name, options)
            .with_context(|| format!("adding {} to the bundle", entry.path().display()))?;
        let mut src = File::open(entry.path())
            .with_context(|| format!("opening {}", entry.path().display()))?;
        io::copy(&mut src, &mut writer)
            .with_context(|| format!("bundling {}", entry.path().display()))?;
        entries += 1;
    }

    let file = writer.finish().context("finalizing the bundle")?;
    let bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok(BundleReport {
        path: zip_path,
        entries,
        bytes,
    })
}
