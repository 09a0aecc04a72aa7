// src/extract/mod.rs

//! ZIP extraction into the install root.
//!
//! Failing to open the archive aborts the whole operation. Failures on a
//! single entry (bad header, unsafe path, read/write error) are logged,
//! recorded in the [`ExtractionReport`] and extraction carries on with the
//! next entry. Nothing is rolled back.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::errors::{InstallerError, Result};

/// Copy buffer used per entry.
pub const EXTRACT_BUFFER_SIZE: usize = 8192;

/// An entry that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub name: String,
    pub reason: String,
}

/// What an extraction run actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Files written, as destination paths.
    pub files: Vec<PathBuf>,
    /// Directories created from explicit directory entries.
    pub directories: Vec<PathBuf>,
    pub failed: Vec<FailedEntry>,
}

impl ExtractionReport {
    /// True when every entry was extracted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Extract `archive` into `destination`, creating it if needed.
pub fn extract_zip(archive: &Path, destination: &Path) -> Result<ExtractionReport> {
    let file = File::open(archive).map_err(|e| {
        InstallerError::Extraction(format!("opening archive {}: {e}", archive.display()))
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| {
        InstallerError::Extraction(format!("reading archive {}: {e}", archive.display()))
    })?;

    fs::create_dir_all(destination)?;

    info!(
        archive = %archive.display(),
        destination = %destination.display(),
        entries = zip.len(),
        "extracting archive"
    );

    let mut report = ExtractionReport::default();
    let mut buffer = vec![0u8; EXTRACT_BUFFER_SIZE];

    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                record_failure(&mut report, format!("#{index}"), e.to_string());
                continue;
            }
        };

        let name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name() else {
            record_failure(&mut report, name, "entry path escapes the destination".to_string());
            continue;
        };
        let out_path = destination.join(relative);

        if entry.is_dir() {
            match fs::create_dir_all(&out_path) {
                Ok(()) => report.directories.push(out_path),
                Err(e) => record_failure(&mut report, name, e.to_string()),
            }
            continue;
        }

        debug!(entry = %name, "extracting file");
        let unix_mode = entry.unix_mode();
        match copy_entry(&mut entry, &out_path, &mut buffer) {
            Ok(()) => {
                apply_permissions(&out_path, unix_mode);
                report.files.push(out_path);
            }
            Err(e) => record_failure(&mut report, name, format!("{e:#}")),
        }
    }

    info!(
        files = report.files.len(),
        directories = report.directories.len(),
        failed = report.failed.len(),
        "extraction finished"
    );
    Ok(report)
}

/// Run [`extract_zip`] on the blocking thread pool.
pub async fn extract_zip_in_background(
    archive: PathBuf,
    destination: PathBuf,
) -> Result<ExtractionReport> {
    tokio::task::spawn_blocking(move || extract_zip(&archive, &destination))
        .await
        .context("extraction worker panicked")?
}

fn copy_entry(entry: &mut impl Read, out_path: &Path, buffer: &mut [u8]) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }

    let file = File::create(out_path).with_context(|| format!("creating file {:?}", out_path))?;
    let mut writer = BufWriter::with_capacity(buffer.len(), file);

    loop {
        let read = entry.read(buffer).context("reading archive entry")?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..read])
            .with_context(|| format!("writing to file {:?}", out_path))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing file {:?}", out_path))?;
    Ok(())
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)) {
            warn!(path = %path.display(), error = %e, "failed to apply entry permissions");
        }
    }
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: Option<u32>) {}

fn record_failure(report: &mut ExtractionReport, name: String, reason: String) {
    warn!(entry = %name, %reason, "failed to extract archive entry; continuing");
    report.failed.push(FailedEntry { name, reason });
}
