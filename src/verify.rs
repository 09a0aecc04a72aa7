// src/verify.rs

//! Completion detection and install-tree inspection.
//!
//! The installer script appends progress lines to `installInfo.new` (older
//! runs rotate to `installInfo.old`). The install counts as successful iff
//! the last non-empty line of the preferred file contains
//! [`SUCCESS_MARKER`].

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::layout::InstallLayout;

pub const SUCCESS_MARKER: &str = "seattle completed installation";

/// Candidate log files, most preferred first.
pub const COMPLETION_LOGS: [&str; 2] = ["installInfo.new", "installInfo.old"];

/// Pick the log file the detector should read, if any exists.
pub fn completion_log(fs: &dyn FileSystem, log_dir: &Path) -> Option<PathBuf> {
    COMPLETION_LOGS
        .iter()
        .map(|name| log_dir.join(name))
        .find(|path| fs.is_file(path))
}

/// Return the last line of `contents` that is not blank.
pub fn last_non_empty_line(contents: &str) -> Option<&str> {
    contents.lines().rev().find(|line| !line.trim().is_empty())
}

/// Classify the outcome of an install run from its persisted log.
///
/// Missing or unreadable logs count as failure; read errors are logged and
/// never propagated.
pub fn verify(fs: &dyn FileSystem, log_dir: &Path) -> bool {
    let Some(log) = completion_log(fs, log_dir) else {
        debug!(log_dir = %log_dir.display(), "no completion log present");
        return false;
    };

    let bytes = match read_log(fs, &log) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(log = %log.display(), error = %err, "failed to read completion log");
            return false;
        }
    };
    // Earlier lines may carry bytes in any encoding; only the marker matters.
    let contents = String::from_utf8_lossy(&bytes);

    let completed = last_non_empty_line(&contents)
        .map(|line| line.contains(SUCCESS_MARKER))
        .unwrap_or(false);

    debug!(log = %log.display(), completed, "inspected completion log");
    completed
}

fn read_log(fs: &dyn FileSystem, path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut reader = fs.open_read(path)?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("reading file {:?}", path))?;
    Ok(bytes)
}

/// True when the node manager entry point exists in the install tree.
pub fn is_installed(fs: &dyn FileSystem, layout: &InstallLayout) -> bool {
    fs.is_file(&layout.main_artifact())
}

/// Log files worth showing to a user diagnosing an install.
///
/// - rotated install logs (`*.new` / `*.old`) in the repy directory
/// - `log.*` files inside vessel directories (`v1/`, `v2/`, ...)
///
/// The result is sorted by path. A missing repy directory yields an empty
/// list.
pub fn list_logs(fs: &dyn FileSystem, layout: &InstallLayout) -> Vec<PathBuf> {
    let repy_dir = layout.repy_dir();
    let entries = match fs.read_dir(&repy_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %repy_dir.display(), error = %err, "no log directory to list");
            return Vec::new();
        }
    };

    let mut logs = Vec::new();
    for entry in entries {
        if fs.is_file(&entry) && is_rotated_log(&entry) {
            logs.push(entry);
        } else if fs.is_dir(&entry) && is_vessel_dir(&entry) {
            match fs.read_dir(&entry) {
                Ok(vessel_entries) => logs.extend(
                    vessel_entries
                        .into_iter()
                        .filter(|p| fs.is_file(p) && is_vessel_log(p)),
                ),
                Err(err) => {
                    warn!(dir = %entry.display(), error = %err, "skipping unreadable vessel dir")
                }
            }
        }
    }

    logs.sort();
    logs
}

fn is_rotated_log(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("new") | Some("old")
    )
}

fn is_vessel_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix('v'))
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn is_vessel_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("log."))
        .unwrap_or(false)
}
