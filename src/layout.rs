// src/layout.rs

//! Fixed paths inside the install root.
//!
//! The archive unpacks to `<root>/seattle/seattle_repy/...`; every other
//! component locates its files through [`InstallLayout`] rather than joining
//! path fragments itself.

use std::path::{Path, PathBuf};

pub const ARCHIVE_FILE_NAME: &str = "seattle.zip";
pub const SEATTLE_DIR: &str = "seattle";
pub const REPY_DIR: &str = "seattle_repy";
pub const INSTALLER_SCRIPT: &str = "seattleinstaller.py";
pub const MAIN_ARTIFACT: &str = "nmmain.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the downloaded archive is stored until extraction finishes.
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_FILE_NAME)
    }

    pub fn seattle_dir(&self) -> PathBuf {
        self.root.join(SEATTLE_DIR)
    }

    /// Directory holding the node manager, the installer and its logs.
    pub fn repy_dir(&self) -> PathBuf {
        self.seattle_dir().join(REPY_DIR)
    }

    pub fn installer_script(&self) -> PathBuf {
        self.repy_dir().join(INSTALLER_SCRIPT)
    }

    /// File whose presence means "installed".
    pub fn main_artifact(&self) -> PathBuf {
        self.repy_dir().join(MAIN_ARTIFACT)
    }

    /// Directory the completion detector inspects.
    pub fn log_dir(&self) -> PathBuf {
        self.repy_dir()
    }
}
