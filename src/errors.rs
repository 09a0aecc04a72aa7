// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("No such script to launch: {0}")]
    LaunchPrecondition(PathBuf),

    #[error("An installation is already in progress")]
    AlreadyInstalling,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InstallerError {
    pub(crate) fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        InstallerError::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, InstallerError>;
