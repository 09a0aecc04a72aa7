// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{InstallerConfig, RawInstallerConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawInstallerConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawInstallerConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawInstallerConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks the download template, fallback token, interpreter and proxy
///   settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<InstallerConfig> {
    let raw_config = load_from_path(&path)?;
    let config = InstallerConfig::try_from(raw_config)?;
    Ok(config)
}

/// Load the given config file, or validate the built-in defaults when no
/// path was supplied.
pub fn load_or_default(path: Option<&Path>) -> Result<InstallerConfig> {
    match path {
        Some(path) => load_and_validate(path),
        None => InstallerConfig::try_from(RawInstallerConfig::default()),
    }
}
