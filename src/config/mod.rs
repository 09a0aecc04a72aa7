// src/config/mod.rs

//! Configuration loading and validation for seattle-installer.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate URLs, paths and interpreter settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    DownloadSection, InstallSection, InstallerConfig, InterpreterSection, ProxySection,
    RawInstallerConfig,
};
