// src/config/validate.rs

use url::Url;

use crate::config::model::{InstallerConfig, RawInstallerConfig, TOKEN_PLACEHOLDER};
use crate::errors::{InstallerError, Result};

impl TryFrom<RawInstallerConfig> for InstallerConfig {
    type Error = crate::errors::InstallerError;

    fn try_from(raw: RawInstallerConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(InstallerConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawInstallerConfig) -> Result<()> {
    validate_install(cfg)?;
    validate_download(cfg)?;
    validate_interpreter(cfg)?;
    validate_proxy(cfg)?;
    Ok(())
}

fn validate_install(cfg: &RawInstallerConfig) -> Result<()> {
    if cfg.install.root.as_os_str().is_empty() {
        return Err(InstallerError::ConfigError(
            "[install].root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_download(cfg: &RawInstallerConfig) -> Result<()> {
    let download = &cfg.download;

    if download.fallback_token.trim().is_empty() {
        return Err(InstallerError::ConfigError(
            "[download].fallback_token must not be empty".to_string(),
        ));
    }

    if !download.url_template.contains(TOKEN_PLACEHOLDER) {
        return Err(InstallerError::ConfigError(format!(
            "[download].url_template must contain the {TOKEN_PLACEHOLDER} placeholder (got '{}')",
            download.url_template
        )));
    }

    let sample = download
        .url_template
        .replace(TOKEN_PLACEHOLDER, &download.fallback_token);
    Url::parse(&sample).map_err(|e| {
        InstallerError::ConfigError(format!(
            "[download].url_template is not a valid URL ('{sample}'): {e}"
        ))
    })?;

    Ok(())
}

fn validate_interpreter(cfg: &RawInstallerConfig) -> Result<()> {
    if cfg.interpreter.binary.as_os_str().is_empty() {
        return Err(InstallerError::ConfigError(
            "[interpreter].binary must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_proxy(cfg: &RawInstallerConfig) -> Result<()> {
    if cfg.proxy.host.trim().is_empty() {
        return Err(InstallerError::ConfigError(
            "[proxy].host must not be empty".to_string(),
        ));
    }
    Ok(())
}
