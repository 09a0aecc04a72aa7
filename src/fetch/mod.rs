// src/fetch/mod.rs

//! Archive acquisition.
//!
//! - [`build_download_url`] fills the referral token into the configured
//!   template.
//! - [`ArchiveFetcher`] abstracts "put the bytes behind this URL into that
//!   file". Production uses [`HttpFetcher`]; tests swap in a fake that
//!   serves in-memory archives or fails on demand.
//! - [`ReferralSource`] is the seam to the external referral lookup.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::model::TOKEN_PLACEHOLDER;
use crate::errors::{InstallerError, Result};

/// Size of the write buffer between the response stream and the file.
pub const DOWNLOAD_BUFFER_SIZE: usize = 4096;

/// Substitute the referral token into `template`.
///
/// A missing or blank token falls back to `fallback`.
pub fn build_download_url(template: &str, token: Option<&str>, fallback: &str) -> String {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(fallback);
    template.replace(TOKEN_PLACEHOLDER, token)
}

/// Lookup of the referral token the device was installed with.
pub trait ReferralSource: Send + Sync {
    fn referral_token(&self) -> Option<String>;
}

/// Referral source backed by a fixed value (CLI flag, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticReferral(pub Option<String>);

impl ReferralSource for StaticReferral {
    fn referral_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Trait abstracting how the archive is downloaded.
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into `destination`, replacing any existing file.
    ///
    /// Returns the number of bytes written. On error no partial file is
    /// left behind.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>>;
}

/// Streaming HTTP(S) fetcher built on `reqwest`.
///
/// No retries and no explicit timeout: whatever the transport defaults to
/// applies.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let parsed = Url::parse(url).map_err(|e| InstallerError::network(url, e))?;

        info!(%url, destination = %destination.display(), "download started");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| InstallerError::network(url, e))?;

        if !response.status().is_success() {
            return Err(InstallerError::network(
                url,
                format!("server responded with status {}", response.status()),
            ));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(destination).await?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| InstallerError::network(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| InstallerError::network(url, e))?;
            written += chunk.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|e| InstallerError::network(url, e))?;

        info!(%url, bytes = written, "download finished");
        Ok(written)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>> {
        Box::pin(async move {
            match self.download(url, destination).await {
                Ok(bytes) => Ok(bytes),
                Err(err) => {
                    remove_partial(destination).await;
                    Err(err)
                }
            }
        })
    }
}

/// Best-effort removal of a partially written archive.
pub async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial archive"),
    }
}
