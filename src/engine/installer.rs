// src/engine/installer.rs

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::config::InstallerConfig;
use crate::errors::{InstallerError, Result};
use crate::fetch::{ArchiveFetcher, ReferralSource};
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::InstallLayout;
use crate::types::{InstallOutcome, JobState};
use crate::verify;

use super::guard::JobGuard;
use super::request::InstallRequest;
use super::runner::{spawn_runner, InstallJob, RunnerContext};

/// Entry point for installs.
///
/// Owns the single-flight guard and the background runner. Must be created
/// inside a Tokio runtime. Share it (e.g. behind an `Arc`) with anything
/// that needs to query or cancel the active job.
pub struct Installer {
    guard: JobGuard,
    jobs_tx: mpsc::Sender<InstallJob>,
    layout: InstallLayout,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("guard", &self.guard)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Installer {
    pub fn new(
        config: InstallerConfig,
        fetcher: Arc<dyn ArchiveFetcher>,
        referral: Arc<dyn ReferralSource>,
    ) -> Self {
        Self::with_file_system(config, fetcher, referral, Arc::new(RealFileSystem))
    }

    /// Like [`Installer::new`], with the filesystem used for verification
    /// and failure cleanup supplied by the caller.
    pub fn with_file_system(
        config: InstallerConfig,
        fetcher: Arc<dyn ArchiveFetcher>,
        referral: Arc<dyn ReferralSource>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let layout = InstallLayout::new(config.root());
        let ctx = RunnerContext {
            config: Arc::new(config),
            layout: layout.clone(),
            fetcher,
            referral,
            fs: Arc::clone(&fs),
        };

        Self {
            guard: JobGuard::new(),
            jobs_tx: spawn_runner(ctx),
            layout,
            fs,
        }
    }

    /// Start an install.
    ///
    /// Fails with [`InstallerError::AlreadyInstalling`] while another job is
    /// in flight; the running job is not affected.
    pub async fn begin(&self, request: InstallRequest) -> Result<InstallTicket> {
        let active = self.guard.try_acquire()?;
        let job_id = active.id();
        let (reply, outcome_rx) = oneshot::channel();

        let job = InstallJob {
            request,
            active,
            reply,
        };
        if self.jobs_tx.send(job).await.is_err() {
            // The returned job is dropped here, which frees the guard.
            return Err(InstallerError::Other(anyhow!("install runner is not running")));
        }

        Ok(InstallTicket { job_id, outcome_rx })
    }

    /// Kill the installer process of the active job, if there is one.
    /// Safe to call at any time and any number of times.
    pub fn kill(&self) -> bool {
        self.guard.kill()
    }

    pub fn is_installing(&self) -> bool {
        self.guard.is_set()
    }

    pub fn state(&self) -> JobState {
        self.guard.state()
    }

    pub fn last_outcome(&self) -> Option<InstallOutcome> {
        self.guard.last_outcome()
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Whether the install tree currently looks installed.
    pub fn is_installed(&self) -> bool {
        verify::is_installed(self.fs.as_ref(), &self.layout)
    }
}

/// Handle to the single outcome notification of one job.
#[derive(Debug)]
pub struct InstallTicket {
    job_id: u64,
    outcome_rx: oneshot::Receiver<InstallOutcome>,
}

impl InstallTicket {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub async fn outcome(self) -> InstallOutcome {
        match self.outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(job = self.job_id, "install job ended without reporting an outcome");
                InstallOutcome::Failed
            }
        }
    }
}
