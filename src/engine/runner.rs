// src/engine/runner.rs

//! Background runner executing install jobs one at a time.
//!
//! The runner owns Downloading → Extracting → Configuring → Launching.
//! Once the installer process is running it hands the job to a supervisor
//! task that waits for the exit and performs Verifying, so the runner never
//! block-waits on the child.

use std::sync::Arc;

use anyhow::Context;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::InstallerConfig;
use crate::errors::Result;
use crate::extract::extract_zip_in_background;
use crate::fetch::{build_download_url, remove_partial, ArchiveFetcher, ReferralSource};
use crate::fs::FileSystem;
use crate::host::HostResources;
use crate::layout::InstallLayout;
use crate::process::{self, LaunchSpec, ProcessExit, RunningProcess, ScriptLaunch};
use crate::proxy::ProxyHandle;
use crate::types::{InstallOutcome, JobState};
use crate::verify::verify;

use super::guard::ActiveJob;
use super::request::InstallRequest;

/// A job accepted by the guard, waiting to be run.
#[derive(Debug)]
pub(crate) struct InstallJob {
    pub request: InstallRequest,
    pub active: ActiveJob,
    pub reply: oneshot::Sender<InstallOutcome>,
}

/// Collaborators every job needs.
#[derive(Clone)]
pub(crate) struct RunnerContext {
    pub config: Arc<InstallerConfig>,
    pub layout: InstallLayout,
    pub fetcher: Arc<dyn ArchiveFetcher>,
    pub referral: Arc<dyn ReferralSource>,
    pub fs: Arc<dyn FileSystem>,
}

/// Spawn the runner loop and return the sender used to submit jobs.
pub(crate) fn spawn_runner(ctx: RunnerContext) -> mpsc::Sender<InstallJob> {
    let (tx, mut rx) = mpsc::channel::<InstallJob>(1);

    tokio::spawn(async move {
        info!("install runner started");

        while let Some(job) = rx.recv().await {
            run_job(job, &ctx).await;
        }

        info!("install runner finished (channel closed)");
    });

    tx
}

async fn run_job(job: InstallJob, ctx: &RunnerContext) {
    let InstallJob {
        request,
        active,
        reply,
    } = job;

    match prepare_and_launch(&request, &active, ctx).await {
        Ok(process) => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let exit = process.wait().await;
                let outcome = verify_install(&active, &ctx, exit).await;
                finish(active, reply, outcome);
            });
        }
        Err(err) => {
            error!(
                job = active.id(),
                state = %active.state(),
                error = %err,
                "installation failed"
            );
            finish(active, reply, InstallOutcome::Failed);
        }
    }
}

/// Free the guard, then notify the caller.
fn finish(active: ActiveJob, reply: oneshot::Sender<InstallOutcome>, outcome: InstallOutcome) {
    let job = active.id();
    active.release(outcome);

    if reply.send(outcome).is_err() {
        debug!(job, ?outcome, "caller stopped waiting for the install outcome");
    }
}

async fn prepare_and_launch(
    request: &InstallRequest,
    active: &ActiveJob,
    ctx: &RunnerContext,
) -> Result<RunningProcess> {
    let cfg = &ctx.config;
    let root = ctx.layout.root();
    let archive = ctx.layout.archive_path();

    // Downloading
    tokio::fs::create_dir_all(root).await?;
    remove_partial(&archive).await;

    let token = ctx.referral.referral_token();
    let url = build_download_url(
        &cfg.download().url_template,
        token.as_deref(),
        &cfg.download().fallback_token,
    );
    if let Err(err) = ctx.fetcher.fetch(&url, &archive).await {
        remove_partial(&archive).await;
        return Err(err);
    }

    // Extracting
    active.advance(JobState::Extracting);
    let extracted = extract_zip_in_background(archive.clone(), root.to_path_buf()).await;
    remove_partial(&archive).await;
    let report = extracted?;
    if !report.is_complete() {
        warn!(
            job = active.id(),
            failed = ?report.failed_names(),
            "some archive entries could not be extracted"
        );
    }

    // Configuring
    active.advance(JobState::Configuring);
    let args = request.launch_arguments();
    let probe_root = root.to_path_buf();
    let host = tokio::task::spawn_blocking(move || HostResources::probe(&probe_root))
        .await
        .context("host probe worker panicked")?;
    debug!(job = active.id(), ?args, ?host, "computed installer launch");

    // Launching
    active.advance(JobState::Launching);
    let mut proxy = ProxyHandle::start_local(cfg.proxy()).await?;

    let script = ctx.layout.installer_script();
    let mut descriptor =
        match ScriptLaunch::in_script_dir(cfg.interpreter(), &script).describe(proxy.binding()) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                proxy.shutdown().await;
                return Err(err);
            }
        };
    descriptor.put_all_environment_variables(host.environment());

    let running = process::start(descriptor, args, proxy).await?;
    active.register_process(running.kill_handle());
    active.advance(JobState::Running);

    info!(job = active.id(), pid = ?running.pid(), "installer script running");
    Ok(running)
}

/// Classify the finished run; on failure remove the main artifact so the
/// tree does not look installed. Logs are kept for diagnostics.
async fn verify_install(
    active: &ActiveJob,
    ctx: &RunnerContext,
    exit: ProcessExit,
) -> InstallOutcome {
    active.advance(JobState::Verifying);

    let fs = Arc::clone(&ctx.fs);
    let layout = ctx.layout.clone();
    let checked = tokio::task::spawn_blocking(move || {
        if verify(fs.as_ref(), &layout.log_dir()) {
            return true;
        }
        let artifact = layout.main_artifact();
        if let Err(err) = fs.remove_file(&artifact) {
            warn!(path = %artifact.display(), error = %err, "failed to remove main artifact");
        }
        false
    })
    .await;

    let completed = match checked {
        Ok(completed) => completed,
        Err(err) => {
            error!(job = active.id(), error = %err, "verification worker panicked");
            false
        }
    };

    if completed {
        info!(job = active.id(), exit_code = ?exit.code, "installation completed");
        return InstallOutcome::Installed;
    }

    warn!(
        job = active.id(),
        exit_code = ?exit.code,
        killed = exit.killed,
        "installation did not complete"
    );
    InstallOutcome::Failed
}
