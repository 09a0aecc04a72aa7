// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod fs;
pub mod host;
pub mod layout;
pub mod logging;
pub mod process;
pub mod proxy;
pub mod types;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, InstallArgs};
use crate::config::{load_or_default, InstallerConfig};
use crate::engine::{InstallRequest, Installer};
use crate::fetch::{build_download_url, HttpFetcher, StaticReferral};
use crate::fs::RealFileSystem;
use crate::layout::InstallLayout;
use crate::process::{InteractiveInterpreter, LaunchSpec};
use crate::proxy::ProxyHandle;
use crate::types::InstallOutcome;

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(true)` when the requested command succeeded, `Ok(false)`
/// when it ran to completion but the result is a failure (install failed,
/// interpreter exited non-zero).
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    debug!(root = %cfg.root().display(), "configuration loaded");

    match args.command {
        Command::Install(install) => run_install(cfg, install).await,
        Command::Status => {
            print_status(&cfg);
            Ok(true)
        }
        Command::Logs => {
            print_logs(&cfg);
            Ok(true)
        }
        Command::Shell { args } => run_shell(&cfg, args).await,
    }
}

fn install_request(args: &InstallArgs) -> InstallRequest {
    InstallRequest {
        percent: args.percent,
        interfaces: (!args.interfaces.is_empty()).then(|| args.interfaces.clone()),
        extra_arguments: args.extra_args.clone(),
    }
}

async fn run_install(cfg: InstallerConfig, args: InstallArgs) -> Result<bool> {
    let request = install_request(&args);

    if args.dry_run {
        print_dry_run(&cfg, &args, &request);
        return Ok(true);
    }

    let installer = Arc::new(Installer::new(
        cfg,
        Arc::new(HttpFetcher::new()),
        Arc::new(StaticReferral(args.referral.clone())),
    ));

    let ticket = installer.begin(request).await?;
    info!(job = ticket.job_id(), "install requested");

    // Ctrl-C → kill the installer script (if it is running yet).
    {
        let installer = Arc::clone(&installer);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; cancelling install");
                installer.kill();
            }
        });
    }

    let outcome = ticket.outcome().await;
    match outcome {
        InstallOutcome::Installed => println!("seattle installed"),
        InstallOutcome::Failed => println!("seattle installation failed"),
    }
    Ok(outcome == InstallOutcome::Installed)
}

async fn run_shell(cfg: &InstallerConfig, args: Vec<String>) -> Result<bool> {
    let proxy = ProxyHandle::start_local(cfg.proxy()).await?;
    let descriptor =
        InteractiveInterpreter::new(cfg.interpreter(), cfg.root()).describe(proxy.binding())?;

    let running = process::start(descriptor, args, proxy).await?;
    let kill = running.kill_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            kill.kill();
        }
    });

    let exit = running.wait().await;
    Ok(exit.success())
}

fn print_status(cfg: &InstallerConfig) {
    let layout = InstallLayout::new(cfg.root());
    let fs = RealFileSystem;

    println!("install root: {}", layout.root().display());
    println!("installed: {}", yes_no(verify::is_installed(&fs, &layout)));
    println!(
        "last install completed: {}",
        yes_no(verify::verify(&fs, &layout.log_dir()))
    );
    // A leftover archive means an install is still unpacking or was cut short.
    println!(
        "install pending: {}",
        yes_no(layout.archive_path().is_file())
    );
}

fn print_logs(cfg: &InstallerConfig) {
    let layout = InstallLayout::new(cfg.root());
    let logs = verify::list_logs(&RealFileSystem, &layout);
    if logs.is_empty() {
        println!("no logs found under {}", layout.repy_dir().display());
        return;
    }
    for log in logs {
        println!("{}", log.display());
    }
}

/// Simple dry-run output: download URL, target paths and script arguments.
fn print_dry_run(cfg: &InstallerConfig, args: &InstallArgs, request: &InstallRequest) {
    let layout = InstallLayout::new(cfg.root());
    let url = build_download_url(
        &cfg.download().url_template,
        args.referral.as_deref(),
        &cfg.download().fallback_token,
    );

    println!("seattle-installer dry-run");
    println!("  url: {url}");
    println!("  archive: {}", layout.archive_path().display());
    println!("  install root: {}", layout.root().display());
    println!(
        "  interpreter: {} ({})",
        cfg.interpreter().binary.display(),
        cfg.interpreter().name
    );
    println!("  script: {}", layout.installer_script().display());
    println!("  args: {}", request.launch_arguments().join(" "));

    debug!("dry-run complete (nothing installed)");
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
