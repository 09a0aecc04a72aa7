// tests/install_lifecycle.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, wait_until, with_timeout, TestResult};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use seattle_installer::engine::{InstallOutcome, InstallRequest, Installer, JobState};
use seattle_installer::errors::InstallerError;
use seattle_installer::fetch::StaticReferral;
use seattle_installer_test_utils::builders::{ArchiveBuilder, InstallerConfigBuilder};
use seattle_installer_test_utils::fake_fetcher::FakeFetcher;
use tempfile::tempdir;

const SUCCESS_SCRIPT: &str = r#"echo "$@" > args.txt
echo "$SEATTLE_AVAILABLE_CORES $SEATTLE_AVAILABLE_SPACE" > resources.txt
echo "$AP_PORT" > port.txt
echo "unpacking" > installInfo.new
echo "seattle completed installation" >> installInfo.new
"#;

const FAILING_SCRIPT: &str = r#"echo "unpacking" > installInfo.new
echo "error: could not start node manager" >> installInfo.new
exit 3
"#;

const SLEEPING_SCRIPT: &str = "echo started > installInfo.new\nexec sleep 30\n";

fn installer_for(root: &Path, fetcher: FakeFetcher, referral: Option<&str>) -> Installer {
    let cfg = InstallerConfigBuilder::new(root).build();
    Installer::new(
        cfg,
        Arc::new(fetcher),
        Arc::new(StaticReferral(referral.map(str::to_string))),
    )
}

#[tokio::test]
async fn successful_install_reports_installed_and_cleans_up_archive() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SUCCESS_SCRIPT).to_bytes());
    let requested = fetcher.requested();
    let installer = installer_for(dir.path(), fetcher, Some("abc123"));

    let request = InstallRequest::new()
        .with_percent(35)
        .with_interfaces(["wlan0", "eth0"]);
    let ticket = installer.begin(request).await?;
    let outcome = with_timeout(ticket.outcome()).await;

    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(installer.last_outcome(), Some(InstallOutcome::Installed));
    assert_eq!(installer.state(), JobState::Succeeded);
    assert!(installer.is_installed());

    let layout = installer.layout();
    assert!(!layout.archive_path().exists(), "archive must be removed");

    assert_eq!(
        requested.lock().unwrap().as_slice(),
        ["https://seattlegeni.cs.washington.edu/geni/download/abc123/seattle_win.zip"]
    );

    let args = std::fs::read_to_string(layout.repy_dir().join("args.txt"))?;
    assert_eq!(
        args.trim(),
        "--percent 35 --disable-startup-script True \
         --nm-iface wlan0 --repy-iface wlan0 --nm-iface eth0 --repy-iface eth0 --repy-nootherips"
    );

    let resources = std::fs::read_to_string(layout.repy_dir().join("resources.txt"))?;
    let values: Vec<u64> = resources
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 2);
    assert!(values[0] >= 1, "at least one core is reported");

    let port = std::fs::read_to_string(layout.repy_dir().join("port.txt"))?;
    assert!(port.trim().parse::<u16>()? > 0);
    Ok(())
}

#[tokio::test]
async fn missing_referral_uses_fallback_token() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SUCCESS_SCRIPT).to_bytes());
    let requested = fetcher.requested();
    let installer = installer_for(dir.path(), fetcher, None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    assert_eq!(with_timeout(ticket.outcome()).await, InstallOutcome::Installed);

    let urls = requested.lock().unwrap().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("/flibble/"));
    Ok(())
}

#[tokio::test]
async fn failed_run_removes_main_artifact_but_keeps_logs() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(FAILING_SCRIPT).to_bytes());
    let installer = installer_for(dir.path(), fetcher, None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    let outcome = with_timeout(ticket.outcome()).await;

    assert_eq!(outcome, InstallOutcome::Failed);
    assert!(!installer.layout().main_artifact().exists());
    assert!(!installer.is_installed());
    assert!(installer.layout().log_dir().join("installInfo.new").is_file());
    assert!(!installer.layout().archive_path().exists());
    Ok(())
}

#[tokio::test]
async fn download_failure_reports_failed_and_frees_guard() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let installer = installer_for(dir.path(), FakeFetcher::failing("connection reset"), None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    let outcome = with_timeout(ticket.outcome()).await;

    assert_eq!(outcome, InstallOutcome::Failed);
    assert!(!installer.is_installing());
    assert_eq!(installer.state(), JobState::Failed);
    assert!(!installer.layout().archive_path().exists());
    Ok(())
}

#[tokio::test]
async fn corrupt_archive_fails_at_extraction_and_frees_guard() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let installer = installer_for(dir.path(), FakeFetcher::serving(b"not a zip".to_vec()), None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    let outcome = with_timeout(ticket.outcome()).await;

    assert_eq!(outcome, InstallOutcome::Failed);
    assert!(!installer.is_installing());
    assert_eq!(installer.state(), JobState::Failed);
    assert!(!installer.layout().archive_path().exists());
    assert!(!installer.is_installed());
    Ok(())
}

#[tokio::test]
async fn archive_without_installer_script_fails_at_launch() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let archive = ArchiveBuilder::new()
        .file("seattle/seattle_repy/nmmain.py", "# nm\n")
        .to_bytes();
    let installer = installer_for(dir.path(), FakeFetcher::serving(archive), None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    assert_eq!(with_timeout(ticket.outcome()).await, InstallOutcome::Failed);
    assert!(!installer.is_installing());
    Ok(())
}

#[tokio::test]
async fn second_begin_while_in_flight_is_rejected() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SUCCESS_SCRIPT).to_bytes())
        .with_delay(Duration::from_millis(300));
    let requested = fetcher.requested();
    let installer = installer_for(dir.path(), fetcher, None);

    let first = installer.begin(InstallRequest::new()).await?;
    assert!(installer.is_installing());

    match installer.begin(InstallRequest::new()).await {
        Err(InstallerError::AlreadyInstalling) => {}
        other => panic!("Expected AlreadyInstalling, got: {:?}", other),
    }

    assert_eq!(with_timeout(first.outcome()).await, InstallOutcome::Installed);
    assert_eq!(requested.lock().unwrap().len(), 1, "only one download ran");
    Ok(())
}

#[tokio::test]
async fn guard_is_clear_when_outcome_arrives() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SUCCESS_SCRIPT).to_bytes());
    let installer = installer_for(dir.path(), fetcher, None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    with_timeout(ticket.outcome()).await;

    // No waiting: the slot is freed before the outcome is delivered.
    assert!(!installer.is_installing());
    let again = installer.begin(InstallRequest::new()).await?;
    assert_eq!(with_timeout(again.outcome()).await, InstallOutcome::Installed);
    Ok(())
}

#[tokio::test]
async fn kill_while_running_reports_failed() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SLEEPING_SCRIPT).to_bytes());
    let installer = installer_for(dir.path(), fetcher, None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    let running = wait_until(Duration::from_secs(5), || {
        installer.state() == JobState::Running
    })
    .await;
    assert!(running, "installer script never reached Running");

    assert!(installer.kill());
    let outcome = with_timeout(ticket.outcome()).await;

    assert_eq!(outcome, InstallOutcome::Failed);
    assert!(!installer.layout().main_artifact().exists());

    // Job is over: further kills are no-ops.
    assert!(!installer.kill());
    assert!(!installer.kill());
    Ok(())
}

#[tokio::test]
async fn kill_before_launch_does_not_stop_the_job() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let fetcher = FakeFetcher::serving(ArchiveBuilder::seattle(SUCCESS_SCRIPT).to_bytes())
        .with_delay(Duration::from_millis(200));
    let installer = installer_for(dir.path(), fetcher, None);

    let ticket = installer.begin(InstallRequest::new()).await?;
    assert_eq!(installer.state(), JobState::Downloading);
    assert!(!installer.kill(), "nothing to kill while downloading");

    assert_eq!(with_timeout(ticket.outcome()).await, InstallOutcome::Installed);
    Ok(())
}

#[tokio::test]
async fn kill_with_no_job_is_a_no_op() -> TestResult {
    let dir = tempdir()?;
    let installer = installer_for(dir.path(), FakeFetcher::failing("unused"), None);

    assert!(!installer.kill());
    assert_eq!(installer.state(), JobState::Idle);
    assert_eq!(installer.last_outcome(), None);
    Ok(())
}
