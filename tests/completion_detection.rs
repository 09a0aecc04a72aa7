// tests/completion_detection.rs

use std::path::{Path, PathBuf};

use seattle_installer::fs::mock::MockFileSystem;
use seattle_installer::fs::RealFileSystem;
use seattle_installer::layout::InstallLayout;
use seattle_installer::verify::{
    completion_log, is_installed, last_non_empty_line, list_logs, verify, SUCCESS_MARKER,
};
use tempfile::tempdir;

const LOG_DIR: &str = "/sd/seattle/seattle_repy";

fn log_dir() -> PathBuf {
    PathBuf::from(LOG_DIR)
}

#[test]
fn success_marker_on_last_line_is_detected() {
    let fs = MockFileSystem::new();
    fs.add_file(
        log_dir().join("installInfo.new"),
        format!("step 1\nstep 2\n{SUCCESS_MARKER}\n"),
    );

    assert!(verify(&fs, &log_dir()));
}

#[test]
fn trailing_blank_lines_are_ignored() {
    let fs = MockFileSystem::new();
    fs.add_file(
        log_dir().join("installInfo.new"),
        format!("step 1\n{SUCCESS_MARKER}\n\n   \n"),
    );

    assert!(verify(&fs, &log_dir()));
}

#[test]
fn marker_before_a_later_line_is_not_success() {
    let fs = MockFileSystem::new();
    fs.add_file(
        log_dir().join("installInfo.new"),
        format!("{SUCCESS_MARKER}\nerror: something broke afterwards\n"),
    );

    assert!(!verify(&fs, &log_dir()));
}

#[test]
fn new_log_is_preferred_over_old() {
    let fs = MockFileSystem::new();
    fs.add_file(log_dir().join("installInfo.new"), "failed\n");
    fs.add_file(log_dir().join("installInfo.old"), format!("{SUCCESS_MARKER}\n"));

    assert_eq!(
        completion_log(&fs, &log_dir()),
        Some(log_dir().join("installInfo.new"))
    );
    assert!(!verify(&fs, &log_dir()));
}

#[test]
fn old_log_is_used_when_new_is_missing() {
    let fs = MockFileSystem::new();
    fs.add_file(log_dir().join("installInfo.old"), format!("{SUCCESS_MARKER}\n"));

    assert!(verify(&fs, &log_dir()));
}

#[test]
fn missing_empty_and_unreadable_logs_are_failures() {
    let missing = MockFileSystem::new();
    assert!(!verify(&missing, &log_dir()));

    let empty = MockFileSystem::new();
    empty.add_file(log_dir().join("installInfo.new"), "\n\n");
    assert!(!verify(&empty, &log_dir()));

    let unreadable = MockFileSystem::new();
    let log = log_dir().join("installInfo.new");
    unreadable.add_file(&log, format!("{SUCCESS_MARKER}\n"));
    unreadable.deny_read(&log);
    assert!(!verify(&unreadable, &log_dir()));
}

#[test]
fn non_utf8_bytes_on_earlier_lines_do_not_hide_the_marker() {
    let fs = MockFileSystem::new();
    fs.add_file(
        log_dir().join("installInfo.new"),
        b"iface caf\xe9 configured\nseattle completed installation\n".to_vec(),
    );

    assert!(verify(&fs, &log_dir()));
}

#[test]
fn verification_is_idempotent() {
    let fs = MockFileSystem::new();
    fs.add_file(log_dir().join("installInfo.new"), format!("{SUCCESS_MARKER}\n"));

    let first = verify(&fs, &log_dir());
    let second = verify(&fs, &log_dir());
    assert!(first);
    assert_eq!(first, second);
}

#[test]
fn last_non_empty_line_handles_edge_cases() {
    assert_eq!(last_non_empty_line(""), None);
    assert_eq!(last_non_empty_line("\n \n"), None);
    assert_eq!(last_non_empty_line("a\nb\n\n"), Some("b"));
    assert_eq!(last_non_empty_line("only"), Some("only"));
}

#[test]
fn installed_means_main_artifact_exists() {
    let fs = MockFileSystem::new();
    let layout = InstallLayout::new("/sd");
    assert!(!is_installed(&fs, &layout));

    fs.add_file(layout.main_artifact(), "# nm\n");
    assert!(is_installed(&fs, &layout));
}

#[test]
fn list_logs_collects_rotated_and_vessel_logs_sorted() {
    let fs = MockFileSystem::new();
    let layout = InstallLayout::new("/sd");
    let repy = layout.repy_dir();

    fs.add_file(repy.join("nmmain.py"), "");
    fs.add_file(repy.join("installInfo.new"), "x");
    fs.add_file(repy.join("installInfo.old"), "x");
    fs.add_file(repy.join("v2").join("log.new"), "x");
    fs.add_file(repy.join("v2").join("resource.cfg"), "x");
    fs.add_file(repy.join("v1").join("log.old"), "x");
    fs.add_file(repy.join("vessel").join("log.new"), "x");

    let logs = list_logs(&fs, &layout);
    let expected: Vec<PathBuf> = vec![
        repy.join("installInfo.new"),
        repy.join("installInfo.old"),
        repy.join("v1").join("log.old"),
        repy.join("v2").join("log.new"),
    ];
    assert_eq!(logs, expected);
}

#[test]
fn list_logs_without_install_tree_is_empty() {
    let fs = MockFileSystem::new();
    assert!(list_logs(&fs, &InstallLayout::new("/nowhere")).is_empty());
}

#[test]
fn real_filesystem_detection_matches_disk_contents() {
    let dir = tempdir().unwrap();
    let log_dir: &Path = dir.path();

    assert!(!verify(&RealFileSystem, log_dir));

    std::fs::write(log_dir.join("installInfo.new"), "working...\n").unwrap();
    assert!(!verify(&RealFileSystem, log_dir));

    std::fs::write(
        log_dir.join("installInfo.new"),
        format!("working...\n{SUCCESS_MARKER}\n"),
    )
    .unwrap();
    assert!(verify(&RealFileSystem, log_dir));

    std::fs::write(
        log_dir.join("installInfo.new"),
        b"iface caf\xe9 configured\nseattle completed installation\n",
    )
    .unwrap();
    assert!(verify(&RealFileSystem, log_dir));
}
