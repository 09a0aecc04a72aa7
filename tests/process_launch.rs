// tests/process_launch.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::time::Duration;

use seattle_installer::config::{InterpreterSection, ProxySection};
use seattle_installer::errors::InstallerError;
use seattle_installer::process::{
    self, InteractiveInterpreter, LaunchSpec, ProcessDescriptor, ScriptLaunch, ENV_PROXY_HANDSHAKE, ENV_PROXY_HOST,
    ENV_PROXY_PORT,
};
use seattle_installer::proxy::ProxyHandle;
use seattle_installer_test_utils::builders::InstallerConfigBuilder;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

fn proxy_section(require_handshake: bool) -> ProxySection {
    InstallerConfigBuilder::new("/tmp")
        .with_handshake(require_handshake)
        .build()
        .proxy()
        .clone()
}

fn sh_interpreter() -> InterpreterSection {
    InstallerConfigBuilder::new("/tmp")
        .with_interpreter_env("SEATTLE_TEST_FLAG", "on")
        .build()
        .interpreter()
        .clone()
}

#[test]
fn command_line_orders_arguments_command_then_extra() {
    let mut descriptor = ProcessDescriptor::new("python", "Python");
    descriptor.add_argument("-u");
    descriptor.set_command("script.py");

    let argv = descriptor.command_line(&["--percent".to_string(), "50".to_string()]);
    assert_eq!(argv, vec!["-u", "script.py", "--percent", "50"]);

    descriptor.set_command("");
    assert_eq!(descriptor.command_line(&[]), vec!["-u"]);
}

#[tokio::test]
async fn script_launch_injects_endpoint_and_interpreter_environment() -> TestResult {
    init_tracing();
    let proxy = ProxyHandle::start_local(&proxy_section(true)).await?;
    let binding = proxy.binding().clone();

    let dir = tempdir()?;
    let script = dir.path().join("install.sh");
    std::fs::write(&script, "exit 0\n")?;

    let interpreter = sh_interpreter();
    let descriptor = ScriptLaunch::in_script_dir(&interpreter, &script).describe(&binding)?;

    let env = descriptor.environment();
    assert_eq!(env.get(ENV_PROXY_HOST), Some(&binding.host));
    assert_eq!(env.get(ENV_PROXY_PORT), Some(&binding.port.to_string()));
    assert_eq!(env.get(ENV_PROXY_HANDSHAKE), binding.secret.as_ref());
    assert_eq!(env.get("SEATTLE_TEST_FLAG").map(String::as_str), Some("on"));
    assert_eq!(descriptor.working_directory(), dir.path());
    assert_eq!(descriptor.command(), script.to_string_lossy());
    Ok(())
}

#[tokio::test]
async fn interactive_interpreter_runs_in_root_with_inherited_stdio() -> TestResult {
    let proxy = ProxyHandle::start_local(&proxy_section(true)).await?;
    let binding = proxy.binding().clone();

    let root = tempdir()?;
    let cfg = InstallerConfigBuilder::new(root.path())
        .with_interpreter_arg("-u")
        .with_interactive_command("interactive.py")
        .build();

    let descriptor =
        InteractiveInterpreter::new(cfg.interpreter(), cfg.root()).describe(&binding)?;

    assert_eq!(descriptor.working_directory(), root.path());
    assert!(descriptor.inherits_stdio());
    assert_eq!(
        descriptor.command_line(&["--flag".to_string()]),
        vec!["-u", "interactive.py", "--flag"]
    );
    assert_eq!(
        descriptor.environment().get(ENV_PROXY_PORT),
        Some(&binding.port.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn handshake_variable_is_absent_without_secret() -> TestResult {
    let proxy = ProxyHandle::start_local(&proxy_section(false)).await?;
    assert!(proxy.binding().secret.is_none());

    let dir = tempdir()?;
    let script = dir.path().join("install.sh");
    std::fs::write(&script, "exit 0\n")?;

    let interpreter = sh_interpreter();
    let descriptor =
        ScriptLaunch::in_script_dir(&interpreter, &script).describe(proxy.binding())?;
    assert!(!descriptor.environment().contains_key(ENV_PROXY_HANDSHAKE));
    Ok(())
}

#[tokio::test]
async fn missing_script_is_a_launch_precondition_error() -> TestResult {
    let proxy = ProxyHandle::start_local(&proxy_section(true)).await?;
    let dir = tempdir()?;
    let script = dir.path().join("missing.sh");

    let interpreter = sh_interpreter();
    let result = ScriptLaunch::in_script_dir(&interpreter, &script).describe(proxy.binding());

    match result {
        Err(InstallerError::LaunchPrecondition(path)) => assert_eq!(path, script),
        other => panic!("Expected LaunchPrecondition, got: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn child_sees_endpoint_variables_and_arguments() -> TestResult {
    init_tracing();
    let proxy = ProxyHandle::start_local(&proxy_section(true)).await?;
    let binding = proxy.binding().clone();

    let dir = tempdir()?;
    let script = dir.path().join("report.sh");
    std::fs::write(
        &script,
        "echo \"$AP_HOST $AP_PORT $AP_HANDSHAKE\" > env.txt\necho \"$@\" > args.txt\n",
    )?;

    let interpreter = sh_interpreter();
    let descriptor = ScriptLaunch::in_script_dir(&interpreter, &script).describe(&binding)?;
    let running = process::start(
        descriptor,
        vec!["--percent".to_string(), "50".to_string()],
        proxy,
    )
    .await?;

    let exit = with_timeout(running.wait()).await;
    assert!(exit.success());

    let env = std::fs::read_to_string(dir.path().join("env.txt"))?;
    let expected = format!(
        "{} {} {}",
        binding.host,
        binding.port,
        binding.secret.clone().unwrap_or_default()
    );
    assert_eq!(env.trim(), expected);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("args.txt"))?.trim(),
        "--percent 50"
    );
    Ok(())
}

#[tokio::test]
async fn kill_resolves_exit_once_and_releases_endpoint() -> TestResult {
    init_tracing();
    let proxy = ProxyHandle::start_local(&proxy_section(false)).await?;
    let port = proxy.binding().port;

    let dir = tempdir()?;
    let script = dir.path().join("sleep.sh");
    std::fs::write(&script, "exec sleep 30\n")?;

    let interpreter = sh_interpreter();
    let descriptor =
        ScriptLaunch::in_script_dir(&interpreter, &script).describe(proxy.binding())?;
    let running = process::start(descriptor, Vec::new(), proxy).await?;
    let handle = running.kill_handle();

    assert!(handle.kill());
    assert!(!handle.kill(), "second kill must be a no-op");

    let exit = with_timeout(running.wait()).await;
    assert!(exit.killed);
    assert!(!exit.success());

    // The endpoint went away with the process.
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn spawn_failure_shuts_down_endpoint() -> TestResult {
    let proxy = ProxyHandle::start_local(&proxy_section(false)).await?;
    let port = proxy.binding().port;

    let mut descriptor = ProcessDescriptor::new("/nonexistent/interpreter", "missing");
    descriptor.set_working_directory(std::env::temp_dir());

    assert!(process::start(descriptor, Vec::new(), proxy).await.is_err());
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn endpoint_accepts_correct_handshake_and_rejects_wrong_one() -> TestResult {
    init_tracing();
    let mut proxy = ProxyHandle::start_local(&proxy_section(true)).await?;
    let binding = proxy.binding().clone();
    let secret = binding.secret.clone().expect("handshake secret");

    // Wrong secret: the endpoint closes the connection.
    let mut rejected = TcpStream::connect((binding.host.as_str(), binding.port)).await?;
    rejected.write_all(b"wrong-secret\n").await?;
    let mut lines = BufReader::new(rejected).lines();
    let closed = with_timeout(lines.next_line()).await?;
    assert_eq!(closed, None);

    // Correct secret: the connection stays open for further lines.
    let mut accepted = TcpStream::connect((binding.host.as_str(), binding.port)).await?;
    accepted.write_all(format!("{secret}\nhello\n").as_bytes()).await?;
    let still_open = tokio::time::timeout(Duration::from_millis(200), async {
        let mut buf = [0u8; 1];
        tokio::io::AsyncReadExt::read(&mut accepted, &mut buf).await
    })
    .await;
    assert!(still_open.is_err(), "connection should stay open after handshake");

    assert!(proxy.is_running());
    proxy.shutdown().await;
    assert!(!proxy.is_running());
    proxy.shutdown().await;
    Ok(())
}
