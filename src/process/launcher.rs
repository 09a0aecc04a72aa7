// src/process/launcher.rs

//! Spawning and supervising interpreter processes.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::proxy::ProxyHandle;

use super::descriptor::ProcessDescriptor;

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the OS reported one.
    pub code: Option<i32>,
    /// True when the exit was caused by [`KillHandle::kill`].
    pub killed: bool,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        !self.killed && self.code == Some(0)
    }
}

/// Cloneable handle that requests termination of one running process.
///
/// Killing stops the OS process and then shuts down the control endpoint
/// the process was bound to. Only the first call has an effect.
#[derive(Debug, Clone)]
pub struct KillHandle {
    cancel: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl KillHandle {
    pub(crate) fn new(tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Request termination. Returns true if this call delivered the request.
    pub fn kill(&self) -> bool {
        let sender = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// A started process. Await [`RunningProcess::wait`] for its exit.
#[derive(Debug)]
pub struct RunningProcess {
    name: String,
    pid: Option<u32>,
    kill: KillHandle,
    exit_rx: oneshot::Receiver<ProcessExit>,
}

impl RunningProcess {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn kill_handle(&self) -> KillHandle {
        self.kill.clone()
    }

    pub fn kill(&self) -> bool {
        self.kill.kill()
    }

    /// Resolve once the process has exited and its endpoint is released.
    pub async fn wait(self) -> ProcessExit {
        match self.exit_rx.await {
            Ok(exit) => exit,
            Err(_) => {
                warn!(process = %self.name, "process supervisor vanished before reporting exit");
                ProcessExit {
                    code: None,
                    killed: true,
                }
            }
        }
    }
}

/// Spawn `descriptor` with `extra_args` appended and hand `proxy` over to
/// the process supervisor.
///
/// The caller's environment is inherited and augmented with the
/// descriptor's variables. The proxy is shut down when the process exits,
/// whichever way it exits, and before the exit future resolves. If the
/// spawn itself fails the proxy is shut down before the error is returned.
pub async fn start(
    descriptor: ProcessDescriptor,
    extra_args: Vec<String>,
    mut proxy: ProxyHandle,
) -> Result<RunningProcess> {
    let argv = descriptor.command_line(&extra_args);
    let name = descriptor.name().to_string();

    info!(
        process = %name,
        binary = %descriptor.binary().display(),
        args = ?argv,
        cwd = %descriptor.working_directory().display(),
        "starting process"
    );

    let mut cmd = Command::new(descriptor.binary());
    cmd.args(&argv)
        .envs(descriptor.environment())
        .current_dir(descriptor.working_directory())
        .kill_on_drop(true);

    if descriptor.inherits_stdio() {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }

    let spawned = cmd
        .spawn()
        .with_context(|| format!("spawning process '{}'", name));

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            proxy.shutdown().await;
            return Err(err.into());
        }
    };

    let pid = child.id();
    if let Some(stdout) = child.stdout.take() {
        forward_output(name.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_output(name.clone(), "stderr", stderr);
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let (exit_tx, exit_rx) = oneshot::channel::<ProcessExit>();

    let supervisor_name = name.clone();
    tokio::spawn(async move {
        let exit = supervise(&supervisor_name, &mut child, cancel_rx).await;
        proxy.shutdown().await;

        info!(
            process = %supervisor_name,
            exit_code = ?exit.code,
            killed = exit.killed,
            "process exited"
        );

        if exit_tx.send(exit).is_err() {
            debug!(process = %supervisor_name, "nobody waiting for process exit");
        }
    });

    Ok(RunningProcess {
        name,
        pid,
        kill: KillHandle::new(cancel_tx),
        exit_rx,
    })
}

/// Wait for natural exit or a kill request, whichever comes first.
async fn supervise(
    name: &str,
    child: &mut Child,
    mut cancel_rx: oneshot::Receiver<()>,
) -> ProcessExit {
    tokio::select! {
        status = child.wait() => exit_from_status(name, status),

        cancel = &mut cancel_rx => match cancel {
            Ok(()) => {
                info!(process = %name, "kill requested; terminating process");
                if let Err(e) = child.kill().await {
                    warn!(process = %name, error = %e, "failed to kill child process");
                }
                ProcessExit {
                    code: None,
                    killed: true,
                }
            }
            Err(_) => {
                debug!(process = %name, "all kill handles dropped; waiting for natural exit");
                exit_from_status(name, child.wait().await)
            }
        }
    }
}

fn exit_from_status(name: &str, status: std::io::Result<std::process::ExitStatus>) -> ProcessExit {
    match status {
        Ok(status) => ProcessExit {
            code: status.code(),
            killed: false,
        },
        Err(e) => {
            warn!(process = %name, error = %e, "failed to wait for child process");
            ProcessExit {
                code: None,
                killed: false,
            }
        }
    }
}

/// Consume a child output stream so buffers don't fill; log at debug.
fn forward_output<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(process = %name, stream, "{}", line);
        }
    });
}
