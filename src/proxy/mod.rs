// src/proxy/mod.rs

//! Local control-plane endpoint ("proxy").
//!
//! Launched interpreter processes find the endpoint through `AP_HOST`,
//! `AP_PORT` and, when a handshake is required, `AP_HANDSHAKE`. A client
//! that requires a handshake must send the secret as its first line;
//! anything else closes the connection. Lines received afterwards are
//! logged at debug level.
//!
//! The endpoint owns its listening socket: [`ProxyHandle::shutdown`] stops
//! accepting, drops every open connection and frees the port.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::ProxySection;
use crate::errors::Result;

/// Pause after a failed `accept` before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Address and secret a launched process needs to connect back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinding {
    pub host: String,
    pub port: u16,
    pub secret: Option<String>,
}

/// A running endpoint. Dropping the handle without calling
/// [`ProxyHandle::shutdown`] still stops the accept loop.
#[derive(Debug)]
pub struct ProxyHandle {
    binding: ProxyBinding,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ProxyHandle {
    /// Bind an ephemeral port on the configured host and start accepting.
    pub async fn start_local(cfg: &ProxySection) -> Result<Self> {
        let listener = TcpListener::bind((cfg.host.as_str(), 0)).await?;
        let addr = listener.local_addr()?;

        let secret = cfg
            .require_handshake
            .then(|| uuid::Uuid::new_v4().simple().to_string());

        let binding = ProxyBinding {
            host: cfg.host.clone(),
            port: addr.port(),
            secret: secret.clone(),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(accept_loop(listener, secret, shutdown_rx));

        info!(%addr, handshake = binding.secret.is_some(), "control endpoint listening");

        Ok(Self {
            binding,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn binding(&self) -> &ProxyBinding {
        &self.binding
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop listening and release the port. Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Err(e) = task.await {
            warn!(error = %e, "control endpoint task ended abnormally");
        }
        info!(port = self.binding.port, "control endpoint shut down");
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    secret: Option<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "control endpoint accepted connection");
                    connections.spawn(serve_connection(stream, peer, secret.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "control endpoint accept failed");
                    // Persistent errors (e.g. EMFILE) would otherwise spin.
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
    drop(listener);
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, secret: Option<String>) {
    let mut lines = BufReader::new(stream).lines();

    if let Some(expected) = secret {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim() == expected => {
                debug!(%peer, "handshake accepted");
            }
            Ok(_) => {
                warn!(%peer, "handshake rejected; closing connection");
                return;
            }
            Err(e) => {
                debug!(%peer, error = %e, "connection closed during handshake");
                return;
            }
        }
    }

    while let Ok(Some(line)) = lines.next_line().await {
        debug!(%peer, "client: {}", line);
    }
    debug!(%peer, "control connection closed");
}
