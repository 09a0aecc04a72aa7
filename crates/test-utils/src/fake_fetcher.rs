use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seattle_installer::errors::{InstallerError, Result};
use seattle_installer::fetch::ArchiveFetcher;

#[derive(Debug, Clone)]
enum Behaviour {
    Serve(Vec<u8>),
    Fail(String),
}

/// A fake fetcher that:
/// - records every requested URL
/// - writes a fixed payload to the destination, or fails with a network error
/// - optionally sleeps first, so tests can observe the Downloading state.
#[derive(Debug, Clone)]
pub struct FakeFetcher {
    behaviour: Behaviour,
    delay: Option<Duration>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub fn serving(payload: Vec<u8>) -> Self {
        Self::with_behaviour(Behaviour::Serve(payload))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_behaviour(Behaviour::Fail(reason.to_string()))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            delay: None,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared view of requested URLs; stays valid after the fetcher is moved.
    pub fn requested(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requested)
    }
}

impl ArchiveFetcher for FakeFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>> {
        Box::pin(async move {
            self.requested.lock().unwrap().push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.behaviour {
                Behaviour::Serve(payload) => {
                    tokio::fs::write(destination, payload).await?;
                    Ok(payload.len() as u64)
                }
                Behaviour::Fail(reason) => Err(InstallerError::Network {
                    url: url.to_string(),
                    reason: reason.clone(),
                }),
            }
        })
    }
}
