// src/engine/guard.rs

//! Single-flight guard for installation jobs.
//!
//! [`JobGuard`] is the shared slot; [`ActiveJob`] is the token proving the
//! holder owns it. Releasing the token (explicitly or by dropping it) is the
//! only way the slot becomes free again, so every early return in the job
//! pipeline clears the guard.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::errors::{InstallerError, Result};
use crate::process::KillHandle;
use crate::types::{InstallOutcome, JobState};

#[derive(Debug, Default)]
struct JobSlot {
    state: JobState,
    job_id: u64,
    process: Option<KillHandle>,
    kill_requested: bool,
    last_outcome: Option<InstallOutcome>,
}

/// Shared install slot. Cheap to clone; all clones see the same slot.
#[derive(Debug, Clone, Default)]
pub struct JobGuard {
    slot: Arc<Mutex<JobSlot>>,
}

impl JobGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True while a job is in a non-terminal state.
    pub fn is_set(&self) -> bool {
        self.lock().state.is_active()
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    /// Outcome of the most recently finished job, if any.
    pub fn last_outcome(&self) -> Option<InstallOutcome> {
        self.lock().last_outcome
    }

    /// Claim the slot for a new job, moving it to `Downloading`.
    pub fn try_acquire(&self) -> Result<ActiveJob> {
        let mut slot = self.lock();
        if !slot.state.can_transition_to(JobState::Downloading) {
            debug!(job = slot.job_id, state = %slot.state, "install request rejected; job in flight");
            return Err(InstallerError::AlreadyInstalling);
        }

        slot.job_id += 1;
        slot.state = JobState::Downloading;
        slot.process = None;
        slot.kill_requested = false;

        info!(job = slot.job_id, "installation job started");
        Ok(ActiveJob {
            guard: self.clone(),
            id: slot.job_id,
            released: false,
        })
    }

    /// Route a kill request to the active job.
    ///
    /// - With a registered process, that process is killed.
    /// - During `Launching`, before the process is registered, the request
    ///   is remembered and applied on registration.
    /// - Otherwise (idle, or no process stage reached) nothing happens.
    ///
    /// Returns true if the request was delivered or remembered.
    pub fn kill(&self) -> bool {
        let mut slot = self.lock();
        if !slot.state.is_active() {
            debug!("kill requested with no active job; ignoring");
            return false;
        }

        if let Some(process) = &slot.process {
            info!(job = slot.job_id, state = %slot.state, "killing installer process");
            return process.kill();
        }

        if slot.state == JobState::Launching {
            info!(job = slot.job_id, "kill requested during launch; deferring until process starts");
            slot.kill_requested = true;
            return true;
        }

        debug!(job = slot.job_id, state = %slot.state, "kill requested before launch; nothing to kill");
        false
    }
}

/// Ownership of the install slot for one job.
#[derive(Debug)]
pub struct ActiveJob {
    guard: JobGuard,
    id: u64,
    released: bool,
}

impl ActiveJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.guard.state()
    }

    /// Move the job to `to`. Illegal transitions are logged and ignored.
    pub fn advance(&self, to: JobState) {
        let mut slot = self.guard.lock();
        let from = slot.state;
        if !from.can_transition_to(to) || to.is_terminal() {
            warn!(job = self.id, %from, %to, "ignoring invalid job transition");
            return;
        }
        slot.state = to;
        info!(job = self.id, %from, %to, "job state changed");
    }

    /// Make the running installer process reachable by [`JobGuard::kill`].
    pub fn register_process(&self, handle: KillHandle) {
        let mut slot = self.guard.lock();
        if slot.kill_requested {
            info!(job = self.id, "applying deferred kill request");
            slot.kill_requested = false;
            handle.kill();
        }
        slot.process = Some(handle);
    }

    /// End the job with `outcome` and free the slot.
    pub fn release(mut self, outcome: InstallOutcome) {
        self.release_inner(outcome);
    }

    fn release_inner(&mut self, outcome: InstallOutcome) {
        if self.released {
            return;
        }
        self.released = true;

        let mut slot = self.guard.lock();
        let terminal = outcome.terminal_state();
        info!(job = self.id, from = %slot.state, to = %terminal, "job finished");

        slot.last_outcome = Some(outcome);
        slot.process = None;
        slot.kill_requested = false;
        slot.state = terminal;
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        if !self.released {
            warn!(job = self.id, "job dropped without an outcome; marking failed");
            self.release_inner(InstallOutcome::Failed);
        }
    }
}
