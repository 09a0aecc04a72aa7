use std::fmt;

/// Run-state of an installation job.
///
/// ```text
/// Idle -> Downloading -> Extracting -> Configuring -> Launching -> Running -> Verifying -> {Succeeded, Failed}
/// any non-terminal state -> Failed
/// Succeeded | Failed -> Downloading   (next job)
/// ```
///
/// `Idle` is only seen before the first job; afterwards the slot keeps the
/// terminal state of the last job until a new one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    #[default]
    Idle,
    Downloading,
    Extracting,
    Configuring,
    Launching,
    Running,
    Verifying,
    Succeeded,
    Failed,
}

impl JobState {
    /// Succeeded and Failed end a job.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// True while a job occupies the single install slot.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != JobState::Idle
    }

    /// The state that follows `self` on the success path, if any.
    pub fn next(self) -> Option<JobState> {
        match self {
            JobState::Idle => Some(JobState::Downloading),
            JobState::Downloading => Some(JobState::Extracting),
            JobState::Extracting => Some(JobState::Configuring),
            JobState::Configuring => Some(JobState::Launching),
            JobState::Launching => Some(JobState::Running),
            JobState::Running => Some(JobState::Verifying),
            JobState::Verifying => Some(JobState::Succeeded),
            JobState::Succeeded | JobState::Failed => None,
        }
    }

    pub fn can_transition_to(self, to: JobState) -> bool {
        if self.is_active() && to == JobState::Failed {
            return true;
        }
        if self.is_terminal() && to == JobState::Downloading {
            return true;
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Downloading => "downloading",
            JobState::Extracting => "extracting",
            JobState::Configuring => "configuring",
            JobState::Launching => "launching",
            JobState::Running => "running",
            JobState::Verifying => "verifying",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result delivered to whoever started a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Failed,
}

impl InstallOutcome {
    pub fn terminal_state(self) -> JobState {
        match self {
            InstallOutcome::Installed => JobState::Succeeded,
            InstallOutcome::Failed => JobState::Failed,
        }
    }
}
