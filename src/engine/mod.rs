// src/engine/mod.rs

//! Installation orchestration.
//!
//! This module ties together:
//! - the install request and the installer command line it produces
//!   ([`request`])
//! - the single-flight guard and job state ([`guard`])
//! - the background runner that sequences fetch, extract, configure,
//!   launch and verify ([`runner`])
//! - the public [`Installer`] facade ([`installer`])

pub mod guard;
pub mod installer;
pub mod request;
mod runner;

pub use crate::types::{InstallOutcome, JobState};
pub use guard::{ActiveJob, JobGuard};
pub use installer::{InstallTicket, Installer};
pub use request::{InstallRequest, DEFAULT_PERCENT};
