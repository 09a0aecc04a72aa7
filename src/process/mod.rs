// src/process/mod.rs

//! External interpreter processes.
//!
//! - [`descriptor`] holds everything needed to spawn one process.
//! - [`launch`] builds descriptors for the two launch variants (interactive
//!   interpreter, script) and injects the control endpoint variables.
//! - [`launcher`] spawns a descriptor, supervises the child and resolves a
//!   one-shot exit future exactly once, whether the child exits on its own
//!   or is killed.

pub mod descriptor;
pub mod launch;
pub mod launcher;

pub use descriptor::ProcessDescriptor;
pub use launch::{InteractiveInterpreter, LaunchSpec, ScriptLaunch};
pub use launcher::{start, KillHandle, ProcessExit, RunningProcess};

/// Control endpoint host, injected into every interpreter process.
pub const ENV_PROXY_HOST: &str = "AP_HOST";
/// Control endpoint port.
pub const ENV_PROXY_PORT: &str = "AP_PORT";
/// Control endpoint handshake secret; only set when a secret exists.
pub const ENV_PROXY_HANDSHAKE: &str = "AP_HANDSHAKE";
