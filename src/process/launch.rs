// src/process/launch.rs

use std::path::{Path, PathBuf};

use crate::config::InterpreterSection;
use crate::errors::{InstallerError, Result};
use crate::proxy::ProxyBinding;

use super::descriptor::ProcessDescriptor;
use super::{ENV_PROXY_HANDSHAKE, ENV_PROXY_HOST, ENV_PROXY_PORT};

/// A way of turning interpreter settings plus a bound control endpoint into
/// a concrete [`ProcessDescriptor`].
pub trait LaunchSpec {
    fn describe(self, binding: &ProxyBinding) -> Result<ProcessDescriptor>;
}

/// The interpreter started with its own interactive command, working in
/// the install root.
#[derive(Debug, Clone)]
pub struct InteractiveInterpreter<'a> {
    interpreter: &'a InterpreterSection,
    root: &'a Path,
}

impl<'a> InteractiveInterpreter<'a> {
    pub fn new(interpreter: &'a InterpreterSection, root: &'a Path) -> Self {
        Self { interpreter, root }
    }
}

impl LaunchSpec for InteractiveInterpreter<'_> {
    fn describe(self, binding: &ProxyBinding) -> Result<ProcessDescriptor> {
        let mut descriptor = interpreter_descriptor(self.interpreter, binding);
        descriptor.set_command(self.interpreter.interactive_command.clone());
        descriptor.set_working_directory(self.root);
        descriptor.set_inherit_stdio(true);
        Ok(descriptor)
    }
}

/// The interpreter running one script file from a caller-chosen directory.
#[derive(Debug, Clone)]
pub struct ScriptLaunch<'a> {
    interpreter: &'a InterpreterSection,
    script: PathBuf,
    working_directory: PathBuf,
}

impl<'a> ScriptLaunch<'a> {
    pub fn new(
        interpreter: &'a InterpreterSection,
        script: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interpreter,
            script: script.into(),
            working_directory: working_directory.into(),
        }
    }

    /// Run `script` from the directory that contains it.
    pub fn in_script_dir(interpreter: &'a InterpreterSection, script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let working_directory = script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(interpreter, script, working_directory)
    }
}

impl LaunchSpec for ScriptLaunch<'_> {
    fn describe(self, binding: &ProxyBinding) -> Result<ProcessDescriptor> {
        if !self.script.is_file() {
            return Err(InstallerError::LaunchPrecondition(self.script));
        }

        // The child runs from another directory; a relative script path
        // would no longer resolve there.
        let script = std::path::absolute(&self.script)?;

        let mut descriptor = interpreter_descriptor(self.interpreter, binding);
        descriptor.set_command(script.to_string_lossy().into_owned());
        descriptor.set_working_directory(self.working_directory);
        Ok(descriptor)
    }
}

/// Shared part of both variants: binary, fixed interpreter arguments, the
/// control endpoint variables, then interpreter-specific environment.
fn interpreter_descriptor(
    interpreter: &InterpreterSection,
    binding: &ProxyBinding,
) -> ProcessDescriptor {
    let mut descriptor = ProcessDescriptor::new(&interpreter.binary, &interpreter.name);
    descriptor.add_arguments(interpreter.arguments.iter().cloned());

    descriptor.put_environment_variable(ENV_PROXY_HOST, binding.host.clone());
    descriptor.put_environment_variable(ENV_PROXY_PORT, binding.port.to_string());
    if let Some(secret) = &binding.secret {
        descriptor.put_environment_variable(ENV_PROXY_HANDSHAKE, secret.clone());
    }

    descriptor.put_all_environment_variables(interpreter.environment.clone());
    descriptor
}
