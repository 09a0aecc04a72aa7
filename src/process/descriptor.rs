// src/process/descriptor.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Description of an external process: what to run, with which arguments,
/// environment and working directory.
///
/// The command line is `binary arguments... [command] extra...`, where
/// `command` is skipped when empty and `extra` are the arguments appended
/// at start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    binary: PathBuf,
    name: String,
    command: String,
    arguments: Vec<String>,
    environment: BTreeMap<String, String>,
    working_directory: PathBuf,
    inherit_stdio: bool,
}

impl ProcessDescriptor {
    pub fn new(binary: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            name: name.into(),
            command: String::new(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            working_directory: PathBuf::from("."),
            inherit_stdio: false,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn add_argument(&mut self, arg: impl Into<String>) {
        self.arguments.push(arg.into());
    }

    pub fn add_arguments<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Set a variable, replacing any previous value for the same name.
    pub fn put_environment_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(name.into(), value.into());
    }

    pub fn put_all_environment_variables<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.environment.insert(k.into(), v.into());
        }
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn set_working_directory(&mut self, dir: impl Into<PathBuf>) {
        self.working_directory = dir.into();
    }

    /// Whether the child shares this process's stdin/stdout/stderr instead
    /// of having its output captured into the log.
    pub fn inherits_stdio(&self) -> bool {
        self.inherit_stdio
    }

    pub fn set_inherit_stdio(&mut self, inherit: bool) {
        self.inherit_stdio = inherit;
    }

    /// Full argument vector (without the binary) for a start with `extra`
    /// appended arguments.
    pub fn command_line(&self, extra: &[String]) -> Vec<String> {
        let mut argv = self.arguments.clone();
        if !self.command.is_empty() {
            argv.push(self.command.clone());
        }
        argv.extend(extra.iter().cloned());
        argv
    }
}
