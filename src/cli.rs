// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `seattle-installer`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seattle-installer",
    version,
    about = "Download, unpack and launch the Seattle node installer.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, built-in defaults are used.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SEATTLE_INSTALLER_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch the archive, unpack it and run the installer script.
    Install(InstallArgs),

    /// Report whether the node software is installed.
    Status,

    /// List the log files left behind by previous installs.
    Logs,

    /// Start the interpreter interactively inside the install root.
    Shell {
        /// Extra arguments passed to the interpreter.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    /// Percentage of device resources to donate.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percent: Option<u8>,

    /// Network interface the node may use. Repeat for several interfaces.
    #[arg(long = "iface", value_name = "NAME")]
    pub interfaces: Vec<String>,

    /// Free-form argument string appended to the installer command line.
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub extra_args: Option<String>,

    /// Referral token used in the download URL.
    #[arg(long, value_name = "TOKEN")]
    pub referral: Option<String>,

    /// Print the download URL and launch arguments without installing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
