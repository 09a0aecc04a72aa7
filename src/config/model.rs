// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Placeholder substituted with the referral token in `download.url_template`.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [install]
/// root = "/sdcard/sl4a"
///
/// [download]
/// url_template = "https://seattlegeni.cs.washington.edu/geni/download/{token}/seattle_win.zip"
/// fallback_token = "flibble"
///
/// [interpreter]
/// binary = "python"
///
/// [proxy]
/// host = "127.0.0.1"
/// require_handshake = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawInstallerConfig {
    #[serde(default)]
    pub install: InstallSection,

    #[serde(default)]
    pub download: DownloadSection,

    #[serde(default)]
    pub interpreter: InterpreterSection,

    #[serde(default)]
    pub proxy: ProxySection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawInstallerConfig>`.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    install: InstallSection,
    download: DownloadSection,
    interpreter: InterpreterSection,
    proxy: ProxySection,
}

impl InstallerConfig {
    pub(crate) fn new_unchecked(raw: RawInstallerConfig) -> Self {
        Self {
            install: raw.install,
            download: raw.download,
            interpreter: raw.interpreter,
            proxy: raw.proxy,
        }
    }

    pub fn install(&self) -> &InstallSection {
        &self.install
    }

    pub fn download(&self) -> &DownloadSection {
        &self.download
    }

    pub fn interpreter(&self) -> &InterpreterSection {
        &self.interpreter
    }

    pub fn proxy(&self) -> &ProxySection {
        &self.proxy
    }

    /// Install root, i.e. where the archive lands and gets unpacked.
    pub fn root(&self) -> &Path {
        &self.install.root
    }
}

/// `[install]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("/sdcard/sl4a")
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSection {
    /// Source URL with a `{token}` placeholder for the referral token.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Token used when the referral lookup yields nothing.
    #[serde(default = "default_fallback_token")]
    pub fallback_token: String,
}

fn default_url_template() -> String {
    "https://seattlegeni.cs.washington.edu/geni/download/{token}/seattle_win.zip".to_string()
}

fn default_fallback_token() -> String {
    "flibble".to_string()
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            fallback_token: default_fallback_token(),
        }
    }
}

/// `[interpreter]` section: the external interpreter that runs the
/// installer script.
#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterSection {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Human readable name used in logs.
    #[serde(default = "default_interpreter_name")]
    pub name: String,

    /// Command used when the interpreter is started interactively.
    /// Empty means "no command argument".
    #[serde(default)]
    pub interactive_command: String,

    /// Arguments always passed to the interpreter, before the command.
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Extra environment for every interpreter process.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("python")
}

fn default_interpreter_name() -> String {
    "Python".to_string()
}

impl Default for InterpreterSection {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            name: default_interpreter_name(),
            interactive_command: String::new(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
        }
    }
}

/// `[proxy]` section: the local control-plane endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySection {
    #[serde(default = "default_proxy_host")]
    pub host: String,

    /// If true, a random secret is generated for every endpoint and
    /// clients must present it as their first line.
    #[serde(default = "default_require_handshake")]
    pub require_handshake: bool,
}

fn default_proxy_host() -> String {
    "127.0.0.1".to_string()
}

fn default_require_handshake() -> bool {
    true
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            host: default_proxy_host(),
            require_handshake: default_require_handshake(),
        }
    }
}
