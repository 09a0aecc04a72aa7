#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use seattle_installer::config::{InstallerConfig, RawInstallerConfig};
use seattle_installer::layout::{INSTALLER_SCRIPT, MAIN_ARTIFACT, REPY_DIR, SEATTLE_DIR};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

enum Entry {
    File {
        name: String,
        contents: Vec<u8>,
        mode: Option<u32>,
    },
    Dir(String),
}

/// Builder for ZIP archives used as install payloads.
///
/// Entries are stored uncompressed and written in insertion order.
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An archive shaped like a real release: the installer script inside
    /// `seattle/seattle_repy/` next to the node manager entry point.
    pub fn seattle(script_body: &str) -> Self {
        let repy = format!("{SEATTLE_DIR}/{REPY_DIR}");
        Self::new()
            .dir(&format!("{SEATTLE_DIR}/"))
            .dir(&format!("{repy}/"))
            .file(&format!("{repy}/{INSTALLER_SCRIPT}"), script_body)
            .file(&format!("{repy}/{MAIN_ARTIFACT}"), "# node manager\n")
    }

    pub fn file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            contents: contents.as_ref().to_vec(),
            mode: None,
        });
        self
    }

    pub fn file_with_mode(mut self, name: &str, contents: impl AsRef<[u8]>, mode: u32) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            contents: contents.as_ref().to_vec(),
            mode: Some(mode),
        });
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(Entry::Dir(name.to_string()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(&mut cursor);
        cursor.into_inner()
    }

    pub fn write_to(&self, path: &Path) {
        let mut file = File::create(path).expect("create archive file");
        self.write(&mut file);
    }

    fn write<W: Write + Seek>(&self, sink: &mut W) {
        let mut zip = ZipWriter::new(sink);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for entry in &self.entries {
            match entry {
                Entry::File {
                    name,
                    contents,
                    mode,
                } => {
                    let options = match mode {
                        Some(mode) => stored.unix_permissions(*mode),
                        None => stored,
                    };
                    zip.start_file(name.as_str(), options)
                        .expect("start archive entry");
                    zip.write_all(contents).expect("write archive entry");
                }
                Entry::Dir(name) => {
                    zip.add_directory(name.as_str(), stored)
                        .expect("add archive directory");
                }
            }
        }
        zip.finish().expect("finish archive");
    }
}

/// Builder for `InstallerConfig` rooted in a test directory.
///
/// Defaults to `sh` as the interpreter so installer scripts in tests are
/// plain shell scripts.
pub struct InstallerConfigBuilder {
    config: RawInstallerConfig,
}

impl InstallerConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut config = RawInstallerConfig::default();
        config.install.root = root.into();
        config.interpreter.binary = PathBuf::from("sh");
        config.interpreter.name = "sh".to_string();
        Self { config }
    }

    pub fn with_url_template(mut self, template: &str) -> Self {
        self.config.download.url_template = template.to_string();
        self
    }

    pub fn with_fallback_token(mut self, token: &str) -> Self {
        self.config.download.fallback_token = token.to_string();
        self
    }

    pub fn with_interpreter(mut self, binary: &str) -> Self {
        self.config.interpreter.binary = PathBuf::from(binary);
        self
    }

    pub fn with_interpreter_arg(mut self, arg: &str) -> Self {
        self.config.interpreter.arguments.push(arg.to_string());
        self
    }

    pub fn with_interpreter_env(mut self, key: &str, value: &str) -> Self {
        self.config
            .interpreter
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_interactive_command(mut self, command: &str) -> Self {
        self.config.interpreter.interactive_command = command.to_string();
        self
    }

    pub fn with_handshake(mut self, required: bool) -> Self {
        self.config.proxy.require_handshake = required;
        self
    }

    pub fn raw(self) -> RawInstallerConfig {
        self.config
    }

    pub fn build(self) -> InstallerConfig {
        InstallerConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
