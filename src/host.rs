// src/host.rs

//! Host resources reported to the installer script.

use std::path::Path;

use sysinfo::Disks;
use tracing::debug;

pub const ENV_AVAILABLE_CORES: &str = "SEATTLE_AVAILABLE_CORES";
pub const ENV_AVAILABLE_SPACE: &str = "SEATTLE_AVAILABLE_SPACE";

/// Processor count and free storage (bytes) of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cores: usize,
    pub free_space: u64,
}

impl HostResources {
    /// Query the host. Free space is taken from the disk whose mount point
    /// is the longest prefix of `path`; unknown values are reported as 0.
    pub fn probe(path: &Path) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();
        let free_space = disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            .unwrap_or(0);

        debug!(cores, free_space, path = %path.display(), "probed host resources");
        Self { cores, free_space }
    }

    /// Environment variables carrying these values, as decimal integers.
    pub fn environment(&self) -> [(&'static str, String); 2] {
        [
            (ENV_AVAILABLE_CORES, self.cores.to_string()),
            (ENV_AVAILABLE_SPACE, self.free_space.to_string()),
        ]
    }
}
