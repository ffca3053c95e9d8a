//! Storage configuration types.
//!
//! - `store`: where blobs live (memory or a directory of files)
//! - `linkstore`: where derived-artifact links live (memory or a log file)

use serde::{Deserialize, Serialize};

/// Content store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Fs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Blob directory for the fs backend
    #[serde(default = "default_store_root")]
    pub root: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root: default_store_root(),
        }
    }
}

fn default_store_root() -> String {
    "/var/lib/linkstore/blobs".to_string()
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::Fs && self.root.is_empty() {
            return Err("store root cannot be empty when the fs backend is selected".to_string());
        }
        Ok(())
    }
}

/// Linkstore backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStoreBackend {
    Memory,
    #[default]
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStoreConfig {
    #[serde(default)]
    pub backend: LinkStoreBackend,
    /// Log file for the log backend
    #[serde(default = "default_log_path")]
    pub path: String,
    /// Sync every log write to stable storage
    #[serde(default)]
    pub sync_writes: bool,
    /// Capacity of the memory backend
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for LinkStoreConfig {
    fn default() -> Self {
        Self {
            backend: LinkStoreBackend::default(),
            path: default_log_path(),
            sync_writes: false,
            max_entries: default_max_entries(),
        }
    }
}

fn default_log_path() -> String {
    "/var/lib/linkstore/links.log".to_string()
}

fn default_max_entries() -> u64 {
    100_000
}

impl LinkStoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            LinkStoreBackend::Log if self.path.is_empty() => {
                Err("linkstore path cannot be empty when the log backend is selected".to_string())
            }
            LinkStoreBackend::Memory if self.max_entries == 0 => {
                Err("linkstore max_entries must be greater than 0".to_string())
            }
            _ => Ok(()),
        }
    }
}
