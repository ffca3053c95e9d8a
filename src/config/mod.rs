// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::transform::TransformConfig;

pub mod logging;
pub mod resolver;
pub mod store;

pub use logging::{LogFormat, LoggingConfig};
pub use resolver::ResolverConfig;
pub use store::{LinkStoreBackend, LinkStoreConfig, StoreBackend, StoreConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub linkstore: LinkStoreConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;
        self.linkstore.validate()?;
        self.transform.validate()?;
        // persisted links must name blobs that survive a restart
        if self.store.backend == StoreBackend::Memory
            && self.linkstore.backend == LinkStoreBackend::Log
        {
            return Err(
                "memory store cannot back a persistent log linkstore; use the fs store or a memory linkstore"
                    .to_string(),
            );
        }
        Ok(())
    }
}
