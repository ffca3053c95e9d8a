//! Resolver configuration types.

use serde::{Deserialize, Serialize};

fn default_race_on_hit() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Deadline for one resolution in milliseconds (0 = no deadline)
    #[serde(default)]
    pub timeout_ms: u64,
    /// Race a rebuild against the cached fetch on every cache hit (default: true).
    /// When disabled, a hit is fetched first and rebuilt only if the fetch fails.
    #[serde(default = "default_race_on_hit")]
    pub race_on_hit: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            race_on_hit: default_race_on_hit(),
        }
    }
}
