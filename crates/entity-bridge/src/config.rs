//! # Configuration
//!
//! [`BridgeConfig`] sizes the fixed slabs and sets the policy switches. Every
//! field has a default, so a config file only lists what it changes:
//!
//! ```json
//! { "deferred_capacity": 8192, "strict_contracts": false }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum number of live wrapper objects.
    pub max_objects: u32,
    /// Slots in the deferred creation queue.
    pub deferred_capacity: u32,
    /// Records in the destruction reclaim pool.
    pub reclaim_capacity: u32,
    /// World used by objects that do not name one.
    pub default_world: String,
    /// Panic on contract violations instead of only logging them.
    pub strict_contracts: bool,
    /// Despawn entities whose instance count reached zero during `flush`.
    pub sweep_unreferenced: bool,
    /// Label created entities with their object's name.
    pub label_entities: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_objects: 4096,
            deferred_capacity: 4096,
            reclaim_capacity: 1024,
            default_world: "Default".to_string(),
            strict_contracts: cfg!(debug_assertions),
            sweep_unreferenced: true,
            label_entities: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::debug!("loaded bridge config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
