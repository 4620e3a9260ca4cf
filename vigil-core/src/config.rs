//! Runtime Configuration

use serde::{Deserialize, Serialize};

/// Settings that alter how a [`Runtime`](crate::reactive::Runtime) behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Whether notifications are deferred through an external scheduler.
    ///
    /// When false, `Dep::notify` sorts its subscribers by ascending id so
    /// parents are notified before children.
    pub async_updates: bool,

    /// Whether developer warnings are emitted at all.
    pub warnings: bool,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Configuration for hosts that deliver notifications synchronously.
    pub fn synchronous() -> Self {
        Self {
            async_updates: false,
            ..Self::default()
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            async_updates: true,
            warnings: true,
        }
    }
}
