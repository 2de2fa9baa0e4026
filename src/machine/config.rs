use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Execution limits for a [`Machine`](super::Machine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Maximum number of nested guest calls
    pub max_call_depth: usize,
    /// Maximum number of block dispatches across the machine's lifetime
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            max_call_depth: 1000,
            max_steps: None,
        }
    }
}

impl MachineConfig {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MachineConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config JSON: {}", e)))?;

        if config.max_call_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_call_depth must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}
