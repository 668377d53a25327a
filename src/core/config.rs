//! Batch run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Configuration shared by every batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Progress slot key; repeated reports with the same key update one slot
    pub progress_key: String,
    /// Title shown with every progress report
    pub progress_title: String,
    /// Attach captured backtraces to logged unit failures
    pub log_backtraces: bool,
    /// Maximum number of units a streaming world keeps loaded
    pub cache_capacity: usize,
    /// Write streamed units back to disk when they are released
    pub save_on_release: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            progress_key: "mass-edit".to_string(),
            progress_title: "Mass Terrain Edit".to_string(),
            log_backtraces: true,
            cache_capacity: 8,
            save_on_release: true,
        }
    }
}

impl BatchConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: BatchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be at least 1".into()));
        }
        if self.progress_key.is_empty() {
            return Err(Error::Config("progress_key must not be empty".into()));
        }
        Ok(())
    }
}
