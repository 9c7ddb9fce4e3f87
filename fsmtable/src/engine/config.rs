//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Output options applied when collating per-device tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep `Verbose` columns in formatted output.
    pub verbose: bool,

    /// Sort merged rows by their Key columns (`Host` first).
    pub sort: bool,
}

impl EngineConfig {
    /// Create a configuration with every option off.
    pub fn new() -> Self {
        Self::default()
    }
}
