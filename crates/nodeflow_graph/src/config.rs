// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Graph`](crate::Graph)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Upper bound on deliveries within one propagation pass
    pub max_deliveries_per_pass: usize,
    /// Whether suppressed cycle deliveries are logged at `warn`
    pub log_cycles: bool,
    /// Whether a node in the `Error` state propagates empty outputs
    /// regardless of what it reports from `out_data`
    pub invalidate_on_error: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_deliveries_per_pass: 100_000,
            log_cycles: true,
            invalidate_on_error: true,
        }
    }
}

impl GraphConfig {
    /// Set the delivery bound
    pub fn with_max_deliveries(mut self, max: usize) -> Self {
        self.max_deliveries_per_pass = max;
        self
    }

    /// Parse a configuration from RON, missing fields take their defaults
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = GraphConfig::from_ron("(log_cycles: false)").unwrap();
        assert!(!config.log_cycles);
        assert!(config.invalidate_on_error);
        assert_eq!(config.max_deliveries_per_pass, 100_000);
    }
}
