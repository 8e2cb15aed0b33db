use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default maximum number of pinned conversations per filter.
pub const DEFAULT_PINNED_LIMIT: usize = 100;

/// Tunables of a [`FilterStore`](crate::FilterStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterStoreConfig {
    /// Maximum number of pinned conversations a single filter may hold.
    pub pinned_limit: usize,
    /// Whether conversations of the archived folder take part in the full
    /// membership scans triggered by a change of a filter's rules.
    pub scan_archived: bool,
}

impl Default for FilterStoreConfig {
    fn default() -> Self {
        Self { pinned_limit: DEFAULT_PINNED_LIMIT, scan_archived: true }
    }
}

impl FilterStoreConfig {
    /// Create a configuration with the given pinned limit and the default
    /// value for everything else.
    pub fn with_pinned_limit(pinned_limit: usize) -> Self {
        Self { pinned_limit, ..Default::default() }
    }

    /// Check that the configuration can be used by a store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pinned_limit == 0 {
            return Err(ConfigError::ZeroPinnedLimit);
        }

        Ok(())
    }
}
