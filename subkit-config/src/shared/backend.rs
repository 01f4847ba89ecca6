use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Backend request execution configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Maximum number of backend operations executing at the same time.
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,
    /// Upper bound, in milliseconds, for the random delay applied to
    /// background-triggered fetches. Zero disables jitter entirely.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
}

impl BackendConfig {
    /// Default maximum number of concurrently executing operations.
    pub const DEFAULT_MAX_CONCURRENT_OPERATIONS: usize = 4;

    /// Default upper bound for the background fetch jitter.
    pub const DEFAULT_JITTER_MAX_MS: u64 = 5000;

    /// Validates backend configuration settings.
    ///
    /// Ensures max_concurrent_operations is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_operations == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "backend.max_concurrent_operations".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: default_max_concurrent_operations(),
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

fn default_max_concurrent_operations() -> usize {
    BackendConfig::DEFAULT_MAX_CONCURRENT_OPERATIONS
}

fn default_jitter_max_ms() -> u64 {
    BackendConfig::DEFAULT_JITTER_MAX_MS
}
