use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Catalog lookup configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    /// Maximum time, in milliseconds, to wait for a catalog lookup before the
    /// in-flight request is cancelled and its waiters fail with a timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl CatalogConfig {
    /// Default catalog request timeout in milliseconds.
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

    /// Validates catalog configuration settings.
    ///
    /// Ensures request_timeout_ms is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "catalog.request_timeout_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    CatalogConfig::DEFAULT_REQUEST_TIMEOUT_MS
}
