use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::shared::{BackendConfig, CatalogConfig, ValidationError};

/// Top-level configuration for a subkit SDK instance.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking the API key into serialized forms.
#[derive(Clone, Debug, Deserialize)]
pub struct SdkConfig {
    /// API key used to authenticate against the backend.
    pub api_key: SecretString,
    /// Backend request execution configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Catalog lookup configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl SdkConfig {
    /// Creates a configuration with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            backend: BackendConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }

    /// Validates the whole configuration tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingApiKey);
        }

        self.backend.validate()?;
        self.catalog.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_with_key_is_valid() {
        let config = SdkConfig::new("appl_xyz");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let config = SdkConfig::new("   ");
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingApiKey)
        ));
    }

    #[test]
    fn test_nested_validation_is_propagated() {
        let mut config = SdkConfig::new("appl_xyz");
        config.catalog.request_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
