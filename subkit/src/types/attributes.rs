use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single subscriber attribute to sync with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberAttribute {
    /// Attribute key, for example `$email`.
    pub key: String,
    /// Attribute value.
    pub value: String,
    /// When the attribute was set on the device.
    pub set_time: DateTime<Utc>,
}

impl SubscriberAttribute {
    /// Creates an attribute stamped with the current time.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            set_time: Utc::now(),
        }
    }
}
