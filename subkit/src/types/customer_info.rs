use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of a subscriber as reported by the backend.
///
/// The snapshot is immutable: refreshing produces a new value rather than
/// mutating an old one, so clones handed to concurrent waiters stay
/// consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// App user id the backend resolved for this subscriber.
    pub original_app_user_id: String,
    /// Entitlements keyed by entitlement identifier, active or expired.
    #[serde(default)]
    pub entitlements: HashMap<String, Entitlement>,
    /// Server time at which this snapshot was produced.
    pub request_date: DateTime<Utc>,
}

/// One entitlement granted to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Product that unlocked the entitlement.
    pub product_identifier: String,
    /// Expiry timestamp, absent for lifetime entitlements.
    #[serde(default)]
    pub expires_date: Option<DateTime<Utc>>,
}
