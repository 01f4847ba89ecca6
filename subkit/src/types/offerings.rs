use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All offerings configured for an app, plus which one is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offerings {
    /// Identifier of the offering to present by default, if any.
    #[serde(default)]
    pub current_offering_id: Option<String>,
    /// Offerings keyed by identifier.
    #[serde(default)]
    pub all: HashMap<String, Offering>,
}

impl Offerings {
    /// Returns the offering flagged as current, if configured and present.
    pub fn current(&self) -> Option<&Offering> {
        self.current_offering_id
            .as_deref()
            .and_then(|id| self.all.get(id))
    }
}

/// A named group of purchasable products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    /// Identifier of this offering.
    pub identifier: String,
    /// Display description configured server side.
    #[serde(default)]
    pub description: String,
    /// Product identifiers contained in this offering, used to prime the
    /// catalog fetcher before presenting a paywall.
    #[serde(default)]
    pub product_identifiers: Vec<String>,
}
