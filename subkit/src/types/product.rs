use serde::{Deserialize, Serialize};

/// One purchasable product as reported by the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    /// Catalog identifier of the product.
    pub identifier: String,
    /// Localized display title.
    #[serde(default)]
    pub title: String,
    /// Price in micro-units of the currency (1_000_000 micros = 1 unit).
    pub price_amount_micros: i64,
    /// ISO 4217 currency code the price is denominated in.
    pub currency_code: String,
}

/// Introductory price eligibility for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntroEligibility {
    /// The subscriber can redeem the introductory price.
    Eligible,
    /// The subscriber already consumed the introductory price.
    Ineligible,
    /// The backend could not determine eligibility.
    Unknown,
}
