//! Domain types exchanged with the backend and the catalog.

mod attributes;
mod customer_info;
mod offerings;
mod product;

pub use attributes::SubscriberAttribute;
pub use customer_info::{CustomerInfo, Entitlement};
pub use offerings::{Offering, Offerings};
pub use product::{IntroEligibility, StoreProduct};
