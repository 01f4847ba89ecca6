//! Units of work executed against the backend.
//!
//! Every backend request runs as a unit of work with an explicit lifecycle,
//! executed by a bounded-concurrency runner. Coalescing happens strictly
//! before submission: the factory consults the callback registry and only
//! creates a unit when no equivalent request is in flight.

pub mod factory;
pub mod get_customer_info;
pub mod get_intro_eligibility;
pub mod get_offerings;
pub mod post_attributes;
pub mod post_receipt;
pub mod runner;
pub mod work;

pub use factory::CacheableOperationFactory;
pub use runner::OperationRunner;
pub use work::{NetworkOperation, WorkItem, WorkState};
