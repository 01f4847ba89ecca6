//! The coalescing registry and cache-key derivation.
//!
//! Every backend request is identified by a [`CacheKey`]. Concurrent callers
//! whose requests derive the same key collapse into a single in-flight unit
//! of work; the [`CallbackCache`] records who is waiting and fans the shared
//! result out to all of them when the unit completes.

mod cache;
mod key;
mod response;

pub use cache::{CacheStatus, CallbackCache, Keyed};
pub use key::{CacheKey, content_hash, joined_identifiers};
pub use response::{Completion, ResponseCallback};
