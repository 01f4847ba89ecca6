use std::fmt;

use crate::callbacks::cache::Keyed;
use crate::callbacks::key::CacheKey;
use crate::error::SubkitResult;

/// Boxed one-shot completion invoked with the shared result of a request.
pub type Completion<T> = Box<dyn FnOnce(SubkitResult<T>) + Send + 'static>;

/// A registered waiter: the key it coalesces under plus its completion.
///
/// One value type serves every response shape; operations pick the response
/// type through the generic parameter (for example
/// `ResponseCallback<CustomerInfo>`).
pub struct ResponseCallback<T> {
    cache_key: CacheKey,
    completion: Completion<T>,
}

impl<T> ResponseCallback<T> {
    /// Creates a waiter for the request identified by `cache_key`.
    pub fn new(cache_key: CacheKey, completion: Completion<T>) -> Self {
        Self {
            cache_key,
            completion,
        }
    }

    /// Consumes the waiter, invoking its completion with `result`.
    pub fn complete(self, result: SubkitResult<T>) {
        (self.completion)(result)
    }
}

impl<T> Keyed for ResponseCallback<T> {
    fn cache_key(&self) -> &CacheKey {
        &self.cache_key
    }
}

impl<T> fmt::Debug for ResponseCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCallback")
            .field("cache_key", &self.cache_key)
            .finish()
    }
}
