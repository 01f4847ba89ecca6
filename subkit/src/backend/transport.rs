use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

use crate::bail;
use crate::error::{ErrorKind, SubkitResult};

/// Method of a backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One backend request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Path relative to the backend base URL.
    pub path: String,
    /// JSON body for post requests.
    pub body: Option<Value>,
}

impl Request {
    /// Creates a GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Creates a POST request for `path` carrying `body`.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// One backend response: status code plus parsed JSON body.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Parsed JSON body. Empty object for bodyless responses.
    pub body: Value,
}

impl Response {
    /// Creates a successful response carrying `body`.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Whether the status is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body into `T` after checking for a success status.
    pub fn decode<T: DeserializeOwned>(self) -> SubkitResult<T> {
        if !self.is_success() {
            bail!(
                ErrorKind::UnexpectedBackendResponse,
                "Backend returned a non-success status",
                format!("status {}", self.status)
            );
        }

        Ok(serde_json::from_value(self.body)?)
    }
}

/// Opaque asynchronous client the SDK performs backend requests through.
///
/// Implementations own request signing, retries, and the actual I/O. The
/// coalescing layer guarantees at most one logical `perform` invocation per
/// in-flight cache key.
pub trait Transport: Send + Sync + 'static {
    /// Performs one request, resolving with the response or a transport
    /// failure.
    fn perform(&self, request: Request) -> impl Future<Output = SubkitResult<Response>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rejects_non_success_status() {
        let response = Response {
            status: 503,
            body: json!({}),
        };
        let result: SubkitResult<Value> = response.decode();
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::UnexpectedBackendResponse
        );
    }

    #[test]
    fn test_decode_reports_malformed_bodies() {
        let response = Response::ok(json!({"unexpected": true}));
        let result: SubkitResult<crate::types::CustomerInfo> = response.decode();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::DeserializationError);
    }
}
