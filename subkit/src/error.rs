//! Error types and result definitions for SDK operations.
//!
//! Provides one error type with classification and captured diagnostic
//! metadata. [`SubkitError`] is cheap to clone, which matters because the
//! coalescing layer produces a single result value and fans a clone of it out
//! to every registered waiter.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for SDK operations using [`SubkitError`] as the error type.
pub type SubkitResult<T> = Result<T, SubkitError>;

/// Detailed payload stored inside [`SubkitError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for SDK operations.
///
/// Carries an [`ErrorKind`] for classification, a static description, an
/// optional dynamic detail, an optional source error, and the callsite where
/// the error was created. The source is stored behind an [`Arc`] so the whole
/// error stays [`Clone`].
#[derive(Debug, Clone)]
pub struct SubkitError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur in the SDK.
///
/// The kinds are organized by failure origin so callers can distinguish "the
/// server said no" ([`ErrorKind::TransportFailed`]) from "no answer yet"
/// ([`ErrorKind::RequestTimedOut`]) from a locally synthesized cancellation.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Transport Errors
    TransportFailed,
    UnexpectedBackendResponse,

    // Request Lifecycle Errors
    RequestTimedOut,
    OperationCanceled,

    // Identity Errors
    MissingAppUserId,

    // Catalog Errors
    CatalogRequestFailed,

    // Configuration & Data Errors
    ConfigError,
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl SubkitError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`SubkitError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let location = Location::caller();
        let backtrace = Arc::new(Backtrace::capture());

        SubkitError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location,
                backtrace,
            },
        }
    }
}

impl PartialEq for SubkitError {
    /// Two errors compare equal when they share the same [`ErrorKind`].
    ///
    /// Location, detail, source, and backtrace are intentionally excluded so
    /// that tests can compare against an expected kind without reproducing
    /// callsite metadata.
    fn eq(&self, other: &SubkitError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for SubkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.payload.detail.as_deref() {
            if detail.trim().is_empty() {
                write!(f, "\n  Detail: <empty>")?;
            } else {
                write!(f, "\n  Detail:")?;
                for line in detail.lines() {
                    if line.is_empty() {
                        write!(f, "\n  ")?;
                    } else {
                        write!(f, "\n    {line}")?;
                    }
                }
            }
        }

        Ok(())
    }
}

impl error::Error for SubkitError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`SubkitError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SubkitError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SubkitError {
        SubkitError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SubkitError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SubkitError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SubkitError {
        SubkitError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`serde_json::Error`] to [`SubkitError`] with [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for SubkitError {
    #[track_caller]
    fn from(err: serde_json::Error) -> SubkitError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SubkitError::from_components(
            ErrorKind::DeserializationError,
            Cow::Borrowed("JSON deserialization failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
