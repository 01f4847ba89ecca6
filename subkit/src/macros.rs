//! Macros for SDK error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::SubkitError`] instances with reduced boilerplate.

/// Creates a [`crate::error::SubkitError`] from an error kind and description.
///
/// Accepts an optional dynamic detail and an optional source error:
/// `subkit_error!(kind, desc)`, `subkit_error!(kind, desc, detail)`,
/// `subkit_error!(kind, desc, source: err)`.
#[macro_export]
macro_rules! subkit_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::SubkitError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::SubkitError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::SubkitError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::SubkitError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::SubkitError`] from the current function.
///
/// Combines error creation with early return. Supports the same optional
/// detail and source arguments as [`subkit_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::subkit_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::subkit_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::subkit_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::subkit_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
