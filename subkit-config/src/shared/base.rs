use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside its allowed range.
    #[error("`{field}` is invalid: {constraint}")]
    InvalidFieldValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable constraint that was violated.
        constraint: String,
    },
    /// The API key is empty.
    #[error("`api_key` must not be empty")]
    MissingApiKey,
}
