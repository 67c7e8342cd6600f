//! Shared error taxonomy for the data layer.
//!
//! Every fallible path in the transport gateway, query engine, and entity
//! controllers resolves to one of these kinds. Controllers surface all of
//! them as human-readable `error` strings except [`ApiError::Unauthorized`],
//! which is intercepted once at the gateway and never reaches controller
//! state.

/// Errors produced by the transport gateway, query engine, and API backends.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Transport unreachable or the connection dropped mid-flight.
    #[error("network failure: {0}")]
    Network(String),

    /// The fixed request timeout elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// Authorization failure (401-equivalent). Handled globally via the
    /// gateway's logout signal; controllers never store this in `error`.
    #[error("unauthorized")]
    Unauthorized,

    /// The requested identifier does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed filter or pagination arguments, or an invalid status
    /// transition.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// Fallback for anything the taxonomy does not name.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Whether this error should be written into a controller's `error`
    /// field. Unauthorized is the one kind handled out-of-band.
    pub fn is_surfaceable(&self) -> bool {
        !matches!(self, ApiError::Unauthorized)
    }
}
