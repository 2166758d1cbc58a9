//! Collaborator errors.

use thiserror::Error;

/// Errors returned by the shop API collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator answered with an explicit `{ "error": ... }` body.
    #[error("{0}")]
    Rejected(String),

    /// Non-2xx response without an error body, or a body of the wrong shape.
    #[error("unexpected response from shop API: {0}")]
    UnexpectedResponse(String),
}
