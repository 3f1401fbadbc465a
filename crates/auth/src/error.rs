use std::time::Duration;

use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};
use eyre::Report;

/// Operational faults: the service or its secret-store dependency is
/// unusable. Client-input problems (missing, malformed or mismatched
/// signatures) are not errors — they are `RejectReason` values carried in
/// an `AuthDecision`, and must stay distinguishable from these in logs so
/// alerting fires on the service, not on bad clients.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Unexpected(#[from] Report),
    #[error("secret store request failed: {0}")]
    SecretStore(String),
    #[error("secret store request timed out after {0:?}")]
    FetchTimeout(Duration),
    #[error("master secret version {0} is empty")]
    EmptySecret(String),
    #[error("no active signing key available")]
    NoActiveKey,
}

/// Trait implementation to convert this error into an axum http response.
/// Bodies are deliberately generic — nothing about key versions or store
/// internals crosses the boundary.
impl AxumCoreIntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::SecretStore(_) | AuthError::FetchTimeout(_) | AuthError::NoActiveKey => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication is unavailable.",
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something wrong happened.",
            )
                .into_response(),
        }
    }
}
