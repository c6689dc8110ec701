use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Gateway errors surfaced to the host or turned into a response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// CAS client failure (ticket validation, proxy ticket exchange).
    #[error("CAS error: {0}")]
    Protocol(String),

    /// Mail backend connection or login failed unexpectedly.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Credential(#[from] crate::error::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Protocol(_) | Self::Backend(_) => {
                tracing::error!(error = %self, "Upstream failure");
                (StatusCode::BAD_GATEWAY, "Upstream error").into_response()
            }
            Self::Config(_) | Self::Store(_) | Self::Credential(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
