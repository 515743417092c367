use thiserror::Error;

/// Errors returned by a [`SessionService`](crate::SessionService).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The provider completed the call but rejected it with an error payload.
    #[error("{0}")]
    Service(String),
    /// The call itself failed (network failure, unreadable response).
    #[error("Transport error: {0}")]
    Transport(String),
    /// The service is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the provider itself rejected the request, as opposed to the call failing.
    pub fn is_service_rejection(&self) -> bool {
        matches!(self, AuthError::Service(_))
    }
}
