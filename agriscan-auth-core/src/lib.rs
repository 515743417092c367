//! # AgriScan Auth Core
//!
//! `agriscan-auth-core` provides the foundational types and traits used to resolve
//! identity-provider callbacks. It defines the callback parameter mapping, the
//! session identity returned by the provider, the outcome of an exchange and the
//! [`SessionService`] abstraction over the provider's session-issuing backend.

#![warn(missing_docs)]

use async_trait::async_trait;

/// Errors that can occur while talking to the session service.
pub mod error;
pub use crate::error::AuthError;

/// Callback parameter collection from a URL's query string and fragment.
pub mod params;
pub use crate::params::CallbackParameters;

/// Session identities, one-time-token types and exchange outcomes.
pub mod state;
pub use crate::state::{ExchangeOutcome, FailureReason, OtpType, SessionTokens, SessionUser};

/// The session-issuing backend of the identity provider.
///
/// Each method corresponds to one credential-exchange entry point. Implementations
/// return `Err(AuthError::Service(_))` when the provider answered with an error
/// payload, and `Err(AuthError::Transport(_))` when the call itself failed.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Exchange an authorization code for a session.
    ///
    /// `code_verifier` is the PKCE verifier stored when the sign-in was initiated,
    /// if any.
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionUser, AuthError>;

    /// Install a session from an access token and an optional refresh token.
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionUser, AuthError>;

    /// Verify a one-time token hash for the given action type.
    async fn verify_one_time_token(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<SessionUser, AuthError>;
}

#[async_trait]
impl<T: SessionService + ?Sized> SessionService for std::sync::Arc<T> {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        (**self).exchange_code_for_session(code, code_verifier).await
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        (**self).set_session(access_token, refresh_token).await
    }

    async fn verify_one_time_token(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<SessionUser, AuthError> {
        (**self).verify_one_time_token(token_hash, otp_type).await
    }
}

#[async_trait]
impl<T: SessionService + ?Sized> SessionService for Box<T> {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        (**self).exchange_code_for_session(code, code_verifier).await
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        (**self).set_session(access_token, refresh_token).await
    }

    async fn verify_one_time_token(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<SessionUser, AuthError> {
        (**self).verify_one_time_token(token_hash, otp_type).await
    }
}
