//! # AgriScan Auth Axum
//!
//! Redirect execution context for identity-provider callbacks. Mount
//! [`CallbackAxumExt::axum_router`] behind a [`tower_cookies::CookieManagerLayer`].

#![warn(missing_docs)]

pub use agriscan_auth_core::SessionService;
pub use agriscan_auth_flow::{CallbackConfig, CallbackResolver};
use axum::extract::FromRef;
use std::sync::Arc;
pub use tower_cookies::cookie::SameSite;
pub use tower_cookies::Cookie;

/// Handlers, cookie helpers and the redirect sink.
pub mod helpers;

pub use helpers::*;

/// A resolver over a type-erased session service.
pub type DynResolver = CallbackResolver<Arc<dyn SessionService>>;

/// Cookies used to carry the provider session after a redirect.
#[derive(Debug, Clone)]
pub struct SessionCookieConfig {
    /// Cookie holding the access token.
    pub access_cookie: String,
    /// Cookie holding the refresh token.
    pub refresh_cookie: String,
    /// Cookie holding the PKCE verifier written when sign-in started.
    pub code_verifier_cookie: String,
    /// Cookie path.
    pub path: String,
    /// Whether cookies are only sent over HTTPS.
    pub secure: bool,
    /// Whether cookies are hidden from scripts.
    pub http_only: bool,
    /// Cross-site policy.
    pub same_site: SameSite,
    /// Lifetime of cookies the provider gave no lifetime for.
    pub max_age: Option<chrono::Duration>,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            code_verifier_cookie: "sb-code-verifier".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Some(chrono::Duration::days(7)),
        }
    }
}

/// Application state for the callback routes.
#[derive(Clone)]
pub struct CallbackState {
    /// The shared resolver.
    pub resolver: Arc<DynResolver>,
    /// Session cookie settings.
    pub cookies: SessionCookieConfig,
}

impl CallbackState {
    /// Wrap `resolver` with default cookie settings.
    pub fn new(resolver: DynResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cookies: SessionCookieConfig::default(),
        }
    }
}

impl FromRef<CallbackState> for Arc<DynResolver> {
    fn from_ref(state: &CallbackState) -> Self {
        state.resolver.clone()
    }
}

impl FromRef<CallbackState> for SessionCookieConfig {
    fn from_ref(state: &CallbackState) -> Self {
        state.cookies.clone()
    }
}

/// Mounts the callback and error routes.
pub trait CallbackAxumExt {
    /// Routes: `GET /auth/callback` and `GET /auth/error`.
    fn axum_router<AppState>(&self) -> axum::Router<AppState>
    where
        AppState: Clone + Send + Sync + 'static,
        Arc<DynResolver>: FromRef<AppState>,
        SessionCookieConfig: FromRef<AppState>;
}

impl CallbackAxumExt for DynResolver {
    fn axum_router<AppState>(&self) -> axum::Router<AppState>
    where
        AppState: Clone + Send + Sync + 'static,
        Arc<DynResolver>: FromRef<AppState>,
        SessionCookieConfig: FromRef<AppState>,
    {
        use axum::routing::get;
        axum::Router::new()
            .route("/auth/callback", get(helpers::axum_callback_handler))
            .route(&self.config().error_path, get(helpers::axum_error_page_handler))
    }
}
