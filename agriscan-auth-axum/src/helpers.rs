use crate::{DynResolver, SessionCookieConfig};
use agriscan_auth_core::{CallbackParameters, FailureReason, SessionUser};
use agriscan_auth_flow::{CallbackConfig, OutcomeSink, RedirectSink, RedirectTarget};
use axum::{
    extract::{Query, RawQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_cookies::{Cookie, Cookies};

/// Query of the error page.
#[derive(Debug, serde::Deserialize)]
pub struct ErrorPageParams {
    /// Reason code of the failed callback.
    pub message: Option<String>,
}

/// Build a session cookie from the configuration.
pub fn create_session_cookie(
    config: &SessionCookieConfig,
    name: String,
    value: String,
    max_age_secs: Option<i64>,
) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .path(config.path.clone())
        .secure(config.secure)
        .http_only(config.http_only)
        .same_site(config.same_site);

    let max_age = max_age_secs.or_else(|| config.max_age.map(|d| d.num_seconds()));
    if let Some(secs) = max_age {
        builder = builder.max_age(tower_cookies::cookie::time::Duration::seconds(secs));
    }
    builder.build()
}

/// Redirect-capable sink that also installs the session cookies.
pub struct AxumRedirectSink<'a> {
    cookies: Cookies,
    cookie_config: &'a SessionCookieConfig,
    callback_config: &'a CallbackConfig,
}

impl<'a> AxumRedirectSink<'a> {
    /// Create a sink writing cookies to `cookies`.
    pub fn new(
        cookies: Cookies,
        cookie_config: &'a SessionCookieConfig,
        callback_config: &'a CallbackConfig,
    ) -> Self {
        Self {
            cookies,
            cookie_config,
            callback_config,
        }
    }

    fn redirect(&self, target: RedirectTarget) -> Response {
        Redirect::to(&target.location(self.callback_config)).into_response()
    }
}

impl OutcomeSink for AxumRedirectSink<'_> {
    type Output = Response;

    fn authenticated(&mut self, session_user: SessionUser, destination: String) -> Response {
        let SessionUser { tokens, .. } = session_user;
        let access_max_age = tokens.expires_in.and_then(|s| i64::try_from(s).ok());
        self.cookies.add(create_session_cookie(
            self.cookie_config,
            self.cookie_config.access_cookie.clone(),
            tokens.access_token,
            access_max_age,
        ));
        if let Some(refresh_token) = tokens.refresh_token {
            self.cookies.add(create_session_cookie(
                self.cookie_config,
                self.cookie_config.refresh_cookie.clone(),
                refresh_token,
                None,
            ));
        }

        self.redirect(RedirectTarget::Destination(destination))
    }

    fn failed(&mut self, reason: FailureReason, diagnostic_message: String) -> Response {
        let target = RedirectSink.failed(reason, diagnostic_message);
        self.redirect(target)
    }
}

/// `GET /auth/callback`: resolve the callback and redirect.
///
/// Only the query string reaches the server; fragment-delivered tokens are handled
/// by the client-side page.
pub async fn axum_callback_handler(
    State(resolver): State<Arc<DynResolver>>,
    State(cookie_config): State<SessionCookieConfig>,
    cookies: Cookies,
    RawQuery(query): RawQuery,
) -> Response {
    let params = CallbackParameters::collect(None, query.as_deref());
    tracing::info!(keys = ?params.keys(), "Auth callback received");

    let code_verifier = cookies
        .get(&cookie_config.code_verifier_cookie)
        .map(|c| c.value().to_string());

    let mut sink = AxumRedirectSink::new(cookies.clone(), &cookie_config, resolver.config());
    let response = resolver
        .complete(&params, code_verifier.as_deref(), &mut sink)
        .await;

    if code_verifier.is_some() {
        cookies.remove(
            Cookie::build((cookie_config.code_verifier_cookie.clone(), ""))
                .path(cookie_config.path.clone())
                .build(),
        );
    }

    response
}

/// `GET /auth/error`: explain a failed callback.
pub async fn axum_error_page_handler(Query(params): Query<ErrorPageParams>) -> Html<String> {
    let reason = params.message.as_deref().and_then(FailureReason::from_code);
    let explanation = match reason {
        Some(FailureReason::ExchangeFailed) => {
            "The sign-in link was rejected. It may have expired or already been used."
        }
        Some(FailureReason::SetSessionFailed) => {
            "Your session could not be restored. Please sign in again."
        }
        Some(FailureReason::VerifyFailed) => {
            "The email link is invalid or has expired. Request a new one and try again."
        }
        Some(
            FailureReason::ExchangeException
            | FailureReason::SetSessionException
            | FailureReason::VerifyException,
        ) => "We could not reach the sign-in service. Please try again in a moment.",
        Some(FailureReason::NoMatch) | None => "Something went wrong while signing you in.",
    };
    let code = reason.map(|r| r.code()).unwrap_or("unknown");

    Html(format!(
        "<h1>Authentication error</h1>\
         <p>{explanation}</p>\
         <p><small>Reason: {code}</small></p>\
         <p><a href=\"/\">Back to sign in</a></p>"
    ))
}
