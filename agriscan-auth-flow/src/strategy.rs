use crate::flow::{safe_destination, FlowKind};
use crate::CallbackConfig;
use agriscan_auth_core::{AuthError, ExchangeOutcome, FailureReason, OtpType, SessionService, SessionUser};

/// Diagnostic reported when a callback carried no usable parameters.
pub const NO_MATCH_DIAGNOSTIC: &str =
    "No verification tokens or access tokens found in URL fragment or query parameters.";

/// Run the strategy selected by `flow`.
///
/// Exactly one session-service call is made, except for [`FlowKind::NoMatch`] which
/// makes none. Errors are folded into [`ExchangeOutcome::Failed`]; nothing is retried.
pub async fn run<S>(
    service: &S,
    config: &CallbackConfig,
    flow: &FlowKind<'_>,
    code_verifier: Option<&str>,
) -> ExchangeOutcome
where
    S: SessionService + ?Sized,
{
    match *flow {
        FlowKind::Code { code, next } => {
            let destination = safe_destination(next, &config.default_destination);
            exchange_code(service, code, code_verifier, destination).await
        }
        FlowKind::TokenPair {
            access_token,
            refresh_token,
        } => install_token_pair(service, access_token, refresh_token, &config.default_destination).await,
        FlowKind::OneTimeToken {
            token_hash,
            otp_type,
        } => verify_one_time_token(service, token_hash, otp_type, &config.default_destination).await,
        FlowKind::NoMatch => no_match(),
    }
}

/// Authorization-code exchange. Honours `next`.
pub async fn exchange_code<S>(
    service: &S,
    code: &str,
    code_verifier: Option<&str>,
    destination: &str,
) -> ExchangeOutcome
where
    S: SessionService + ?Sized,
{
    let result = service.exchange_code_for_session(code, code_verifier).await;
    settle(
        "exchange_code_for_session",
        result,
        destination,
        FailureReason::ExchangeFailed,
        FailureReason::ExchangeException,
    )
}

/// Token-pair installation. Always lands on the default destination.
pub async fn install_token_pair<S>(
    service: &S,
    access_token: &str,
    refresh_token: Option<&str>,
    default_destination: &str,
) -> ExchangeOutcome
where
    S: SessionService + ?Sized,
{
    let result = service.set_session(access_token, refresh_token).await;
    settle(
        "set_session",
        result,
        default_destination,
        FailureReason::SetSessionFailed,
        FailureReason::SetSessionException,
    )
}

/// One-time-token verification. Always lands on the default destination.
pub async fn verify_one_time_token<S>(
    service: &S,
    token_hash: &str,
    otp_type: OtpType,
    default_destination: &str,
) -> ExchangeOutcome
where
    S: SessionService + ?Sized,
{
    let result = service.verify_one_time_token(token_hash, otp_type).await;
    settle(
        "verify_one_time_token",
        result,
        default_destination,
        FailureReason::VerifyFailed,
        FailureReason::VerifyException,
    )
}

/// The fallback when no trigger matched.
pub fn no_match() -> ExchangeOutcome {
    tracing::warn!("No auth params found in callback");
    ExchangeOutcome::Failed {
        reason: FailureReason::NoMatch,
        diagnostic_message: NO_MATCH_DIAGNOSTIC.to_string(),
    }
}

fn settle(
    operation: &'static str,
    result: Result<SessionUser, AuthError>,
    destination: &str,
    rejected: FailureReason,
    exception: FailureReason,
) -> ExchangeOutcome {
    match result {
        Ok(session_user) => {
            tracing::info!(operation, user_id = %session_user.id, destination, "Session established");
            ExchangeOutcome::Authenticated {
                session_user,
                destination: destination.to_string(),
            }
        }
        Err(err) => {
            let reason = if err.is_service_rejection() {
                rejected
            } else {
                exception
            };
            tracing::error!(operation, reason = reason.code(), error = %err, "Callback exchange failed");
            ExchangeOutcome::Failed {
                reason,
                diagnostic_message: err.to_string(),
            }
        }
    }
}
