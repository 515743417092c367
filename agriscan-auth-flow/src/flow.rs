use agriscan_auth_core::params::{ACCESS_TOKEN, CODE, NEXT, REFRESH_TOKEN, TYPE};
use agriscan_auth_core::{CallbackParameters, OtpType};
use url::Url;

/// The credential exchange a callback calls for.
///
/// Variants are listed in priority order; [`FlowKind::classify`] commits to the first
/// whose trigger holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind<'a> {
    /// `code` is present: exchange the authorization code.
    Code {
        /// The authorization code.
        code: &'a str,
        /// Requested destination, unvalidated.
        next: Option<&'a str>,
    },
    /// `access_token` is present: install the token pair.
    TokenPair {
        /// The access token.
        access_token: &'a str,
        /// The refresh token, if any.
        refresh_token: Option<&'a str>,
    },
    /// `token_hash` (or `token`) and `type` are present: verify the one-time token.
    OneTimeToken {
        /// The token hash.
        token_hash: &'a str,
        /// The resolved token type.
        otp_type: OtpType,
    },
    /// Nothing recognisable.
    NoMatch,
}

impl<'a> FlowKind<'a> {
    /// Select the flow for the given parameters.
    pub fn classify(params: &'a CallbackParameters) -> Self {
        if let Some(code) = params.get_non_empty(CODE) {
            return FlowKind::Code {
                code,
                next: params.get_non_empty(NEXT),
            };
        }

        if let Some(access_token) = params.get_non_empty(ACCESS_TOKEN) {
            return FlowKind::TokenPair {
                access_token,
                refresh_token: params.get_non_empty(REFRESH_TOKEN),
            };
        }

        if let (Some(token_hash), Some(raw_type)) = (params.token_hash(), params.get_non_empty(TYPE)) {
            return FlowKind::OneTimeToken {
                token_hash,
                otp_type: OtpType::from_param(raw_type),
            };
        }

        FlowKind::NoMatch
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::Code { .. } => "code",
            FlowKind::TokenPair { .. } => "token_pair",
            FlowKind::OneTimeToken { .. } => "one_time_token",
            FlowKind::NoMatch => "no_match",
        }
    }
}

/// Origin `next` is resolved against; only the comparison matters.
const LOCAL_ORIGIN: &str = "http://localhost";

/// Accept `next` only when it is a same-origin absolute path.
pub(crate) fn safe_destination<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => default,
    }
}

// Browsers strip tabs and newlines when parsing a URL; refuse them before the origin check.
fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/') || path.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    let Ok(base) = Url::parse(LOCAL_ORIGIN) else {
        return false;
    };
    base.join(path)
        .map(|resolved| resolved.origin() == base.origin())
        .unwrap_or(false)
}
