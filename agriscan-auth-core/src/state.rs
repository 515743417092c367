use serde::Serialize;
use std::fmt;

/// Provider-issued session tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// The access token.
    pub access_token: String,
    /// The refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<u64>,
}

/// The identity returned by the session service.
///
/// Opaque to the callback resolver beyond its presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Provider user identifier.
    pub id: String,
    /// Email address, when the provider shares it.
    pub email: Option<String>,
    /// Session tokens for this user.
    pub tokens: SessionTokens,
}

/// The action a one-time token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    /// Sign-up confirmation.
    Signup,
    /// Passwordless magic link.
    Magiclink,
    /// Password recovery.
    Recovery,
    /// Invitation acceptance.
    Invite,
    /// Generic email verification.
    Email,
    /// Email address change confirmation.
    EmailChange,
}

impl OtpType {
    /// Every accepted type.
    pub const ALL: [OtpType; 6] = [
        OtpType::Signup,
        OtpType::Magiclink,
        OtpType::Recovery,
        OtpType::Invite,
        OtpType::Email,
        OtpType::EmailChange,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::Signup => "signup",
            OtpType::Magiclink => "magiclink",
            OtpType::Recovery => "recovery",
            OtpType::Invite => "invite",
            OtpType::Email => "email",
            OtpType::EmailChange => "email_change",
        }
    }

    /// Resolve a raw `type` parameter, case-insensitively.
    ///
    /// Unknown values degrade to [`OtpType::Email`] instead of being rejected.
    pub fn from_param(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .unwrap_or(OtpType::Email)
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a callback did not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The provider rejected the authorization code.
    ExchangeFailed,
    /// The code exchange call failed.
    ExchangeException,
    /// The provider rejected the token pair.
    SetSessionFailed,
    /// The token pair installation call failed.
    SetSessionException,
    /// The provider rejected the one-time token.
    VerifyFailed,
    /// The one-time token verification call failed.
    VerifyException,
    /// No recognised authentication parameters were present.
    NoMatch,
}

impl FailureReason {
    /// Short machine-readable code, safe to put in a URL.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::ExchangeFailed => "exchange_failed",
            FailureReason::ExchangeException => "exchange_exception",
            FailureReason::SetSessionFailed => "set_session_failed",
            FailureReason::SetSessionException => "set_session_exception",
            FailureReason::VerifyFailed => "verify_failed",
            FailureReason::VerifyException => "verify_exception",
            FailureReason::NoMatch => "no_match",
        }
    }

    /// Look a reason up by its code.
    pub fn from_code(code: &str) -> Option<Self> {
        [
            FailureReason::ExchangeFailed,
            FailureReason::ExchangeException,
            FailureReason::SetSessionFailed,
            FailureReason::SetSessionException,
            FailureReason::VerifyFailed,
            FailureReason::VerifyException,
            FailureReason::NoMatch,
        ]
        .into_iter()
        .find(|r| r.code() == code)
    }

    /// Whether the call to the session service itself failed.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            FailureReason::ExchangeException
                | FailureReason::SetSessionException
                | FailureReason::VerifyException
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The result of exactly one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// A session was established.
    Authenticated {
        /// The signed-in user.
        session_user: SessionUser,
        /// Where to send the user next.
        destination: String,
    },
    /// No session was established.
    Failed {
        /// Machine-readable reason.
        reason: FailureReason,
        /// Human-readable diagnostic.
        diagnostic_message: String,
    },
}

impl ExchangeOutcome {
    /// Whether a session was established.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ExchangeOutcome::Authenticated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_otp_types_are_case_insensitive() {
        assert_eq!(OtpType::from_param("signup"), OtpType::Signup);
        assert_eq!(OtpType::from_param("MagicLink"), OtpType::Magiclink);
        assert_eq!(OtpType::from_param("EMAIL_CHANGE"), OtpType::EmailChange);
        assert_eq!(OtpType::from_param("recovery"), OtpType::Recovery);
        assert_eq!(OtpType::from_param("Invite"), OtpType::Invite);
    }

    #[test]
    fn unknown_otp_types_become_email() {
        assert_eq!(OtpType::from_param("BOGUS"), OtpType::Email);
        assert_eq!(OtpType::from_param("sms"), OtpType::Email);
        assert_eq!(OtpType::from_param(""), OtpType::Email);
    }

    #[test]
    fn otp_type_serializes_to_wire_name() {
        let json = serde_json::to_string(&OtpType::EmailChange).unwrap();
        assert_eq!(json, "\"email_change\"");
    }

    #[test]
    fn reason_codes_round_trip() {
        for code in [
            "exchange_failed",
            "exchange_exception",
            "set_session_failed",
            "set_session_exception",
            "verify_failed",
            "verify_exception",
            "no_match",
        ] {
            let reason = FailureReason::from_code(code).unwrap();
            assert_eq!(reason.code(), code);
        }
        assert_eq!(FailureReason::from_code("nope"), None);
    }

    #[test]
    fn only_call_failures_are_exceptions() {
        assert!(FailureReason::ExchangeException.is_exception());
        assert!(FailureReason::VerifyException.is_exception());
        assert!(!FailureReason::SetSessionFailed.is_exception());
        assert!(!FailureReason::NoMatch.is_exception());
    }
}
