use crate::sink::OutcomeSink;
use crate::CallbackConfig;
use agriscan_auth_core::{ExchangeOutcome, FailureReason, SessionUser};

/// Where the redirect context sends the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Sign-in succeeded.
    Destination(String),
    /// An exchange was attempted and failed.
    Error(FailureReason),
    /// No flow matched at all.
    Home,
}

impl RedirectTarget {
    /// Map an outcome to its redirect target.
    ///
    /// A callback with no recognised parameters goes home rather than to the error
    /// page.
    pub fn for_outcome(outcome: &ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::Authenticated { destination, .. } => {
                RedirectTarget::Destination(destination.clone())
            }
            ExchangeOutcome::Failed { reason, .. } => Self::for_failure(*reason),
        }
    }

    fn for_failure(reason: FailureReason) -> Self {
        match reason {
            FailureReason::NoMatch => RedirectTarget::Home,
            reason => RedirectTarget::Error(reason),
        }
    }

    /// The `Location` value for this target.
    ///
    /// Failures only carry the reason code, never the provider's diagnostic.
    pub fn location(&self, config: &CallbackConfig) -> String {
        match self {
            RedirectTarget::Destination(destination) => destination.clone(),
            RedirectTarget::Error(reason) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("message", reason.code())
                    .finish();
                format!("{}?{}", config.error_path, query)
            }
            RedirectTarget::Home => config.home_path.clone(),
        }
    }
}

/// Redirect-capable sink producing the target of the response.
pub struct RedirectSink;

impl OutcomeSink for RedirectSink {
    type Output = RedirectTarget;

    fn authenticated(&mut self, _session_user: SessionUser, destination: String) -> RedirectTarget {
        RedirectTarget::Destination(destination)
    }

    fn failed(&mut self, reason: FailureReason, diagnostic_message: String) -> RedirectTarget {
        tracing::debug!(reason = reason.code(), diagnostic = %diagnostic_message, "Redirecting failed callback");
        RedirectTarget::for_failure(reason)
    }
}
