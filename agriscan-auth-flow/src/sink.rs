use crate::flow::FlowKind;
use agriscan_auth_core::{ExchangeOutcome, FailureReason, SessionUser};

/// How an execution context signals the outcome of a callback.
///
/// The resolver calls [`OutcomeSink::begin`] once the flow is known and before the
/// session service is contacted, then exactly one of [`OutcomeSink::authenticated`]
/// or [`OutcomeSink::failed`].
pub trait OutcomeSink {
    /// What signalling the outcome produces (a response, a navigation record, ...).
    type Output;

    /// A flow was selected and is about to run.
    fn begin(&mut self, _flow: &FlowKind<'_>) {}

    /// A session was established.
    fn authenticated(&mut self, session_user: SessionUser, destination: String) -> Self::Output;

    /// No session was established.
    fn failed(&mut self, reason: FailureReason, diagnostic_message: String) -> Self::Output;

    /// Dispatch an outcome to the matching method.
    fn deliver(&mut self, outcome: ExchangeOutcome) -> Self::Output {
        match outcome {
            ExchangeOutcome::Authenticated {
                session_user,
                destination,
            } => self.authenticated(session_user, destination),
            ExchangeOutcome::Failed {
                reason,
                diagnostic_message,
            } => self.failed(reason, diagnostic_message),
        }
    }
}
