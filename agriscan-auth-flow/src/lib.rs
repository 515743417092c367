//! # AgriScan Auth Flow
//!
//! `agriscan-auth-flow` decides which credential exchange an identity-provider
//! callback calls for, runs it against a [`SessionService`] and hands the result to
//! an [`OutcomeSink`].
//!
//! ## Key Components
//!
//! - **[`FlowKind`]**: Pure classification of [`CallbackParameters`] into one of four
//!   mutually exclusive flows.
//! - **[`CallbackResolver`]**: Executes the selected flow and reports an [`ExchangeOutcome`].
//! - **[`OutcomeSink`]**: How an outcome is signalled. [`redirect::RedirectSink`] turns
//!   it into a redirect location, [`client::ClientSink`] scrubs and navigates a browser.

#![warn(missing_docs)]

pub use agriscan_auth_core::{
    AuthError, CallbackParameters, ExchangeOutcome, FailureReason, OtpType, SessionService,
    SessionUser,
};

/// Client-navigation execution context.
pub mod client;
/// Flow classification.
pub mod flow;
/// Redirect execution context.
pub mod redirect;
/// Outcome sinks.
pub mod sink;
/// The exchange strategies.
pub mod strategy;

pub use client::{BrowserLocation, CallbackPage, ClientAction, ClientSink};
pub use flow::FlowKind;
pub use redirect::{RedirectSink, RedirectTarget};
pub use sink::OutcomeSink;

/// Where the resolver sends users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackConfig {
    /// Landing page after a successful sign-in when no usable `next` was given.
    pub default_destination: String,
    /// Error page of the redirect context; receives `?message=<reason code>`.
    pub error_path: String,
    /// Where the redirect context sends callbacks that carried no credentials.
    pub home_path: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            default_destination: "/dashboard".to_string(),
            error_path: "/auth/error".to_string(),
            home_path: "/".to_string(),
        }
    }
}

/// Marker for a missing component in the typestate pattern.
#[derive(Clone, Default)]
pub struct Missing;

/// Marker for a configured component in the typestate pattern.
#[derive(Clone)]
pub struct Configured<T>(pub T);

/// Resolves callbacks against a session service.
#[derive(Clone)]
pub struct CallbackResolver<S> {
    service: S,
    config: CallbackConfig,
}

impl CallbackResolver<Missing> {
    /// Create a new [`CallbackResolverBuilder`].
    pub fn builder() -> CallbackResolverBuilder<Missing> {
        CallbackResolverBuilder::default()
    }
}

impl<S: SessionService> CallbackResolver<S> {
    /// Create a resolver with the default configuration.
    pub fn new(service: S) -> Self {
        Self {
            service,
            config: CallbackConfig::default(),
        }
    }

    /// The resolver configuration.
    pub fn config(&self) -> &CallbackConfig {
        &self.config
    }

    /// The underlying session service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Classify the parameters and run the one matching strategy.
    ///
    /// `code_verifier` is only used by the authorization-code flow.
    pub async fn resolve(
        &self,
        params: &CallbackParameters,
        code_verifier: Option<&str>,
    ) -> ExchangeOutcome {
        let flow = FlowKind::classify(params);
        self.execute(&flow, code_verifier).await
    }

    /// Run an already classified flow.
    pub async fn execute(&self, flow: &FlowKind<'_>, code_verifier: Option<&str>) -> ExchangeOutcome {
        tracing::debug!(flow = flow.name(), "Resolving auth callback");
        strategy::run(&self.service, &self.config, flow, code_verifier).await
    }

    /// Resolve the callback and signal the outcome through `sink`.
    pub async fn complete<K>(
        &self,
        params: &CallbackParameters,
        code_verifier: Option<&str>,
        sink: &mut K,
    ) -> K::Output
    where
        K: OutcomeSink,
    {
        let flow = FlowKind::classify(params);
        sink.begin(&flow);
        let outcome = self.execute(&flow, code_verifier).await;
        sink.deliver(outcome)
    }
}

/// A builder for configuring and creating a [`CallbackResolver`].
pub struct CallbackResolverBuilder<S> {
    service: S,
    config: CallbackConfig,
}

impl Default for CallbackResolverBuilder<Missing> {
    fn default() -> Self {
        Self {
            service: Missing,
            config: CallbackConfig::default(),
        }
    }
}

impl<S> CallbackResolverBuilder<S> {
    /// Set the session service.
    pub fn service<T: SessionService>(self, service: T) -> CallbackResolverBuilder<Configured<T>> {
        CallbackResolverBuilder {
            service: Configured(service),
            config: self.config,
        }
    }

    /// Set the callback configuration.
    pub fn config(mut self, config: CallbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default landing page.
    pub fn default_destination(mut self, destination: impl Into<String>) -> Self {
        self.config.default_destination = destination.into();
        self
    }
}

impl<T: SessionService> CallbackResolverBuilder<Configured<T>> {
    /// Build the [`CallbackResolver`].
    pub fn build(self) -> CallbackResolver<T> {
        CallbackResolver {
            service: self.service.0,
            config: self.config,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use agriscan_auth_core::{AuthError, OtpType, SessionService, SessionTokens, SessionUser};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// A call recorded by [`RecordingService`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Exchange(String, Option<String>),
        SetSession(String, Option<String>),
        Verify(String, OtpType),
    }

    /// A session service that records calls and answers with a fixed result.
    pub struct RecordingService {
        pub calls: Mutex<Vec<Call>>,
        pub result: Result<(), AuthError>,
    }

    impl RecordingService {
        pub fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                result: Ok(()),
            }
        }

        pub fn failing(error: AuthError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                result: Err(error),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, call: Call) -> Result<SessionUser, AuthError> {
            self.calls.lock().unwrap().push(call);
            self.result.clone().map(|_| user())
        }
    }

    pub fn user() -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            email: Some("grower@example.com".to_string()),
            tokens: SessionTokens {
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_in: Some(3600),
            },
        }
    }

    #[async_trait]
    impl SessionService for RecordingService {
        async fn exchange_code_for_session(
            &self,
            code: &str,
            code_verifier: Option<&str>,
        ) -> Result<SessionUser, AuthError> {
            self.answer(Call::Exchange(
                code.to_string(),
                code_verifier.map(str::to_string),
            ))
        }

        async fn set_session(
            &self,
            access_token: &str,
            refresh_token: Option<&str>,
        ) -> Result<SessionUser, AuthError> {
            self.answer(Call::SetSession(
                access_token.to_string(),
                refresh_token.map(str::to_string),
            ))
        }

        async fn verify_one_time_token(
            &self,
            token_hash: &str,
            otp_type: OtpType,
        ) -> Result<SessionUser, AuthError> {
            self.answer(Call::Verify(token_hash.to_string(), otp_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Call, RecordingService};
    use super::*;

    fn params(query: &str) -> CallbackParameters {
        CallbackParameters::collect(None, Some(query))
    }

    #[tokio::test]
    async fn code_flow_honours_next() {
        let resolver = CallbackResolver::new(RecordingService::ok());

        let outcome = resolver.resolve(&params("code=abc123&next=/dashboard"), None).await;

        assert_eq!(
            resolver.service().calls(),
            vec![Call::Exchange("abc123".into(), None)]
        );
        match outcome {
            ExchangeOutcome::Authenticated { destination, .. } => {
                assert_eq!(destination, "/dashboard")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn code_wins_over_access_token() {
        let resolver = CallbackResolver::new(RecordingService::ok());

        resolver
            .resolve(&params("access_token=tok&code=c1&token_hash=h&type=signup"), Some("v"))
            .await;

        assert_eq!(
            resolver.service().calls(),
            vec![Call::Exchange("c1".into(), Some("v".into()))]
        );
    }

    #[tokio::test]
    async fn builder_applies_default_destination() {
        let resolver = CallbackResolver::builder()
            .service(RecordingService::ok())
            .default_destination("/scans")
            .build();

        let outcome = resolver.resolve(&params("code=abc"), None).await;

        assert_eq!(resolver.config().error_path, "/auth/error");
        assert!(matches!(
            outcome,
            ExchangeOutcome::Authenticated { ref destination, .. } if destination == "/scans"
        ));
    }

    #[tokio::test]
    async fn builder_accepts_full_config() {
        let resolver = CallbackResolver::builder()
            .service(RecordingService::failing(AuthError::Service("expired".into())))
            .config(CallbackConfig {
                default_destination: "/scans".into(),
                error_path: "/login/error".into(),
                home_path: "/login".into(),
            })
            .build();

        let target = resolver
            .complete(&params("code=abc"), None, &mut RedirectSink)
            .await;

        assert_eq!(
            target.location(resolver.config()),
            "/login/error?message=exchange_failed"
        );
    }

    #[tokio::test]
    async fn empty_parameters_make_no_call() {
        let resolver = CallbackResolver::new(RecordingService::ok());

        let outcome = resolver.resolve(&CallbackParameters::default(), None).await;

        assert!(resolver.service().calls().is_empty());
        assert!(matches!(
            outcome,
            ExchangeOutcome::Failed {
                reason: FailureReason::NoMatch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn service_errors_become_failed_outcomes() {
        let resolver = CallbackResolver::new(RecordingService::failing(AuthError::Service(
            "invalid flow state, no valid flow state found".into(),
        )));

        let outcome = resolver.resolve(&params("code=abc"), None).await;

        assert_eq!(
            outcome,
            ExchangeOutcome::Failed {
                reason: FailureReason::ExchangeFailed,
                diagnostic_message: "invalid flow state, no valid flow state found".into(),
            }
        );
    }
}
