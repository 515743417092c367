use crate::flow::FlowKind;
use crate::sink::OutcomeSink;
use crate::CallbackResolver;
use agriscan_auth_core::{CallbackParameters, FailureReason, SessionService, SessionUser};
use url::Url;

const INITIAL_STATUS: &str = "Checking for tokens...";
const REDIRECT_HINT: &str =
    "If you were not redirected, copy/paste the link from your email into the browser address bar.";

/// The browser capabilities available to the callback page.
pub trait BrowserLocation {
    /// The URL currently shown in the address bar, fragment included.
    fn href(&self) -> String;

    /// Replace the address bar URL without navigating (`history.replaceState`).
    fn replace_url(&mut self, url: &str);

    /// Client-side navigation to `destination`.
    fn navigate(&mut self, destination: &str);

    /// The PKCE verifier stored when the sign-in was initiated.
    fn stored_code_verifier(&self) -> Option<String> {
        None
    }
}

/// What the page did once the callback settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// The URL was scrubbed and the browser sent to the destination.
    Navigated(String),
    /// The page stays on the callback and shows the status.
    Stayed,
}

/// Render state of the callback page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPage {
    status: String,
    error: Option<String>,
    action: ClientAction,
}

impl Default for CallbackPage {
    fn default() -> Self {
        Self {
            status: INITIAL_STATUS.to_string(),
            error: None,
            action: ClientAction::Stayed,
        }
    }
}

impl CallbackPage {
    /// Resolve the callback shown in `browser`.
    ///
    /// Parameters come from both the query string and the fragment of the current URL.
    pub async fn load<S, B>(resolver: &CallbackResolver<S>, browser: &mut B) -> Self
    where
        S: SessionService,
        B: BrowserLocation,
    {
        let href = browser.href();
        let params = match Url::parse(&href) {
            Ok(url) => CallbackParameters::from_url(&url),
            Err(err) => {
                tracing::warn!(error = %err, "Callback page URL could not be parsed");
                CallbackParameters::default()
            }
        };
        let code_verifier = browser.stored_code_verifier();
        tracing::debug!(keys = ?params.keys(), "Callback page loaded");

        let mut page = CallbackPage::default();
        let mut sink = ClientSink::new(browser, &mut page);
        resolver
            .complete(&params, code_verifier.as_deref(), &mut sink)
            .await;
        page
    }

    /// The status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The diagnostic, once something went wrong.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Help text shown while there is no error.
    pub fn hint(&self) -> Option<&'static str> {
        self.error.is_none().then_some(REDIRECT_HINT)
    }

    /// What the page did.
    pub fn action(&self) -> &ClientAction {
        &self.action
    }
}

/// Navigate-and-render sink used by the callback page.
pub struct ClientSink<'a, B> {
    browser: &'a mut B,
    page: &'a mut CallbackPage,
}

impl<'a, B: BrowserLocation> ClientSink<'a, B> {
    /// Create a sink writing to `page` and driving `browser`.
    pub fn new(browser: &'a mut B, page: &'a mut CallbackPage) -> Self {
        Self { browser, page }
    }
}

impl<B: BrowserLocation> OutcomeSink for ClientSink<'_, B> {
    type Output = ClientAction;

    fn begin(&mut self, flow: &FlowKind<'_>) {
        let status = match flow {
            FlowKind::Code { .. } => "Exchanging code for session...",
            FlowKind::TokenPair { .. } => "Setting session from fragment tokens...",
            FlowKind::OneTimeToken { .. } => "Verifying email token...",
            FlowKind::NoMatch => return,
        };
        self.page.status = status.to_string();
    }

    fn authenticated(&mut self, _session_user: SessionUser, destination: String) -> ClientAction {
        // Scrub before navigating so a stalled navigation never leaves tokens visible.
        match Url::parse(&self.browser.href()) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                self.browser.replace_url(url.as_str());
            }
            Err(err) => tracing::warn!(error = %err, "Callback page URL could not be scrubbed"),
        }
        self.browser.navigate(&destination);

        let action = ClientAction::Navigated(destination);
        self.page.action = action.clone();
        action
    }

    fn failed(&mut self, reason: FailureReason, diagnostic_message: String) -> ClientAction {
        let status = match reason {
            _ if reason.is_exception() => "Unexpected error",
            FailureReason::NoMatch => "No tokens found in URL",
            FailureReason::ExchangeFailed => "Failed to exchange code",
            FailureReason::SetSessionFailed => "Failed to set session",
            _ => "Failed to verify token",
        };
        self.page.status = status.to_string();
        self.page.error = Some(diagnostic_message);
        self.page.action = ClientAction::Stayed;
        ClientAction::Stayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingService};
    use agriscan_auth_core::AuthError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Replace(String),
        Navigate(String),
    }

    struct FakeBrowser {
        url: String,
        events: Vec<Event>,
        verifier: Option<String>,
    }

    impl FakeBrowser {
        fn at(url: &str) -> Self {
            Self {
                url: url.to_string(),
                events: Vec::new(),
                verifier: None,
            }
        }
    }

    impl BrowserLocation for FakeBrowser {
        fn href(&self) -> String {
            self.url.clone()
        }

        fn replace_url(&mut self, url: &str) {
            self.url = url.to_string();
            self.events.push(Event::Replace(url.to_string()));
        }

        fn navigate(&mut self, destination: &str) {
            self.events.push(Event::Navigate(destination.to_string()));
        }

        fn stored_code_verifier(&self) -> Option<String> {
            self.verifier.clone()
        }
    }

    #[tokio::test]
    async fn fragment_tokens_are_scrubbed_before_navigation() {
        let resolver = CallbackResolver::new(RecordingService::ok());
        let mut browser = FakeBrowser::at(
            "https://agriscan.example/auth/callback?next=/x#access_token=tok&refresh_token=ref&type=magiclink",
        );

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert_eq!(
            resolver.service().calls(),
            vec![Call::SetSession("tok".into(), Some("ref".into()))]
        );
        assert_eq!(
            browser.events,
            vec![
                Event::Replace("https://agriscan.example/auth/callback".into()),
                Event::Navigate("/dashboard".into()),
            ]
        );
        assert!(!browser.url.contains('?') && !browser.url.contains('#'));
        assert_eq!(page.action(), &ClientAction::Navigated("/dashboard".into()));
        assert_eq!(page.status(), "Setting session from fragment tokens...");
    }

    #[tokio::test]
    async fn code_flow_uses_stored_verifier_and_next() {
        let resolver = CallbackResolver::new(RecordingService::ok());
        let mut browser = FakeBrowser::at("http://localhost:3000/auth/callback?code=abc123&next=%2Fscans");
        browser.verifier = Some("verifier".into());

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert_eq!(
            resolver.service().calls(),
            vec![Call::Exchange("abc123".into(), Some("verifier".into()))]
        );
        assert_eq!(page.action(), &ClientAction::Navigated("/scans".into()));
        assert_eq!(browser.url, "http://localhost:3000/auth/callback");
    }

    #[tokio::test]
    async fn failure_stays_on_page_with_diagnostic() {
        let resolver = CallbackResolver::new(RecordingService::failing(AuthError::Service(
            "Token has expired or is invalid".into(),
        )));
        let original = "https://agriscan.example/auth/callback#token_hash=h1&type=signup";
        let mut browser = FakeBrowser::at(original);

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert!(browser.events.is_empty());
        assert_eq!(browser.url, original);
        assert_eq!(page.status(), "Failed to verify token");
        assert_eq!(page.error(), Some("Token has expired or is invalid"));
        assert_eq!(page.hint(), None);
        assert_eq!(page.action(), &ClientAction::Stayed);
    }

    #[tokio::test]
    async fn transport_failure_is_unexpected_error() {
        let resolver =
            CallbackResolver::new(RecordingService::failing(AuthError::Transport("timed out".into())));
        let mut browser = FakeBrowser::at("https://agriscan.example/auth/callback?code=abc");

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert_eq!(page.status(), "Unexpected error");
        assert_eq!(page.error(), Some("Transport error: timed out"));
        assert!(browser.events.is_empty());
    }

    #[tokio::test]
    async fn no_tokens_found() {
        let resolver = CallbackResolver::new(RecordingService::ok());
        let mut browser = FakeBrowser::at("https://agriscan.example/auth/callback");

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert!(resolver.service().calls().is_empty());
        assert!(browser.events.is_empty());
        assert_eq!(page.status(), "No tokens found in URL");
        assert_eq!(
            page.error(),
            Some("No verification tokens or access tokens found in URL fragment or query parameters.")
        );
    }

    #[test]
    fn fresh_page_shows_hint() {
        let page = CallbackPage::default();
        assert_eq!(page.status(), "Checking for tokens...");
        assert!(page.hint().is_some());
    }

    #[tokio::test]
    async fn next_with_tab_stays_on_site() {
        let resolver = CallbackResolver::new(RecordingService::ok());
        let mut browser =
            FakeBrowser::at("https://agriscan.example/auth/callback?code=abc&next=%2F%09%2Fevil.example");

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert_eq!(page.action(), &ClientAction::Navigated("/dashboard".into()));
        assert_eq!(browser.events.last(), Some(&Event::Navigate("/dashboard".into())));
    }

    #[tokio::test]
    async fn unparseable_location_is_treated_as_no_tokens() {
        let resolver = CallbackResolver::new(RecordingService::ok());
        let mut browser = FakeBrowser::at("/auth/callback?code=abc");

        let page = CallbackPage::load(&resolver, &mut browser).await;

        assert!(resolver.service().calls().is_empty());
        assert_eq!(page.status(), "No tokens found in URL");
    }
}
