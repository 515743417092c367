//! Supabase Auth (GoTrue) implementation of [`SessionService`].

#![warn(missing_docs)]

use agriscan_auth_core::{AuthError, OtpType, SessionService, SessionTokens, SessionUser};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// The project's anon (publishable) key.
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Create a configuration from a project URL and anon key.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY` from the environment.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AuthError::Config(format!("{name} not found")))
        };
        Ok(Self::new(required("SUPABASE_URL")?, required("SUPABASE_ANON_KEY")?))
    }
}

/// Client for the Supabase Auth REST API.
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    /// Create a client for the given project.
    pub fn new(config: SupabaseConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(config: SupabaseConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", config.url.trim_end_matches('/')),
            anon_key: config.anon_key,
        }
    }

    /// Fetch the user an access token belongs to.
    pub async fn get_user(&self, access_token: &str) -> Result<GoTrueUser, AuthError> {
        let request = self
            .client
            .get(format!("{}/user", self.auth_url))
            .bearer_auth(access_token);
        self.send(request).await
    }

    /// Trade a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionUser, AuthError> {
        let request = self
            .client
            .post(format!("{}/token?grant_type=refresh_token", self.auth_url))
            .json(&RefreshRequest { refresh_token });
        let session: GoTrueSession = self.send(request).await?;
        Ok(session.into())
    }

    async fn send<T>(&self, request: RequestBuilder) -> Result<T, AuthError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::Transport(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl SessionService for SupabaseAuth {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        let request = self
            .client
            .post(format!("{}/token?grant_type=pkce", self.auth_url))
            .json(&PkceRequest {
                auth_code: code,
                code_verifier,
            });
        let session: GoTrueSession = self.send(request).await?;
        Ok(session.into())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionUser, AuthError> {
        match self.get_user(access_token).await {
            Ok(user) => Ok(SessionUser {
                id: user.id,
                email: user.email,
                tokens: SessionTokens {
                    access_token: access_token.to_string(),
                    refresh_token: refresh_token.map(str::to_string),
                    expires_in: None,
                },
            }),
            Err(AuthError::Service(message)) => match refresh_token {
                Some(refresh_token) => {
                    tracing::debug!(%message, "Access token rejected, refreshing session");
                    self.refresh_session(refresh_token).await
                }
                None => Err(AuthError::Service(message)),
            },
            Err(e) => Err(e),
        }
    }

    async fn verify_one_time_token(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<SessionUser, AuthError> {
        let request = self
            .client
            .post(format!("{}/verify", self.auth_url))
            .json(&VerifyRequest {
                otp_type,
                token_hash,
            });
        let session: GoTrueSession = self.send(request).await?;
        Ok(session.into())
    }
}

#[derive(Serialize)]
struct PkceRequest<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    otp_type: OtpType,
    token_hash: &'a str,
}

/// A user as returned by Supabase Auth.
#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueUser {
    /// User id (UUID).
    pub id: String,
    /// Primary email address.
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: GoTrueUser,
}

impl From<GoTrueSession> for SessionUser {
    fn from(session: GoTrueSession) -> Self {
        SessionUser {
            id: session.user.id,
            email: session.user.email,
            tokens: SessionTokens {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                expires_in: session.expires_in,
            },
        }
    }
}

/// The error shapes Supabase Auth answers with across versions.
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

async fn error_from_response(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoTrueErrorBody>(&body)
        .ok()
        .and_then(GoTrueErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    AuthError::Service(message)
}
