use agriscan_auth_core::AuthError;
use agriscan_auth_flow::CallbackConfig;
use agriscan_auth_supabase::SupabaseConfig;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Errors raised while reading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The Supabase settings are missing or unusable.
    #[error(transparent)]
    Supabase(#[from] AuthError),
    /// A variable is set to a value that cannot be used.
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Settings of the callback server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// Where the resolver sends users.
    pub callback: CallbackConfig,
    /// Whether session cookies are only sent over HTTPS.
    pub cookie_secure: bool,
    /// Supabase project settings.
    pub supabase: SupabaseConfig,
}

impl ServerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let supabase = SupabaseConfig::from_env()?;
        Self::with_supabase(supabase, |name| std::env::var(name).ok())
    }

    /// Read every setting through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let supabase = SupabaseConfig::from_lookup(&lookup)?;
        Self::with_supabase(supabase, lookup)
    }

    fn with_supabase<F>(supabase: SupabaseConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("AGRISCAN_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            name: "AGRISCAN_BIND_ADDR",
            value: raw_addr.clone(),
        })?;

        let cookie_secure = match lookup("AGRISCAN_COOKIE_SECURE") {
            None => true,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "AGRISCAN_COOKIE_SECURE",
                        value,
                    })
                }
            },
        };

        let mut callback = CallbackConfig::default();
        if let Some(destination) = lookup("AGRISCAN_DEFAULT_DESTINATION").filter(|d| !d.is_empty()) {
            callback.default_destination = destination;
        }

        Ok(Self {
            bind_addr,
            callback,
            cookie_secure,
            supabase,
        })
    }
}
