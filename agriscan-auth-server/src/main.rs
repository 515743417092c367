mod config;

use agriscan_auth_axum::{CallbackAxumExt, CallbackState, DynResolver, SessionCookieConfig};
use agriscan_auth_core::SessionService;
use agriscan_auth_flow::CallbackResolver;
use agriscan_auth_supabase::SupabaseAuth;
use axum::{response::IntoResponse, routing::get, Router};
use config::ServerConfig;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agriscan_auth=debug")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let service: Arc<dyn SessionService> = Arc::new(SupabaseAuth::new(config.supabase.clone()));
    let resolver: DynResolver = CallbackResolver::builder()
        .service(service)
        .config(config.callback.clone())
        .build();

    let state = CallbackState {
        resolver: Arc::new(resolver.clone()),
        cookies: SessionCookieConfig {
            secure: config.cookie_secure,
            ..Default::default()
        },
    };

    let app = Router::new()
        .route("/", get(index))
        .merge(resolver.axum_router())
        .layer(CookieManagerLayer::new())
        .with_state(state);

    tracing::info!(addr = %config.bind_addr, "AgriScan auth server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> impl IntoResponse {
    "AgriScan auth callback server. Identity-provider links land on /auth/callback."
}
