pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod invitation;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod validation;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

/// Build the HTTP application. The shared state is returned as well so the
/// caller can hand it to the notification workers.
pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let system_mailer = config.smtp.as_ref().and_then(|smtp| {
        match SystemMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                Some(Arc::new(mailer))
            }
            Err(e) => {
                tracing::warn!("System SMTP not available: {e}");
                None
            }
        }
    });

    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        system_mailer,
        login_limiter: LoginRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
