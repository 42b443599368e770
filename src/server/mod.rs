//! HTTP server receiving Launchpad webhooks.
//!
//! - `POST /` accepts a signed delivery, optionally with a `yaml` query
//!   parameter carrying a base64 project override
//! - `GET /health` returns 200 while the server is up

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

use crate::context::AppContext;

pub fn build_router(ctx: AppContext) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(ctx)
}
