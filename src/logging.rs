//! Tracing setup for the server and CLI.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{AppError, AppResult};

const DEFAULT_FILTER: &str = "bugbridge=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter,
/// e.g. `RUST_LOG=bugbridge=debug,reqwest=info`.
pub fn init() -> AppResult<()> {
    subscriber()
        .try_init()
        .map_err(|err| AppError::Configuration(format!("failed to initialize tracing: {err}")))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry().with(env_filter()).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true),
    )
}
