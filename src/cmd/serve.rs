use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::jira::JiraClient;
use crate::server::build_router;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the webhook server listens on.
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,
}

pub async fn run(args: ServeArgs, config_path: &Path) -> AppResult<()> {
    let config = AppConfig::load(config_path)?;
    warn_missing_settings(&config);

    let issue_tracker = Arc::new(JiraClient::from_settings(&config.app));
    let context = AppContext::new(config, issue_tracker);

    let listener = TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, config = %config_path.display(), "Listening for Launchpad webhooks");

    axum::serve(listener, build_router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn warn_missing_settings(config: &AppConfig) {
    let app = &config.app;
    if config.webhook_secret().is_empty() {
        warn!("Webhook secret not configured; every delivery will be rejected.");
    }
    if app.jira_instance.is_none() {
        warn!("Jira instance not configured; ticket sync will fail.");
    }
    if app.jira_username.is_none() || app.jira_token.is_none() {
        warn!("Jira credentials not configured; ticket sync will fail.");
    }
    if config.project.jira_project_key.is_empty() {
        warn!("Jira project key not configured; requests must supply it via override.");
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
