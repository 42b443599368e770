//! Launchpad webhook endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AppContext;
use crate::error::AppError;
use crate::workflow::sync::SyncOutcome;
use crate::workflow::webhook::handle_delivery;

const HEADER_SIGNATURE: &str = "x-hub-signature";

#[derive(Debug, Default, Deserialize)]
pub struct WebhookParams {
    /// Base64 YAML overlaid on the project configuration for this request.
    pub yaml: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(_) | AppError::Override(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Conflict(_) => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };
        (status, Json(WebhookResponse { message })).into_response()
    }
}

pub async fn webhook_handler(
    State(ctx): State<AppContext>,
    params: Result<Query<WebhookParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|value| value.to_str().ok());

    // Query errors surface only after the signature has been checked.
    let outcome = handle_delivery(&ctx, &body, signature, || match params {
        Ok(Query(params)) => Ok(params.yaml),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    })
    .await?;
    info!(outcome = ?outcome, "Webhook processed");

    let message = match outcome {
        SyncOutcome::Created(key) => format!("Created Jira issue {key}"),
        SyncOutcome::Updated(key) => format!("Updated Jira issue {key}"),
        SyncOutcome::Commented(key) => format!("Added comment to Jira issue {key}"),
        SyncOutcome::Ignored(reason) => format!("Webhook received and validated: {reason}"),
    };
    Ok(Json(WebhookResponse { message }))
}
