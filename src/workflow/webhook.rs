use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::merge_project_config;
use crate::context::AppContext;
use crate::domain::event::BugEvent;
use crate::error::{AppError, AppResult};
use crate::webhooks::{delivery_fingerprint, verify_signature};
use crate::workflow::mapper::TicketMapper;
use crate::workflow::sync::{SyncOutcome, sync_event};

/// Authenticates, decodes and reconciles one webhook delivery.
///
/// Nothing reaches Jira unless the signature verifies against the raw body.
pub async fn handle_event(
    ctx: &AppContext,
    raw_body: &[u8],
    signature: Option<&str>,
    encoded_override: Option<&str>,
) -> AppResult<SyncOutcome> {
    handle_delivery(ctx, raw_body, signature, || {
        Ok(encoded_override.map(str::to_string))
    })
    .await
}

/// Like [`handle_event`], but the override is only extracted once the
/// delivery has authenticated, so a malformed request parameter never
/// answers an unsigned request.
pub async fn handle_delivery<F>(
    ctx: &AppContext,
    raw_body: &[u8],
    signature: Option<&str>,
    encoded_override: F,
) -> AppResult<SyncOutcome>
where
    F: FnOnce() -> AppResult<Option<String>> + Send,
{
    let span = info_span!("delivery", fingerprint = %delivery_fingerprint(raw_body));
    process(ctx, raw_body, signature, encoded_override)
        .instrument(span)
        .await
}

async fn process<F>(
    ctx: &AppContext,
    raw_body: &[u8],
    signature: Option<&str>,
    encoded_override: F,
) -> AppResult<SyncOutcome>
where
    F: FnOnce() -> AppResult<Option<String>> + Send,
{
    if raw_body.is_empty() {
        return Err(AppError::BadRequest("empty request body".to_string()));
    }

    authenticate(ctx, raw_body, signature)?;

    let event = parse_event(raw_body)?;
    debug!(action = %event.action, bug = %event.bug, "Received Launchpad event");

    let encoded_override = encoded_override()?;
    let config = merge_project_config(&ctx.config.project, encoded_override.as_deref())?;
    let mapper = TicketMapper::new(ctx.config.app.launchpad_url.as_str());

    sync_event(ctx.issue_tracker.as_ref(), &mapper, &event, &config).await
}

fn authenticate(ctx: &AppContext, raw_body: &[u8], signature: Option<&str>) -> AppResult<()> {
    let secret = ctx.config.webhook_secret();
    if secret.is_empty() {
        warn!("Webhook secret not configured, rejecting delivery");
        return Err(AppError::Authentication(
            "webhook secret is not configured".to_string(),
        ));
    }

    let Some(signature) = signature else {
        return Err(AppError::Authentication(
            "missing X-Hub-Signature header".to_string(),
        ));
    };

    if !verify_signature(raw_body, signature, secret) {
        warn!("Webhook signature mismatch");
        return Err(AppError::Authentication("invalid signature".to_string()));
    }
    Ok(())
}

fn parse_event(raw_body: &[u8]) -> AppResult<BugEvent> {
    let payload: Value = serde_json::from_slice(raw_body)
        .map_err(|err| AppError::BadRequest(format!("invalid JSON payload: {err}")))?;
    if !payload.is_object() {
        return Err(AppError::BadRequest(
            "payload must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(payload)
        .map_err(|err| AppError::BadRequest(format!("unexpected payload shape: {err}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::prelude::{BASE64_STANDARD, Engine as _};

    use super::*;
    use crate::config::{AppConfig, SyncConfig};
    use crate::test_utils::{RecordingTracker, TrackerCall};
    use crate::webhooks::{compute_signature, format_signature_header};

    const SECRET: &str = "s3cr3t";
    const BODY: &[u8] = br#"{"action":"created","target":"/proj","bug":"/bugs/1","new":{"title":"t","importance":"High","status":"New"}}"#;

    fn context(tracker: Arc<RecordingTracker>, secret: Option<&str>) -> AppContext {
        let mut config = AppConfig::default();
        config.app.launchpad_webhook_secret_code = secret.map(str::to_string);
        config.project = SyncConfig {
            jira_project_key: "PRJ".to_string(),
            ..SyncConfig::default()
        };
        AppContext::new(config, tracker)
    }

    fn sign(body: &[u8]) -> String {
        format_signature_header(&compute_signature(body, SECRET.as_bytes()))
    }

    #[tokio::test]
    async fn signed_creation_reaches_tracker() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));

        let outcome = handle_event(&ctx, BODY, Some(sign(BODY).as_str()), None)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Created("PRJ-1".to_string()));
    }

    #[tokio::test]
    async fn bad_signatures_never_reach_tracker() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));
        let wrong = format_signature_header(&compute_signature(BODY, b"other"));

        for signature in [None, Some(wrong.as_str()), Some("sha1=zz")] {
            let result = handle_event(&ctx, BODY, signature, None).await;
            assert!(matches!(result, Err(AppError::Authentication(_))));
        }
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn unset_secret_rejects_everything() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), None);
        let unsigned = format_signature_header(&compute_signature(BODY, b""));

        let result = handle_event(&ctx, BODY, Some(unsigned.as_str()), None).await;

        assert!(matches!(result, Err(AppError::Authentication(_))));
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_and_non_object_bodies_are_bad_requests() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));

        let empty = handle_event(&ctx, b"", Some(sign(b"").as_str()), None).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        for body in [&b"null"[..], b"[1,2]", b"{not json"] {
            let result = handle_event(&ctx, body, Some(sign(body).as_str()), None).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))), "{body:?}");
        }
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_override_is_rejected_before_sync() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));

        let signature = sign(BODY);
        let result = handle_event(&ctx, BODY, Some(&signature), Some("%%%not-base64")).await;

        assert!(matches!(result, Err(AppError::Override(_))));
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn override_is_not_read_before_authentication() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));
        let mut read = false;

        let result = handle_delivery(&ctx, BODY, Some("sha1=00"), || {
            read = true;
            Err(AppError::BadRequest("duplicate field `yaml`".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Authentication(_))));
        assert!(!read);
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn override_applies_to_one_request_only() {
        let tracker = Arc::new(RecordingTracker::empty());
        let ctx = context(tracker.clone(), Some(SECRET));
        let encoded = BASE64_STANDARD.encode("project:\n  jira_project_key: OTHER\n");

        handle_event(&ctx, BODY, Some(sign(BODY).as_str()), Some(encoded.as_str()))
            .await
            .unwrap();

        let projects: Vec<_> = tracker
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackerCall::Find { project_key, .. } => Some(project_key),
                _ => None,
            })
            .collect();
        assert_eq!(projects, vec!["OTHER".to_string()]);
        assert_eq!(ctx.config.project.jira_project_key, "PRJ");
    }
}
