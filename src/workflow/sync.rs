use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::domain::event::{BugEvent, BugId, EventAction};
use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;
use crate::workflow::mapper::{TicketMapper, UpdateOp, resolve_status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(String),
    Updated(String),
    Commented(String),
    Ignored(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    AlreadyInStatus,
    Applied,
    /// No transition leads to the desired status in one step.
    Unreachable,
}

/// Reconciles one Launchpad event into Jira.
///
/// Conflicts and malformed events are returned as-is; any other failure is
/// logged with the event and resolved config and reported as
/// [`AppError::Internal`].
pub async fn sync_event(
    tracker: &dyn IssueTrackerService,
    mapper: &TicketMapper,
    event: &BugEvent,
    config: &SyncConfig,
) -> AppResult<SyncOutcome> {
    match dispatch(tracker, mapper, event, config).await {
        Ok(outcome) => Ok(outcome),
        Err(err @ (AppError::Conflict(_) | AppError::BadRequest(_))) => Err(err),
        Err(err) => {
            error!(
                error = %err,
                event = ?event,
                config = ?config,
                "Error during Jira operation"
            );
            Err(AppError::Internal)
        }
    }
}

async fn dispatch(
    tracker: &dyn IssueTrackerService,
    mapper: &TicketMapper,
    event: &BugEvent,
    config: &SyncConfig,
) -> AppResult<SyncOutcome> {
    match event.kind() {
        EventAction::Created if event.is_comment() => {
            sync_comment(tracker, mapper, event, config).await
        }
        EventAction::Created => create_ticket(tracker, mapper, event, config).await,
        EventAction::Changed(_) => update_ticket(tracker, mapper, event, config).await,
        EventAction::Other(action) => {
            debug!(action = %action, bug = %event.bug, "Ignoring unsupported action");
            Ok(SyncOutcome::Ignored(format!("unsupported action '{action}'")))
        }
    }
}

fn bug_id(event: &BugEvent) -> AppResult<BugId> {
    event.bug_id().ok_or_else(|| {
        AppError::BadRequest(format!("cannot derive a bug id from '{}'", event.bug))
    })
}

async fn create_ticket(
    tracker: &dyn IssueTrackerService,
    mapper: &TicketMapper,
    event: &BugEvent,
    config: &SyncConfig,
) -> AppResult<SyncOutcome> {
    let bug = bug_id(event)?;
    if let Some(existing) = tracker.find_ticket(&config.jira_project_key, &bug).await? {
        warn!(key = %existing.key, bug = %event.bug, "Jira issue already exists for Launchpad bug");
        return Err(AppError::Conflict(format!(
            "Jira issue already exists for Launchpad bug {}",
            event.bug
        )));
    }

    let ticket = tracker
        .create_ticket(&mapper.create_fields(event, config))
        .await?;
    info!(key = %ticket.key, bug = %event.bug, "Created Jira issue for Launchpad bug");

    let desired = resolve_status(config, event.new.status.as_deref());
    if let Err(err) = transition_to(tracker, &ticket, &desired).await {
        warn!(
            key = %ticket.key,
            target = %desired,
            error = %err,
            "Created Jira issue but could not set its initial status"
        );
    }

    Ok(SyncOutcome::Created(ticket.key))
}

async fn update_ticket(
    tracker: &dyn IssueTrackerService,
    mapper: &TicketMapper,
    event: &BugEvent,
    config: &SyncConfig,
) -> AppResult<SyncOutcome> {
    let bug = bug_id(event)?;
    let Some(ticket) = tracker.find_ticket(&config.jira_project_key, &bug).await? else {
        warn!(bug = %event.bug, action = %event.action, "Jira issue not found for edit event");
        return Err(AppError::Conflict(format!(
            "Jira issue not found for Launchpad bug {}",
            event.bug
        )));
    };
    debug!(
        key = %ticket.key,
        action = %event.action,
        old = ?event.old,
        new = ?event.new,
        "Applying Launchpad change"
    );

    match mapper.update_op(event, config) {
        UpdateOp::Fields(update) if update.is_empty() => {
            Ok(SyncOutcome::Ignored("nothing to update".to_string()))
        }
        UpdateOp::Fields(update) => {
            tracker.update_ticket(&ticket, &update).await?;
            Ok(SyncOutcome::Updated(ticket.key))
        }
        UpdateOp::Transition(desired) => match transition_to(tracker, &ticket, &desired).await? {
            TransitionResult::Unreachable => Ok(SyncOutcome::Ignored(format!(
                "no direct transition to '{desired}'"
            ))),
            TransitionResult::Applied | TransitionResult::AlreadyInStatus => {
                Ok(SyncOutcome::Updated(ticket.key))
            }
        },
        UpdateOp::Ignore(reason) => {
            debug!(key = %ticket.key, action = %event.action, reason = %reason, "Update ignored");
            Ok(SyncOutcome::Ignored(reason))
        }
    }
}

async fn sync_comment(
    tracker: &dyn IssueTrackerService,
    mapper: &TicketMapper,
    event: &BugEvent,
    config: &SyncConfig,
) -> AppResult<SyncOutcome> {
    if !config.sync_comments {
        info!(bug = %event.bug, "Comment sync disabled, skipping comment");
        return Ok(SyncOutcome::Ignored("comment sync is disabled".to_string()));
    }

    let bug = bug_id(event)?;
    let comment_id = event.bug_comment.as_deref().unwrap_or_default();
    let Some(ticket) = tracker.find_ticket(&config.jira_project_key, &bug).await? else {
        warn!(bug = %event.bug, "Jira issue not found for Launchpad bug comment");
        return Err(AppError::Conflict(format!(
            "Jira issue not found for Launchpad bug {}",
            event.bug
        )));
    };

    if tracker.has_comment(&ticket, comment_id).await? {
        warn!(key = %ticket.key, comment = %comment_id, "Jira issue already has Launchpad comment");
        return Err(AppError::Conflict(format!(
            "Jira issue {} already has comment {comment_id}",
            ticket.key
        )));
    }

    tracker
        .add_comment(&ticket, &mapper.comment_text(event))
        .await?;
    info!(key = %ticket.key, comment = %comment_id, "Mirrored Launchpad comment");
    Ok(SyncOutcome::Commented(ticket.key))
}

/// Moves `ticket` to `desired` if a single transition leads there.
pub async fn transition_to(
    tracker: &dyn IssueTrackerService,
    ticket: &Ticket,
    desired: &str,
) -> AppResult<TransitionResult> {
    let current = tracker.current_status(ticket).await?;
    if current == desired {
        debug!(key = %ticket.key, status = %current, "Jira issue already in target status");
        return Ok(TransitionResult::AlreadyInStatus);
    }

    let transitions = tracker.available_transitions(ticket).await?;
    match transitions.iter().find(|t| t.to_status == desired) {
        Some(transition) => {
            tracker.apply_transition(ticket, transition).await?;
            Ok(TransitionResult::Applied)
        }
        None => {
            warn!(
                key = %ticket.key,
                current = %current,
                target = %desired,
                available = ?transitions.iter().map(|t| &t.to_status).collect::<Vec<_>>(),
                "No transition available to target status"
            );
            Ok(TransitionResult::Unreachable)
        }
    }
}
