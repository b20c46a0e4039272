use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::token;
use crate::db;
use crate::email::InvitationEmail;
use crate::models::NotificationQueueItem;
use crate::models::notification::{PROJECT_INVITATION, USER_ACTIVATION};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
struct InvitationPayload {
    invitation_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ActivationPayload {
    user_id: Uuid,
}

/// Start the notification worker pool on a dedicated Tokio runtime.
/// Runs on its own OS thread and returns once shutdown is signaled.
pub fn run_pool(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
    worker_count: usize,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let worker_count = worker_count.max(1);

    std::thread::Builder::new()
        .name("worker-pool".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(worker_count)
                .thread_name("notification-worker")
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to build worker runtime: {e}");
                    return;
                }
            };

            runtime.block_on(async {
                let mut handles = Vec::with_capacity(worker_count);

                for id in 0..worker_count {
                    handles.push(tokio::spawn(run(id, state.clone(), shutdown.clone())));
                }

                tracing::info!("Notification worker pool started ({worker_count} workers)");

                for handle in handles {
                    let _ = handle.await;
                }

                tracing::info!("Notification worker pool stopped");
            });
        })
}

async fn run(id: usize, state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Worker {id} started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match process_next(&state).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Worker {id} error: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Worker {id} stopped");
}

/// Claim and deliver the next queued notification. Returns true if an item was claimed.
pub async fn process_next(state: &SharedState) -> Result<bool, String> {
    let Some(item) = db::notifications::claim_next(&state.pool)
        .await
        .map_err(|e| format!("Failed to claim queue item: {e}"))?
    else {
        return Ok(false);
    };

    tracing::debug!(
        "Processing notification {} (kind={}, attempt={})",
        item.id,
        item.kind,
        item.attempts
    );

    let outcome = match item.kind.as_str() {
        PROJECT_INVITATION => deliver_invitation(state, &item).await,
        USER_ACTIVATION => deliver_activation(state, &item).await,
        other => Err(format!("Unknown notification kind: {other}")),
    };

    match outcome {
        Ok(()) => {
            db::notifications::mark_completed(&state.pool, item.id)
                .await
                .map_err(|e| format!("Failed to complete queue item: {e}"))?;
        }
        Err(error) => {
            tracing::warn!(
                notification_id = %item.id,
                attempt = item.attempts,
                "Notification failed: {error}"
            );
            db::notifications::mark_failed(&state.pool, &item, &error)
                .await
                .map_err(|e| format!("Failed to record queue failure: {e}"))?;
        }
    }

    Ok(true)
}

async fn deliver_invitation(
    state: &SharedState,
    item: &NotificationQueueItem,
) -> Result<(), String> {
    let payload: InvitationPayload = serde_json::from_value(item.payload.clone())
        .map_err(|e| format!("Invalid invitation payload: {e}"))?;

    let db_err = |e: sqlx::Error| format!("Failed to load invitation context: {e}");

    // The invitation may have been removed with its project; nothing to send.
    let Some(invitation) = db::invitations::find_by_id(&state.pool, payload.invitation_id)
        .await
        .map_err(db_err)?
    else {
        tracing::debug!(invitation_id = %payload.invitation_id, "Invitation gone, skipping email");
        return Ok(());
    };

    let (user, inviter, project) = (
        db::users::find_by_id(&state.pool, invitation.user_id)
            .await
            .map_err(db_err)?,
        db::users::find_by_id(&state.pool, invitation.inviter_id)
            .await
            .map_err(db_err)?,
        db::projects::find_by_id(&state.pool, invitation.project_id)
            .await
            .map_err(db_err)?,
    );
    let (Some(user), Some(inviter), Some(project)) = (user, inviter, project) else {
        return Ok(());
    };

    let Some(mailer) = state.system_mailer.as_ref() else {
        tracing::info!(
            invitation_id = %invitation.id,
            user_id = %user.id,
            "SMTP not configured, invitation email not sent"
        );
        return Ok(());
    };

    let url = state.config.invitation_link(invitation.id);
    let to_name = user.full_name();
    let inviter_name = inviter.full_name();

    tracing::info!(user_id = %user.id, "Sending the project invitation email");

    mailer
        .send_project_invitation(&InvitationEmail {
            to_email: &user.email,
            to_name: if to_name.is_empty() { &user.username } else { &to_name },
            inviter_name: if inviter_name.is_empty() {
                &inviter.username
            } else {
                &inviter_name
            },
            project_title: &project.title,
            invitation_url: &url,
        })
        .await
}

/// Mint a fresh activation token for a still-inactive user and mail the link.
async fn deliver_activation(
    state: &SharedState,
    item: &NotificationQueueItem,
) -> Result<(), String> {
    let payload: ActivationPayload = serde_json::from_value(item.payload.clone())
        .map_err(|e| format!("Invalid activation payload: {e}"))?;

    let Some(user) = db::users::find_by_id(&state.pool, payload.user_id)
        .await
        .map_err(|e| format!("Failed to load user: {e}"))?
        .filter(|u| !u.is_active)
    else {
        tracing::debug!(user_id = %payload.user_id, "User gone or already active, skipping email");
        return Ok(());
    };

    let raw = token::generate();
    db::activation_tokens::create(
        &state.pool,
        user.id,
        &token::hash(&raw),
        Utc::now() + Duration::hours(token::ACTIVATION_TOKEN_HOURS),
    )
    .await
    .map_err(|e| format!("Failed to store activation token: {e}"))?;

    let Some(mailer) = state.system_mailer.as_ref() else {
        tracing::info!(user_id = %user.id, "SMTP not configured, activation email not sent");
        return Ok(());
    };

    let name = user.full_name();
    tracing::info!(user_id = %user.id, "Sending the activation email");

    mailer
        .send_activation(
            &user.email,
            if name.is_empty() { &user.username } else { &name },
            &state.config.activation_link(&raw),
        )
        .await
}
