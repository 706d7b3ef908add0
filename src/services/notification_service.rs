use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::notifications::NewNotification,
    error::{AppError, AppResult},
    models::{Notification, NotificationType, User},
    response::Outcome,
    store::{Changeset, Store},
};

/// Build a notification for `recipient` if their in-app settings allow it.
pub(crate) fn compose(
    recipient: &User,
    kind: NotificationType,
    message: String,
    related_item_id: Option<Uuid>,
    related_user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Option<Notification> {
    if !recipient.notification_settings.wants_in_app(kind) {
        tracing::debug!(user_id = %recipient.id, ?kind, "notification muted by settings");
        return None;
    }
    Some(Notification {
        id: Uuid::new_v4(),
        user_id: recipient.id,
        kind,
        message,
        related_item_id,
        related_user_id,
        is_read: false,
        timestamp: now,
    })
}

/// Create a notification on behalf of an external producer.
pub async fn notify(
    store: &mut Store,
    payload: NewNotification,
) -> AppResult<Option<Notification>> {
    let recipient = store
        .snapshot()
        .user(payload.recipient_id)
        .ok_or(AppError::NotFound("User"))?;

    let Some(notification) = compose(
        recipient,
        payload.kind,
        payload.message,
        payload.related_item_id,
        payload.related_user_id,
        Utc::now(),
    ) else {
        return Ok(None);
    };

    let mut notifications = store.notifications().to_vec();
    notifications.push(notification.clone());
    store
        .commit(Changeset::new().notifications(notifications))
        .await?;

    log_audit(
        store.session().current_user_id,
        "notification_create",
        Some("notifications"),
        Some(serde_json::json!({
            "notification_id": notification.id,
            "recipient_id": notification.user_id,
        })),
    );
    Ok(Some(notification))
}

/// Notifications addressed to `user_id`, newest first.
pub fn list_for_user(store: &Store, user_id: Uuid) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = store
        .notifications()
        .iter()
        .filter(|n| n.user_id == user_id)
        .cloned()
        .collect();
    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    notifications
}

pub fn unread_count(store: &Store, user_id: Uuid) -> usize {
    store
        .notifications()
        .iter()
        .filter(|n| n.user_id == user_id && !n.is_read)
        .count()
}

pub async fn mark_read(store: &mut Store, id: Uuid) -> AppResult<Outcome<()>> {
    if !store.notifications().iter().any(|n| n.id == id) {
        return Err(AppError::NotFound("Notification"));
    }

    let notifications = store
        .notifications()
        .iter()
        .map(|n| {
            if n.id == id {
                Notification {
                    is_read: true,
                    ..n.clone()
                }
            } else {
                n.clone()
            }
        })
        .collect();
    store
        .commit(Changeset::new().notifications(notifications))
        .await?;

    Ok(Outcome::success("Notification marked as read.", (), None))
}

pub async fn mark_all_read(store: &mut Store, user_id: Uuid) -> AppResult<Outcome<()>> {
    let notifications = store
        .notifications()
        .iter()
        .map(|n| {
            if n.user_id == user_id {
                Notification {
                    is_read: true,
                    ..n.clone()
                }
            } else {
                n.clone()
            }
        })
        .collect();
    store
        .commit(Changeset::new().notifications(notifications))
        .await?;

    log_audit(Some(user_id), "notifications_read", Some("notifications"), None);
    Ok(Outcome::success("All notifications marked as read.", (), None))
}

pub async fn clear_all(store: &mut Store, user_id: Uuid) -> AppResult<Outcome<()>> {
    let notifications = store
        .notifications()
        .iter()
        .filter(|n| n.user_id != user_id)
        .cloned()
        .collect();
    store
        .commit(Changeset::new().notifications(notifications))
        .await?;

    log_audit(Some(user_id), "notifications_clear", Some("notifications"), None);
    Ok(Outcome::success("Notifications cleared.", (), None))
}
