//! One-shot notifications carried across a redirect.

use tower_sessions::Session;

use crate::models::{Notification, session_keys};

/// Queue a notification for the next rendered page.
pub async fn push_flash(session: &Session, notification: Notification) {
    push_flashes(session, vec![notification]).await;
}

/// Queue several notifications, keeping their order.
pub async fn push_flashes(session: &Session, notifications: Vec<Notification>) {
    if notifications.is_empty() {
        return;
    }
    let mut pending: Vec<Notification> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.extend(notifications);
    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to store flash notifications");
    }
}

/// Take every queued notification.
///
/// Leaves the session unmodified when nothing is queued, so a plain page
/// view never writes the session back.
pub async fn take_flash(session: &Session) -> Vec<Notification> {
    let queued = session
        .get::<Vec<Notification>>(session_keys::FLASH)
        .await
        .ok()
        .flatten();
    match queued {
        Some(_) => session
            .remove::<Vec<Notification>>(session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default(),
        None => Vec::new(),
    }
}
