//! Session-change notifications.
//!
//! Handlers publish an [`AuthEvent`] whenever a visitor signs in, signs out
//! or edits their profile. Long-lived per-user state (admin panels) listens
//! here to tear itself down.

use tokio::sync::broadcast;

use rotharc_core::UserId;

const CHANNEL_CAPACITY: usize = 64;

/// A change in who is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: UserId },
    SignedOut { user_id: UserId },
    ProfileUpdated { user_id: UserId },
}

impl AuthEvent {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::SignedIn { user_id }
            | Self::SignedOut { user_id }
            | Self::ProfileUpdated { user_id } => *user_id,
        }
    }
}

/// Broadcast hub for [`AuthEvent`]s.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: AuthEvent) {
        tracing::debug!(user_id = %event.user_id(), ?event, "Auth event");
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = AuthEvents::new();
        let mut rx = events.subscribe();
        let user_id = UserId::new(uuid::Uuid::new_v4());

        events.publish(AuthEvent::SignedIn { user_id });
        events.publish(AuthEvent::SignedOut { user_id });

        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedIn { user_id });
        let out = rx.recv().await.unwrap();
        assert_eq!(out.user_id(), user_id);
        assert!(matches!(out, AuthEvent::SignedOut { .. }));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let events = AuthEvents::new();
        events.publish(AuthEvent::ProfileUpdated {
            user_id: UserId::new(uuid::Uuid::nil()),
        });
    }
}
