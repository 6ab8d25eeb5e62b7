//! Admin user management panel.
//!
//! One [`AdminUserPanel`] exists per signed-in user who opens the admin
//! dashboard. It caches the privilege check, holds the last user list and
//! queues notifications for the next rendered page.
//!
//! # Consistency
//!
//! - Ban and unban re-fetch the full list after success.
//! - Delete removes the row locally. The outcome is fully known without the
//!   server, and the local patch also bumps the load generation so that an
//!   older in-flight list (which may still contain the row) is discarded.
//! - Every `load_users` call takes a generation number. Only the newest
//!   issued load may replace the list; older responses are dropped.
//! - Mutations are not de-duplicated. Two clicks send two requests.
//! - After [`AdminUserPanel::close`] every in-flight response is dropped and
//!   no further notifications are queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use rotharc_core::UserId;

use super::auth_events::{AuthEvent, AuthEvents};
use crate::models::{AccessToken, AdminUserRow, CurrentUser, Notification};
use crate::supabase::{SupabaseClient, SupabaseError};

/// Remote operations the panel needs.
pub trait AdminBackend: Send + Sync + 'static {
    /// Whether `user_id` is a super admin.
    fn is_super_admin(
        &self,
        token: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SupabaseError>> + Send;

    fn list_users(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<AdminUserRow>, SupabaseError>> + Send;

    fn ban_user(
        &self,
        token: &AccessToken,
        target: UserId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn unban_user(
        &self,
        token: &AccessToken,
        target: UserId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn delete_user(
        &self,
        token: &AccessToken,
        target: UserId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;
}

impl AdminBackend for SupabaseClient {
    async fn is_super_admin(&self, token: &AccessToken, user_id: UserId) -> Result<bool, SupabaseError> {
        Self::is_super_admin(self, token, user_id).await
    }

    async fn list_users(&self, token: &AccessToken) -> Result<Vec<AdminUserRow>, SupabaseError> {
        Self::list_users(self, token).await
    }

    async fn ban_user(&self, token: &AccessToken, target: UserId) -> Result<(), SupabaseError> {
        Self::ban_user(self, token, target).await
    }

    async fn unban_user(&self, token: &AccessToken, target: UserId) -> Result<(), SupabaseError> {
        Self::unban_user(self, token, target).await
    }

    async fn delete_user(&self, token: &AccessToken, target: UserId) -> Result<(), SupabaseError> {
        Self::delete_user(self, token, target).await
    }
}

/// Why a panel operation did not run.
#[derive(Debug, Error)]
pub enum AdminPanelError {
    /// The viewer is not a super admin. No remote call was made.
    #[error("access denied")]
    AccessDenied,

    /// The panel was torn down.
    #[error("admin panel closed")]
    Closed,

    /// The remote call failed. A notification has been queued.
    #[error(transparent)]
    Remote(#[from] SupabaseError),
}

#[derive(Debug, Default)]
struct PanelState {
    /// Privilege result for the identity it was computed for.
    privilege: Option<(UserId, bool)>,
    users: Vec<AdminUserRow>,
    notifications: Vec<Notification>,
    /// Newest generation handed out.
    issued: u64,
    /// Generation of the list currently held.
    applied: u64,
    closed: bool,
}

impl PanelState {
    fn notify(&mut self, notification: Notification) {
        if !self.closed {
            self.notifications.push(notification);
        }
    }
}

/// Per-admin user management state.
#[derive(Debug)]
pub struct AdminUserPanel<B> {
    backend: B,
    state: Mutex<PanelState>,
}

impl<B: AdminBackend> AdminUserPanel<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(PanelState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), AdminPanelError> {
        if self.state().closed {
            Err(AdminPanelError::Closed)
        } else {
            Ok(())
        }
    }

    /// Whether `viewer` may use the panel.
    ///
    /// Cached for the panel's lifetime and recomputed only when the identity
    /// changes.
    ///
    /// # Errors
    ///
    /// `Remote` when the lookup fails. A notification is queued and nothing
    /// is cached, so the next call asks again.
    pub async fn check_admin_privilege(&self, viewer: &CurrentUser) -> Result<bool, AdminPanelError> {
        if let Some((cached_for, is_admin)) = self.state().privilege
            && cached_for == viewer.id
        {
            return Ok(is_admin);
        }

        match self.backend.is_super_admin(&viewer.access_token, viewer.id).await {
            Ok(is_admin) => {
                let mut state = self.state();
                if state.privilege.is_some_and(|(id, _)| id != viewer.id) {
                    state.users.clear();
                }
                state.privilege = Some((viewer.id, is_admin));
                Ok(is_admin)
            }
            Err(e) => {
                tracing::warn!(user_id = %viewer.id, error = %e, "Admin privilege check failed");
                self.state()
                    .notify(Notification::error("Failed to verify admin access"));
                Err(e.into())
            }
        }
    }

    async fn require_admin(&self, viewer: &CurrentUser) -> Result<(), AdminPanelError> {
        self.ensure_open()?;
        if self.check_admin_privilege(viewer).await? {
            Ok(())
        } else {
            Err(AdminPanelError::AccessDenied)
        }
    }

    /// Fetch the full user list.
    ///
    /// Returns `true` if the response replaced the held list, `false` if it
    /// was discarded as stale.
    ///
    /// # Errors
    ///
    /// `AccessDenied` without calling the backend for non-admins; `Remote`
    /// when the fetch fails, leaving the previous list in place.
    pub async fn load_users(&self, viewer: &CurrentUser) -> Result<bool, AdminPanelError> {
        self.require_admin(viewer).await?;

        let generation = {
            let mut state = self.state();
            state.issued += 1;
            state.issued
        };

        let result = self.backend.list_users(&viewer.access_token).await;

        let mut state = self.state();
        if state.closed || generation < state.issued || generation <= state.applied {
            tracing::debug!(generation, issued = state.issued, "Discarding stale user list");
            return Ok(false);
        }

        match result {
            Ok(users) => {
                state.users = users;
                state.applied = generation;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load users");
                state.notify(Notification::error("Failed to load users"));
                Err(e.into())
            }
        }
    }

    /// Ban a user, then re-fetch the list.
    ///
    /// # Errors
    ///
    /// See [`Self::load_users`]. A failed ban makes no re-fetch.
    pub async fn ban_user(&self, viewer: &CurrentUser, target: UserId) -> Result<(), AdminPanelError> {
        self.require_admin(viewer).await?;
        let result = self.backend.ban_user(&viewer.access_token, target).await;
        self.after_refetching_mutation(viewer, result, "User banned successfully", "Failed to ban user")
            .await
    }

    /// Lift a ban, then re-fetch the list.
    ///
    /// # Errors
    ///
    /// See [`Self::ban_user`].
    pub async fn unban_user(&self, viewer: &CurrentUser, target: UserId) -> Result<(), AdminPanelError> {
        self.require_admin(viewer).await?;
        let result = self.backend.unban_user(&viewer.access_token, target).await;
        self.after_refetching_mutation(
            viewer,
            result,
            "User unbanned successfully",
            "Failed to unban user",
        )
        .await
    }

    async fn after_refetching_mutation(
        &self,
        viewer: &CurrentUser,
        result: Result<(), SupabaseError>,
        success: &str,
        failure: &str,
    ) -> Result<(), AdminPanelError> {
        if let Err(e) = result {
            self.state().notify(Notification::error(failure));
            return Err(e.into());
        }
        self.state().notify(Notification::success(success));

        match self.load_users(viewer).await {
            Ok(_) | Err(AdminPanelError::Remote(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete a user and drop their row from the held list.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for non-admins; `Remote` when the call fails, leaving
    /// the list unchanged.
    pub async fn delete_user(&self, viewer: &CurrentUser, target: UserId) -> Result<(), AdminPanelError> {
        self.require_admin(viewer).await?;
        let result = self.backend.delete_user(&viewer.access_token, target).await;

        let mut state = self.state();
        match result {
            Ok(()) => {
                if !state.closed {
                    state.users.retain(|row| row.id != target);
                    state.issued += 1;
                    state.applied = state.issued;
                }
                state.notify(Notification::success("User deleted successfully"));
                Ok(())
            }
            Err(e) => {
                state.notify(Notification::error("Failed to delete user"));
                Err(e.into())
            }
        }
    }

    /// Snapshot of the held list.
    #[must_use]
    pub fn users(&self) -> Vec<AdminUserRow> {
        self.state().users.clone()
    }

    /// Take every queued notification.
    #[must_use]
    pub fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state().notifications)
    }

    /// Tear down: drop held data and ignore anything still in flight.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.users.clear();
        state.notifications.clear();
        state.privilege = None;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

/// Registry of open panels, one per user, dropped after an idle period.
#[derive(Clone)]
pub struct AdminPanels<B> {
    backend: B,
    panels: Cache<UserId, Arc<AdminUserPanel<B>>>,
}

impl<B: AdminBackend + Clone> AdminPanels<B> {
    #[must_use]
    pub fn new(backend: B, idle: Duration) -> Self {
        let panels = Cache::builder()
            .max_capacity(1000)
            .time_to_idle(idle)
            .eviction_listener(|user_id: Arc<UserId>, panel: Arc<AdminUserPanel<B>>, cause| {
                tracing::debug!(user_id = %user_id, ?cause, "Admin panel evicted");
                panel.close();
            })
            .build();
        Self { backend, panels }
    }

    /// The user's panel, opening one if needed.
    pub async fn get_or_open(&self, user_id: UserId) -> Arc<AdminUserPanel<B>> {
        let panel = self
            .panels
            .get_with(user_id, async { Arc::new(AdminUserPanel::new(self.backend.clone())) })
            .await;
        if !panel.is_closed() {
            return panel;
        }
        self.panels.invalidate(&user_id).await;
        let fresh = Arc::new(AdminUserPanel::new(self.backend.clone()));
        self.panels.insert(user_id, Arc::clone(&fresh)).await;
        fresh
    }

    /// Tear down the user's panel, if open.
    pub async fn close(&self, user_id: UserId) {
        if let Some(panel) = self.panels.remove(&user_id).await {
            panel.close();
            tracing::debug!(%user_id, "Admin panel closed");
        }
    }

    /// Close panels as their owners sign out.
    pub fn watch(&self, events: &AuthEvents) -> JoinHandle<()> {
        let panels = self.clone();
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::SignedOut { user_id }) => panels.close(user_id).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Admin panel watcher lagged behind auth events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::NotificationLevel;
    use rotharc_core::Email;

    #[derive(Default)]
    struct Calls {
        privilege: AtomicUsize,
        list: AtomicUsize,
        ban: AtomicUsize,
        unban: AtomicUsize,
        delete: AtomicUsize,
    }

    impl Calls {
        fn remote_actions(&self) -> usize {
            self.list.load(Ordering::SeqCst)
                + self.ban.load(Ordering::SeqCst)
                + self.unban.load(Ordering::SeqCst)
                + self.delete.load(Ordering::SeqCst)
        }
    }

    /// Scripted backend: each list call pops one `(delay, rows)` response.
    #[derive(Clone, Default)]
    struct FakeBackend {
        is_admin: bool,
        fail_privilege: bool,
        fail_mutations: bool,
        calls: Arc<Calls>,
        lists: Arc<Mutex<VecDeque<(Duration, Vec<AdminUserRow>)>>>,
    }

    impl FakeBackend {
        fn admin() -> Self {
            Self {
                is_admin: true,
                ..Self::default()
            }
        }

        fn script_list(&self, delay_ms: u64, rows: Vec<AdminUserRow>) {
            self.lists
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), rows));
        }

        fn mutation(&self, counter: &AtomicUsize) -> Result<(), SupabaseError> {
            counter.fetch_add(1, Ordering::SeqCst);
            if self.fail_mutations {
                Err(SupabaseError::Api {
                    status: 400,
                    message: "Not authorized".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl AdminBackend for FakeBackend {
        async fn is_super_admin(&self, _: &AccessToken, _: UserId) -> Result<bool, SupabaseError> {
            self.calls.privilege.fetch_add(1, Ordering::SeqCst);
            if self.fail_privilege {
                return Err(SupabaseError::Api {
                    status: 503,
                    message: "upstream unavailable".to_string(),
                });
            }
            Ok(self.is_admin)
        }

        async fn list_users(&self, _: &AccessToken) -> Result<Vec<AdminUserRow>, SupabaseError> {
            self.calls.list.fetch_add(1, Ordering::SeqCst);
            let next = self.lists.lock().unwrap().pop_front();
            let (delay, rows) = next.unwrap_or_default();
            tokio::time::sleep(delay).await;
            Ok(rows)
        }

        async fn ban_user(&self, _: &AccessToken, _: UserId) -> Result<(), SupabaseError> {
            self.mutation(&self.calls.ban)
        }

        async fn unban_user(&self, _: &AccessToken, _: UserId) -> Result<(), SupabaseError> {
            self.mutation(&self.calls.unban)
        }

        async fn delete_user(&self, _: &AccessToken, _: UserId) -> Result<(), SupabaseError> {
            self.mutation(&self.calls.delete)
        }
    }

    fn viewer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: Email::parse("root@rotharc.fr").unwrap(),
            first_name: "Root".to_string(),
            access_token: AccessToken::new("token".to_string()),
        }
    }

    fn row(first_name: &str) -> AdminUserRow {
        AdminUserRow {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: format!("{}@rotharc.fr", first_name.to_lowercase()),
            first_name: first_name.to_string(),
            last_name: "Test".to_string(),
            avatar_url: None,
            is_banned: false,
            is_super_admin: false,
            is_online: false,
            last_sign_in_at: None,
        }
    }

    #[tokio::test]
    async fn test_delete_removes_only_matching_row() {
        let backend = FakeBackend::admin();
        let rows = vec![row("Ada"), row("Grace"), row("Linus")];
        backend.script_list(0, rows.clone());
        let panel = AdminUserPanel::new(backend.clone());
        let viewer = viewer();

        assert!(panel.load_users(&viewer).await.unwrap());
        panel.delete_user(&viewer, rows[1].id).await.unwrap();

        assert_eq!(panel.users(), vec![rows[0].clone(), rows[2].clone()]);
        assert_eq!(backend.calls.list.load(Ordering::SeqCst), 1);
        let notes = panel.drain_notifications();
        assert_eq!(notes, vec![Notification::success("User deleted successfully")]);
    }

    #[tokio::test]
    async fn test_ban_success_refetches_once() {
        let backend = FakeBackend::admin();
        let before = vec![row("Ada")];
        let mut after = before.clone();
        after[0].is_banned = true;
        backend.script_list(0, before.clone());
        backend.script_list(0, after.clone());
        let panel = AdminUserPanel::new(backend.clone());
        let viewer = viewer();

        panel.load_users(&viewer).await.unwrap();
        panel.ban_user(&viewer, before[0].id).await.unwrap();

        assert_eq!(backend.calls.list.load(Ordering::SeqCst), 2);
        assert_eq!(backend.calls.ban.load(Ordering::SeqCst), 1);
        assert_eq!(panel.users(), after);
        let notes = panel.drain_notifications();
        assert_eq!(notes, vec![Notification::success("User banned successfully")]);
    }

    #[tokio::test]
    async fn test_ban_failure_keeps_list_and_notifies_once() {
        let backend = FakeBackend {
            fail_mutations: true,
            ..FakeBackend::admin()
        };
        let rows = vec![row("Ada"), row("Grace")];
        backend.script_list(0, rows.clone());
        let panel = AdminUserPanel::new(backend.clone());
        let viewer = viewer();

        panel.load_users(&viewer).await.unwrap();
        let err = panel.ban_user(&viewer, rows[0].id).await.unwrap_err();

        assert!(matches!(err, AdminPanelError::Remote(_)));
        assert_eq!(backend.calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(panel.users(), rows);
        let notes = panel.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].message, "Failed to ban user");
        assert!(panel.drain_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_list() {
        let backend = FakeBackend {
            fail_mutations: true,
            ..FakeBackend::admin()
        };
        let rows = vec![row("Ada")];
        backend.script_list(0, rows.clone());
        let panel = AdminUserPanel::new(backend);
        let viewer = viewer();

        panel.load_users(&viewer).await.unwrap();
        assert!(panel.delete_user(&viewer, rows[0].id).await.is_err());
        assert_eq!(panel.users(), rows);
    }

    #[tokio::test]
    async fn test_non_admin_makes_no_remote_calls() {
        let backend = FakeBackend::default();
        let panel = AdminUserPanel::new(backend.clone());
        let viewer = viewer();
        let target = UserId::new(uuid::Uuid::new_v4());

        assert!(!panel.check_admin_privilege(&viewer).await.unwrap());
        assert!(matches!(
            panel.load_users(&viewer).await,
            Err(AdminPanelError::AccessDenied)
        ));
        assert!(panel.ban_user(&viewer, target).await.is_err());
        assert!(panel.unban_user(&viewer, target).await.is_err());
        assert!(panel.delete_user(&viewer, target).await.is_err());

        assert_eq!(backend.calls.remote_actions(), 0);
        assert_eq!(backend.calls.privilege.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_privilege_lookup_is_remote_error() {
        let backend = FakeBackend {
            fail_privilege: true,
            ..FakeBackend::admin()
        };
        let panel = AdminUserPanel::new(backend.clone());
        let viewer = viewer();

        let err = panel.check_admin_privilege(&viewer).await.unwrap_err();
        assert!(matches!(err, AdminPanelError::Remote(_)));
        assert!(matches!(
            panel.load_users(&viewer).await,
            Err(AdminPanelError::Remote(_))
        ));
        assert_eq!(backend.calls.remote_actions(), 0);
        assert_eq!(backend.calls.privilege.load(Ordering::SeqCst), 2);

        let notes = panel.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], Notification::error("Failed to verify admin access"));
    }

    #[tokio::test]
    async fn test_privilege_rechecked_on_identity_change() {
        let backend = FakeBackend::admin();
        let panel = AdminUserPanel::new(backend.clone());

        let first = viewer();
        assert!(panel.check_admin_privilege(&first).await.unwrap());
        assert!(panel.check_admin_privilege(&first).await.unwrap());
        assert_eq!(backend.calls.privilege.load(Ordering::SeqCst), 1);

        assert!(panel.check_admin_privilege(&viewer()).await.unwrap());
        assert_eq!(backend.calls.privilege.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_load_is_discarded() {
        let backend = FakeBackend::admin();
        let stale = vec![row("Old")];
        let fresh = vec![row("New")];
        backend.script_list(100, stale);
        backend.script_list(10, fresh.clone());
        let panel = AdminUserPanel::new(backend);
        let viewer = viewer();
        assert!(panel.check_admin_privilege(&viewer).await.unwrap());

        let (slow, fast) = tokio::join!(panel.load_users(&viewer), panel.load_users(&viewer));

        assert!(!slow.unwrap());
        assert!(fast.unwrap());
        assert_eq!(panel.users(), fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_started_before_delete_is_discarded() {
        let backend = FakeBackend::admin();
        let rows = vec![row("Ada"), row("Grace")];
        backend.script_list(0, rows.clone());
        backend.script_list(50, rows.clone());
        let panel = AdminUserPanel::new(backend);
        let viewer = viewer();
        panel.load_users(&viewer).await.unwrap();

        let (reload, deleted) = tokio::join!(
            panel.load_users(&viewer),
            panel.delete_user(&viewer, rows[0].id)
        );

        deleted.unwrap();
        assert!(!reload.unwrap());
        assert_eq!(panel.users(), vec![rows[1].clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_panel_drops_in_flight_response() {
        let backend = FakeBackend::admin();
        backend.script_list(100, vec![row("Ada")]);
        let panel = Arc::new(AdminUserPanel::new(backend));
        let viewer = viewer();
        assert!(panel.check_admin_privilege(&viewer).await.unwrap());

        let loading = {
            let panel = Arc::clone(&panel);
            let viewer = viewer.clone();
            tokio::spawn(async move { panel.load_users(&viewer).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        panel.close();

        assert!(!loading.await.unwrap().unwrap());
        assert!(panel.users().is_empty());
        assert!(panel.drain_notifications().is_empty());
        assert!(matches!(
            panel.load_users(&viewer).await,
            Err(AdminPanelError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_registry_closes_on_sign_out() {
        let backend = FakeBackend::admin();
        let panels = AdminPanels::new(backend, Duration::from_secs(900));
        let events = AuthEvents::new();
        let watcher = panels.watch(&events);
        let user_id = UserId::new(uuid::Uuid::new_v4());

        let panel = panels.get_or_open(user_id).await;
        let same = panels.get_or_open(user_id).await;
        assert!(Arc::ptr_eq(&panel, &same));

        events.publish(AuthEvent::SignedOut { user_id });
        for _ in 0..100 {
            if panel.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(panel.is_closed());

        let reopened = panels.get_or_open(user_id).await;
        assert!(!Arc::ptr_eq(&panel, &reopened));
        assert!(!reopened.is_closed());
        watcher.abort();
    }
}
