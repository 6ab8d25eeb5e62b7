//! Admin dashboard route handlers.
//!
//! Each signed-in user gets their own [`AdminUserPanel`](crate::services::AdminUserPanel)
//! from the registry in [`AppState`]. The panel checks privilege before any
//! remote call; the handlers only render its state and move its queued
//! notifications into the session so they survive the redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use rotharc_core::UserId;

use super::Chrome;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, push_flashes};
use crate::models::{AdminUserRow, CurrentUser};
use crate::services::AdminPanelError;
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// User management table.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub users: Vec<AdminUserRow>,
    /// Admin access could not be verified; no list is shown.
    pub unavailable: bool,
}

/// Shown to signed-in users without the super admin flag.
#[derive(Template, WebTemplate)]
#[template(path = "admin/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub chrome: Chrome,
}

async fn access_denied(session: &Session, user: CurrentUser) -> Response {
    tracing::info!(user_id = %user.id, "Admin access denied");
    let page = AccessDeniedTemplate {
        chrome: Chrome::load(session, Some(user)).await,
    };
    (StatusCode::FORBIDDEN, page).into_response()
}

// =============================================================================
// Dashboard
// =============================================================================

/// Show every user with their role and status.
///
/// A failed fetch keeps the last list the panel held and shows the error
/// notification above it. A failed privilege lookup shows the notification
/// and no list.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let panel = state.admin_panels().get_or_open(user.id).await;

    match panel.check_admin_privilege(&user).await {
        Ok(true) => {}
        Ok(false) => return Ok(access_denied(&session, user).await),
        Err(_) => {
            let notifications = panel.drain_notifications();
            return Ok(DashboardTemplate {
                chrome: Chrome::load(&session, Some(user)).await.with(notifications),
                users: Vec::new(),
                unavailable: true,
            }
            .into_response());
        }
    }

    match panel.load_users(&user).await {
        Ok(_) | Err(AdminPanelError::Remote(_)) => {}
        Err(AdminPanelError::AccessDenied) => return Ok(access_denied(&session, user).await),
        Err(AdminPanelError::Closed) => return Ok(Redirect::to("/admin").into_response()),
    }

    let users = panel.users();
    let notifications = panel.drain_notifications();
    Ok(DashboardTemplate {
        chrome: Chrome::load(&session, Some(user)).await.with(notifications),
        users,
        unavailable: false,
    }
    .into_response())
}

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Action {
    Ban,
    Unban,
    Delete,
}

async fn run_action(
    state: &AppState,
    user: CurrentUser,
    session: &Session,
    target: UserId,
    action: Action,
) -> Result<Response> {
    let panel = state.admin_panels().get_or_open(user.id).await;

    let result = match action {
        Action::Ban => panel.ban_user(&user, target).await,
        Action::Unban => panel.unban_user(&user, target).await,
        Action::Delete => panel.delete_user(&user, target).await,
    };

    match result {
        Ok(()) => {
            tracing::info!(admin_id = %user.id, %target, ?action, "Admin action applied");
        }
        Err(AdminPanelError::AccessDenied) => return Ok(access_denied(session, user).await),
        Err(e) => {
            tracing::warn!(admin_id = %user.id, %target, ?action, error = %e, "Admin action failed");
        }
    }

    push_flashes(session, panel.drain_notifications()).await;
    Ok(Redirect::to("/admin").into_response())
}

/// Ban a user.
#[instrument(skip_all, fields(user_id = %user.id, target = %target))]
pub async fn ban(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(target): Path<UserId>,
) -> Result<Response> {
    run_action(&state, user, &session, target, Action::Ban).await
}

/// Lift a ban.
#[instrument(skip_all, fields(user_id = %user.id, target = %target))]
pub async fn unban(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(target): Path<UserId>,
) -> Result<Response> {
    run_action(&state, user, &session, target, Action::Unban).await
}

/// Delete a user account.
#[instrument(skip_all, fields(user_id = %user.id, target = %target))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(target): Path<UserId>,
) -> Result<Response> {
    run_action(&state, user, &session, target, Action::Delete).await
}
