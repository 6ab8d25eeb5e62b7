//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Landing page
//! GET  /health                        - Liveness check
//!
//! # Catalogue
//! GET  /products                      - Product listing (?category=)
//! GET  /products/{id}                 - Product detail
//!
//! # Booking wizard (requires auth)
//! GET  /booking                       - Current step (?product= preselects)
//! POST /booking/product               - Step 1: choose product
//! POST /booking/schedule              - Step 2: choose date and slot
//! POST /booking/contact               - Step 3: contact details
//! POST /booking/next                  - Advance (confirms payment at step 4)
//! POST /booking/previous              - Go back one step
//! POST /booking/reset                 - Start over
//! POST /booking/complete              - Create the booking from the summary
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /account                       - Profile
//! POST /account                       - Update profile
//! GET  /account/reservations          - Booking history
//! POST /account/reservations/{id}/cancel
//!
//! # Admin (requires super admin)
//! GET  /admin                         - User management
//! POST /admin/users/{id}/ban
//! POST /admin/users/{id}/unban
//! POST /admin/users/{id}/delete
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod booking;
pub mod home;
pub mod products;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{clear_current_user, push_flash, take_flash};
use crate::models::{CurrentUser, Notification};
use crate::services::AuthEvent;
use crate::state::AppState;
use crate::supabase::SupabaseError;

/// Header data every page needs: who is signed in and pending notifications.
pub struct Chrome {
    pub user: Option<CurrentUser>,
    pub flash: Vec<Notification>,
}

impl Chrome {
    /// Build the chrome, consuming queued notifications.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            user,
            flash: take_flash(session).await,
        }
    }

    /// Append notifications produced while handling this request.
    #[must_use]
    pub fn with(mut self, notifications: impl IntoIterator<Item = Notification>) -> Self {
        self.flash.extend(notifications);
        self
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.first_name.as_str())
    }
}

/// Handle a backend failure on behalf of a signed-in user.
///
/// A rejected token means the session is stale: sign the visitor out and
/// send them to the login page. Anything else becomes an error page.
pub async fn backend_failure(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    err: SupabaseError,
) -> Response {
    if !err.is_unauthorized() {
        return AppError::from(err).into_response();
    }
    tracing::info!(user_id = %user.id, "Access token rejected, signing out");
    state
        .auth_events()
        .publish(AuthEvent::SignedOut { user_id: user.id });
    if let Err(e) = clear_current_user(session).await {
        return AppError::from(e).into_response();
    }
    push_flash(
        session,
        Notification::error("Votre session a expiré, veuillez vous reconnecter."),
    )
    .await;
    Redirect::to("/auth/login").into_response()
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
pub async fn health() -> &'static str {
    "ok"
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the booking wizard routes router.
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(booking::show))
        .route("/product", post(booking::select_product))
        .route("/schedule", post(booking::schedule))
        .route("/contact", post(booking::contact))
        .route("/next", post(booking::next))
        .route("/previous", post(booking::previous))
        .route("/reset", post(booking::reset))
        .route("/complete", post(booking::complete))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).post(account::update_profile))
        .route("/reservations", get(account::reservations))
        .route(
            "/reservations/{id}/cancel",
            post(account::cancel_reservation),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/users/{id}/ban", post(admin::ban))
        .route("/users/{id}/unban", post(admin::unban))
        .route("/users/{id}/delete", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .nest("/products", product_routes())
        .nest("/booking", booking_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}
