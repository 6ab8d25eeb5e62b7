//! Account route handlers: profile and reservations.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use rotharc_core::{BookingId, BookingStatus};

use super::{Chrome, backend_failure};
use crate::catalog;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, push_flash, set_current_user};
use crate::models::{Booking, Notification, ProfileUpdate};
use crate::services::AuthEvent;
use crate::state::AppState;
use crate::supabase::SupabaseError;

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub chrome: Chrome,
    pub email: String,
    pub avatar_url: Option<String>,
    pub form: ProfileUpdate,
}

/// A booking row for display.
pub struct ReservationView {
    pub id: BookingId,
    pub product_name: String,
    pub product_image: Option<&'static str>,
    pub date: String,
    pub time: String,
    pub status: BookingStatus,
    pub cancellable: bool,
}

impl From<Booking> for ReservationView {
    fn from(booking: Booking) -> Self {
        let product = catalog::by_id(booking.product_id.as_str());
        Self {
            id: booking.id,
            product_name: product.map_or_else(|| booking.product_id.to_string(), |p| p.name.to_string()),
            product_image: product.map(|p| p.image_url),
            date: booking.booking_date.date_naive().format("%Y-%m-%d").to_string(),
            time: booking.booking_time,
            status: booking.status,
            cancellable: booking.status.is_cancellable(),
        }
    }
}

/// Reservations page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/reservations.html")]
pub struct ReservationsTemplate {
    pub chrome: Chrome,
    pub reservations: Vec<ReservationView>,
    pub load_failed: bool,
}

// =============================================================================
// Profile
// =============================================================================

/// Display the profile form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let profile = match state.supabase().get_profile(&user.access_token, user.id).await {
        Ok(profile) => profile,
        Err(e) => return Ok(backend_failure(&state, &session, &user, e).await),
    };

    let email = user.email.to_string();
    Ok(ProfileTemplate {
        chrome: Chrome::load(&session, Some(user)).await,
        email,
        avatar_url: profile.avatar_url.clone(),
        form: ProfileUpdate::from(&profile),
    }
    .into_response())
}

/// Save the profile form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(mut user): RequireAuth,
    session: Session,
    Form(form): Form<ProfileUpdate>,
) -> Result<Response> {
    let update = form.trimmed();

    match state
        .supabase()
        .update_profile(&user.access_token, user.id, &update)
        .await
    {
        Ok(()) => {
            user.first_name.clone_from(&update.first_name);
            set_current_user(&session, &user).await?;
            state
                .auth_events()
                .publish(AuthEvent::ProfileUpdated { user_id: user.id });
            push_flash(&session, Notification::success("Profil mis à jour avec succès.")).await;
        }
        Err(e) if e.is_unauthorized() => {
            return Ok(backend_failure(&state, &session, &user, e).await);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile update failed");
            push_flash(
                &session,
                Notification::error("Erreur lors de la mise à jour du profil."),
            )
            .await;
        }
    }

    Ok(Redirect::to("/account").into_response())
}

// =============================================================================
// Reservations
// =============================================================================

/// Display the user's bookings, earliest first.
///
/// A failed fetch shows an empty list with a notice rather than an error
/// page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn reservations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let (reservations, load_failed) = match state
        .supabase()
        .get_user_bookings(&user.access_token, user.id)
        .await
    {
        Ok(bookings) => (bookings.into_iter().map(ReservationView::from).collect(), false),
        Err(e) if e.is_unauthorized() => {
            return Ok(backend_failure(&state, &session, &user, e).await);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load bookings");
            (Vec::new(), true)
        }
    };

    Ok(ReservationsTemplate {
        chrome: Chrome::load(&session, Some(user)).await,
        reservations,
        load_failed,
    }
    .into_response())
}

/// Cancel one booking while it is still pending.
///
/// Ownership is enforced by the backend's row-level security; a booking the
/// user cannot see or that has moved on from pending matches no row.
#[instrument(skip_all, fields(user_id = %user.id, booking_id = %id))]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response> {
    let booking_id =
        BookingId::parse(&id).map_err(|_| AppError::BadRequest(format!("invalid booking id {id}")))?;

    match state
        .supabase()
        .cancel_booking(&user.access_token, booking_id)
        .await
    {
        Ok(_) => {
            push_flash(&session, Notification::success("Réservation annulée.")).await;
        }
        Err(SupabaseError::NotFound(_)) => {
            push_flash(
                &session,
                Notification::error("Cette réservation ne peut plus être annulée."),
            )
            .await;
        }
        Err(e) if e.is_unauthorized() => {
            return Ok(backend_failure(&state, &session, &user, e).await);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cancel booking");
            push_flash(
                &session,
                Notification::error("L'annulation a échoué. Veuillez réessayer."),
            )
            .await;
        }
    }

    Ok(Redirect::to("/account/reservations").into_response())
}
