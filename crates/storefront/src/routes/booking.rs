//! Booking wizard route handlers.
//!
//! The wizard state lives in the session and every step is a plain form
//! post followed by a redirect back to `GET /booking`. Refusals from the
//! wizard (missing product, wrong step, payment running) are shown as
//! notifications on that page.
//!
//! Payment confirmation runs in its own task. While it runs, and until the
//! session has taken over its outcome, the state lives in the
//! [`PaymentLedger`]; the session only ever holds the step 4 wizard the
//! payment started from. The outcome survives the visitor's connection
//! dropping mid-wait and requests from other tabs.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use rotharc_core::{
    BookingWizard, ContactField, ContactInfo, LocationField, PaymentGateway, ProductId, StepError,
    UserId, WizardStep,
};

use super::{Chrome, backend_failure};
use crate::catalog::{self, Product};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::{CurrentUser, NewBooking, Notification, session_keys};
use crate::services::PaymentLedger;
use crate::state::AppState;

/// Installation slots offered every day.
pub const TIME_SLOTS: [&str; 5] = ["09:00", "10:30", "14:00", "15:30", "17:00"];

/// Prefix for installation location fields in the contact form.
const LOCATION_PREFIX: &str = "location_";

// =============================================================================
// Form Types
// =============================================================================

/// Query parameters for `GET /booking`.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    /// Preselect a product when the wizard is at step 1.
    pub product: Option<String>,
}

/// Step 1 form.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: String,
    #[serde(default)]
    pub advance: bool,
}

/// Step 2 form.
#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub advance: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// A product choice on step 1.
pub struct ProductChoice {
    pub product: &'static Product,
    pub selected: bool,
}

/// A time slot choice on step 2.
pub struct SlotChoice {
    pub time: &'static str,
    pub selected: bool,
}

/// One entry of the progress indicator.
pub struct StepMarker {
    pub number: u8,
    pub title: &'static str,
    pub current: bool,
    pub done: bool,
}

/// Booking wizard template.
#[derive(Template, WebTemplate)]
#[template(path = "booking/wizard.html")]
pub struct WizardTemplate {
    pub chrome: Chrome,
    pub step_number: u8,
    pub step_title: &'static str,
    pub progress: u16,
    pub markers: Vec<StepMarker>,
    pub products: Vec<ProductChoice>,
    pub selected_product: Option<&'static Product>,
    pub min_date: String,
    pub selected_date: String,
    pub slots: Vec<SlotChoice>,
    pub selected_time: String,
    pub contact: ContactInfo,
    pub processing: bool,
    pub payment_error: Option<String>,
    pub receipt_reference: Option<String>,
}

impl WizardTemplate {
    fn new(chrome: Chrome, wizard: &BookingWizard, today: NaiveDate) -> Self {
        let draft = wizard.draft();
        let step = wizard.step();
        let selected_id = draft.selected_product_id.as_ref().map(ProductId::as_str);
        let selected_time = draft.selected_time.clone().unwrap_or_default();

        Self {
            chrome,
            step_number: step.number(),
            step_title: step.title(),
            progress: wizard.progress_percent(),
            markers: WizardStep::ALL
                .iter()
                .map(|s| StepMarker {
                    number: s.number(),
                    title: s.title(),
                    current: *s == step,
                    done: s.number() < step.number(),
                })
                .collect(),
            products: catalog::all()
                .iter()
                .map(|product| ProductChoice {
                    product,
                    selected: selected_id == Some(product.id),
                })
                .collect(),
            selected_product: selected_id.and_then(catalog::by_id),
            min_date: today.format("%Y-%m-%d").to_string(),
            selected_date: draft
                .selected_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            slots: TIME_SLOTS
                .iter()
                .map(|time| SlotChoice {
                    time,
                    selected: selected_time == *time,
                })
                .collect(),
            selected_time,
            contact: draft.contact_info.clone(),
            processing: wizard.is_processing_payment(),
            payment_error: wizard.payment_error().map(String::from),
            receipt_reference: wizard.receipt().map(|r| r.reference.clone()),
        }
    }
}

// =============================================================================
// Session helpers
// =============================================================================

/// Read the wizard from the session with the user's payment slot applied.
async fn load_wizard(
    payments: &PaymentLedger,
    session: &Session,
    user_id: UserId,
) -> Result<BookingWizard> {
    let mut wizard = session
        .get::<BookingWizard>(session_keys::BOOKING_WIZARD)
        .await?
        .unwrap_or_default();
    if payments.reconcile(user_id, &mut wizard).await {
        save_wizard(session, &wizard).await?;
    }
    Ok(wizard)
}

/// Store the wizard and write the session through immediately.
///
/// A processing wizard is never stored: that state belongs to the ledger.
async fn save_wizard(session: &Session, wizard: &BookingWizard) -> Result<()> {
    if wizard.is_processing_payment() {
        return Ok(());
    }
    session.insert(session_keys::BOOKING_WIZARD, wizard).await?;
    session.save().await?;
    Ok(())
}

/// Queue a refusal for display and return to the wizard.
async fn refuse(session: &Session, err: &StepError) -> Response {
    tracing::debug!(error = %err, "Wizard refused operation");
    push_flash(session, Notification::error(err.to_string())).await;
    Redirect::to("/booking").into_response()
}

fn back_to_wizard() -> Response {
    Redirect::to("/booking").into_response()
}

/// Fill empty contact fields from the signed-in user.
fn prefill_contact(wizard: &mut BookingWizard, user: &CurrentUser) {
    let contact = &wizard.draft().contact_info;
    let missing_email = contact.email.is_empty();
    let missing_first_name = contact.first_name.is_empty();
    if missing_email {
        let _ = wizard.update_contact(ContactField::Email, user.email.as_str());
    }
    if missing_first_name {
        let _ = wizard.update_contact(ContactField::FirstName, user.first_name.as_str());
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the wizard at its current step.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<ShowQuery>,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;

    if let Some(product) = query.product.as_deref().and_then(catalog::by_id)
        && wizard.step() == WizardStep::ProductSelection
        && wizard.select_product(product.product_id()).is_ok()
    {
        save_wizard(&session, &wizard).await?;
    }

    let chrome = Chrome::load(&session, Some(user)).await;
    let today = Utc::now().date_naive();
    Ok(WizardTemplate::new(chrome, &wizard, today).into_response())
}

/// Step 1: choose the enhancement.
pub async fn select_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;

    let Some(product) = catalog::by_id(form.product_id.trim()) else {
        push_flash(&session, Notification::error("Amélioration inconnue.")).await;
        return Ok(back_to_wizard());
    };

    if let Err(e) = wizard.select_product(product.product_id()) {
        return Ok(refuse(&session, &e).await);
    }
    if form.advance
        && let Err(e) = wizard.try_advance()
    {
        save_wizard(&session, &wizard).await?;
        return Ok(refuse(&session, &e).await);
    }

    save_wizard(&session, &wizard).await?;
    Ok(back_to_wizard())
}

/// Step 2: choose date and slot.
///
/// Dates before today and slots outside [`TIME_SLOTS`] are refused here;
/// the wizard itself only checks presence.
pub async fn schedule(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ScheduleForm>,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;
    let today = Utc::now().date_naive();

    if !form.date.trim().is_empty() {
        match validate_date(form.date.trim(), today) {
            Ok(date) => {
                if let Err(e) = wizard.select_date(date) {
                    return Ok(refuse(&session, &e).await);
                }
            }
            Err(message) => {
                push_flash(&session, Notification::error(message)).await;
                return Ok(back_to_wizard());
            }
        }
    }

    if !form.time.trim().is_empty() {
        let time = form.time.trim();
        if !TIME_SLOTS.contains(&time) {
            push_flash(&session, Notification::error("Créneau horaire indisponible.")).await;
            return Ok(back_to_wizard());
        }
        if let Err(e) = wizard.select_time(time) {
            return Ok(refuse(&session, &e).await);
        }
    }

    let advanced = if form.advance {
        wizard.try_advance().map(|_| ())
    } else {
        Ok(())
    };
    if wizard.step() == WizardStep::ContactDetails {
        prefill_contact(&mut wizard, &user);
    }
    save_wizard(&session, &wizard).await?;

    match advanced {
        Ok(()) => Ok(back_to_wizard()),
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

/// Step 3: contact and installation details.
///
/// Fields are applied one by one by name. An unknown name refuses the
/// whole submission.
pub async fn contact(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;

    let mut advance = false;
    for (name, value) in fields {
        if name == "advance" {
            advance = value == "true";
            continue;
        }
        if let Err(e) = apply_contact_field(&mut wizard, &name, value) {
            return Ok(refuse(&session, &e).await);
        }
    }

    let advanced = if advance {
        wizard.try_advance().map(|_| ())
    } else {
        Ok(())
    };
    save_wizard(&session, &wizard).await?;

    match advanced {
        Ok(()) => Ok(back_to_wizard()),
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

/// Move forward. At step 4 this confirms payment and only redirects once
/// the gateway has answered.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn next(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;

    if wizard.step() == WizardStep::PaymentConfirmation && !wizard.is_processing_payment() {
        return confirm_payment(&state, session, user.id, wizard).await;
    }

    let advanced = wizard.try_advance();
    if wizard.step() == WizardStep::ContactDetails {
        prefill_contact(&mut wizard, &user);
    }
    save_wizard(&session, &wizard).await?;
    match advanced {
        Ok(_) => Ok(back_to_wizard()),
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

async fn confirm_payment(
    state: &AppState,
    session: Session,
    user_id: UserId,
    before: BookingWizard,
) -> Result<Response> {
    let mut wizard = before.clone();
    let submission = match wizard.begin_payment() {
        Ok(submission) => submission,
        Err(e) => return Ok(refuse(&session, &e).await),
    };
    if !state.payments().try_start(user_id).await {
        return Ok(refuse(&session, &StepError::PaymentInProgress).await);
    }
    add_breadcrumb(
        "booking",
        "Payment started",
        &[("product_id", submission.product_id.as_str())],
    );

    let gateway = *state.payment();
    let payments = state.payments().clone();
    let joined = tokio::spawn(async move {
        let result = gateway.confirm(&submission).await;
        let step = wizard.finish_payment(result);
        payments.settle(user_id, before, wizard).await;
        step
    })
    .await;

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            state.payments().clear(user_id).await;
            return Err(AppError::Internal(format!("payment task failed: {e}")));
        }
    };
    // Take the settled wizard over into this session
    load_wizard(state.payments(), &session, user_id).await?;

    match outcome {
        Ok(_) => Ok(back_to_wizard()),
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

/// Go back one step.
pub async fn previous(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;
    match wizard.retreat() {
        Ok(_) => {
            save_wizard(&session, &wizard).await?;
            Ok(back_to_wizard())
        }
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

/// Clear the draft and return to step 1.
pub async fn reset(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let mut wizard = load_wizard(state.payments(), &session, user.id).await?;
    match wizard.reset() {
        Ok(()) => {
            save_wizard(&session, &wizard).await?;
            state.payments().clear(user.id).await;
            Ok(back_to_wizard())
        }
        Err(e) => Ok(refuse(&session, &e).await),
    }
}

/// Step 5 "done": create the booking, then start over.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn complete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let wizard = load_wizard(state.payments(), &session, user.id).await?;
    let Some(submission) = wizard.submission() else {
        return Ok(refuse(&session, &StepError::PaymentRequired).await);
    };

    let booking = NewBooking::from_submission(user.id, &submission);
    match state
        .supabase()
        .create_booking(&user.access_token, &booking)
        .await
    {
        Ok(created) => {
            save_wizard(&session, &BookingWizard::new()).await?;
            state.payments().clear(user.id).await;
            add_breadcrumb("booking", "Booking created", &[("booking_id", &created.id.to_string())]);
            push_flash(
                &session,
                Notification::success("Votre réservation a été enregistrée."),
            )
            .await;
            Ok(Redirect::to("/account/reservations").into_response())
        }
        Err(e) if e.is_unauthorized() => Ok(backend_failure(&state, &session, &user, e).await),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create booking");
            push_flash(
                &session,
                Notification::error("La réservation n'a pas pu être enregistrée. Veuillez réessayer."),
            )
            .await;
            Ok(back_to_wizard())
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Parse a `YYYY-MM-DD` date that is not before `today`.
fn validate_date(raw: &str, today: NaiveDate) -> std::result::Result<NaiveDate, &'static str> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| "Date invalide.")?;
    if date < today {
        return Err("La date d'installation ne peut pas être dans le passé.");
    }
    if today.checked_add_days(Days::new(366)).is_some_and(|limit| date > limit) {
        return Err("Les réservations sont ouvertes sur un an maximum.");
    }
    Ok(date)
}

/// Apply one named contact form field.
fn apply_contact_field(
    wizard: &mut BookingWizard,
    name: &str,
    value: String,
) -> std::result::Result<(), StepError> {
    if let Some(location_field) = name.strip_prefix(LOCATION_PREFIX) {
        let field: LocationField = location_field.parse()?;
        return wizard.update_installation_location(field, value);
    }
    let field: ContactField = name.parse()?;
    wizard.update_contact(field, value)
}
