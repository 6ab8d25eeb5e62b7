//! Authentication route handlers.
//!
//! Login, registration and logout against the backend's auth API. Form
//! problems re-render the form with an inline error; the password never
//! leaves this module except in the request to the auth server.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use rotharc_core::Email;

use super::Chrome;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, push_flash, set_current_user};
use crate::models::{CurrentUser, Notification};
use crate::services::AuthEvent;
use crate::state::AppState;
use crate::supabase::{AuthSession, MIN_PASSWORD_LEN, SignUp, SupabaseError};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub error: Option<String>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub error: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterTemplate {
    fn with_error(chrome: Chrome, form: RegisterForm, error: impl Into<String>) -> Self {
        Self {
            chrome,
            error: Some(error.into()),
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go to their profile.
pub async fn login_page(OptionalAuth(user): OptionalAuth, session: Session) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        chrome: Chrome::load(&session, None).await,
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let render_error = |session: Session, email: String, message: &'static str| async move {
        LoginTemplate {
            chrome: Chrome::load(&session, None).await,
            error: Some(message.to_string()),
            email,
        }
        .into_response()
    };

    let Ok(email) = Email::parse(&form.email) else {
        return Ok(render_error(session, form.email, "Adresse e-mail invalide.").await);
    };

    match state.supabase().sign_in(email.as_str(), &form.password).await {
        Ok(auth) => {
            start_session(&state, &session, auth, email).await?;
            push_flash(&session, Notification::success("Connexion réussie.")).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(SupabaseError::InvalidCredentials) => Ok(render_error(
            session,
            form.email,
            "Email ou mot de passe incorrect.",
        )
        .await),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(render_error(
                session,
                form.email,
                "La connexion a échoué. Veuillez réessayer.",
            )
            .await)
        }
    }
}

/// Store the identity for a fresh auth session and announce it.
async fn start_session(
    state: &AppState,
    session: &Session,
    auth: AuthSession,
    fallback_email: Email,
) -> Result<()> {
    // The profile row may lag behind sign-up; fall back to the auth user
    let (auth_user, profile) = match state.supabase().get_current_user(&auth.access_token).await {
        Some((user, profile)) => (user, Some(profile)),
        None => (auth.user, None),
    };
    let first_name = profile
        .and_then(|p| p.first_name)
        .filter(|name| !name.is_empty())
        .or_else(|| auth_user.metadata_str("first_name").map(String::from))
        .unwrap_or_default();
    let email = auth_user
        .email
        .as_deref()
        .and_then(|e| Email::parse(e).ok())
        .unwrap_or(fallback_email);

    let user = CurrentUser {
        id: auth_user.id,
        email,
        first_name,
        access_token: auth.access_token,
    };
    set_current_user(session, &user).await?;
    state
        .auth_events()
        .publish(AuthEvent::SignedIn { user_id: user.id });
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth, session: Session) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        chrome: Chrome::load(&session, None).await,
        error: None,
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
    }
    .into_response()
}

/// Check a registration form before calling the backend.
fn validate_registration(form: &RegisterForm) -> std::result::Result<Email, &'static str> {
    let email = Email::parse(&form.email).map_err(|_| "Adresse e-mail invalide.")?;
    if form.password != form.password_confirm {
        return Err("Les mots de passe ne correspondent pas.");
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Le mot de passe doit contenir au moins 6 caractères.");
    }
    Ok(email)
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let email = match validate_registration(&form) {
        Ok(email) => email,
        Err(message) => {
            let chrome = Chrome::load(&session, None).await;
            return Ok(RegisterTemplate::with_error(chrome, form, message).into_response());
        }
    };

    let sign_up = SignUp {
        email: email.as_str().to_string(),
        password: form.password.clone(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
    };

    match state.supabase().sign_up(&sign_up).await {
        Ok(Some(auth)) => {
            start_session(&state, &session, auth, email).await?;
            push_flash(&session, Notification::success("Bienvenue chez Rotharc !")).await;
            Ok(Redirect::to("/").into_response())
        }
        Ok(None) => {
            push_flash(
                &session,
                Notification::success(
                    "Compte créé. Confirmez votre adresse e-mail puis connectez-vous.",
                ),
            )
            .await;
            Ok(Redirect::to("/auth/login").into_response())
        }
        Err(e) => {
            let message = match &e {
                SupabaseError::UserAlreadyExists => {
                    "Un compte existe déjà avec cette adresse e-mail."
                }
                SupabaseError::WeakPassword(_) => {
                    "Le mot de passe doit contenir au moins 6 caractères."
                }
                _ => {
                    tracing::warn!(error = %e, "Registration failed");
                    "L'inscription a échoué. Veuillez réessayer."
                }
            };
            let chrome = Chrome::load(&session, None).await;
            Ok(RegisterTemplate::with_error(chrome, form, message).into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The local session is cleared even if the backend cannot be reached.
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Response> {
    if let Some(user) = user {
        if let Err(e) = state.supabase().sign_out(&user.access_token).await {
            tracing::warn!(user_id = %user.id, error = %e, "Backend sign-out failed");
        }
        state
            .auth_events()
            .publish(AuthEvent::SignedOut { user_id: user.id });
        tracing::info!(user_id = %user.id, "User signed out");
    }
    clear_current_user(&session).await?;
    Ok(Redirect::to("/").into_response())
}
