//! GoTrue (`/auth/v1`) operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rotharc_core::UserId;

use super::{SupabaseClient, SupabaseError, decode, expect_success};
use crate::models::{AccessToken, Profile};

/// Minimum password length enforced by the auth server.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration form data.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// A signed-in session as returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// The auth server's view of a user.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// A string field from `user_metadata`, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseClient {
    /// Register a new account.
    ///
    /// Returns `Some(session)` when the project signs new users in
    /// immediately, `None` when email confirmation is pending.
    ///
    /// # Errors
    ///
    /// `UserAlreadyExists` and `WeakPassword` for the matching server
    /// messages, otherwise the underlying HTTP or API error.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn sign_up(&self, form: &SignUp) -> Result<Option<AuthSession>, SupabaseError> {
        let url = self.endpoint("auth/v1/signup")?;
        let body = SignUpBody {
            email: &form.email,
            password: &form.password,
            data: SignUpMetadata {
                first_name: &form.first_name,
                last_name: &form.last_name,
            },
        };

        let response = self.http().post(url).json(&body).send().await?;
        let value: serde_json::Value = decode(response).await.map_err(classify_auth_error)?;

        if value.get("access_token").is_none() {
            tracing::info!(email = %form.email, "Sign-up pending email confirmation");
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SupabaseError::Parse(e.to_string()))
    }

    /// Exchange an email and password for a session.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` when the pair is rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SupabaseError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http()
            .post(url)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;
        decode(response).await.map_err(classify_auth_error)
    }

    /// Revoke the session behind `token`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: &AccessToken) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .http()
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer(Some(token)))
            .send()
            .await?;
        expect_success(response).await
    }

    /// The user owning `token`.
    ///
    /// # Errors
    ///
    /// Returns error if the token is expired or revoked.
    #[instrument(skip_all)]
    pub async fn get_user(&self, token: &AccessToken) -> Result<AuthUser, SupabaseError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .http()
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer(Some(token)))
            .send()
            .await?;
        decode(response).await
    }

    /// The user owning `token` together with their profile row.
    ///
    /// Any failure yields `None`; callers treat that as signed out.
    #[instrument(skip_all)]
    pub async fn get_current_user(&self, token: &AccessToken) -> Option<(AuthUser, Profile)> {
        let user = match self.get_user(token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::debug!(error = %e, "Access token no longer valid");
                return None;
            }
        };
        match self.get_profile(token, user.id).await {
            Ok(profile) => Some((user, profile)),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to load profile");
                None
            }
        }
    }
}

/// Map GoTrue's human-readable messages to typed variants.
fn classify_auth_error(err: SupabaseError) -> SupabaseError {
    let SupabaseError::Api { message, .. } = &err else {
        return err;
    };
    if message.contains("User already registered") {
        SupabaseError::UserAlreadyExists
    } else if message.contains("Password should be") {
        SupabaseError::WeakPassword(message.clone())
    } else if message.contains("Invalid login credentials") {
        SupabaseError::InvalidCredentials
    } else {
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> SupabaseError {
        SupabaseError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_known_messages() {
        assert!(matches!(
            classify_auth_error(api(422, "User already registered")),
            SupabaseError::UserAlreadyExists
        ));
        assert!(matches!(
            classify_auth_error(api(422, "Password should be at least 6 characters.")),
            SupabaseError::WeakPassword(_)
        ));
        assert!(matches!(
            classify_auth_error(api(400, "Invalid login credentials")),
            SupabaseError::InvalidCredentials
        ));
    }

    #[test]
    fn test_classify_passes_other_errors_through() {
        assert!(matches!(
            classify_auth_error(api(500, "boom")),
            SupabaseError::Api { status: 500, .. }
        ));
        assert!(matches!(
            classify_auth_error(SupabaseError::NotFound("x".to_string())),
            SupabaseError::NotFound(_)
        ));
    }

    #[test]
    fn test_session_parses_token_response() {
        let session: AuthSession = serde_json::from_str(
            r#"{
                "access_token":"eyJ.a.b",
                "token_type":"bearer",
                "expires_in":3600,
                "refresh_token":"r1",
                "user":{
                    "id":"5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b",
                    "email":"ada@rotharc.fr",
                    "user_metadata":{"first_name":"Ada","last_name":"Lovelace"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(session.access_token.expose(), "eyJ.a.b");
        assert_eq!(session.user.metadata_str("first_name"), Some("Ada"));
        assert_eq!(session.user.metadata_str("missing"), None);
    }
}
