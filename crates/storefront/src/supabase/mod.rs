//! Supabase clients: auth (GoTrue), rows (PostgREST) and edge functions.
//!
//! # Architecture
//!
//! - Supabase is the source of truth for users, profiles and bookings. The
//!   storefront keeps no database of its own.
//! - One `reqwest::Client` is shared by all three APIs; every request carries
//!   the project's anon key as `apikey`.
//! - Requests made on behalf of a signed-in user carry that user's access
//!   token as the bearer credential so row-level security applies.
//!
//! # Example
//!
//! ```rust,ignore
//! use rotharc_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let session = client.sign_in("jane@rotharc.fr", "hunter22").await?;
//! let bookings = client.get_user_bookings(&session.access_token, session.user.id).await?;
//! ```

mod auth;
mod functions;
mod rest;

pub use auth::{AuthSession, AuthUser, MIN_PASSWORD_LEN, SignUp};

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;
use crate::models::AccessToken;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A single row was expected but none matched.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Email/password pair rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Sign-up for an email that already has an account.
    #[error("user already registered")]
    UserAlreadyExists,

    /// Password rejected by the auth server's policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Client construction failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SupabaseError {
    /// Whether the failure was the backend refusing the caller's credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Client for a Supabase project.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let anon_key = config.anon_key.expose_secret().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&anon_key)
                .map_err(|e| SupabaseError::Config(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("rotharc-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.clone(),
                anon_key,
            }),
        })
    }

    /// Build an absolute URL under the project URL.
    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| SupabaseError::Config(format!("bad endpoint {path}: {e}")))
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Bearer value for a request: the user's token, or the anon key for
    /// public reads.
    fn bearer(&self, token: Option<&AccessToken>) -> String {
        let raw = token.map_or(self.inner.anon_key.as_str(), AccessToken::expose);
        format!("Bearer {raw}")
    }
}

/// Error body shapes returned by the three Supabase APIs.
///
/// GoTrue uses `msg` / `error_description`, PostgREST uses `message`, and
/// edge functions written for this project return `error`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Turn a non-success response into a `SupabaseError::Api`.
async fn api_error(response: reqwest::Response) -> SupabaseError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| text.chars().take(200).collect());
    SupabaseError::Api { status, message }
}

/// Check the status and decode a JSON body.
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SupabaseError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse Supabase response"
        );
        SupabaseError::Parse(e.to_string())
    })
}

/// Check the status and discard the body.
async fn expect_success(response: reqwest::Response) -> Result<(), SupabaseError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}
