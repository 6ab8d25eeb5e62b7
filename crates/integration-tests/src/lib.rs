//! Live HTTP tests for the Rotharc storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront against a Supabase project with a test user
//! cargo run -p rotharc-storefront
//!
//! # Run the live tests
//! ROTHARC_TEST_EMAIL=... ROTHARC_TEST_PASSWORD=... \
//!     cargo test -p rotharc-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `ROTHARC_BASE_URL` - defaults to `http://localhost:3000`
//! - `ROTHARC_TEST_EMAIL` / `ROTHARC_TEST_PASSWORD` - a confirmed user
//! - `ROTHARC_TEST_ADMIN_EMAIL` / `ROTHARC_TEST_ADMIN_PASSWORD` - a super
//!   admin, for the dashboard tests

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::{Client, Response, redirect::Policy};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

/// Variable the storefront reads its public URL from.
pub const BASE_URL_VAR: &str = "ROTHARC_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// The storefront URL, falling back to the local default.
///
/// # Errors
///
/// Returns an error if `raw` is not a valid URL.
pub fn base_url(raw: Option<&str>) -> Result<Url, url::ParseError> {
    Url::parse(raw.unwrap_or(DEFAULT_BASE_URL))
}

/// Credentials for a test account.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    /// Read credentials from a pair of environment variables.
    #[must_use]
    pub fn from_env(email_var: &str, password_var: &str) -> Option<Self> {
        let email = std::env::var(email_var).ok()?;
        let password = std::env::var(password_var).ok()?;
        Some(Self {
            email,
            password: SecretString::from(password),
        })
    }

    /// The regular test user.
    #[must_use]
    pub fn user() -> Option<Self> {
        Self::from_env("ROTHARC_TEST_EMAIL", "ROTHARC_TEST_PASSWORD")
    }

    /// The super admin test user.
    #[must_use]
    pub fn admin() -> Option<Self> {
        Self::from_env("ROTHARC_TEST_ADMIN_EMAIL", "ROTHARC_TEST_ADMIN_PASSWORD")
    }
}

#[derive(Serialize)]
struct LoginForm<'a> {
    email: &'a str,
    password: &'a str,
}

/// One visitor: a cookie jar and the storefront's address.
///
/// Redirects are not followed so tests can assert on them.
pub struct TestContext {
    pub client: Client,
    pub base_url: Url,
}

impl TestContext {
    /// Build a context for `ROTHARC_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if `ROTHARC_BASE_URL` is not a valid URL.
    #[allow(clippy::expect_used)]
    pub fn new() -> reqwest::Result<Self> {
        let raw = std::env::var(BASE_URL_VAR).ok();
        let url = base_url(raw.as_deref()).expect("ROTHARC_BASE_URL must be a URL");
        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: url,
        })
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    /// `GET` a path.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.url(path)).send().await
    }

    /// `POST` a urlencoded form.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> reqwest::Result<Response> {
        self.client.post(self.url(path)).form(form).send().await
    }

    /// Sign in; the session cookie stays in this context's jar.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn login(&self, credentials: &Credentials) -> reqwest::Result<Response> {
        self.post_form(
            "/auth/login",
            &LoginForm {
                email: &credentials.email,
                password: credentials.password.expose_secret(),
            },
        )
        .await
    }
}

/// Value of the `Location` header, if any.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
