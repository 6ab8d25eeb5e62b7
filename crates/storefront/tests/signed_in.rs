//! Router tests for signed-in flows.
//!
//! A small axum app on a loopback port stands in for the Supabase project:
//! it answers the auth, rest and edge function endpoints the storefront
//! calls and records what it was sent. Requests go through the real router,
//! carrying the session cookie from one response to the next like a browser.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{RawQuery, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Days, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use rotharc_storefront::config::{StorefrontConfig, SupabaseConfig};
use rotharc_storefront::state::AppState;

const USER_ID: &str = "5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b";
const TARGET_ID: &str = "9a1b2c3d-4e5f-4a6b-8c7d-0e1f2a3b4c5d";
const BOOKING_ID: &str = "0d7e1c2b-7a4f-4b8e-9c1d-2e3f4a5b6c7d";

// =============================================================================
// Backend stand-in
// =============================================================================

#[derive(Default)]
struct Backend {
    is_admin: bool,
    privilege_lookup_down: bool,
    bookings: Mutex<Vec<Value>>,
    status_patches: Mutex<Vec<String>>,
    banned: Mutex<Vec<Value>>,
}

fn auth_user() -> Value {
    json!({
        "id": USER_ID,
        "email": "ada@rotharc.fr",
        "user_metadata": {"first_name": "Ada", "last_name": "Lovelace"}
    })
}

async fn token() -> Json<Value> {
    Json(json!({
        "access_token": "eyJ.stub.token",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": auth_user()
    }))
}

async fn user() -> Json<Value> {
    Json(auth_user())
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn profiles() -> Json<Value> {
    Json(json!([{"id": USER_ID, "first_name": "Ada", "last_name": "Lovelace"}]))
}

async fn admin_users(State(backend): State<Arc<Backend>>) -> Response {
    if backend.privilege_lookup_down {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "upstream timeout"})),
        )
            .into_response();
    }
    if backend.is_admin {
        Json(json!([{"is_super_admin": true}])).into_response()
    } else {
        Json(json!([])).into_response()
    }
}

async fn list_bookings(State(backend): State<Arc<Backend>>) -> Json<Value> {
    Json(Value::Array(backend.bookings.lock().unwrap().clone()))
}

async fn insert_booking(
    State(backend): State<Arc<Backend>>,
    Json(mut row): Json<Value>,
) -> Json<Value> {
    row["id"] = json!(BOOKING_ID);
    row["status"] = json!("pending");
    row["created_at"] = Value::Null;
    row["updated_at"] = Value::Null;
    backend.bookings.lock().unwrap().push(row.clone());
    Json(json!([row]))
}

/// Matches nothing, as for a booking that is no longer pending.
async fn patch_booking(
    State(backend): State<Arc<Backend>>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    backend
        .status_patches
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());
    Json(json!([]))
}

async fn testimonials() -> Json<Value> {
    Json(json!([]))
}

async fn list_users() -> Json<Value> {
    Json(json!([{
        "id": TARGET_ID,
        "email": "bob@rotharc.fr",
        "firstName": "Bob",
        "lastName": "Sinclair",
        "isBanned": false
    }]))
}

/// Answers like the deployed function: 204 and no body.
async fn ban_user(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> StatusCode {
    backend.banned.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn start_backend(backend: Backend) -> (SocketAddr, Arc<Backend>) {
    let backend = Arc::new(backend);
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .route("/rest/v1/profiles", get(profiles))
        .route("/rest/v1/admin_users", get(admin_users))
        .route(
            "/rest/v1/bookings",
            get(list_bookings).post(insert_booking).patch(patch_booking),
        )
        .route("/rest/v1/testimonials", get(testimonials))
        .route("/functions/v1/list-users", post(list_users))
        .route("/functions/v1/ban-user", post(ban_user))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve backend") });
    (addr, backend)
}

// =============================================================================
// Browser
// =============================================================================

/// The storefront router plus the session cookie it last handed out.
#[derive(Clone)]
struct Browser {
    app: Router,
    cookie: Arc<Mutex<Option<String>>>,
}

impl Browser {
    fn new(backend: SocketAddr, payment_delay: Duration) -> Self {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            supabase: SupabaseConfig {
                url: Url::parse(&format!("http://{backend}/")).unwrap(),
                anon_key: SecretString::from("eyJhbGciOiJIUzI1NiJ9.test-anon-key"),
            },
            payment_delay,
            admin_panel_idle: Duration::from_secs(60),
            sentry_dsn: None,
            sentry_environment: None,
        };
        Self {
            app: rotharc_storefront::app(AppState::new(config).unwrap()),
            cookie: Arc::default(),
        }
    }

    async fn send(&self, request: axum::http::request::Builder, body: Body) -> Response {
        let cookie = self.cookie.lock().unwrap().clone();
        let request = match cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        };
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap().to_string();
            *self.cookie.lock().unwrap() = Some(pair);
        }
        response
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    async fn post_form(&self, uri: &str, body: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        )
        .await
    }

    /// GET a page that must render.
    async fn page(&self, uri: &str) -> String {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        body_text(response).await
    }

    async fn login(&self) {
        let response = self
            .post_form("/auth/login", "email=ada%40rotharc.fr&password=hunter22")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    async fn walk_to_payment(&self) {
        self.post_form("/booking/product", "product_id=memory-matrix&advance=true")
            .await;
        self.post_form(
            "/booking/schedule",
            &format!("date={}&time=09:00&advance=true", in_a_month()),
        )
        .await;
        self.post_form("/booking/contact", "last_name=Lovelace&advance=true")
            .await;
        assert!(self.page("/booking").await.contains("Confirmer et payer"));
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn in_a_month() -> String {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(30))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

// =============================================================================
// Booking wizard
// =============================================================================

#[tokio::test]
async fn test_booking_wizard_through_routes() {
    let (addr, backend) = start_backend(Backend::default()).await;
    let browser = Browser::new(addr, Duration::from_millis(10));
    browser.login().await;

    let response = browser
        .post_form("/booking/product", "product_id=memory-matrix&advance=true")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/booking");
    assert!(browser.page("/booking").await.contains("Étape 2"));

    browser
        .post_form("/booking/schedule", "date=2001-01-01&time=09:00&advance=true")
        .await;
    let page = browser.page("/booking").await;
    assert!(page.contains("ne peut pas être dans le passé"));
    assert!(page.contains("Étape 2"));

    let date = in_a_month();
    browser
        .post_form("/booking/schedule", &format!("date={date}&time=12:00&advance=true"))
        .await;
    let page = browser.page("/booking").await;
    assert!(page.contains("Créneau horaire indisponible."));
    assert!(page.contains("Étape 2"));

    browser
        .post_form("/booking/schedule", &format!("date={date}&time=09:00&advance=true"))
        .await;
    let page = browser.page("/booking").await;
    assert!(page.contains("Étape 3"));
    assert!(page.contains("ada@rotharc.fr"));

    browser
        .post_form("/booking/contact", "last_name=Lovelace&phone=0600000000&advance=true")
        .await;
    assert!(browser.page("/booking").await.contains("Confirmer et payer"));

    let response = browser.post_form("/booking/next", "").await;
    assert_eq!(location(&response), "/booking");
    let page = browser.page("/booking").await;
    assert!(page.contains("Paiement confirmé."));
    assert!(page.contains("SIM-"));

    let response = browser.post_form("/booking/complete", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account/reservations");
    let created = backend.bookings.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["user_id"], USER_ID);
    assert_eq!(created[0]["product_id"], "memory-matrix");
    assert_eq!(created[0]["booking_time"], "09:00");

    let page = browser.page("/account/reservations").await;
    assert!(page.contains("Votre réservation a été enregistrée."));
    assert!(page.contains("Memory Matrix"));
    assert!(browser.page("/booking").await.contains("Étape 1"));
}

#[tokio::test]
async fn test_requests_during_payment_keep_its_outcome() {
    let (addr, _backend) = start_backend(Backend::default()).await;
    let browser = Browser::new(addr, Duration::from_millis(800));
    browser.login().await;
    browser.walk_to_payment().await;

    let paying = browser.clone();
    let confirm = tokio::spawn(async move { paying.post_form("/booking/next", "").await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Other tabs of the same session while the gateway works
    let page = browser.page("/booking").await;
    assert!(page.contains("Paiement en cours de traitement"));
    assert!(!page.contains("Confirmer et payer"));
    browser.post_form("/booking/reset", "").await;
    browser.post_form("/booking/next", "").await;
    let page = browser.page("/booking").await;
    assert!(page.contains("Paiement en cours de traitement."));

    let response = confirm.await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = browser.page("/booking").await;
    assert!(page.contains("Paiement confirmé."));
    assert!(page.contains("Terminer"));

    // The wizard is not stuck: it completes and starts over
    let response = browser.post_form("/booking/complete", "").await;
    assert_eq!(location(&response), "/account/reservations");
    assert!(browser.page("/booking").await.contains("Étape 1"));
}

// =============================================================================
// Reservations
// =============================================================================

#[tokio::test]
async fn test_cancel_refused_when_booking_no_longer_pending() {
    let (addr, backend) = start_backend(Backend::default()).await;
    let browser = Browser::new(addr, Duration::from_millis(10));
    browser.login().await;

    let response = browser
        .post_form(&format!("/account/reservations/{BOOKING_ID}/cancel"), "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account/reservations");

    let patches = backend.status_patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    assert!(patches[0].contains("status=eq.pending"));

    let page = browser.page("/account/reservations").await;
    assert!(page.contains("Cette réservation ne peut plus être annulée."));
    assert!(!page.contains("Réservation annulée."));
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_forbidden_for_regular_user() {
    let (addr, backend) = start_backend(Backend::default()).await;
    let browser = Browser::new(addr, Duration::from_millis(10));
    browser.login().await;

    let response = browser.get("/admin").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("Accès refusé"));

    let response = browser
        .post_form(&format!("/admin/users/{TARGET_ID}/ban"), "")
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(backend.banned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ban_redirects_and_shows_notification() {
    let (addr, backend) = start_backend(Backend {
        is_admin: true,
        ..Backend::default()
    })
    .await;
    let browser = Browser::new(addr, Duration::from_millis(10));
    browser.login().await;

    assert!(browser.page("/admin").await.contains("Bob Sinclair"));

    let response = browser
        .post_form(&format!("/admin/users/{TARGET_ID}/ban"), "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
    assert_eq!(backend.banned.lock().unwrap()[0]["userId"], TARGET_ID);

    // The function answered 204 with no body; that is a success
    let page = browser.page("/admin").await;
    assert!(page.contains("User banned successfully"));
    assert!(!page.contains("Failed to ban user"));
}

#[tokio::test]
async fn test_failed_privilege_lookup_is_not_forbidden() {
    let (addr, _backend) = start_backend(Backend {
        privilege_lookup_down: true,
        ..Backend::default()
    })
    .await;
    let browser = Browser::new(addr, Duration::from_millis(10));
    browser.login().await;

    let response = browser.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Failed to verify admin access"));
    assert!(page.contains("indisponible"));
    assert!(!page.contains("Accès refusé"));
}
