//! Per-request context: correlation id and Sentry user.
//!
//! The request id comes from an upstream proxy's `x-request-id` header when
//! present, otherwise a fresh UUID v4. It is recorded on the tracing span,
//! tagged on the Sentry scope and echoed back in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tower_sessions::Session;
use tracing::Span;
use uuid::Uuid;

use crate::models::{CurrentUser, session_keys};

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Attach request id and signed-in user to logs and error reports.
///
/// Must run inside the session layer.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    let user = match request.extensions().get::<Session>() {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten(),
        None => None,
    };

    let span = Span::current();
    span.record("request_id", &request_id);
    if let Some(user) = &user {
        span.record("user_id", user.id.to_string());
    }

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        scope.set_user(user.as_ref().map(|u| sentry::User {
            id: Some(u.id.to_string()),
            ..Default::default()
        }));
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
