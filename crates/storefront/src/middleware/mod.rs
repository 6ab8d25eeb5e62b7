//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Request context (request ID, Sentry user)
//! 5. Security headers (CSP, frame and isolation policies)

pub mod auth;
pub mod flash;
pub mod request_context;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use flash::{push_flash, push_flashes, take_flash};
pub use request_context::request_context_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
