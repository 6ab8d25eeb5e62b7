//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `payment` - Payment confirmation used by the booking wizard
//! - `payment_ledger` - Per-user payment state kept outside the session
//! - `admin_panel` - Per-admin user management panel with stale-load discard
//! - `auth_events` - Sign-in / sign-out broadcast

pub mod admin_panel;
pub mod auth_events;
pub mod payment;
pub mod payment_ledger;

pub use admin_panel::{AdminBackend, AdminPanelError, AdminPanels, AdminUserPanel};
pub use auth_events::{AuthEvent, AuthEvents};
pub use payment::SimulatedPayment;
pub use payment_ledger::{PaymentLedger, PaymentSlot};
