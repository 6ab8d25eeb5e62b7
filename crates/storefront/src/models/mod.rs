//! Domain models for the storefront.
//!
//! Row types mirror the backend's tables; session types are what the
//! storefront keeps per visitor between requests.

pub mod admin;
pub mod booking;
pub mod notification;
pub mod profile;
pub mod session;
pub mod testimonial;

pub use admin::AdminUserRow;
pub use booking::{Booking, NewBooking};
pub use notification::{Notification, NotificationLevel};
pub use profile::{Profile, ProfileUpdate};
pub use session::{AccessToken, CurrentUser, keys as session_keys};
pub use testimonial::Testimonial;
