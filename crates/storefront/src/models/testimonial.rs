//! `testimonials` table rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rotharc_core::TestimonialId;

/// A customer quote shown on the landing page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Testimonial {
    pub id: TestimonialId,
    pub name: String,
    pub title: String,
    pub quote: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
