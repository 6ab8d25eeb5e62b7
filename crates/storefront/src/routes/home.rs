//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::Chrome;
use crate::catalog::{self, Product};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Testimonial;
use crate::state::AppState;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub featured: Vec<&'static Product>,
    pub new_arrivals: Vec<&'static Product>,
    pub testimonials: Vec<Testimonial>,
}

/// Display the landing page.
///
/// A testimonial fetch failure renders the page without testimonials.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    let testimonials = match state.testimonials().await {
        Ok(list) => list.as_ref().clone(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load testimonials");
            Vec::new()
        }
    };

    HomeTemplate {
        chrome: Chrome::load(&session, user).await,
        featured: catalog::featured(),
        new_arrivals: catalog::new_arrivals(),
        testimonials,
    }
}
