//! Catalogue route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;

use super::Chrome;
use crate::catalog::{self, Product};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

/// A category filter link.
pub struct CategoryTab {
    pub name: &'static str,
    pub active: bool,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub chrome: Chrome,
    pub products: Vec<&'static Product>,
    pub categories: Vec<CategoryTab>,
    pub filtered: bool,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub chrome: Chrome,
    pub product: &'static Product,
}

/// Display the catalogue, optionally filtered by category.
pub async fn index(
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let active_category = query
        .category
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    let products = if active_category.is_empty() {
        catalog::all().iter().collect()
    } else {
        catalog::by_category(&active_category)
    };

    let categories = catalog::categories()
        .into_iter()
        .map(|name| CategoryTab {
            name,
            active: name == active_category,
        })
        .collect();

    ProductsIndexTemplate {
        chrome: Chrome::load(&session, user).await,
        products,
        categories,
        filtered: !active_category.is_empty(),
    }
}

/// Display one product.
///
/// # Errors
///
/// `NotFound` for ids outside the catalogue.
pub async fn show(
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = catalog::by_id(&id).ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(ProductShowTemplate {
        chrome: Chrome::load(&session, user).await,
        product,
    })
}
