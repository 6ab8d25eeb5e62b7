//! Live tests for sign-in, the booking wizard and reservations.
//!
//! These tests require:
//! - The storefront running (cargo run -p rotharc-storefront)
//! - A Supabase project with a confirmed test user
//!
//! Run with: cargo test -p rotharc-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Days, Utc};
use reqwest::StatusCode;
use rotharc_core::WizardStep;
use rotharc_integration_tests::{Credentials, TestContext, location};

async fn signed_in() -> TestContext {
    let credentials =
        Credentials::user().expect("ROTHARC_TEST_EMAIL and ROTHARC_TEST_PASSWORD must be set");
    let ctx = TestContext::new().expect("Failed to create HTTP client");
    let resp = ctx.login(&credentials).await.expect("Login request failed");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login should redirect");
    assert_eq!(location(&resp), Some("/"));
    ctx
}

async fn page(ctx: &TestContext, path: &str) -> String {
    let resp = ctx.get(path).await.expect("GET failed");
    assert_eq!(resp.status(), StatusCode::OK, "{path}");
    resp.text().await.expect("Failed to read body")
}

// ============================================================================
// Public pages
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health() {
    let ctx = TestContext::new().unwrap();
    let resp = ctx.get("/health").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_booking_requires_login() {
    let ctx = TestContext::new().unwrap();
    let resp = ctx.get("/booking").await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/auth/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront and Supabase credentials"]
async fn test_login_rejects_wrong_password() {
    let mut credentials = Credentials::user().unwrap();
    credentials.password = "definitely-wrong".to_string().into();
    let ctx = TestContext::new().unwrap();

    let resp = ctx.login(&credentials).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("Email ou mot de passe incorrect.")
    );
}

// ============================================================================
// Booking wizard
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and Supabase credentials"]
async fn test_full_booking_flow() {
    let ctx = signed_in().await;
    ctx.post_form("/booking/reset", &[("", "")]).await.unwrap();

    // Step 1, preselected from the product page link
    let body = page(&ctx, "/booking?product=cardio-prime").await;
    assert!(body.contains(WizardStep::ProductSelection.title()));
    let resp = ctx
        .post_form(
            "/booking/product",
            &[("product_id", "cardio-prime"), ("advance", "true")],
        )
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/booking"));

    // Step 2
    let date = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(30))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string();
    ctx.post_form(
        "/booking/schedule",
        &[("date", date.as_str()), ("time", "15:30"), ("advance", "true")],
    )
    .await
    .unwrap();

    // Step 3: email and first name are prefilled from the account
    let body = page(&ctx, "/booking").await;
    assert!(body.contains(WizardStep::ContactDetails.title()));
    ctx.post_form(
        "/booking/contact",
        &[
            ("phone", "+33 6 12 34 56 78"),
            ("city", "Lyon"),
            ("location_name", "Clinique Rotharc Lyon"),
            ("advance", "true"),
        ],
    )
    .await
    .unwrap();

    // Step 4: the response only comes back once payment has been decided
    let body = page(&ctx, "/booking").await;
    assert!(body.contains("Cardio Prime"));
    let resp = ctx.post_form("/booking/next", &[("", "")]).await.unwrap();
    assert_eq!(location(&resp), Some("/booking"));

    // Step 5
    let body = page(&ctx, "/booking").await;
    assert!(body.contains("SIM-"));

    let resp = ctx.post_form("/booking/complete", &[("", "")]).await.unwrap();
    assert_eq!(location(&resp), Some("/account/reservations"));

    let reservations = page(&ctx, "/account/reservations").await;
    assert!(reservations.contains("Cardio Prime"));
    assert!(reservations.contains("15:30"));
}

#[tokio::test]
#[ignore = "Requires running storefront and Supabase credentials"]
async fn test_wizard_refuses_to_skip_steps() {
    let ctx = signed_in().await;
    ctx.post_form("/booking/reset", &[("", "")]).await.unwrap();

    // No product chosen: advancing is refused with a notification
    let resp = ctx.post_form("/booking/next", &[("", "")]).await.unwrap();
    assert_eq!(location(&resp), Some("/booking"));
    let body = page(&ctx, "/booking").await;
    assert!(body.contains("toast-error"));
    assert!(body.contains(WizardStep::ProductSelection.title()));
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and Supabase credentials"]
async fn test_profile_update_round_trip() {
    let ctx = signed_in().await;
    let body = page(&ctx, "/account").await;
    assert!(body.contains("name=\"first_name\""));

    let resp = ctx
        .post_form(
            "/account",
            &[
                ("first_name", "  Ada "),
                ("last_name", "Lovelace"),
                ("phone", ""),
                ("address", ""),
                ("city", "Paris"),
                ("postal_code", "75001"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/account"));

    let body = page(&ctx, "/account").await;
    assert!(body.contains("Profil mis à jour avec succès."));
    assert!(body.contains("value=\"Ada\""));
    assert!(body.contains("value=\"Paris\""));
}
