//! PostgREST (`/rest/v1`) row operations.

use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use rotharc_core::{BookingId, BookingStatus, UserId};

use super::{SupabaseClient, SupabaseError, decode, expect_success};
use crate::models::{AccessToken, Booking, NewBooking, Profile, ProfileUpdate, Testimonial};

#[derive(Deserialize)]
struct AdminFlag {
    #[serde(default)]
    is_super_admin: bool,
}

#[derive(Serialize)]
struct ProfilePatch<'a> {
    #[serde(flatten)]
    fields: &'a ProfileUpdate,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
struct StatusPatch {
    status: BookingStatus,
    updated_at: chrono::DateTime<Utc>,
}

/// Filters selecting one booking, optionally only while it has a status.
fn status_filters(
    booking_id: BookingId,
    only_from: Option<BookingStatus>,
) -> Vec<(&'static str, String)> {
    let mut filters = vec![
        ("id", format!("eq.{booking_id}")),
        ("select", "*".to_string()),
    ];
    if let Some(from) = only_from {
        filters.push(("status", format!("eq.{from}")));
    }
    filters
}

impl SupabaseClient {
    /// URL for a table with PostgREST filter pairs.
    fn table(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, SupabaseError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Load a user's profile row.
    ///
    /// # Errors
    ///
    /// `NotFound` if no row exists for `user_id`.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_profile(
        &self,
        token: &AccessToken,
        user_id: UserId,
    ) -> Result<Profile, SupabaseError> {
        let url = self.table(
            "profiles",
            &[("select", "*".to_string()), ("id", format!("eq.{user_id}"))],
        )?;
        let response = self
            .http()
            .get(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .send()
            .await?;
        let rows: Vec<Profile> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("profile {user_id}")))
    }

    /// Overwrite the editable profile columns and stamp `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is refused.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        token: &AccessToken,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<(), SupabaseError> {
        let url = self.table("profiles", &[("id", format!("eq.{user_id}"))])?;
        let body = ProfilePatch {
            fields: update,
            updated_at: Utc::now(),
        };
        let response = self
            .http()
            .patch(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .json(&body)
            .send()
            .await?;
        expect_success(response).await
    }

    /// Whether `user_id` has a super-admin row. A missing row means no.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup itself fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn is_super_admin(
        &self,
        token: &AccessToken,
        user_id: UserId,
    ) -> Result<bool, SupabaseError> {
        let url = self.table(
            "admin_users",
            &[
                ("select", "is_super_admin".to_string()),
                ("id", format!("eq.{user_id}")),
            ],
        )?;
        let response = self
            .http()
            .get(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .send()
            .await?;
        let rows: Vec<AdminFlag> = decode(response).await?;
        Ok(rows.first().is_some_and(|row| row.is_super_admin))
    }

    /// Insert a booking and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns error if the insert is refused or returns no row.
    #[instrument(skip_all, fields(user_id = %booking.user_id))]
    pub async fn create_booking(
        &self,
        token: &AccessToken,
        booking: &NewBooking,
    ) -> Result<Booking, SupabaseError> {
        let url = self.table("bookings", &[("select", "*".to_string())])?;
        let response = self
            .http()
            .post(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .header("Prefer", "return=representation")
            .json(booking)
            .send()
            .await?;
        let rows: Vec<Booking> = decode(response).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::Parse("insert returned no rows".to_string()))?;
        tracing::info!(booking_id = %created.id, product_id = %created.product_id, "Booking created");
        Ok(created)
    }

    /// A user's bookings, earliest date first.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_user_bookings(
        &self,
        token: &AccessToken,
        user_id: UserId,
    ) -> Result<Vec<Booking>, SupabaseError> {
        let url = self.table(
            "bookings",
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "booking_date.asc".to_string()),
            ],
        )?;
        let response = self
            .http()
            .get(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .send()
            .await?;
        decode(response).await
    }

    /// Set a booking's status, stamp `updated_at` and return the updated row.
    ///
    /// # Errors
    ///
    /// `NotFound` when no booking visible to the caller has this id.
    #[instrument(skip_all, fields(booking_id = %booking_id, status = %status))]
    pub async fn update_booking_status(
        &self,
        token: &AccessToken,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, SupabaseError> {
        self.patch_booking_status(token, booking_id, status, None)
            .await
    }

    /// Cancel a booking that is still pending.
    ///
    /// # Errors
    ///
    /// `NotFound` when no pending booking visible to the caller has this id.
    #[instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn cancel_booking(
        &self,
        token: &AccessToken,
        booking_id: BookingId,
    ) -> Result<Booking, SupabaseError> {
        self.patch_booking_status(
            token,
            booking_id,
            BookingStatus::Cancelled,
            Some(BookingStatus::Pending),
        )
        .await
    }

    async fn patch_booking_status(
        &self,
        token: &AccessToken,
        booking_id: BookingId,
        status: BookingStatus,
        only_from: Option<BookingStatus>,
    ) -> Result<Booking, SupabaseError> {
        let url = self.table("bookings", &status_filters(booking_id, only_from))?;
        let response = self
            .http()
            .patch(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .header("Prefer", "return=representation")
            .json(&StatusPatch {
                status,
                updated_at: Utc::now(),
            })
            .send()
            .await?;
        // PostgREST answers an update that matched nothing with an empty array
        let rows: Vec<Booking> = decode(response).await?;
        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("booking {booking_id}")))?;
        tracing::info!(booking_id = %updated.id, status = %updated.status, "Booking status updated");
        Ok(updated)
    }

    /// Public testimonials, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_testimonials(&self) -> Result<Vec<Testimonial>, SupabaseError> {
        let url = self.table(
            "testimonials",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.asc".to_string()),
            ],
        )?;
        let response = self
            .http()
            .get(url)
            .header(AUTHORIZATION, self.bearer(None))
            .send()
            .await?;
        decode(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::SupabaseConfig;
    use secrecy::SecretString;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: SecretString::from("eyJhbGciOiJIUzI1NiJ9.anon"),
        })
        .unwrap()
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let url = client()
            .table(
                "bookings",
                &[
                    ("user_id", "eq.5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b".to_string()),
                    ("order", "booking_date.asc".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/bookings");
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs[0].1, "eq.5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b");
        assert_eq!(pairs[1].1, "booking_date.asc");
    }

    #[test]
    fn test_profile_patch_is_flat() {
        let update = ProfileUpdate {
            city: "Lyon".to_string(),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_value(ProfilePatch {
            fields: &update,
            updated_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["city"], "Lyon");
        assert!(json.get("updated_at").is_some());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_cancel_only_matches_pending_rows() {
        let id = BookingId::parse("0d7e1c2b-7a4f-4b8e-9c1d-2e3f4a5b6c7d").unwrap();
        let url = client()
            .table("bookings", &status_filters(id, Some(BookingStatus::Pending)))
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("status".to_string(), "eq.pending".to_string())));
        assert!(pairs.contains(&("select".to_string(), "*".to_string())));

        let any = status_filters(id, None);
        assert!(any.iter().all(|(key, _)| *key != "status"));
    }

    #[test]
    fn test_status_patch_serializes_snake_case() {
        let json = serde_json::to_value(StatusPatch {
            status: BookingStatus::Cancelled,
            updated_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["status"], "cancelled");
    }
}
