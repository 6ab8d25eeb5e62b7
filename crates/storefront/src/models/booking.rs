//! `bookings` table rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rotharc_core::{BookingId, BookingStatus, BookingSubmission, ProductId, UserId};

/// A stored booking.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub booking_date: DateTime<Utc>,
    pub booking_time: String,
    #[serde(default)]
    pub status: BookingStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for `create_booking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBooking {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Midnight UTC of the chosen day, as the column is a timestamp.
    pub booking_date: DateTime<Utc>,
    pub booking_time: String,
}

impl NewBooking {
    /// Build the insert payload from a finished wizard.
    #[must_use]
    pub fn from_submission(user_id: UserId, submission: &BookingSubmission) -> Self {
        Self {
            user_id,
            product_id: submission.product_id.clone(),
            booking_date: midnight_utc(submission.booking_date),
            booking_time: submission.booking_time.clone(),
        }
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rotharc_core::ContactInfo;

    #[test]
    fn test_new_booking_from_submission() {
        let user_id = UserId::parse("5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b").unwrap();
        let submission = BookingSubmission {
            product_id: ProductId::new("memory-matrix"),
            booking_date: NaiveDate::from_ymd_opt(2077, 1, 2).unwrap(),
            booking_time: "09:00".to_string(),
            contact_info: ContactInfo::default(),
        };
        let insert = NewBooking::from_submission(user_id, &submission);
        let json = serde_json::to_value(&insert).unwrap();
        assert_eq!(json["product_id"], "memory-matrix");
        assert_eq!(json["booking_time"], "09:00");
        assert_eq!(json["booking_date"], "2077-01-02T00:00:00Z");
    }

    #[test]
    fn test_booking_status_defaults_to_pending() {
        let booking: Booking = serde_json::from_str(
            r#"{
                "id":"0b6f1c2e-7d1a-4a43-8f55-6a3d3b8c9e10",
                "user_id":"5f0c6c1e-2d6a-4c5e-9d8b-3a2f1e0d9c8b",
                "product_id":"ocular-x2",
                "booking_date":"2077-01-02T00:00:00+00:00",
                "booking_time":"14:00",
                "created_at":null,
                "updated_at":null
            }"#,
        )
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }
}
